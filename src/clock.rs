use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Nanosecond time source for enqueue timestamps and visibility comparisons.
///
/// Injected at store construction so the lease state machine can be tested
/// without sleeping. The shared-store backend compares timestamps written by
/// different processes, so the production clock reads wall time rather than a
/// process-local monotonic counter.
pub trait Clock: Send + Sync {
    /// Current time in nanoseconds.
    fn now(&self) -> u64;
}

/// Wall clock: nanoseconds since the UNIX epoch.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64
    }
}

/// Hand-driven clock for tests. Starts at a nonzero offset so zero-valued
/// timestamps never masquerade as "already expired".
#[derive(Debug)]
pub struct ManualClock {
    now_ns: AtomicU64,
}

impl ManualClock {
    const START_NS: u64 = 1_000_000_000;

    pub fn new() -> Self {
        Self {
            now_ns: AtomicU64::new(Self::START_NS),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now_ns.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst)
    }
}
