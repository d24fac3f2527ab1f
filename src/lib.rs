pub mod clock;
pub mod config;
pub mod envelope;
pub mod error;
pub mod service;
pub mod store;
pub mod telemetry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use envelope::{Delivery, Envelope};
pub use error::{QueueError, StoreError, StoreResult};
pub use service::QueueService;
pub use store::{MemoryStore, RedisStore, Store};
