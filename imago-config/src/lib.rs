//! Environment- and file-based configuration loading shared by every Imago
//! process (scheduler, worker, setup).

pub mod error;
pub mod loader;
pub mod models;
pub mod sources;

pub use error::ConfigLoadError;
pub use loader::{ConfigLoader, ConfigLoaderOptions};
pub use models::{
    BrokerConfig, CacheConfig, DatabaseConfig, ImageDefaults, ImagoConfig,
    IndexConfig, MessageConfig, SchedulerConfig, WorkerConfig,
};
