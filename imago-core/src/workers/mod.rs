//! `ThumbnailWorker` and `CacheWorker` consumers (§4.7, §4.8).

mod atomic_write;
mod cache;
mod image_processing;
mod outcome;
mod thumbnail;

pub use cache::CacheWorker;
pub use image_processing::ImageProcessingWorker;
pub use outcome::ProcessOutcome;
pub use thumbnail::ThumbnailWorker;
