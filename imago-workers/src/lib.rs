//! Shared process bootstrap for the `scheduler`, `worker`, and `setup`
//! binaries: one place that turns an [`imago_config::ImagoConfig`] into
//! live connections and the concrete adapters from `imago-core`.

pub mod bootstrap;
pub mod cli;

pub use bootstrap::Runtime;
