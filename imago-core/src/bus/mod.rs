//! `lapin`-backed `MessageBus`/`BrokerTopology` (§4.5).

mod publisher;
mod topology;

pub use publisher::LapinMessageBus;
pub use topology::{LapinTopology, DLX, EXCHANGE};
