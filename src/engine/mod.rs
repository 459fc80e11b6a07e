//! Mining engine boundary.
//!
//! The engine itself (hashing, share submission) lives outside this crate.
//! The control channel only calls the [`MinerController`] trait and maps the
//! results onto wire responses. [`EngineHandle`] adds the serialization
//! point required for mutating calls arriving from concurrent connections.

mod handle;
mod standalone;
mod traits;
mod types;

pub use handle::EngineHandle;
pub use standalone::StandaloneController;
pub use traits::MinerController;
pub use types::{DeviceInfo, EngineError, StatsSnapshot};
