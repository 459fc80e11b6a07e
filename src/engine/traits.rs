//! Controller trait implemented by the mining engine.

use super::types::{DeviceInfo, EngineError, StatsSnapshot};

/// Operations the control channel may ask of the mining engine.
///
/// This is the primary seam between the protocol core and the engine.
/// Implementations must be safe to call from multiple connection tasks;
/// the channel linearizes mutating calls through
/// [`EngineHandle`](super::EngineHandle), but read-only snapshot calls may
/// run concurrently with anything.
pub trait MinerController: Send + Sync {
    /// Start mining with the currently configured settings.
    fn start(&self) -> Result<(), EngineError>;

    /// Stop mining.
    fn stop(&self) -> Result<(), EngineError>;

    /// Pause mining, keeping the current session.
    fn pause(&self) -> Result<(), EngineError>;

    /// Resume a paused session.
    fn resume(&self) -> Result<(), EngineError>;

    /// Set the desired worker thread count.
    fn set_thread_count(&self, threads: u32) -> Result<(), EngineError>;

    /// Set the soft hashrate ceiling in H/s.
    fn set_hashrate_limit(&self, limit: f64) -> Result<(), EngineError>;

    /// Snapshot of the current mining statistics.
    fn current_stats(&self) -> Result<StatsSnapshot, EngineError>;

    /// Snapshot of the worker device description.
    fn device_info(&self) -> Result<DeviceInfo, EngineError>;
}
