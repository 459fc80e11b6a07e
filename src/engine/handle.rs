//! Shared engine handle with a single serialization point for mutations.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use super::traits::MinerController;

/// Shared handle to the mining engine.
///
/// The engine is one shared resource invoked from every connection task and
/// potentially from local callers. Mutating calls (start/stop/pause/resume
/// and the setters) must go through [`write_gate`](Self::write_gate) so two
/// concurrent remote commands cannot interleave a start with a stop.
/// Snapshot reads (`current_stats`, `device_info`) bypass the gate.
#[derive(Clone)]
pub struct EngineHandle {
    controller: Arc<dyn MinerController>,
    write_gate: Arc<Mutex<()>>,
}

impl EngineHandle {
    pub fn new(controller: Arc<dyn MinerController>) -> Self {
        Self {
            controller,
            write_gate: Arc::new(Mutex::new(())),
        }
    }

    /// The underlying controller.
    pub fn controller(&self) -> &dyn MinerController {
        self.controller.as_ref()
    }

    /// Acquire the mutation gate. Hold the guard across the engine call.
    pub async fn write_gate(&self) -> MutexGuard<'_, ()> {
        self.write_gate.lock().await
    }
}
