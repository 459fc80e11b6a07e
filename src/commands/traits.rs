//! Action trait definition.

use crate::engine::MinerController;
use crate::error::ControlResult;

use super::types::{ActionOutcome, Params};

/// One remotely invokable operation against the mining engine.
///
/// Every action the dispatcher can run implements this trait; it is the
/// extension point for new operations.
pub trait Action: Send + Sync {
    /// Action name as it appears on the wire (e.g. "set_threads").
    fn name(&self) -> &'static str;

    /// Whether this action mutates engine state. Mutating actions are
    /// serialized through the engine write gate; read-only snapshot
    /// queries run without it.
    fn mutates(&self) -> bool {
        true
    }

    /// Validate parameters before execution.
    fn validate(&self, _params: &Params) -> ControlResult<()> {
        Ok(())
    }

    /// Execute against the engine controller.
    fn execute(
        &self,
        engine: &dyn MinerController,
        params: Params,
    ) -> ControlResult<ActionOutcome>;
}
