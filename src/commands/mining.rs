//! Mining control actions.

use crate::engine::MinerController;
use crate::error::{ControlError, ControlResult, ValidationErrorKind};

use super::traits::Action;
use super::types::{ActionOutcome, Params};

/// `start_mining`: start with currently configured settings.
pub struct StartMiningAction;

impl Action for StartMiningAction {
    fn name(&self) -> &'static str {
        "start_mining"
    }

    fn execute(
        &self,
        engine: &dyn MinerController,
        _params: Params,
    ) -> ControlResult<ActionOutcome> {
        engine.start()?;
        Ok(ActionOutcome::message("Mining started"))
    }
}

/// `stop_mining`
pub struct StopMiningAction;

impl Action for StopMiningAction {
    fn name(&self) -> &'static str {
        "stop_mining"
    }

    fn execute(
        &self,
        engine: &dyn MinerController,
        _params: Params,
    ) -> ControlResult<ActionOutcome> {
        engine.stop()?;
        Ok(ActionOutcome::message("Mining stopped"))
    }
}

/// `pause_mining`
pub struct PauseMiningAction;

impl Action for PauseMiningAction {
    fn name(&self) -> &'static str {
        "pause_mining"
    }

    fn execute(
        &self,
        engine: &dyn MinerController,
        _params: Params,
    ) -> ControlResult<ActionOutcome> {
        engine.pause()?;
        Ok(ActionOutcome::message("Mining paused"))
    }
}

/// `resume_mining`
pub struct ResumeMiningAction;

impl Action for ResumeMiningAction {
    fn name(&self) -> &'static str {
        "resume_mining"
    }

    fn execute(
        &self,
        engine: &dyn MinerController,
        _params: Params,
    ) -> ControlResult<ActionOutcome> {
        engine.resume()?;
        Ok(ActionOutcome::message("Mining resumed"))
    }
}

/// `set_threads`: `threads: int >= 0`.
pub struct SetThreadsAction;

impl Action for SetThreadsAction {
    fn name(&self) -> &'static str {
        "set_threads"
    }

    fn validate(&self, params: &Params) -> ControlResult<()> {
        params.get_u32("threads").map(|_| ())
    }

    fn execute(
        &self,
        engine: &dyn MinerController,
        params: Params,
    ) -> ControlResult<ActionOutcome> {
        let threads = params.get_u32("threads")?;
        engine.set_thread_count(threads)?;
        Ok(ActionOutcome::message(format!(
            "Thread count set to {}",
            threads
        )))
    }
}

/// `set_hashrate_limit`: `limit: double >= 0`.
pub struct SetHashrateLimitAction;

impl Action for SetHashrateLimitAction {
    fn name(&self) -> &'static str {
        "set_hashrate_limit"
    }

    fn validate(&self, params: &Params) -> ControlResult<()> {
        let limit = params.get_f64("limit")?;
        if !limit.is_finite() || limit < 0.0 {
            return Err(ControlError::Validation {
                kind: ValidationErrorKind::InvalidParameter {
                    param: "limit".to_string(),
                    message: format!("{} is not a non-negative number", limit),
                },
            });
        }
        Ok(())
    }

    fn execute(
        &self,
        engine: &dyn MinerController,
        params: Params,
    ) -> ControlResult<ActionOutcome> {
        let limit = params.get_f64("limit")?;
        engine.set_hashrate_limit(limit)?;
        Ok(ActionOutcome::message(format!(
            "Hashrate limit set to {} H/s",
            limit
        )))
    }
}

/// `get_stats`: read-only statistics snapshot.
pub struct GetStatsAction;

impl Action for GetStatsAction {
    fn name(&self) -> &'static str {
        "get_stats"
    }

    fn mutates(&self) -> bool {
        false
    }

    fn execute(
        &self,
        engine: &dyn MinerController,
        _params: Params,
    ) -> ControlResult<ActionOutcome> {
        let stats = engine.current_stats()?;
        Ok(ActionOutcome::with_data(
            "Current mining statistics",
            serde_json::to_value(stats)?,
        ))
    }
}

/// `get_device_info`: read-only device snapshot.
pub struct GetDeviceInfoAction;

impl Action for GetDeviceInfoAction {
    fn name(&self) -> &'static str {
        "get_device_info"
    }

    fn mutates(&self) -> bool {
        false
    }

    fn execute(
        &self,
        engine: &dyn MinerController,
        _params: Params,
    ) -> ControlResult<ActionOutcome> {
        let info = engine.device_info()?;
        Ok(ActionOutcome::with_data(
            "Device information",
            serde_json::to_value(info)?,
        ))
    }
}
