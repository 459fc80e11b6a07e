//! Action registry: maps wire action names to handlers.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::engine::EngineHandle;
use crate::protocol::{Command, Response};

use super::mining::{
    GetDeviceInfoAction, GetStatsAction, PauseMiningAction, ResumeMiningAction,
    SetHashrateLimitAction, SetThreadsAction, StartMiningAction, StopMiningAction,
};
use super::traits::Action;
use super::types::Params;

/// Registry of all supported actions.
///
/// Dispatch is a pure request-to-response mapping: whatever happens inside
/// an action (validation failure, engine error) comes back as a failure
/// [`Response`] and never propagates out.
#[derive(Clone)]
pub struct ActionRegistry {
    actions: HashMap<&'static str, Arc<dyn Action>>,
}

impl ActionRegistry {
    /// Create a registry with all built-in actions.
    pub fn new() -> Self {
        let mut registry = Self {
            actions: HashMap::new(),
        };

        registry.register(Arc::new(StartMiningAction));
        registry.register(Arc::new(StopMiningAction));
        registry.register(Arc::new(PauseMiningAction));
        registry.register(Arc::new(ResumeMiningAction));
        registry.register(Arc::new(SetThreadsAction));
        registry.register(Arc::new(SetHashrateLimitAction));
        registry.register(Arc::new(GetStatsAction));
        registry.register(Arc::new(GetDeviceInfoAction));

        info!(count = registry.actions.len(), "Action registry initialized");
        registry
    }

    fn register(&mut self, action: Arc<dyn Action>) {
        let name = action.name();
        debug!(action = name, "Registering action");
        self.actions.insert(name, action);
    }

    /// Dispatch a command against the engine and produce its response.
    ///
    /// Mutating actions hold the engine write gate across the engine call;
    /// read-only queries run without it.
    pub async fn dispatch(&self, engine: &EngineHandle, command: &Command) -> Response {
        let action = match self.actions.get(command.action.as_str()) {
            Some(action) => action,
            None => {
                return Response::fail(format!("Unknown command: {}", command.action))
                    .with_id(command.id)
            }
        };

        let params = Params::new(command.params.clone());
        if let Err(e) = action.validate(&params) {
            return Response::fail(e.to_string()).with_id(command.id);
        }

        let result = if action.mutates() {
            let _gate = engine.write_gate().await;
            action.execute(engine.controller(), params)
        } else {
            action.execute(engine.controller(), params)
        };

        match result {
            Ok(outcome) => {
                let response = match outcome.data {
                    Some(data) => Response::ok_with_data(outcome.message, data),
                    None => Response::ok(outcome.message),
                };
                response.with_id(command.id)
            }
            Err(e) => {
                debug!(action = command.action.as_str(), error = %e, "Action failed");
                Response::fail(e.to_string()).with_id(command.id)
            }
        }
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{DeviceInfo, EngineError, MinerController, StatsSnapshot};
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use uuid::Uuid;

    #[derive(Default)]
    struct FakeMiner {
        running: AtomicBool,
        threads: AtomicU32,
        fail_next: AtomicBool,
    }

    impl MinerController for FakeMiner {
        fn start(&self) -> Result<(), EngineError> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(EngineError::new("thermal shutdown"));
            }
            self.running.store(true, Ordering::SeqCst);
            Ok(())
        }
        fn stop(&self) -> Result<(), EngineError> {
            self.running.store(false, Ordering::SeqCst);
            Ok(())
        }
        fn pause(&self) -> Result<(), EngineError> {
            Ok(())
        }
        fn resume(&self) -> Result<(), EngineError> {
            Ok(())
        }
        fn set_thread_count(&self, threads: u32) -> Result<(), EngineError> {
            self.threads.store(threads, Ordering::SeqCst);
            Ok(())
        }
        fn set_hashrate_limit(&self, _limit: f64) -> Result<(), EngineError> {
            Ok(())
        }
        fn current_stats(&self) -> Result<StatsSnapshot, EngineError> {
            Ok(StatsSnapshot {
                hashrate: 321.0,
                cpu_temp_c: 55.0,
                cpu_usage_percent: 42.0,
                uptime_seconds: 10,
                total_hashes: 1000,
                accepted_shares: 3,
                rejected_shares: 0,
            })
        }
        fn device_info(&self) -> Result<DeviceInfo, EngineError> {
            Ok(DeviceInfo {
                device_name: "fake".to_string(),
                available_cores: 8,
                active_threads: self.threads.load(Ordering::SeqCst),
                os_version: "TestOS 1.0".to_string(),
            })
        }
    }

    fn handle() -> (EngineHandle, Arc<FakeMiner>) {
        let miner = Arc::new(FakeMiner::default());
        (EngineHandle::new(miner.clone()), miner)
    }

    #[tokio::test]
    async fn lifecycle_actions_succeed_without_data() {
        let (engine, miner) = handle();
        let registry = ActionRegistry::new();

        for action in ["start_mining", "pause_mining", "resume_mining", "stop_mining"] {
            let response = registry.dispatch(&engine, &Command::new(action)).await;
            assert!(response.success, "{} failed: {}", action, response.message);
            assert!(response.data.is_none());
        }
        assert!(!miner.running.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn set_threads_applies_and_echoes_value() {
        let (engine, miner) = handle();
        let registry = ActionRegistry::new();

        let command = Command::new("set_threads").with_param("threads", 3);
        let response = registry.dispatch(&engine, &command).await;
        assert!(response.success);
        assert!(response.message.contains('3'));
        assert_eq!(miner.threads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn set_threads_rejects_negative_and_missing() {
        let (engine, miner) = handle();
        let registry = ActionRegistry::new();

        let command = Command::new("set_threads").with_param("threads", -2);
        let response = registry.dispatch(&engine, &command).await;
        assert!(!response.success);

        let response = registry.dispatch(&engine, &Command::new("set_threads")).await;
        assert!(!response.success);
        assert!(response.message.contains("threads"));

        assert_eq!(miner.threads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn set_hashrate_limit_rejects_negative() {
        let (engine, _) = handle();
        let registry = ActionRegistry::new();

        let command = Command::new("set_hashrate_limit").with_param("limit", -1.0);
        let response = registry.dispatch(&engine, &command).await;
        assert!(!response.success);

        let command = Command::new("set_hashrate_limit").with_param("limit", 500.0);
        let response = registry.dispatch(&engine, &command).await;
        assert!(response.success);
    }

    #[tokio::test]
    async fn queries_return_snapshot_data() {
        let (engine, _) = handle();
        let registry = ActionRegistry::new();

        let response = registry.dispatch(&engine, &Command::new("get_stats")).await;
        assert!(response.success);
        let data = response.data.unwrap();
        assert_eq!(data["hashrate"], 321.0);
        assert_eq!(data["acceptedShares"], 3);

        let response = registry
            .dispatch(&engine, &Command::new("get_device_info"))
            .await;
        assert!(response.success);
        let data = response.data.unwrap();
        assert_eq!(data["deviceName"], "fake");
        assert_eq!(data["availableCores"], 8);
    }

    #[tokio::test]
    async fn unknown_action_names_the_action() {
        let (engine, _) = handle();
        let registry = ActionRegistry::new();

        let response = registry.dispatch(&engine, &Command::new("warp_drive")).await;
        assert!(!response.success);
        assert!(response.message.contains("warp_drive"));
    }

    #[tokio::test]
    async fn engine_error_becomes_failure_response() {
        let (engine, miner) = handle();
        miner.fail_next.store(true, Ordering::SeqCst);
        let registry = ActionRegistry::new();

        let response = registry.dispatch(&engine, &Command::new("start_mining")).await;
        assert!(!response.success);
        assert!(response.message.contains("thermal shutdown"));
    }

    #[tokio::test]
    async fn correlation_id_is_echoed() {
        let (engine, _) = handle();
        let registry = ActionRegistry::new();
        let id = Uuid::new_v4();

        let response = registry
            .dispatch(&engine, &Command::new("get_stats").with_id(id))
            .await;
        assert_eq!(response.id, Some(id));

        let response = registry
            .dispatch(&engine, &Command::new("nope").with_id(id))
            .await;
        assert_eq!(response.id, Some(id));
    }
}
