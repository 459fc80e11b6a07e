//! Standalone controller backing the daemon binary.
//!
//! Real deployments implement [`MinerController`] on top of an actual mining
//! engine. This controller tracks lifecycle state and configuration and
//! fills device/stat snapshots from the host via `sysinfo`, which is enough
//! to run the daemon end to end without a hashing backend.

use std::sync::Mutex;
use std::time::Instant;

use sysinfo::{Components, System};
use tracing::debug;

use super::traits::MinerController;
use super::types::{DeviceInfo, EngineError, StatsSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Running,
    Paused,
}

struct Inner {
    state: RunState,
    threads: u32,
    hashrate_limit: f64,
    started_at: Option<Instant>,
}

/// Lifecycle/configuration tracking controller with sysinfo-backed snapshots.
pub struct StandaloneController {
    inner: Mutex<Inner>,
    system: Mutex<System>,
}

impl StandaloneController {
    pub fn new() -> Self {
        let system = System::new_all();
        let default_threads = system.cpus().len().max(1) as u32;

        Self {
            inner: Mutex::new(Inner {
                state: RunState::Idle,
                threads: default_threads,
                hashrate_limit: 0.0,
                started_at: None,
            }),
            system: Mutex::new(system),
        }
    }

    fn lock_inner(&self) -> std::sync::MutexGuard<'_, Inner> {
        // State mutex only guards plain data; poisoning cannot leave it torn.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn cpu_temp_c() -> f64 {
        let components = Components::new_with_refreshed_list();
        components
            .iter()
            .map(|c| c.temperature() as f64)
            .fold(0.0, f64::max)
    }
}

impl Default for StandaloneController {
    fn default() -> Self {
        Self::new()
    }
}

impl MinerController for StandaloneController {
    fn start(&self) -> Result<(), EngineError> {
        let mut inner = self.lock_inner();
        match inner.state {
            RunState::Running => Err(EngineError::new("mining is already running")),
            RunState::Idle | RunState::Paused => {
                if inner.started_at.is_none() {
                    inner.started_at = Some(Instant::now());
                }
                inner.state = RunState::Running;
                debug!(threads = inner.threads, "mining started");
                Ok(())
            }
        }
    }

    fn stop(&self) -> Result<(), EngineError> {
        let mut inner = self.lock_inner();
        inner.state = RunState::Idle;
        inner.started_at = None;
        debug!("mining stopped");
        Ok(())
    }

    fn pause(&self) -> Result<(), EngineError> {
        let mut inner = self.lock_inner();
        if inner.state != RunState::Running {
            return Err(EngineError::new("mining is not running"));
        }
        inner.state = RunState::Paused;
        Ok(())
    }

    fn resume(&self) -> Result<(), EngineError> {
        let mut inner = self.lock_inner();
        if inner.state != RunState::Paused {
            return Err(EngineError::new("mining is not paused"));
        }
        inner.state = RunState::Running;
        Ok(())
    }

    fn set_thread_count(&self, threads: u32) -> Result<(), EngineError> {
        self.lock_inner().threads = threads;
        Ok(())
    }

    fn set_hashrate_limit(&self, limit: f64) -> Result<(), EngineError> {
        self.lock_inner().hashrate_limit = limit;
        Ok(())
    }

    fn current_stats(&self) -> Result<StatsSnapshot, EngineError> {
        let (uptime_seconds, _running) = {
            let inner = self.lock_inner();
            let uptime = inner
                .started_at
                .map(|t| t.elapsed().as_secs())
                .unwrap_or(0);
            (uptime, inner.state == RunState::Running)
        };

        let cpu_usage_percent = {
            let mut system = self
                .system
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            system.refresh_cpu_usage();
            system.global_cpu_info().cpu_usage() as f64
        };

        Ok(StatsSnapshot {
            hashrate: 0.0,
            cpu_temp_c: Self::cpu_temp_c(),
            cpu_usage_percent,
            uptime_seconds,
            total_hashes: 0,
            accepted_shares: 0,
            rejected_shares: 0,
        })
    }

    fn device_info(&self) -> Result<DeviceInfo, EngineError> {
        let inner = self.lock_inner();
        let active_threads = if inner.state == RunState::Running {
            inner.threads
        } else {
            0
        };

        let available_cores = {
            let system = self.system.lock().unwrap_or_else(|e| e.into_inner());
            system.cpus().len().max(1) as u32
        };

        Ok(DeviceInfo {
            device_name: System::host_name().unwrap_or_else(|| "unknown".to_string()),
            available_cores,
            active_threads,
            os_version: System::long_os_version().unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_transitions() {
        let engine = StandaloneController::new();

        assert!(engine.pause().is_err());
        assert!(engine.resume().is_err());

        engine.start().unwrap();
        assert!(engine.start().is_err());

        engine.pause().unwrap();
        engine.resume().unwrap();

        engine.stop().unwrap();
        // Stop is idempotent.
        engine.stop().unwrap();
        engine.start().unwrap();
    }

    #[test]
    fn device_info_reports_at_least_one_core() {
        let engine = StandaloneController::new();
        let info = engine.device_info().unwrap();
        assert!(info.available_cores >= 1);
        assert_eq!(info.active_threads, 0);

        engine.start().unwrap();
        let info = engine.device_info().unwrap();
        assert!(info.active_threads >= 1);
    }

    #[test]
    fn stats_are_nonnegative() {
        let engine = StandaloneController::new();
        let stats = engine.current_stats().unwrap();
        assert!(stats.hashrate >= 0.0);
        assert!(stats.cpu_usage_percent >= 0.0);
        assert_eq!(stats.uptime_seconds, 0);
    }
}
