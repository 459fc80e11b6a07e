//! Engine-facing data types: snapshots and the engine error.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error reported by a mining engine call.
///
/// The engine is an external collaborator; whatever goes wrong inside it
/// reaches the control channel as a message, never as a panic.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct EngineError {
    message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Point-in-time description of the worker device. A snapshot, not a live
/// reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub device_name: String,
    pub available_cores: u32,
    pub active_threads: u32,
    pub os_version: String,
}

/// Point-in-time mining statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub hashrate: f64,
    pub cpu_temp_c: f64,
    pub cpu_usage_percent: f64,
    pub uptime_seconds: u64,
    pub total_hashes: u64,
    pub accepted_shares: u64,
    pub rejected_shares: u64,
}
