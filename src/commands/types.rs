//! Action parameter and outcome types.

use serde_json::{Map, Value};

use crate::error::{ControlError, ControlResult, ValidationErrorKind};

/// Wrapper around a command's flattened parameters with typed accessors.
#[derive(Debug, Clone)]
pub struct Params {
    inner: Map<String, Value>,
}

impl Params {
    pub fn new(inner: Map<String, Value>) -> Self {
        Self { inner }
    }

    /// Get a required integer parameter.
    pub fn get_i64(&self, key: &str) -> ControlResult<i64> {
        self.inner
            .get(key)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| missing(key))
    }

    /// Get a required non-negative integer parameter that fits in u32.
    pub fn get_u32(&self, key: &str) -> ControlResult<u32> {
        let value = self.get_i64(key)?;
        u32::try_from(value).map_err(|_| ControlError::Validation {
            kind: ValidationErrorKind::InvalidParameter {
                param: key.to_string(),
                message: format!("{} is out of range", value),
            },
        })
    }

    /// Get a required floating point parameter (integers coerce).
    pub fn get_f64(&self, key: &str) -> ControlResult<f64> {
        self.inner
            .get(key)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| missing(key))
    }

    /// Get a required string parameter.
    pub fn get_string(&self, key: &str) -> ControlResult<String> {
        self.inner
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| missing(key))
    }

    /// Check if a parameter exists.
    pub fn has(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }
}

impl From<Map<String, Value>> for Params {
    fn from(inner: Map<String, Value>) -> Self {
        Self::new(inner)
    }
}

fn missing(key: &str) -> ControlError {
    ControlError::Validation {
        kind: ValidationErrorKind::MissingParameter {
            param: key.to_string(),
        },
    }
}

/// What an action hands back on success: a human-readable message and,
/// for informational queries, a data payload.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub message: String,
    pub data: Option<Value>,
}

impl ActionOutcome {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(message: impl Into<String>, data: Value) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
        }
    }
}
