//! Response records sent by the server.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A response from the server.
///
/// Exactly one response is written per command received. `data` is present
/// only for informational queries. `id` echoes the command's correlation id
/// when the command carried one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<Uuid>,
}

impl Response {
    /// Create a success response without data.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            id: None,
        }
    }

    /// Create a success response carrying data.
    pub fn ok_with_data(message: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            id: None,
        }
    }

    /// Create a failure response.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            id: None,
        }
    }

    /// Attach a correlation id, echoing the command's.
    pub fn with_id(mut self, id: Option<Uuid>) -> Self {
        self.id = id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_data_and_id_are_omitted() {
        let json = serde_json::to_string(&Response::ok("Mining stopped")).unwrap();
        assert!(json.contains("\"success\":true"));
        assert!(!json.contains("\"data\""));
        assert!(!json.contains("\"id\""));
    }

    #[test]
    fn failure_carries_message() {
        let response = Response::fail("Unknown command: frobnicate");
        assert!(!response.success);
        assert!(response.message.contains("frobnicate"));
    }

    #[test]
    fn round_trip_is_field_for_field_equal() {
        let response = Response::ok_with_data(
            "Current mining statistics",
            serde_json::json!({"hashrate": 120.5}),
        )
        .with_id(Some(Uuid::new_v4()));

        let json = serde_json::to_string(&response).unwrap();
        let parsed: Response = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, response);
    }

    #[test]
    fn id_less_record_parses() {
        let parsed: Response =
            serde_json::from_str(r#"{"success":true,"message":"ok"}"#).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.data, None);
        assert_eq!(parsed.id, None);
    }
}
