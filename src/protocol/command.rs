//! Command records sent by controllers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A command from a controller.
///
/// `action` selects the handler; the remaining members of the JSON object
/// are the action-specific parameters, flattened at the top level so the
/// record reads `{"action":"set_threads","threads":2}`. The optional `id`
/// correlates the eventual response when more than one command is in
/// flight; servers echo it and id-less peers keep working in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub action: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<Uuid>,

    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl Command {
    /// Create a command with no parameters.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            id: None,
            params: Map::new(),
        }
    }

    /// Add a parameter (builder pattern).
    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Set the correlation id (builder pattern).
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }
}
