use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error body returned by every backend service on failure.
///
/// `error` is optional because some failure responses carry other fields
/// (`{"valid": false, ...}`) and callers fall back to a generic label.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
        }
    }

    /// Extracts the error message from a raw response body. `None` when the
    /// body is not a JSON object. A blank `error` counts as absent; a
    /// non-string `error` is kept in its JSON form.
    pub fn parse(raw: &[u8]) -> Option<Self> {
        let value: Value = serde_json::from_slice(raw).ok()?;
        let error = match value.as_object()?.get("error") {
            None | Some(Value::Null) => None,
            Some(Value::String(message)) => Some(message.clone()),
            Some(other) => Some(other.to_string()),
        };
        Some(Self {
            error: error.filter(|message| !message.trim().is_empty()),
        })
    }
}
