//! Finance assistant prompt relay.

use serde_json::{json, Value};

use super::{ApiError, SessionClient};

/// Raw answer from the assistant endpoint.
#[derive(Debug, Clone)]
pub struct AssistantReply {
    pub raw: Value,
}

impl AssistantReply {
    /// Best-effort text of the answer.
    pub fn text(&self) -> String {
        if let Some(text) = self.raw.as_str() {
            return text.to_string();
        }
        ["response", "answer", "message", "text"]
            .iter()
            .find_map(|key| self.raw.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| self.raw.to_string())
    }
}

impl SessionClient {
    pub async fn ask_assistant(&self, prompt: &str) -> Result<AssistantReply, ApiError> {
        let raw = self.post("/api/ia/promptIA", &json!({ "prompt": prompt })).await?;
        Ok(AssistantReply { raw })
    }
}
