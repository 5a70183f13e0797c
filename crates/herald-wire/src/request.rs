//! Outbound request body

use serde::{Deserialize, Serialize};

/// Capability tier used when none is configured
pub const DEFAULT_AI_MODEL: &str = "smart";

/// JSON body POSTed to the generation endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Fully rendered prompt
    pub message: String,
    /// Capability tier selector
    pub ai_model: String,
    /// Whether the service may consult external knowledge
    pub use_grounding: bool,
}

impl ChatRequest {
    /// Create a request with the default tier and grounding off
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ai_model: DEFAULT_AI_MODEL.to_string(),
            use_grounding: false,
        }
    }

    /// Set the capability tier
    pub fn with_ai_model(mut self, ai_model: impl Into<String>) -> Self {
        self.ai_model = ai_model.into();
        self
    }

    /// Toggle grounding
    pub fn with_grounding(mut self, use_grounding: bool) -> Self {
        self.use_grounding = use_grounding;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_camel_case() {
        let req = ChatRequest::new("Wie bent u?")
            .with_ai_model("pro")
            .with_grounding(true);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "message": "Wie bent u?",
                "aiModel": "pro",
                "useGrounding": true
            })
        );
    }

    #[test]
    fn test_defaults() {
        let req = ChatRequest::new("hi");
        assert_eq!(req.ai_model, "smart");
        assert!(!req.use_grounding);
    }
}
