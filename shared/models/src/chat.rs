use serde::{Deserialize, Serialize};
use validator::Validate;

/// A single turn in a chat conversation, in the shape both providers accept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ChatMessage {
    #[validate(length(min = 1, message = "role must not be empty"))]
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }

    pub fn is_system(&self) -> bool {
        self.role.eq_ignore_ascii_case("system")
    }
}

/// Tuning knobs forwarded to a provider alongside the messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub model: Option<String>,
}

impl ChatOptions {
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_message_constructors() {
        let msg = ChatMessage::system("be terse");
        assert_eq!(msg.role, "system");
        assert!(msg.is_system());
        assert!(!ChatMessage::user("hi").is_system());
    }

    #[test]
    fn test_message_validation() {
        assert!(ChatMessage::new("user", "hello").validate().is_ok());
        assert!(ChatMessage::new("", "hello").validate().is_err());
    }

    #[test]
    fn test_options_builder() {
        let opts = ChatOptions::default()
            .with_temperature(0.1)
            .with_max_tokens(16000);
        assert_eq!(opts.temperature, Some(0.1));
        assert_eq!(opts.max_tokens, Some(16000));
        assert_eq!(opts.model, None);
    }
}
