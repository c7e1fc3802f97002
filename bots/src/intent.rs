//
// Copyright 2025-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Intent interpreter
//!
//! Turns a free-text player request into a structured [`Intent`] by asking
//! the completion service for a single JSON object. Any failure degrades to
//! a low-confidence `chat` intent.

use crate::actions::{ActionRequest, Params};
use crate::llm::{Completion, LlmError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Placeholder target the model may use for the requester
pub const REQUESTER_PLACEHOLDER: &str = "PLAYER_NAME";

/// Action every agent falls back to
pub const CHAT_ACTION: &str = "chat";

/// Confidence of the fallback intent
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

const INTERPRET_MAX_TOKENS: u32 = 150;

/// First `{` through last `}`, across lines
static JSON_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("intent pattern compiles"));

/// Structured interpretation of a player request
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Intent {
    pub action: String,
    #[serde(default)]
    pub params: Params,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    FALLBACK_CONFIDENCE
}

impl Intent {
    /// The low-confidence free-form conversation intent
    pub fn chat() -> Self {
        Self {
            action: CHAT_ACTION.to_string(),
            params: Params::new(),
            confidence: FALLBACK_CONFIDENCE,
        }
    }

    pub fn is_chat(&self) -> bool {
        self.action == CHAT_ACTION
    }

    /// String parameter, trimmed
    pub fn param(&self, key: &str) -> Option<String> {
        self.params
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    pub fn to_request(&self) -> ActionRequest {
        ActionRequest::with_params(self.action.clone(), self.params.clone())
    }
}

/// Why a reply could not be turned into an [`Intent`]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntentError {
    #[error("Completion failed: {0}")]
    Service(#[from] LlmError),
    #[error("No JSON object in reply")]
    NoJson,
    #[error("Malformed intent: {0}")]
    Parse(String),
}

/// Interprets requests against a fixed action vocabulary
pub struct IntentInterpreter {
    completion: Arc<dyn Completion>,
    actions: Vec<String>,
}

impl IntentInterpreter {
    pub fn new(completion: Arc<dyn Completion>, actions: Vec<String>) -> Self {
        Self {
            completion,
            actions,
        }
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    /// Interpret `message` from `from_player`. Never fails.
    pub async fn interpret(&self, message: &str, from_player: &str) -> Intent {
        match self.try_interpret(message, from_player).await {
            Ok(intent) => {
                tracing::debug!(
                    "Interpreted '{}' from {} as {} ({:.2})",
                    message,
                    from_player,
                    intent.action,
                    intent.confidence
                );
                intent
            }
            Err(error) => {
                tracing::debug!("Falling back to chat for '{}': {}", message, error);
                Intent::chat()
            }
        }
    }

    pub async fn try_interpret(
        &self,
        message: &str,
        from_player: &str,
    ) -> Result<Intent, IntentError> {
        let prompt = self.prompt(message, from_player);
        let reply = self
            .completion
            .complete(&prompt, INTERPRET_MAX_TOKENS)
            .await?;
        parse_intent(&reply, from_player)
    }

    fn prompt(&self, message: &str, from_player: &str) -> String {
        format!(
            "Interpret Minecraft request. Actions: {}\n\
             JSON only: {{\"action\": \"name\", \"params\": {{...}}, \"confidence\": 0.9}}\n\
             Use \"{}\" as the target when the player means themselves.\n\
             Player \"{}\": \"{}\"",
            self.actions.join(", "),
            REQUESTER_PLACEHOLDER,
            from_player,
            message
        )
    }
}

/// Extract and decode the intent object from a completion reply
pub fn parse_intent(reply: &str, from_player: &str) -> Result<Intent, IntentError> {
    let json = JSON_OBJECT.find(reply).ok_or(IntentError::NoJson)?;
    let mut intent: Intent =
        serde_json::from_str(json.as_str()).map_err(|e| IntentError::Parse(e.to_string()))?;

    intent.action = intent.action.trim().to_lowercase();
    if intent.action.is_empty() {
        return Err(IntentError::Parse("empty action".to_string()));
    }
    intent.confidence = if intent.confidence.is_finite() {
        intent.confidence.clamp(0.0, 1.0)
    } else {
        FALLBACK_CONFIDENCE
    };
    if intent.params.get("target").and_then(Value::as_str) == Some(REQUESTER_PLACEHOLDER) {
        intent
            .params
            .insert("target".to_string(), Value::String(from_player.to_string()));
    }
    Ok(intent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockCompletion;
    use serde_json::json;

    fn interpreter(mock: MockCompletion) -> IntentInterpreter {
        IntentInterpreter::new(
            Arc::new(mock),
            vec!["follow".into(), "mine".into(), "chat".into()],
        )
    }

    #[test]
    fn test_parse_surrounded_json() {
        let reply = "Sure! Here you go:\n{\"action\": \"Mine\", \"params\": {\"block\": \"iron_ore\", \"count\": 3}, \"confidence\": 0.8}\nHope that helps.";
        let intent = parse_intent(reply, "Alice").unwrap();
        assert_eq!(intent.action, "mine");
        assert_eq!(intent.params["count"], json!(3));
        assert_eq!(intent.confidence, 0.8);
    }

    #[test]
    fn test_placeholder_target_is_replaced() {
        let reply = r#"{"action":"follow","params":{"target":"PLAYER_NAME"},"confidence":0.95}"#;
        let intent = parse_intent(reply, "Alice").unwrap();
        assert_eq!(intent.param("target").as_deref(), Some("Alice"));
    }

    #[test]
    fn test_confidence_is_clamped_and_defaulted() {
        let intent = parse_intent(r#"{"action":"stop","confidence":7}"#, "Alice").unwrap();
        assert_eq!(intent.confidence, 1.0);
        let intent = parse_intent(r#"{"action":"stop"}"#, "Alice").unwrap();
        assert_eq!(intent.confidence, FALLBACK_CONFIDENCE);
        assert!(intent.params.is_empty());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_intent("I think they want to mine.", "Alice"),
            Err(IntentError::NoJson)
        );
        assert!(matches!(
            parse_intent("{not json}", "Alice"),
            Err(IntentError::Parse(_))
        ));
        assert!(matches!(
            parse_intent(r#"{"action":"  "}"#, "Alice"),
            Err(IntentError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_reply_without_json_falls_back_to_chat() {
        let mut mock = MockCompletion::new();
        mock.expect_complete()
            .times(1)
            .returning(|_, _| Ok("Let's go mining together!".to_string()));
        let intent = interpreter(mock).interpret("mine with me", "Alice").await;
        assert_eq!(intent, Intent::chat());
        assert_eq!(intent.confidence, 0.5);
    }

    #[tokio::test]
    async fn test_service_failure_falls_back_to_chat() {
        let mut mock = MockCompletion::new();
        mock.expect_complete()
            .returning(|_, _| Err(LlmError::Network("refused".into())));
        let intent = interpreter(mock).interpret("follow me", "Alice").await;
        assert!(intent.is_chat());
    }

    #[tokio::test]
    async fn test_prompt_lists_vocabulary() {
        let mut mock = MockCompletion::new();
        mock.expect_complete()
            .withf(|prompt, max_tokens| {
                prompt.contains("Actions: follow, mine, chat")
                    && prompt.contains("Player \"Alice\": \"follow me\"")
                    && *max_tokens == INTERPRET_MAX_TOKENS
            })
            .returning(|_, _| {
                Ok(r#"{"action":"follow","params":{"target":"PLAYER_NAME"},"confidence":0.9}"#
                    .to_string())
            });
        let intent = interpreter(mock).interpret("follow me", "Alice").await;
        assert_eq!(intent.to_request().str_param("target").as_deref(), Some("Alice"));
        assert_eq!(intent.action, "follow");
    }
}
