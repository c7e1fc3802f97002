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

use super::{LlmProvider, error_for_status, http_client};
use crate::llm::types::{LlmConfig, LlmError, LlmRequest, LlmResponse, LlmRole};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 256;

/// Anthropic messages API provider
pub struct AnthropicProvider {
    config: LlmConfig,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        if config.api_key.is_none() {
            return Err(LlmError::Config(
                "Anthropic requires an API key".to_string(),
            ));
        }
        let client = http_client(&config)?;
        Ok(Self { config, client })
    }
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: LlmRole,
    content: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    model: String,
    stop_reason: Option<String>,
    usage: Option<AnthropicUsage>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

impl AnthropicRequest {
    fn from_request(request: LlmRequest) -> Self {
        let system = request.system_prompt();
        let messages = request
            .messages
            .into_iter()
            .filter(|m| m.role != LlmRole::System)
            .map(|m| AnthropicMessage {
                role: m.role,
                content: m.content,
            })
            .collect();
        Self {
            model: request.model,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system,
            messages,
            temperature: request.temperature,
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| LlmError::Auth("No API key configured".to_string()))?;

        let anthropic_request = AnthropicRequest::from_request(request);

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .header("Content-Type", "application/json")
            .json(&anthropic_request)
            .send()
            .await
            .map_err(LlmError::from_reqwest)?;
        let response = error_for_status(response).await?;

        let anthropic_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Api(format!("Failed to parse response: {}", e)))?;

        let content = anthropic_response
            .content
            .iter()
            .filter(|c| c.kind == "text")
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("");
        if content.is_empty() {
            return Err(LlmError::Api("No text content in response".to_string()));
        }

        Ok(LlmResponse {
            content,
            model: anthropic_response.model,
            prompt_tokens: anthropic_response.usage.as_ref().map(|u| u.input_tokens),
            completion_tokens: anthropic_response.usage.as_ref().map(|u| u.output_tokens),
            finish_reason: anthropic_response.stop_reason,
        })
    }

    async fn is_available(&self) -> bool {
        self.client
            .get(&self.config.endpoint)
            .send()
            .await
            .is_ok()
    }

    fn name(&self) -> &str {
        "Anthropic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::LlmMessage;

    #[test]
    fn test_system_prompt_is_lifted() {
        let request = LlmRequest::new("claude-3-5-haiku-20241022")
            .with_message(LlmMessage::system("You are The Oracle."))
            .with_message(LlmMessage::user("Alice: hello"))
            .with_max_tokens(80);
        let body = serde_json::to_value(AnthropicRequest::from_request(request)).unwrap();
        assert_eq!(body["system"], "You are The Oracle.");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["max_tokens"], 80);
    }

    #[test]
    fn test_response_shape() {
        let body = r#"{
            "model": "claude-3-5-haiku-20241022",
            "content": [{"type": "text", "text": "Wise observation."}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 20, "output_tokens": 4}
        }"#;
        let response: AnthropicResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.content[0].kind, "text");
        assert_eq!(response.content[0].text, "Wise observation.");
        assert_eq!(response.usage.unwrap().output_tokens, 4);
    }
}
