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

/// Google Gemini generateContent provider
pub struct GeminiProvider {
    config: LlmConfig,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        if config.api_key.is_none() {
            return Err(LlmError::Config("Gemini requires an API key".to_string()));
        }
        let client = http_client(&config)?;
        Ok(Self { config, client })
    }

    fn url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            model
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

impl GeminiRequest {
    fn from_request(request: &LlmRequest) -> Self {
        let system_instruction = request.system_prompt().map(|text| GeminiContent {
            role: None,
            parts: vec![GeminiPart { text }],
        });
        let contents = request
            .messages
            .iter()
            .filter(|m| m.role != LlmRole::System)
            .map(|m| GeminiContent {
                role: Some(match m.role {
                    LlmRole::Assistant => "model".to_string(),
                    _ => "user".to_string(),
                }),
                parts: vec![GeminiPart {
                    text: m.content.clone(),
                }],
            })
            .collect();
        let generation_config = if request.temperature.is_some() || request.max_tokens.is_some() {
            Some(GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            })
        } else {
            None
        };
        Self {
            contents,
            system_instruction,
            generation_config,
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| LlmError::Auth("No API key configured".to_string()))?;

        let gemini_request = GeminiRequest::from_request(&request);

        let response = self
            .client
            .post(self.url(&request.model))
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&gemini_request)
            .send()
            .await
            .map_err(LlmError::from_reqwest)?;
        let response = error_for_status(response).await?;

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Api(format!("Failed to parse response: {}", e)))?;

        let candidate = gemini_response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Api("No candidates in response".to_string()))?;
        let content = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            model: request.model,
            prompt_tokens: gemini_response
                .usage_metadata
                .as_ref()
                .and_then(|u| u.prompt_token_count),
            completion_tokens: gemini_response
                .usage_metadata
                .as_ref()
                .and_then(|u| u.candidates_token_count),
            finish_reason: candidate.finish_reason,
        })
    }

    async fn is_available(&self) -> bool {
        self.client
            .get(format!("{}/models", self.config.endpoint.trim_end_matches('/')))
            .send()
            .await
            .is_ok()
    }

    fn name(&self) -> &str {
        "Gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::LlmMessage;

    #[test]
    fn test_model_url() {
        let provider = GeminiProvider::new(LlmConfig::gemini("key", "gemini-2.5-flash")).unwrap();
        assert_eq!(
            provider.url("gemini-2.5-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_request_shape() {
        let request = LlmRequest::new("gemini-2.5-flash")
            .with_message(LlmMessage::system("You are The Explorer."))
            .with_message(LlmMessage::user("Any threats?"))
            .with_max_tokens(100);
        let body = serde_json::to_value(GeminiRequest::from_request(&request)).unwrap();
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You are The Explorer.");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 100);
    }

    #[test]
    fn test_response_shape() {
        let body = r#"{
            "candidates": [{"content": {"role": "model", "parts": [{"text": "All clear!"}]}, "finishReason": "STOP"}],
            "usageMetadata": {"promptTokenCount": 9, "candidatesTokenCount": 3}
        }"#;
        let response: GeminiResponse = serde_json::from_str(body).unwrap();
        let candidate = &response.candidates[0];
        assert_eq!(candidate.content.as_ref().unwrap().parts[0].text, "All clear!");
        assert_eq!(candidate.finish_reason.as_deref(), Some("STOP"));
    }
}
