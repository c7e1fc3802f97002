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

//! LLM provider implementations

mod anthropic;
mod gemini;
mod ollama;
mod openai;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use super::types::{LlmConfig, LlmError, LlmRequest, LlmResponse, ProviderKind};
use async_trait::async_trait;

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a request to the LLM
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Check if the provider is available
    async fn is_available(&self) -> bool;

    /// Get provider name
    fn name(&self) -> &str;
}

/// Build the provider binding named by the configuration
pub fn create_provider(config: LlmConfig) -> Result<Box<dyn LlmProvider>, LlmError> {
    let provider: Box<dyn LlmProvider> = match config.provider {
        ProviderKind::Anthropic => Box::new(AnthropicProvider::new(config)?),
        ProviderKind::OpenAi => Box::new(OpenAiProvider::new(config)?),
        ProviderKind::Gemini => Box::new(GeminiProvider::new(config)?),
        ProviderKind::Ollama => Box::new(OllamaProvider::new(config)?),
    };
    Ok(provider)
}

fn http_client(config: &LlmConfig) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.timeout_seconds))
        .build()
        .map_err(|e| LlmError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Map a non-success HTTP status to the matching error
async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    let message = format!("API returned {}: {}", status, error_text);
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        Err(LlmError::Auth(message))
    } else if status == reqwest::StatusCode::NOT_FOUND {
        Err(LlmError::ProviderUnavailable(message))
    } else if status.is_server_error() {
        Err(LlmError::Network(message))
    } else {
        Err(LlmError::Api(message))
    }
}
