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

//! Completion capability and its provider-backed client

use super::providers::{LlmProvider, create_provider};
use super::types::{LlmConfig, LlmError, LlmMessage, LlmRequest};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::OnceCell;

const PROBE_PROMPT: &str = "test";
const PROBE_MAX_TOKENS: u32 = 5;
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// A single fallible text completion.
///
/// This is everything the agent runtime needs from a language model.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError>;
}

/// Adapts one provider to [`Completion`].
///
/// The model is resolved lazily on first use: with fallback models
/// configured, each candidate gets a tiny probe request and the first one
/// that answers is kept for the life of the client.
pub struct LlmClient {
    provider: Box<dyn LlmProvider>,
    config: LlmConfig,
    model: OnceCell<String>,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let provider = create_provider(config.clone())?;
        Ok(Self::with_provider(provider, config))
    }

    pub fn with_provider(provider: Box<dyn LlmProvider>, config: LlmConfig) -> Self {
        Self {
            provider,
            config,
            model: OnceCell::new(),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// The resolved model, if probing already ran
    pub fn model(&self) -> Option<&str> {
        self.model.get().map(String::as_str)
    }

    async fn resolve_model(&self) -> Result<&str, LlmError> {
        let model = self
            .model
            .get_or_try_init(|| async {
                if self.config.fallback_models.is_empty() {
                    return Ok(self.config.default_model.clone());
                }
                for model in self.config.candidate_models() {
                    let probe = LlmRequest::new(model.clone())
                        .with_message(LlmMessage::user(PROBE_PROMPT))
                        .with_max_tokens(PROBE_MAX_TOKENS);
                    match self.provider.complete(probe).await {
                        Ok(_) => {
                            tracing::info!("[{}] Using model: {}", self.provider.name(), model);
                            return Ok(model);
                        }
                        Err(e) => {
                            tracing::warn!(
                                "[{}] Model {} not available: {}",
                                self.provider.name(),
                                model,
                                e
                            );
                        }
                    }
                }
                Err(LlmError::ProviderUnavailable(format!(
                    "No {} model available",
                    self.provider.name()
                )))
            })
            .await?;
        Ok(model.as_str())
    }

    async fn send(&self, request: LlmRequest) -> Result<String, LlmError> {
        let mut attempt = 0;
        loop {
            match self.provider.complete(request.clone()).await {
                Ok(response) => return Ok(response.content.trim().to_string()),
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    tracing::debug!(
                        "[{}] Transient failure (attempt {}): {}",
                        self.provider.name(),
                        attempt,
                        e
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl Completion for LlmClient {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        let model = self.resolve_model().await?;
        let request = LlmRequest::new(model)
            .with_message(LlmMessage::user(prompt))
            .with_max_tokens(max_tokens);
        self.send(request).await
    }
}
