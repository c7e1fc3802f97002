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

//! Common types for LLM integration

use serde::{Deserialize, Serialize};
use std::fmt;

/// LLM message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for LlmRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmRole::System => write!(f, "system"),
            LlmRole::User => write!(f, "user"),
            LlmRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A message in an LLM conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: LlmRole,
    pub content: String,
}

impl LlmMessage {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: LlmRole::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: LlmRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: LlmRole::Assistant,
            content: content.into(),
        }
    }
}

/// LLM request parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// Conversation history
    pub messages: Vec<LlmMessage>,
    /// Model to use (provider-specific)
    pub model: String,
    /// Temperature (0.0 - 2.0, higher = more random)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl LlmRequest {
    /// Create a new LLM request
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Add a message to the request
    pub fn with_message(mut self, message: LlmMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Concatenated system messages, for providers that carry the system
    /// prompt outside of the message list.
    pub fn system_prompt(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .messages
            .iter()
            .filter(|m| m.role == LlmRole::System)
            .map(|m| m.content.as_str())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }
}

/// LLM response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Generated content
    pub content: String,
    /// Model used
    pub model: String,
    /// Tokens used in prompt
    pub prompt_tokens: Option<u32>,
    /// Tokens generated
    pub completion_tokens: Option<u32>,
    /// Finish reason
    pub finish_reason: Option<String>,
}

impl LlmResponse {
    /// Create a new response
    pub fn new(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            prompt_tokens: None,
            completion_tokens: None,
            finish_reason: None,
        }
    }
}

/// LLM error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LlmError {
    /// Network or connection error
    #[error("Network error: {0}")]
    Network(String),
    /// API error (invalid request, rate limit, malformed reply)
    #[error("API error: {0}")]
    Api(String),
    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(String),
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
    /// Provider not available
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Timeout
    #[error("Timeout: {0}")]
    Timeout(String),
    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl LlmError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, LlmError::Network(_) | LlmError::Timeout(_))
    }

    pub(crate) fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            LlmError::Timeout(format!("Request timed out: {}", error))
        } else {
            LlmError::Network(format!("Request failed: {}", error))
        }
    }
}

/// Supported provider APIs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Anthropic,
    /// OpenAI chat completions, or any compatible local endpoint
    #[serde(alias = "lmstudio")]
    OpenAi,
    Gemini,
    Ollama,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Anthropic => write!(f, "anthropic"),
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Gemini => write!(f, "gemini"),
            ProviderKind::Ollama => write!(f, "ollama"),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider API
    pub provider: ProviderKind,
    /// API endpoint URL
    pub endpoint: String,
    /// API key (if required)
    pub api_key: Option<String>,
    /// Preferred model
    pub default_model: String,
    /// Models to probe, in order, when the preferred model does not answer
    #[serde(default)]
    pub fallback_models: Vec<String>,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Maximum retries of transient failures
    pub max_retries: u32,
}

impl LlmConfig {
    /// Create Anthropic configuration
    pub fn anthropic(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: ProviderKind::Anthropic,
            endpoint: "https://api.anthropic.com/v1/messages".to_string(),
            api_key: Some(api_key.into()),
            default_model: model.into(),
            fallback_models: Vec::new(),
            timeout_seconds: 30,
            max_retries: 2,
        }
    }

    /// Create OpenAI configuration
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: Some(api_key.into()),
            default_model: model.into(),
            fallback_models: Vec::new(),
            timeout_seconds: 30,
            max_retries: 2,
        }
    }

    /// Create Gemini configuration
    pub fn gemini(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: ProviderKind::Gemini,
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: Some(api_key.into()),
            default_model: model.into(),
            fallback_models: Vec::new(),
            timeout_seconds: 30,
            max_retries: 2,
        }
    }

    /// Create Ollama configuration
    pub fn ollama(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: ProviderKind::Ollama,
            endpoint: endpoint.into(),
            api_key: None,
            default_model: model.into(),
            fallback_models: Vec::new(),
            timeout_seconds: 60,
            max_retries: 2,
        }
    }

    /// Add fallback models to probe after the default
    pub fn with_fallback_models(mut self, models: Vec<String>) -> Self {
        self.fallback_models = models;
        self
    }

    /// Default model followed by every fallback, without duplicates
    pub fn candidate_models(&self) -> Vec<String> {
        let mut models = vec![self.default_model.clone()];
        for model in &self.fallback_models {
            if !models.contains(model) {
                models.push(model.clone());
            }
        }
        models
    }
}
