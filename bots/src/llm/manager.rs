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

//! LLM Manager for coordinating multiple providers

use super::client::LlmClient;
use super::types::{LlmConfig, LlmError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Registry of named completion clients.
///
/// Agents reference a provider by name; every agent naming the same provider
/// shares one client (and therefore one resolved model).
pub struct LlmManager {
    clients: Arc<RwLock<HashMap<String, Arc<LlmClient>>>>,
}

impl LlmManager {
    /// Create a new LLM manager
    pub fn new() -> Self {
        Self {
            clients: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a provider
    pub async fn register_provider(
        &self,
        name: impl Into<String>,
        config: LlmConfig,
    ) -> Result<(), LlmError> {
        let name = name.into();
        let client = LlmClient::new(config)?;
        tracing::debug!("Registered LLM provider '{}' ({})", name, client.provider_name());
        self.clients.write().await.insert(name, Arc::new(client));
        Ok(())
    }

    /// Get the client registered under a name
    pub async fn client(&self, name: &str) -> Result<Arc<LlmClient>, LlmError> {
        self.clients.read().await.get(name).cloned().ok_or_else(|| {
            LlmError::ProviderUnavailable(format!("Provider '{}' not found", name))
        })
    }

    /// List all registered providers
    pub async fn list_providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.clients.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Remove a provider
    pub async fn remove_provider(&self, name: &str) -> Result<(), LlmError> {
        self.clients
            .write()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| LlmError::ProviderUnavailable(format!("Provider '{}' not found", name)))
    }
}

impl Default for LlmManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manager_creation() {
        let manager = LlmManager::new();
        assert_eq!(manager.list_providers().await.len(), 0);
    }

    #[tokio::test]
    async fn test_register_provider() {
        let manager = LlmManager::new();
        let config = LlmConfig::ollama("http://localhost:11434/api/chat", "llama3");

        let result = manager.register_provider("local", config).await;
        assert!(result.is_ok());
        assert_eq!(manager.list_providers().await, vec!["local".to_string()]);

        let client = manager.client("local").await.unwrap();
        assert_eq!(client.provider_name(), "Ollama");
    }

    #[tokio::test]
    async fn test_clients_are_shared() {
        let manager = LlmManager::new();
        manager
            .register_provider("claude", LlmConfig::anthropic("key", "claude-3-5-haiku-20241022"))
            .await
            .unwrap();

        let a = manager.client("claude").await.unwrap();
        let b = manager.client("claude").await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_unknown_and_removed_provider() {
        let manager = LlmManager::new();
        assert!(matches!(
            manager.client("gpt").await,
            Err(LlmError::ProviderUnavailable(_))
        ));

        manager
            .register_provider("gpt", LlmConfig::openai("key", "gpt-4o-mini"))
            .await
            .unwrap();
        manager.remove_provider("gpt").await.unwrap();
        assert!(manager.client("gpt").await.is_err());
        assert!(manager.remove_provider("gpt").await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let manager = LlmManager::new();
        let mut config = LlmConfig::anthropic("key", "claude-3-5-haiku-20241022");
        config.api_key = None;
        assert!(manager.register_provider("claude", config).await.is_err());
        assert!(manager.list_providers().await.is_empty());
    }
}
