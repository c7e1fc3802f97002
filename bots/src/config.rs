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

use crate::agent::{AgentSettings, PeerSet};
use crate::decision::{PersonaKind, TimingOverrides};
use crate::llm::{LlmConfig, ProviderKind};
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_env_field::EnvField;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Arguments {
    #[arg(
        short = 'c',
        long = "config",
        help = "Path to configuration file",
        default_value = "bots/config.yaml"
    )]
    pub config_file: String,

    #[arg(
        short = 'e',
        long = "env",
        help = "Path to environment file",
        default_value = "bots/.env"
    )]
    pub env_file: Option<String>,

    #[arg(
        short = 'a',
        long = "agent",
        help = "Run only the named agent (repeatable); default is every configured agent"
    )]
    pub agents: Vec<String>,
}

impl Default for Arguments {
    fn default() -> Self {
        Self {
            config_file: "config.yaml".to_string(),
            env_file: Some(".env".to_string()),
            agents: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Configuration {
    pub world: WorldConfig,
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderConfig>,
    #[serde(default)]
    pub agents: Vec<AgentConfig>,
}

impl Configuration {
    pub fn load(path: &str) -> Result<Configuration, String> {
        let conf: Configuration = serde_yaml::from_reader(
            std::fs::File::open(path).map_err(|e| format!("Failed to open config file: {}", e))?,
        )
        .map_err(|e| format!("Failed to parse config file: {}", e))?;

        conf.validate()?;
        Ok(conf)
    }

    /// Reject duplicate agent names, references to unknown providers and
    /// timing overrides the runtime cannot honour
    pub fn validate(&self) -> Result<(), String> {
        let mut names = HashSet::new();
        for agent in &self.agents {
            if !names.insert(agent.name.as_str()) {
                return Err(format!("Duplicate agent name: {}", agent.name));
            }
            if !self.providers.contains_key(&agent.provider) {
                return Err(format!(
                    "Agent {} references unknown provider: {}",
                    agent.name, agent.provider
                ));
            }
            agent
                .timing
                .validate()
                .map_err(|e| format!("Agent {} has invalid timing: {}", agent.name, e))?;
        }
        Ok(())
    }

    /// Every configured agent name, shared by all agents
    pub fn peers(&self) -> PeerSet {
        PeerSet::new(self.agents.iter().map(|a| a.name.clone()))
    }

    /// Agents selected by name; all of them when `only` is empty
    pub fn selected_agents<'a>(
        &'a self,
        only: &'a [String],
    ) -> Result<Vec<&'a AgentConfig>, String> {
        if let Some(unknown) = only
            .iter()
            .find(|name| !self.agents.iter().any(|a| &a.name == *name))
        {
            return Err(format!("No agent named {} is configured", unknown));
        }
        Ok(self
            .agents
            .iter()
            .filter(|a| only.is_empty() || only.contains(&a.name))
            .collect())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Address of the world-client bridge
    pub bridge: EnvField<String>,
    #[serde(default = "default_spawn_timeout")]
    pub spawn_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_spawn_timeout() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    60
}

impl WorldConfig {
    pub fn spawn_timeout(&self) -> Duration {
        Duration::from_secs(self.spawn_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider: ProviderKind,
    pub endpoint: EnvField<String>,
    #[serde(default)]
    pub api_key: Option<EnvField<String>>,
    pub default_model: EnvField<String>,
    #[serde(default)]
    pub fallback_models: Vec<String>,
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_provider_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

impl ProviderConfig {
    pub fn to_llm_config(&self) -> LlmConfig {
        LlmConfig {
            provider: self.provider,
            endpoint: self.endpoint.to_string(),
            api_key: self
                .api_key
                .as_ref()
                .map(|key| key.to_string())
                .filter(|key| !key.is_empty()),
            default_model: self.default_model.to_string(),
            fallback_models: self.fallback_models.clone(),
            timeout_seconds: self.timeout_seconds,
            max_retries: self.max_retries,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Login name; also how the other agents recognize this one
    pub name: String,
    pub persona: PersonaKind,
    /// Key into `providers`
    pub provider: String,
    /// Player followed after spawning
    pub primary_player: EnvField<String>,
    #[serde(default)]
    pub timing: TimingOverrides,
}

impl AgentConfig {
    pub fn settings(&self, peers: PeerSet) -> AgentSettings {
        let timing = self.persona.persona().timing.with_overrides(&self.timing);
        AgentSettings::new(&self.name, self.persona, &self.primary_player, peers)
            .with_timing(timing)
    }
}
