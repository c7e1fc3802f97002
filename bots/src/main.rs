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

use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use triad_bots::agent::Agent;
use triad_bots::config::{Arguments, Configuration};
use triad_bots::llm::LlmManager;
use triad_bots::world::{BridgeWorld, wait_for_spawn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load arguments from the command line
    let arguments: Arguments = Parser::parse();

    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .with_ansi(true)
        .init();

    // Load environment variables from .env file if specified
    if let Some(ref env_file) = arguments.env_file {
        if std::path::Path::new(env_file).exists() {
            tracing::debug!("Loading environment variables from file: {}", env_file);
            dotenv::from_filename(env_file).ok();
        }
    } else {
        tracing::debug!("Loading environment variables from default file");
        dotenv::dotenv().ok();
    }

    // Load configuration from a file with environment variable substitution
    let config = Configuration::load(&arguments.config_file)?;
    tracing::debug!(
        "Configuration loaded: {} providers, {} agents",
        config.providers.len(),
        config.agents.len()
    );
    tracing::info!("Starting Triad...");

    let llm = LlmManager::new();
    for (name, provider) in &config.providers {
        llm.register_provider(name.clone(), provider.to_llm_config())
            .await?;
    }
    tracing::info!("Registered providers: {}", llm.list_providers().await.join(", "));

    let peers = config.peers();
    let shutdown = CancellationToken::new();
    let mut agents = Vec::new();

    for agent_config in config.selected_agents(&arguments.agents)? {
        let (world, mut events) =
            BridgeWorld::connect(&config.world.bridge, config.world.request_timeout()).await?;
        world.join(&agent_config.name).await?;

        // Spawn timeout aborts startup
        tracing::info!("Waiting for {} to spawn", agent_config.name);
        if let Err(e) = wait_for_spawn(&mut events, config.world.spawn_timeout()).await {
            tracing::error!("{} failed to spawn: {}", agent_config.name, e);
            shutdown.cancel();
            return Err(e.into());
        }

        let completion = llm.client(&agent_config.provider).await?;
        let agent = Agent::new(
            agent_config.settings(peers.clone()),
            Arc::new(world),
            completion,
            shutdown.clone(),
        );
        agents.push(agent.start(events));
    }

    // Stop every agent on Ctrl-C
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
            signal_token.cancel();
        }
    });

    for result in futures::future::join_all(agents).await {
        if let Err(e) = result {
            tracing::error!("Agent task failed: {}", e);
        }
    }
    tracing::info!("All agents stopped");
    Ok(())
}
