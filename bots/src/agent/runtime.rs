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

//! Event loop, timers and lifecycle handlers

use super::{Agent, ChatRoute, pick};
use crate::actions::ActionRequest;
use crate::decision::persona::{DEATH_LINE, fill};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use triad_common::WorldEvent;

impl Agent {
    /// Run the agent against a spawned world session.
    ///
    /// Greets, starts the timers and then handles `events` until shutdown or
    /// until the event channel closes. Each event is handled on its own task
    /// so a long goal never blocks chat.
    pub fn start(self: &Arc<Self>, mut events: mpsc::Receiver<WorldEvent>) -> JoinHandle<()> {
        let agent = self.clone();
        tokio::spawn(async move {
            tracing::info!("[{}] Starting as {}", agent.name, agent.persona.title);
            agent.dispatch(WorldEvent::Spawn);
            loop {
                tokio::select! {
                    _ = agent.shutdown.cancelled() => break,
                    event = events.recv() => match event {
                        Some(event) => agent.dispatch(event),
                        None => {
                            tracing::info!("[{}] Event stream ended", agent.name);
                            agent.shutdown();
                            break;
                        }
                    }
                }
            }
            tracing::info!("[{}] Stopped", agent.name);
        })
    }

    fn dispatch(self: &Arc<Self>, event: WorldEvent) {
        let agent = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = agent.shutdown.cancelled() => {}
                _ = agent.handle_event(event) => {}
            }
        });
    }

    /// Handle one lifecycle event to completion
    pub async fn handle_event(self: &Arc<Self>, event: WorldEvent) {
        tracing::debug!("[{}] Event {}", self.name, event.name());
        match event {
            WorldEvent::Spawn => self.on_spawn().await,
            WorldEvent::Chat { from, text } => match self.route_chat(&from, &text) {
                ChatRoute::Peer => {
                    self.respond_to_peer(&from, &text).await;
                }
                ChatRoute::Request => self.handle_chat(&from, &text).await,
                ChatRoute::Own | ChatRoute::Ambient => {}
            },
            WorldEvent::Whisper { from, text } => self.handle_whisper(&from, &text).await,
            WorldEvent::EntityHurt { entity } => match self.world.own_entity().await {
                Ok(own) if own.id == entity => self.on_hurt().await,
                Ok(_) => {}
                Err(e) => tracing::warn!("[{}] Could not check hurt entity: {}", self.name, e),
            },
            WorldEvent::EntitySwingArm { entity } => self.on_swing_arm(entity).await,
            WorldEvent::PlayerJoined { name } => self.on_player_joined(&name).await,
            WorldEvent::Death => {
                tracing::info!("[{}] Died", self.name);
                self.reply(DEATH_LINE).await;
            }
            WorldEvent::Disconnect { reason } => {
                tracing::info!("[{}] Disconnected: {}", self.name, reason);
                self.shutdown();
            }
        }
    }

    async fn on_spawn(self: &Arc<Self>) {
        tracing::info!("[{}] Spawned", self.name);
        self.set_connected(true);
        if !self.timers_started.swap(true, Ordering::SeqCst) {
            self.start_timers();
        }

        if !self.pause(self.timing.spawn_greeting_delay).await {
            return;
        }
        let primary = self.primary_player.clone();
        self.reply(&fill(self.persona.spawn_line, &[("player", &primary)]))
            .await;
        self.auto_equip().await;
        self.follow(&primary).await;
    }

    async fn on_player_joined(&self, name: &str) {
        if !self.persona.greets_joiners || !self.is_human(name) {
            return;
        }
        tracing::info!("[{}] {} joined", self.name, name);
        if !self.pause(self.timing.join_greeting_delay).await {
            return;
        }
        if self.limiter.try_acquire(None, Instant::now()) {
            if let Some(greeting) = pick(self.persona.greetings) {
                self.say(&fill(&greeting, &[("player", name)])).await;
            }
        }
        self.follow(name).await;
    }

    async fn follow(&self, player: &str) {
        self.lock_state().follow_target = Some(player.to_string());
        let result = self
            .executor
            .execute(&ActionRequest::new("follow").with_param("target", player))
            .await;
        if !result.success {
            tracing::info!("[{}] Not following {}: {}", self.name, player, result.message);
        }
    }

    fn start_timers(self: &Arc<Self>) {
        tracing::debug!("[{}] Starting timers", self.name);
        self.spawn_timer("proactive", self.timing.proactive_poll, |agent| async move {
            agent.proactive_check().await;
        });
        self.spawn_timer(
            "team_callout",
            self.timing.team_callout_poll,
            |agent| async move {
                agent.team_callout().await;
            },
        );
        self.spawn_timer("survival", self.timing.survival_poll, |agent| async move {
            agent.survival_check().await;
        });
        self.spawn_timer(
            "protection",
            self.timing.protection_poll,
            |agent| async move {
                agent.protection_tick().await;
            },
        );
    }

    /// Run `tick` every `period` while connected, until shutdown
    fn spawn_timer<F, Fut>(self: &Arc<Self>, label: &'static str, period: Duration, tick: F)
    where
        F: Fn(Arc<Agent>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if period.is_zero() {
            tracing::warn!("[{}] {} timer disabled: zero period", self.name, label);
            return;
        }
        let agent = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = agent.shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        if agent.is_connected() {
                            tick(agent.clone()).await;
                        }
                    }
                }
            }
            tracing::debug!("[{}] {} timer stopped", agent.name, label);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentSettings, PeerSet};
    use crate::decision::PersonaKind;
    use crate::testing::{FakeWorld, ScriptedCompletion};
    use tokio_util::sync::CancellationToken;
    use triad_common::{Vec3, WorldCall};

    fn oracle(world: &Arc<FakeWorld>) -> Arc<Agent> {
        let peers = PeerSet::new(["TheOracle", "TheArchitect", "TheExplorer"]);
        Agent::new(
            AgentSettings::new("TheOracle", PersonaKind::Oracle, "Alice", peers),
            world.clone(),
            Arc::new(ScriptedCompletion::new()),
            CancellationToken::new(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_greets_and_follows_primary() {
        let world = Arc::new(FakeWorld::new("TheOracle"));
        let alice = world.add_player("Alice", Vec3::new(5.0, 64.0, 0.0));
        let agent = oracle(&world);

        agent.handle_event(WorldEvent::Spawn).await;
        assert!(agent.is_connected());
        assert_eq!(
            world.chat_lines(),
            vec!["Oracle online! Following Alice to the End!"]
        );
        assert_eq!(agent.follow_target().as_deref(), Some("Alice"));
        assert!(
            world
                .effector_calls()
                .iter()
                .any(|c| matches!(c, WorldCall::SetPursuitGoal { target, .. } if *target == alice))
        );
        agent.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_greeting_skips_peers() {
        let world = Arc::new(FakeWorld::new("TheOracle"));
        world.add_player("Bob", Vec3::new(3.0, 64.0, 0.0));
        let agent = oracle(&world);

        agent
            .handle_event(WorldEvent::PlayerJoined {
                name: "TheExplorer".to_string(),
            })
            .await;
        assert!(world.chat_lines().is_empty());

        agent
            .handle_event(WorldEvent::PlayerJoined {
                name: "Bob".to_string(),
            })
            .await;
        let lines = world.chat_lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("Bob"));
        assert_eq!(agent.follow_target().as_deref(), Some("Bob"));
    }

    #[tokio::test]
    async fn test_death_and_disconnect() {
        let world = Arc::new(FakeWorld::new("TheOracle"));
        let agent = oracle(&world);
        agent.set_connected(true);

        agent.handle_event(WorldEvent::Death).await;
        assert_eq!(world.chat_lines(), vec![DEATH_LINE]);
        assert!(!agent.rate_limiter().can_speak(Instant::now()));

        agent
            .handle_event(WorldEvent::Disconnect {
                reason: "kicked".to_string(),
            })
            .await;
        assert!(!agent.is_connected());
        assert!(agent.shutdown_token().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_loop_ends_with_channel() {
        let world = Arc::new(FakeWorld::new("TheOracle"));
        let agent = oracle(&world);
        let (tx, rx) = mpsc::channel(4);

        let handle = agent.start(rx);
        drop(tx);
        handle.await.unwrap();
        assert!(agent.shutdown_token().is_cancelled());
    }
}
