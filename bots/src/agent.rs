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

//! Agent runtime
//!
//! One [`Agent`] per controlled entity. Personas only change text, timing
//! and odds; the executor, goal manager and rate limiting are shared code.
//!
//! Handlers are split by concern:
//! - `chat`: chat routing, player requests, peer replies, whispers
//! - `proactive`: proactive checks, team callouts, scouting
//! - `survival`: hurt/swing-arm handling, survival and protection ticks
//! - `runtime`: event loop, timers, spawn/join/death/disconnect

mod chat;
mod proactive;
mod runtime;
mod survival;

pub use chat::ChatRoute;

use crate::actions::ActionExecutor;
use crate::decision::directive::truncate_chars;
use crate::decision::{ChatLog, Persona, PersonaKind, RateLimiter, Timing};
use crate::goals::GoalManager;
use crate::intent::IntentInterpreter;
use crate::llm::Completion;
use crate::world::{World, WorldError};
use rand::Rng;
use rand::seq::IndexedRandom;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use triad_common::EntityId;

/// Public chat budget in characters
pub const SAY_BUDGET: usize = 80;
/// Whisper budget in characters
pub const WHISPER_BUDGET: usize = 100;

/// Names of every configured agent.
///
/// Shared by all agents so peers are never mistaken for human players.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerSet(Arc<BTreeSet<String>>);

impl PeerSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(Arc::new(names.into_iter().map(Into::into).collect()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }
}

/// Construction parameters of one agent
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub name: String,
    pub persona: PersonaKind,
    /// Player followed after spawning
    pub primary_player: String,
    pub peers: PeerSet,
    pub timing: Timing,
}

impl AgentSettings {
    /// Settings with the persona's default timing
    pub fn new(name: &str, persona: PersonaKind, primary_player: &str, peers: PeerSet) -> Self {
        Self {
            name: name.to_string(),
            persona,
            primary_player: primary_player.to_string(),
            peers,
            timing: persona.persona().timing,
        }
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }
}

#[derive(Debug, Default)]
struct AgentState {
    follow_target: Option<String>,
    protect_target: Option<String>,
    /// Identifier only; revalidated against the world on every use
    last_attacker: Option<EntityId>,
}

pub struct Agent {
    name: String,
    persona: &'static Persona,
    timing: Timing,
    primary_player: String,
    peers: PeerSet,
    world: Arc<dyn World>,
    completion: Arc<dyn Completion>,
    executor: Arc<ActionExecutor>,
    goals: Arc<GoalManager>,
    interpreter: IntentInterpreter,
    limiter: RateLimiter,
    chat_log: Mutex<ChatLog>,
    state: Mutex<AgentState>,
    connected: AtomicBool,
    timers_started: AtomicBool,
    shutdown: CancellationToken,
}

impl Agent {
    /// Build an agent; its timers and goals are cancelled with `shutdown`
    pub fn new(
        settings: AgentSettings,
        world: Arc<dyn World>,
        completion: Arc<dyn Completion>,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        let persona = settings.persona.persona();
        let shutdown = shutdown.child_token();
        let executor = Arc::new(ActionExecutor::new(world.clone()));
        let goals = Arc::new(GoalManager::new(
            world.clone(),
            executor.clone(),
            shutdown.clone(),
        ));
        let interpreter = IntentInterpreter::new(completion.clone(), persona.actions());
        Arc::new(Self {
            name: settings.name,
            persona,
            limiter: RateLimiter::new(settings.timing.rate_limits()),
            timing: settings.timing,
            primary_player: settings.primary_player,
            peers: settings.peers,
            world,
            completion,
            executor,
            goals,
            interpreter,
            chat_log: Mutex::new(ChatLog::default()),
            state: Mutex::new(AgentState::default()),
            connected: AtomicBool::new(false),
            timers_started: AtomicBool::new(false),
            shutdown,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn persona(&self) -> &'static Persona {
        self.persona
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn goals(&self) -> &GoalManager {
        &self.goals
    }

    pub fn executor(&self) -> &ActionExecutor {
        &self.executor
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub fn follow_target(&self) -> Option<String> {
        self.lock_state().follow_target.clone()
    }

    pub fn protect_target(&self) -> Option<String> {
        self.lock_state().protect_target.clone()
    }

    pub fn last_attacker(&self) -> Option<EntityId> {
        self.lock_state().last_attacker
    }

    pub fn chat_log(&self) -> ChatLog {
        self.chat_log.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Cancel every timer and in-flight goal
    pub fn shutdown(&self) {
        self.set_connected(false);
        self.shutdown.cancel();
    }

    /// Whether `name` is a human player
    pub fn is_human(&self, name: &str) -> bool {
        name != self.name && !self.peers.contains(name)
    }

    /// Whether a chat line addresses this agent
    pub fn is_mentioned(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        text.contains(&self.name.to_lowercase()) || text.contains(self.persona.alias)
    }

    /// Connected human players, in list order
    async fn human_players(&self) -> Result<Vec<String>, WorldError> {
        Ok(self
            .world
            .players()
            .await?
            .into_iter()
            .map(|p| p.name)
            .filter(|name| self.is_human(name))
            .collect())
    }

    /// Speak on the public channel without touching the rate limiter
    async fn say(&self, text: &str) {
        let text = truncate_chars(text.trim(), SAY_BUDGET);
        if text.is_empty() {
            return;
        }
        tracing::info!("[{}] says: {}", self.name, text);
        if let Err(e) = self.world.chat(&text).await {
            tracing::warn!("[{}] Chat failed: {}", self.name, e);
        }
    }

    /// A reply to a direct request: bypasses the gate but stamps it
    async fn reply(&self, text: &str) {
        self.limiter.stamp_message(tokio::time::Instant::now());
        self.say(text).await;
    }

    async fn whisper(&self, to: &str, text: &str) {
        let text = truncate_chars(text.trim(), WHISPER_BUDGET);
        self.limiter.stamp_message(tokio::time::Instant::now());
        if let Err(e) = self.world.whisper(to, &text).await {
            tracing::warn!("[{}] Whisper to {} failed: {}", self.name, to, e);
        }
    }

    /// Sleep unless the agent shuts down first; `false` when cancelled
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.shutdown.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, AgentState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// `true` with probability `p`; never for NaN
fn roll(p: f64) -> bool {
    !p.is_nan() && rand::rng().random_bool(p.clamp(0.0, 1.0))
}

/// A uniformly chosen line, if any
fn pick(lines: &[&str]) -> Option<String> {
    lines.choose(&mut rand::rng()).map(|s| s.to_string())
}

/// A uniformly chosen duration in `[min, max]`
fn jitter(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let ms = rand::rng().random_range(min.as_millis() as u64..=max.as_millis() as u64);
    Duration::from_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeWorld, ScriptedCompletion};

    fn agent(name: &str, persona: PersonaKind) -> Arc<Agent> {
        let peers = PeerSet::new(["TheOracle", "TheArchitect", "TheExplorer"]);
        Agent::new(
            AgentSettings::new(name, persona, "Alice", peers),
            Arc::new(FakeWorld::new(name)),
            Arc::new(ScriptedCompletion::new()),
            CancellationToken::new(),
        )
    }

    #[test]
    fn test_peers_are_not_humans() {
        let oracle = agent("TheOracle", PersonaKind::Oracle);
        assert!(!oracle.is_human("TheOracle"));
        assert!(!oracle.is_human("TheExplorer"));
        assert!(oracle.is_human("Alice"));
    }

    #[test]
    fn test_mentions() {
        let explorer = agent("TheExplorer", PersonaKind::Explorer);
        assert!(explorer.is_mentioned("hey @theexplorer come here"));
        assert!(explorer.is_mentioned("Gemini, scout please"));
        assert!(!explorer.is_mentioned("oracle, follow me"));
    }

    #[test]
    fn test_jitter_bounds() {
        let min = Duration::from_millis(2000);
        let max = Duration::from_millis(4000);
        for _ in 0..50 {
            let d = jitter(min, max);
            assert!(d >= min && d <= max);
        }
        assert_eq!(jitter(max, min), max);
    }

    #[test]
    fn test_roll_extremes() {
        assert!(roll(1.0));
        assert!(!roll(0.0));
        assert!(roll(7.0));
        assert!(!roll(f64::NAN));
    }

    #[test]
    fn test_shutdown_cancels_child_token() {
        let parent = CancellationToken::new();
        let oracle = Agent::new(
            AgentSettings::new("TheOracle", PersonaKind::Oracle, "Alice", PeerSet::default()),
            Arc::new(FakeWorld::new("TheOracle")),
            Arc::new(ScriptedCompletion::new()),
            parent.clone(),
        );
        oracle.set_connected(true);
        oracle.shutdown();
        assert!(oracle.shutdown_token().is_cancelled());
        assert!(!oracle.is_connected());
        assert!(!parent.is_cancelled());
    }
}
