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


//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use triad_bots::agent::{Agent, AgentSettings, PeerSet};
use triad_bots::decision::{PersonaKind, Timing};
pub use triad_bots::testing::{FakeWorld, ScriptedCompletion};
pub use triad_common::{BlockPos, EntityId, EntityKind, Vec3, WorldCall, WorldEvent};

pub const TEAM: [&str; 3] = ["TheOracle", "TheArchitect", "TheExplorer"];

/// One agent wired to an in-memory world and a scripted completion service
pub struct Harness {
    pub world: Arc<FakeWorld>,
    pub completion: Arc<ScriptedCompletion>,
    pub agent: Arc<Agent>,
    pub shutdown: CancellationToken,
}

impl Harness {
    pub fn new(persona: PersonaKind) -> Self {
        Self::with_timing(persona, |timing| timing)
    }

    /// Harness whose persona timing is adjusted by `tune`
    pub fn with_timing(persona: PersonaKind, tune: impl FnOnce(Timing) -> Timing) -> Self {
        let name = agent_name(persona);
        let world = Arc::new(FakeWorld::new(name));
        let completion = Arc::new(ScriptedCompletion::new());
        let shutdown = CancellationToken::new();
        let settings = AgentSettings::new(name, persona, "Alice", PeerSet::new(TEAM));
        let timing = tune(settings.timing);
        let agent = Agent::new(
            settings.with_timing(timing),
            world.clone(),
            completion.clone(),
            shutdown.clone(),
        );
        Self {
            world,
            completion,
            agent,
            shutdown,
        }
    }

    /// Put Alice a few blocks away and return her entity
    pub fn add_alice(&self) -> EntityId {
        self.world.add_player("Alice", Vec3::new(5.0, 64.0, 0.0))
    }
}

pub fn agent_name(persona: PersonaKind) -> &'static str {
    match persona {
        PersonaKind::Oracle => "TheOracle",
        PersonaKind::Architect => "TheArchitect",
        PersonaKind::Explorer => "TheExplorer",
    }
}

/// `count` block positions in a row starting at (x, 64, 0)
pub fn row(x: i32, count: i32) -> Vec<BlockPos> {
    (0..count).map(|i| BlockPos::new(x + i, 64, 0)).collect()
}

/// An intent reply the way a completion service would phrase it
pub fn intent_reply(action: &str, params: &str) -> String {
    format!(
        "Sure! {{\"action\": \"{}\", \"params\": {}, \"confidence\": 0.9}}",
        action, params
    )
}
