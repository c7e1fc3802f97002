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


//! Triad Agent Library
//!
//! The coordination and control core for a small team of agents sharing one
//! block world: an action executor, a goal manager, a rate-limited decision
//! loop per agent and a language-model intent interpreter.

pub mod actions;
pub mod agent;
pub mod config;
pub mod decision;
pub mod goals;
pub mod intent;
pub mod llm;
pub mod testing;
pub mod world;

// Re-export commonly used types
pub use actions::{ActionExecutor, ActionRequest, ActionResult};
pub use agent::{Agent, AgentSettings, PeerSet};
pub use goals::{GoalKind, GoalManager};
pub use intent::{Intent, IntentInterpreter};
pub use world::{World, WorldError};
