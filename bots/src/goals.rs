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

//! Goal manager
//!
//! Sequences executor actions into named multi-step objectives. At most one
//! goal runs per agent; a start request while one is running is rejected,
//! never queued. The running flag is released by a guard, so every exit path
//! (success, failure, world error, cancellation) leaves the manager idle.

use crate::actions::{ActionError, ActionExecutor, ActionRequest, ActionResult};
use crate::world::lexicon::{
    self, CROPS, HUNTABLE_ANIMALS, SHELTER_MATERIALS, STRUCTURE_HINTS, WOOD_LOGS,
};
use crate::world::World;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use triad_common::{EntityKind, Vec3};
use uuid::Uuid;

const IRON_RADIUS: f64 = 32.0;
const IRON_BATCH: usize = 3;
const DIAMOND_RADIUS: f64 = 64.0;
const DIAMOND_BATCH: usize = 5;
const DIAMOND_ORES: &[&str] = &["diamond_ore", "deepslate_diamond_ore"];
const EXPLORE_OFFSET: f64 = 50.0;
const EXPLORE_RADIUS: f64 = 60.0;
const SHELTER_MIN_STACK: u32 = 20;
const SHELTER_DIRT_BATCH: usize = 30;
const WOOD_BATCH: usize = 10;
const FOOD_RADIUS: f64 = 32.0;

/// The fixed set of goal procedures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GoalKind {
    MineDiamonds,
    Explore,
    BuildShelter,
    GatherWood,
    GatherFood,
    Defend,
}

impl GoalKind {
    pub fn name(&self) -> &'static str {
        match self {
            GoalKind::MineDiamonds => "mine_diamonds",
            GoalKind::Explore => "explore",
            GoalKind::BuildShelter => "build_shelter",
            GoalKind::GatherWood => "gather_wood",
            GoalKind::GatherFood => "gather_food",
            GoalKind::Defend => "defend",
        }
    }
}

impl FromStr for GoalKind {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mine_diamonds" | "diamonds" => Ok(GoalKind::MineDiamonds),
            "explore" | "scout" => Ok(GoalKind::Explore),
            "build_shelter" | "shelter" => Ok(GoalKind::BuildShelter),
            "gather_wood" | "wood" => Ok(GoalKind::GatherWood),
            "gather_food" | "food" => Ok(GoalKind::GatherFood),
            "defend" | "guard" => Ok(GoalKind::Defend),
            _ => Err(ActionError::UnknownGoal(s.to_string())),
        }
    }
}

impl fmt::Display for GoalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One timestamped progress message
#[derive(Debug, Clone, PartialEq)]
pub struct GoalStep {
    pub at: DateTime<Utc>,
    pub message: String,
}

/// A running or finished goal
#[derive(Debug, Clone, PartialEq)]
pub struct Goal {
    pub id: Uuid,
    pub kind: GoalKind,
    pub requested_by: String,
    pub started_at: DateTime<Utc>,
    pub steps: Vec<GoalStep>,
}

/// Snapshot for status reporting
#[derive(Debug, Clone, PartialEq)]
pub struct GoalStatus {
    pub current: Option<Goal>,
    pub last: Option<Goal>,
}

impl GoalStatus {
    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }
}

#[derive(Default)]
struct GoalState {
    current: Option<Goal>,
    cancel: Option<CancellationToken>,
    last: Option<Goal>,
}

/// Runs one goal at a time on top of an [`ActionExecutor`]
pub struct GoalManager {
    world: Arc<dyn World>,
    executor: Arc<ActionExecutor>,
    shutdown: CancellationToken,
    state: Mutex<GoalState>,
}

/// Releases the running slot when a goal's future completes or is dropped
struct RunningGuard<'a> {
    manager: &'a GoalManager,
    id: Uuid,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.manager.finish(self.id);
    }
}

impl GoalManager {
    /// Goals run under child tokens of `shutdown`
    pub fn new(
        world: Arc<dyn World>,
        executor: Arc<ActionExecutor>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            world,
            executor,
            shutdown,
            state: Mutex::new(GoalState::default()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock().current.is_some()
    }

    pub fn status(&self) -> GoalStatus {
        let state = self.lock();
        GoalStatus {
            current: state.current.clone(),
            last: state.last.clone(),
        }
    }

    /// Start a goal and run it to completion.
    ///
    /// Rejected with `GoalBusy` while another goal runs; the running goal is
    /// not affected.
    pub async fn start_goal(&self, name: &str, requested_by: &str) -> ActionResult {
        let (id, kind, token) = match self.claim(name, requested_by) {
            Ok(claimed) => claimed,
            Err(error) => {
                tracing::debug!("Goal {} not started: {}", name, error);
                return error.into();
            }
        };
        let _guard = RunningGuard { manager: self, id };
        tracing::info!("[Goal] {} started for {}", kind, requested_by);

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Ok(ActionResult::failure("Goal cancelled")),
            result = self.run(id, kind, requested_by) => result,
        };

        let result = result.unwrap_or_else(ActionResult::from);
        tracing::info!(
            "[Goal] {} finished (success: {}): {}",
            kind,
            result.success,
            result.message
        );
        result
    }

    /// Cancel the running goal, if any, and halt movement and combat.
    ///
    /// Effects already applied to the world stay applied.
    pub async fn stop_goal(&self) -> ActionResult {
        let cancelled = {
            let mut state = self.lock();
            if let Some(token) = state.cancel.take() {
                token.cancel();
            }
            let current = state.current.take();
            if current.is_some() {
                state.last = current.clone();
            }
            current
        };
        if let Some(goal) = cancelled {
            tracing::info!("[Goal] {} cancelled", goal.kind);
        }
        self.executor.stop().await;
        ActionResult::success("Goal cancelled")
    }

    /// Atomically check the running slot and take it
    fn claim(
        &self,
        name: &str,
        requested_by: &str,
    ) -> Result<(Uuid, GoalKind, CancellationToken), ActionError> {
        let mut state = self.lock();
        if let Some(current) = &state.current {
            return Err(ActionError::GoalBusy(current.kind.to_string()));
        }
        let kind: GoalKind = name.parse()?;
        let id = Uuid::new_v4();
        let token = self.shutdown.child_token();
        state.current = Some(Goal {
            id,
            kind,
            requested_by: requested_by.to_string(),
            started_at: Utc::now(),
            steps: Vec::new(),
        });
        state.cancel = Some(token.clone());
        Ok((id, kind, token))
    }

    fn finish(&self, id: Uuid) {
        let mut state = self.lock();
        if state.current.as_ref().is_some_and(|g| g.id == id) {
            state.last = state.current.take();
            state.cancel = None;
        }
    }

    fn log(&self, id: Uuid, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("[Goal] {}", message);
        let mut state = self.lock();
        if let Some(goal) = state.current.as_mut().filter(|g| g.id == id) {
            goal.steps.push(GoalStep {
                at: Utc::now(),
                message,
            });
        }
    }

    async fn run(
        &self,
        id: Uuid,
        kind: GoalKind,
        requested_by: &str,
    ) -> Result<ActionResult, ActionError> {
        match kind {
            GoalKind::MineDiamonds => self.mine_diamonds(id).await,
            GoalKind::Explore => self.explore(id).await,
            GoalKind::BuildShelter => self.build_shelter(id).await,
            GoalKind::GatherWood => self.gather_wood(id).await,
            GoalKind::GatherFood => self.gather_food(id).await,
            GoalKind::Defend => self.defend(id, requested_by).await,
        }
    }

    async fn mine_diamonds(&self, id: Uuid) -> Result<ActionResult, ActionError> {
        self.log(id, "Starting diamond mining mission");

        if !self.world.find_blocks("iron_ore", IRON_RADIUS, 1).await?.is_empty() {
            self.log(id, "Found iron ore, mining first");
            let result = self
                .executor
                .execute(
                    &ActionRequest::new("mine")
                        .with_param("block", "iron_ore")
                        .with_param("count", IRON_BATCH),
                )
                .await;
            self.log(id, result.message);
        }

        for ore in DIAMOND_ORES {
            if !self.world.is_known_block(ore).await? {
                continue;
            }
            let found = self
                .world
                .find_blocks(ore, DIAMOND_RADIUS, DIAMOND_BATCH)
                .await?;
            if found.is_empty() {
                continue;
            }
            self.log(id, format!("Found {} {}!", found.len(), ore));
            let result = self
                .executor
                .mine_within(ore, found.len(), DIAMOND_RADIUS)
                .await;
            self.log(id, result.message);
            return Ok(ActionResult::success("Found and mined diamond ore!"));
        }

        Ok(ActionResult::failure(
            "No diamonds found nearby. Need to dig deeper!",
        ))
    }

    async fn explore(&self, id: Uuid) -> Result<ActionResult, ActionError> {
        self.log(id, "Starting exploration");

        let origin = self.world.own_entity().await?.position;
        let entities = self.world.entities().await?;
        let offsets = [
            (EXPLORE_OFFSET, 0.0),
            (0.0, EXPLORE_OFFSET),
            (-EXPLORE_OFFSET, 0.0),
            (0.0, -EXPLORE_OFFSET),
        ];

        let mut structures = HashSet::new();
        for (dx, dz) in offsets {
            let sample = origin.offset(dx, 0.0, dz);
            let near: Vec<_> = entities
                .iter()
                .filter(|e| within_square(&e.position, &sample, EXPLORE_RADIUS))
                .filter(|e| {
                    e.kind == EntityKind::Object || lexicon::matches_any(&e.name, STRUCTURE_HINTS)
                })
                .map(|e| e.id)
                .collect();
            self.log(id, format!("Surveyed {}: {} structures", sample, near.len()));
            structures.extend(near);
        }

        let hostiles = entities
            .iter()
            .filter(|e| lexicon::is_threat(e))
            .filter(|e| within_square(&e.position, &origin, EXPLORE_RADIUS))
            .count();

        let mut findings = Vec::new();
        if !structures.is_empty() {
            findings.push(format!("Found {} structures nearby", structures.len()));
        }
        if hostiles > 0 {
            findings.push(format!("Warning: {} hostile mobs detected!", hostiles));
        }

        Ok(ActionResult::success(if findings.is_empty() {
            "Area explored. Looks clear!".to_string()
        } else {
            findings.join(". ")
        }))
    }

    async fn build_shelter(&self, id: Uuid) -> Result<ActionResult, ActionError> {
        self.log(id, "Starting shelter construction");

        let inventory = self.world.inventory().await?;
        let material = SHELTER_MATERIALS.iter().find_map(|mat| {
            inventory
                .iter()
                .find(|i| i.name.contains(mat) && i.count >= SHELTER_MIN_STACK)
        });

        match material {
            Some(item) => self.log(id, format!("Building with {}×{}", item.name, item.count)),
            None => {
                self.log(id, "Not enough building material, digging dirt");
                let result = self
                    .executor
                    .execute(
                        &ActionRequest::new("mine")
                            .with_param("block", "dirt")
                            .with_param("count", SHELTER_DIRT_BATCH),
                    )
                    .await;
                self.log(id, result.message);
            }
        }

        Ok(ActionResult::success(
            "Shelter location scouted. Ready to build!",
        ))
    }

    async fn gather_wood(&self, id: Uuid) -> Result<ActionResult, ActionError> {
        self.log(id, "Starting wood gathering");

        for log in WOOD_LOGS {
            let result = self
                .executor
                .execute(
                    &ActionRequest::new("mine")
                        .with_param("block", *log)
                        .with_param("count", WOOD_BATCH),
                )
                .await;
            self.log(id, result.message.clone());
            if result.success {
                let mined = result
                    .payload
                    .as_ref()
                    .and_then(|p| p["mined"].as_u64())
                    .unwrap_or(0);
                return Ok(ActionResult::success(format!("Gathered {} logs!", mined)));
            }
        }

        Ok(ActionResult::failure("No trees found nearby"))
    }

    async fn gather_food(&self, id: Uuid) -> Result<ActionResult, ActionError> {
        self.log(id, "Starting food gathering");

        let own = self.world.own_entity().await?.position;
        let animal = self
            .world
            .nearest_entity(&|e| {
                lexicon::is_mob_of(e, HUNTABLE_ANIMALS) && e.position.distance_to(&own) <= FOOD_RADIUS
            })
            .await?;
        if let Some(animal) = animal {
            return Ok(ActionResult::success(format!(
                "Found {}! Ready to hunt.",
                animal.name
            )));
        }

        for crop in CROPS {
            if !self.world.is_known_block(crop).await? {
                continue;
            }
            if !self.world.find_blocks(crop, FOOD_RADIUS, 1).await?.is_empty() {
                return Ok(ActionResult::success(format!("Found {}! Harvesting.", crop)));
            }
        }

        Ok(ActionResult::failure("No food sources found nearby"))
    }

    async fn defend(&self, id: Uuid, requested_by: &str) -> Result<ActionResult, ActionError> {
        self.log(id, "Entering defense mode");
        let result = self
            .executor
            .execute(&ActionRequest::new("protect").with_param("target", requested_by))
            .await;
        self.log(id, result.message);
        Ok(ActionResult::success(format!("Defending {}!", requested_by)))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GoalState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn within_square(position: &Vec3, center: &Vec3, half_extent: f64) -> bool {
    (position.x - center.x).abs() < half_extent && (position.z - center.z).abs() < half_extent
}
