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

//! Action executor
//!
//! Translates one named action into world calls and reports a uniform
//! [`ActionResult`]. Errors never escape: they are converted into failed
//! results at [`ActionExecutor::execute`].
//!
//! Multi-step actions (`mine`, `gather`) accumulate on a best-effort basis.
//! A failing step is logged and skipped, and the action succeeds if at least
//! one step did.

use crate::world::{World, WorldError};
use serde_json::{Map, Value, json};
use std::sync::{Arc, Mutex};
use triad_common::{EntityInfo, EquipSlot, EntityKind};

/// Stand-off kept while following a player
pub const FOLLOW_DISTANCE: f64 = 2.0;
/// Stand-off kept while guarding a player
pub const PROTECT_DISTANCE: f64 = 3.0;
/// Stand-off when walking over to a player
pub const COME_DISTANCE: f64 = 2.0;
/// Block search radius for `mine`
pub const MINE_RADIUS: f64 = 32.0;

/// Action parameters
pub type Params = Map<String, Value>;

/// A named action with its parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    pub name: String,
    pub params: Params,
}

impl ActionRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Params::new(),
        }
    }

    pub fn with_params(name: impl Into<String>, params: Params) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// String parameter; numbers are accepted and stringified
    pub fn str_param(&self, key: &str) -> Option<String> {
        match self.params.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Count parameter; numeric strings are accepted, zero means the default
    pub fn count_param(&self, key: &str, default: usize) -> usize {
        let count = match self.params.get(key) {
            Some(Value::Number(n)) => n.as_u64().map(|n| n as usize),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };
        count.filter(|c| *c > 0).unwrap_or(default)
    }

}

/// Uniform outcome of an action or goal
#[derive(Debug, Clone, PartialEq)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    pub payload: Option<Value>,
}

impl ActionResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            payload: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

impl From<ActionError> for ActionResult {
    fn from(error: ActionError) -> Self {
        ActionResult::failure(error.to_string())
    }
}

/// Why an action or goal failed.
///
/// The display text is the chat line reported to the player.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    #[error("Can't see {0}")]
    NotVisible(String),
    #[error("Couldn't reach {0}")]
    Unreachable(String),
    #[error("Unknown block: {0}")]
    UnknownBlockType(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Unknown action: {0}")]
    UnknownAction(String),
    #[error("Unknown goal: {0}. Try: diamonds, explore, shelter, wood, food, defend")]
    UnknownGoal(String),
    #[error("Already working on: {0}")]
    GoalBusy(String),
    #[error("Don't have {0}")]
    NotHeld(String),
    #[error("Couldn't equip {0}")]
    EquipRejected(String),
    #[error("No {0} specified")]
    MissingParam(&'static str),
    #[error(transparent)]
    World(#[from] WorldError),
}

#[derive(Debug, Default)]
struct ExecutorState {
    last_action: Option<String>,
    follow_target: Option<String>,
}

/// Dispatches named actions against the world
pub struct ActionExecutor {
    world: Arc<dyn World>,
    state: Mutex<ExecutorState>,
}

impl ActionExecutor {
    pub fn new(world: Arc<dyn World>) -> Self {
        Self {
            world,
            state: Mutex::new(ExecutorState::default()),
        }
    }

    /// Name of the most recently dispatched action
    pub fn last_action(&self) -> Option<String> {
        self.lock().last_action.clone()
    }

    /// Player currently followed or guarded, for diagnostics
    pub fn follow_target(&self) -> Option<String> {
        self.lock().follow_target.clone()
    }

    /// Run one action. Never fails: errors become failed results.
    pub async fn execute(&self, request: &ActionRequest) -> ActionResult {
        self.lock().last_action = Some(request.name.clone());
        tracing::debug!("Executing action {} {:?}", request.name, request.params);

        let result = match request.name.as_str() {
            "follow" => self.follow(request).await,
            "come" => self.come(request).await,
            "stop" => Ok(self.stop().await),
            "protect" => self.protect(request).await,
            "mine" => self.mine(request).await,
            "gather" => self.gather(request).await,
            "inventory" => Ok(self.inventory().await),
            "equip" => self.equip(request).await,
            other => Err(ActionError::UnknownAction(other.to_string())),
        };

        result.unwrap_or_else(|error| {
            tracing::warn!("Action {} failed: {}", request.name, error);
            error.into()
        })
    }

    /// Resolve a player name to their currently visible entity
    async fn visible_player(&self, name: &str) -> Result<EntityInfo, ActionError> {
        self.world
            .player(name)
            .await?
            .and_then(|p| p.entity)
            .ok_or_else(|| ActionError::NotVisible(name.to_string()))
    }

    async fn follow(&self, request: &ActionRequest) -> Result<ActionResult, ActionError> {
        let target = request
            .str_param("target")
            .ok_or(ActionError::MissingParam("target"))?;
        let entity = self.visible_player(&target).await?;
        self.world.set_pursuit_goal(entity.id, FOLLOW_DISTANCE).await?;
        self.lock().follow_target = Some(target.clone());
        Ok(ActionResult::success(format!("Following {}", target)))
    }

    async fn come(&self, request: &ActionRequest) -> Result<ActionResult, ActionError> {
        let target = request
            .str_param("target")
            .ok_or(ActionError::MissingParam("target"))?;
        let entity = self.visible_player(&target).await?;
        self.world
            .path_to(entity.position, COME_DISTANCE)
            .await
            .map_err(|e| {
                tracing::debug!("Path to {} failed: {}", target, e);
                ActionError::Unreachable(target.clone())
            })?;
        Ok(ActionResult::success(format!(
            "Arrived at {}'s location",
            target
        )))
    }

    /// Clear movement and combat. Always succeeds.
    pub async fn stop(&self) -> ActionResult {
        if let Err(e) = self.world.clear_goal().await {
            tracing::warn!("Failed to clear movement goal: {}", e);
        }
        if let Err(e) = self.world.stop_combat().await {
            tracing::warn!("Failed to stop combat: {}", e);
        }
        let mut state = self.lock();
        state.follow_target = None;
        state.last_action = None;
        ActionResult::success("Stopped all actions")
    }

    async fn protect(&self, request: &ActionRequest) -> Result<ActionResult, ActionError> {
        let target = request
            .str_param("target")
            .ok_or(ActionError::MissingParam("target"))?;
        let entity = self.visible_player(&target).await?;
        self.world.set_pursuit_goal(entity.id, PROTECT_DISTANCE).await?;
        self.lock().follow_target = Some(target.clone());
        Ok(ActionResult::success(format!("Protecting {}", target)))
    }

    async fn mine(&self, request: &ActionRequest) -> Result<ActionResult, ActionError> {
        let block = request
            .str_param("block")
            .ok_or(ActionError::MissingParam("block"))?;
        let count = request.count_param("count", 1);
        self.mine_blocks(&block, count, MINE_RADIUS).await
    }

    /// `mine` over a wider search radius than players may request
    pub(crate) async fn mine_within(&self, block: &str, count: usize, radius: f64) -> ActionResult {
        self.lock().last_action = Some("mine".to_string());
        self.mine_blocks(block, count, radius)
            .await
            .unwrap_or_else(|error| {
                tracing::warn!("Action mine failed: {}", error);
                error.into()
            })
    }

    async fn mine_blocks(
        &self,
        block: &str,
        count: usize,
        radius: f64,
    ) -> Result<ActionResult, ActionError> {
        if !self.world.is_known_block(block).await? {
            return Err(ActionError::UnknownBlockType(block.to_string()));
        }

        let found = self.world.find_blocks(block, radius, count).await?;
        if found.is_empty() {
            return Err(ActionError::NotFound(format!("No {} found nearby", block)));
        }

        let mut mined = 0;
        for pos in found.into_iter().take(count) {
            match self.world.collect(pos).await {
                Ok(()) => mined += 1,
                Err(e) => tracing::warn!("Mining {} at {:?} failed: {}", block, pos, e),
            }
        }

        Ok(ActionResult {
            success: mined > 0,
            message: format!("Mined {} {}", mined, block),
            payload: Some(json!({ "block": block, "mined": mined })),
        })
    }

    async fn gather(&self, request: &ActionRequest) -> Result<ActionResult, ActionError> {
        let filter = request.str_param("item").map(|s| s.to_lowercase());
        let count = request.count_param("count", 1);

        let items: Vec<EntityInfo> = self
            .world
            .entities()
            .await?
            .into_iter()
            .filter(|e| e.kind == EntityKind::Item)
            .filter(|e| match &filter {
                Some(f) => e.name.to_lowercase().contains(f),
                None => true,
            })
            .collect();
        if items.is_empty() {
            return Err(ActionError::NotFound("No items to gather nearby".to_string()));
        }

        let mut gathered = 0;
        for item in items.iter().take(count) {
            match self.world.path_to(item.position, 0.0).await {
                Ok(()) => gathered += 1,
                Err(e) => tracing::debug!("Pickup of {} {} skipped: {}", item.name, item.id, e),
            }
        }

        Ok(ActionResult {
            success: gathered > 0,
            message: format!("Gathered {} items", gathered),
            payload: Some(json!({ "gathered": gathered })),
        })
    }

    /// Never fails: an unreadable inventory reads as empty
    async fn inventory(&self) -> ActionResult {
        let items = self.world.inventory().await.unwrap_or_else(|e| {
            tracing::warn!("Failed to read inventory: {}", e);
            Vec::new()
        });
        let summary = items
            .iter()
            .map(|i| format!("{}×{}", i.name, i.count))
            .collect::<Vec<_>>()
            .join(", ");
        let message = if summary.is_empty() {
            "Inventory empty".to_string()
        } else {
            summary
        };
        let payload = serde_json::to_value(&items).unwrap_or(Value::Null);
        ActionResult::success(message).with_payload(payload)
    }

    async fn equip(&self, request: &ActionRequest) -> Result<ActionResult, ActionError> {
        let wanted = request
            .str_param("item")
            .ok_or(ActionError::MissingParam("item"))?;
        let slot = match request.str_param("slot") {
            Some(slot) => slot
                .parse::<EquipSlot>()
                .map_err(|_| ActionError::EquipRejected(wanted.clone()))?,
            None => EquipSlot::Hand,
        };

        let needle = wanted.to_lowercase();
        let item = self
            .world
            .inventory()
            .await?
            .into_iter()
            .find(|i| i.name.to_lowercase().contains(&needle))
            .ok_or_else(|| ActionError::NotHeld(wanted.clone()))?;

        self.world.equip(&item.name, slot).await.map_err(|e| {
            tracing::debug!("Equip of {} rejected: {}", item.name, e);
            ActionError::EquipRejected(wanted.clone())
        })?;
        Ok(ActionResult::success(format!("Equipped {}", item.name)))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ExecutorState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
