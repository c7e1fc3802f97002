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

//! In-memory doubles for the world and the completion service.
//!
//! [`FakeWorld`] keeps a tiny world model (entities, blocks, inventory)
//! and records every effector call so tests can assert on exactly what an
//! agent did. [`ScriptedCompletion`] replays queued replies.

use crate::llm::{Completion, LlmError};
use crate::world::{World, WorldError};
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use triad_common::{
    BlockPos, EntityId, EntityInfo, EntityKind, EquipSlot, InventoryItem, PlayerInfo, Vec3,
    WorldCall,
};

/// Block types the fake registry knows without any placed blocks
const DEFAULT_REGISTRY: &[&str] = &[
    "stone",
    "dirt",
    "cobblestone",
    "coal_ore",
    "iron_ore",
    "diamond_ore",
    "deepslate_diamond_ore",
    "oak_log",
    "spruce_log",
    "birch_log",
    "jungle_log",
    "acacia_log",
    "dark_oak_log",
    "wheat",
    "carrots",
    "potatoes",
    "beetroots",
];

struct FakeState {
    own: EntityInfo,
    health: f32,
    time_of_day: u32,
    next_id: u64,
    entities: Vec<EntityInfo>,
    offline_players: Vec<String>,
    known_blocks: HashSet<String>,
    blocks: Vec<(String, BlockPos)>,
    inventory: Vec<InventoryItem>,
    combat_target: Option<EntityId>,
    failing_collects: HashSet<BlockPos>,
    fail_paths: bool,
    reject_equip: bool,
    effector_delay: Option<Duration>,
    closed: bool,
    calls: Vec<WorldCall>,
    collected: Vec<BlockPos>,
}

/// A scriptable single-agent view of the world
pub struct FakeWorld {
    state: Mutex<FakeState>,
}

impl FakeWorld {
    /// An agent named `name` standing at (0, 64, 0) at full health, midday
    pub fn new(name: &str) -> Self {
        Self {
            state: Mutex::new(FakeState {
                own: EntityInfo::new(1, name, EntityKind::Player, Vec3::new(0.0, 64.0, 0.0)),
                health: 20.0,
                time_of_day: 6000,
                next_id: 2,
                entities: Vec::new(),
                offline_players: Vec::new(),
                known_blocks: DEFAULT_REGISTRY.iter().map(|s| s.to_string()).collect(),
                blocks: Vec::new(),
                inventory: Vec::new(),
                combat_target: None,
                failing_collects: HashSet::new(),
                fail_paths: false,
                reject_equip: false,
                effector_delay: None,
                closed: false,
                calls: Vec::new(),
                collected: Vec::new(),
            }),
        }
    }

    pub fn own_id(&self) -> EntityId {
        self.lock().own.id
    }

    pub fn set_health(&self, health: f32) {
        self.lock().health = health;
    }

    pub fn set_time_of_day(&self, ticks: u32) {
        self.lock().time_of_day = ticks;
    }

    pub fn set_position(&self, position: Vec3) {
        self.lock().own.position = position;
    }

    /// A visible player entity
    pub fn add_player(&self, name: &str, position: Vec3) -> EntityId {
        self.add_entity(name, EntityKind::Player, position)
    }

    /// A player on the list but out of view range
    pub fn add_offline_player(&self, name: &str) {
        self.lock().offline_players.push(name.to_string());
    }

    pub fn add_entity(&self, name: &str, kind: EntityKind, position: Vec3) -> EntityId {
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.entities.push(EntityInfo::new(id, name, kind, position));
        EntityId(id)
    }

    pub fn move_entity(&self, id: EntityId, position: Vec3) {
        if let Some(entity) = self.lock().entities.iter_mut().find(|e| e.id == id) {
            entity.position = position;
        }
    }

    pub fn remove_entity(&self, id: EntityId) {
        self.lock().entities.retain(|e| e.id != id);
    }

    pub fn add_item(&self, name: &str, count: u32) {
        self.lock().inventory.push(InventoryItem::new(name, count));
    }

    /// Place blocks of `kind`, registering the kind if needed
    pub fn add_blocks(&self, kind: &str, positions: &[BlockPos]) {
        let mut state = self.lock();
        state.known_blocks.insert(kind.to_string());
        state
            .blocks
            .extend(positions.iter().map(|p| (kind.to_string(), *p)));
    }

    /// Collecting the block at `pos` will fail
    pub fn fail_collect(&self, pos: BlockPos) {
        self.lock().failing_collects.insert(pos);
    }

    /// Every `path_to` fails
    pub fn fail_paths(&self, fail: bool) {
        self.lock().fail_paths = fail;
    }

    /// Every `equip` fails
    pub fn reject_equip(&self, reject: bool) {
        self.lock().reject_equip = reject;
    }

    /// Slow down `path_to` and `collect` by `delay`
    pub fn set_effector_delay(&self, delay: Duration) {
        self.lock().effector_delay = Some(delay);
    }

    /// Fail every further call with `Closed`
    pub fn disconnect(&self) {
        self.lock().closed = true;
    }

    /// Effector calls in the order they were issued
    pub fn effector_calls(&self) -> Vec<WorldCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Text of every public chat line
    pub fn chat_lines(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                WorldCall::Chat { text } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Every whisper as `(recipient, text)`
    pub fn whispers(&self) -> Vec<(String, String)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                WorldCall::Whisper { name, text } => Some((name.clone(), text.clone())),
                _ => None,
            })
            .collect()
    }

    /// Targets of every `attack` call
    pub fn attacks(&self) -> Vec<EntityId> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                WorldCall::Attack { target } => Some(*target),
                _ => None,
            })
            .collect()
    }

    /// Blocks successfully collected
    pub fn collected(&self) -> Vec<BlockPos> {
        self.lock().collected.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(&self) -> Result<(), WorldError> {
        if self.lock().closed {
            Err(WorldError::Closed)
        } else {
            Ok(())
        }
    }

    /// Record an effector call
    fn record(&self, call: WorldCall) -> Result<(), WorldError> {
        let mut state = self.lock();
        if state.closed {
            return Err(WorldError::Closed);
        }
        state.calls.push(call);
        Ok(())
    }

    async fn delay(&self) {
        let delay = self.lock().effector_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl World for FakeWorld {
    async fn own_entity(&self) -> Result<EntityInfo, WorldError> {
        self.check()?;
        Ok(self.lock().own.clone())
    }

    async fn time_of_day(&self) -> Result<u32, WorldError> {
        self.check()?;
        Ok(self.lock().time_of_day)
    }

    async fn health(&self) -> Result<f32, WorldError> {
        self.check()?;
        Ok(self.lock().health)
    }

    async fn entity(&self, id: EntityId) -> Result<Option<EntityInfo>, WorldError> {
        self.check()?;
        let state = self.lock();
        if id == state.own.id {
            return Ok(Some(state.own.clone()));
        }
        Ok(state.entities.iter().find(|e| e.id == id).cloned())
    }

    async fn entities(&self) -> Result<Vec<EntityInfo>, WorldError> {
        self.check()?;
        let state = self.lock();
        let mut all = vec![state.own.clone()];
        all.extend(state.entities.iter().cloned());
        Ok(all)
    }

    async fn players(&self) -> Result<Vec<PlayerInfo>, WorldError> {
        self.check()?;
        let state = self.lock();
        let mut players = vec![PlayerInfo {
            name: state.own.name.clone(),
            entity: Some(state.own.clone()),
        }];
        players.extend(
            state
                .entities
                .iter()
                .filter(|e| e.kind == EntityKind::Player)
                .map(|e| PlayerInfo {
                    name: e.name.clone(),
                    entity: Some(e.clone()),
                }),
        );
        players.extend(state.offline_players.iter().map(|name| PlayerInfo {
            name: name.clone(),
            entity: None,
        }));
        Ok(players)
    }

    async fn inventory(&self) -> Result<Vec<InventoryItem>, WorldError> {
        self.check()?;
        Ok(self.lock().inventory.clone())
    }

    async fn is_known_block(&self, kind: &str) -> Result<bool, WorldError> {
        self.check()?;
        Ok(self.lock().known_blocks.contains(kind))
    }

    async fn find_blocks(
        &self,
        kind: &str,
        max_distance: f64,
        count: usize,
    ) -> Result<Vec<BlockPos>, WorldError> {
        self.check()?;
        let state = self.lock();
        let origin = state.own.position;
        let mut found: Vec<(f64, BlockPos)> = state
            .blocks
            .iter()
            .filter(|(k, _)| k == kind)
            .map(|(_, pos)| (pos.center().distance_to(&origin), *pos))
            .filter(|(distance, _)| *distance <= max_distance)
            .collect();
        found.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(found.into_iter().take(count).map(|(_, pos)| pos).collect())
    }

    async fn combat_target(&self) -> Result<Option<EntityId>, WorldError> {
        self.check()?;
        Ok(self.lock().combat_target)
    }

    async fn set_pursuit_goal(&self, target: EntityId, standoff: f64) -> Result<(), WorldError> {
        self.record(WorldCall::SetPursuitGoal { target, standoff })
    }

    async fn path_to(&self, point: Vec3, standoff: f64) -> Result<(), WorldError> {
        self.record(WorldCall::PathTo { point, standoff })?;
        self.delay().await;
        if self.lock().fail_paths {
            return Err(WorldError::Rejected("No path".to_string()));
        }
        Ok(())
    }

    async fn clear_goal(&self) -> Result<(), WorldError> {
        self.record(WorldCall::ClearGoal)
    }

    async fn attack(&self, target: EntityId) -> Result<(), WorldError> {
        self.record(WorldCall::Attack { target })?;
        self.lock().combat_target = Some(target);
        Ok(())
    }

    async fn stop_combat(&self) -> Result<(), WorldError> {
        self.record(WorldCall::StopCombat)?;
        self.lock().combat_target = None;
        Ok(())
    }

    async fn equip(&self, item: &str, slot: EquipSlot) -> Result<(), WorldError> {
        self.record(WorldCall::Equip {
            item: item.to_string(),
            slot,
        })?;
        if self.lock().reject_equip {
            return Err(WorldError::Rejected(format!("cannot equip {}", item)));
        }
        Ok(())
    }

    async fn consume(&self) -> Result<(), WorldError> {
        self.record(WorldCall::Consume)
    }

    async fn collect(&self, block: BlockPos) -> Result<(), WorldError> {
        self.record(WorldCall::Collect { block })?;
        self.delay().await;
        let mut state = self.lock();
        if state.failing_collects.contains(&block) {
            return Err(WorldError::Rejected("Block out of reach".to_string()));
        }
        state.blocks.retain(|(_, pos)| *pos != block);
        state.collected.push(block);
        Ok(())
    }

    async fn chat(&self, text: &str) -> Result<(), WorldError> {
        self.record(WorldCall::Chat {
            text: text.to_string(),
        })
    }

    async fn whisper(&self, name: &str, text: &str) -> Result<(), WorldError> {
        self.record(WorldCall::Whisper {
            name: name.to_string(),
            text: text.to_string(),
        })
    }
}

/// Completion service that replays queued replies in order.
///
/// Once the queue is empty every call fails with `ProviderUnavailable`.
#[derive(Default)]
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, reply: &str) -> Self {
        self.push_reply(reply);
        self
    }

    pub fn with_error(self, error: LlmError) -> Self {
        self.push_error(error);
        self
    }

    pub fn push_reply(&self, reply: &str) {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Ok(reply.to_string()));
    }

    pub fn push_error(&self, error: LlmError) {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Err(error));
    }

    /// Every prompt received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl Completion for ScriptedCompletion {
    async fn complete(&self, prompt: &str, _max_tokens: u32) -> Result<String, LlmError> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::ProviderUnavailable("script exhausted".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_blocks_nearest_first() {
        let world = FakeWorld::new("Bot");
        world.add_blocks(
            "stone",
            &[
                BlockPos::new(20, 64, 0),
                BlockPos::new(5, 64, 0),
                BlockPos::new(100, 64, 0),
            ],
        );
        let found = world.find_blocks("stone", 32.0, 5).await.unwrap();
        assert_eq!(found, vec![BlockPos::new(5, 64, 0), BlockPos::new(20, 64, 0)]);
    }

    #[tokio::test]
    async fn test_players_include_self_and_offline() {
        let world = FakeWorld::new("Bot");
        world.add_player("Alice", Vec3::new(1.0, 64.0, 1.0));
        world.add_offline_player("Bob");
        let players = world.players().await.unwrap();
        let names: Vec<_> = players.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Bot", "Alice", "Bob"]);
        assert!(players[2].entity.is_none());
    }

    #[tokio::test]
    async fn test_disconnected_world_fails() {
        let world = FakeWorld::new("Bot");
        world.disconnect();
        assert_eq!(world.health().await, Err(WorldError::Closed));
        assert_eq!(world.chat("hi").await, Err(WorldError::Closed));
        assert!(world.effector_calls().is_empty());
    }

    #[tokio::test]
    async fn test_scripted_completion_replays_in_order() {
        let completion = ScriptedCompletion::new()
            .with_reply("one")
            .with_error(LlmError::Timeout("slow".into()));
        assert_eq!(completion.complete("a", 10).await, Ok("one".to_string()));
        assert!(completion.complete("b", 10).await.is_err());
        assert!(matches!(
            completion.complete("c", 10).await,
            Err(LlmError::ProviderUnavailable(_))
        ));
        assert_eq!(completion.prompts(), vec!["a", "b", "c"]);
    }
}
