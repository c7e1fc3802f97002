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

//! World capability interface
//!
//! Everything the agent runtime perceives or changes in the world goes
//! through [`World`]. The production binding is [`BridgeWorld`], which talks
//! to a world-client sidecar; tests substitute an in-memory world.

mod bridge;
pub mod lexicon;

pub use bridge::{BridgeWorld, wait_for_spawn};

use async_trait::async_trait;
use triad_common::{
    BlockPos, EntityId, EntityInfo, EquipSlot, InventoryItem, PlayerInfo, Vec3,
};

/// Failure of a single world call
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorldError {
    /// The connection to the world client failed
    #[error("Transport error: {0}")]
    Transport(String),
    /// The world refused or failed the call (no path, equip refused, ...)
    #[error("{0}")]
    Rejected(String),
    /// A reply could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),
    /// No reply arrived in time
    #[error("Timed out waiting for {0}")]
    Timeout(String),
    /// The connection is gone
    #[error("World connection closed")]
    Closed,
}

/// Perception and effectors over the shared world.
///
/// Every call is individually atomic on the world side; callers never lock.
#[async_trait]
pub trait World: Send + Sync {
    // Perception

    /// The agent's own entity
    async fn own_entity(&self) -> Result<EntityInfo, WorldError>;

    /// Ticks into the current day (0..24000)
    async fn time_of_day(&self) -> Result<u32, WorldError>;

    /// Current health, 0..=20
    async fn health(&self) -> Result<f32, WorldError>;

    /// Look an entity up by id; `None` once it despawned or died
    async fn entity(&self, id: EntityId) -> Result<Option<EntityInfo>, WorldError>;

    /// All entities currently loaded around the agent
    async fn entities(&self) -> Result<Vec<EntityInfo>, WorldError>;

    /// Connected players, including the agent and its peers
    async fn players(&self) -> Result<Vec<PlayerInfo>, WorldError>;

    async fn inventory(&self) -> Result<Vec<InventoryItem>, WorldError>;

    /// Whether `kind` names a block type in the world's registry
    async fn is_known_block(&self, kind: &str) -> Result<bool, WorldError>;

    /// Up to `count` blocks of `kind` within `max_distance`, nearest first
    async fn find_blocks(
        &self,
        kind: &str,
        max_distance: f64,
        count: usize,
    ) -> Result<Vec<BlockPos>, WorldError>;

    /// Entity currently being fought, if any
    async fn combat_target(&self) -> Result<Option<EntityId>, WorldError>;

    // Effectors

    /// Install a continuously re-evaluated pursuit goal; returns immediately
    async fn set_pursuit_goal(&self, target: EntityId, standoff: f64) -> Result<(), WorldError>;

    /// Path to within `standoff` of `point`, resolving on arrival
    async fn path_to(&self, point: Vec3, standoff: f64) -> Result<(), WorldError>;

    async fn clear_goal(&self) -> Result<(), WorldError>;

    /// Start fighting `target`
    async fn attack(&self, target: EntityId) -> Result<(), WorldError>;

    async fn stop_combat(&self) -> Result<(), WorldError>;

    async fn equip(&self, item: &str, slot: EquipSlot) -> Result<(), WorldError>;

    /// Eat or drink the held item
    async fn consume(&self) -> Result<(), WorldError>;

    /// Walk to, break and pick up one block
    async fn collect(&self, block: BlockPos) -> Result<(), WorldError>;

    async fn chat(&self, text: &str) -> Result<(), WorldError>;

    async fn whisper(&self, name: &str, text: &str) -> Result<(), WorldError>;

    // Provided

    /// Nearest entity other than the agent matching `filter`
    async fn nearest_entity(
        &self,
        filter: &(dyn for<'e> Fn(&'e EntityInfo) -> bool + Send + Sync),
    ) -> Result<Option<EntityInfo>, WorldError> {
        let own = self.own_entity().await?;
        let nearest = self
            .entities()
            .await?
            .into_iter()
            .filter(|e| e.id != own.id && filter(e))
            .min_by(|a, b| {
                a.position
                    .distance_to(&own.position)
                    .total_cmp(&b.position.distance_to(&own.position))
            });
        Ok(nearest)
    }

    /// A connected player by exact name
    async fn player(&self, name: &str) -> Result<Option<PlayerInfo>, WorldError> {
        Ok(self.players().await?.into_iter().find(|p| p.name == name))
    }
}
