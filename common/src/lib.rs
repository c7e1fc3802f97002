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

//! Triad Common Types and Protocols
//!
//! This crate defines the vocabulary shared between the agent runtime and the
//! world-client sidecar that owns the actual game connection:
//! - World data types (entities, players, inventory, blocks)
//! - Lifecycle events raised by the world
//! - The line-delimited JSON bridge protocol

pub mod bridge;
pub mod event;
pub mod world;

pub use bridge::{BridgeMessage, BridgeReply, BridgeRequest, WorldCall};
pub use event::WorldEvent;
pub use world::{
    BlockPos, EntityId, EntityInfo, EntityKind, EquipSlot, InventoryItem, PlayerInfo, Vec3,
};
