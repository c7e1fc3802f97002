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

//! Bridge protocol between the agent runtime and the world-client sidecar.
//!
//! Frames are single-line JSON documents. The runtime sends [`BridgeRequest`]s;
//! the sidecar answers each one with exactly one [`BridgeReply`] carrying the
//! same `id`, and pushes [`WorldEvent`]s at any time.

use crate::event::WorldEvent;
use crate::world::{BlockPos, EntityId, EquipSlot, Vec3};
use serde::{Deserialize, Serialize};

/// A single call into the world client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WorldCall {
    /// Log in as the given user; the sidecar raises `Spawn` once in the world
    Join { username: String },
    OwnEntity,
    TimeOfDay,
    Health,
    Entity { id: EntityId },
    Entities,
    Players,
    Inventory,
    IsKnownBlock { kind: String },
    FindBlocks {
        kind: String,
        max_distance: f64,
        count: usize,
    },
    CombatTarget,
    SetPursuitGoal { target: EntityId, standoff: f64 },
    PathTo { point: Vec3, standoff: f64 },
    ClearGoal,
    Attack { target: EntityId },
    StopCombat,
    Equip { item: String, slot: EquipSlot },
    Consume,
    Collect { block: BlockPos },
    Chat { text: String },
    Whisper { name: String, text: String },
}

impl WorldCall {
    /// Operation name for logging
    pub fn op(&self) -> &'static str {
        match self {
            WorldCall::Join { .. } => "join",
            WorldCall::OwnEntity => "own_entity",
            WorldCall::TimeOfDay => "time_of_day",
            WorldCall::Health => "health",
            WorldCall::Entity { .. } => "entity",
            WorldCall::Entities => "entities",
            WorldCall::Players => "players",
            WorldCall::Inventory => "inventory",
            WorldCall::IsKnownBlock { .. } => "is_known_block",
            WorldCall::FindBlocks { .. } => "find_blocks",
            WorldCall::CombatTarget => "combat_target",
            WorldCall::SetPursuitGoal { .. } => "set_pursuit_goal",
            WorldCall::PathTo { .. } => "path_to",
            WorldCall::ClearGoal => "clear_goal",
            WorldCall::Attack { .. } => "attack",
            WorldCall::StopCombat => "stop_combat",
            WorldCall::Equip { .. } => "equip",
            WorldCall::Consume => "consume",
            WorldCall::Collect { .. } => "collect",
            WorldCall::Chat { .. } => "chat",
            WorldCall::Whisper { .. } => "whisper",
        }
    }
}

/// Request frame sent to the sidecar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeRequest {
    pub id: u64,
    pub call: WorldCall,
}

/// Reply frame for one request.
///
/// `error` is set when the call failed on the world side (pathing raised,
/// equip rejected, ...); otherwise `value` holds the call's result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeReply {
    pub id: u64,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BridgeReply {
    pub fn ok(id: u64, value: serde_json::Value) -> Self {
        Self {
            id,
            value,
            error: None,
        }
    }

    pub fn err(id: u64, error: impl Into<String>) -> Self {
        Self {
            id,
            value: serde_json::Value::Null,
            error: Some(error.into()),
        }
    }
}

/// Frame sent by the sidecar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeMessage {
    Reply(BridgeReply),
    Event { event: WorldEvent },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request = BridgeRequest {
            id: 3,
            call: WorldCall::FindBlocks {
                kind: "iron_ore".into(),
                max_distance: 32.0,
                count: 2,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["call"]["op"], "find_blocks");
        assert_eq!(json["call"]["kind"], "iron_ore");
        assert_eq!(request.call.op(), "find_blocks");
    }

    #[test]
    fn test_message_parsing() {
        let reply: BridgeMessage =
            serde_json::from_str(r#"{"type":"reply","id":9,"value":17.5}"#).unwrap();
        assert_eq!(
            reply,
            BridgeMessage::Reply(BridgeReply::ok(9, serde_json::json!(17.5)))
        );

        let failed: BridgeMessage =
            serde_json::from_str(r#"{"type":"reply","id":4,"error":"no path"}"#).unwrap();
        assert_eq!(failed, BridgeMessage::Reply(BridgeReply::err(4, "no path")));

        let event: BridgeMessage =
            serde_json::from_str(r#"{"type":"event","event":{"kind":"death"}}"#).unwrap();
        assert_eq!(
            event,
            BridgeMessage::Event {
                event: WorldEvent::Death
            }
        );
    }
}
