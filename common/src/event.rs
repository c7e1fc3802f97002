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

//! Lifecycle event definitions

use crate::world::EntityId;
use serde::{Deserialize, Serialize};

/// Events raised by the world to an agent.
///
/// Events carry entity identifiers rather than entity snapshots: handlers
/// look the entity up against current world state when they need it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorldEvent {
    /// The agent entered the world (also raised after respawn)
    Spawn,
    /// A public chat line
    Chat { from: String, text: String },
    /// A private message addressed to the agent
    Whisper { from: String, text: String },
    /// Some entity took damage
    EntityHurt { entity: EntityId },
    /// Some entity swung its arm (melee attack animation)
    EntitySwingArm { entity: EntityId },
    /// A player joined the server
    PlayerJoined { name: String },
    /// The agent died
    Death,
    /// The connection ended
    Disconnect { reason: String },
}

impl WorldEvent {
    /// Short event name for logging
    pub fn name(&self) -> &'static str {
        match self {
            WorldEvent::Spawn => "spawn",
            WorldEvent::Chat { .. } => "chat",
            WorldEvent::Whisper { .. } => "whisper",
            WorldEvent::EntityHurt { .. } => "entity_hurt",
            WorldEvent::EntitySwingArm { .. } => "entity_swing_arm",
            WorldEvent::PlayerJoined { .. } => "player_joined",
            WorldEvent::Death => "death",
            WorldEvent::Disconnect { .. } => "disconnect",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let event: WorldEvent =
            serde_json::from_str(r#"{"kind":"chat","from":"Alice","text":"hi"}"#).unwrap();
        assert_eq!(
            event,
            WorldEvent::Chat {
                from: "Alice".into(),
                text: "hi".into()
            }
        );

        let hurt: WorldEvent = serde_json::from_str(r#"{"kind":"entity_hurt","entity":7}"#).unwrap();
        assert_eq!(hurt, WorldEvent::EntityHurt { entity: EntityId(7) });
        assert_eq!(hurt.name(), "entity_hurt");
    }
}
