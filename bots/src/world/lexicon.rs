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

//! Game knowledge shared by every agent.
//!
//! Entity and item names are matched by case-insensitive substring, so
//! `"zombie"` also covers `"zombie_villager"` and `"oak_planks"` covers a
//! stack named `"stripped_oak_planks"`.

use triad_common::{EntityInfo, EntityKind};

/// Every hostile mob worth mentioning in a scouting report
pub const HOSTILE_MOBS: &[&str] = &[
    "zombie", "skeleton", "spider", "creeper", "witch", "phantom", "enderman",
];

/// Hostiles counted as threats and tracked as attackers
pub const THREAT_MOBS: &[&str] = &["zombie", "skeleton", "spider", "creeper", "witch", "phantom"];

/// Hostiles the agent engages on its own initiative
pub const MELEE_THREATS: &[&str] = &["zombie", "skeleton", "spider", "creeper"];

pub const HUNTABLE_ANIMALS: &[&str] = &["cow", "pig", "chicken", "sheep"];

pub const SCOUT_ANIMALS: &[&str] = &["cow", "pig", "sheep", "chicken", "horse", "wolf"];

pub const CROPS: &[&str] = &["wheat", "carrots", "potatoes", "beetroots"];

/// Log kinds in preference order
pub const WOOD_LOGS: &[&str] = &[
    "oak_log",
    "spruce_log",
    "birch_log",
    "jungle_log",
    "acacia_log",
    "dark_oak_log",
];

/// Blocks a shelter can be built from
pub const SHELTER_MATERIALS: &[&str] = &["cobblestone", "dirt", "oak_planks", "spruce_planks"];

/// Inventory names that count as building material
pub const BUILDING_MATERIALS: &[&str] = &["wood", "stone", "cobblestone", "plank", "brick", "glass"];

/// Entity names that hint at a structure
pub const STRUCTURE_HINTS: &[&str] = &["village", "temple"];

/// Case-insensitive substring match against any needle
pub fn matches_any(name: &str, needles: &[&str]) -> bool {
    let name = name.to_lowercase();
    needles.iter().any(|needle| name.contains(needle))
}

/// A mob whose name matches one of `kinds`
pub fn is_mob_of(entity: &EntityInfo, kinds: &[&str]) -> bool {
    entity.kind == EntityKind::Mob && matches_any(&entity.name, kinds)
}

pub fn is_threat(entity: &EntityInfo) -> bool {
    is_mob_of(entity, THREAT_MOBS)
}

pub fn is_melee_threat(entity: &EntityInfo) -> bool {
    is_mob_of(entity, MELEE_THREATS)
}

pub fn is_building_material(item_name: &str) -> bool {
    matches_any(item_name, BUILDING_MATERIALS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use triad_common::Vec3;

    #[test]
    fn test_substring_matching() {
        assert!(matches_any("Zombie_Villager", THREAT_MOBS));
        assert!(matches_any("cave_spider", MELEE_THREATS));
        assert!(!matches_any("enderman", THREAT_MOBS));
        assert!(matches_any("enderman", HOSTILE_MOBS));
    }

    #[test]
    fn test_threats_must_be_mobs() {
        let zombie = EntityInfo::new(1, "zombie", EntityKind::Mob, Vec3::default());
        let dropped = EntityInfo::new(2, "zombie_head", EntityKind::Item, Vec3::default());
        assert!(is_threat(&zombie));
        assert!(is_melee_threat(&zombie));
        assert!(!is_threat(&dropped));
    }

    #[test]
    fn test_building_materials() {
        assert!(is_building_material("oak_planks"));
        assert!(is_building_material("cobblestone"));
        assert!(is_building_material("glass_pane"));
        assert!(!is_building_material("golden_apple"));
    }
}
