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

//! Self-preservation: eating, retaliation, hurt callouts and bodyguard duty

use super::{Agent, pick, roll};
use crate::world::WorldError;
use crate::world::lexicon::{is_melee_threat, is_threat};
use tokio::time::Instant;
use triad_common::{EntityId, EntityInfo, EquipSlot};

/// Eat below this health
pub const EAT_HEALTH: f32 = 10.0;
/// Retaliate and call for help below this health
pub const LOW_HEALTH: f32 = 8.0;
/// Engage melee threats this close on our own initiative
pub const ENGAGE_RADIUS: f64 = 8.0;
/// A swinging mob this close is taken to be the attacker
pub const SWING_RADIUS: f64 = 5.0;
/// Guard radius around the protected player
pub const GUARD_RADIUS: f64 = 12.0;

const HEALING_FOOD: &str = "golden_apple";
const SWORDS: &[&str] = &["netherite_sword", "diamond_sword", "iron_sword", "stone_sword"];

/// Armor preference per slot, best first
const ARMOR: &[(EquipSlot, &[&str])] = &[
    (
        EquipSlot::Head,
        &["netherite_helmet", "diamond_helmet", "iron_helmet"],
    ),
    (
        EquipSlot::Torso,
        &["netherite_chestplate", "diamond_chestplate", "iron_chestplate"],
    ),
    (
        EquipSlot::Legs,
        &["netherite_leggings", "diamond_leggings", "iron_leggings"],
    ),
    (
        EquipSlot::Feet,
        &["netherite_boots", "diamond_boots", "iron_boots"],
    ),
];

impl Agent {
    /// One pass of the survival loop
    pub async fn survival_check(&self) {
        if let Err(e) = self.try_survive().await {
            tracing::warn!("[{}] Survival check failed: {}", self.name, e);
        }
    }

    async fn try_survive(&self) -> Result<(), WorldError> {
        let health = self.world.health().await?;

        if health < EAT_HEALTH {
            self.eat().await?;
        }

        if health < LOW_HEALTH {
            if let Some(attacker) = self.live_attacker().await? {
                self.strike(&attacker).await;
            }
            if self.limiter.try_hurt_callout(Instant::now()) {
                self.say(self.persona.low_health_callout).await;
            }
        }

        if self.world.combat_target().await?.is_none() {
            let own = self.world.own_entity().await?;
            let nearest = self.world.nearest_entity(&is_melee_threat).await?;
            if let Some(threat) =
                nearest.filter(|t| t.position.distance_to(&own.position) <= ENGAGE_RADIUS)
            {
                self.equip_weapon().await?;
                tracing::info!("[{}] Engaging {} {}", self.name, threat.name, threat.id);
                self.strike(&threat).await;
            }
        }
        Ok(())
    }

    /// Equip and eat a golden apple when one is held; failures are swallowed
    async fn eat(&self) -> Result<(), WorldError> {
        let inventory = self.world.inventory().await?;
        if !inventory.iter().any(|i| i.name.contains(HEALING_FOOD)) {
            return Ok(());
        }
        if let Err(e) = self.world.equip(HEALING_FOOD, EquipSlot::Hand).await {
            tracing::warn!("[{}] Could not hold {}: {}", self.name, HEALING_FOOD, e);
            return Ok(());
        }
        match self.world.consume().await {
            Ok(()) => tracing::info!("[{}] Ate a {}", self.name, HEALING_FOOD),
            Err(e) => tracing::warn!("[{}] Could not eat: {}", self.name, e),
        }
        Ok(())
    }

    async fn equip_weapon(&self) -> Result<(), WorldError> {
        let inventory = self.world.inventory().await?;
        let sword = SWORDS
            .iter()
            .find(|sword| inventory.iter().any(|i| i.name == **sword));
        if let Some(sword) = sword {
            if let Err(e) = self.world.equip(sword, EquipSlot::Hand).await {
                tracing::warn!("[{}] Could not equip {}: {}", self.name, sword, e);
            }
        }
        Ok(())
    }

    async fn strike(&self, target: &EntityInfo) {
        if let Err(e) = self.world.attack(target.id).await {
            tracing::warn!("[{}] Attack on {} failed: {}", self.name, target.id, e);
        }
    }

    /// The recorded attacker, if it still exists and is still a threat.
    ///
    /// A stale record is cleared.
    async fn live_attacker(&self) -> Result<Option<EntityInfo>, WorldError> {
        let Some(id) = self.last_attacker() else {
            return Ok(None);
        };
        match self.world.entity(id).await? {
            Some(entity) if is_threat(&entity) => Ok(Some(entity)),
            _ => {
                let mut state = self.lock_state();
                if state.last_attacker == Some(id) {
                    state.last_attacker = None;
                }
                Ok(None)
            }
        }
    }

    /// React to taking damage
    pub async fn on_hurt(&self) {
        let health = match self.world.health().await {
            Ok(health) => health,
            Err(e) => {
                tracing::warn!("[{}] Hurt handling failed: {}", self.name, e);
                return;
            }
        };

        if health < LOW_HEALTH {
            if self.limiter.try_hurt_callout(Instant::now()) {
                self.say(self.persona.low_health_callout).await;
            }
        } else if roll(self.timing.hurt_callout_chance)
            && self.limiter.try_hurt_callout(Instant::now())
        {
            if let Some(line) = pick(self.persona.hurt_callouts) {
                self.say(&line).await;
            }
        }

        match self.live_attacker().await {
            Ok(Some(attacker)) => self.strike(&attacker).await,
            Ok(None) => {}
            Err(e) => tracing::warn!("[{}] Could not check attacker: {}", self.name, e),
        }
    }

    /// A hostile swinging close by is assumed to be hitting us
    pub async fn on_swing_arm(&self, id: EntityId) {
        let (own, entity) = match tokio::try_join!(self.world.own_entity(), self.world.entity(id)) {
            Ok(pair) => pair,
            Err(e) => {
                tracing::debug!("[{}] Ignoring swing of {}: {}", self.name, id, e);
                return;
            }
        };
        let Some(entity) = entity else {
            return;
        };
        if is_threat(&entity) && entity.position.distance_to(&own.position) <= SWING_RADIUS {
            tracing::debug!("[{}] {} {} is attacking", self.name, entity.name, id);
            self.lock_state().last_attacker = Some(id);
        }
    }

    /// One pass of the protection loop
    pub async fn protection_tick(&self) {
        let Some(target) = self.protect_target() else {
            return;
        };
        if let Err(e) = self.guard(&target).await {
            tracing::warn!("[{}] Protection of {} failed: {}", self.name, target, e);
        }
    }

    async fn guard(&self, target: &str) -> Result<(), WorldError> {
        let Some(player) = self.world.player(target).await?.and_then(|p| p.entity) else {
            return Ok(());
        };
        let threat = self
            .world
            .entities()
            .await?
            .into_iter()
            .filter(is_melee_threat)
            .map(|e| (e.position.distance_to(&player.position), e))
            .filter(|(distance, _)| *distance <= GUARD_RADIUS)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, e)| e);
        let Some(threat) = threat else {
            return Ok(());
        };

        if self.limiter.try_acquire(None, Instant::now()) {
            self.say(self.persona.protection_callout).await;
        }
        self.strike(&threat).await;
        Ok(())
    }

    /// Put on the best armor held and the persona's preferred hand item.
    ///
    /// Returns the items equipped.
    pub async fn auto_equip(&self) -> Vec<String> {
        let inventory = match self.world.inventory().await {
            Ok(inventory) => inventory,
            Err(e) => {
                tracing::warn!("[{}] Auto-equip skipped: {}", self.name, e);
                return Vec::new();
            }
        };
        let held = |name: &str| inventory.iter().any(|i| i.name == name);

        let mut choices: Vec<(EquipSlot, &str)> = ARMOR
            .iter()
            .filter_map(|(slot, items)| {
                items
                    .iter()
                    .copied()
                    .find(|item| held(item))
                    .map(|item| (*slot, item))
            })
            .collect();
        if let Some(item) = self.persona.hand_gear.iter().copied().find(|item| held(item)) {
            choices.push((EquipSlot::Hand, item));
        }

        let mut equipped = Vec::new();
        for (slot, item) in choices {
            match self.world.equip(item, slot).await {
                Ok(()) => equipped.push(item.to_string()),
                Err(e) => tracing::warn!("[{}] Could not equip {}: {}", self.name, item, e),
            }
        }
        if !equipped.is_empty() {
            tracing::info!("[{}] Equipped {}", self.name, equipped.join(", "));
        }
        equipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentSettings, PeerSet};
    use crate::decision::PersonaKind;
    use crate::testing::{FakeWorld, ScriptedCompletion};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;
    use triad_common::{EntityKind, Vec3, WorldCall};

    fn agent(world: &Arc<FakeWorld>, persona: PersonaKind) -> Arc<Agent> {
        Agent::new(
            AgentSettings::new("TheArchitect", persona, "Alice", PeerSet::default()),
            world.clone(),
            Arc::new(ScriptedCompletion::new()),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_auto_equip_prefers_best_gear() {
        let world = Arc::new(FakeWorld::new("TheArchitect"));
        world.add_item("iron_helmet", 1);
        world.add_item("diamond_helmet", 1);
        world.add_item("iron_boots", 1);
        world.add_item("diamond_pickaxe", 1);
        world.add_item("netherite_sword", 1);
        let architect = agent(&world, PersonaKind::Architect);

        let equipped = architect.auto_equip().await;
        assert_eq!(
            equipped,
            vec!["diamond_helmet", "iron_boots", "diamond_pickaxe"]
        );
        assert!(world.effector_calls().contains(&WorldCall::Equip {
            item: "diamond_pickaxe".to_string(),
            slot: EquipSlot::Hand,
        }));
    }

    #[tokio::test]
    async fn test_swing_arm_records_close_threats_only() {
        let world = Arc::new(FakeWorld::new("TheArchitect"));
        let far = world.add_entity("zombie", EntityKind::Mob, Vec3::new(10.0, 64.0, 0.0));
        let cow = world.add_entity("cow", EntityKind::Mob, Vec3::new(1.0, 64.0, 0.0));
        let near = world.add_entity("skeleton", EntityKind::Mob, Vec3::new(3.0, 64.0, 0.0));
        let architect = agent(&world, PersonaKind::Architect);

        architect.on_swing_arm(far).await;
        architect.on_swing_arm(cow).await;
        assert_eq!(architect.last_attacker(), None);
        architect.on_swing_arm(near).await;
        assert_eq!(architect.last_attacker(), Some(near));
    }

    #[tokio::test]
    async fn test_stale_attacker_is_cleared() {
        let world = Arc::new(FakeWorld::new("TheArchitect"));
        let zombie = world.add_entity("zombie", EntityKind::Mob, Vec3::new(2.0, 64.0, 0.0));
        let architect = agent(&world, PersonaKind::Architect);
        architect.on_swing_arm(zombie).await;
        world.remove_entity(zombie);
        world.set_health(5.0);

        architect.survival_check().await;
        assert!(world.attacks().is_empty());
        assert_eq!(architect.last_attacker(), None);
    }

    #[tokio::test]
    async fn test_engages_close_threat_with_sword() {
        let world = Arc::new(FakeWorld::new("TheArchitect"));
        world.add_item("iron_sword", 1);
        world.add_entity("creeper", EntityKind::Mob, Vec3::new(20.0, 64.0, 0.0));
        let spider = world.add_entity("spider", EntityKind::Mob, Vec3::new(6.0, 64.0, 0.0));
        let architect = agent(&world, PersonaKind::Architect);

        architect.survival_check().await;
        assert_eq!(world.attacks(), vec![spider]);
        assert!(world.effector_calls().contains(&WorldCall::Equip {
            item: "iron_sword".to_string(),
            slot: EquipSlot::Hand,
        }));

        // Already fighting
        world.clear_calls();
        architect.survival_check().await;
        assert!(world.attacks().is_empty());
    }

    #[tokio::test]
    async fn test_eats_golden_apple_when_hungry() {
        let world = Arc::new(FakeWorld::new("TheArchitect"));
        world.add_item("golden_apple", 2);
        world.set_health(9.0);
        let architect = agent(&world, PersonaKind::Architect);

        architect.survival_check().await;
        let calls = world.effector_calls();
        assert!(calls.contains(&WorldCall::Equip {
            item: "golden_apple".to_string(),
            slot: EquipSlot::Hand,
        }));
        assert!(calls.contains(&WorldCall::Consume));
        // 9 is not low health
        assert!(world.chat_lines().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_apple_is_not_eaten() {
        let world = Arc::new(FakeWorld::new("TheArchitect"));
        world.add_item("golden_apple", 1);
        world.reject_equip(true);
        world.set_health(9.0);
        let architect = agent(&world, PersonaKind::Architect);

        architect.survival_check().await;
        assert!(!world.effector_calls().contains(&WorldCall::Consume));
    }

    #[tokio::test]
    async fn test_guard_attacks_threat_near_protected_player() {
        let world = Arc::new(FakeWorld::new("TheOracle"));
        world.add_player("Alice", Vec3::new(30.0, 64.0, 0.0));
        let zombie = world.add_entity("zombie", EntityKind::Mob, Vec3::new(38.0, 64.0, 0.0));
        world.add_entity("zombie", EntityKind::Mob, Vec3::new(0.0, 64.0, 50.0));
        let oracle = Agent::new(
            AgentSettings::new("TheOracle", PersonaKind::Oracle, "Alice", PeerSet::default()),
            world.clone(),
            Arc::new(ScriptedCompletion::new()),
            CancellationToken::new(),
        );

        oracle.protection_tick().await;
        assert!(world.attacks().is_empty());

        oracle.lock_state().protect_target = Some("Alice".to_string());
        oracle.protection_tick().await;
        assert_eq!(world.attacks(), vec![zombie]);
        assert_eq!(world.chat_lines(), vec!["Protecting you!"]);

        // Callout is rate limited, the attack is not
        oracle.protection_tick().await;
        assert_eq!(world.attacks(), vec![zombie, zombie]);
        assert_eq!(world.chat_lines().len(), 1);
    }
}
