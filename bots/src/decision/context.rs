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

//! World context snapshots for prompts and callout selection

use crate::world::lexicon::{self, HOSTILE_MOBS, SCOUT_ANIMALS};
use crate::world::{World, WorldError};

/// Hostiles within this distance count as nearby
pub const THREAT_RADIUS: f64 = 25.0;
/// Radius of a scouting sweep
pub const SCOUT_RADIUS: f64 = 30.0;
/// Radius of a quick threat count
pub const WARN_RADIUS: f64 = 20.0;

pub const NIGHT_START: u32 = 12000;
pub const SUNSET_START: u32 = 11000;

pub fn is_night(time_of_day: u32) -> bool {
    time_of_day >= NIGHT_START
}

pub fn is_sunset(time_of_day: u32) -> bool {
    (SUNSET_START..NIGHT_START).contains(&time_of_day)
}

/// What the agent knows about its surroundings at one instant
#[derive(Debug, Clone, PartialEq)]
pub struct ContextSnapshot {
    pub time_of_day: u32,
    pub health: f32,
    /// Named player and their distance, when visible
    pub target: Option<(String, f64)>,
    pub hostiles_nearby: usize,
    pub material_stacks: usize,
    pub companion: Option<String>,
}

impl ContextSnapshot {
    pub async fn capture(
        world: &dyn World,
        target: Option<&str>,
        companion: Option<String>,
    ) -> Result<Self, WorldError> {
        let own = world.own_entity().await?;
        let time_of_day = world.time_of_day().await?;
        let health = world.health().await?;

        let target = match target {
            Some(name) => world
                .player(name)
                .await?
                .and_then(|p| p.entity)
                .map(|e| (name.to_string(), e.position.distance_to(&own.position))),
            None => None,
        };

        let hostiles_nearby = world
            .entities()
            .await?
            .iter()
            .filter(|e| e.id != own.id && lexicon::is_threat(e))
            .filter(|e| e.position.distance_to(&own.position) < THREAT_RADIUS)
            .count();

        let material_stacks = world
            .inventory()
            .await?
            .iter()
            .filter(|i| lexicon::is_building_material(&i.name))
            .count();

        Ok(Self {
            time_of_day,
            health,
            target,
            hostiles_nearby,
            material_stacks,
            companion,
        })
    }

    pub fn is_night(&self) -> bool {
        is_night(self.time_of_day)
    }

    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        let time = if self.is_night() {
            "NIGHT (dangerous!)"
        } else if is_sunset(self.time_of_day) {
            "Sunset soon"
        } else {
            "Day"
        };
        lines.push(format!("Time: {}", time));
        lines.push(format!("My HP: {}/20", self.health.floor() as i32));
        if let Some((name, distance)) = &self.target {
            lines.push(format!("{} is {} blocks away", name, distance.floor() as i64));
        }
        if self.hostiles_nearby > 0 {
            lines.push(format!("{} hostile mobs nearby!", self.hostiles_nearby));
        }
        if self.material_stacks > 0 {
            lines.push(format!(
                "Building materials: {} stacks available",
                self.material_stacks
            ));
        }
        if let Some(companion) = &self.companion {
            lines.push(format!("Scouting with: {}", companion));
        }
        lines.join("\n")
    }
}

/// A scout's view of the immediate area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoutReport {
    pub hostiles: usize,
    pub animals: usize,
    pub time_of_day: u32,
}

impl ScoutReport {
    pub async fn survey(world: &dyn World) -> Result<Self, WorldError> {
        let own = world.own_entity().await?;
        let mut report = ScoutReport {
            hostiles: 0,
            animals: 0,
            time_of_day: world.time_of_day().await?,
        };
        for entity in world.entities().await? {
            if entity.id == own.id || entity.position.distance_to(&own.position) > SCOUT_RADIUS {
                continue;
            }
            if lexicon::is_mob_of(&entity, HOSTILE_MOBS) {
                report.hostiles += 1;
            }
            if lexicon::is_mob_of(&entity, SCOUT_ANIMALS) {
                report.animals += 1;
            }
        }
        Ok(report)
    }

    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        if self.hostiles > 0 {
            lines.push(format!("Hostile mobs: {}", self.hostiles));
        }
        if self.animals > 0 {
            lines.push(format!("Animals: {}", self.animals));
        }
        if is_night(self.time_of_day) {
            lines.push("NIGHTTIME - dangerous!".to_string());
        }
        if is_sunset(self.time_of_day) {
            lines.push("Sunset soon!".to_string());
        }
        if lines.is_empty() {
            "Area clear".to_string()
        } else {
            lines.join("\n")
        }
    }
}

/// Threat mobs within `radius` of the agent
pub async fn count_threats(world: &dyn World, radius: f64) -> Result<usize, WorldError> {
    let own = world.own_entity().await?;
    Ok(world
        .entities()
        .await?
        .iter()
        .filter(|e| e.id != own.id && lexicon::is_threat(e))
        .filter(|e| e.position.distance_to(&own.position) <= radius)
        .count())
}
