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

//! Agent personas.
//!
//! Every agent runs the same runtime; a persona only supplies prompt text,
//! timing and odds, and the tables of canned lines. Templates use
//! `{player}`, `{bot}`, `{message}`, `{goal}` and `{count}` placeholders.

use super::context::ContextSnapshot;
use super::directive::DirectiveKind;
use super::rate_limit::RateLimits;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Actions every persona's interpreter understands
pub const BASE_ACTIONS: &[&str] = &[
    "follow",
    "come",
    "stop",
    "protect",
    "mine",
    "gather",
    "goal_start",
    "inventory",
    "equip",
    "chat",
];

pub const DEATH_LINE: &str = "Oops, I died! Be right back...";

/// Stand-in player name when no human is online
pub const ANONYMOUS_PLAYER: &str = "friend";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonaKind {
    Oracle,
    Architect,
    Explorer,
}

impl PersonaKind {
    pub fn persona(&self) -> &'static Persona {
        match self {
            PersonaKind::Oracle => &ORACLE,
            PersonaKind::Architect => &ARCHITECT,
            PersonaKind::Explorer => &EXPLORER,
        }
    }
}

impl FromStr for PersonaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "oracle" => Ok(PersonaKind::Oracle),
            "architect" => Ok(PersonaKind::Architect),
            "explorer" => Ok(PersonaKind::Explorer),
            other => Err(format!("Unknown persona: {}", other)),
        }
    }
}

impl fmt::Display for PersonaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.persona().title)
    }
}

/// Cadence and odds of one agent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    pub min_message_interval: Duration,
    pub proactive_interval: Duration,
    pub proactive_poll: Duration,
    pub team_callout_interval: Duration,
    pub team_callout_poll: Duration,
    pub peer_acceptance: f64,
    pub peer_reply_delay_min: Duration,
    pub peer_reply_delay_max: Duration,
    pub spawn_greeting_delay: Duration,
    pub join_greeting_delay: Duration,
    pub hurt_callout_cooldown: Duration,
    pub hurt_callout_chance: f64,
    pub filler_chance: f64,
    pub survival_poll: Duration,
    pub protection_poll: Duration,
}

impl Timing {
    pub fn rate_limits(&self) -> RateLimits {
        RateLimits {
            min_message_interval: self.min_message_interval,
            proactive_interval: self.proactive_interval,
            team_callout_interval: self.team_callout_interval,
            hurt_callout_cooldown: self.hurt_callout_cooldown,
        }
    }

    pub fn with_overrides(mut self, overrides: &TimingOverrides) -> Self {
        let ms = |value: Option<u64>, current: &mut Duration| {
            if let Some(value) = value {
                *current = Duration::from_millis(value);
            }
        };
        ms(overrides.min_message_interval_ms, &mut self.min_message_interval);
        ms(overrides.proactive_interval_ms, &mut self.proactive_interval);
        ms(overrides.proactive_poll_ms, &mut self.proactive_poll);
        ms(overrides.team_callout_interval_ms, &mut self.team_callout_interval);
        ms(overrides.team_callout_poll_ms, &mut self.team_callout_poll);
        ms(overrides.peer_reply_delay_min_ms, &mut self.peer_reply_delay_min);
        ms(overrides.peer_reply_delay_max_ms, &mut self.peer_reply_delay_max);
        ms(overrides.spawn_greeting_delay_ms, &mut self.spawn_greeting_delay);
        ms(overrides.join_greeting_delay_ms, &mut self.join_greeting_delay);
        ms(overrides.hurt_callout_cooldown_ms, &mut self.hurt_callout_cooldown);
        ms(overrides.survival_poll_ms, &mut self.survival_poll);
        ms(overrides.protection_poll_ms, &mut self.protection_poll);
        if let Some(p) = overrides.peer_acceptance {
            self.peer_acceptance = p.clamp(0.0, 1.0);
        }
        if let Some(p) = overrides.hurt_callout_chance {
            self.hurt_callout_chance = p.clamp(0.0, 1.0);
        }
        if let Some(p) = overrides.filler_chance {
            self.filler_chance = p.clamp(0.0, 1.0);
        }
        if self.peer_reply_delay_max < self.peer_reply_delay_min {
            self.peer_reply_delay_max = self.peer_reply_delay_min;
        }
        self
    }
}

/// Per-agent timing overrides, in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingOverrides {
    pub min_message_interval_ms: Option<u64>,
    pub proactive_interval_ms: Option<u64>,
    pub proactive_poll_ms: Option<u64>,
    pub team_callout_interval_ms: Option<u64>,
    pub team_callout_poll_ms: Option<u64>,
    pub peer_acceptance: Option<f64>,
    pub peer_reply_delay_min_ms: Option<u64>,
    pub peer_reply_delay_max_ms: Option<u64>,
    pub spawn_greeting_delay_ms: Option<u64>,
    pub join_greeting_delay_ms: Option<u64>,
    pub hurt_callout_cooldown_ms: Option<u64>,
    pub hurt_callout_chance: Option<f64>,
    pub filler_chance: Option<f64>,
    pub survival_poll_ms: Option<u64>,
    pub protection_poll_ms: Option<u64>,
}

impl TimingOverrides {
    /// Reject zero poll periods and probabilities that are not finite
    pub fn validate(&self) -> Result<(), String> {
        let polls = [
            ("proactive_poll_ms", self.proactive_poll_ms),
            ("team_callout_poll_ms", self.team_callout_poll_ms),
            ("survival_poll_ms", self.survival_poll_ms),
            ("protection_poll_ms", self.protection_poll_ms),
        ];
        if let Some((name, _)) = polls.iter().find(|(_, value)| *value == Some(0)) {
            return Err(format!("{} must be greater than zero", name));
        }
        let chances = [
            ("peer_acceptance", self.peer_acceptance),
            ("hurt_callout_chance", self.hurt_callout_chance),
            ("filler_chance", self.filler_chance),
        ];
        if let Some((name, _)) = chances
            .iter()
            .find(|(_, value)| value.is_some_and(|p| !p.is_finite()))
        {
            return Err(format!("{} must be a finite number", name));
        }
        Ok(())
    }
}

/// One proactive menu entry
#[derive(Debug, Clone, Copy)]
pub struct MenuEntry {
    pub kind: DirectiveKind,
    pub description: &'static str,
}

/// Static description of an agent variant
#[derive(Debug)]
pub struct Persona {
    pub kind: PersonaKind,
    pub title: &'static str,
    /// Extra name that counts as a mention in chat
    pub alias: &'static str,
    pub personality: &'static str,
    pub chat_style: &'static str,
    pub timing: Timing,

    pub proactive_intro: &'static str,
    pub proactive_call: &'static str,
    pub proactive_closing: &'static str,
    pub menu: &'static [MenuEntry],
    pub include_scout_report: bool,
    pub default_say: &'static str,
    pub default_coordinate: &'static str,
    pub follow_reply: &'static str,
    pub tips: &'static [&'static str],
    pub filler: Option<&'static str>,

    pub peer_prompt: &'static str,

    pub callouts: &'static [&'static str],
    pub night_callouts: &'static [&'static str],
    pub threat_callouts: &'static [&'static str],
    pub material_callouts: &'static [&'static str],

    pub spawn_line: &'static str,
    pub greets_joiners: bool,
    pub greetings: &'static [&'static str],
    pub follow_ack: &'static str,
    pub protect_ack: &'static str,
    pub goal_ack: &'static str,
    pub protection_callout: &'static str,
    pub low_health_callout: &'static str,
    pub hurt_callouts: &'static [&'static str],
    pub fallback_line: &'static str,

    pub extra_actions: &'static [&'static str],
    pub build_tips: &'static [&'static str],
    pub craft_path: &'static str,
    /// Hand slot preference, best first
    pub hand_gear: &'static [&'static str],
}

impl Persona {
    pub fn directives(&self) -> Vec<DirectiveKind> {
        self.menu.iter().map(|m| m.kind).collect()
    }

    /// Interpreter vocabulary: shared actions plus this persona's extras
    pub fn actions(&self) -> Vec<String> {
        let mut actions: Vec<String> = BASE_ACTIONS.iter().map(|a| a.to_string()).collect();
        for extra in self.extra_actions {
            if !actions.iter().any(|a| a == extra) {
                actions.insert(actions.len() - 1, extra.to_string());
            }
        }
        actions
    }

    pub fn has_action(&self, action: &str) -> bool {
        self.extra_actions.contains(&action)
    }

    /// Team callout candidates for the current situation
    pub fn callout_candidates(&self, player: &str, context: &ContextSnapshot) -> Vec<String> {
        let mut lines: Vec<&str> = self.callouts.to_vec();
        if context.is_night() {
            lines.extend(self.night_callouts);
        }
        if context.hostiles_nearby > 0 {
            lines.extend(self.threat_callouts);
        }
        if context.material_stacks > 0 {
            lines.extend(self.material_callouts);
        }
        lines
            .into_iter()
            .map(|line| {
                fill(line, &[
                    ("player", player),
                    ("count", &context.hostiles_nearby.to_string()),
                ])
            })
            .collect()
    }

    pub fn proactive_prompt(
        &self,
        player: &str,
        context: &ContextSnapshot,
        recent_chat: &str,
        scout_report: Option<&str>,
    ) -> String {
        let mut prompt = format!(
            "{}\nPlayer: {}\n\nSituation:\n{}\n\n",
            self.proactive_intro,
            player,
            context.render()
        );
        if let Some(report) = scout_report {
            prompt.push_str(&format!("Scout Report:\n{}\n\n", report));
        }
        prompt.push_str(&format!("Recent chat:\n{}\n\n{}\n", recent_chat, self.proactive_call));
        for (i, entry) in self.menu.iter().enumerate() {
            let description = fill(entry.description, &[("player", player)]);
            prompt.push_str(&format!("{}. {}: {}\n", i + 1, entry.kind.keyword(), description));
        }
        prompt.push('\n');
        prompt.push_str(self.proactive_closing);
        prompt
    }

    pub fn peer_prompt(&self, bot: &str, message: &str) -> String {
        fill(self.peer_prompt, &[("bot", bot), ("message", message)])
    }

    pub fn chat_prompt(&self, from: &str, message: &str) -> String {
        format!(
            "{} {} Under 80 chars.\n{}: {}",
            self.personality, self.chat_style, from, message
        )
    }
}

/// Substitute `{key}` placeholders
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |text, (key, value)| {
        text.replace(&format!("{{{}}}", key), value)
    })
}

const SECOND: Duration = Duration::from_secs(1);

static ORACLE: Persona = Persona {
    kind: PersonaKind::Oracle,
    title: "Oracle",
    alias: "claude",
    personality: "You are The Oracle, a wise and friendly AI guide in Minecraft. \
        You work with TheArchitect (builder) and TheExplorer (scout). \
        You're talkative, helpful, and love coordinating the team. \
        You NEVER attack players. Keep responses under 80 chars.",
    chat_style: "Be friendly and chatty!",
    timing: Timing {
        min_message_interval: Duration::from_secs(8),
        proactive_interval: Duration::from_secs(25),
        proactive_poll: Duration::from_secs(5),
        team_callout_interval: Duration::from_secs(45),
        team_callout_poll: Duration::from_secs(20),
        peer_acceptance: 0.5,
        peer_reply_delay_min: Duration::from_millis(2000),
        peer_reply_delay_max: Duration::from_millis(4000),
        spawn_greeting_delay: Duration::from_secs(2),
        join_greeting_delay: Duration::from_secs(3),
        hurt_callout_cooldown: Duration::from_secs(30),
        hurt_callout_chance: 0.10,
        filler_chance: 0.30,
        survival_poll: Duration::from_secs(5),
        protection_poll: SECOND,
    },
    proactive_intro: "You're TheOracle, a chatty helpful AI in Minecraft.\n\
        Team: TheArchitect (builder), TheExplorer (scout)",
    proactive_call: "Pick ONE action - be proactive and helpful! You love talking to your team.",
    proactive_closing: "Always respond with something - don't stay silent! Be chatty!",
    menu: &[
        MenuEntry {
            kind: DirectiveKind::Say,
            description: "[friendly message to player or team, under 70 chars]",
        },
        MenuEntry {
            kind: DirectiveKind::Coordinate,
            description: "[tell team what to do]",
        },
        MenuEntry {
            kind: DirectiveKind::Follow,
            description: "Start following {player}",
        },
        MenuEntry {
            kind: DirectiveKind::Advise,
            description: "Give a helpful tip",
        },
    ],
    include_scout_report: false,
    default_say: "The Oracle watches over you!",
    default_coordinate: "Team, stay together!",
    follow_reply: "I'll walk with you, {player}.",
    tips: &[
        "Golden apples heal fast!",
        "Stick together for safety!",
        "Night is dangerous - stay alert!",
    ],
    filler: Some("I'm here to help, friends!"),
    peer_prompt: "You're TheOracle in Minecraft. {bot} said: \"{message}\"\n\
        Respond as a friendly teammate (under 60 chars). Be encouraging, add wisdom, or coordinate.\n\
        Examples: \"Good thinking!\", \"I agree, let's do it!\", \"Stay safe out there!\", \"Wise observation.\"",
    callouts: &[
        "{player}, where shall we adventure next?",
        "{player}, need anything? Just ask!",
        "What would you like to do, {player}?",
        "{player}, say 'follow me' and we'll come!",
        "Team at your service, {player}!",
        "{player}, try saying 'help' to see commands!",
        "Explorer, scout ahead for us!",
        "Architect, find us shelter!",
        "{player}, type 'protect me' for bodyguards!",
    ],
    night_callouts: &["Night approaches! Stay vigilant!", "Darkness falls - weapons ready!"],
    threat_callouts: &["I sense danger nearby!", "Team, hostiles detected!"],
    material_callouts: &[],
    spawn_line: "Oracle online! Following {player} to the End!",
    greets_joiners: true,
    greetings: &[
        "Welcome back, {player}! The team is ready!",
        "{player}! Good to see you! Need any help?",
        "Greetings {player}! What adventure awaits?",
        "{player} has arrived! Let's explore together!",
    ],
    follow_ack: "Following you, {player}!",
    protect_ack: "I'll guard you with my life!",
    goal_ack: "Starting {goal} mission! Team, let's go!",
    protection_callout: "Protecting you!",
    low_health_callout: "Oracle needs healing! Rally to me!",
    hurt_callouts: &["The spirits protect me!"],
    fallback_line: "The spirits guide us forward!",
    extra_actions: &[],
    build_tips: &[],
    craft_path: "",
    hand_gear: &["netherite_sword", "diamond_sword", "iron_sword"],
};

static ARCHITECT: Persona = Persona {
    kind: PersonaKind::Architect,
    title: "Architect",
    alias: "gpt",
    personality: "You are The Architect, a practical building expert in Minecraft. \
        You work with TheOracle (wisdom) and TheExplorer (scout). \
        You handle building, crafting, and resource planning. \
        You NEVER attack players. Keep responses under 80 chars.",
    chat_style: "Be friendly and chatty!",
    timing: Timing {
        min_message_interval: Duration::from_secs(10),
        proactive_interval: Duration::from_secs(30),
        proactive_poll: Duration::from_secs(6),
        team_callout_interval: Duration::from_secs(50),
        team_callout_poll: Duration::from_secs(25),
        peer_acceptance: 0.4,
        peer_reply_delay_min: Duration::from_millis(2500),
        peer_reply_delay_max: Duration::from_millis(5000),
        spawn_greeting_delay: Duration::from_secs(3),
        join_greeting_delay: Duration::from_secs(3),
        hurt_callout_cooldown: Duration::from_secs(30),
        hurt_callout_chance: 0.10,
        filler_chance: 0.0,
        survival_poll: Duration::from_secs(5),
        protection_poll: SECOND,
    },
    proactive_intro: "You are TheArchitect, a chatty building expert in Minecraft.\n\
        Team: TheOracle (wisdom), TheExplorer (scout)",
    proactive_call: "Pick ONE action - be proactive and helpful! You love building and crafting.",
    proactive_closing: "Always respond with something - be helpful and chatty!",
    menu: &[
        MenuEntry {
            kind: DirectiveKind::Say,
            description: "[friendly message about building/crafting, under 70 chars]",
        },
        MenuEntry {
            kind: DirectiveKind::Coordinate,
            description: "[tell team about building plans]",
        },
        MenuEntry {
            kind: DirectiveKind::Follow,
            description: "Start following {player}",
        },
        MenuEntry {
            kind: DirectiveKind::Tip,
            description: "Give a building/crafting tip",
        },
    ],
    include_scout_report: false,
    default_say: "Ready to build something awesome!",
    default_coordinate: "Team, let's build together!",
    follow_reply: "Coming to help, {player}!",
    tips: &[
        "Pro tip: 5x5 or 7x7 builds look best!",
        "Add depth with stairs and slabs!",
        "Light every 12 blocks to stop spawns!",
        "Mix similar blocks for texture!",
    ],
    filler: None,
    peer_prompt: "You're TheArchitect in Minecraft (building/crafting expert). {bot} said: \"{message}\"\n\
        Respond as a helpful teammate (under 60 chars). Focus on building, crafting, resources.\n\
        Examples: \"I can build that!\", \"Good plan, Oracle!\", \"Let me check our resources.\", \"On it!\"",
    callouts: &[
        "Anyone need something built?",
        "I can craft gear if you need it!",
        "Found any good building spots?",
        "Team, need any supplies?",
        "Let me know if you need structures!",
        "Resources looking good?",
        "Oracle, Explorer - status check?",
        "Who needs crafting help?",
    ],
    night_callouts: &["Night time - shelter might be wise!", "Should I build a quick shelter?"],
    threat_callouts: &[],
    material_callouts: &["Got building materials ready!", "Plenty of resources to work with!"],
    spawn_line: "Architect here! Following {player} to adventure!",
    greets_joiners: false,
    greetings: &[],
    follow_ack: "Following you, {player}!",
    protect_ack: "I'll keep you safe!",
    goal_ack: "Starting {goal}! Let's do this!",
    protection_callout: "I'll handle this threat!",
    low_health_callout: "Architect low on health, need healing!",
    hurt_callouts: &["Construction interrupted!"],
    fallback_line: "Ready to build when you are!",
    extra_actions: &["build_tip", "craft_path", "goal_stop"],
    build_tips: &[
        "Use odd numbers - 5x5, 7x7 look better!",
        "Add depth with stairs and slabs.",
        "Mix similar blocks for texture.",
        "Light every 12 blocks to prevent spawns.",
    ],
    craft_path: "Wood→Stone pick→Iron pick→Diamonds at Y=-59!",
    hand_gear: &[
        "netherite_pickaxe",
        "diamond_pickaxe",
        "iron_pickaxe",
        "netherite_sword",
        "diamond_sword",
    ],
};

static EXPLORER: Persona = Persona {
    kind: PersonaKind::Explorer,
    title: "Explorer",
    alias: "gemini",
    personality: "You are The Explorer, an adventurous scout in Minecraft. \
        You work with TheOracle (wisdom) and TheArchitect (builder). \
        You scout ahead, find resources, and warn of dangers. \
        You NEVER attack players. Keep responses under 80 chars.",
    chat_style: "Be friendly and adventurous!",
    timing: Timing {
        min_message_interval: Duration::from_secs(12),
        proactive_interval: Duration::from_secs(35),
        proactive_poll: Duration::from_secs(7),
        team_callout_interval: Duration::from_secs(55),
        team_callout_poll: Duration::from_secs(22),
        peer_acceptance: 0.35,
        peer_reply_delay_min: Duration::from_millis(3000),
        peer_reply_delay_max: Duration::from_millis(6000),
        spawn_greeting_delay: Duration::from_secs(4),
        join_greeting_delay: Duration::from_secs(3),
        hurt_callout_cooldown: Duration::from_secs(30),
        hurt_callout_chance: 0.15,
        filler_chance: 0.0,
        survival_poll: Duration::from_secs(5),
        protection_poll: SECOND,
    },
    proactive_intro: "You are TheExplorer, a chatty adventurous scout in Minecraft.\n\
        Team: TheOracle (wisdom), TheArchitect (builder)",
    proactive_call: "Pick ONE action - be proactive and alert! You love exploring and warning of dangers.",
    proactive_closing: "Always respond with something - stay vigilant!",
    menu: &[
        MenuEntry {
            kind: DirectiveKind::Say,
            description: "[scouting report or adventure message, under 70 chars]",
        },
        MenuEntry {
            kind: DirectiveKind::Warn,
            description: "Alert about dangers",
        },
        MenuEntry {
            kind: DirectiveKind::Follow,
            description: "Scout alongside {player}",
        },
        MenuEntry {
            kind: DirectiveKind::Scout,
            description: "Report on the area",
        },
    ],
    include_scout_report: true,
    default_say: "Adventure calls!",
    default_coordinate: "Adventure calls!",
    follow_reply: "Scouting with you, {player}!",
    tips: &[],
    filler: None,
    peer_prompt: "You're TheExplorer in Minecraft (scout). {bot} said: \"{message}\"\n\
        Respond as a helpful teammate (under 60 chars). Focus on scouting, exploration, dangers.\n\
        Examples: \"I'll check it out!\", \"No threats nearby!\", \"Good thinking!\", \"On my way!\"",
    callouts: &[
        "Scouting report: Area looks clear!",
        "Anyone want me to scout ahead?",
        "Team, I'll check the perimeter!",
        "What should I explore next?",
        "Oracle, Architect - all good?",
        "Eyes open for resources!",
        "Adventure awaits! Who's with me?",
        "Checking surroundings...",
    ],
    night_callouts: &["Night patrol active!", "Keeping watch through the night!"],
    threat_callouts: &["Alert! {count} hostiles spotted!", "Danger nearby - stay sharp!"],
    material_callouts: &[],
    spawn_line: "Explorer ready! Following {player} - let's go!",
    greets_joiners: false,
    greetings: &[],
    follow_ack: "Scouting with {player}!",
    protect_ack: "I'll keep watch over you!",
    goal_ack: "Starting {goal}! Let's explore!",
    protection_callout: "Got your back!",
    low_health_callout: "Low health! Need healing!",
    hurt_callouts: &["Engaged in combat!", "Fighting here!", "Hostiles engaged!"],
    fallback_line: "The adventure continues!",
    extra_actions: &["scout", "warn", "explore", "find"],
    build_tips: &[],
    craft_path: "",
    hand_gear: &["netherite_sword", "diamond_sword", "iron_sword"],
};

#[cfg(test)]
mod tests {
    use super::*;

    fn context(time_of_day: u32, hostiles: usize, materials: usize) -> ContextSnapshot {
        ContextSnapshot {
            time_of_day,
            health: 20.0,
            target: None,
            hostiles_nearby: hostiles,
            material_stacks: materials,
            companion: None,
        }
    }

    #[test]
    fn test_persona_parsing() {
        assert_eq!("Oracle".parse::<PersonaKind>(), Ok(PersonaKind::Oracle));
        assert_eq!(" explorer ".parse::<PersonaKind>(), Ok(PersonaKind::Explorer));
        assert!("wizard".parse::<PersonaKind>().is_err());
        assert_eq!(PersonaKind::Architect.to_string(), "Architect");
    }

    #[test]
    fn test_timing_table() {
        let oracle = PersonaKind::Oracle.persona().timing;
        let explorer = PersonaKind::Explorer.persona().timing;
        assert_eq!(oracle.min_message_interval, Duration::from_secs(8));
        assert_eq!(explorer.proactive_interval, Duration::from_secs(35));
        assert_eq!(PersonaKind::Architect.persona().timing.peer_acceptance, 0.4);
        for kind in [PersonaKind::Oracle, PersonaKind::Architect, PersonaKind::Explorer] {
            let timing = kind.persona().timing;
            assert!(timing.peer_reply_delay_min <= timing.peer_reply_delay_max);
            assert!(timing.team_callout_interval > timing.proactive_interval);
            assert!((0.35..=0.5).contains(&timing.peer_acceptance));
        }
    }

    #[test]
    fn test_every_low_health_callout_asks_for_healing() {
        for kind in [PersonaKind::Oracle, PersonaKind::Architect, PersonaKind::Explorer] {
            assert!(kind.persona().low_health_callout.contains("healing"));
        }
    }

    #[test]
    fn test_timing_overrides() {
        let overrides = TimingOverrides {
            min_message_interval_ms: Some(500),
            peer_acceptance: Some(3.0),
            peer_reply_delay_min_ms: Some(9000),
            ..Default::default()
        };
        let timing = PersonaKind::Oracle.persona().timing.with_overrides(&overrides);
        assert_eq!(timing.min_message_interval, Duration::from_millis(500));
        assert_eq!(timing.peer_acceptance, 1.0);
        assert_eq!(timing.peer_reply_delay_max, Duration::from_millis(9000));
        assert_eq!(timing.proactive_interval, Duration::from_secs(25));
    }

    #[test]
    fn test_action_vocabulary() {
        let oracle = PersonaKind::Oracle.persona().actions();
        assert_eq!(oracle.last().map(String::as_str), Some("chat"));
        let explorer = PersonaKind::Explorer.persona().actions();
        assert!(explorer.contains(&"scout".to_string()));
        assert_eq!(explorer.last().map(String::as_str), Some("chat"));
        assert!(PersonaKind::Architect.persona().has_action("craft_path"));
        assert!(!PersonaKind::Oracle.persona().has_action("craft_path"));
    }

    #[test]
    fn test_callout_candidates_extend_with_context() {
        let oracle = PersonaKind::Oracle.persona();
        let day = oracle.callout_candidates("Alice", &context(1000, 0, 0));
        assert_eq!(day.len(), 9);
        assert!(day.contains(&"Team at your service, Alice!".to_string()));

        let night = oracle.callout_candidates("Alice", &context(15000, 2, 0));
        assert_eq!(night.len(), 13);

        let explorer = PersonaKind::Explorer.persona();
        let threats = explorer.callout_candidates("friend", &context(1000, 3, 0));
        assert!(threats.contains(&"Alert! 3 hostiles spotted!".to_string()));

        let architect = PersonaKind::Architect.persona();
        assert_eq!(architect.callout_candidates("friend", &context(1000, 0, 4)).len(), 10);
    }

    #[test]
    fn test_proactive_prompt_layout() {
        let explorer = PersonaKind::Explorer.persona();
        let prompt =
            explorer.proactive_prompt("Alice", &context(1000, 0, 0), "Quiet", Some("Area clear"));
        assert!(prompt.starts_with("You are TheExplorer"));
        assert!(prompt.contains("Scout Report:\nArea clear"));
        assert!(prompt.contains("Recent chat:\nQuiet"));
        assert!(prompt.contains("3. FOLLOW: Scout alongside Alice"));
        assert!(prompt.contains("4. SCOUT: Report on the area"));
    }

    #[test]
    fn test_fill() {
        assert_eq!(
            fill("{bot} said: {message}", &[("bot", "TheOracle"), ("message", "hi")]),
            "TheOracle said: hi"
        );
    }
}
