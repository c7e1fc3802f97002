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

//! Self-initiated speech: proactive checks, team callouts and scouting

use super::{Agent, pick, roll};
use crate::actions::ActionRequest;
use crate::decision::context::{WARN_RADIUS, count_threats};
use crate::decision::persona::{ANONYMOUS_PLAYER, fill};
use crate::decision::{
    Cadence, ContextSnapshot, Directive, ProactiveOutcome, ScoutReport, parse_directive,
};
use tokio::time::Instant;

const PROACTIVE_MAX_TOKENS: u32 = 100;
const RECENT_CHAT_LINES: usize = 5;

impl Agent {
    /// One proactive decision: snapshot, ask, parse, apply.
    ///
    /// The speaking slot is taken before the completion call, so a failed or
    /// silent decision still counts against the cadence.
    pub async fn proactive_check(&self) -> ProactiveOutcome {
        if !self.limiter.is_due(Cadence::Proactive, Instant::now()) {
            return ProactiveOutcome::RateLimited;
        }

        let player = match self.human_players().await {
            Ok(players) => match players.into_iter().next() {
                Some(player) => player,
                None => return ProactiveOutcome::NoAudience,
            },
            Err(e) => {
                tracing::warn!("[{}] Proactive check skipped: {}", self.name, e);
                return ProactiveOutcome::WorldUnavailable;
            }
        };

        let context =
            match ContextSnapshot::capture(self.world.as_ref(), Some(&player), self.follow_target())
                .await
            {
                Ok(context) => context,
                Err(e) => {
                    tracing::warn!("[{}] Proactive check skipped: {}", self.name, e);
                    return ProactiveOutcome::WorldUnavailable;
                }
            };
        let scout_report = if self.persona.include_scout_report {
            ScoutReport::survey(self.world.as_ref())
                .await
                .ok()
                .map(|r| r.render())
        } else {
            None
        };
        let recent_chat = self
            .chat_log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .render_recent(RECENT_CHAT_LINES);

        if !self
            .limiter
            .try_acquire(Some(Cadence::Proactive), Instant::now())
        {
            return ProactiveOutcome::RateLimited;
        }

        let prompt = self.persona.proactive_prompt(
            &player,
            &context,
            &recent_chat,
            scout_report.as_deref(),
        );
        let reply = match self.completion.complete(&prompt, PROACTIVE_MAX_TOKENS).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("[{}] Proactive completion failed: {}", self.name, e);
                return ProactiveOutcome::ServiceFailed;
            }
        };

        let directive = parse_directive(&reply, &self.persona.directives());
        tracing::debug!("[{}] Proactive directive {:?}", self.name, directive);
        self.apply_directive(directive, &player).await
    }

    async fn apply_directive(&self, directive: Directive, player: &str) -> ProactiveOutcome {
        match &directive {
            Directive::Say(text) => {
                let text = if text.is_empty() { self.persona.default_say } else { text };
                self.say(text).await;
            }
            Directive::Coordinate(text) => {
                let text = if text.is_empty() {
                    self.persona.default_coordinate
                } else {
                    text
                };
                self.say(text).await;
            }
            Directive::Follow => {
                self.lock_state().follow_target = Some(player.to_string());
                self.executor
                    .execute(&ActionRequest::new("follow").with_param("target", player))
                    .await;
                self.say(&fill(self.persona.follow_reply, &[("player", player)]))
                    .await;
            }
            Directive::Advise | Directive::Tip => {
                if let Some(tip) = pick(self.persona.tips) {
                    self.say(&tip).await;
                }
            }
            Directive::Warn => match count_threats(self.world.as_ref(), WARN_RADIUS).await {
                Ok(0) => self.say("All clear - no immediate threats!").await,
                Ok(n) => self.say(&format!("Alert! {} hostile mobs detected!", n)).await,
                Err(e) => tracing::warn!("[{}] Threat count failed: {}", self.name, e),
            },
            Directive::Scout => self.scout_and_report().await,
            Directive::NoOp => {
                let filler_spoken = match self.persona.filler {
                    Some(filler) if roll(self.timing.filler_chance) => {
                        self.say(filler).await;
                        true
                    }
                    _ => false,
                };
                return ProactiveOutcome::NoDirective { filler_spoken };
            }
        }
        ProactiveOutcome::Acted(directive)
    }

    /// A canned line to keep the channel lively; never calls the completion
    /// service. Returns the line spoken, if any.
    pub async fn team_callout(&self) -> Option<String> {
        if !self.limiter.is_due(Cadence::TeamCallout, Instant::now()) {
            return None;
        }

        let player = match self.human_players().await {
            Ok(players) => players
                .into_iter()
                .next()
                .unwrap_or_else(|| ANONYMOUS_PLAYER.to_string()),
            Err(e) => {
                tracing::warn!("[{}] Team callout skipped: {}", self.name, e);
                return None;
            }
        };
        let context = match ContextSnapshot::capture(self.world.as_ref(), None, None).await {
            Ok(context) => context,
            Err(e) => {
                tracing::warn!("[{}] Team callout skipped: {}", self.name, e);
                return None;
            }
        };

        let candidates = self.persona.callout_candidates(&player, &context);
        let refs: Vec<&str> = candidates.iter().map(String::as_str).collect();
        let line = pick(&refs)?;

        if !self
            .limiter
            .try_acquire(Some(Cadence::TeamCallout), Instant::now())
        {
            return None;
        }
        self.say(&line).await;
        Some(line)
    }

    /// Speak a three-level threat summary
    pub async fn scout_and_report(&self) {
        let threats = match count_threats(self.world.as_ref(), WARN_RADIUS).await {
            Ok(threats) => threats,
            Err(e) => {
                tracing::warn!("[{}] Scouting failed: {}", self.name, e);
                return;
            }
        };
        let report = match threats {
            0 => "Scout report: All clear around us!".to_string(),
            1..=2 => format!("Minor threat: {} mob(s) spotted.", threats),
            _ => format!("Team alert! {} hostiles in the area!", threats),
        };
        self.say(&report).await;
    }
}
