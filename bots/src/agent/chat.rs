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

//! Chat routing, player requests and peer replies

use super::{Agent, SAY_BUDGET, jitter, pick, roll};
use crate::actions::{ActionRequest, ActionResult};
use crate::decision::context::{WARN_RADIUS, count_threats};
use crate::decision::directive::truncate_chars;
use crate::decision::persona::fill;
use crate::goals::GoalKind;
use crate::intent::Intent;
use tokio::time::Instant;

const CHAT_MAX_TOKENS: u32 = 80;
const PEER_MAX_TOKENS: u32 = 60;
const FIND_RADIUS: f64 = 64.0;
const FIND_COUNT: usize = 10;

/// Where an observed chat line goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRoute {
    /// Our own line echoed back
    Own,
    /// A line from another agent
    Peer,
    /// A human addressing this agent
    Request,
    /// Anything else; logged only
    Ambient,
}

impl Agent {
    /// Record a chat line and decide who handles it
    pub fn route_chat(&self, from: &str, text: &str) -> ChatRoute {
        if from == self.name {
            return ChatRoute::Own;
        }
        self.chat_log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(from, text);
        if self.peers.contains(from) {
            ChatRoute::Peer
        } else if self.is_mentioned(text) {
            ChatRoute::Request
        } else {
            ChatRoute::Ambient
        }
    }

    /// Act on a request from a human player and speak the outcome
    pub async fn handle_chat(&self, from: &str, text: &str) {
        tracing::info!("[{}] Mentioned by {}: {}", self.name, from, text);
        let intent = self.interpreter.interpret(text, from).await;
        if intent.is_chat() {
            let reply = self.chat_reply(from, text).await;
            self.reply(&reply).await;
        } else {
            let result = self.execute_interpreted(&intent, from).await;
            if !result.message.is_empty() {
                self.reply(&result.message).await;
            }
        }
    }

    /// Free-form reply, or the persona's fallback line when the service fails
    pub async fn chat_reply(&self, from: &str, text: &str) -> String {
        let prompt = self.persona.chat_prompt(from, text);
        match self.completion.complete(&prompt, CHAT_MAX_TOKENS).await {
            Ok(reply) if !reply.trim().is_empty() => truncate_chars(reply.trim(), SAY_BUDGET),
            Ok(_) => self.persona.fallback_line.to_string(),
            Err(e) => {
                tracing::error!("[{}] Chat completion failed: {}", self.name, e);
                self.persona.fallback_line.to_string()
            }
        }
    }

    /// Answer a whisper privately
    pub async fn handle_whisper(&self, from: &str, text: &str) {
        if from == self.name {
            return;
        }
        tracing::info!("[{}] Whisper from {}: {}", self.name, from, text);
        let reply = self.chat_reply(from, text).await;
        self.whisper(from, &reply).await;
    }

    /// Dispatch an interpreted request
    pub async fn execute_interpreted(&self, intent: &Intent, requester: &str) -> ActionResult {
        let action = intent.action.as_str();
        if self.persona.has_action(action) {
            if let Some(result) = self.execute_persona_action(intent, requester).await {
                return result;
            }
        }

        match action {
            "follow" => {
                let target = intent.param("target").unwrap_or_else(|| requester.to_string());
                self.lock_state().follow_target = Some(target.clone());
                self.reply(&fill(self.persona.follow_ack, &[("player", requester)]))
                    .await;
                self.executor
                    .execute(&ActionRequest::new("follow").with_param("target", target))
                    .await
            }
            "protect" => {
                let target = intent.param("target").unwrap_or_else(|| requester.to_string());
                self.lock_state().protect_target = Some(target.clone());
                self.reply(self.persona.protect_ack).await;
                self.executor
                    .execute(&ActionRequest::new("protect").with_param("target", target))
                    .await
            }
            "stop" => {
                {
                    let mut state = self.lock_state();
                    state.follow_target = None;
                    state.protect_target = None;
                }
                if self.goals.is_running() {
                    self.goals.stop_goal().await;
                }
                self.executor.execute(&intent.to_request()).await
            }
            "goal_start" => {
                let Some(goal) = intent.param("goal") else {
                    return ActionResult::failure("No goal specified");
                };
                self.reply(&fill(self.persona.goal_ack, &[("goal", &goal)]))
                    .await;
                if matches!(goal.parse::<GoalKind>(), Ok(GoalKind::Defend)) {
                    self.lock_state().protect_target = Some(requester.to_string());
                }
                self.goals.start_goal(&goal, requester).await
            }
            _ => self.executor.execute(&intent.to_request()).await,
        }
    }

    /// Actions only some personas offer; `None` falls through to the shared set
    async fn execute_persona_action(
        &self,
        intent: &Intent,
        requester: &str,
    ) -> Option<ActionResult> {
        let result = match intent.action.as_str() {
            "build_tip" => ActionResult::success(pick(self.persona.build_tips).unwrap_or_default()),
            "craft_path" => ActionResult::success(self.persona.craft_path),
            "goal_stop" => self.goals.stop_goal().await,
            "scout" => {
                self.scout_and_report().await;
                ActionResult::success("")
            }
            "warn" => match count_threats(self.world.as_ref(), WARN_RADIUS).await {
                Ok(0) => ActionResult::success("All clear!"),
                Ok(n) => ActionResult::success(format!("{} threats nearby!", n)),
                Err(e) => ActionResult::failure(e.to_string()),
            },
            "explore" => self.goals.start_goal("explore", requester).await,
            "find" => self.find(intent).await,
            _ => return None,
        };
        Some(result)
    }

    /// Locate blocks of a kind without touching them
    async fn find(&self, intent: &Intent) -> ActionResult {
        let Some(kind) = intent.param("block").or_else(|| intent.param("item")) else {
            return ActionResult::failure("No block specified");
        };
        match self.world.is_known_block(&kind).await {
            Ok(false) => return ActionResult::failure(format!("Unknown block: {}", kind)),
            Ok(true) => {}
            Err(e) => return ActionResult::failure(e.to_string()),
        }
        match self.world.find_blocks(&kind, FIND_RADIUS, FIND_COUNT).await {
            Ok(found) if found.is_empty() => {
                ActionResult::failure(format!("No {} within {} blocks", kind, FIND_RADIUS))
            }
            Ok(found) => ActionResult::success(format!(
                "Found {} {} nearby! Nearest at {}, {}, {}",
                found.len(),
                kind,
                found[0].x,
                found[0].y,
                found[0].z
            )),
            Err(e) => ActionResult::failure(e.to_string()),
        }
    }

    /// Maybe answer another agent, after a short human-like pause.
    ///
    /// Returns whether a reply was spoken.
    pub async fn respond_to_peer(&self, from: &str, text: &str) -> bool {
        let now = Instant::now();
        if !self.limiter.can_speak(now) {
            tracing::debug!("[{}] Not answering {}: rate limited", self.name, from);
            return false;
        }
        if !roll(self.timing.peer_acceptance) {
            tracing::debug!("[{}] Letting {}'s line pass", self.name, from);
            return false;
        }
        if !self.limiter.try_acquire(None, now) {
            return false;
        }

        let prompt = self.persona.peer_prompt(from, text);
        let reply = match self.completion.complete(&prompt, PEER_MAX_TOKENS).await {
            Ok(reply) if !reply.trim().is_empty() => reply,
            Ok(_) => return false,
            Err(e) => {
                tracing::error!("[{}] Peer reply failed: {}", self.name, e);
                return false;
            }
        };

        let delay = jitter(
            self.timing.peer_reply_delay_min,
            self.timing.peer_reply_delay_max,
        );
        if !self.pause(delay).await {
            return false;
        }
        self.say(&reply).await;
        true
    }
}
