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

//! Per-agent "permission to speak" gate.
//!
//! Every self-initiated utterance must pass the shared minimum message
//! interval; proactive checks and team callouts additionally wait out their
//! own cadence. Checking and stamping happen under one lock, so two triggers
//! can never both pass the gate for overlapping decisions.

use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// A trigger with its own minimum interval on top of the message gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Proactive,
    TeamCallout,
}

/// Gate intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    pub min_message_interval: Duration,
    pub proactive_interval: Duration,
    pub team_callout_interval: Duration,
    pub hurt_callout_cooldown: Duration,
}

/// Time of the last utterance per trigger; `None` until the first one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitState {
    pub last_message: Option<Instant>,
    pub last_proactive: Option<Instant>,
    pub last_team_callout: Option<Instant>,
    pub last_hurt_callout: Option<Instant>,
}

pub struct RateLimiter {
    limits: RateLimits,
    state: Mutex<RateLimitState>,
}

/// `true` once at least `interval` has passed since `last`
fn elapsed(last: Option<Instant>, interval: Duration, now: Instant) -> bool {
    last.is_none_or(|last| now.saturating_duration_since(last) >= interval)
}

impl RateLimiter {
    pub fn new(limits: RateLimits) -> Self {
        Self {
            limits,
            state: Mutex::new(RateLimitState::default()),
        }
    }

    pub fn limits(&self) -> &RateLimits {
        &self.limits
    }

    pub fn snapshot(&self) -> RateLimitState {
        *self.lock()
    }

    /// Whether the shared message gate is open at `now`
    pub fn can_speak(&self, now: Instant) -> bool {
        elapsed(self.lock().last_message, self.limits.min_message_interval, now)
    }

    /// Whether `cadence` and the message gate are both open. Does not stamp.
    pub fn is_due(&self, cadence: Cadence, now: Instant) -> bool {
        let state = self.lock();
        self.cadence_open(&state, cadence, now)
            && elapsed(state.last_message, self.limits.min_message_interval, now)
    }

    /// Take permission to speak.
    ///
    /// Succeeds only when the message gate (and `cadence`, if given) is open,
    /// in which case both are stamped with `now`.
    pub fn try_acquire(&self, cadence: Option<Cadence>, now: Instant) -> bool {
        let mut state = self.lock();
        if !elapsed(state.last_message, self.limits.min_message_interval, now) {
            return false;
        }
        if let Some(cadence) = cadence {
            if !self.cadence_open(&state, cadence, now) {
                return false;
            }
            match cadence {
                Cadence::Proactive => state.last_proactive = Some(now),
                Cadence::TeamCallout => state.last_team_callout = Some(now),
            }
        }
        state.last_message = Some(now);
        true
    }

    /// Record an utterance that bypassed the gate (direct replies)
    pub fn stamp_message(&self, now: Instant) {
        self.lock().last_message = Some(now);
    }

    /// Take the hurt-callout slot, independent of the message gate
    pub fn try_hurt_callout(&self, now: Instant) -> bool {
        let mut state = self.lock();
        if !elapsed(state.last_hurt_callout, self.limits.hurt_callout_cooldown, now) {
            return false;
        }
        state.last_hurt_callout = Some(now);
        state.last_message = Some(now);
        true
    }

    fn cadence_open(&self, state: &RateLimitState, cadence: Cadence, now: Instant) -> bool {
        match cadence {
            Cadence::Proactive => {
                elapsed(state.last_proactive, self.limits.proactive_interval, now)
            }
            Cadence::TeamCallout => {
                elapsed(state.last_team_callout, self.limits.team_callout_interval, now)
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RateLimitState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
