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

//! Building blocks of the per-agent decision loop

pub mod chat_log;
pub mod context;
pub mod directive;
pub mod persona;
pub mod rate_limit;

pub use chat_log::{ChatEntry, ChatLog};
pub use context::{ContextSnapshot, ScoutReport};
pub use directive::{Directive, DirectiveKind, parse_directive};
pub use persona::{Persona, PersonaKind, Timing, TimingOverrides};
pub use rate_limit::{Cadence, RateLimitState, RateLimiter, RateLimits};

/// What a proactive check ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProactiveOutcome {
    /// The rate limiter or the proactive cadence said no
    RateLimited,
    /// No human player is online to talk to
    NoAudience,
    /// The world could not be read
    WorldUnavailable,
    /// The completion service failed; nothing was said
    ServiceFailed,
    /// The reply named no directive this persona offers
    NoDirective { filler_spoken: bool },
    /// A directive was applied
    Acted(Directive),
}
