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

//! LLM (Large Language Model) integration for agent chat and intent parsing

mod client;
mod manager;
mod providers;
mod types;

#[cfg(test)]
pub use client::MockCompletion;
pub use client::{Completion, LlmClient};
pub use manager::LlmManager;
pub use providers::{
    AnthropicProvider, GeminiProvider, LlmProvider, OllamaProvider, OpenAiProvider,
    create_provider,
};
pub use types::{LlmConfig, LlmError, LlmMessage, LlmRequest, LlmResponse, LlmRole, ProviderKind};
