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

//! Recent chat as seen by one agent

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

pub const CHAT_LOG_CAPACITY: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct ChatEntry {
    pub from: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Bounded FIFO of observed chat lines.
///
/// Conversational context only; never a source of truth about other agents.
#[derive(Debug, Clone)]
pub struct ChatLog {
    entries: VecDeque<ChatEntry>,
    capacity: usize,
}

impl Default for ChatLog {
    fn default() -> Self {
        Self::with_capacity(CHAT_LOG_CAPACITY)
    }
}

impl ChatLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, from: &str, message: &str) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(ChatEntry {
            from: from.to_string(),
            message: message.to_string(),
            at: Utc::now(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The newest `n` entries, oldest first
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &ChatEntry> {
        self.entries.iter().skip(self.entries.len().saturating_sub(n))
    }

    /// The newest `n` entries as `from: message` lines, or `Quiet`
    pub fn render_recent(&self, n: usize) -> String {
        let lines: Vec<String> = self
            .recent(n)
            .map(|e| format!("{}: {}", e.from, e.message))
            .collect();
        if lines.is_empty() {
            "Quiet".to_string()
        } else {
            lines.join("\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_oldest_at_capacity() {
        let mut log = ChatLog::default();
        for i in 0..25 {
            log.push("Alice", &format!("line {}", i));
        }
        assert_eq!(log.len(), CHAT_LOG_CAPACITY);
        assert_eq!(log.recent(CHAT_LOG_CAPACITY).next().unwrap().message, "line 5");
    }

    #[test]
    fn test_render_recent() {
        let mut log = ChatLog::with_capacity(3);
        assert_eq!(log.render_recent(5), "Quiet");

        log.push("Alice", "hi");
        log.push("TheOracle", "hello Alice");
        log.push("Bob", "yo");
        log.push("Alice", "follow me");
        assert_eq!(log.render_recent(2), "Bob: yo\nAlice: follow me");
        assert_eq!(log.render_recent(5).lines().count(), 3);
    }
}
