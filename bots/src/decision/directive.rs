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

//! Proactive directives and their parser.
//!
//! The completion service is asked to pick exactly one directive from a
//! small menu. The parser looks for upper-case directive keywords, takes the
//! earliest one the persona offers, and fails closed to [`Directive::NoOp`]
//! when the reply contains none.

use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    Say,
    Coordinate,
    Follow,
    Advise,
    Tip,
    Warn,
    Scout,
}

impl DirectiveKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            DirectiveKind::Say => "SAY",
            DirectiveKind::Coordinate => "COORDINATE",
            DirectiveKind::Follow => "FOLLOW",
            DirectiveKind::Advise => "ADVISE",
            DirectiveKind::Tip => "TIP",
            DirectiveKind::Warn => "WARN",
            DirectiveKind::Scout => "SCOUT",
        }
    }

    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "SAY" => Some(DirectiveKind::Say),
            "COORDINATE" => Some(DirectiveKind::Coordinate),
            "FOLLOW" => Some(DirectiveKind::Follow),
            "ADVISE" => Some(DirectiveKind::Advise),
            "TIP" => Some(DirectiveKind::Tip),
            "WARN" => Some(DirectiveKind::Warn),
            "SCOUT" => Some(DirectiveKind::Scout),
            _ => None,
        }
    }

    /// Whether the directive carries a message after its keyword
    pub fn takes_text(&self) -> bool {
        matches!(self, DirectiveKind::Say | DirectiveKind::Coordinate)
    }
}

/// One parsed proactive decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Speak; an empty message means the persona's default line
    Say(String),
    /// Address the team; empty means the persona's default line
    Coordinate(String),
    Follow,
    Advise,
    Tip,
    Warn,
    Scout,
    /// Nothing recognisable in the reply
    NoOp,
}

impl Directive {
    pub fn kind(&self) -> Option<DirectiveKind> {
        match self {
            Directive::Say(_) => Some(DirectiveKind::Say),
            Directive::Coordinate(_) => Some(DirectiveKind::Coordinate),
            Directive::Follow => Some(DirectiveKind::Follow),
            Directive::Advise => Some(DirectiveKind::Advise),
            Directive::Tip => Some(DirectiveKind::Tip),
            Directive::Warn => Some(DirectiveKind::Warn),
            Directive::Scout => Some(DirectiveKind::Scout),
            Directive::NoOp => None,
        }
    }
}

static KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(SAY|COORDINATE|FOLLOW|ADVISE|TIP|WARN|SCOUT)\b:?")
        .expect("directive pattern compiles")
});

/// Parse a completion reply against the directives a persona offers
pub fn parse_directive(reply: &str, allowed: &[DirectiveKind]) -> Directive {
    let found = KEYWORD.captures_iter(reply).find_map(|caps| {
        let whole = caps.get(0)?;
        let kind = DirectiveKind::from_keyword(caps.get(1)?.as_str())?;
        allowed.contains(&kind).then_some((kind, whole.end()))
    });

    let Some((kind, end)) = found else {
        return Directive::NoOp;
    };
    match kind {
        DirectiveKind::Say => Directive::Say(payload(&reply[end..])),
        DirectiveKind::Coordinate => Directive::Coordinate(payload(&reply[end..])),
        DirectiveKind::Follow => Directive::Follow,
        DirectiveKind::Advise => Directive::Advise,
        DirectiveKind::Tip => Directive::Tip,
        DirectiveKind::Warn => Directive::Warn,
        DirectiveKind::Scout => Directive::Scout,
    }
}

/// Rest of the line, without brackets or quotes
fn payload(rest: &str) -> String {
    rest.lines()
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '[' | ']'))
        .trim()
        .to_string()
}

/// Cut `text` to at most `budget` characters
pub fn truncate_chars(text: &str, budget: usize) -> String {
    text.chars().take(budget).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORACLE: &[DirectiveKind] = &[
        DirectiveKind::Say,
        DirectiveKind::Coordinate,
        DirectiveKind::Follow,
        DirectiveKind::Advise,
    ];
    const EXPLORER: &[DirectiveKind] = &[
        DirectiveKind::Say,
        DirectiveKind::Warn,
        DirectiveKind::Follow,
        DirectiveKind::Scout,
    ];

    #[test]
    fn test_say_with_message() {
        assert_eq!(
            parse_directive("SAY: \"Torches up, night is coming!\"", ORACLE),
            Directive::Say("Torches up, night is coming!".into())
        );
        assert_eq!(
            parse_directive("1. SAY: [Hello team]\nThen maybe FOLLOW", ORACLE),
            Directive::Say("Hello team".into())
        );
    }

    #[test]
    fn test_empty_payload() {
        assert_eq!(parse_directive("COORDINATE:", ORACLE), Directive::Coordinate(String::new()));
    }

    #[test]
    fn test_earliest_keyword_wins() {
        assert_eq!(
            parse_directive("I'd FOLLOW them, then SAY: hi", ORACLE),
            Directive::Follow
        );
        assert_eq!(parse_directive("ADVISE", ORACLE), Directive::Advise);
    }

    #[test]
    fn test_keywords_outside_persona_are_skipped() {
        assert_eq!(parse_directive("TIP: build with stairs", ORACLE), Directive::NoOp);
        assert_eq!(
            parse_directive("WARN the team. SCOUT later.", EXPLORER),
            Directive::Warn
        );
        assert_eq!(
            parse_directive("COORDINATE then SCOUT", EXPLORER),
            Directive::Scout
        );
    }

    #[test]
    fn test_fails_closed() {
        assert_eq!(parse_directive("", ORACLE), Directive::NoOp);
        assert_eq!(
            parse_directive("say hello and follow the player", ORACLE),
            Directive::NoOp
        );
        assert_eq!(parse_directive("SAYING things", ORACLE), Directive::NoOp);
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate_chars("Wood→Stone", 5), "Wood→");
        assert_eq!(truncate_chars("short", 80), "short");
    }
}
