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


//! Decision loop: message gate, proactive outcomes, team callouts and peer
//! replies

mod support;

use std::sync::Arc;
use std::time::Duration;
use support::*;
use tokio::time::Instant;
use triad_bots::decision::{Directive, PersonaKind, ProactiveOutcome, Timing};
use triad_bots::intent::{IntentInterpreter, parse_intent};
use triad_bots::llm::LlmError;

#[tokio::test(start_paused = true)]
async fn message_gate_holds_until_the_interval_has_passed() {
    let h = Harness::new(PersonaKind::Oracle);
    h.add_alice();
    h.completion.push_reply("SAY: Hello team!");

    h.agent.rate_limiter().stamp_message(Instant::now());
    tokio::time::advance(Duration::from_millis(7999)).await;
    assert_eq!(h.agent.proactive_check().await, ProactiveOutcome::RateLimited);
    assert!(h.agent.team_callout().await.is_none());
    assert!(h.world.chat_lines().is_empty());
    assert_eq!(h.completion.call_count(), 0);

    tokio::time::advance(Duration::from_millis(1)).await;
    assert_eq!(
        h.agent.proactive_check().await,
        ProactiveOutcome::Acted(Directive::Say("Hello team!".to_string()))
    );
    assert_eq!(h.world.chat_lines(), vec!["Hello team!"]);
}

#[tokio::test(start_paused = true)]
async fn unrecognized_reply_stays_silent_but_uses_the_slot() {
    let h = Harness::new(PersonaKind::Architect);
    h.add_alice();
    h.completion.push_reply("Let's just keep walking for a while.");

    assert_eq!(
        h.agent.proactive_check().await,
        ProactiveOutcome::NoDirective {
            filler_spoken: false
        }
    );
    assert!(h.world.chat_lines().is_empty());
    assert_eq!(h.agent.proactive_check().await, ProactiveOutcome::RateLimited);
    assert_eq!(h.completion.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn oracle_filler_on_unrecognized_reply() {
    let h = Harness::with_timing(PersonaKind::Oracle, |t| Timing {
        filler_chance: 1.0,
        ..t
    });
    h.add_alice();
    // SCOUT is not on the Oracle's menu
    h.completion.push_reply("SCOUT the caves");

    assert_eq!(
        h.agent.proactive_check().await,
        ProactiveOutcome::NoDirective {
            filler_spoken: true
        }
    );
    assert_eq!(h.world.chat_lines(), vec!["I'm here to help, friends!"]);
}

#[tokio::test(start_paused = true)]
async fn service_failure_is_silent() {
    let h = Harness::new(PersonaKind::Explorer);
    h.add_alice();
    h.completion
        .push_error(LlmError::Network("connection refused".to_string()));

    assert_eq!(h.agent.proactive_check().await, ProactiveOutcome::ServiceFailed);
    assert!(h.world.chat_lines().is_empty());
    assert_eq!(h.agent.proactive_check().await, ProactiveOutcome::RateLimited);
}

#[tokio::test(start_paused = true)]
async fn no_human_audience_means_no_request() {
    let h = Harness::new(PersonaKind::Oracle);
    h.world
        .add_player("TheExplorer", Vec3::new(3.0, 64.0, 0.0));

    assert_eq!(h.agent.proactive_check().await, ProactiveOutcome::NoAudience);
    assert_eq!(h.completion.call_count(), 0);

    // Nothing was stamped, so the next check may go ahead
    h.add_alice();
    h.completion.push_reply("COORDINATE");
    assert_eq!(
        h.agent.proactive_check().await,
        ProactiveOutcome::Acted(Directive::Coordinate(String::new()))
    );
    assert_eq!(h.world.chat_lines(), vec!["Team, stay together!"]);
}

#[tokio::test(start_paused = true)]
async fn follow_directive_follows_the_player() {
    let h = Harness::new(PersonaKind::Oracle);
    let alice = h.add_alice();
    h.completion.push_reply("I choose FOLLOW");

    assert_eq!(
        h.agent.proactive_check().await,
        ProactiveOutcome::Acted(Directive::Follow)
    );
    assert_eq!(h.agent.follow_target().as_deref(), Some("Alice"));
    assert!(
        h.world
            .effector_calls()
            .iter()
            .any(|c| matches!(c, WorldCall::SetPursuitGoal { target, .. } if *target == alice))
    );
    assert_eq!(h.world.chat_lines(), vec!["I'll walk with you, Alice."]);
}

#[tokio::test(start_paused = true)]
async fn explorer_warns_with_scout_report() {
    let h = Harness::new(PersonaKind::Explorer);
    h.add_alice();
    h.world
        .add_entity("zombie", EntityKind::Mob, Vec3::new(10.0, 64.0, 0.0));
    h.world
        .add_entity("cow", EntityKind::Mob, Vec3::new(-4.0, 64.0, 0.0));
    h.completion.push_reply("WARN: zombies!");

    assert_eq!(
        h.agent.proactive_check().await,
        ProactiveOutcome::Acted(Directive::Warn)
    );
    assert_eq!(h.world.chat_lines(), vec!["Alert! 1 hostile mobs detected!"]);

    let prompt = &h.completion.prompts()[0];
    assert!(prompt.contains("Scout Report:\nHostile mobs: 1\nAnimals: 1"));
    assert!(prompt.contains("1 hostile mobs nearby!"));
    assert!(prompt.contains("Alice is 5 blocks away"));
}

#[tokio::test(start_paused = true)]
async fn scout_report_levels() {
    let h = Harness::new(PersonaKind::Explorer);
    h.agent.scout_and_report().await;
    for x in [4.0, 6.0, 8.0] {
        h.world
            .add_entity("skeleton", EntityKind::Mob, Vec3::new(x, 64.0, 0.0));
    }
    h.agent.scout_and_report().await;
    assert_eq!(
        h.world.chat_lines(),
        vec![
            "Scout report: All clear around us!",
            "Team alert! 3 hostiles in the area!"
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn team_callout_never_calls_the_service() {
    let h = Harness::new(PersonaKind::Architect);
    let line = h.agent.team_callout().await.expect("a callout is spoken");
    assert_eq!(h.world.chat_lines(), vec![line.clone()]);
    assert!(PersonaKind::Architect.persona().callouts.contains(&line.as_str()));
    assert_eq!(h.completion.call_count(), 0);

    // Both the message gate and the callout cadence are closed now
    tokio::time::advance(Duration::from_secs(10)).await;
    assert!(h.agent.team_callout().await.is_none());
    tokio::time::advance(Duration::from_secs(40)).await;
    assert!(h.agent.team_callout().await.is_some());
}

#[tokio::test(start_paused = true)]
async fn peer_reply_after_delay() {
    let h = Harness::with_timing(PersonaKind::Oracle, |t| Timing {
        peer_acceptance: 1.0,
        ..t
    });
    h.completion.push_reply("Great find, Architect!");

    let started = Instant::now();
    h.agent
        .handle_event(WorldEvent::Chat {
            from: "TheArchitect".to_string(),
            text: "Found a cave full of iron".to_string(),
        })
        .await;
    assert!(started.elapsed() >= Duration::from_millis(2000));
    assert_eq!(h.world.chat_lines(), vec!["Great find, Architect!"]);
    assert!(h.completion.prompts()[0].contains("TheArchitect said: \"Found a cave full of iron\""));

    // Gate closed: the next peer line is ignored
    h.completion.push_reply("Agreed!");
    assert!(!h.agent.respond_to_peer("TheExplorer", "Night is coming").await);
    assert_eq!(h.completion.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn peer_lines_can_be_declined() {
    let h = Harness::with_timing(PersonaKind::Explorer, |t| Timing {
        peer_acceptance: 0.0,
        ..t
    });
    assert!(!h.agent.respond_to_peer("TheOracle", "Explorer, scout ahead").await);
    assert_eq!(h.completion.call_count(), 0);
    // Peer lines never count as requests, even when they mention the agent
    assert_eq!(h.agent.chat_log().len(), 0);
    h.agent
        .handle_event(WorldEvent::Chat {
            from: "TheOracle".to_string(),
            text: "TheExplorer, scout ahead".to_string(),
        })
        .await;
    assert_eq!(h.completion.call_count(), 0);
    assert_eq!(h.agent.chat_log().len(), 1);
}

#[tokio::test]
async fn reply_without_json_becomes_chat() {
    let completion = Arc::new(ScriptedCompletion::new().with_reply("Sure, I can do that!"));
    let interpreter = IntentInterpreter::new(completion, vec!["follow".to_string()]);

    let intent = interpreter.interpret("follow me please", "Alice").await;
    assert!(intent.is_chat());
    assert_eq!(intent.confidence, 0.5);
    assert!(intent.params.is_empty());
}

#[test]
fn placeholder_target_becomes_requester() {
    let reply = intent_reply("protect", r#"{"target": "PLAYER_NAME"}"#);
    let intent = tokio_test::assert_ok!(parse_intent(&reply, "Alice"));
    assert_eq!(intent.action, "protect");
    assert_eq!(intent.param("target").as_deref(), Some("Alice"));
    tokio_test::assert_err!(parse_intent("no json here", "Alice"));
}
