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


//! Action executor properties seen through the public API

mod support;

use std::sync::Arc;
use support::*;
use triad_bots::actions::{ActionExecutor, ActionRequest};

fn executor() -> (Arc<FakeWorld>, ActionExecutor) {
    let world = Arc::new(FakeWorld::new("TheOracle"));
    let executor = ActionExecutor::new(world.clone());
    (world, executor)
}

#[tokio::test]
async fn mine_partial_success_is_success() {
    let (world, executor) = executor();
    world.add_blocks("iron_ore", &row(4, 2));

    let result = executor
        .execute(
            &ActionRequest::new("mine")
                .with_param("block", "iron_ore")
                .with_param("count", 3),
        )
        .await;
    assert!(result.success);
    assert!(result.message.contains('2'), "{}", result.message);
    assert_eq!(world.collected().len(), 2);
}

#[tokio::test]
async fn equip_missing_item_issues_no_equip_call() {
    let (world, executor) = executor();
    world.add_item("iron_sword", 1);

    let result = executor
        .execute(&ActionRequest::new("equip").with_param("item", "diamond_pickaxe"))
        .await;
    assert!(!result.success);
    assert_eq!(result.message, "Don't have diamond_pickaxe");
    assert!(
        !world
            .effector_calls()
            .iter()
            .any(|c| matches!(c, WorldCall::Equip { .. }))
    );
}

#[tokio::test]
async fn follow_unseen_target_installs_no_pursuit() {
    let (world, executor) = executor();
    world.add_offline_player("Alice");

    let result = executor
        .execute(&ActionRequest::new("follow").with_param("target", "Alice"))
        .await;
    assert!(!result.success);
    assert_eq!(result.message, "Can't see Alice");
    assert!(
        !world
            .effector_calls()
            .iter()
            .any(|c| matches!(c, WorldCall::SetPursuitGoal { .. }))
    );
    assert_eq!(executor.follow_target(), None);
}

#[tokio::test]
async fn stop_is_idempotent() {
    let (world, executor) = executor();
    let alice = world.add_player("Alice", Vec3::new(5.0, 64.0, 0.0));
    executor
        .execute(&ActionRequest::new("follow").with_param("target", "Alice"))
        .await;
    assert_eq!(executor.follow_target().as_deref(), Some("Alice"));
    assert!(world.effector_calls().contains(&WorldCall::SetPursuitGoal {
        target: alice,
        standoff: 2.0,
    }));

    world.clear_calls();
    let first = executor.execute(&ActionRequest::new("stop")).await;
    let first_calls = world.effector_calls();
    world.clear_calls();
    let second = executor.execute(&ActionRequest::new("stop")).await;
    let second_calls = world.effector_calls();

    assert!(first.success && second.success);
    assert_eq!(first, second);
    assert_eq!(first_calls, second_calls);
    assert_eq!(first_calls, vec![WorldCall::ClearGoal, WorldCall::StopCombat]);
    assert_eq!(executor.follow_target(), None);
}

#[tokio::test]
async fn failures_are_results_not_errors() {
    let (world, executor) = executor();
    world.disconnect();

    for request in [
        ActionRequest::new("follow").with_param("target", "Alice"),
        ActionRequest::new("come"),
        ActionRequest::new("mine").with_param("block", "stone"),
        ActionRequest::new("gather"),
        ActionRequest::new("equip").with_param("item", "sword"),
        ActionRequest::new("dance"),
    ] {
        let result = executor.execute(&request).await;
        assert!(!result.success);
        assert!(!result.message.is_empty());
    }

    let inventory = executor.execute(&ActionRequest::new("inventory")).await;
    assert!(inventory.success);
}
