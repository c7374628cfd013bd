//! End-to-end attribution scenarios driven through the engine facade.

use std::sync::Arc;

use invite_engine::{
    EngineConfig, EngineEvent, GrantOutcome, InMemoryPlatform, InviteEngine, JoinStatus,
    PlatformError,
};
use invite_types::{GuildId, InviteRecord, MemberId, RewardId};

const G: GuildId = GuildId::new(1);
const X: MemberId = MemberId::new(100);
const Y: MemberId = MemberId::new(200);
const REWARD: RewardId = RewardId::new(900);

fn engine_with_goal(goal: u64) -> (InviteEngine, Arc<InMemoryPlatform>) {
    let platform = Arc::new(InMemoryPlatform::new());
    let engine = InviteEngine::new(EngineConfig::with_goal(goal), platform.clone()).unwrap();
    (engine, platform)
}

#[tokio::test]
async fn twenty_joins_grant_exactly_once() {
    let (engine, platform) = engine_with_goal(20);
    platform.create_invite(G, InviteRecord::owned_by("z", 0, X));
    engine.set_reward(G, REWARD);

    // G has no snapshot until startup records "z" at 0 uses
    assert!(engine.snapshots().get(G).await.is_none());
    engine.on_startup(&[G]).await;

    let mut intents = Vec::new();
    for member in 1..=20u64 {
        platform.record_use(G, &"z".into());
        let result = engine.on_member_join(G, MemberId::new(member)).await;
        assert_eq!(result.new_count, Some(member));
        if let Some(intent) = result.grant_intent {
            intents.push((member, intent));
        }
    }

    assert_eq!(engine.get_count(G, X), 20);
    assert_eq!(intents.len(), 1);
    assert_eq!(intents[0].0, 20);
    assert_eq!(intents[0].1.reward_id, REWARD);

    for member in 21..=25u64 {
        platform.record_use(G, &"z".into());
        let result = engine.on_member_join(G, MemberId::new(member)).await;
        assert!(result.grant_intent.is_none());
    }
    assert_eq!(engine.get_count(G, X), 25);
}

#[tokio::test]
async fn unseeded_guild_starts_tracking_on_first_join() {
    let (engine, platform) = engine_with_goal(20);
    platform.create_invite(G, InviteRecord::owned_by("z", 0, X));

    platform.record_use(G, &"z".into());
    let first = engine.on_member_join(G, MemberId::new(1)).await;
    assert_eq!(first.status, JoinStatus::Unattributed);
    assert_eq!(engine.get_count(G, X), 0);

    platform.record_use(G, &"z".into());
    let second = engine.on_member_join(G, MemberId::new(2)).await;
    assert_eq!(second.inviter, Some(X));
    assert_eq!(engine.get_count(G, X), 1);
}

#[tokio::test]
async fn no_reward_means_counting_without_intents() {
    let (engine, platform) = engine_with_goal(2);
    platform.create_invite(G, InviteRecord::owned_by("a", 0, X));
    platform.create_invite(G, InviteRecord::owned_by("b", 0, Y));
    engine.on_startup(&[G]).await;

    let uses = ["a", "b", "a", "a", "b"];
    for (i, code) in uses.iter().enumerate() {
        platform.record_use(G, &(*code).into());
        let result = engine.on_member_join(G, MemberId::new(i as u64 + 1)).await;
        assert!(result.is_attributed());
        assert!(result.grant_intent.is_none());
    }

    // a direct join moves nothing
    let direct = engine.on_member_join(G, MemberId::new(99)).await;
    assert_eq!(direct.status, JoinStatus::Unattributed);

    assert_eq!(engine.get_count(G, X), 3);
    assert_eq!(engine.get_count(G, Y), 2);
}

#[tokio::test]
async fn fetch_permission_denied_leaves_state_untouched() {
    let (engine, platform) = engine_with_goal(20);
    platform.create_invite(G, InviteRecord::owned_by("z", 0, X));
    engine.on_startup(&[G]).await;

    platform.record_use(G, &"z".into());
    engine.on_member_join(G, MemberId::new(1)).await;

    let snapshot_before = engine.snapshots().get(G).await;
    let counts_before = engine.counter().counts_for(G);

    platform.record_use(G, &"z".into());
    platform.fail_fetch(G, PlatformError::PermissionDenied("manage_guild".into()));
    let result = engine.on_member_join(G, MemberId::new(2)).await;

    assert!(matches!(result.status, JoinStatus::FetchPermissionDenied { .. }));
    assert!(result.inviter.is_none());
    assert_eq!(engine.snapshots().get(G).await, snapshot_before);
    assert_eq!(engine.counter().counts_for(G), counts_before);

    // once healed, the next join re-diffs against the kept baseline and
    // picks up the use that happened during the outage
    platform.heal(G);
    platform.record_use(G, &"z".into());
    let healed = engine.on_member_join(G, MemberId::new(3)).await;
    assert_eq!(healed.new_count, Some(2));
}

#[tokio::test]
async fn startup_failure_in_one_guild_does_not_block_others() {
    let (engine, platform) = engine_with_goal(20);
    let other = GuildId::new(2);
    platform.create_invite(G, InviteRecord::owned_by("z", 0, X));
    platform.create_invite(other, InviteRecord::owned_by("q", 0, Y));
    platform.fail_fetch(G, PlatformError::PermissionDenied("manage_guild".into()));

    let report = engine.on_startup(&[G, other]).await;

    assert_eq!(report.seeded, vec![other]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, G);
    assert!(!report.is_complete());
    assert!(engine.snapshots().get(G).await.is_none());
    assert!(engine.snapshots().get(other).await.is_some());
}

#[tokio::test]
async fn reconfiguring_reward_has_no_residue() {
    let (engine, platform) = engine_with_goal(1);
    platform.create_invite(G, InviteRecord::owned_by("z", 0, X));
    engine.on_startup(&[G]).await;

    assert_eq!(engine.set_reward(G, RewardId::new(1)), None);
    assert_eq!(engine.set_reward(G, RewardId::new(2)), Some(RewardId::new(1)));
    assert_eq!(engine.reward_for(G), Some(RewardId::new(2)));

    platform.record_use(G, &"z".into());
    let intent = engine
        .on_member_join(G, MemberId::new(1))
        .await
        .grant_intent
        .unwrap();
    assert_eq!(intent.reward_id, RewardId::new(2));

    assert_eq!(engine.grant(&intent).await, GrantOutcome::Granted);
    let roles = platform.roles_of(G, X);
    assert!(roles.contains(&RewardId::new(2)));
    assert!(!roles.contains(&RewardId::new(1)));
}

#[tokio::test]
async fn deleted_and_new_invites_do_not_attribute() {
    let (engine, platform) = engine_with_goal(20);
    platform.create_invite(G, InviteRecord::owned_by("old", 4, X));
    engine.on_startup(&[G]).await;

    // old invite expires, a new one is created and used once
    platform.delete_invite(G, &"old".into());
    platform.create_invite(G, InviteRecord::owned_by("fresh", 1, Y));
    let result = engine.on_member_join(G, MemberId::new(1)).await;
    assert_eq!(result.status, JoinStatus::Unattributed);

    // the fresh invite is now tracked
    platform.record_use(G, &"fresh".into());
    let result = engine.on_member_join(G, MemberId::new(2)).await;
    assert_eq!(result.inviter, Some(Y));
}

#[tokio::test]
async fn grant_failures_are_reported_not_retried() {
    let (engine, platform) = engine_with_goal(1);
    let mut events = engine.subscribe();
    platform.create_invite(G, InviteRecord::owned_by("z", 0, X));
    platform.fail_grants(G, PlatformError::PermissionDenied("manage_roles".into()));
    engine.set_reward(G, REWARD);
    engine.on_startup(&[G]).await;

    platform.record_use(G, &"z".into());
    let intent = engine
        .on_member_join(G, MemberId::new(1))
        .await
        .grant_intent
        .unwrap();
    let outcome = engine.grant(&intent).await;

    assert_eq!(outcome, GrantOutcome::PermissionDenied("manage_roles".into()));
    assert_eq!(engine.get_count(G, X), 1);
    assert_eq!(platform.grant_count(), 0);

    let mut saw_failure = false;
    while let Ok(event) = events.try_recv() {
        if let EngineEvent::GrantFailed { member_id, .. } = event {
            assert_eq!(member_id, X);
            saw_failure = true;
        }
    }
    assert!(saw_failure);
}
