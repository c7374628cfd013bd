//! Concurrent join handling: serialized per guild, parallel across guilds.

use std::sync::Arc;
use std::time::Duration;

use invite_engine::{EngineConfig, InMemoryPlatform, InviteEngine};
use invite_types::{GuildId, InviteRecord, MemberId};

const X: MemberId = MemberId::new(100);

fn setup(fetch_delay: Duration) -> (Arc<InviteEngine>, Arc<InMemoryPlatform>) {
    let platform = Arc::new(InMemoryPlatform::new().with_fetch_delay(fetch_delay));
    let engine = Arc::new(InviteEngine::new(EngineConfig::default(), platform.clone()).unwrap());
    (engine, platform)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_joins_in_one_guild_do_not_double_count() {
    let guild = GuildId::new(1);
    let (engine, platform) = setup(Duration::from_millis(20));
    platform.create_invite(guild, InviteRecord::owned_by("z", 0, X));
    engine.on_startup(&[guild]).await;

    // one use through the invite, one direct join, dispatched together
    platform.record_use(guild, &"z".into());
    let a = tokio::spawn({
        let engine = engine.clone();
        async move { engine.on_member_join(guild, MemberId::new(1)).await }
    });
    let b = tokio::spawn({
        let engine = engine.clone();
        async move { engine.on_member_join(guild, MemberId::new(2)).await }
    });

    let (a, b) = (a.await.unwrap(), b.await.unwrap());
    let attributed = [&a, &b].iter().filter(|r| r.is_attributed()).count();

    assert_eq!(attributed, 1);
    assert_eq!(engine.get_count(guild, X), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_concurrent_joins_never_exceed_uses() {
    let guild = GuildId::new(1);
    let (engine, platform) = setup(Duration::from_millis(2));
    platform.create_invite(guild, InviteRecord::owned_by("z", 0, X));
    engine.on_startup(&[guild]).await;

    let handles: Vec<_> = (0..32u64)
        .map(|member| {
            platform.record_use(guild, &"z".into());
            let engine = engine.clone();
            tokio::spawn(async move { engine.on_member_join(guild, MemberId::new(member)).await })
        })
        .collect();
    for joined in futures::future::join_all(handles).await {
        joined.unwrap();
    }

    let count = engine.get_count(guild, X);
    assert!((1..=32).contains(&count), "count {count} out of range");

    // the stored baseline is the latest platform state
    let stored = engine.snapshots().get(guild).await.unwrap();
    assert_eq!(stored.get(&"z".into()).unwrap().uses, 32);
}

#[tokio::test(start_paused = true)]
async fn different_guilds_proceed_in_parallel() {
    let (engine, platform) = setup(Duration::from_millis(100));
    let (g1, g2) = (GuildId::new(1), GuildId::new(2));
    platform.create_invite(g1, InviteRecord::owned_by("a", 0, X));
    platform.create_invite(g2, InviteRecord::owned_by("b", 0, X));

    let start = tokio::time::Instant::now();
    tokio::join!(
        engine.on_member_join(g1, MemberId::new(1)),
        engine.on_member_join(g2, MemberId::new(2)),
    );
    let parallel = start.elapsed();
    assert!(parallel >= Duration::from_millis(100));
    assert!(parallel < Duration::from_millis(150), "took {parallel:?}");

    let start = tokio::time::Instant::now();
    tokio::join!(
        engine.on_member_join(g1, MemberId::new(3)),
        engine.on_member_join(g1, MemberId::new(4)),
    );
    assert!(start.elapsed() >= Duration::from_millis(200));
}
