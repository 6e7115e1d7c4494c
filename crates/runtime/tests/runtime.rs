use std::path::PathBuf;
use std::sync::Arc;

use cast_runtime::{CastRuntime, RuntimeConfig, RuntimeError, Topic};
use spell_content::ContentFactory;
use spell_core::testkit::{Sandbox, unit};
use spell_core::{
    CastNotification, CastRequest, CastState, ObjectGuid, Position, SpellId, SpellTargets,
};

const CASTER: ObjectGuid = ObjectGuid(1);
const FIREBALL: SpellId = SpellId(133);
const ICE_BLOCK: SpellId = SpellId(45438);
const HYPOTHERMIA: SpellId = SpellId(41425);

fn shipped_content() -> ContentFactory {
    ContentFactory::new(
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../spell/content/data"),
    )
}

fn manual_config() -> RuntimeConfig {
    RuntimeConfig {
        tick_interval: None,
        ..RuntimeConfig::default()
    }
}

fn arena() -> Arc<Sandbox> {
    let sandbox = Arc::new(Sandbox::new());
    sandbox.spawn(unit(1, Position::ORIGIN));
    sandbox.spawn(unit(2, Position::new(24.0, 0.0, 0.0)).faction(2));
    sandbox
}

fn runtime(sandbox: &Arc<Sandbox>) -> CastRuntime {
    CastRuntime::builder(Arc::clone(sandbox))
        .config(manual_config())
        .content(&shipped_content())
        .expect("content")
        .build()
        .expect("runtime")
}

#[tokio::test]
async fn fireball_lands_after_its_cast_time_and_travel() {
    let sandbox = arena();
    let runtime = runtime(&sandbox);
    let handle = runtime.handle();
    let mut casts = handle.subscribe(Topic::Cast).expect("cast topic");

    let cast = handle
        .prepare(CastRequest::new(
            CASTER,
            FIREBALL,
            SpellTargets::unit(ObjectGuid(2)),
        ))
        .await
        .expect("prepare");

    match casts.recv().await.expect("cast start") {
        CastNotification::CastStart {
            cast: started,
            cast_time_ms,
            ..
        } => {
            assert_eq!(started, cast);
            assert_eq!(cast_time_ms, 3500);
        }
        other => panic!("unexpected notification {other:?}"),
    }

    let live = handle.query(CASTER).await.expect("query");
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].state, CastState::Preparing);

    handle.advance(3500).await.expect("advance");
    assert!(matches!(
        casts.recv().await.expect("spell go"),
        CastNotification::SpellGo { .. }
    ));
    assert_eq!(sandbox.damage_dealt(ObjectGuid(2)), 0);

    // 24 yards at 24 yards per second
    let report = handle.advance(1000).await.expect("advance");
    assert_eq!(report.now_ms, 4500);
    assert_eq!(report.waves, 1);
    assert!(sandbox.damage_dealt(ObjectGuid(2)) > 0);
    assert!(handle.query(CASTER).await.expect("query").is_empty());

    runtime.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn cast_links_trigger_their_spell() {
    let sandbox = arena();
    let runtime = runtime(&sandbox);
    let handle = runtime.handle();

    handle
        .prepare(CastRequest::new(CASTER, ICE_BLOCK, SpellTargets::none()))
        .await
        .expect("prepare");

    let spells: Vec<SpellId> = sandbox
        .auras_on(CASTER)
        .iter()
        .map(|aura| aura.spell)
        .collect();
    assert!(spells.contains(&ICE_BLOCK));
    assert!(spells.contains(&HYPOTHERMIA));

    runtime.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn cancelled_casts_report_an_interruption() {
    let sandbox = arena();
    let runtime = runtime(&sandbox);
    let handle = runtime.handle();
    let mut failures = handle.subscribe(Topic::Failure).expect("failure topic");

    let cast = handle
        .prepare(CastRequest::new(
            CASTER,
            FIREBALL,
            SpellTargets::unit(ObjectGuid(2)),
        ))
        .await
        .expect("prepare");
    handle.cancel(CASTER, cast).await.expect("cancel");

    assert!(matches!(
        failures.recv().await.expect("failure"),
        CastNotification::Interrupted { cast: interrupted, .. } if interrupted == cast
    ));

    handle.advance(5000).await.expect("advance");
    assert_eq!(sandbox.damage_dealt(ObjectGuid(2)), 0);

    let unknown = handle.cancel(ObjectGuid(42), cast).await;
    assert!(matches!(unknown, Err(RuntimeError::UnknownCaster(ObjectGuid(42)))));

    runtime.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn building_without_spells_fails() {
    let result = CastRuntime::builder(arena()).config(manual_config()).build();
    assert!(matches!(result, Err(RuntimeError::MissingCatalog)));
}

#[tokio::test]
async fn handles_fail_once_the_worker_is_gone() {
    let sandbox = arena();
    let runtime = runtime(&sandbox);
    let handle = runtime.handle();
    runtime.shutdown().await.expect("shutdown");

    let result = handle.advance(100).await;
    assert!(matches!(result, Err(RuntimeError::CommandChannelClosed)));
}

#[tokio::test(start_paused = true)]
async fn interval_clock_advances_casts() {
    let sandbox = arena();
    let runtime = CastRuntime::builder(Arc::clone(&sandbox))
        .content(&shipped_content())
        .expect("content")
        .tick_interval(Some(std::time::Duration::from_millis(100)))
        .build()
        .expect("runtime");
    let handle = runtime.handle();

    handle
        .prepare(CastRequest::new(
            CASTER,
            FIREBALL,
            SpellTargets::unit(ObjectGuid(2)),
        ))
        .await
        .expect("prepare");

    tokio::time::sleep(std::time::Duration::from_millis(5000)).await;
    assert!(sandbox.damage_dealt(ObjectGuid(2)) > 0);

    runtime.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn content_is_read_from_the_data_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join("spells.ron"),
        r#"(
    spells: [
        (
            id: SpellId(9000),
            name: "Quick Mend",
            effects: [
                (
                    kind: Heal,
                    target_a: (object: Unit, reference: Caster, selection: Default),
                    base_points: 50,
                    positive: true,
                ),
            ],
        ),
    ],
)"#,
    )
    .expect("write spells");

    let sandbox = arena();
    let runtime = CastRuntime::builder(Arc::clone(&sandbox))
        .config(manual_config())
        .content(&ContentFactory::new(dir.path()))
        .expect("content")
        .build()
        .expect("runtime");

    runtime
        .handle()
        .prepare(CastRequest::new(CASTER, SpellId(9000), SpellTargets::none()))
        .await
        .expect("prepare");
    assert_eq!(sandbox.healing_done(CASTER), 50);

    runtime.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn malformed_content_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("spells.ron"), "(spells: [").expect("write spells");

    let result = CastRuntime::builder(arena()).content(&ContentFactory::new(dir.path()));
    assert!(matches!(result, Err(RuntimeError::Content(_))));
}
