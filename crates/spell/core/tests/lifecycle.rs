use spell_core::testkit::{Sandbox, unit};
use spell_core::{
    CastCategory, CastController, CastNotification, CastRequest, CastState, EffectKind,
    ImplicitTarget, ObjectGuid, Position, SpellAttributes, SpellDefinition, SpellDuration,
    SpellEffect, SpellId, SpellRange, SpellTargets,
};

const CASTER: ObjectGuid = ObjectGuid(1);

fn drain_channel(id: u32) -> SpellDefinition {
    let mut spell = SpellDefinition::new(SpellId(id), "drain");
    spell.attributes |= SpellAttributes::CHANNELED;
    spell.duration = SpellDuration::Finite(5000);
    spell.range = SpellRange::symmetric(30.0);
    spell.effects = vec![SpellEffect::new(
        EffectKind::ApplyAura,
        ImplicitTarget::target_enemy(),
    )];
    spell
}

fn channel_ended(sandbox: &Sandbox) -> bool {
    sandbox.notifications().iter().any(|notification| {
        matches!(
            notification,
            CastNotification::ChannelUpdate { remaining_ms: 0, .. }
        )
    })
}

/// Prepares the channel and lets the zero cast time run out.
fn start_channel(sandbox: &Sandbox, target: ObjectGuid) -> (CastController, spell_core::CastId) {
    let env = sandbox.env();
    let mut controller = CastController::new(CASTER, 5);
    let id = controller
        .prepare(&env, CastRequest::new(CASTER, SpellId(400), SpellTargets::unit(target)))
        .expect("prepare");
    controller.update(&env, 0).expect("update");
    let channel = controller.instance(id).expect("channel");
    assert_eq!(channel.state(), CastState::Casting);
    (controller, id)
}

#[test]
fn projectile_delay_follows_distance_and_speed() {
    let sandbox = Sandbox::new();
    sandbox.spawn(unit(1, Position::ORIGIN));
    let target = sandbox.spawn(unit(2, Position::new(10.0, 0.0, 0.0)).faction(2));
    let mut spell = SpellDefinition::new(SpellId(401), "arrow");
    spell.speed = 10.0;
    spell.range = SpellRange::symmetric(35.0);
    spell.effects = vec![
        SpellEffect::new(EffectKind::SchoolDamage, ImplicitTarget::target_enemy())
            .with_base_points(3),
    ];
    sandbox.register(spell);

    let env = sandbox.env();
    let mut controller = CastController::new(CASTER, 3);
    let id = controller
        .prepare(&env, CastRequest::new(CASTER, SpellId(401), SpellTargets::unit(target.guid)))
        .expect("prepare");

    let cast = controller.instance(id).expect("cast");
    assert_eq!(cast.state(), CastState::Delayed);
    assert_eq!(cast.registry().units()[0].delay_ms, 1000);
    assert_eq!(sandbox.scheduled(id), Some(1000));

    assert_eq!(controller.handle_delayed(&env, id, 1000), Ok(0));
    assert_eq!(sandbox.damage_dealt(target.guid), 3);
}

#[test]
fn cancelling_a_channel_strips_each_aura_once() {
    let sandbox = Sandbox::new();
    sandbox.spawn(unit(1, Position::ORIGIN));
    let target = sandbox.spawn(unit(2, Position::new(10.0, 0.0, 0.0)).faction(2));
    sandbox.register(drain_channel(400));

    let (mut controller, id) = start_channel(&sandbox, target.guid);
    assert_eq!(sandbox.auras_on(target.guid).len(), 1);

    let env = sandbox.env();
    controller.cancel(&env, id).expect("cancel");
    assert_eq!(sandbox.removed_auras().len(), 1);
    assert!(sandbox.auras_on(target.guid).is_empty());
    assert_eq!(
        controller.instance(id).map(|cast| cast.state()),
        Some(CastState::Finished)
    );

    controller.cancel(&env, id).expect("second cancel");
    assert_eq!(sandbox.removed_auras().len(), 1);
    let interrupted = sandbox
        .notifications()
        .iter()
        .filter(|notification| matches!(notification, CastNotification::Interrupted { .. }))
        .count();
    assert_eq!(interrupted, 1);
}

#[test]
fn channel_ends_when_its_target_dies() {
    let sandbox = Sandbox::new();
    sandbox.spawn(unit(1, Position::ORIGIN));
    let target = sandbox.spawn(unit(2, Position::new(10.0, 0.0, 0.0)).faction(2));
    sandbox.register(drain_channel(400));

    let (mut controller, _) = start_channel(&sandbox, target.guid);
    let env = sandbox.env();
    controller.update(&env, 1000).expect("tick");
    assert!(!channel_ended(&sandbox));

    sandbox.kill(target.guid);
    controller.update(&env, 100).expect("tick");
    assert!(channel_ended(&sandbox));
    assert!(controller.current(CastCategory::Channeled).is_none());
    assert_eq!(sandbox.removed_auras().len(), 1);
    assert!(sandbox.auras_on(target.guid).is_empty());
}

#[test]
fn channel_ends_when_its_target_runs_out_of_range() {
    let sandbox = Sandbox::new();
    sandbox.spawn(unit(1, Position::ORIGIN));
    let target = sandbox.spawn(unit(2, Position::new(10.0, 0.0, 0.0)).faction(2));
    sandbox.register(drain_channel(400));

    let (mut controller, _) = start_channel(&sandbox, target.guid);
    sandbox.move_to(target.guid, Position::new(100.0, 0.0, 0.0));

    let env = sandbox.env();
    controller.update(&env, 100).expect("tick");
    assert!(channel_ended(&sandbox));
    assert_eq!(sandbox.removed_auras().len(), 1);
}

#[test]
fn channel_runs_its_full_duration() {
    let sandbox = Sandbox::new();
    sandbox.spawn(unit(1, Position::ORIGIN));
    let target = sandbox.spawn(unit(2, Position::new(10.0, 0.0, 0.0)).faction(2));
    sandbox.register(drain_channel(400));

    let (mut controller, _) = start_channel(&sandbox, target.guid);
    let env = sandbox.env();
    controller.update(&env, 4999).expect("tick");
    assert!(!channel_ended(&sandbox));
    controller.update(&env, 1).expect("tick");
    assert!(channel_ended(&sandbox));
    assert!(controller.is_empty());
}

#[test]
fn channel_pushback_is_reduced_by_resistance_and_capped() {
    let sandbox = Sandbox::new();
    sandbox.spawn(unit(1, Position::ORIGIN));
    let target = sandbox.spawn(unit(2, Position::new(10.0, 0.0, 0.0)).faction(2));
    sandbox.register(drain_channel(400));
    sandbox.set_pushback_resist(CASTER, 40);

    let (mut controller, id) = start_channel(&sandbox, target.guid);
    let env = sandbox.env();
    controller.update(&env, 1000).expect("tick");

    // a quarter of 5000ms, less 40%
    assert_eq!(controller.pushback(&env), 1);
    assert!(sandbox.notifications().iter().any(|notification| matches!(
        notification,
        CastNotification::ChannelUpdate { remaining_ms: 3250, .. }
    )));
    let aura = controller
        .instance(id)
        .and_then(|channel| channel.registry().units().first())
        .and_then(|record| record.aura)
        .expect("aura");
    assert_eq!(sandbox.aura_delay(aura), Some(750));

    assert_eq!(controller.pushback(&env), 1);
    assert_eq!(controller.pushback(&env), 0);
    assert_eq!(controller.instance(id).map(|channel| channel.pushbacks()), Some(2));

    controller.update(&env, 2499).expect("tick");
    assert!(!channel_ended(&sandbox));
    controller.update(&env, 1).expect("tick");
    assert!(channel_ended(&sandbox));
}
