use spell_core::spell::{CheckType, TargetReference};
use spell_core::testkit::{Sandbox, unit};
use spell_core::{
    CastController, CastRequest, DamageClass, EffectIndex, EffectKind, ImplicitTarget, Location,
    ObjectGuid, Position, SpellAttributes, SpellDefinition, SpellEffect, SpellId, SpellRange,
    SpellTargets,
};

const CASTER: ObjectGuid = ObjectGuid(1);

fn instant(id: u32, effect: SpellEffect) -> SpellDefinition {
    let mut spell = SpellDefinition::new(SpellId(id), "instant");
    spell.range = SpellRange::symmetric(40.0);
    spell.effects = vec![effect];
    spell
}

fn hit_units(controller: &CastController) -> Vec<ObjectGuid> {
    controller
        .instances()
        .flat_map(|cast| cast.registry().units().iter().map(|unit| unit.guid))
        .collect()
}

fn sorted(mut guids: Vec<ObjectGuid>) -> Vec<ObjectGuid> {
    guids.sort();
    guids
}

fn destination(controller: &CastController) -> Option<Position> {
    controller
        .instances()
        .find_map(|cast| cast.registry().destination(EffectIndex(0)).map(|dst| dst.position))
}

#[test]
fn chain_jumps_never_revisit_the_primary() {
    let sandbox = Sandbox::new();
    sandbox.spawn(unit(1, Position::ORIGIN));
    let primary = sandbox.spawn(unit(2, Position::new(10.0, 0.0, 0.0)).faction(2));
    for (id, x) in [(3, 12.0), (4, 14.0), (5, 16.0), (6, 18.0)] {
        sandbox.spawn(unit(id, Position::new(x, 0.0, 0.0)).faction(2));
    }
    sandbox.register(instant(
        300,
        SpellEffect::new(EffectKind::SchoolDamage, ImplicitTarget::target_enemy())
            .with_chain(3)
            .with_base_points(4),
    ));

    let env = sandbox.env();
    let mut controller = CastController::new(CASTER, 1);
    controller
        .prepare(
            &env,
            CastRequest::new(CASTER, SpellId(300), SpellTargets::unit(primary.guid)),
        )
        .expect("prepare");

    let hits = hit_units(&controller);
    assert_eq!(hits.len(), 3);
    assert_eq!(hits.iter().filter(|guid| **guid == primary.guid).count(), 1);
    assert!(hits.contains(&ObjectGuid(3)));
    assert!(hits.contains(&ObjectGuid(4)));
    assert_eq!(sandbox.damage_dealt(ObjectGuid(5)), 0);
}

#[test]
fn ranged_chain_links_are_not_bound_to_the_jump_radius() {
    let sandbox = Sandbox::new();
    sandbox.spawn(unit(1, Position::ORIGIN));
    let primary = sandbox.spawn(unit(2, Position::new(10.0, 0.0, 0.0)).faction(2));
    // 6y from the primary, then 9.2y on to the last link
    sandbox.spawn(unit(3, Position::new(16.0, 0.0, 0.0)).faction(2));
    sandbox.spawn(unit(4, Position::new(10.0, 7.0, 0.0)).faction(2));
    let mut spell = instant(
        304,
        SpellEffect::new(EffectKind::SchoolDamage, ImplicitTarget::target_enemy())
            .with_chain(3)
            .with_base_points(5),
    );
    spell.damage_class = DamageClass::Ranged;
    sandbox.register(spell);

    let env = sandbox.env();
    let mut controller = CastController::new(CASTER, 1);
    controller
        .prepare(
            &env,
            CastRequest::new(CASTER, SpellId(304), SpellTargets::unit(primary.guid)),
        )
        .expect("prepare");

    assert_eq!(
        sorted(hit_units(&controller)),
        vec![primary.guid, ObjectGuid(3), ObjectGuid(4)]
    );
    assert_eq!(sandbox.damage_dealt(ObjectGuid(4)), 5);
}

#[test]
fn area_selection_is_capped() {
    let sandbox = Sandbox::new();
    sandbox.spawn(unit(1, Position::ORIGIN));
    for id in 0..25u64 {
        let angle = id as f32 * std::f32::consts::TAU / 25.0;
        let position = Position::new(4.0 * angle.cos(), 4.0 * angle.sin(), 0.0);
        sandbox.spawn(unit(10 + id, position).faction(2));
    }
    let mut spell = instant(
        301,
        SpellEffect::new(
            EffectKind::SchoolDamage,
            ImplicitTarget::area(TargetReference::Caster, CheckType::Enemy),
        )
        .with_radius(5.0)
        .with_base_points(1),
    );
    spell.max_affected_targets = 20;
    sandbox.register(spell);

    let env = sandbox.env();
    let mut controller = CastController::new(CASTER, 9);
    controller
        .prepare(&env, CastRequest::new(CASTER, SpellId(301), SpellTargets::none()))
        .expect("prepare");

    let hits = hit_units(&controller);
    assert_eq!(hits.len(), 20);
    assert!(!hits.contains(&CASTER));
}

#[test]
fn furthest_targets_are_preferred_when_asked() {
    let sandbox = Sandbox::new();
    sandbox.spawn(unit(1, Position::ORIGIN));
    for (id, x) in [(2, 2.0), (3, 4.0), (4, 6.0), (5, 8.0)] {
        sandbox.spawn(unit(id, Position::new(x, 0.0, 0.0)).faction(2));
    }
    let mut spell = instant(
        302,
        SpellEffect::new(
            EffectKind::SchoolDamage,
            ImplicitTarget::area(TargetReference::Caster, CheckType::Enemy),
        )
        .with_radius(10.0),
    );
    spell.max_affected_targets = 2;
    spell.attributes |= SpellAttributes::PREFER_FURTHEST_TARGETS;
    sandbox.register(spell);

    let env = sandbox.env();
    let mut controller = CastController::new(CASTER, 2);
    controller
        .prepare(&env, CastRequest::new(CASTER, SpellId(302), SpellTargets::none()))
        .expect("prepare");

    let mut hits = hit_units(&controller);
    hits.sort();
    assert_eq!(hits, vec![ObjectGuid(4), ObjectGuid(5)]);
}

#[test]
fn same_seed_selects_the_same_targets() {
    let select = |seed: u64| {
        let sandbox = Sandbox::new();
        sandbox.spawn(unit(1, Position::ORIGIN));
        for id in 0..12u64 {
            sandbox.spawn(unit(10 + id, Position::new(1.0 + id as f32 * 0.5, 0.0, 0.0)).faction(2));
        }
        let mut spell = instant(
            303,
            SpellEffect::new(
                EffectKind::SchoolDamage,
                ImplicitTarget::area(TargetReference::Caster, CheckType::Enemy),
            )
            .with_radius(10.0),
        );
        spell.max_affected_targets = 5;
        sandbox.register(spell);

        let env = sandbox.env();
        let mut controller = CastController::new(CASTER, seed);
        controller
            .prepare(&env, CastRequest::new(CASTER, SpellId(303), SpellTargets::none()))
            .expect("prepare");
        hit_units(&controller)
    };

    assert_eq!(select(42), select(42));
}

#[test]
fn cone_defaults_to_a_quarter_arc() {
    let run = |target: ImplicitTarget| {
        let sandbox = Sandbox::new();
        sandbox.spawn(unit(1, Position::ORIGIN));
        for (id, x, y) in [(2, 5.0, 0.0), (3, 5.0, 4.0), (4, 3.0, 5.0), (5, -5.0, 1.0)] {
            sandbox.spawn(unit(id, Position::new(x, y, 0.0)).faction(2));
        }
        sandbox.register(instant(
            305,
            SpellEffect::new(EffectKind::SchoolDamage, target)
                .with_radius(10.0)
                .with_base_points(1),
        ));

        let env = sandbox.env();
        let mut controller = CastController::new(CASTER, 3);
        controller
            .prepare(&env, CastRequest::new(CASTER, SpellId(305), SpellTargets::none()))
            .expect("prepare");
        sorted(hit_units(&controller))
    };

    assert_eq!(
        run(ImplicitTarget::cone(CheckType::Enemy)),
        vec![ObjectGuid(2), ObjectGuid(3)]
    );
    assert_eq!(
        run(ImplicitTarget::frontal_cone()),
        vec![ObjectGuid(2), ObjectGuid(3), ObjectGuid(4)]
    );
}

#[test]
fn capped_line_keeps_the_nearest_targets() {
    let sandbox = Sandbox::new();
    sandbox.spawn(unit(1, Position::ORIGIN));
    for (id, x, y) in [(5, 16.0, 0.0), (4, 12.0, 0.0), (3, 8.0, 0.5), (2, 4.0, 0.0), (6, 8.0, 6.0)] {
        sandbox.spawn(unit(id, Position::new(x, y, 0.0)).faction(2));
    }
    let mut spell = instant(
        306,
        SpellEffect::new(
            EffectKind::SchoolDamage,
            ImplicitTarget::line(TargetReference::Dest, CheckType::Enemy),
        )
        .with_radius(20.0)
        .with_base_points(1),
    );
    spell.max_affected_targets = 2;
    sandbox.register(spell);

    let env = sandbox.env();
    let mut controller = CastController::new(CASTER, 4);
    controller
        .prepare(
            &env,
            CastRequest::new(
                CASTER,
                SpellId(306),
                SpellTargets::destination(Position::new(20.0, 0.0, 0.0)),
            ),
        )
        .expect("prepare");

    assert_eq!(sorted(hit_units(&controller)), vec![ObjectGuid(2), ObjectGuid(3)]);
    assert_eq!(sandbox.damage_dealt(ObjectGuid(6)), 0);
}

fn throw_at(sandbox: &Sandbox, target: Position) -> CastController {
    sandbox.register(instant(
        307,
        SpellEffect::new(EffectKind::Dummy, ImplicitTarget::dest_trajectory()),
    ));
    let env = sandbox.env();
    let mut controller = CastController::new(CASTER, 5);
    controller
        .prepare(
            &env,
            CastRequest::new(
                CASTER,
                SpellId(307),
                SpellTargets::destination(target).with_src(Location::at(Position::ORIGIN)),
            ),
        )
        .expect("prepare");
    controller
}

#[test]
fn trajectory_ignores_objects_outside_the_flight_path() {
    let sandbox = Sandbox::new();
    sandbox.spawn(unit(1, Position::ORIGIN));
    sandbox.spawn(unit(2, Position::new(-5.0, 0.0, 0.0)).faction(2));
    sandbox.spawn(unit(3, Position::new(9.0, 15.0, 0.0)).faction(2));

    let controller = throw_at(&sandbox, Position::new(30.0, 0.0, 0.0));

    let landed = destination(&controller).expect("destination");
    assert!((landed.x - 30.0).abs() < 1e-3);
    assert!(landed.y.abs() < 1e-3);
}

#[test]
fn trajectory_stops_at_the_first_object_in_its_path() {
    let sandbox = Sandbox::new();
    sandbox.spawn(unit(1, Position::ORIGIN));
    sandbox.spawn(unit(2, Position::new(20.0, 0.0, 0.0)).faction(2));
    sandbox.spawn(unit(3, Position::new(12.0, 1.0, 0.0)).faction(2));

    let controller = throw_at(&sandbox, Position::new(30.0, 0.0, 0.0));

    // the nearer blocker, less its bounding size
    let landed = destination(&controller).expect("destination");
    assert!((landed.x - 11.0).abs() < 1e-3);
    assert!(landed.y.abs() < 1e-3);
}
