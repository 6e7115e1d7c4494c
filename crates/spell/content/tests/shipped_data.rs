use std::path::PathBuf;

use spell_content::ContentFactory;
use spell_core::testkit::{Sandbox, unit};
use spell_core::{
    CastConfig, CastController, CastRequest, LinkTrigger, LinkedSpell, ObjectGuid, Position,
    SpellId, SpellOracle, SpellTargets,
};

fn factory() -> ContentFactory {
    ContentFactory::new(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data"))
}

#[test]
fn shipped_config_matches_defaults() {
    let config = factory().load_config().expect("config");
    assert_eq!(config, CastConfig::DEFAULT);
}

#[test]
fn shipped_catalog_loads() {
    let catalog = factory().load_catalog().expect("catalog");

    let fireball = catalog.spell(SpellId(133)).expect("fireball");
    assert_eq!(fireball.cast_time_ms, 3500);
    assert!(fireball.has_hit_delay());

    let missiles = catalog.find_by_name("arcane missiles").expect("missiles");
    assert!(missiles.is_channeled());

    assert_eq!(
        catalog.linked_spells(SpellId(45438), LinkTrigger::Cast),
        vec![LinkedSpell::Cast(SpellId(41425))]
    );
}

#[test]
fn shipped_chain_lightning_reaches_three_targets() {
    let catalog = factory().load_catalog().expect("catalog");
    let spell = catalog.spell(SpellId(421)).expect("chain lightning");

    let sandbox = Sandbox::new();
    sandbox.register((*spell).clone());
    sandbox.spawn(unit(1, Position::ORIGIN));
    let primary = sandbox.spawn(unit(2, Position::new(20.0, 0.0, 0.0)).faction(2));
    for (id, y) in [(3, 4.0), (4, -4.0), (5, 8.0), (6, -8.0)] {
        sandbox.spawn(unit(id, Position::new(20.0, y, 0.0)).faction(2));
    }

    let env = sandbox.env();
    let caster = ObjectGuid(1);
    let mut controller = CastController::new(caster, 17);
    controller
        .prepare(
            &env,
            CastRequest::new(caster, SpellId(421), SpellTargets::unit(primary.guid)),
        )
        .expect("prepare");
    controller.update(&env, 2500).expect("update");

    let damaged = (2..=6)
        .filter(|id| sandbox.damage_dealt(ObjectGuid(*id)) > 0)
        .count();
    assert_eq!(damaged, 3);
    assert!(sandbox.damage_dealt(primary.guid) > 0);
}
