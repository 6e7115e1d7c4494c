//! Spell catalog loader.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, ensure};
use serde::{Deserialize, Serialize};
use spell_core::{CastConfig, LinkTrigger, LinkedSpell, SpellDefinition, SpellId};

use crate::catalog::SpellCatalog;
use crate::loaders::{LoadResult, read_file};

/// Row of the linked-spell table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkEntry {
    pub spell: SpellId,
    pub trigger: LinkTrigger,
    pub linked: LinkedSpell,
}

/// Spell catalog structure for RON files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpellCatalogFile {
    pub spells: Vec<SpellDefinition>,
    #[serde(default)]
    pub links: Vec<LinkEntry>,
}

/// Loader for the spell catalog from RON files.
pub struct SpellLoader;

impl SpellLoader {
    /// Load the spell catalog from a RON file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or parsed, when two definitions
    /// share an id, when a definition carries more effects than a target mask
    /// can address, or when the link table names an unknown spell.
    pub fn load(path: &Path) -> LoadResult<SpellCatalog> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    /// Parse a catalog from RON text.
    pub fn parse(content: &str) -> LoadResult<SpellCatalog> {
        let file: SpellCatalogFile = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse spell catalog RON: {}", e))?;
        Self::build(file)
    }

    /// Validate a parsed catalog file and index it.
    pub fn build(file: SpellCatalogFile) -> LoadResult<SpellCatalog> {
        let mut seen = HashSet::new();
        for spell in &file.spells {
            if !seen.insert(spell.id) {
                bail!("Duplicate spell id {} ({})", spell.id.0, spell.name);
            }
            ensure!(
                spell.effects.len() <= CastConfig::MAX_EFFECTS,
                "Spell {} ({}) has {} effects, at most {} are supported",
                spell.id.0,
                spell.name,
                spell.effects.len(),
                CastConfig::MAX_EFFECTS
            );
        }

        let mut catalog = SpellCatalog::new();
        for spell in file.spells {
            catalog.insert(spell);
        }

        for entry in file.links {
            let linked = match entry.linked {
                LinkedSpell::Cast(id) | LinkedSpell::RemoveAura(id) => id,
            };
            for id in [entry.spell, linked] {
                ensure!(
                    catalog.contains(id),
                    "Linked spell table references unknown spell {}",
                    id.0
                );
            }
            catalog.link(entry.spell, entry.trigger, entry.linked);
        }

        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spell_core::{EffectKind, SpellAttributes, SpellDuration, SpellOracle};

    #[test]
    fn parses_definitions_and_links() {
        let catalog = SpellLoader::parse(
            r#"(
                spells: [
                    (
                        id: SpellId(10),
                        name: "Shadow Bolt",
                        cast_time_ms: 2500,
                        speed: 20.0,
                        range: (max_hostile: 30.0, max_friendly: 30.0),
                        effects: [
                            (
                                kind: SchoolDamage,
                                target_a: (object: Unit, reference: Target, selection: Default, check: Enemy),
                                base_points: 40,
                            ),
                        ],
                    ),
                    (
                        id: SpellId(11),
                        name: "Drain Life",
                        attributes: "CHANNELED",
                        duration: Finite(5000),
                    ),
                ],
                links: [
                    (spell: SpellId(10), trigger: Hit, linked: Cast(SpellId(11))),
                ],
            )"#,
        )
        .expect("catalog");

        let bolt = catalog.spell(SpellId(10)).expect("bolt");
        assert_eq!(bolt.cast_time_ms, 2500);
        assert_eq!(bolt.effects[0].kind, EffectKind::SchoolDamage);
        assert_eq!(bolt.effects[0].base_points, 40);

        let drain = catalog.spell(SpellId(11)).expect("drain");
        assert!(drain.is_channeled());
        assert_eq!(drain.duration, SpellDuration::Finite(5000));

        assert_eq!(
            catalog.linked_spells(SpellId(10), LinkTrigger::Hit),
            vec![LinkedSpell::Cast(SpellId(11))]
        );
    }

    #[test]
    fn attribute_words_use_flag_names() {
        let catalog = SpellLoader::parse(
            r#"(
                spells: [
                    (
                        id: SpellId(12),
                        name: "Mind Flay",
                        attributes: "CHANNELED | NO_PUSHBACK",
                        duration: Finite(3000),
                    ),
                ],
            )"#,
        )
        .expect("catalog");

        let flay = catalog.spell(SpellId(12)).expect("flay");
        assert_eq!(
            flay.attributes,
            SpellAttributes::CHANNELED | SpellAttributes::NO_PUSHBACK
        );

        let written = ron::to_string(&flay.attributes).expect("serialize");
        assert!(written.starts_with('"'));
        assert!(written.contains("NO_PUSHBACK"));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let file = SpellCatalogFile {
            spells: vec![
                SpellDefinition::new(SpellId(1), "a"),
                SpellDefinition::new(SpellId(1), "b"),
            ],
            links: Vec::new(),
        };
        let error = SpellLoader::build(file).expect_err("duplicate");
        assert!(error.to_string().contains("Duplicate spell id 1"));
    }

    #[test]
    fn dangling_links_are_rejected() {
        let file = SpellCatalogFile {
            spells: vec![SpellDefinition::new(SpellId(1), "a")],
            links: vec![LinkEntry {
                spell: SpellId(1),
                trigger: LinkTrigger::Cast,
                linked: LinkedSpell::RemoveAura(SpellId(99)),
            }],
        };
        let error = SpellLoader::build(file).expect_err("dangling");
        assert!(error.to_string().contains("unknown spell 99"));
    }
}
