//! In-memory spell catalog.

use std::collections::HashMap;
use std::sync::Arc;

use spell_core::{LinkTrigger, LinkedSpell, SpellDefinition, SpellId, SpellOracle};

/// Spell definitions by id plus the linked-spell table.
///
/// Definitions are shared as `Arc`s so cast instances can hold on to the
/// definition they were prepared with.
#[derive(Debug, Clone, Default)]
pub struct SpellCatalog {
    spells: HashMap<SpellId, Arc<SpellDefinition>>,
    links: HashMap<(SpellId, LinkTrigger), Vec<LinkedSpell>>,
}

impl SpellCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a definition, returning the one it replaced.
    pub fn insert(&mut self, spell: SpellDefinition) -> Option<Arc<SpellDefinition>> {
        self.spells.insert(spell.id, Arc::new(spell))
    }

    /// Appends `linked` to the entries fired for `spell` on `trigger`.
    pub fn link(&mut self, spell: SpellId, trigger: LinkTrigger, linked: LinkedSpell) {
        self.links.entry((spell, trigger)).or_default().push(linked);
    }

    pub fn contains(&self, id: SpellId) -> bool {
        self.spells.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.spells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spells.is_empty()
    }

    /// Known spell ids in ascending order.
    pub fn ids(&self) -> Vec<SpellId> {
        let mut ids: Vec<SpellId> = self.spells.keys().copied().collect();
        ids.sort();
        ids
    }

    /// First definition whose name matches, ignoring case.
    pub fn find_by_name(&self, name: &str) -> Option<Arc<SpellDefinition>> {
        self.spells
            .values()
            .find(|spell| spell.name.eq_ignore_ascii_case(name))
            .cloned()
    }
}

impl SpellOracle for SpellCatalog {
    fn spell(&self, id: SpellId) -> Option<Arc<SpellDefinition>> {
        self.spells.get(&id).cloned()
    }

    fn linked_spells(&self, id: SpellId, trigger: LinkTrigger) -> Vec<LinkedSpell> {
        self.links.get(&(id, trigger)).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_by_id() {
        let mut catalog = SpellCatalog::new();
        assert!(catalog.insert(SpellDefinition::new(SpellId(1), "first")).is_none());
        let replaced = catalog.insert(SpellDefinition::new(SpellId(1), "second"));

        assert_eq!(replaced.map(|spell| spell.name.clone()), Some("first".to_string()));
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.spell(SpellId(1)).map(|spell| spell.name.clone()), Some("second".to_string()));
    }

    #[test]
    fn links_are_kept_per_trigger() {
        let mut catalog = SpellCatalog::new();
        catalog.link(SpellId(1), LinkTrigger::Hit, LinkedSpell::Cast(SpellId(2)));
        catalog.link(SpellId(1), LinkTrigger::Hit, LinkedSpell::RemoveAura(SpellId(3)));

        assert_eq!(
            catalog.linked_spells(SpellId(1), LinkTrigger::Hit),
            vec![LinkedSpell::Cast(SpellId(2)), LinkedSpell::RemoveAura(SpellId(3))]
        );
        assert!(catalog.linked_spells(SpellId(1), LinkTrigger::Cast).is_empty());
    }

    #[test]
    fn lookup_by_name_ignores_case() {
        let mut catalog = SpellCatalog::new();
        catalog.insert(SpellDefinition::new(SpellId(7), "Frost Nova"));

        assert_eq!(catalog.find_by_name("frost nova").map(|spell| spell.id), Some(SpellId(7)));
        assert!(catalog.find_by_name("blizzard").is_none());
    }
}
