use std::sync::Arc;

use crate::spell::{LinkTrigger, LinkedSpell, SpellDefinition};
use crate::types::SpellId;

/// Read-only spell catalog.
pub trait SpellOracle: Send + Sync {
    /// Definition for `id`, if the catalog knows it.
    fn spell(&self, id: SpellId) -> Option<Arc<SpellDefinition>>;

    /// Table-driven spells linked to `id` for the given trigger.
    fn linked_spells(&self, id: SpellId, trigger: LinkTrigger) -> Vec<LinkedSpell> {
        let _ = (id, trigger);
        Vec::new()
    }
}
