//! Triggered-cast queue in front of the world's proc collaborator.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

use spell_core::{HitTrigger, ObjectGuid, ProcEvaluator, ProcEvent, SpellId, TriggeredCast};

/// Forwards proc evaluation to the world and holds triggered casts back in a
/// FIFO until the driver finishes the phase that requested them.
pub struct ProcRelay<P: ?Sized> {
    inner: Arc<P>,
    pending: Mutex<VecDeque<TriggeredCast>>,
}

impl<P: ProcEvaluator + ?Sized> ProcRelay<P> {
    pub fn new(inner: Arc<P>) -> Self {
        Self {
            inner,
            pending: Mutex::new(VecDeque::new()),
        }
    }

    fn pending(&self) -> MutexGuard<'_, VecDeque<TriggeredCast>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn pop(&self) -> Option<TriggeredCast> {
        self.pending().pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending().is_empty()
    }

    /// Drops everything still queued, returning how many casts were dropped.
    pub fn clear(&self) -> usize {
        let mut pending = self.pending();
        let dropped = pending.len();
        pending.clear();
        dropped
    }
}

impl<P: ProcEvaluator + ?Sized> ProcEvaluator for ProcRelay<P> {
    fn process(&self, event: &ProcEvent) {
        self.inner.process(event);
    }

    fn hit_triggers(&self, caster: ObjectGuid, spell: SpellId) -> Vec<HitTrigger> {
        self.inner.hit_triggers(caster, spell)
    }

    fn trigger_spell(&self, cast: TriggeredCast) {
        trace!(
            target: "runtime::driver",
            caster = %cast.caster,
            spell = %cast.spell,
            by = %cast.triggered_by,
            "triggered cast queued"
        );
        self.pending().push_back(cast);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spell_core::testkit::Sandbox;
    use spell_core::{CastId, SpellTargets};

    fn triggered(spell: u32) -> TriggeredCast {
        TriggeredCast {
            caster: ObjectGuid(1),
            spell: SpellId(spell),
            targets: SpellTargets::none(),
            triggered_by: SpellId(1),
            original_cast: CastId(1),
        }
    }

    #[test]
    fn triggered_casts_queue_in_order() {
        let sandbox = Arc::new(Sandbox::new());
        let relay = ProcRelay::new(Arc::clone(&sandbox));

        relay.trigger_spell(triggered(10));
        relay.trigger_spell(triggered(11));

        assert!(sandbox.take_triggered().is_empty());
        assert_eq!(relay.len(), 2);
        assert_eq!(relay.pop().map(|cast| cast.spell), Some(SpellId(10)));
        assert_eq!(relay.clear(), 1);
        assert!(relay.is_empty());
    }
}
