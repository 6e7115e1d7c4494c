//! Deduplicated per-effect records of everything a cast selected.
//!
//! The registry is a leaf container: it knows nothing about the world. The
//! resolver decides which bits survive immunity and line-of-sight checks and
//! hands the registry already-filtered masks; the registry then enforces that
//! no record ever carries a bit outside the definition's real effects.

use arrayvec::ArrayVec;

use crate::config::CastConfig;
use crate::env::{DiminishingLevel, MissResult};
use crate::spell::DiminishingGroup;
use crate::types::{AuraHandle, EffectIndex, EffectMask, Location, ObjectGuid};

/// Selected unit and its per-target resolution state.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitTarget {
    pub guid: ObjectGuid,
    pub effect_mask: EffectMask,
    pub miss: MissResult,
    pub reflect: MissResult,
    /// Alive state at selection; a mismatch at hit time skips the target.
    pub alive: bool,
    pub delay_ms: u64,
    pub crit: bool,
    pub processed: bool,
    pub damage: u32,
    pub healing: u32,
    pub diminishing: Option<(DiminishingGroup, DiminishingLevel)>,
    /// Aura created or refreshed by this cast on the target.
    pub aura: Option<AuraHandle>,
}

impl UnitTarget {
    pub fn new(guid: ObjectGuid, effect_mask: EffectMask, alive: bool) -> Self {
        Self {
            guid,
            effect_mask,
            miss: MissResult::None,
            reflect: MissResult::None,
            alive,
            delay_ms: 0,
            crit: false,
            processed: false,
            damage: 0,
            healing: 0,
            diminishing: None,
            aura: None,
        }
    }

    pub fn is_hit(&self) -> bool {
        self.miss == MissResult::None
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ObjectTarget {
    pub guid: ObjectGuid,
    pub effect_mask: EffectMask,
    pub delay_ms: u64,
    pub processed: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ItemTarget {
    pub guid: ObjectGuid,
    pub effect_mask: EffectMask,
    pub processed: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CorpseTarget {
    pub guid: ObjectGuid,
    pub effect_mask: EffectMask,
    pub delay_ms: u64,
    pub processed: bool,
}

/// Destination written for one effect slot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DestinationSlot {
    pub effect: EffectIndex,
    pub location: Location,
}

/// Tagged view over every kind of record.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TargetRecord<'a> {
    Unit(&'a UnitTarget),
    GameObject(&'a ObjectTarget),
    Item(&'a ItemTarget),
    Corpse(&'a CorpseTarget),
    Destination(&'a DestinationSlot),
}

impl TargetRecord<'_> {
    pub fn guid(&self) -> Option<ObjectGuid> {
        match self {
            Self::Unit(unit) => Some(unit.guid),
            Self::GameObject(object) => Some(object.guid),
            Self::Item(item) => Some(item.guid),
            Self::Corpse(corpse) => Some(corpse.guid),
            Self::Destination(_) => None,
        }
    }

    pub fn effect_mask(&self) -> EffectMask {
        match self {
            Self::Unit(unit) => unit.effect_mask,
            Self::GameObject(object) => object.effect_mask,
            Self::Item(item) => item.effect_mask,
            Self::Corpse(corpse) => corpse.effect_mask,
            Self::Destination(slot) => EffectMask::single(slot.effect),
        }
    }
}

/// Result of offering a target to the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Upsert {
    /// New record created.
    Inserted,
    /// Bits merged into an existing record.
    Merged,
    /// Nothing left of the mask after filtering.
    Rejected,
}

#[derive(Clone, Debug, Default)]
pub struct TargetRegistry {
    real_mask: EffectMask,
    units: Vec<UnitTarget>,
    objects: Vec<ObjectTarget>,
    items: Vec<ItemTarget>,
    corpses: Vec<CorpseTarget>,
    destinations: ArrayVec<DestinationSlot, { CastConfig::MAX_EFFECTS }>,
    min_delay_ms: u64,
}

impl TargetRegistry {
    /// Creates a registry accepting only bits of `real_mask`.
    pub fn new(real_mask: EffectMask) -> Self {
        Self {
            real_mask,
            ..Self::default()
        }
    }

    pub fn real_mask(&self) -> EffectMask {
        self.real_mask
    }

    /// Drops bits for effects that do not exist or are not real.
    pub fn sanitize(&self, mask: EffectMask) -> EffectMask {
        mask & self.real_mask
    }

    // ===== units =====

    pub fn unit(&self, guid: ObjectGuid) -> Option<&UnitTarget> {
        self.units.iter().find(|unit| unit.guid == guid)
    }

    pub fn unit_mut(&mut self, guid: ObjectGuid) -> Option<&mut UnitTarget> {
        self.units.iter_mut().find(|unit| unit.guid == guid)
    }

    pub fn units(&self) -> &[UnitTarget] {
        &self.units
    }

    pub fn units_mut(&mut self) -> &mut [UnitTarget] {
        &mut self.units
    }

    /// Merges `mask` into an existing record for `guid`.
    ///
    /// Returns `false` when no record exists yet; the caller then computes the
    /// hit roll and delay and calls [`insert_unit`](Self::insert_unit).
    pub fn merge_unit(&mut self, guid: ObjectGuid, mask: EffectMask) -> bool {
        let mask = self.sanitize(mask);
        match self.unit_mut(guid) {
            Some(existing) => {
                existing.effect_mask |= mask;
                true
            }
            None => false,
        }
    }

    /// Inserts `record`, or merges its mask when the unit is already present.
    pub fn insert_unit(&mut self, mut record: UnitTarget) -> Upsert {
        record.effect_mask = self.sanitize(record.effect_mask);
        if record.effect_mask.is_empty() {
            return Upsert::Rejected;
        }
        if self.merge_unit(record.guid, record.effect_mask) {
            return Upsert::Merged;
        }
        self.track_delay(record.delay_ms);
        self.units.push(record);
        Upsert::Inserted
    }

    /// Clears `mask` bits from the unit's record; returns the bits actually removed.
    pub fn remove_unit_effects(&mut self, guid: ObjectGuid, mask: EffectMask) -> EffectMask {
        match self.unit_mut(guid) {
            Some(unit) => {
                let removed = unit.effect_mask & mask;
                unit.effect_mask = unit.effect_mask.difference(mask);
                removed
            }
            None => EffectMask::EMPTY,
        }
    }

    /// Most recently added unit whose mask includes `effect`.
    pub fn last_unit_for(&self, effect: EffectIndex) -> Option<&UnitTarget> {
        self.units
            .iter()
            .rev()
            .find(|unit| unit.effect_mask.contains(effect))
    }

    /// Most recently added unit sharing any bit with `mask`.
    pub fn last_unit_intersecting(&self, mask: EffectMask) -> Option<&UnitTarget> {
        self.units
            .iter()
            .rev()
            .find(|unit| unit.effect_mask.intersects(mask))
    }

    pub fn has_unit_for(&self, effect: EffectIndex) -> bool {
        self.last_unit_for(effect).is_some()
    }

    // ===== objects, items, corpses =====

    pub fn objects(&self) -> &[ObjectTarget] {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> &mut [ObjectTarget] {
        &mut self.objects
    }

    pub fn add_object(&mut self, guid: ObjectGuid, mask: EffectMask, delay_ms: u64) -> Upsert {
        let mask = self.sanitize(mask);
        if mask.is_empty() {
            return Upsert::Rejected;
        }
        if let Some(existing) = self.objects.iter_mut().find(|object| object.guid == guid) {
            existing.effect_mask |= mask;
            return Upsert::Merged;
        }
        self.track_delay(delay_ms);
        self.objects.push(ObjectTarget {
            guid,
            effect_mask: mask,
            delay_ms,
            processed: false,
        });
        Upsert::Inserted
    }

    pub fn items(&self) -> &[ItemTarget] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [ItemTarget] {
        &mut self.items
    }

    pub fn add_item(&mut self, guid: ObjectGuid, mask: EffectMask) -> Upsert {
        let mask = self.sanitize(mask);
        if mask.is_empty() {
            return Upsert::Rejected;
        }
        if let Some(existing) = self.items.iter_mut().find(|item| item.guid == guid) {
            existing.effect_mask |= mask;
            return Upsert::Merged;
        }
        self.items.push(ItemTarget {
            guid,
            effect_mask: mask,
            processed: false,
        });
        Upsert::Inserted
    }

    pub fn corpses(&self) -> &[CorpseTarget] {
        &self.corpses
    }

    pub fn corpses_mut(&mut self) -> &mut [CorpseTarget] {
        &mut self.corpses
    }

    pub fn add_corpse(&mut self, guid: ObjectGuid, mask: EffectMask, delay_ms: u64) -> Upsert {
        let mask = self.sanitize(mask);
        if mask.is_empty() {
            return Upsert::Rejected;
        }
        if let Some(existing) = self.corpses.iter_mut().find(|corpse| corpse.guid == guid) {
            existing.effect_mask |= mask;
            return Upsert::Merged;
        }
        self.track_delay(delay_ms);
        self.corpses.push(CorpseTarget {
            guid,
            effect_mask: mask,
            delay_ms,
            processed: false,
        });
        Upsert::Inserted
    }

    // ===== destinations =====

    /// Writes the destination for `effect`, replacing an earlier one.
    pub fn set_destination(&mut self, effect: EffectIndex, location: Location) {
        if !self.real_mask.contains(effect) {
            return;
        }
        if let Some(slot) = self.destinations.iter_mut().find(|slot| slot.effect == effect) {
            slot.location = location;
            return;
        }
        // capacity equals the mask width, so a real effect always fits
        let _ = self.destinations.try_push(DestinationSlot { effect, location });
    }

    pub fn destination(&self, effect: EffectIndex) -> Option<&Location> {
        self.destinations
            .iter()
            .find(|slot| slot.effect == effect)
            .map(|slot| &slot.location)
    }

    pub fn destinations(&self) -> &[DestinationSlot] {
        &self.destinations
    }

    // ===== aggregate queries =====

    /// Smallest non-zero travel delay across all records, 0 when none is pending.
    pub fn min_delay_ms(&self) -> u64 {
        self.min_delay_ms
    }

    /// Iterates every record in registry order: units, objects, items, corpses, destinations.
    pub fn records(&self) -> impl Iterator<Item = TargetRecord<'_>> {
        self.units
            .iter()
            .map(TargetRecord::Unit)
            .chain(self.objects.iter().map(TargetRecord::GameObject))
            .chain(self.items.iter().map(TargetRecord::Item))
            .chain(self.corpses.iter().map(TargetRecord::Corpse))
            .chain(self.destinations.iter().map(TargetRecord::Destination))
    }

    /// Union of every record's mask.
    pub fn effect_mask(&self) -> EffectMask {
        self.records()
            .fold(EffectMask::EMPTY, |acc, record| acc | record.effect_mask())
    }

    /// First record mask with a bit outside the real effects, if any.
    pub fn corrupt_mask(&self) -> Option<EffectMask> {
        self.records()
            .map(|record| record.effect_mask())
            .find(|mask| !mask.is_subset_of(self.real_mask))
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
            && self.objects.is_empty()
            && self.items.is_empty()
            && self.corpses.is_empty()
            && self.destinations.is_empty()
    }

    /// Whether any unit, object or corpse record is still waiting to resolve.
    pub fn has_pending(&self) -> bool {
        self.units.iter().any(|unit| !unit.processed)
            || self.objects.iter().any(|object| !object.processed)
            || self.corpses.iter().any(|corpse| !corpse.processed)
    }

    /// Drops every record; used when selection aborts and on reclaim.
    pub fn clear(&mut self) {
        self.units.clear();
        self.objects.clear();
        self.items.clear();
        self.corpses.clear();
        self.destinations.clear();
        self.min_delay_ms = 0;
    }

    fn track_delay(&mut self, delay_ms: u64) {
        if delay_ms > 0 && (self.min_delay_ms == 0 || delay_ms < self.min_delay_ms) {
            self.min_delay_ms = delay_ms;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TargetRegistry {
        // effects 0, 1 and 3 are real; 2 is an empty slot
        TargetRegistry::new(EffectMask::from_bits(0b1011))
    }

    #[test]
    fn duplicate_unit_merges_masks() {
        let mut registry = registry();
        let guid = ObjectGuid(10);

        let first = registry.insert_unit(UnitTarget::new(guid, EffectMask::from_bits(0b0001), true));
        let second =
            registry.insert_unit(UnitTarget::new(guid, EffectMask::from_bits(0b0010), true));

        assert_eq!(first, Upsert::Inserted);
        assert_eq!(second, Upsert::Merged);
        assert_eq!(registry.units().len(), 1);
        assert_eq!(registry.units()[0].effect_mask.bits(), 0b0011);
    }

    #[test]
    fn masks_stay_within_real_effects() {
        let mut registry = registry();
        registry.insert_unit(UnitTarget::new(ObjectGuid(1), EffectMask::from_bits(0b1111), true));
        registry.add_object(ObjectGuid(2), EffectMask::from_bits(0b0100 | 0b1000), 0);
        registry.add_item(ObjectGuid(3), EffectMask::from_bits(1 << 20));

        assert!(registry.corrupt_mask().is_none());
        for record in registry.records() {
            assert!(record.effect_mask().is_subset_of(EffectMask::from_bits(0b1011)));
        }
        // the item carried only a non-existent effect and was rejected
        assert!(registry.items().is_empty());
    }

    #[test]
    fn min_delay_ignores_instant_records() {
        let mut registry = registry();
        let mut fast = UnitTarget::new(ObjectGuid(1), EffectMask::from_bits(1), true);
        fast.delay_ms = 0;
        let mut slow = UnitTarget::new(ObjectGuid(2), EffectMask::from_bits(1), true);
        slow.delay_ms = 1500;
        let mut mid = UnitTarget::new(ObjectGuid(3), EffectMask::from_bits(1), true);
        mid.delay_ms = 700;

        registry.insert_unit(fast);
        registry.insert_unit(slow);
        registry.insert_unit(mid);

        assert_eq!(registry.min_delay_ms(), 700);
    }

    #[test]
    fn last_unit_for_effect_prefers_latest() {
        let mut registry = registry();
        registry.insert_unit(UnitTarget::new(ObjectGuid(1), EffectMask::from_bits(0b01), true));
        registry.insert_unit(UnitTarget::new(ObjectGuid(2), EffectMask::from_bits(0b10), true));
        registry.insert_unit(UnitTarget::new(ObjectGuid(3), EffectMask::from_bits(0b01), true));

        assert_eq!(
            registry.last_unit_for(EffectIndex(0)).map(|u| u.guid),
            Some(ObjectGuid(3))
        );
        assert_eq!(
            registry.last_unit_for(EffectIndex(1)).map(|u| u.guid),
            Some(ObjectGuid(2))
        );
        assert!(registry.last_unit_for(EffectIndex(3)).is_none());
    }

    #[test]
    fn destinations_replace_per_effect() {
        let mut registry = registry();
        let first = Location::default();
        let mut second = Location::default();
        second.position.x = 4.0;

        registry.set_destination(EffectIndex(0), first);
        registry.set_destination(EffectIndex(0), second);
        registry.set_destination(EffectIndex(2), first);

        assert_eq!(registry.destinations().len(), 1);
        assert_eq!(registry.destination(EffectIndex(0)), Some(&second));
    }

    #[test]
    fn removing_bits_reports_what_was_cleared() {
        let mut registry = registry();
        registry.insert_unit(UnitTarget::new(ObjectGuid(1), EffectMask::from_bits(0b11), true));

        let removed = registry.remove_unit_effects(ObjectGuid(1), EffectMask::from_bits(0b1010));

        assert_eq!(removed.bits(), 0b10);
        assert_eq!(registry.units()[0].effect_mask.bits(), 0b01);
    }
}
