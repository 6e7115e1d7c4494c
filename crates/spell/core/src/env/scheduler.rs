use crate::types::{CastId, ObjectGuid};

/// External timer that re-enters a delayed cast.
///
/// `wake_offset_ms` is measured from the first `schedule` call made for the
/// cast; the driver answers by calling the caster's controller with the
/// elapsed offset. Re-scheduling replaces the pending wake.
pub trait EventScheduler: Send + Sync {
    fn schedule(&self, caster: ObjectGuid, cast: CastId, wake_offset_ms: u64);

    fn cancel(&self, caster: ObjectGuid, cast: CastId);
}
