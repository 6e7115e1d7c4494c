use std::sync::Arc;

use tracing::debug;

use crate::env::{CastEnv, CastNotification, MissResult};
use crate::types::ObjectGuid;

use super::super::channel::ChannelLink;
use super::super::resolver::TargetResolver;
use super::super::CastFailure;
use super::CastInstance;

impl CastInstance {
    /// Runs implicit target selection into the registry. Returns the delay
    /// moment the delay scheduler starts from.
    pub(super) fn select_targets(
        &mut self,
        env: &CastEnv<'_>,
        channel: Option<&ChannelLink>,
    ) -> Result<u64, CastFailure> {
        let Some(caster) = env.world().unit(self.caster) else {
            debug!(target: "spell::targets", cast = %self.id, "caster vanished before selection");
            return Err(CastFailure::CasterState);
        };
        let spell = Arc::clone(&self.spell);

        TargetResolver::new(
            *env,
            self.id,
            &caster,
            &spell,
            self.flags,
            &self.values,
            &mut self.targets,
            &mut self.registry,
            &mut self.rolls,
            &self.hooks,
        )
        .with_channel(channel)
        .select_all()
    }

    /// The single cast-go notification: unit records that hit plus every game
    /// object go to `hits`, everything else to `misses`.
    pub(super) fn notify_spell_go(&self, env: &CastEnv<'_>) {
        let mut hits: Vec<ObjectGuid> = Vec::new();
        let mut misses: Vec<(ObjectGuid, MissResult)> = Vec::new();
        for record in self.registry.units() {
            if record.is_hit() {
                hits.push(record.guid);
            } else {
                misses.push((record.guid, record.miss));
            }
        }
        hits.extend(self.registry.objects().iter().map(|object| object.guid));

        env.notify(CastNotification::SpellGo {
            cast: self.id,
            caster: self.caster,
            spell: self.spell.id,
            hits,
            misses,
        });
    }
}
