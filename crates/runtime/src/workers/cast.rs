//! Cast worker that owns the authoritative [`CastDriver`].
//!
//! Receives commands from [`CastHandle`](crate::api::CastHandle), forwards
//! them to the driver and advances the driver clock on a fixed interval.
//! Notifications leave through the driver's bus.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use spell_core::{CastId, CastRequest, ObjectGuid};

use crate::api::Result;
use crate::driver::{CastDriver, CastSummary, CastWorld, TickReport};

/// Commands that can be sent to the cast worker
pub enum Command {
    Prepare {
        request: CastRequest,
        reply: oneshot::Sender<Result<CastId>>,
    },
    Cancel {
        caster: ObjectGuid,
        cast: CastId,
        reply: oneshot::Sender<Result<()>>,
    },
    Pushback {
        caster: ObjectGuid,
        reply: oneshot::Sender<Result<usize>>,
    },
    MeleeSwing {
        caster: ObjectGuid,
        reply: oneshot::Sender<Result<bool>>,
    },
    CasterMoved {
        caster: ObjectGuid,
        reply: oneshot::Sender<Result<usize>>,
    },
    Interrupt {
        caster: ObjectGuid,
        with_delayed: bool,
        reply: oneshot::Sender<Result<usize>>,
    },
    /// Advance the clock by hand, independent of the interval.
    Advance {
        elapsed_ms: u32,
        reply: oneshot::Sender<Result<TickReport>>,
    },
    /// Live casts of one caster (read-only).
    Query {
        caster: ObjectGuid,
        reply: oneshot::Sender<Vec<CastSummary>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Background task that processes cast commands.
pub struct CastWorker<W: CastWorld> {
    driver: CastDriver<W>,
    command_rx: mpsc::Receiver<Command>,
    tick_interval: Option<Duration>,
}

impl<W: CastWorld> CastWorker<W> {
    pub fn new(
        driver: CastDriver<W>,
        command_rx: mpsc::Receiver<Command>,
        tick_interval: Option<Duration>,
    ) -> Self {
        Self {
            driver,
            command_rx,
            tick_interval,
        }
    }

    /// Main worker loop.
    pub async fn run(mut self) {
        let mut ticker = self.tick_interval.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        let tick_ms = self
            .tick_interval
            .map_or(0, |period| u32::try_from(period.as_millis()).unwrap_or(u32::MAX));
        info!(target: "runtime::worker", tick_ms, "cast worker started");

        loop {
            tokio::select! {
                command = self.command_rx.recv() => {
                    let Some(command) = command else { break };
                    if !self.handle_command(command) {
                        break;
                    }
                }
                _ = next_tick(&mut ticker) => {
                    if let Err(error) = self.driver.tick(tick_ms) {
                        warn!(target: "runtime::worker", %error, "tick failed");
                    }
                }
            }
        }
        info!(target: "runtime::worker", now_ms = self.driver.now_ms(), "cast worker stopped");
    }

    /// Returns false once the worker should stop.
    fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Prepare { request, reply } => {
                debug!(
                    target: "runtime::worker",
                    caster = %request.caster,
                    spell = %request.spell,
                    "prepare"
                );
                let _ = reply.send(self.driver.prepare(request));
            }
            Command::Cancel {
                caster,
                cast,
                reply,
            } => {
                let _ = reply.send(self.driver.cancel(caster, cast));
            }
            Command::Pushback { caster, reply } => {
                let _ = reply.send(self.driver.pushback(caster));
            }
            Command::MeleeSwing { caster, reply } => {
                let _ = reply.send(self.driver.melee_swing(caster));
            }
            Command::CasterMoved { caster, reply } => {
                let _ = reply.send(self.driver.caster_moved(caster));
            }
            Command::Interrupt {
                caster,
                with_delayed,
                reply,
            } => {
                let _ = reply.send(self.driver.interrupt(caster, with_delayed));
            }
            Command::Advance { elapsed_ms, reply } => {
                let _ = reply.send(self.driver.tick(elapsed_ms));
            }
            Command::Query { caster, reply } => {
                let _ = reply.send(self.driver.summary(caster));
            }
            Command::Shutdown { reply } => {
                let _ = reply.send(());
                return false;
            }
        }
        true
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
