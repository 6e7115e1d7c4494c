//! Cloneable façade for issuing commands to the cast worker.
//!
//! [`CastHandle`] hides channel plumbing and offers async helpers for starting
//! and steering casts or streaming notifications from specific topics.
use std::collections::HashMap;

use tokio::sync::{broadcast, mpsc, oneshot};

use spell_core::{CastId, CastNotification, CastRequest, ObjectGuid};

use super::errors::{Result, RuntimeError};
use crate::driver::{CastSummary, TickReport};
use crate::events::{NotificationBus, Topic};
use crate::workers::Command;

/// Client-facing handle to interact with the cast runtime
#[derive(Clone)]
pub struct CastHandle {
    command_tx: mpsc::Sender<Command>,
    bus: NotificationBus,
}

impl CastHandle {
    pub(crate) fn new(command_tx: mpsc::Sender<Command>, bus: NotificationBus) -> Self {
        Self { command_tx, bus }
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Start a cast; resolves once the cast is prepared (and, for instant
    /// casts, resolved).
    pub async fn prepare(&self, request: CastRequest) -> Result<CastId> {
        self.request(|reply| Command::Prepare { request, reply })
            .await?
    }

    pub async fn cancel(&self, caster: ObjectGuid, cast: CastId) -> Result<()> {
        self.request(|reply| Command::Cancel {
            caster,
            cast,
            reply,
        })
        .await?
    }

    /// Apply damage pushback to the caster's casts; returns how many were affected.
    pub async fn pushback(&self, caster: ObjectGuid) -> Result<usize> {
        self.request(|reply| Command::Pushback { caster, reply })
            .await?
    }

    /// Report a melee swing; returns whether a next-swing spell went off.
    pub async fn melee_swing(&self, caster: ObjectGuid) -> Result<bool> {
        self.request(|reply| Command::MeleeSwing { caster, reply })
            .await?
    }

    /// Report caster movement; returns how many casts were cancelled.
    pub async fn caster_moved(&self, caster: ObjectGuid) -> Result<usize> {
        self.request(|reply| Command::CasterMoved { caster, reply })
            .await?
    }

    pub async fn interrupt(&self, caster: ObjectGuid, with_delayed: bool) -> Result<usize> {
        self.request(|reply| Command::Interrupt {
            caster,
            with_delayed,
            reply,
        })
        .await?
    }

    /// Advance the worker clock by hand.
    pub async fn advance(&self, elapsed_ms: u32) -> Result<TickReport> {
        self.request(|reply| Command::Advance { elapsed_ms, reply })
            .await?
    }

    /// Query the live casts of a caster (read-only snapshot)
    pub async fn query(&self, caster: ObjectGuid) -> Result<Vec<CastSummary>> {
        self.request(|reply| Command::Query { caster, reply }).await
    }

    /// Ask the worker to stop after the commands already queued.
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    /// Subscribe to notifications from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Cast` - cast start, pushback and spell-go
    /// - `Topic::Channel` - channel start and updates
    /// - `Topic::Failure` - failed and interrupted casts
    pub fn subscribe(&self, topic: Topic) -> Option<broadcast::Receiver<CastNotification>> {
        self.bus.subscribe(topic)
    }

    /// Subscribe to multiple topics at once
    pub fn subscribe_multiple(
        &self,
        topics: &[Topic],
    ) -> HashMap<Topic, broadcast::Receiver<CastNotification>> {
        self.bus.subscribe_multiple(topics)
    }

    /// Get a reference to the notification bus for advanced usage
    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }
}
