//! High-level runtime orchestrator.
//!
//! The runtime owns the cast worker, wires up the command channel and the
//! notification bus, and exposes a builder-based API for embedders to drive
//! casts against their own world.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::info;

use spell_content::ContentFactory;
use spell_core::{CastConfig, CastNotification, HookRegistry, SpellOracle};

use crate::api::{CastHandle, Result, RuntimeError};
use crate::driver::{CastDriver, CastWorld};
use crate::events::{NotificationBus, Topic};
use crate::workers::{CastWorker, Command};

/// Runtime configuration shared across the orchestrator and the worker.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub cast: CastConfig,
    pub event_buffer_size: usize,
    pub command_buffer_size: usize,
    /// Period of the worker clock. `None` leaves time to `CastHandle::advance`.
    pub tick_interval: Option<Duration>,
    /// Triggered casts started per drain.
    pub trigger_limit: usize,
    pub seed: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            cast: CastConfig::DEFAULT,
            event_buffer_size: 256,
            command_buffer_size: 32,
            tick_interval: Some(Duration::from_millis(100)),
            trigger_limit: 64,
            seed: 0,
        }
    }
}

/// Main runtime that owns the cast worker.
///
/// [`CastHandle`] provides a cloneable façade for clients.
pub struct CastRuntime {
    handle: CastHandle,
    worker: JoinHandle<()>,
}

impl CastRuntime {
    pub fn builder<W: CastWorld>(world: Arc<W>) -> RuntimeBuilder<W> {
        RuntimeBuilder::new(world)
    }

    /// Get a cloneable handle to this runtime
    pub fn handle(&self) -> CastHandle {
        self.handle.clone()
    }

    pub fn subscribe(&self, topic: Topic) -> Option<broadcast::Receiver<CastNotification>> {
        self.handle.subscribe(topic)
    }

    /// Stop the worker and wait for it to exit.
    pub async fn shutdown(self) -> Result<()> {
        // A worker that already stopped has dropped its receiver.
        match self.handle.shutdown().await {
            Ok(())
            | Err(RuntimeError::CommandChannelClosed)
            | Err(RuntimeError::ReplyChannelClosed(_)) => {}
            Err(error) => return Err(error),
        }
        drop(self.handle);

        self.worker.await.map_err(RuntimeError::WorkerJoin)
    }
}

/// Builder for [`CastRuntime`].
pub struct RuntimeBuilder<W: CastWorld> {
    world: Arc<W>,
    config: RuntimeConfig,
    spells: Option<Arc<dyn SpellOracle>>,
    hooks: Option<Arc<HookRegistry>>,
}

impl<W: CastWorld> RuntimeBuilder<W> {
    fn new(world: Arc<W>) -> Self {
        Self {
            world,
            config: RuntimeConfig::default(),
            spells: None,
            hooks: None,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the spell table (required unless `content` is used)
    pub fn spells(mut self, spells: Arc<dyn SpellOracle>) -> Self {
        self.spells = Some(spells);
        self
    }

    /// Load the spell catalog and cast tunables from a data directory.
    ///
    /// Replaces the cast section of the current configuration.
    pub fn content(mut self, factory: &ContentFactory) -> Result<Self> {
        let catalog = factory.load_catalog()?;
        self.config.cast = factory.load_config()?;
        info!(
            target: "runtime::driver",
            spells = catalog.len(),
            data_dir = %factory.data_dir().display(),
            "content loaded"
        );
        self.spells = Some(Arc::new(catalog));
        Ok(self)
    }

    pub fn tick_interval(mut self, interval: Option<Duration>) -> Self {
        self.config.tick_interval = interval;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Hooks bound to every cast of a spell the registry knows.
    pub fn with_hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = Some(Arc::new(hooks));
        self
    }

    /// Build the runtime and spawn its worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Result<CastRuntime> {
        let spells = self.spells.ok_or(RuntimeError::MissingCatalog)?;

        let (command_tx, command_rx) = mpsc::channel::<Command>(self.config.command_buffer_size);
        let bus = NotificationBus::with_capacity(self.config.event_buffer_size);
        let handle = CastHandle::new(command_tx, bus.clone());

        let mut driver = CastDriver::new(spells, self.world, bus, self.config.cast)
            .with_seed(self.config.seed)
            .with_trigger_limit(self.config.trigger_limit);
        if let Some(hooks) = self.hooks {
            driver = driver.with_hooks(hooks);
        }

        let worker = CastWorker::new(driver, command_rx, self.config.tick_interval);
        let worker = tokio::spawn(worker.run());

        Ok(CastRuntime { handle, worker })
    }
}
