//! Async runtime around the spell-cast pipeline.
//!
//! This crate owns one cast controller per caster, advances them on a clock
//! and fans their notifications out to subscribers. Embedders supply the world
//! as a [`CastWorld`], build a [`CastRuntime`] and talk to it through the
//! cloneable [`CastHandle`].
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator and builder
//! - [`api`] exposes the types downstream clients interact with
//! - [`events`] provides the topic-based notification bus
//! - [`driver`] is the synchronous tick driver, usable without tokio
//! - [`logging`] installs tracing subscribers
//! - `workers` keeps background tasks internal to the crate
pub mod api;
pub mod driver;
pub mod events;
pub mod logging;
pub mod runtime;

mod workers;

pub use api::{CastHandle, Result, RuntimeError};
pub use driver::{CastDriver, CastSummary, CastWorld, DueWake, ProcRelay, TickReport, Timeline};
pub use events::{NotificationBus, Topic};
pub use logging::{init_file_tracing, init_tracing};
pub use runtime::{CastRuntime, RuntimeBuilder, RuntimeConfig};
