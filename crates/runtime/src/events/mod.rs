//! Topic-based fan-out of cast notifications.
//!
//! The pipeline reports through [`spell_core::NotificationSink`]; the runtime's
//! sink is a [`NotificationBus`] that routes each notification to the
//! broadcast channel of its [`Topic`].
mod bus;

pub use bus::{NotificationBus, Topic};
