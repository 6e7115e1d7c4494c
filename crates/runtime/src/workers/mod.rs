//! Background workers owned by the runtime.
mod cast;

pub(crate) use cast::{CastWorker, Command};
