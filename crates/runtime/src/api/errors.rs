//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from worker coordination, environment assembly and the cast
//! pipeline so clients can bubble them up with consistent context.
use thiserror::Error;
use tokio::sync::oneshot;

use spell_core::{CastError, ObjectGuid, OracleError};

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("cast worker command channel closed")]
    CommandChannelClosed,

    #[error("cast worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("cast worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error("runtime requires a spell catalog to be configured before building")]
    MissingCatalog,

    #[error("caster {0} has no cast controller")]
    UnknownCaster(ObjectGuid),

    #[error(transparent)]
    Cast(#[from] CastError),

    #[error("cast environment incomplete")]
    Environment(#[from] OracleError),

    #[error(transparent)]
    Content(#[from] anyhow::Error),
}
