pub mod barrier;
pub mod client;
pub mod collector;
pub mod error;
pub mod outcome;
pub mod round;

use std::fmt;

use futures_util::future::BoxFuture;

use crate::sync::error::ServiceError;
use crate::types::batch::Batch;

/// Sink the remote service pushes one stream into. Implementations are called
/// from whatever context the transport chooses and must not block.
pub trait StreamReceiver<T>: Send + Sync {
    /// Appends a batch; a batch flagged `last` terminates the stream.
    fn transfer(&self, batch: Batch<T>);

    /// Terminates the stream with an error reported mid-stream.
    fn fail(&self, error: ServiceError);

    /// Resolves once the round this receiver belongs to no longer wants
    /// deliveries: it finished, failed, timed out or was superseded.
    fn closed(&self) -> BoxFuture<'static, ()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Hooks,
    Applications,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hooks => write!(f, "hooks"),
            Self::Applications => write!(f, "applications"),
        }
    }
}
