use thiserror::Error;

use crate::graph::{NetId, VertexId};

/// Caller-contract violations. These indicate the surrounding system passed
/// identifiers or requests that cannot be honoured; they are never absorbed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("vertex {0} does not exist")]
    UnknownVertex(VertexId),

    #[error("cannot connect vertex {0} to itself")]
    SelfConnection(VertexId),

    #[error("net {0} does not exist")]
    UnknownNet(NetId),

    #[error("the published graph changed while the drag was in progress")]
    StaleDrag,

    #[error("no drag is in progress")]
    DragNotActive,
}
