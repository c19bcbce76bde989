use crate::identity::{NodeId, PortId};

/// The closed set of structural failures the graph engine itself can raise.
///
/// Node compute bodies have an open-ended failure space and use
/// [`NodeError`] instead; the engine wraps a caught compute failure as
/// [`GraphError::ComputeFailure`] when attributing it to a node.
#[derive(thiserror::Error, Debug)]
pub enum GraphError {
    #[error("cannot connect output of type {source_type} to input of type {sink_type}")]
    TypeMismatch {
        source_type: &'static str,
        sink_type: &'static str,
    },

    #[error("input port {0} already has a source connected")]
    AlreadyConnected(PortId),

    #[error("node {0} is already present in the graph")]
    DuplicateNode(NodeId),

    #[error("a port named {0:?} is already registered")]
    DuplicatePortName(String),

    #[error("no port named {0:?} on node {1}")]
    UnknownPort(String, NodeId),

    #[error("no node type registered under tag {0:?}")]
    UnknownType(String),

    #[error("tag {0:?} is already registered to a different node type")]
    DuplicateRegistration(String),

    #[error("node type has no registered tag")]
    UnregisteredType,

    #[error("graph contains a cycle")]
    CycleDetected,

    #[error("input port {0} references a source port {1} that does not exist in the document")]
    DanglingSource(PortId, PortId),

    #[error("{0:?} is not a valid identifier")]
    BadIdentifier(String),

    #[error("node {0} failed to compute: {1}")]
    ComputeFailure(NodeId, #[source] NodeError),

    #[error("node {0} not found in graph")]
    UnknownNode(NodeId),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Opaque failure channel for a node's own compute action, mirroring the
/// teacher's `BetulaError`: node authors have an open-ended set of reasons
/// to fail and shouldn't have to fit them into the engine's closed taxonomy.
pub type NodeError = Box<dyn std::error::Error + Send + Sync>;
