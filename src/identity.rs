use crate::error::GraphError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity for a [`crate::node::Node`].
///
/// We use UUIDs here rather than small integer handles so identity
/// survives removal/reinsertion and round-trips through serialization
/// unchanged, the same reasoning the teacher's own `NodeId` is built on.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd, Debug, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    pub fn new() -> Self {
        NodeId(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        NodeId(uuid)
    }

    pub fn parse(s: &str) -> Result<Self, GraphError> {
        Uuid::parse_str(s)
            .map(NodeId)
            .map_err(|_| GraphError::BadIdentifier(s.to_string()))
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identity for a port, unique within its owning node.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd, Debug, Serialize, Deserialize)]
pub struct PortId(pub Uuid);

impl PortId {
    pub fn new() -> Self {
        PortId(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        PortId(uuid)
    }

    pub fn parse(s: &str) -> Result<Self, GraphError> {
        Uuid::parse_str(s)
            .map(PortId)
            .map_err(|_| GraphError::BadIdentifier(s.to_string()))
    }
}

impl Default for PortId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PortId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
