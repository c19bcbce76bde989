//! The generic node container and the `NodeKind` capability set concrete
//! node variants implement.

use crate::as_any::AsAnyHelper;
use crate::error::{GraphError, NodeError};
use crate::identity::{NodeId, PortId};
use crate::port::{ErasedInput, ErasedOutput, ErasedPort, PortStatus};
use std::collections::BTreeMap;

/// The node state machine (spec 4.E). `Updating` and `Error` are sticky
/// and dominate whatever the input ports alone would compute.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeStatus {
    Idle,
    Waiting,
    Ready,
    Updating,
    Error,
}

/// The capability set a concrete node variant must implement: register its
/// ports, compute, and (de)serialize whatever private state it keeps
/// beyond its ports. Mirrors the teacher's flat `Node` trait, split so the
/// registry can hold one boxed value per tag the way `DefaultNodeFactory<T>`
/// expects.
pub trait NodeKind: std::fmt::Debug + crate::as_any::AsAny {
    /// Register this node's input and output ports against `builder`.
    /// Called once, immediately after construction. Fails with
    /// [`GraphError::DuplicatePortName`] if two ports of the same
    /// direction are registered under the same name (spec 4.E: port
    /// names must be unique within their node).
    fn register_ports(&mut self, builder: &mut PortBuilder) -> Result<(), GraphError>;

    /// Read inputs, run the node's computation, write outputs. Errors are
    /// caught by the owning [`Node`] and turn it `Error`.
    fn compute(&mut self) -> Result<(), NodeError>;

    /// Serialize whatever private state this node keeps beyond its ports.
    /// `cache_dir` is `Some` only when the graph was asked to use a cache.
    fn serialize_state(
        &self,
        cache_dir: Option<&std::path::Path>,
    ) -> Result<serde_json::Value, NodeError> {
        let _ = cache_dir;
        Ok(serde_json::Value::Null)
    }

    /// Restore private state previously produced by `serialize_state`.
    fn deserialize_state(
        &mut self,
        data: &serde_json::Value,
        cache_dir: Option<&std::path::Path>,
    ) -> Result<(), NodeError> {
        let _ = (data, cache_dir);
        Ok(())
    }
}

/// Handed to [`NodeKind::register_ports`] so a node can declare its ports
/// without needing to know its own final [`NodeId`] ahead of time.
pub struct PortBuilder<'a> {
    parent: NodeId,
    inputs: &'a mut BTreeMap<String, Box<dyn ErasedInput>>,
    outputs: &'a mut BTreeMap<String, Box<dyn ErasedOutput>>,
}

impl<'a> PortBuilder<'a> {
    pub fn output<T: 'static>(&mut self, name: &str) -> Result<crate::port::Output<T>, GraphError> {
        if self.outputs.contains_key(name) {
            return Err(GraphError::DuplicatePortName(name.to_string()));
        }
        let port = crate::port::Output::<T>::new(self.parent);
        self.outputs.insert(name.to_string(), Box::new(port.clone()));
        Ok(port)
    }

    pub fn input<T: 'static>(&mut self, name: &str) -> Result<crate::port::Input<T>, GraphError> {
        if self.inputs.contains_key(name) {
            return Err(GraphError::DuplicatePortName(name.to_string()));
        }
        let port = crate::port::Input::<T>::new(self.parent);
        self.inputs.insert(name.to_string(), Box::new(port.clone()));
        Ok(port)
    }
}

/// The data-model entity: identity, port tables, status machine, and a
/// boxed concrete [`NodeKind`]. The `Graph` is the sole owner of `Node`
/// values; external code addresses them by [`NodeId`].
pub struct Node {
    id: NodeId,
    kind: Box<dyn NodeKind>,
    inputs: BTreeMap<String, Box<dyn ErasedInput>>,
    outputs: BTreeMap<String, Box<dyn ErasedOutput>>,
    status: NodeStatus,
    /// Nodes with no input ports (sources) have nothing to signal that
    /// they should recompute, so they run exactly once, on their first
    /// `update()`, to satisfy the no-op idempotence law thereafter.
    has_run: bool,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("status", &self.status)
            .finish()
    }
}

impl Node {
    /// Construct a node wrapping `kind`, registering its ports under a
    /// fresh [`NodeId`]. Fails with [`GraphError::DuplicatePortName`] if
    /// `kind` registers two ports of the same direction under one name.
    pub fn new(mut kind: Box<dyn NodeKind>) -> Result<Self, GraphError> {
        let id = NodeId::new();
        let mut inputs = BTreeMap::new();
        let mut outputs = BTreeMap::new();
        {
            let mut builder = PortBuilder {
                parent: id,
                inputs: &mut inputs,
                outputs: &mut outputs,
            };
            kind.register_ports(&mut builder)?;
        }
        Ok(Node {
            id,
            kind,
            inputs,
            outputs,
            status: NodeStatus::Idle,
            has_run: false,
        })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Overwrite this node's identity. Used only by deserialization, which
    /// constructs a node via the registry and then stamps the UUIDs
    /// recorded in the document onto it.
    pub(crate) fn set_id(&mut self, id: NodeId) {
        self.id = id;
    }

    pub fn kind(&self) -> &dyn NodeKind {
        self.kind.as_ref()
    }

    pub fn kind_mut(&mut self) -> &mut dyn NodeKind {
        self.kind.as_mut()
    }

    pub fn status(&self) -> NodeStatus {
        self.status
    }

    pub fn input_names(&self) -> impl Iterator<Item = &str> {
        self.inputs.keys().map(|s| s.as_str())
    }

    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.outputs.keys().map(|s| s.as_str())
    }

    pub fn input_port(&self, name: &str) -> Result<&dyn ErasedInput, GraphError> {
        self.inputs
            .get(name)
            .map(|b| b.as_ref())
            .ok_or_else(|| GraphError::UnknownPort(name.to_string(), self.id))
    }

    pub fn output_port(&self, name: &str) -> Result<&dyn ErasedOutput, GraphError> {
        self.outputs
            .get(name)
            .map(|b| b.as_ref())
            .ok_or_else(|| GraphError::UnknownPort(name.to_string(), self.id))
    }

    /// Recompute [`NodeStatus`] from the current state of the input ports,
    /// short of the sticky `Updating`/`Error` states (spec 4.E).
    fn recompute_status(&mut self) {
        if matches!(self.status, NodeStatus::Error) {
            return;
        }
        let mut waiting = false;
        let mut queued = false;
        for input in self.inputs.values() {
            match input.status() {
                PortStatus::Waiting => waiting = true,
                PortStatus::Queued => queued = true,
                PortStatus::Error => waiting = true,
                PortStatus::Idle => {}
            }
        }
        self.status = if waiting {
            NodeStatus::Waiting
        } else if queued {
            NodeStatus::Ready
        } else {
            NodeStatus::Idle
        };
    }

    /// The local step of the scheduling protocol: pull inputs, and only if
    /// something changed, recompute and push to outputs.
    pub fn update(&mut self) -> Result<(), GraphError> {
        if matches!(self.status, NodeStatus::Error) {
            return Ok(());
        }

        let mut any_changed = false;
        let mut any_waiting = false;
        for input in self.inputs.values() {
            if input.pull() {
                any_changed = true;
            }
            if input.status() == PortStatus::Waiting {
                any_waiting = true;
            }
        }

        if any_waiting {
            self.status = NodeStatus::Waiting;
            return Ok(());
        }

        let is_source = self.inputs.is_empty();
        if is_source {
            if self.has_run {
                self.status = NodeStatus::Idle;
                return Ok(());
            }
        } else if !any_changed {
            self.recompute_status();
            return Ok(());
        }

        for output in self.outputs.values() {
            output.mark_waiting();
        }

        self.status = NodeStatus::Updating;
        let result = self.kind.compute();
        self.has_run = true;

        match result {
            Ok(()) => {
                for output in self.outputs.values() {
                    output.notify();
                }
                self.status = NodeStatus::Idle;
                Ok(())
            }
            Err(err) => {
                self.status = NodeStatus::Error;
                Err(GraphError::ComputeFailure(self.id, err))
            }
        }
    }

    pub fn connections(&self) -> Vec<(PortId, PortId)> {
        self.outputs
            .values()
            .flat_map(|o| o.sink_ids().into_iter().map(move |sink| (o.id(), sink)))
            .collect()
    }
}
