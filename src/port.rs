//! Typed ports and the connection protocol between them.
//!
//! An [`Output<T>`] and an [`Input<T>`] are cheap `Clone` handles onto a
//! shared cell, the same `Rc<RefCell<..>>` shape `basic::BasicBlackboard`
//! uses for its values, but wired directly between two ports instead of
//! through a shared blackboard map.

use crate::as_any::{AsAny, AsAnyHelper};
use crate::error::GraphError;
use crate::identity::{NodeId, PortId};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// The status of a single port, independent of its owning node's status.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PortStatus {
    Idle,
    Waiting,
    Queued,
    Error,
}

/// The runtime type carried by a port, analogous to the teacher's
/// `PortType` but named for this crate's port/value vocabulary.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct ValueType {
    id: std::any::TypeId,
    name: &'static str,
}

impl ValueType {
    pub fn of<T: 'static>() -> Self {
        ValueType {
            id: std::any::TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl std::fmt::Debug for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Object-safe capability shared by every port, regardless of its value
/// type, so the graph can enumerate and connect ports without knowing `T`.
pub trait ErasedPort: AsAny {
    fn id(&self) -> PortId;
    fn parent(&self) -> NodeId;
    fn value_type(&self) -> ValueType;
    fn status(&self) -> PortStatus;
    /// Overwrite this port's identity. Used only by deserialization, which
    /// restores the UUID recorded in the document (spec 4.G).
    fn set_id(&self, id: PortId);
}

/// The type-erased half of the connection protocol, implemented only by
/// [`Output<T>`] since only the source side can know both its own `T` and
/// perform the downcast of the erased sink argument.
pub trait ErasedOutput: ErasedPort {
    /// Connect this output to an erased input, type-checking at runtime.
    fn connect_into(&self, input: &dyn ErasedInput) -> Result<(), GraphError>;
    /// Disconnect this output from an erased input. No-op if not connected.
    fn disconnect_from(&self, input: &dyn ErasedInput);
    /// Push the current value to connected inputs, marking them `Queued`.
    fn notify(&self);
    /// Mark this output `Waiting`, signalling downstream data is stale.
    fn mark_waiting(&self);
    /// List of currently connected sink port ids (for the `Connection` view).
    fn sink_ids(&self) -> Vec<PortId>;
}

pub trait ErasedInput: ErasedPort {
    /// Pull from the source if it has newer data. Returns whether the
    /// input's value was refreshed.
    fn pull(&self) -> bool;
    fn source_id(&self) -> Option<PortId>;
}

struct OutputInner<T> {
    id: PortId,
    parent: NodeId,
    value: Option<T>,
    version: u64,
    status: PortStatus,
    sinks: Vec<Weak<RefCell<InputInner<T>>>>,
}

/// An output port of value type `T`, owned by exactly one node but
/// cheaply cloneable so a sink input can hold a reference to it.
pub struct Output<T> {
    inner: Rc<RefCell<OutputInner<T>>>,
}

impl<T> Clone for Output<T> {
    fn clone(&self) -> Self {
        Output {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> std::fmt::Debug for Output<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Output")
            .field("id", &inner.id)
            .field("status", &inner.status)
            .finish()
    }
}

impl<T: 'static> Output<T> {
    pub fn new(parent: NodeId) -> Self {
        Output {
            inner: Rc::new(RefCell::new(OutputInner {
                id: PortId::new(),
                parent,
                value: None,
                version: 0,
                status: PortStatus::Waiting,
                sinks: Vec::new(),
            })),
        }
    }

    /// Overwrite this output's value, incrementing its version so
    /// connected inputs know there is new data to pull.
    pub fn set(&self, value: T) {
        let mut inner = self.inner.borrow_mut();
        inner.value = Some(value);
        inner.version += 1;
        inner.status = PortStatus::Idle;
    }

    pub fn get(&self) -> std::cell::Ref<'_, Option<T>>
    where
        T: 'static,
    {
        std::cell::Ref::map(self.inner.borrow(), |i| &i.value)
    }

    fn version(&self) -> u64 {
        self.inner.borrow().version
    }
}

impl<T: 'static> ErasedPort for Output<T> {
    fn id(&self) -> PortId {
        self.inner.borrow().id
    }
    fn parent(&self) -> NodeId {
        self.inner.borrow().parent
    }
    fn value_type(&self) -> ValueType {
        ValueType::of::<T>()
    }
    fn status(&self) -> PortStatus {
        self.inner.borrow().status
    }
    fn set_id(&self, id: PortId) {
        self.inner.borrow_mut().id = id;
    }
}

impl<T: 'static> ErasedOutput for Output<T> {
    fn connect_into(&self, input: &dyn ErasedInput) -> Result<(), GraphError> {
        if input.value_type() != self.value_type() {
            return Err(GraphError::TypeMismatch {
                source_type: self.value_type().name(),
                sink_type: input.value_type().name(),
            });
        }
        let input = input
            .downcast_ref::<Input<T>>()
            .expect("value_type matched, downcast must succeed");
        connect(self, input)
    }

    fn disconnect_from(&self, input: &dyn ErasedInput) {
        if let Some(input) = input.downcast_ref::<Input<T>>() {
            disconnect(self, input);
        }
    }

    fn notify(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.status = PortStatus::Idle;
        inner.sinks.retain(|w| w.upgrade().is_some());
        for sink in &inner.sinks {
            if let Some(rc) = sink.upgrade() {
                rc.borrow_mut().status = PortStatus::Queued;
            }
        }
    }

    fn mark_waiting(&self) {
        self.inner.borrow_mut().status = PortStatus::Waiting;
    }

    fn sink_ids(&self) -> Vec<PortId> {
        self.inner
            .borrow()
            .sinks
            .iter()
            .filter_map(|w| w.upgrade())
            .map(|rc| rc.borrow().id)
            .collect()
    }
}

struct InputInner<T> {
    id: PortId,
    parent: NodeId,
    source: Option<Output<T>>,
    status: PortStatus,
    seen_version: u64,
}

/// An input port of value type `T`. Holds a strong reference to its
/// source output (if connected) but the output only holds a [`Weak`]
/// reference back, so disconnecting or dropping an input cannot leak a
/// reference cycle with its source.
pub struct Input<T> {
    inner: Rc<RefCell<InputInner<T>>>,
}

impl<T> Clone for Input<T> {
    fn clone(&self) -> Self {
        Input {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> std::fmt::Debug for Input<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Input")
            .field("id", &inner.id)
            .field("status", &inner.status)
            .finish()
    }
}

impl<T: 'static> Input<T> {
    pub fn new(parent: NodeId) -> Self {
        Input {
            inner: Rc::new(RefCell::new(InputInner {
                id: PortId::new(),
                parent,
                source: None,
                status: PortStatus::Idle,
                seen_version: 0,
            })),
        }
    }

    pub fn get(&self) -> Option<T>
    where
        T: Clone,
    {
        let inner = self.inner.borrow();
        inner.source.as_ref().and_then(|s| s.get().clone())
    }

    pub fn has_source(&self) -> bool {
        self.inner.borrow().source.is_some()
    }
}

impl<T: 'static> ErasedPort for Input<T> {
    fn id(&self) -> PortId {
        self.inner.borrow().id
    }
    fn parent(&self) -> NodeId {
        self.inner.borrow().parent
    }
    fn value_type(&self) -> ValueType {
        ValueType::of::<T>()
    }
    fn status(&self) -> PortStatus {
        self.inner.borrow().status
    }
    fn set_id(&self, id: PortId) {
        self.inner.borrow_mut().id = id;
    }
}

impl<T: 'static> ErasedInput for Input<T> {
    fn pull(&self) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(source) = inner.source.clone() else {
            inner.status = PortStatus::Idle;
            return false;
        };
        let source_status = source.status();
        if source_status == PortStatus::Waiting {
            inner.status = PortStatus::Waiting;
            return false;
        }
        let source_version = source.version();
        if source_version == inner.seen_version {
            inner.status = PortStatus::Idle;
            return false;
        }
        inner.seen_version = source_version;
        inner.status = PortStatus::Idle;
        true
    }

    fn source_id(&self) -> Option<PortId> {
        self.inner.borrow().source.as_ref().map(|s| s.id())
    }
}

impl<T> Drop for InputInner<T> {
    fn drop(&mut self) {
        if let Some(source) = self.source.take() {
            let mut src = source.inner.borrow_mut();
            src.sinks.retain(|w| match w.upgrade() {
                Some(rc) => rc.borrow().id != self.id,
                None => false,
            });
        }
    }
}

/// Connect `output` to `input`. Fails with [`GraphError::AlreadyConnected`]
/// if `input` already has a source; leaves both ports unmodified on
/// failure.
pub fn connect<T: 'static>(output: &Output<T>, input: &Input<T>) -> Result<(), GraphError> {
    if input.has_source() {
        return Err(GraphError::AlreadyConnected(input.id()));
    }
    {
        let mut input_inner = input.inner.borrow_mut();
        input_inner.source = Some(output.clone());
        input_inner.status = if output.status() == PortStatus::Waiting {
            PortStatus::Waiting
        } else {
            PortStatus::Queued
        };
    }
    output
        .inner
        .borrow_mut()
        .sinks
        .push(Rc::downgrade(&input.inner));
    Ok(())
}

/// Disconnect `output` from `input`. Idempotent: a no-op if they are not
/// currently connected.
pub fn disconnect<T: 'static>(output: &Output<T>, input: &Input<T>) {
    let was_connected = {
        let mut input_inner = input.inner.borrow_mut();
        let connected = input_inner
            .source
            .as_ref()
            .map(|s| s.id() == output.id())
            .unwrap_or(false);
        if connected {
            input_inner.source = None;
            input_inner.status = PortStatus::Idle;
        }
        connected
    };
    if was_connected {
        output
            .inner
            .borrow_mut()
            .sinks
            .retain(|w| match w.upgrade() {
                Some(rc) => rc.borrow().id != input.id(),
                None => false,
            });
    }
}
