use crate::error::{GraphError, NodeError};
use crate::node::{NodeKind, PortBuilder};
use crate::port::Output;
use serde::{de::DeserializeOwned, Serialize};

/// Emits a fixed value on its single output. Has no inputs, so it runs
/// exactly once (spec 4.E's source-node rule) unless its value is changed
/// and the node is explicitly asked to recompute by a host application.
#[derive(Debug)]
pub struct Constant<T> {
    value: T,
    output: Option<Output<T>>,
}

impl<T: Default> Default for Constant<T> {
    fn default() -> Self {
        Constant {
            value: T::default(),
            output: None,
        }
    }
}

impl<T> Constant<T> {
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Overwrite the value this node emits. Takes effect on the node's
    /// next `update()` if it hasn't run yet; since a source node only
    /// recomputes once (spec 4.E), a host wanting to push a new value
    /// after the first run has to remove and reinsert the node.
    pub fn set_value(&mut self, value: T) {
        self.value = value;
    }
}

impl<T: std::fmt::Debug + Clone + Serialize + DeserializeOwned + Default + 'static> NodeKind
    for Constant<T>
{
    fn register_ports(&mut self, builder: &mut PortBuilder) -> Result<(), GraphError> {
        self.output = Some(builder.output::<T>("out")?);
        Ok(())
    }

    fn compute(&mut self) -> Result<(), NodeError> {
        self.output.as_ref().unwrap().set(self.value.clone());
        Ok(())
    }

    fn serialize_state(
        &self,
        _cache_dir: Option<&std::path::Path>,
    ) -> Result<serde_json::Value, NodeError> {
        Ok(serde_json::to_value(&self.value)?)
    }

    fn deserialize_state(
        &mut self,
        data: &serde_json::Value,
        _cache_dir: Option<&std::path::Path>,
    ) -> Result<(), NodeError> {
        self.value = serde_json::from_value(data.clone())?;
        Ok(())
    }
}
