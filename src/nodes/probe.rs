use crate::error::{GraphError, NodeError};
use crate::node::{NodeKind, PortBuilder};
use crate::port::Input;

/// A sink with a single input, keeping the last value it observed around
/// for inspection. Stands in for whatever a host application ultimately
/// does with a computed value (display it, write it out, act on it).
#[derive(Debug, Default)]
pub struct Probe<T> {
    input: Option<Input<T>>,
    last: Option<T>,
}

impl<T: Clone + std::fmt::Debug + 'static> Probe<T> {
    pub fn last(&self) -> Option<&T> {
        self.last.as_ref()
    }
}

impl<T: Clone + std::fmt::Debug + 'static> NodeKind for Probe<T> {
    fn register_ports(&mut self, builder: &mut PortBuilder) -> Result<(), GraphError> {
        self.input = Some(builder.input::<T>("in")?);
        Ok(())
    }

    fn compute(&mut self) -> Result<(), NodeError> {
        self.last = self.input.as_ref().unwrap().get();
        Ok(())
    }
}
