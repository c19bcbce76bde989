use crate::error::{GraphError, NodeError};
use crate::node::{NodeKind, PortBuilder};
use crate::port::{Input, Output};

/// Forwards its input to its output unchanged. Useful as connective
/// tissue in tests and as a template for simple transform nodes.
#[derive(Debug, Default)]
pub struct Passthrough<T> {
    input: Option<Input<T>>,
    output: Option<Output<T>>,
}

impl<T: Clone + std::fmt::Debug + 'static> NodeKind for Passthrough<T> {
    fn register_ports(&mut self, builder: &mut PortBuilder) -> Result<(), GraphError> {
        self.input = Some(builder.input::<T>("in")?);
        self.output = Some(builder.output::<T>("out")?);
        Ok(())
    }

    fn compute(&mut self) -> Result<(), NodeError> {
        if let Some(v) = self.input.as_ref().unwrap().get() {
            self.output.as_ref().unwrap().set(v);
        }
        Ok(())
    }
}
