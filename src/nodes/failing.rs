use crate::error::{GraphError, NodeError};
use crate::node::{NodeKind, PortBuilder};
use crate::port::{Input, Output};

/// Forwards its input type-for-type but always fails to compute. Used to
/// exercise the chain-failure concrete scenario: an upstream `Error`
/// leaves everything downstream `Waiting` (spec 8).
#[derive(Debug, Default)]
pub struct Failing {
    input: Option<Input<i64>>,
    output: Option<Output<i64>>,
}

impl NodeKind for Failing {
    fn register_ports(&mut self, builder: &mut PortBuilder) -> Result<(), GraphError> {
        self.input = Some(builder.input::<i64>("in")?);
        self.output = Some(builder.output::<i64>("out")?);
        Ok(())
    }

    fn compute(&mut self) -> Result<(), NodeError> {
        Err("node intentionally failed".into())
    }
}
