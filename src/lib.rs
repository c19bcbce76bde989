/*
    A small-graph library for assembling and executing data-flow
    computation graphs: typed nodes with named input/output ports,
    type-checked edges between them, and change-driven topological
    scheduling.

    Graph execution is single threaded: `Graph::update()` walks the
    current topological order and asks each node to pull its inputs,
    recompute only if something changed, and push to its outputs. A
    node that fails is left `Error`; everything downstream is left
    `Waiting` rather than running on stale data.

    Node identity and port identity are UUIDs rather than small integer
    handles, the same reasoning the teacher's own `NodeId` is built on:
    identity has to survive serialization round-trips and removal /
    reinsertion unchanged, which a process-local handle cannot promise.
*/

pub mod error;
pub mod graph;
pub mod identity;
pub mod node;
pub mod nodes;
pub mod port;
pub mod registry;
pub mod serialize;
pub mod viz;

mod as_any;
pub use as_any::AsAny;

pub mod prelude {
    pub use crate::as_any::AsAnyHelper;
    pub use crate::error::{GraphError, NodeError};
    pub use crate::graph::{Connection, Graph};
    pub use crate::identity::{NodeId, PortId};
    pub use crate::node::{Node, NodeKind, NodeStatus, PortBuilder};
    pub use crate::port::{
        ErasedInput, ErasedOutput, ErasedPort, Input, Output, PortStatus, ValueType,
    };
    pub use crate::registry::NodeRegistry;
    pub use crate::AsAny;
}

#[cfg(test)]
mod tests {
    use crate::error::GraphError;
    use crate::graph::Graph;
    use crate::node::{NodeKind, PortBuilder};
    use crate::nodes::{Failing, Passthrough, Probe};
    use crate::port::Output;
    use crate::registry::NodeRegistry;

    #[derive(Debug, Default)]
    struct IntSource {
        output: Option<Output<i64>>,
    }
    impl NodeKind for IntSource {
        fn register_ports(&mut self, builder: &mut PortBuilder) -> Result<(), GraphError> {
            self.output = Some(builder.output::<i64>("out")?);
            Ok(())
        }
        fn compute(&mut self) -> Result<(), crate::error::NodeError> {
            self.output.as_ref().unwrap().set(7);
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct FloatSource {
        output: Option<Output<f64>>,
    }
    impl NodeKind for FloatSource {
        fn register_ports(&mut self, builder: &mut PortBuilder) -> Result<(), GraphError> {
            self.output = Some(builder.output::<f64>("out")?);
            Ok(())
        }
        fn compute(&mut self) -> Result<(), crate::error::NodeError> {
            self.output.as_ref().unwrap().set(1.5);
            Ok(())
        }
    }

    /// Scenario 1 (spec 8): two nodes, connect, update, observe the value.
    #[test]
    fn scenario_value_flows_end_to_end() {
        let mut graph = Graph::new();
        let src = graph.insert_new::<IntSource>().unwrap();
        let sink = graph.insert_new::<Probe<i64>>().unwrap();
        graph.connect(src, "out", sink, "in").unwrap();
        graph.update().unwrap();

        use crate::as_any::AsAnyHelper;
        let node = graph.node(sink).unwrap();
        let probe = node.kind().downcast_ref::<Probe<i64>>().unwrap();
        assert_eq!(probe.last(), Some(&7));
    }

    /// Scenario 2 (spec 8): connecting incompatible types is rejected and
    /// leaves the graph unchanged.
    #[test]
    fn scenario_type_mismatch_is_rejected() {
        let mut graph = Graph::new();
        let src = graph.insert_new::<FloatSource>().unwrap();
        let sink = graph.insert_new::<Probe<i64>>().unwrap();
        let result = graph.connect(src, "out", sink, "in");
        assert!(matches!(result, Err(GraphError::TypeMismatch { .. })));
        assert!(graph.connections().is_empty());
    }

    /// Scenario 3 (spec 8): a failing node in the middle of a chain
    /// leaves itself `Error` and downstream nodes `Waiting`.
    #[test]
    fn scenario_chain_failure_propagates() {
        use crate::node::NodeStatus;
        let mut graph = Graph::new();
        let a = graph.insert_new::<IntSource>().unwrap();
        let b = graph.insert_new::<Failing>().unwrap();
        let c = graph.insert_new::<Probe<i64>>().unwrap();
        graph.connect(a, "out", b, "in").unwrap();
        graph.connect(b, "out", c, "in").unwrap();

        let err = graph.update().unwrap_err();
        assert!(matches!(err, GraphError::ComputeFailure(node, _) if node == b));
        assert_eq!(graph.node(a).unwrap().status(), NodeStatus::Idle);
        assert_eq!(graph.node(b).unwrap().status(), NodeStatus::Error);
        assert_eq!(graph.node(c).unwrap().status(), NodeStatus::Waiting);
    }

    /// Scenario 5 (spec 8): serializing a node of an unregistered type
    /// fails before anything is written.
    #[test]
    fn scenario_unregistered_type_blocks_serialize() {
        let registry = NodeRegistry::new(); // IntSource never registered
        let mut graph = Graph::new();
        graph.insert_new::<IntSource>().unwrap();

        let cache_root = std::env::temp_dir().join("betula_graph_unregistered_test");
        let result = crate::serialize::to_document(&graph, &registry, &cache_root, false);
        assert!(matches!(result, Err(GraphError::UnregisteredType)));
    }

    /// Scenario 6 (spec 8): a cycle is rejected and leaves the graph
    /// otherwise untouched.
    #[test]
    fn scenario_cycle_is_rejected() {
        let mut graph = Graph::new();
        let a = graph.insert_new::<Passthrough<i64>>().unwrap();
        let b = graph.insert_new::<Passthrough<i64>>().unwrap();
        let c = graph.insert_new::<Passthrough<i64>>().unwrap();
        graph.connect(a, "out", b, "in").unwrap();
        graph.connect(b, "out", c, "in").unwrap();
        graph.connect(c, "out", a, "in").unwrap();

        let err = graph.topological_order().unwrap_err();
        assert!(matches!(err, GraphError::CycleDetected));
    }
}
