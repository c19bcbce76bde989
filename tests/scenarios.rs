//! End-to-end coverage of the Section 8 concrete scenarios, driven only
//! through the public API (`betula_graph::prelude` plus the ready-made
//! node kinds in `betula_graph::nodes`), the way `betula_common`'s
//! `tree_support.rs` round-trips a whole tree through JSON in its own
//! `#[cfg(test)] mod test`.

use betula_graph::nodes::{self, Constant, Failing, Passthrough, Probe};
use betula_graph::prelude::*;
use betula_graph::serialize;

fn registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    nodes::register_builtin(&mut registry).unwrap();
    registry
}

#[test]
fn scenario_value_flows_end_to_end() {
    let mut graph = Graph::new();
    let src = graph.insert_new::<Constant<i64>>().unwrap();
    let sink = graph.insert_new::<Probe<i64>>().unwrap();

    graph
        .node_mut(src)
        .unwrap()
        .kind_mut()
        .downcast_mut::<Constant<i64>>()
        .unwrap()
        .set_value(7);

    graph.connect(src, "out", sink, "in").unwrap();
    graph.update().unwrap();

    let probe = graph.node(sink).unwrap().kind().downcast_ref::<Probe<i64>>().unwrap();
    assert_eq!(probe.last(), Some(&7));
}

#[test]
fn scenario_type_mismatch_is_rejected() {
    let mut graph = Graph::new();
    let src = graph.insert_new::<Constant<f64>>().unwrap();
    let sink = graph.insert_new::<Probe<i64>>().unwrap();

    let result = graph.connect(src, "out", sink, "in");
    assert!(matches!(result, Err(GraphError::TypeMismatch { .. })));
    assert!(graph.connections().is_empty());
}

#[test]
fn scenario_chain_failure_propagates() {
    let mut graph = Graph::new();
    let a = graph.insert_new::<Constant<i64>>().unwrap();
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

#[test]
fn scenario_serialize_round_trip_preserves_behavior() {
    let registry = registry();
    let mut graph = Graph::new();
    let src = graph.insert_new::<Constant<i64>>().unwrap();
    let sink = graph.insert_new::<Probe<i64>>().unwrap();
    graph
        .node_mut(src)
        .unwrap()
        .kind_mut()
        .downcast_mut::<Constant<i64>>()
        .unwrap()
        .set_value(42);
    graph.connect(src, "out", sink, "in").unwrap();
    graph.update().unwrap();

    let cache_root = std::env::temp_dir().join("betula_graph_scenarios_cache");
    let document = serialize::to_document(&graph, &registry, &cache_root, false).unwrap();

    let mut restored = Graph::new();
    serialize::from_document(&mut restored, &registry, &document, &cache_root, false).unwrap();
    restored.update().unwrap();

    let probe = restored
        .node(sink)
        .unwrap()
        .kind()
        .downcast_ref::<Probe<i64>>()
        .unwrap();
    assert_eq!(probe.last(), Some(&42));
}

#[test]
fn scenario_unregistered_type_blocks_serialize() {
    let registry = NodeRegistry::new(); // nothing registered
    let mut graph = Graph::new();
    graph.insert_new::<Constant<i64>>().unwrap();

    let cache_root = std::env::temp_dir().join("betula_graph_scenarios_unregistered");
    let result = serialize::to_document(&graph, &registry, &cache_root, false);
    assert!(matches!(result, Err(GraphError::UnregisteredType)));
}

#[test]
fn scenario_cycle_is_rejected() {
    let mut graph = Graph::new();
    let a = graph.insert_new::<Passthrough<i64>>().unwrap();
    let b = graph.insert_new::<Passthrough<i64>>().unwrap();
    let c = graph.insert_new::<Passthrough<i64>>().unwrap();
    graph.connect(a, "out", b, "in").unwrap();
    graph.connect(b, "out", c, "in").unwrap();
    graph.connect(c, "out", a, "in").unwrap();

    assert!(matches!(
        graph.topological_order(),
        Err(GraphError::CycleDetected)
    ));
}
