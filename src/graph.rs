//! The graph container: owns nodes, wires ports, computes a topological
//! order, and drives the global update.

use crate::error::GraphError;
use crate::identity::{NodeId, PortId};
use crate::node::{Node, NodeKind, NodeStatus};
use crate::port::{ErasedInput, ErasedOutput, ErasedPort};
use std::collections::HashMap;

/// A derived view of a single connection, reported by [`Graph::connections`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Connection {
    pub source_node: NodeId,
    pub source_port: PortId,
    pub sink_node: NodeId,
    pub sink_port: PortId,
}

/// Owns a set of [`Node`]s keyed by [`NodeId`] and drives their execution
/// in topological order. Connections are not stored here; they live as
/// source references on each node's input ports (spec 3, Connection).
#[derive(Default)]
pub struct Graph {
    nodes: HashMap<NodeId, Node>,
    /// Insertion order, used as the topological-sort tie-break (spec 4.F).
    order: Vec<NodeId>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an already-constructed node. Fails with
    /// [`GraphError::DuplicateNode`] if its id is already present.
    pub fn insert_node(&mut self, node: Node) -> Result<NodeId, GraphError> {
        let id = node.id();
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateNode(id));
        }
        self.order.push(id);
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Construct a node of concrete type `K` and insert it.
    pub fn insert_new<K: NodeKind + Default + 'static>(&mut self) -> Result<NodeId, GraphError> {
        self.insert_node(Node::new(Box::new(K::default()))?)
    }

    /// Insert several already-constructed nodes at once. Best-effort: if
    /// insertion fails partway through, every node inserted before the
    /// failing one stays in the graph; nothing is rolled back on
    /// failure, only the remaining nodes are left uninserted (spec 4.F).
    pub fn insert_nodes(
        &mut self,
        nodes: impl IntoIterator<Item = Node>,
    ) -> Result<Vec<NodeId>, GraphError> {
        let mut ids = Vec::new();
        for node in nodes {
            ids.push(self.insert_node(node)?);
        }
        Ok(ids)
    }

    /// Remove a node and detach every connection touching it, in either
    /// direction. Inputs owned by the removed node self-detach from their
    /// sources when dropped (see `port::InputInner`'s `Drop` impl); the
    /// outbound direction — other nodes' inputs pointing at this node's
    /// outputs — is detached explicitly here before the node is dropped.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        if !self.nodes.contains_key(&id) {
            return Err(GraphError::UnknownNode(id));
        }

        let sink_ids: Vec<PortId> = self
            .nodes
            .get(&id)
            .map(|n| n.connections().into_iter().map(|(_, sink)| sink).collect())
            .unwrap_or_default();

        if !sink_ids.is_empty() {
            let removed_output_names: Vec<String> = self.nodes[&id]
                .output_names()
                .map(|s| s.to_string())
                .collect();
            for name in removed_output_names {
                let output = self.nodes[&id].output_port(&name)?;
                for sink_id in output.sink_ids() {
                    if let Some((sink_node, sink_name)) = self.find_input(sink_id) {
                        let input = self.nodes[&sink_node].input_port(&sink_name)?;
                        output.disconnect_from(input);
                    }
                }
            }
        }

        self.nodes.remove(&id);
        self.order.retain(|n| *n != id);
        Ok(())
    }

    fn find_input(&self, port: PortId) -> Option<(NodeId, String)> {
        self.nodes.values().find_map(|n| {
            n.input_names()
                .find(|name| n.input_port(name).map(|p| p.id()) == Ok(port))
                .map(|name| (n.id(), name.to_string()))
        })
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.nodes.get(&id).ok_or(GraphError::UnknownNode(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, GraphError> {
        self.nodes.get_mut(&id).ok_or(GraphError::UnknownNode(id))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Node ids in the order they were inserted, used by serialization so
    /// documents are written deterministically (spec 4.G).
    pub fn insertion_order(&self) -> &[NodeId] {
        &self.order
    }

    /// Connect `source_port` on `source` to `sink_port` on `sink`. Takes
    /// `&self` rather than `&mut self`: the connection itself lives in the
    /// `Rc<RefCell<..>>` port cells, not in the map of nodes, so both
    /// endpoints can be resolved as plain shared borrows even when `source`
    /// and `sink` are the same node.
    pub fn connect(
        &self,
        source: NodeId,
        source_port: &str,
        sink: NodeId,
        sink_port: &str,
    ) -> Result<(), GraphError> {
        let output = self.node(source)?.output_port(source_port)?;
        let input = self.node(sink)?.input_port(sink_port)?;
        output.connect_into(input)
    }

    pub fn disconnect(
        &self,
        source: NodeId,
        source_port: &str,
        sink: NodeId,
        sink_port: &str,
    ) -> Result<(), GraphError> {
        let output = self.node(source)?.output_port(source_port)?;
        let input = self.node(sink)?.input_port(sink_port)?;
        output.disconnect_from(input);
        Ok(())
    }

    /// All connections in the graph, derived from every node's outputs.
    pub fn connections(&self) -> Vec<Connection> {
        self.nodes
            .values()
            .flat_map(|node| {
                node.connections().into_iter().map(move |(src, sink)| {
                    let sink_node = self
                        .find_input(sink)
                        .map(|(n, _)| n)
                        .unwrap_or(node.id());
                    Connection {
                        source_node: node.id(),
                        source_port: src,
                        sink_node,
                        sink_port: sink,
                    }
                })
            })
            .collect()
    }

    /// Kahn's algorithm over the output→input edges, with insertion order
    /// as the tie-break among nodes with no remaining unprocessed
    /// predecessors (spec 4.F). Fails with [`GraphError::CycleDetected`].
    pub fn topological_order(&self) -> Result<Vec<NodeId>, GraphError> {
        let mut in_degree: HashMap<NodeId, usize> =
            self.order.iter().map(|id| (*id, 0usize)).collect();
        let mut edges: HashMap<NodeId, Vec<NodeId>> =
            self.order.iter().map(|id| (*id, Vec::new())).collect();

        for node in self.nodes.values() {
            for name in node.output_names() {
                let Ok(output) = node.output_port(name) else {
                    continue;
                };
                for sink_id in output.sink_ids() {
                    if let Some((sink_node, _)) = self.find_input(sink_id) {
                        edges.get_mut(&node.id()).unwrap().push(sink_node);
                        *in_degree.get_mut(&sink_node).unwrap() += 1;
                    }
                }
            }
        }

        let mut ready: Vec<NodeId> = self
            .order
            .iter()
            .copied()
            .filter(|id| in_degree[id] == 0)
            .collect();
        let mut result = Vec::with_capacity(self.order.len());

        while let Some(pos) = ready
            .iter()
            .enumerate()
            .min_by_key(|(_, id)| self.order.iter().position(|o| o == *id).unwrap())
            .map(|(i, _)| i)
        {
            let id = ready.remove(pos);
            result.push(id);
            for next in edges.get(&id).cloned().unwrap_or_default() {
                let deg = in_degree.get_mut(&next).unwrap();
                *deg -= 1;
                if *deg == 0 {
                    ready.push(next);
                }
            }
        }

        if result.len() != self.order.len() {
            return Err(GraphError::CycleDetected);
        }
        Ok(result)
    }

    /// Visit every node in topological order, updating each in turn. If a
    /// node fails, nodes transitively downstream are left `Waiting` (their
    /// inputs never see new data) and the first failure is returned.
    pub fn update(&mut self) -> Result<(), GraphError> {
        let order = self.topological_order()?;
        let mut first_error = None;
        for id in order {
            let node = self.nodes.get_mut(&id).expect("topological order is exact");
            if let Err(err) = node.update() {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn statuses(&self) -> HashMap<NodeId, NodeStatus> {
        self.nodes.iter().map(|(id, n)| (*id, n.status())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::PortBuilder;

    #[derive(Debug, Default)]
    struct IntSource {
        output: Option<crate::port::Output<i64>>,
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
    struct IntSink {
        input: Option<crate::port::Input<i64>>,
    }
    impl NodeKind for IntSink {
        fn register_ports(&mut self, builder: &mut PortBuilder) -> Result<(), GraphError> {
            self.input = Some(builder.input::<i64>("in")?);
            Ok(())
        }
        fn compute(&mut self) -> Result<(), crate::error::NodeError> {
            Ok(())
        }
    }

    #[test]
    fn two_node_chain_propagates_value() {
        let mut graph = Graph::new();
        let a = graph.insert_new::<IntSource>().unwrap();
        let b = graph.insert_new::<IntSink>().unwrap();
        graph.connect(a, "out", b, "in").unwrap();
        graph.update().unwrap();

        let sink = graph.node(b).unwrap();
        let kind = sink.kind().downcast_ref::<IntSink>().unwrap();
        assert_eq!(kind.input.as_ref().unwrap().get(), Some(7));
        assert_eq!(sink.status(), NodeStatus::Idle);
    }

    #[test]
    fn cycle_is_rejected() {
        use crate::nodes::Passthrough;
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

    #[test]
    fn update_twice_is_a_no_op_the_second_time() {
        let mut graph = Graph::new();
        let a = graph.insert_new::<IntSource>().unwrap();
        let b = graph.insert_new::<IntSink>().unwrap();
        graph.connect(a, "out", b, "in").unwrap();
        graph.update().unwrap();
        graph.update().unwrap();
        let source = graph.node(a).unwrap();
        assert_eq!(source.status(), NodeStatus::Idle);
    }

    #[test]
    fn insert_nodes_inserts_every_node_at_once() {
        let mut graph = Graph::new();
        let ids = graph
            .insert_nodes(vec![
                Node::new(Box::new(IntSource::default())).unwrap(),
                Node::new(Box::new(IntSink::default())).unwrap(),
            ])
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert!(graph.node(ids[0]).is_ok());
        assert!(graph.node(ids[1]).is_ok());
    }

    #[test]
    fn insert_nodes_leaves_earlier_insertions_in_place_on_failure() {
        let mut graph = Graph::new();
        let existing = graph.insert_new::<IntSource>().unwrap();

        let mut colliding = Node::new(Box::new(IntSink::default())).unwrap();
        colliding.set_id(existing);
        let fresh = Node::new(Box::new(IntSink::default())).unwrap();
        let fresh_id = fresh.id();

        let result = graph.insert_nodes(vec![fresh, colliding]);

        assert!(matches!(result, Err(GraphError::DuplicateNode(_))));
        assert!(graph.node(existing).is_ok());
        assert!(graph.node(fresh_id).is_ok());
    }
}
