//! The minimal read-only projection the core owes an external
//! visualization exporter (spec 6): which nodes exist, their ports by
//! name, and the derived edge list. No rendering or styling lives here —
//! that is deliberately an external collaborator's concern.

use crate::graph::Graph;
use crate::identity::{NodeId, PortId};
use crate::registry::NodeRegistry;

#[derive(Debug, Clone)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub tag: String,
    pub input_ports: Vec<(String, PortId)>,
    pub output_ports: Vec<(String, PortId)>,
}

#[derive(Debug, Clone, Copy)]
pub struct EdgeSnapshot {
    pub source_node: NodeId,
    pub source_port: PortId,
    pub sink_node: NodeId,
    pub sink_port: PortId,
}

/// A full snapshot of `graph`'s nodes and edges, suitable as the input to
/// an external graph-description-language writer.
pub fn snapshot(graph: &Graph, registry: &NodeRegistry) -> Vec<NodeSnapshot> {
    graph
        .insertion_order()
        .iter()
        .filter_map(|&id| {
            let node = graph.node(id).ok()?;
            let tag = registry.tag_of(node).unwrap_or_else(|_| "<unregistered>".to_string());
            let input_ports = node
                .input_names()
                .filter_map(|name| Some((name.to_string(), node.input_port(name).ok()?.id())))
                .collect();
            let output_ports = node
                .output_names()
                .filter_map(|name| Some((name.to_string(), node.output_port(name).ok()?.id())))
                .collect();
            Some(NodeSnapshot {
                id,
                tag,
                input_ports,
                output_ports,
            })
        })
        .collect()
}

pub fn edges(graph: &Graph) -> Vec<EdgeSnapshot> {
    graph
        .connections()
        .into_iter()
        .map(|c| EdgeSnapshot {
            source_node: c.source_node,
            source_port: c.source_port,
            sink_node: c.sink_node,
            sink_port: c.sink_port,
        })
        .collect()
}
