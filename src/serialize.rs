//! Round-trip serialization of a [`Graph`] to the persisted document
//! schema (spec 4.G), plus the per-node cache directory.
//!
//! Deserialization is two-pass, mirroring
//! `betula_common::tree_support::TreeSupport::import_tree_config`:
//! first every node is constructed and its private state restored, then
//! a second pass reconnects inputs to outputs by matching the UUIDs
//! recorded in the document.

use crate::error::GraphError;
use crate::graph::Graph;
use crate::identity::{NodeId, PortId};
use crate::port::{ErasedInput, ErasedPort};
use crate::registry::NodeRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputPortRecord {
    pub uuid: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputPortRecord {
    pub uuid: Uuid,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(rename = "type")]
    pub type_tag: String,
    pub uuid: Uuid,
    #[serde(rename = "inputPorts")]
    pub input_ports: BTreeMap<String, InputPortRecord>,
    #[serde(rename = "outputPorts")]
    pub output_ports: BTreeMap<String, OutputPortRecord>,
    #[serde(default = "default_data")]
    pub data: serde_json::Value,
}

fn default_data() -> serde_json::Value {
    serde_json::Value::Null
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDocument {
    pub nodes: Vec<NodeRecord>,
}

fn node_cache_dir(cache_root: &Path, node_id: NodeId, use_cache: bool) -> Option<std::path::PathBuf> {
    if !use_cache {
        return None;
    }
    Some(cache_root.join(node_id.to_string()))
}

/// Build the in-memory document for `graph`. If `use_cache` is set, a
/// per-node subdirectory of `cache_root` is created (if absent) and
/// handed to the node's private serialize hook.
pub fn to_document(
    graph: &Graph,
    registry: &NodeRegistry,
    cache_root: &Path,
    use_cache: bool,
) -> Result<GraphDocument, GraphError> {
    let mut nodes = Vec::new();
    for &id in graph.insertion_order() {
        let node = graph.node(id)?;
        let type_tag = registry.tag_of(node)?;

        let cache_dir = node_cache_dir(cache_root, id, use_cache);
        if let Some(dir) = &cache_dir {
            std::fs::create_dir_all(dir)?;
        }

        let data = node.kind().serialize_state(cache_dir.as_deref())?;

        let mut input_ports = BTreeMap::new();
        for name in node.input_names() {
            let port = node.input_port(name)?;
            input_ports.insert(
                name.to_string(),
                InputPortRecord {
                    uuid: port.id().0,
                    source: port.source_id().map(|p| p.0),
                },
            );
        }

        let mut output_ports = BTreeMap::new();
        for name in node.output_names() {
            let port = node.output_port(name)?;
            output_ports.insert(name.to_string(), OutputPortRecord { uuid: port.id().0 });
        }

        nodes.push(NodeRecord {
            type_tag,
            uuid: id.0,
            input_ports,
            output_ports,
            data,
        });
    }
    Ok(GraphDocument { nodes })
}

pub fn serialize(
    graph: &Graph,
    registry: &NodeRegistry,
    path: &Path,
    cache_root: &Path,
    use_cache: bool,
) -> Result<(), GraphError> {
    let document = to_document(graph, registry, cache_root, use_cache)?;
    let text = serde_json::to_string_pretty(&document)?;
    std::fs::write(path, text)?;
    Ok(())
}

/// Merge `document` into `graph`. A node whose UUID is already present in
/// `graph` fails the whole operation with [`GraphError::DuplicateNode`];
/// nothing already in `graph` before the call is removed on failure, but
/// nodes inserted earlier in this same call are not rolled back (matching
/// [`Graph::insert_nodes`]'s best-effort contract in spec 4.F).
pub fn from_document(
    graph: &mut Graph,
    registry: &NodeRegistry,
    document: &GraphDocument,
    cache_root: &Path,
    use_cache: bool,
) -> Result<(), GraphError> {
    // Pass 1: construct every node, restore its identity and private
    // state, and remember where each output port's document UUID lives.
    let mut output_locations: BTreeMap<Uuid, (NodeId, String)> = BTreeMap::new();
    let mut inserted = Vec::with_capacity(document.nodes.len());

    for record in &document.nodes {
        let mut node = registry.create(&record.type_tag)?;
        let node_id = NodeId::from_uuid(record.uuid);
        node.set_id(node_id);

        for (name, port_record) in &record.input_ports {
            node.input_port(name)?.set_id(PortId::from_uuid(port_record.uuid));
        }
        for (name, port_record) in &record.output_ports {
            node.output_port(name)?.set_id(PortId::from_uuid(port_record.uuid));
            output_locations.insert(port_record.uuid, (node_id, name.clone()));
        }

        let cache_dir = node_cache_dir(cache_root, node_id, use_cache);
        node.kind_mut()
            .deserialize_state(&record.data, cache_dir.as_deref())?;

        inserted.push((node_id, record));
        graph.insert_node(node)?;
    }

    // Pass 2: reconnect. Every input with a declared source is resolved
    // against `output_locations`; an unresolved source is a corrupted
    // document.
    for (node_id, record) in inserted {
        for (input_name, port_record) in &record.input_ports {
            let Some(source_uuid) = port_record.source else {
                continue;
            };
            let (source_node, source_name) =
                output_locations.get(&source_uuid).cloned().ok_or_else(|| {
                    GraphError::DanglingSource(
                        PortId::from_uuid(port_record.uuid),
                        PortId::from_uuid(source_uuid),
                    )
                })?;
            graph.connect(source_node, &source_name, node_id, input_name)?;
        }
    }

    Ok(())
}

pub fn deserialize(
    graph: &mut Graph,
    registry: &NodeRegistry,
    path: &Path,
    cache_root: &Path,
    use_cache: bool,
) -> Result<(), GraphError> {
    let text = std::fs::read_to_string(path)?;
    let document: GraphDocument = serde_json::from_str(&text)?;
    from_document(graph, registry, &document, cache_root, use_cache)
}
