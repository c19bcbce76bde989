//! Process-wide node factory: a string tag maps to a constructor for a
//! concrete [`NodeKind`], with a reverse map back from its `TypeId` to the
//! tag it was registered under.

use crate::as_any::AsAny;
use crate::error::GraphError;
use crate::node::{Node, NodeKind};
use std::any::TypeId;
use std::collections::HashMap;

trait NodeConstructor: std::fmt::Debug {
    fn create(&self) -> Box<dyn NodeKind>;
}

struct DefaultNodeConstructor<K> {
    _marker: std::marker::PhantomData<K>,
}

impl<K> std::fmt::Debug for DefaultNodeConstructor<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DefaultNodeConstructor<{}>", std::any::type_name::<K>())
    }
}

impl<K: NodeKind + Default + 'static> NodeConstructor for DefaultNodeConstructor<K> {
    fn create(&self) -> Box<dyn NodeKind> {
        Box::new(K::default())
    }
}

/// Maps a registered tag to a constructor, and back from a concrete type's
/// `TypeId` to its tag, the way `betula_common::tree_support::TreeSupport`
/// keeps a node's class name available in both directions.
#[derive(Default)]
pub struct NodeRegistry {
    by_tag: HashMap<String, (TypeId, Box<dyn NodeConstructor>)>,
    tag_by_type: HashMap<TypeId, String>,
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("tags", &self.by_tag.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `K` under `tag`. Idempotent: registering the same `tag` to
    /// the same `K` again succeeds silently. Registering the same `tag` to
    /// a different type fails with [`GraphError::DuplicateRegistration`].
    pub fn register<K: NodeKind + Default + 'static>(
        &mut self,
        tag: &str,
    ) -> Result<(), GraphError> {
        let type_id = TypeId::of::<K>();
        if let Some((existing_type, _)) = self.by_tag.get(tag) {
            if *existing_type == type_id {
                return Ok(());
            }
            return Err(GraphError::DuplicateRegistration(tag.to_string()));
        }
        self.by_tag.insert(
            tag.to_string(),
            (
                type_id,
                Box::new(DefaultNodeConstructor::<K> {
                    _marker: std::marker::PhantomData,
                }),
            ),
        );
        self.tag_by_type.insert(type_id, tag.to_string());
        Ok(())
    }

    pub fn deregister(&mut self, tag: &str) {
        if let Some((type_id, _)) = self.by_tag.remove(tag) {
            self.tag_by_type.remove(&type_id);
        }
    }

    pub fn deregister_by_type<K: 'static>(&mut self) {
        let type_id = TypeId::of::<K>();
        if let Some(tag) = self.tag_by_type.remove(&type_id) {
            self.by_tag.remove(&tag);
        }
    }

    /// Construct a fresh [`Node`] of the concrete variant registered under
    /// `tag`. Fails with [`GraphError::UnknownType`] if `tag` is unknown.
    pub fn create(&self, tag: &str) -> Result<Node, GraphError> {
        let (_, constructor) = self
            .by_tag
            .get(tag)
            .ok_or_else(|| GraphError::UnknownType(tag.to_string()))?;
        Node::new(constructor.create())
    }

    /// Recover the tag a live node's concrete type was registered under.
    /// Fails with [`GraphError::UnregisteredType`] if it never was.
    pub fn tag_of(&self, node: &Node) -> Result<String, GraphError> {
        let type_id = node.kind().as_any_ref().type_id();
        self.tag_by_type
            .get(&type_id)
            .cloned()
            .ok_or(GraphError::UnregisteredType)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::PortBuilder;

    #[derive(Debug, Default)]
    struct Dummy;
    impl NodeKind for Dummy {
        fn register_ports(&mut self, _builder: &mut PortBuilder) -> Result<(), GraphError> {
            Ok(())
        }
        fn compute(&mut self) -> Result<(), crate::error::NodeError> {
            Ok(())
        }
    }

    #[test]
    fn register_create_and_reverse_lookup() {
        let mut registry = NodeRegistry::new();
        registry.register::<Dummy>("dummy").unwrap();
        let node = registry.create("dummy").unwrap();
        assert_eq!(registry.tag_of(&node).unwrap(), "dummy");
    }

    #[test]
    fn reregistering_same_type_is_idempotent() {
        let mut registry = NodeRegistry::new();
        registry.register::<Dummy>("dummy").unwrap();
        registry.register::<Dummy>("dummy").unwrap();
    }

    #[test]
    fn unknown_tag_fails() {
        let registry = NodeRegistry::new();
        assert!(matches!(
            registry.create("nope"),
            Err(GraphError::UnknownType(_))
        ));
    }
}
