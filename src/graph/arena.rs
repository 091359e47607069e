use std::collections::HashMap;
use std::slice::Iter;

use crate::graph::{Node, NodeIndex};

/// Owns all nodes of a [`crate::DiGraph`]
///
/// Nodes are stored in insertion order, their position is the
/// [`NodeIndex`]. Labels are mapped to the index for lookups.
pub(crate) struct Arena<T> {
    nodes: Vec<Node<T>>,
    ids: HashMap<String, NodeIndex>,
}

impl<T> Arena<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            ids: HashMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a new node and returns its index
    ///
    /// The caller must make sure that `label` is not yet present
    pub fn insert(&mut self, label: &str, data: Option<T>) -> NodeIndex {
        let idx = NodeIndex::from(self.nodes.len());
        self.nodes.push(Node::new(idx, label.to_string(), data));
        self.ids.insert(label.to_string(), idx);
        idx
    }

    pub fn index_of(&self, label: &str) -> Option<NodeIndex> {
        self.ids.get(label).copied()
    }

    pub fn get(&self, idx: NodeIndex) -> Option<&Node<T>> {
        self.nodes.get(idx.as_usize())
    }

    /// # Panics
    ///
    /// Panics if the index does not belong to this arena. All indices
    /// handed out by the owning graph are valid.
    pub fn get_unchecked(&self, idx: NodeIndex) -> &Node<T> {
        &self.nodes[idx.as_usize()]
    }

    /// # Panics
    ///
    /// Panics if the index does not belong to this arena
    pub fn get_unchecked_mut(&mut self, idx: NodeIndex) -> &mut Node<T> {
        &mut self.nodes[idx.as_usize()]
    }

    pub fn iter(&self) -> Iter<'_, Node<T>> {
        self.nodes.iter()
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}
