//! A generic directed graph with labeled edges
//!
//! [`DiGraph`] is the structural backbone of the [`crate::OntologyGraph`].
//! Nodes are identified by a string label and live in an arena, edges point
//! from a node to its parents (`succ`) and are mirrored on the parent (`pred`).
//!
//! The transitive closure over outgoing edges ([`DiGraph::get_ancestors`]) is
//! computed lazily and cached per node. The traversal tolerates cycles: every
//! cycle found on the way is recorded once and can be retrieved with
//! [`DiGraph::cycles`].
use core::fmt::Debug;
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::sync::{Mutex, MutexGuard, PoisonError};

use smallvec::SmallVec;
use tracing::{trace, warn};

use crate::{OntologyError, OntologyResult, DEFAULT_NUM_EDGES};

mod arena;
use arena::Arena;

/// The position of a [`Node`] inside its graph
///
/// Indices are only meaningful for the graph that created them.
#[derive(Clone, Copy, Default, Debug, Hash, PartialEq, PartialOrd, Eq, Ord)]
pub struct NodeIndex {
    inner: u32,
}

impl NodeIndex {
    /// Returns the index as `usize`
    pub fn as_usize(&self) -> usize {
        self.inner as usize
    }
}

impl From<u32> for NodeIndex {
    fn from(inner: u32) -> Self {
        Self { inner }
    }
}

impl From<usize> for NodeIndex {
    /// # Panics
    ///
    /// Graphs are limited to `u32::MAX` nodes
    fn from(n: usize) -> Self {
        Self {
            inner: u32::try_from(n).expect("graph cannot hold more than u32::MAX nodes"),
        }
    }
}

impl Display for NodeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.inner)
    }
}

/// A directed edge to another node, optionally carrying a relationship label
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
    to: NodeIndex,
    label: Option<String>,
}

impl Edge {
    /// The node the edge points to
    pub fn to(&self) -> NodeIndex {
        self.to
    }

    /// The relationship type of the edge, e.g. `is_a`
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// Outgoing or incoming edges of a node
pub type Edges = SmallVec<[Edge; DEFAULT_NUM_EDGES]>;

/// A single node of a [`DiGraph`]
///
/// Nodes that were only referenced by an edge but never added explicitly
/// do not have `data`.
#[derive(Debug)]
pub struct Node<T> {
    index: NodeIndex,
    label: String,
    data: Option<T>,
    succ: Edges,
    pred: Edges,
}

impl<T> Node<T> {
    pub(crate) fn new(index: NodeIndex, label: String, data: Option<T>) -> Self {
        Self {
            index,
            label,
            data,
            succ: Edges::new(),
            pred: Edges::new(),
        }
    }

    /// The index of the node inside its graph
    pub fn index(&self) -> NodeIndex {
        self.index
    }

    /// The unique id of the node
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The payload of the node
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Edges to the parents of the node
    pub fn succ(&self) -> &Edges {
        &self.succ
    }

    /// Edges from the children of the node
    pub fn pred(&self) -> &Edges {
        &self.pred
    }
}

/// Memoized ancestor sets and all cycles found while computing them
#[derive(Default, Debug)]
struct ReachCache {
    ancestors: HashMap<NodeIndex, HashSet<NodeIndex>>,
    cycles: Vec<Vec<NodeIndex>>,
    known_cycles: HashSet<Vec<NodeIndex>>,
}

impl ReachCache {
    fn clear(&mut self) {
        self.ancestors.clear();
        self.cycles.clear();
        self.known_cycles.clear();
    }

    /// Adds the cycle unless a rotation of it is already known
    fn record_cycle(&mut self, cycle: Vec<NodeIndex>) -> bool {
        if !self.known_cycles.insert(canonical_rotation(&cycle)) {
            return false;
        }
        self.cycles.push(cycle);
        true
    }
}

/// Rotates a cycle to start at its smallest index
fn canonical_rotation(cycle: &[NodeIndex]) -> Vec<NodeIndex> {
    let start = cycle
        .iter()
        .enumerate()
        .min_by_key(|(_, idx)| **idx)
        .map_or(0, |(pos, _)| pos);
    cycle[start..].iter().chain(&cycle[..start]).copied().collect()
}

/// State of a single ancestor computation
#[derive(Default)]
struct Traversal {
    on_path: HashSet<NodeIndex>,
    open_nodes: HashMap<NodeIndex, OpenVisit>,
}

/// A finished node whose cycles are still open
///
/// `path_hits` are the reachable nodes that were on the path (or the node
/// itself) when it was expanded.
struct OpenVisit {
    open: Vec<Vec<NodeIndex>>,
    reachable: HashSet<NodeIndex>,
    path_hits: HashSet<NodeIndex>,
}

impl OpenVisit {
    /// A new expansion of `idx` would be identical if it hits the same path nodes
    fn is_reusable(&self, idx: NodeIndex, on_path: &HashSet<NodeIndex>) -> bool {
        self.reachable
            .iter()
            .all(|n| (*n == idx || on_path.contains(n)) == self.path_hits.contains(n))
    }
}

/// Directed graph with string-labeled nodes and labeled edges
///
/// # Examples
///
/// ```
/// use goenrich::DiGraph;
///
/// let mut graph: DiGraph<()> = DiGraph::default();
/// graph.add_edge("A", "B", Some("is_a"));
/// graph.add_edge("A", "C", Some("is_a"));
/// graph.add_edge("B", "D", Some("is_a"));
/// graph.add_edge("C", "D", Some("is_a"));
///
/// let ancestors = graph.get_ancestors("A").unwrap();
/// assert_eq!(ancestors.len(), 3);
/// assert!(ancestors.contains("D"));
/// assert!(graph.cycles().is_empty());
/// ```
pub struct DiGraph<T> {
    arena: Arena<T>,
    reach: Mutex<ReachCache>,
}

impl<T> Default for DiGraph<T> {
    fn default() -> Self {
        Self {
            arena: Arena::default(),
            reach: Mutex::new(ReachCache::default()),
        }
    }
}

impl<T> Debug for DiGraph<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DiGraph with {} nodes", self.arena.len())
    }
}

impl<T> DiGraph<T> {
    /// Constructs an empty graph with room for `capacity` nodes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            arena: Arena::with_capacity(capacity),
            reach: Mutex::new(ReachCache::default()),
        }
    }

    /// Constructs a graph from unlabeled `(child, parent)` edges
    ///
    /// ```
    /// use goenrich::DiGraph;
    ///
    /// let graph: DiGraph<()> = DiGraph::from_edges([("1", "2"), ("2", "3")]);
    /// assert_eq!(graph.len(), 3);
    /// ```
    pub fn from_edges<'e, I: IntoIterator<Item = (&'e str, &'e str)>>(edges: I) -> Self {
        let mut graph = Self::default();
        for (u, v) in edges {
            graph.add_edge(u, v, None);
        }
        graph
    }

    /// Returns the number of nodes
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Returns `true` if the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Iterates all nodes in insertion order
    pub fn nodes(&self) -> std::slice::Iter<'_, Node<T>> {
        self.arena.iter()
    }

    /// Adds a new node
    ///
    /// # Errors
    ///
    /// [`OntologyError::DuplicateNode`] if the id is already present.
    /// Use [`DiGraph::upsert_node`] when a node may have been created
    /// implicitly by [`DiGraph::add_edge`] before.
    pub fn add_node(&mut self, id: &str, data: Option<T>) -> OntologyResult<NodeIndex> {
        if self.arena.index_of(id).is_some() {
            return Err(OntologyError::DuplicateNode(id.to_string()));
        }
        Ok(self.arena.insert(id, data))
    }

    /// Adds the node or replaces the data of an existing node
    ///
    /// Edges of an existing node are not changed.
    pub fn upsert_node(&mut self, id: &str, data: Option<T>) -> NodeIndex {
        match self.arena.index_of(id) {
            Some(idx) => {
                self.arena.get_unchecked_mut(idx).data = data;
                idx
            }
            None => self.arena.insert(id, data),
        }
    }

    /// Replaces the data of an existing node
    ///
    /// # Errors
    ///
    /// [`OntologyError::NodeNotFound`] if no node with the id exists
    pub fn update_node(&mut self, id: &str, data: Option<T>) -> OntologyResult<()> {
        let idx = self
            .arena
            .index_of(id)
            .ok_or_else(|| OntologyError::NodeNotFound(id.to_string()))?;
        self.arena.get_unchecked_mut(idx).data = data;
        Ok(())
    }

    /// Links `u` to its parent `v`
    ///
    /// Missing nodes are created without data. Adding an identical edge
    /// (same target and label) twice has no effect. Changing the structure
    /// drops all cached ancestor sets and cycles.
    pub fn add_edge(&mut self, u: &str, v: &str, label: Option<&str>) {
        let u_idx = self.upsert_bare(u);
        let v_idx = self.upsert_bare(v);
        let label = label.map(str::to_string);

        let succ = Edge {
            to: v_idx,
            label: label.clone(),
        };
        if self.arena.get_unchecked(u_idx).succ.contains(&succ) {
            trace!("Ignoring duplicate edge {} -> {}", u, v);
            return;
        }
        self.arena.get_unchecked_mut(u_idx).succ.push(succ);
        self.arena
            .get_unchecked_mut(v_idx)
            .pred
            .push(Edge { to: u_idx, label });

        self.reach
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn upsert_bare(&mut self, id: &str) -> NodeIndex {
        match self.arena.index_of(id) {
            Some(idx) => idx,
            None => self.arena.insert(id, None),
        }
    }

    /// Returns `true` if a node with the id exists
    pub fn node_exists(&self, id: &str) -> bool {
        self.arena.index_of(id).is_some()
    }

    /// Returns the index of the node with the id
    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.arena.index_of(id)
    }

    /// Returns the node with the id
    ///
    /// # Errors
    ///
    /// [`OntologyError::NodeNotFound`] if no node with the id exists
    pub fn get_node(&self, id: &str) -> OntologyResult<&Node<T>> {
        self.arena
            .index_of(id)
            .map(|idx| self.arena.get_unchecked(idx))
            .ok_or_else(|| OntologyError::NodeNotFound(id.to_string()))
    }

    /// Returns the node at the index
    pub fn node(&self, idx: NodeIndex) -> Option<&Node<T>> {
        self.arena.get(idx)
    }

    pub(crate) fn node_unchecked(&self, idx: NodeIndex) -> &Node<T> {
        self.arena.get_unchecked(idx)
    }

    /// Returns the ids of all direct parents, regardless of the edge label
    ///
    /// # Errors
    ///
    /// [`OntologyError::NodeNotFound`] if no node with the id exists
    pub fn get_parents(&self, id: &str) -> OntologyResult<HashSet<String>> {
        let node = self.get_node(id)?;
        Ok(self.labels(self.parent_indices(node.index)))
    }

    pub(crate) fn parent_indices(&self, idx: NodeIndex) -> HashSet<NodeIndex> {
        self.arena.get_unchecked(idx).succ.iter().map(Edge::to).collect()
    }

    /// Returns the ids of all nodes reachable via outgoing edges
    ///
    /// The result is cached per node; the returned set is a copy. A node
    /// that is part of a cycle is its own ancestor.
    ///
    /// # Errors
    ///
    /// [`OntologyError::NodeNotFound`] if no node with the id exists
    ///
    /// # Examples
    ///
    /// ```
    /// use goenrich::DiGraph;
    ///
    /// let graph: DiGraph<()> = DiGraph::from_edges([("1", "2"), ("2", "3"), ("3", "1")]);
    /// let ancestors = graph.get_ancestors("2").unwrap();
    /// assert_eq!(ancestors.len(), 3);
    /// assert_eq!(graph.cycles(), vec![vec!["2", "1", "3"]]);
    /// ```
    pub fn get_ancestors(&self, id: &str) -> OntologyResult<HashSet<String>> {
        let node = self.get_node(id)?;
        Ok(self.labels(self.ancestor_indices(node.index)))
    }

    /// Returns the indices of all nodes reachable from `idx`
    pub(crate) fn ancestor_indices(&self, idx: NodeIndex) -> HashSet<NodeIndex> {
        let mut cache = self.reach_cache();
        if let Some(cached) = cache.ancestors.get(&idx) {
            return cached.clone();
        }
        let mut traversal = Traversal::default();
        let (_, reachable) = self.reachable(idx, &mut traversal, &mut cache);
        reachable
    }

    /// Depth first traversal over outgoing edges
    ///
    /// When an edge leads back onto the current path, a cycle is opened
    /// with the revisited node. Every node the recursion unwinds through
    /// appends itself to the open cycles until the revisited node closes
    /// and records it. Nodes with open cycles have an incomplete result and
    /// are not cached, but their expansion is reused within the traversal
    /// as long as the path nodes they reach are unchanged.
    ///
    /// Returns the still open cycles and the reachable nodes.
    fn reachable(
        &self,
        idx: NodeIndex,
        traversal: &mut Traversal,
        cache: &mut ReachCache,
    ) -> (Vec<Vec<NodeIndex>>, HashSet<NodeIndex>) {
        if let Some(cached) = cache.ancestors.get(&idx) {
            return (Vec::new(), cached.clone());
        }
        if let Some(visit) = traversal.open_nodes.get(&idx) {
            if visit.is_reusable(idx, &traversal.on_path) {
                return (visit.open.clone(), visit.reachable.clone());
            }
        }

        traversal.on_path.insert(idx);
        let mut open: Vec<Vec<NodeIndex>> = Vec::new();
        let mut result = HashSet::new();
        for edge in &self.arena.get_unchecked(idx).succ {
            result.insert(edge.to);
            if traversal.on_path.contains(&edge.to) {
                open.push(vec![edge.to]);
            } else {
                let (child_open, child_result) = self.reachable(edge.to, traversal, cache);
                result.extend(child_result);
                open.extend(child_open);
            }
        }
        traversal.on_path.remove(&idx);

        let mut still_open = Vec::new();
        for mut cycle in open {
            if cycle[0] == idx {
                let labels: Vec<&str> = cycle
                    .iter()
                    .map(|i| self.arena.get_unchecked(*i).label())
                    .collect();
                if cache.record_cycle(cycle) {
                    warn!("Found cycle: {:?}", labels);
                }
            } else {
                cycle.push(idx);
                still_open.push(cycle);
            }
        }

        if still_open.is_empty() {
            cache.ancestors.insert(idx, result.clone());
        } else {
            let path_hits = result
                .iter()
                .copied()
                .filter(|n| *n == idx || traversal.on_path.contains(n))
                .collect();
            traversal.open_nodes.insert(
                idx,
                OpenVisit {
                    open: still_open.clone(),
                    reachable: result.clone(),
                    path_hits,
                },
            );
        }
        (still_open, result)
    }

    /// Returns all cycles found so far, as node ids
    ///
    /// Cycles are discovered while computing ancestors. Each cycle starts
    /// with the node that was revisited, followed by the path back to it.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        self.reach_cache()
            .cycles
            .iter()
            .map(|cycle| {
                cycle
                    .iter()
                    .map(|idx| self.arena.get_unchecked(*idx).label.clone())
                    .collect()
            })
            .collect()
    }

    /// Returns `true` if any cycle has been found so far
    pub fn has_cycles(&self) -> bool {
        !self.reach_cache().cycles.is_empty()
    }

    fn reach_cache(&self) -> MutexGuard<'_, ReachCache> {
        self.reach.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn labels<I: IntoIterator<Item = NodeIndex>>(&self, indices: I) -> HashSet<String> {
        indices
            .into_iter()
            .map(|idx| self.arena.get_unchecked(idx).label.clone())
            .collect()
    }
}

impl<T: Clone> DiGraph<T> {
    /// Returns an independent graph with all nodes, but only the
    /// edges with one of the given labels
    ///
    /// ```
    /// use goenrich::DiGraph;
    ///
    /// let mut graph: DiGraph<()> = DiGraph::default();
    /// graph.add_edge("A", "B", Some("is_a"));
    /// graph.add_edge("B", "C", Some("part_of"));
    ///
    /// let trimmed = graph.trim(&["is_a"]);
    /// assert_eq!(trimmed.len(), 3);
    /// assert!(trimmed.get_ancestors("B").unwrap().is_empty());
    /// ```
    pub fn trim<S: AsRef<str>>(&self, relation_labels: &[S]) -> DiGraph<T> {
        let labels: HashSet<&str> = relation_labels.iter().map(AsRef::as_ref).collect();
        self.filtered(
            |_| true,
            |edge| edge.label().map_or(false, |l| labels.contains(l)),
        )
    }

    /// Returns a graph with only the given nodes and the edges between them
    ///
    /// Ids that are not part of the graph are ignored.
    pub fn get_induced_subgraph<S: AsRef<str>>(&self, ids: &[S]) -> DiGraph<T> {
        let keep: HashSet<NodeIndex> = ids
            .iter()
            .filter_map(|id| self.arena.index_of(id.as_ref()))
            .collect();
        self.filtered(|node| keep.contains(&node.index), |edge| keep.contains(&edge.to))
    }

    fn filtered<N, E>(&self, keep_node: N, keep_edge: E) -> DiGraph<T>
    where
        N: Fn(&Node<T>) -> bool,
        E: Fn(&Edge) -> bool,
    {
        let mut graph = DiGraph::with_capacity(self.len());
        for node in self.arena.iter().filter(|node| keep_node(node)) {
            graph.upsert_node(&node.label, node.data.clone());
        }
        for node in self.arena.iter().filter(|node| keep_node(node)) {
            for edge in node.succ.iter().filter(|edge| keep_edge(edge)) {
                let target = self.arena.get_unchecked(edge.to).label();
                graph.add_edge(&node.label, target, edge.label());
            }
        }
        graph
    }
}
