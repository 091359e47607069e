//! Ontology terms and their hierarchy
//!
//! [`OntologyGraph`] holds the terms parsed from an OBO file in a
//! [`DiGraph`] and resolves alternative ids and synonyms to their term.
use core::fmt::Debug;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::Display;

use tracing::debug;

use crate::graph::{DiGraph, Node, NodeIndex};
use crate::{OntologyError, OntologyResult, DEFAULT_NUM_TERMS, IS_A};

pub mod record;
use record::{Fields, OboRecord, TermRecord};

/// A single ontology term, e.g. a GO term
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OntologyTerm {
    id: String,
    name: String,
    attrs: Fields,
}

impl OntologyTerm {
    /// Constructs a new term
    pub fn new(id: &str, name: &str, attrs: Fields) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            attrs,
        }
    }

    /// The canonical id of the term
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The name of the term
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All other tags of the term definition, e.g. `namespace` or `def`
    pub fn attrs(&self) -> &Fields {
        &self.attrs
    }
}

impl Display for OntologyTerm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "[Term]")?;
        writeln!(f, "id: {}", self.id)?;
        writeln!(f, "name: {}", self.name)?;
        for (tag, values) in &self.attrs {
            for value in values {
                writeln!(f, "{tag}: {value}")?;
            }
        }
        Ok(())
    }
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// `OntologyGraph` holds all terms of an ontology and their relationships
///
/// Every term is a node, every `is_a` or `relationship` tag is an edge
/// from the term to its parent, labeled with the relationship type.
/// Relationship types other than `is_a` must be declared as `Typedef`.
/// Terms can be looked up by their id or by one of their synonyms.
///
/// ```mermaid
/// erDiagram
///     ONTOLOGYGRAPH ||--|{ TERM : contains
///     ONTOLOGYGRAPH ||--o{ TYPEDEF : declares
///     ONTOLOGYGRAPH ||--o{ SYNONYM : resolves
///     TERM ||--o{ TERM : "is_a / typedef"
///     SYNONYM }o--|| TERM : alias_of
///     TERM {
///         str id
///         str name
///         Fields attrs
///     }
/// ```
///
/// # Examples
///
/// ```
/// use goenrich::ontology::record::{Fields, OboRecord};
/// use goenrich::OntologyGraph;
///
/// fn term(id: &str, name: &str, is_a: &[&str]) -> OboRecord {
///     let mut fields = Fields::new();
///     fields.insert("id".into(), vec![id.into()]);
///     fields.insert("name".into(), vec![name.into()]);
///     fields.insert("is_a".into(), is_a.iter().map(|s| s.to_string()).collect());
///     OboRecord::from_parts("Term", fields).unwrap()
/// }
///
/// let graph = OntologyGraph::from_records(vec![
///     term("GO:0030534", "adult behavior", &["GO:0050896"]),
///     term("GO:0050896", "response to stimulus", &[]),
/// ]).unwrap();
///
/// assert_eq!(graph.get_term("GO:0030534").unwrap().name(), "adult behavior");
/// assert!(graph.get_ancestors("GO:0030534").unwrap().contains("GO:0050896"));
/// ```
#[derive(Default)]
pub struct OntologyGraph {
    graph: DiGraph<OntologyTerm>,
    typedefs: Vec<String>,
    synonyms: HashMap<String, NodeIndex>,
}

impl Debug for OntologyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "OntologyGraph with {} terms and {} typedefs",
            self.graph.len(),
            self.typedefs.len()
        )
    }
}

impl OntologyGraph {
    /// Builds the graph from parsed ontology stanzas
    ///
    /// Terms may reference parents that are defined later. Stanzas other
    /// than `Term` and `Typedef` are ignored.
    ///
    /// # Errors
    ///
    /// - [`OntologyError::MalformedRelationship`]: a `relationship` value is
    ///   not formatted as `<relation> <target-id>`
    /// - [`OntologyError::UndefinedRelation`]: relationship types are used
    ///   but never declared in a `Typedef` stanza
    pub fn from_records<I: IntoIterator<Item = OboRecord>>(records: I) -> OntologyResult<Self> {
        let mut ontology = OntologyGraph {
            graph: DiGraph::with_capacity(DEFAULT_NUM_TERMS),
            ..Default::default()
        };
        let mut used_relations: BTreeSet<String> = BTreeSet::new();

        for record in records {
            match record {
                OboRecord::Term(term) => ontology.add_term(term, &mut used_relations)?,
                OboRecord::Typedef(typedef) => ontology.add_typedef(&typedef.id),
                OboRecord::Other(kind, _) => debug!("Ignoring {} stanza", kind),
            }
        }

        let undefined: Vec<String> = used_relations
            .into_iter()
            .filter(|rel| !ontology.typedefs.contains(rel))
            .collect();
        if !undefined.is_empty() {
            return Err(OntologyError::UndefinedRelation(undefined));
        }
        debug!("Built {:?}", ontology);
        Ok(ontology)
    }

    fn add_term(
        &mut self,
        term: TermRecord,
        used_relations: &mut BTreeSet<String>,
    ) -> OntologyResult<()> {
        let relationships = term.relationships()?;
        let data = OntologyTerm::new(&term.id, &term.name, term.attributes());
        let idx = self.graph.upsert_node(&term.id, Some(data));

        for parent in term.is_a_targets() {
            self.graph.add_edge(&term.id, parent, Some(IS_A));
        }
        for (relation, target) in relationships {
            self.graph.add_edge(&term.id, target, Some(relation));
            if relation != IS_A {
                used_relations.insert(relation.to_string());
            }
        }
        for alias in term.aliases() {
            self.synonyms.insert(alias.to_string(), idx);
        }
        Ok(())
    }

    fn add_typedef(&mut self, id: &str) {
        if !self.typedefs.iter().any(|t| t == id) {
            self.typedefs.push(id.to_string());
        }
    }

    /// Returns the number of terms, including terms that are only referenced
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    /// Returns `true` if the ontology has no terms
    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Iterates all defined terms
    pub fn terms(&self) -> impl Iterator<Item = &OntologyTerm> {
        self.graph.nodes().filter_map(Node::data)
    }

    /// The underlying graph
    pub fn graph(&self) -> &DiGraph<OntologyTerm> {
        &self.graph
    }

    /// Resolves an id or synonym to the index of its term
    pub fn resolve(&self, id: &str) -> Option<NodeIndex> {
        self.graph
            .index_of(id)
            .or_else(|| self.synonyms.get(id).copied())
    }

    fn resolve_or_err(&self, id: &str) -> OntologyResult<NodeIndex> {
        self.resolve(id)
            .ok_or_else(|| OntologyError::NodeNotFound(id.to_string()))
    }

    /// Returns `true` if the id or synonym is known
    pub fn node_exists(&self, id: &str) -> bool {
        self.resolve(id).is_some()
    }

    /// Returns the node of the id or synonym
    ///
    /// # Errors
    ///
    /// [`OntologyError::NodeNotFound`] if the id cannot be resolved
    pub fn get_node(&self, id: &str) -> OntologyResult<&Node<OntologyTerm>> {
        let idx = self.resolve_or_err(id)?;
        Ok(self.graph.node_unchecked(idx))
    }

    /// Returns the term of the id or synonym
    ///
    /// # Errors
    ///
    /// [`OntologyError::NodeNotFound`] if the id cannot be resolved or
    /// the term was referenced as a parent but never defined
    pub fn get_term(&self, id: &str) -> OntologyResult<&OntologyTerm> {
        self.get_node(id)?
            .data()
            .ok_or_else(|| OntologyError::NodeNotFound(id.to_string()))
    }

    /// Returns the canonical ids of all ancestors
    ///
    /// # Errors
    ///
    /// [`OntologyError::NodeNotFound`] if the id cannot be resolved
    pub fn get_ancestors(&self, id: &str) -> OntologyResult<HashSet<String>> {
        let node = self.get_node(id)?;
        self.graph.get_ancestors(node.label())
    }

    /// Returns the canonical ids of all direct parents
    ///
    /// # Errors
    ///
    /// [`OntologyError::NodeNotFound`] if the id cannot be resolved
    pub fn get_parents(&self, id: &str) -> OntologyResult<HashSet<String>> {
        let node = self.get_node(id)?;
        self.graph.get_parents(node.label())
    }

    pub(crate) fn ancestor_indices(&self, idx: NodeIndex) -> HashSet<NodeIndex> {
        self.graph.ancestor_indices(idx)
    }

    pub(crate) fn parent_indices(&self, idx: NodeIndex) -> HashSet<NodeIndex> {
        self.graph.parent_indices(idx)
    }

    /// Returns the canonical id of the node at the index
    pub fn label(&self, idx: NodeIndex) -> Option<&str> {
        self.graph.node(idx).map(Node::label)
    }

    /// Returns `is_a` followed by all declared relationship types
    pub fn get_relationship_types(&self) -> Vec<String> {
        std::iter::once(IS_A.to_string())
            .chain(self.typedefs.iter().cloned())
            .collect()
    }

    /// All cycles found while computing ancestors so far
    pub fn cycles(&self) -> Vec<Vec<String>> {
        self.graph.cycles()
    }

    /// Returns an ontology that only keeps edges of the given relationship types
    ///
    /// Synonyms are kept, typedefs only if they are part of the filter.
    pub fn trim<S: AsRef<str>>(&self, relation_filter: &[S]) -> OntologyGraph {
        OntologyGraph {
            graph: self.graph.trim(relation_filter),
            typedefs: self
                .typedefs
                .iter()
                .filter(|t| relation_filter.iter().any(|r| r.as_ref() == t.as_str()))
                .cloned()
                .collect(),
            synonyms: self.synonyms.clone(),
        }
    }

    /// Returns an ontology with only the given terms and the edges between them
    ///
    /// Synonyms pointing to removed terms are dropped.
    pub fn get_induced_subgraph<S: AsRef<str>>(&self, ids: &[S]) -> OntologyGraph {
        let graph = self.graph.get_induced_subgraph(ids);
        let synonyms = self
            .synonyms
            .iter()
            .filter_map(|(alias, idx)| {
                let label = self.graph.node_unchecked(*idx).label();
                graph.index_of(label).map(|new_idx| (alias.clone(), new_idx))
            })
            .collect();
        OntologyGraph {
            graph,
            typedefs: self.typedefs.clone(),
            synonyms,
        }
    }
}
