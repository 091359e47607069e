//! Structured stanzas of an ontology definition
//!
//! A parser produces `(kind, fields)` pairs, where `fields` maps every tag
//! to all of its values. [`OboRecord::from_parts`] turns them into typed
//! records that keep the well-known tags as fields and all other tags in
//! a residual map.
use std::collections::BTreeMap;

use tracing::trace;

use crate::{OntologyError, OntologyResult};

/// Multi-valued tag -> values map of a single stanza
pub type Fields = BTreeMap<String, Vec<String>>;

/// A single stanza of an ontology definition
#[derive(Debug, Clone, PartialEq)]
pub enum OboRecord {
    /// `[Term]` stanza
    Term(TermRecord),
    /// `[Typedef]` stanza, declares a relationship type
    Typedef(TypedefRecord),
    /// Any other stanza, e.g. `[Instance]`
    Other(String, Fields),
}

impl OboRecord {
    /// Builds a typed record from the stanza kind and its fields
    ///
    /// # Errors
    ///
    /// [`OntologyError::MissingField`] if a `Term` has no `id` or `name`
    /// or a `Typedef` has no `id`
    ///
    /// # Examples
    ///
    /// ```
    /// use goenrich::ontology::record::{Fields, OboRecord};
    ///
    /// let mut fields = Fields::new();
    /// fields.insert("id".to_string(), vec!["GO:0000001".to_string()]);
    /// fields.insert("name".to_string(), vec!["mitochondrion inheritance".to_string()]);
    /// fields.insert("is_a".to_string(), vec!["GO:0048308".to_string()]);
    ///
    /// match OboRecord::from_parts("Term", fields).unwrap() {
    ///     OboRecord::Term(term) => assert_eq!(term.is_a, vec!["GO:0048308"]),
    ///     _ => panic!("expected a term"),
    /// }
    /// ```
    pub fn from_parts(kind: &str, fields: Fields) -> OntologyResult<Self> {
        match kind {
            "Term" => Ok(Self::Term(TermRecord::try_from(fields)?)),
            "Typedef" => Ok(Self::Typedef(TypedefRecord::try_from(fields)?)),
            _ => {
                trace!("Keeping unknown stanza {} untyped", kind);
                Ok(Self::Other(kind.to_string(), fields))
            }
        }
    }
}

/// A `[Term]` stanza
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermRecord {
    /// Unique id, e.g. `GO:0005634`
    pub id: String,
    /// Human readable name
    pub name: String,
    /// Parent terms in an `is_a` relationship
    pub is_a: Vec<String>,
    /// Other relationships, each formatted `<relation> <target-id>`
    pub relationship: Vec<String>,
    /// Synonyms of the term
    pub synonym: Vec<String>,
    /// Alternative ids of the term
    pub alt_id: Vec<String>,
    /// All remaining tags
    pub other: Fields,
}

impl TryFrom<Fields> for TermRecord {
    type Error = OntologyError;
    fn try_from(mut fields: Fields) -> OntologyResult<Self> {
        let id = pop_single(&mut fields, "id")?;
        let name = pop_single(&mut fields, "name")?;
        Ok(Self {
            id,
            name,
            is_a: fields.remove("is_a").unwrap_or_default(),
            relationship: fields.remove("relationship").unwrap_or_default(),
            synonym: fields.remove("synonym").unwrap_or_default(),
            alt_id: fields.remove("alt_id").unwrap_or_default(),
            other: fields,
        })
    }
}

impl TermRecord {
    /// Returns all tags as a multi-valued map, without `id` and `name`
    pub fn attributes(&self) -> Fields {
        let mut attrs = self.other.clone();
        for (tag, values) in [
            ("is_a", &self.is_a),
            ("relationship", &self.relationship),
            ("synonym", &self.synonym),
            ("alt_id", &self.alt_id),
        ] {
            if !values.is_empty() {
                attrs.insert(tag.to_string(), values.clone());
            }
        }
        attrs
    }

    /// Parent ids of the `is_a` tags
    ///
    /// Trailing qualifiers like `{source="..."}` are dropped.
    pub fn is_a_targets(&self) -> impl Iterator<Item = &str> {
        self.is_a
            .iter()
            .filter_map(|value| value.split_whitespace().next())
    }

    /// Parses every `relationship` value into `(relation, target)`
    ///
    /// # Errors
    ///
    /// [`OntologyError::MalformedRelationship`] if a value does not consist
    /// of exactly two tokens
    pub fn relationships(&self) -> OntologyResult<Vec<(&str, &str)>> {
        self.relationship
            .iter()
            .map(|value| {
                let tokens: Vec<&str> = value.split_whitespace().collect();
                match tokens.as_slice() {
                    [relation, target] => Ok((*relation, *target)),
                    _ => Err(OntologyError::MalformedRelationship(value.clone())),
                }
            })
            .collect()
    }

    /// The alias part of every `synonym` value and all `alt_id`s
    ///
    /// A quoted synonym (`"cell nucleus" EXACT []`) yields the quoted text,
    /// otherwise the first whitespace delimited token is used.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.synonym
            .iter()
            .filter_map(|value| synonym_alias(value))
            .chain(self.alt_id.iter().map(String::as_str))
    }
}

fn synonym_alias(value: &str) -> Option<&str> {
    let value = value.trim();
    match value.strip_prefix('"') {
        Some(quoted) => quoted.split('"').next().filter(|s| !s.is_empty()),
        None => value.split_whitespace().next(),
    }
}

/// A `[Typedef]` stanza
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypedefRecord {
    /// Relationship type, e.g. `part_of`
    pub id: String,
    /// Human readable name, if present
    pub name: Option<String>,
    /// All remaining tags
    pub other: Fields,
}

impl TryFrom<Fields> for TypedefRecord {
    type Error = OntologyError;
    fn try_from(mut fields: Fields) -> OntologyResult<Self> {
        let id = pop_single(&mut fields, "id")?;
        let name = fields
            .remove("name")
            .and_then(|names| names.into_iter().next());
        Ok(Self {
            id,
            name,
            other: fields,
        })
    }
}

fn pop_single(fields: &mut Fields, tag: &'static str) -> OntologyResult<String> {
    fields
        .remove(tag)
        .and_then(|values| values.into_iter().next())
        .ok_or(OntologyError::MissingField(tag))
}
