//! Genes and their associations to ontology terms
//!
//! A [`GeneAnnotation`] is one gene (or gene product) with all of its
//! [`TermAssociation`]s, as produced by a gene association file reader.
//! The enrichment math only looks at the term ids; all other metadata
//! is carried along for reporting.
use std::collections::BTreeMap;
use std::fmt::Display;

/// Free-form, multi-valued attributes of annotations and associations
pub type Attributes = BTreeMap<String, Vec<String>>;

/// Attribute keys that hold alternative ids of a gene
pub static SYNONYM_KEYS: [&str; 2] = ["Synonym", "DB Object Synonym"];

/// The association of a gene with a single ontology term
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermAssociation {
    term_id: String,
    attrs: Attributes,
}

impl TermAssociation {
    /// Constructs a new association to the term
    pub fn new(term_id: &str, attrs: Attributes) -> Self {
        Self {
            term_id: term_id.to_string(),
            attrs,
        }
    }

    /// The id of the associated term, might be a synonym
    pub fn term_id(&self) -> &str {
        &self.term_id
    }

    /// Qualifier, evidence code etc.
    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }
}

impl Display for TermAssociation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "GO ID: {}", self.term_id)?;
        for (key, values) in &self.attrs {
            writeln!(f, "{}: {}", key, values.join("|"))?;
        }
        Ok(())
    }
}

/// A gene with all of its term associations
///
/// # Examples
///
/// ```
/// use goenrich::annotations::Attributes;
/// use goenrich::{GeneAnnotation, TermAssociation};
///
/// let mut attrs = Attributes::new();
/// attrs.insert("Synonym".to_string(), vec!["CG8896".to_string()]);
///
/// let gene = GeneAnnotation::new(
///     "FBgn0004364",
///     vec![TermAssociation::new("GO:0005737", Attributes::new())],
///     attrs,
/// );
///
/// assert_eq!(gene.oid(), "FBgn0004364");
/// assert_eq!(gene.synonyms().collect::<Vec<_>>(), vec!["CG8896"]);
/// assert_eq!(gene.term_ids().collect::<Vec<_>>(), vec!["GO:0005737"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneAnnotation {
    oid: String,
    associations: Vec<TermAssociation>,
    attrs: Attributes,
}

impl GeneAnnotation {
    /// Constructs a new annotated gene
    pub fn new(oid: &str, associations: Vec<TermAssociation>, attrs: Attributes) -> Self {
        Self {
            oid: oid.to_string(),
            associations,
            attrs,
        }
    }

    /// Constructs a gene without associations and attributes
    pub fn bare(oid: &str) -> Self {
        Self::new(oid, Vec::new(), Attributes::new())
    }

    /// The unique id of the gene
    pub fn oid(&self) -> &str {
        &self.oid
    }

    /// All term associations, in input order
    pub fn associations(&self) -> &[TermAssociation] {
        &self.associations
    }

    /// Adds another term association
    pub fn add_association(&mut self, association: TermAssociation) {
        self.associations.push(association);
    }

    /// Symbol, taxon, synonyms etc.
    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    /// Mutable access to the attributes
    pub fn attrs_mut(&mut self) -> &mut Attributes {
        &mut self.attrs
    }

    /// Iterates the ids of all associated terms
    pub fn term_ids(&self) -> impl Iterator<Item = &str> {
        self.associations.iter().map(TermAssociation::term_id)
    }

    /// Iterates all alternative ids of the gene
    pub fn synonyms(&self) -> impl Iterator<Item = &str> {
        SYNONYM_KEYS
            .iter()
            .filter_map(|key| self.attrs.get(*key))
            .flatten()
            .map(String::as_str)
    }
}

impl Display for GeneAnnotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "DB Object ID: {}", self.oid)?;
        for (key, values) in &self.attrs {
            writeln!(f, "{}: {}", key, values.join("|"))?;
        }
        if !self.associations.is_empty() {
            writeln!(f, "\nAssociations:")?;
            for association in &self.associations {
                writeln!(f, "{association}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn synonyms_from_both_keys() {
        let mut gene = GeneAnnotation::bare("FBgn1");
        gene.attrs_mut()
            .insert("Synonym".to_string(), vec!["a".to_string()]);
        gene.attrs_mut().insert(
            "DB Object Synonym".to_string(),
            vec!["b".to_string(), "c".to_string()],
        );
        assert_eq!(gene.synonyms().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn associations_keep_order() {
        let mut gene = GeneAnnotation::bare("FBgn1");
        gene.add_association(TermAssociation::new("GO:2", Attributes::new()));
        gene.add_association(TermAssociation::new("GO:1", Attributes::new()));
        assert_eq!(gene.term_ids().collect::<Vec<_>>(), vec!["GO:2", "GO:1"]);
    }

    #[test]
    fn display() {
        let mut attrs = Attributes::new();
        attrs.insert("Evidence Code".to_string(), vec!["IDA".to_string()]);
        let gene = GeneAnnotation::new(
            "FBgn1",
            vec![TermAssociation::new("GO:1", attrs)],
            Attributes::new(),
        );
        assert_eq!(
            gene.to_string(),
            "DB Object ID: FBgn1\n\nAssociations:\nGO ID: GO:1\nEvidence Code: IDA\n\n"
        );
    }
}
