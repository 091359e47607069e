//! Enrichment analysis of gene sets against an ontology
//!
//! [`EnrichmentFinder`] tests a study gene set against a population,
//! [`GseaEnrichmentFinder`] and [`RankedParentChildEnrichmentFinder`]
//! work on ranked gene lists. All of them return an [`Enrichment`].
//!
//! # Examples
//!
//! ```
//! use goenrich::annotations::Attributes;
//! use goenrich::ontology::record::{Fields, OboRecord};
//! use goenrich::{Correction, EnrichmentFinder, GeneAnnotation, Method, OntologyGraph, TermAssociation};
//!
//! fn term(id: &str, is_a: &[&str]) -> OboRecord {
//!     let mut fields = Fields::new();
//!     fields.insert("id".into(), vec![id.into()]);
//!     fields.insert("name".into(), vec![format!("term {id}")]);
//!     fields.insert("is_a".into(), is_a.iter().map(|s| s.to_string()).collect());
//!     OboRecord::from_parts("Term", fields).unwrap()
//! }
//!
//! fn gene(id: &str, term: &str) -> GeneAnnotation {
//!     let association = TermAssociation::new(term, Attributes::new());
//!     GeneAnnotation::new(id, vec![association], Attributes::new())
//! }
//!
//! let graph = OntologyGraph::from_records(vec![
//!     term("GO:A", &["GO:B"]),
//!     term("GO:B", &["GO:C"]),
//!     term("GO:C", &[]),
//! ]).unwrap();
//! let genes = vec![gene("gene1", "GO:A"), gene("gene2", "GO:C")];
//!
//! let finder = EnrichmentFinder::new(&genes, &graph).unwrap();
//! let result = finder
//!     .find_enrichment(&["gene1", "gene2"], &[Correction::Bonferroni], Method::TermByTerm)
//!     .unwrap();
//!
//! assert_eq!(result.entries().len(), 3);
//! assert!(result.warnings().is_empty());
//! ```
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use crate::stats::Correction;
use crate::OntologyError;

mod finder;
mod ranked;

pub use finder::EnrichmentFinder;
pub use ranked::{
    GseaEnrichmentFinder, GseaParams, PrefixSeries, RankedParentChildEnrichmentFinder, Side,
};

/// Aggregation strategy of the hypergeometric enrichment
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Every term is tested independently against the full population
    #[default]
    TermByTerm,
    /// Terms are tested against the genes of any of their parents
    ParentChildUnion,
    /// Terms are tested against the genes shared by all of their parents
    ParentChildIntersection,
}

impl Method {
    /// The name of the method as used in reports
    pub fn name(&self) -> &'static str {
        match self {
            Method::TermByTerm => "term_by_term",
            Method::ParentChildUnion => "parent_child_union",
            Method::ParentChildIntersection => "parent_child_intersection",
        }
    }
}

impl FromStr for Method {
    type Err = OntologyError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "term_by_term" | "term" => Ok(Method::TermByTerm),
            "parent_child_union" | "union" => Ok(Method::ParentChildUnion),
            "parent_child_intersection" | "intersection" => Ok(Method::ParentChildIntersection),
            _ => Err(OntologyError::UnknownMethod(s.to_string())),
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Value of an [`EnrichmentEntry`] attribute
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Number of genes
    Count(usize),
    /// A single score
    Number(f64),
    /// Values along a ranked gene list
    Series(Vec<f64>),
}

impl Display for AttrValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttrValue::Count(n) => write!(f, "{n}"),
            AttrValue::Number(x) => write!(f, "{x}"),
            AttrValue::Series(values) => {
                let values: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", values.join(", "))
            }
        }
    }
}

/// The enrichment result of a single term
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentEntry {
    oid: String,
    name: String,
    p_value: f64,
    corrections: BTreeMap<String, f64>,
    attrs: BTreeMap<String, AttrValue>,
}

impl EnrichmentEntry {
    /// Constructs an entry without corrections
    pub fn new(oid: &str, name: &str, p_value: f64, attrs: BTreeMap<String, AttrValue>) -> Self {
        Self {
            oid: oid.to_string(),
            name: name.to_string(),
            p_value,
            corrections: BTreeMap::new(),
            attrs,
        }
    }

    /// The id of the term
    pub fn oid(&self) -> &str {
        &self.oid
    }

    /// The name of the term
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The uncorrected p-value
    pub fn p_value(&self) -> f64 {
        self.p_value
    }

    /// Corrected p-values by correction name
    pub fn corrections(&self) -> &BTreeMap<String, f64> {
        &self.corrections
    }

    /// The corrected p-value of one correction method
    pub fn corrected(&self, correction: Correction) -> Option<f64> {
        self.corrections.get(correction.name()).copied()
    }

    /// Counts and scores for reporting
    pub fn attrs(&self) -> &BTreeMap<String, AttrValue> {
        &self.attrs
    }

    /// A single attribute
    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }
}

impl EnrichmentEntry {
    /// Writes the report line with the corrected p-values in the order of `names`
    fn write_line<'n, I: IntoIterator<Item = &'n String>>(
        &self,
        f: &mut std::fmt::Formatter<'_>,
        names: I,
    ) -> std::fmt::Result {
        let corrections: Vec<String> = names
            .into_iter()
            .map(|name| {
                self.corrections
                    .get(name)
                    .map_or_else(String::new, ToString::to_string)
            })
            .collect();
        let attrs: Vec<String> = self
            .attrs
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}",
            self.oid,
            self.name,
            self.p_value,
            corrections.join("|"),
            attrs.join(";")
        )
    }
}

impl Display for EnrichmentEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.write_line(f, self.corrections.keys())
    }
}

/// Enrichment results of one query
///
/// Entries are ordered by term id. Soft problems, e.g. substituted gene
/// ids or cycles in the ontology, are reported as warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    method: String,
    entries: Vec<EnrichmentEntry>,
    warnings: Vec<String>,
    corrections: Vec<String>,
}

impl Enrichment {
    /// Bundles the results of an enrichment run
    pub fn new(
        method: &str,
        entries: Vec<EnrichmentEntry>,
        warnings: Vec<String>,
        corrections: Vec<String>,
    ) -> Self {
        Self {
            method: method.to_string(),
            entries,
            warnings,
            corrections,
        }
    }

    /// Name of the enrichment method
    pub fn method(&self) -> &str {
        &self.method
    }

    /// All enriched terms
    pub fn entries(&self) -> &[EnrichmentEntry] {
        &self.entries
    }

    /// Non-fatal problems of the run
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Names of the applied corrections
    pub fn corrections(&self) -> &[String] {
        &self.corrections
    }

    /// Returns the entry of a term
    pub fn get(&self, oid: &str) -> Option<&EnrichmentEntry> {
        self.entries.iter().find(|entry| entry.oid == oid)
    }

    /// Returns a new `Enrichment` with only the entries matching `predicate`
    ///
    /// Method, warnings and corrections are kept.
    pub fn filter<F: Fn(&EnrichmentEntry) -> bool>(&self, predicate: F) -> Enrichment {
        Enrichment {
            method: self.method.clone(),
            entries: self
                .entries
                .iter()
                .filter(|entry| predicate(entry))
                .cloned()
                .collect(),
            warnings: self.warnings.clone(),
            corrections: self.corrections.clone(),
        }
    }

    /// Keeps the entries with a p-value of at most `threshold`
    pub fn filter_p_val(&self, threshold: f64) -> Enrichment {
        self.filter(|entry| entry.p_value <= threshold)
    }
}

impl Display for Enrichment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "# {}", self.method)?;
        writeln!(f, "# {} {}", self.entries.len(), self.warnings.len())?;
        writeln!(
            f,
            "id\tname\tp-value\t{}\tattributes",
            self.corrections.join("|")
        )?;
        for entry in &self.entries {
            entry.write_line(f, &self.corrections)?;
            writeln!(f)?;
        }
        for warning in &self.warnings {
            writeln!(f, "!\t{warning}")?;
        }
        Ok(())
    }
}

/// Adds the corrected p-values of all entries, in place
fn apply_corrections(entries: &mut [EnrichmentEntry], corrections: &[Correction]) {
    let pvals: Vec<f64> = entries.iter().map(EnrichmentEntry::p_value).collect();
    for correction in corrections {
        for (entry, corrected) in entries.iter_mut().zip(correction.apply(&pvals)) {
            entry
                .corrections
                .insert(correction.name().to_string(), corrected);
        }
    }
}

fn correction_names(corrections: &[Correction]) -> Vec<String> {
    corrections.iter().map(|c| c.name().to_string()).collect()
}
