//! Resolvers map possibly ambiguous gene ids to canonical ids
//!
//! Gene lists often contain synonyms or deprecated identifiers. A resolver
//! is asked once for every id of a query and returns the id that is used
//! for the lookup in the association index.
use std::collections::{HashMap, HashSet};

use crate::GeneAnnotation;

/// Maps an external identifier to a canonical gene id
pub trait IdResolver {
    /// Returns the canonical id for `oid`, or `oid` itself
    fn resolve<'a>(&'a self, oid: &'a str) -> &'a str;
}

/// Returns every id unchanged
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityResolver;

impl IdResolver for IdentityResolver {
    fn resolve<'a>(&'a self, oid: &'a str) -> &'a str {
        oid
    }
}

/// Resolves synonyms to the first gene that lists them
///
/// Canonical ids always resolve to themselves. If a synonym belongs to
/// several genes, the gene that appeared first in the corpus wins. Unknown
/// ids are returned unchanged.
///
/// # Examples
///
/// ```
/// use goenrich::annotations::Attributes;
/// use goenrich::{FirstOneResolver, GeneAnnotation, IdResolver};
///
/// let mut attrs = Attributes::new();
/// attrs.insert("Synonym".to_string(), vec!["CT25100".to_string()]);
/// let genes = vec![GeneAnnotation::new("FBgn0004364", Vec::new(), attrs)];
///
/// let resolver = FirstOneResolver::new(&genes);
/// assert_eq!(resolver.resolve("CT25100"), "FBgn0004364");
/// assert_eq!(resolver.resolve("FBgn0010340"), "FBgn0010340");
/// ```
#[derive(Debug, Default, Clone)]
pub struct FirstOneResolver {
    base_keys: HashSet<String>,
    alter_keys: HashMap<String, String>,
}

impl FirstOneResolver {
    /// Indexes the synonyms of all genes
    pub fn new<'a, I: IntoIterator<Item = &'a GeneAnnotation>>(annotations: I) -> Self {
        let mut resolver = Self::default();
        for gene in annotations {
            resolver.base_keys.insert(gene.oid().to_string());
            for synonym in gene.synonyms() {
                resolver
                    .alter_keys
                    .entry(synonym.to_string())
                    .or_insert_with(|| gene.oid().to_string());
            }
        }
        resolver
    }
}

impl IdResolver for FirstOneResolver {
    fn resolve<'a>(&'a self, oid: &'a str) -> &'a str {
        if self.base_keys.contains(oid) {
            return oid;
        }
        self.alter_keys.get(oid).map_or(oid, String::as_str)
    }
}

/// Selects the resolver an enrichment finder builds from its annotations
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ResolverKind {
    /// [`IdentityResolver`]
    Identity,
    /// [`FirstOneResolver`]
    #[default]
    FirstOne,
}

impl ResolverKind {
    /// Builds the resolver for the given gene corpus
    pub fn build<'a, I: IntoIterator<Item = &'a GeneAnnotation>>(
        &self,
        annotations: I,
    ) -> Box<dyn IdResolver + Send + Sync> {
        match self {
            ResolverKind::Identity => Box::new(IdentityResolver),
            ResolverKind::FirstOne => Box::new(FirstOneResolver::new(annotations)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::annotations::Attributes;

    fn gene(oid: &str, synonyms: &[&str]) -> GeneAnnotation {
        let mut attrs = Attributes::new();
        if !synonyms.is_empty() {
            attrs.insert(
                "Synonym".to_string(),
                synonyms.iter().map(|s| s.to_string()).collect(),
            );
        }
        GeneAnnotation::new(oid, Vec::new(), attrs)
    }

    #[test]
    fn first_one_resolves() {
        let genes = vec![
            gene("FBgn0004364", &["18wheeler", "CG8896", "CT25100"]),
            gene("FBgn0043467", &[]),
            gene("FBgn0004907", &["14-3-3", "14-3-3 zeta", "x"]),
            gene("FBgn0010339", &["CG8340", "GTP-bp", "X71866", "x"]),
        ];
        let resolver = FirstOneResolver::new(&genes);
        let resolved: Vec<&str> = ["FBgn0043467", "CT25100", "x", "FBgn0010340"]
            .iter()
            .map(|id| resolver.resolve(*id))
            .collect();
        assert_eq!(
            resolved,
            vec!["FBgn0043467", "FBgn0004364", "FBgn0004907", "FBgn0010340"]
        );
    }

    #[test]
    fn canonical_id_wins_over_synonym() {
        let genes = vec![gene("A", &["B"]), gene("B", &[])];
        let resolver = FirstOneResolver::new(&genes);
        assert_eq!(resolver.resolve("B"), "B");
    }

    #[test]
    fn identity() {
        let genes = vec![gene("A", &["B"])];
        let resolver = ResolverKind::Identity.build(&genes);
        assert_eq!(resolver.resolve("B"), "B");

        let resolver = ResolverKind::default().build(&genes);
        assert_eq!(resolver.resolve("B"), "A");
    }
}
