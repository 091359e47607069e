use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, warn};

use crate::enrichment::{
    apply_corrections, correction_names, AttrValue, Enrichment, EnrichmentEntry, Method,
};
use crate::graph::NodeIndex;
use crate::resolver::{IdResolver, ResolverKind};
use crate::stats::{hypergeometric_test, Correction};
use crate::{GeneAnnotation, OntologyError, OntologyGraph, OntologyResult};

/// Genes per term, and the number of genes in the set
pub(crate) struct TermCounts<'g> {
    pub(crate) terms: HashMap<NodeIndex, HashSet<&'g str>>,
    pub(crate) size: usize,
}

impl<'g> TermCounts<'g> {
    pub(crate) fn new() -> Self {
        Self {
            terms: HashMap::new(),
            size: 0,
        }
    }

    /// Adds a gene with all of its terms, incl. ancestors
    pub(crate) fn add_gene<'t, I: IntoIterator<Item = &'t NodeIndex>>(
        &mut self,
        gene: &'g str,
        terms: I,
    ) {
        self.size += 1;
        for term in terms {
            self.terms.entry(*term).or_default().insert(gene);
        }
    }

    fn count(&self, term: NodeIndex) -> usize {
        self.terms.get(&term).map_or(0, HashSet::len)
    }

    /// Folds the gene sets of all `parents` by union or intersection
    fn parent_genes(&self, parents: &HashSet<NodeIndex>, method: Method) -> HashSet<&'g str> {
        let mut sets = parents
            .iter()
            .map(|parent| self.terms.get(parent).cloned().unwrap_or_default());
        let Some(first) = sets.next() else {
            return HashSet::new();
        };
        sets.fold(first, |acc, genes| match method {
            Method::ParentChildIntersection => acc.intersection(&genes).copied().collect(),
            _ => acc.union(&genes).copied().collect(),
        })
    }
}

/// Finds terms that are over-represented in a study gene set
///
/// The finder indexes all genes by id and computes the ancestor closure
/// of every gene's terms once. It can then be queried any number of
/// times with different study sets.
///
/// The population defaults to all annotated genes. Gene ids are resolved
/// with a [`crate::FirstOneResolver`] unless configured otherwise.
pub struct EnrichmentFinder<'a> {
    graph: &'a OntologyGraph,
    gene_terms: HashMap<&'a str, HashSet<NodeIndex>>,
    resolver: Box<dyn IdResolver + Send + Sync + 'a>,
    annotations: &'a [GeneAnnotation],
    explicit_population: Option<Vec<String>>,
    population: HashSet<String>,
    population_counts: TermCounts<'a>,
}

impl<'a> EnrichmentFinder<'a> {
    /// Indexes the annotations and pre-computes the population counts
    ///
    /// # Errors
    ///
    /// [`OntologyError::NodeNotFound`] if an association references a
    /// term that is not part of the ontology
    pub fn new(
        annotations: &'a [GeneAnnotation],
        graph: &'a OntologyGraph,
    ) -> OntologyResult<Self> {
        let mut gene_terms: HashMap<&'a str, HashSet<NodeIndex>> =
            HashMap::with_capacity(annotations.len());
        for gene in annotations {
            let closure = gene_terms.entry(gene.oid()).or_default();
            for term_id in gene.term_ids() {
                let idx = graph
                    .resolve(term_id)
                    .ok_or_else(|| OntologyError::NodeNotFound(term_id.to_string()))?;
                closure.insert(idx);
                closure.extend(graph.ancestor_indices(idx));
            }
        }
        debug!("Indexed {} annotated genes", gene_terms.len());
        if graph.graph().has_cycles() {
            warn!("Ontology contains cycles: {:?}", graph.cycles());
        }

        let mut finder = Self {
            graph,
            gene_terms,
            resolver: ResolverKind::default().build(annotations),
            annotations,
            explicit_population: None,
            population: HashSet::new(),
            population_counts: TermCounts::new(),
        };
        finder.index_population();
        Ok(finder)
    }

    /// Uses the given genes as population instead of all annotated genes
    ///
    /// The ids are resolved like the study genes.
    #[must_use]
    pub fn with_population<S: AsRef<str>>(mut self, population: &[S]) -> Self {
        self.explicit_population =
            Some(population.iter().map(|s| s.as_ref().to_string()).collect());
        self.index_population();
        self
    }

    /// Replaces the id resolver
    #[must_use]
    pub fn with_resolver(mut self, kind: ResolverKind) -> Self {
        self.resolver = kind.build(self.annotations);
        self.index_population();
        self
    }

    fn index_population(&mut self) {
        let population: HashSet<String> = match &self.explicit_population {
            Some(ids) => ids
                .iter()
                .map(|id| self.resolver.resolve(id).to_string())
                .collect(),
            None => self.gene_terms.keys().map(|id| id.to_string()).collect(),
        };

        let counts = self.count_genes(population.iter().map(String::as_str));
        debug!(
            "Population of {} genes covers {} terms",
            counts.size,
            counts.terms.len()
        );
        self.population = population;
        self.population_counts = counts;
    }

    /// The ontology
    pub fn graph(&self) -> &'a OntologyGraph {
        self.graph
    }

    /// Number of genes in the population
    pub fn population_size(&self) -> usize {
        self.population_counts.size
    }

    /// Resolves a gene id, noting a warning if it was substituted
    pub(crate) fn resolve<'q>(&'q self, given: &'q str, warnings: &mut Vec<String>) -> &'q str {
        let id = self.resolver.resolve(given);
        if id != given {
            warnings.push(format!("Unknown id: '{given}' was resolved to: '{id}'"));
        }
        id
    }

    /// Returns the canonical ids of the query in order, without duplicates,
    /// and a warning for every substituted id
    fn resolve_genes<'q, S: AsRef<str>>(
        &'q self,
        gene_list: &'q [S],
    ) -> (Vec<&'q str>, Vec<String>) {
        let mut seen: HashSet<&str> = HashSet::with_capacity(gene_list.len());
        let mut resolved = Vec::with_capacity(gene_list.len());
        let mut warnings = Vec::new();
        for given in gene_list {
            let id = self.resolve(given.as_ref(), &mut warnings);
            if seen.insert(id) {
                resolved.push(id);
            }
        }
        (resolved, warnings)
    }

    pub(crate) fn in_population(&self, gene: &str) -> bool {
        self.population.contains(gene)
    }

    /// The annotated gene id and the ancestor closure of its terms
    pub(crate) fn gene_terms(&self, gene: &str) -> Option<(&'a str, &HashSet<NodeIndex>)> {
        self.gene_terms
            .get_key_value(gene)
            .map(|(id, terms)| (*id, terms))
    }

    pub(crate) fn population_counts(&self) -> &TermCounts<'a> {
        &self.population_counts
    }

    /// Counts the terms of all genes
    ///
    /// Genes without annotations only count towards the set size.
    pub(crate) fn count_genes<'q, I: IntoIterator<Item = &'q str>>(
        &self,
        genes: I,
    ) -> TermCounts<'a> {
        let mut counts = TermCounts::new();
        for gene in genes {
            match self.gene_terms(gene) {
                Some((id, terms)) => counts.add_gene(id, terms),
                None => counts.size += 1,
            }
        }
        counts
    }

    /// Counts the terms of all genes that are part of the population
    fn counts_of(&self, genes: &[&str]) -> TermCounts<'a> {
        self.count_genes(genes.iter().copied().filter(|gene| {
            let known = self.in_population(gene);
            if !known {
                debug!("Skipping {} which is not part of the population", gene);
            }
            known
        }))
    }

    /// Finds the enriched terms of a study gene set
    ///
    /// # Errors
    ///
    /// [`OntologyError::NodeNotFound`] if an enriched term has no id in the
    /// ontology
    ///
    /// # Examples
    ///
    /// See [the module documentation](crate::enrichment)
    pub fn find_enrichment<S: AsRef<str>>(
        &self,
        gene_list: &[S],
        corrections: &[Correction],
        method: Method,
    ) -> OntologyResult<Enrichment> {
        let (study, mut warnings) = self.resolve_genes(gene_list);
        let study_counts = self.counts_of(&study);
        debug!(
            "Study set of {} genes covers {} terms",
            study_counts.size,
            study_counts.terms.len()
        );

        let mut entries = self.entries(&study_counts, &self.population_counts, method)?;
        apply_corrections(&mut entries, corrections);
        self.add_cycle_warning(&mut warnings);

        Ok(Enrichment::new(
            method.name(),
            entries,
            warnings,
            correction_names(corrections),
        ))
    }

    pub(crate) fn add_cycle_warning(&self, warnings: &mut Vec<String>) {
        let cycles = self.graph.cycles();
        if !cycles.is_empty() {
            warnings.push(format!("graph contains cycles: {cycles:?}"));
        }
    }

    pub(crate) fn term_name(&self, idx: NodeIndex) -> OntologyResult<(&'a str, &'a str)> {
        let oid = self
            .graph
            .label(idx)
            .ok_or_else(|| OntologyError::NodeNotFound(idx.to_string()))?;
        let name = self.graph.get_term(oid).map_or("", |term| term.name());
        Ok((oid, name))
    }

    /// Tests every term with at least one study gene, ordered by term id
    pub(crate) fn entries(
        &self,
        study: &TermCounts,
        population: &TermCounts,
        method: Method,
    ) -> OntologyResult<Vec<EnrichmentEntry>> {
        let mut entries: BTreeMap<&str, EnrichmentEntry> = BTreeMap::new();

        for (term, genes) in &study.terms {
            let study_count = genes.len();
            let population_count = population.count(*term);

            let (study_size, population_size) = match method {
                Method::TermByTerm => (study.size, population.size),
                Method::ParentChildUnion | Method::ParentChildIntersection => {
                    let parents = self.graph.parent_indices(*term);
                    if parents.is_empty() {
                        continue;
                    }
                    let study_size = study.parent_genes(&parents, method).len();
                    let population_size = population.parent_genes(&parents, method).len();
                    // every gene of a term is annotated to all of its parents
                    debug_assert!(
                        study_count <= study_size && population_count <= population_size,
                        "counts {study_count}/{population_count} exceed parent sets {study_size}/{population_size}"
                    );
                    (study_size, population_size)
                }
            };

            let p_value =
                hypergeometric_test(study_count, study_size, population_count, population_size);
            let (oid, name) = self.term_name(*term)?;
            debug!(
                "{}: {}/{} vs {}/{}, p = {}",
                oid, study_count, study_size, population_count, population_size, p_value
            );

            let mut attrs = BTreeMap::new();
            attrs.insert("study_count".to_string(), AttrValue::Count(study_count));
            attrs.insert("study_size".to_string(), AttrValue::Count(study_size));
            attrs.insert("population_count".to_string(), AttrValue::Count(population_count));
            attrs.insert("population_size".to_string(), AttrValue::Count(population_size));
            entries.insert(oid, EnrichmentEntry::new(oid, name, p_value, attrs));
        }
        Ok(entries.into_values().collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::annotations::Attributes;
    use crate::ontology::record::{Fields, OboRecord};
    use crate::TermAssociation;

    fn term(id: &str, is_a: &[&str]) -> OboRecord {
        let mut fields = Fields::new();
        fields.insert("id".to_string(), vec![id.to_string()]);
        fields.insert("name".to_string(), vec![format!("name of {id}")]);
        fields.insert("is_a".to_string(), is_a.iter().map(|s| s.to_string()).collect());
        OboRecord::from_parts("Term", fields).unwrap()
    }

    fn gene(id: &str, terms: &[&str], synonyms: &[&str]) -> GeneAnnotation {
        let mut attrs = Attributes::new();
        if !synonyms.is_empty() {
            attrs.insert(
                "Synonym".to_string(),
                synonyms.iter().map(|s| s.to_string()).collect(),
            );
        }
        let associations = terms
            .iter()
            .map(|t| TermAssociation::new(t, Attributes::new()))
            .collect();
        GeneAnnotation::new(id, associations, attrs)
    }

    fn chain() -> OntologyGraph {
        OntologyGraph::from_records(vec![term("A", &["B"]), term("B", &["C"]), term("C", &[])])
            .unwrap()
    }

    fn count(entry: &EnrichmentEntry, key: &str) -> usize {
        match entry.attr(key) {
            Some(AttrValue::Count(n)) => *n,
            other => panic!("unexpected {key}: {other:?}"),
        }
    }

    #[test]
    fn term_by_term_counts() {
        let graph = chain();
        let genes = vec![gene("gene1", &["A"], &[]), gene("gene2", &["C"], &[])];
        let finder = EnrichmentFinder::new(&genes, &graph)
            .unwrap()
            .with_population(&["gene1", "gene2"]);
        let result = finder
            .find_enrichment(&["gene1", "gene2"], &[], Method::TermByTerm)
            .unwrap();

        assert_eq!(result.method(), "term_by_term");
        let ids: Vec<&str> = result.entries().iter().map(EnrichmentEntry::oid).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);

        for oid in ["A", "B"] {
            let entry = result.get(oid).unwrap();
            assert_eq!(count(entry, "study_count"), 1);
            assert_eq!(count(entry, "study_size"), 2);
            assert_eq!(count(entry, "population_count"), 1);
            assert_eq!(count(entry, "population_size"), 2);
        }
        let c = result.get("C").unwrap();
        assert_eq!(count(c, "study_count"), 2);
        assert_eq!(count(c, "population_count"), 2);
        assert!((c.p_value() - 1.0).abs() < f64::EPSILON);
        assert_eq!(c.name(), "name of C");
    }

    #[test]
    fn unknown_association_term() {
        let graph = chain();
        let genes = vec![gene("gene1", &["X"], &[])];
        assert_eq!(
            EnrichmentFinder::new(&genes, &graph).err(),
            Some(OntologyError::NodeNotFound("X".to_string()))
        );
    }

    #[test]
    fn unknown_genes_are_skipped() {
        let graph = chain();
        let genes = vec![gene("gene1", &["A"], &[]), gene("gene2", &["C"], &[])];
        let finder = EnrichmentFinder::new(&genes, &graph).unwrap();
        let result = finder
            .find_enrichment(&["gene1", "foo"], &[], Method::TermByTerm)
            .unwrap();
        let a = result.get("A").unwrap();
        assert_eq!(count(a, "study_size"), 1);
        assert!(result.warnings().is_empty());
    }

    #[test]
    fn synonyms_are_resolved() {
        let graph = chain();
        let genes = vec![gene("gene1", &["A"], &["g1"]), gene("gene2", &["C"], &[])];
        let finder = EnrichmentFinder::new(&genes, &graph).unwrap();

        let by_synonym = finder
            .find_enrichment(&["g1", "gene2"], &[], Method::TermByTerm)
            .unwrap();
        let canonical = finder
            .find_enrichment(&["gene1", "gene2"], &[], Method::TermByTerm)
            .unwrap();

        assert_eq!(
            by_synonym.warnings(),
            &["Unknown id: 'g1' was resolved to: 'gene1'".to_string()]
        );
        assert_eq!(by_synonym.entries(), canonical.entries());

        let identity = EnrichmentFinder::new(&genes, &graph)
            .unwrap()
            .with_resolver(ResolverKind::Identity);
        let result = identity
            .find_enrichment(&["g1", "gene2"], &[], Method::TermByTerm)
            .unwrap();
        assert!(result.warnings().is_empty());
        assert!(result.get("A").is_none());
    }

    #[test]
    fn parent_child_sizes() {
        // D is_a B, D is_a C, B is_a A, C is_a A
        let graph = OntologyGraph::from_records(vec![
            term("A", &[]),
            term("B", &["A"]),
            term("C", &["A"]),
            term("D", &["B", "C"]),
        ])
        .unwrap();
        let genes = vec![
            gene("g1", &["D"], &[]),
            gene("g2", &["B"], &[]),
            gene("g3", &["C"], &[]),
            gene("g4", &["A"], &[]),
        ];
        let finder = EnrichmentFinder::new(&genes, &graph).unwrap();
        let study = ["g1", "g2", "g3"];

        let union = finder
            .find_enrichment(&study, &[], Method::ParentChildUnion)
            .unwrap();
        assert_eq!(union.method(), "parent_child_union");
        assert!(union.get("A").is_none());
        let d = union.get("D").unwrap();
        assert_eq!(count(d, "study_size"), 3);
        assert_eq!(count(d, "population_size"), 3);
        let b = union.get("B").unwrap();
        assert_eq!(count(b, "study_size"), 3);
        assert_eq!(count(b, "population_size"), 4);

        let intersection = finder
            .find_enrichment(&study, &[], Method::ParentChildIntersection)
            .unwrap();
        let d = intersection.get("D").unwrap();
        assert_eq!(count(d, "study_size"), 1);
        assert_eq!(count(d, "population_size"), 1);
        assert!((d.p_value() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parent_sets_contain_term_genes() {
        let graph = OntologyGraph::from_records(vec![
            term("A", &["D"]),
            term("B", &["A"]),
            term("C", &["A"]),
            term("D", &["B", "C"]),
            term("E", &["D"]),
        ])
        .unwrap();
        let genes = vec![
            gene("g1", &["D"], &[]),
            gene("g2", &["B"], &[]),
            gene("g3", &["C", "E"], &[]),
            gene("g4", &["A"], &[]),
        ];
        let finder = EnrichmentFinder::new(&genes, &graph)
            .unwrap()
            .with_population(&["g1", "g3", "g4"]);

        for method in [Method::ParentChildUnion, Method::ParentChildIntersection] {
            let result = finder
                .find_enrichment(&["g1", "g2", "g3"], &[], method)
                .unwrap();
            assert_eq!(result.entries().len(), 5);
            for entry in result.entries() {
                assert!(count(entry, "study_count") <= count(entry, "study_size"));
                assert!(count(entry, "population_count") <= count(entry, "population_size"));
            }
            assert_eq!(result.warnings().len(), 1);
        }
    }

    #[test]
    fn corrections() {
        let graph = chain();
        let genes = vec![gene("gene1", &["A"], &[]), gene("gene2", &["C"], &[])];
        let finder = EnrichmentFinder::new(&genes, &graph).unwrap();
        let result = finder
            .find_enrichment(
                &["gene1"],
                &[Correction::Bonferroni, Correction::BhFdr],
                Method::TermByTerm,
            )
            .unwrap();
        assert_eq!(result.corrections(), &["bonferroni", "bh_fdr"]);
        for entry in result.entries() {
            assert_eq!(entry.corrections().len(), 2);
        }
    }

    #[test]
    fn cycles_are_reported() {
        let graph =
            OntologyGraph::from_records(vec![term("A", &["B"]), term("B", &["A"])]).unwrap();
        let genes = vec![gene("gene1", &["A"], &[])];
        let finder = EnrichmentFinder::new(&genes, &graph).unwrap();
        let result = finder
            .find_enrichment(&["gene1"], &[], Method::TermByTerm)
            .unwrap();
        assert_eq!(result.warnings().len(), 1);
        assert!(result.warnings()[0].starts_with("graph contains cycles"));
    }
}
