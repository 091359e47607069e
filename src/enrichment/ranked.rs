use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{thread_rng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

use crate::enrichment::finder::TermCounts;
use crate::enrichment::{
    apply_corrections, correction_names, AttrValue, Enrichment, EnrichmentEntry, EnrichmentFinder,
    Method,
};
use crate::graph::NodeIndex;
use crate::resolver::ResolverKind;
use crate::stats::{f64_from_usize, kolmogorov_smirnov_rank_test, Correction};
use crate::{GeneAnnotation, OntologyError, OntologyGraph, OntologyResult, DEFAULT_PERMUTATIONS};

/// Resolves the ids of a ranked list, the first occurrence of a gene wins
fn resolve_ranked<'q, S: AsRef<str>>(
    finder: &'q EnrichmentFinder,
    gene_rank: &'q [(S, f64)],
    warnings: &mut Vec<String>,
) -> Vec<(&'q str, f64)> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(gene_rank.len());
    gene_rank
        .iter()
        .filter_map(|(gene, score)| {
            let id = finder.resolve(gene.as_ref(), warnings);
            seen.insert(id).then_some((id, *score))
        })
        .collect()
}

/// Parameters of the permutation test of [`GseaEnrichmentFinder`]
///
/// # Examples
///
/// ```
/// use goenrich::GseaParams;
///
/// let params = GseaParams::default().perms_no(100).seed(42);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GseaParams {
    perms_no: usize,
    min_set_rank_intersection: usize,
    corr_power: f64,
    seed: Option<u64>,
}

impl Default for GseaParams {
    fn default() -> Self {
        Self {
            perms_no: DEFAULT_PERMUTATIONS,
            min_set_rank_intersection: 1,
            corr_power: 1.0,
            seed: None,
        }
    }
}

impl GseaParams {
    /// Number of random permutations
    #[must_use]
    pub fn perms_no(mut self, perms_no: usize) -> Self {
        self.perms_no = perms_no;
        self
    }

    /// Minimum number of annotated genes in the ranked list to test a term
    #[must_use]
    pub fn min_set_rank_intersection(mut self, min: usize) -> Self {
        self.min_set_rank_intersection = min;
        self
    }

    /// Exponent `p` of the running-sum weights `|score|^p`
    #[must_use]
    pub fn corr_power(mut self, power: f64) -> Self {
        self.corr_power = power;
        self
    }

    /// Seed of the permutations, makes the test reproducible
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Shuffles `order` for the `permutation`-th random sample
    fn permute<T>(&self, order: &mut [T], permutation: usize) {
        match self.seed {
            Some(seed) => {
                order.shuffle(&mut StdRng::seed_from_u64(seed.wrapping_add(permutation as u64)));
            }
            None => order.shuffle(&mut thread_rng()),
        }
    }
}

/// Gene set enrichment analysis of a ranked gene list
///
/// Every term is scored by the running-sum statistic of its genes along
/// the list, sorted by descending score. The p-value is the share of
/// random permutations of the gene order that score at least as extreme.
pub struct GseaEnrichmentFinder<'a> {
    finder: EnrichmentFinder<'a>,
}

impl<'a> GseaEnrichmentFinder<'a> {
    /// Indexes the annotations
    ///
    /// # Errors
    ///
    /// [`OntologyError::NodeNotFound`] if an association references a
    /// term that is not part of the ontology
    pub fn new(
        annotations: &'a [GeneAnnotation],
        graph: &'a OntologyGraph,
    ) -> OntologyResult<Self> {
        Ok(Self {
            finder: EnrichmentFinder::new(annotations, graph)?,
        })
    }

    /// Replaces the id resolver
    #[must_use]
    pub fn with_resolver(self, kind: ResolverKind) -> Self {
        Self {
            finder: self.finder.with_resolver(kind),
        }
    }

    /// Scores all terms of a ranked gene list
    ///
    /// # Errors
    ///
    /// - [`OntologyError::InvalidParameter`] if no permutations are requested
    /// - [`OntologyError::NodeNotFound`] if a term has no id in the ontology
    pub fn find_enrichment<S: AsRef<str>>(
        &self,
        gene_rank: &[(S, f64)],
        params: &GseaParams,
        corrections: &[Correction],
    ) -> OntologyResult<Enrichment> {
        if params.perms_no == 0 {
            return Err(OntologyError::InvalidParameter(
                "at least one permutation is required".to_string(),
            ));
        }
        let mut warnings = Vec::new();
        let mut ranked = resolve_ranked(&self.finder, gene_rank, &mut warnings);
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        let corr: Vec<f64> = ranked.iter().map(|(_, score)| *score).collect();

        let mut term_positions: HashMap<NodeIndex, HashSet<usize>> = HashMap::new();
        for (pos, (gene, _)) in ranked.iter().enumerate() {
            if let Some((_, terms)) = self.finder.gene_terms(gene) {
                for term in terms {
                    term_positions.entry(*term).or_default().insert(pos);
                }
            }
        }
        let order: Vec<usize> = (0..ranked.len()).collect();

        let mut entries: BTreeMap<&str, EnrichmentEntry> = BTreeMap::new();
        for (term, positions) in &term_positions {
            let hits = positions.len();
            if hits < params.min_set_rank_intersection {
                continue;
            }
            let (score, plot) =
                kolmogorov_smirnov_rank_test(positions, &order, &corr, params.corr_power);

            let extreme = (0..params.perms_no)
                .into_par_iter()
                .filter(|i| {
                    let mut permuted = order.clone();
                    params.permute(&mut permuted, *i);
                    let (random, _) = kolmogorov_smirnov_rank_test(
                        positions,
                        &permuted,
                        &corr,
                        params.corr_power,
                    );
                    if score >= 0.0 {
                        random >= score
                    } else {
                        random <= score
                    }
                })
                .count();
            let p_value = f64_from_usize(extreme) / f64_from_usize(params.perms_no);

            let (oid, name) = self.finder.term_name(*term)?;
            debug!("{}: score {} with {} hits, p = {}", oid, score, hits, p_value);

            let mut attrs = BTreeMap::new();
            attrs.insert("score".to_string(), AttrValue::Number(score));
            attrs.insert("plot".to_string(), AttrValue::Series(plot));
            attrs.insert("hits".to_string(), AttrValue::Count(hits));
            entries.insert(oid, EnrichmentEntry::new(oid, name, p_value, attrs));
        }

        let mut entries: Vec<EnrichmentEntry> = entries.into_values().collect();
        apply_corrections(&mut entries, corrections);
        self.finder.add_cycle_warning(&mut warnings);
        Ok(Enrichment::new(
            "gsea",
            entries,
            warnings,
            correction_names(corrections),
        ))
    }
}

/// The end of a ranked list that prefixes start from
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Lowest scores first
    #[default]
    Plus,
    /// Highest scores first
    Minus,
}

impl FromStr for Side {
    type Err = OntologyError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Side::Plus),
            "-" => Ok(Side::Minus),
            _ => Err(OntologyError::UnknownSide(s.to_string())),
        }
    }
}

/// Enrichment of a single term for every prefix of a ranked list
///
/// Position `i` holds the result for the first `i + 1` genes, `None` if the
/// term had no hit in that prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefixSeries {
    entries: Vec<Option<EnrichmentEntry>>,
}

impl PrefixSeries {
    fn new(len: usize) -> Self {
        Self {
            entries: vec![None; len],
        }
    }

    /// The entries of all prefixes
    pub fn entries(&self) -> &[Option<EnrichmentEntry>] {
        &self.entries
    }

    /// The entry of the prefix of the first `len` genes
    pub fn get(&self, len: usize) -> Option<&EnrichmentEntry> {
        self.entries.get(len.checked_sub(1)?)?.as_ref()
    }

    /// The prefix length with the lowest p-value and its entry
    ///
    /// The shortest prefix wins ties.
    pub fn best(&self) -> Option<(usize, &EnrichmentEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| Some((i + 1, entry.as_ref()?)))
            .fold(None, |best, (len, entry)| match best {
                Some((_, current)) if current.p_value() <= entry.p_value() => best,
                _ => Some((len, entry)),
            })
    }

    /// The p-value of every prefix, 1.0 where the term had no hit
    pub fn p_values(&self) -> Vec<f64> {
        self.entries
            .iter()
            .map(|entry| entry.as_ref().map_or(1.0, EnrichmentEntry::p_value))
            .collect()
    }
}

/// Enrichment of growing prefixes of a ranked gene list
///
/// The first `i` genes of the sorted list are used as study set, for every
/// `i`. Each term is reported with the lowest p-value of all prefixes.
pub struct RankedParentChildEnrichmentFinder<'a> {
    finder: EnrichmentFinder<'a>,
}

impl<'a> RankedParentChildEnrichmentFinder<'a> {
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
        Ok(Self {
            finder: EnrichmentFinder::new(annotations, graph)?,
        })
    }

    /// Uses the given genes as population instead of all annotated genes
    #[must_use]
    pub fn with_population<S: AsRef<str>>(self, population: &[S]) -> Self {
        Self {
            finder: self.finder.with_population(population),
        }
    }

    /// Replaces the id resolver
    #[must_use]
    pub fn with_resolver(self, kind: ResolverKind) -> Self {
        Self {
            finder: self.finder.with_resolver(kind),
        }
    }

    /// Finds the enriched terms of all prefixes of the ranked list
    ///
    /// Every term is reported with the prefix of the lowest p-value. The
    /// entry carries the attributes of that prefix plus `prefix`, its
    /// length, and `plot`, the p-values of all prefixes.
    /// With `rank_as_population` the genes of the ranked list form the
    /// population, otherwise the population of the finder is used.
    ///
    /// # Errors
    ///
    /// [`OntologyError::NodeNotFound`] if a term has no id in the ontology
    pub fn find_enrichment<S: AsRef<str>>(
        &self,
        gene_rank: &[(S, f64)],
        side: Side,
        corrections: &[Correction],
        rank_as_population: bool,
        method: Method,
    ) -> OntologyResult<Enrichment> {
        let mut warnings = Vec::new();
        let series = self.series(gene_rank, side, rank_as_population, method, &mut warnings)?;

        let mut entries: Vec<EnrichmentEntry> = series
            .values()
            .filter_map(|series| {
                let (prefix, best) = series.best()?;
                let mut attrs = best.attrs().clone();
                attrs.insert("plot".to_string(), AttrValue::Series(series.p_values()));
                attrs.insert("prefix".to_string(), AttrValue::Count(prefix));
                Some(EnrichmentEntry::new(best.oid(), best.name(), best.p_value(), attrs))
            })
            .collect();
        apply_corrections(&mut entries, corrections);
        self.finder.add_cycle_warning(&mut warnings);

        Ok(Enrichment::new(
            &format!("ranked {}", method.name()),
            entries,
            warnings,
            correction_names(corrections),
        ))
    }

    /// Returns the enrichment of every prefix of the ranked list per term id
    ///
    /// Takes the same arguments as [`Self::find_enrichment`] without the
    /// corrections. Substituted gene ids are only logged.
    ///
    /// # Errors
    ///
    /// [`OntologyError::NodeNotFound`] if a term has no id in the ontology
    pub fn find_prefix_series<S: AsRef<str>>(
        &self,
        gene_rank: &[(S, f64)],
        side: Side,
        rank_as_population: bool,
        method: Method,
    ) -> OntologyResult<BTreeMap<String, PrefixSeries>> {
        let mut warnings = Vec::new();
        let series = self.series(gene_rank, side, rank_as_population, method, &mut warnings)?;
        for warning in warnings {
            debug!("{}", warning);
        }
        Ok(series)
    }

    fn series<S: AsRef<str>>(
        &self,
        gene_rank: &[(S, f64)],
        side: Side,
        rank_as_population: bool,
        method: Method,
        warnings: &mut Vec<String>,
    ) -> OntologyResult<BTreeMap<String, PrefixSeries>> {
        let mut ranked = resolve_ranked(&self.finder, gene_rank, warnings);
        match side {
            Side::Plus => ranked.sort_by(|a, b| a.1.total_cmp(&b.1)),
            Side::Minus => ranked.sort_by(|a, b| b.1.total_cmp(&a.1)),
        }
        let genes: Vec<&str> = ranked.iter().map(|(gene, _)| *gene).collect();

        let rank_population: TermCounts;
        let population = if rank_as_population {
            rank_population = self.finder.count_genes(genes.iter().copied());
            &rank_population
        } else {
            self.finder.population_counts()
        };

        let mut study = TermCounts::new();
        let mut series: BTreeMap<String, PrefixSeries> = BTreeMap::new();
        for (i, gene) in genes.iter().enumerate() {
            if rank_as_population || self.finder.in_population(gene) {
                match self.finder.gene_terms(gene) {
                    Some((id, terms)) => study.add_gene(id, terms),
                    None => study.size += 1,
                }
            } else {
                debug!("Skipping {} which is not part of the population", gene);
            }

            for entry in self.finder.entries(&study, population, method)? {
                let key = entry.oid().to_string();
                series
                    .entry(key)
                    .or_insert_with(|| PrefixSeries::new(genes.len()))
                    .entries[i] = Some(entry);
            }
        }
        Ok(series)
    }
}
