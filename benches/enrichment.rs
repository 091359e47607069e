use criterion::{black_box, criterion_group, criterion_main, Criterion};

use goenrich::annotations::Attributes;
use goenrich::parser::read_obo;
use goenrich::{
    Correction, EnrichmentFinder, GeneAnnotation, GseaEnrichmentFinder, GseaParams, Method,
    OntologyGraph, TermAssociation,
};

const LAYERS: usize = 8;
const WIDTH: usize = 50;
const GENES: usize = 2000;

fn layered_ontology() -> OntologyGraph {
    let mut obo = String::new();
    for layer in 0..LAYERS {
        for i in 0..WIDTH {
            obo.push_str(&format!("[Term]\nid: GO:{layer:03}{i:04}\nname: term {layer} {i}\n"));
            if layer > 0 {
                obo.push_str(&format!("is_a: GO:{:03}{i:04}\n", layer - 1));
                obo.push_str(&format!("is_a: GO:{:03}{:04}\n", layer - 1, (i * 7) % WIDTH));
            }
            obo.push('\n');
        }
    }
    read_obo(&obo).unwrap()
}

/// Every gene is annotated to two leaf terms
fn annotations() -> Vec<GeneAnnotation> {
    (0..GENES)
        .map(|g| {
            let associations = [g % WIDTH, (g * 13) % WIDTH]
                .iter()
                .map(|i| {
                    let term = format!("GO:{:03}{i:04}", LAYERS - 1);
                    TermAssociation::new(&term, Attributes::new())
                })
                .collect();
            GeneAnnotation::new(&format!("gene{g}"), associations, Attributes::new())
        })
        .collect()
}

fn enrichment_benchmark(c: &mut Criterion) {
    let graph = layered_ontology();
    let genes = annotations();
    let finder = EnrichmentFinder::new(&genes, &graph).unwrap();
    let study: Vec<String> = (0..200).map(|g| format!("gene{}", g * 3)).collect();
    let corrections = [Correction::Bonferroni, Correction::BhFdr];

    for method in [
        Method::TermByTerm,
        Method::ParentChildUnion,
        Method::ParentChildIntersection,
    ] {
        c.bench_function(&format!("enrichment {method}"), |b| {
            b.iter(|| {
                finder
                    .find_enrichment(black_box(&study), &corrections, method)
                    .unwrap()
                    .entries()
                    .len()
            })
        });
    }
}

fn gsea_benchmark(c: &mut Criterion) {
    let graph = layered_ontology();
    let genes = annotations();
    let finder = GseaEnrichmentFinder::new(&genes, &graph).unwrap();
    let ranking: Vec<(String, f64)> = (0..500)
        .map(|g| (format!("gene{g}"), 250.0 - g as f64))
        .collect();
    let params = GseaParams::default().perms_no(100).seed(1);

    let mut group = c.benchmark_group("gsea");
    group.sample_size(10);
    group.bench_function("gsea 100 permutations", |b| {
        b.iter(|| {
            finder
                .find_enrichment(black_box(&ranking), &params, &[])
                .unwrap()
                .entries()
                .len()
        })
    });
    group.finish();
}

criterion_group!(benches, enrichment_benchmark, gsea_benchmark);
criterion_main!(benches);
