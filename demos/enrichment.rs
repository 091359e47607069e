//! Prints the enriched terms of a gene set
//!
//! Set `GOENRICH_LOG=debug` to see the log output of the analysis.
use std::process;

use log::LevelFilter;
use simple_logger::SimpleLogger;

use goenrich::parser::{read_gaf_file, read_obo_file};
use goenrich::{Correction, EnrichmentFinder, Method};

fn log_level() -> LevelFilter {
    std::env::var("GOENRICH_LOG")
        .ok()
        .and_then(|level| level.parse().ok())
        .unwrap_or(LevelFilter::Warn)
}

fn main() {
    SimpleLogger::new().with_level(log_level()).init().unwrap();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        println!("Show enriched ontology terms of a gene set\n\n");
        println!("Usage\nenrichment <OBO FILE> <GAF FILE> <GENE> [<GENE> ...]");
        println!("\nenrichment tests/data/go_test.obo tests/data/ga_test.gaf FBgn0043467 CT25100");
        println!("\nThe method can be set with GOENRICH_METHOD, e.g. `parent_child_union`\n");
        process::exit(1)
    }

    let graph = read_obo_file(&args[1]).unwrap_or_else(|err| {
        eprintln!("Unable to read ontology: {err}");
        process::exit(1)
    });
    let genes = read_gaf_file(&args[2]).unwrap_or_else(|err| {
        eprintln!("Unable to read annotations: {err}");
        process::exit(1)
    });

    let method: Method = std::env::var("GOENRICH_METHOD")
        .map(|method| method.parse().expect("invalid method"))
        .unwrap_or_default();

    let finder = EnrichmentFinder::new(&genes, &graph).unwrap();
    let result = finder
        .find_enrichment(
            &args[3..],
            &[Correction::Bonferroni, Correction::BhFdr],
            method,
        )
        .unwrap();

    print!("{result}");
    println!(
        "\nTerms: {}\nAnnotated genes: {}\nPopulation: {}",
        graph.len(),
        genes.len(),
        finder.population_size()
    );
}
