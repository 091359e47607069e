use std::collections::HashSet;

use goenrich::parser::{read_gaf_file, read_obo, read_obo_file};
use goenrich::{DiGraph, OntologyError, IS_A};

fn as_set(ids: &[&str]) -> HashSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[test]
fn read_test_ontology() {
    let graph = read_obo_file("tests/data/go_test.obo").unwrap();
    assert_eq!(graph.len(), 11);
    assert_eq!(graph.get_relationship_types(), vec!["is_a", "part_of"]);

    let term = graph.get_term("GO:0048149").unwrap();
    assert_eq!(term.name(), "behavioral response to ethanol");
    assert_eq!(
        term.attrs()["def"],
        vec!["\"Any process that results in a change in the behavior of an organism as a result of an ethanol stimulus.\" [GOC:jid]"]
    );
    assert_eq!(
        graph.get_ancestors("GO:0048149").unwrap(),
        as_set(&[
            "GO:0030534",
            "GO:0007610",
            "GO:0045471",
            "GO:0050896",
            "GO:0008150"
        ])
    );
    assert!(graph.cycles().is_empty());
}

#[test]
fn synonyms_and_alt_ids() {
    let graph = read_obo_file("tests/data/go_test.obo").unwrap();
    assert_eq!(graph.get_term("GO:0005738").unwrap().id(), "GO:0005737");
    assert_eq!(graph.get_term("behaviour").unwrap().id(), "GO:0007610");
    assert!(!graph.node_exists("GO:9999999"));
    assert_eq!(
        graph.get_ancestors("GO:9999999").err(),
        Some(OntologyError::NodeNotFound("GO:9999999".to_string()))
    );
}

#[test]
fn undefined_relations_are_listed_sorted() {
    let text = "[Term]\nid: GO:1\nname: a\nrelationship: regulates GO:2\n\
                relationship: part_of GO:3\n\n\
                [Term]\nid: GO:2\nname: b\nrelationship: has_part GO:3\n\n\
                [Term]\nid: GO:3\nname: c\nrelationship: regulates GO:1\n\n\
                [Typedef]\nid: part_of\nname: part of\n";
    assert_eq!(
        read_obo(text).unwrap_err(),
        OntologyError::UndefinedRelation(vec!["has_part".to_string(), "regulates".to_string()])
    );
}

#[test]
fn trim_to_is_a() {
    let graph = read_obo_file("tests/data/go_test.obo").unwrap();
    assert_eq!(
        graph.get_parents("GO:0005634").unwrap(),
        as_set(&["GO:0005575", "GO:0005622"])
    );

    let trimmed = graph.trim(&[IS_A]);
    assert_eq!(trimmed.get_relationship_types(), vec!["is_a"]);
    assert_eq!(
        trimmed.get_parents("GO:0005634").unwrap(),
        as_set(&["GO:0005575"])
    );
    // the original is unchanged
    assert_eq!(graph.get_parents("GO:0005634").unwrap().len(), 2);
}

#[test]
fn induced_subgraph() {
    let graph = read_obo_file("tests/data/go_test.obo").unwrap();
    let sub = graph.get_induced_subgraph(&["GO:0048149", "GO:0045471", "GO:0008150"]);
    assert_eq!(sub.len(), 3);
    assert_eq!(
        sub.get_ancestors("GO:0048149").unwrap(),
        as_set(&["GO:0045471"])
    );
}

#[test]
fn read_test_annotations() {
    let genes = read_gaf_file("tests/data/ga_test.gaf").unwrap();
    let ids: Vec<&str> = genes.iter().map(|g| g.oid()).collect();
    assert_eq!(
        ids,
        vec![
            "FBgn0026615",
            "FBgn0043467",
            "FBgn0004364",
            "FBgn0010339",
            "FBgn0004907",
            "FBgn0000008"
        ]
    );
    assert_eq!(genes[0].associations().len(), 2);
    assert_eq!(
        genes[2].synonyms().collect::<Vec<_>>(),
        vec!["18wheeler", "CT25100"]
    );
}

#[test]
fn missing_files() {
    assert_eq!(
        read_obo_file("tests/data/missing.obo").err(),
        Some(OntologyError::CannotOpenFile(
            "tests/data/missing.obo".to_string()
        ))
    );
    assert!(read_gaf_file("tests/data/missing.gaf").is_err());
}

#[test]
fn cyclic_graph() {
    let graph: DiGraph<()> = DiGraph::from_edges([
        ("1", "2"),
        ("2", "3"),
        ("3", "4"),
        ("3", "5"),
        ("5", "2"),
        ("5", "6"),
        ("6", "7"),
        ("6", "8"),
        ("2", "9"),
        ("9", "2"),
    ]);
    let ancestors = graph.get_ancestors("2").unwrap();
    for id in ["3", "4", "5", "6", "7", "8", "9"] {
        assert!(ancestors.contains(id));
    }
    let mut cycles = graph.cycles();
    cycles.sort();
    assert_eq!(
        cycles,
        vec![
            vec!["2".to_string(), "5".to_string(), "3".to_string()],
            vec!["2".to_string(), "9".to_string()]
        ]
    );
}
