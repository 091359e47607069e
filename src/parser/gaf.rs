//! Gene association files (GAF 1.0, 2.x)
//!
//! Tab separated, one association per row:
//!
//! ```text
//! DB  DB Object ID  DB Object Symbol  Qualifier  GO ID  DB:Reference  Evidence Code
//! With (or) From  Aspect  DB Object Name  DB Object Synonym  DB Object Type  Taxon
//! Date  Assigned By  Annotation Extension  Gene Product Form ID
//! ```
//!
//! The last two columns only exist since GAF 2.0.
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use tracing::debug;

use crate::annotations::Attributes;
use crate::parser::open;
use crate::{GeneAnnotation, OntologyError, OntologyResult, TermAssociation};

const VERSION_TAG: &str = "!gaf-version:";

/// Splits a `|` separated column
fn split_multi(value: &str) -> Vec<String> {
    if value.is_empty() {
        Vec::new()
    } else {
        value.split('|').map(str::to_string).collect()
    }
}

fn insert_multi(attrs: &mut Attributes, key: &str, value: &str) {
    let values = split_multi(value);
    if !values.is_empty() {
        attrs.insert(key.to_string(), values);
    }
}

fn insert_single(attrs: &mut Attributes, key: &str, value: &str) {
    if !value.is_empty() {
        attrs.insert(key.to_string(), vec![value.to_string()]);
    }
}

/// Builds the gene of all rows of one object id
fn gene_annotation(oid: &str, rows: &[Vec<&str>], extended: bool) -> GeneAnnotation {
    let first = &rows[0];
    let mut attrs = Attributes::new();
    insert_single(&mut attrs, "DB", first[0]);
    insert_single(&mut attrs, "DB Object Symbol", first[2]);
    insert_single(&mut attrs, "DB Object Name", first[9]);
    insert_multi(&mut attrs, "DB Object Synonym", first[10]);
    insert_single(&mut attrs, "DB Object Type", first[11]);
    insert_multi(&mut attrs, "Taxon", first[12]);
    if extended {
        insert_multi(&mut attrs, "Annotation Extension", first[15]);
        insert_single(&mut attrs, "Gene Product Form ID", first[16]);
    }

    let associations = rows
        .iter()
        .map(|row| {
            let mut assoc = Attributes::new();
            insert_multi(&mut assoc, "Qualifier", row[3]);
            insert_multi(&mut assoc, "DB:Reference", row[5]);
            insert_single(&mut assoc, "Evidence Code", row[6]);
            insert_multi(&mut assoc, "With (or) From", row[7]);
            insert_single(&mut assoc, "Aspect", row[8]);
            insert_single(&mut assoc, "Date", row[13]);
            insert_single(&mut assoc, "Assigned By", row[14]);
            TermAssociation::new(row[4], assoc)
        })
        .collect();

    GeneAnnotation::new(oid, associations, attrs)
}

fn parse<R: BufRead>(reader: R) -> OntologyResult<Vec<GeneAnnotation>> {
    let lines = reader
        .lines()
        .collect::<Result<Vec<String>, _>>()
        .map_err(|err| OntologyError::InvalidInput(err.to_string()))?;

    let mut version: Option<&str> = None;
    let mut order: Vec<&str> = Vec::new();
    let mut objects: HashMap<&str, Vec<Vec<&str>>> = HashMap::new();

    for line in &lines {
        let line = line.trim_end_matches(['\r', '\n']);
        if let Some(v) = line.strip_prefix(VERSION_TAG) {
            version = Some(v.trim());
            continue;
        }
        if line.starts_with('!') || line.is_empty() {
            continue;
        }
        let row: Vec<&str> = line.split('\t').collect();
        let Some(oid) = row.get(1).copied() else {
            return Err(OntologyError::InvalidInput(format!(
                "Invalid gaf file: Incorrect row length: {line}"
            )));
        };
        objects
            .entry(oid)
            .or_insert_with(|| {
                order.push(oid);
                Vec::new()
            })
            .push(row);
    }

    let Some(version) = version else {
        return Err(OntologyError::InvalidInput(
            "Invalid gaf file: No version specified".to_string(),
        ));
    };
    let extended = version != "1.0";
    let row_len = if extended { 17 } else { 15 };
    debug!("Parsing GAF {} with {} objects", version, order.len());

    order
        .into_iter()
        .map(|oid| {
            let rows = &objects[oid];
            if let Some(bad) = rows.iter().find(|row| row.len() != row_len) {
                return Err(OntologyError::InvalidInput(format!(
                    "Invalid gaf file: Incorrect row length: {}",
                    bad.join("\t")
                )));
            }
            Ok(gene_annotation(oid, rows, extended))
        })
        .collect()
}

/// Reads all genes and their associations from GAF text
///
/// Rows are grouped by their object id, in order of first appearance.
///
/// # Errors
///
/// [`OntologyError::InvalidInput`] if the `!gaf-version` header is missing
/// or a row has the wrong number of columns
///
/// # Examples
///
/// ```
/// let gaf = "!gaf-version: 1.0\n\
///     FB\tFBgn0043467\t064Ya\t\tGO:0048149\tFB:FBrf0131396\tIMP\t\tP\t064Ya\t\tgene_product\ttaxon:7227\t20060803\tFlyBase\n";
/// let genes = goenrich::parser::read_gaf(gaf).unwrap();
/// assert_eq!(genes[0].oid(), "FBgn0043467");
/// assert_eq!(genes[0].term_ids().collect::<Vec<_>>(), vec!["GO:0048149"]);
/// ```
pub fn read_gaf(text: &str) -> OntologyResult<Vec<GeneAnnotation>> {
    parse(text.as_bytes())
}

/// Reads all genes and their associations from a GAF file
///
/// # Errors
///
/// - [`OntologyError::CannotOpenFile`] if the file cannot be read
/// - all errors of [`read_gaf`]
pub fn read_gaf_file<P: AsRef<Path>>(path: P) -> OntologyResult<Vec<GeneAnnotation>> {
    parse(open(path)?)
}

#[cfg(test)]
mod test {
    use super::*;

    const GAF_20: &str = "!gaf-version: 2.0
!comment
FB\tFBgn0026615\t10-4\t\tGO:0005737\tFB:FBrf0106275\tIDA\t\tC\t10-4\t\tgene_product\ttaxon:7227\t20060803\tFlyBase\t\t
FB\tFBgn0043467\t064Ya\t\tGO:0048149\tFB:FBrf0131396|PMID:11086999\tIMP\t\tP\t064Ya\tCG1|CG2\tgene_product\ttaxon:7227\t20060803\tFlyBase\t\t
FB\tFBgn0026615\t10-4\tNOT\tGO:0045177\tFB:FBrf0106275\tIDA\t\tC\t10-4\t\tgene_product\ttaxon:7227\t20060803\tFlyBase\t\t
";

    #[test]
    fn groups_rows_by_object() {
        let genes = read_gaf(GAF_20).unwrap();
        let ids: Vec<&str> = genes.iter().map(GeneAnnotation::oid).collect();
        assert_eq!(ids, vec!["FBgn0026615", "FBgn0043467"]);

        let first = &genes[0];
        assert_eq!(
            first.term_ids().collect::<Vec<_>>(),
            vec!["GO:0005737", "GO:0045177"]
        );
        assert_eq!(first.attrs()["DB Object Symbol"], vec!["10-4"]);
        assert_eq!(first.attrs()["Taxon"], vec!["taxon:7227"]);
        assert!(!first.attrs().contains_key("Gene Product Form ID"));
        assert_eq!(first.associations()[1].attrs()["Qualifier"], vec!["NOT"]);
    }

    #[test]
    fn multi_valued_columns() {
        let genes = read_gaf(GAF_20).unwrap();
        let second = &genes[1];
        assert_eq!(second.synonyms().collect::<Vec<_>>(), vec!["CG1", "CG2"]);
        let assoc = &second.associations()[0];
        assert_eq!(
            assoc.attrs()["DB:Reference"],
            vec!["FB:FBrf0131396", "PMID:11086999"]
        );
        assert_eq!(assoc.attrs()["Evidence Code"], vec!["IMP"]);
        assert_eq!(assoc.attrs()["Assigned By"], vec!["FlyBase"]);
    }

    #[test]
    fn no_version() {
        let gaf = GAF_20.replace("!gaf-version: 2.0\n", "");
        assert!(matches!(read_gaf(&gaf), Err(OntologyError::InvalidInput(_))));
    }

    #[test]
    fn wrong_row_length() {
        let gaf = GAF_20.replace("!gaf-version: 2.0", "!gaf-version: 1.0");
        assert!(matches!(read_gaf(&gaf), Err(OntologyError::InvalidInput(_))));

        let short = "!gaf-version: 2.0\nFB\n";
        assert!(matches!(read_gaf(short), Err(OntologyError::InvalidInput(_))));
    }
}
