//! Readers for ontology and gene association files
//!
//! - [`obo`] reads OBO ontology definitions into an [`crate::OntologyGraph`]
//! - [`gaf`] reads gene association files into [`crate::GeneAnnotation`]s
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::{OntologyError, OntologyResult};

pub mod gaf;
pub mod obo;

pub use gaf::{read_gaf, read_gaf_file};
pub use obo::{read_obo, read_obo_file, OboReader};

/// Opens a file for buffered reading
fn open<P: AsRef<Path>>(path: P) -> OntologyResult<BufReader<File>> {
    let filename = path.as_ref().display().to_string();
    let file = File::open(path).map_err(|_| OntologyError::CannotOpenFile(filename))?;
    Ok(BufReader::new(file))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn missing_file() {
        assert_eq!(
            open("does/not/exist.obo").err(),
            Some(OntologyError::CannotOpenFile("does/not/exist.obo".to_string()))
        );
    }
}
