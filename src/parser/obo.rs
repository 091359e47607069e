//! OBO ontology definitions
//!
//! ```text
//! format-version: 1.2
//!
//! [Term]
//! id: GO:0000001
//! name: mitochondrion inheritance
//! is_a: GO:0048308 ! organelle inheritance
//! relationship: part_of GO:0048311
//!
//! [Typedef]
//! id: part_of
//! name: part of
//! ```
use std::io::{BufRead, Lines};
use std::path::Path;

use tracing::trace;

use crate::ontology::record::{Fields, OboRecord};
use crate::parser::open;
use crate::{OntologyError, OntologyGraph, OntologyResult};

/// Iterates the `(kind, fields)` stanzas of an OBO document
///
/// Lines before the first stanza header are ignored. `!` starts a
/// comment, unless it is the first character of the line. A line ending
/// in `\` continues on the next line.
///
/// # Examples
///
/// ```
/// use goenrich::parser::OboReader;
///
/// let obo = "format-version: 1.2\n\n[Term]\nid: GO:1\nis_a: GO:2 ! parent\n";
/// let stanzas: Vec<_> = OboReader::new(obo.as_bytes())
///     .collect::<Result<_, _>>()
///     .unwrap();
///
/// let (kind, fields) = &stanzas[0];
/// assert_eq!(kind, "Term");
/// assert_eq!(fields["is_a"], vec!["GO:2"]);
/// ```
pub struct OboReader<R> {
    lines: Lines<R>,
    next_kind: Option<String>,
}

impl<R: BufRead> OboReader<R> {
    /// Creates a reader of the OBO document
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            next_kind: None,
        }
    }

    /// Reads one logical line, joining continued lines
    fn read_line(&mut self) -> Option<OntologyResult<String>> {
        let mut result = String::new();
        loop {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(err)) => return Some(Err(OntologyError::InvalidInput(err.to_string()))),
                None if result.is_empty() => return None,
                None => return Some(Ok(result)),
            };
            let line = strip_comment(line.trim_end_matches('\r'));
            match line.strip_suffix('\\') {
                Some(head) if !head.is_empty() => result.push_str(head),
                _ => {
                    result.push_str(line);
                    return Some(Ok(result));
                }
            }
        }
    }
}

impl<R: BufRead> Iterator for OboReader<R> {
    type Item = OntologyResult<(String, Fields)>;

    fn next(&mut self) -> Option<Self::Item> {
        let kind = match self.next_kind.take() {
            Some(kind) => kind,
            None => loop {
                match self.read_line()? {
                    Ok(line) => match stanza_kind(line.trim()) {
                        Some(kind) => break kind.to_string(),
                        None => trace!("Ignoring header line {}", line),
                    },
                    Err(err) => return Some(Err(err)),
                }
            },
        };

        let mut fields = Fields::new();
        while let Some(line) = self.read_line() {
            let line = match line {
                Ok(line) => line,
                Err(err) => return Some(Err(err)),
            };
            let line = line.trim();
            if let Some(next) = stanza_kind(line) {
                self.next_kind = Some(next.to_string());
                break;
            }
            if line.is_empty() {
                continue;
            }
            let Some((tag, value)) = line.split_once(':') else {
                return Some(Err(OntologyError::InvalidInput(format!(
                    "missing tag in line: {line}"
                ))));
            };
            fields
                .entry(tag.trim().to_string())
                .or_default()
                .push(value.trim().to_string());
        }
        Some(Ok((kind, fields)))
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('!') {
        Some(pos) if pos > 0 => &line[..pos],
        _ => line,
    }
}

/// Returns `Term` for `[Term]`
fn stanza_kind(line: &str) -> Option<&str> {
    line.strip_prefix('[')?
        .strip_suffix(']')
        .filter(|kind| !kind.is_empty() && kind.chars().all(|c| c.is_alphanumeric() || c == '_'))
}

fn build<R: BufRead>(reader: R) -> OntologyResult<OntologyGraph> {
    let records = OboReader::new(reader)
        .map(|stanza| stanza.and_then(|(kind, fields)| OboRecord::from_parts(&kind, fields)))
        .collect::<OntologyResult<Vec<OboRecord>>>()?;
    OntologyGraph::from_records(records)
}

/// Builds an [`OntologyGraph`] from OBO text
///
/// # Errors
///
/// - [`OntologyError::InvalidInput`] for lines without a tag
/// - all errors of [`OntologyGraph::from_records`]
///
/// # Examples
///
/// ```
/// let obo = "[Term]\nid: GO:1\nname: child\nis_a: GO:2\n\n[Term]\nid: GO:2\nname: parent\n";
/// let graph = goenrich::parser::read_obo(obo).unwrap();
/// assert_eq!(graph.len(), 2);
/// ```
pub fn read_obo(text: &str) -> OntologyResult<OntologyGraph> {
    build(text.as_bytes())
}

/// Builds an [`OntologyGraph`] from an OBO file
///
/// # Errors
///
/// - [`OntologyError::CannotOpenFile`] if the file cannot be read
/// - all errors of [`read_obo`]
pub fn read_obo_file<P: AsRef<Path>>(path: P) -> OntologyResult<OntologyGraph> {
    build(open(path)?)
}

#[cfg(test)]
mod test {
    use super::*;

    fn stanzas(text: &str) -> OntologyResult<Vec<(String, Fields)>> {
        OboReader::new(text.as_bytes()).collect()
    }

    fn fields(pairs: &[(&str, &[&str])]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    #[test]
    fn comments() {
        assert_eq!(strip_comment("plastic violets ! bloomed ! "), "plastic violets ");
        assert_eq!(strip_comment("! header comment"), "! header comment");
    }

    #[test]
    fn continued_lines() {
        let text = "Plastic violets \\\nbloomed for winter.! really \nRead Schopenhauer";
        let mut reader = OboReader::new(text.as_bytes());
        assert_eq!(reader.read_line().unwrap().unwrap(), "Plastic violets bloomed for winter.");
        assert_eq!(reader.read_line().unwrap().unwrap(), "Read Schopenhauer");
        assert!(reader.read_line().is_none());
    }

    #[test]
    fn missing_tag() {
        let text = "\n[Term]\nid : a\nis_a\n";
        assert!(matches!(stanzas(text), Err(OntologyError::InvalidInput(_))));
    }

    #[test]
    fn simple_terms() {
        let text = "
format-version: 1.2
data-version: 2013-05-04
saved-by: kamil

[Term]
id : a
is_a : b

[Typedef]
id: y
name: x

[Term]
id : b \\
aha
is_a : c
is_a : d

[Typedef]
id: x
name: y

";
        let expected = vec![
            ("Term".to_string(), fields(&[("id", &["a"]), ("is_a", &["b"])])),
            ("Typedef".to_string(), fields(&[("id", &["y"]), ("name", &["x"])])),
            (
                "Term".to_string(),
                fields(&[("id", &["b aha"]), ("is_a", &["c", "d"])]),
            ),
            ("Typedef".to_string(), fields(&[("id", &["x"]), ("name", &["y"])])),
        ];
        assert_eq!(stanzas(text).unwrap(), expected);
    }

    #[test]
    fn header_only() {
        assert!(stanzas("format-version: 1.2\n").unwrap().is_empty());
    }

    #[test]
    fn stanza_headers() {
        assert_eq!(stanza_kind("[Term]"), Some("Term"));
        assert_eq!(stanza_kind("[]"), None);
        assert_eq!(stanza_kind("[Te rm]"), None);
        assert_eq!(stanza_kind("Term"), None);
    }

    #[test]
    fn graph_from_text() {
        let text = "[Term]\nid: GO:1\nname: a\nrelationship: part_of GO:2\n\n\
                    [Term]\nid: GO:2\nname: b\n\n[Typedef]\nid: part_of\nname: part of\n";
        let graph = read_obo(text).unwrap();
        assert_eq!(graph.get_relationship_types(), vec!["is_a", "part_of"]);
        assert!(graph.get_parents("GO:1").unwrap().contains("GO:2"));
    }

    #[test]
    fn undefined_relation_in_text() {
        let text = "[Term]\nid: GO:1\nname: a\nrelationship: regulates GO:2\n";
        assert_eq!(
            read_obo(text).err(),
            Some(OntologyError::UndefinedRelation(vec!["regulates".to_string()]))
        );
    }
}
