use crate::consts::{DEFAULT_STRUCTURE, FIELD_SEPARATOR, field};
use crate::error::{Error, ErrorKind};
use std::str::FromStr;

/// Field layout of the catalog lines in a dump.
///
/// Dumps either ship a `structure.info` entry (`AUTHOR;GENRE;TITLE;...;`) or
/// use [`DEFAULT_STRUCTURE`]. Names are compared case-insensitively and stored
/// upper-case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Structure {
    fields: Vec<String>,
}
impl Structure {
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }

    /// Split a decoded catalog line into its fields, according to this layout.
    pub(crate) fn split<'a>(&'a self, line: &'a str) -> Fields<'a> {
        let values = line.split(char::from(FIELD_SEPARATOR)).collect();
        Fields { structure: self, values }
    }
}
impl Default for Structure {
    fn default() -> Self {
        // Safety: the default layout is a constant that names both required fields.
        DEFAULT_STRUCTURE.parse().expect("default structure is valid")
    }
}
impl FromStr for Structure {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<String> = s
            .trim()
            .split(';')
            .map(|f| f.trim().to_uppercase())
            .filter(|f| !f.is_empty())
            .collect();
        for required in [field::LIBID, field::TITLE] {
            if !fields.iter().any(|f| f == required) {
                exn::bail!(ErrorKind::InvalidStructure(format!("layout does not name {required}")));
            }
        }
        Ok(Self { fields })
    }
}

/// The fields of one catalog line, addressed by name.
pub(crate) struct Fields<'a> {
    structure: &'a Structure,
    values: Vec<&'a str>,
}
impl<'a> Fields<'a> {
    /// Raw value of the named field; empty when the layout doesn't name it or
    /// the line is too short.
    pub(crate) fn get(&self, name: &str) -> &'a str {
        self.structure.position(name).and_then(|i| self.values.get(i).copied()).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_structure() {
        let structure = Structure::default();
        assert_eq!(structure.fields().len(), 14);
        assert_eq!(structure.fields().first().map(String::as_str), Some("AUTHOR"));
        assert_eq!(structure.fields().last().map(String::as_str), Some("FOLDER"));
    }

    #[rstest]
    #[case("AUTHOR;GENRE;TITLE;SERIES;SERNO;FILE;SIZE;LIBID;DEL;EXT;DATE;", 11)]
    #[case("author;title;libid", 3)]
    #[case(" TITLE;;LIBID; \n", 2)]
    fn test_parse_structure(#[case] input: &str, #[case] expected: usize) {
        let structure: Structure = input.parse().unwrap();
        assert_eq!(structure.fields().len(), expected);
    }

    #[rstest]
    #[case("AUTHOR;TITLE;")]
    #[case("AUTHOR;LIBID;")]
    #[case("")]
    fn test_structure_requires_id_and_title(#[case] input: &str) {
        let err = input.parse::<Structure>().unwrap_err();
        assert!(matches!(*err, ErrorKind::InvalidStructure(_)));
    }

    #[test]
    fn test_short_lines_yield_empty_fields() {
        let structure: Structure = "TITLE;LIBID;DATE;".parse().unwrap();
        let fields = structure.split("Title\u{4}42");
        assert_eq!(fields.get("TITLE"), "Title");
        assert_eq!(fields.get("LIBID"), "42");
        assert_eq!(fields.get("DATE"), "");
        assert_eq!(fields.get("FOLDER"), "");
    }
}
