use super::Predicate;
use crate::search::error::{ErrorKind, Result};
use exn::ResultExt;

/// A free-text query: whitespace-separated tokens, each of which must appear
/// somewhere in a matching book's searchable surface.
///
/// Tokens are lower-cased and duplicates collapse (first occurrence wins), so
/// neither token order nor repetition changes what a query matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    tokens: Vec<String>,
}
impl Query {
    pub fn parse(text: &str) -> Self {
        let mut tokens: Vec<String> = Vec::new();
        for token in text.split_whitespace().map(str::to_lowercase) {
            if !tokens.contains(&token) {
                tokens.push(token);
            }
        }
        Self { tokens }
    }

    /// Parse a query from raw bytes, such as an undecoded request parameter.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(raw).or_raise(|| ErrorKind::InvalidQuery)?;
        Ok(Self::parse(text))
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// A query without tokens matches every book.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn compile(&self) -> Predicate {
        Predicate::new(self.tokens.clone())
    }
}
impl From<&str> for Query {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", &[])]
    #[case("   \t\n ", &[])]
    #[case("Иванов Алексей", &["иванов", "алексей"])]
    #[case("  алексей   ИВАНОВ иванов ", &["алексей", "иванов"])]
    #[case("Мор", &["мор"])]
    fn test_parse(#[case] text: &str, #[case] expected: &[&str]) {
        assert_eq!(Query::parse(text).tokens(), expected);
    }

    #[test]
    fn test_from_bytes() {
        assert_eq!(Query::from_bytes("Пищеблок".as_bytes()).unwrap(), Query::parse("пищеблок"));
        let err = Query::from_bytes(&[0x66, 0xFF, 0x6F]).unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidQuery);
    }
}
