use crate::consts::NAME_SEPARATOR;
use crate::normalize::{non_empty, normalize_whitespace};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// One author of a catalog record, as a `(last, first, middle)` triple.
///
/// The last name is always present; a catalog entry that only carries a first
/// name has it moved into the last-name slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthorName {
    pub last: String,
    pub first: Option<String>,
    pub middle: Option<String>,
}
impl AuthorName {
    pub fn new<F: Into<String>, M: Into<String>>(last: impl Into<String>, first: Option<F>, middle: Option<M>) -> Self {
        Self {
            last: last.into(),
            first: first.map(Into::into),
            middle: middle.map(Into::into),
        }
    }

    /// Parse a single `last,first,middle` catalog entry.
    ///
    /// Returns `None` when the entry carries no name at all (`",,"`).
    pub(crate) fn parse(entry: &str) -> Option<Self> {
        let mut parts = entry.split(NAME_SEPARATOR).map(normalize_whitespace).map(non_empty);
        let last = parts.next().flatten();
        let first = parts.next().flatten();
        let middle = parts.next().flatten();
        match (last, first, middle) {
            (Some(last), first, middle) => Some(Self { last, first, middle }),
            (None, Some(first), middle) => Some(Self { last: first, first: None, middle }),
            (None, None, Some(middle)) => Some(Self { last: middle, first: None, middle: None }),
            (None, None, None) => None,
        }
    }

    /// Stable identity of this author across imports.
    ///
    /// The catalog has no author ids, so the identity is the case-folded name
    /// triple in catalog notation (`last,first,middle`).
    pub fn external_id(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}",
            self.last,
            self.first.as_deref().unwrap_or_default(),
            self.middle.as_deref().unwrap_or_default(),
            sep = NAME_SEPARATOR,
        )
        .to_lowercase()
    }

    /// Name parts that are present, in `last, first, middle` order.
    pub fn parts(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.last.as_str()).chain(self.first.as_deref()).chain(self.middle.as_deref())
    }
}

impl Display for AuthorName {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut parts = self.parts();
        if let Some(last) = parts.next() {
            write!(f, "{last}")?;
        }
        for part in parts {
            write!(f, " {part}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Иванов,Алексей,Валерьевич", Some(AuthorName::new("Иванов", Some("Алексей"), Some("Валерьевич"))))]
    #[case("Мор,Томас,", Some(AuthorName::new("Мор", Some("Томас"), None::<String>)))]
    #[case("Гомер", Some(AuthorName::new("Гомер", None::<String>, None::<String>)))]
    #[case(",Аноним,", Some(AuthorName::new("Аноним", None::<String>, None::<String>)))]
    #[case("  Doe ,  John   Q ,", Some(AuthorName::new("Doe", Some("John Q"), None::<String>)))]
    #[case(",,", None)]
    #[case("", None)]
    fn test_parse(#[case] entry: &str, #[case] expected: Option<AuthorName>) {
        assert_eq!(AuthorName::parse(entry), expected);
    }

    #[test]
    fn test_external_id_is_case_folded() {
        let a = AuthorName::new("Иванов", Some("Алексей"), None::<String>);
        let b = AuthorName::new("ИВАНОВ", Some("алексей"), None::<String>);
        assert_eq!(a.external_id(), "иванов,алексей,");
        assert_eq!(a.external_id(), b.external_id());
    }

    #[test]
    fn test_display() {
        let author = AuthorName::new("Стругацкий", Some("Аркадий"), Some("Натанович"));
        assert_eq!(author.to_string(), "Стругацкий Аркадий Натанович");
        let author = AuthorName::new("Гомер", None::<String>, None::<String>);
        assert_eq!(author.to_string(), "Гомер");
    }
}
