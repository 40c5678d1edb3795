use flibook_catalog::Book;

/// The text fields of a book that a query is matched against.
pub trait Surface {
    fn title(&self) -> &str;

    /// Every name part (last, first, middle) of every linked author.
    fn author_names(&self) -> Vec<&str>;
}

impl Surface for Book {
    fn title(&self) -> &str {
        &self.title
    }

    fn author_names(&self) -> Vec<&str> {
        self.authors.iter().flat_map(|a| a.name_parts()).collect()
    }
}

/// A compiled query.
///
/// A surface matches when every required token is a case-insensitive
/// substring of at least one of its fields. Different tokens may be satisfied
/// by different fields, and by different authors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    /// Lower-cased, deduplicated.
    tokens: Vec<String>,
}
impl Predicate {
    pub(crate) fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }

    pub fn matches<S: Surface + ?Sized>(&self, surface: &S) -> bool {
        if self.tokens.is_empty() {
            return true;
        }
        let fields: Vec<String> = std::iter::once(surface.title())
            .chain(surface.author_names())
            .map(str::to_lowercase)
            .collect();
        self.tokens.iter().all(|token| fields.iter().any(|field| field.contains(token.as_str())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::Query;
    use rstest::rstest;

    struct Fixture {
        title: &'static str,
        authors: Vec<&'static str>,
    }
    impl Surface for Fixture {
        fn title(&self) -> &str {
            self.title
        }

        fn author_names(&self) -> Vec<&str> {
            self.authors.clone()
        }
    }

    fn pishcheblok() -> Fixture {
        Fixture { title: "Пищеблок", authors: vec!["Иванов", "Алексей"] }
    }

    #[rstest]
    #[case("", true)]
    #[case("иванов алексей", true)]
    #[case("алексей иванов иванов", true)]
    #[case("ИВАНОВ", true)]
    #[case("блок", true)]
    #[case("пищеблок иван", true)]
    #[case("мор", false)]
    #[case("иванов томас", false)]
    fn test_matches(#[case] query: &str, #[case] expected: bool) {
        assert_eq!(Query::parse(query).compile().matches(&pishcheblok()), expected);
    }

    #[test]
    fn test_tokens_may_match_different_authors() {
        let strugatsky = Fixture {
            title: "Пикник на обочине",
            authors: vec!["Стругацкий", "Аркадий", "Стругацкий", "Борис"],
        };
        assert!(Query::parse("аркадий борис").compile().matches(&strugatsky));
    }

    #[test]
    fn test_book_without_authors_matches_on_title() {
        let anonymous = Fixture { title: "Слово о полку Игореве", authors: vec![] };
        assert!(Query::parse("игорев").compile().matches(&anonymous));
        assert!(!Query::parse("игорев неизвестен").compile().matches(&anonymous));
    }
}
