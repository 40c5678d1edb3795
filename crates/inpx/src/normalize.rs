//! Text clean-up shared by every field of a catalog record.

use crate::consts::LIST_SEPARATOR;

/// Trim, and collapse internal runs of whitespace to a single space.
pub(crate) fn normalize_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for word in s.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

pub(crate) fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

/// Normalized, non-empty value of a free-text field.
pub(crate) fn text(s: &str) -> Option<String> {
    non_empty(normalize_whitespace(s))
}

/// Split a `:`-separated list field, dropping empty items.
pub(crate) fn list(s: &str) -> Vec<String> {
    s.split(LIST_SEPARATOR).filter_map(text).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("  Пикник   на\tобочине ", "Пикник на обочине")]
    #[case("single", "single")]
    #[case("   ", "")]
    #[case("line\r\nbreak", "line break")]
    fn test_normalize_whitespace(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_whitespace(input), expected);
    }

    #[test]
    fn test_list() {
        assert_eq!(list("sf_social:sf:"), vec!["sf_social".to_string(), "sf".to_string()]);
        assert_eq!(list(":: :"), Vec::<String>::new());
    }
}
