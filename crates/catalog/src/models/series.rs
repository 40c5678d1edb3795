/// A book series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Series {
    pub id: i64,
    pub external_id: String,
    pub name: String,
}

/// Stable identity of a series across imports: its case-folded,
/// whitespace-normalized name.
pub fn series_external_id(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}
