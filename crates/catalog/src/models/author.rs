use std::cmp::Ordering;

/// An author as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: i64,
    pub external_id: String,
    pub last_name: String,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
}
impl Author {
    /// Present name parts, in `last, first, middle` order.
    pub fn name_parts(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.last_name.as_str()).chain(self.first_name.as_deref()).chain(self.middle_name.as_deref())
    }

    /// Display name, `"Last First Middle"` with missing parts left out.
    pub fn display_name(&self) -> String {
        self.name_parts().collect::<Vec<_>>().join(" ")
    }
}

impl Ord for Author {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.last_name, &self.first_name, &self.middle_name, self.id).cmp(&(
            &other.last_name,
            &other.first_name,
            &other.middle_name,
            other.id,
        ))
    }
}
impl PartialOrd for Author {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
