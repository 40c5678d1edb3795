use flibook_catalog::Book;
use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;

/// Extension of cover images inside a cover archive.
const COVER_EXTENSION: &str = "jpg";

/// A file inside an archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Locator {
    pub archive: PathBuf,
    /// Entry name inside the archive.
    pub entry: String,
}

/// A search result, as presented to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookView {
    pub external_id: u64,
    pub title: String,
    /// `"Last First Middle"`, sorted.
    pub authors: Vec<String>,
    pub series: Option<String>,
    pub series_number: Option<u32>,
    /// `YYYY-MM-DD`.
    pub date: Option<String>,
    pub lang: Option<String>,
    pub deleted: bool,
    pub download: Option<Locator>,
    pub cover: Option<Locator>,
}

impl From<&Book> for BookView {
    fn from(book: &Book) -> Self {
        Self {
            external_id: book.external_id,
            title: book.title.clone(),
            authors: book.authors.iter().map(|a| a.display_name()).collect(),
            series: book.series.as_ref().map(|s| s.name.clone()),
            series_number: book.series_number,
            date: book.date.map(|d| d.to_string()),
            lang: book.lang.clone(),
            deleted: book.deleted,
            download: book
                .archives
                .book
                .clone()
                .map(|archive| Locator { archive, entry: book.file.file_name() }),
            cover: book
                .archives
                .cover
                .clone()
                .map(|archive| Locator { archive, entry: format!("{}.{COVER_EXTENSION}", book.external_id) }),
        }
    }
}

impl Display for BookView {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "[{}] {}", self.external_id, self.title)?;
        if !self.authors.is_empty() {
            write!(f, " - {}", self.authors.join(", "))?;
        }
        if let Some(series) = &self.series {
            match self.series_number {
                Some(number) => write!(f, " ({series} #{number})")?,
                None => write!(f, " ({series})")?,
            }
        }
        if self.deleted {
            write!(f, " [deleted]")?;
        }
        Ok(())
    }
}
