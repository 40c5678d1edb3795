use super::{Author, Book, BookRow, Series};
use crate::error::{ErrorKind, Result};
use exn::OptionExt;

/// One row of "books LEFT JOIN series LEFT JOIN book_authors LEFT JOIN authors".
///
/// A book with several authors spans several consecutive rows; a book with no
/// authors has a single row with NULL author columns.
#[derive(sqlx::FromRow)]
pub(crate) struct SurfaceRow {
    pub(crate) id: i64,
    #[sqlx(flatten)]
    pub(crate) book: BookRow,
    pub(crate) series_external_id: Option<String>,
    pub(crate) series_name: Option<String>,
    pub(crate) author_id: Option<i64>,
    pub(crate) author_external_id: Option<String>,
    pub(crate) last_name: Option<String>,
    pub(crate) first_name: Option<String>,
    pub(crate) middle_name: Option<String>,
}
impl SurfaceRow {
    fn series(&mut self) -> Result<Option<Series>> {
        let Some(id) = self.book.series_id else {
            return Ok(None);
        };
        Ok(Some(Series {
            id,
            external_id: self.series_external_id.take().ok_or_raise(|| ErrorKind::InvalidData("series"))?,
            name: self.series_name.take().ok_or_raise(|| ErrorKind::InvalidData("series"))?,
        }))
    }

    fn author(&mut self) -> Result<Option<Author>> {
        let Some(id) = self.author_id else {
            return Ok(None);
        };
        Ok(Some(Author {
            id,
            external_id: self.author_external_id.take().ok_or_raise(|| ErrorKind::InvalidData("author"))?,
            last_name: self.last_name.take().ok_or_raise(|| ErrorKind::InvalidData("author"))?,
            first_name: self.first_name.take(),
            middle_name: self.middle_name.take(),
        }))
    }
}

/// Folds consecutive [`SurfaceRow`]s into [`Book`]s.
///
/// Rows must arrive grouped by book (which `ORDER BY b.title, b.external_id`
/// guarantees, external ids being unique).
#[derive(Default)]
pub(crate) struct BookAssembler {
    current: Option<Book>,
}
impl BookAssembler {
    /// Add a row; returns the previous book once a row for a different book arrives.
    pub(crate) fn push(&mut self, mut row: SurfaceRow) -> Result<Option<Book>> {
        let author = row.author()?;
        if let Some(book) = self.current.as_mut()
            && book.id == row.id
        {
            book.authors.extend(author);
            return Ok(None);
        }
        let series = row.series()?;
        let mut book = Book::try_from((row.id, row.book))?;
        book.series = series;
        book.authors.extend(author);
        Ok(self.current.replace(book).map(sorted))
    }

    /// The last book, if any rows were pushed.
    pub(crate) fn finish(self) -> Option<Book> {
        self.current.map(sorted)
    }
}

fn sorted(mut book: Book) -> Book {
    book.authors.sort();
    book.authors.dedup_by_key(|a| a.id);
    book
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, title: &str, author: Option<(i64, &str)>) -> SurfaceRow {
        SurfaceRow {
            id,
            book: BookRow {
                external_id: id * 10,
                title: title.to_string(),
                series_id: None,
                series_number: None,
                date: None,
                lang: None,
                file_name: (id * 10).to_string(),
                file_ext: "fb2".to_string(),
                folder: None,
                file_size: None,
                deleted: false,
                book_archive: None,
                cover_archive: None,
                images_archive: None,
            },
            series_external_id: None,
            series_name: None,
            author_id: author.map(|(id, _)| id),
            author_external_id: author.map(|(_, last)| format!("{},,", last.to_lowercase())),
            last_name: author.map(|(_, last)| last.to_string()),
            first_name: None,
            middle_name: None,
        }
    }

    #[test]
    fn test_groups_consecutive_rows() {
        let mut assembler = BookAssembler::default();
        assert_eq!(assembler.push(row(1, "Alpha", Some((5, "Roe")))).unwrap(), None);
        assert_eq!(assembler.push(row(1, "Alpha", Some((4, "Doe")))).unwrap(), None);
        let first = assembler.push(row(2, "Beta", None)).unwrap().unwrap();
        assert_eq!(first.external_id, 10);
        let names: Vec<&str> = first.authors.iter().map(|a| a.last_name.as_str()).collect();
        assert_eq!(names, vec!["Doe", "Roe"]);

        let last = assembler.finish().unwrap();
        assert_eq!(last.title, "Beta");
        assert!(last.authors.is_empty());
    }

    #[test]
    fn test_empty() {
        assert_eq!(BookAssembler::default().finish(), None);
    }

    #[test]
    fn test_partial_series_columns_are_rejected() {
        let mut broken = row(1, "Alpha", None);
        broken.book.series_id = Some(3);
        let err = BookAssembler::default().push(broken).unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidData("series"));
    }
}
