use super::{Author, Series};
use crate::error::{Error, ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use flibook_inpx::Record;
use std::path::{Path, PathBuf};
use time::{Date, UtcDateTime};

/// Archives holding a book's file, cover and illustrations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Archives {
    pub book: Option<PathBuf>,
    pub cover: Option<PathBuf>,
    pub images: Option<PathBuf>,
}

/// Where a book's file lives inside its archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookFile {
    /// File name without extension.
    pub name: String,
    pub ext: String,
    /// Archive named by the dump's `FOLDER` field.
    pub folder: Option<String>,
    pub size: Option<u64>,
}
impl BookFile {
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, self.ext)
    }
}

/// A fully joined book: its own columns, its series and its authors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: i64,
    /// `LIBID` from the dump.
    pub external_id: u64,
    pub title: String,
    pub series: Option<Series>,
    pub series_number: Option<u32>,
    pub date: Option<Date>,
    pub lang: Option<String>,
    pub file: BookFile,
    pub deleted: bool,
    pub archives: Archives,
    /// Sorted by last, first and middle name.
    pub authors: Vec<Author>,
}

/// Outcome of upserting a book by its external id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Inserted(i64),
    Updated(i64),
    /// A row with identical values already existed.
    Unchanged(i64),
}
impl Upserted {
    /// Surrogate id of the book row.
    pub fn id(&self) -> i64 {
        match self {
            Self::Inserted(id) | Self::Updated(id) | Self::Unchanged(id) => *id,
        }
    }
}

/// Number of rows in each catalog table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub books: u64,
    pub authors: u64,
    pub series: u64,
    /// Book to author associations.
    pub links: u64,
}

fn sqlx_hates_paths(path: Option<&Path>, what: &'static str) -> Result<Option<String>> {
    path.map(|p| p.to_str().map(str::to_string).ok_or_raise(|| ErrorKind::InvalidData(what))).transpose()
}

/// Column values of a `books` row, minus its surrogate id.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub(crate) struct BookRow {
    pub(crate) external_id: i64,
    pub(crate) title: String,
    pub(crate) series_id: Option<i64>,
    pub(crate) series_number: Option<i64>,
    pub(crate) date: Option<i64>,
    pub(crate) lang: Option<String>,
    pub(crate) file_name: String,
    pub(crate) file_ext: String,
    pub(crate) folder: Option<String>,
    pub(crate) file_size: Option<i64>,
    pub(crate) deleted: bool,
    pub(crate) book_archive: Option<String>,
    pub(crate) cover_archive: Option<String>,
    pub(crate) images_archive: Option<String>,
}
impl BookRow {
    pub(crate) fn new(record: &Record, series_id: Option<i64>, archives: &Archives) -> Result<Self> {
        Ok(Self {
            external_id: i64::try_from(record.lib_id).or_raise(|| ErrorKind::InvalidData("external id"))?,
            title: record.title.clone(),
            series_id,
            series_number: record.series_number.map(i64::from),
            date: record.date.map(|d| d.midnight().as_utc().unix_timestamp()),
            lang: record.lang.clone(),
            file_name: record.file.clone(),
            file_ext: record.ext.clone(),
            folder: record.folder.clone(),
            file_size: record.size.map(i64::try_from).transpose().or_raise(|| ErrorKind::InvalidData("file size"))?,
            deleted: record.deleted,
            book_archive: sqlx_hates_paths(archives.book.as_deref(), "book archive")?,
            cover_archive: sqlx_hates_paths(archives.cover.as_deref(), "cover archive")?,
            images_archive: sqlx_hates_paths(archives.images.as_deref(), "images archive")?,
        })
    }
}

/// An existing `books` row, looked up before deciding between insert and update.
#[derive(sqlx::FromRow)]
pub(crate) struct StoredBookRow {
    pub(crate) id: i64,
    #[sqlx(flatten)]
    pub(crate) book: BookRow,
}

impl TryFrom<(i64, BookRow)> for Book {
    type Error = Error;
    fn try_from(pair: (i64, BookRow)) -> Result<Self> {
        let (id, row) = pair;
        Ok(Self {
            id,
            external_id: u64::try_from(row.external_id).or_raise(|| ErrorKind::InvalidData("external id"))?,
            title: row.title,
            series: None,
            series_number: row
                .series_number
                .map(u32::try_from)
                .transpose()
                .or_raise(|| ErrorKind::InvalidData("series number"))?,
            date: row
                .date
                .map(|ts| UtcDateTime::from_unix_timestamp(ts).map(|dt| dt.date()))
                .transpose()
                .or_raise(|| ErrorKind::InvalidData("date"))?,
            lang: row.lang,
            file: BookFile {
                name: row.file_name,
                ext: row.file_ext,
                folder: row.folder,
                size: row.file_size.map(u64::try_from).transpose().or_raise(|| ErrorKind::InvalidData("file size"))?,
            },
            deleted: row.deleted,
            archives: Archives {
                book: row.book_archive.map(PathBuf::from),
                cover: row.cover_archive.map(PathBuf::from),
                images: row.images_archive.map(PathBuf::from),
            },
            authors: Vec::new(),
        })
    }
}
