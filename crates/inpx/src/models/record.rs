use super::AuthorName;
use crate::consts::{LIST_SEPARATOR, field};
use crate::error::{ErrorKind, Result};
use crate::normalize::{list, text};
use crate::structure::{Fields, Structure};
use exn::{OptionExt, ResultExt};
use time::Date;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use tracing::instrument;

const DATE_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");
/// Extension assumed for records that leave `EXT` empty.
const DEFAULT_EXTENSION: &str = "fb2";
/// Catalogs store `LIBID` as a signed 64-bit integer.
const MAX_LIB_ID: u64 = i64::MAX as u64;

/// One normalized book record from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Library ID (`LIBID`), the book's stable identity.
    pub lib_id: u64,
    pub title: String,
    /// Authors in catalog order (may be empty).
    pub authors: Vec<AuthorName>,
    pub genres: Vec<String>,
    pub series: Option<String>,
    /// Position within the series (`SERNO`), when known and non-zero.
    pub series_number: Option<u32>,
    /// File name inside the book archive, without extension.
    pub file: String,
    pub ext: String,
    pub size: Option<u64>,
    pub deleted: bool,
    pub date: Option<Date>,
    pub lang: Option<String>,
    pub keywords: Vec<String>,
    /// Archive the catalog claims the file lives in (`FOLDER`).
    pub folder: Option<String>,
}
impl Record {
    /// Parse one raw catalog line according to `structure`.
    ///
    /// # Errors
    ///
    /// - [`Encoding`](ErrorKind::Encoding) if the line is not UTF-8,
    /// - [`MissingField`](ErrorKind::MissingField) if `LIBID` or `TITLE` is empty,
    /// - [`InvalidField`](ErrorKind::InvalidField) if `LIBID` or `DATE` cannot be parsed.
    #[instrument(level = "trace", skip_all, fields(len = line.len()))]
    pub fn parse(line: &[u8], structure: &Structure) -> Result<Self> {
        let line = std::str::from_utf8(line).or_raise(|| ErrorKind::Encoding)?;
        let line = line.trim_end_matches(['\r', '\n']);
        let fields = structure.split(line);
        let lib_id = lib_id(&fields)?;
        Ok(Self {
            lib_id,
            title: text(fields.get(field::TITLE)).ok_or_raise(|| ErrorKind::MissingField("TITLE"))?,
            authors: authors(fields.get(field::AUTHOR)),
            genres: list(fields.get(field::GENRE)),
            series: text(fields.get(field::SERIES)),
            series_number: lenient_number::<u32>(fields.get(field::SERNO)).filter(|n| *n > 0),
            file: text(fields.get(field::FILE)).unwrap_or_else(|| lib_id.to_string()),
            ext: text(fields.get(field::EXT)).unwrap_or_else(|| DEFAULT_EXTENSION.to_string()),
            size: lenient_number::<i64>(fields.get(field::SIZE)).and_then(|n| u64::try_from(n).ok()),
            deleted: fields.get(field::DEL).trim() == "1",
            date: date(fields.get(field::DATE))?,
            lang: text(fields.get(field::LANG)),
            keywords: list(fields.get(field::KEYWORDS)),
            folder: text(fields.get(field::FOLDER)),
        })
    }

    /// File name inside the book archive (`<file>.<ext>`).
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.file, self.ext)
    }
}

fn lib_id(fields: &Fields) -> Result<u64> {
    let value = fields.get(field::LIBID).trim();
    if value.is_empty() {
        exn::bail!(ErrorKind::MissingField("LIBID"));
    }
    value
        .parse::<u64>()
        .ok()
        .filter(|id| *id <= MAX_LIB_ID)
        .ok_or_raise(|| ErrorKind::InvalidField { field: "LIBID", value: value.to_string() })
}

fn date(value: &str) -> Result<Option<Date>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    Date::parse(value, DATE_FORMAT)
        .map(Some)
        .or_raise(|| ErrorKind::InvalidField { field: "DATE", value: value.to_string() })
}

/// Numbers the catalog is known to get wrong (`SERNO`, `SIZE`) are dropped
/// rather than failing the whole record.
fn lenient_number<N: std::str::FromStr>(value: &str) -> Option<N> {
    let value = value.trim();
    match value.parse::<N>() {
        Ok(n) => Some(n),
        Err(_) if value.is_empty() => None,
        Err(_) => {
            tracing::trace!(value, "ignoring unparseable number");
            None
        },
    }
}

fn authors(value: &str) -> Vec<AuthorName> {
    let mut authors: Vec<AuthorName> = Vec::new();
    for author in value.split(LIST_SEPARATOR).filter_map(AuthorName::parse) {
        if !authors.iter().any(|a| a.external_id() == author.external_id()) {
            authors.push(author);
        }
    }
    authors
}
