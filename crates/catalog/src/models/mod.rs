mod author;
mod book;
mod series;
mod surface;

pub use self::author::Author;
pub use self::book::{Archives, Book, BookFile, Counts, Upserted};
pub(crate) use self::book::{BookRow, StoredBookRow};
pub use self::series::{Series, series_external_id};
pub(crate) use self::surface::{BookAssembler, SurfaceRow};
