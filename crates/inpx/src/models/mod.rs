mod author;
mod record;

pub use self::author::AuthorName;
pub use self::record::Record;
