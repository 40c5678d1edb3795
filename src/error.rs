//! CLI Error Types

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Fix the config file, environment or flags.
    #[display("invalid configuration")]
    Config,
    #[display("could not open the catalog database")]
    Database,
    #[display("import failed")]
    Import,
    #[display("search failed")]
    Search,
    #[display("could not start the async runtime")]
    Runtime,
}
