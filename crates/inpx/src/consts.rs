/// Separates fields within a single catalog line.
pub(crate) const FIELD_SEPARATOR: u8 = 0x04;
/// Separates items of list fields (`AUTHOR`, `GENRE`, `KEYWORDS`).
pub(crate) const LIST_SEPARATOR: char = ':';
/// Separates the name parts of a single author (`last,first,middle`).
pub(crate) const NAME_SEPARATOR: char = ',';

/// Field layout used when the dump does not ship a `structure.info` entry.
pub const DEFAULT_STRUCTURE: &str = "AUTHOR;GENRE;TITLE;SERIES;SERNO;FILE;SIZE;LIBID;DEL;EXT;DATE;LANG;KEYWORDS;FOLDER;";
/// Name of the optional field layout entry inside the dump.
pub(crate) const STRUCTURE_ENTRY: &str = "structure.info";
/// Extension of catalog entries inside the dump.
pub(crate) const CATALOG_EXTENSION: &str = ".inp";

pub(crate) mod field {
    pub(crate) const AUTHOR: &str = "AUTHOR";
    pub(crate) const GENRE: &str = "GENRE";
    pub(crate) const TITLE: &str = "TITLE";
    pub(crate) const SERIES: &str = "SERIES";
    pub(crate) const SERNO: &str = "SERNO";
    pub(crate) const FILE: &str = "FILE";
    pub(crate) const SIZE: &str = "SIZE";
    pub(crate) const LIBID: &str = "LIBID";
    pub(crate) const DEL: &str = "DEL";
    pub(crate) const EXT: &str = "EXT";
    pub(crate) const DATE: &str = "DATE";
    pub(crate) const LANG: &str = "LANG";
    pub(crate) const KEYWORDS: &str = "KEYWORDS";
    pub(crate) const FOLDER: &str = "FOLDER";
}
