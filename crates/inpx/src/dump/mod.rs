mod eocd;

use crate::consts::{CATALOG_EXTENSION, STRUCTURE_ENTRY};
use crate::error::{ErrorKind, Result};
use crate::models::Record;
use crate::structure::Structure;
use exn::ResultExt;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::instrument;
use zip::ZipArchive;
use zip::result::ZipError;

/// An opened INPX dump: a ZIP container of `.inp` catalog entries plus an
/// optional `structure.info` field layout.
pub struct Dump {
    archive: ZipArchive<Cursor<Vec<u8>>>,
    structure: Structure,
    /// Catalog entry names, in archive order.
    entries: Vec<String>,
}
impl Dump {
    /// Open the dump at `path`.
    ///
    /// Dumps missing their ZIP end of central directory record are repaired in
    /// memory before reading.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref()).or_raise(|| ErrorKind::Io)?;
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(mut bytes: Vec<u8>) -> Result<Self> {
        if !eocd::has_terminator(&bytes) {
            tracing::warn!("dump has no end of central directory record, attempting to rebuild it");
            bytes = eocd::repair(bytes)?;
        }
        let mut archive = ZipArchive::new(Cursor::new(bytes)).or_raise(|| ErrorKind::InvalidArchive)?;
        let structure = read_structure(&mut archive)?;
        let mut entries = Vec::new();
        for index in 0..archive.len() {
            let file = archive.by_index_raw(index).or_raise(|| ErrorKind::InvalidArchive)?;
            if file.is_file() && file.name().to_lowercase().ends_with(CATALOG_EXTENSION) {
                entries.push(file.name().to_string());
            }
        }
        tracing::debug!(entries = entries.len(), fields = structure.fields().len(), "opened dump");
        Ok(Self { archive, structure, entries })
    }

    pub fn structure(&self) -> &Structure {
        &self.structure
    }

    /// Names of the catalog entries, in the order records are read.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Lazily read every record of every catalog entry.
    ///
    /// A line that cannot be parsed yields an error of kind
    /// [`MalformedRecord`](ErrorKind::MalformedRecord) and reading carries on
    /// with the next line. Blank lines are skipped.
    pub fn records(self) -> Records {
        Records { dump: self, next_entry: 0, current: None }
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut file = self.archive.by_name(name).or_raise(|| ErrorKind::InvalidArchive)?;
        let mut data = Vec::with_capacity(usize::try_from(file.size()).unwrap_or_default());
        file.read_to_end(&mut data).or_raise(|| ErrorKind::InvalidArchive)?;
        Ok(data)
    }
}

fn read_structure(archive: &mut ZipArchive<Cursor<Vec<u8>>>) -> Result<Structure> {
    let mut file = match archive.by_name(STRUCTURE_ENTRY) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(Structure::default()),
        Err(err) => return Err(err).or_raise(|| ErrorKind::InvalidArchive),
    };
    let mut raw = Vec::new();
    file.read_to_end(&mut raw).or_raise(|| ErrorKind::InvalidArchive)?;
    let layout = String::from_utf8_lossy(&raw);
    layout.trim_start_matches('\u{feff}').parse()
}

/// Iterator over the records of a [`Dump`], see [`Dump::records`].
pub struct Records {
    dump: Dump,
    next_entry: usize,
    current: Option<Entry>,
}
impl Records {
    pub fn structure(&self) -> &Structure {
        &self.dump.structure
    }
}
impl Iterator for Records {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.current.as_mut() {
                if let Some((line, bytes)) = entry.next_line() {
                    if bytes.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }
                    let record = Record::parse(bytes, &self.dump.structure)
                        .or_raise(|| ErrorKind::MalformedRecord { entry: entry.name.clone(), line });
                    return Some(record);
                }
                self.current = None;
            }
            let name = self.dump.entries.get(self.next_entry)?.clone();
            self.next_entry += 1;
            match self.dump.read_entry(&name) {
                Ok(data) => {
                    tracing::debug!(entry = %name, bytes = data.len(), "reading catalog entry");
                    self.current = Some(Entry { name, data, offset: 0, line: 0 });
                },
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

/// A decompressed catalog entry being read line by line.
struct Entry {
    name: String,
    data: Vec<u8>,
    offset: usize,
    line: usize,
}
impl Entry {
    /// Next line (1-based number and bytes, without the newline).
    fn next_line(&mut self) -> Option<(usize, &[u8])> {
        if self.offset >= self.data.len() {
            return None;
        }
        let rest = &self.data[self.offset..];
        let len = rest.iter().position(|b| *b == b'\n').unwrap_or(rest.len());
        let start = self.offset;
        self.offset += len + 1;
        self.line += 1;
        Some((self.line, &self.data[start..start + len]))
    }
}
