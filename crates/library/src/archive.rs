//! Locating the archives that hold a book's file, cover and illustrations.
//!
//! Dumps ship their files in ZIP/7z archives named after the inclusive range
//! of `LIBID`s they hold (`fb2-000024-030559.zip`, optionally prefixed with a
//! single letter such as `d.fb2-...`). Covers and illustrations live in
//! identically named `.zip` archives under `covers/` and `images/`.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use flibook_catalog::Archives;
use flibook_inpx::Record;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use tracing::instrument;
use walkdir::WalkDir;

static ARCHIVE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:[a-z]\.)?fb2-(\d+)-(\d+)\.(7z|zip)$").unwrap());
const COVERS_DIR: &str = "covers";
const IMAGES_DIR: &str = "images";

#[derive(Debug, Clone, PartialEq, Eq)]
struct ArchiveRange {
    start: u64,
    end: u64,
    path: PathBuf,
}

/// Which kind of archive a path under the dump root is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Book,
    Cover,
    Images,
}

/// Sorted archive ranges found under a dump root.
#[derive(Debug, Clone, Default)]
pub struct ArchiveResolver {
    root: PathBuf,
    books: Vec<ArchiveRange>,
    covers: Vec<ArchiveRange>,
    images: Vec<ArchiveRange>,
}
impl ArchiveResolver {
    /// Walk `root` once and index every range-named archive beneath it.
    #[instrument(skip_all, fields(root = %root.as_ref().display()))]
    pub fn scan(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            exn::bail!(ErrorKind::DumpRootNotFound(root.to_path_buf()));
        }
        let mut resolver = Self { root: root.to_path_buf(), ..Default::default() };
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry.or_raise(|| ErrorKind::ArchiveScan)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            let Some(captures) = ARCHIVE_NAME.captures(name) else {
                continue;
            };
            let (Ok(start), Ok(end)) = (captures[1].parse::<u64>(), captures[2].parse::<u64>()) else {
                continue;
            };
            let is_zip = captures[3].eq_ignore_ascii_case("zip");
            let range = ArchiveRange { start, end, path: entry.path().to_path_buf() };
            match kind(root, entry.path()) {
                Kind::Book => resolver.books.push(range),
                Kind::Cover if is_zip => resolver.covers.push(range),
                Kind::Images if is_zip => resolver.images.push(range),
                _ => tracing::trace!(path = %entry.path().display(), "ignoring non-zip media archive"),
            }
        }
        for ranges in [&mut resolver.books, &mut resolver.covers, &mut resolver.images] {
            ranges.sort_by_key(|r| (r.start, r.end));
        }
        tracing::info!(
            books = resolver.books.len(),
            covers = resolver.covers.len(),
            images = resolver.images.len(),
            "indexed dump archives"
        );
        Ok(resolver)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn book_archive(&self, lib_id: u64) -> Option<&Path> {
        find(&self.books, lib_id)
    }

    pub fn cover_archive(&self, lib_id: u64) -> Option<&Path> {
        find(&self.covers, lib_id)
    }

    pub fn images_archive(&self, lib_id: u64) -> Option<&Path> {
        find(&self.images, lib_id)
    }

    /// Archives for a record. When no book archive range holds the record,
    /// its `FOLDER` is used if that exists under the dump root.
    pub fn resolve(&self, record: &Record) -> Archives {
        let book = self
            .book_archive(record.lib_id)
            .map(Path::to_path_buf)
            .or_else(|| self.folder_archive(record.folder.as_deref()?));
        Archives {
            book,
            cover: self.cover_archive(record.lib_id).map(Path::to_path_buf),
            images: self.images_archive(record.lib_id).map(Path::to_path_buf),
        }
    }

    /// `FOLDER` is taken from the dump, so it may only name a file below the
    /// root: no absolute paths and no `..`.
    fn folder_archive(&self, folder: &str) -> Option<PathBuf> {
        let relative = Path::new(folder);
        if !relative.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir)) {
            tracing::debug!(folder, "ignoring FOLDER outside the dump root");
            return None;
        }
        let path = self.root.join(relative);
        path.is_file().then_some(path)
    }
}

fn kind(root: &Path, path: &Path) -> Kind {
    let first = path.strip_prefix(root).ok().and_then(|relative| relative.components().next());
    match first {
        Some(Component::Normal(dir)) if dir.eq_ignore_ascii_case(COVERS_DIR) => Kind::Cover,
        Some(Component::Normal(dir)) if dir.eq_ignore_ascii_case(IMAGES_DIR) => Kind::Images,
        _ => Kind::Book,
    }
}

/// Binary search for the range holding `id`.
fn find(ranges: &[ArchiveRange], id: u64) -> Option<&Path> {
    let after = ranges.partition_point(|r| r.start <= id);
    let range = ranges.get(after.checked_sub(1)?)?;
    (id <= range.end).then_some(range.path.as_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"").unwrap();
    }

    fn dump_root() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "fb2-000001-000100.zip");
        touch(dir.path(), "fb2-000101-000200.7z");
        touch(dir.path(), "extra/d.fb2-000500-000600.zip");
        touch(dir.path(), "covers/fb2-000001-000100.zip");
        touch(dir.path(), "covers/fb2-000101-000200.7z");
        touch(dir.path(), "images/fb2-000101-000200.zip");
        touch(dir.path(), "flibusta_fb2_local.inpx");
        touch(dir.path(), "fb2-000300-000400.rar");
        dir
    }

    #[rstest]
    #[case(1, Some("fb2-000001-000100.zip"))]
    #[case(100, Some("fb2-000001-000100.zip"))]
    #[case(150, Some("fb2-000101-000200.7z"))]
    #[case(550, Some("extra/d.fb2-000500-000600.zip"))]
    #[case(250, None)]
    #[case(350, None)]
    #[case(0, None)]
    fn test_book_archive(#[case] lib_id: u64, #[case] expected: Option<&str>) {
        let dir = dump_root();
        let resolver = ArchiveResolver::scan(dir.path()).unwrap();
        assert_eq!(resolver.book_archive(lib_id), expected.map(|e| dir.path().join(e)).as_deref());
    }

    #[test]
    fn test_cover_and_images_archives() {
        let dir = dump_root();
        let resolver = ArchiveResolver::scan(dir.path()).unwrap();
        assert_eq!(resolver.cover_archive(42), Some(dir.path().join("covers/fb2-000001-000100.zip").as_path()));
        // Only ZIP archives hold covers.
        assert_eq!(resolver.cover_archive(150), None);
        assert_eq!(resolver.images_archive(150), Some(dir.path().join("images/fb2-000101-000200.zip").as_path()));
        assert_eq!(resolver.images_archive(42), None);
    }

    #[test]
    fn test_resolve_falls_back_to_folder() {
        let dir = dump_root();
        touch(dir.path(), "lib.rus.ec/custom-archive.zip");
        let resolver = ArchiveResolver::scan(dir.path()).unwrap();
        let mut record = flibook_inpx::parse_line("Doe,John,:\u{4}\u{4}Title\u{4}\u{4}\u{4}\u{4}\u{4}900").unwrap();
        assert_eq!(resolver.resolve(&record), Archives::default());

        record.folder = Some("lib.rus.ec/custom-archive.zip".to_string());
        let archives = resolver.resolve(&record);
        assert_eq!(archives.book, Some(dir.path().join("lib.rus.ec/custom-archive.zip")));

        record.folder = Some("missing.zip".to_string());
        assert_eq!(resolver.resolve(&record).book, None);
        record.folder = Some("lib.rus.ec".to_string());
        assert_eq!(resolver.resolve(&record).book, None);
    }

    #[rstest]
    #[case("../secret.zip")]
    #[case("lib/../../secret.zip")]
    fn test_folder_cannot_escape_root(#[case] folder: &str) {
        let outer = tempfile::tempdir().unwrap();
        touch(outer.path(), "secret.zip");
        touch(outer.path(), "dump/lib/fb2-000001-000100.zip");
        let resolver = ArchiveResolver::scan(outer.path().join("dump")).unwrap();
        let mut record = flibook_inpx::parse_line("Doe,John,:\u{4}\u{4}Title\u{4}\u{4}\u{4}\u{4}\u{4}900").unwrap();
        record.folder = Some(folder.to_string());
        assert!(outer.path().join("dump").join(folder).is_file());
        assert_eq!(resolver.resolve(&record).book, None);
    }

    #[test]
    fn test_absolute_folder_is_ignored() {
        let outer = tempfile::tempdir().unwrap();
        touch(outer.path(), "elsewhere/custom.zip");
        std::fs::create_dir(outer.path().join("dump")).unwrap();
        let resolver = ArchiveResolver::scan(outer.path().join("dump")).unwrap();
        let mut record = flibook_inpx::parse_line("Doe,John,:\u{4}\u{4}Title\u{4}\u{4}\u{4}\u{4}\u{4}900").unwrap();
        let absolute = outer.path().join("elsewhere/custom.zip");
        record.folder = Some(absolute.to_string_lossy().into_owned());
        assert_eq!(resolver.resolve(&record).book, None);
    }

    #[test]
    fn test_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = ArchiveResolver::scan(&missing).unwrap_err();
        assert_eq!(*err, ErrorKind::DumpRootNotFound(missing));
    }
}
