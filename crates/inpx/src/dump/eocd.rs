//! Recovery of dumps whose ZIP *End Of Central Directory* record is missing.
//!
//! Some INPX dumps are published with the central directory intact but
//! without the 22-byte terminator that points at it, which makes them
//! unreadable by any ZIP reader. The terminator can be rebuilt by walking the
//! central directory headers that are present.

use crate::error::{ErrorKind, Result};
use exn::OptionExt;

const CENTRAL_HEADER: [u8; 4] = *b"PK\x01\x02";
const TERMINATOR: [u8; 4] = *b"PK\x05\x06";
/// Fixed part of a central directory file header.
const CENTRAL_HEADER_LEN: usize = 46;
/// Terminator length without its trailing comment.
const TERMINATOR_LEN: usize = 22;

/// Returns `true` if the terminator signature appears where a reader would
/// look for it (the last 22 bytes plus the maximum comment length).
pub(crate) fn has_terminator(bytes: &[u8]) -> bool {
    let window = bytes.len().min(TERMINATOR_LEN + usize::from(u16::MAX));
    bytes[bytes.len() - window..].windows(TERMINATOR.len()).any(|w| w == TERMINATOR)
}

fn read_u16(bytes: &[u8], at: usize) -> usize {
    usize::from(u16::from_le_bytes([bytes[at], bytes[at + 1]]))
}

/// Append a minimal terminator after the central directory found in `bytes`.
///
/// Anything following the last central directory header is discarded.
pub(crate) fn repair(mut bytes: Vec<u8>) -> Result<Vec<u8>> {
    let start = bytes
        .windows(CENTRAL_HEADER.len())
        .position(|w| w == CENTRAL_HEADER)
        .ok_or_raise(|| ErrorKind::InvalidArchive)?;
    let mut cursor = start;
    let mut records: usize = 0;
    while cursor + CENTRAL_HEADER_LEN <= bytes.len() && bytes[cursor..cursor + 4] == CENTRAL_HEADER {
        let name_len = read_u16(&bytes, cursor + 28);
        let extra_len = read_u16(&bytes, cursor + 30);
        let comment_len = read_u16(&bytes, cursor + 32);
        cursor += CENTRAL_HEADER_LEN + name_len + extra_len + comment_len;
        records += 1;
    }
    if cursor > bytes.len() {
        exn::bail!(ErrorKind::InvalidArchive);
    }
    let offset = u32::try_from(start).ok().ok_or_raise(|| ErrorKind::InvalidArchive)?;
    let size = u32::try_from(cursor - start).ok().ok_or_raise(|| ErrorKind::InvalidArchive)?;
    let records = u16::try_from(records).unwrap_or(u16::MAX);
    tracing::debug!(offset, size, records, "rebuilt central directory terminator");

    bytes.truncate(cursor);
    bytes.reserve(TERMINATOR_LEN);
    bytes.extend_from_slice(&TERMINATOR);
    bytes.extend_from_slice(&0u16.to_le_bytes()); // this disk
    bytes.extend_from_slice(&0u16.to_le_bytes()); // disk with central directory
    bytes.extend_from_slice(&records.to_le_bytes()); // records on this disk
    bytes.extend_from_slice(&records.to_le_bytes()); // total records
    bytes.extend_from_slice(&size.to_le_bytes());
    bytes.extend_from_slice(&offset.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes()); // comment length
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repair_without_central_directory() {
        let err = repair(b"definitely not a zip file".to_vec()).unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidArchive);
    }

    #[test]
    fn test_has_terminator() {
        assert!(!has_terminator(b""));
        assert!(!has_terminator(b"PK\x01\x02"));
        let mut bytes = vec![0u8; 100];
        bytes.extend_from_slice(&TERMINATOR);
        bytes.extend_from_slice(&[0u8; 18]);
        assert!(has_terminator(&bytes));
    }
}
