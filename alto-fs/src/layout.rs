//! Byte-level (de)serialization of leader pages and directory entries.
//!
//! The original leader-page and directory-entry byte layouts live in
//! `fs.c`, which wasn't among the source files carried into this port —
//! only `fs.h`'s struct declarations were. The field set here (name,
//! three Alto-epoch timestamps, consecutive/change_sn, and directory/
//! last-page hints) matches `struct file_info`/`struct directory_entry`
//! exactly; the byte offsets that pack them are this crate's own, chosen
//! to round-trip cleanly rather than to match an unseen original.

use crate::types::{DirectoryEntry, FileEntry, FileInfo, FilePosition, SerialNumber, NAME_LENGTH};

const NAME_OFFSET: usize = 1;
const CREATED_OFFSET: usize = 40;
const WRITTEN_OFFSET: usize = 44;
const READ_OFFSET: usize = 48;
const CONSECUTIVE_OFFSET: usize = 52;
const CHANGE_SN_OFFSET: usize = 53;
const DIR_FE_LEADER_OFFSET: usize = 54;
const DIR_FE_VERSION_OFFSET: usize = 56;
const LAST_PAGE_VDA_OFFSET: usize = 58;
const LAST_PAGE_PGNUM_OFFSET: usize = 60;
const LAST_PAGE_POS_OFFSET: usize = 62;

fn put_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
}

fn get_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([buf[offset], buf[offset + 1]])
}

fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

fn get_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

/// Write a `FileInfo`'s fields into a leader page's 512-byte data area.
pub fn encode_leader(data: &mut [u8; 512], info: &FileInfo) {
    let name_bytes = info.name.as_bytes();
    let len = name_bytes.len().min(NAME_LENGTH - 1);
    data[0] = len as u8;
    data[NAME_OFFSET..NAME_OFFSET + len].copy_from_slice(&name_bytes[..len]);
    put_u32(data, CREATED_OFFSET, info.created_raw);
    put_u32(data, WRITTEN_OFFSET, info.written_raw);
    put_u32(data, READ_OFFSET, info.read_raw);
    data[CONSECUTIVE_OFFSET] = info.consecutive;
    data[CHANGE_SN_OFFSET] = info.change_sn;
    put_u16(data, DIR_FE_LEADER_OFFSET, info.fe.leader_vda);
    put_u16(data, DIR_FE_VERSION_OFFSET, info.fe.version);
    put_u16(data, LAST_PAGE_VDA_OFFSET, info.last_page.vda);
    put_u16(data, LAST_PAGE_PGNUM_OFFSET, info.last_page.pgnum);
    put_u16(data, LAST_PAGE_POS_OFFSET, info.last_page.pos);
}

/// Read a `FileInfo` out of a leader page's data area. `fe` is the caller's
/// own file_entry for this file (the leader page doesn't self-describe its
/// own serial number/version — that lives in the page label).
#[must_use]
pub fn decode_leader(data: &[u8; 512], fe: FileEntry) -> FileInfo {
    let name_len = usize::from(data[0]).min(NAME_LENGTH - 1);
    let name = String::from_utf8_lossy(&data[NAME_OFFSET..NAME_OFFSET + name_len]).into_owned();
    FileInfo {
        name,
        created_raw: get_u32(data, CREATED_OFFSET),
        written_raw: get_u32(data, WRITTEN_OFFSET),
        read_raw: get_u32(data, READ_OFFSET),
        consecutive: data[CONSECUTIVE_OFFSET],
        change_sn: data[CHANGE_SN_OFFSET],
        fe,
        last_page: FilePosition {
            vda: get_u16(data, LAST_PAGE_VDA_OFFSET),
            pgnum: get_u16(data, LAST_PAGE_PGNUM_OFFSET),
            pos: get_u16(data, LAST_PAGE_POS_OFFSET),
        },
    }
}

/// Encode one directory entry. Returns the entry bytes, already padded to
/// an even length with the length header word filled in.
#[must_use]
pub fn encode_directory_entry(entry_type: u16, fe: FileEntry, name: &str) -> Vec<u8> {
    let name_bytes = name.as_bytes();
    let name_len = name_bytes.len().min(NAME_LENGTH - 1);
    // header word + 4 word-fields + 1 length byte + name bytes, rounded up to a word.
    let body_len = 10 + 1 + name_len;
    let padded_len = body_len + (body_len % 2);
    let length_words = (padded_len / 2) as u16;

    let mut buf = vec![0u8; padded_len];
    put_u16(&mut buf, 0, (entry_type << 15) | (length_words & 0x7FFF));
    put_u16(&mut buf, 2, fe.sn.word1);
    put_u16(&mut buf, 4, fe.sn.word2);
    put_u16(&mut buf, 6, fe.version);
    put_u16(&mut buf, 8, fe.leader_vda);
    buf[10] = name_len as u8;
    buf[11..11 + name_len].copy_from_slice(&name_bytes[..name_len]);
    buf
}

/// Decode one directory entry starting at `data[offset..]`. Returns the
/// entry and the byte length consumed, or `None` if too little data remains
/// to hold even the fixed-size header.
#[must_use]
pub fn decode_directory_entry(data: &[u8], offset: usize) -> Option<(DirectoryEntry, usize)> {
    if offset + 11 > data.len() {
        return None;
    }
    let header = get_u16(data, offset);
    let entry_type = header >> 15;
    let length_words = usize::from(header & 0x7FFF);
    let byte_len = length_words * 2;
    if byte_len < 11 || offset + byte_len > data.len() {
        return None;
    }
    let fe = FileEntry {
        sn: SerialNumber {
            word1: get_u16(data, offset + 2),
            word2: get_u16(data, offset + 4),
        },
        version: get_u16(data, offset + 6),
        leader_vda: get_u16(data, offset + 8),
    };
    let name_len = usize::from(data[offset + 10]).min(NAME_LENGTH - 1).min(byte_len - 11);
    let name = String::from_utf8_lossy(&data[offset + 11..offset + 11 + name_len]).into_owned();
    Some((
        DirectoryEntry {
            entry_type,
            length: length_words as u16,
            fe,
            name,
        },
        byte_len,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DIR_ENTRY_VALID;

    #[test]
    fn leader_round_trips() {
        let info = FileInfo {
            name: "Foo.bar".to_string(),
            created_raw: 111,
            written_raw: 222,
            read_raw: 333,
            consecutive: 1,
            change_sn: 2,
            fe: FileEntry { leader_vda: 9, version: 3, ..FileEntry::default() },
            last_page: FilePosition { vda: 5, pgnum: 2, pos: 10 },
        };
        let mut data = [0u8; 512];
        encode_leader(&mut data, &info);
        let decoded = decode_leader(&data, info.fe);
        assert_eq!(decoded.name, "Foo.bar");
        assert_eq!(decoded.created_raw, 111);
        assert_eq!(decoded.last_page.pos, 10);
    }

    #[test]
    fn directory_entry_round_trips() {
        let fe = FileEntry { leader_vda: 42, version: 1, ..FileEntry::default() };
        let bytes = encode_directory_entry(DIR_ENTRY_VALID, fe, "SysDir.");
        let (entry, consumed) = decode_directory_entry(&bytes, 0).expect("decodes");
        assert_eq!(consumed, bytes.len());
        assert_eq!(entry.name, "SysDir.");
        assert!(entry.is_valid());
        assert_eq!(entry.fe.leader_vda, 42);
    }
}
