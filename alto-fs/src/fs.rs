//! The filesystem object itself: image load/save, file enumeration,
//! directory enumeration, random-position I/O, and integrity checking.

use std::path::Path;

use crate::error::Error;
use crate::layout;
use crate::types::{
    DirectoryEntry, FileEntry, FileInfo, FilePosition, Geometry, Label, OpenFile, Page,
    ScanControl, PAGE_DATA_SIZE,
};

const HEADER_WORDS: usize = 2;
const LABEL_WORDS: usize = 12;
const PAGE_BYTES: usize = HEADER_WORDS * 2 + LABEL_WORDS * 2 + PAGE_DATA_SIZE;

/// Leader VDA of `SysDir.` on a freshly formatted disk, reached via the
/// filesystem descriptor block on page 0.
pub const ROOT_DIRECTORY_LEADER_VDA: u16 = 1;

/// A loaded (or freshly created) Alto filesystem image.
pub struct Fs {
    geometry: Geometry,
    disk_num: u16,
    pages: Vec<Page>,
    bitmap: Vec<bool>,
    free_pages: u16,
}

impl Fs {
    /// Allocate a blank filesystem of the given geometry. Every page starts free.
    pub fn create(geometry: Geometry) -> Result<Self, Error> {
        let total = geometry.total_pages();
        if total == 0 {
            return Err(Error::InvalidImage { expected_pages: 0, found_pages: 0 });
        }
        let mut pages = Vec::with_capacity(total);
        for _ in 0..total {
            let mut page = Page::default();
            page.label.version = crate::types::VERSION_FREE;
            pages.push(page);
        }
        Ok(Self {
            geometry,
            disk_num: 0,
            pages,
            bitmap: vec![false; total],
            free_pages: total as u16,
        })
    }

    #[must_use]
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    #[must_use]
    pub fn free_pages(&self) -> u16 {
        self.free_pages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    fn per_cylinder(&self) -> u16 {
        self.geometry.num_heads * self.geometry.num_sectors
    }

    /// Convert a virtual disk address to the packed cylinder/head/sector
    /// real disk address stored in page labels.
    #[must_use]
    pub fn vda_to_rda(&self, vda: u16) -> u16 {
        let per_cyl = self.per_cylinder();
        let cylinder = vda / per_cyl;
        let rem = vda % per_cyl;
        let head = rem / self.geometry.num_sectors;
        let sector = rem % self.geometry.num_sectors;
        (cylinder << 5) | (sector << 1) | head
    }

    #[must_use]
    pub fn rda_to_vda(&self, rda: u16) -> u16 {
        let head = rda & 1;
        let sector = (rda >> 1) & 0xF;
        let cylinder = rda >> 5;
        cylinder * self.per_cylinder() + head * self.geometry.num_sectors + sector
    }

    fn page(&self, vda: u16) -> Result<&Page, Error> {
        self.pages.get(usize::from(vda)).ok_or(Error::NotFound)
    }

    fn page_mut(&mut self, vda: u16) -> Result<&mut Page, Error> {
        self.pages.get_mut(usize::from(vda)).ok_or(Error::NotFound)
    }

    /// Read the raw bytes of a disk image into this (already geometry-sized) filesystem.
    pub fn load_image(&mut self, path: impl AsRef<Path>) -> Result<(), Error> {
        let data = std::fs::read(path)?;
        let expected = self.pages.len() * PAGE_BYTES;
        if data.len() != expected {
            return Err(Error::InvalidImage {
                expected_pages: self.pages.len(),
                found_pages: data.len() / PAGE_BYTES,
            });
        }
        for (vda, chunk) in data.chunks_exact(PAGE_BYTES).enumerate() {
            let page = &mut self.pages[vda];
            page.header[0] = le16(chunk, 0);
            page.header[1] = le16(chunk, 2);
            page.label = Label {
                next_rda: le16(chunk, 4),
                prev_rda: le16(chunk, 6),
                unused: le16(chunk, 8),
                nbytes: le16(chunk, 10),
                file_pgnum: le16(chunk, 12),
                version: le16(chunk, 14),
                sn: crate::types::SerialNumber { word1: le16(chunk, 16), word2: le16(chunk, 18) },
            };
            page.data.copy_from_slice(&chunk[HEADER_WORDS * 2 + LABEL_WORDS * 2..]);
            self.bitmap[vda] = page.label.occupied();
        }
        self.free_pages = self.bitmap.iter().filter(|occ| !**occ).count() as u16;
        Ok(())
    }

    /// Write this filesystem's pages back out as a raw disk image.
    pub fn save_image(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let mut data = vec![0u8; self.pages.len() * PAGE_BYTES];
        for (vda, page) in self.pages.iter().enumerate() {
            let chunk = &mut data[vda * PAGE_BYTES..(vda + 1) * PAGE_BYTES];
            put_le16(chunk, 0, page.header[0]);
            put_le16(chunk, 2, page.header[1]);
            put_le16(chunk, 4, page.label.next_rda);
            put_le16(chunk, 6, page.label.prev_rda);
            put_le16(chunk, 8, page.label.unused);
            put_le16(chunk, 10, page.label.nbytes);
            put_le16(chunk, 12, page.label.file_pgnum);
            put_le16(chunk, 14, page.label.version);
            put_le16(chunk, 16, page.label.sn.word1);
            put_le16(chunk, 18, page.label.sn.word2);
            chunk[HEADER_WORDS * 2 + LABEL_WORDS * 2..].copy_from_slice(&page.data);
        }
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Resolve a leader page's VDA into a `FileEntry`.
    pub fn file_entry(&self, leader_vda: u16) -> Result<FileEntry, Error> {
        let page = self.page(leader_vda)?;
        if !page.label.is_allocated() || page.label.file_pgnum != 0 {
            return Err(Error::NotFound);
        }
        Ok(FileEntry { sn: page.label.sn, version: page.label.version, leader_vda })
    }

    /// Open a file for reading or writing, starting at the leader page or
    /// at the first data page.
    pub fn open(&self, fe: &FileEntry, include_leader: bool) -> Result<OpenFile, Error> {
        let leader = self.page(fe.leader_vda)?;
        if leader.label.sn != fe.sn || leader.label.version != fe.version {
            return Err(Error::NotFound);
        }
        let pos = if include_leader {
            FilePosition { vda: fe.leader_vda, pgnum: 0, pos: 0 }
        } else if leader.label.next_rda == 0 {
            FilePosition { vda: fe.leader_vda, pgnum: 1, pos: 0 }
        } else {
            FilePosition { vda: self.rda_to_vda(leader.label.next_rda), pgnum: 1, pos: 0 }
        };
        Ok(OpenFile { fe: *fe, pos, error: false })
    }

    /// Read up to `len` bytes, following the page chain. Returns the number
    /// of bytes actually read (less than `len` at end of file).
    pub fn read(&self, of: &mut OpenFile, mut dst: Option<&mut [u8]>, len: usize) -> usize {
        let mut total = 0;
        while total < len {
            let Ok(page) = self.page(of.pos.vda) else { break };
            if of.pos.pgnum != 0 && page.label.file_pgnum == 0 {
                break; // ran off the end: no such page in this file
            }
            let available = usize::from(page.label.nbytes).saturating_sub(usize::from(of.pos.pos));
            if available == 0 {
                if page.label.next_rda == 0 {
                    break;
                }
                of.pos.vda = self.rda_to_vda(page.label.next_rda);
                of.pos.pgnum += 1;
                of.pos.pos = 0;
                continue;
            }
            let take = available.min(len - total);
            if let Some(buf) = dst.as_deref_mut() {
                let src = &page.data[usize::from(of.pos.pos)..usize::from(of.pos.pos) + take];
                buf[total..total + take].copy_from_slice(src);
            }
            of.pos.pos += take as u16;
            total += take;
        }
        total
    }

    /// Find a free page, marking it occupied. Does not fill in its label.
    pub fn find_free_page(&mut self) -> Result<u16, Error> {
        let vda = self.bitmap.iter().position(|occ| !occ).ok_or(Error::OutOfSpace)?;
        self.bitmap[vda] = true;
        self.free_pages -= 1;
        Ok(vda as u16)
    }

    /// Write up to `len` bytes, optionally extending the file with freshly
    /// allocated pages. Returns the number of bytes actually written.
    pub fn write(&mut self, of: &mut OpenFile, mut src: Option<&[u8]>, len: usize, extend: bool) -> usize {
        let mut total = 0;
        while total < len {
            let cur_vda = of.pos.vda;
            let Ok(cur_next_rda) = self.page(cur_vda).map(|p| p.label.next_rda) else { break };
            let room = PAGE_DATA_SIZE - usize::from(of.pos.pos);
            if room == 0 {
                let next_vda = if cur_next_rda != 0 {
                    Some(self.rda_to_vda(cur_next_rda))
                } else if extend {
                    match self.allocate_chained_page(&of.fe, cur_vda, of.pos.pgnum + 1) {
                        Ok(vda) => Some(vda),
                        Err(_) => None,
                    }
                } else {
                    None
                };
                let Some(next_vda) = next_vda else { break };
                of.pos.vda = next_vda;
                of.pos.pgnum += 1;
                of.pos.pos = 0;
                continue;
            }
            let take = room.min(len - total);
            let Ok(page) = self.page_mut(cur_vda) else { break };
            if let Some(buf) = src.as_mut() {
                let dst = &mut page.data[usize::from(of.pos.pos)..usize::from(of.pos.pos) + take];
                dst.copy_from_slice(&buf[total..total + take]);
            } else {
                let dst = &mut page.data[usize::from(of.pos.pos)..usize::from(of.pos.pos) + take];
                dst.fill(0);
            }
            of.pos.pos += take as u16;
            page.label.nbytes = page.label.nbytes.max(of.pos.pos);
            total += take;
        }
        total
    }

    fn allocate_chained_page(&mut self, fe: &FileEntry, prev_vda: u16, file_pgnum: u16) -> Result<u16, Error> {
        let new_vda = self.find_free_page()?;
        let prev_rda = self.vda_to_rda(prev_vda);
        let new_rda = self.vda_to_rda(new_vda);
        {
            let prev = self.page_mut(prev_vda)?;
            prev.label.next_rda = new_rda;
        }
        let page = self.page_mut(new_vda)?;
        page.label = Label {
            next_rda: 0,
            prev_rda,
            unused: 0,
            nbytes: 0,
            file_pgnum,
            version: fe.version,
            sn: fe.sn,
        };
        page.data = [0; PAGE_DATA_SIZE];
        Ok(new_vda)
    }

    /// Shorten the file to the current position, freeing every page beyond it.
    pub fn trim(&mut self, of: &mut OpenFile) -> Result<(), Error> {
        let page = self.page_mut(of.pos.vda)?;
        page.label.nbytes = of.pos.pos;
        let mut next_rda = page.label.next_rda;
        page.label.next_rda = 0;
        while next_rda != 0 {
            let vda = self.rda_to_vda(next_rda);
            let page = self.page_mut(vda)?;
            next_rda = page.label.next_rda;
            *page = Page::default();
            page.label.version = crate::types::VERSION_FREE;
            if self.bitmap[usize::from(vda)] {
                self.bitmap[usize::from(vda)] = false;
                self.free_pages += 1;
            }
        }
        Ok(())
    }

    /// Total length, in bytes, of the file's data (excluding the leader page).
    pub fn file_length(&self, fe: &FileEntry) -> Result<usize, Error> {
        let leader = self.page(fe.leader_vda)?;
        let mut total = 0usize;
        let mut next_rda = leader.label.next_rda;
        while next_rda != 0 {
            let page = self.page(self.rda_to_vda(next_rda))?;
            total += usize::from(page.label.nbytes);
            next_rda = page.label.next_rda;
        }
        Ok(total)
    }

    /// Leader-page metadata for a file.
    pub fn file_info(&self, fe: &FileEntry) -> Result<FileInfo, Error> {
        let leader = self.page(fe.leader_vda)?;
        Ok(layout::decode_leader(&leader.data, *fe))
    }

    /// Find a file by path, descending directories from `SysDir.`.
    pub fn find_file(&self, name: &str) -> Result<FileEntry, Error> {
        let components: Vec<&str> = name.split(['<', '>', '/']).filter(|s| !s.is_empty()).collect();
        if components.is_empty() {
            return Err(Error::NotFound);
        }
        let mut current = self.file_entry(ROOT_DIRECTORY_LEADER_VDA)?;
        let last = components.len() - 1;
        for (i, component) in components.iter().enumerate() {
            let mut best: Option<FileEntry> = None;
            self.scan_directory(&current, &mut |_fs, de| {
                if de.is_valid() && de.name.eq_ignore_ascii_case(component) {
                    if best.is_none_or(|b| de.fe.version > b.version) {
                        best = Some(de.fe);
                    }
                }
                ScanControl::Continue
            })?;
            match best {
                Some(fe) => {
                    if i != last && !fe.sn.is_directory() {
                        return Err(Error::NotADirectory);
                    }
                    current = fe;
                }
                None => return Err(Error::NotFound),
            }
        }
        Ok(current)
    }

    /// Directory-independent fallback lookup: scan every leader page directly.
    pub fn scavenge_file(&self, name: &str) -> Result<FileEntry, Error> {
        for (vda, page) in self.pages.iter().enumerate() {
            if page.label.file_pgnum == 0 && page.label.nbytes > 0 && page.label.is_allocated() {
                let fe = FileEntry { sn: page.label.sn, version: page.label.version, leader_vda: vda as u16 };
                let info = layout::decode_leader(&page.data, fe);
                if info.name.eq_ignore_ascii_case(name) {
                    return Ok(fe);
                }
            }
        }
        Err(Error::NotFound)
    }

    /// Visit every file in the filesystem (every chain's leader page).
    pub fn scan_files(&self, cb: &mut dyn FnMut(&Fs, &FileEntry) -> ScanControl) -> Result<(), Error> {
        for (vda, page) in self.pages.iter().enumerate() {
            if page.label.file_pgnum == 0 && page.label.is_allocated() && page.label.prev_rda == 0 {
                let fe = FileEntry { sn: page.label.sn, version: page.label.version, leader_vda: vda as u16 };
                match cb(self, &fe) {
                    ScanControl::Continue => {}
                    ScanControl::Stop => return Ok(()),
                    ScanControl::Error(e) => return Err(e),
                }
            }
        }
        Ok(())
    }

    /// Visit every valid entry in a directory file.
    pub fn scan_directory(
        &self,
        dir_fe: &FileEntry,
        cb: &mut dyn FnMut(&Fs, &DirectoryEntry) -> ScanControl,
    ) -> Result<(), Error> {
        let mut of = self.open(dir_fe, false)?;
        let len = self.file_length(dir_fe)?;
        let mut buf = vec![0u8; len];
        self.read(&mut of, Some(&mut buf), len);

        let mut offset = 0;
        while offset < buf.len() {
            let Some((entry, consumed)) = layout::decode_directory_entry(&buf, offset) else {
                break;
            };
            offset += consumed;
            if entry.is_valid() {
                match cb(self, &entry) {
                    ScanControl::Continue => {}
                    ScanControl::Stop => return Ok(()),
                    ScanControl::Error(e) => return Err(e),
                }
            }
        }
        Ok(())
    }

    /// Copy a file's contents (past the leader) out to a host file.
    pub fn extract_file(&self, fe: &FileEntry, output_path: impl AsRef<Path>) -> Result<(), Error> {
        let mut of = self.open(fe, false)?;
        let len = self.file_length(fe)?;
        let mut buf = vec![0u8; len];
        self.read(&mut of, Some(&mut buf), len);
        std::fs::write(output_path, buf)?;
        Ok(())
    }

    /// Replace a file's contents (past the leader) from a host file,
    /// extending or trimming as needed. Rolls back to the prior length on failure.
    pub fn replace_file(&mut self, fe: &FileEntry, input_path: impl AsRef<Path>) -> Result<(), Error> {
        let data = std::fs::read(input_path)?;
        let mut of = self.open(fe, false)?;
        let start = of.pos;
        let written = self.write(&mut of, Some(&data), data.len(), true);
        if written != data.len() {
            let mut rollback = OpenFile { fe: *fe, pos: start, error: false };
            let _ = self.trim(&mut rollback);
            return Err(Error::OutOfSpace);
        }
        self.trim(&mut of)
    }

    /// Check filesystem invariants. `level < 0` runs every check.
    pub fn check_integrity(&self, level: i32) -> Result<(), Error> {
        let level = if level < 0 { i32::MAX } else { level };
        self.check_bitmap()?;
        if level >= 1 {
            self.check_chains()?;
        }
        Ok(())
    }

    fn check_bitmap(&self) -> Result<(), Error> {
        for (vda, page) in self.pages.iter().enumerate() {
            if page.label.occupied() != self.bitmap[vda] {
                return Err(Error::CorruptFs(format!("bitmap mismatch at vda {vda}")));
            }
        }
        Ok(())
    }

    fn check_chains(&self) -> Result<(), Error> {
        for (vda, page) in self.pages.iter().enumerate() {
            if !page.label.is_allocated() {
                continue;
            }
            if page.label.file_pgnum > 0 && page.label.prev_rda == 0 {
                return Err(Error::CorruptFs(format!("page {vda} claims pgnum>0 with no predecessor")));
            }
            if page.label.prev_rda != 0 {
                let prev_vda = self.rda_to_vda(page.label.prev_rda);
                let prev = self.page(prev_vda)?;
                if prev.label.sn != page.label.sn || prev.label.file_pgnum + 1 != page.label.file_pgnum {
                    return Err(Error::CorruptFs(format!("chain broken at vda {vda}")));
                }
            }
        }
        Ok(())
    }
}

fn le16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn put_le16(data: &mut [u8], offset: usize, value: u16) {
    data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SerialNumber, VERSION_FREE};

    fn small_geometry() -> Geometry {
        Geometry { num_disks: 1, num_cylinders: 4, num_heads: 1, num_sectors: 4 }
    }

    fn make_file(fs: &mut Fs, leader_vda: u16, sn: SerialNumber, version: u16) -> FileEntry {
        {
            let page = fs.page_mut(leader_vda).unwrap();
            page.label = Label { next_rda: 0, prev_rda: 0, unused: 0, nbytes: 1, file_pgnum: 0, version, sn };
        }
        fs.bitmap[usize::from(leader_vda)] = true;
        fs.free_pages -= 1;
        FileEntry { sn, version, leader_vda }
    }

    #[test]
    fn create_starts_all_pages_free() {
        let fs = Fs::create(small_geometry()).unwrap();
        assert_eq!(fs.free_pages(), fs.len() as u16);
    }

    #[test]
    fn vda_rda_round_trips() {
        let fs = Fs::create(small_geometry()).unwrap();
        for vda in 0..fs.len() as u16 {
            let rda = fs.vda_to_rda(vda);
            assert_eq!(fs.rda_to_vda(rda), vda);
        }
    }

    #[test]
    fn write_then_read_round_trips_within_one_page() {
        let mut fs = Fs::create(small_geometry()).unwrap();
        let sn = SerialNumber { word1: 1, word2: 0 };
        let fe = make_file(&mut fs, 0, sn, 1);
        {
            let leader = fs.page_mut(0).unwrap();
            leader.label.next_rda = fs.vda_to_rda(1);
        }
        {
            let page1 = fs.page_mut(1).unwrap();
            page1.label = Label { next_rda: 0, prev_rda: fs.vda_to_rda(0), unused: 0, nbytes: 0, file_pgnum: 1, version: 1, sn };
        }
        fs.bitmap[1] = true;
        fs.free_pages -= 1;

        let mut of = fs.open(&fe, false).unwrap();
        let written = fs.write(&mut of, Some(b"hello"), 5, true);
        assert_eq!(written, 5);

        let mut of = fs.open(&fe, false).unwrap();
        let mut buf = [0u8; 5];
        let read = fs.read(&mut of, Some(&mut buf), 5);
        assert_eq!(read, 5);
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn write_extends_across_pages_when_requested() {
        let mut fs = Fs::create(small_geometry()).unwrap();
        let sn = SerialNumber { word1: 2, word2: 0 };
        let fe = make_file(&mut fs, 0, sn, 1);
        let mut of = fs.open(&fe, false).unwrap();
        let payload = vec![0xAB; super::PAGE_DATA_SIZE + 10];
        let written = fs.write(&mut of, Some(&payload), payload.len(), true);
        assert_eq!(written, payload.len());
        assert_eq!(fs.file_length(&fe).unwrap(), payload.len());
    }

    #[test]
    fn write_without_extend_stops_at_page_boundary() {
        let mut fs = Fs::create(small_geometry()).unwrap();
        let sn = SerialNumber { word1: 3, word2: 0 };
        let fe = make_file(&mut fs, 0, sn, 1);
        let mut of = fs.open(&fe, false).unwrap();
        let payload = vec![0xCD; super::PAGE_DATA_SIZE + 10];
        let written = fs.write(&mut of, Some(&payload), payload.len(), false);
        assert_eq!(written, super::PAGE_DATA_SIZE);
    }

    #[test]
    fn trim_frees_trailing_pages() {
        let mut fs = Fs::create(small_geometry()).unwrap();
        let sn = SerialNumber { word1: 4, word2: 0 };
        let fe = make_file(&mut fs, 0, sn, 1);
        let mut of = fs.open(&fe, false).unwrap();
        let payload = vec![0xEE; super::PAGE_DATA_SIZE + 10];
        fs.write(&mut of, Some(&payload), payload.len(), true);
        let free_before = fs.free_pages();

        let mut of = fs.open(&fe, false).unwrap();
        fs.read(&mut of, None, 5); // position 5 bytes into the file
        fs.trim(&mut of).unwrap();
        assert!(fs.free_pages() > free_before);
        assert_eq!(fs.file_length(&fe).unwrap(), 5);
    }

    #[test]
    fn check_integrity_accepts_freshly_created_fs() {
        let fs = Fs::create(small_geometry()).unwrap();
        assert!(fs.check_integrity(-1).is_ok());
    }

    #[test]
    fn check_integrity_rejects_tampered_bitmap() {
        let mut fs = Fs::create(small_geometry()).unwrap();
        fs.bitmap[0] = true;
        assert!(fs.check_integrity(-1).is_err());
    }

    #[test]
    fn scavenge_finds_file_directory_cannot() {
        let mut fs = Fs::create(small_geometry()).unwrap();
        let sn = SerialNumber { word1: 5, word2: 0 };
        let fe = make_file(&mut fs, 2, sn, 1);
        {
            let page = fs.page_mut(2).unwrap();
            page.label.nbytes = 64;
            let info = FileInfo { name: "Foo.bar".to_string(), fe, ..FileInfo::default() };
            layout::encode_leader(&mut page.data, &info);
        }
        let found = fs.scavenge_file("foo.bar").unwrap();
        assert_eq!(found.leader_vda, 2);
        let _ = VERSION_FREE;
    }
}
