//! Data structures mirroring the Alto filesystem's on-disk and in-memory
//! layout, one-to-one with `AltoFileSys.D`'s SN / FP / FA / DV / LD records.

/// Maximum filename length, including the trailing length-prefixed encoding.
pub const NAME_LENGTH: usize = 40;
/// Bytes of user data per page.
pub const PAGE_DATA_SIZE: usize = 512;

pub const SN_DIRECTORY: u16 = 0x8000;
pub const SN_RAND: u16 = 0x4000;
pub const SN_NOLOG: u16 = 0x2000;
pub const SN_PART1_MASK: u16 = 0x1FFF;

pub const VERSION_FREE: u16 = 0xFFFF;
pub const VERSION_BAD: u16 = 0xFFFE;

pub const DIR_ENTRY_VALID: u16 = 1;
pub const DIR_ENTRY_MISSING: u16 = 0;

/// A file's serial number, split into two words the way the leader page stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SerialNumber {
    pub word1: u16,
    pub word2: u16,
}

impl SerialNumber {
    #[must_use]
    pub fn is_directory(self) -> bool {
        self.word1 & SN_DIRECTORY != 0
    }
}

/// Identifies a file by its serial number, version, and leader page address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileEntry {
    pub sn: SerialNumber,
    pub version: u16,
    pub leader_vda: u16,
}

/// A cursor within an open file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilePosition {
    pub vda: u16,
    pub pgnum: u16,
    pub pos: u16,
}

/// An open file: the identity plus the current read/write cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenFile {
    pub fe: FileEntry,
    pub pos: FilePosition,
    pub error: bool,
}

/// A page's 12-word label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Label {
    pub next_rda: u16,
    pub prev_rda: u16,
    pub unused: u16,
    pub nbytes: u16,
    pub file_pgnum: u16,
    pub version: u16,
    pub sn: SerialNumber,
}

impl Label {
    #[must_use]
    pub fn is_free(self) -> bool {
        self.version == VERSION_FREE
    }

    #[must_use]
    pub fn is_bad(self) -> bool {
        self.version == VERSION_BAD
    }

    #[must_use]
    pub fn is_allocated(self) -> bool {
        !self.is_free() && !self.is_bad()
    }

    /// Bitmap semantics: a page counts as "in use" if allocated OR marked bad.
    #[must_use]
    pub fn occupied(self) -> bool {
        !self.is_free()
    }
}

/// One 512-byte page: a 2-word header, the 12-word label, and the data.
#[derive(Debug, Clone)]
pub struct Page {
    pub header: [u16; 2],
    pub label: Label,
    pub data: [u8; PAGE_DATA_SIZE],
}

impl Default for Page {
    fn default() -> Self {
        Self {
            header: [0; 2],
            label: Label::default(),
            data: [0; PAGE_DATA_SIZE],
        }
    }
}

/// One entry within a directory file's data stream.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub entry_type: u16,
    pub length: u16,
    pub fe: FileEntry,
    pub name: String,
}

impl DirectoryEntry {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.entry_type == DIR_ENTRY_VALID
    }
}

/// Leader-page-derived metadata about a file.
#[derive(Debug, Clone, Default)]
pub struct FileInfo {
    pub name: String,
    /// Alto epoch (1901-01-01) seconds.
    pub created_raw: u32,
    pub written_raw: u32,
    pub read_raw: u32,
    pub consecutive: u8,
    pub change_sn: u8,
    pub fe: FileEntry,
    pub last_page: FilePosition,
}

/// Seconds between the Alto epoch (1901-01-01) and the Unix epoch (1970-01-01).
const ALTO_EPOCH_OFFSET_SECONDS: u32 = 2_177_452_800;

impl FileInfo {
    /// Convert one of the raw Alto timestamps to Unix seconds, if representable.
    #[must_use]
    pub fn to_unix_seconds(raw: u32) -> Option<u32> {
        raw.checked_sub(ALTO_EPOCH_OFFSET_SECONDS)
    }

    /// Render one `adar -l`-style line, or the verbose multi-line form when
    /// `verbose > 0`: VDA, serial number, version, length, and name, plus
    /// (verbose) the three Alto-epoch timestamps.
    #[must_use]
    pub fn display_line(&self, verbose: u8, length: usize) -> String {
        let summary = format!(
            "{:>6} {:04x}{:04x} {:>3} {:>8} {}",
            self.fe.leader_vda, self.fe.sn.word1, self.fe.sn.word2, self.fe.version, length, self.name
        );
        if verbose == 0 {
            return summary;
        }
        format!(
            "{summary}\n    created {:>10}  written {:>10}  read {:>10}  consecutive {}  change_sn {}",
            self.created_raw, self.written_raw, self.read_raw, self.consecutive, self.change_sn
        )
    }
}

/// Disk geometry: how many pages the image has and how they're organized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub num_disks: u16,
    pub num_cylinders: u16,
    pub num_heads: u16,
    pub num_sectors: u16,
}

impl Geometry {
    #[must_use]
    pub fn total_pages(self) -> usize {
        usize::from(self.num_disks)
            * usize::from(self.num_cylinders)
            * usize::from(self.num_heads)
            * usize::from(self.num_sectors)
    }

    #[must_use]
    pub fn pages_per_disk(self) -> usize {
        usize::from(self.num_cylinders) * usize::from(self.num_heads) * usize::from(self.num_sectors)
    }
}

/// What a scan callback asks the scanner to do next.
pub enum ScanControl {
    Continue,
    Stop,
    Error(crate::error::Error),
}
