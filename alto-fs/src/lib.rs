//! Standalone reader/writer for Xerox Alto diablo-disk filesystem images:
//! pages, labels, directories, and leader pages, independent of the
//! microengine that would otherwise drive disk I/O through task microcode.

pub mod error;
pub mod fs;
pub mod layout;
pub mod types;

pub use error::Error;
pub use fs::{Fs, ROOT_DIRECTORY_LEADER_VDA};
pub use types::{
    DirectoryEntry, FileEntry, FileInfo, FilePosition, Geometry, Label, OpenFile, Page,
    ScanControl, SerialNumber,
};
