//! Error type for every fallible filesystem operation.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The image file's length doesn't match `geometry`'s page count.
    InvalidImage { expected_pages: usize, found_pages: usize },
    /// `check_integrity` (or an operation that relies on its invariants) found corruption.
    CorruptFs(String),
    /// `find_file`/`scavenge_file`/`file_entry` couldn't locate the requested file.
    NotFound,
    /// A path component resolved to a file, not a directory.
    NotADirectory,
    /// No free page was available for an extending write.
    OutOfSpace,
    /// Reading or writing the host-side file failed.
    IoError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidImage { expected_pages, found_pages } => write!(
                f,
                "invalid disk image: geometry implies {expected_pages} pages, file has {found_pages}"
            ),
            Error::CorruptFs(msg) => write!(f, "corrupt filesystem: {msg}"),
            Error::NotFound => write!(f, "file not found"),
            Error::NotADirectory => write!(f, "not a directory"),
            Error::OutOfSpace => write!(f, "disk full"),
            Error::IoError(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IoError(e.to_string())
    }
}
