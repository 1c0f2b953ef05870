//! Error type shared by every fallible operation in this crate.

use std::fmt;

/// Everything that can go wrong loading ROMs or running the microengine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A ROM file was the wrong size (too short or too long) for the table it targets.
    InvalidRom { expected: usize, found: usize },
    /// An opcode combination the microcode is not allowed to produce occurred.
    InvalidOpcode { task: u8, mpc: u16 },
    /// A condition the original hardware also treats as fatal (e.g. EMULATOR executing BLOCK).
    MicrocodeFatal(&'static str),
    /// A peripheral collaborator reported a failure the engine cannot recover from.
    DeviceFatal(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidRom { expected, found } => {
                write!(f, "invalid ROM size: expected {expected} words, found {found}")
            }
            Error::InvalidOpcode { task, mpc } => {
                write!(f, "invalid microcode at task {task} mpc {mpc:#06o}")
            }
            Error::MicrocodeFatal(msg) => write!(f, "microcode fault: {msg}"),
            Error::DeviceFatal(msg) => write!(f, "device fault: {msg}"),
        }
    }
}

impl std::error::Error for Error {}
