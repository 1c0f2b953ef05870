//! Error type for the UDP transport.

use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// Binding or configuring the broadcast socket failed.
    Bind(std::io::Error),
    /// A send() call failed at the socket layer.
    Send(std::io::Error),
    /// More words were queued for transmission than fit in one frame.
    FrameTooLarge { words: usize, max: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Bind(e) => write!(f, "failed to bind broadcast socket: {e}"),
            Error::Send(e) => write!(f, "failed to send UDP frame: {e}"),
            Error::FrameTooLarge { words, max } => {
                write!(f, "frame of {words} words exceeds the {max}-word limit")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Bind(e) | Error::Send(e) => Some(e),
            Error::FrameTooLarge { .. } => None,
        }
    }
}
