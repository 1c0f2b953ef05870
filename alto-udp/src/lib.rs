//! Length-framed UDP broadcast transport standing in for the emulator's
//! Ethernet controller, usable independently of the microengine crate.

pub mod error;
pub mod transport;

pub use error::Error;
pub use transport::{Transport, MAX_FRAME_WORDS, UDP_PORT, UDP_RING_BUFFER_SIZE};
