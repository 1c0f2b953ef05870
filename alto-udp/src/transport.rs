//! Length-framed UDP broadcast transport standing in for the emulator's
//! Ethernet controller. One background receive thread feeds a shared ring
//! of decoded frames; `send` broadcasts directly from the caller's thread.

use std::collections::VecDeque;
use std::net::UdpSocket;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::error::Error;

/// Port the transport binds to and broadcasts on.
pub const UDP_PORT: u16 = 42424;
/// Largest word count a single frame may declare.
pub const MAX_FRAME_WORDS: usize = 510;
/// How many decoded frames the ring will hold before dropping new arrivals.
pub const UDP_RING_BUFFER_SIZE: usize = 256;

const RECV_TIMEOUT: Duration = Duration::from_micros(10);
const BROADCAST_ADDR: &str = "255.255.255.255";

struct RingState {
    frames: VecDeque<Vec<u16>>,
    cursor: usize,
    rx_enable: bool,
    running: bool,
}

impl RingState {
    fn new() -> Self {
        Self { frames: VecDeque::new(), cursor: 0, rx_enable: true, running: true }
    }
}

/// A running UDP broadcast transport.
pub struct Transport {
    socket: UdpSocket,
    state: Arc<Mutex<RingState>>,
    thread: Option<JoinHandle<()>>,
}

impl Transport {
    /// Bind the broadcast socket and start the background receive thread.
    pub fn new() -> Result<Self, Error> {
        Self::bind(("0.0.0.0", UDP_PORT))
    }

    fn bind(addr: impl std::net::ToSocketAddrs) -> Result<Self, Error> {
        let socket = UdpSocket::bind(addr).map_err(Error::Bind)?;
        socket.set_broadcast(true).map_err(Error::Bind)?;
        socket.set_read_timeout(Some(RECV_TIMEOUT)).map_err(Error::Bind)?;

        let state = Arc::new(Mutex::new(RingState::new()));
        let recv_socket = socket.try_clone().map_err(Error::Bind)?;
        let recv_state = Arc::clone(&state);
        let thread = std::thread::spawn(move || receive_loop(recv_socket, recv_state));

        Ok(Self { socket, state, thread: Some(thread) })
    }

    /// Broadcast a frame of up to `MAX_FRAME_WORDS` words.
    pub fn send(&self, words: &[u16]) -> Result<(), Error> {
        if words.len() > MAX_FRAME_WORDS {
            return Err(Error::FrameTooLarge { words: words.len(), max: MAX_FRAME_WORDS });
        }
        let mut buf = Vec::with_capacity(2 + words.len() * 2);
        buf.extend_from_slice(&(words.len() as u16).to_be_bytes());
        for w in words {
            buf.extend_from_slice(&w.to_be_bytes());
        }
        self.socket
            .send_to(&buf, (BROADCAST_ADDR, UDP_PORT))
            .map_err(Error::Send)?;
        Ok(())
    }

    /// Enable or disable acceptance of incoming frames. Frames arriving
    /// while disabled are dropped by the receive thread.
    pub fn set_rx_enable(&self, enable: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.rx_enable = enable;
        }
    }

    /// Byte length of the next frame still to be drained, including its
    /// 2-byte length prefix. Zero if nothing is queued.
    #[must_use]
    pub fn rx_len(&self) -> usize {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match state.frames.front() {
            Some(frame) => 2 + (frame.len() - state.cursor) * 2,
            None => 0,
        }
    }

    /// Pop the next word of the frame currently being drained. Returns
    /// zero once the frame (or queue) is exhausted.
    pub fn get_rx_word(&self) -> u16 {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let Some(frame) = state.frames.front() else { return 0 };
        if state.cursor >= frame.len() {
            return 0;
        }
        let word = frame[state.cursor];
        state.cursor += 1;
        if state.cursor == frame.len() {
            state.frames.pop_front();
            state.cursor = 0;
        }
        word
    }

    /// Pop an entire frame at once, bypassing the word-at-a-time cursor.
    pub fn recv_frame(&self) -> Option<Vec<u16>> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.cursor != 0 {
            return None; // a partial drain via get_rx_word is in progress
        }
        state.frames.pop_front()
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.running = false;
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn receive_loop(socket: UdpSocket, state: Arc<Mutex<RingState>>) {
    let mut buf = [0u8; 2 + MAX_FRAME_WORDS * 2 + 64];
    loop {
        if !state.lock().map(|s| s.running).unwrap_or(false) {
            return;
        }
        let n = match socket.recv_from(&mut buf) {
            Ok((n, _addr)) => n,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => {
                continue;
            }
            Err(_) => continue,
        };
        if n < 2 || n % 2 != 0 {
            return; // malformed frame: fatal to the receive thread only
        }
        let declared_words = usize::from(u16::from_be_bytes([buf[0], buf[1]]));
        if declared_words > MAX_FRAME_WORDS {
            return;
        }
        let required = 2 + declared_words * 2;
        if n < required {
            continue; // truncated packet, silently dropped
        }
        let mut guard = match state.lock() {
            Ok(g) => g,
            Err(_) => return,
        };
        if !guard.rx_enable {
            continue;
        }
        if guard.frames.len() >= UDP_RING_BUFFER_SIZE {
            continue; // ring full, drop
        }
        let words: Vec<u16> = buf[2..required]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        guard.frames.push_back(words);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback_transport() -> Transport {
        Transport::bind(("127.0.0.1", 0)).expect("bind loopback transport")
    }

    #[test]
    fn send_builds_big_endian_length_prefixed_frame() {
        let transport = loopback_transport();
        let err = transport.send(&vec![0u16; MAX_FRAME_WORDS + 1]).unwrap_err();
        matches!(err, Error::FrameTooLarge { .. });
    }

    #[test]
    fn empty_ring_yields_zero_and_no_length() {
        let transport = loopback_transport();
        assert_eq!(transport.rx_len(), 0);
        assert_eq!(transport.get_rx_word(), 0);
    }

    #[test]
    fn injected_frame_drains_words_then_zero() {
        let transport = loopback_transport();
        {
            let mut state = transport.state.lock().unwrap();
            state.frames.push_back(vec![1, 2, 3]);
        }
        assert_eq!(transport.rx_len(), 8);
        assert_eq!(transport.get_rx_word(), 1);
        assert_eq!(transport.get_rx_word(), 2);
        assert_eq!(transport.get_rx_word(), 3);
        assert_eq!(transport.get_rx_word(), 0);
        assert_eq!(transport.rx_len(), 0);
    }

    #[test]
    fn rx_disable_is_recorded() {
        let transport = Transport::new().expect("bind loopback transport");
        transport.set_rx_enable(false);
        assert!(!transport.state.lock().unwrap().rx_enable);
    }
}
