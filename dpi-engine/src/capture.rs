//! Classic-pcap capture file framing.
//!
//! The reader tolerates both file endiannesses; the writer emits the host's
//! native byte order. Record payloads, timestamps and original lengths pass
//! through the engine untouched.

pub mod reader;
pub mod writer;

use thiserror::Error;

/// Capture-level timestamp, seconds + microseconds as stored on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketTs {
    pub sec: u32,
    pub usec: u32,
}

impl PacketTs {
    /// Microseconds since the epoch, for idle-horizon arithmetic.
    #[inline]
    pub fn as_micros(self) -> u64 {
        u64::from(self.sec) * 1_000_000 + u64::from(self.usec)
    }
}

/// One captured record as stored in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub ts: PacketTs,
    /// Original on-the-wire length, which may exceed the captured bytes.
    pub orig_len: u32,
    pub data: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("bad magic number {0:#010x}")]
    BadMagic(u32),
    #[error("truncated global header")]
    TruncatedHeader,
    #[error("unsupported link type {0} (expected 1 = Ethernet)")]
    BadLinkType(u32),
    #[error("truncated record (header or body cut short)")]
    TruncatedRecord,
    #[error("record length {0} exceeds sanity cap")]
    OversizedRecord(u32),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
