//! Packet parsing types for dissection of captured frames.

use std::net::Ipv4Addr;

use thiserror::Error;
use wire_types::ip::IpProto;

use crate::packet::cursor::CursorError;

/// A non-owning view over one dissected frame.
///
/// The L7 payload is described as an offset/length pair into the original
/// frame so the view can travel alongside the owned bytes without copying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedPacket {
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub src_port: u16,
    pub dst_port: u16,
    pub proto: IpProto,
    /// TCP flags byte; zero for UDP.
    pub tcp_flags: u8,
    /// Offset of the L7 payload within the original frame.
    pub payload_off: usize,
    /// Length of the L7 payload.
    pub payload_len: usize,
}

impl ParsedPacket {
    /// Borrows the L7 payload out of the frame this view was parsed from.
    pub fn payload<'a>(&self, frame: &'a [u8]) -> &'a [u8] {
        &frame[self.payload_off..self.payload_off + self.payload_len]
    }
}

/// Per-packet dissection errors. All are soft: the packet bypasses flow
/// tracking and is forwarded as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("frame truncated")]
    Truncated,
    #[error("malformed header")]
    MalformedHeader,
    #[error("fragmented packet")]
    FragmentedUnsupported,
    #[error("unsupported ethertype {0:#06x}")]
    UnsupportedEthertype(u16),
    #[error("unsupported L3 protocol")]
    UnsupportedL3,
    #[error("unsupported L4 protocol {0}")]
    UnsupportedL4(u8),
}

impl From<CursorError> for ParseError {
    fn from(_: CursorError) -> Self {
        ParseError::Truncated
    }
}
