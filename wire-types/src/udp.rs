//! UDP header, which is present after the IP header.
//!
//!   0                   1                   2                   3
//!   0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//!  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!  |          Source Port          |       Destination Port        |
//!  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!  |          PDU Length           |           Checksum            |
//!  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!
//! This module represents the User Datagram Protocol (UDP) header as defined
//! in RFC 768. The header is 8 bytes long; all fields are stored in network
//! byte order.

pub const UDP_LEN: usize = 8;

/// Source port field (16 bits).
pub type SrcPort = [u8; 2];
/// Destination port field (16 bits).
pub type DstPort = [u8; 2];
/// Length field (16 bits).
pub type Len = [u8; 2];

/// Returns the source port from network byte order.
#[inline]
pub fn src_port(src: SrcPort) -> u16 {
    u16::from_be_bytes(src)
}

/// Returns the destination port from network byte order.
#[inline]
pub fn dst_port(dst: DstPort) -> u16 {
    u16::from_be_bytes(dst)
}

/// Returns the length of the UDP datagram (header + payload) in bytes.
#[inline]
pub fn len(len: Len) -> u16 {
    u16::from_be_bytes(len)
}
