//! TCP header, which is present after the IP header.
//!
//!    0                   1                   2                   3
//!    0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//!   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!   |          Source Port          |       Destination Port        |
//!   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!   |                        Sequence Number                        |
//!   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!   |                    Acknowledgment Number                      |
//!   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!   |  Data |     |N|C|E|U|A|P|R|S|F|                               |
//!   | Offset| Rsrv|S|R|C|R|C|S|S|Y|I|            Window             |
//!   |       |     | |W|E|G|K|H|T|N|N|                               |
//!   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!   |           Checksum            |         Urgent Pointer        |
//!   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!   |                            Options                            |
//!   /                              ...                              /
//!   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!
//! This module represents the Transmission Control Protocol (TCP) header as
//! defined in RFC 793. All fields are stored in network byte order.

/// The length of the TCP header base structure.
pub const TCP_LEN: usize = 20;

/// Source port field (16 bits).
pub type SrcPort = [u8; 2];
/// Destination port field (16 bits).
pub type DstPort = [u8; 2];
/// Combined field: Data offset (4 bits), Reserved (4 bits).
pub type OffRes = u8;
/// Flags field (low 8 bits of the offset/flags word).
pub type Flags = u8;

/// TCP flag masks
pub const TCP_FLAG_FIN: u8 = 0x01;
pub const TCP_FLAG_SYN: u8 = 0x02;
pub const TCP_FLAG_RST: u8 = 0x04;
pub const TCP_FLAG_PSH: u8 = 0x08;
pub const TCP_FLAG_ACK: u8 = 0x10;
pub const TCP_FLAG_URG: u8 = 0x20;

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

/// Returns the TCP header length in bytes from the data-offset field.
#[inline]
pub fn header_len(off_res: OffRes) -> usize {
    ((off_res >> 4) as usize) << 2
}
