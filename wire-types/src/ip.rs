//! IPv4 header, which is present after the Ethernet header.
//!
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |ip_ver | h_len |  ip_dscp  |ecn|        ip_total_length        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |       ip_identification       |flags|   ip_fragment_offset    |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |    ip_ttl     |  ip_protocol  |          ip_checksum          |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                         source_ipaddr                         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                      destination_ipaddr                       |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                          ip_options                           |
//! /                              ...                              /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+

/// Transport protocol carried in the IPv4 `protocol` field.
/// These values represent the standard IANA assigned protocol numbers.
#[repr(u8)]
#[derive(PartialEq, Eq, Hash, Debug, Copy, Clone)]
pub enum IpProto {
    /// Internet Control Message
    Icmp = 1,
    /// Transmission Control
    Tcp = 6,
    /// User Datagram
    Udp = 17,
}

impl TryFrom<u8> for IpProto {
    type Error = u8; // Return the unknown value itself as the error

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(IpProto::Icmp),
            6 => Ok(IpProto::Tcp),
            17 => Ok(IpProto::Udp),
            _ => Err(value),
        }
    }
}

impl From<IpProto> for u8 {
    fn from(proto: IpProto) -> Self {
        proto as u8
    }
}

impl IpProto {
    /// Returns a human-readable string representation of the protocol.
    pub fn as_str(self) -> &'static str {
        match self {
            IpProto::Icmp => "icmp",
            IpProto::Tcp => "tcp",
            IpProto::Udp => "udp",
        }
    }
}

pub mod ipv4 {
    /// The length of the IPv4 header without options.
    pub const IPV4_LEN: usize = 20;

    /// Minimum value of the IHL field (header length in 32-bit words).
    pub const MIN_IHL: u8 = 5;

    pub type Vihl = u8;
    pub type DscpEcn = u8;
    pub type TotalLen = [u8; 2];
    pub type Fragment = [u8; 2];
    pub type SrcAddr = [u8; 4];
    pub type DstAddr = [u8; 4];

    /// "More fragments" bit within the flags/fragment-offset word.
    pub const FRAG_MF: u16 = 0x2000;

    /// Returns the IP version field (should be 4).
    #[inline]
    pub fn version(vihl: Vihl) -> u8 {
        (vihl >> 4) & 0xF
    }

    /// Returns the IP header length in bytes.
    #[inline]
    pub fn ihl_bytes(vihl: Vihl) -> usize {
        ((vihl & 0xF) as usize) << 2
    }

    /// Returns the total length of the IP packet (header + payload).
    #[inline]
    pub fn tot_len(total_len: TotalLen) -> u16 {
        u16::from_be_bytes(total_len)
    }

    /// Returns true if the packet is a fragment (MF set or non-zero offset).
    #[inline]
    pub fn is_fragment(fragment: Fragment) -> bool {
        let word = u16::from_be_bytes(fragment);
        word & FRAG_MF != 0 || word & 0x1FFF != 0
    }

    /// Returns the source address field.
    #[inline]
    pub fn src_addr(src_addr: SrcAddr) -> core::net::Ipv4Addr {
        core::net::Ipv4Addr::from(src_addr)
    }

    /// Returns the destination address field.
    #[inline]
    pub fn dst_addr(dst_addr: DstAddr) -> core::net::Ipv4Addr {
        core::net::Ipv4Addr::from(dst_addr)
    }

    #[cfg(test)]
    mod test {
        use super::*;

        #[test]
        fn test_version_and_ihl() {
            // 0x45: version 4, IHL 5 (20 bytes)
            assert_eq!(version(0x45), 4);
            assert_eq!(ihl_bytes(0x45), 20);
            // 0x46: IHL 6 (24 bytes, one option word)
            assert_eq!(ihl_bytes(0x46), 24);
        }

        #[test]
        fn test_is_fragment() {
            // No flags, zero offset
            assert!(!is_fragment([0x00, 0x00]));
            // DF set, zero offset: not a fragment
            assert!(!is_fragment([0x40, 0x00]));
            // MF set
            assert!(is_fragment([0x20, 0x00]));
            // Non-zero offset
            assert!(is_fragment([0x00, 0x01]));
        }

        #[test]
        fn test_addrs() {
            assert_eq!(
                src_addr([10, 0, 0, 1]),
                core::net::Ipv4Addr::new(10, 0, 0, 1)
            );
            assert_eq!(
                dst_addr([192, 168, 1, 254]),
                core::net::Ipv4Addr::new(192, 168, 1, 254)
            );
        }
    }
}
