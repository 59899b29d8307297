//! Ethernet header, which appears at the beginning of every Ethernet II frame.
//!
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//!  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!  |                     destination_mac_addr                      |
//!  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!  | destination_mac_addr (con't)  |        source_mac_addr        |
//!  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!  |                    source_mac_addr (con't)                    |
//!  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!  |           eth_type            |
//!  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!
//! An optional 802.1Q tag sits between the source MAC and the EtherType; it
//! carries a 2-byte TCI followed by the real EtherType of the payload.

/// The length of the Ethernet header.
pub const ETH_LEN: usize = 14;

/// The length of one 802.1Q VLAN tag (TCI + inner EtherType).
pub const VLAN_TAG_LEN: usize = 4;

/// Destination MAC address.
pub type DstMacAddr = [u8; 6];

/// Source MAC address.
pub type SrcMacAddr = [u8; 6];

/// EtherType field (16 bits, network byte order).
pub type EthType = [u8; 2];

/// Returns the EtherType from network byte order.
#[inline]
pub fn eth_type(raw: EthType) -> u16 {
    u16::from_be_bytes(raw)
}

/// Protocol which is encapsulated in the payload of the Ethernet frame.
/// These values represent the standard IEEE assigned protocol numbers.
#[repr(u16)]
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum EtherType {
    Ipv4 = 0x0800,
    Arp = 0x0806,
    Ieee8021q = 0x8100,
    Ipv6 = 0x86DD,
    Ieee8021ad = 0x88A8,
}

// This allows converting a u16 value into an EtherType enum variant.
// This is useful when parsing headers.
impl TryFrom<u16> for EtherType {
    type Error = u16; // Return the unknown value itself as the error

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0x0800 => Ok(EtherType::Ipv4),
            0x0806 => Ok(EtherType::Arp),
            0x8100 => Ok(EtherType::Ieee8021q),
            0x86DD => Ok(EtherType::Ipv6),
            0x88A8 => Ok(EtherType::Ieee8021ad),
            _ => Err(value),
        }
    }
}

impl From<EtherType> for u16 {
    fn from(ether_type: EtherType) -> Self {
        ether_type as u16
    }
}

impl EtherType {
    /// Returns a human-readable string representation of the EtherType.
    pub fn as_str(self) -> &'static str {
        match self {
            EtherType::Ipv4 => "ipv4",
            EtherType::Arp => "arp",
            EtherType::Ieee8021q => "vlan",
            EtherType::Ipv6 => "ipv6",
            EtherType::Ieee8021ad => "qinq",
        }
    }
}
