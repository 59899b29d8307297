//! Frame dissection: Ethernet II (optionally one 802.1Q tag) -> IPv4 -> TCP/UDP.
//!
//! The parser never copies payload bytes; the returned [`ParsedPacket`] is a
//! view of offsets into the original frame. All reads go through the bounded
//! [`Cursor`], so a lying length field surfaces as [`ParseError::Truncated`]
//! or [`ParseError::MalformedHeader`], never as an out-of-bounds access.

use wire_types::{
    eth::{self, EtherType},
    ip::{IpProto, ipv4},
    tcp, udp,
};

use crate::packet::{
    cursor::Cursor,
    types::{ParseError, ParsedPacket},
};

/// Dissects one link-layer frame.
pub fn parse_frame(frame: &[u8]) -> Result<ParsedPacket, ParseError> {
    let mut cur = Cursor::new(frame);

    let ether_type = parse_ethernet(&mut cur)?;
    match ether_type {
        EtherType::Ipv4 => {}
        EtherType::Ipv6 => return Err(ParseError::UnsupportedL3),
        other => return Err(ParseError::UnsupportedEthertype(other.into())),
    }

    parse_ipv4(frame, cur)
}

/// Reads the Ethernet header, skipping at most one 802.1Q tag, and returns
/// the EtherType of the L3 payload.
fn parse_ethernet(cur: &mut Cursor<'_>) -> Result<EtherType, ParseError> {
    cur.skip(eth::ETH_LEN - 2)?; // dst mac + src mac
    let mut raw = cur.read_u16_be()?;

    if raw == u16::from(EtherType::Ieee8021q) {
        // Single VLAN tag: TCI then the real EtherType.
        cur.skip(2)?;
        raw = cur.read_u16_be()?;
        if raw == u16::from(EtherType::Ieee8021q) || raw == u16::from(EtherType::Ieee8021ad) {
            // Double-tagged frames are not dissected.
            return Err(ParseError::UnsupportedEthertype(raw));
        }
    }

    EtherType::try_from(raw).map_err(ParseError::UnsupportedEthertype)
}

fn parse_ipv4(frame: &[u8], mut cur: Cursor<'_>) -> Result<ParsedPacket, ParseError> {
    let ip_start = cur.offset();

    let vihl = cur.read_u8()?;
    if ipv4::version(vihl) != 4 {
        return Err(ParseError::MalformedHeader);
    }
    let ihl = ipv4::ihl_bytes(vihl);
    if ihl < ipv4::IPV4_LEN {
        return Err(ParseError::MalformedHeader);
    }

    cur.skip(1)?; // dscp/ecn
    let tot_len = ipv4::tot_len(cur.read_array()?) as usize;
    cur.skip(2)?; // identification
    let fragment: ipv4::Fragment = cur.read_array()?;
    cur.skip(1)?; // ttl
    let proto_raw = cur.read_u8()?;
    cur.skip(2)?; // checksum
    let src_ip = ipv4::src_addr(cur.read_array()?);
    let dst_ip = ipv4::dst_addr(cur.read_array()?);

    // The header (incl. options) and the advertised total length must both
    // fit inside the captured frame.
    let frame_remaining = frame.len() - ip_start;
    if tot_len < ihl || tot_len > frame_remaining {
        return Err(ParseError::MalformedHeader);
    }
    if ipv4::is_fragment(fragment) {
        return Err(ParseError::FragmentedUnsupported);
    }

    let proto = IpProto::try_from(proto_raw).map_err(ParseError::UnsupportedL4)?;

    // Re-bound the cursor to the IP packet: options and L4 must stay inside
    // tot_len even when the frame carries trailing padding.
    let mut l4 = Cursor::new(&frame[ip_start..ip_start + tot_len]);
    l4.skip(ihl)?;

    match proto {
        IpProto::Tcp => parse_tcp(ip_start, ihl, tot_len, src_ip, dst_ip, l4),
        IpProto::Udp => parse_udp(ip_start, ihl, tot_len, src_ip, dst_ip, l4),
        IpProto::Icmp => Err(ParseError::UnsupportedL4(proto.into())),
    }
}

fn parse_tcp(
    ip_start: usize,
    ihl: usize,
    tot_len: usize,
    src_ip: std::net::Ipv4Addr,
    dst_ip: std::net::Ipv4Addr,
    mut cur: Cursor<'_>,
) -> Result<ParsedPacket, ParseError> {
    let src_port = tcp::src_port(cur.read_array()?);
    let dst_port = tcp::dst_port(cur.read_array()?);
    cur.skip(8)?; // seq + ack
    let header_len = tcp::header_len(cur.read_u8()?);
    let flags = cur.read_u8()?;

    if header_len < tcp::TCP_LEN || ihl + header_len > tot_len {
        return Err(ParseError::MalformedHeader);
    }

    Ok(ParsedPacket {
        src_ip,
        dst_ip,
        src_port,
        dst_port,
        proto: IpProto::Tcp,
        tcp_flags: flags,
        payload_off: ip_start + ihl + header_len,
        payload_len: tot_len - ihl - header_len,
    })
}

fn parse_udp(
    ip_start: usize,
    ihl: usize,
    tot_len: usize,
    src_ip: std::net::Ipv4Addr,
    dst_ip: std::net::Ipv4Addr,
    mut cur: Cursor<'_>,
) -> Result<ParsedPacket, ParseError> {
    let src_port = udp::src_port(cur.read_array()?);
    let dst_port = udp::dst_port(cur.read_array()?);
    cur.skip(4)?; // length + checksum

    if ihl + udp::UDP_LEN > tot_len {
        return Err(ParseError::MalformedHeader);
    }

    Ok(ParsedPacket {
        src_ip,
        dst_ip,
        src_port,
        dst_port,
        proto: IpProto::Udp,
        tcp_flags: 0,
        payload_off: ip_start + ihl + udp::UDP_LEN,
        payload_len: tot_len - ihl - udp::UDP_LEN,
    })
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    fn ipv4_frame(proto: u8, l4: &[u8]) -> Vec<u8> {
        ipv4_frame_with(proto, l4, |_| {})
    }

    /// Builds a minimal Ethernet/IPv4 frame and lets the caller patch the IP
    /// header before it is emitted.
    fn ipv4_frame_with(proto: u8, l4: &[u8], patch: impl FnOnce(&mut [u8; 20])) -> Vec<u8> {
        let mut frame = Vec::new();
        frame.extend_from_slice(&[0x02; 6]); // dst mac
        frame.extend_from_slice(&[0x04; 6]); // src mac
        frame.extend_from_slice(&0x0800u16.to_be_bytes());

        let tot_len = (20 + l4.len()) as u16;
        let mut ip = [0u8; 20];
        ip[0] = 0x45;
        ip[2..4].copy_from_slice(&tot_len.to_be_bytes());
        ip[8] = 64; // ttl
        ip[9] = proto;
        ip[12..16].copy_from_slice(&[10, 0, 0, 1]);
        ip[16..20].copy_from_slice(&[10, 0, 0, 2]);
        patch(&mut ip);
        frame.extend_from_slice(&ip);
        frame.extend_from_slice(l4);
        frame
    }

    fn tcp_header(src: u16, dst: u16, flags: u8, payload: &[u8]) -> Vec<u8> {
        let mut seg = Vec::new();
        seg.extend_from_slice(&src.to_be_bytes());
        seg.extend_from_slice(&dst.to_be_bytes());
        seg.extend_from_slice(&[0u8; 8]); // seq + ack
        seg.push(0x50); // data offset 5
        seg.push(flags);
        seg.extend_from_slice(&[0u8; 4]); // window + checksum start
        seg.extend_from_slice(&[0u8; 2]); // urgent
        seg.extend_from_slice(payload);
        seg
    }

    #[test]
    fn parses_plain_tcp() {
        let frame = ipv4_frame(6, &tcp_header(40000, 443, 0x18, b"hello"));
        let parsed = parse_frame(&frame).unwrap();
        assert_eq!(parsed.src_ip, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(parsed.dst_ip, Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!((parsed.src_port, parsed.dst_port), (40000, 443));
        assert_eq!(parsed.proto, IpProto::Tcp);
        assert_eq!(parsed.tcp_flags, 0x18);
        assert_eq!(parsed.payload(&frame), b"hello");
    }

    #[test]
    fn parses_udp() {
        let mut dgram = Vec::new();
        dgram.extend_from_slice(&53000u16.to_be_bytes());
        dgram.extend_from_slice(&53u16.to_be_bytes());
        dgram.extend_from_slice(&12u16.to_be_bytes()); // len
        dgram.extend_from_slice(&[0, 0]); // checksum
        dgram.extend_from_slice(b"quiz");
        let frame = ipv4_frame(17, &dgram);
        let parsed = parse_frame(&frame).unwrap();
        assert_eq!(parsed.proto, IpProto::Udp);
        assert_eq!((parsed.src_port, parsed.dst_port), (53000, 53));
        assert_eq!(parsed.payload(&frame), b"quiz");
    }

    #[test]
    fn parses_single_vlan_tag() {
        let inner = ipv4_frame(6, &tcp_header(1234, 80, 0x02, b""));
        // Splice a VLAN tag between the MACs and the EtherType.
        let mut frame = inner[..12].to_vec();
        frame.extend_from_slice(&0x8100u16.to_be_bytes());
        frame.extend_from_slice(&[0x00, 0x64]); // TCI, VLAN 100
        frame.extend_from_slice(&inner[12..]);
        let parsed = parse_frame(&frame).unwrap();
        assert_eq!(parsed.dst_port, 80);
    }

    #[test]
    fn rejects_double_tag() {
        let mut frame = vec![0u8; 12];
        frame.extend_from_slice(&0x8100u16.to_be_bytes());
        frame.extend_from_slice(&[0x00, 0x64]);
        frame.extend_from_slice(&0x8100u16.to_be_bytes());
        frame.extend_from_slice(&[0x00, 0xC8]);
        frame.extend_from_slice(&0x0800u16.to_be_bytes());
        frame.resize(frame.len() + 40, 0);
        assert_eq!(
            parse_frame(&frame),
            Err(ParseError::UnsupportedEthertype(0x8100))
        );
    }

    #[test]
    fn rejects_arp_and_ipv6() {
        let mut arp = vec![0u8; 12];
        arp.extend_from_slice(&0x0806u16.to_be_bytes());
        arp.resize(60, 0);
        assert_eq!(
            parse_frame(&arp),
            Err(ParseError::UnsupportedEthertype(0x0806))
        );

        let mut v6 = vec![0u8; 12];
        v6.extend_from_slice(&0x86DDu16.to_be_bytes());
        v6.resize(60, 0);
        assert_eq!(parse_frame(&v6), Err(ParseError::UnsupportedL3));
    }

    #[test]
    fn rejects_fragment() {
        let frame = ipv4_frame_with(6, &tcp_header(1, 2, 0, b""), |ip| {
            ip[6] = 0x20; // MF set
        });
        assert_eq!(parse_frame(&frame), Err(ParseError::FragmentedUnsupported));

        let frame = ipv4_frame_with(6, &tcp_header(1, 2, 0, b""), |ip| {
            ip[7] = 0x08; // offset 8
        });
        assert_eq!(parse_frame(&frame), Err(ParseError::FragmentedUnsupported));
    }

    #[test]
    fn rejects_bad_ihl_and_lying_total_len() {
        let frame = ipv4_frame_with(6, &tcp_header(1, 2, 0, b""), |ip| {
            ip[0] = 0x44; // IHL 4 < 5
        });
        assert_eq!(parse_frame(&frame), Err(ParseError::MalformedHeader));

        let frame = ipv4_frame_with(6, &tcp_header(1, 2, 0, b""), |ip| {
            // total length larger than the captured frame
            ip[2..4].copy_from_slice(&2000u16.to_be_bytes());
        });
        assert_eq!(parse_frame(&frame), Err(ParseError::MalformedHeader));
    }

    #[test]
    fn rejects_truncated_tcp_header() {
        // IP total length admits only 10 bytes of TCP.
        let seg = &tcp_header(1, 2, 0, b"")[..10];
        let frame = ipv4_frame(6, seg);
        assert_eq!(parse_frame(&frame), Err(ParseError::Truncated));
    }

    #[test]
    fn rejects_unsupported_l4() {
        let frame = ipv4_frame(47, &[0u8; 8]); // GRE
        assert_eq!(parse_frame(&frame), Err(ParseError::UnsupportedL4(47)));
    }

    #[test]
    fn truncated_ethernet() {
        assert_eq!(parse_frame(&[0u8; 10]), Err(ParseError::Truncated));
    }

    #[test]
    fn frame_padding_is_ignored() {
        // 60-byte minimum Ethernet frame with trailing zero padding after a
        // 40-byte IP packet; payload length must come from tot_len.
        let mut frame = ipv4_frame(6, &tcp_header(5555, 443, 0x10, b""));
        frame.resize(60, 0);
        let parsed = parse_frame(&frame).unwrap();
        assert_eq!(parsed.payload_len, 0);
    }
}
