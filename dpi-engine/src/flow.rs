//! Flow identity and per-flow state.
//!
//! A flow is a bidirectional conversation identified by its canonical
//! 5-tuple. Canonicalization orders the two endpoints so both directions of
//! the conversation produce the same [`FlowKey`]; the direction of an
//! individual packet is recovered as a [`FlowDirection`] bit.

use std::net::Ipv4Addr;

use wire_types::ip::IpProto;
use wire_types::tcp::{TCP_FLAG_FIN, TCP_FLAG_RST};

use crate::classify::AppLabel;

/// Direction-independent 5-tuple. Invariant: `(addr_a, port_a)` is the
/// numerically smaller endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowKey {
    pub proto: IpProto,
    pub addr_a: Ipv4Addr,
    pub port_a: u16,
    pub addr_b: Ipv4Addr,
    pub port_b: u16,
}

/// Which side of the canonical key a packet was sent from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowDirection {
    /// From the A (smaller) endpoint toward B.
    AToB,
    /// From the B endpoint toward A.
    BToA,
}

impl FlowKey {
    /// Builds the canonical key for a packet and reports which direction the
    /// packet travels. Endpoints compare as 48-bit `(ip, port)` integers, so
    /// the ordering is total and stable under byte-order conversion.
    pub fn canonical(
        src_ip: Ipv4Addr,
        src_port: u16,
        dst_ip: Ipv4Addr,
        dst_port: u16,
        proto: IpProto,
    ) -> (Self, FlowDirection) {
        let src = endpoint_ord(src_ip, src_port);
        let dst = endpoint_ord(dst_ip, dst_port);

        if src <= dst {
            (
                Self {
                    proto,
                    addr_a: src_ip,
                    port_a: src_port,
                    addr_b: dst_ip,
                    port_b: dst_port,
                },
                FlowDirection::AToB,
            )
        } else {
            (
                Self {
                    proto,
                    addr_a: dst_ip,
                    port_a: dst_port,
                    addr_b: src_ip,
                    port_b: src_port,
                },
                FlowDirection::BToA,
            )
        }
    }

    /// True if `ip` is one of the flow's endpoints.
    pub fn has_endpoint(&self, ip: Ipv4Addr) -> bool {
        self.addr_a == ip || self.addr_b == ip
    }
}

#[inline]
fn endpoint_ord(ip: Ipv4Addr, port: u16) -> u64 {
    (u64::from(u32::from(ip)) << 16) | u64::from(port)
}

impl std::fmt::Display for FlowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{} <-> {}:{} ({})",
            self.addr_a,
            self.port_a,
            self.addr_b,
            self.port_b,
            self.proto.as_str()
        )
    }
}

/// Block/forward decision for a flow. Transitions are monotonic:
/// `Pending -> Forward | Block`, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verdict {
    #[default]
    Pending,
    Forward,
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassificationState {
    #[default]
    NeedsL7,
    Classified,
}

/// State for one tracked flow, owned by exactly one worker shard.
#[derive(Debug, Clone)]
pub struct FlowState {
    pub key: FlowKey,
    /// Capture timestamps in microseconds.
    pub first_seen: u64,
    pub last_seen: u64,
    pub packets_ab: u64,
    pub packets_ba: u64,
    pub bytes_ab: u64,
    pub bytes_ba: u64,
    /// Cumulative TCP flags observed in either direction.
    pub tcp_flags: u8,
    /// Set at most once, by the first successful ClientHello parse.
    pub sni: Option<String>,
    /// Set at most once, by the first parsed request's Host header.
    pub http_host: Option<String>,
    pub app: AppLabel,
    pub verdict: Verdict,
    /// Latches at `Classified` after the first extraction attempt, successful
    /// or not; L7 inspection never runs twice on a flow.
    pub state: ClassificationState,
}

impl FlowState {
    pub fn new(key: FlowKey, ts: u64) -> Self {
        Self {
            key,
            first_seen: ts,
            last_seen: ts,
            packets_ab: 0,
            packets_ba: 0,
            bytes_ab: 0,
            bytes_ba: 0,
            tcp_flags: 0,
            sni: None,
            http_host: None,
            app: AppLabel::Unknown,
            verdict: Verdict::Pending,
            state: ClassificationState::NeedsL7,
        }
    }

    /// Folds one packet into the per-direction counters.
    pub fn record(&mut self, dir: FlowDirection, bytes: u64, tcp_flags: u8, ts: u64) {
        match dir {
            FlowDirection::AToB => {
                self.packets_ab += 1;
                self.bytes_ab += bytes;
            }
            FlowDirection::BToA => {
                self.packets_ba += 1;
                self.bytes_ba += bytes;
            }
        }
        self.tcp_flags |= tcp_flags;
        self.last_seen = self.last_seen.max(ts);
    }

    pub fn packets_total(&self) -> u64 {
        self.packets_ab + self.packets_ba
    }

    /// True once FIN or RST has been seen in either direction.
    pub fn saw_teardown(&self) -> bool {
        self.tcp_flags & (TCP_FLAG_FIN | TCP_FLAG_RST) != 0
    }

    /// Write-once setter; a second assignment is ignored.
    pub fn set_sni(&mut self, sni: String) {
        if self.sni.is_none() {
            self.sni = Some(sni);
        }
    }

    /// Write-once setter; a second assignment is ignored.
    pub fn set_http_host(&mut self, host: String) {
        if self.http_host.is_none() {
            self.http_host = Some(host);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IP1: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
    const IP2: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 7);

    #[test]
    fn both_directions_share_a_key() {
        let (k1, d1) = FlowKey::canonical(IP1, 40000, IP2, 443, IpProto::Tcp);
        let (k2, d2) = FlowKey::canonical(IP2, 443, IP1, 40000, IpProto::Tcp);
        assert_eq!(k1, k2);
        assert_ne!(d1, d2);
        assert_eq!(d1, FlowDirection::AToB);
        assert_eq!(d2, FlowDirection::BToA);
    }

    #[test]
    fn same_ip_orders_by_port() {
        let (k, dir) = FlowKey::canonical(IP1, 9000, IP1, 80, IpProto::Tcp);
        assert_eq!(k.port_a, 80);
        assert_eq!(k.port_b, 9000);
        assert_eq!(dir, FlowDirection::BToA);
    }

    #[test]
    fn direction_counters() {
        let (key, _) = FlowKey::canonical(IP1, 1234, IP2, 80, IpProto::Tcp);
        let mut flow = FlowState::new(key, 1_000_000);
        flow.record(FlowDirection::AToB, 100, 0x02, 1_000_000);
        flow.record(FlowDirection::BToA, 60, 0x12, 1_001_000);
        flow.record(FlowDirection::AToB, 40, 0x10, 1_002_000);
        assert_eq!(flow.packets_ab, 2);
        assert_eq!(flow.packets_ba, 1);
        assert_eq!(flow.bytes_ab, 140);
        assert_eq!(flow.bytes_ba, 60);
        assert_eq!(flow.packets_total(), 3);
        assert_eq!(flow.last_seen, 1_002_000);
        assert!(!flow.saw_teardown());
        flow.record(FlowDirection::AToB, 0, TCP_FLAG_FIN, 1_003_000);
        assert!(flow.saw_teardown());
    }

    #[test]
    fn sni_is_write_once() {
        let (key, _) = FlowKey::canonical(IP1, 1, IP2, 443, IpProto::Tcp);
        let mut flow = FlowState::new(key, 0);
        flow.set_sni("first.example".into());
        flow.set_sni("second.example".into());
        assert_eq!(flow.sni.as_deref(), Some("first.example"));
    }

    #[test]
    fn has_endpoint() {
        let (key, _) = FlowKey::canonical(IP1, 1, IP2, 2, IpProto::Udp);
        assert!(key.has_endpoint(IP1));
        assert!(key.has_endpoint(IP2));
        assert!(!key.has_endpoint(Ipv4Addr::new(8, 8, 8, 8)));
    }
}
