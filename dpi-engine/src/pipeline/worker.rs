//! Fast-path worker: flow tracking, L7 extraction, classification and policy
//! on a private shard. Nothing here takes a lock; the worker owns its table
//! for the lifetime of the run.

use std::sync::Arc;

use crossbeam::channel::{Receiver, Sender};
use tracing::{debug, trace};
use wire_types::ip::IpProto;

use crate::classify::{self, AppLabel};
use crate::flow::{ClassificationState, FlowState, Verdict};
use crate::flow_table::{FlowTable, FlowTableConf, TableStats};
use crate::l7::{http, tls};
use crate::packet::types::ParsedPacket;
use crate::pipeline::{Dispatched, OutAction, OutRecord};
use crate::rules::{self, RuleSet};
use crate::stats::L7Stats;

#[derive(Debug, Clone)]
pub struct WorkerStats {
    pub packets: u64,
    pub app_packets: [u64; AppLabel::ALL.len()],
    pub l7: L7Stats,
    pub table: TableStats,
}

pub fn run(
    id: usize,
    rx: Receiver<Dispatched>,
    writer: Sender<OutRecord>,
    rules: Arc<RuleSet>,
    table_conf: FlowTableConf,
    hasher: ahash::RandomState,
) -> WorkerStats {
    let mut table = FlowTable::new(table_conf, hasher);
    let mut packets: u64 = 0;
    let mut app_packets = [0u64; AppLabel::ALL.len()];
    let mut l7_stats = L7Stats::default();

    for d in rx.iter() {
        packets += 1;
        let ts = d.raw.ts.as_micros();

        if let Some(evicted) = table.make_room(&d.key) {
            release_flow(&mut app_packets, evicted);
        }
        for expired in table.sweep(ts) {
            release_flow(&mut app_packets, expired);
        }

        let (flow, created) = table.get_or_insert(d.key, ts);
        if created {
            trace!(event.name = "worker.flow_created", worker = id, flow = %d.key);
        }

        // The verdict the packet itself travels under. Classification on
        // this packet affects only the packets after it.
        let verdict_before = flow.verdict;

        flow.record(d.dir, d.raw.data.len() as u64, d.parsed.tcp_flags, ts);

        if flow.state == ClassificationState::NeedsL7 && d.parsed.payload_len > 0 {
            let payload = d.parsed.payload(&d.raw.data);
            inspect_payload(flow, &d.parsed, payload, &mut l7_stats);
        }

        rules::update_verdict(&rules, flow);

        let action = match verdict_before {
            Verdict::Block => OutAction::Drop,
            Verdict::Pending | Verdict::Forward => OutAction::Forward,
        };
        let record = OutRecord {
            seq: d.raw.seq,
            ts: d.raw.ts,
            orig_len: d.raw.orig_len,
            data: d.raw.data,
            action,
        };
        if writer.send(record).is_err() {
            break;
        }
    }

    for flow in table.drain() {
        release_flow(&mut app_packets, flow);
    }

    debug!(
        event.name = "worker.finished",
        worker = id,
        packets,
        flows_created = table.stats.flows_created,
        "worker drained"
    );

    WorkerStats {
        packets,
        app_packets,
        l7: l7_stats,
        table: table.stats,
    }
}

/// Folds a released flow into the per-application packet tally under its
/// final label.
fn release_flow(app_packets: &mut [u64; AppLabel::ALL.len()], flow: FlowState) {
    trace!(
        event.name = "worker.flow_released",
        flow = %flow.key,
        app = %flow.app,
        packets = flow.packets_total(),
    );
    app_packets[flow.app.index()] += flow.packets_total();
}

/// Ports whose payloads the engine knows how to inspect or attribute.
#[inline]
fn service_port(port: u16) -> bool {
    matches!(port, 80 | 443 | 53)
}

/// Runs L7 extraction and classification for a flow that still needs it.
///
/// The extractors run only on TCP payloads travelling toward their service
/// port (the client-to-server direction). Other payloads toward a known
/// service port classify straight through the port fallback without an
/// extraction attempt; a UDP datagram to 443 is not TLS. A payload
/// travelling *from* a service port first means the capture shows the server
/// side before the client; the flow keeps waiting for the client payload.
/// When neither endpoint is a known service the flow classifies immediately
/// (to Unknown, via the port fallback).
fn inspect_payload(
    flow: &mut FlowState,
    parsed: &ParsedPacket,
    payload: &[u8],
    l7_stats: &mut L7Stats,
) {
    if parsed.proto == IpProto::Tcp && parsed.dst_port == 443 {
        match tls::extract_sni(payload) {
            Ok(Some(sni)) => {
                l7_stats.sni_extracted += 1;
                flow.set_sni(sni);
                classify_flow(flow, parsed.dst_port);
            }
            Ok(None) => classify_flow(flow, parsed.dst_port),
            Err(_) => {
                // First attempt is authoritative: the flow stays Unknown
                // rather than re-inspecting attacker-supplied retries.
                l7_stats.malformed_tls += 1;
                flow.state = ClassificationState::Classified;
            }
        }
    } else if parsed.proto == IpProto::Tcp && parsed.dst_port == 80 {
        if http::looks_like_request(payload) {
            match http::extract_host(payload) {
                Ok(Some(host)) => {
                    l7_stats.host_extracted += 1;
                    flow.set_http_host(host);
                    classify_flow(flow, parsed.dst_port);
                }
                Ok(None) => classify_flow(flow, parsed.dst_port),
                Err(_) => {
                    l7_stats.malformed_http += 1;
                    flow.state = ClassificationState::Classified;
                }
            }
        } else {
            classify_flow(flow, parsed.dst_port);
        }
    } else if service_port(parsed.dst_port) {
        // DNS, or a non-TCP transport on the TLS/HTTP ports.
        classify_flow(flow, parsed.dst_port);
    } else if !service_port(parsed.src_port) {
        classify_flow(flow, parsed.dst_port);
    }
}

fn classify_flow(flow: &mut FlowState, server_port: u16) {
    flow.app = classify::classify(flow.sni.as_deref(), flow.http_host.as_deref(), server_port);
    flow.state = ClassificationState::Classified;
}
