//! The packet pipeline: reader -> balancer(s) -> fast-path workers -> writer.
//!
//! Stages are native threads joined by bounded crossbeam channels. Dispatch
//! is flow-affine: the balancer hashes the canonical flow key so every packet
//! of a conversation lands on the same worker, whose flow table is therefore
//! single-owner and lock-free. Back-pressure comes from the bounded queues;
//! shutdown propagates forward by dropping senders, never by callbacks.

pub mod balancer;
pub mod reader;
pub mod worker;
pub mod writer;

use std::sync::{Arc, atomic::AtomicBool};
use std::thread;
use std::time::Duration;

use crossbeam::channel::{Receiver, Sender, bounded};
use tracing::{info, warn};

use crate::capture::{PacketTs, reader::CaptureReader, writer::CaptureWriter};
use crate::classify::AppLabel;
use crate::config::Config;
use crate::error::EngineError;
use crate::flow::{FlowDirection, FlowKey};
use crate::packet::types::ParsedPacket;
use crate::rules::RuleSet;
use crate::stats::Report;

/// Grace period for the writer to drain once every upstream stage stopped.
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(5);

/// A captured frame with its reader-assigned sequence number.
#[derive(Debug, Clone)]
pub struct RawPacket {
    pub seq: u64,
    pub ts: PacketTs,
    pub orig_len: u32,
    pub data: Vec<u8>,
}

/// A packet bound for a specific worker shard, with its parse preview.
#[derive(Debug)]
pub struct Dispatched {
    pub raw: RawPacket,
    pub parsed: ParsedPacket,
    pub key: FlowKey,
    pub dir: FlowDirection,
}

/// What the writer should do with one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutAction {
    /// Write to the output capture.
    Forward,
    /// Count as dropped; do not write.
    Drop,
    /// Untracked packet written as-is for capture fidelity.
    PassThrough,
}

/// A record on its way to the output capture.
#[derive(Debug)]
pub struct OutRecord {
    pub seq: u64,
    pub ts: PacketTs,
    pub orig_len: u32,
    pub data: Vec<u8>,
    pub action: OutAction,
}

/// Runs the whole pipeline to completion and returns the merged report.
pub fn run(conf: &Config, rules: Arc<RuleSet>) -> Result<Report, EngineError> {
    let capture_in = CaptureReader::open(&conf.input).map_err(EngineError::Input)?;
    let capture_out = CaptureWriter::create(&conf.output, capture_in.snaplen, capture_in.link_type)
        .map_err(EngineError::Output)?;

    // One seeded hasher for the whole run: shard selection and every flow
    // table must agree on it.
    let hasher = ahash::RandomState::new();
    let stop = Arc::new(AtomicBool::new(false));

    let (balancer_tx, balancer_rx) = bounded::<RawPacket>(conf.balancer_capacity);
    let (writer_tx, writer_rx) = bounded::<OutRecord>(conf.writer_capacity);
    let (writer_done_tx, writer_done_rx) = bounded::<()>(1);

    let mut worker_txs: Vec<Sender<Dispatched>> = Vec::with_capacity(conf.fps);
    let mut worker_rxs: Vec<Receiver<Dispatched>> = Vec::with_capacity(conf.fps);
    for _ in 0..conf.fps {
        let (tx, rx) = bounded::<Dispatched>(conf.worker_capacity);
        worker_txs.push(tx);
        worker_rxs.push(rx);
    }

    info!(
        event.name = "pipeline.starting",
        balancers = conf.lbs,
        workers = conf.fps,
        ordered = conf.ordered,
        "spawning pipeline stages"
    );

    let reader_handle = {
        let stop = Arc::clone(&stop);
        thread::Builder::new()
            .name("dpi-reader".to_string())
            .spawn(move || reader::run(capture_in, balancer_tx, stop))
            .map_err(EngineError::spawn)?
    };

    let mut balancer_handles = Vec::with_capacity(conf.lbs);
    for id in 0..conf.lbs {
        let rx = balancer_rx.clone();
        let workers = worker_txs.clone();
        let writer = writer_tx.clone();
        let hasher = hasher.clone();
        let handle = thread::Builder::new()
            .name(format!("dpi-balancer-{id}"))
            .spawn(move || balancer::run(id, rx, workers, writer, hasher))
            .map_err(EngineError::spawn)?;
        balancer_handles.push(handle);
    }
    // The clones live in the balancer threads; dropping the originals makes
    // sender-counting see only live stages.
    drop(balancer_rx);
    drop(worker_txs);

    let table_conf = conf.flow_table_conf();
    let mut worker_handles = Vec::with_capacity(conf.fps);
    for (id, rx) in worker_rxs.into_iter().enumerate() {
        let writer = writer_tx.clone();
        let rules = Arc::clone(&rules);
        let table_conf = table_conf.clone();
        let hasher = hasher.clone();
        let handle = thread::Builder::new()
            .name(format!("dpi-worker-{id}"))
            .spawn(move || worker::run(id, rx, writer, rules, table_conf, hasher))
            .map_err(EngineError::spawn)?;
        worker_handles.push(handle);
    }
    drop(writer_tx);

    let writer_handle = {
        let stop = Arc::clone(&stop);
        let ordered = conf.ordered;
        thread::Builder::new()
            .name("dpi-writer".to_string())
            .spawn(move || {
                let out = writer::run(writer_rx, capture_out, ordered, stop);
                let _ = writer_done_tx.send(());
                out
            })
            .map_err(EngineError::spawn)?
    };

    // Join in topological order; a panicked stage surfaces as an internal
    // error after the others have been collected.
    let reader_stats = reader_handle
        .join()
        .map_err(|_| EngineError::stage_panic("reader"))?;

    let mut report = Report::default();
    report.total_packets = reader_stats.packets_read;

    for handle in balancer_handles {
        let stats = handle
            .join()
            .map_err(|_| EngineError::stage_panic("balancer"))?;
        report.parse_errors.merge(&stats.parse_errors);
    }

    for handle in worker_handles {
        let stats = handle
            .join()
            .map_err(|_| EngineError::stage_panic("worker"))?;
        report.l7.merge(&stats.l7);
        report.table.merge(&stats.table);
        for (&app, &packets) in AppLabel::ALL.iter().zip(stats.app_packets.iter()) {
            if packets > 0 {
                report.add_flow_packets(app, packets);
            }
        }
    }

    // Bounded shutdown: with every upstream sender gone the writer drains
    // what is queued and exits; past the deadline the run is declared wedged.
    if writer_done_rx.recv_timeout(SHUTDOWN_DEADLINE).is_err() {
        return Err(EngineError::Internal(
            "writer failed to drain within the shutdown deadline".to_string(),
        ));
    }
    let (writer_stats, io_result) = writer_handle
        .join()
        .map_err(|_| EngineError::stage_panic("writer"))?;
    io_result.map_err(EngineError::Output)?;

    report.forwarded = writer_stats.forwarded;
    report.dropped = writer_stats.dropped;
    report.pass_through = writer_stats.pass_through;
    report.blocked_apps = AppLabel::ALL
        .iter()
        .copied()
        .filter(|&app| rules.is_blocked_app(app))
        .collect();

    let accounted = report.forwarded + report.dropped + report.pass_through;
    if accounted != report.total_packets {
        warn!(
            event.name = "pipeline.counter_mismatch",
            total = report.total_packets,
            accounted,
            "forwarded + dropped + pass-through does not match packets read"
        );
    }

    info!(
        event.name = "pipeline.finished",
        total = report.total_packets,
        forwarded = report.forwarded,
        dropped = report.dropped,
        pass_through = report.pass_through,
        "pipeline complete"
    );

    Ok(report)
}
