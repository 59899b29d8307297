//! Load-balancer stage: parses just enough of each frame to compute the
//! canonical flow key, then forwards the packet to the worker shard the key
//! hashes to. Frames the dissector rejects bypass the workers and reach the
//! writer as pass-through records.

use crossbeam::channel::{Receiver, Sender};
use tracing::debug;

use crate::flow::FlowKey;
use crate::packet::parser;
use crate::pipeline::{Dispatched, OutAction, OutRecord, RawPacket};
use crate::stats::ParseErrorStats;

#[derive(Debug, Default, Clone, Copy)]
pub struct BalancerStats {
    pub dispatched: u64,
    pub pass_through: u64,
    pub parse_errors: ParseErrorStats,
}

pub fn run(
    id: usize,
    rx: Receiver<RawPacket>,
    workers: Vec<Sender<Dispatched>>,
    writer: Sender<OutRecord>,
    hasher: ahash::RandomState,
) -> BalancerStats {
    let mut stats = BalancerStats::default();
    let shards = workers.len();

    for raw in rx.iter() {
        match parser::parse_frame(&raw.data) {
            Ok(parsed) => {
                let (key, dir) = FlowKey::canonical(
                    parsed.src_ip,
                    parsed.src_port,
                    parsed.dst_ip,
                    parsed.dst_port,
                    parsed.proto,
                );
                // Affinity depends only on the key, so any balancer thread
                // sends a given flow to the same shard.
                let shard = (hasher.hash_one(&key) % shards as u64) as usize;
                stats.dispatched += 1;
                if workers[shard]
                    .send(Dispatched {
                        raw,
                        parsed,
                        key,
                        dir,
                    })
                    .is_err()
                {
                    break;
                }
            }
            Err(e) => {
                stats.parse_errors.record(e);
                stats.pass_through += 1;
                let record = OutRecord {
                    seq: raw.seq,
                    ts: raw.ts,
                    orig_len: raw.orig_len,
                    data: raw.data,
                    action: OutAction::PassThrough,
                };
                if writer.send(record).is_err() {
                    break;
                }
            }
        }
    }

    debug!(
        event.name = "balancer.finished",
        balancer = id,
        dispatched = stats.dispatched,
        pass_through = stats.pass_through,
        "balancer drained"
    );
    stats
}
