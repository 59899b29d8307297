//! Reader stage: pulls records from the input capture, stamps sequence
//! numbers and feeds the balancer queue.

use std::fs::File;
use std::io::BufReader;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crossbeam::channel::Sender;
use tracing::{debug, warn};

use crate::capture::reader::CaptureReader;
use crate::pipeline::RawPacket;

#[derive(Debug, Default, Clone, Copy)]
pub struct ReaderStats {
    pub packets_read: u64,
    /// Records lost to a torn or corrupt file tail.
    pub tail_errors: u64,
}

pub fn run(
    mut capture: CaptureReader<BufReader<File>>,
    tx: Sender<RawPacket>,
    stop: Arc<AtomicBool>,
) -> ReaderStats {
    let mut stats = ReaderStats::default();
    let mut seq: u64 = 0;

    loop {
        if stop.load(Ordering::Relaxed) {
            debug!(event.name = "reader.stopped", seq, "stop flag set, closing input");
            break;
        }

        match capture.next_record() {
            Ok(Some(record)) => {
                let packet = RawPacket {
                    seq,
                    ts: record.ts,
                    orig_len: record.orig_len,
                    data: record.data,
                };
                seq += 1;
                stats.packets_read += 1;
                if tx.send(packet).is_err() {
                    // Downstream is gone; nothing left to feed.
                    warn!(event.name = "reader.output_closed", seq, "balancer queue closed early");
                    break;
                }
            }
            Ok(None) => {
                debug!(event.name = "reader.eof", packets = stats.packets_read, "input drained");
                break;
            }
            Err(e) => {
                // A torn tail or corrupt length desyncs the framing; there
                // is no way to resynchronize, so finish with what we have.
                warn!(
                    event.name = "reader.tail_error",
                    error = %e,
                    packets = stats.packets_read,
                    "stopping at unreadable record"
                );
                stats.tail_errors += 1;
                break;
            }
        }
    }

    stats
}
