//! Writer stage: sole owner of the output capture. Forward and pass-through
//! records are written with their original bytes and timestamps; blocked
//! records are counted and discarded. With ordering enabled, records are
//! re-sequenced into exact reader order before hitting the file.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::BufWriter;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crossbeam::channel::Receiver;
use tracing::{debug, error};

use crate::capture::CaptureError;
use crate::capture::writer::CaptureWriter;
use crate::pipeline::{OutAction, OutRecord};

#[derive(Debug, Default, Clone, Copy)]
pub struct WriterStats {
    pub forwarded: u64,
    pub dropped: u64,
    pub pass_through: u64,
}

/// Min-heap adapter: orders [`OutRecord`]s by ascending sequence number.
struct BySeq(OutRecord);

impl PartialEq for BySeq {
    fn eq(&self, other: &Self) -> bool {
        self.0.seq == other.0.seq
    }
}
impl Eq for BySeq {}
impl PartialOrd for BySeq {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}
impl Ord for BySeq {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other.0.seq.cmp(&self.0.seq)
    }
}

pub fn run(
    rx: Receiver<OutRecord>,
    mut capture: CaptureWriter<BufWriter<File>>,
    ordered: bool,
    stop: Arc<AtomicBool>,
) -> (WriterStats, Result<(), CaptureError>) {
    let mut stats = WriterStats::default();
    let mut io_result: Result<(), CaptureError> = Ok(());

    // Reorder buffer, used only with --ordered. Every sequence number the
    // reader assigned arrives here exactly once, so the heap drains whenever
    // the next expected number surfaces.
    let mut pending: BinaryHeap<BySeq> = BinaryHeap::new();
    let mut next_seq: u64 = 0;

    for record in rx.iter() {
        match record.action {
            OutAction::Forward => stats.forwarded += 1,
            OutAction::Drop => stats.dropped += 1,
            OutAction::PassThrough => stats.pass_through += 1,
        }

        if io_result.is_err() {
            // Already failed: keep draining so upstream is never wedged on a
            // full queue, but write nothing further.
            continue;
        }

        if ordered {
            pending.push(BySeq(record));
            while let Some(top) = pending.pop() {
                if top.0.seq != next_seq {
                    pending.push(top);
                    break;
                }
                next_seq += 1;
                if let Err(e) = emit(&mut capture, &top.0) {
                    fail(&stop, &mut io_result, e);
                    break;
                }
            }
        } else if let Err(e) = emit(&mut capture, &record) {
            fail(&stop, &mut io_result, e);
        }
    }

    // Input closed: flush whatever ordering still holds back.
    if io_result.is_ok() {
        while let Some(BySeq(rec)) = pending.pop() {
            if let Err(e) = emit(&mut capture, &rec) {
                fail(&stop, &mut io_result, e);
                break;
            }
        }
    }

    if io_result.is_ok() {
        if let Err(e) = capture.finalize() {
            fail(&stop, &mut io_result, e);
        }
    }

    debug!(
        event.name = "writer.finished",
        forwarded = stats.forwarded,
        dropped = stats.dropped,
        pass_through = stats.pass_through,
        "writer drained"
    );
    (stats, io_result)
}

fn emit(
    capture: &mut CaptureWriter<BufWriter<File>>,
    record: &OutRecord,
) -> Result<(), CaptureError> {
    match record.action {
        OutAction::Forward | OutAction::PassThrough => {
            capture.write_record(record.ts, record.orig_len, &record.data)
        }
        OutAction::Drop => Ok(()),
    }
}

fn fail(stop: &AtomicBool, io_result: &mut Result<(), CaptureError>, e: CaptureError) {
    error!(
        event.name = "writer.output_failed",
        error = %e,
        "output capture write failed, aborting the run"
    );
    stop.store(true, Ordering::Relaxed);
    *io_result = Err(e);
}
