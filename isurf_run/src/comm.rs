//! Transport seam for the bulk-synchronous pipeline.
//!
//! The pipeline needs four collective operations: a broadcast, a barrier, a
//! sum reduction and an irregular point-to-point exchange. [`Comm`] is that
//! contract; [`SerialComm`] implements it for single-rank runs and
//! [`ThreadComm`] for multi-rank jobs sharing one process, which is how the
//! cross-rank tests drive the reconciler.

use std::sync::{Arc, Barrier, Mutex};

/// Collective transport between the ranks of one job.
///
/// `broadcast` requires every rank to pass a buffer of the same length.
/// `exchange` takes `dests[i]` and the `i`-th fixed-size record of
/// `payload`, delivers every record to its destination exactly once, and
/// returns the records received by the calling rank (grouped by source
/// rank, in send order within each source).
pub trait Comm {
    /// This rank's index in 0..size.
    fn rank(&self) -> usize;

    /// Number of ranks in the job.
    fn size(&self) -> usize;

    /// Broadcast `buf` from `root` to every rank.
    fn broadcast(&self, root: usize, buf: &mut [u8]);

    /// Block until every rank arrives.
    fn barrier(&self);

    /// Sum `value` across all ranks; every rank gets the total.
    fn sum_u64(&self, value: u64) -> u64;

    /// Irregular point-to-point exchange of fixed-size records.
    fn exchange(&self, dests: &[usize], payload: &[u8], record: usize) -> Vec<u8>;
}

/// Transport for a single-rank job.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialComm;

impl Comm for SerialComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn broadcast(&self, _root: usize, _buf: &mut [u8]) {}

    fn barrier(&self) {}

    fn sum_u64(&self, value: u64) -> u64 {
        value
    }

    fn exchange(&self, dests: &[usize], payload: &[u8], record: usize) -> Vec<u8> {
        // Self-sends are delivered; anything else has nowhere to go.
        let mut out = Vec::new();
        for (i, &dest) in dests.iter().enumerate() {
            debug_assert_eq!(dest, 0, "serial job cannot address rank {}", dest);
            out.extend_from_slice(&payload[i * record..(i + 1) * record]);
        }
        out
    }
}

struct ThreadShared {
    size: usize,
    barrier: Barrier,
    slot: Mutex<Vec<u8>>,
    sums: Mutex<Vec<u64>>,
    /// mail[dest][src]: record bytes in flight.
    mail: Mutex<Vec<Vec<Vec<u8>>>>,
}

/// Transport for ranks running as threads of one process.
///
/// All collective calls must be made by every rank in the same order, as
/// with any bulk-synchronous transport.
pub struct ThreadComm {
    shared: Arc<ThreadShared>,
    rank: usize,
}

impl ThreadComm {
    /// Create a connected set of `size` rank handles.
    pub fn create(size: usize) -> Vec<ThreadComm> {
        let shared = Arc::new(ThreadShared {
            size,
            barrier: Barrier::new(size),
            slot: Mutex::new(Vec::new()),
            sums: Mutex::new(vec![0; size]),
            mail: Mutex::new(vec![vec![Vec::new(); size]; size]),
        });
        (0..size)
            .map(|rank| ThreadComm {
                shared: Arc::clone(&shared),
                rank,
            })
            .collect()
    }
}

impl Comm for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn broadcast(&self, root: usize, buf: &mut [u8]) {
        if self.rank == root {
            *self.shared.slot.lock().unwrap() = buf.to_vec();
        }
        self.shared.barrier.wait();
        if self.rank != root {
            let slot = self.shared.slot.lock().unwrap();
            buf.copy_from_slice(&slot[..buf.len()]);
        }
        self.shared.barrier.wait();
    }

    fn barrier(&self) {
        self.shared.barrier.wait();
    }

    fn sum_u64(&self, value: u64) -> u64 {
        self.shared.sums.lock().unwrap()[self.rank] = value;
        self.shared.barrier.wait();
        let total = self.shared.sums.lock().unwrap().iter().sum();
        self.shared.barrier.wait();
        total
    }

    fn exchange(&self, dests: &[usize], payload: &[u8], record: usize) -> Vec<u8> {
        {
            let mut mail = self.shared.mail.lock().unwrap();
            for (i, &dest) in dests.iter().enumerate() {
                mail[dest][self.rank].extend_from_slice(&payload[i * record..(i + 1) * record]);
            }
        }
        self.shared.barrier.wait();
        let out = {
            let mut mail = self.shared.mail.lock().unwrap();
            let mut out = Vec::new();
            for src in 0..self.shared.size {
                let inbox = std::mem::take(&mut mail[self.rank][src]);
                out.extend_from_slice(&inbox);
            }
            out
        };
        self.shared.barrier.wait();
        out
    }
}
