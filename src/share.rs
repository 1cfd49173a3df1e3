use super::*;

/// A candidate nonce whose digest met the share target, tagged with the job
/// generation it was found against so a stale result can be dropped before
/// it reaches the network (spec §4.6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    pub job_num: u64,
    pub job_id: String,
    pub hex_ntime: String,
    pub nonce: [u8; 4],
}

/// Lock-free, relaxed-ordered counters. Exact precision is not required
/// (spec §4.6); these back the periodic hashrate/stats reporter.
#[derive(Debug, Default)]
pub struct Stats {
    pub nonce_count: AtomicU64,
    pub share_count: AtomicU64,
    pub accepted_share_count: AtomicU64,
    pub rejected_share_count: AtomicU64,
    latest_diff_bits: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_nonce(&self) {
        self.nonce_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_accepted(&self) {
        self.accepted_share_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected_share_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_latest_diff(&self, diff: f64) {
        self.latest_diff_bits.store(diff.to_bits(), Ordering::Relaxed);
    }

    pub fn latest_diff(&self) -> f64 {
        f64::from_bits(self.latest_diff_bits.load(Ordering::Relaxed))
    }

    pub fn nonce_count(&self) -> u64 {
        self.nonce_count.load(Ordering::Relaxed)
    }

    pub fn share_count(&self) -> u64 {
        self.share_count.load(Ordering::Relaxed)
    }
}

/// Multi-producer, single-consumer queue of found shares.
///
/// Grounded on `dyn_stratum.h`'s `shares_t`: a plain mutex-guarded `VecDeque`
/// plus a binary wake flag. Workers (plain OS threads) push; the async
/// submitter task wakes via `tokio::sync::Notify`, which is safe to signal
/// from any thread.
pub struct ShareQueue {
    queue: parking_lot::Mutex<VecDeque<Share>>,
    notify: AsyncNotify,
    stats: Arc<Stats>,
}

impl ShareQueue {
    pub fn new(stats: Arc<Stats>) -> Self {
        Self {
            queue: parking_lot::Mutex::new(VecDeque::new()),
            notify: AsyncNotify::new(),
            stats,
        }
    }

    /// Pushes a found share and wakes the consumer. Does not itself apply
    /// the stale-share filter — that happens at submission time, against
    /// the generation live at the moment of submission (spec §4.6).
    pub fn push(&self, share: Share) {
        self.queue.lock().push_back(share);
        self.stats.share_count.fetch_add(1, Ordering::Relaxed);
        self.notify.notify_one();
    }

    /// Waits for at least one share, then drains everything currently queued.
    pub async fn drain(&self) -> Vec<Share> {
        loop {
            {
                let mut guard = self.queue.lock();
                if !guard.is_empty() {
                    return guard.drain(..).collect();
                }
            }
            self.notify.notified().await;
        }
    }
}
