use super::*;

/// Single-writer / many-reader cell holding the current job.
///
/// Grounded on `dyn_stratum.h`'s `shared_work_t`: a `parking_lot::RwLock`
/// guards the full record for cheap whole-struct clones, while `num` is a
/// separate `AtomicU64` so workers can poll for a job change without ever
/// taking the lock.
pub struct SharedWork {
    num: AtomicU64,
    work: parking_lot::RwLock<Work>,
}

impl SharedWork {
    pub fn new() -> Self {
        Self {
            num: AtomicU64::new(0),
            work: parking_lot::RwLock::new(Work::default()),
        }
    }

    /// Lock-free generation poll; workers spin on this between nonce attempts.
    pub fn num(&self) -> u64 {
        self.num.load(Ordering::Relaxed)
    }

    /// Clones the whole current job under a brief read lock.
    pub fn clone_work(&self) -> Work {
        self.work.read().clone()
    }

    /// Publishes a new job, unconditionally bumping the generation.
    pub fn publish(&self, mut work: Work) -> u64 {
        let mut guard = self.work.write();
        let next = self.num.load(Ordering::Relaxed) + 1;
        work.num = next;
        *guard = work;
        self.num.store(next, Ordering::Relaxed);
        next
    }

    /// Updates the share target. Bumps the generation too, but only once a
    /// first job has been published (spec §4.5): a difficulty update that
    /// arrives before any `mining.notify` must not wake parked workers onto
    /// an empty job.
    pub fn set_difficulty(&self, share_target: u64) {
        let mut guard = self.work.write();
        guard.share_target = share_target;
        let current = self.num.load(Ordering::Relaxed);
        if current > 0 {
            let next = current + 1;
            guard.num = next;
            self.num.store(next, Ordering::Relaxed);
        }
    }
}

impl Default for SharedWork {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn work(job_id: &str) -> Work {
        Work {
            job_id: job_id.into(),
            ..Work::default()
        }
    }

    #[test]
    fn num_starts_at_zero() {
        let shared = SharedWork::new();
        assert_eq!(shared.num(), 0);
    }

    #[test]
    fn publish_bumps_num_monotonically() {
        let shared = SharedWork::new();
        assert_eq!(shared.publish(work("a")), 1);
        assert_eq!(shared.publish(work("b")), 2);
        assert_eq!(shared.num(), 2);
    }

    #[test]
    fn cloned_work_carries_the_generation_it_was_published_with() {
        let shared = SharedWork::new();
        shared.publish(work("a"));
        let second_num = shared.publish(work("b"));
        let cloned = shared.clone_work();
        assert_eq!(cloned.num, second_num);
        assert_eq!(cloned.job_id, "b");
    }

    #[test]
    fn set_difficulty_before_first_job_does_not_bump_num() {
        let shared = SharedWork::new();
        shared.set_difficulty(12345);
        assert_eq!(shared.num(), 0);
        assert_eq!(shared.clone_work().share_target, 12345);
    }

    #[test]
    fn set_difficulty_after_first_job_bumps_num() {
        let shared = SharedWork::new();
        shared.publish(work("a"));
        shared.set_difficulty(999);
        assert_eq!(shared.num(), 2);
        assert_eq!(shared.clone_work().share_target, 999);
    }
}
