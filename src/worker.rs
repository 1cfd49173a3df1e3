use super::*;

/// Runs one CPU worker's mining loop on the calling OS thread. Spawned once
/// per configured hardware thread by `controller::run`.
///
/// Grounded on `dyn_miner.cpp`'s `cpu_miner`: pin to a core (best-effort),
/// park until a job exists, then spin over a disjoint nonce stride until
/// the shared-work generation moves out from under it.
pub fn run_cpu_worker(index: usize, shared_work: Arc<SharedWork>, queue: Arc<ShareQueue>, stats: Arc<Stats>) {
    if let Some(core_ids) = core_affinity::get_core_ids() {
        if let Some(core_id) = core_ids.get(index) {
            if !core_affinity::set_for_current(*core_id) {
                warn!("worker {index}: failed to pin to core {core_id:?}, continuing unpinned");
            }
        }
    }

    let mut mempool = Mempool::new();

    loop {
        while shared_work.num() == 0 {
            thread::sleep(Duration::from_secs(1));
        }

        let work = shared_work.clone_work();
        let mut nonce = nonce::seed(index);
        let mut header = work.native_data;

        while shared_work.num() == work.num {
            header[76..80].copy_from_slice(&nonce.to_le_bytes());

            let digest = execute(
                &header,
                &work.bytecode,
                &work.prev_block_hash,
                &work.merkle_root_reversed,
                &mut mempool,
            );

            stats.record_nonce();

            if meets_target(&digest, work.share_target) {
                queue.push(Share {
                    job_num: work.num,
                    job_id: work.job_id.clone(),
                    hex_ntime: work.hex_ntime.clone(),
                    nonce: nonce.to_le_bytes(),
                });
            }

            nonce = nonce.wrapping_add(1);
        }
    }
}
