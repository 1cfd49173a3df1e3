use super::*;

const REPORT_INTERVAL: Duration = Duration::from_secs(30);

/// Periodically logs a one-line hashrate/share summary. Grounded on
/// `dyn_stratum.h`'s periodic console printer, reworked onto `tracing` and a
/// single shared-across-workers `Stats` rather than one stat block per
/// upstream user (spec §4.6/ambient: this miner has one upstream identity).
pub(crate) async fn report(stats: Arc<Stats>, cancel: CancellationToken) {
    let mut last_nonce_count = stats.nonce_count();
    let mut last_instant = Instant::now();

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            () = sleep(REPORT_INTERVAL) => {}
        }

        let nonce_count = stats.nonce_count();
        let rate = HashRate::from_nonces(nonce_count.saturating_sub(last_nonce_count), last_instant.elapsed());

        info!(
            "{rate} | shares found {} | accepted {} | rejected {} | difficulty {:.2}",
            stats.share_count(),
            stats.accepted_share_count.load(Ordering::Relaxed),
            stats.rejected_share_count.load(Ordering::Relaxed),
            stats.latest_diff(),
        );

        last_nonce_count = nonce_count;
        last_instant = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn report_stops_promptly_once_cancelled() {
        let stats = Arc::new(Stats::new());
        let cancel = CancellationToken::new();

        let handle = {
            let cancel = cancel.clone();
            tokio::spawn(report(stats, cancel))
        };

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("report task should exit promptly after cancellation")
            .unwrap();
    }
}
