//! Shared run counters and the periodic progress reporter.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Counters shared by the workers, the consumer and the reporter.
#[derive(Debug, Default)]
pub struct ProgressCounters {
    processed: AtomicU64,
    inserted: AtomicU64,
    errors: AtomicU64,
}

impl ProgressCounters {
    /// Counts a job whose outcome reached the consumer as persisted.
    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a successful upsert.
    pub fn record_inserted(&self) {
        self.inserted.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a failed job.
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads all counters against `total` jobs.
    #[must_use]
    pub fn snapshot(&self, total: u64) -> ProgressSnapshot {
        ProgressSnapshot::new(
            total,
            self.processed.load(Ordering::Relaxed),
            self.inserted.load(Ordering::Relaxed),
            self.errors.load(Ordering::Relaxed),
        )
    }
}

/// Point-in-time view of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Jobs in the run.
    pub total: u64,
    /// Jobs persisted and reported back.
    pub processed: u64,
    /// Rows written.
    pub inserted: u64,
    /// Jobs that failed.
    pub errors: u64,
    /// Jobs not yet accounted for, never negative.
    pub remaining: u64,
}

impl ProgressSnapshot {
    /// Builds a snapshot, deriving `remaining`.
    #[must_use]
    pub const fn new(total: u64, processed: u64, inserted: u64, errors: u64) -> Self {
        Self {
            total,
            processed,
            inserted,
            errors,
            remaining: total.saturating_sub(processed).saturating_sub(errors),
        }
    }
}

/// Logs a snapshot every `period` until `stop` fires. The first line is
/// logged one full period after the call.
pub(crate) async fn report_progress(
    counters: Arc<ProgressCounters>,
    total: u64,
    period: Duration,
    stop: CancellationToken,
) {
    let tick = period.max(Duration::from_millis(1));
    let mut ticker = interval_at(Instant::now() + tick, tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = stop.cancelled() => break,
            _ = ticker.tick() => {
                let snapshot = counters.snapshot(total);
                info!(
                    total = snapshot.total,
                    processed = snapshot.processed,
                    inserted = snapshot.inserted,
                    errors = snapshot.errors,
                    remaining = snapshot.remaining,
                    "scrape progress"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use rstest::rstest;
    use tokio_util::sync::CancellationToken;

    use super::{ProgressCounters, ProgressSnapshot, report_progress};

    #[rstest]
    #[case(10, 3, 2, 5)]
    #[case(3, 3, 0, 0)]
    #[case(2, 2, 1, 0)]
    fn remaining_excludes_processed_and_failed(
        #[case] total: u64,
        #[case] processed: u64,
        #[case] errors: u64,
        #[case] expected: u64,
    ) {
        let snapshot = ProgressSnapshot::new(total, processed, processed, errors);

        assert_eq!(snapshot.remaining, expected);
    }

    #[test]
    fn counters_feed_the_snapshot() {
        let counters = ProgressCounters::default();
        counters.record_processed();
        counters.record_inserted();
        counters.record_error();

        assert_eq!(counters.snapshot(4), ProgressSnapshot::new(4, 1, 1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn reporter_stops_when_signalled() {
        let stop = CancellationToken::new();
        let handle = tokio::spawn(report_progress(
            Arc::new(ProgressCounters::default()),
            3,
            Duration::from_secs(5),
            stop.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(12)).await;
        stop.cancel();

        handle.await.expect("reporter should finish cleanly");
    }
}
