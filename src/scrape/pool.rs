//! Bounded worker pool turning pull request numbers into persisted rows.
//!
//! One dispatcher feeds a bounded job queue, `C` workers share its receiver
//! and each job yields exactly one [`JobOutcome`] on the result queue. The
//! consumer waits for exactly as many outcomes as jobs were queued.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::github::{CommentBreakdown, PullRequestLite, PullRequestSource, RepositoryLocator};
use crate::persistence::MetricSink;

use super::error::{JobError, ScrapeError};
use super::progress::{ProgressCounters, report_progress};
use super::row::{MetricRow, build_row};

/// Result of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum JobOutcome {
    Persisted(MetricRow),
    Failed { number: u64, error: JobError },
}

/// Read-only state shared by every worker.
pub(crate) struct JobContext<S, K> {
    pub(crate) source: Arc<S>,
    pub(crate) sink: Arc<K>,
    pub(crate) locator: RepositoryLocator,
    pub(crate) pull_requests: HashMap<u64, PullRequestLite>,
    pub(crate) breakdowns: HashMap<u64, CommentBreakdown>,
    pub(crate) counters: Arc<ProgressCounters>,
    pub(crate) cancel: CancellationToken,
}

impl<S: PullRequestSource, K: MetricSink> JobContext<S, K> {
    async fn process(&self, number: u64) -> JobOutcome {
        match self.persist(number).await {
            Ok(row) => JobOutcome::Persisted(row),
            Err(error) => JobOutcome::Failed { number, error },
        }
    }

    async fn persist(&self, number: u64) -> Result<MetricRow, JobError> {
        let pull_request = self
            .pull_requests
            .get(&number)
            .copied()
            .ok_or(JobError::UnknownPullRequest { number })?;
        let breakdown = self.breakdown_for(number).await?;
        let row = build_row(
            self.locator.owner().as_str(),
            self.locator.repository().as_str(),
            &pull_request,
            breakdown,
        );

        if self.cancel.is_cancelled() {
            return Err(JobError::Cancelled);
        }
        self.sink.upsert(&row).await.map_err(JobError::Persist)?;
        self.counters.record_inserted();
        Ok(row)
    }

    async fn breakdown_for(&self, number: u64) -> Result<CommentBreakdown, JobError> {
        if let Some(breakdown) = self.breakdowns.get(&number) {
            return Ok(*breakdown);
        }

        debug!(number, "counting comments for a single pull request");
        tokio::select! {
            () = self.cancel.cancelled() => Err(JobError::Cancelled),
            counted = self.source.pull_request_breakdown(&self.locator, number) => {
                counted.map_err(JobError::from)
            }
        }
    }
}

/// Runs every job and waits for all outcomes.
///
/// Returns once `numbers.len()` outcomes were consumed, when `cancel` fires,
/// or when the workers stop early. All spawned tasks are stopped before
/// returning.
pub(crate) async fn run_jobs<S, K>(
    job_context: JobContext<S, K>,
    numbers: Vec<u64>,
    concurrency: usize,
    progress_interval: Duration,
) -> Result<(), ScrapeError>
where
    S: PullRequestSource + 'static,
    K: MetricSink + 'static,
{
    let expected = u64::try_from(numbers.len()).unwrap_or(u64::MAX);
    let workers = concurrency.max(1);
    let cancel = job_context.cancel.clone();
    let counters = Arc::clone(&job_context.counters);
    let context = Arc::new(job_context);

    let (job_sender, queue) = mpsc::channel(workers);
    let (result_sender, mut result_receiver) = mpsc::channel(workers);
    let job_receiver = Arc::new(Mutex::new(queue));
    let reporter_stop = cancel.child_token();

    let mut tasks = JoinSet::new();
    tasks.spawn(dispatch(numbers, job_sender, cancel.clone()));
    for _ in 0..workers {
        tasks.spawn(work(
            Arc::clone(&context),
            Arc::clone(&job_receiver),
            result_sender.clone(),
        ));
    }
    drop(result_sender);
    tasks.spawn(report_progress(
        Arc::clone(&counters),
        expected,
        progress_interval,
        reporter_stop.clone(),
    ));

    let consumed = consume(&mut result_receiver, expected, &counters, &cancel).await;

    reporter_stop.cancel();
    tasks.shutdown().await;
    consumed
}

async fn dispatch(numbers: Vec<u64>, jobs: Sender<u64>, cancel: CancellationToken) {
    for number in numbers {
        tokio::select! {
            () = cancel.cancelled() => return,
            sent = jobs.send(number) => {
                if sent.is_err() {
                    return;
                }
            }
        }
    }
}

async fn work<S, K>(
    context: Arc<JobContext<S, K>>,
    jobs: Arc<Mutex<Receiver<u64>>>,
    results: Sender<JobOutcome>,
) where
    S: PullRequestSource,
    K: MetricSink,
{
    loop {
        let next = {
            let mut receiver = tokio::select! {
                () = context.cancel.cancelled() => return,
                guard = jobs.lock() => guard,
            };
            tokio::select! {
                () = context.cancel.cancelled() => return,
                received = receiver.recv() => received,
            }
        };
        let Some(number) = next else {
            return;
        };

        let outcome = context.process(number).await;
        tokio::select! {
            () = context.cancel.cancelled() => return,
            sent = results.send(outcome) => {
                if sent.is_err() {
                    return;
                }
            }
        }
    }
}

async fn consume(
    results: &mut Receiver<JobOutcome>,
    expected: u64,
    counters: &ProgressCounters,
    cancel: &CancellationToken,
) -> Result<(), ScrapeError> {
    let mut received = 0_u64;
    while received < expected {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ScrapeError::Cancelled),
            message = results.recv() => message,
        };
        let Some(outcome) = next else {
            return Err(ScrapeError::Incomplete { expected, received });
        };
        received = received.saturating_add(1);

        match outcome {
            JobOutcome::Persisted(row) => {
                counters.record_processed();
                debug!(number = row.number, "pull request persisted");
            }
            JobOutcome::Failed { number, error } => {
                counters.record_error();
                warn!(number, error = %error, "pull request job failed");
            }
        }
    }
    Ok(())
}
