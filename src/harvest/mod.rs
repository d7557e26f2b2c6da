//! Bounded worker pool for harvest runs.
//!
//! A harvest is a set of independent units of work (one contributor, one
//! repository, one page). [`HarvestPool`] runs them with a semaphore-bounded
//! number of in-flight tasks and collects their results in the order they
//! finish.
//!
//! # Cancellation
//!
//! The pool watches a shared interrupt flag. Once it is set, no new unit is
//! started; units already in flight get a grace period to finish (their
//! requests carry their own timeouts) and are aborted after it.
//!
//! # Example
//!
//! ```no_run
//! use forge_harvest::harvest::{HarvestPool, UnitOutcome};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = HarvestPool::new(4)?;
//! let harvest = pool
//!     .run(1..=10_u32, |n| async move { UnitOutcome::Completed(n * n) })
//!     .await?;
//! println!("{} squares, {} failed", harvest.results.len(), harvest.stats.failed);
//! # Ok(())
//! # }
//! ```

mod contributors;

pub use contributors::{ContributorCountry, ContributorHarvest, harvest_contributor_countries};

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
const MAX_CONCURRENCY: usize = 100;

/// Workers per credential when sizing the pool from the credential count.
const WORKERS_PER_CREDENTIAL: usize = 8;

/// Time in-flight units get to finish after an interrupt.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// How often a blocked pool re-checks the interrupt flag.
const INTERRUPT_POLL: Duration = Duration::from_millis(50);

/// Error type for worker pool operations.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,
}

/// How one unit of work ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome<R> {
    /// The unit produced a result.
    Completed(R),
    /// The unit had nothing to contribute (absent resource, exhausted retries).
    Skipped(String),
    /// The unit hit a hard error.
    Failed(String),
}

/// Counters for one harvest run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HarvestStats {
    /// Units that produced a result.
    pub completed: usize,
    /// Units that were skipped.
    pub skipped: usize,
    /// Units that failed or panicked.
    pub failed: usize,
    /// Units cut off when the grace period ran out.
    pub aborted: usize,
    /// Units never started because of an interrupt.
    pub not_started: usize,
    /// Whether the run was interrupted.
    pub interrupted: bool,
}

impl HarvestStats {
    /// Units that ran to an outcome.
    #[must_use]
    pub fn finished(&self) -> usize {
        self.completed + self.skipped + self.failed
    }
}

/// Results of a harvest run, in completion order.
#[derive(Debug, Clone)]
pub struct Harvest<R> {
    /// Results of completed units.
    pub results: Vec<R>,
    /// Run counters.
    pub stats: HarvestStats,
}

/// Semaphore-bounded pool of harvest workers.
#[derive(Debug, Clone)]
pub struct HarvestPool {
    concurrency: usize,
    interrupt: Arc<AtomicBool>,
    grace: Duration,
}

impl HarvestPool {
    /// Creates a pool running at most `concurrency` units at once.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::InvalidConcurrency`] outside `1..=100`.
    pub fn new(concurrency: usize) -> Result<Self, HarvestError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(HarvestError::InvalidConcurrency { value: concurrency });
        }
        Ok(Self {
            concurrency,
            interrupt: Arc::new(AtomicBool::new(false)),
            grace: DEFAULT_GRACE_PERIOD,
        })
    }

    /// Sizes the pool from the number of credentials in rotation.
    #[must_use]
    pub fn for_credentials(credentials: usize) -> Self {
        let concurrency = credentials
            .saturating_mul(WORKERS_PER_CREDENTIAL)
            .clamp(MIN_CONCURRENCY, MAX_CONCURRENCY);
        Self {
            concurrency,
            interrupt: Arc::new(AtomicBool::new(false)),
            grace: DEFAULT_GRACE_PERIOD,
        }
    }

    /// Shares an externally owned interrupt flag (set from a signal handler).
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: Arc<AtomicBool>) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Replaces the post-interrupt grace period.
    #[must_use]
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// The interrupt flag this pool watches.
    #[must_use]
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    fn interrupted(&self) -> bool {
        self.interrupt.load(Ordering::SeqCst)
    }

    /// Runs `work` over every unit and collects results as they complete.
    ///
    /// A failing or panicking unit is counted and never stops its siblings.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::SemaphoreClosed`] if the semaphore is closed.
    #[instrument(skip_all, fields(concurrency = self.concurrency))]
    pub async fn run<U, F, Fut, R>(
        &self,
        units: impl IntoIterator<Item = U>,
        work: F,
    ) -> Result<Harvest<R>, HarvestError>
    where
        F: Fn(U) -> Fut,
        Fut: Future<Output = UnitOutcome<R>> + Send + 'static,
        R: Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let mut tasks = JoinSet::new();
        let mut stats = HarvestStats::default();
        let mut units = units.into_iter();

        info!("starting harvest");

        while let Some(unit) = units.next() {
            let Some(permit) = self.acquire(&semaphore).await? else {
                stats.not_started = 1 + units.by_ref().count();
                break;
            };
            let sender = sender.clone();
            let unit_work = work(unit);
            tasks.spawn(async move {
                // Permit is dropped when this block exits (RAII)
                let _permit = permit;
                let outcome = unit_work.await;
                // The receiver outlives every task.
                let _ = sender.send(outcome);
            });
        }
        drop(sender);

        debug!(in_flight = tasks.len(), "waiting for units to finish");
        let aborted = self.drain(&mut tasks, &mut stats).await;
        stats.aborted = aborted;
        stats.interrupted = self.interrupted();

        let mut results = Vec::new();
        while let Some(outcome) = receiver.recv().await {
            match outcome {
                UnitOutcome::Completed(result) => {
                    stats.completed += 1;
                    results.push(result);
                }
                UnitOutcome::Skipped(reason) => {
                    debug!(%reason, "unit skipped");
                    stats.skipped += 1;
                }
                UnitOutcome::Failed(error) => {
                    warn!(%error, "unit failed");
                    stats.failed += 1;
                }
            }
        }

        info!(
            completed = stats.completed,
            skipped = stats.skipped,
            failed = stats.failed,
            aborted = stats.aborted,
            not_started = stats.not_started,
            interrupted = stats.interrupted,
            "harvest complete"
        );
        Ok(Harvest { results, stats })
    }

    /// Waits for a permit, giving up when the interrupt flag is set.
    async fn acquire(
        &self,
        semaphore: &Arc<Semaphore>,
    ) -> Result<Option<tokio::sync::OwnedSemaphorePermit>, HarvestError> {
        if self.interrupted() {
            return Ok(None);
        }
        let acquire = Arc::clone(semaphore).acquire_owned();
        tokio::pin!(acquire);
        loop {
            tokio::select! {
                permit = &mut acquire => {
                    let permit = permit.map_err(|_| HarvestError::SemaphoreClosed)?;
                    if self.interrupted() {
                        return Ok(None);
                    }
                    return Ok(Some(permit));
                }
                () = tokio::time::sleep(INTERRUPT_POLL) => {
                    if self.interrupted() {
                        info!("interrupt received, no new units will start");
                        return Ok(None);
                    }
                }
            }
        }
    }

    /// Joins every task; after an interrupt, aborts what outlives the grace
    /// period. Returns the number of aborted tasks.
    async fn drain(&self, tasks: &mut JoinSet<()>, stats: &mut HarvestStats) -> usize {
        loop {
            if self.interrupted() {
                break;
            }
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    None => return 0,
                    Some(Err(error)) if error.is_panic() => {
                        warn!(error = %error, "harvest unit panicked");
                        stats.failed += 1;
                    }
                    Some(_) => {}
                },
                () = tokio::time::sleep(INTERRUPT_POLL) => {}
            }
        }

        let in_flight = tasks.len();
        if in_flight > 0 {
            info!(
                in_flight,
                grace_secs = self.grace.as_secs_f32(),
                "waiting for in-flight units"
            );
        }
        let graceful = tokio::time::timeout(self.grace, async {
            while let Some(joined) = tasks.join_next().await {
                if let Err(error) = joined
                    && error.is_panic()
                {
                    warn!(error = %error, "harvest unit panicked");
                    stats.failed += 1;
                }
            }
        })
        .await;
        if graceful.is_ok() {
            return 0;
        }

        let remaining = tasks.len();
        warn!(remaining, "grace period elapsed, aborting in-flight units");
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}
        remaining
    }
}
