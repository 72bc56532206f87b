//! Dispatcher - runs independent crawl units on a bounded worker pool
//!
//! Units are drained from a shared queue by a fixed number of workers. Each
//! worker builds its own [`Fetcher`] per unit and runs the unit's traversal
//! and downloads to completion before taking the next one. A failing unit
//! only ever affects its own [`CrawlOutcome`].

use crate::config::{Config, HttpConfig, UnitConfig};
use crate::crawler::traversal::crawl_targets;
use crate::crawler::{CrawlUnit, Fetcher};
use crate::storage::{DownloadStatus, Downloader};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

/// Result of running one crawl unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlOutcome {
    /// Name of the unit
    pub unit: String,

    /// Distinct image links discovered by the traversal
    pub images_found: usize,

    /// Assets transferred and written during this run
    pub files_downloaded: usize,

    /// Assets reused from an earlier run
    pub cached: usize,

    /// Failures as (source URL, reason), in the order they happened
    pub errors: Vec<(String, String)>,
}

impl CrawlOutcome {
    /// Creates an empty outcome for a unit
    pub fn new(unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            ..Self::default()
        }
    }

    /// Records a failure against `source`
    pub fn record_error(&mut self, source: impl Into<String>, reason: impl fmt::Display) {
        self.errors.push((source.into(), reason.to_string()));
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

/// Outcomes of a whole run plus its wall-clock duration
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// One outcome per unit, in completion order
    pub outcomes: Vec<CrawlOutcome>,

    /// Time from first dispatch to last completion
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn total_downloaded(&self) -> usize {
        self.outcomes.iter().map(|o| o.files_downloaded).sum()
    }

    pub fn total_cached(&self) -> usize {
        self.outcomes.iter().map(|o| o.cached).sum()
    }

    pub fn total_errors(&self) -> usize {
        self.outcomes.iter().map(CrawlOutcome::error_count).sum()
    }

    /// Looks up the outcome of a unit by name
    pub fn outcome(&self, unit: &str) -> Option<&CrawlOutcome> {
        self.outcomes.iter().find(|o| o.unit == unit)
    }
}

/// Settings every worker needs
struct WorkerContext {
    http: HttpConfig,
    output: PathBuf,
}

/// Runs crawl units in parallel with a ceiling on simultaneous units
pub struct Dispatcher {
    http: HttpConfig,
    output: PathBuf,
    concurrency: usize,
}

impl Dispatcher {
    /// Creates a dispatcher
    ///
    /// # Arguments
    ///
    /// * `http` - HTTP settings used to build each unit's fetcher
    /// * `output` - Directory receiving downloaded assets
    /// * `concurrency` - Maximum simultaneous units (at least 1)
    pub fn new(http: HttpConfig, output: impl Into<PathBuf>, concurrency: usize) -> Self {
        Self {
            http,
            output: output.into(),
            concurrency: concurrency.max(1),
        }
    }

    /// Creates a dispatcher from the loaded configuration
    ///
    /// Concurrency defaults to the number of CPUs when not configured.
    pub fn from_config(config: &Config) -> Self {
        let concurrency = config
            .dispatcher
            .concurrency
            .unwrap_or_else(num_cpus::get);
        Self::new(config.http.clone(), &config.output.directory, concurrency)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Number of workers started for `units` units
    pub fn pool_size(&self, units: usize) -> usize {
        self.concurrency.min(units)
    }

    /// Builds units from configuration and runs the valid ones
    ///
    /// A unit whose configuration does not validate is not crawled; its
    /// outcome carries the validation error instead. Other units are
    /// unaffected.
    pub async fn run_configs(&self, configs: &[UnitConfig]) -> RunSummary {
        let started = Instant::now();
        let mut rejected = Vec::new();
        let mut units = Vec::with_capacity(configs.len());

        for config in configs {
            match CrawlUnit::from_config(config) {
                Ok(unit) => units.push(unit),
                Err(e) => {
                    tracing::error!("[{}] invalid unit configuration: {}", config.name, e);
                    let mut outcome = CrawlOutcome::new(config.name.clone());
                    let source = config
                        .targets
                        .first()
                        .cloned()
                        .unwrap_or_else(|| config.name.clone());
                    outcome.record_error(source, e);
                    rejected.push(outcome);
                }
            }
        }

        let mut summary = self.run(units).await;
        summary.outcomes.extend(rejected);
        summary.elapsed = started.elapsed();
        summary
    }

    /// Runs every unit and collects their outcomes
    ///
    /// Returns once all units have completed. Outcomes arrive in completion
    /// order, which is not related to the input order.
    pub async fn run(&self, units: Vec<CrawlUnit>) -> RunSummary {
        let started = Instant::now();
        let workers = self.pool_size(units.len());

        tracing::info!(
            "Dispatching {} units on {} workers",
            units.len(),
            workers
        );

        let queue = Arc::new(Mutex::new(VecDeque::from(units)));
        let context = Arc::new(WorkerContext {
            http: self.http.clone(),
            output: self.output.clone(),
        });

        let mut pool = JoinSet::new();
        for worker in 0..workers {
            let queue = Arc::clone(&queue);
            let context = Arc::clone(&context);
            pool.spawn(async move {
                let mut outcomes = Vec::new();
                while let Some(unit) = next_unit(&queue) {
                    tracing::debug!("worker {} took unit {}", worker, unit.name);
                    let name = unit.name.clone();
                    let source = unit.targets.first().cloned().unwrap_or_else(|| name.clone());
                    let context = Arc::clone(&context);
                    let work = async move { run_unit(&context.http, &context.output, &unit).await };
                    outcomes.push(run_isolated(name, source, work).await);
                }
                outcomes
            });
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = pool.join_next().await {
            match joined {
                Ok(done) => outcomes.extend(done),
                Err(e) => tracing::error!("Worker task failed: {}", e),
            }
        }

        let elapsed = started.elapsed();
        tracing::info!(
            "Run finished in {:.2}s: {} units",
            elapsed.as_secs_f64(),
            outcomes.len()
        );

        RunSummary { outcomes, elapsed }
    }
}

fn next_unit(queue: &Mutex<VecDeque<CrawlUnit>>) -> Option<CrawlUnit> {
    match queue.lock() {
        Ok(mut queue) => queue.pop_front(),
        Err(poisoned) => poisoned.into_inner().pop_front(),
    }
}

/// Runs one unit on its own task
///
/// A panic inside the unit is turned into an outcome carrying the error, so
/// the worker keeps draining the queue and no outcome is lost.
async fn run_isolated<F>(unit: String, source: String, work: F) -> CrawlOutcome
where
    F: Future<Output = CrawlOutcome> + Send + 'static,
{
    match tokio::spawn(work).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("[{}] unit aborted: {}", unit, e);
            let mut outcome = CrawlOutcome::new(unit);
            outcome.record_error(source, format!("unit aborted: {}", e));
            outcome
        }
    }
}

/// Crawls one unit and downloads everything it found
///
/// # Behavior
///
/// 1. Build a fetcher (own HTTP client and browser) for the unit
/// 2. Traverse every target, collecting image links
/// 3. Download each link; failures are recorded and the next link is tried
/// 4. Shut the fetcher's browser down
pub async fn run_unit(http: &HttpConfig, output: &Path, unit: &CrawlUnit) -> CrawlOutcome {
    let started = Instant::now();
    let mut outcome = CrawlOutcome::new(unit.name.clone());

    let fetcher = match Fetcher::for_unit(http, unit) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            tracing::error!("[{}] cannot build fetcher: {}", unit.name, e);
            let source = unit.targets.first().cloned().unwrap_or_default();
            outcome.record_error(source, e);
            return outcome;
        }
    };

    tracing::info!(
        "[{}] start: {} targets, profile {}, max depth {}",
        unit.name,
        unit.targets.len(),
        unit.profile,
        unit.max_depth
    );

    let assets = crawl_targets(&fetcher, unit).await;
    outcome.images_found = assets.len();

    let downloader = Downloader::new(&fetcher, output);
    for link in &assets {
        match downloader.download(link).await {
            Ok(download) => match download.status {
                DownloadStatus::Downloaded => outcome.files_downloaded += 1,
                DownloadStatus::Cached => outcome.cached += 1,
            },
            Err(e) => {
                tracing::warn!("[{}] {}", unit.name, e);
                outcome.record_error(link.clone(), e);
            }
        }
    }

    fetcher.shutdown().await;

    tracing::info!(
        "[{}] done in {:.2}s: {} images, {} downloaded, {} cached, {} errors",
        unit.name,
        started.elapsed().as_secs_f64(),
        outcome.images_found,
        outcome.files_downloaded,
        outcome.cached,
        outcome.error_count()
    );

    outcome
}
