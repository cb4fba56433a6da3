// src/checker/validator.rs
// =============================================================================
// Runs the probe over every link of a page with bounded parallelism.
//
// How it works:
// 1. Enqueue every URL (internal first, then external) into a work queue
//    sized to the link count, so enqueueing never waits on a worker
// 2. Close the queue and start min(max_workers, link count) workers
// 3. Each worker claims the next URL, probes it, and sends inaccessible
//    URLs into a failure channel (also sized to the link count)
// 4. Join every worker, then drain the failure channel
//
// After cancellation, workers stop claiming URLs. URLs still sitting in
// the queue are never probed and never reported: callers should read them
// as "unknown", not "accessible".
// =============================================================================

use super::probe::{LinkProbe, Probe, ProbeResult};
use crate::config::ProbeConfig;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, debug_span, info, warn, Instrument};

// The links found on a page, split by whether they stay on the page's host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkSet {
    pub internal: Vec<String>,
    pub external: Vec<String>,
}

impl LinkSet {
    pub fn new(internal: Vec<String>, external: Vec<String>) -> Self {
        Self { internal, external }
    }

    pub fn len(&self) -> usize {
        self.internal.len() + self.external.len()
    }

    /// Internal links, then external links, duplicates and all.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.internal.iter().chain(self.external.iter())
    }
}

// What a validation run found.
//
// `urls` is in arrival order, which depends on which worker finished first.
// Do not rely on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FailureSet {
    /// How many URLs were probed to a verdict (less than the link count if
    /// the run was cancelled)
    pub checked: usize,
    /// URLs that were still unreachable after all retries
    pub urls: Vec<String>,
}

impl FailureSet {
    pub fn len(&self) -> usize {
        self.urls.len()
    }
}

// Failures of the validation machinery itself. An unreachable link is
// never one of these; it shows up in FailureSet instead.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("link work queue closed before all links were enqueued")]
    QueueClosed,
    #[error("link check worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Bounded worker pool over a LinkProbe.
#[derive(Debug)]
pub struct Validator<P = Probe> {
    probe: Arc<P>,
    max_workers: usize,
}

impl Validator<Probe> {
    /// Builds a validator around a real HTTP probe.
    pub fn from_config(config: &ProbeConfig) -> anyhow::Result<Self> {
        let client = config.build_client()?;
        Ok(Self::new(
            Probe::new(client, config.clone()),
            config.max_workers(),
        ))
    }
}

impl<P: LinkProbe> Validator<P> {
    pub fn new(probe: P, max_workers: usize) -> Self {
        Self {
            probe: Arc::new(probe),
            max_workers: max_workers.max(1),
        }
    }

    /// Probes every link and returns the ones that stayed unreachable.
    pub async fn validate(
        &self,
        cancel: &CancellationToken,
        links: &LinkSet,
    ) -> Result<FailureSet, ValidateError> {
        debug!("Setting up link check process");

        let total_links = links.len();
        if total_links == 0 {
            info!("No links to check, skipping process");
            return Ok(FailureSet::default());
        }

        info!(total_links, "Starting to check links");

        // Dispatching: the queue holds every link, so none of these sends wait
        let (job_tx, job_rx) = mpsc::channel::<String>(total_links);
        for url in links.iter() {
            job_tx
                .send(url.clone())
                .await
                .map_err(|_| ValidateError::QueueClosed)?;
        }
        drop(job_tx);

        // Draining
        let jobs = Arc::new(Mutex::new(job_rx));
        let (failure_tx, mut failure_rx) = mpsc::channel::<String>(total_links);
        let worker_count = self.max_workers.min(total_links);
        debug!(worker_count, "Spawning link check workers");

        let workers: Vec<JoinHandle<usize>> = (0..worker_count)
            .map(|worker_id| {
                let worker = run_worker(
                    Arc::clone(&self.probe),
                    cancel.clone(),
                    Arc::clone(&jobs),
                    failure_tx.clone(),
                );
                tokio::spawn(worker.instrument(debug_span!("link_worker", worker_id)))
            })
            .collect();
        drop(failure_tx);

        // Joined: every sender is gone once this completes
        let mut checked = 0;
        for outcome in futures::future::join_all(workers).await {
            checked += outcome?;
        }

        // Collected
        let mut urls = Vec::new();
        while let Some(url) = failure_rx.recv().await {
            urls.push(url);
        }

        if checked < total_links {
            warn!(
                total_links,
                unchecked_links = total_links - checked,
                "Link check cancelled before every link was probed"
            );
        }

        info!(
            total_links_checked = checked,
            inaccessible_links_found = urls.len(),
            "Finished checking all links"
        );

        Ok(FailureSet { checked, urls })
    }
}

// Claims URLs until the queue runs dry or the run is cancelled.
// Returns how many URLs this worker probed.
async fn run_worker<P: LinkProbe>(
    probe: Arc<P>,
    cancel: CancellationToken,
    jobs: Arc<Mutex<mpsc::Receiver<String>>>,
    failures: mpsc::Sender<String>,
) -> usize {
    let mut checked = 0;

    loop {
        let next = {
            let mut jobs = jobs.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                url = jobs.recv() => url,
            }
        };

        let Some(url) = next else {
            break;
        };

        if let ProbeResult::Inaccessible(url) = probe.probe(&cancel, &url).await {
            if failures.send(url).await.is_err() {
                warn!("Failure channel closed, dropping inaccessible link");
            }
        }
        checked += 1;
    }

    debug!(checked, "Link check worker finished");
    checked
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why Arc<Mutex<Receiver>>?
//    - tokio's mpsc channel has exactly one receiver
//    - Wrapping it in Arc<Mutex<...>> lets several workers share it
//    - Whoever holds the lock takes the next URL; the lock is released
//      before the probe runs, so probes still overlap
//
// 2. What does tokio::select! with `biased;` do?
//    - Waits on several futures and runs the branch of whichever is ready
//    - `biased` checks branches top to bottom, so a cancelled token wins
//      over a URL that is also ready
//
// 3. Why drop(job_tx) and drop(failure_tx)?
//    - A channel's recv() returns None only once every Sender is gone
//    - Dropping our own copies leaves the workers holding the last ones
//
// 4. What is join_all?
//    - Waits for every JoinHandle and gives back their results in order
//    - A JoinError means the task panicked or was aborted
// -----------------------------------------------------------------------------
