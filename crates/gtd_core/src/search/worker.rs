//! Background search worker with cancel-and-restart semantics.
//!
//! # Responsibility
//! - Run full-text queries off the caller's thread on one dedicated
//!   connection, so typing into a search box never blocks on SQLite.
//!
//! # Invariants
//! - Exactly one worker thread and one job queue per `SearchWorker`.
//! - `submit` bumps the generation and interrupts the running query before
//!   enqueueing, so at most the newest job runs to completion.
//! - Outcomes are delivered only for the generation that is current when
//!   the query finishes; superseded work is dropped silently.
//! - Dropping the worker stops and joins the thread.

use crate::db::open_db;
use crate::search::fts::{search_all, SearchHit, SearchQuery};
use crate::search::{SearchError, SearchResult};
use log::{debug, error, info};
use rusqlite::{Connection, InterruptHandle};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const WORKER_THREAD_NAME: &str = "gtd-search";

/// Result of one completed, still-current search.
#[derive(Debug)]
pub struct SearchOutcome {
    pub generation: u64,
    pub query: SearchQuery,
    pub result: SearchResult<Vec<SearchHit>>,
}

struct SearchJob {
    generation: u64,
    query: SearchQuery,
}

/// Handle to the background search thread.
pub struct SearchWorker {
    jobs: Option<Sender<SearchJob>>,
    outcomes: Receiver<SearchOutcome>,
    generation: Arc<AtomicU64>,
    interrupt: InterruptHandle,
    thread: Option<JoinHandle<()>>,
}

impl SearchWorker {
    /// Opens a dedicated connection to `db_path` and starts the worker.
    pub fn spawn(db_path: impl AsRef<Path>) -> SearchResult<Self> {
        let conn = open_db(db_path)?;
        Self::with_connection(conn)
    }

    /// Starts the worker on an already-migrated connection.
    pub fn with_connection(conn: Connection) -> SearchResult<Self> {
        let (job_tx, job_rx) = mpsc::channel();
        let (outcome_tx, outcome_rx) = mpsc::channel();
        let generation = Arc::new(AtomicU64::new(0));
        let interrupt = conn.get_interrupt_handle();

        let worker_generation = Arc::clone(&generation);
        let thread = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run_worker(conn, job_rx, outcome_tx, worker_generation))
            .map_err(SearchError::Spawn)?;

        info!("event=search_worker_start module=search status=ok");
        Ok(Self {
            jobs: Some(job_tx),
            outcomes: outcome_rx,
            generation,
            interrupt,
            thread: Some(thread),
        })
    }

    /// Queues `query`, cancelling whatever search is in flight.
    ///
    /// Returns the generation number identifying this search.
    pub fn submit(&self, query: SearchQuery) -> SearchResult<u64> {
        let jobs = self.jobs.as_ref().ok_or(SearchError::WorkerStopped)?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.interrupt.interrupt();
        jobs.send(SearchJob { generation, query })
            .map_err(|_| SearchError::WorkerStopped)?;
        Ok(generation)
    }

    /// Generation of the most recently submitted search.
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Returns the newest delivered outcome without blocking.
    pub fn try_latest(&self) -> Option<SearchOutcome> {
        let mut latest = None;
        while let Ok(outcome) = self.outcomes.try_recv() {
            if outcome.generation == self.current_generation() {
                latest = Some(outcome);
            }
        }
        latest
    }

    /// Blocks until the outcome for `generation` arrives.
    ///
    /// # Errors
    /// - `Cancelled` when a newer search replaced `generation`.
    /// - `TimedOut` when nothing arrived before `timeout`.
    pub fn wait_for(&self, generation: u64, timeout: Duration) -> SearchResult<Vec<SearchHit>> {
        let deadline = Instant::now() + timeout;
        loop {
            if generation < self.current_generation() {
                return Err(SearchError::Cancelled);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.outcomes.recv_timeout(remaining) {
                Ok(outcome) if outcome.generation == generation => return outcome.result,
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) => return Err(SearchError::TimedOut),
                Err(RecvTimeoutError::Disconnected) => return Err(SearchError::WorkerStopped),
            }
        }
    }

    /// Stops the worker and waits for its thread to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(jobs) = self.jobs.take() else {
            return;
        };
        self.interrupt.interrupt();
        drop(jobs);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("event=search_worker_stop module=search status=error error_code=thread_panicked");
                return;
            }
        }
        info!("event=search_worker_stop module=search status=ok");
    }
}

impl Drop for SearchWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(
    conn: Connection,
    jobs: Receiver<SearchJob>,
    outcomes: Sender<SearchOutcome>,
    generation: Arc<AtomicU64>,
) {
    while let Ok(mut job) = jobs.recv() {
        while let Ok(newer) = jobs.try_recv() {
            job = newer;
        }
        if job.generation != generation.load(Ordering::SeqCst) {
            debug!(
                "event=search_skip module=search generation={}",
                job.generation
            );
            continue;
        }

        let started_at = Instant::now();
        let result = search_all(&conn, &job.query);
        let elapsed_ms = started_at.elapsed().as_millis();

        if job.generation != generation.load(Ordering::SeqCst) {
            debug!(
                "event=search_discard module=search generation={} duration_ms={}",
                job.generation, elapsed_ms
            );
            continue;
        }

        match &result {
            Ok(hits) => debug!(
                "event=search module=search status=ok generation={} hits={} duration_ms={}",
                job.generation,
                hits.len(),
                elapsed_ms
            ),
            Err(err) => debug!(
                "event=search module=search status=error generation={} duration_ms={} error={}",
                job.generation, elapsed_ms, err
            ),
        }

        let outcome = SearchOutcome {
            generation: job.generation,
            query: job.query,
            result,
        };
        if outcomes.send(outcome).is_err() {
            break;
        }
    }
}
