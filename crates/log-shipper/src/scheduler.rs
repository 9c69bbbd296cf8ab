// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Named, unique, periodic background jobs.
//!
//! A job is registered once under a name and then runs every period until it
//! is cancelled. Runs of the same job never overlap: the next run is only
//! scheduled after the current one returned.
//!
//! ```text
//!          ┌──── wait (period | backoff) ◄───────────────┐
//!          v                                             │
//!   constraints met? ── no ──► skip this run ────────────┤
//!          │ yes                                         │
//!          v                                             │
//!       job.run() ── Success | Failure ─► period ────────┤
//!          │                                             │
//!          └──── Retry ─► backoff (doubling, ≤ period) ──┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// What a single run of a job reports back to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobResult {
    Success,
    /// Transient failure; run again after a backoff.
    Retry,
    /// Permanent failure for this run; wait a full period.
    Failure,
}

/// Work executed on every tick of a periodic job.
#[async_trait]
pub trait PeriodicJob: Send + Sync {
    async fn run(&self) -> JobResult;
}

/// Source of connectivity information for [`JobConstraint::NetworkConnected`].
#[async_trait]
pub trait NetworkMonitor: Send + Sync {
    async fn is_connected(&self) -> bool;
}

/// Monitor for hosts without connectivity information.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConnected;

#[async_trait]
impl NetworkMonitor for AlwaysConnected {
    async fn is_connected(&self) -> bool {
        true
    }
}

/// Precondition checked before every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobConstraint {
    NetworkConnected,
}

/// What to do when a job with the same name is already scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistingJobPolicy {
    /// Leave the live job alone; the new registration is a no-op.
    Keep,
    /// Cancel the live job and schedule the new one.
    Replace,
}

/// Timing and constraints of a periodic job.
#[derive(Debug, Clone)]
pub struct PeriodicJobRequest {
    period: Duration,
    retry_backoff: Duration,
    constraints: Vec<JobConstraint>,
}

impl PeriodicJobRequest {
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            retry_backoff: period,
            constraints: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    #[must_use]
    pub fn with_constraint(mut self, constraint: JobConstraint) -> Self {
        if !self.constraints.contains(&constraint) {
            self.constraints.push(constraint);
        }
        self
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    fn requires_network(&self) -> bool {
        self.constraints.contains(&JobConstraint::NetworkConnected)
    }
}

#[derive(Debug)]
struct ScheduledJob {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ScheduledJob {
    fn is_live(&self) -> bool {
        !self.cancel.is_cancelled() && !self.task.is_finished()
    }
}

/// Runs named periodic jobs on the tokio runtime.
#[derive(Clone)]
pub struct JobScheduler {
    jobs: Arc<Mutex<HashMap<String, ScheduledJob>>>,
    network: Arc<dyn NetworkMonitor>,
    cancel: CancellationToken,
}

impl JobScheduler {
    #[must_use]
    pub fn new(network: Arc<dyn NetworkMonitor>) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            network,
            cancel: CancellationToken::new(),
        }
    }

    /// Registers `job` under `name`.
    ///
    /// Returns `true` if a new job was scheduled, `false` if `policy` was
    /// [`ExistingJobPolicy::Keep`] and a live job already holds the name, or
    /// if the scheduler has been shut down.
    pub async fn enqueue_unique_periodic(
        &self,
        name: &str,
        request: PeriodicJobRequest,
        policy: ExistingJobPolicy,
        job: Arc<dyn PeriodicJob>,
    ) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }

        let mut jobs = self.jobs.lock().await;
        if let Some(existing) = jobs.get(name) {
            if existing.is_live() && policy == ExistingJobPolicy::Keep {
                debug!("LOGS | Job {} already scheduled, keeping it", name);
                return false;
            }
            existing.cancel.cancel();
        }

        let cancel = self.cancel.child_token();
        let task = tokio::spawn(run_periodic(
            name.to_string(),
            request,
            job,
            Arc::clone(&self.network),
            cancel.clone(),
        ));
        jobs.insert(name.to_string(), ScheduledJob { cancel, task });
        debug!("LOGS | Scheduled periodic job {}", name);
        true
    }

    /// Stops the job registered under `name`. A run in progress completes.
    pub async fn cancel(&self, name: &str) -> bool {
        match self.jobs.lock().await.remove(name) {
            Some(job) => {
                job.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn is_scheduled(&self, name: &str) -> bool {
        self.jobs
            .lock()
            .await
            .get(name)
            .is_some_and(ScheduledJob::is_live)
    }

    /// Cancels every job and waits for in-progress runs to return.
    ///
    /// Jobs stay registered until their task has been joined, so dropping
    /// this future part-way leaves the rest for [`JobScheduler::abort`].
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let mut jobs = self.jobs.lock().await;
        let names: Vec<String> = jobs.keys().cloned().collect();
        for name in names {
            if let Some(job) = jobs.get_mut(&name) {
                if let Err(e) = (&mut job.task).await {
                    warn!("LOGS | Periodic job task ended abnormally: {}", e);
                }
            }
            jobs.remove(&name);
        }
    }

    /// Cancels every job and aborts runs still in progress.
    pub async fn abort(&self) {
        self.cancel.cancel();
        for (name, job) in self.jobs.lock().await.drain() {
            if !job.task.is_finished() {
                debug!("LOGS | Aborting periodic job {}", name);
            }
            job.task.abort();
        }
    }
}

async fn run_periodic(
    name: String,
    request: PeriodicJobRequest,
    job: Arc<dyn PeriodicJob>,
    network: Arc<dyn NetworkMonitor>,
    cancel: CancellationToken,
) {
    // The first run happens one full period after registration.
    let mut delay = request.period;
    let mut backoff = request.retry_backoff.min(request.period);

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }

        if request.requires_network() && !network.is_connected().await {
            debug!("LOGS | Network unavailable, skipping run of {}", name);
            delay = request.period;
            continue;
        }

        match job.run().await {
            JobResult::Success | JobResult::Failure => {
                delay = request.period;
                backoff = request.retry_backoff.min(request.period);
            }
            JobResult::Retry => {
                debug!("LOGS | Job {} asked for retry in {:?}", name, backoff);
                delay = backoff;
                backoff = backoff.saturating_mul(2).min(request.period);
            }
        }
    }
    debug!("LOGS | Periodic job {} stopped", name);
}
