// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use tokio::sync::{Mutex as TokioMutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{DeliveryMode, ShipperConfig};
use crate::drain::{DrainOutcome, DurableDrain, VolatileDrain};
use crate::error::ShipperError;
use crate::http::get_client;
use crate::layer::suppressed;
use crate::queue::{volatile, DurableQueue};
use crate::scheduler::{
    AlwaysConnected, ExistingJobPolicy, JobConstraint, JobScheduler, NetworkMonitor,
    PeriodicJob, PeriodicJobRequest,
};
use crate::sink::LogSink;
use crate::store::{LogStore, SledStore};
use crate::uploader::{HttpUploader, Uploader};
use crate::writer::{StoreWriter, StoreWriterHandle};

/// Status of the log shipper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    /// Accepting and shipping records.
    Running,
    /// Shutdown requested, tasks are finishing.
    Stopping,
    /// Every task has exited.
    Stopped,
}

/// Builder for a running shipper.
///
/// Collaborators left unset are created from the configuration: an HTTP
/// uploader over [`get_client`], a [`SledStore`] at `store_path`, and a
/// monitor that always reports the network as connected.
pub struct LogShipper {
    config: ShipperConfig,
    client: Option<reqwest::Client>,
    store: Option<Arc<dyn LogStore>>,
    uploader: Option<Arc<dyn Uploader>>,
    network: Option<Arc<dyn NetworkMonitor>>,
}

impl LogShipper {
    #[must_use]
    pub fn new(config: ShipperConfig) -> Self {
        Self {
            config,
            client: None,
            store: None,
            uploader: None,
            network: None,
        }
    }

    /// Uses a host-provided HTTP client for the default uploader.
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn LogStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_uploader(mut self, uploader: Arc<dyn Uploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    #[must_use]
    pub fn with_network_monitor(mut self, network: Arc<dyn NetworkMonitor>) -> Self {
        self.network = Some(network);
        self
    }

    /// Validates the configuration, spawns the background tasks of the
    /// configured mode, and returns a handle to them.
    pub async fn start(self) -> Result<ShipperHandle, ShipperError> {
        let config = self.config;
        config.validate()?;

        let uploader: Arc<dyn Uploader> = match self.uploader {
            Some(uploader) => uploader,
            None => {
                let client = self.client.unwrap_or_else(|| get_client(&config));
                Arc::new(HttpUploader::new(client, config.endpoint_url.clone()))
            }
        };
        let cancel = CancellationToken::new();
        let batch_limit = config.effective_batch_limit();

        let (sink, durable, tasks) = match config.mode() {
            DeliveryMode::Durable => {
                let store: Arc<dyn LogStore> = match self.store {
                    Some(store) => store,
                    None => Arc::new(SledStore::open(&config.store_path)?),
                };
                let queue = DurableQueue::new(store);
                let (writer, writer_handle) = StoreWriter::new(queue.clone());
                let writer_task = tokio::spawn(suppressed(writer.run(cancel.clone())));

                let drain = Arc::new(DurableDrain::new(queue, uploader, batch_limit));
                let network = self.network.unwrap_or_else(|| Arc::new(AlwaysConnected));
                let scheduler = JobScheduler::new(network);
                let request = PeriodicJobRequest::new(config.interval)
                    .with_retry_backoff(config.retry_backoff)
                    .with_constraint(JobConstraint::NetworkConnected);
                let job: Arc<dyn PeriodicJob> = drain.clone();
                scheduler
                    .enqueue_unique_periodic(
                        &config.job_name,
                        request,
                        ExistingJobPolicy::Keep,
                        job,
                    )
                    .await;

                let sink = LogSink::durable(writer_handle.clone(), &config.default_tag);
                let durable = DurableParts {
                    drain,
                    scheduler,
                    writer: writer_handle,
                };
                (sink, Some(durable), vec![writer_task])
            }
            DeliveryMode::Volatile => {
                let (sender, receiver) = volatile::channel();
                let drain =
                    VolatileDrain::new(receiver, uploader, batch_limit, config.flush_timeout);
                let drain_task = tokio::spawn(suppressed(drain.run(cancel.clone())));
                let sink = LogSink::volatile(sender, &config.default_tag);
                (sink, None, vec![drain_task])
            }
        };

        info!(
            "LOGS | Log shipper started in {:?} mode, shipping to {}",
            config.mode(),
            config.endpoint_url
        );

        Ok(ShipperHandle {
            sink,
            mode: config.mode(),
            status: Arc::new(RwLock::new(ServiceStatus::Running)),
            cancel,
            durable: durable.map(Arc::new),
            tasks: Arc::new(TokioMutex::new(tasks)),
            shutdown_timeout: config.shutdown_timeout,
        })
    }
}

struct DurableParts {
    drain: Arc<DurableDrain>,
    scheduler: JobScheduler,
    writer: StoreWriterHandle,
}

/// Handle to a running shipper.
///
/// Clones share the same shipper; stopping through one stops it for all.
#[derive(Clone)]
pub struct ShipperHandle {
    sink: LogSink,
    mode: DeliveryMode,
    status: Arc<RwLock<ServiceStatus>>,
    cancel: CancellationToken,
    durable: Option<Arc<DurableParts>>,
    tasks: Arc<TokioMutex<Vec<JoinHandle<()>>>>,
    shutdown_timeout: std::time::Duration,
}

impl ShipperHandle {
    /// A producer handle; clone it freely.
    #[must_use]
    pub fn sink(&self) -> LogSink {
        self.sink.clone()
    }

    #[must_use]
    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    pub async fn status(&self) -> ServiceStatus {
        *self.status.read().await
    }

    pub async fn is_running(&self) -> bool {
        self.status().await == ServiceStatus::Running
    }

    /// Drains one durable batch right away, after the records already
    /// handed to the sink have been persisted. Coalesced with a periodic
    /// drain in progress. Returns `None` in volatile mode.
    pub async fn drain_now(&self) -> Option<DrainOutcome> {
        let durable = self.durable.as_ref()?;
        if !durable.writer.sync().await {
            debug!("LOGS | Store writer already stopped, draining what is stored");
        }
        Some(durable.drain.drain().await)
    }

    /// Stops every task.
    ///
    /// Records already accepted are persisted (durable) or given a final
    /// flush (volatile), and an upload in flight is allowed to finish. If
    /// that takes longer than the shutdown timeout the tasks are aborted
    /// and [`ShipperError::ShutdownTimeout`] is returned; an aborted durable
    /// batch stays in the store. Calling this again is a no-op.
    pub async fn shutdown(&self) -> Result<(), ShipperError> {
        {
            let mut status = self.status.write().await;
            if *status != ServiceStatus::Running {
                return Ok(());
            }
            *status = ServiceStatus::Stopping;
        }
        info!("LOGS | Shutting down log shipper");
        self.cancel.cancel();

        let mut tasks = std::mem::take(&mut *self.tasks.lock().await);
        let wait = async {
            if let Some(durable) = &self.durable {
                durable.scheduler.shutdown().await;
            }
            for task in &mut tasks {
                if let Err(e) = task.await {
                    warn!("LOGS | Shipper task ended abnormally: {}", e);
                }
            }
        };

        let result = match tokio::time::timeout(self.shutdown_timeout, wait).await {
            Ok(()) => Ok(()),
            Err(_) => {
                warn!(
                    "LOGS | Shipper tasks still running after {:?}, aborting them",
                    self.shutdown_timeout
                );
                if let Some(durable) = &self.durable {
                    durable.scheduler.abort().await;
                }
                for task in &tasks {
                    task.abort();
                }
                Err(ShipperError::ShutdownTimeout)
            }
        };
        *self.status.write().await = ServiceStatus::Stopped;
        result
    }
}
