//! SummaryWriter - hands finished activities to the persistence collaborator
//!
//! 单独的 worker 消费摘要通道；保存失败只记录日志和计数，不重试。

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use contracts::{ActivityStore, ActivitySummary, StoreConfig, StoreType};

use crate::error::DispatcherError;
use crate::metrics::WorkerMetrics;
use crate::stores::{JsonFileStore, LogStore};

/// Handle to a running persistence worker
pub struct SummaryWriter {
    name: String,
    metrics: Arc<WorkerMetrics>,
    worker_handle: JoinHandle<()>,
}

impl SummaryWriter {
    /// Spawn a worker draining `rx` into `store`
    pub fn spawn<S: ActivityStore + Send + 'static>(
        store: S,
        rx: mpsc::Receiver<ActivitySummary>,
    ) -> Self {
        let name = store.name().to_string();
        let metrics = Arc::new(WorkerMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();
        let worker_handle = tokio::spawn(async move {
            persistence_worker(store, rx, worker_metrics, worker_name).await;
        });

        Self {
            name,
            metrics,
            worker_handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<WorkerMetrics> {
        &self.metrics
    }

    /// Wait until the summary channel closes and the store is flushed
    #[instrument(name = "summary_writer_join", skip(self), fields(store = %self.name))]
    pub async fn join(self) {
        if let Err(e) = self.worker_handle.await {
            error!(store = %self.name, error = ?e, "Persistence worker panicked");
        }
    }
}

#[instrument(
    name = "persistence_worker_loop",
    skip(store, rx, metrics),
    fields(store = %name)
)]
async fn persistence_worker<S: ActivityStore>(
    mut store: S,
    mut rx: mpsc::Receiver<ActivitySummary>,
    metrics: Arc<WorkerMetrics>,
    name: String,
) {
    debug!(store = %name, "Persistence worker started");

    while let Some(summary) = rx.recv().await {
        metrics.set_queue_len(rx.len());
        match store.save(&summary).await {
            Ok(()) => {
                metrics.inc_processed_count();
                metrics::counter!("persistence_summaries_saved_total").increment(1);
            }
            Err(e) => {
                metrics.inc_failure_count();
                metrics::counter!("persistence_failures_total").increment(1);
                error!(
                    store = %name,
                    session_id = %summary.session_id,
                    error = %e,
                    "Failed to persist activity"
                );
            }
        }
    }

    if let Err(e) = store.flush().await {
        error!(store = %name, error = %e, "Flush failed on shutdown");
    }
    info!(
        store = %name,
        saved = metrics.processed_count(),
        failed = metrics.failure_count(),
        "Persistence worker stopped"
    );
}

/// Build a writer from configuration
#[instrument(
    name = "persistence_create_writer",
    skip(config, rx),
    fields(store_type = ?config.store_type)
)]
pub fn create_summary_writer(
    config: &StoreConfig,
    rx: mpsc::Receiver<ActivitySummary>,
) -> Result<SummaryWriter, DispatcherError> {
    match config.store_type {
        StoreType::Log => Ok(SummaryWriter::spawn(LogStore::new("log_store"), rx)),
        StoreType::JsonFile => {
            let store = JsonFileStore::from_params("json_file_store", &config.params)
                .map_err(|e| DispatcherError::store_creation("json_file_store", e.to_string()))?;
            Ok(SummaryWriter::spawn(store, rx))
        }
    }
}
