//! RendererHandle - manages a renderer with isolated queue and worker task

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{ContractError, GeoBounds, MapRenderer, TrackUpdate};

use crate::metrics::WorkerMetrics;

/// Handle to a running renderer worker
pub struct RendererHandle {
    /// Renderer name
    name: String,
    /// Channel to send updates to worker
    tx: mpsc::Sender<TrackUpdate>,
    /// Shared metrics
    metrics: Arc<WorkerMetrics>,
    /// Worker task handle
    worker_handle: JoinHandle<()>,
}

impl RendererHandle {
    /// Create a new RendererHandle and spawn the worker task
    pub fn spawn<R: MapRenderer + Send + 'static>(renderer: R, queue_capacity: usize) -> Self {
        let name = renderer.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity);
        let metrics = Arc::new(WorkerMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();

        let worker_handle = tokio::spawn(async move {
            renderer_worker(renderer, rx, worker_metrics, worker_name).await;
        });

        Self {
            name,
            tx,
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

    /// Send an update to the renderer (non-blocking)
    ///
    /// Returns true if queued, false if the queue is full (update dropped)
    pub fn try_send(&self, update: TrackUpdate) -> bool {
        match self.tx.try_send(update) {
            Ok(()) => {
                self.metrics
                    .set_queue_len(self.tx.max_capacity() - self.tx.capacity());
                true
            }
            Err(mpsc::error::TrySendError::Full(u)) => {
                self.metrics.inc_dropped_count();
                metrics::counter!("renderer_updates_dropped_total", "renderer" => self.name.clone())
                    .increment(1);
                warn!(
                    renderer = %self.name,
                    path_len = u.path.len(),
                    "Queue full, update dropped"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(renderer = %self.name, "Renderer worker closed unexpectedly");
                false
            }
        }
    }

    /// Shutdown the renderer worker gracefully
    #[instrument(name = "renderer_handle_shutdown", skip(self), fields(renderer = %self.name))]
    pub async fn shutdown(self) {
        // Dropping the sender ends the worker loop
        drop(self.tx);
        if let Err(e) = self.worker_handle.await {
            error!(renderer = %self.name, error = ?e, "Worker task panicked");
        }
        debug!(renderer = %self.name, "RendererHandle shutdown complete");
    }
}

/// Apply one update: marker, route, then view bounds if the path outgrew them.
///
/// The three calls are independent; a failing one does not skip the others.
/// Returns the number of failed calls.
async fn render_update<R: MapRenderer>(
    renderer: &mut R,
    update: &TrackUpdate,
    view: &mut Option<GeoBounds>,
    metrics: &WorkerMetrics,
    name: &str,
) -> u64 {
    let mut failures = 0;

    if let Err(e) = renderer.update_current_position(&update.position).await {
        report_failure(name, "update_current_position", update, &e, metrics);
        failures += 1;
    }

    if let Err(e) = renderer.draw_path(&update.path).await {
        report_failure(name, "draw_path", update, &e, metrics);
        failures += 1;
    }

    let outgrown = view.is_none_or(|current| !current.contains(&update.bounds));
    if outgrown {
        match renderer.set_view_bounds(&update.bounds).await {
            Ok(()) => {
                *view = Some(update.bounds);
                metrics.inc_bounds_updates();
            }
            // view left as is, the next update retries
            Err(e) => {
                report_failure(name, "set_view_bounds", update, &e, metrics);
                failures += 1;
            }
        }
    }

    failures
}

fn report_failure(
    name: &str,
    operation: &'static str,
    update: &TrackUpdate,
    error: &ContractError,
    metrics: &WorkerMetrics,
) {
    metrics.inc_failure_count();
    metrics::counter!(
        "renderer_failures_total",
        "renderer" => name.to_string(),
        "operation" => operation
    )
    .increment(1);
    error!(
        renderer = %name,
        session_id = %update.session_id,
        operation,
        error = %error,
        "Render call failed"
    );
}

/// Worker task that consumes updates and drives the renderer
#[instrument(
    name = "renderer_worker_loop",
    skip(renderer, rx, metrics),
    fields(renderer = %name)
)]
async fn renderer_worker<R: MapRenderer>(
    mut renderer: R,
    mut rx: mpsc::Receiver<TrackUpdate>,
    metrics: Arc<WorkerMetrics>,
    name: String,
) {
    debug!(renderer = %name, "Renderer worker started");

    let mut view: Option<GeoBounds> = None;
    let mut session = None;

    while let Some(update) = rx.recv().await {
        metrics.set_queue_len(rx.len());

        // a new session starts from a fresh view
        if session.as_ref() != Some(&update.session_id) {
            session = Some(update.session_id.clone());
            view = None;
        }

        // failures are already counted; the next update redraws the whole path
        if render_update(&mut renderer, &update, &mut view, &metrics, &name).await == 0 {
            metrics.inc_processed_count();
        }
    }

    if let Err(e) = renderer.close().await {
        error!(renderer = %name, error = %e, "Close failed on shutdown");
    }

    debug!(renderer = %name, "Renderer worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::track_update;
    use contracts::{GeoPoint, PathView};
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::time::{sleep, Duration};

    /// Mock renderer for testing
    struct MockRenderer {
        name: String,
        draws: Arc<AtomicU64>,
        bounds_calls: Arc<AtomicU64>,
        should_fail: bool,
        marker_fails: bool,
        delay_ms: u64,
    }

    impl MockRenderer {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                draws: Arc::new(AtomicU64::new(0)),
                bounds_calls: Arc::new(AtomicU64::new(0)),
                should_fail: false,
                marker_fails: false,
                delay_ms: 0,
            }
        }
    }

    impl MapRenderer for MockRenderer {
        fn name(&self) -> &str {
            &self.name
        }

        async fn draw_path(&mut self, _path: &PathView) -> Result<(), ContractError> {
            if self.delay_ms > 0 {
                sleep(Duration::from_millis(self.delay_ms)).await;
            }
            if self.should_fail {
                return Err(ContractError::renderer(&self.name, "mock failure"));
            }
            self.draws.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        async fn update_current_position(&mut self, _p: &GeoPoint) -> Result<(), ContractError> {
            if self.marker_fails {
                return Err(ContractError::renderer(&self.name, "marker rejected"));
            }
            Ok(())
        }

        async fn set_view_bounds(&mut self, _b: &GeoBounds) -> Result<(), ContractError> {
            self.bounds_calls.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_renderer_handle_basic() {
        let renderer = MockRenderer::new("test");
        let draws = Arc::clone(&renderer.draws);

        let handle = RendererHandle::spawn(renderer, 10);
        for i in 1..=5 {
            assert!(handle.try_send(track_update("act-1", i)));
        }

        let metrics = Arc::clone(handle.metrics());
        handle.shutdown().await;
        assert_eq!(draws.load(Ordering::Relaxed), 5);
        assert_eq!(metrics.processed_count(), 5);
    }

    #[tokio::test]
    async fn test_bounds_only_when_path_outgrows_view() {
        let renderer = MockRenderer::new("bounds");
        let bounds_calls = Arc::clone(&renderer.bounds_calls);

        let handle = RendererHandle::spawn(renderer, 10);
        // the same path twice, then a longer one
        handle.try_send(track_update("act-1", 3));
        handle.try_send(track_update("act-1", 3));
        handle.try_send(track_update("act-1", 4));
        // new session resets the view
        handle.try_send(track_update("act-2", 1));

        handle.shutdown().await;
        assert_eq!(bounds_calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn test_renderer_handle_queue_full() {
        let mut renderer = MockRenderer::new("slow");
        renderer.delay_ms = 100;

        let handle = RendererHandle::spawn(renderer, 2);
        for i in 1..=10 {
            handle.try_send(track_update("act-1", i));
        }

        assert!(handle.metrics().dropped_count() > 0);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_renderer_failure_isolation() {
        let mut renderer = MockRenderer::new("failing");
        renderer.should_fail = true;

        let handle = RendererHandle::spawn(renderer, 10);
        for i in 1..=3 {
            handle.try_send(track_update("act-1", i));
        }

        sleep(Duration::from_millis(50)).await;
        assert_eq!(handle.metrics().failure_count(), 3);

        // still accepting work after failures
        assert!(handle.try_send(track_update("act-1", 4)));
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_marker_failure_still_draws_route() {
        let mut renderer = MockRenderer::new("marker");
        renderer.marker_fails = true;
        let draws = Arc::clone(&renderer.draws);
        let bounds_calls = Arc::clone(&renderer.bounds_calls);

        let handle = RendererHandle::spawn(renderer, 10);
        for i in 1..=3 {
            handle.try_send(track_update("act-1", i));
        }

        let metrics = Arc::clone(handle.metrics());
        handle.shutdown().await;
        assert_eq!(draws.load(Ordering::Relaxed), 3);
        assert_eq!(bounds_calls.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.failure_count(), 3);
        assert_eq!(metrics.processed_count(), 0);
    }
}
