//! RendererDispatcher - main loop for fan-out to map renderers

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use contracts::{RendererConfig, RendererType, TrackUpdate};

use crate::error::DispatcherError;
use crate::handle::RendererHandle;
use crate::metrics::MetricsSnapshot;
use crate::renderers::{GeoJsonRenderer, LogRenderer, NetworkRenderer};

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub renderers: Vec<RendererConfig>,
}

/// Builder for creating a RendererDispatcher
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    input_rx: mpsc::Receiver<TrackUpdate>,
}

impl DispatcherBuilder {
    pub fn new(config: DispatcherConfig, input_rx: mpsc::Receiver<TrackUpdate>) -> Self {
        Self { config, input_rx }
    }

    /// Build the dispatcher and start every renderer worker
    #[instrument(name = "dispatcher_builder_build", skip(self))]
    pub async fn build(self) -> Result<RendererDispatcher, DispatcherError> {
        let mut handles = Vec::with_capacity(self.config.renderers.len());
        for renderer_config in &self.config.renderers {
            handles.push(create_renderer_handle(renderer_config).await?);
        }

        Ok(RendererDispatcher {
            handles,
            input_rx: self.input_rx,
        })
    }
}

/// Create a RendererHandle from configuration
#[instrument(
    name = "dispatcher_create_renderer_handle",
    skip(config),
    fields(renderer = %config.name, renderer_type = ?config.renderer_type)
)]
async fn create_renderer_handle(config: &RendererConfig) -> Result<RendererHandle, DispatcherError> {
    match config.renderer_type {
        RendererType::Log => {
            let renderer = LogRenderer::new(&config.name);
            Ok(RendererHandle::spawn(renderer, config.queue_capacity))
        }
        RendererType::GeoJson => {
            let renderer = GeoJsonRenderer::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::renderer_creation(&config.name, e.to_string()))?;
            Ok(RendererHandle::spawn(renderer, config.queue_capacity))
        }
        RendererType::Network => {
            let renderer = NetworkRenderer::from_params(&config.name, &config.params)
                .await
                .map_err(|e| DispatcherError::renderer_creation(&config.name, e.to_string()))?;
            Ok(RendererHandle::spawn(renderer, config.queue_capacity))
        }
    }
}

/// Fans track updates out to every renderer without waiting on any of them
pub struct RendererDispatcher {
    handles: Vec<RendererHandle>,
    input_rx: mpsc::Receiver<TrackUpdate>,
}

impl RendererDispatcher {
    /// Create a dispatcher with custom renderer handles (for testing)
    pub fn with_handles(
        handles: Vec<RendererHandle>,
        input_rx: mpsc::Receiver<TrackUpdate>,
    ) -> Self {
        Self { handles, input_rx }
    }

    /// Metrics for all renderers
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Run the dispatcher main loop
    ///
    /// Returns the final per-renderer metrics once the input channel closes
    /// and every worker has shut down.
    #[instrument(name = "dispatcher_run", skip(self))]
    pub async fn run(mut self) -> Vec<(String, MetricsSnapshot)> {
        info!(renderers = self.handles.len(), "Dispatcher started");

        let mut update_count: u64 = 0;

        while let Some(update) = self.input_rx.recv().await {
            update_count += 1;
            self.dispatch_update(&update);

            if update_count.is_multiple_of(100) {
                debug!(updates = update_count, "Dispatcher progress");
            }
        }

        info!(
            updates = update_count,
            "Dispatcher input closed, shutting down"
        );

        let mut report = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            let name = handle.name().to_string();
            let metrics = std::sync::Arc::clone(handle.metrics());
            handle.shutdown().await;
            report.push((name, metrics.snapshot()));
        }

        info!("Dispatcher shutdown complete");
        report
    }

    /// Spawn the dispatcher as a background task
    pub fn spawn(self) -> JoinHandle<Vec<(String, MetricsSnapshot)>> {
        tokio::spawn(self.run())
    }

    fn dispatch_update(&self, update: &TrackUpdate) {
        for handle in &self.handles {
            handle.try_send(update.clone());
        }
    }
}

/// Convenience function to create a dispatcher from renderer configs
#[instrument(name = "dispatcher_create", skip(renderer_configs, input_rx))]
pub async fn create_dispatcher(
    renderer_configs: Vec<RendererConfig>,
    input_rx: mpsc::Receiver<TrackUpdate>,
) -> Result<RendererDispatcher, DispatcherError> {
    let config = DispatcherConfig {
        renderers: renderer_configs,
    };
    DispatcherBuilder::new(config, input_rx).build().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::track_update;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_dispatcher_fanout() {
        let (input_tx, input_rx) = mpsc::channel(10);

        let handles = vec![
            RendererHandle::spawn(LogRenderer::new("map1"), 10),
            RendererHandle::spawn(LogRenderer::new("map2"), 10),
        ];

        let dispatcher = RendererDispatcher::with_handles(handles, input_rx);
        let task = dispatcher.spawn();

        for i in 1..=5 {
            input_tx.send(track_update("act-1", i)).await.unwrap();
        }
        drop(input_tx);

        let report = task.await.unwrap();
        assert_eq!(report.len(), 2);
        for (_, snapshot) in report {
            assert_eq!(snapshot.processed_count, 5);
        }
    }

    #[tokio::test]
    async fn test_create_dispatcher_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let (input_tx, input_rx) = mpsc::channel(10);

        let configs = vec![
            RendererConfig {
                name: "console".to_string(),
                renderer_type: RendererType::Log,
                queue_capacity: 50,
                params: HashMap::new(),
            },
            RendererConfig {
                name: "file".to_string(),
                renderer_type: RendererType::GeoJson,
                queue_capacity: 50,
                params: HashMap::from([(
                    "path".to_string(),
                    dir.path().join("route.geojson").to_string_lossy().into_owned(),
                )]),
            },
        ];

        let dispatcher = create_dispatcher(configs, input_rx).await.unwrap();
        let task = dispatcher.spawn();

        input_tx.send(track_update("act-1", 2)).await.unwrap();
        drop(input_tx);
        task.await.unwrap();

        assert!(dir.path().join("route.geojson").exists());
    }

    #[tokio::test]
    async fn test_bad_renderer_config_fails_build() {
        let (_tx, input_rx) = mpsc::channel(1);
        let configs = vec![RendererConfig {
            name: "net".to_string(),
            renderer_type: RendererType::Network,
            queue_capacity: 4,
            params: HashMap::new(),
        }];

        let result = create_dispatcher(configs, input_rx).await;
        assert!(matches!(
            result,
            Err(DispatcherError::RendererCreation { .. })
        ));
    }
}
