//! Ingestion Pipeline main entry

use std::collections::HashMap;
use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender};
use contracts::LocationSource;
use tracing::{debug, info, instrument};

use crate::adapter::{LocationUpdate, SourceAdapter};
use crate::config::{BackpressureConfig, IngestionMetrics};
use crate::error::{IngestionError, Result};

/// Ingestion Pipeline
///
/// Manages location source adapters and merges them into one update stream.
/// After `start_all` the pipeline drops its own sender, so the receiver
/// reports closed once every source has finished and released its callback.
pub struct IngestionPipeline {
    /// Registered adapters
    adapters: HashMap<String, SourceAdapter>,

    /// Shared metrics
    metrics: Arc<IngestionMetrics>,

    /// Data sender (cloned into each adapter on start)
    tx: Option<Sender<LocationUpdate>>,

    /// Data receiver
    rx: Option<Receiver<LocationUpdate>>,

    /// Receiver clone used for drop-oldest eviction
    evict: Receiver<LocationUpdate>,

    /// Default backpressure configuration
    default_config: BackpressureConfig,
}

impl IngestionPipeline {
    pub fn new(channel_capacity: usize) -> Self {
        Self::with_config(BackpressureConfig {
            channel_capacity,
            ..Default::default()
        })
    }

    /// Create with custom backpressure configuration
    pub fn with_config(config: BackpressureConfig) -> Self {
        let (tx, rx) = bounded(config.channel_capacity.max(1));

        Self {
            adapters: HashMap::new(),
            metrics: Arc::new(IngestionMetrics::new()),
            tx: Some(tx),
            evict: rx.clone(),
            rx: Some(rx),
            default_config: config,
        }
    }

    /// Register a location source
    #[instrument(
        name = "ingestion_register_source",
        skip(self, source, config),
        fields(source = %source.source_name())
    )]
    pub fn register_source(
        &mut self,
        source: Box<dyn LocationSource>,
        config: Option<BackpressureConfig>,
    ) -> Result<()> {
        let name = source.source_name().to_string();
        if self.adapters.contains_key(&name) {
            return Err(IngestionError::DuplicateSource { source_name: name });
        }

        let adapter = SourceAdapter::new(
            name.clone(),
            source,
            config.unwrap_or_else(|| self.default_config.clone()),
        );
        debug!(source = %name, "registered location source");
        self.adapters.insert(name, adapter);
        Ok(())
    }

    /// Start all registered sources
    #[instrument(name = "ingestion_start_all", skip(self))]
    pub fn start_all(&mut self) {
        let Some(tx) = self.tx.take() else {
            debug!("ingestion pipeline already started");
            return;
        };

        info!(count = self.adapters.len(), "starting all location sources");
        for (name, adapter) in &self.adapters {
            debug!(source = %name, "starting adapter");
            adapter.start(tx.clone(), self.evict.clone(), self.metrics.clone());
        }
    }

    /// Stop all sources
    #[instrument(name = "ingestion_stop_all", skip(self))]
    pub fn stop_all(&self) {
        info!(count = self.adapters.len(), "stopping all location sources");
        for (name, adapter) in &self.adapters {
            if adapter.is_listening() {
                debug!(source = %name, "stopping adapter");
            }
            adapter.stop();
        }
    }

    /// Get data stream receiver
    ///
    /// Note: Can only be called once, subsequent calls return None
    pub fn take_receiver(&mut self) -> Option<Receiver<LocationUpdate>> {
        self.rx.take()
    }

    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    pub fn source_count(&self) -> usize {
        self.adapters.len()
    }
}

impl Drop for IngestionPipeline {
    fn drop(&mut self) {
        self.stop_all();
    }
}
