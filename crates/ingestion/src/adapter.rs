//! 数据源适配器
//!
//! 将 `LocationSource` 的回调桥接到有界通道：规范化原始定位、
//! 透传 provider 错误、按 `DropPolicy` 处理背压。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_channel::{Receiver, Sender, TrySendError};
use contracts::{DropPolicy, LocationCallback, LocationEvent, LocationSource, PositionSample, ProviderError};
use tracing::{debug, trace, warn};

use crate::config::{BackpressureConfig, IngestionMetrics};
use crate::normalize::normalize_fix;

/// 通道中传递的事件
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationUpdate {
    /// 规范化后的定位样本
    Sample(PositionSample),
    /// provider 报告的错误
    ProviderError(ProviderError),
}

/// 数据源适配器
///
/// 每个注册的 `LocationSource` 对应一个适配器。
pub struct SourceAdapter {
    source_name: String,
    source: Box<dyn LocationSource>,
    config: BackpressureConfig,
    listening: Arc<AtomicBool>,
}

impl SourceAdapter {
    pub fn new(
        source_name: String,
        source: Box<dyn LocationSource>,
        config: BackpressureConfig,
    ) -> Self {
        Self {
            source_name,
            source,
            config,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// 启动采集
    ///
    /// `evict` 仅在 `DropOldest` 策略下用于弹出队首。
    pub fn start(
        &self,
        tx: Sender<LocationUpdate>,
        evict: Receiver<LocationUpdate>,
        metrics: Arc<IngestionMetrics>,
    ) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let source_name = self.source_name.clone();
        let drop_policy = self.config.drop_policy;
        let listening = self.listening.clone();

        debug!(source = %source_name, "starting source adapter");

        let callback: LocationCallback = Arc::new(move |event| {
            if !listening.load(Ordering::Relaxed) {
                return;
            }

            metrics.record_received();
            let update = match event {
                LocationEvent::Fix(raw) => match normalize_fix(&raw) {
                    Ok(sample) => {
                        metrics.record_forwarded();
                        LocationUpdate::Sample(sample)
                    }
                    Err(e) => {
                        metrics.record_parse_error();
                        metrics::counter!("ingestion_invalid_fixes_total").increment(1);
                        debug!(source = %source_name, error = %e, "dropping invalid fix");
                        return;
                    }
                },
                LocationEvent::Error(error) => {
                    metrics.record_provider_error();
                    warn!(source = %source_name, error = %error, "location provider error");
                    LocationUpdate::ProviderError(error)
                }
            };

            send_update(&tx, &evict, update, &metrics, &source_name, drop_policy);
        });

        self.source.listen(callback);
    }

    pub fn stop(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            debug!(source = %self.source_name, "stopping source adapter");
            self.source.stop();
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed) && self.source.is_listening()
    }
}

/// Send update, handling backpressure policy
#[inline]
pub fn send_update(
    tx: &Sender<LocationUpdate>,
    evict: &Receiver<LocationUpdate>,
    update: LocationUpdate,
    metrics: &IngestionMetrics,
    source_name: &str,
    drop_policy: DropPolicy,
) {
    let update = match tx.try_send(update) {
        Ok(()) => {
            metrics.update_queue_len(tx.len());
            trace!(source = %source_name, "update sent");
            return;
        }
        Err(TrySendError::Closed(_)) => {
            warn!(source = %source_name, "channel closed");
            return;
        }
        Err(TrySendError::Full(update)) => update,
    };

    metrics.record_dropped();
    metrics::counter!("ingestion_updates_dropped_total").increment(1);
    match drop_policy {
        DropPolicy::DropNewest => {
            trace!(source = %source_name, "update dropped (newest)");
        }
        DropPolicy::DropOldest => {
            let _ = evict.try_recv();
            if tx.try_send(update).is_err() {
                trace!(source = %source_name, "update dropped after eviction");
            } else {
                trace!(source = %source_name, "update dropped (oldest)");
            }
        }
    }
    metrics.update_queue_len(tx.len());
}
