//! Replay 定位源 - 从录制文件回放定位事件
//!
//! 每行一个 JSON 记录：`{"fix": {...}}` 或 `{"error": "permission_denied"}`。
//! 保留文件顺序 (乱序与重复定位也原样回放)，按定位时间戳节奏回放。

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use contracts::{LocationCallback, LocationEvent, LocationSource};
use tracing::{debug, info};

use crate::error::{IngestionError, Result};

/// Replay 配置
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// 回放速度倍率 (1.0 = 原速，<= 0 表示不等待)
    pub speed_multiplier: f64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
        }
    }
}

/// Replay 定位源
pub struct ReplayLocationSource {
    name: String,
    events: Arc<[LocationEvent]>,
    config: ReplayConfig,
    listening: Arc<AtomicBool>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ReplayLocationSource {
    /// 从 JSONL 文件加载
    ///
    /// 空行与 `#` 开头的行被忽略。
    pub fn load(path: &Path, config: ReplayConfig) -> Result<Self> {
        let load_err = |message: String| IngestionError::ReplayLoad {
            path: path.display().to_string(),
            message,
        };

        let file = File::open(path).map_err(|e| load_err(e.to_string()))?;
        let reader = BufReader::new(file);

        let mut events = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| load_err(e.to_string()))?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let event: LocationEvent = serde_json::from_str(line)
                .map_err(|e| load_err(format!("line {}: {e}", idx + 1)))?;
            events.push(event);
        }

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("replay")
            .to_string();

        info!(source = %name, events = events.len(), "loaded replay file");
        Ok(Self::from_events(name, events, config))
    }

    pub fn from_events(name: String, events: Vec<LocationEvent>, config: ReplayConfig) -> Self {
        Self {
            name,
            events: events.into(),
            config,
            listening: Arc::new(AtomicBool::new(false)),
            thread_handle: Mutex::new(None),
        }
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}

impl LocationSource for ReplayLocationSource {
    fn source_name(&self) -> &str {
        &self.name
    }

    fn listen(&self, callback: LocationCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let listening = self.listening.clone();
        let name = self.name.clone();
        let events = self.events.clone();
        let speed = self.config.speed_multiplier;

        let handle = thread::spawn(move || {
            debug!(source = %name, "replay thread started");

            let start_time = Instant::now();
            let mut first_timestamp: Option<f64> = None;
            let mut latest_offset = 0.0_f64;

            for event in events.iter() {
                if !listening.load(Ordering::Relaxed) {
                    debug!(source = %name, "replay stopped");
                    return;
                }

                if let (LocationEvent::Fix(fix), true) = (event, speed > 0.0) {
                    let first = *first_timestamp.get_or_insert(fix.timestamp);
                    // out-of-order fixes are delivered right away
                    latest_offset = latest_offset.max(fix.timestamp - first);
                    let target_elapsed = Duration::from_secs_f64(latest_offset / speed);
                    let actual_elapsed = start_time.elapsed();
                    if target_elapsed > actual_elapsed {
                        thread::sleep(target_elapsed - actual_elapsed);
                    }
                }

                callback(*event);
            }

            info!(source = %name, "replay completed");
            listening.store(false, Ordering::SeqCst);
        });

        if let Ok(mut slot) = self.thread_handle.lock() {
            *slot = Some(handle);
        }
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);

        let handle = self.thread_handle.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ProviderError;
    use std::io::Write;

    const RECORDING: &str = r#"
# morning run
{"fix":{"latitude":0.0,"longitude":0.0,"accuracy":5.0,"timestamp":10.0}}
{"fix":{"latitude":0.0,"longitude":0.0005,"accuracy":5.0,"timestamp":20.0}}
{"error":"timeout"}
{"fix":{"latitude":0.0,"longitude":0.0004,"accuracy":5.0,"timestamp":15.0}}
"#;

    fn write_recording(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".jsonl").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_keeps_file_order() {
        let file = write_recording(RECORDING);
        let source = ReplayLocationSource::load(file.path(), ReplayConfig::default()).unwrap();
        assert_eq!(source.event_count(), 4);
        assert_eq!(source.events[2], LocationEvent::Error(ProviderError::Timeout));
        match source.events[3] {
            LocationEvent::Fix(fix) => assert_eq!(fix.timestamp, 15.0),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_load_reports_bad_line() {
        let file = write_recording("{\"fix\":{}}\n");
        let err = ReplayLocationSource::load(file.path(), ReplayConfig::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("line 1"), "got: {err}");
    }

    #[test]
    fn test_missing_file() {
        let result = ReplayLocationSource::load(
            Path::new("/nonexistent/track.jsonl"),
            ReplayConfig::default(),
        );
        assert!(matches!(result, Err(IngestionError::ReplayLoad { .. })));
    }

    #[test]
    fn test_unpaced_replay_delivers_everything() {
        let file = write_recording(RECORDING);
        let source = ReplayLocationSource::load(
            file.path(),
            ReplayConfig {
                speed_multiplier: 0.0,
            },
        )
        .unwrap();

        let (tx, rx) = std::sync::mpsc::channel();
        source.listen(Arc::new(move |event| {
            let _ = tx.send(event);
        }));

        let received: Vec<_> = rx.iter().collect();
        assert_eq!(received.len(), 4);
        source.stop();
    }
}
