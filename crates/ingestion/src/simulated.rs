//! 模拟定位源
//!
//! 按固定速度与方位生成路线，可注入抖动、离群点与 provider 错误。
//! 同一 seed 总是生成同一序列，用于测试、演示与 `run --simulate`。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use contracts::{LocationCallback, LocationEvent, LocationSource, ProviderError, RawFix};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

/// Meters per degree of latitude on a 6 371 km sphere
const METERS_PER_DEGREE: f64 = 111_194.93;

/// Teleport distance used for implausible-jump outliers (meters)
const TELEPORT_M: f64 = 2_000.0;

/// 模拟源配置
#[derive(Debug, Clone)]
pub struct SimulatedSourceConfig {
    pub name: String,
    pub start_latitude: f64,
    pub start_longitude: f64,
    pub start_altitude: f64,
    /// 地速 (m/s)
    pub speed_mps: f64,
    /// 方位 (度，正北为 0)
    pub bearing_deg: f64,
    /// 相邻定位的时间间隔 (秒)
    pub sample_interval_s: f64,
    /// 第一个定位的时间戳 (秒)
    pub start_time: f64,
    /// 定位数量
    pub samples: usize,
    /// 报告的精度半径 (米)
    pub accuracy_m: f64,
    /// 位置抖动幅度 (米)
    pub jitter_m: f64,
    /// 每个定位成为离群点的概率
    pub outlier_probability: f64,
    /// 每个定位的爬升 (米)
    pub climb_per_sample_m: f64,
    /// 是否携带传感器速度
    pub report_speed: bool,
    /// 在第 n 个定位之前注入错误
    pub inject_error: Option<(usize, ProviderError)>,
    /// 实时倍率，0 表示不等待
    pub realtime_factor: f64,
    pub seed: u64,
}

impl Default for SimulatedSourceConfig {
    fn default() -> Self {
        Self {
            name: "simulated".to_string(),
            start_latitude: 52.5145,
            start_longitude: 13.3501,
            start_altitude: 35.0,
            speed_mps: 3.0,
            bearing_deg: 90.0,
            sample_interval_s: 1.0,
            start_time: 0.0,
            samples: 600,
            accuracy_m: 6.0,
            jitter_m: 1.5,
            outlier_probability: 0.02,
            climb_per_sample_m: 0.05,
            report_speed: true,
            inject_error: None,
            realtime_factor: 0.0,
            seed: 7,
        }
    }
}

/// 模拟定位源
pub struct SimulatedLocationSource {
    config: SimulatedSourceConfig,
    listening: Arc<AtomicBool>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
}

impl SimulatedLocationSource {
    pub fn new(config: SimulatedSourceConfig) -> Self {
        Self {
            config,
            listening: Arc::new(AtomicBool::new(false)),
            thread_handle: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SimulatedSourceConfig {
        &self.config
    }

    /// 生成完整事件序列 (确定性)
    pub fn events(&self) -> Vec<LocationEvent> {
        let c = &self.config;
        let mut rng = StdRng::seed_from_u64(c.seed);
        let bearing = c.bearing_deg.to_radians();
        let step = c.speed_mps * c.sample_interval_s;
        let (north, east) = (bearing.cos() * step, bearing.sin() * step);
        let outlier_p = c.outlier_probability.clamp(0.0, 1.0);

        let mut lat = c.start_latitude;
        let mut lng = c.start_longitude;
        let mut alt = c.start_altitude;
        let mut out = Vec::with_capacity(c.samples + 1);

        for i in 0..c.samples {
            if let Some((at, error)) = c.inject_error {
                if at == i {
                    out.push(LocationEvent::Error(error));
                }
            }

            if i > 0 {
                lat += north / METERS_PER_DEGREE;
                lng += east / meters_per_degree_lng(lat);
                alt += c.climb_per_sample_m;
            }

            let (jitter_n, jitter_e) = if c.jitter_m > 0.0 {
                (
                    rng.random_range(-c.jitter_m..=c.jitter_m),
                    rng.random_range(-c.jitter_m..=c.jitter_m),
                )
            } else {
                (0.0, 0.0)
            };

            let mut fix = RawFix {
                latitude: lat + jitter_n / METERS_PER_DEGREE,
                longitude: lng + jitter_e / meters_per_degree_lng(lat),
                altitude: Some(alt),
                accuracy: c.accuracy_m,
                speed: c.report_speed.then_some(c.speed_mps),
                heading: Some(c.bearing_deg.rem_euclid(360.0)),
                timestamp: c.start_time + i as f64 * c.sample_interval_s,
            };

            // never on the first fix, it would anchor the whole track
            if i > 0 && outlier_p > 0.0 && rng.random_bool(outlier_p) {
                if rng.random_bool(0.5) {
                    fix.accuracy = c.accuracy_m.max(1.0) * 10.0;
                } else {
                    fix.latitude += TELEPORT_M / METERS_PER_DEGREE;
                }
            }

            out.push(LocationEvent::Fix(fix));
        }

        out
    }
}

fn meters_per_degree_lng(lat: f64) -> f64 {
    (METERS_PER_DEGREE * lat.to_radians().cos()).max(1e-6)
}

impl LocationSource for SimulatedLocationSource {
    fn source_name(&self) -> &str {
        &self.config.name
    }

    fn listen(&self, callback: LocationCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let events = self.events();
        let listening = self.listening.clone();
        let name = self.config.name.clone();
        let pause = (self.config.realtime_factor > 0.0).then(|| {
            Duration::from_secs_f64(self.config.sample_interval_s / self.config.realtime_factor)
        });

        let handle = thread::spawn(move || {
            debug!(source = %name, events = events.len(), "simulated source started");

            for event in events {
                if !listening.load(Ordering::Relaxed) {
                    debug!(source = %name, "simulated source stopped");
                    return;
                }
                callback(event);
                if let (Some(pause), LocationEvent::Fix(_)) = (pause, event) {
                    thread::sleep(pause);
                }
            }

            info!(source = %name, "simulated route completed");
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

    fn quiet_config() -> SimulatedSourceConfig {
        SimulatedSourceConfig {
            samples: 10,
            jitter_m: 0.0,
            outlier_probability: 0.0,
            ..Default::default()
        }
    }

    fn fixes(events: &[LocationEvent]) -> Vec<RawFix> {
        events
            .iter()
            .filter_map(|e| match e {
                LocationEvent::Fix(f) => Some(*f),
                LocationEvent::Error(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_same_seed_same_route() {
        let config = SimulatedSourceConfig {
            samples: 50,
            ..Default::default()
        };
        let a = SimulatedLocationSource::new(config.clone()).events();
        let b = SimulatedLocationSource::new(config).events();
        assert_eq!(a, b);
    }

    #[test]
    fn test_route_moves_east_at_configured_pace() {
        let events = SimulatedLocationSource::new(quiet_config()).events();
        let fixes = fixes(&events);

        assert_eq!(fixes.len(), 10);
        assert!(fixes.windows(2).all(|w| w[1].longitude > w[0].longitude));
        assert!(fixes.windows(2).all(|w| w[1].timestamp - w[0].timestamp == 1.0));

        let east_m = (fixes[9].longitude - fixes[0].longitude)
            * meters_per_degree_lng(fixes[0].latitude);
        assert!((east_m - 27.0).abs() < 0.1, "east_m = {east_m}");
    }

    #[test]
    fn test_error_injection() {
        let config = SimulatedSourceConfig {
            inject_error: Some((3, ProviderError::PositionUnavailable)),
            ..quiet_config()
        };
        let events = SimulatedLocationSource::new(config).events();

        assert_eq!(events.len(), 11);
        assert_eq!(
            events[3],
            LocationEvent::Error(ProviderError::PositionUnavailable)
        );
    }

    #[test]
    fn test_outliers_are_injected() {
        let config = SimulatedSourceConfig {
            samples: 200,
            outlier_probability: 0.5,
            ..quiet_config()
        };
        let fixes = fixes(&SimulatedLocationSource::new(config).events());
        let noisy = fixes.iter().filter(|f| f.accuracy > 6.0).count();

        assert!(noisy > 0);
        assert_eq!(fixes[0].accuracy, 6.0);
    }

    #[test]
    fn test_listen_delivers_every_event_then_stops() {
        let source = SimulatedLocationSource::new(quiet_config());
        let (tx, rx) = std::sync::mpsc::channel();
        source.listen(Arc::new(move |event| {
            let _ = tx.send(event);
        }));

        let received: Vec<_> = rx.iter().collect();
        assert_eq!(received.len(), 10);
        source.stop();
        assert!(!source.is_listening());
    }
}
