//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 模拟 e2e 测试 (模拟定位源 / JSONL 回放 -> 追踪引擎 -> 渲染器 / 持久化)

#[cfg(test)]
mod contract_tests {
    use contracts::{ActivityKind, RendererType, SessionState, StoreType, TrackerBlueprint};
    use std::path::PathBuf;

    fn demo_file(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../demos")
            .join(name)
    }

    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_default_blueprint_survives_toml() {
        let blueprint = TrackerBlueprint::default();
        let toml = config_loader::ConfigLoader::to_toml(&blueprint).unwrap();
        let parsed = config_loader::ConfigLoader::load_from_str(
            &toml,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();

        assert_eq!(parsed.tracker.activity_kind, ActivityKind::Run);
        assert_eq!(
            parsed.to_tracker_config().speed_ceiling(),
            blueprint.to_tracker_config().speed_ceiling()
        );
    }

    #[test]
    fn test_demo_config_is_valid() {
        let blueprint = config_loader::ConfigLoader::load_from_path(&demo_file("tracker.toml")).unwrap();

        assert_eq!(blueprint.tracker.body_mass_kg, 72.0);
        assert_eq!(blueprint.renderers.len(), 2);
        assert_eq!(blueprint.renderers[1].renderer_type, RendererType::GeoJson);
        assert_eq!(
            blueprint.store.map(|s| s.store_type),
            Some(StoreType::JsonFile)
        );
    }

    #[test]
    fn test_demo_replay_loads() {
        let source = ingestion::ReplayLocationSource::load(
            &demo_file("morning_run.jsonl"),
            ingestion::ReplayConfig::default(),
        )
        .unwrap();
        // 40 fixes and one provider error; the comment line is skipped
        assert_eq!(source.event_count(), 41);
    }

    #[test]
    fn test_state_wire_names() {
        let json = serde_json::to_string(&SessionState::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::io::Write;
    use std::time::Duration;

    use chrono::Utc;
    use contracts::{
        AcquisitionStatus, ActivitySummary, RendererConfig, RendererType, SessionState,
        StoreConfig, StoreType, TrackUpdate, TrackerConfig,
    };
    use dispatcher::{create_dispatcher, create_summary_writer};
    use ingestion::{
        IngestionPipeline, LocationUpdate, ReplayConfig, ReplayLocationSource,
        SimulatedLocationSource, SimulatedSourceConfig,
    };
    use observability::TrackingMetricsAggregator;
    use tokio::sync::mpsc;
    use tracking_engine::{SampleOutcome, Tracker, TrackerService};

    fn quiet_route(samples: usize) -> SimulatedSourceConfig {
        SimulatedSourceConfig {
            samples,
            jitter_m: 0.0,
            outlier_probability: 0.0,
            ..Default::default()
        }
    }

    /// End-to-end test: SimulatedLocationSource -> TrackerService -> Dispatcher + Store
    ///
    /// 验证完整的数据流：
    /// 1. 模拟定位源经 ingestion 规范化
    /// 2. TrackerService 累积距离、生成 TrackUpdate
    /// 3. GeoJSON 渲染器写出路线，JSON 存储写出摘要
    #[tokio::test]
    async fn test_e2e_simulated_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let geojson = dir.path().join("route.geojson");
        let store_dir = dir.path().join("activities");

        // Renderers
        let (render_tx, render_rx) = mpsc::channel::<TrackUpdate>(256);
        let renderer_configs = vec![
            RendererConfig {
                name: "geo".to_string(),
                renderer_type: RendererType::GeoJson,
                queue_capacity: 256,
                params: HashMap::from([(
                    "path".to_string(),
                    geojson.display().to_string(),
                )]),
            },
            RendererConfig {
                name: "log".to_string(),
                renderer_type: RendererType::Log,
                queue_capacity: 256,
                params: HashMap::new(),
            },
        ];
        let dispatcher = create_dispatcher(renderer_configs, render_rx).await.unwrap();
        let dispatcher_handle = dispatcher.spawn();

        // Persistence
        let (summary_tx, summary_rx) = mpsc::channel::<ActivitySummary>(4);
        let store_config = StoreConfig {
            store_type: StoreType::JsonFile,
            params: HashMap::from([("dir".to_string(), store_dir.display().to_string())]),
        };
        let writer = create_summary_writer(&store_config, summary_rx).unwrap();

        // Tracker
        let tracker = TrackerService::spawn(TrackerConfig::default(), Some(render_tx), Some(summary_tx));
        let session_id = tracker.start().await.unwrap();

        // Location source
        let mut ingestion = IngestionPipeline::new(256);
        ingestion
            .register_source(Box::new(SimulatedLocationSource::new(quiet_route(30))), None)
            .unwrap();
        let updates = ingestion.take_receiver().unwrap();
        ingestion.start_all();

        let mut fed = 0u64;
        let feed = async {
            while let Ok(update) = updates.recv().await {
                if let LocationUpdate::Sample(sample) = update {
                    tracker.submit_sample(sample).await.unwrap();
                    fed += 1;
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(5), feed)
            .await
            .expect("simulated source should finish");
        assert_eq!(fed, 30);

        // queued samples are applied before the stop
        let summary = tracker.stop().await.unwrap();
        assert_eq!(summary.session_id, session_id);
        assert_eq!(summary.path.len(), 30);
        // 29 steps of 3 m at 1 s intervals
        assert!((summary.distance_m - 87.0).abs() < 0.5, "{}", summary.distance_m);
        assert!((summary.duration_s - 29.0).abs() < 1e-9);
        assert!(summary.calories_kcal > 0.0);

        ingestion.stop_all();
        tracker.shutdown().await;

        let renderers = tokio::time::timeout(Duration::from_secs(2), dispatcher_handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renderers.len(), 2);
        for (name, snapshot) in &renderers {
            assert_eq!(snapshot.processed_count, 30, "renderer {name}");
            assert_eq!(snapshot.failure_count, 0);
        }
        writer.join().await;

        let route: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&geojson).unwrap()).unwrap();
        assert_eq!(route["type"], "FeatureCollection");
        assert_eq!(
            route["features"][0]["geometry"]["coordinates"]
                .as_array()
                .map(|c| c.len()),
            Some(30)
        );

        let stored = store_dir.join(format!("{}.json", session_id));
        let persisted: ActivitySummary =
            serde_json::from_str(&std::fs::read_to_string(stored).unwrap()).unwrap();
        assert_eq!(persisted, summary);
    }

    /// JSONL replay through the synchronous engine
    #[tokio::test]
    async fn test_replay_file_through_tracker() {
        let mut file = tempfile::Builder::new().suffix(".jsonl").tempfile().unwrap();
        // ~0.0009 deg of latitude is ~100 m; 10 s apart
        let lines = [
            r#"# morning run"#,
            r#"{"fix":{"latitude":52.5000,"longitude":13.4000,"accuracy":5.0,"timestamp":0.0}}"#,
            r#"{"fix":{"latitude":52.5009,"longitude":13.4000,"accuracy":5.0,"timestamp":30.0}}"#,
            r#"{"fix":{"latitude":52.5010,"longitude":13.4000,"accuracy":80.0,"timestamp":35.0}}"#,
            r#"{"error":"timeout"}"#,
            r#"{"fix":{"latitude":52.5018,"longitude":13.4000,"accuracy":4.0,"timestamp":60.0}}"#,
            r#""#,
        ];
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }

        let source = ReplayLocationSource::load(
            file.path(),
            ReplayConfig {
                speed_multiplier: 0.0,
            },
        )
        .unwrap();
        assert_eq!(source.event_count(), 5);

        let mut ingestion = IngestionPipeline::new(64);
        ingestion.register_source(Box::new(source), None).unwrap();
        let updates = ingestion.take_receiver().unwrap();
        ingestion.start_all();

        let mut tracker = Tracker::new(TrackerConfig::default());
        tracker.start(Utc::now()).unwrap();
        let mut aggregator = TrackingMetricsAggregator::new();
        let mut saw_error = false;

        let drain = async {
            while let Ok(update) = updates.recv().await {
                match update {
                    LocationUpdate::Sample(sample) => {
                        aggregator.record_fix(sample.accuracy);
                        tracker.on_sample(sample);
                        aggregator.update(&tracker.metrics());
                    }
                    LocationUpdate::ProviderError(error) => {
                        assert_eq!(tracker.on_provider_error(error), AcquisitionStatus::TimedOut);
                        assert_eq!(tracker.state(), SessionState::Active);
                        saw_error = true;
                    }
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(5), drain)
            .await
            .expect("replay should finish");

        assert!(saw_error);
        assert_eq!(tracker.acquisition(), AcquisitionStatus::Tracking);

        let counters = tracker.counters();
        assert_eq!(counters.accepted, 3);
        assert_eq!(counters.rejected_low_accuracy, 1);

        let summary = tracker.stop().unwrap();
        assert_eq!(summary.path.len(), 3);
        assert!((summary.duration_s - 60.0).abs() < 1e-9);
        assert!(summary.distance_m > 195.0 && summary.distance_m < 205.0);

        let report = aggregator.summary();
        assert_eq!(report.fixes_received, 4);
        assert_eq!(report.rejected, 1);
    }

    /// Samples after stop are ignored and a reset tracker can run again
    #[tokio::test]
    async fn test_second_session_after_reset() {
        let events = SimulatedLocationSource::new(quiet_route(5)).events();
        let samples: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                contracts::LocationEvent::Fix(raw) => ingestion::normalize_fix(raw).ok(),
                contracts::LocationEvent::Error(_) => None,
            })
            .collect();
        assert_eq!(samples.len(), 5);

        let mut tracker = Tracker::new(TrackerConfig::default());
        let first = tracker.start(Utc::now()).unwrap();
        for sample in &samples {
            assert!(tracker.on_sample(*sample).is_accepted());
        }
        let summary = tracker.stop().unwrap();
        assert_eq!(summary.path.len(), 5);

        assert_eq!(tracker.on_sample(samples[0]), SampleOutcome::Ignored);

        tracker.reset().unwrap();
        assert_eq!(tracker.state(), SessionState::Idle);
        let second = tracker.start(Utc::now()).unwrap();
        assert_ne!(first, second);
        assert_eq!(tracker.metrics().distance_m, 0.0);
        assert!(tracker.on_sample(samples[0]).is_accepted());
    }
}
