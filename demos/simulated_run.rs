//! Simulated Run Demo
//!
//! Records one activity from the built-in route simulator: pauses at the
//! halfway point, resumes, stops, and prints the summary. No location
//! hardware required.
//!
//! Run with: cargo run -p tracker_demos --bin simulated_run [config.toml]

use std::time::Duration;

use config_loader::ConfigLoader;
use contracts::{
    ActivityKind, ProviderError, RendererConfig, RendererType, TrackUpdate, TrackerBlueprint,
};
use ingestion::{IngestionPipeline, LocationUpdate, SimulatedLocationSource, SimulatedSourceConfig};
use observability::TrackingMetricsAggregator;
use tokio::sync::mpsc;
use tracking_engine::{TrackerEvent, TrackerService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    tracing::info!("Starting Simulated Run Demo");

    // ==== Stage 1: Use default config or load from file ====
    let blueprint = if let Some(path) = std::env::args().nth(1) {
        tracing::info!(path = %path, "Loading tracker config");
        ConfigLoader::load_from_path(std::path::Path::new(&path))?
    } else {
        create_demo_blueprint()
    };

    // ==== Stage 2: Setup Dispatcher ====
    let (render_tx, render_rx) = mpsc::channel::<TrackUpdate>(64);
    let dispatcher = dispatcher::create_dispatcher(blueprint.renderers.clone(), render_rx).await?;
    let dispatcher_handle = dispatcher.spawn();

    // ==== Stage 3: Spawn Tracker ====
    let tracker = TrackerService::spawn(blueprint.to_tracker_config(), Some(render_tx), None);
    let mut events = tracker.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                TrackerEvent::StateChanged { from, to } => {
                    tracing::info!(from = %from, to = %to, "State changed")
                }
                TrackerEvent::SignalLost { session_id, .. } => {
                    tracing::warn!(session_id = %session_id, "Signal lost")
                }
                other => tracing::debug!(event = ?other, "Tracker event"),
            }
        }
    });

    // ==== Stage 4: Setup Ingestion Pipeline ====
    let samples = 240;
    let source = SimulatedLocationSource::new(SimulatedSourceConfig {
        samples,
        speed_mps: 3.2,
        realtime_factor: 40.0,
        inject_error: Some((120, ProviderError::PositionUnavailable)),
        ..Default::default()
    });

    let mut ingestion = IngestionPipeline::new(blueprint.ingestion.channel_capacity);
    ingestion.register_source(Box::new(source), None)?;
    let updates = ingestion
        .take_receiver()
        .ok_or("ingestion receiver already taken")?;

    // ==== Stage 5: Run ====
    let session_id = tracker.start().await?;
    tracing::info!(session_id = %session_id, "Activity started");
    ingestion.start_all();

    let mut aggregator = TrackingMetricsAggregator::new();
    let mut fed = 0usize;
    let run = async {
        while let Ok(update) = updates.recv().await {
            match update {
                LocationUpdate::Sample(sample) => {
                    aggregator.record_fix(sample.accuracy);
                    tracker.submit_sample(sample).await?;
                    fed += 1;

                    if fed == samples / 3 {
                        tracker.pause().await?;
                        tracing::info!("Paused");
                    } else if fed == samples / 2 {
                        tracker.resume().await?;
                        tracing::info!("Resumed");
                    }
                }
                LocationUpdate::ProviderError(error) => {
                    tracker.report_provider_error(error).await?;
                }
            }
            aggregator.update(&tracker.metrics());
        }
        Ok::<_, tracking_engine::TrackerError>(())
    };

    match tokio::time::timeout(Duration::from_secs(60), run).await {
        Ok(result) => result?,
        Err(_) => tracing::warn!("Demo timed out"),
    }

    // ==== Stage 6: Stop and report ====
    ingestion.stop_all();
    let summary = tracker.stop().await?;
    aggregator.update(&tracker.metrics());
    tracker.shutdown().await;
    let _ = tokio::time::timeout(Duration::from_secs(5), dispatcher_handle).await;

    println!("\nActivity {} ({})", summary.session_id, summary.activity_kind);
    println!("  distance:  {:.1} m", summary.distance_m);
    println!("  duration:  {:.0} s", summary.duration_s);
    println!("  avg speed: {:.2} m/s", summary.average_speed_mps);
    println!("  max speed: {:.2} m/s", summary.max_speed_mps);
    println!("  elevation: {:.1} m", summary.elevation_gain_m);
    println!("  calories:  {:.0} kcal", summary.calories_kcal);
    println!("  points:    {}\n", summary.path.len());
    println!("{}", aggregator.summary());

    Ok(())
}

fn create_demo_blueprint() -> TrackerBlueprint {
    let mut blueprint = TrackerBlueprint::default();
    blueprint.tracker.activity_kind = ActivityKind::Run;
    blueprint.tracker.display_tick_ms = 500;
    blueprint.renderers.push(RendererConfig {
        name: "console_map".to_string(),
        renderer_type: RendererType::Log,
        queue_capacity: 32,
        params: Default::default(),
    });
    blueprint
}
