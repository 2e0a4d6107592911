//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{ActivityKind, TrackerBlueprint};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    tracker: TrackerInfo,
    filter: FilterInfo,
    signal: SignalInfo,
    ingestion: IngestionInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    renderers: Vec<RendererInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    store: Option<StoreInfo>,
}

#[derive(Serialize)]
struct TrackerInfo {
    activity_kind: String,
    body_mass_kg: f64,
    display_tick_ms: u64,
    short_interval_threshold_s: f64,
}

#[derive(Serialize)]
struct FilterInfo {
    accuracy_ceiling_m: f64,
    /// Per-kind speed ceilings (m/s)
    speed_ceilings: Vec<(String, f64)>,
}

#[derive(Serialize)]
struct SignalInfo {
    lost_after_s: f64,
    quality_window: usize,
}

#[derive(Serialize)]
struct IngestionInfo {
    channel_capacity: usize,
    drop_policy: String,
}

#[derive(Serialize)]
struct RendererInfo {
    name: String,
    renderer_type: String,
    queue_capacity: usize,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

#[derive(Serialize)]
struct StoreInfo {
    store_type: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint);
    }

    Ok(())
}

fn build_config_info(blueprint: &TrackerBlueprint) -> ConfigInfo {
    let renderers = blueprint
        .renderers
        .iter()
        .map(|r| RendererInfo {
            name: r.name.clone(),
            renderer_type: format!("{:?}", r.renderer_type),
            queue_capacity: r.queue_capacity,
            params: r.params.clone(),
        })
        .collect();

    let speed_ceilings = ActivityKind::ALL
        .iter()
        .map(|kind| {
            (
                kind.to_string(),
                blueprint.filter.speed_ceilings.for_kind(*kind),
            )
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        tracker: TrackerInfo {
            activity_kind: blueprint.tracker.activity_kind.to_string(),
            body_mass_kg: blueprint.tracker.body_mass_kg,
            display_tick_ms: blueprint.tracker.display_tick_ms,
            short_interval_threshold_s: blueprint.motion.short_interval_threshold_s,
        },
        filter: FilterInfo {
            accuracy_ceiling_m: blueprint.filter.accuracy_ceiling_m,
            speed_ceilings,
        },
        signal: SignalInfo {
            lost_after_s: blueprint.signal.lost_after_s,
            quality_window: blueprint.signal.quality_window,
        },
        ingestion: IngestionInfo {
            channel_capacity: blueprint.ingestion.channel_capacity,
            drop_policy: format!("{:?}", blueprint.ingestion.drop_policy),
        },
        renderers,
        store: blueprint.store.as_ref().map(|s| StoreInfo {
            store_type: format!("{:?}", s.store_type),
            params: s.params.clone(),
        }),
    }
}

fn print_config_info(blueprint: &TrackerBlueprint) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║              Activity Tracker Configuration                  ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let tracker = &blueprint.tracker;
    println!("🏃 Tracker");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Activity kind: {}", tracker.activity_kind);
    println!("   ├─ Body mass: {} kg", tracker.body_mass_kg);
    println!("   ├─ Display tick: {} ms", tracker.display_tick_ms);
    println!(
        "   └─ Max-speed interval threshold: {} s",
        blueprint.motion.short_interval_threshold_s
    );

    println!("\n🎯 Filter");
    println!(
        "   ├─ Accuracy ceiling: {} m",
        blueprint.filter.accuracy_ceiling_m
    );
    for (i, kind) in ActivityKind::ALL.iter().enumerate() {
        let prefix = if i == ActivityKind::ALL.len() - 1 {
            "└─"
        } else {
            "├─"
        };
        let marker = if *kind == tracker.activity_kind { " *" } else { "" };
        println!(
            "   {} Speed ceiling ({}): {} m/s{}",
            prefix,
            kind,
            blueprint.filter.speed_ceilings.for_kind(*kind),
            marker
        );
    }

    println!("\n📡 Signal");
    println!("   ├─ Lost after: {} s", blueprint.signal.lost_after_s);
    println!("   └─ Quality window: {} samples", blueprint.signal.quality_window);

    println!("\n📥 Ingestion");
    println!(
        "   ├─ Channel capacity: {}",
        blueprint.ingestion.channel_capacity
    );
    println!("   └─ Drop policy: {:?}", blueprint.ingestion.drop_policy);

    if !blueprint.renderers.is_empty() {
        println!("\n🗺️  Renderers ({})", blueprint.renderers.len());
        for (i, renderer) in blueprint.renderers.iter().enumerate() {
            let is_last = i == blueprint.renderers.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            println!(
                "   {} {} ({:?}, queue {})",
                prefix, renderer.name, renderer.renderer_type, renderer.queue_capacity
            );
        }
    }

    match &blueprint.store {
        Some(store) => println!("\n💾 Store: {:?}", store.store_type),
        None => println!("\n💾 Store: (none)"),
    }

    println!();
}
