//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{ControlScript, Pipeline, PipelineConfig, SourceSelection};

/// Execute the `run` command
pub async fn run_tracker(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(kind) = args.kind {
        info!(kind = %kind, "Overriding activity kind from CLI");
        blueprint.tracker.activity_kind = kind;
    }
    config_loader::ConfigLoader::validate(&blueprint)
        .context("Configuration invalid after CLI overrides")?;

    let control = match &args.control {
        Some(script) => script.parse::<ControlScript>()?,
        None => ControlScript::default(),
    };

    let source = match &args.replay {
        Some(path) => SourceSelection::Replay {
            path: path.clone(),
            speed: args.replay_speed,
        },
        None => SourceSelection::Simulate {
            samples: args.sim_samples,
            realtime: args.sim_realtime,
        },
    };

    info!(
        kind = %blueprint.tracker.activity_kind,
        renderers = blueprint.renderers.len(),
        store = blueprint.store.is_some(),
        "Configuration loaded"
    );

    let pipeline_config = PipelineConfig {
        blueprint,
        source,
        control,
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
        summary_out: args.summary_out.clone(),
    };

    info!("Starting pipeline...");

    let report = Pipeline::new(pipeline_config)
        .run(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    report.print_summary();

    info!("Activity tracker finished");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
///
/// If a handler cannot be installed that signal is never observed; the run
/// still ends when the source is exhausted.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
