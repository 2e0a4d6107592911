//! End-of-run report.

use std::time::Duration;

use contracts::{ActivitySummary, SessionId, SessionState};
use dispatcher::MetricsSnapshot as RendererSnapshot;
use ingestion::MetricsSnapshot as IngestionSnapshot;
use observability::MetricsSummary;

/// Everything the `run` command prints once the pipeline has stopped
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Location source name
    pub source: String,

    pub session_id: Option<SessionId>,

    /// Session state after shutdown
    pub final_state: SessionState,

    /// Present when the session completed
    pub summary: Option<ActivitySummary>,

    /// Aggregated tracker metrics
    pub tracking: MetricsSummary,

    pub ingestion: IngestionSnapshot,

    /// Final per-renderer worker metrics
    pub renderers: Vec<(String, RendererSnapshot)>,

    /// Wall-clock duration of the run
    pub duration: Duration,
}

impl RunReport {
    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                      Activity Report                         ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Source: {}", self.source);
        if let Some(id) = &self.session_id {
            println!("   ├─ Session: {}", id);
        }
        println!("   ├─ Final state: {}", self.final_state);
        println!("   └─ Run time: {:.2}s", self.duration.as_secs_f64());

        match &self.summary {
            Some(summary) => {
                println!("\n🏃 Activity ({})", summary.activity_kind);
                println!("   ├─ Started: {}", summary.started_at.to_rfc3339());
                println!("   ├─ Duration: {}", format_duration(summary.duration_s));
                println!("   ├─ Distance: {:.3} km", summary.distance_m / 1000.0);
                println!(
                    "   ├─ Average speed: {:.2} m/s ({})",
                    summary.average_speed_mps,
                    format_pace(summary.average_speed_mps)
                );
                println!("   ├─ Max speed: {:.2} m/s", summary.max_speed_mps);
                println!("   ├─ Elevation gain: {:.1} m", summary.elevation_gain_m);
                println!("   ├─ Calories: {:.0} kcal", summary.calories_kcal);
                println!("   └─ Path points: {}", summary.path.len());
            }
            None => println!("\n⚠️  No activity summary (session was not completed)"),
        }

        println!("\n📥 Ingestion");
        println!("   ├─ Events received: {}", self.ingestion.events_received);
        println!("   ├─ Samples forwarded: {}", self.ingestion.samples_forwarded);
        println!("   ├─ Invalid fixes: {}", self.ingestion.parse_errors);
        println!("   ├─ Provider errors: {}", self.ingestion.provider_errors);
        println!("   └─ Dropped (backpressure): {}", self.ingestion.updates_dropped);

        println!("\n📈 Tracker Metrics");
        for line in self.tracking.to_string().lines().skip(1) {
            println!("   {}", line);
        }

        if !self.renderers.is_empty() {
            println!("\n🗺️  Renderers ({})", self.renderers.len());
            for (i, (name, snapshot)) in self.renderers.iter().enumerate() {
                let prefix = if i == self.renderers.len() - 1 {
                    "└─"
                } else {
                    "├─"
                };
                println!(
                    "   {} {}: {} drawn, {} failed, {} dropped",
                    prefix,
                    name,
                    snapshot.processed_count,
                    snapshot.failure_count,
                    snapshot.dropped_count
                );
            }
        }

        println!();
    }
}

/// `h:mm:ss`
fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60)
}

/// Minutes per kilometre, `--` when standing still
fn format_pace(speed_mps: f64) -> String {
    if speed_mps <= 0.0 {
        return "--".to_string();
    }
    let sec_per_km = (1000.0 / speed_mps).round() as u64;
    format!("{}:{:02} /km", sec_per_km / 60, sec_per_km % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "0:00:00");
        assert_eq!(format_duration(3725.4), "1:02:05");
    }

    #[test]
    fn test_format_pace() {
        assert_eq!(format_pace(0.0), "--");
        // 5:00 /km
        assert_eq!(format_pace(1000.0 / 300.0), "5:00 /km");
    }
}
