use std::env;
use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{info, warn};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub const MATCH_SCORED_TOTAL: &str = "nm_match_scored_total";
pub const MATCH_FALLBACK_TOTAL: &str = "nm_match_fallback_total";
pub const MATCH_CANDIDATE_FAILURES_TOTAL: &str = "nm_match_candidate_failures_total";
pub const MATCH_AI_CACHE_HITS_TOTAL: &str = "nm_match_ai_cache_hits_total";

fn resolve_port(port_env: &str, default_port: u16) -> u16 {
    env::var(port_env)
        .ok()
        .and_then(|raw| raw.parse::<u16>().ok())
        .unwrap_or(default_port)
}

fn describe_matching_metrics() {
    metrics::describe_counter!(
        MATCH_SCORED_TOTAL,
        "Pairwise compatibility results produced, labelled by source"
    );
    metrics::describe_counter!(
        MATCH_FALLBACK_TOTAL,
        "Deterministic fallbacks taken after the AI adapter was unavailable, labelled by reason"
    );
    metrics::describe_counter!(
        MATCH_CANDIDATE_FAILURES_TOTAL,
        "Candidates excluded from a ranking run because scoring failed"
    );
    metrics::describe_counter!(
        MATCH_AI_CACHE_HITS_TOTAL,
        "AI compatibility results served from the in-process cache"
    );
}

/// Start a Prometheus exporter on `0.0.0.0:<port>` and install it as the global recorder.
///
/// The port comes from `port_env` or falls back to `default_port`. Must be called from
/// inside a Tokio runtime because the HTTP listener is spawned onto it. Repeated calls
/// return the handle of the first exporter.
pub fn init_metrics(port_env: &str, default_port: u16) -> Option<&'static PrometheusHandle> {
    if let Some(existing) = PROMETHEUS_HANDLE.get() {
        return Some(existing);
    }

    let port = resolve_port(port_env, default_port);

    let (recorder, exporter) = match PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .build()
    {
        Ok(parts) => parts,
        Err(err) => {
            warn!(error = %err, metrics_port = port, "failed to build prometheus exporter");
            return None;
        }
    };

    let handle = recorder.handle();
    if let Err(err) = metrics::set_global_recorder(recorder) {
        warn!(error = %err, metrics_port = port, "metrics recorder already installed");
        return PROMETHEUS_HANDLE.get();
    }

    tokio::spawn(async move {
        if exporter.await.is_err() {
            warn!(metrics_port = port, "prometheus exporter stopped");
        }
    });

    describe_matching_metrics();
    let _ = PROMETHEUS_HANDLE.set(handle);
    info!(metrics_port = port, "started prometheus exporter");
    PROMETHEUS_HANDLE.get()
}
