use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, GaugeVec, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

use crate::catalog_store::{CascadeReport, CatalogStore, EntityKind};

/// Metric name prefix for all catalog server metrics
const PREFIX: &str = "music_catalog";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Authentication Metrics
    pub static ref AUTH_LOGIN_ATTEMPTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_auth_login_attempts_total"), "Total login attempts"),
        &["status"]
    ).expect("Failed to create auth_login_attempts_total metric");

    pub static ref AUTH_LOGIN_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_auth_login_duration_seconds"),
            "Login request duration in seconds"
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0])
    ).expect("Failed to create auth_login_duration_seconds metric");

    // Cascade deletions, by the kind of the deleted root entity
    pub static ref CASCADE_DELETES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_cascade_deletes_total"), "Catalog deletions by outcome"),
        &["kind", "outcome"]
    ).expect("Failed to create cascade_deletes_total metric");

    pub static ref CASCADE_REMOVED_ROWS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            format!("{PREFIX}_cascade_removed_rows_total"),
            "Dependent rows removed by cascade deletions"
        ),
        &["kind"]
    ).expect("Failed to create cascade_removed_rows_total metric");

    // Catalog Metrics
    pub static ref CATALOG_ITEMS_TOTAL: GaugeVec = GaugeVec::new(
        Opts::new(format!("{PREFIX}_catalog_items_total"), "Total items in catalog"),
        &["type"]
    ).expect("Failed to create catalog_items_total metric");

    pub static ref PROCESS_MEMORY_BYTES: Gauge = Gauge::new(
        format!("{PREFIX}_process_memory_bytes"),
        "Process memory usage in bytes"
    ).expect("Failed to create process_memory_bytes metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(AUTH_LOGIN_ATTEMPTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(AUTH_LOGIN_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(CASCADE_DELETES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(CASCADE_REMOVED_ROWS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(CATALOG_ITEMS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PROCESS_MEMORY_BYTES.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Initialize catalog-specific metrics
pub fn init_catalog_metrics(num_artists: usize, num_albums: usize, num_tracks: usize) {
    CATALOG_ITEMS_TOTAL
        .with_label_values(&["artist"])
        .set(num_artists as f64);

    CATALOG_ITEMS_TOTAL
        .with_label_values(&["album"])
        .set(num_albums as f64);

    CATALOG_ITEMS_TOTAL
        .with_label_values(&["track"])
        .set(num_tracks as f64);

    tracing::debug!(
        "Catalog metrics updated: {} artists, {} albums, {} tracks",
        num_artists,
        num_albums,
        num_tracks
    );
}

/// Re-reads the entity counts from the store into the catalog gauges.
pub fn refresh_catalog_metrics(store: &dyn CatalogStore) {
    init_catalog_metrics(
        store.get_artists_count(),
        store.get_albums_count(),
        store.get_tracks_count(),
    );
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Record a login attempt
pub fn record_login_attempt(status: &str, duration: Duration) {
    AUTH_LOGIN_ATTEMPTS_TOTAL
        .with_label_values(&[status])
        .inc();

    AUTH_LOGIN_DURATION_SECONDS.observe(duration.as_secs_f64());
}

/// Record the result of a catalog deletion
pub fn record_cascade_delete(kind: EntityKind, outcome: Result<&CascadeReport, &str>) {
    match outcome {
        Ok(report) => {
            CASCADE_DELETES_TOTAL
                .with_label_values(&[kind.as_str(), "deleted"])
                .inc();
            for (removed_kind, count) in report.removed.iter() {
                CASCADE_REMOVED_ROWS_TOTAL
                    .with_label_values(&[removed_kind.as_str()])
                    .inc_by(*count as f64);
            }
        }
        Err(outcome) => {
            CASCADE_DELETES_TOTAL
                .with_label_values(&[kind.as_str(), outcome])
                .inc();
        }
    }
}

/// Collapses concrete request paths into a fixed set of labels.
pub fn categorize_endpoint(path: &str) -> &'static str {
    let rest = match path.strip_prefix("/api/v1") {
        Some(rest) => rest,
        None => return if path == "/" { "/" } else { "other" },
    };
    let mut segments = rest.trim_start_matches('/').splitn(2, '/');
    match (segments.next(), segments.next()) {
        (Some("signup"), None) => "/api/v1/signup",
        (Some("login"), None) => "/api/v1/login",
        (Some("logout"), None) => "/api/v1/logout",
        (Some("artists"), None) => "/api/v1/artists",
        (Some("artists"), Some(_)) => "/api/v1/artists/{id}",
        (Some("albums"), None) => "/api/v1/albums",
        (Some("albums"), Some(_)) => "/api/v1/albums/{id}",
        (Some("tracks"), None) => "/api/v1/tracks",
        (Some("tracks"), Some(_)) => "/api/v1/tracks/{id}",
        (Some("favorites"), _) => "/api/v1/favorites",
        (Some("users"), None) => "/api/v1/users",
        (Some("users"), Some(_)) => "/api/v1/users/{id}",
        _ => "other",
    }
}

/// Update process memory usage
pub fn update_memory_usage() {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            for line in status.lines() {
                if line.starts_with("VmRSS:") {
                    // RSS is reported in kB
                    if let Some(kb_str) = line.split_whitespace().nth(1) {
                        if let Ok(kb) = kb_str.parse::<f64>() {
                            PROCESS_MEMORY_BYTES.set(kb * 1024.0);
                            return;
                        }
                    }
                }
            }
        }
    }
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    update_memory_usage();

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_else(|_| String::from(""));
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
