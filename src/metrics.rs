// Prometheus metrics definitions for the arena backend.

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    /// Brackets generated (including regenerations).
    pub static ref BRACKETS_GENERATED_TOTAL: IntCounter = IntCounter::new(
        "arena_brackets_generated_total",
        "Brackets generated",
    )
    .unwrap();

    /// Bracket matches completed and advanced.
    pub static ref MATCHES_COMPLETED_TOTAL: IntCounter = IntCounter::new(
        "arena_matches_completed_total",
        "Bracket matches completed",
    )
    .unwrap();

    /// Tournaments decided by a completed final.
    pub static ref TOURNAMENTS_DECIDED_TOTAL: IntCounter = IntCounter::new(
        "arena_tournaments_decided_total",
        "Tournaments decided by a completed final",
    )
    .unwrap();

    /// Group stages created.
    pub static ref GROUP_STAGES_CREATED_TOTAL: IntCounter = IntCounter::new(
        "arena_group_stages_created_total",
        "Group stages created",
    )
    .unwrap();

    /// Group stages finalized into playoffs.
    pub static ref GROUP_STAGES_FINALIZED_TOTAL: IntCounter = IntCounter::new(
        "arena_group_stages_finalized_total",
        "Group stages finalized into playoffs",
    )
    .unwrap();

    /// Rating updates applied to team pairs.
    pub static ref RATING_UPDATES_TOTAL: IntCounter = IntCounter::new(
        "arena_rating_updates_total",
        "Rating updates applied",
    )
    .unwrap();

    /// Total API requests, by method/endpoint/status.
    pub static ref API_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("arena_api_requests_total", "Total API requests"),
        &["method", "endpoint", "status"],
    )
    .unwrap();
}

/// Register all metrics with the custom registry. Call once at startup.
pub fn register_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(BRACKETS_GENERATED_TOTAL.clone()),
        Box::new(MATCHES_COMPLETED_TOTAL.clone()),
        Box::new(TOURNAMENTS_DECIDED_TOTAL.clone()),
        Box::new(GROUP_STAGES_CREATED_TOTAL.clone()),
        Box::new(GROUP_STAGES_FINALIZED_TOTAL.clone()),
        Box::new(RATING_UPDATES_TOTAL.clone()),
        Box::new(API_REQUESTS_TOTAL.clone()),
    ];

    for c in collectors {
        REGISTRY.register(c).expect("failed to register metric");
    }
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}
