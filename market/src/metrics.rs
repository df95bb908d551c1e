//! Prometheus metrics for the marketplace.
//!
//! The [`MarketMetrics`] struct owns a dedicated [`Registry`] that the API
//! `/metrics` endpoint encodes into the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry, Encoder, Histogram,
    HistogramOpts, IntCounter, Opts, Registry, TextEncoder,
};

/// Central collection of all marketplace Prometheus metrics.
pub struct MarketMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    pub listings_submitted: IntCounter,
    /// Approvals, rejections and risk changes by an admin.
    pub listings_moderated: IntCounter,
    /// Purchases recorded as new transactions.
    pub purchases_recorded: IntCounter,
    /// Duplicate submissions answered with the original receipt.
    pub purchases_replayed: IntCounter,
    /// Duplicate payment references refused.
    pub duplicate_payments: IntCounter,
    /// Purchases whose payment the verifier did not confirm.
    pub payments_unverified: IntCounter,
    pub reports_filed: IntCounter,
    pub admin_login_failures: IntCounter,
    pub logs_purged: IntCounter,

    // ── Histograms ──────────────────────────────────────────────────────
    /// End-to-end settlement time, in milliseconds.
    pub settlement_time_ms: Histogram,
}

fn counter(registry: &Registry, name: &str, help: &str) -> IntCounter {
    register_int_counter_with_registry!(Opts::new(name, help), registry)
        .unwrap_or_else(|e| panic!("failed to register {name} counter: {e}"))
}

impl MarketMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        let listings_submitted = counter(
            &registry,
            "souk_listings_submitted_total",
            "Total listings submitted for review",
        );
        let listings_moderated = counter(
            &registry,
            "souk_listings_moderated_total",
            "Total admin moderation actions",
        );
        let purchases_recorded = counter(
            &registry,
            "souk_purchases_recorded_total",
            "Total purchases recorded",
        );
        let purchases_replayed = counter(
            &registry,
            "souk_purchases_replayed_total",
            "Total duplicate purchases answered with the original receipt",
        );
        let duplicate_payments = counter(
            &registry,
            "souk_duplicate_payments_total",
            "Total purchases refused for a reused payment reference",
        );
        let payments_unverified = counter(
            &registry,
            "souk_payments_unverified_total",
            "Total purchases whose payment could not be verified",
        );
        let reports_filed = counter(
            &registry,
            "souk_reports_filed_total",
            "Total abuse reports filed",
        );
        let admin_login_failures = counter(
            &registry,
            "souk_admin_login_failures_total",
            "Total failed admin logins",
        );
        let logs_purged = counter(
            &registry,
            "souk_logs_purged_total",
            "Total audit log entries removed by expiry",
        );

        // Histograms – exponential buckets covering 1 ms → ~16 s.
        let settlement_time_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "souk_settlement_time_ms",
                "Purchase settlement time in milliseconds"
            )
            .buckets(prometheus::exponential_buckets(1.0, 2.0, 15).unwrap()),
            registry
        )
        .expect("failed to register settlement_time_ms histogram");

        Self {
            registry,
            listings_submitted,
            listings_moderated,
            purchases_recorded,
            purchases_replayed,
            duplicate_payments,
            payments_unverified,
            reports_filed,
            admin_login_failures,
            logs_purged,
            settlement_time_ms,
        }
    }

    /// Encode every registered metric in the text exposition format.
    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for MarketMetrics {
    fn default() -> Self {
        Self::new()
    }
}
