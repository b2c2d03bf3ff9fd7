use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct PricingMetrics {
    pub registry: Registry,
    pub discount_evaluations_total: IntCounterVec,
    pub tax_resolutions_total: IntCounterVec,
    pub store_failures_total: IntCounterVec,
    pub store_retries_total: IntCounterVec,
    pub store_read_seconds: Histogram,
}

impl PricingMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        let discount_evaluations_total = IntCounterVec::new(
            Opts::new(
                "pricing_discount_evaluations_total",
                "Discount evaluations grouped by endpoint and outcome",
            ),
            &["endpoint", "outcome"],
        ).unwrap();
        let tax_resolutions_total = IntCounterVec::new(
            Opts::new(
                "pricing_tax_resolutions_total",
                "Tax resolutions grouped by jurisdiction level",
            ),
            &["level"],
        ).unwrap();
        let store_failures_total = IntCounterVec::new(
            Opts::new(
                "pricing_store_failures_total",
                "Backing store reads that failed after retries",
            ),
            &["store", "kind"],
        ).unwrap();
        let store_retries_total = IntCounterVec::new(
            Opts::new(
                "pricing_store_retries_total",
                "Backing store reads retried after a transient fault",
            ),
            &["store"],
        ).unwrap();
        let store_read_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "pricing_store_read_seconds",
                "Latency of backing store reads including retries",
            ).buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
        ).unwrap();
        let _ = registry.register(Box::new(discount_evaluations_total.clone()));
        let _ = registry.register(Box::new(tax_resolutions_total.clone()));
        let _ = registry.register(Box::new(store_failures_total.clone()));
        let _ = registry.register(Box::new(store_retries_total.clone()));
        let _ = registry.register(Box::new(store_read_seconds.clone()));
        PricingMetrics {
            registry,
            discount_evaluations_total,
            tax_resolutions_total,
            store_failures_total,
            store_retries_total,
            store_read_seconds,
        }
    }

    pub fn discount_outcome(&self, endpoint: &str, outcome: &str) {
        self.discount_evaluations_total.with_label_values(&[endpoint, outcome]).inc();
    }

    pub fn tax_level(&self, level: &str) {
        self.tax_resolutions_total.with_label_values(&[level]).inc();
    }

    pub fn store_failure(&self, store: &str, kind: &str) {
        self.store_failures_total.with_label_values(&[store, kind]).inc();
    }

    pub fn store_retry(&self, store: &str) {
        self.store_retries_total.with_label_values(&[store]).inc();
    }

    /// Encode this registry plus any extra registries in prometheus text format.
    pub fn render(&self, extra: &[&Registry]) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut families = self.registry.gather();
        for reg in extra {
            families.extend(reg.gather());
        }
        let mut buf = Vec::new();
        encoder.encode(&families, &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).to_string())
    }
}

impl Default for PricingMetrics {
    fn default() -> Self { Self::new() }
}
