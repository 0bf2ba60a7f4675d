use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

pub struct Metrics {
    registry: Registry,
    pub charges: IntCounterVec,
    pub refunds: IntCounter,
    pub events_published: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        let charges = IntCounterVec::new(
            Opts::new("parcel_charges_total", "Charge requests by outcome"),
            &["outcome"],
        )
        .expect("charges metric");
        let refunds =
            IntCounter::new("parcel_refunds_total", "Refunds issued").expect("refunds metric");
        let events_published = IntCounter::new(
            "parcel_events_published_total",
            "Inbound real-time messages accepted",
        )
        .expect("events metric");

        registry
            .register(Box::new(charges.clone()))
            .expect("register charges");
        registry
            .register(Box::new(refunds.clone()))
            .expect("register refunds");
        registry
            .register(Box::new(events_published.clone()))
            .expect("register events");

        Self {
            registry,
            charges,
            refunds,
            events_published,
        }
    }

    pub fn render(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!("failed to encode metrics: {}", err);
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
