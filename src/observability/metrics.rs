use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub orders_created_total: IntCounter,
    pub assignments_total: IntCounterVec,
    pub deliveries_completed_total: IntCounter,
    pub exceptions_reported_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let orders_created_total =
            IntCounter::new("orders_created_total", "Total orders created")
                .expect("valid orders_created_total metric");

        let assignments_total = IntCounterVec::new(
            Opts::new("assignments_total", "Total assignment attempts by outcome"),
            &["outcome"],
        )
        .expect("valid assignments_total metric");

        let deliveries_completed_total = IntCounter::new(
            "deliveries_completed_total",
            "Total orders delivered",
        )
        .expect("valid deliveries_completed_total metric");

        let exceptions_reported_total = IntCounter::new(
            "exceptions_reported_total",
            "Total exceptions reported against orders",
        )
        .expect("valid exceptions_reported_total metric");

        registry
            .register(Box::new(orders_created_total.clone()))
            .expect("register orders_created_total");
        registry
            .register(Box::new(assignments_total.clone()))
            .expect("register assignments_total");
        registry
            .register(Box::new(deliveries_completed_total.clone()))
            .expect("register deliveries_completed_total");
        registry
            .register(Box::new(exceptions_reported_total.clone()))
            .expect("register exceptions_reported_total");

        Self {
            registry,
            orders_created_total,
            assignments_total,
            deliveries_completed_total,
            exceptions_reported_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
