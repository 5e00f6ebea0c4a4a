use prometheus::{
    Encoder, Histogram, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub transitions_total: IntCounterVec,
    pub active_requests: IntGauge,
    pub location_updates_total: IntCounterVec,
    pub trip_duration_minutes: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let transitions_total = IntCounterVec::new(
            Opts::new("transitions_total", "Dispatch transitions by action and outcome"),
            &["action", "outcome"],
        )
        .expect("valid transitions_total metric");

        let active_requests = IntGauge::new(
            "active_requests",
            "Transport requests currently in a non-terminal status",
        )
        .expect("valid active_requests metric");

        let location_updates_total = IntCounterVec::new(
            Opts::new("location_updates_total", "Driver location reports by outcome"),
            &["outcome"],
        )
        .expect("valid location_updates_total metric");

        let trip_duration_minutes = Histogram::with_opts(
            prometheus::HistogramOpts::new(
                "trip_duration_minutes",
                "Actual duration of completed trips in minutes",
            )
            .buckets(vec![5.0, 10.0, 20.0, 30.0, 45.0, 60.0, 90.0, 120.0]),
        )
        .expect("valid trip_duration_minutes metric");

        registry
            .register(Box::new(transitions_total.clone()))
            .expect("register transitions_total");
        registry
            .register(Box::new(active_requests.clone()))
            .expect("register active_requests");
        registry
            .register(Box::new(location_updates_total.clone()))
            .expect("register location_updates_total");
        registry
            .register(Box::new(trip_duration_minutes.clone()))
            .expect("register trip_duration_minutes");

        Self {
            registry,
            transitions_total,
            active_requests,
            location_updates_total,
            trip_duration_minutes,
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

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
