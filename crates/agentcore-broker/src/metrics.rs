/// Sink for structured broker metrics, grounded on
/// `test_broker_advanced.py::test_metrics_emission`'s `(name, value,
/// labels)` shape. Production wires this to whatever metrics backend the
/// platform runs; tests substitute an in-memory collector.
pub trait MetricsSink: Send + Sync {
    fn record(&self, name: &str, value: i64, labels: &[(&str, &str)]);
}

/// No-op sink used when no collector is configured.
pub struct NullMetricsSink;

impl MetricsSink for NullMetricsSink {
    fn record(&self, _name: &str, _value: i64, _labels: &[(&str, &str)]) {}
}
