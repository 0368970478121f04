// src/scheduling/metrics.rs — Per-attempt metrics for external API calls

use std::sync::Mutex;

use metrics::{counter, histogram};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Success,
    Failure,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Success => "success",
            CallStatus::Failure => "failure",
        }
    }
}

/// Receives one record for every attempt made against an external service.
pub trait MetricsSink: Send + Sync {
    fn record(&self, service: &str, operation: &str, status: CallStatus, latency_ms: f64);
}

/// Logs each record at debug level. Local development default.
#[derive(Debug, Default)]
pub struct TracingSink;

impl MetricsSink for TracingSink {
    fn record(&self, service: &str, operation: &str, status: CallStatus, latency_ms: f64) {
        tracing::debug!(
            service,
            operation,
            status = status.as_str(),
            latency_ms,
            "external api call"
        );
    }
}

/// Emits through the `metrics` facade; whichever recorder the binary installs
/// receives the data.
#[derive(Debug, Default)]
pub struct FacadeSink;

impl MetricsSink for FacadeSink {
    fn record(&self, service: &str, operation: &str, status: CallStatus, latency_ms: f64) {
        let labels = [
            ("service", service.to_string()),
            ("operation", operation.to_string()),
            ("status", status.as_str().to_string()),
        ];
        counter!("external_api_requests_total", &labels).increment(1);

        let latency_labels = [
            ("service", service.to_string()),
            ("operation", operation.to_string()),
        ];
        histogram!("external_api_latency_ms", &latency_labels).record(latency_ms);
    }
}

/// Fans a record out to several sinks.
pub struct CompositeSink {
    sinks: Vec<Box<dyn MetricsSink>>,
}

impl CompositeSink {
    pub fn new(sinks: Vec<Box<dyn MetricsSink>>) -> Self {
        Self { sinks }
    }
}

impl MetricsSink for CompositeSink {
    fn record(&self, service: &str, operation: &str, status: CallStatus, latency_ms: f64) {
        for sink in &self.sinks {
            sink.record(service, operation, status, latency_ms);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub service: String,
    pub operation: String,
    pub status: CallStatus,
    pub latency_ms: f64,
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct InMemorySink {
    records: Mutex<Vec<MetricRecord>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<MetricRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn count(&self, status: CallStatus) -> usize {
        self.records()
            .iter()
            .filter(|r| r.status == status)
            .count()
    }
}

impl MetricsSink for InMemorySink {
    fn record(&self, service: &str, operation: &str, status: CallStatus, latency_ms: f64) {
        if let Ok(mut records) = self.records.lock() {
            records.push(MetricRecord {
                service: service.to_string(),
                operation: operation.to_string(),
                status,
                latency_ms,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_in_memory_sink_counts() {
        let sink = InMemorySink::new();
        sink.record("calendly", "list_availability", CallStatus::Failure, 12.0);
        sink.record("calendly", "list_availability", CallStatus::Success, 8.5);
        assert_eq!(sink.count(CallStatus::Failure), 1);
        assert_eq!(sink.count(CallStatus::Success), 1);
        assert_eq!(sink.records()[1].latency_ms, 8.5);
    }

    struct Shared(Arc<InMemorySink>);

    impl MetricsSink for Shared {
        fn record(&self, service: &str, operation: &str, status: CallStatus, latency_ms: f64) {
            self.0.record(service, operation, status, latency_ms);
        }
    }

    #[test]
    fn test_composite_fans_out() {
        let a = Arc::new(InMemorySink::new());
        let b = Arc::new(InMemorySink::new());
        let sink = CompositeSink::new(vec![
            Box::new(Shared(a.clone())),
            Box::new(Shared(b.clone())),
            Box::new(TracingSink),
            Box::new(FacadeSink),
        ]);
        sink.record("calendly", "cancel_invitee", CallStatus::Success, 1.0);
        assert_eq!(a.records().len(), 1);
        assert_eq!(b.records()[0].operation, "cancel_invitee");
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(CallStatus::Success.as_str(), "success");
        assert_eq!(CallStatus::Failure.as_str(), "failure");
    }
}
