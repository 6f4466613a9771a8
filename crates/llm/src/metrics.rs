//! In-process counters for introspection and tests. Not exported externally; no OTEL
//! meter pipeline backs this, just plain atomics.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::OpenCcError;

#[derive(Debug, Default)]
pub struct Metrics {
    requests_total: AtomicU64,
    errors_invalid_request: AtomicU64,
    errors_authentication: AtomicU64,
    errors_rate_limit: AtomicU64,
    errors_not_supported: AtomicU64,
    errors_timeout: AtomicU64,
    errors_api: AtomicU64,
    errors_internal: AtomicU64,
    errors_provider_init: AtomicU64,
    errors_stream: AtomicU64,
    content_filter_stops: AtomicU64,
    active_streams: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self, error: &OpenCcError) {
        let counter = match error {
            OpenCcError::InvalidRequest(_) => &self.errors_invalid_request,
            OpenCcError::Authentication(_) => &self.errors_authentication,
            OpenCcError::RateLimit(_) => &self.errors_rate_limit,
            OpenCcError::NotSupported(_) => &self.errors_not_supported,
            OpenCcError::Timeout(_) => &self.errors_timeout,
            OpenCcError::Api(_) => &self.errors_api,
            OpenCcError::Internal(_) => &self.errors_internal,
            OpenCcError::ProviderInit(_) => &self.errors_provider_init,
            OpenCcError::Stream(_) => &self.errors_stream,
        };

        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// The `content_filter → end_turn` wire mapping erases this distinction from the
    /// client-visible response; counted here so it isn't lost entirely.
    pub fn record_content_filter_stop(&self) {
        self.content_filter_stops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stream_started(&self) {
        self.active_streams.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stream_ended(&self) {
        self.active_streams.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            errors_total: self.errors_invalid_request.load(Ordering::Relaxed)
                + self.errors_authentication.load(Ordering::Relaxed)
                + self.errors_rate_limit.load(Ordering::Relaxed)
                + self.errors_not_supported.load(Ordering::Relaxed)
                + self.errors_timeout.load(Ordering::Relaxed)
                + self.errors_api.load(Ordering::Relaxed)
                + self.errors_internal.load(Ordering::Relaxed)
                + self.errors_provider_init.load(Ordering::Relaxed)
                + self.errors_stream.load(Ordering::Relaxed),
            content_filter_stops: self.content_filter_stops.load(Ordering::Relaxed),
            active_streams: self.active_streams.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub errors_total: u64,
    pub content_filter_stops: u64,
    pub active_streams: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_request_increments_the_total() {
        let metrics = Metrics::new();
        metrics.record_request();
        metrics.record_request();
        assert_eq!(metrics.snapshot().requests_total, 2);
    }

    #[test]
    fn record_error_buckets_by_taxonomy_tag() {
        let metrics = Metrics::new();
        metrics.record_error(&OpenCcError::RateLimit("slow down".to_string()));
        metrics.record_error(&OpenCcError::Timeout("too slow".to_string()));
        assert_eq!(metrics.snapshot().errors_total, 2);
    }

    #[test]
    fn stream_lifecycle_tracks_active_count() {
        let metrics = Metrics::new();
        metrics.stream_started();
        metrics.stream_started();
        metrics.stream_ended();
        assert_eq!(metrics.snapshot().active_streams, 1);
    }
}
