//! Metrics Collection
//!
//! Request counters for the helper, exported as Prometheus text or JSON.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Metrics collector for the helper
#[derive(Default)]
pub struct Metrics {
    /// Start time for uptime calculation
    start_time: Option<Instant>,

    /// `/apps` requests served
    pub apps_requests: AtomicU64,

    /// `/apps` requests that failed on the app list lookup
    pub apps_failures: AtomicU64,

    /// Failure markers rendered inside successful `/apps` responses
    pub lookup_failures: AtomicU64,

    /// Probes run
    pub ping_requests: AtomicU64,

    /// Probes that could not reach their target
    pub ping_unreachable: AtomicU64,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time
            .map(|t| t.elapsed().as_secs())
            .unwrap_or(0)
    }

    pub fn inc_apps_requests(&self) {
        self.apps_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_apps_failures(&self) {
        self.apps_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_lookup_failures(&self, count: u64) {
        self.lookup_failures.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_ping_requests(&self) {
        self.ping_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_ping_unreachable(&self) {
        self.ping_unreachable.fetch_add(1, Ordering::Relaxed);
    }

    /// Export metrics in Prometheus format
    pub fn to_prometheus(&self) -> String {
        let series: [(&str, &str, &str, u64); 6] = [
            ("uptime_seconds", "gauge", "Helper uptime in seconds", self.uptime_secs()),
            ("apps_requests", "counter", "Discovery requests served", self.apps_requests.load(Ordering::Relaxed)),
            ("apps_failures", "counter", "Discovery requests failed on the app list", self.apps_failures.load(Ordering::Relaxed)),
            ("lookup_failures", "counter", "Per-app lookup failures reported inline", self.lookup_failures.load(Ordering::Relaxed)),
            ("ping_requests", "counter", "Reachability probes run", self.ping_requests.load(Ordering::Relaxed)),
            ("ping_unreachable", "counter", "Probes whose target was unreachable", self.ping_unreachable.load(Ordering::Relaxed)),
        ];

        let mut output = String::new();
        for (name, kind, help, value) in series {
            output.push_str(&format!(
                "# HELP privnet_helper_{name} {help}\n\
                 # TYPE privnet_helper_{name} {kind}\n\
                 privnet_helper_{name} {value}\n\n"
            ));
        }
        output
    }

    /// Export metrics as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "uptime_secs": self.uptime_secs(),
            "apps": {
                "requests": self.apps_requests.load(Ordering::Relaxed),
                "failures": self.apps_failures.load(Ordering::Relaxed),
                "lookup_failures": self.lookup_failures.load(Ordering::Relaxed),
            },
            "ping": {
                "requests": self.ping_requests.load(Ordering::Relaxed),
                "unreachable": self.ping_unreachable.load(Ordering::Relaxed),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_increment() {
        let metrics = Metrics::new();

        metrics.inc_apps_requests();
        metrics.inc_apps_requests();
        metrics.add_lookup_failures(3);

        assert_eq!(metrics.apps_requests.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.lookup_failures.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_prometheus_format() {
        let metrics = Metrics::new();
        metrics.inc_ping_requests();
        metrics.inc_ping_unreachable();

        let output = metrics.to_prometheus();

        assert!(output.contains("# TYPE privnet_helper_ping_requests counter"));
        assert!(output.contains("privnet_helper_ping_requests 1"));
        assert!(output.contains("privnet_helper_ping_unreachable 1"));
        assert!(output.contains("privnet_helper_apps_failures 0"));
    }

    #[test]
    fn test_prometheus_lists_every_series() {
        let output = Metrics::new().to_prometheus();

        for name in [
            "uptime_seconds",
            "apps_requests",
            "apps_failures",
            "lookup_failures",
            "ping_requests",
            "ping_unreachable",
        ] {
            assert!(output.contains(&format!("# HELP privnet_helper_{name} ")));
            assert!(output.contains(&format!("# TYPE privnet_helper_{name} ")));
            assert!(output.contains(&format!("\nprivnet_helper_{name} ")));
        }
        assert!(output.ends_with("\n\n"));
    }

    #[test]
    fn test_json_format() {
        let metrics = Metrics::new();
        metrics.inc_apps_failures();

        let json = metrics.to_json();

        assert_eq!(json["apps"]["failures"], 1);
        assert_eq!(json["ping"]["requests"], 0);
    }
}
