//! Hand-rendered Prometheus text metrics (`/metrics`).
//!
//! Counters accumulate in-process; gauges are sampled from the Room Store
//! at scrape time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use parking_lot::Mutex;

#[derive(Default)]
pub struct Metrics {
    pub requests_total: AtomicU64,
    pub tool_calls_total: AtomicU64,
    pub messages_total: AtomicU64,
    pub sse_connections: AtomicI64,
    pub notifications_lagged_total: AtomicU64,
    /// Error counts by taxonomy kind.
    errors_by_kind: Mutex<HashMap<&'static str, u64>>,
    /// Tool call counts by tool name.
    calls_by_tool: Mutex<HashMap<String, u64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_error(&self, kind: &'static str) {
        *self.errors_by_kind.lock().entry(kind).or_default() += 1;
    }

    pub fn record_tool_call(&self, tool: &str) {
        self.tool_calls_total.fetch_add(1, Ordering::Relaxed);
        *self.calls_by_tool.lock().entry(tool.to_owned()).or_default() += 1;
    }

    /// Render the Prometheus text exposition.  Gauge values are supplied
    /// by the caller, sampled from live state.
    pub fn render(&self, gauges: &[(&str, &str, f64)]) -> String {
        let mut out = String::new();

        let counter = |out: &mut String, name: &str, help: &str, value: u64| {
            out.push_str(&format!("# HELP {name} {help}\n# TYPE {name} counter\n{name} {value}\n"));
        };
        counter(
            &mut out,
            "masc_requests_total",
            "JSON-RPC requests received",
            self.requests_total.load(Ordering::Relaxed),
        );
        counter(
            &mut out,
            "masc_tool_calls_total",
            "tools/call invocations",
            self.tool_calls_total.load(Ordering::Relaxed),
        );
        counter(
            &mut out,
            "masc_messages_total",
            "room messages appended",
            self.messages_total.load(Ordering::Relaxed),
        );
        counter(
            &mut out,
            "masc_notifications_lagged_total",
            "notifications dropped on slow subscribers",
            self.notifications_lagged_total.load(Ordering::Relaxed),
        );

        out.push_str("# HELP masc_errors_total failed tool calls by kind\n");
        out.push_str("# TYPE masc_errors_total counter\n");
        let errors = self.errors_by_kind.lock();
        let mut kinds: Vec<_> = errors.iter().collect();
        kinds.sort();
        for (kind, count) in kinds {
            out.push_str(&format!("masc_errors_total{{kind=\"{kind}\"}} {count}\n"));
        }
        drop(errors);

        out.push_str("# HELP masc_tool_invocations_total tool calls by name\n");
        out.push_str("# TYPE masc_tool_invocations_total counter\n");
        let calls = self.calls_by_tool.lock();
        let mut tools: Vec<_> = calls.iter().collect();
        tools.sort();
        for (tool, count) in tools {
            out.push_str(&format!(
                "masc_tool_invocations_total{{tool=\"{tool}\"}} {count}\n"
            ));
        }
        drop(calls);

        out.push_str(&format!(
            "# HELP masc_sse_connections open SSE streams\n# TYPE masc_sse_connections gauge\nmasc_sse_connections {}\n",
            self.sse_connections.load(Ordering::Relaxed)
        ));
        for (name, help, value) in gauges {
            out.push_str(&format!(
                "# HELP {name} {help}\n# TYPE {name} gauge\n{name} {value}\n"
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_counters_and_labels() {
        let metrics = Metrics::new();
        metrics.requests_total.fetch_add(3, Ordering::Relaxed);
        metrics.record_tool_call("masc_join");
        metrics.record_error("conflict");
        metrics.record_error("conflict");

        let text = metrics.render(&[("masc_tempo_seconds", "supervisor interval", 30.0)]);
        assert!(text.contains("masc_requests_total 3"));
        assert!(text.contains("masc_tool_invocations_total{tool=\"masc_join\"} 1"));
        assert!(text.contains("masc_errors_total{kind=\"conflict\"} 2"));
        assert!(text.contains("masc_tempo_seconds 30"));
    }
}
