use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Upper bound (inclusive) in milliseconds for each latency bucket; the last
/// bucket is unbounded.
const LATENCY_BUCKET_BOUNDS_MS: [u64; 12] = [25, 50, 100, 250, 500, 1_000, 2_500, 5_000, 10_000, 30_000, 60_000, 120_000];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatencyHistogram {
    /// One counter per bound in [`LATENCY_BUCKET_BOUNDS_MS`] plus a trailing
    /// "+Inf" bucket.
    pub counts: Vec<u64>,
    pub sum_ms: u64,
    pub total: u64,
}

impl LatencyHistogram {
    fn new() -> Self {
        Self {
            counts: vec![0; LATENCY_BUCKET_BOUNDS_MS.len() + 1],
            sum_ms: 0,
            total: 0,
        }
    }

    fn observe(&mut self, duration_ms: u64) {
        let bucket = LATENCY_BUCKET_BOUNDS_MS
            .iter()
            .position(|bound| duration_ms <= *bound)
            .unwrap_or(LATENCY_BUCKET_BOUNDS_MS.len());
        self.counts[bucket] += 1;
        self.sum_ms += duration_ms;
        self.total += 1;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub histograms: HashMap<String, LatencyHistogram>,
    pub in_flight: HashMap<String, i64>,
    pub last_response_previews: HashMap<String, String>,
}

#[derive(Default)]
struct TelemetryState {
    histograms: HashMap<String, LatencyHistogram>,
    in_flight: HashMap<String, i64>,
    last_response_previews: HashMap<String, String>,
}

/// Records per-operation latency histograms, in-flight call counts, and
/// length-capped response previews. One sink is shared process-wide.
pub struct TelemetrySink {
    state: Mutex<TelemetryState>,
    preview_enabled: bool,
    preview_len: usize,
}

impl TelemetrySink {
    pub fn new(preview_enabled: bool, preview_len: usize) -> Self {
        Self {
            state: Mutex::new(TelemetryState::default()),
            preview_enabled,
            preview_len,
        }
    }

    pub fn call_started(&self, operation: &str) {
        let mut state = self.state.lock().expect("telemetry lock poisoned");
        *state.in_flight.entry(operation.to_string()).or_insert(0) += 1;
    }

    pub fn call_finished(&self, operation: &str, duration_ms: u64, response_text: Option<&str>) {
        let mut state = self.state.lock().expect("telemetry lock poisoned");
        if let Some(count) = state.in_flight.get_mut(operation) {
            *count -= 1;
        }
        state
            .histograms
            .entry(operation.to_string())
            .or_insert_with(LatencyHistogram::new)
            .observe(duration_ms);
        if self.preview_enabled {
            if let Some(text) = response_text {
                let preview = truncate_preview(text, self.preview_len);
                state.last_response_previews.insert(operation.to_string(), preview);
            }
        }
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let state = self.state.lock().expect("telemetry lock poisoned");
        TelemetrySnapshot {
            histograms: state.histograms.clone(),
            in_flight: state.in_flight.clone(),
            last_response_previews: state.last_response_previews.clone(),
        }
    }
}

fn truncate_preview(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_len).collect();
        format!("{truncated}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_observe_places_duration_in_expected_bucket() {
        let mut histogram = LatencyHistogram::new();
        histogram.observe(10);
        histogram.observe(40);
        histogram.observe(999_999);
        assert_eq!(histogram.counts[0], 1);
        assert_eq!(histogram.counts[1], 1);
        assert_eq!(*histogram.counts.last().unwrap(), 1);
        assert_eq!(histogram.total, 3);
    }

    #[test]
    fn unit_call_started_then_finished_balances_in_flight_count() {
        let sink = TelemetrySink::new(true, 10);
        sink.call_started("generate");
        assert_eq!(*sink.snapshot().in_flight.get("generate").unwrap(), 1);
        sink.call_finished("generate", 42, Some("hello world"));
        assert_eq!(*sink.snapshot().in_flight.get("generate").unwrap(), 0);
    }

    #[test]
    fn unit_response_preview_is_capped_to_configured_length() {
        let sink = TelemetrySink::new(true, 5);
        sink.call_started("generate");
        sink.call_finished("generate", 10, Some("abcdefghij"));
        let preview = sink.snapshot().last_response_previews.get("generate").cloned().unwrap();
        assert_eq!(preview, "abcde…");
    }

    #[test]
    fn unit_preview_disabled_records_no_preview() {
        let sink = TelemetrySink::new(false, 5);
        sink.call_started("generate");
        sink.call_finished("generate", 10, Some("hello"));
        assert!(sink.snapshot().last_response_previews.is_empty());
    }
}
