//! Session metrics using metrics-rs.
//!
//! Every tracing mode reports through the `metrics` facade; without an
//! installed recorder the calls are no-ops. The binary installs
//! [`CliRecorder`] behind `--metrics` and prints a summary on exit.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::{
    Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit, counter,
    describe_counter, describe_gauge, describe_histogram, gauge, histogram,
};
use parking_lot::RwLock;
use steptrace_hook::SessionStats;

use crate::timing::Elapsed;

/// Tracing mode label attached to session metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Tree,
    Step,
    StepAsync,
    Profile,
}

impl SessionMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tree => "tree",
            Self::Step => "step",
            Self::StepAsync => "step_async",
            Self::Profile => "profile",
        }
    }
}

// ============================================================================
// Metric descriptions
// ============================================================================

/// Register metric descriptions. Call once at startup.
pub fn init() {
    describe_counter!("steptrace_sessions_total", Unit::Count, "Completed trace sessions");
    describe_counter!(
        "steptrace_frame_events_total",
        Unit::Count,
        "Frame events delivered to session handlers"
    );
    describe_counter!(
        "steptrace_filtered_events_total",
        Unit::Count,
        "Frame events dropped by the session filter"
    );
    describe_counter!("steptrace_pauses_total", Unit::Count, "Step session pauses");

    describe_gauge!("steptrace_call_depth_peak", Unit::Count, "Deepest traced call stack");

    describe_histogram!(
        "steptrace_session_duration_seconds",
        Unit::Seconds,
        "Wall time of traced calls"
    );
}

// ============================================================================
// Metric recording functions
// ============================================================================

/// Record one finished session.
pub fn record_session(mode: SessionMode, stats: &SessionStats, elapsed: Elapsed) {
    let labels = [("mode", mode.as_str())];

    counter!("steptrace_sessions_total", &labels).increment(1);
    counter!("steptrace_frame_events_total", &labels).increment(stats.delivered);
    counter!("steptrace_filtered_events_total", &labels).increment(stats.filtered);
    histogram!("steptrace_session_duration_seconds", &labels).record(elapsed.as_secs_f64());
}

/// Record the pauses of one step session.
pub fn record_pauses(pauses: usize) {
    counter!("steptrace_pauses_total").increment(u64::try_from(pauses).unwrap_or(u64::MAX));
}

/// Record the deepest call stack of a tree session.
pub fn record_peak_depth(depth: usize) {
    gauge!("steptrace_call_depth_peak").set(f64::from(u32::try_from(depth).unwrap_or(u32::MAX)));
}

// ============================================================================
// CLI Recorder for terminal output
// ============================================================================

/// Values recorded by [`CliRecorder`], keyed by rendered metric key.
#[derive(Default)]
struct Storage {
    counters: RwLock<HashMap<String, u64>>,
    gauges: RwLock<HashMap<String, f64>>,
    histograms: RwLock<HashMap<String, Vec<f64>>>,
}

/// Handle shared by every metric kind; the trait impl picks the map.
struct CliMetric {
    key: String,
    storage: Arc<Storage>,
}

impl metrics::CounterFn for CliMetric {
    fn increment(&self, value: u64) {
        *self.storage.counters.write().entry(self.key.clone()).or_insert(0) += value;
    }

    fn absolute(&self, value: u64) {
        self.storage.counters.write().insert(self.key.clone(), value);
    }
}

impl metrics::GaugeFn for CliMetric {
    fn increment(&self, value: f64) {
        *self.storage.gauges.write().entry(self.key.clone()).or_insert(0.0) += value;
    }

    fn decrement(&self, value: f64) {
        *self.storage.gauges.write().entry(self.key.clone()).or_insert(0.0) -= value;
    }

    fn set(&self, value: f64) {
        self.storage.gauges.write().insert(self.key.clone(), value);
    }
}

impl metrics::HistogramFn for CliMetric {
    fn record(&self, value: f64) {
        self.storage
            .histograms
            .write()
            .entry(self.key.clone())
            .or_default()
            .push(value);
    }
}

/// In-memory recorder for CLI runs.
#[derive(Default)]
pub struct CliRecorder {
    storage: Arc<Storage>,
}

impl CliRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install as the global recorder. `None` if one is already installed.
    pub fn install(self) -> Option<CliRecorderHandle> {
        let storage = Arc::clone(&self.storage);
        metrics::set_global_recorder(self).ok()?;
        Some(CliRecorderHandle { storage })
    }

    fn metric(&self, key: &Key) -> Arc<CliMetric> {
        Arc::new(CliMetric {
            key: key_to_string(key),
            storage: Arc::clone(&self.storage),
        })
    }
}

fn key_to_string(key: &Key) -> String {
    let labels: Vec<String> = key.labels().map(|l| format!("{}={}", l.key(), l.value())).collect();
    if labels.is_empty() {
        key.name().to_string()
    } else {
        format!("{}{{{}}}", key.name(), labels.join(","))
    }
}

impl Recorder for CliRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(self.metric(key))
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::from_arc(self.metric(key))
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::from_arc(self.metric(key))
    }
}

/// Read access to the metrics recorded by an installed [`CliRecorder`].
pub struct CliRecorderHandle {
    storage: Arc<Storage>,
}

impl CliRecorderHandle {
    pub fn get_counter(&self, key: &str) -> Option<u64> {
        self.storage.counters.read().get(key).copied()
    }

    pub fn get_gauge(&self, key: &str) -> Option<f64> {
        self.storage.gauges.read().get(key).copied()
    }

    pub fn get_histogram(&self, key: &str) -> Option<Vec<f64>> {
        self.storage.histograms.read().get(key).cloned()
    }

    /// Summary rows as `(metric, value)`, sorted within each kind.
    pub fn summary_rows(&self) -> Vec<(String, String)> {
        let mut rows = Vec::new();

        let counters = self.storage.counters.read();
        let mut keys: Vec<_> = counters.keys().collect();
        keys.sort();
        rows.extend(keys.into_iter().map(|key| (key.clone(), counters[key].to_string())));

        let gauges = self.storage.gauges.read();
        let mut keys: Vec<_> = gauges.keys().collect();
        keys.sort();
        rows.extend(keys.into_iter().map(|key| (key.clone(), format!("{:.6}", gauges[key]))));

        let histograms = self.storage.histograms.read();
        let mut keys: Vec<_> = histograms.keys().collect();
        keys.sort();
        for key in keys {
            let values = &histograms[key];
            if values.is_empty() {
                continue;
            }
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            rows.push((
                key.clone(),
                format!("count={}, min={min:.6}, max={max:.6}", values.len()),
            ));
        }
        rows
    }

    /// Print all collected metrics.
    pub fn print_summary(&self) {
        let rows = self.summary_rows();
        if rows.is_empty() {
            println!("No metrics collected.");
            return;
        }

        println!();
        println!("## Metrics Summary");
        for (key, value) in rows {
            println!("  {key}: {value}");
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics::Label;

    #[test]
    fn test_key_to_string() {
        let key = Key::from_name("steptrace_pauses_total");
        assert_eq!(key_to_string(&key), "steptrace_pauses_total");

        let key = Key::from_parts("steptrace_sessions_total", vec![Label::new("mode", "tree")]);
        assert_eq!(key_to_string(&key), "steptrace_sessions_total{mode=tree}");

        let key = Key::from_parts(
            "steptrace_sessions_total",
            vec![Label::new("mode", "step"), Label::new("demo", "sum")],
        );
        assert_eq!(key_to_string(&key), "steptrace_sessions_total{mode=step,demo=sum}");
    }

    #[test]
    fn test_recorder_storage() {
        let recorder = CliRecorder::new();
        let handle = CliRecorderHandle {
            storage: Arc::clone(&recorder.storage),
        };

        let labels = vec![Label::new("mode", "tree")];
        let sessions = recorder.metric(&Key::from_parts("steptrace_sessions_total", labels));
        metrics::CounterFn::increment(&*sessions, 2);
        metrics::CounterFn::increment(&*sessions, 1);
        assert_eq!(handle.get_counter("steptrace_sessions_total{mode=tree}"), Some(3));

        let depth = recorder.metric(&Key::from_name("steptrace_call_depth_peak"));
        metrics::GaugeFn::set(&*depth, 4.0);
        assert_eq!(handle.get_gauge("steptrace_call_depth_peak"), Some(4.0));

        let duration = recorder.metric(&Key::from_name("steptrace_session_duration_seconds"));
        metrics::HistogramFn::record(&*duration, 0.5);
        metrics::HistogramFn::record(&*duration, 1.5);
        assert_eq!(
            handle.get_histogram("steptrace_session_duration_seconds"),
            Some(vec![0.5, 1.5])
        );

        let rows = handle.summary_rows();
        assert_eq!(rows[0], ("steptrace_sessions_total{mode=tree}".to_string(), "3".to_string()));
        assert_eq!(
            rows[2].1,
            "count=2, min=0.500000, max=1.500000"
        );
    }

    #[test]
    fn test_mode_labels() {
        assert_eq!(SessionMode::StepAsync.as_str(), "step_async");
        assert_eq!(SessionMode::Profile.as_str(), "profile");
    }
}
