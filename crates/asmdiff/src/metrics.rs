//! Case metrics using metrics-rs.
//!
//! Every executed (case, architecture) pair increments an outcome counter and
//! records its wall-clock duration. Without an installed recorder these calls
//! are no-ops; the CLI installs [`CliRecorder`] when `--metrics` is given.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use metrics::{
    Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit, counter,
    describe_counter, describe_histogram, histogram,
};
use parking_lot::RwLock;

use crate::arch::TargetArch;
use crate::case::{StageOutcome, TestKind};

pub const CASES_TOTAL: &str = "asmdiff_cases_total";
pub const CASE_DURATION: &str = "asmdiff_case_duration_seconds";

/// Register metric descriptions. Call once at startup.
pub fn init() {
    describe_counter!(CASES_TOTAL, Unit::Count, "Cases executed, by outcome");
    describe_histogram!(
        CASE_DURATION,
        Unit::Seconds,
        "Wall-clock time of one case on one architecture"
    );
}

/// Label value for an outcome (`pass`, `skip`, or the failing stage).
#[must_use]
pub fn outcome_label(outcome: &StageOutcome) -> &'static str {
    if outcome.is_pass() {
        return "pass";
    }
    match (outcome, outcome.stage()) {
        (StageOutcome::SourceNotFound { .. }, _) => "not_found",
        (_, Some(stage)) => stage.as_str(),
        (_, None) => "skip",
    }
}

/// Record one case result.
pub fn record_case(kind: TestKind, arch: TargetArch, outcome: &StageOutcome, elapsed: Duration) {
    let kind = kind.extension();
    let arch = arch.as_str();
    counter!(CASES_TOTAL, "kind" => kind, "arch" => arch, "outcome" => outcome_label(outcome))
        .increment(1);
    histogram!(CASE_DURATION, "kind" => kind, "arch" => arch).record(elapsed.as_secs_f64());
}

// ============================================================================
// CLI Recorder for terminal output
// ============================================================================

#[derive(Default)]
struct CounterStorage {
    values: RwLock<HashMap<String, u64>>,
}

#[derive(Default)]
struct HistogramStorage {
    values: RwLock<HashMap<String, Vec<f64>>>,
}

struct CliCounter {
    key: String,
    storage: Arc<CounterStorage>,
}

impl metrics::CounterFn for CliCounter {
    fn increment(&self, value: u64) {
        *self.storage.values.write().entry(self.key.clone()).or_insert(0) += value;
    }

    fn absolute(&self, value: u64) {
        self.storage.values.write().insert(self.key.clone(), value);
    }
}

struct CliHistogram {
    key: String,
    storage: Arc<HistogramStorage>,
}

impl metrics::HistogramFn for CliHistogram {
    fn record(&self, value: f64) {
        self.storage
            .values
            .write()
            .entry(self.key.clone())
            .or_default()
            .push(value);
    }
}

/// In-memory recorder; gauges are not used by the harness and are dropped.
#[derive(Default)]
pub struct CliRecorder {
    counters: Arc<CounterStorage>,
    histograms: Arc<HistogramStorage>,
}

impl CliRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle onto this recorder's storage without installing it globally.
    #[must_use]
    pub fn handle(&self) -> CliRecorderHandle {
        CliRecorderHandle {
            counters: Arc::clone(&self.counters),
            histograms: Arc::clone(&self.histograms),
        }
    }

    /// Install as the global recorder. Returns `None` if one is already set.
    #[must_use]
    pub fn install(self) -> Option<CliRecorderHandle> {
        let handle = self.handle();
        metrics::set_global_recorder(self).ok()?;
        Some(handle)
    }
}

fn key_to_string(key: &Key) -> String {
    let labels: Vec<String> = key
        .labels()
        .map(|l| format!("{}={}", l.key(), l.value()))
        .collect();
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
        Counter::from_arc(Arc::new(CliCounter {
            key: key_to_string(key),
            storage: Arc::clone(&self.counters),
        }))
    }

    fn register_gauge(&self, _key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::from_arc(Arc::new(CliHistogram {
            key: key_to_string(key),
            storage: Arc::clone(&self.histograms),
        }))
    }
}

/// Read access to what a [`CliRecorder`] collected.
pub struct CliRecorderHandle {
    counters: Arc<CounterStorage>,
    histograms: Arc<HistogramStorage>,
}

impl CliRecorderHandle {
    #[must_use]
    pub fn get_counter(&self, key: &str) -> Option<u64> {
        self.counters.values.read().get(key).copied()
    }

    #[must_use]
    pub fn get_histogram(&self, key: &str) -> Option<Vec<f64>> {
        self.histograms.values.read().get(key).cloned()
    }

    /// Human-readable summary, keys sorted.
    #[must_use]
    pub fn summary(&self) -> String {
        let counters = self.counters.values.read();
        let histograms = self.histograms.values.read();
        if counters.is_empty() && histograms.is_empty() {
            return "No metrics collected.\n".to_string();
        }

        let mut out = String::from("## Metrics Summary\n");
        if !counters.is_empty() {
            out.push_str("\n### Counters\n");
            let mut keys: Vec<_> = counters.keys().collect();
            keys.sort();
            for key in keys {
                out.push_str(&format!("  {key}: {}\n", counters[key]));
            }
        }
        if !histograms.is_empty() {
            out.push_str("\n### Histograms\n");
            let mut keys: Vec<_> = histograms.keys().collect();
            keys.sort();
            for key in keys {
                let values = &histograms[key];
                let count = values.len();
                let total: f64 = values.iter().sum();
                let max = values.iter().copied().fold(0.0_f64, f64::max);
                #[allow(clippy::cast_precision_loss)]
                let mean = if count == 0 { 0.0 } else { total / count as f64 };
                out.push_str(&format!(
                    "  {key}: count={count} mean={mean:.3}s max={max:.3}s\n"
                ));
            }
        }
        out
    }
}
