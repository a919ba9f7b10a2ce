//! Test-only helpers.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::{
    Counter, CounterFn, Gauge, Histogram, HistogramFn, Key, KeyName, Metadata, Recorder,
    SharedString, Unit,
};
use parking_lot::Mutex;

/// Counter value, or number of histogram samples.
#[derive(Default)]
pub(crate) struct Cell(AtomicU64);

impl CounterFn for Cell {
    fn increment(&self, value: u64) { self.0.fetch_add(value, Ordering::Relaxed); }
    fn absolute(&self, value: u64) { self.0.fetch_max(value, Ordering::Relaxed); }
}

impl HistogramFn for Cell {
    fn record(&self, _value: f64) { self.0.fetch_add(1, Ordering::Relaxed); }
}

/// Recorder keeping one cell per rendered key, e.g.
/// `t_requests_total{outcome=ok,route=/x}`. Labels are sorted by name.
#[derive(Default)]
pub(crate) struct Capture(Mutex<HashMap<String, Arc<Cell>>>);

impl Capture {
    fn cell(&self, key: &Key) -> Arc<Cell> {
        let mut labels: Vec<_> = key.labels().map(|l| format!("{}={}", l.key(), l.value())).collect();
        labels.sort();
        let name = format!("{}{{{}}}", key.name(), labels.join(","));
        Arc::clone(self.0.lock().entry(name).or_default())
    }

    pub(crate) fn get(&self, name: &str) -> u64 {
        self.0.lock().get(name).map_or(0, |c| c.0.load(Ordering::Relaxed))
    }
}

impl Recorder for Capture {
    fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

    fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
        Counter::from_arc(self.cell(key))
    }

    fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, key: &Key, _: &Metadata<'_>) -> Histogram {
        Histogram::from_arc(self.cell(key))
    }
}
