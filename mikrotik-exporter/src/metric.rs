//! Metric descriptors and samples.
//!
//! Descriptors are built once, when a collector is constructed, and shared
//! through `Arc`. Samples live only for the duration of one probe.

use std::sync::Arc;

/// Prometheus metric type of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
    Counter,
}

impl MetricKind {
    /// Get the TYPE comment string for Prometheus exposition format.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
        }
    }
}

/// Immutable description of one metric family.
#[derive(Debug, PartialEq, Eq)]
pub struct MetricDesc {
    name: String,
    help: String,
    kind: MetricKind,
    labels: Vec<&'static str>,
}

impl MetricDesc {
    /// Create a descriptor named `{namespace}_{suffix}`.
    pub fn new(
        namespace: &str,
        suffix: &str,
        help: &str,
        kind: MetricKind,
        labels: &[&'static str],
    ) -> Arc<Self> {
        Arc::new(Self {
            name: format!("{}_{}", namespace, suffix),
            help: help.to_string(),
            kind,
            labels: labels.to_vec(),
        })
    }

    /// Create a gauge descriptor.
    pub fn gauge(namespace: &str, suffix: &str, help: &str, labels: &[&'static str]) -> Arc<Self> {
        Self::new(namespace, suffix, help, MetricKind::Gauge, labels)
    }

    /// Create a counter descriptor.
    pub fn counter(
        namespace: &str,
        suffix: &str,
        help: &str,
        labels: &[&'static str],
    ) -> Arc<Self> {
        Self::new(namespace, suffix, help, MetricKind::Counter, labels)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    /// Label names, in the order samples must supply their values.
    pub fn labels(&self) -> &[&'static str] {
        &self.labels
    }
}

/// One measured value of a metric family.
#[derive(Debug, Clone)]
pub struct MetricSample {
    desc: Arc<MetricDesc>,
    value: f64,
    label_values: Vec<String>,
}

impl MetricSample {
    pub fn desc(&self) -> &Arc<MetricDesc> {
        &self.desc
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn label_values(&self) -> &[String] {
        &self.label_values
    }

    /// Look up a label value by label name.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.desc
            .labels
            .iter()
            .position(|l| *l == name)
            .map(|i| self.label_values[i].as_str())
    }

    /// Label name/value pairs in declaration order.
    pub fn labels(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.desc
            .labels
            .iter()
            .copied()
            .zip(self.label_values.iter().map(String::as_str))
    }
}

/// Samples produced by one collector during one probe.
///
/// The buffer is owned by a single collector run and handed back to the
/// prober once the run settles.
#[derive(Debug, Default)]
pub struct SampleBuffer {
    samples: Vec<MetricSample>,
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample.
    ///
    /// A label count that does not match the descriptor is a collector bug;
    /// the sample is dropped and logged rather than rendered malformed.
    pub fn push(&mut self, desc: &Arc<MetricDesc>, value: f64, labels: &[&str]) {
        if labels.len() != desc.labels.len() {
            tracing::error!(
                metric = %desc.name,
                expected = desc.labels.len(),
                got = labels.len(),
                "Label arity mismatch, dropping sample"
            );
            return;
        }

        self.samples.push(MetricSample {
            desc: Arc::clone(desc),
            value,
            label_values: labels.iter().map(|l| l.to_string()).collect(),
        });
    }

    /// Append a sample only if the value decoded.
    pub fn push_some(&mut self, desc: &Arc<MetricDesc>, value: Option<f64>, labels: &[&str]) {
        if let Some(value) = value {
            self.push(desc, value, labels);
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn into_samples(self) -> Vec<MetricSample> {
        self.samples
    }
}

/// Check a metric name (or namespace prefix) against `[a-zA-Z_:][a-zA-Z0-9_:]*`.
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_' || first == ':')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}
