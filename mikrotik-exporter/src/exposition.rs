//! Prometheus text exposition of probe samples.

use std::collections::HashMap;
use std::fmt::Write;

use crate::metric::MetricSample;

/// Content type of the rendered body.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Render samples in Prometheus text exposition format.
///
/// Samples are grouped by family in the order each family first appears,
/// with one HELP and TYPE header per family.
pub fn render(samples: &[MetricSample]) -> String {
    let mut families: Vec<(&str, Vec<&MetricSample>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for sample in samples {
        let name = sample.desc().name();
        let slot = *index.entry(name).or_insert_with(|| {
            families.push((name, Vec::new()));
            families.len() - 1
        });
        families[slot].1.push(sample);
    }

    let mut output = String::with_capacity(samples.len() * 100);

    for (name, series) in families {
        let desc = series[0].desc();
        writeln!(output, "# HELP {} {}", name, escape_help(desc.help())).ok();
        writeln!(output, "# TYPE {} {}", name, desc.kind().as_str()).ok();

        for sample in series {
            writeln!(
                output,
                "{}{} {}",
                name,
                format_labels(sample),
                format_value(sample.value())
            )
            .ok();
        }
    }

    output
}

/// Format labels for Prometheus exposition format.
fn format_labels(sample: &MetricSample) -> String {
    let parts: Vec<String> = sample
        .labels()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
        .collect();

    if parts.is_empty() {
        return String::new();
    }

    format!("{{{}}}", parts.join(","))
}

/// Escape special characters in label values.
fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape special characters in HELP text.
fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Format a floating point value for Prometheus.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}
