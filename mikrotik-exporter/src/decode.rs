//! Decoding of RouterOS field values.
//!
//! The REST API sends every value as a string, whatever its logical type.
//! Each decoder here either yields a value or `None`. `None` means the
//! caller must not emit the sample at all: a missing reading is never
//! reported as zero.

use chrono::NaiveDateTime;

/// Layout of absolute timestamps such as `2025-09-21 01:08:49`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Duration units in the only order RouterOS writes them, with their length in seconds.
const DURATION_UNITS: [(char, u64); 5] = [
    ('w', 7 * 24 * 3600),
    ('d', 24 * 3600),
    ('h', 3600),
    ('m', 60),
    ('s', 1),
];

/// Decode a base-10 unsigned integer.
pub fn decode_unsigned(value: &str) -> Option<u64> {
    // `u64::from_str` alone would accept a leading '+'
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

/// Decode a finite floating point number.
pub fn decode_float(value: &str) -> Option<f64> {
    if value.is_empty() {
        return None;
    }
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Compare a field against a literal, case-sensitively.
///
/// This is a projection, not a decode: anything other than `literal`
/// (including an empty field) is a legitimate `false`.
pub fn decode_flag(value: &str, literal: &str) -> bool {
    value == literal
}

/// Metric value for a boolean reading.
pub fn flag_value(flag: bool) -> f64 {
    if flag { 1.0 } else { 0.0 }
}

/// Decode a RouterOS duration such as `2w4d1h12m27s` into seconds.
///
/// A trailing milliseconds component (`950ms`) is dropped. Input without
/// any component, or that adds up to zero, yields `None`: a zero uptime is
/// indistinguishable from a missing one. Malformed input (unknown or
/// out-of-order units, a number without a unit) also yields `None`.
pub fn decode_duration(value: &str) -> Option<u64> {
    let value = strip_millis(value);

    let mut total: u64 = 0;
    let mut next_unit = 0;
    let mut digits = String::new();

    for c in value.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }

        if digits.is_empty() {
            return None;
        }

        // Units may be omitted but never repeated or reordered
        let offset = DURATION_UNITS[next_unit..]
            .iter()
            .position(|(unit, _)| *unit == c)?;
        let (_, seconds) = DURATION_UNITS[next_unit + offset];
        next_unit += offset + 1;

        let amount: u64 = digits.parse().ok()?;
        total = total.checked_add(amount.checked_mul(seconds)?)?;
        digits.clear();
    }

    if !digits.is_empty() {
        return None;
    }

    (total > 0).then_some(total)
}

/// Remove a trailing `<digits>ms` component, if present.
fn strip_millis(value: &str) -> &str {
    let Some(rest) = value.strip_suffix("ms") else {
        return value;
    };
    let trimmed = rest.trim_end_matches(|c: char| c.is_ascii_digit());
    if trimmed.len() == rest.len() {
        // "ms" without digits is not a milliseconds component
        return value;
    }
    trimmed
}

/// Decode an absolute `YYYY-MM-DD HH:MM:SS` timestamp (UTC) into epoch seconds.
///
/// Times at or before the epoch are treated as absent.
pub fn decode_timestamp(value: &str) -> Option<i64> {
    if value.is_empty() {
        return None;
    }
    let parsed = NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).ok()?;
    let epoch = parsed.and_utc().timestamp();
    (epoch > 0).then_some(epoch)
}

/// Decode a `first,second` pair of unsigned integers.
///
/// Both halves decode or neither does.
pub fn decode_pair(value: &str) -> Option<(u64, u64)> {
    let mut parts = value.split(',');
    let first = decode_unsigned(parts.next()?.trim())?;
    let second = decode_unsigned(parts.next()?.trim())?;
    if parts.next().is_some() {
        return None;
    }
    Some((first, second))
}

/// Return the first non-empty of two variants of the same attribute.
///
/// RouterOS reports both a configured and an active value for some lease
/// fields. `None` means the record is incomplete for this label.
pub fn select_fallback<'a>(primary: &'a str, secondary: &'a str) -> Option<&'a str> {
    [primary, secondary].into_iter().find(|v| !v.is_empty())
}
