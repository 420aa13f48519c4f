//! Conversion of `minutes:seconds` time labels to seconds.

/// Convert a `M:S` label to seconds.
///
/// Returns `None` unless the label splits into exactly two numeric parts.
/// Seconds may be fractional.
pub fn normalize_time(label: &str) -> Option<f64> {
    let mut parts = label.split(':');
    let minutes = parts.next()?.trim().parse::<f64>().ok()?;
    let seconds = parts.next()?.trim().parse::<f64>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(minutes * 60.0 + seconds)
}
