//! Small numeric helpers shared by the analyzers.
//!
//! Everything here is pure and total: empty inputs produce zeros or `None`,
//! never panics, so the analyzers can lean on these without re-checking.

// ── Basic aggregates ──────────────────────────────────────────────────────────

/// Arithmetic mean. Returns 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median of an unsorted slice. Returns 0.0 for an empty slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Compute the `p`-th percentile of a **sorted** slice using linear
/// interpolation. Returns 0.0 for an empty slice.
pub fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }
    let len = sorted_data.len();
    if len == 1 {
        return sorted_data[0];
    }
    let rank = (p / 100.0) * (len as f64 - 1.0);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted_data[lo];
    }
    let frac = rank - lo as f64;
    sorted_data[lo] + frac * (sorted_data[hi] - sorted_data[lo])
}

/// Most frequent value; ties break toward the smallest value so results are
/// deterministic regardless of input order. Returns `None` for an empty
/// slice.
pub fn mode_min(values: &[u32]) -> Option<u32> {
    if values.is_empty() {
        return None;
    }
    let mut counts: std::collections::BTreeMap<u32, usize> = std::collections::BTreeMap::new();
    for &v in values {
        *counts.entry(v).or_insert(0) += 1;
    }
    // BTreeMap iterates keys ascending, so the first max-count key is the
    // smallest among the tied values.
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(value, _)| value)
}

// ── Windowing ─────────────────────────────────────────────────────────────────

/// Find the contiguous window of `width` values with the maximum sum.
///
/// Returns `(start_index, window_sum)`; ties break toward the earliest
/// start. `None` when the slice is shorter than `width` or `width` is 0.
pub fn max_window_sum(values: &[f64], width: usize) -> Option<(usize, f64)> {
    if width == 0 || values.len() < width {
        return None;
    }
    let mut sum: f64 = values[..width].iter().sum();
    let mut best = (0usize, sum);
    for start in 1..=(values.len() - width) {
        sum += values[start + width - 1] - values[start - 1];
        if sum > best.1 {
            best = (start, sum);
        }
    }
    Some(best)
}

// ── Rounding ──────────────────────────────────────────────────────────────────

/// Round to 1 decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Round to 2 decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ── Tests ─────────────────────────────────────────────────────────────────────
