//! Progress throttling and aggregate size/progress math

use std::time::{Duration, Instant};

use super::record::TransferRecord;

/// Whether a progress event at `at` may be applied, given the last applied
/// update at `last`. Events that are not strictly later than the interval are
/// dropped.
pub(crate) fn should_apply(last: Instant, at: Instant, interval: Duration) -> bool {
    at.saturating_duration_since(last) > interval
}

/// `loaded / total` clamped to [0, 1]; `None` when the total is unknown
pub(crate) fn fraction(loaded: u64, total: u64) -> Option<f64> {
    if total == 0 {
        return None;
    }
    Some((loaded as f64 / total as f64).clamp(0.0, 1.0))
}

pub(crate) fn percent(progress: f64) -> u32 {
    ((progress * 100.0).floor() as u32).min(100)
}

pub(crate) fn speed(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        bytes as f64 / secs
    } else {
        0.0
    }
}

pub(crate) fn overall_size(records: &[TransferRecord]) -> u64 {
    records
        .iter()
        .fold(0u64, |acc, record| acc.saturating_add(record.total_size))
}

/// Size-weighted mean progress. Failed records count as fully progressed.
pub(crate) fn overall_progress(records: &[TransferRecord]) -> f64 {
    let (done, total) = records.iter().fold((0.0f64, 0.0f64), |(done, total), record| {
        let size = record.total_size as f64;
        (done + record.weighted_progress() * size, total + size)
    });
    if total > 0.0 {
        (done / total).clamp(0.0, 1.0)
    } else {
        0.0
    }
}
