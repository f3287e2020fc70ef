//! Exponential backoff calculation.
//!
//! Pure functions shared by the delivery worker (in-loop sleep pacing) and
//! the scheduler (deciding whether a retrying task's window has elapsed).

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::model::EmailTask;

/// Delay before the attempt following `attempts` failures:
/// `max(base, base * multiplier^(attempts - 1))`.
///
/// The floor keeps the delay at `base` for the first retry and for any
/// multiplier below one.
pub fn delay(attempts: u32, base: Duration, multiplier: f64) -> Duration {
    if attempts <= 1 {
        return base;
    }
    let base_ms = base.as_millis() as f64;
    let scaled = base_ms * multiplier.powi(attempts as i32 - 1);
    // Saturating f64 → u64 cast caps runaway multipliers instead of wrapping.
    Duration::from_millis(scaled.max(base_ms) as u64)
}

/// Whether a pending task is eligible for a scheduler sweep.
///
/// A task that has never been attempted is always due; otherwise it is due
/// once its backoff window, measured from the last persisted transition, has
/// elapsed.
pub fn is_due(task: &EmailTask, now: DateTime<Utc>, base: Duration, multiplier: f64) -> bool {
    if task.attempts == 0 {
        return true;
    }
    let window = delay(task.attempts, base, multiplier);
    let Ok(window) = chrono::Duration::from_std(window) else {
        return false;
    };
    match task.updated_at.checked_add_signed(window) {
        Some(due_at) => now > due_at,
        None => false,
    }
}
