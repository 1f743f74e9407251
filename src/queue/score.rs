//! Score assignment for pushed members.
//!
//! Scores are Unix timestamps in fractional seconds, bumped past the
//! current back of the queue when needed so a push always lands after
//! everything already queued, even when the back was scored ahead of the
//! local clock (skew between hosts, or an earlier batch push).

use chrono::Utc;

/// Gap between consecutive members of one batch.
pub const BATCH_SPACING: f64 = 1.0;

/// Current wall-clock time as fractional Unix seconds.
pub fn now_score() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// `count` increasing scores for a push, seeded from the clock.
pub fn score_for(existing_max: Option<f64>, count: usize) -> Vec<f64> {
    scores_from(now_score(), existing_max, count)
}

/// `count` scores spaced by [`BATCH_SPACING`], all at or after `now` and
/// strictly after `existing_max`.
pub fn scores_from(now: f64, existing_max: Option<f64>, count: usize) -> Vec<f64> {
    let base = match existing_max {
        Some(max) if max >= now => max + BATCH_SPACING,
        _ => now,
    };
    (0..count).map(|i| base + i as f64 * BATCH_SPACING).collect()
}
