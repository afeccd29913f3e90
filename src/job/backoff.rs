//! Exponential backoff policy for failed jobs.

/// Delay before retry attempt number `attempts` (1-based: the count after
/// the just-failed attempt), in seconds.
///
/// Pure exponential growth, `base ^ attempts`. There is deliberately no cap
/// and no jitter; with the default base of 2.0 the delays run 2, 4, 8, ...
pub fn delay_seconds(attempts: u32, base: f64) -> f64 {
    base.powi(attempts as i32)
}
