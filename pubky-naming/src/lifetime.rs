//! Validity window of a published name record.

/// Lifetime applied when the caller doesn't provide one.
pub const DEFAULT_LIFETIME: &str = "24h";

/// The lifetime string could not be parsed as a duration.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("invalid lifetime '{input}': {source}")]
pub struct LifetimeError {
    input: String,
    #[source]
    source: humantime::DurationError,
}

impl LifetimeError {
    /// The rejected input.
    pub fn input(&self) -> &str {
        &self.input
    }
}

/// Parse a human readable duration (`"24h"`, `"1h 30m"`, `"0"`) into seconds.
/// A blank input means [`DEFAULT_LIFETIME`].
///
/// The result is rounded to microseconds. A duration of zero is returned as-is
/// and is a valid, immediately stale, lifetime.
pub fn parse_lifetime(input: &str) -> Result<f64, LifetimeError> {
    let trimmed = match input.trim() {
        "" => DEFAULT_LIFETIME,
        trimmed => trimmed,
    };
    let duration = humantime::parse_duration(trimmed).map_err(|source| LifetimeError {
        input: input.to_string(),
        source,
    })?;
    Ok(round_to_micros(duration.as_secs_f64()))
}

fn round_to_micros(seconds: f64) -> f64 {
    let rounded = (seconds * 1_000_000.0).round() / 1_000_000.0;
    rounded.max(0.0)
}
