use thiserror::Error;

/// Error produced when a rate string cannot be understood.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum RateParseError {
    /// The input was empty or entirely whitespace.
    #[error("rate must not be empty")]
    Empty,
    /// The input was not a number with an optional k/m/g suffix.
    #[error("invalid rate '{0}'")]
    Invalid(String),
    /// The scaled value does not fit in 64 bits.
    #[error("rate '{0}' is too large")]
    Overflow(String),
}

/// Parses a bytes-per-second rate such as `65536`, `512k`, `8M`, or `1g`.
///
/// Suffixes are binary multipliers and case-insensitive. `0` means
/// unlimited, matching the worker pool's convention.
///
/// # Errors
///
/// Returns [`RateParseError`] for empty, malformed, or overflowing input.
pub fn parse_rate(input: &str) -> Result<u64, RateParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(RateParseError::Empty);
    }

    let (digits, multiplier) = match trimmed.char_indices().last() {
        Some((idx, suffix)) if suffix.is_ascii_alphabetic() => {
            let multiplier = match suffix.to_ascii_lowercase() {
                'k' => 1u64 << 10,
                'm' => 1u64 << 20,
                'g' => 1u64 << 30,
                _ => return Err(RateParseError::Invalid(input.to_owned())),
            };
            (&trimmed[..idx], multiplier)
        }
        _ => (trimmed, 1),
    };

    let value: u64 = digits
        .parse()
        .map_err(|_| RateParseError::Invalid(input.to_owned()))?;
    value
        .checked_mul(multiplier)
        .ok_or_else(|| RateParseError::Overflow(input.to_owned()))
}
