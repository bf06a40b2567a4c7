//! ISO-8601 duration strings (`PT5S`, `P1DT12H`, `PT0.5S`).
//!
//! Calendar units are approximated: a year is 365 days, a month 30 days.
//! Signed durations are not accepted.

use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    let number = r"(\d+(?:[.,]\d+)?)";
    Regex::new(&format!(
        r"^P(?:{number}Y)?(?:{number}M)?(?:{number}W)?(?:{number}D)?(?:T(?:{number}H)?(?:{number}M)?(?:{number}S)?)?$"
    ))
    .unwrap()
});

const SECONDS_PER_UNIT: [f64; 7] = [
    365.0 * 86_400.0,
    30.0 * 86_400.0,
    7.0 * 86_400.0,
    86_400.0,
    3_600.0,
    60.0,
    1.0,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DurationError {
    /// Input does not follow the `PnYnMnWnDTnHnMnS` grammar.
    Malformed(String),
    /// Input is well-formed but does not fit in a `Duration`.
    OutOfRange(String),
}

impl fmt::Display for DurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DurationError::Malformed(raw) => write!(f, "malformed ISO-8601 duration '{raw}'"),
            DurationError::OutOfRange(raw) => write!(f, "duration '{raw}' out of range"),
        }
    }
}

impl std::error::Error for DurationError {}

/// Parse an ISO-8601 duration.
///
/// At least one component is required, and a `T` must be followed by at least
/// one time component.
pub fn parse_duration(raw: &str) -> Result<Duration, DurationError> {
    let malformed = || DurationError::Malformed(raw.to_string());

    let captures = DURATION_RE.captures(raw).ok_or_else(malformed)?;
    if raw.ends_with('T') {
        return Err(malformed());
    }

    let mut seen = false;
    let mut total = 0.0_f64;
    for (unit, seconds) in SECONDS_PER_UNIT.iter().enumerate() {
        let Some(component) = captures.get(unit + 1) else {
            continue;
        };
        seen = true;
        let amount: f64 = component
            .as_str()
            .replace(',', ".")
            .parse()
            .map_err(|_| malformed())?;
        total += amount * seconds;
    }
    if !seen {
        return Err(malformed());
    }

    Duration::try_from_secs_f64(total).map_err(|_| DurationError::OutOfRange(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_time_components() {
        assert_eq!(parse_duration("PT5S"), Ok(Duration::from_secs(5)));
        assert_eq!(parse_duration("PT1H30M"), Ok(Duration::from_secs(5_400)));
        assert_eq!(parse_duration("PT0.5S"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("PT0,25S"), Ok(Duration::from_millis(250)));
    }

    #[test]
    fn parses_date_components() {
        assert_eq!(parse_duration("P1D"), Ok(Duration::from_secs(86_400)));
        assert_eq!(parse_duration("P1W"), Ok(Duration::from_secs(7 * 86_400)));
        assert_eq!(parse_duration("P1DT1S"), Ok(Duration::from_secs(86_400 + 1)));
        assert_eq!(parse_duration("P0D"), Ok(Duration::ZERO));
    }

    #[test]
    fn rejects_malformed_input() {
        for raw in [
            "invalid time",
            "",
            "P",
            "PT",
            "P1DT",
            "5S",
            "PT5",
            "pt5s",
            "-PT5S",
            "PT5S ",
            "PT1S1M",
        ] {
            assert_eq!(
                parse_duration(raw),
                Err(DurationError::Malformed(raw.to_string())),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_durations_that_overflow() {
        let raw = format!("P{}Y", "9".repeat(30));
        assert_eq!(parse_duration(&raw), Err(DurationError::OutOfRange(raw.clone())));
    }
}
