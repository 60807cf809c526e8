use chrono::{NaiveTime, Timelike};

use crate::error::ApiError;

/// Parse a wire "HH:mm" time. Rejects anything outside 00:00-23:59.
pub fn parse_hhmm(raw: &str) -> Result<NaiveTime, ApiError> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map_err(|_| ApiError::validation(format!("Invalid time '{raw}', expected HH:mm")))
}

fn minute_of_day(t: NaiveTime) -> i64 {
    t.hour() as i64 * 60 + t.minute() as i64
}

/// Minutes the arrival exceeds the assigned shift start beyond the grace
/// window. `None` means on time (or early). Minute-of-day subtraction —
/// shifts are assumed not to cross midnight.
pub fn late_by(assigned: NaiveTime, actual: NaiveTime, grace_minutes: i64) -> Option<i64> {
    let diff = minute_of_day(actual) - minute_of_day(assigned);
    if diff > grace_minutes { Some(diff) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn within_grace_is_on_time() {
        assert_eq!(late_by(t(9, 0), t(9, 4), 5), None);
        assert_eq!(late_by(t(9, 0), t(9, 5), 5), None); // boundary: exactly grace
    }

    #[test]
    fn past_grace_is_late_by_full_diff() {
        assert_eq!(late_by(t(9, 0), t(9, 6), 5), Some(6));
        assert_eq!(late_by(t(9, 0), t(10, 30), 5), Some(90));
    }

    #[test]
    fn early_arrival_is_never_late() {
        assert_eq!(late_by(t(9, 0), t(8, 30), 5), None);
        assert_eq!(late_by(t(9, 0), t(8, 59), 0), None);
    }

    #[test]
    fn grace_is_configurable() {
        assert_eq!(late_by(t(9, 0), t(9, 2), 1), Some(2));
        assert_eq!(late_by(t(9, 0), t(9, 2), 5), None);
    }

    #[test]
    fn parses_wire_times() {
        assert_eq!(parse_hhmm("09:06").unwrap(), t(9, 6));
        assert_eq!(parse_hhmm("23:59").unwrap(), t(23, 59));
        assert!(parse_hhmm("24:00").is_err());
        assert!(parse_hhmm("9am").is_err());
        assert!(parse_hhmm("").is_err());
    }
}
