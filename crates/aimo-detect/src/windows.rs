//! UTC window/day flooring (`spec.md` §3: "5-minute windows are floored to
//! `UTC minute - (minute mod 5)`").

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};

/// Floor a timestamp to the start of its UTC day.
#[must_use]
pub fn floor_to_day(ts: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(ts.year(), ts.month(), ts.day(), 0, 0, 0).unwrap()
}

/// Floor a timestamp to the start of its 5-minute UTC window.
#[must_use]
pub fn floor_to_5min(ts: DateTime<Utc>) -> DateTime<Utc> {
    let floored_minute = ts.minute() - (ts.minute() % 5);
    Utc.with_ymd_and_hms(ts.year(), ts.month(), ts.day(), ts.hour(), floored_minute, 0)
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floors_to_5_minute_boundary() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 15, 10, 23, 45).unwrap();
        assert_eq!(floor_to_5min(ts), Utc.with_ymd_and_hms(2024, 1, 15, 10, 20, 0).unwrap());
    }

    #[test]
    fn floors_to_day_boundary() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 15, 23, 59, 59).unwrap();
        assert_eq!(floor_to_day(ts), Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap());
    }

    #[test]
    fn window_is_stable_within_same_5_minutes() {
        let a = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 1, 15, 10, 4, 59).unwrap();
        assert_eq!(floor_to_5min(a), floor_to_5min(b));
    }
}
