use chrono::{DateTime, Local, TimeZone, Utc};

/// Long form used in claim details
pub const TFMT: &str = "%Y-%m-%d_%H:%M:%S%z %A";
/// Short form used in one-line summaries
pub const TFMT_SHORT: &str = "%Y-%m-%d_%H:%M:%S%z";
/// Prefix for dated output files
pub const TFMT_FILE: &str = "%Y%m%d_%H%M";

pub fn current_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// Format a unix timestamp in UTC
pub fn format_utc(ts: i64, fmt: &str) -> String {
    match Utc.timestamp_opt(ts, 0).single() {
        Some(dt) => dt.format(fmt).to_string(),
        None => "_".repeat(14),
    }
}

/// Format a unix timestamp in the local time zone
pub fn format_local(ts: i64, fmt: &str) -> String {
    match Local.timestamp_opt(ts, 0).single() {
        Some(dt) => dt.format(fmt).to_string(),
        None => "_".repeat(14),
    }
}

/// Local wall clock, for start/end stamps of long operations
pub fn now_stamp() -> String {
    Local::now().format(TFMT).to_string()
}

pub fn file_date_prefix(now: DateTime<Utc>) -> String {
    format!("{}_", now.format(TFMT_FILE))
}

/// Split seconds into hours, minutes and seconds
pub fn hms(total_seconds: u64) -> (u64, u64, u64) {
    (
        total_seconds / 3600,
        (total_seconds % 3600) / 60,
        total_seconds % 60,
    )
}

/// "H h M min S s, or D days"
pub fn duration_text(total_seconds: u64) -> String {
    let (hr, mi, sec) = hms(total_seconds);
    let days = total_seconds as f64 / 3600.0 / 24.0;
    format!("{hr} h {mi} min {sec} s, or {days:.4} days")
}

pub fn elapsed_days(start: i64, end: i64) -> f64 {
    (end - start) as f64 / 86400.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_timestamp() {
        let ts = current_timestamp();
        // Should be a reasonable timestamp (after 2020-01-01)
        assert!(ts > 1577836800);
        // Should be before 2100-01-01
        assert!(ts < 4102444800);
    }

    #[test]
    fn test_format_utc() {
        assert_eq!(format_utc(0, TFMT_SHORT), "1970-01-01_00:00:00+0000");
        assert_eq!(format_utc(86400, TFMT), "1970-01-02_00:00:00+0000 Friday");
    }

    #[test]
    fn test_file_date_prefix() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 7, 9, 0).unwrap();
        assert_eq!(file_date_prefix(now), "20240305_0709_");
    }

    #[test]
    fn test_hms() {
        assert_eq!(hms(0), (0, 0, 0));
        assert_eq!(hms(3725), (1, 2, 5));
        assert_eq!(hms(59), (0, 0, 59));
    }

    #[test]
    fn test_duration_text() {
        assert_eq!(duration_text(90000), "25 h 0 min 0 s, or 1.0417 days");
    }

    #[test]
    fn test_elapsed_days() {
        assert_eq!(elapsed_days(0, 86400 * 3), 3.0);
        assert_eq!(elapsed_days(100, 100), 0.0);
    }
}
