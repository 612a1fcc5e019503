// src/models/naming.rs

use chrono::{DateTime, NaiveDate, Utc};

use crate::config::FeedWindow;

/// Prefix shared by every threat intel set this handler manages
pub const SET_NAME_PREFIX: &str = "TF-";

const SET_DATE_FORMAT: &str = "%Y%m%d";
const ARCHIVE_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Day-granular set name, e.g. `TF-20240101`
pub fn set_name(now: DateTime<Utc>) -> String {
    format!("{}{}", SET_NAME_PREFIX, now.format(SET_DATE_FORMAT))
}

/// Date encoded in a managed set name. `None` for sets we do not own or
/// whose suffix is not a valid date.
pub fn parse_set_date(name: &str) -> Option<NaiveDate> {
    if !name.starts_with(SET_NAME_PREFIX) {
        return None;
    }
    let suffix = name.rsplit('-').next()?;
    NaiveDate::parse_from_str(suffix, SET_DATE_FORMAT).ok()
}

/// Object key for an archived feed: `<prefix>/<YYYYMMDD-HHMMSS>_<N>_days.csv`
pub fn archive_key(prefix: &str, now: DateTime<Utc>, window: FeedWindow) -> String {
    format!(
        "{}/{}_{}_days.csv",
        prefix.trim_end_matches('/'),
        now.format(ARCHIVE_TIMESTAMP_FORMAT),
        window.days()
    )
}

/// Path-style public location of an archived object
pub fn public_location(bucket: &str, key: &str) -> String {
    format!("https://s3.amazonaws.com/{}/{}", bucket, key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 15, 6, 5, 4).unwrap()
    }

    #[test]
    fn set_name_is_day_granular() {
        assert_eq!(set_name(instant()), "TF-20240215");
        let later = Utc.with_ymd_and_hms(2024, 2, 15, 23, 59, 59).unwrap();
        assert_eq!(set_name(later), set_name(instant()));
    }

    #[test]
    fn parses_only_managed_names() {
        assert_eq!(parse_set_date("TF-20240101"), NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(parse_set_date("TF-legacy-20231231"), NaiveDate::from_ymd_opt(2023, 12, 31));
        assert_eq!(parse_set_date("other-20240101"), None);
        assert_eq!(parse_set_date("TF-notadate"), None);
        assert_eq!(parse_set_date("TF-20241345"), None);
    }

    #[test]
    fn archive_key_embeds_timestamp_and_window() {
        for days in [1, 7, 90] {
            let key = archive_key("iSIGHT", instant(), FeedWindow::new(days).unwrap());
            assert_eq!(key, format!("iSIGHT/20240215-060504_{}_days.csv", days));
        }
        let key = archive_key("feeds/", instant(), FeedWindow::new(3).unwrap());
        assert_eq!(key, "feeds/20240215-060504_3_days.csv");
    }

    #[test]
    fn location_is_path_style() {
        assert_eq!(
            public_location("bucket", "iSIGHT/x.csv"),
            "https://s3.amazonaws.com/bucket/iSIGHT/x.csv"
        );
    }
}
