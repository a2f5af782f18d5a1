//! Calendar bucket keys derived from a transaction date.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Serialize, Serializer};

use crate::dates::format_date;

/// Separator used when rendering a month key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MonthFormat {
    /// `YYYY.MM`
    #[default]
    Dotted,
    /// `YYYY-MM`
    Dashed,
}

impl MonthFormat {
    fn pattern(self) -> &'static str {
        match self {
            MonthFormat::Dotted => "%Y.%m",
            MonthFormat::Dashed => "%Y-%m",
        }
    }

    pub fn format(self, date: NaiveDate) -> String {
        date.format(self.pattern()).to_string()
    }
}

/// Calendar granularity a record is bucketed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Day,
    Week,
    Month(MonthFormat),
    Year,
}

/// Monday-anchored week bucket.
///
/// Field order doubles as sort order: month label, then ISO week number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WeekKey {
    /// `YYYY.MM` of `week_start`, not of the transaction date.
    pub month_label: String,
    /// ISO week number of the transaction date.
    pub week_number: u32,
    /// Monday of the week.
    pub week_start: NaiveDate,
}

/// A grouping key produced by [`BucketAssigner`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BucketKey {
    /// `YYYY-MM-DD`
    Day(String),
    Week(WeekKey),
    /// `YYYY.MM` or `YYYY-MM`
    Month(String),
    Year(i32),
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketKey::Day(s) | BucketKey::Month(s) => f.write_str(s),
            BucketKey::Year(y) => write!(f, "{y}"),
            BucketKey::Week(w) => write!(
                f,
                "{} W{:02} ({})",
                w.month_label,
                w.week_number,
                format_date(w.week_start)
            ),
        }
    }
}

impl Serialize for BucketKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BucketKey::Year(y) => serializer.serialize_i32(*y),
            other => serializer.collect_str(other),
        }
    }
}

// ── BucketAssigner ────────────────────────────────────────────────────────────

/// Stateless mapping from dates to bucket keys.
pub struct BucketAssigner;

impl BucketAssigner {
    /// Bucket `date` at `granularity`; a missing date yields a missing key.
    pub fn assign(date: Option<NaiveDate>, granularity: Granularity) -> Option<BucketKey> {
        let date = date?;
        Some(match granularity {
            Granularity::Day => BucketKey::Day(format_date(date)),
            Granularity::Week => BucketKey::Week(Self::week_key(date)),
            Granularity::Month(fmt) => BucketKey::Month(fmt.format(date)),
            Granularity::Year => BucketKey::Year(date.year()),
        })
    }

    /// Week composite for `date`: ISO week number, its Monday, and the
    /// `YYYY.MM` label of that Monday.
    pub fn week_key(date: NaiveDate) -> WeekKey {
        let offset = i64::from(date.weekday().num_days_from_monday());
        let week_start = date - Duration::days(offset);
        WeekKey {
            month_label: MonthFormat::Dotted.format(week_start),
            week_number: date.iso_week().week(),
            week_start,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_day_month_year_keys() {
        let d = Some(date(2020, 3, 4));
        assert_eq!(
            BucketAssigner::assign(d, Granularity::Day),
            Some(BucketKey::Day("2020-03-04".into()))
        );
        assert_eq!(
            BucketAssigner::assign(d, Granularity::Month(MonthFormat::Dotted)),
            Some(BucketKey::Month("2020.03".into()))
        );
        assert_eq!(
            BucketAssigner::assign(d, Granularity::Month(MonthFormat::Dashed)),
            Some(BucketKey::Month("2020-03".into()))
        );
        assert_eq!(
            BucketAssigner::assign(d, Granularity::Year),
            Some(BucketKey::Year(2020))
        );
    }

    #[test]
    fn test_missing_date_propagates() {
        for g in [
            Granularity::Day,
            Granularity::Week,
            Granularity::Month(MonthFormat::Dashed),
            Granularity::Year,
        ] {
            assert_eq!(BucketAssigner::assign(None, g), None);
        }
    }

    #[test]
    fn test_week_monday_to_sunday_share_one_key() {
        // 2021-01-04 is a Monday.
        let keys: Vec<WeekKey> = (4..=10)
            .map(|d| BucketAssigner::week_key(date(2021, 1, d)))
            .collect();
        for key in &keys {
            assert_eq!(key, &keys[0]);
        }
        assert_eq!(keys[0].week_start, date(2021, 1, 4));
        assert_eq!(keys[0].month_label, "2021.01");
        assert_eq!(keys[0].week_number, 1);
    }

    #[test]
    fn test_week_label_follows_monday_month() {
        // Fri 2021-01-01 belongs to ISO week 53 whose Monday is 2020-12-28.
        let key = BucketAssigner::week_key(date(2021, 1, 1));
        assert_eq!(key.week_start, date(2020, 12, 28));
        assert_eq!(key.month_label, "2020.12");
        assert_eq!(key.week_number, 53);

        // Sun 2020-03-01 sits in the week that started Mon 2020-02-24.
        let key = BucketAssigner::week_key(date(2020, 3, 1));
        assert_eq!(key.month_label, "2020.02");
        assert_eq!(key.week_number, 9);
    }

    #[test]
    fn test_first_week_of_2021_splits_at_monday() {
        let keys: std::collections::BTreeSet<BucketKey> = (1..=7)
            .filter_map(|d| BucketAssigner::assign(Some(date(2021, 1, d)), Granularity::Week))
            .collect();

        let expected: std::collections::BTreeSet<BucketKey> = [
            BucketKey::Week(WeekKey {
                month_label: "2020.12".to_string(),
                week_number: 53,
                week_start: date(2020, 12, 28),
            }),
            BucketKey::Week(WeekKey {
                month_label: "2021.01".to_string(),
                week_number: 1,
                week_start: date(2021, 1, 4),
            }),
        ]
        .into_iter()
        .collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn test_week_keys_sort_by_label_then_number() {
        let mut keys = vec![
            BucketAssigner::week_key(date(2020, 2, 10)),
            BucketAssigner::week_key(date(2020, 1, 6)),
            BucketAssigner::week_key(date(2020, 2, 3)),
        ];
        keys.sort();
        let starts: Vec<NaiveDate> = keys.iter().map(|k| k.week_start).collect();
        assert_eq!(starts, vec![date(2020, 1, 6), date(2020, 2, 3), date(2020, 2, 10)]);
    }

    #[test]
    fn test_year_keys_sort_numerically() {
        let mut keys = vec![BucketKey::Year(2021), BucketKey::Year(999), BucketKey::Year(2020)];
        keys.sort();
        assert_eq!(
            keys,
            vec![BucketKey::Year(999), BucketKey::Year(2020), BucketKey::Year(2021)]
        );
    }

    #[test]
    fn test_bucket_key_serialization() {
        assert_eq!(serde_json::to_string(&BucketKey::Year(2020)).unwrap(), "2020");
        assert_eq!(
            serde_json::to_string(&BucketKey::Month("2020.01".into())).unwrap(),
            "\"2020.01\""
        );
    }
}
