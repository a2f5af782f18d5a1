//! Tolerant parsing of transaction-date cells into calendar dates.
//!
//! Raw cells arrive in many shapes (`2020-03-04`, `2020.3.4`, `20200304`,
//! `2020-03-04 0:00`, `Mar 4, 2020`, `2020년 3월 4일`) and often carry
//! encoding debris such as non-breaking spaces or BOM remnants. Everything
//! that cannot be read as a date becomes `None`; nothing here returns an error.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

/// Display format for canonical dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Literal cell values that mean "no value" regardless of case.
const MISSING_TOKENS: &[&str] = &["nan", "none", "nat"];

/// Space-like code points removed outright (NBSP, narrow NBSP, ideographic space).
const ODD_SPACES: &[char] = &['\u{00A0}', '\u{202F}', '\u{3000}'];

/// Exact year-first layouts tried before the token scanner.
const FAST_FORMATS: &[&str] = &["%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d"];

/// Two-digit years below this value are placed in the 2000s, the rest in the 1900s.
const TWO_DIGIT_YEAR_PIVOT: u32 = 70;

const MONTH_NAMES: &[&str] = &[
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

// ── DateNormalizer ────────────────────────────────────────────────────────────

/// Stateless parser turning raw date cells into [`NaiveDate`] values.
pub struct DateNormalizer;

impl DateNormalizer {
    /// Parse `raw` into a calendar date.
    ///
    /// Ambiguous all-numeric inputs are read year first, and trailing
    /// time-of-day fragments are ignored. Returns `None` for anything that
    /// does not yield a valid date.
    pub fn normalize(raw: &str) -> Option<NaiveDate> {
        let cleaned = Self::clean(raw);
        if cleaned.is_empty() || is_missing_token(&cleaned) {
            return None;
        }

        if starts_with_four_digit_year(&cleaned) {
            for fmt in FAST_FORMATS {
                if let Ok(date) = NaiveDate::parse_from_str(&cleaned, fmt) {
                    return Some(date);
                }
            }
        }

        parse_fuzzy(&cleaned)
    }

    /// [`normalize`](Self::normalize) followed by `YYYY-MM-DD` formatting.
    pub fn normalize_to_string(raw: &str) -> Option<String> {
        Self::normalize(raw).map(format_date)
    }

    /// Strip surrounding whitespace and encoding noise from a raw cell.
    ///
    /// Odd space code points are deleted; any other non-ASCII character or
    /// ASCII control character becomes a plain space so that neighbouring
    /// digit groups (`2020년3월`) stay separate.
    pub fn clean(raw: &str) -> String {
        let replaced: String = raw
            .chars()
            .filter(|c| !ODD_SPACES.contains(c))
            .map(|c| {
                if !c.is_ascii() || c.is_ascii_control() {
                    ' '
                } else {
                    c
                }
            })
            .collect();
        replaced.trim().to_string()
    }
}

/// Format a date as `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

// ── Token scanner ─────────────────────────────────────────────────────────────

/// A run of ASCII digits found in the cleaned cell.
#[derive(Debug, Clone, Copy)]
struct NumberToken {
    value: u32,
    digits: usize,
}

impl NumberToken {
    fn parse(text: &str) -> Option<Self> {
        // Runs longer than a compact YYYYMMDD are never date components.
        if text.len() > 8 {
            return None;
        }
        Some(Self {
            value: text.parse().ok()?,
            digits: text.len(),
        })
    }

    /// A token can only be a year when it has more than two digits or
    /// exceeds the largest day number.
    fn is_year(&self) -> bool {
        self.digits > 2 || self.value > 31
    }

    fn year(&self) -> i32 {
        if self.digits <= 2 {
            expand_two_digit_year(self.value)
        } else {
            self.value as i32
        }
    }
}

fn digit_t_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d)[Tt](\d)").expect("regex is valid"))
}

fn time_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\d{1,2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:\s*[AaPp]\.?[Mm]\.?)?")
            .expect("regex is valid")
    })
}

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+|[A-Za-z]+").expect("regex is valid"))
}

/// Scan the cleaned cell for digit groups and a month name, ignoring every
/// other fragment.
fn parse_fuzzy(cleaned: &str) -> Option<NaiveDate> {
    let spaced = digit_t_regex().replace_all(cleaned, "$1 $2");
    let without_time = time_regex().replace_all(&spaced, " ");

    let mut numbers: Vec<NumberToken> = Vec::new();
    let mut month_name: Option<u32> = None;

    for token in token_regex().find_iter(&without_time) {
        let text = token.as_str();
        if text.as_bytes()[0].is_ascii_digit() {
            if let Some(number) = NumberToken::parse(text) {
                numbers.push(number);
            }
        } else if month_name.is_none() {
            month_name = month_from_name(text);
        }
    }

    match month_name {
        Some(month) => resolve_with_month_name(month, &numbers),
        None => resolve_numeric(&numbers),
    }
}

fn resolve_numeric(numbers: &[NumberToken]) -> Option<NaiveDate> {
    match numbers {
        [] => None,
        [single] => resolve_compact(*single),
        [a, b] => {
            if a.is_year() {
                ymd(a.year(), b.value, 1)
            } else if b.is_year() {
                ymd(b.year(), a.value, 1)
            } else {
                None
            }
        }
        [a, b, c, ..] => {
            if a.is_year() {
                // Year first; a month slot above 12 means the layout was Y-D-M.
                if b.value > 12 && c.value <= 12 {
                    ymd(a.year(), c.value, b.value)
                } else {
                    ymd(a.year(), b.value, c.value)
                }
            } else if c.is_year() {
                // Year last; month first unless the leading value cannot be a month.
                if a.value > 12 {
                    ymd(c.year(), b.value, a.value)
                } else {
                    ymd(c.year(), a.value, b.value)
                }
            } else if b.is_year() {
                None
            } else {
                ymd(expand_two_digit_year(a.value), b.value, c.value)
            }
        }
    }
}

/// `YYYYMMDD` or `YYMMDD` written without separators.
fn resolve_compact(token: NumberToken) -> Option<NaiveDate> {
    let v = token.value;
    match token.digits {
        8 => ymd((v / 10_000) as i32, (v / 100) % 100, v % 100),
        6 => ymd(expand_two_digit_year(v / 10_000), (v / 100) % 100, v % 100),
        _ => None,
    }
}

fn resolve_with_month_name(month: u32, numbers: &[NumberToken]) -> Option<NaiveDate> {
    match numbers {
        [] => None,
        [a] if a.is_year() => ymd(a.year(), month, 1),
        [_] => None,
        [a, b, ..] => {
            if a.is_year() {
                ymd(a.year(), month, b.value)
            } else if b.is_year() {
                ymd(b.year(), month, a.value)
            } else {
                ymd(expand_two_digit_year(a.value), month, b.value)
            }
        }
    }
}

fn month_from_name(word: &str) -> Option<u32> {
    if word.len() < 3 {
        return None;
    }
    let lower = word.to_ascii_lowercase();
    MONTH_NAMES
        .iter()
        .position(|name| lower.starts_with(name))
        .map(|idx| idx as u32 + 1)
}

fn ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

fn expand_two_digit_year(yy: u32) -> i32 {
    if yy < TWO_DIGIT_YEAR_PIVOT {
        2000 + yy as i32
    } else {
        1900 + yy as i32
    }
}

fn is_missing_token(cleaned: &str) -> bool {
    let lower = cleaned.to_ascii_lowercase();
    MISSING_TOKENS.contains(&lower.as_str())
}

fn starts_with_four_digit_year(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 5 && bytes[..4].iter().all(u8::is_ascii_digit) && !bytes[4].is_ascii_digit()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ── separators ────────────────────────────────────────────────────────────

    #[test]
    fn test_common_separators_agree() {
        let expected = Some(date(2020, 3, 4));
        for raw in ["2020-03-04", "2020.03.04", "2020/03/04", "2020-3-4", "2020. 3. 4."] {
            assert_eq!(DateNormalizer::normalize(raw), expected, "input {raw:?}");
        }
    }

    #[test]
    fn test_year_first_for_ambiguous_input() {
        // Never April 3rd.
        assert_eq!(DateNormalizer::normalize("2020-03-04"), Some(date(2020, 3, 4)));
        assert_eq!(DateNormalizer::normalize("20-03-04"), Some(date(2020, 3, 4)));
    }

    #[test]
    fn test_compact_digits() {
        assert_eq!(DateNormalizer::normalize("20200304"), Some(date(2020, 3, 4)));
        assert_eq!(DateNormalizer::normalize("200304"), Some(date(2020, 3, 4)));
    }

    // ── noise ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_whitespace_and_odd_spaces() {
        let expected = Some(date(2020, 3, 4));
        assert_eq!(DateNormalizer::normalize("  2020-03-04\t"), expected);
        assert_eq!(DateNormalizer::normalize("\u{00A0}2020-03-04\u{3000}"), expected);
        assert_eq!(DateNormalizer::normalize("2020-03-\u{202F}04"), expected);
        assert_eq!(DateNormalizer::normalize("\u{FEFF}2020-03-04"), expected);
    }

    #[test]
    fn test_time_suffix_ignored() {
        let expected = Some(date(2020, 3, 4));
        assert_eq!(DateNormalizer::normalize("2020-03-04 0:00"), expected);
        assert_eq!(DateNormalizer::normalize("2020-03-04 00:00:00"), expected);
        assert_eq!(DateNormalizer::normalize("2020-03-04T13:45:10.250"), expected);
        assert_eq!(DateNormalizer::normalize("2020/03/04 11:30 PM"), expected);
        assert_eq!(DateNormalizer::normalize("2020-03-04T09:00:00+09:00"), expected);
    }

    #[test]
    fn test_korean_markers() {
        assert_eq!(
            DateNormalizer::normalize("2020년 3월 4일"),
            Some(date(2020, 3, 4))
        );
        assert_eq!(
            DateNormalizer::normalize("2020년3월4일 0:00"),
            Some(date(2020, 3, 4))
        );
    }

    #[test]
    fn test_month_names() {
        assert_eq!(DateNormalizer::normalize("Mar 4, 2020"), Some(date(2020, 3, 4)));
        assert_eq!(DateNormalizer::normalize("4 March 2020"), Some(date(2020, 3, 4)));
        assert_eq!(DateNormalizer::normalize("2020 Dec 25"), Some(date(2020, 12, 25)));
    }

    #[test]
    fn test_year_last_layouts() {
        assert_eq!(DateNormalizer::normalize("03/04/2020"), Some(date(2020, 3, 4)));
        assert_eq!(DateNormalizer::normalize("25/12/2020"), Some(date(2020, 12, 25)));
    }

    #[test]
    fn test_year_month_defaults_to_first_day() {
        assert_eq!(DateNormalizer::normalize("2020-07"), Some(date(2020, 7, 1)));
    }

    // ── missing ───────────────────────────────────────────────────────────────

    #[test]
    fn test_garbage_is_missing() {
        for raw in ["abc", "", "   ", "NaT", "nan", "None", "NONE", "2020-13-45", "--", "12:30"] {
            assert_eq!(DateNormalizer::normalize(raw), None, "input {raw:?}");
        }
    }

    #[test]
    fn test_invalid_calendar_day_is_missing() {
        assert_eq!(DateNormalizer::normalize("2021-02-29"), None);
        assert_eq!(DateNormalizer::normalize("2020-02-29"), Some(date(2020, 2, 29)));
    }

    // ── formatting ────────────────────────────────────────────────────────────

    #[test]
    fn test_normalize_to_string_is_idempotent() {
        let once = DateNormalizer::normalize_to_string(" 2020.3.4 0:00 ").unwrap();
        assert_eq!(once, "2020-03-04");
        let twice = DateNormalizer::normalize_to_string(&once).unwrap();
        assert_eq!(twice, once);
    }

    #[test]
    fn test_clean_strips_noise() {
        assert_eq!(DateNormalizer::clean("\u{00A0} 2020-01-01 \u{3000}"), "2020-01-01");
        assert_eq!(DateNormalizer::clean("2020년"), "2020");
    }
}
