//! Validity-window detection from flyer front matter.
//!
//! Scans the first pages for the first matching date form:
//!
//! 1. `D/M – D/M` or `D.M – D.M`: both dates in the reference year; an
//!    end before the start rolls the end into the next year.
//! 2. `gælder fra <weekday> (den) D. <month> til og med <weekday> (den)
//!    D. <month> [YYYY]`: explicit year when present.
//! 3. `uge NN`: Monday through Sunday of ISO week NN (ISO-8601: week 1 is
//!    the week containing January 4th).
//!
//! The reference date is injected rather than read from the wall clock so
//! identical inputs always produce identical windows.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use lazy_static::lazy_static;
use regex::Regex;

/// How many leading pages participate in validity detection.
pub const VALIDITY_DETECTION_PAGES: usize = 5;

lazy_static! {
    static ref RE_DATE_RANGE: Regex =
        Regex::new(r"(\d{1,2})[./](\d{1,2})\s*[-–]\s*(\d{1,2})[./](\d{1,2})").unwrap();
    static ref RE_VALID_FROM: Regex = Regex::new(
        r"gælder\s+fra\s+\w+\s+(?:den\s+)?(\d{1,2})\.\s*(\w+)\s+til\s+og\s+med\s+\w+\s+(?:den\s+)?(\d{1,2})\.\s*(\w+)\s*(\d{4})?"
    )
    .unwrap();
    static ref RE_WEEK: Regex = Regex::new(r"uge\s*(\d{1,2})").unwrap();
}

/// A detected validity window, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityWindow {
    /// First day of validity
    pub from: NaiveDate,
    /// Last day of validity
    pub to: NaiveDate,
}

fn month_number(token: &str) -> Option<u32> {
    let token = token.to_lowercase();
    let full = match token.as_str() {
        "januar" => 1,
        "februar" => 2,
        "marts" => 3,
        "april" => 4,
        "maj" => 5,
        "juni" => 6,
        "juli" => 7,
        "august" => 8,
        "september" => 9,
        "oktober" => 10,
        "november" => 11,
        "december" => 12,
        _ => 0,
    };
    if full != 0 {
        return Some(full);
    }
    // Three-letter abbreviations ("dec.", "jan").
    match token.get(..3)? {
        "jan" => Some(1),
        "feb" => Some(2),
        "mar" => Some(3),
        "apr" => Some(4),
        "maj" => Some(5),
        "jun" => Some(6),
        "jul" => Some(7),
        "aug" => Some(8),
        "sep" => Some(9),
        "okt" => Some(10),
        "nov" => Some(11),
        "dec" => Some(12),
        _ => None,
    }
}

/// Detect the validity window from lowercased front-matter text.
///
/// Returns the window and a confidence; `(None, 0.0)` when no form matches.
pub fn detect_validity(text: &str, reference: NaiveDate) -> (Option<ValidityWindow>, f64) {
    let text = text.to_lowercase();
    let year = reference.year();

    if let Some(caps) = RE_DATE_RANGE.captures(&text) {
        let parse = |i: usize| caps[i].parse::<u32>().ok();
        if let (Some(d1), Some(m1), Some(d2), Some(m2)) = (parse(1), parse(2), parse(3), parse(4))
        {
            let from = NaiveDate::from_ymd_opt(year, m1, d1);
            let to = NaiveDate::from_ymd_opt(year, m2, d2);
            if let (Some(from), Some(mut to)) = (from, to) {
                if to < from {
                    match NaiveDate::from_ymd_opt(year + 1, m2, d2) {
                        Some(rolled) => to = rolled,
                        None => return (None, 0.0),
                    }
                }
                return (Some(ValidityWindow { from, to }), 0.90);
            }
        }
    }

    if let Some(caps) = RE_VALID_FROM.captures(&text) {
        let d1 = caps[1].parse::<u32>().ok();
        let m1 = month_number(&caps[2]);
        let d2 = caps[3].parse::<u32>().ok();
        let m2 = month_number(&caps[4]);
        let explicit_year = caps
            .get(5)
            .and_then(|m| m.as_str().parse::<i32>().ok())
            .unwrap_or(year);
        if let (Some(d1), Some(m1), Some(d2), Some(m2)) = (d1, m1, d2, m2) {
            let from = NaiveDate::from_ymd_opt(explicit_year, m1, d1);
            let to = NaiveDate::from_ymd_opt(explicit_year, m2, d2);
            if let (Some(from), Some(to)) = (from, to) {
                return (Some(ValidityWindow { from, to }), 0.85);
            }
        }
    }

    if let Some(caps) = RE_WEEK.captures(&text) {
        if let Ok(week) = caps[1].parse::<u32>() {
            if let Some(from) = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon) {
                let to = from + Days::new(6);
                return (Some(ValidityWindow { from, to }), 0.85);
            }
        }
    }

    (None, 0.0)
}
