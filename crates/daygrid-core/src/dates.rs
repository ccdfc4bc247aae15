//! Calendar arithmetic over `NaiveDateTime` values.
//!
//! Every function here is total: arithmetic that would leave chrono's
//! representable range returns the input unchanged instead of failing.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};

/// Granularity used by the arithmetic and comparison helpers.
///
/// `Week` carries the first day of the week so that `start_of`/`end_of`
/// can honour the configured calendar; `add` and `diff` treat any week as
/// seven days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Minute,
    Hour,
    Day,
    Week(Weekday),
    Month,
    Year,
}

impl Unit {
    pub fn week(starts_on: Weekday) -> Self {
        Self::Week(starts_on)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week(_) => "week",
            Self::Month => "month",
            Self::Year => "year",
        };
        f.write_str(name)
    }
}

impl FromStr for Unit {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minute" | "minutes" | "min" => Ok(Self::Minute),
            "hour" | "hours" | "h" => Ok(Self::Hour),
            "day" | "days" | "d" => Ok(Self::Day),
            "week" | "weeks" | "w" => Ok(Self::Week(Weekday::Mon)),
            "month" | "months" | "m" => Ok(Self::Month),
            "year" | "years" | "y" => Ok(Self::Year),
            other => Err(anyhow!("unknown date unit: {other}")),
        }
    }
}

/// Parses a weekday name (`monday`, `mon`, ...). Used for the `week_start`
/// setting.
pub fn parse_weekday(raw: &str) -> Option<Weekday> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" | "tues" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" | "thur" | "thurs" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

pub fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Floors `d` to the boundary of `unit`.
pub fn start_of(d: NaiveDateTime, unit: Unit) -> NaiveDateTime {
    match unit {
        Unit::Minute => d
            .with_second(0)
            .and_then(|v| v.with_nanosecond(0))
            .unwrap_or(d),
        Unit::Hour => d
            .date()
            .and_hms_opt(d.hour(), 0, 0)
            .unwrap_or(d),
        Unit::Day => midnight(d.date()),
        Unit::Week(starts_on) => {
            let day_idx = i64::from(d.weekday().num_days_from_monday());
            let start_idx = i64::from(starts_on.num_days_from_monday());
            let back = (7 + day_idx - start_idx) % 7;
            add(midnight(d.date()), -back, Unit::Day)
        }
        Unit::Month => d
            .date()
            .with_day(1)
            .map(midnight)
            .unwrap_or(d),
        Unit::Year => NaiveDate::from_ymd_opt(d.year(), 1, 1)
            .map(midnight)
            .unwrap_or(d),
    }
}

/// Last representable instant (millisecond precision) inside the unit that
/// contains `d`.
pub fn end_of(d: NaiveDateTime, unit: Unit) -> NaiveDateTime {
    add(start_of(d, unit), 1, unit) - Duration::milliseconds(1)
}

/// Shifts `d` by `n` units. Month and year steps clamp the day of month.
pub fn add(d: NaiveDateTime, n: i64, unit: Unit) -> NaiveDateTime {
    let shifted = match unit {
        Unit::Minute => d.checked_add_signed(Duration::minutes(n)),
        Unit::Hour => d.checked_add_signed(Duration::hours(n)),
        Unit::Day => d.checked_add_signed(Duration::days(n)),
        Unit::Week(_) => d.checked_add_signed(Duration::weeks(n)),
        Unit::Month => shift_months(d, n),
        Unit::Year => n.checked_mul(12).and_then(|months| shift_months(d, months)),
    };
    shifted.unwrap_or(d)
}

fn shift_months(d: NaiveDateTime, months: i64) -> Option<NaiveDateTime> {
    let magnitude = u32::try_from(months.unsigned_abs()).ok()?;
    if months >= 0 {
        d.checked_add_months(Months::new(magnitude))
    } else {
        d.checked_sub_months(Months::new(magnitude))
    }
}

/// Whole units from `a` to `b` (`b - a`), measured after both values are
/// floored to the unit.
pub fn diff(a: NaiveDateTime, b: NaiveDateTime, unit: Unit) -> i64 {
    let a = start_of(a, unit);
    let b = start_of(b, unit);
    match unit {
        Unit::Minute => (b - a).num_minutes(),
        Unit::Hour => (b - a).num_hours(),
        Unit::Day => (b - a).num_days(),
        Unit::Week(_) => (b - a).num_weeks(),
        Unit::Month => month_index(b) - month_index(a),
        Unit::Year => i64::from(b.year()) - i64::from(a.year()),
    }
}

fn month_index(d: NaiveDateTime) -> i64 {
    i64::from(d.year()) * 12 + i64::from(d.month0())
}

/// Rounds up to the next unit boundary unless `d` already sits on one.
pub fn ceil(d: NaiveDateTime, unit: Unit) -> NaiveDateTime {
    let floor = start_of(d, unit);
    if floor == d {
        floor
    } else {
        add(floor, 1, unit)
    }
}

pub fn compare(a: NaiveDateTime, b: NaiveDateTime, unit: Unit) -> Ordering {
    start_of(a, unit).cmp(&start_of(b, unit))
}

pub fn eq(a: NaiveDateTime, b: NaiveDateTime, unit: Unit) -> bool {
    compare(a, b, unit) == Ordering::Equal
}

pub fn lt(a: NaiveDateTime, b: NaiveDateTime, unit: Unit) -> bool {
    compare(a, b, unit) == Ordering::Less
}

pub fn lte(a: NaiveDateTime, b: NaiveDateTime, unit: Unit) -> bool {
    compare(a, b, unit) != Ordering::Greater
}

pub fn gt(a: NaiveDateTime, b: NaiveDateTime, unit: Unit) -> bool {
    compare(a, b, unit) == Ordering::Greater
}

pub fn gte(a: NaiveDateTime, b: NaiveDateTime, unit: Unit) -> bool {
    compare(a, b, unit) != Ordering::Less
}

pub fn min(a: NaiveDateTime, b: NaiveDateTime) -> NaiveDateTime {
    a.min(b)
}

pub fn max(a: NaiveDateTime, b: NaiveDateTime) -> NaiveDateTime {
    a.max(b)
}

/// Inclusive sequence from `start` to `end`, stepping by `step`.
///
/// The value is `Copy`; iterating it again starts over from `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSpan {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub step: Unit,
}

pub fn range(start: NaiveDateTime, end: NaiveDateTime, step: Unit) -> DateSpan {
    DateSpan { start, end, step }
}

impl DateSpan {
    pub fn iter(&self) -> DateSpanIter {
        DateSpanIter {
            next: Some(self.start),
            end: self.end,
            step: self.step,
        }
    }
}

impl IntoIterator for DateSpan {
    type Item = NaiveDateTime;
    type IntoIter = DateSpanIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct DateSpanIter {
    next: Option<NaiveDateTime>,
    end: NaiveDateTime,
    step: Unit,
}

impl Iterator for DateSpanIter {
    type Item = NaiveDateTime;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        if !lte(current, self.end, self.step) {
            self.next = None;
            return None;
        }
        let following = add(current, 1, self.step);
        // `add` saturates at the edge of the representable range.
        self.next = (following > current).then_some(following);
        Some(current)
    }
}

/// First day shown by a month grid: the start of the week holding the 1st.
pub fn first_visible_day(d: NaiveDateTime, week_start: Weekday) -> NaiveDateTime {
    start_of(start_of(d, Unit::Month), Unit::Week(week_start))
}

/// Last day shown by a month grid (floored to midnight).
pub fn last_visible_day(d: NaiveDateTime, week_start: Weekday) -> NaiveDateTime {
    let last_of_month = end_of(d, Unit::Month);
    start_of(end_of(last_of_month, Unit::Week(week_start)), Unit::Day)
}

/// Every day of the month grid around `d`, always a whole number of weeks.
pub fn visible_days(d: NaiveDateTime, week_start: Weekday) -> Vec<NaiveDateTime> {
    range(
        first_visible_day(d, week_start),
        last_visible_day(d, week_start),
        Unit::Day,
    )
    .into_iter()
    .collect()
}
