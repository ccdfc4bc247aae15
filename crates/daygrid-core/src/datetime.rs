use anyhow::{
  Context,
  anyhow
};
use chrono::{
  Datelike,
  Duration,
  Months,
  NaiveDate,
  NaiveDateTime,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;

use crate::dates::{
  self,
  parse_weekday
};

const EVENT_TIME_FORMATS: [&str; 4] = [
  "%Y-%m-%dT%H:%M:%S",
  "%Y-%m-%dT%H:%M",
  "%Y-%m-%d %H:%M:%S",
  "%Y-%m-%d %H:%M"
];

pub fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::debug!(
        source,
        timezone = %trimmed,
        "resolved timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

#[must_use]
pub fn today_in(
  timezone: Tz
) -> NaiveDate {
  Utc::now()
    .with_timezone(&timezone)
    .date_naive()
}

/// Parses an event timestamp. A bare date means midnight of that day.
pub fn parse_event_time(
  raw: &str
) -> anyhow::Result<NaiveDateTime> {
  let token = raw.trim();

  for fmt in EVENT_TIME_FORMATS {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return Ok(ndt);
    }
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(dates::midnight(date));
  }

  Err(anyhow!(
    "unrecognized event time: {raw}"
  ))
  .context(
    "supported formats: YYYY-MM-DD, \
     YYYY-MM-DDTHH:MM[:SS], \
     YYYY-MM-DD HH:MM[:SS]"
  )
}

#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" | "now" => {
      return Ok(today);
    }
    | "tomorrow" => {
      return Ok(shift_days(today, 1));
    }
    | "yesterday" => {
      return Ok(shift_days(today, -1));
    }
    | _ => {}
  }

  if let Some(target) =
    parse_weekday(&lower)
  {
    return Ok(next_weekday_date(
      today, target
    ));
  }

  if let Some(month) =
    parse_month_name(&lower)
  {
    let mut year = today.year();
    if month <= today.month() {
      year = year.saturating_add(1);
    }
    return NaiveDate::from_ymd_opt(
      year, month, 1
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid month/year \
         candidate"
      )
    });
  }

  let rel_re = Regex::new(
    r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dwmy])$"
  )
  .map_err(|e| {
    anyhow!(
      "internal regex compile \
       failure: {e}"
    )
  })?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let sign = caps
      .name("sign")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative sign")
      })?;
    let num: u32 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let unit = caps
      .name("unit")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative unit")
      })?;
    let backwards = sign == "-";

    let shifted = match unit {
      | "d" | "w" => {
        let days = i64::from(num)
          * if unit == "w" { 7 } else { 1 };
        today.checked_add_signed(
          Duration::days(
            if backwards {
              -days
            } else {
              days
            }
          )
        )
      }
      | "m" | "y" => {
        let months = Months::new(
          num.saturating_mul(
            if unit == "y" {
              12
            } else {
              1
            }
          )
        );
        if backwards {
          today.checked_sub_months(months)
        } else {
          today.checked_add_months(months)
        }
      }
      | _ => {
        return Err(anyhow!(
          "unknown relative unit: \
           {unit}"
        ));
      }
    };

    return shifted.ok_or_else(|| {
      anyhow!(
        "relative date out of range: \
         {input}"
      )
    });
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(date);
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      &format!("{token}-01"),
      "%Y-%m-%d"
    )
  {
    return Ok(date);
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     today/tomorrow/yesterday, \
     weekday names (e.g. monday), \
     month names (e.g. march), \
     +Nd/-Nw/+Nm/+Ny, YYYY-MM-DD, \
     YYYY-MM"
  })
}

fn shift_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  date
    .checked_add_signed(Duration::days(
      days
    ))
    .unwrap_or(date)
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let target_idx = target
    .num_days_from_monday()
    as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  shift_days(from, delta)
}

fn parse_month_name(
  token: &str
) -> Option<u32> {
  match token.trim() {
    | "january" | "jan" => Some(1),
    | "february" | "feb" => Some(2),
    | "march" | "mar" => Some(3),
    | "april" | "apr" => Some(4),
    | "may" => Some(5),
    | "june" | "jun" => Some(6),
    | "july" | "jul" => Some(7),
    | "august" | "aug" => Some(8),
    | "september" | "sep" | "sept" => {
      Some(9)
    }
    | "october" | "oct" => Some(10),
    | "november" | "nov" => Some(11),
    | "december" | "dec" => Some(12),
    | _ => None
  }
}

pub mod event_time_serde {
  use chrono::NaiveDateTime;
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  pub fn serialize<S>(
    dt: &NaiveDateTime,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer.serialize_str(
      &dt
        .format("%Y-%m-%dT%H:%M")
        .to_string()
    )
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<NaiveDateTime, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = String::deserialize(
      deserializer
    )?;
    super::parse_event_time(&raw)
      .map_err(serde::de::Error::custom)
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::{
    parse_date_expr,
    parse_event_time,
    parse_timezone
  };

  fn day(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn parses_relative_keywords() {
    let today = day(2026, 2, 17);
    assert_eq!(
      parse_date_expr("tomorrow", today)
        .expect("tomorrow"),
      day(2026, 2, 18)
    );
    assert_eq!(
      parse_date_expr("-2w", today)
        .expect("two weeks back"),
      day(2026, 2, 3)
    );
    assert_eq!(
      parse_date_expr("+1m", today)
        .expect("next month"),
      day(2026, 3, 17)
    );
  }

  #[test]
  fn parses_weekday_and_month_names() {
    // 2026-02-17 is a Tuesday.
    let today = day(2026, 2, 17);
    assert_eq!(
      parse_date_expr("wednesday", today)
        .expect("weekday"),
      day(2026, 2, 18)
    );
    assert_eq!(
      parse_date_expr("tue", today)
        .expect("same weekday"),
      day(2026, 2, 24)
    );
    assert_eq!(
      parse_date_expr("march", today)
        .expect("month"),
      day(2026, 3, 1)
    );
    assert_eq!(
      parse_date_expr("january", today)
        .expect("month rolls over"),
      day(2027, 1, 1)
    );
  }

  #[test]
  fn parses_absolute_dates() {
    let today = day(2026, 2, 17);
    assert_eq!(
      parse_date_expr(
        "2024-05-15",
        today
      )
      .expect("iso date"),
      day(2024, 5, 15)
    );
    assert_eq!(
      parse_date_expr("2024-05", today)
        .expect("year-month"),
      day(2024, 5, 1)
    );
    assert!(
      parse_date_expr("someday", today)
        .is_err()
    );
  }

  #[test]
  fn parses_event_times() {
    let midnight =
      parse_event_time("2024-05-13")
        .expect("date only");
    assert_eq!(
      midnight.format("%H:%M").to_string(),
      "00:00"
    );
    let timed = parse_event_time(
      "2024-05-13 09:30"
    )
    .expect("space separated");
    assert_eq!(
      timed
        .format("%Y-%m-%dT%H:%M")
        .to_string(),
      "2024-05-13T09:30"
    );
    assert!(
      parse_event_time("13/05/2024")
        .is_err()
    );
  }

  #[test]
  fn rejects_unknown_timezones() {
    assert!(
      parse_timezone("Europe/Paris", "test")
        .is_some()
    );
    assert!(
      parse_timezone("Mars/Olympus", "test")
        .is_none()
    );
  }
}
