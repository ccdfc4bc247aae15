use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{
  Datelike,
  NaiveDate,
  NaiveDateTime,
  Weekday
};
use serde::{
  Deserialize,
  Serialize
};

use crate::dates::{
  self,
  Unit
};
use crate::segment::Window;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum View {
  Month,
  InfiniteMonth,
  Week,
  WorkWeek,
  Day,
  Agenda
}

impl View {
  pub fn all() -> [Self; 6] {
    [
      Self::Month,
      Self::InfiniteMonth,
      Self::Week,
      Self::WorkWeek,
      Self::Day,
      Self::Agenda
    ]
  }

  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Month => "month",
      | Self::InfiniteMonth => {
        "infinite_month"
      }
      | Self::Week => "week",
      | Self::WorkWeek => "work_week",
      | Self::Day => "day",
      | Self::Agenda => "agenda"
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      | Self::Month => "Month",
      | Self::InfiniteMonth => {
        "Infinite Month"
      }
      | Self::Week => "Week",
      | Self::WorkWeek => "Work Week",
      | Self::Day => "Day",
      | Self::Agenda => "Agenda"
    }
  }

  pub fn from_key(
    key: &str
  ) -> Option<Self> {
    match key
      .trim()
      .to_ascii_lowercase()
      .replace('-', "_")
      .as_str()
    {
      | "month" => Some(Self::Month),
      | "infinite_month"
      | "infinite" => {
        Some(Self::InfiniteMonth)
      }
      | "week" => Some(Self::Week),
      | "work_week" | "workweek" => {
        Some(Self::WorkWeek)
      }
      | "day" => Some(Self::Day),
      | "agenda" | "list" => {
        Some(Self::Agenda)
      }
      | _ => None
    }
  }

  /// Views drawn as a grid of whole
  /// weeks around a month.
  pub fn is_month_grid(self) -> bool {
    matches!(
      self,
      Self::Month | Self::InfiniteMonth
    )
  }
}

impl fmt::Display for View {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_key())
  }
}

impl FromStr for View {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    Self::from_key(s).ok_or_else(|| {
      let keys = Self::all()
        .iter()
        .map(|view| view.as_key())
        .collect::<Vec<_>>()
        .join(", ");
      anyhow!(
        "unknown view `{s}` (expected \
         one of: {keys})"
      )
    })
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Navigate {
  Previous,
  Next,
  Today,
  Date(NaiveDate)
}

impl FromStr for Navigate {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      | "prev" | "previous" | "back" => {
        Ok(Self::Previous)
      }
      | "next" | "forward" => {
        Ok(Self::Next)
      }
      | "today" => Ok(Self::Today),
      | other => {
        NaiveDate::parse_from_str(
          other, "%Y-%m-%d"
        )
        .map(Self::Date)
        .map_err(|_| {
          anyhow!(
            "unknown navigation step \
             `{s}` (expected prev, \
             next, today or \
             YYYY-MM-DD)"
          )
        })
      }
    }
  }
}

/// Moves the focus date of `view` one
/// step in the requested direction.
pub fn navigate(
  view: View,
  date: NaiveDate,
  action: Navigate,
  today: NaiveDate,
  agenda_length: u32
) -> NaiveDate {
  let step = match action {
    | Navigate::Today => return today,
    | Navigate::Date(target) => {
      return target;
    }
    | Navigate::Previous => -1,
    | Navigate::Next => 1
  };

  let focus = dates::midnight(date);
  let moved = match view {
    | View::Month
    | View::InfiniteMonth => {
      dates::add(focus, step, Unit::Month)
    }
    | View::Week | View::WorkWeek => {
      dates::add(focus, step * 7, Unit::Day)
    }
    | View::Day => {
      dates::add(focus, step, Unit::Day)
    }
    | View::Agenda => dates::add(
      focus,
      step
        * i64::from(
          agenda_length.max(1)
        ),
      Unit::Day
    )
  };
  moved.date()
}

/// Inclusive first and last day shown
/// by a view.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct VisibleRange {
  pub start: NaiveDate,
  pub end:   NaiveDate
}

impl VisibleRange {
  /// One midnight per visible day.
  pub fn days(
    &self
  ) -> Vec<NaiveDateTime> {
    dates::range(
      dates::midnight(self.start),
      dates::midnight(self.end),
      Unit::Day
    )
    .into_iter()
    .collect()
  }

  pub fn contains(
    &self,
    day: NaiveDate
  ) -> bool {
    self.start <= day
      && day <= self.end
  }
}

pub fn visible_range(
  view: View,
  date: NaiveDate,
  week_start: Weekday,
  agenda_length: u32
) -> VisibleRange {
  let focus = dates::midnight(date);

  let (start, end) = match view {
    | View::Month
    | View::InfiniteMonth => {
      (
        dates::first_visible_day(
          focus, week_start
        ),
        dates::last_visible_day(
          focus, week_start
        )
      )
    }
    | View::Week => {
      let start = dates::start_of(
        focus,
        Unit::week(week_start)
      );
      (
        start,
        dates::add(start, 6, Unit::Day)
      )
    }
    | View::WorkWeek => {
      let week = dates::start_of(
        focus,
        Unit::week(week_start)
      );
      let to_monday = (7
        - i64::from(
          week
            .weekday()
            .num_days_from_monday()
        ))
        % 7;
      let monday = dates::add(
        week,
        to_monday,
        Unit::Day
      );
      (
        monday,
        dates::add(
          monday,
          4,
          Unit::Day
        )
      )
    }
    | View::Day => (focus, focus),
    | View::Agenda => {
      let length =
        i64::from(agenda_length.max(1));
      (
        focus,
        dates::add(
          focus,
          length - 1,
          Unit::Day
        )
      )
    }
  };

  VisibleRange {
    start: start.date(),
    end:   end.date()
  }
}

/// The month grid around `date`, one
/// entry of seven days per week.
pub fn month_weeks(
  date: NaiveDate,
  week_start: Weekday
) -> Vec<Vec<NaiveDateTime>> {
  dates::visible_days(
    dates::midnight(date),
    week_start
  )
  .chunks(7)
  .map(<[NaiveDateTime]>::to_vec)
  .collect()
}

/// The row windows a view lays out:
/// one per week for month grids, a
/// single row otherwise.
pub fn row_windows(
  view: View,
  date: NaiveDate,
  week_start: Weekday,
  agenda_length: u32
) -> Vec<Window> {
  if view.is_month_grid() {
    return month_weeks(date, week_start)
      .into_iter()
      .filter_map(Window::from_range)
      .collect();
  }

  Window::from_range(
    visible_range(
      view,
      date,
      week_start,
      agenda_length
    )
    .days()
  )
  .into_iter()
  .collect()
}

/// A week row of an infinitely
/// scrolling month, positioned relative
/// to the week holding the anchor date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekRow {
  pub offset: i64,
  pub days:   Vec<NaiveDateTime>
}

pub fn week_rows(
  anchor: NaiveDate,
  offsets: RangeInclusive<i64>,
  week_start: Weekday
) -> Vec<WeekRow> {
  let anchor_week = dates::start_of(
    dates::midnight(anchor),
    Unit::week(week_start)
  );

  offsets
    .map(|offset| {
      let first = dates::add(
        anchor_week,
        offset * 7,
        Unit::Day
      );
      let last = dates::add(
        first,
        6,
        Unit::Day
      );
      WeekRow {
        offset,
        days: dates::range(
          first,
          last,
          Unit::Day
        )
        .into_iter()
        .collect()
      }
    })
    .collect()
}

pub fn title(
  view: View,
  date: NaiveDate,
  week_start: Weekday,
  agenda_length: u32
) -> String {
  let range = visible_range(
    view,
    date,
    week_start,
    agenda_length
  );

  match view {
    | View::Month
    | View::InfiniteMonth => {
      date.format("%B %Y").to_string()
    }
    | View::Week
    | View::WorkWeek
    | View::Agenda => {
      format!(
        "{} - {}",
        range.start.format("%Y-%m-%d"),
        range.end.format("%Y-%m-%d")
      )
    }
    | View::Day => {
      date
        .format("%A, %Y-%m-%d")
        .to_string()
    }
  }
}
