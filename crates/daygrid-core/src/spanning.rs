use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::dates::{self, Unit};
use crate::event::EventFields;
use crate::levels::{self, LevelLimit};
use crate::segment::Segment;

/// Days between 0001-01-01 and 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Calendar day identity: the day number since 1970-01-01.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey(pub i64);

impl DayKey {
    pub fn of(d: NaiveDateTime) -> Self {
        Self::from_date(d.date())
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(i64::from(date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE))
    }

    pub fn date(self) -> Option<NaiveDate> {
        let days = i32::try_from(self.0).ok()?;
        NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?)
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.date() {
            Some(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            None => write!(f, "day#{}", self.0),
        }
    }
}

/// Multi-day events packed into shared levels, single-day events stacked
/// per day.
pub struct SpanningLayout<'a, E> {
    pub spanning_events: Vec<Vec<Segment<'a, E>>>,
    pub daily_events: BTreeMap<DayKey, Vec<Segment<'a, E>>>,
}

impl<E> Default for SpanningLayout<'_, E> {
    fn default() -> Self {
        Self {
            spanning_events: Vec::new(),
            daily_events: BTreeMap::new(),
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for SpanningLayout<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpanningLayout")
            .field("spanning_events", &self.spanning_events)
            .field("daily_events", &self.daily_events)
            .finish()
    }
}

impl<E> SpanningLayout<'_, E> {
    /// Deepest daily stack; the number of lines a renderer needs below the
    /// spanning levels.
    pub fn daily_depth(&self) -> usize {
        self.daily_events.values().map(Vec::len).max().unwrap_or(0)
    }

    pub fn segment_count(&self) -> usize {
        let spanning: usize = self.spanning_events.iter().map(Vec::len).sum();
        let daily: usize = self.daily_events.values().map(Vec::len).sum();
        spanning + daily
    }
}

/// True when the event's day extent covers more than one day.
pub fn is_spanning<E, F>(event: &E, fields: &F) -> bool
where
    F: EventFields<E> + ?Sized,
{
    let first = dates::start_of(fields.start(event), Unit::Day);
    let last = dates::ceil(fields.end(event), Unit::Day);
    dates::diff(first, last, Unit::Day) > 1
}

/// Routes every segment into exactly one of the two pools.
pub fn partition<'a, E, F>(segments: Vec<Segment<'a, E>>, fields: &F) -> SpanningLayout<'a, E>
where
    F: EventFields<E> + ?Sized,
{
    let (mut spanning, daily): (Vec<_>, Vec<_>) = segments
        .into_iter()
        .partition(|seg| is_spanning(seg.event, fields));

    spanning.sort_by_key(|seg| seg.left);
    let spanning_events = levels::pack(spanning, LevelLimit::Unbounded).levels;

    let mut daily_events = daily.into_iter().fold(
        BTreeMap::<DayKey, Vec<Segment<'a, E>>>::new(),
        |mut groups, seg| {
            let key = DayKey::of(fields.start(seg.event));
            groups.entry(key).or_default().push(seg);
            groups
        },
    );
    for group in daily_events.values_mut() {
        group.sort_by_key(|seg| seg.left);
    }

    SpanningLayout {
        spanning_events,
        daily_events,
    }
}
