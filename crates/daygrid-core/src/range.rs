use std::cmp::Ordering;

use chrono::NaiveDateTime;

use crate::dates::{self, Unit};
use crate::event::EventFields;

/// Whether `event` intersects the window `[window_start, window_end]`.
///
/// The start side compares by day. The end side compares by minute and is
/// inclusive only for zero-length events, so an event ending exactly at
/// `window_start` is hidden while an instant at `window_start` is shown.
pub fn in_range<E, F>(
    event: &E,
    window_start: NaiveDateTime,
    window_end: NaiveDateTime,
    fields: &F,
) -> bool
where
    F: EventFields<E> + ?Sized,
{
    let start = fields.start(event);
    let end = fields.end(event);
    let day_start = dates::start_of(start, Unit::Day);

    let starts_before_end = dates::lte(day_start, window_end, Unit::Day);
    let ends_after_start = if dates::eq(start, end, Unit::Minute) {
        dates::gte(end, window_start, Unit::Minute)
    } else {
        dates::gt(end, window_start, Unit::Minute)
    };

    starts_before_end && ends_after_start
}

/// Number of day slots an event covers for ordering purposes, never below 1.
pub fn day_span<E, F>(event: &E, fields: &F) -> i64
where
    F: EventFields<E> + ?Sized,
{
    let end = dates::ceil(fields.end(event), Unit::Day);
    dates::diff(fields.start(event), end, Unit::Day).max(1)
}

/// Row priority: earlier day first, then longer spans, then all-day events,
/// then the exact start time.
pub fn sort_events<E, F>(a: &E, b: &E, fields: &F) -> Ordering
where
    F: EventFields<E> + ?Sized,
{
    let a_start = fields.start(a);
    let b_start = fields.start(b);

    dates::start_of(a_start, Unit::Day)
        .cmp(&dates::start_of(b_start, Unit::Day))
        .then_with(|| day_span(b, fields).cmp(&day_span(a, fields)))
        .then_with(|| fields.is_all_day(b).cmp(&fields.is_all_day(a)))
        .then_with(|| a_start.cmp(&b_start))
}

/// Events of `events` that intersect the window, in row priority order.
pub fn events_in_window<'a, E, F>(
    events: &'a [E],
    window_start: NaiveDateTime,
    window_end: NaiveDateTime,
    fields: &F,
) -> Vec<&'a E>
where
    F: EventFields<E> + ?Sized,
{
    let mut selected: Vec<&E> = events
        .iter()
        .filter(|event| in_range(*event, window_start, window_end, fields))
        .collect();
    selected.sort_by(|a, b| sort_events(*a, *b, fields));
    selected
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;
    use crate::event::{CalendarEvent, CalendarEventFields};

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, d)
            .and_then(|date| date.and_hms_opt(h, m, 0))
            .expect("valid datetime")
    }

    #[test]
    fn zero_length_event_at_window_start_is_included() {
        let instant = CalendarEvent::new("ping", at(13, 0, 0), at(13, 0, 0));
        let ending = CalendarEvent::new("late", at(12, 22, 0), at(13, 0, 0));
        let fields = CalendarEventFields;

        assert!(in_range(&instant, at(13, 0, 0), at(19, 0, 0), &fields));
        assert!(!in_range(&ending, at(13, 0, 0), at(19, 0, 0), &fields));
    }

    #[test]
    fn window_end_compares_by_day() {
        let evening = CalendarEvent::new("dinner", at(19, 20, 0), at(19, 22, 0));
        let next_week = CalendarEvent::new("trip", at(20, 8, 0), at(21, 8, 0));
        let fields = CalendarEventFields;

        assert!(in_range(&evening, at(13, 0, 0), at(19, 0, 0), &fields));
        assert!(!in_range(&next_week, at(13, 0, 0), at(19, 0, 0), &fields));
    }

    #[test]
    fn longer_and_all_day_events_sort_first() {
        let fields = CalendarEventFields;
        let short_early = CalendarEvent::new("short", at(13, 8, 0), at(13, 9, 0));
        let long = CalendarEvent::new("long", at(13, 10, 0), at(15, 10, 0));
        let all_day = CalendarEvent::new("holiday", at(13, 0, 0), at(14, 0, 0)).all_day();
        let previous_day = CalendarEvent::new("prev", at(12, 23, 0), at(12, 23, 30));

        let events = vec![
            short_early.clone(),
            all_day.clone(),
            long.clone(),
            previous_day.clone(),
        ];
        let sorted = events_in_window(&events, at(12, 0, 0), at(18, 0, 0), &fields);
        let titles: Vec<&str> = sorted.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["prev", "long", "holiday", "short"]);
    }

    #[test]
    fn sorting_twice_is_stable() {
        let fields = CalendarEventFields;
        let events = vec![
            CalendarEvent::new("b", at(14, 9, 0), at(14, 10, 0)),
            CalendarEvent::new("a", at(13, 9, 0), at(16, 10, 0)),
            CalendarEvent::new("c", at(14, 8, 0), at(14, 8, 30)),
            CalendarEvent::new("d", at(13, 0, 0), at(14, 0, 0)).all_day(),
        ];
        let once = events_in_window(&events, at(13, 0, 0), at(19, 0, 0), &fields);
        let mut twice = once.clone();
        twice.sort_by(|a, b| sort_events(*a, *b, &fields));
        assert_eq!(
            once.iter().map(|e| &e.title).collect::<Vec<_>>(),
            twice.iter().map(|e| &e.title).collect::<Vec<_>>()
        );
    }

    #[test]
    fn day_span_floors_at_one() {
        let fields = CalendarEventFields;
        let hour = CalendarEvent::new("hour", at(13, 9, 0), at(13, 10, 0));
        let three = CalendarEvent::new("three", at(13, 9, 0), at(15, 10, 0));
        assert_eq!(day_span(&hour, &fields), 1);
        assert_eq!(day_span(&three, &fields), 3);
    }
}
