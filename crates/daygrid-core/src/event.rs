use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::datetime::event_time_serde;

/// Read access to the fields the layout needs, independent of how an event
/// type names or stores them.
pub trait EventFields<E: ?Sized> {
    fn start(&self, event: &E) -> NaiveDateTime;
    fn end(&self, event: &E) -> NaiveDateTime;
    fn is_all_day(&self, event: &E) -> bool;
}

/// `EventFields` built from three closures.
#[derive(Clone, Copy)]
pub struct Accessors<S, N, A> {
    start: S,
    end: N,
    all_day: A,
}

impl<S, N, A> Accessors<S, N, A> {
    pub fn new(start: S, end: N, all_day: A) -> Self {
        Self {
            start,
            end,
            all_day,
        }
    }
}

impl<E, S, N, A> EventFields<E> for Accessors<S, N, A>
where
    E: ?Sized,
    S: Fn(&E) -> NaiveDateTime,
    N: Fn(&E) -> NaiveDateTime,
    A: Fn(&E) -> bool,
{
    fn start(&self, event: &E) -> NaiveDateTime {
        (self.start)(event)
    }

    fn end(&self, event: &E) -> NaiveDateTime {
        (self.end)(event)
    }

    fn is_all_day(&self, event: &E) -> bool {
        (self.all_day)(event)
    }
}

impl<E: ?Sized, F: EventFields<E> + ?Sized> EventFields<E> for &F {
    fn start(&self, event: &E) -> NaiveDateTime {
        (**self).start(event)
    }

    fn end(&self, event: &E) -> NaiveDateTime {
        (**self).end(event)
    }

    fn is_all_day(&self, event: &E) -> bool {
        (**self).is_all_day(event)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarEvent {
    pub title: String,

    #[serde(with = "event_time_serde")]
    pub start: NaiveDateTime,

    #[serde(with = "event_time_serde")]
    pub end: NaiveDateTime,

    #[serde(default, alias = "allDay")]
    pub all_day: bool,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl CalendarEvent {
    pub fn new(title: impl Into<String>, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            title: title.into(),
            start,
            end,
            all_day: false,
            extra: BTreeMap::new(),
        }
    }

    pub fn all_day(mut self) -> Self {
        self.all_day = true;
        self
    }
}

/// Field access for [`CalendarEvent`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CalendarEventFields;

impl EventFields<CalendarEvent> for CalendarEventFields {
    fn start(&self, event: &CalendarEvent) -> NaiveDateTime {
        event.start
    }

    fn end(&self, event: &CalendarEvent) -> NaiveDateTime {
        event.end
    }

    fn is_all_day(&self, event: &CalendarEvent) -> bool {
        event.all_day
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    struct Booking {
        from: NaiveDateTime,
        until: NaiveDateTime,
    }

    #[test]
    fn closure_accessors_read_custom_shapes() {
        let from = NaiveDate::from_ymd_opt(2024, 5, 13)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .expect("valid start");
        let until = from + chrono::Duration::hours(2);
        let booking = Booking { from, until };

        let fields = Accessors::new(
            |b: &Booking| b.from,
            |b: &Booking| b.until,
            |_: &Booking| false,
        );
        assert_eq!(fields.start(&booking), from);
        assert_eq!(fields.end(&booking), until);
        assert!(!fields.is_all_day(&booking));
        assert_eq!((&fields).end(&booking), until);
    }

    #[test]
    fn deserializes_with_extra_fields() {
        let raw = r#"{"title":"Standup","start":"2024-05-13T09:00","end":"2024-05-13 09:15","room":"A1"}"#;
        let event: CalendarEvent = serde_json::from_str(raw).expect("event json");
        assert_eq!(event.title, "Standup");
        assert!(!event.all_day);
        assert_eq!(event.end - event.start, chrono::Duration::minutes(15));
        assert_eq!(
            event.extra.get("room").and_then(|v| v.as_str()),
            Some("A1")
        );
    }

    #[test]
    fn accepts_camel_case_all_day_flag() {
        let raw = r#"{"title":"Offsite","start":"2024-05-13","end":"2024-05-15","allDay":true}"#;
        let event: CalendarEvent = serde_json::from_str(raw).expect("event json");
        assert!(CalendarEventFields.is_all_day(&event));
    }
}
