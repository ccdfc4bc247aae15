use std::fmt;

use chrono::NaiveDateTime;

use crate::dates::{self, Unit};
use crate::event::EventFields;

/// An event's horizontal footprint inside a window: inclusive, 1-based slot
/// indices.
pub struct Segment<'a, E> {
    pub event: &'a E,
    pub left: usize,
    pub right: usize,
    pub span: usize,
}

impl<E> Clone for Segment<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Segment<'_, E> {}

impl<E: fmt::Debug> fmt::Debug for Segment<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment")
            .field("event", self.event)
            .field("left", &self.left)
            .field("right", &self.right)
            .field("span", &self.span)
            .finish()
    }
}

impl<E> Segment<'_, E> {
    pub fn overlaps(&self, other: &Self) -> bool {
        other.left <= self.right && other.right >= self.left
    }

    pub fn covers(&self, slot: usize) -> bool {
        self.left <= slot && self.right >= slot
    }

    /// Same originating event and same placement.
    pub fn same_as(&self, other: &Self) -> bool {
        std::ptr::eq(self.event, other.event)
            && self.left == other.left
            && self.right == other.right
    }
}

/// The visible slots of one row together with its bounds. `last` is
/// exclusive: the day after the final slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub range: Vec<NaiveDateTime>,
    pub first: NaiveDateTime,
    pub last: NaiveDateTime,
}

impl Window {
    /// Returns `None` for an empty range.
    pub fn from_range(range: Vec<NaiveDateTime>) -> Option<Self> {
        let first = *range.first()?;
        let last = dates::add(*range.last()?, 1, Unit::Day);
        debug_assert!(
            range
                .windows(2)
                .all(|pair| dates::diff(pair[0], pair[1], Unit::Day) == 1),
            "window slots must be consecutive days"
        );
        Some(Self { range, first, last })
    }

    pub fn slots(&self) -> usize {
        self.range.len()
    }

    /// Last visible day, inclusive.
    pub fn last_day(&self) -> NaiveDateTime {
        dates::add(self.last, -1, Unit::Day)
    }

    pub fn slot_date(&self, slot: usize) -> Option<NaiveDateTime> {
        slot.checked_sub(1).and_then(|idx| self.range.get(idx)).copied()
    }
}

/// Clamps `event` to the window and converts it to slot indices.
///
/// Callers are expected to pass only events accepted by
/// [`crate::range::in_range`] for the same window.
pub fn build_segment<'a, E, F>(event: &'a E, window: &Window, fields: &F) -> Segment<'a, E>
where
    F: EventFields<E> + ?Sized,
{
    let slots = dates::diff(window.first, window.last, Unit::Day).max(1);
    let start = dates::max(
        dates::start_of(fields.start(event), Unit::Day),
        window.first,
    );
    let end = dates::min(dates::ceil(fields.end(event), Unit::Day), window.last);

    let padding = window
        .range
        .iter()
        .position(|day| dates::eq(*day, start, Unit::Day));
    debug_assert!(padding.is_some(), "event starts outside of the window");
    let padding = padding.unwrap_or(0);

    let span = dates::diff(start, end, Unit::Day).clamp(1, slots);
    let span = usize::try_from(span).unwrap_or(1);
    let left = padding + 1;
    let right = (left + span - 1).max(1);

    Segment {
        event,
        left,
        right,
        span,
    }
}

pub fn build_segments<'a, E, F, I>(events: I, window: &Window, fields: &F) -> Vec<Segment<'a, E>>
where
    E: 'a,
    F: EventFields<E> + ?Sized,
    I: IntoIterator<Item = &'a E>,
{
    events
        .into_iter()
        .map(|event| build_segment(event, window, fields))
        .collect()
}
