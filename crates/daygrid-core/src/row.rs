//! One visible week (or any run of day slots) laid out for display.
//!
//! A fixed-height row packs every event under a level limit and reports the
//! hidden remainder per slot. A variable-height row keeps multi-day events
//! as leveled bars and stacks single-day events under their day instead.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;

use crate::event::EventFields;
use crate::levels::{self, LevelLimit};
use crate::range::events_in_window;
use crate::segment::{Segment, Window, build_segments};
use crate::spanning::{self, DayKey, SpanningLayout};

/// A "+N more" cell under a fixed-height row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShowMore {
    pub slot: usize,
    pub count: usize,
    pub date: NaiveDateTime,
}

pub struct Row<'a, E> {
    pub window: Window,
    pub segments: Vec<Segment<'a, E>>,
    pub levels: Vec<Vec<Segment<'a, E>>>,
    pub extra: Vec<Segment<'a, E>>,
    pub show_more: Vec<ShowMore>,
}

impl<'a, E> Row<'a, E> {
    /// Every event drawn in `slot`, hidden ones included, for a popup.
    pub fn events_at(&self, slot: usize) -> Vec<&'a E> {
        levels::segments_in_slot(&self.segments, slot)
    }

    /// Only the events collapsed behind the slot's "+N more" cell.
    pub fn hidden_at(&self, slot: usize) -> Vec<&'a E> {
        levels::segments_in_slot(&self.extra, slot)
    }
}

impl<E: fmt::Debug> fmt::Debug for Row<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Row")
            .field("window", &self.window)
            .field("levels", &self.levels)
            .field("extra", &self.extra)
            .field("show_more", &self.show_more)
            .finish()
    }
}

pub struct VarHeightRow<'a, E> {
    pub window: Window,
    pub segments: Vec<Segment<'a, E>>,
    pub layout: SpanningLayout<'a, E>,
}

impl<'a, E> VarHeightRow<'a, E> {
    pub fn events_at(&self, slot: usize) -> Vec<&'a E> {
        levels::segments_in_slot(&self.segments, slot)
    }
}

impl<E: fmt::Debug> fmt::Debug for VarHeightRow<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VarHeightRow")
            .field("window", &self.window)
            .field("layout", &self.layout)
            .finish()
    }
}

fn row_segments<'a, E, F>(events: &'a [E], window: &Window, fields: &F) -> Vec<Segment<'a, E>>
where
    F: EventFields<E> + ?Sized,
{
    let selected = events_in_window(events, window.first, window.last_day(), fields);
    build_segments(selected, window, fields)
}

pub fn layout_row<'a, E, F>(
    events: &'a [E],
    window: Window,
    limit: LevelLimit,
    fields: &F,
) -> Row<'a, E>
where
    F: EventFields<E> + ?Sized,
{
    let segments = row_segments(events, &window, fields);
    let packed = levels::pack(segments.iter().copied(), limit);

    let show_more = (1..=window.slots())
        .filter_map(|slot| {
            let count = levels::events_in_slot(&packed.extra, slot);
            let date = window.slot_date(slot)?;
            (count > 0).then_some(ShowMore { slot, count, date })
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        first = %window.first,
        segments = segments.len(),
        levels = packed.levels.len(),
        hidden = packed.extra.len(),
        %limit,
        "laid out fixed-height row"
    );

    Row {
        window,
        segments,
        levels: packed.levels,
        extra: packed.extra,
        show_more,
    }
}

pub fn layout_var_height_row<'a, E, F>(
    events: &'a [E],
    window: Window,
    fields: &F,
) -> VarHeightRow<'a, E>
where
    F: EventFields<E> + ?Sized,
{
    let segments = row_segments(events, &window, fields);
    let layout = spanning::partition(segments.clone(), fields);

    tracing::debug!(
        first = %window.first,
        segments = segments.len(),
        spanning_levels = layout.spanning_events.len(),
        days = layout.daily_events.len(),
        "laid out variable-height row"
    );

    VarHeightRow {
        window,
        segments,
        layout,
    }
}

/// One horizontal piece of a rendered level.
pub enum RowCell<'a, E> {
    Gap { span: usize },
    Segment(Segment<'a, E>),
}

impl<E> RowCell<'_, E> {
    pub fn span(&self) -> usize {
        match self {
            Self::Gap { span } => *span,
            Self::Segment(seg) => seg.span,
        }
    }
}

/// Left-to-right cells for one level: segments with the gaps before,
/// between and after them. The spans add up to `slots`.
pub fn row_cells<'a, E>(level: &[Segment<'a, E>], slots: usize) -> Vec<RowCell<'a, E>> {
    let mut cells = Vec::with_capacity(level.len() * 2 + 1);
    let mut next_free = 1;

    for seg in level {
        let gap = seg.left.saturating_sub(next_free);
        if gap > 0 {
            cells.push(RowCell::Gap { span: gap });
        }
        cells.push(RowCell::Segment(*seg));
        next_free = seg.right + 1;
    }

    let trailing = (slots + 1).saturating_sub(next_free);
    if trailing > 0 {
        cells.push(RowCell::Gap { span: trailing });
    }
    cells
}

/// One horizontal piece of the daily stack line.
pub enum DailyCell<'a, E> {
    Gap { span: usize },
    Stack { slot: usize, events: Vec<&'a E> },
}

impl<E> DailyCell<'_, E> {
    pub fn span(&self) -> usize {
        match self {
            Self::Gap { span } => *span,
            Self::Stack { .. } => 1,
        }
    }
}

/// Cells for the daily stacks of a variable-height row; each stack takes
/// exactly its day's slot.
pub fn daily_cells<'a, E>(
    groups: &BTreeMap<DayKey, Vec<Segment<'a, E>>>,
    slots: usize,
) -> Vec<DailyCell<'a, E>> {
    let mut cells = Vec::with_capacity(groups.len() * 2 + 1);
    let mut next_free = 1;

    for group in groups.values() {
        let Some(first) = group.first() else {
            continue;
        };
        if first.left < next_free {
            continue;
        }
        let gap = first.left - next_free;
        if gap > 0 {
            cells.push(DailyCell::Gap { span: gap });
        }
        cells.push(DailyCell::Stack {
            slot: first.left,
            events: group.iter().map(|seg| seg.event).collect(),
        });
        next_free = first.left + 1;
    }

    let trailing = (slots + 1).saturating_sub(next_free);
    if trailing > 0 {
        cells.push(DailyCell::Gap { span: trailing });
    }
    cells
}

/// How many event lines fit below a row heading: at least one.
pub fn measure_row_limit(container: u32, heading: u32, event_height: u32) -> usize {
    if event_height == 0 {
        return 1;
    }
    let space = container.saturating_sub(heading);
    usize::try_from(space / event_height).unwrap_or(1).max(1)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;
    use crate::event::{CalendarEvent, CalendarEventFields};

    // 2024-05-13 is a Monday.
    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, d)
            .and_then(|date| date.and_hms_opt(h, 0, 0))
            .expect("valid datetime")
    }

    fn week() -> Window {
        Window::from_range((13..=19).map(|d| at(d, 0)).collect()).expect("non-empty week")
    }

    fn describe(cells: &[RowCell<'_, CalendarEvent>]) -> Vec<String> {
        cells
            .iter()
            .map(|cell| match cell {
                RowCell::Gap { span } => format!("gap{span}"),
                RowCell::Segment(seg) => seg.event.title.clone(),
            })
            .collect()
    }

    #[test]
    fn overflow_becomes_show_more_cells() {
        let events: Vec<CalendarEvent> = (0..5)
            .map(|i| CalendarEvent::new(format!("busy{i}"), at(15, 8 + i), at(15, 9 + i)))
            .chain([CalendarEvent::new("friday", at(17, 8), at(17, 9))])
            .collect();

        let row = layout_row(&events, week(), LevelLimit::AtMost(2), &CalendarEventFields);

        assert_eq!(row.levels.len(), 2);
        assert_eq!(row.extra.len(), 3);
        assert_eq!(
            row.show_more,
            vec![ShowMore {
                slot: 3,
                count: 3,
                date: at(15, 0),
            }]
        );
        assert_eq!(row.events_at(3).len(), 5);
        let hidden: Vec<&str> = row.hidden_at(3).iter().map(|e| e.title.as_str()).collect();
        assert_eq!(hidden, vec!["busy2", "busy3", "busy4"]);
        assert!(row.hidden_at(5).is_empty());
    }

    #[test]
    fn unbounded_row_has_no_show_more() {
        let events: Vec<CalendarEvent> = (0..5)
            .map(|i| CalendarEvent::new(format!("busy{i}"), at(15, 8 + i), at(15, 9 + i)))
            .collect();
        let row = layout_row(&events, week(), LevelLimit::Unbounded, &CalendarEventFields);
        assert_eq!(row.levels.len(), 5);
        assert!(row.show_more.is_empty());
    }

    #[test]
    fn events_outside_the_row_are_ignored() {
        let events = vec![
            CalendarEvent::new("last week", at(8, 9), at(8, 10)),
            CalendarEvent::new("next week", at(21, 9), at(21, 10)),
            CalendarEvent::new("this week", at(14, 9), at(14, 10)),
        ];
        let row = layout_row(&events, week(), LevelLimit::Unbounded, &CalendarEventFields);
        assert_eq!(row.segments.len(), 1);
        assert_eq!(row.segments[0].event.title, "this week");
    }

    #[test]
    fn cells_fill_the_whole_row() {
        let events = vec![
            CalendarEvent::new("a", at(14, 9), at(15, 17)),
            CalendarEvent::new("b", at(17, 9), at(17, 10)),
        ];
        let row = layout_row(&events, week(), LevelLimit::Unbounded, &CalendarEventFields);
        let cells = row_cells(&row.levels[0], row.window.slots());

        assert_eq!(describe(&cells), vec!["gap1", "a", "gap1", "b", "gap2"]);
        assert_eq!(cells.iter().map(RowCell::span).sum::<usize>(), 7);
        assert_eq!(describe(&row_cells(&[], 7)), vec!["gap7"]);
    }

    #[test]
    fn var_height_row_stacks_single_day_events() {
        let events = vec![
            CalendarEvent::new("trip", at(13, 9), at(15, 17)),
            CalendarEvent::new("standup", at(13, 9), at(13, 10)),
            CalendarEvent::new("lunch", at(13, 12), at(13, 13)),
            CalendarEvent::new("review", at(16, 14), at(16, 15)),
        ];
        let row = layout_var_height_row(&events, week(), &CalendarEventFields);

        assert_eq!(row.layout.spanning_events.len(), 1);
        assert_eq!(row.layout.daily_depth(), 2);
        assert_eq!(row.events_at(1).len(), 3);

        let cells = daily_cells(&row.layout.daily_events, row.window.slots());
        let shape: Vec<String> = cells
            .iter()
            .map(|cell| match cell {
                DailyCell::Gap { span } => format!("gap{span}"),
                DailyCell::Stack { slot, events } => format!("{slot}:{}", events.len()),
            })
            .collect();
        assert_eq!(shape, vec!["1:2", "gap2", "4:1", "gap3"]);
        assert_eq!(cells.iter().map(DailyCell::span).sum::<usize>(), 7);
    }

    #[test]
    fn row_limit_measurement_floors_and_keeps_one_line() {
        assert_eq!(measure_row_limit(120, 20, 22), 4);
        assert_eq!(measure_row_limit(30, 20, 22), 1);
        assert_eq!(measure_row_limit(10, 20, 22), 1);
        assert_eq!(measure_row_limit(100, 0, 0), 1);
    }
}
