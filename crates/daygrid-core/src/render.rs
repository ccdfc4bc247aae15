use std::collections::BTreeMap;
use std::io::{self, IsTerminal, Write};

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::config::{Config, Layout};
use crate::dates::{self, Unit};
use crate::event::CalendarEvent;
use crate::row::{self, DailyCell, Row, RowCell, VarHeightRow};
use crate::segment::{Segment, Window};
use crate::views::{View, VisibleRange};

/// Character width of one day column in text output.
pub const COLUMN_WIDTH: usize = 14;

const SEPARATOR: &str = "|";
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> Self {
        Self {
            color: cfg.calendar.color && io::stdout().is_terminal(),
        }
    }

    /// A renderer that never emits ANSI escapes.
    pub fn plain() -> Self {
        Self { color: false }
    }

    pub fn write_window<W: Write>(
        &self,
        mut out: W,
        view: View,
        title: &str,
        range: VisibleRange,
    ) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint(title, "1"))?;
        writeln!(out, "view      {}", view.as_key())?;
        writeln!(out, "start     {}", range.start.format("%Y-%m-%d"))?;
        writeln!(out, "end       {}", range.end.format("%Y-%m-%d"))?;
        writeln!(out, "days      {}", range.days().len())?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(first = %row.window.first))]
    pub fn write_fixed_row<W: Write>(
        &self,
        mut out: W,
        row: &Row<'_, CalendarEvent>,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let slots = row.window.slots();
        writeln!(out, "{}", self.header_line(&row.window, today))?;

        for level in &row.levels {
            writeln!(out, "{}", self.level_line(level, &row.window))?;
        }

        if !row.show_more.is_empty() {
            let mut cells = vec![" ".repeat(COLUMN_WIDTH); slots];
            for more in &row.show_more {
                if let Some(idx) = more.slot.checked_sub(1)
                    && let Some(cell) = cells.get_mut(idx)
                {
                    let label = fit(&format!("+{} more", more.count), COLUMN_WIDTH);
                    *cell = self.paint(&label, "33");
                }
            }
            writeln!(out, "{}", cells.join(SEPARATOR))?;
        }
        writeln!(out)?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(first = %row.window.first))]
    pub fn write_var_height_row<W: Write>(
        &self,
        mut out: W,
        row: &VarHeightRow<'_, CalendarEvent>,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let slots = row.window.slots();
        writeln!(out, "{}", self.header_line(&row.window, today))?;

        for level in &row.layout.spanning_events {
            writeln!(out, "{}", self.level_line(level, &row.window))?;
        }

        let stacks = row::daily_cells(&row.layout.daily_events, slots);
        for depth in 0..row.layout.daily_depth() {
            let line = stacks
                .iter()
                .map(|cell| match cell {
                    DailyCell::Gap { span } => blank(*span),
                    DailyCell::Stack { events, .. } => match events.get(depth) {
                        Some(event) => self.paint(&fit(&daily_label(event), COLUMN_WIDTH), "36"),
                        None => blank(1),
                    },
                })
                .collect::<Vec<_>>()
                .join(SEPARATOR);
            writeln!(out, "{line}")?;
        }
        writeln!(out)?;
        Ok(())
    }

    /// Agenda listing: one line per event, grouped under its first day.
    pub fn write_agenda<W: Write>(
        &self,
        out: W,
        events: &[&CalendarEvent],
    ) -> anyhow::Result<()> {
        let headers = vec![
            "Date".to_string(),
            "Time".to_string(),
            "Event".to_string(),
        ];

        let mut last_day = None;
        let rows = events
            .iter()
            .map(|event| {
                let day = event.start.date();
                let date = if last_day == Some(day) {
                    String::new()
                } else {
                    last_day = Some(day);
                    self.paint(&day.format("%a %Y-%m-%d").to_string(), "33")
                };
                vec![date, time_label(event), event.title.clone()]
            })
            .collect();

        write_table(out, headers, rows)
    }

    fn header_line(&self, window: &Window, today: NaiveDate) -> String {
        window
            .range
            .iter()
            .map(|day| {
                let label = fit(&day.format("%a %d %b").to_string(), COLUMN_WIDTH);
                if day.date() == today {
                    self.paint(&label, "1;32")
                } else {
                    self.paint(&label, "1")
                }
            })
            .collect::<Vec<_>>()
            .join(SEPARATOR)
    }

    fn level_line(&self, level: &[Segment<'_, CalendarEvent>], window: &Window) -> String {
        row::row_cells(level, window.slots())
            .into_iter()
            .map(|cell| match cell {
                RowCell::Gap { span } => blank(span),
                RowCell::Segment(seg) => {
                    let width = span_width(seg.span);
                    let code = if seg.event.all_day { "35" } else { "36" };
                    self.paint(&fit(&segment_label(&seg, window), width), code)
                }
            })
            .collect::<Vec<_>>()
            .join(SEPARATOR)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

/// Visible width of a cell spanning `span` columns, inner separators
/// included.
fn span_width(span: usize) -> usize {
    span * COLUMN_WIDTH + span.saturating_sub(1) * SEPARATOR.len()
}

fn blank(span: usize) -> String {
    " ".repeat(span_width(span))
}

/// `[title]` with `<` / `>` where the event continues past the row.
fn segment_label(seg: &Segment<'_, CalendarEvent>, window: &Window) -> String {
    let event = seg.event;
    let open = if dates::start_of(event.start, Unit::Day) < window.first {
        '<'
    } else {
        '['
    };
    let close = if dates::ceil(event.end, Unit::Day) > window.last {
        '>'
    } else {
        ']'
    };
    format!("{open}{}{close}", event.title)
}

fn daily_label(event: &CalendarEvent) -> String {
    if event.all_day {
        event.title.clone()
    } else {
        format!("{} {}", event.start.format("%H:%M"), event.title)
    }
}

fn time_label(event: &CalendarEvent) -> String {
    if event.all_day {
        return "all day".to_string();
    }
    if event.start.date() == event.end.date() {
        format!(
            "{}-{}",
            event.start.format("%H:%M"),
            event.end.format("%H:%M")
        )
    } else {
        format!(
            "{} - {}",
            event.start.format("%H:%M"),
            event.end.format("%m-%d %H:%M")
        )
    }
}

/// Pads or truncates `text` to exactly `width` terminal columns.
fn fit(text: &str, width: usize) -> String {
    let text_width = UnicodeWidthStr::width(text);
    if text_width <= width {
        return format!("{text}{}", " ".repeat(width - text_width));
    }
    if width == 0 {
        return String::new();
    }

    let mut out = String::with_capacity(width);
    let mut used = 0;
    for ch in text.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + ch_width > width - 1 {
            break;
        }
        out.push(ch);
        used += ch_width;
    }
    out.push('…');
    used += 1;
    out.push_str(&" ".repeat(width.saturating_sub(used)));
    out
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentDto {
    pub title: String,
    pub start: String,
    pub end: String,
    pub all_day: bool,
    pub left: usize,
    pub right: usize,
    pub span: usize,
}

impl SegmentDto {
    pub fn from_segment(seg: &Segment<'_, CalendarEvent>) -> Self {
        Self {
            title: seg.event.title.clone(),
            start: seg.event.start.format(TIME_FORMAT).to_string(),
            end: seg.event.end.format(TIME_FORMAT).to_string(),
            all_day: seg.event.all_day,
            left: seg.left,
            right: seg.right,
            span: seg.span,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ShowMoreDto {
    pub slot: usize,
    pub date: String,
    pub count: usize,
    pub events: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "layout", rename_all = "kebab-case")]
pub enum RowDto {
    Fixed {
        days: Vec<String>,
        levels: Vec<Vec<SegmentDto>>,
        extra: Vec<SegmentDto>,
        show_more: Vec<ShowMoreDto>,
    },
    VarHeight {
        days: Vec<String>,
        spanning: Vec<Vec<SegmentDto>>,
        daily: BTreeMap<String, Vec<SegmentDto>>,
    },
}

impl RowDto {
    pub fn fixed(row: &Row<'_, CalendarEvent>) -> Self {
        Self::Fixed {
            days: day_keys(&row.window),
            levels: row.levels.iter().map(|level| segment_dtos(level)).collect(),
            extra: segment_dtos(&row.extra),
            show_more: row
                .show_more
                .iter()
                .map(|more| ShowMoreDto {
                    slot: more.slot,
                    date: more.date.format("%Y-%m-%d").to_string(),
                    count: more.count,
                    events: row
                        .hidden_at(more.slot)
                        .iter()
                        .map(|event| event.title.clone())
                        .collect(),
                })
                .collect(),
        }
    }

    pub fn var_height(row: &VarHeightRow<'_, CalendarEvent>) -> Self {
        Self::VarHeight {
            days: day_keys(&row.window),
            spanning: row
                .layout
                .spanning_events
                .iter()
                .map(|level| segment_dtos(level))
                .collect(),
            daily: row
                .layout
                .daily_events
                .iter()
                .map(|(key, group)| (key.to_string(), segment_dtos(group)))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LayoutDto {
    pub view: View,
    pub title: String,
    pub start: String,
    pub end: String,
    pub layout: String,
    pub rows: Vec<RowDto>,
}

impl LayoutDto {
    pub fn new(view: View, title: String, range: VisibleRange, layout: Layout) -> Self {
        Self {
            view,
            title,
            start: range.start.format("%Y-%m-%d").to_string(),
            end: range.end.format("%Y-%m-%d").to_string(),
            layout: layout.as_key().to_string(),
            rows: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WindowDto {
    pub view: View,
    pub date: String,
    pub title: String,
    pub start: String,
    pub end: String,
    pub days: usize,
}

impl WindowDto {
    pub fn new(view: View, date: NaiveDate, title: String, range: VisibleRange) -> Self {
        Self {
            view,
            date: date.format("%Y-%m-%d").to_string(),
            title,
            start: range.start.format("%Y-%m-%d").to_string(),
            end: range.end.format("%Y-%m-%d").to_string(),
            days: range.days().len(),
        }
    }
}

fn segment_dtos(segments: &[Segment<'_, CalendarEvent>]) -> Vec<SegmentDto> {
    segments.iter().map(SegmentDto::from_segment).collect()
}

fn day_keys(window: &Window) -> Vec<String> {
    window
        .range
        .iter()
        .map(|day: &NaiveDateTime| day.format("%Y-%m-%d").to_string())
        .collect()
}

pub fn write_json<W: Write, T: Serialize>(mut out: W, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::event::CalendarEventFields;
    use crate::levels::LevelLimit;
    use crate::row::{layout_row, layout_var_height_row};

    // 2024-05-13 is a Monday.
    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, d)
            .and_then(|date| date.and_hms_opt(h, 0, 0))
            .expect("valid datetime")
    }

    fn week() -> Window {
        Window::from_range((13..=19).map(|d| at(d, 0)).collect()).expect("non-empty week")
    }

    fn render_to_string(write: impl FnOnce(&mut Vec<u8>) -> anyhow::Result<()>) -> String {
        let mut buf = Vec::new();
        write(&mut buf).expect("render");
        String::from_utf8(buf).expect("utf8 output")
    }

    #[test]
    fn fit_pads_and_truncates_by_display_width() {
        assert_eq!(fit("abc", 5), "abc  ");
        assert_eq!(fit("abcdef", 4), "abc…");
        assert_eq!(UnicodeWidthStr::width(fit("会議会議会議", 5).as_str()), 5);
        assert_eq!(fit("anything", 0), "");
    }

    #[test]
    fn fixed_row_lines_have_equal_width() {
        let events = vec![
            CalendarEvent::new("Conference", at(10, 9), at(15, 17)),
            CalendarEvent::new("Dentist", at(16, 9), at(16, 10)),
            CalendarEvent::new("Lunch", at(16, 12), at(16, 13)),
        ];
        let row = layout_row(&events, week(), LevelLimit::AtMost(1), &CalendarEventFields);
        let text = render_to_string(|buf| {
            Renderer::plain().write_fixed_row(buf, &row, NaiveDate::MIN)
        });

        let lines: Vec<&str> = text.lines().filter(|l| !l.is_empty()).collect();
        assert_eq!(lines.len(), 3, "{text}");
        let expected = span_width(7);
        for line in &lines {
            assert_eq!(UnicodeWidthStr::width(*line), expected, "{line:?}");
        }
        assert!(lines[0].starts_with("Mon 13 May"));
        assert!(lines[1].starts_with("<Conference]"));
        assert!(lines[2].contains("+1 more"));
    }

    #[test]
    fn var_height_row_prints_daily_stacks() {
        let events = vec![
            CalendarEvent::new("Trip", at(13, 9), at(15, 17)),
            CalendarEvent::new("Standup", at(17, 9), at(17, 10)),
            CalendarEvent::new("Retro", at(17, 15), at(17, 16)),
        ];
        let row = layout_var_height_row(&events, week(), &CalendarEventFields);
        let text = render_to_string(|buf| {
            Renderer::plain().write_var_height_row(buf, &row, NaiveDate::MIN)
        });

        assert!(text.contains("[Trip]"), "{text}");
        assert!(text.contains("09:00 Standup"), "{text}");
        assert!(text.contains("15:00 Retro"), "{text}");
    }

    #[test]
    fn json_dto_lists_hidden_events() {
        let events: Vec<CalendarEvent> = (0..3)
            .map(|i| CalendarEvent::new(format!("e{i}"), at(14, 8 + i), at(14, 9 + i)))
            .collect();
        let row = layout_row(&events, week(), LevelLimit::AtMost(1), &CalendarEventFields);
        let value = serde_json::to_value(RowDto::fixed(&row)).expect("json");

        assert_eq!(value["layout"], "fixed");
        assert_eq!(value["levels"][0][0]["title"], "e0");
        assert_eq!(value["show_more"][0]["count"], 2);
        assert_eq!(value["show_more"][0]["date"], "2024-05-14");
        assert_eq!(value["show_more"][0]["events"][1], "e2");
    }

    #[test]
    fn agenda_groups_by_day() {
        let a = CalendarEvent::new("a", at(13, 9), at(13, 10));
        let b = CalendarEvent::new("b", at(13, 11), at(13, 12));
        let c = CalendarEvent::new("c", at(14, 0), at(15, 0)).all_day();
        let text = render_to_string(|buf| Renderer::plain().write_agenda(buf, &[&a, &b, &c]));

        assert_eq!(text.matches("Mon 2024-05-13").count(), 1, "{text}");
        assert!(text.contains("all day"));
        assert!(text.contains("09:00-10:00"));
    }
}
