use std::io::{self, Write};

use anyhow::Context;
use chrono::NaiveDate;
use tracing::{debug, info, instrument};

use crate::cli::{Command, OutputFormat, ShowArgs, WindowArgs};
use crate::config::{Config, Layout};
use crate::datetime::parse_date_expr;
use crate::dates;
use crate::event::{CalendarEvent, CalendarEventFields};
use crate::levels::LevelLimit;
use crate::range::events_in_window;
use crate::render::{LayoutDto, Renderer, RowDto, WindowDto, write_json};
use crate::row::{layout_row, layout_var_height_row};
use crate::source::load_events;
use crate::views::{self, View};

pub fn dispatch(cfg: &Config, renderer: &Renderer, command: Command) -> anyhow::Result<()> {
    debug!(?command, "dispatching command");

    match command {
        Command::Show(args) => cmd_show(cfg, renderer, args),
        Command::Window(args) => cmd_window(cfg, renderer, args),
    }
}

fn resolve_date(expr: Option<&str>, today: NaiveDate) -> anyhow::Result<NaiveDate> {
    match expr {
        Some(raw) => parse_date_expr(raw, today).with_context(|| format!("invalid --date {raw}")),
        None => Ok(today),
    }
}

#[instrument(skip(cfg, renderer, args), fields(events = %args.events.display()))]
fn cmd_show(cfg: &Config, renderer: &Renderer, args: ShowArgs) -> anyhow::Result<()> {
    let today = cfg.today();
    let view = args.view.unwrap_or_else(|| cfg.default_view());
    let date = resolve_date(args.date.as_deref(), today)?;
    let layout = args.layout.unwrap_or_else(|| cfg.layout());
    let limit = args
        .rows
        .map(LevelLimit::from_setting)
        .unwrap_or_else(|| cfg.level_limit());
    let week_start = cfg.week_start();
    let agenda_length = cfg.agenda_length();

    let events = load_events(&args.events)?;
    let range = views::visible_range(view, date, week_start, agenda_length);
    let title = views::title(view, date, week_start, agenda_length);
    let windows = views::row_windows(view, date, week_start, agenda_length);

    info!(
        view = %view,
        %date,
        layout = %layout,
        %limit,
        events = events.len(),
        rows = windows.len(),
        "laying out view"
    );

    let fields = CalendarEventFields;
    let mut out = io::stdout().lock();

    match args.format {
        OutputFormat::Json => {
            let mut dto = LayoutDto::new(view, title, range, layout);
            dto.rows = windows
                .into_iter()
                .map(|window| match layout {
                    Layout::Fixed => RowDto::fixed(&layout_row(&events, window, limit, &fields)),
                    Layout::VarHeight => {
                        RowDto::var_height(&layout_var_height_row(&events, window, &fields))
                    }
                })
                .collect();
            write_json(&mut out, &dto)?;
        }
        OutputFormat::Text if view == View::Agenda => {
            writeln!(out, "{title}")?;
            let selected: Vec<&CalendarEvent> = events_in_window(
                &events,
                dates::midnight(range.start),
                dates::midnight(range.end),
                &fields,
            );
            renderer.write_agenda(&mut out, &selected)?;
        }
        OutputFormat::Text => {
            writeln!(out, "{title}")?;
            writeln!(out)?;
            for window in windows {
                match layout {
                    Layout::Fixed => {
                        let row = layout_row(&events, window, limit, &fields);
                        renderer.write_fixed_row(&mut out, &row, today)?;
                    }
                    Layout::VarHeight => {
                        let row = layout_var_height_row(&events, window, &fields);
                        renderer.write_var_height_row(&mut out, &row, today)?;
                    }
                }
            }
        }
    }

    out.flush()?;
    Ok(())
}

#[instrument(skip(cfg, renderer, args))]
fn cmd_window(cfg: &Config, renderer: &Renderer, args: WindowArgs) -> anyhow::Result<()> {
    let today = cfg.today();
    let view = args.view.unwrap_or_else(|| cfg.default_view());
    let week_start = cfg.week_start();
    let agenda_length = cfg.agenda_length();

    let mut date = resolve_date(args.date.as_deref(), today)?;
    if let Some(step) = args.step {
        date = views::navigate(view, date, step, today, agenda_length);
        debug!(?step, %date, "navigated");
    }

    let range = views::visible_range(view, date, week_start, agenda_length);
    let title = views::title(view, date, week_start, agenda_length);

    let mut out = io::stdout().lock();
    match args.format {
        OutputFormat::Json => write_json(&mut out, &WindowDto::new(view, date, title, range))?,
        OutputFormat::Text => renderer.write_window(&mut out, view, &title, range)?,
    }
    out.flush()?;
    Ok(())
}
