use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, anyhow};
use tracing::{debug, info};

use crate::event::CalendarEvent;

/// On-disk shape of an event file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// A single JSON array of events.
    Json,
    /// One JSON event per line.
    JsonLines,
}

impl SourceFormat {
    /// Picks the format from the extension, then from the first
    /// non-blank byte of the file.
    fn detect(path: &Path, text: &str) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("jsonl") | Some("ndjson") => Self::JsonLines,
            Some("json") => Self::Json,
            _ if text.trim_start().starts_with('[') => Self::Json,
            _ => Self::JsonLines,
        }
    }
}

#[tracing::instrument(skip(path), fields(file = %path.display()))]
pub fn load_events(path: &Path) -> anyhow::Result<Vec<CalendarEvent>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;

    let format = SourceFormat::detect(path, &text);
    debug!(?format, "parsing event file");

    let events = match format {
        SourceFormat::Json => parse_json(&text)
            .with_context(|| format!("failed parsing {}", path.display()))?,
        SourceFormat::JsonLines => parse_jsonl(path, &text)?,
    };

    validate(&events).with_context(|| format!("invalid events in {}", path.display()))?;

    info!(count = events.len(), "loaded events");
    Ok(events)
}

fn parse_json(text: &str) -> anyhow::Result<Vec<CalendarEvent>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let events: Vec<CalendarEvent> = serde_json::from_str(text)?;
    Ok(events)
}

fn parse_jsonl(path: &Path, text: &str) -> anyhow::Result<Vec<CalendarEvent>> {
    let reader = BufReader::new(text.as_bytes());

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }

        let event: CalendarEvent = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(event);
    }
    Ok(out)
}

/// Rejects events that end before they start.
pub fn validate(events: &[CalendarEvent]) -> anyhow::Result<()> {
    for (idx, event) in events.iter().enumerate() {
        if event.end < event.start {
            return Err(anyhow!(
                "event #{} `{}` ends ({}) before it starts ({})",
                idx + 1,
                event.title,
                event.end.format("%Y-%m-%dT%H:%M"),
                event.start.format("%Y-%m-%dT%H:%M"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_temp(suffix: &str, body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("temp file");
        file.write_all(body.as_bytes()).expect("write events");
        file
    }

    #[test]
    fn loads_json_arrays() {
        let file = write_temp(
            ".json",
            r#"[
              {"title": "Offsite", "start": "2024-05-13", "end": "2024-05-15", "allDay": true},
              {"title": "Standup", "start": "2024-05-13T09:00", "end": "2024-05-13T09:15"}
            ]"#,
        );
        let events = load_events(file.path()).expect("load json");
        assert_eq!(events.len(), 2);
        assert!(events[0].all_day);
        assert_eq!(events[1].title, "Standup");
    }

    #[test]
    fn loads_json_lines_and_reports_bad_lines() {
        let file = write_temp(
            ".jsonl",
            "{\"title\":\"a\",\"start\":\"2024-05-13 09:00\",\"end\":\"2024-05-13 10:00\"}\n\
             \n\
             {\"title\":\"b\",\"start\":\"2024-05-14\",\"end\":\"2024-05-14\"}\n",
        );
        let events = load_events(file.path()).expect("load jsonl");
        assert_eq!(events.len(), 2);

        let broken = write_temp(".jsonl", "{\"title\":\"a\"}\nnot json\n");
        let err = load_events(broken.path()).expect_err("broken file");
        assert!(format!("{err:#}").contains("line 1"), "{err:#}");
    }

    #[test]
    fn sniffs_format_without_extension() {
        let file = write_temp(
            ".events",
            r#"[{"title":"x","start":"2024-05-13","end":"2024-05-14"}]"#,
        );
        assert_eq!(load_events(file.path()).expect("sniffed").len(), 1);
    }

    #[test]
    fn rejects_events_ending_before_they_start() {
        let file = write_temp(
            ".json",
            r#"[{"title":"backwards","start":"2024-05-14","end":"2024-05-13"}]"#,
        );
        let err = load_events(file.path()).expect_err("invalid event");
        let message = format!("{err:#}");
        assert!(message.contains("backwards"), "{message}");
        assert!(message.contains("before it starts"), "{message}");
    }
}
