use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::Layout;
use crate::views::{Navigate, View};

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "daygrid",
    version,
    about = "Lay out calendar events on a day grid",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    /// Config file, instead of $DAYGRID_CONFIG or the user config dir.
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Lay out events for the visible window of a view.
    Show(ShowArgs),
    /// Print the title and visible range of a view.
    Window(WindowArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Event file: a JSON array (.json) or one event per line (.jsonl).
    #[arg(long = "events", short = 'e')]
    pub events: PathBuf,

    #[arg(long = "view", value_parser = parse_view)]
    pub view: Option<View>,

    /// today, tomorrow, monday, march, +2w, 2024-05-13, 2024-05 ...
    #[arg(long = "date", short = 'd')]
    pub date: Option<String>,

    /// Levels per fixed-height row; 0 shows every level.
    #[arg(long = "rows")]
    pub rows: Option<usize>,

    #[arg(long = "layout", value_parser = parse_layout)]
    pub layout: Option<Layout>,

    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Args, Debug, Clone)]
pub struct WindowArgs {
    #[arg(long = "view", value_parser = parse_view)]
    pub view: Option<View>,

    #[arg(long = "date", short = 'd')]
    pub date: Option<String>,

    /// prev, next, today or YYYY-MM-DD.
    #[arg(long = "step", value_parser = parse_step)]
    pub step: Option<Navigate>,

    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

fn parse_view(s: &str) -> anyhow::Result<View> {
    s.parse()
}

fn parse_layout(s: &str) -> anyhow::Result<Layout> {
    s.parse()
}

fn parse_step(s: &str) -> anyhow::Result<Navigate> {
    s.parse()
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_show_with_global_flags() {
        let cli = GlobalCli::try_parse_from([
            "daygrid",
            "-vv",
            "show",
            "--events",
            "events.json",
            "--view",
            "work-week",
            "--rows",
            "3",
            "--rc",
            "calendar.week_start=sunday",
            "--format",
            "json",
        ])
        .expect("valid arguments");

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.rc_overrides.len(), 1);
        assert_eq!(cli.rc_overrides[0].key, "calendar.week_start");
        match cli.command {
            Command::Show(args) => {
                assert_eq!(args.view, Some(View::WorkWeek));
                assert_eq!(args.rows, Some(3));
                assert_eq!(args.format, OutputFormat::Json);
                assert!(args.layout.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_window_steps() {
        let cli = GlobalCli::try_parse_from(["daygrid", "window", "--step", "prev"])
            .expect("valid arguments");
        match cli.command {
            Command::Window(args) => assert_eq!(args.step, Some(Navigate::Previous)),
            other => panic!("unexpected command: {other:?}"),
        }

        assert!(GlobalCli::try_parse_from(["daygrid", "window", "--view", "fortnight"]).is_err());
    }

    #[test]
    fn key_val_requires_equals() {
        assert!("color".parse::<KeyVal>().is_err());
        let kv: KeyVal = " layout = var-height ".parse().expect("key=value");
        assert_eq!((kv.key.as_str(), kv.value.as_str()), ("layout", "var-height"));
    }
}
