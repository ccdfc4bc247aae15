use std::fmt;
use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::str::FromStr;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  NaiveDate,
  Weekday
};
use chrono_tz::Tz;
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  info,
  warn
};

use crate::dates::parse_weekday;
use crate::datetime::{
  parse_timezone,
  today_in
};
use crate::levels::LevelLimit;
use crate::views::View;

const CONFIG_ENV: &str =
  "DAYGRID_CONFIG";
const CONFIG_DIR: &str = "daygrid";
const CONFIG_FILE: &str =
  "daygrid.toml";

fn default_week_start() -> String {
  "monday".to_string()
}

fn default_row_limit() -> usize {
  4
}

fn default_view() -> String {
  View::Month.as_key().to_string()
}

fn default_agenda_length() -> u32 {
  30
}

fn default_layout() -> String {
  Layout::Fixed.as_key().to_string()
}

fn default_true() -> bool {
  true
}

/// How a week row is drawn.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Layout {
  /// Every event packed under the row
  /// limit, remainder behind "+N more".
  Fixed,
  /// Multi-day bars plus per-day
  /// stacks, no limit.
  VarHeight
}

impl Layout {
  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Fixed => "fixed",
      | Self::VarHeight => "var-height"
    }
  }

  pub fn from_key(
    key: &str
  ) -> Option<Self> {
    match key
      .trim()
      .to_ascii_lowercase()
      .replace('_', "-")
      .as_str()
    {
      | "fixed" => Some(Self::Fixed),
      | "var-height" | "variable" => {
        Some(Self::VarHeight)
      }
      | _ => None
    }
  }
}

impl fmt::Display for Layout {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_key())
  }
}

impl FromStr for Layout {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    Self::from_key(s).ok_or_else(|| {
      anyhow!(
        "unknown layout `{s}` \
         (expected fixed or \
         var-height)"
      )
    })
  }
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Serialize,
  Deserialize,
)]
pub struct CalendarSettings {
  #[serde(
    default = "default_week_start"
  )]
  pub week_start:    String,
  #[serde(
    default = "default_row_limit"
  )]
  pub row_limit:     usize,
  #[serde(default = "default_view")]
  pub default_view:  String,
  #[serde(
    default = "default_agenda_length"
  )]
  pub agenda_length: u32,
  #[serde(default = "default_layout")]
  pub layout:        String,
  #[serde(default = "default_true")]
  pub color:         bool
}

impl Default for CalendarSettings {
  fn default() -> Self {
    Self {
      week_start:    default_week_start(),
      row_limit:     default_row_limit(),
      default_view:  default_view(),
      agenda_length:
        default_agenda_length(),
      layout:        default_layout(),
      color:         true
    }
  }
}

#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Serialize,
  Deserialize,
)]
pub struct Config {
  #[serde(default)]
  pub timezone:    Option<String>,
  #[serde(default)]
  pub calendar:    CalendarSettings,
  #[serde(skip)]
  pub loaded_file: Option<PathBuf>
}

impl Config {
  /// Loads the first config file found
  /// (`--config`, `$DAYGRID_CONFIG`,
  /// then the user config dir) or falls
  /// back to defaults.
  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    match resolve_config_path(
      config_override
    ) {
      | Some(path) => {
        info!(config = %path.display(), "loading config");
        Self::load_file(&path)
      }
      | None => {
        info!(
          "no config file found; using \
           defaults"
        );
        Ok(Self::default())
      }
    }
  }

  pub fn load_file(
    path: &Path
  ) -> anyhow::Result<Self> {
    let text =
      fs::read_to_string(path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;
    let mut cfg = Self::parse(&text)
      .with_context(|| {
        format!(
          "failed to parse {}",
          path.display()
        )
      })?;
    cfg.loaded_file =
      Some(path.to_path_buf());
    Ok(cfg)
  }

  pub fn parse(
    text: &str
  ) -> anyhow::Result<Self> {
    let mut cfg: Self =
      toml::from_str(text)
        .context("invalid TOML")?;
    cfg.sanitize();
    Ok(cfg)
  }

  /// Replaces unusable values from a
  /// file with defaults.
  pub fn sanitize(&mut self) {
    if let Some(raw) = &self.timezone
      && parse_timezone(raw, "config")
        .is_none()
    {
      warn!(timezone = %raw, "ignoring invalid timezone; using UTC");
      self.timezone = None;
    }

    let calendar = &mut self.calendar;
    if parse_weekday(&calendar.week_start)
      .is_none()
    {
      warn!(week_start = %calendar.week_start, "invalid week_start; using default");
      calendar.week_start =
        default_week_start();
    }

    if View::from_key(
      &calendar.default_view
    )
    .is_none()
    {
      warn!(default_view = %calendar.default_view, "invalid default_view; using default");
      calendar.default_view =
        default_view();
    }

    if calendar.agenda_length == 0 {
      warn!(
        "agenda_length must be \
         positive; using default"
      );
      calendar.agenda_length =
        default_agenda_length();
    }

    if Layout::from_key(&calendar.layout)
      .is_none()
    {
      warn!(layout = %calendar.layout, "invalid layout; using default");
      calendar.layout = default_layout();
    }
  }

  /// Applies `--rc key=value` pairs.
  /// Unlike file values, a bad override
  /// is an error.
  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .trim()
        .to_string();
      let value = v.trim();
      debug!(key = %key, value = %value, "applying override");
      self
        .apply_override(&key, value)
        .with_context(|| {
          format!(
            "invalid override \
             {key}={value}"
          )
        })?;
    }
    self.sanitize();
    Ok(())
  }

  fn apply_override(
    &mut self,
    key: &str,
    value: &str
  ) -> anyhow::Result<()> {
    let field = key
      .strip_prefix("calendar.")
      .unwrap_or(key);
    let calendar = &mut self.calendar;

    match field {
      | "timezone" => {
        parse_timezone(value, "override")
          .ok_or_else(|| {
            anyhow!(
              "unknown timezone"
            )
          })?;
        self.timezone =
          Some(value.to_string());
      }
      | "week_start" => {
        parse_weekday(value)
          .ok_or_else(|| {
            anyhow!(
              "expected a weekday name"
            )
          })?;
        calendar.week_start =
          value.to_ascii_lowercase();
      }
      | "row_limit" => {
        calendar.row_limit = value
          .parse()
          .context(
            "expected a non-negative \
             integer"
          )?;
      }
      | "default_view" => {
        let view: View =
          value.parse()?;
        calendar.default_view =
          view.as_key().to_string();
      }
      | "agenda_length" => {
        let length: u32 = value
          .parse()
          .context(
            "expected a positive \
             integer"
          )?;
        if length == 0 {
          return Err(anyhow!(
            "expected a positive \
             integer"
          ));
        }
        calendar.agenda_length = length;
      }
      | "layout" => {
        let layout: Layout =
          value.parse()?;
        calendar.layout =
          layout.as_key().to_string();
      }
      | "color" => {
        calendar.color =
          parse_bool(value)?;
      }
      | _ => {
        return Err(anyhow!(
          "unknown setting"
        ));
      }
    }
    Ok(())
  }

  pub fn week_start(&self) -> Weekday {
    parse_weekday(
      &self.calendar.week_start
    )
    .unwrap_or(Weekday::Mon)
  }

  pub fn default_view(&self) -> View {
    View::from_key(
      &self.calendar.default_view
    )
    .unwrap_or(View::Month)
  }

  pub fn layout(&self) -> Layout {
    Layout::from_key(
      &self.calendar.layout
    )
    .unwrap_or(Layout::Fixed)
  }

  pub fn level_limit(
    &self
  ) -> LevelLimit {
    LevelLimit::from_setting(
      self.calendar.row_limit
    )
  }

  pub fn agenda_length(&self) -> u32 {
    self.calendar.agenda_length.max(1)
  }

  pub fn timezone(&self) -> Tz {
    self
      .timezone
      .as_deref()
      .and_then(|raw| {
        parse_timezone(raw, "config")
      })
      .unwrap_or(Tz::UTC)
  }

  pub fn today(&self) -> NaiveDate {
    today_in(self.timezone())
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_config_path(
  override_path: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = override_path {
    return Some(path.to_path_buf());
  }

  if let Ok(env_path) =
    std::env::var(CONFIG_ENV)
  {
    let trimmed = env_path.trim();
    if trimmed.is_empty()
      || trimmed == "/dev/null"
    {
      return None;
    }
    return Some(PathBuf::from(trimmed));
  }

  let candidate = dirs::config_dir()?
    .join(CONFIG_DIR)
    .join(CONFIG_FILE);
  candidate.exists().then_some(candidate)
}

fn parse_bool(
  s: &str
) -> anyhow::Result<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Ok(true),
    | "0" | "n" | "no" | "off"
    | "false" => Ok(false),
    | other => {
      Err(anyhow!(
        "expected a boolean, got \
         `{other}`"
      ))
    }
  }
}
