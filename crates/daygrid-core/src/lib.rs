pub mod cli;
pub mod commands;
pub mod config;
pub mod dates;
pub mod datetime;
pub mod event;
pub mod levels;
pub mod range;
pub mod render;
pub mod row;
pub mod segment;
pub mod source;
pub mod spanning;
pub mod views;

use std::ffi::OsString;

use clap::Parser;
use tracing::{
  debug,
  info
};

pub use event::{
  Accessors,
  CalendarEvent,
  CalendarEventFields,
  EventFields
};
pub use levels::{
  LevelLimit,
  Levels
};
pub use segment::{
  Segment,
  Window
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting daygrid"
  );
  debug!(?cli.rc_overrides, "rc overrides");

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  )?;

  let renderer =
    render::Renderer::new(&cfg);

  commands::dispatch(
    &cfg,
    &renderer,
    cli.command
  )?;

  info!("done");
  Ok(())
}
