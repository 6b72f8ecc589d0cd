pub mod cli;
pub mod commands;
pub mod config;
pub mod items;
pub mod render;

use std::ffi::OsString;
use std::io::{
  self,
  Write
};

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
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
    "starting rota CLI"
  );

  let mut stdout = io::stdout().lock();
  execute(cli, &mut stdout)?;
  stdout
    .flush()
    .context("failed to flush stdout")?;

  info!("done");
  Ok(())
}

/// Loads config and dispatches one parsed invocation, writing the
/// command's output to `out`.
pub fn execute<W: Write>(
  cli: cli::GlobalCli,
  out: &mut W
) -> anyhow::Result<()> {
  let loaded = config::load(
    cli.config.as_deref(),
    &cli.overrides
  )?;
  debug!(
    source = ?loaded.source,
    overrides = cli.overrides.len(),
    "resolved timeline config"
  );

  match cli.command {
    | cli::Command::Render(args) => {
      commands::render(
        &loaded.config,
        &args,
        out
      )
    }
    | cli::Command::Lanes(args) => {
      commands::lanes(
        &loaded.config,
        &args,
        out
      )
    }
  }
}
