use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use rota_timeline::{Granularity, SelectionRange};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
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
        let key = k.trim();
        if key.is_empty() {
            return Err(anyhow!("empty key in override: {s}"));
        }
        Ok(Self {
            key: key.to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "rota",
    version,
    about = "Rota: resource timeline lanes and previews",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Timeline config file; overrides ROTA_CONFIG and the default locations.
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Override one config key, e.g. `--set layout.cell_width=40`.
    #[arg(
        long = "set",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub overrides: Vec<KeyVal>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Draw the timeline in the terminal.
    Render(RenderArgs),
    /// Print lane assignments as JSON.
    Lanes(WindowArgs),
}

#[derive(Args, Debug, Clone)]
pub struct WindowArgs {
    /// Items file, JSON or TOML.
    #[arg(long = "items")]
    pub items: PathBuf,

    #[arg(long = "from")]
    pub from: String,

    #[arg(long = "to")]
    pub to: String,

    #[arg(long = "granularity", value_parser = parse_granularity)]
    pub granularity: Option<Granularity>,

    /// Pin "today" instead of reading the clock.
    #[arg(long = "today")]
    pub today: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub window: WindowArgs,

    /// Selection as `START..END` (either order) or a single date.
    #[arg(long = "select")]
    pub select: Option<String>,

    #[arg(long = "no-color")]
    pub no_color: bool,
}

fn parse_granularity(raw: &str) -> anyhow::Result<Granularity> {
    Granularity::from_key(raw).ok_or_else(|| anyhow!("unknown granularity: {raw} (day|month)"))
}

/// Parses `--select`; a value that does not parse means no selection.
pub fn parse_selection(raw: &str) -> Option<SelectionRange> {
    let parsed = match raw.split_once("..") {
        Some((start, end)) => SelectionRange::parse(start, end),
        None => SelectionRange::parse_optional(Some(raw), None),
    };
    if parsed.is_none() {
        debug!(raw = %raw, "selection argument did not parse; rendering without one");
    }
    parsed
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
        .with_thread_ids(true)
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
    use chrono::NaiveDate;
    use clap::Parser;

    use super::{Command, GlobalCli, KeyVal, parse_selection};

    #[test]
    fn key_val_requires_equals_and_key() {
        let kv: KeyVal = " layout.cell_width = 40 ".parse().expect("parse override");
        assert_eq!(kv.key, "layout.cell_width");
        assert_eq!(kv.value, "40");
        assert!("layout.cell_width".parse::<KeyVal>().is_err());
        assert!("=40".parse::<KeyVal>().is_err());
    }

    #[test]
    fn selection_accepts_either_order() {
        let range = parse_selection("2025-03-10..2025-03-05").expect("range");
        assert_eq!(range.start(), NaiveDate::from_ymd_opt(2025, 3, 5).expect("date"));
        assert_eq!(parse_selection("2025-03-07").map(|r| r.day_count()), Some(1));
        assert!(parse_selection("soon..later").is_none());
    }

    #[test]
    fn parses_subcommand_with_global_flags_after_it() {
        let cli = GlobalCli::try_parse_from([
            "rota",
            "render",
            "--items",
            "items.json",
            "--from",
            "2025-01-01",
            "--to",
            "2025-01-31",
            "--granularity",
            "month",
            "--set",
            "calendar.weekend=fri-sat",
            "-vv",
        ])
        .expect("parse cli");
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.overrides.len(), 1);
        match cli.command {
            Command::Render(args) => {
                assert_eq!(args.window.from, "2025-01-01");
                assert!(args.window.granularity.is_some());
            }
            Command::Lanes(_) => panic!("expected render"),
        }
    }
}
