use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use rota_timeline::TimelineConfig;
use tracing::{
  debug,
  info,
  trace
};

use crate::cli::KeyVal;

pub const CONFIG_ENV: &str = "ROTA_CONFIG";
const CONFIG_FILE: &str = "rota.toml";

#[derive(Debug, Clone)]
pub struct LoadedConfig {
  pub config: TimelineConfig,
  pub source: Option<PathBuf>
}

/// Resolves, reads and merges the timeline config.
///
/// Overrides are applied on the TOML tree before decoding so they go
/// through the same defaults and repair as file values.
#[tracing::instrument(skip(
  config_override,
  overrides
))]
pub fn load(
  config_override: Option<&Path>,
  overrides: &[KeyVal]
) -> anyhow::Result<LoadedConfig> {
  let source =
    resolve_config_path(config_override)?;

  let mut table = match &source {
    | Some(path) => {
      info!(config = %path.display(), "loading timeline config");
      read_table(path)?
    }
    | None => {
      debug!(
        "no config file found; using \
         defaults"
      );
      toml::Table::new()
    }
  };

  for kv in overrides {
    apply_override(&mut table, kv)?;
  }

  let text = toml::to_string(&table)
    .context(
      "failed to re-encode merged \
       config"
    )?;
  let config =
    TimelineConfig::from_toml_str(&text)
      .with_context(|| match &source {
        | Some(path) => format!(
          "invalid timeline config {}",
          path.display()
        ),
        | None => {
          "invalid config override"
            .to_string()
        }
      })?;

  Ok(LoadedConfig { config, source })
}

fn read_table(
  path: &Path
) -> anyhow::Result<toml::Table> {
  let text = fs::read_to_string(path)
    .with_context(|| {
      format!(
        "failed to read {}",
        path.display()
      )
    })?;
  toml::from_str::<toml::Table>(&text)
    .with_context(|| {
      format!(
        "failed to parse {}",
        path.display()
      )
    })
}

/// Sets a dotted key such as `layout.cell_width`. The value is read
/// as a TOML literal, falling back to a plain string.
pub fn apply_override(
  table: &mut toml::Table,
  kv: &KeyVal
) -> anyhow::Result<()> {
  let mut path =
    kv.key.split('.').map(str::trim);
  let mut leaf =
    path.next().ok_or_else(|| {
      anyhow!("empty override key")
    })?;
  let mut cursor = table;

  for segment in path {
    let entry = cursor
      .entry(leaf.to_string())
      .or_insert_with(|| {
        toml::Value::Table(
          toml::Table::new()
        )
      });
    cursor = entry
      .as_table_mut()
      .ok_or_else(|| {
        anyhow!(
          "override {} descends into \
           non-table key {leaf}",
          kv.key
        )
      })?;
    leaf = segment;
  }

  if leaf.is_empty() {
    return Err(anyhow!(
      "override key {} has an empty \
       segment",
      kv.key
    ));
  }

  let value = parse_literal(&kv.value);
  trace!(key = %kv.key, value = %value, "applying config override");
  cursor.insert(leaf.to_string(), value);
  Ok(())
}

fn parse_literal(
  raw: &str
) -> toml::Value {
  toml::from_str::<toml::Table>(&format!(
    "value = {raw}"
  ))
  .ok()
  .and_then(|mut doc| doc.remove("value"))
  .unwrap_or_else(|| {
    toml::Value::String(raw.to_string())
  })
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_config_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    let path = expand_tilde(path);
    if !path.exists() {
      return Err(anyhow!(
        "config file {} does not exist",
        path.display()
      ));
    }
    return Ok(Some(path));
  }

  if let Ok(env_path) =
    std::env::var(CONFIG_ENV)
  {
    if env_path.is_empty()
      || env_path == "/dev/null"
    {
      return Ok(None);
    }
    return Ok(Some(expand_tilde(
      Path::new(&env_path)
    )));
  }

  let local = PathBuf::from(CONFIG_FILE);
  if local.exists() {
    return Ok(Some(local));
  }

  if let Some(dir) = dirs::config_dir() {
    let candidate =
      dir.join("rota").join(CONFIG_FILE);
    if candidate.exists() {
      return Ok(Some(candidate));
    }
  }

  Ok(None)
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use std::fs;

  use rota_timeline::InteractionMode;
  use tempfile::tempdir;

  use super::{
    apply_override,
    load
  };
  use crate::cli::KeyVal;

  fn kv(raw: &str) -> KeyVal {
    raw.parse().expect("override")
  }

  #[test]
  fn overrides_create_nested_tables() {
    let mut table = toml::Table::new();
    apply_override(
      &mut table,
      &kv("layout.cell_width=40")
    )
    .expect("numeric override");
    apply_override(
      &mut table,
      &kv("calendar.weekend=fri-sat")
    )
    .expect("string override");

    let layout = table["layout"]
      .as_table()
      .expect("layout table");
    assert_eq!(
      layout["cell_width"].as_integer(),
      Some(40)
    );
    assert_eq!(
      table["calendar"]["weekend"].as_str(),
      Some("fri-sat")
    );
  }

  #[test]
  fn override_cannot_descend_into_scalar() {
    let mut table = toml::Table::new();
    apply_override(&mut table, &kv("layout=1"))
      .expect("scalar");
    assert!(
      apply_override(
        &mut table,
        &kv("layout.cell_width=40")
      )
      .is_err()
    );
  }

  #[test]
  fn file_and_overrides_merge() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("rota.toml");
    fs::write(
      &path,
      "[interaction]\nmode = \"click-click\"\n\n[layout]\ncell_width = 30.0\n"
    )
    .expect("write config");

    let loaded = load(
      Some(&path),
      &[kv("layout.label_width=120.5")]
    )
    .expect("load config");
    assert_eq!(
      loaded.config.interaction.mode,
      InteractionMode::ClickClick
    );
    assert_eq!(
      loaded.config.layout.cell_width,
      30.0
    );
    assert_eq!(
      loaded.config.layout.label_width,
      120.5
    );
    assert_eq!(
      loaded.source.as_deref(),
      Some(path.as_path())
    );
  }

  #[test]
  fn missing_explicit_config_is_an_error() {
    let temp = tempdir().expect("tempdir");
    let missing = temp.path().join("nope.toml");
    assert!(load(Some(&missing), &[]).is_err());
  }
}
