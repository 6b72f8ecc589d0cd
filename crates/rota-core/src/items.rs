use std::fs;
use std::path::Path;

use anyhow::{
  Context,
  anyhow
};
use rota_timeline::IntervalItem;
use serde::Deserialize;
use tracing::{
  debug,
  info
};

#[derive(Debug, Deserialize)]
struct ItemsDocument {
  #[serde(default)]
  items: Vec<IntervalItem>
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonItems {
  List(Vec<IntervalItem>),
  Document(ItemsDocument)
}

/// Reads items from a JSON array, a JSON `{ "items": [...] }` object
/// or a TOML file of `[[items]]` tables. The extension picks the
/// format; anything else is tried as JSON first.
#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn load_items(
  path: &Path
) -> anyhow::Result<Vec<IntervalItem>> {
  let text = fs::read_to_string(path)
    .with_context(|| {
      format!(
        "failed to read items file {}",
        path.display()
      )
    })?;

  let extension = path
    .extension()
    .map(|ext| {
      ext.to_string_lossy().to_ascii_lowercase()
    })
    .unwrap_or_default();

  let items = match extension.as_str() {
    | "json" => parse_json(&text),
    | "toml" => parse_toml(&text),
    | _ => {
      debug!(
        "unknown items extension; \
         sniffing"
      );
      parse_json(&text)
        .or_else(|_| parse_toml(&text))
    }
  }
  .with_context(|| {
    format!(
      "failed to parse items file {}",
      path.display()
    )
  })?;

  info!(count = items.len(), "loaded items");
  Ok(items)
}

fn parse_json(
  text: &str
) -> anyhow::Result<Vec<IntervalItem>> {
  let parsed =
    serde_json::from_str::<JsonItems>(text)
      .map_err(|err| {
        anyhow!("invalid items JSON: {err}")
      })?;
  Ok(match parsed {
    | JsonItems::List(items) => items,
    | JsonItems::Document(doc) => doc.items
  })
}

fn parse_toml(
  text: &str
) -> anyhow::Result<Vec<IntervalItem>> {
  let doc =
    toml::from_str::<ItemsDocument>(text)
      .map_err(|err| {
        anyhow!("invalid items TOML: {err}")
      })?;
  Ok(doc.items)
}
