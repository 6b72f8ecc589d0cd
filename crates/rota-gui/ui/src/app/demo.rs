use chrono::{
  Datelike,
  NaiveDate
};
use rota_timeline::date::{
  add_days,
  first_day_of_month,
  format_iso,
  last_day_of_month
};
use rota_timeline::{
  IntervalItem,
  ItemKind,
  SelectionRange
};
use serde::Deserialize;

pub(crate) const DEMO_ITEMS_JSON: &str =
  include_str!("../../assets/demo_items.json");

/// Bundled sample data. Item bounds may be written as day offsets
/// from today (`"+3"`, `"-4"`) so the demo never goes stale.
#[derive(
  Debug, Clone, Default, PartialEq, Deserialize,
)]
pub(crate) struct DemoDocument {
  #[serde(default)]
  pub resource: String,
  #[serde(default)]
  pub items:    Vec<IntervalItem>
}

pub(crate) fn load_demo(
  raw: &str,
  today: NaiveDate
) -> DemoDocument {
  match serde_json::from_str::<DemoDocument>(
    raw
  ) {
    | Ok(mut document) => {
      for item in &mut document.items {
        item.start =
          resolve_offset(&item.start, today);
        item.end =
          resolve_offset(&item.end, today);
      }
      tracing::info!(
        resource = %document.resource,
        items = document.items.len(),
        "loaded demo items"
      );
      document
    }
    | Err(error) => {
      tracing::error!(
        %error,
        "failed parsing demo items; starting empty"
      );
      DemoDocument::default()
    }
  }
}

pub(crate) fn resolve_offset(
  raw: &str,
  today: NaiveDate
) -> String {
  let trimmed = raw.trim();
  if !trimmed.starts_with(['+', '-']) {
    return trimmed.to_string();
  }
  match trimmed.parse::<i64>() {
    | Ok(days) => {
      format_iso(add_days(today, days))
    }
    | Err(_) => trimmed.to_string()
  }
}

/// Whether `range` overlaps any item that still occupies the
/// resource.
pub(crate) fn conflicts(
  items: &[IntervalItem],
  range: SelectionRange
) -> bool {
  items
    .iter()
    .filter(|item| !item.is_cancelled())
    .filter_map(IntervalItem::date_span)
    .any(|(start, end)| {
      range.intersect(start, end).is_some()
    })
}

pub(crate) fn next_item_id(
  items: &[IntervalItem],
  kind: ItemKind
) -> String {
  let (prefix, floor) = match kind {
    | ItemKind::Booking => ("bk", 1000),
    | ItemKind::Reservation => ("rs", 2000)
  };
  let highest = items
    .iter()
    .filter_map(|item| {
      item
        .id
        .strip_prefix(prefix)?
        .strip_prefix('-')?
        .parse::<u32>()
        .ok()
    })
    .max()
    .unwrap_or(floor);
  format!("{prefix}-{}", highest + 1)
}

/// First day of the month `delta` months away from `anchor`'s.
pub(crate) fn shift_month(
  anchor: NaiveDate,
  delta: i32
) -> NaiveDate {
  let index = anchor.year() * 12
    + anchor.month0() as i32
    + delta;
  first_day_of_month(
    index.div_euclid(12),
    index.rem_euclid(12) as u32 + 1
  )
}

/// `months` whole months starting at `anchor`'s month.
pub(crate) fn window_for(
  anchor: NaiveDate,
  months: u32
) -> (NaiveDate, NaiveDate) {
  let start = first_day_of_month(
    anchor.year(),
    anchor.month()
  );
  let last = shift_month(
    start,
    months.max(1) as i32 - 1
  );
  (
    start,
    last_day_of_month(
      last.year(),
      last.month()
    )
  )
}
