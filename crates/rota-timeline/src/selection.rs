use std::fmt;

use chrono::NaiveDate;
use serde::{
  Deserialize,
  Serialize
};

use crate::date::{
  format_iso,
  inclusive_day_count,
  parse_date_bearing
};

/// An inclusive date range with `start <= end`.
///
/// Every constructor normalizes, so a value of this type is always
/// ordered; reversed pairs from the host are swapped on the way in.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
)]
#[serde(from = "RawRange")]
pub struct SelectionRange {
  start: NaiveDate,
  end:   NaiveDate
}

#[derive(Deserialize)]
struct RawRange {
  start: NaiveDate,
  end:   NaiveDate
}

impl From<RawRange> for SelectionRange {
  fn from(raw: RawRange) -> Self {
    Self::new(raw.start, raw.end)
  }
}

impl SelectionRange {
  pub fn new(
    a: NaiveDate,
    b: NaiveDate
  ) -> Self {
    if a <= b {
      Self { start: a, end: b }
    } else {
      Self { start: b, end: a }
    }
  }

  pub fn single(day: NaiveDate) -> Self {
    Self {
      start: day,
      end:   day
    }
  }

  /// Smallest range covering two column spans.
  pub fn spanning(
    a: (NaiveDate, NaiveDate),
    b: (NaiveDate, NaiveDate)
  ) -> Self {
    let first = Self::new(a.0, a.1);
    let second = Self::new(b.0, b.1);
    Self {
      start: first.start.min(second.start),
      end:   first.end.max(second.end)
    }
  }

  /// Host bounds as strings. Either bound failing to parse means
  /// "no selection".
  pub fn parse(
    start: &str,
    end: &str
  ) -> Option<Self> {
    let start = parse_date_bearing(start)?;
    let end = parse_date_bearing(end)?;
    Some(Self::new(start, end))
  }

  pub fn parse_optional(
    start: Option<&str>,
    end: Option<&str>
  ) -> Option<Self> {
    match (start, end) {
      | (Some(start), Some(end)) => {
        Self::parse(start, end)
      }
      | (Some(only), None)
      | (None, Some(only)) => {
        parse_date_bearing(only)
          .map(Self::single)
      }
      | (None, None) => None
    }
  }

  pub fn start(&self) -> NaiveDate {
    self.start
  }

  pub fn end(&self) -> NaiveDate {
    self.end
  }

  #[must_use]
  pub fn normalized(self) -> Self {
    Self::new(self.start, self.end)
  }

  pub fn day_count(&self) -> i64 {
    inclusive_day_count(
      self.start, self.end
    )
  }

  pub fn contains(
    &self,
    date: NaiveDate
  ) -> bool {
    self.start <= date && date <= self.end
  }

  /// The part of this range inside `[window_start, window_end]`.
  pub fn intersect(
    &self,
    window_start: NaiveDate,
    window_end: NaiveDate
  ) -> Option<Self> {
    let window =
      Self::new(window_start, window_end);
    let start = self.start.max(window.start);
    let end = self.end.min(window.end);
    (start <= end)
      .then_some(Self { start, end })
  }

  pub fn to_iso_pair(
    &self
  ) -> (String, String) {
    (
      format_iso(self.start),
      format_iso(self.end)
    )
  }
}

impl fmt::Display for SelectionRange {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    if self.start == self.end {
      write!(f, "{}", format_iso(self.start))
    } else {
      write!(
        f,
        "{} – {}",
        format_iso(self.start),
        format_iso(self.end)
      )
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::SelectionRange;

  fn ymd(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn normalization_is_idempotent_and_symmetric()
  {
    let a = ymd(2025, 3, 10);
    let b = ymd(2025, 3, 5);

    let forward = SelectionRange::new(a, b);
    let backward = SelectionRange::new(b, a);
    assert_eq!(forward, backward);
    assert_eq!(
      forward.normalized(),
      forward
    );
    assert_eq!(forward.start(), b);
    assert_eq!(forward.end(), a);
  }

  #[test]
  fn malformed_bounds_mean_no_selection() {
    assert!(
      SelectionRange::parse(
        "2025-13-01",
        "2025-01-02"
      )
      .is_none()
    );
    assert_eq!(
      SelectionRange::parse_optional(
        Some("2025-01-02T08:00:00"),
        None
      ),
      Some(SelectionRange::single(ymd(
        2025, 1, 2
      )))
    );
  }

  #[test]
  fn intersect_clips_to_window() {
    let range = SelectionRange::new(
      ymd(2024, 12, 28),
      ymd(2025, 1, 3)
    );
    let clipped = range
      .intersect(
        ymd(2025, 1, 1),
        ymd(2025, 1, 31)
      )
      .expect("partial overlap");
    assert_eq!(
      clipped.start(),
      ymd(2025, 1, 1)
    );
    assert_eq!(clipped.day_count(), 3);

    assert!(
      range
        .intersect(
          ymd(2025, 2, 1),
          ymd(2025, 2, 28)
        )
        .is_none()
    );
  }

  #[test]
  fn deserializing_reversed_pair_normalizes()
  {
    let range: SelectionRange =
      serde_json::from_str(
        r#"{"start":"2025-03-10","end":"2025-03-05"}"#
      )
      .expect("decode range");
    assert_eq!(
      range.start(),
      ymd(2025, 3, 5)
    );
    assert_eq!(
      range.to_string(),
      "2025-03-05 – 2025-03-10"
    );
  }
}
