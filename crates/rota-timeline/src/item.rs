use chrono::NaiveDate;
use serde::{
  Deserialize,
  Serialize
};

use crate::date::parse_date_bearing;

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
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
  Booking,
  Reservation
}

impl ItemKind {
  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Booking => "booking",
      | Self::Reservation => "reservation"
    }
  }
}

/// One bar on the timeline as handed over by the host.
///
/// Dates stay as the host's strings; they are parsed on every
/// layout pass and an item whose dates do not parse is skipped.
#[derive(
  Debug,
  Clone,
  PartialEq,
  Serialize,
  Deserialize,
)]
pub struct IntervalItem {
  pub id:       String,
  pub kind:     ItemKind,
  pub start:    String,
  pub end:      String,
  #[serde(default)]
  pub label:    String,
  #[serde(default)]
  pub sublabel: Option<String>,
  #[serde(default)]
  pub status:   Option<String>
}

impl IntervalItem {
  pub fn new(
    id: impl Into<String>,
    kind: ItemKind,
    start: impl Into<String>,
    end: impl Into<String>,
    label: impl Into<String>
  ) -> Self {
    Self {
      id: id.into(),
      kind,
      start: start.into(),
      end: end.into(),
      label: label.into(),
      sublabel: None,
      status: None
    }
  }

  pub fn booking(
    id: impl Into<String>,
    start: impl Into<String>,
    end: impl Into<String>,
    label: impl Into<String>
  ) -> Self {
    Self::new(
      id,
      ItemKind::Booking,
      start,
      end,
      label
    )
  }

  pub fn reservation(
    id: impl Into<String>,
    start: impl Into<String>,
    end: impl Into<String>,
    label: impl Into<String>
  ) -> Self {
    Self::new(
      id,
      ItemKind::Reservation,
      start,
      end,
      label
    )
  }

  #[must_use]
  pub fn with_sublabel(
    mut self,
    sublabel: impl Into<String>
  ) -> Self {
    self.sublabel = Some(sublabel.into());
    self
  }

  #[must_use]
  pub fn with_status(
    mut self,
    status: impl Into<String>
  ) -> Self {
    self.status = Some(status.into());
    self
  }

  /// Inclusive `(start, end)` with reversed input swapped.
  pub fn date_span(
    &self
  ) -> Option<(NaiveDate, NaiveDate)> {
    let start =
      parse_date_bearing(&self.start)?;
    let end = parse_date_bearing(&self.end)?;
    if start <= end {
      Some((start, end))
    } else {
      Some((end, start))
    }
  }

  pub fn is_cancelled(&self) -> bool {
    self.status.as_deref().is_some_and(
      |status| {
        status
          .trim()
          .eq_ignore_ascii_case("cancelled")
          || status
            .trim()
            .eq_ignore_ascii_case(
              "canceled"
            )
      }
    )
  }
}
