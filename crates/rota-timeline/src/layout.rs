use serde::Serialize;

use crate::axis::{
  ColumnAxis,
  TimelineAxis
};
use crate::config::LayoutConfig;
use crate::item::ItemKind;
use crate::lanes::LanePlan;
use crate::selection::SelectionRange;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderCell {
  pub label: String,
  pub left:  f64,
  pub width: f64
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnCell {
  pub index:       usize,
  pub text:        String,
  pub title:       String,
  pub left:        f64,
  pub is_weekend:  bool,
  pub is_today:    bool,
  pub is_boundary: bool
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarGeometry {
  pub id:            String,
  pub kind:          ItemKind,
  pub label:         String,
  pub sublabel:      Option<String>,
  pub cancelled:     bool,
  pub lane:          usize,
  pub start_column:  usize,
  pub end_column:    usize,
  pub clipped_start: bool,
  pub clipped_end:   bool,
  /// Offsets relative to the grid origin, label column excluded.
  pub left:          f64,
  pub top:           f64,
  pub width:         f64,
  pub height:        f64
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayGeometry {
  /// The selection as the host holds it, before clipping.
  pub range:         SelectionRange,
  pub start_column:  usize,
  pub end_column:    usize,
  pub left:          f64,
  pub width:         f64,
  pub clipped_start: bool,
  pub clipped_end:   bool
}

/// Everything the renderer needs for one frame of the timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineLayout {
  pub header:        Vec<HeaderCell>,
  pub columns:       Vec<ColumnCell>,
  pub bars:          Vec<BarGeometry>,
  pub overlay:       Option<OverlayGeometry>,
  pub today_left:    Option<f64>,
  pub lane_count:    usize,
  pub cell_width:    f64,
  pub label_width:   f64,
  pub grid_width:    f64,
  pub total_width:   f64,
  pub body_height:   f64,
  pub header_height: f64
}

impl TimelineLayout {
  pub fn is_empty(&self) -> bool {
    self.columns.is_empty()
  }

  pub fn column_left(
    &self,
    index: usize
  ) -> f64 {
    index as f64 * self.cell_width
  }
}

/// Converts axis columns, lane assignments and the committed
/// selection into pixel geometry.
pub fn compute_layout(
  axis: &TimelineAxis,
  plan: &LanePlan<'_>,
  selection: Option<SelectionRange>,
  config: &LayoutConfig
) -> TimelineLayout {
  let cell = config.cell_width;
  let column_count = axis.column_count();
  let grid_width = cell * column_count as f64;

  let header = axis
    .header_spans()
    .into_iter()
    .map(|span| HeaderCell {
      label: span.label,
      left:  span.first_index as f64 * cell,
      width: span.span as f64 * cell
    })
    .collect::<Vec<_>>();

  let columns = axis
    .column_labels()
    .into_iter()
    .enumerate()
    .map(|(index, label)| ColumnCell {
      index,
      text: label.text,
      title: label.title,
      left: index as f64 * cell,
      is_weekend: label.is_weekend,
      is_today: label.is_today,
      is_boundary: label.is_boundary
    })
    .collect::<Vec<_>>();

  let today_left = columns
    .iter()
    .find(|column| column.is_today)
    .map(|column| column.left + cell / 2.0);

  let pitch = config.lane_height + config.lane_gap;
  let bars = plan
    .assignments()
    .map(|assignment| BarGeometry {
      id:            assignment.item.id.clone(),
      kind:          assignment.item.kind,
      label:         assignment.item.label.clone(),
      sublabel:      assignment
        .item
        .sublabel
        .clone(),
      cancelled:     assignment.item.is_cancelled(),
      lane:          assignment.lane,
      start_column:  assignment.start_column,
      end_column:    assignment.end_column,
      clipped_start: assignment.clipped_start,
      clipped_end:   assignment.clipped_end,
      left:          assignment.start_column as f64
        * cell,
      top:           assignment.lane as f64 * pitch
        + config.lane_gap / 2.0,
      width:         assignment.span() as f64 * cell,
      height:        config.lane_height
    })
    .collect::<Vec<_>>();

  let overlay =
    selection.and_then(|range| overlay(axis, range, cell));

  let lane_count = plan.lane_count();
  let body_height = (lane_count as f64 * pitch)
    .max(config.min_body_height);

  TimelineLayout {
    header,
    columns,
    bars,
    overlay,
    today_left,
    lane_count,
    cell_width: cell,
    label_width: config.label_width,
    grid_width,
    total_width: config.label_width + grid_width,
    body_height,
    header_height: config.header_height
  }
}

fn overlay(
  axis: &TimelineAxis,
  range: SelectionRange,
  cell: f64
) -> Option<OverlayGeometry> {
  let (window_start, window_end) = axis.window()?;
  let Some(visible) =
    range.intersect(window_start, window_end)
  else {
    tracing::trace!(
      %range,
      "selection lies outside the window"
    );
    return None;
  };
  let start_column =
    axis.nearest_column(visible.start())?;
  let end_column = axis
    .nearest_column(visible.end())?
    .max(start_column);
  let span = end_column - start_column + 1;

  Some(OverlayGeometry {
    range,
    start_column,
    end_column,
    left: start_column as f64 * cell,
    width: span as f64 * cell,
    clipped_start: range.start() < window_start,
    clipped_end: range.end() > window_end
  })
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::compute_layout;
  use crate::axis::{
    AxisOptions,
    DayAxis,
    TimelineAxis
  };
  use crate::config::{
    LayoutConfig,
    WeekendPolicy
  };
  use crate::item::IntervalItem;
  use crate::lanes::allocate_lanes;
  use crate::selection::SelectionRange;

  fn ymd(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  fn january() -> TimelineAxis {
    TimelineAxis::Days(DayAxis::from_dates(
      ymd(2025, 1, 1),
      ymd(2025, 1, 31),
      &AxisOptions {
        today:    ymd(2025, 1, 15),
        weekend:  WeekendPolicy::default(),
        max_days: 3_660
      }
    ))
  }

  fn sizes() -> LayoutConfig {
    LayoutConfig {
      cell_width: 30.0,
      label_width: 180.0,
      lane_height: 24.0,
      lane_gap: 6.0,
      min_body_height: 100.0,
      ..LayoutConfig::default()
    }
  }

  fn items() -> Vec<IntervalItem> {
    vec![
      IntervalItem::booking(
        "A",
        "2025-01-05",
        "2025-01-10",
        "Atlas"
      ),
      IntervalItem::booking(
        "B",
        "2025-01-08",
        "2025-01-12",
        "Borealis"
      )
      .with_status("cancelled"),
      IntervalItem::reservation(
        "R",
        "2025-01-20",
        "2025-01-22",
        "Leave"
      ),
    ]
  }

  #[test]
  fn bars_follow_columns_and_lanes() {
    let axis = january();
    let items = items();
    let plan = allocate_lanes(&axis, &items);
    let layout =
      compute_layout(&axis, &plan, None, &sizes());

    assert_eq!(layout.grid_width, 930.0);
    assert_eq!(layout.total_width, 1_110.0);
    assert_eq!(layout.header.len(), 1);
    assert_eq!(layout.header[0].width, 930.0);
    assert_eq!(layout.columns.len(), 31);

    let b = layout
      .bars
      .iter()
      .find(|bar| bar.id == "B")
      .expect("bar B");
    assert_eq!(b.left, 210.0);
    assert_eq!(b.width, 150.0);
    assert_eq!(b.lane, 1);
    assert_eq!(b.top, 33.0);
    assert!(b.cancelled);

    assert_eq!(layout.today_left, Some(435.0));
  }

  #[test]
  fn body_height_respects_minimum() {
    let axis = january();
    let plan = allocate_lanes(&axis, &[]);
    let layout =
      compute_layout(&axis, &plan, None, &sizes());
    assert_eq!(layout.lane_count, 1);
    assert_eq!(layout.body_height, 100.0);

    let items = (0..5)
      .map(|idx| {
        IntervalItem::booking(
          format!("b{idx}"),
          "2025-01-03",
          "2025-01-04",
          "Stacked"
        )
      })
      .collect::<Vec<_>>();
    let plan = allocate_lanes(&axis, &items);
    let layout =
      compute_layout(&axis, &plan, None, &sizes());
    assert_eq!(layout.lane_count, 5);
    assert_eq!(layout.body_height, 150.0);
  }

  #[test]
  fn overlay_is_clipped_to_the_window() {
    let axis = january();
    let plan = allocate_lanes(&axis, &[]);

    let partial = SelectionRange::new(
      ymd(2024, 12, 28),
      ymd(2025, 1, 2)
    );
    let layout = compute_layout(
      &axis,
      &plan,
      Some(partial),
      &sizes()
    );
    let overlay =
      layout.overlay.expect("partial overlay");
    assert_eq!(overlay.start_column, 0);
    assert_eq!(overlay.end_column, 1);
    assert_eq!(overlay.width, 60.0);
    assert!(overlay.clipped_start);
    assert!(!overlay.clipped_end);
    assert_eq!(overlay.range, partial);

    let outside = SelectionRange::new(
      ymd(2025, 3, 1),
      ymd(2025, 3, 4)
    );
    let layout = compute_layout(
      &axis,
      &plan,
      Some(outside),
      &sizes()
    );
    assert!(layout.overlay.is_none());
  }

  #[test]
  fn empty_axis_lays_out_nothing() {
    let axis =
      TimelineAxis::Days(DayAxis::empty());
    let items = items();
    let plan = allocate_lanes(&axis, &items);
    let layout = compute_layout(
      &axis,
      &plan,
      Some(SelectionRange::single(ymd(
        2025, 1, 3
      ))),
      &sizes()
    );
    assert!(layout.is_empty());
    assert!(layout.bars.is_empty());
    assert!(layout.overlay.is_none());
    assert!(layout.today_left.is_none());
    assert_eq!(layout.body_height, 100.0);
  }
}
