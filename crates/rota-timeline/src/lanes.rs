use serde::Serialize;

use crate::axis::ColumnAxis;
use crate::item::IntervalItem;

/// An item placed on the grid: its clipped column span and the lane
/// it was stacked into.
#[derive(
  Debug, Clone, PartialEq, Serialize,
)]
pub struct LaneAssignment<'a> {
  pub item:         &'a IntervalItem,
  pub start_column: usize,
  pub end_column:   usize,
  pub lane:         usize,
  /// The item continues before the first visible column.
  pub clipped_start: bool,
  /// The item continues after the last visible column.
  pub clipped_end:  bool
}

impl LaneAssignment<'_> {
  pub fn span(&self) -> usize {
    self.end_column - self.start_column + 1
  }
}

#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Serialize,
)]
pub struct LanePlan<'a> {
  lanes:   Vec<Vec<LaneAssignment<'a>>>,
  dropped: usize
}

impl<'a> LanePlan<'a> {
  /// Never zero, so an empty grid still has a visible row.
  pub fn lane_count(&self) -> usize {
    self.lanes.len().max(1)
  }

  pub fn lanes(
    &self
  ) -> &[Vec<LaneAssignment<'a>>] {
    &self.lanes
  }

  pub fn assignments(
    &self
  ) -> impl Iterator<Item = &LaneAssignment<'a>>
  {
    self.lanes.iter().flatten()
  }

  pub fn visible_count(&self) -> usize {
    self.lanes.iter().map(Vec::len).sum()
  }

  /// Items skipped for bad dates or for lying outside the window.
  pub fn dropped_count(&self) -> usize {
    self.dropped
  }
}

/// Clips every item to the axis window and stacks the survivors into
/// the fewest lanes such that no two items in a lane share or touch
/// a column.
///
/// Items are taken in `(start_column, end_column)` order and each
/// goes to the lowest lane whose last end column is strictly before
/// its start column. For interval data this first-fit order uses
/// exactly as many lanes as the busiest column has items.
pub fn allocate_lanes<'a, A>(
  axis: &A,
  items: &'a [IntervalItem]
) -> LanePlan<'a>
where
  A: ColumnAxis + ?Sized
{
  let Some((window_start, window_end)) =
    axis.window()
  else {
    return LanePlan {
      lanes:   Vec::new(),
      dropped: items.len()
    };
  };

  let mut dropped = 0_usize;
  let mut placed = items
    .iter()
    .filter_map(|item| {
      let Some((start, end)) = item.date_span()
      else {
        tracing::debug!(
          id = %item.id,
          start = %item.start,
          end = %item.end,
          "dropping item with unparseable dates"
        );
        dropped += 1;
        return None;
      };
      if end < window_start || start > window_end
      {
        dropped += 1;
        return None;
      }

      let clipped_start = start < window_start;
      let clipped_end = end > window_end;
      let start = start.max(window_start);
      let end = end.min(window_end);

      let start_column = axis
        .column_of(start)
        .or_else(|| axis.nearest_column(start))?;
      let end_column = axis
        .column_of(end)
        .or_else(|| axis.nearest_column(end))?;

      Some(LaneAssignment {
        item,
        start_column,
        end_column: end_column.max(start_column),
        lane: 0,
        clipped_start,
        clipped_end
      })
    })
    .collect::<Vec<_>>();

  placed.sort_by_key(|assignment| {
    (
      assignment.start_column,
      assignment.end_column
    )
  });

  let mut lanes: Vec<Vec<LaneAssignment<'a>>> =
    Vec::new();
  for mut assignment in placed {
    let free_lane = lanes.iter().position(|lane| {
      lane.last().is_none_or(|last| {
        last.end_column < assignment.start_column
      })
    });
    match free_lane {
      | Some(index) => {
        assignment.lane = index;
        lanes[index].push(assignment);
      }
      | None => {
        assignment.lane = lanes.len();
        lanes.push(vec![assignment]);
      }
    }
  }

  tracing::trace!(
    items = items.len(),
    lanes = lanes.len(),
    dropped,
    "allocated timeline lanes"
  );

  LanePlan { lanes, dropped }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::{
    LaneAssignment,
    allocate_lanes
  };
  use crate::axis::{
    AxisOptions,
    DayAxis,
    MonthAxis
  };
  use crate::config::WeekendPolicy;
  use crate::item::IntervalItem;

  fn ymd(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  fn january() -> DayAxis {
    DayAxis::from_dates(
      ymd(2025, 1, 1),
      ymd(2025, 1, 31),
      &AxisOptions {
        today:    ymd(2025, 1, 15),
        weekend:  WeekendPolicy::default(),
        max_days: 3_660
      }
    )
  }

  fn find<'p, 'a>(
    assignments: &'p [&'p LaneAssignment<'a>],
    id: &str
  ) -> &'p LaneAssignment<'a> {
    assignments
      .iter()
      .copied()
      .find(|assignment| assignment.item.id == id)
      .expect("assignment present")
  }

  fn busiest_column(
    assignments: &[&LaneAssignment<'_>],
    columns: usize
  ) -> usize {
    (0..columns)
      .map(|column| {
        assignments
          .iter()
          .filter(|assignment| {
            assignment.start_column <= column
              && column <= assignment.end_column
          })
          .count()
      })
      .max()
      .unwrap_or(0)
  }

  #[test]
  fn overlapping_items_split_and_gap_shares() {
    let axis = january();
    let items = vec![
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
      ),
      IntervalItem::booking(
        "C",
        "2025-01-11",
        "2025-01-15",
        "Cygnus"
      ),
    ];
    let plan = allocate_lanes(&axis, &items);
    let assignments =
      plan.assignments().collect::<Vec<_>>();

    let a = find(&assignments, "A");
    let b = find(&assignments, "B");
    let c = find(&assignments, "C");
    assert_ne!(a.lane, b.lane);
    assert_eq!(a.lane, 0);
    assert_eq!(c.lane, a.lane);
    assert_eq!(plan.lane_count(), 2);
  }

  #[test]
  fn touching_endpoints_do_not_share_a_lane() {
    let axis = january();
    let items = vec![
      IntervalItem::booking(
        "A",
        "2025-01-05",
        "2025-01-10",
        "Atlas"
      ),
      IntervalItem::reservation(
        "R",
        "2025-01-10",
        "2025-01-12",
        "Leave"
      ),
    ];
    let plan = allocate_lanes(&axis, &items);
    assert_eq!(plan.lane_count(), 2);
  }

  #[test]
  fn clips_partial_items_and_drops_outside_ones()
  {
    let axis = january();
    let items = vec![
      IntervalItem::booking(
        "tail",
        "2025-01-28",
        "2025-02-05",
        "Tail"
      ),
      IntervalItem::booking(
        "head",
        "2024-12-20T08:00:00Z",
        "2025-01-02",
        "Head"
      ),
      IntervalItem::booking(
        "outside",
        "2025-02-01",
        "2025-02-05",
        "Outside"
      ),
      IntervalItem::booking(
        "broken",
        "2025-01-xx",
        "2025-01-05",
        "Broken"
      ),
    ];
    let plan = allocate_lanes(&axis, &items);
    let assignments =
      plan.assignments().collect::<Vec<_>>();

    assert_eq!(plan.visible_count(), 2);
    assert_eq!(plan.dropped_count(), 2);

    let tail = find(&assignments, "tail");
    assert_eq!(tail.start_column, 27);
    assert_eq!(tail.end_column, 30);
    assert_eq!(tail.span(), 4);
    assert!(tail.clipped_end);
    assert!(!tail.clipped_start);

    let head = find(&assignments, "head");
    assert_eq!(head.start_column, 0);
    assert_eq!(head.end_column, 1);
    assert!(head.clipped_start);
  }

  #[test]
  fn reversed_item_dates_are_tolerated() {
    let axis = january();
    let items = vec![IntervalItem::booking(
      "rev",
      "2025-01-09",
      "2025-01-03",
      "Reversed"
    )];
    let plan = allocate_lanes(&axis, &items);
    let assignment = plan
      .assignments()
      .next()
      .expect("placed");
    assert_eq!(assignment.start_column, 2);
    assert_eq!(assignment.end_column, 8);
  }

  #[test]
  fn empty_input_still_reserves_one_lane() {
    let axis = january();
    let plan = allocate_lanes(&axis, &[]);
    assert_eq!(plan.lane_count(), 1);
    assert!(plan.lanes().is_empty());

    let empty = DayAxis::empty();
    let items = vec![IntervalItem::booking(
      "A",
      "2025-01-05",
      "2025-01-10",
      "Atlas"
    )];
    let plan = allocate_lanes(&empty, &items);
    assert_eq!(plan.visible_count(), 0);
    assert_eq!(plan.dropped_count(), 1);
  }

  #[test]
  fn lanes_are_ordered_disjoint_and_minimal() {
    let axis = january();
    let spans = [
      (1, 4),
      (2, 2),
      (3, 9),
      (5, 6),
      (5, 5),
      (7, 20),
      (10, 12),
      (11, 11),
      (13, 31),
      (14, 15),
      (16, 18),
      (16, 16),
      (21, 25),
      (24, 28),
      (26, 26),
      (30, 31)
    ];
    let items = spans
      .iter()
      .enumerate()
      .map(|(idx, (start, end))| {
        IntervalItem::booking(
          format!("item-{idx}"),
          format!("2025-01-{start:02}"),
          format!("2025-01-{end:02}"),
          format!("Item {idx}")
        )
      })
      .collect::<Vec<_>>();

    let plan = allocate_lanes(&axis, &items);
    for lane in plan.lanes() {
      for pair in lane.windows(2) {
        assert!(
          pair[0].end_column
            < pair[1].start_column
        );
      }
    }

    let assignments =
      plan.assignments().collect::<Vec<_>>();
    assert_eq!(assignments.len(), items.len());
    assert_eq!(
      plan.lane_count(),
      busiest_column(&assignments, axis.len())
    );
  }

  #[test]
  fn month_axis_maps_items_to_month_columns() {
    let axis = MonthAxis::from_dates(
      ymd(2025, 1, 1),
      ymd(2025, 6, 30),
      &AxisOptions {
        today:    ymd(2025, 1, 15),
        weekend:  WeekendPolicy::default(),
        max_days: 3_660
      }
    );
    let items = vec![
      IntervalItem::booking(
        "q1",
        "2024-12-15",
        "2025-03-02",
        "Q1"
      ),
      IntervalItem::booking(
        "may",
        "2025-05-10",
        "2025-05-11",
        "May"
      ),
    ];
    let plan = allocate_lanes(&axis, &items);
    let assignments =
      plan.assignments().collect::<Vec<_>>();
    let q1 = find(&assignments, "q1");
    assert_eq!(
      (q1.start_column, q1.end_column),
      (0, 2)
    );
    assert!(q1.clipped_start);
    let may = find(&assignments, "may");
    assert_eq!(
      (may.start_column, may.end_column),
      (4, 4)
    );
    assert_eq!(plan.lane_count(), 1);
  }
}
