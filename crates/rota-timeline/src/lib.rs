pub mod axis;
pub mod config;
pub mod controller;
pub mod date;
pub mod geometry;
pub mod item;
pub mod lanes;
pub mod layout;
pub mod selection;

pub use axis::{
  AxisOptions,
  CalendarDay,
  ColumnAxis,
  DayAxis,
  MonthAxis,
  MonthSegment,
  TimelineAxis
};
pub use config::{
  Granularity,
  InteractionMode,
  TimelineConfig,
  WeekendPolicy
};
pub use controller::{
  Effect,
  ListenerScope,
  MenuAction,
  PointerButton,
  PointerInput,
  SelectionController,
  WheelDeltaMode
};
pub use geometry::ViewportMetrics;
pub use item::{
  IntervalItem,
  ItemKind
};
pub use lanes::{
  LaneAssignment,
  LanePlan,
  allocate_lanes
};
pub use layout::{
  TimelineLayout,
  compute_layout
};
pub use selection::SelectionRange;
