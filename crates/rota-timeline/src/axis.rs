use chrono::{
  Datelike,
  NaiveDate
};
use serde::Serialize;

use crate::config::{
  Granularity,
  TimelineConfig,
  WeekendPolicy
};
use crate::date::{
  add_days,
  first_day_of_month,
  inclusive_day_count,
  last_day_of_month,
  month_key,
  parse_date_bearing
};

/// Per-build inputs that come from the clock and from policy rather
/// than from the window itself.
#[derive(Debug, Clone, Copy)]
pub struct AxisOptions {
  pub today:    NaiveDate,
  pub weekend:  WeekendPolicy,
  pub max_days: u32
}

impl AxisOptions {
  pub fn from_config(
    config: &TimelineConfig
  ) -> Self {
    Self {
      today:    config.today(),
      weekend:  config.weekend_policy(),
      max_days: config
        .calendar
        .max_window_days
    }
  }
}

/// Anything the lane allocator and the selection controller can
/// index into: an ordered run of columns, each covering an
/// inclusive date span.
pub trait ColumnAxis {
  fn column_count(&self) -> usize;

  fn column_bounds(
    &self,
    index: usize
  ) -> Option<(NaiveDate, NaiveDate)>;

  fn column_of(
    &self,
    date: NaiveDate
  ) -> Option<usize>;

  fn window(
    &self
  ) -> Option<(NaiveDate, NaiveDate)> {
    let last =
      self.column_count().checked_sub(1)?;
    let (first, _) = self.column_bounds(0)?;
    let (_, end) = self.column_bounds(last)?;
    Some((first, end))
  }

  /// Like [`ColumnAxis::column_of`] but dates before or after the
  /// window land on the first or last column.
  fn nearest_column(
    &self,
    date: NaiveDate
  ) -> Option<usize> {
    let (first, last) = self.window()?;
    if date <= first {
      return Some(0);
    }
    if date >= last {
      return self
        .column_count()
        .checked_sub(1);
    }
    self.column_of(date).or_else(|| {
      (0..self.column_count()).find(
        |index| {
          self
            .column_bounds(*index)
            .is_some_and(|(_, end)| {
              date <= end
            })
        }
      )
    })
  }

  fn is_empty(&self) -> bool {
    self.column_count() == 0
  }
}

#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct CalendarDay {
  pub date:              NaiveDate,
  pub index:             usize,
  pub is_weekend:        bool,
  pub is_first_of_month: bool,
  pub is_today:          bool
}

#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct MonthSegment {
  pub year:        i32,
  pub month:       u32,
  pub label:       String,
  pub first_index: usize,
  pub day_count:   usize
}

#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Eq,
  Serialize,
)]
pub struct DayAxis {
  days:     Vec<CalendarDay>,
  segments: Vec<MonthSegment>
}

impl DayAxis {
  pub fn empty() -> Self {
    Self::default()
  }

  /// Builds the axis from the host's window strings. A bound that
  /// does not parse produces an empty axis.
  pub fn build(
    window_start: &str,
    window_end: &str,
    options: &AxisOptions
  ) -> Self {
    let (Some(start), Some(end)) = (
      parse_date_bearing(window_start),
      parse_date_bearing(window_end)
    ) else {
      tracing::debug!(
        window_start,
        window_end,
        "window bound did not parse; empty day axis"
      );
      return Self::empty();
    };
    Self::from_dates(start, end, options)
  }

  pub fn from_dates(
    start: NaiveDate,
    end: NaiveDate,
    options: &AxisOptions
  ) -> Self {
    let (start, mut end) = if start <= end {
      (start, end)
    } else {
      (end, start)
    };

    let limit =
      i64::from(options.max_days.max(1));
    if inclusive_day_count(start, end) > limit
    {
      let clamped =
        add_days(start, limit - 1);
      tracing::warn!(
        %start,
        %end,
        %clamped,
        max_days = options.max_days,
        "timeline window too long; clamping end"
      );
      end = clamped;
    }

    let mut days = Vec::with_capacity(
      inclusive_day_count(start, end)
        as usize
    );
    let mut cursor = start;
    while cursor <= end {
      let index = days.len();
      days.push(CalendarDay {
        date: cursor,
        index,
        is_weekend: options
          .weekend
          .is_weekend(cursor.weekday()),
        is_first_of_month: cursor.day() == 1,
        is_today: cursor == options.today
      });
      let Some(next) = cursor.succ_opt() else {
        break;
      };
      cursor = next;
    }

    let segments = month_segments(&days);
    tracing::trace!(
      days = days.len(),
      segments = segments.len(),
      "built day axis"
    );
    Self { days, segments }
  }

  pub fn days(&self) -> &[CalendarDay] {
    &self.days
  }

  pub fn segments(&self) -> &[MonthSegment] {
    &self.segments
  }

  pub fn len(&self) -> usize {
    self.days.len()
  }

  pub fn is_empty(&self) -> bool {
    self.days.is_empty()
  }

  pub fn day(
    &self,
    index: usize
  ) -> Option<&CalendarDay> {
    self.days.get(index)
  }
}

fn month_segments(
  days: &[CalendarDay]
) -> Vec<MonthSegment> {
  let multi_year = match (
    days.first(),
    days.last()
  ) {
    | (Some(first), Some(last)) => {
      first.date.year() != last.date.year()
    }
    | _ => false
  };

  let mut segments: Vec<MonthSegment> =
    Vec::new();
  for day in days {
    let (year, month) = month_key(day.date);
    match segments.last_mut() {
      | Some(segment)
        if segment.year == year
          && segment.month == month =>
      {
        segment.day_count += 1;
      }
      | _ => {
        segments.push(MonthSegment {
          year,
          month,
          label: month_label(
            day.date, multi_year, false
          ),
          first_index: day.index,
          day_count: 1
        });
      }
    }
  }
  segments
}

fn month_label(
  date: NaiveDate,
  with_year: bool,
  short: bool
) -> String {
  let pattern = match (short, with_year) {
    | (false, false) => "%B",
    | (false, true) => "%B %Y",
    | (true, false) => "%b",
    | (true, true) => "%b %Y"
  };
  date.format(pattern).to_string()
}

impl ColumnAxis for DayAxis {
  fn column_count(&self) -> usize {
    self.days.len()
  }

  fn column_bounds(
    &self,
    index: usize
  ) -> Option<(NaiveDate, NaiveDate)> {
    self
      .days
      .get(index)
      .map(|day| (day.date, day.date))
  }

  fn column_of(
    &self,
    date: NaiveDate
  ) -> Option<usize> {
    let first = self.days.first()?.date;
    let offset = (date - first).num_days();
    let index = usize::try_from(offset).ok()?;
    (index < self.days.len()).then_some(index)
  }
}

/// One column per calendar month.
#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct MonthColumn {
  pub year:       i32,
  pub month:      u32,
  pub first:      NaiveDate,
  pub last:       NaiveDate,
  pub index:      usize,
  pub label:      String,
  pub is_current: bool
}

#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct YearSegment {
  pub year:         i32,
  pub first_index:  usize,
  pub column_count: usize
}

#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Eq,
  Serialize,
)]
pub struct MonthAxis {
  columns: Vec<MonthColumn>
}

impl MonthAxis {
  pub fn build(
    window_start: &str,
    window_end: &str,
    options: &AxisOptions
  ) -> Self {
    let (Some(start), Some(end)) = (
      parse_date_bearing(window_start),
      parse_date_bearing(window_end)
    ) else {
      tracing::debug!(
        window_start,
        window_end,
        "window bound did not parse; empty month axis"
      );
      return Self::default();
    };
    Self::from_dates(start, end, options)
  }

  pub fn from_dates(
    start: NaiveDate,
    end: NaiveDate,
    options: &AxisOptions
  ) -> Self {
    let (start, end) = if start <= end {
      (start, end)
    } else {
      (end, start)
    };
    let max_columns =
      (options.max_days.max(31) / 28) as usize;
    let multi_year = start.year() != end.year();

    let mut columns = Vec::new();
    let mut year = start.year();
    let mut month = start.month();
    while (year, month) <= month_key(end) {
      if columns.len() >= max_columns {
        tracing::warn!(
          %start,
          %end,
          max_columns,
          "month window too long; truncating"
        );
        break;
      }
      let first =
        first_day_of_month(year, month);
      let last = last_day_of_month(year, month);
      columns.push(MonthColumn {
        year,
        month,
        first,
        last,
        index: columns.len(),
        label: month_label(
          first, multi_year, true
        ),
        is_current: first <= options.today
          && options.today <= last
      });
      if month == 12 {
        year = year.saturating_add(1);
        month = 1;
      } else {
        month += 1;
      }
    }

    Self { columns }
  }

  pub fn columns(&self) -> &[MonthColumn] {
    &self.columns
  }

  pub fn year_segments(
    &self
  ) -> Vec<YearSegment> {
    let mut segments: Vec<YearSegment> =
      Vec::new();
    for column in &self.columns {
      match segments.last_mut() {
        | Some(segment)
          if segment.year == column.year =>
        {
          segment.column_count += 1;
        }
        | _ => segments.push(YearSegment {
          year:         column.year,
          first_index:  column.index,
          column_count: 1
        })
      }
    }
    segments
  }
}

impl ColumnAxis for MonthAxis {
  fn column_count(&self) -> usize {
    self.columns.len()
  }

  fn column_bounds(
    &self,
    index: usize
  ) -> Option<(NaiveDate, NaiveDate)> {
    self
      .columns
      .get(index)
      .map(|column| (column.first, column.last))
  }

  fn column_of(
    &self,
    date: NaiveDate
  ) -> Option<usize> {
    let first = self.columns.first()?;
    let months = (date.year() - first.year)
      * 12
      + date.month() as i32
      - first.month as i32;
    let index = usize::try_from(months).ok()?;
    (index < self.columns.len())
      .then_some(index)
  }
}

/// A header cell spanning one or more columns.
#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct HeaderSpan {
  pub label:       String,
  pub first_index: usize,
  pub span:        usize
}

/// Per-column display flags shared by both granularities.
#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct ColumnLabel {
  pub text:       String,
  pub title:      String,
  pub is_weekend: bool,
  pub is_today:   bool,
  pub is_boundary: bool
}

/// The axis the component renders, in whichever granularity the
/// host configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineAxis {
  Days(DayAxis),
  Months(MonthAxis)
}

impl TimelineAxis {
  pub fn build(
    granularity: Granularity,
    window_start: &str,
    window_end: &str,
    options: &AxisOptions
  ) -> Self {
    match granularity {
      | Granularity::Day => {
        Self::Days(DayAxis::build(
          window_start,
          window_end,
          options
        ))
      }
      | Granularity::Month => {
        Self::Months(MonthAxis::build(
          window_start,
          window_end,
          options
        ))
      }
    }
  }

  pub fn granularity(&self) -> Granularity {
    match self {
      | Self::Days(_) => Granularity::Day,
      | Self::Months(_) => Granularity::Month
    }
  }

  fn inner(&self) -> &dyn ColumnAxis {
    match self {
      | Self::Days(axis) => {
        axis as &dyn ColumnAxis
      }
      | Self::Months(axis) => axis
    }
  }

  pub fn header_spans(
    &self
  ) -> Vec<HeaderSpan> {
    match self {
      | Self::Days(axis) => axis
        .segments()
        .iter()
        .map(|segment| HeaderSpan {
          label:       segment.label.clone(),
          first_index: segment.first_index,
          span:        segment.day_count
        })
        .collect(),
      | Self::Months(axis) => axis
        .year_segments()
        .into_iter()
        .map(|segment| HeaderSpan {
          label:       segment.year.to_string(),
          first_index: segment.first_index,
          span:        segment.column_count
        })
        .collect()
    }
  }

  pub fn column_labels(
    &self
  ) -> Vec<ColumnLabel> {
    match self {
      | Self::Days(axis) => axis
        .days()
        .iter()
        .map(|day| ColumnLabel {
          text:        day.date.day().to_string(),
          title:       day
            .date
            .format("%a %Y-%m-%d")
            .to_string(),
          is_weekend:  day.is_weekend,
          is_today:    day.is_today,
          is_boundary: day.is_first_of_month
        })
        .collect(),
      | Self::Months(axis) => axis
        .columns()
        .iter()
        .map(|column| ColumnLabel {
          text:        column.label.clone(),
          title:       column
            .first
            .format("%B %Y")
            .to_string(),
          is_weekend:  false,
          is_today:    column.is_current,
          is_boundary: column.month == 1
        })
        .collect()
    }
  }
}

impl ColumnAxis for TimelineAxis {
  fn column_count(&self) -> usize {
    self.inner().column_count()
  }

  fn column_bounds(
    &self,
    index: usize
  ) -> Option<(NaiveDate, NaiveDate)> {
    self.inner().column_bounds(index)
  }

  fn column_of(
    &self,
    date: NaiveDate
  ) -> Option<usize> {
    self.inner().column_of(date)
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    Weekday
  };

  use super::{
    AxisOptions,
    ColumnAxis,
    DayAxis,
    MonthAxis,
    TimelineAxis
  };
  use crate::config::{
    Granularity,
    WeekendPolicy
  };
  use crate::date::inclusive_day_count;

  fn ymd(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  fn options() -> AxisOptions {
    AxisOptions {
      today:    ymd(2025, 1, 15),
      weekend:  WeekendPolicy::default(),
      max_days: 3_660
    }
  }

  #[test]
  fn day_count_and_segments_cover_window() {
    let windows = [
      (ymd(2025, 1, 1), ymd(2025, 1, 31)),
      (ymd(2024, 11, 20), ymd(2025, 2, 3)),
      (ymd(2024, 2, 28), ymd(2024, 3, 1)),
      (ymd(2025, 6, 6), ymd(2025, 6, 6))
    ];
    for (start, end) in windows {
      let axis =
        DayAxis::from_dates(start, end, &options());
      assert_eq!(
        axis.len() as i64,
        inclusive_day_count(start, end)
      );
      let covered: usize = axis
        .segments()
        .iter()
        .map(|segment| segment.day_count)
        .sum();
      assert_eq!(covered, axis.len());

      let mut next_index = 0;
      for segment in axis.segments() {
        assert_eq!(
          segment.first_index,
          next_index
        );
        next_index += segment.day_count;
      }
    }
  }

  #[test]
  fn flags_today_weekend_and_month_start() {
    let axis = DayAxis::build(
      "2025-01-01",
      "2025-01-31T23:59:59Z",
      &options()
    );
    assert_eq!(axis.len(), 31);

    let first = axis.day(0).expect("day 0");
    assert!(first.is_first_of_month);
    assert!(!first.is_weekend);

    let saturday =
      axis.day(3).expect("jan 4");
    assert_eq!(
      saturday.date.format("%a").to_string(),
      "Sat"
    );
    assert!(saturday.is_weekend);

    let today_count = axis
      .days()
      .iter()
      .filter(|day| day.is_today)
      .count();
    assert_eq!(today_count, 1);
    assert!(
      axis.day(14).expect("jan 15").is_today
    );
  }

  #[test]
  fn weekend_policy_is_configurable() {
    let mut opts = options();
    opts.weekend =
      WeekendPolicy::friday_saturday();
    let axis = DayAxis::from_dates(
      ymd(2025, 1, 3),
      ymd(2025, 1, 5),
      &opts
    );
    let flags = axis
      .days()
      .iter()
      .map(|day| day.is_weekend)
      .collect::<Vec<_>>();
    assert_eq!(flags, vec![true, true, false]);
    assert!(
      opts.weekend.is_weekend(Weekday::Fri)
    );
  }

  #[test]
  fn unparseable_bounds_render_nothing() {
    let axis = DayAxis::build(
      "2025-01-01",
      "whenever",
      &options()
    );
    assert!(ColumnAxis::is_empty(&axis));
    assert!(axis.segments().is_empty());
    assert!(axis.window().is_none());
  }

  #[test]
  fn labels_carry_year_only_across_years() {
    let single = DayAxis::from_dates(
      ymd(2025, 1, 20),
      ymd(2025, 2, 10),
      &options()
    );
    let labels = single
      .segments()
      .iter()
      .map(|segment| segment.label.as_str())
      .collect::<Vec<_>>();
    assert_eq!(
      labels,
      vec!["January", "February"]
    );

    let spanning = DayAxis::from_dates(
      ymd(2024, 12, 20),
      ymd(2025, 1, 10),
      &options()
    );
    let labels = spanning
      .segments()
      .iter()
      .map(|segment| segment.label.as_str())
      .collect::<Vec<_>>();
    assert_eq!(
      labels,
      vec!["December 2024", "January 2025"]
    );
  }

  #[test]
  fn reversed_and_oversized_windows_are_repaired()
  {
    let reversed = DayAxis::from_dates(
      ymd(2025, 1, 10),
      ymd(2025, 1, 1),
      &options()
    );
    assert_eq!(reversed.len(), 10);

    let mut opts = options();
    opts.max_days = 30;
    let clamped = DayAxis::from_dates(
      ymd(2025, 1, 1),
      ymd(2030, 1, 1),
      &opts
    );
    assert_eq!(clamped.len(), 30);
  }

  #[test]
  fn nearest_column_clamps_outside_dates() {
    let axis = DayAxis::from_dates(
      ymd(2025, 1, 1),
      ymd(2025, 1, 31),
      &options()
    );
    assert_eq!(
      axis.nearest_column(ymd(2024, 12, 1)),
      Some(0)
    );
    assert_eq!(
      axis.nearest_column(ymd(2025, 3, 1)),
      Some(30)
    );
    assert_eq!(
      axis.column_of(ymd(2025, 1, 10)),
      Some(9)
    );
    assert_eq!(
      axis.column_of(ymd(2025, 2, 1)),
      None
    );
  }

  #[test]
  fn month_axis_spans_touched_months() {
    let axis = MonthAxis::from_dates(
      ymd(2024, 11, 15),
      ymd(2025, 2, 3),
      &options()
    );
    assert_eq!(axis.column_count(), 4);
    assert_eq!(
      axis.column_bounds(1),
      Some((ymd(2024, 12, 1), ymd(2024, 12, 31)))
    );
    assert_eq!(
      axis.column_of(ymd(2025, 2, 28)),
      Some(3)
    );
    assert!(
      axis.columns()[2].is_current
    );
    assert_eq!(
      axis.columns()[0].label,
      "Nov 2024"
    );

    let years = axis.year_segments();
    assert_eq!(years.len(), 2);
    assert_eq!(years[0].column_count, 2);
    assert_eq!(years[1].first_index, 2);
  }

  #[test]
  fn timeline_axis_dispatches_on_granularity()
  {
    let axis = TimelineAxis::build(
      Granularity::Month,
      "2025-01-01",
      "2025-12-31",
      &options()
    );
    assert_eq!(axis.column_count(), 12);
    assert_eq!(
      axis.granularity(),
      Granularity::Month
    );
    let spans = axis.header_spans();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].label, "2025");
    assert_eq!(spans[0].span, 12);
    assert_eq!(
      axis.column_labels()[0].text,
      "Jan"
    );
  }
}
