use std::io::Write;

use anyhow::{
  Context,
  anyhow
};
use rota_timeline::date::{
  format_iso,
  parse_date_bearing
};
use rota_timeline::{
  AxisOptions,
  ColumnAxis,
  IntervalItem,
  LanePlan,
  TimelineAxis,
  TimelineConfig,
  allocate_lanes,
  compute_layout
};
use serde::Serialize;
use tracing::{
  debug,
  info,
  warn
};

use crate::cli::{
  RenderArgs,
  WindowArgs,
  parse_selection
};
use crate::items::load_items;
use crate::render::Renderer;

/// Axis and items for one invocation; the lane plan borrows from the
/// items, so they live here.
#[derive(Debug)]
pub struct Prepared {
  pub axis:  TimelineAxis,
  pub items: Vec<IntervalItem>
}

impl Prepared {
  pub fn plan(&self) -> LanePlan<'_> {
    allocate_lanes(&self.axis, &self.items)
  }
}

#[tracing::instrument(skip(config, args))]
pub fn prepare(
  config: &TimelineConfig,
  args: &WindowArgs
) -> anyhow::Result<Prepared> {
  let items = load_items(&args.items)?;

  let mut options =
    AxisOptions::from_config(config);
  if let Some(raw) = &args.today {
    options.today = parse_date_bearing(raw)
      .ok_or_else(|| {
        anyhow!("invalid --today date: {raw}")
      })?;
  }

  let granularity = args
    .granularity
    .unwrap_or(config.calendar.granularity);
  let axis = TimelineAxis::build(
    granularity,
    &args.from,
    &args.to,
    &options
  );
  if axis.is_empty() {
    warn!(
      from = %args.from,
      to = %args.to,
      "window did not parse; nothing to lay out"
    );
  }

  debug!(
    columns = axis.column_count(),
    items = items.len(),
    "prepared timeline"
  );
  Ok(Prepared { axis, items })
}

#[tracing::instrument(skip_all)]
pub fn render<W: Write>(
  config: &TimelineConfig,
  args: &RenderArgs,
  out: &mut W
) -> anyhow::Result<()> {
  let prepared =
    prepare(config, &args.window)?;
  let plan = prepared.plan();
  let selection = args
    .select
    .as_deref()
    .and_then(parse_selection);

  let layout = compute_layout(
    &prepared.axis,
    &plan,
    selection,
    &Renderer::layout_config(
      prepared.axis.granularity()
    )
  );

  Renderer::new(!args.no_color)
    .write_timeline(
      &mut *out,
      &layout,
      plan.dropped_count()
    )
    .context("failed to write timeline")?;

  info!(
    lanes = plan.lane_count(),
    visible = plan.visible_count(),
    "rendered timeline"
  );
  Ok(())
}

#[derive(Debug, Serialize)]
pub struct LaneReport {
  pub window_start: Option<String>,
  pub window_end:   Option<String>,
  pub granularity:  String,
  pub lane_count:   usize,
  pub dropped:      usize,
  pub lanes:        Vec<Vec<LaneEntry>>
}

#[derive(Debug, Serialize)]
pub struct LaneEntry {
  pub id:            String,
  pub kind:          String,
  pub label:         String,
  pub lane:          usize,
  pub start_column:  usize,
  pub end_column:    usize,
  pub start:         String,
  pub end:           String,
  pub clipped_start: bool,
  pub clipped_end:   bool
}

pub fn lane_report(
  prepared: &Prepared
) -> LaneReport {
  let plan = prepared.plan();
  let window = prepared.axis.window();
  let bounds = |column: usize, end: bool| {
    prepared
      .axis
      .column_bounds(column)
      .map(|(first, last)| {
        format_iso(if end { last } else { first })
      })
      .unwrap_or_default()
  };

  let lanes = plan
    .lanes()
    .iter()
    .map(|lane| {
      lane
        .iter()
        .map(|assignment| LaneEntry {
          id:            assignment.item.id.clone(),
          kind:          assignment
            .item
            .kind
            .as_key()
            .to_string(),
          label:         assignment
            .item
            .label
            .clone(),
          lane:          assignment.lane,
          start_column:  assignment.start_column,
          end_column:    assignment.end_column,
          start:         bounds(
            assignment.start_column,
            false
          ),
          end:           bounds(
            assignment.end_column,
            true
          ),
          clipped_start: assignment.clipped_start,
          clipped_end:   assignment.clipped_end
        })
        .collect()
    })
    .collect();

  LaneReport {
    window_start: window
      .map(|(start, _)| format_iso(start)),
    window_end: window
      .map(|(_, end)| format_iso(end)),
    granularity: prepared
      .axis
      .granularity()
      .as_key()
      .to_string(),
    lane_count: plan.lane_count(),
    dropped: plan.dropped_count(),
    lanes
  }
}

#[tracing::instrument(skip_all)]
pub fn lanes<W: Write>(
  config: &TimelineConfig,
  args: &WindowArgs,
  out: &mut W
) -> anyhow::Result<()> {
  let prepared = prepare(config, args)?;
  let report = lane_report(&prepared);
  serde_json::to_writer_pretty(
    &mut *out, &report
  )
  .context("failed to write lane report")?;
  writeln!(out)?;
  info!(
    lanes = report.lane_count,
    dropped = report.dropped,
    "wrote lane report"
  );
  Ok(())
}
