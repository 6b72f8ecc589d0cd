use crate::config::{
  AutoScrollConfig,
  LayoutConfig
};

/// A snapshot of the scroll container, taken by the driver at the
/// moment an event or frame is handled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportMetrics {
  /// Client-space x of the container's left edge.
  pub left:         f64,
  /// Visible width of the container.
  pub width:        f64,
  pub scroll_left:  f64,
  /// Full scrollable width of the content.
  pub scroll_width: f64
}

impl ViewportMetrics {
  pub fn max_scroll_left(&self) -> f64 {
    (self.scroll_width - self.width).max(0.0)
  }

  pub fn clamp_scroll(
    &self,
    value: f64
  ) -> f64 {
    value.clamp(0.0, self.max_scroll_left())
  }

  #[must_use]
  pub fn scrolled_to(
    mut self,
    scroll_left: f64
  ) -> Self {
    self.scroll_left = scroll_left;
    self
  }
}

fn content_x(
  client_x: f64,
  metrics: &ViewportMetrics,
  layout: &LayoutConfig
) -> f64 {
  client_x - metrics.left + metrics.scroll_left
    - layout.label_width
}

/// Maps a client-space x coordinate to a grid column, clamping
/// anything left or right of the grid to the nearest edge column.
///
/// Used while a gesture is already live, where the pointer may leave
/// the grid. `None` only when there are no columns.
pub fn column_at(
  client_x: f64,
  metrics: &ViewportMetrics,
  layout: &LayoutConfig,
  column_count: usize
) -> Option<usize> {
  let last = column_count.checked_sub(1)?;
  let raw = (content_x(client_x, metrics, layout)
    / layout.cell_width)
    .floor();
  if !raw.is_finite() || raw <= 0.0 {
    return Some(0);
  }
  Some((raw as usize).min(last))
}

/// The column actually under `client_x`, or `None` over the label
/// column or past the last day. Gestures and the context menu only
/// start from here.
pub fn grid_column_at(
  client_x: f64,
  metrics: &ViewportMetrics,
  layout: &LayoutConfig,
  column_count: usize
) -> Option<usize> {
  let x = content_x(client_x, metrics, layout);
  if !x.is_finite() || x < 0.0 {
    return None;
  }
  let column =
    (x / layout.cell_width).floor() as usize;
  (column < column_count).then_some(column)
}

/// Signed horizontal scroll step for one animation frame.
///
/// Zero outside the edge zone. Inside it the step grows linearly from
/// `min_step` at the zone's inner boundary to `max_step` at the edge;
/// a pointer dragged past the edge keeps the maximum.
pub fn edge_scroll_step(
  client_x: f64,
  metrics: &ViewportMetrics,
  config: &AutoScrollConfig
) -> f64 {
  if !config.enabled || metrics.width <= 0.0 {
    return 0.0;
  }
  let threshold = config
    .threshold
    .min(metrics.width / 2.0);
  if threshold <= 0.0 {
    return 0.0;
  }

  let from_left = client_x - metrics.left;
  let from_right =
    metrics.left + metrics.width - client_x;

  let (distance, direction) =
    if from_left < threshold {
      (from_left, -1.0)
    } else if from_right < threshold {
      (from_right, 1.0)
    } else {
      return 0.0;
    };

  let intensity = ((threshold - distance)
    / threshold)
    .clamp(0.0, 1.0);
  let step = config.min_step
    + (config.max_step - config.min_step)
      * intensity;
  direction * step
}
