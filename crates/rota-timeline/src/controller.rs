use chrono::NaiveDate;
use serde::{
  Deserialize,
  Serialize
};

use crate::axis::ColumnAxis;
use crate::config::{
  AutoScrollConfig,
  InteractionMode,
  LayoutConfig,
  TimelineConfig
};
use crate::geometry::{
  ViewportMetrics,
  column_at,
  edge_scroll_step,
  grid_column_at
};
use crate::selection::SelectionRange;

/// Global listener groups the driver attaches while a transient
/// state is live.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
)]
pub enum ListenerScope {
  /// Pointer-move, pointer-up and key-down on the window.
  Drag,
  /// Outside pointer-down and key-down on the window.
  Menu
}

/// What the driver must do after a transition. Effects are applied
/// in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
  Subscribe(ListenerScope),
  Unsubscribe(ListenerScope),
  RequestFrame,
  CancelFrame,
  ScrollTo(f64),
  PreventDefault,
  SelectionChanged(SelectionRange),
  SelectionPreview(SelectionRange),
  SelectionCleared,
  MenuOpened,
  MenuClosed,
  InvokeAction(String)
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum PointerButton {
  Primary,
  Secondary,
  Other
}

impl PointerButton {
  /// Maps the DOM `MouseEvent.button` code.
  pub fn from_dom(code: i16) -> Self {
    match code {
      | 0 => Self::Primary,
      | 2 => Self::Secondary,
      | _ => Self::Other
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
  pub client_x: f64,
  pub client_y: f64,
  pub button:   PointerButton,
  /// Event timestamp; identical for every listener that sees the
  /// same DOM event.
  pub stamp:    f64
}

impl PointerInput {
  pub fn primary(
    client_x: f64,
    client_y: f64,
    stamp: f64
  ) -> Self {
    Self {
      client_x,
      client_y,
      button: PointerButton::Primary,
      stamp
    }
  }

  pub fn secondary(
    client_x: f64,
    client_y: f64,
    stamp: f64
  ) -> Self {
    Self {
      client_x,
      client_y,
      button: PointerButton::Secondary,
      stamp
    }
  }
}

/// Unit of a wheel delta, as reported by `WheelEvent.deltaMode`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default,
)]
pub enum WheelDeltaMode {
  #[default]
  Pixel,
  Line,
  Page
}

impl WheelDeltaMode {
  pub fn from_dom(code: u32) -> Self {
    match code {
      | 1 => Self::Line,
      | 2 => Self::Page,
      | _ => Self::Pixel
    }
  }
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
pub struct MenuAction {
  pub id:       String,
  pub label:    String,
  #[serde(default)]
  pub disabled: bool
}

impl MenuAction {
  pub fn new(
    id: impl Into<String>,
    label: impl Into<String>
  ) -> Self {
    Self {
      id:       id.into(),
      label:    label.into(),
      disabled: false
    }
  }

  #[must_use]
  pub fn disabled(
    mut self,
    disabled: bool
  ) -> Self {
    self.disabled = disabled;
    self
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragGesture {
  anchor: (NaiveDate, NaiveDate),
  column: usize,
  last_x: f64,
  /// Set once the pointer crosses into another column.
  moved:  bool
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragState {
  Idle,
  Active(DragGesture)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextMenuState {
  pub x:       f64,
  pub y:       f64,
  pub range:   SelectionRange,
  pub actions: Vec<MenuAction>
}

#[derive(Debug, Clone, PartialEq)]
pub enum MenuState {
  Closed,
  Open(ContextMenuState)
}

/// Transient interaction state of one timeline instance.
///
/// Every public transition returns the [`Effect`]s the driver must
/// apply. Listener scopes and the frame request are tracked here so
/// each acquire has exactly one matching release, whichever path
/// leaves the state.
#[derive(Debug, Clone)]
pub struct SelectionController {
  mode:          InteractionMode,
  layout:        LayoutConfig,
  auto_scroll:   AutoScrollConfig,
  wheel_remap:   bool,
  committed:     Option<SelectionRange>,
  pending:       Option<SelectionRange>,
  click_anchor:  Option<(NaiveDate, NaiveDate)>,
  drag:          DragState,
  menu:          MenuState,
  frame_pending: bool,
  swallow_stamp: Option<f64>,
  torn_down:     bool
}

impl SelectionController {
  pub fn new(config: &TimelineConfig) -> Self {
    Self {
      mode:          config.interaction.mode,
      layout:        config.layout.clone(),
      auto_scroll:   config.auto_scroll.clone(),
      wheel_remap:   config
        .interaction
        .wheel_remap,
      committed:     None,
      pending:       None,
      click_anchor:  None,
      drag:          DragState::Idle,
      menu:          MenuState::Closed,
      frame_pending: false,
      swallow_stamp: None,
      torn_down:     false
    }
  }

  /// Picks up a changed config between renders. Switching mode drops
  /// a half-finished click-click anchor.
  pub fn reconfigure(
    &mut self,
    config: &TimelineConfig
  ) {
    if config.interaction.mode != self.mode {
      tracing::debug!(
        from = self.mode.as_key(),
        to = config.interaction.mode.as_key(),
        "interaction mode changed"
      );
      self.click_anchor = None;
    }
    self.mode = config.interaction.mode;
    self.layout = config.layout.clone();
    self.auto_scroll = config.auto_scroll.clone();
    self.wheel_remap =
      config.interaction.wheel_remap;
  }

  /// Mirrors the host's committed selection, read on every render.
  ///
  /// A host that drops its selection (`Some` to `None`) has cleared
  /// it: any click anchor, gesture or open menu goes with it. The
  /// returned effects only release resources; nothing is echoed back
  /// to the host.
  pub fn sync_committed(
    &mut self,
    selection: Option<SelectionRange>
  ) -> Vec<Effect> {
    let mut effects = Vec::new();
    let dropped =
      self.committed.is_some() && selection.is_none();
    self.committed = selection;
    if dropped && !self.torn_down {
      tracing::debug!(
        anchored = self.click_anchor.is_some(),
        dragging = self.is_dragging(),
        "host cleared the selection"
      );
      self.reset_into(&mut effects);
    }
    effects
  }

  pub fn mode(&self) -> InteractionMode {
    self.mode
  }

  /// The range to draw: the in-drag copy while a gesture is live,
  /// otherwise the committed one.
  pub fn selection(
    &self
  ) -> Option<SelectionRange> {
    self.pending.or(self.committed)
  }

  pub fn committed(
    &self
  ) -> Option<SelectionRange> {
    self.committed
  }

  pub fn click_anchor(
    &self
  ) -> Option<(NaiveDate, NaiveDate)> {
    self.click_anchor
  }

  pub fn drag(&self) -> &DragState {
    &self.drag
  }

  pub fn is_dragging(&self) -> bool {
    matches!(self.drag, DragState::Active(_))
  }

  pub fn menu(
    &self
  ) -> Option<&ContextMenuState> {
    match &self.menu {
      | MenuState::Open(menu) => Some(menu),
      | MenuState::Closed => None
    }
  }

  pub fn frame_pending(&self) -> bool {
    self.frame_pending
  }

  pub fn is_torn_down(&self) -> bool {
    self.torn_down
  }

  /// Pointer-down over the grid.
  pub fn pointer_down<A>(
    &mut self,
    input: PointerInput,
    metrics: &ViewportMetrics,
    axis: &A
  ) -> Vec<Effect>
  where
    A: ColumnAxis + ?Sized
  {
    let mut effects = Vec::new();
    if self.torn_down
      || self.swallow_stamp == Some(input.stamp)
    {
      return effects;
    }

    if self.menu().is_some() {
      if input.button == PointerButton::Primary
      {
        self.swallow_stamp = Some(input.stamp);
        self.close_menu_into(&mut effects);
      }
      return effects;
    }

    if input.button != PointerButton::Primary {
      return effects;
    }

    let Some((column, bounds)) = self.grid_hit(
      input.client_x,
      metrics,
      axis
    ) else {
      return effects;
    };

    match self.mode {
      | InteractionMode::ClickClick => {
        self.click(bounds, &mut effects);
      }
      | InteractionMode::Drag
      | InteractionMode::DeferredCommit => {
        self.begin_drag(
          column,
          bounds,
          input.client_x,
          &mut effects
        );
      }
    }
    effects
  }

  /// Pointer movement anywhere in the window while a drag is live.
  pub fn pointer_move<A>(
    &mut self,
    client_x: f64,
    metrics: &ViewportMetrics,
    axis: &A
  ) -> Vec<Effect>
  where
    A: ColumnAxis + ?Sized
  {
    let mut effects = Vec::new();
    if self.torn_down {
      return effects;
    }
    let DragState::Active(gesture) = &mut self.drag
    else {
      return effects;
    };
    gesture.last_x = client_x;

    if let Some((column, bounds)) =
      self.hit(client_x, metrics, axis)
    {
      self.track_column(
        column,
        bounds,
        &mut effects
      );
    }
    effects
  }

  /// Pointer-up anywhere in the window: ends the gesture and commits
  /// the range under the release point.
  pub fn pointer_up<A>(
    &mut self,
    client_x: f64,
    metrics: &ViewportMetrics,
    axis: &A
  ) -> Vec<Effect>
  where
    A: ColumnAxis + ?Sized
  {
    let mut effects = Vec::new();
    if self.torn_down || !self.is_dragging() {
      return effects;
    }

    if let Some((column, bounds)) =
      self.hit(client_x, metrics, axis)
    {
      self.track_column_silently(column, bounds);
    }

    let moved = match &self.drag {
      | DragState::Active(gesture) => {
        gesture.moved
      }
      | DragState::Idle => false
    };
    self.end_drag(&mut effects);

    if let Some(range) = self.pending.take() {
      tracing::debug!(
        %range,
        moved,
        mode = self.mode.as_key(),
        "drag committed"
      );
      self.committed = Some(range);
      effects
        .push(Effect::SelectionChanged(range));
    }
    effects
  }

  /// One animation frame of edge auto-scroll.
  pub fn frame<A>(
    &mut self,
    metrics: &ViewportMetrics,
    axis: &A
  ) -> Vec<Effect>
  where
    A: ColumnAxis + ?Sized
  {
    self.frame_pending = false;
    let mut effects = Vec::new();
    if self.torn_down {
      return effects;
    }
    let last_x = match &self.drag {
      | DragState::Active(gesture) => {
        gesture.last_x
      }
      | DragState::Idle => return effects
    };

    let step = edge_scroll_step(
      last_x,
      metrics,
      &self.auto_scroll
    );
    if step != 0.0 {
      let target = metrics
        .clamp_scroll(metrics.scroll_left + step);
      if target != metrics.scroll_left {
        tracing::trace!(
          from = metrics.scroll_left,
          to = target,
          "edge auto-scroll step"
        );
        effects.push(Effect::ScrollTo(target));
        let scrolled =
          metrics.scrolled_to(target);
        if let Some((column, bounds)) =
          self.hit(last_x, &scrolled, axis)
        {
          self.track_column(
            column,
            bounds,
            &mut effects
          );
        }
      }
    }

    self.request_frame_into(&mut effects);
    effects
  }

  /// Right-click inside the scroll container. Opens the menu only
  /// over a day column; a right-click anywhere while it is open just
  /// closes it.
  pub fn context_menu<A>(
    &mut self,
    input: PointerInput,
    metrics: &ViewportMetrics,
    axis: &A,
    actions: &[MenuAction]
  ) -> Vec<Effect>
  where
    A: ColumnAxis + ?Sized
  {
    let mut effects =
      vec![Effect::PreventDefault];
    if self.torn_down || self.is_dragging() {
      return effects;
    }

    if self.menu().is_some() {
      self.close_menu_into(&mut effects);
      return effects;
    }

    if self
      .grid_hit(input.client_x, metrics, axis)
      .is_none()
    {
      tracing::trace!(
        x = input.client_x,
        "context menu outside the day columns"
      );
      return Vec::new();
    }

    let Some(range) = self.selection() else {
      tracing::trace!(
        "context menu ignored without a selection"
      );
      return effects;
    };
    if actions.is_empty() {
      return effects;
    }

    tracing::debug!(
      %range,
      actions = actions.len(),
      "opening context menu"
    );
    self.menu =
      MenuState::Open(ContextMenuState {
        x: input.client_x,
        y: input.client_y,
        range,
        actions: actions.to_vec()
      });
    effects.push(Effect::Subscribe(
      ListenerScope::Menu
    ));
    effects.push(Effect::MenuOpened);
    effects
  }

  /// Pointer-down seen by the window listener. `inside_menu` is
  /// whether the target lies in the menu's own subtree.
  pub fn pointer_down_outside(
    &mut self,
    input: PointerInput,
    inside_menu: bool
  ) -> Vec<Effect> {
    let mut effects = Vec::new();
    if self.torn_down
      || inside_menu
      || input.button != PointerButton::Primary
      || self.menu().is_none()
    {
      return effects;
    }
    self.swallow_stamp = Some(input.stamp);
    self.close_menu_into(&mut effects);
    effects
  }

  pub fn key_down(
    &mut self,
    key: &str
  ) -> Vec<Effect> {
    let mut effects = Vec::new();
    if self.torn_down || key != "Escape" {
      return effects;
    }
    if self.menu().is_some() {
      self.close_menu_into(&mut effects);
    } else if self.is_dragging() {
      tracing::debug!("drag cancelled");
      self.end_drag(&mut effects);
      self.pending = None;
    }
    effects
  }

  /// Runs a menu action if the menu is open and the action enabled.
  pub fn invoke_action(
    &mut self,
    id: &str
  ) -> Vec<Effect> {
    let mut effects = Vec::new();
    let Some(menu) = self.menu() else {
      return effects;
    };
    let runnable = menu.actions.iter().any(
      |action| action.id == id && !action.disabled
    );
    if !runnable {
      return effects;
    }
    self.close_menu_into(&mut effects);
    effects
      .push(Effect::InvokeAction(id.to_string()));
    effects
  }

  pub fn close_menu(&mut self) -> Vec<Effect> {
    let mut effects = Vec::new();
    self.close_menu_into(&mut effects);
    effects
  }

  /// Wheel over the grid; remaps a mostly vertical wheel to a
  /// horizontal scroll when enabled. Line deltas count one cell per
  /// line, page deltas one viewport per page.
  pub fn wheel(
    &mut self,
    delta_x: f64,
    delta_y: f64,
    mode: WheelDeltaMode,
    metrics: &ViewportMetrics
  ) -> Vec<Effect> {
    if self.torn_down
      || !self.wheel_remap
      || delta_y.abs() <= delta_x.abs()
    {
      return Vec::new();
    }
    let unit = match mode {
      | WheelDeltaMode::Pixel => 1.0,
      | WheelDeltaMode::Line => {
        self.layout.cell_width
      }
      | WheelDeltaMode::Page => metrics.width
    };
    let target = metrics.clamp_scroll(
      metrics.scroll_left + delta_y * unit
    );
    if target == metrics.scroll_left {
      return Vec::new();
    }
    vec![
      Effect::PreventDefault,
      Effect::ScrollTo(target),
    ]
  }

  /// Drops every piece of selection state in one step.
  pub fn clear_selection(
    &mut self
  ) -> Vec<Effect> {
    let mut effects = Vec::new();
    if self.torn_down {
      return effects;
    }
    self.reset_into(&mut effects);
    self.committed = None;
    effects.push(Effect::SelectionCleared);
    effects
  }

  /// Releases every held subscription and frame. Nothing is emitted
  /// after this.
  pub fn teardown(&mut self) -> Vec<Effect> {
    let mut effects = Vec::new();
    if self.torn_down {
      return effects;
    }
    self.end_drag(&mut effects);
    self.close_menu_into(&mut effects);
    if self.frame_pending {
      self.frame_pending = false;
      effects.push(Effect::CancelFrame);
    }
    self.pending = None;
    self.click_anchor = None;
    self.torn_down = true;
    tracing::debug!(
      released = effects.len(),
      "timeline controller torn down"
    );
    effects
  }

  fn reset_into(
    &mut self,
    effects: &mut Vec<Effect>
  ) {
    self.click_anchor = None;
    self.end_drag(effects);
    self.close_menu_into(effects);
    self.pending = None;
  }

  fn grid_hit<A>(
    &self,
    client_x: f64,
    metrics: &ViewportMetrics,
    axis: &A
  ) -> Option<(usize, (NaiveDate, NaiveDate))>
  where
    A: ColumnAxis + ?Sized
  {
    let column = grid_column_at(
      client_x,
      metrics,
      &self.layout,
      axis.column_count()
    )?;
    let bounds = axis.column_bounds(column)?;
    Some((column, bounds))
  }

  fn hit<A>(
    &self,
    client_x: f64,
    metrics: &ViewportMetrics,
    axis: &A
  ) -> Option<(usize, (NaiveDate, NaiveDate))>
  where
    A: ColumnAxis + ?Sized
  {
    let column = column_at(
      client_x,
      metrics,
      &self.layout,
      axis.column_count()
    )?;
    let bounds = axis.column_bounds(column)?;
    Some((column, bounds))
  }

  fn click(
    &mut self,
    bounds: (NaiveDate, NaiveDate),
    effects: &mut Vec<Effect>
  ) {
    let range = match self.click_anchor.take() {
      | Some(anchor) => {
        SelectionRange::spanning(anchor, bounds)
      }
      | None => {
        self.click_anchor = Some(bounds);
        SelectionRange::new(bounds.0, bounds.1)
      }
    };
    tracing::debug!(
      %range,
      anchored = self.click_anchor.is_some(),
      "click selection"
    );
    self.committed = Some(range);
    effects.push(Effect::SelectionChanged(range));
  }

  fn begin_drag(
    &mut self,
    column: usize,
    bounds: (NaiveDate, NaiveDate),
    client_x: f64,
    effects: &mut Vec<Effect>
  ) {
    self.click_anchor = None;
    let range =
      SelectionRange::new(bounds.0, bounds.1);
    self.drag = DragState::Active(DragGesture {
      anchor: bounds,
      column,
      last_x: client_x,
      moved: false
    });
    self.pending = Some(range);
    tracing::debug!(
      column,
      %range,
      "drag started"
    );

    effects.push(Effect::Subscribe(
      ListenerScope::Drag
    ));
    if self.auto_scroll.enabled {
      self.request_frame_into(effects);
    }
    effects.push(self.progress_effect(range));
  }

  fn track_column(
    &mut self,
    column: usize,
    bounds: (NaiveDate, NaiveDate),
    effects: &mut Vec<Effect>
  ) {
    if let Some(range) =
      self.track_column_silently(column, bounds)
    {
      effects.push(self.progress_effect(range));
    }
  }

  /// Updates the gesture's column; returns the new range when the
  /// column actually changed.
  fn track_column_silently(
    &mut self,
    column: usize,
    bounds: (NaiveDate, NaiveDate)
  ) -> Option<SelectionRange> {
    let DragState::Active(gesture) = &mut self.drag
    else {
      return None;
    };
    if gesture.column == column {
      return None;
    }
    gesture.column = column;
    gesture.moved = true;
    let range =
      SelectionRange::spanning(gesture.anchor, bounds);
    self.pending = Some(range);
    tracing::trace!(column, %range, "drag moved");
    Some(range)
  }

  fn progress_effect(
    &self,
    range: SelectionRange
  ) -> Effect {
    match self.mode {
      | InteractionMode::DeferredCommit => {
        Effect::SelectionPreview(range)
      }
      | InteractionMode::ClickClick
      | InteractionMode::Drag => {
        Effect::SelectionChanged(range)
      }
    }
  }

  fn request_frame_into(
    &mut self,
    effects: &mut Vec<Effect>
  ) {
    if self.frame_pending || !self.is_dragging() {
      return;
    }
    self.frame_pending = true;
    effects.push(Effect::RequestFrame);
  }

  fn end_drag(
    &mut self,
    effects: &mut Vec<Effect>
  ) {
    if !self.is_dragging() {
      return;
    }
    self.drag = DragState::Idle;
    if self.frame_pending {
      self.frame_pending = false;
      effects.push(Effect::CancelFrame);
    }
    effects.push(Effect::Unsubscribe(
      ListenerScope::Drag
    ));
  }

  fn close_menu_into(
    &mut self,
    effects: &mut Vec<Effect>
  ) {
    if matches!(self.menu, MenuState::Closed) {
      return;
    }
    self.menu = MenuState::Closed;
    tracing::debug!("context menu closed");
    effects.push(Effect::Unsubscribe(
      ListenerScope::Menu
    ));
    effects.push(Effect::MenuClosed);
  }
}
