use chrono::{
  NaiveDate,
  Weekday
};
use chrono_tz::Tz;
use serde::{
  Deserialize,
  Serialize
};

use crate::date::{
  parse_timezone,
  today_in_timezone
};

fn default_true() -> bool {
  true
}

fn default_cell_width() -> f64 {
  36.0
}

fn default_label_width() -> f64 {
  220.0
}

fn default_lane_height() -> f64 {
  28.0
}

fn default_lane_gap() -> f64 {
  4.0
}

fn default_header_height() -> f64 {
  48.0
}

fn default_min_body_height() -> f64 {
  120.0
}

fn default_scroll_threshold() -> f64 {
  48.0
}

fn default_scroll_min_step() -> f64 {
  4.0
}

fn default_scroll_max_step() -> f64 {
  32.0
}

fn default_weekend() -> String {
  "sat-sun".to_string()
}

fn default_max_window_days() -> u32 {
  3_660
}

fn repair(
  value: &mut f64,
  min: f64,
  fallback: f64
) {
  if !value.is_finite() || *value < min {
    *value = fallback;
  }
}

/// How pointer gestures turn into host selection updates.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum InteractionMode {
  /// First click anchors, second click closes the range.
  ClickClick,
  /// Every column crossed while dragging is emitted as a change.
  #[default]
  Drag,
  /// Crossed columns go to the preview callback; pointer-up commits.
  DeferredCommit
}

impl InteractionMode {
  pub fn from_key(
    raw: &str
  ) -> Option<Self> {
    match raw
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "click-click" | "click" => {
        Some(Self::ClickClick)
      }
      | "drag" => Some(Self::Drag),
      | "deferred-commit" | "deferred" => {
        Some(Self::DeferredCommit)
      }
      | _ => None
    }
  }

  pub fn as_key(self) -> &'static str {
    match self {
      | Self::ClickClick => "click-click",
      | Self::Drag => "drag",
      | Self::DeferredCommit => {
        "deferred-commit"
      }
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
  #[default]
  Day,
  Month
}

impl Granularity {
  pub fn from_key(
    raw: &str
  ) -> Option<Self> {
    match raw
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "day" | "days" => Some(Self::Day),
      | "month" | "months" => {
        Some(Self::Month)
      }
      | _ => None
    }
  }

  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Day => "day",
      | Self::Month => "month"
    }
  }
}

/// The set of weekdays painted as weekend.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct WeekendPolicy {
  days: [bool; 7]
}

impl WeekendPolicy {
  pub fn saturday_sunday() -> Self {
    Self::from_days(&[
      Weekday::Sat,
      Weekday::Sun
    ])
  }

  pub fn friday_saturday() -> Self {
    Self::from_days(&[
      Weekday::Fri,
      Weekday::Sat
    ])
  }

  pub fn from_days(
    days: &[Weekday]
  ) -> Self {
    let mut flags = [false; 7];
    for day in days {
      flags[day.num_days_from_monday()
        as usize] = true;
    }
    Self { days: flags }
  }

  /// Accepts `sat-sun`, `fri-sat`, `none`, or a comma separated
  /// list of weekday names (`fri,sat`).
  pub fn parse(
    raw: &str
  ) -> Option<Self> {
    let normalized =
      raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
      | "sat-sun" | "saturday-sunday" => {
        return Some(
          Self::saturday_sunday()
        );
      }
      | "fri-sat" | "friday-saturday" => {
        return Some(
          Self::friday_saturday()
        );
      }
      | "none" => {
        return Some(Self::from_days(&[]));
      }
      | _ => {}
    }

    let days = normalized
      .split(',')
      .map(str::trim)
      .filter(|token| !token.is_empty())
      .map(|token| {
        token.parse::<Weekday>().ok()
      })
      .collect::<Option<Vec<_>>>()?;
    if days.is_empty() {
      return None;
    }
    Some(Self::from_days(&days))
  }

  pub fn is_weekend(
    &self,
    day: Weekday
  ) -> bool {
    self.days
      [day.num_days_from_monday() as usize]
  }
}

impl Default for WeekendPolicy {
  fn default() -> Self {
    Self::saturday_sunday()
  }
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Serialize,
  Deserialize,
)]
pub struct LayoutConfig {
  #[serde(default = "default_cell_width")]
  pub cell_width:      f64,
  #[serde(default = "default_label_width")]
  pub label_width:     f64,
  #[serde(default = "default_lane_height")]
  pub lane_height:     f64,
  #[serde(default = "default_lane_gap")]
  pub lane_gap:        f64,
  #[serde(
    default = "default_header_height"
  )]
  pub header_height:   f64,
  #[serde(
    default = "default_min_body_height"
  )]
  pub min_body_height: f64
}

impl Default for LayoutConfig {
  fn default() -> Self {
    Self {
      cell_width:      default_cell_width(),
      label_width:     default_label_width(
      ),
      lane_height:     default_lane_height(
      ),
      lane_gap:        default_lane_gap(),
      header_height:   default_header_height(
      ),
      min_body_height:
        default_min_body_height()
    }
  }
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Serialize,
  Deserialize,
)]
pub struct InteractionConfig {
  #[serde(default)]
  pub mode:        InteractionMode,
  #[serde(default = "default_true")]
  pub wheel_remap: bool
}

impl Default for InteractionConfig {
  fn default() -> Self {
    Self {
      mode:        InteractionMode::default(),
      wheel_remap: true
    }
  }
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Serialize,
  Deserialize,
)]
pub struct AutoScrollConfig {
  #[serde(default = "default_true")]
  pub enabled:   bool,
  #[serde(
    default = "default_scroll_threshold"
  )]
  pub threshold: f64,
  #[serde(
    default = "default_scroll_min_step"
  )]
  pub min_step:  f64,
  #[serde(
    default = "default_scroll_max_step"
  )]
  pub max_step:  f64
}

impl Default for AutoScrollConfig {
  fn default() -> Self {
    Self {
      enabled:   true,
      threshold: default_scroll_threshold(),
      min_step:  default_scroll_min_step(),
      max_step:  default_scroll_max_step()
    }
  }
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Serialize,
  Deserialize,
)]
pub struct CalendarSettings {
  #[serde(default = "default_weekend")]
  pub weekend:         String,
  #[serde(default)]
  pub granularity:     Granularity,
  #[serde(default)]
  pub timezone:        Option<String>,
  #[serde(
    default = "default_max_window_days"
  )]
  pub max_window_days: u32
}

impl Default for CalendarSettings {
  fn default() -> Self {
    Self {
      weekend:         default_weekend(),
      granularity:     Granularity::default(
      ),
      timezone:        None,
      max_window_days:
        default_max_window_days()
    }
  }
}

/// Everything the timeline needs besides the host's data.
#[derive(
  Debug,
  Clone,
  PartialEq,
  Default,
  Serialize,
  Deserialize,
)]
pub struct TimelineConfig {
  #[serde(default)]
  pub version:     u32,
  #[serde(default)]
  pub layout:      LayoutConfig,
  #[serde(default)]
  pub interaction: InteractionConfig,
  #[serde(default)]
  pub auto_scroll: AutoScrollConfig,
  #[serde(default)]
  pub calendar:    CalendarSettings
}

impl TimelineConfig {
  /// Parses TOML and repairs out-of-range values.
  pub fn from_toml_str(
    raw: &str
  ) -> Result<Self, toml::de::Error> {
    let mut config =
      toml::from_str::<Self>(raw)?;
    config.sanitize();
    Ok(config)
  }

  /// Like [`TimelineConfig::from_toml_str`] but never fails: a
  /// broken document logs and yields the defaults.
  pub fn from_toml_or_default(
    raw: &str,
    source: &str
  ) -> Self {
    match Self::from_toml_str(raw) {
      | Ok(config) => {
        tracing::info!(
          source,
          version = config.version,
          mode = config
            .interaction
            .mode
            .as_key(),
          weekend = %config.calendar.weekend,
          "loaded timeline config"
        );
        config
      }
      | Err(error) => {
        tracing::error!(
          source,
          %error,
          "failed parsing timeline config; using defaults"
        );
        Self::default()
      }
    }
  }

  pub fn sanitize(&mut self) {
    let defaults = LayoutConfig::default();
    let layout = &mut self.layout;
    repair(
      &mut layout.cell_width,
      4.0,
      defaults.cell_width
    );
    repair(
      &mut layout.label_width,
      0.0,
      defaults.label_width
    );
    repair(
      &mut layout.lane_height,
      4.0,
      defaults.lane_height
    );
    repair(&mut layout.lane_gap, 0.0, 0.0);
    repair(
      &mut layout.header_height,
      0.0,
      defaults.header_height
    );
    repair(
      &mut layout.min_body_height,
      0.0,
      defaults.min_body_height
    );

    let scroll_defaults =
      AutoScrollConfig::default();
    let scroll = &mut self.auto_scroll;
    repair(
      &mut scroll.threshold,
      1.0,
      scroll_defaults.threshold
    );
    repair(
      &mut scroll.min_step,
      1.0,
      scroll_defaults.min_step
    );
    repair(
      &mut scroll.max_step,
      1.0,
      scroll_defaults.max_step
    );
    if scroll.max_step < scroll.min_step {
      scroll.max_step = scroll.min_step;
    }

    if WeekendPolicy::parse(
      &self.calendar.weekend
    )
    .is_none()
    {
      tracing::warn!(
        weekend = %self.calendar.weekend,
        "unrecognized weekend setting; using sat-sun"
      );
      self.calendar.weekend =
        default_weekend();
    }

    if self.calendar.max_window_days == 0 {
      self.calendar.max_window_days =
        default_max_window_days();
    }
  }

  pub fn weekend_policy(
    &self
  ) -> WeekendPolicy {
    WeekendPolicy::parse(
      &self.calendar.weekend
    )
    .unwrap_or_default()
  }

  pub fn timezone(&self) -> Tz {
    self
      .calendar
      .timezone
      .as_deref()
      .and_then(|raw| {
        parse_timezone(
          raw,
          "calendar.timezone"
        )
      })
      .unwrap_or(chrono_tz::UTC)
  }

  pub fn today(&self) -> NaiveDate {
    today_in_timezone(self.timezone())
  }
}
