use std::sync::OnceLock;

use chrono::{
  Datelike,
  Duration,
  NaiveDate,
  Utc
};
use chrono_tz::Tz;
use regex::Regex;

fn date_prefix_re() -> Option<&'static Regex> {
  static DATE_PREFIX: OnceLock<
    Option<Regex>
  > = OnceLock::new();
  DATE_PREFIX
    .get_or_init(|| {
      Regex::new(
        r"^\s*(?P<year>\d{4})[-/](?P<month>\d{1,2})[-/](?P<day>\d{1,2})(?:$|[T\s_]|[+-]\d|Z)"
      )
      .ok()
    })
    .as_ref()
}

/// Extracts the calendar date from an ISO date or a date-bearing
/// timestamp (`2025-01-05`, `2025-01-05T09:30:00Z`,
/// `2025-01-05 09:30`). Anything else yields `None`.
#[must_use]
pub fn parse_date_bearing(
  raw: &str
) -> Option<NaiveDate> {
  let captures =
    date_prefix_re()?.captures(raw)?;

  let year = captures
    .name("year")?
    .as_str()
    .parse::<i32>()
    .ok()?;
  let month = captures
    .name("month")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  let day = captures
    .name("day")?
    .as_str()
    .parse::<u32>()
    .ok()?;

  let parsed = NaiveDate::from_ymd_opt(
    year, month, day
  );
  if parsed.is_none() {
    tracing::trace!(
      raw,
      "date-bearing string named an impossible date"
    );
  }
  parsed
}

#[must_use]
pub fn format_iso(
  date: NaiveDate
) -> String {
  date.format("%Y-%m-%d").to_string()
}

#[must_use]
pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  date
    .checked_add_signed(Duration::days(
      days
    ))
    .unwrap_or(date)
}

/// Number of days in `[start, end]`, zero when `end < start`.
#[must_use]
pub fn inclusive_day_count(
  start: NaiveDate,
  end: NaiveDate
) -> i64 {
  if end < start {
    return 0;
  }
  (end - start).num_days() + 1
}

#[must_use]
pub fn first_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .unwrap_or(NaiveDate::MIN)
}

#[must_use]
pub fn last_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  let (next_year, next_month) =
    if month >= 12 {
      (year.saturating_add(1), 1_u32)
    } else {
      (year, month + 1)
    };
  add_days(
    first_day_of_month(
      next_year, next_month
    ),
    -1
  )
}

#[must_use]
pub fn month_key(
  date: NaiveDate
) -> (i32, u32) {
  (date.year(), date.month())
}

pub fn today_in_timezone(
  timezone: Tz
) -> NaiveDate {
  Utc::now()
    .with_timezone(&timezone)
    .date_naive()
}

pub fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => Some(tz),
    | Err(error) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %error,
        "invalid timezone id"
      );
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::{
    inclusive_day_count,
    last_day_of_month,
    parse_date_bearing
  };

  fn ymd(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn extracts_date_from_timestamps() {
    assert_eq!(
      parse_date_bearing("2025-01-05"),
      Some(ymd(2025, 1, 5))
    );
    assert_eq!(
      parse_date_bearing(
        "2025-01-05T09:30:00Z"
      ),
      Some(ymd(2025, 1, 5))
    );
    assert_eq!(
      parse_date_bearing(
        "  2025-01-05 09:30:00.000"
      ),
      Some(ymd(2025, 1, 5))
    );
    assert_eq!(
      parse_date_bearing(
        "2025-01-05+02:00"
      ),
      Some(ymd(2025, 1, 5))
    );
  }

  #[test]
  fn rejects_garbage_and_impossible_dates()
  {
    assert_eq!(
      parse_date_bearing(""),
      None
    );
    assert_eq!(
      parse_date_bearing("not a date"),
      None
    );
    assert_eq!(
      parse_date_bearing("2025-02-30"),
      None
    );
    assert_eq!(
      parse_date_bearing("2025-01-0512"),
      None
    );
  }

  #[test]
  fn month_bounds_handle_december_and_leap_years()
  {
    assert_eq!(
      last_day_of_month(2024, 2),
      ymd(2024, 2, 29)
    );
    assert_eq!(
      last_day_of_month(2025, 12),
      ymd(2025, 12, 31)
    );
    assert_eq!(
      inclusive_day_count(
        ymd(2025, 1, 1),
        ymd(2025, 1, 31)
      ),
      31
    );
    assert_eq!(
      inclusive_day_count(
        ymd(2025, 1, 2),
        ymd(2025, 1, 1)
      ),
      0
    );
  }
}
