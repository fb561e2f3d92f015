use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Duration,
  LocalResult,
  Months,
  NaiveDate,
  NaiveDateTime,
  TimeZone,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;

pub const TIMEZONE_ENV_VAR: &str =
  "TASKDECK_TIMEZONE";

/// Picks the display timezone: the
/// environment wins over the config
/// value, and anything unparseable
/// falls back to UTC.
pub fn resolve_timezone(
  configured: Option<&str>
) -> Tz {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) = parse_timezone(
      &raw,
      TIMEZONE_ENV_VAR
    )
  {
    return tz;
  }

  if let Some(raw) = configured
    && let Some(tz) =
      parse_timezone(raw, "config")
  {
    return tz;
  }

  chrono_tz::UTC
}

pub fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::debug!(
        source,
        timezone = %trimmed,
        "configured timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

#[must_use]
pub fn local_date(
  dt: DateTime<Utc>,
  tz: &Tz
) -> NaiveDate {
  dt.with_timezone(tz).date_naive()
}

#[must_use]
pub fn format_local(
  dt: DateTime<Utc>,
  tz: &Tz
) -> String {
  dt.with_timezone(tz)
    .format("%Y-%m-%d %H:%M")
    .to_string()
}

/// First day of the week containing
/// `date`.
#[must_use]
pub fn start_of_week(
  date: NaiveDate,
  week_start: Weekday
) -> NaiveDate {
  let offset = (7
    + date
      .weekday()
      .num_days_from_monday()
    - week_start
      .num_days_from_monday())
    % 7;
  date - Duration::days(i64::from(
    offset
  ))
}

#[must_use]
pub fn end_of_week(
  date: NaiveDate,
  week_start: Weekday
) -> NaiveDate {
  start_of_week(date, week_start)
    + Duration::days(6)
}

#[must_use]
pub fn first_of_month(
  date: NaiveDate
) -> NaiveDate {
  date.with_day(1).unwrap_or(date)
}

#[must_use]
pub fn last_of_month(
  date: NaiveDate
) -> NaiveDate {
  let first = first_of_month(date);
  first
    .checked_add_months(Months::new(1))
    .and_then(|next| next.pred_opt())
    .unwrap_or(first)
}

/// Shifts to the first of the month
/// `delta` months away.
#[must_use]
pub fn shift_month(
  date: NaiveDate,
  delta: i32
) -> NaiveDate {
  let first = first_of_month(date);
  let months =
    Months::new(delta.unsigned_abs());
  let shifted = if delta >= 0 {
    first.checked_add_months(months)
  } else {
    first.checked_sub_months(months)
  };
  shifted.unwrap_or(first)
}

/// Parses `YYYY-MM` into the first
/// day of that month.
pub fn parse_month(
  input: &str
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  NaiveDate::parse_from_str(
    &format!("{token}-01"),
    "%Y-%m-%d"
  )
  .with_context(|| {
    format!(
      "invalid month: {token} \
       (expected YYYY-MM)"
    )
  })
}

pub fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn to_utc_from_local(
  local_naive: NaiveDateTime,
  tz: &Tz,
  context: &str
) -> anyhow::Result<DateTime<Utc>> {
  match tz
    .from_local_datetime(&local_naive)
  {
    | LocalResult::Single(local_dt) => {
      Ok(local_dt.with_timezone(&Utc))
    }
    | LocalResult::Ambiguous(
      first,
      second
    ) => {
      tracing::warn!(
        context,
        first = %first,
        second = %second,
        "ambiguous local datetime; using earliest"
      );
      let chosen = if first <= second {
        first
      } else {
        second
      };
      Ok(chosen.with_timezone(&Utc))
    }
    | LocalResult::None => {
      Err(anyhow!(
        "local datetime does not \
         exist in configured \
         timezone: {context}"
      ))
    }
  }
}

fn local_midnight(
  date: NaiveDate,
  tz: &Tz,
  context: &str
) -> anyhow::Result<DateTime<Utc>> {
  let midnight = date
    .and_hms_opt(0, 0, 0)
    .ok_or_else(|| {
      anyhow!(
        "failed to construct \
         midnight for {context}"
      )
    })?;
  to_utc_from_local(
    midnight, tz, context
  )
}

/// Parses a due-date expression
/// relative to `now` in `tz`.
#[tracing::instrument(skip(now, tz), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  now: DateTime<Utc>,
  tz: &Tz
) -> anyhow::Result<DateTime<Utc>> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();
  let today = local_date(now, tz);

  match lower.as_str() {
    | "now" => return Ok(now),
    | "today" => {
      return local_midnight(
        today, tz, "today"
      );
    }
    | "tomorrow" => {
      return local_midnight(
        today + Duration::days(1),
        tz,
        "tomorrow"
      );
    }
    | "yesterday" => {
      return local_midnight(
        today - Duration::days(1),
        tz,
        "yesterday"
      );
    }
    | _ => {}
  }

  if let Some(target_weekday) =
    parse_weekday_name(&lower)
  {
    let target_date = next_weekday_date(
      today,
      target_weekday
    );
    return local_midnight(
      target_date,
      tz,
      "weekday-name"
    );
  }

  let rel_re = Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dhm])$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

  if let Some(caps) =
    rel_re.captures(token)
  {
    let sign = caps
      .name("sign")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative sign")
      })?;
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let unit = caps
      .name("unit")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative unit")
      })?;

    let duration = match unit {
      | "d" => Duration::try_days(num),
      | "h" => {
        Duration::try_hours(num)
      }
      | "m" => {
        Duration::try_minutes(num)
      }
      | _ => {
        return Err(anyhow!(
          "unknown relative unit: \
           {unit}"
        ))
      }
    };

    return duration
      .and_then(|d| {
        if sign == "-" {
          now.checked_sub_signed(d)
        } else {
          now.checked_add_signed(d)
        }
      })
      .ok_or_else(|| {
        anyhow!(
          "relative offset out of \
           range: {token}"
        )
      });
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(dt.with_timezone(&Utc));
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return local_midnight(
      date, tz, "date"
    );
  }

  for fmt in
    ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
  {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return to_utc_from_local(
        ndt, tz, fmt
      );
    }
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     now/today/tomorrow/yesterday, \
     weekday names (e.g. monday), \
     +Nd/+Nh/+Nm, RFC3339, \
     YYYY-MM-DD, YYYY-MM-DDTHH:MM, \
     YYYY-MM-DD HH:MM"
  })
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let target_idx = target
    .num_days_from_monday()
    as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  from
    .checked_add_signed(Duration::days(
      delta
    ))
    .unwrap_or(from)
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    TimeZone,
    Utc,
    Weekday
  };

  use super::{
    end_of_week,
    last_of_month,
    local_date,
    parse_date_expr,
    parse_month,
    shift_month,
    start_of_week
  };

  fn day(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn parses_weekday_name() {
    let now = Utc
      .with_ymd_and_hms(
        2026, 2, 17, 12, 0, 0
      )
      .single()
      .expect("valid now");
    let parsed = parse_date_expr(
      "wednesday",
      now,
      &chrono_tz::UTC
    )
    .expect("parse weekday");
    assert_eq!(
      local_date(
        parsed,
        &chrono_tz::UTC
      ),
      day(2026, 2, 18)
    );
  }

  #[test]
  fn parses_tomorrow_in_zone() {
    let tz = chrono_tz::America::New_York;
    let now = Utc
      .with_ymd_and_hms(
        2026, 2, 18, 2, 0, 0
      )
      .single()
      .expect("valid now");
    let parsed = parse_date_expr(
      "tomorrow", now, &tz
    )
    .expect("parse tomorrow");
    assert_eq!(
      local_date(parsed, &tz),
      day(2026, 2, 18)
    );
  }

  #[test]
  fn parses_date_and_relative_forms() {
    let now = Utc
      .with_ymd_and_hms(
        2026, 2, 17, 12, 0, 0
      )
      .single()
      .expect("valid now");
    let tz = chrono_tz::UTC;

    let plain = parse_date_expr(
      "2026-03-01",
      now,
      &tz
    )
    .expect("parse date");
    assert_eq!(
      plain.to_rfc3339(),
      "2026-03-01T00:00:00+00:00"
    );

    let with_time = parse_date_expr(
      "2026-03-01 09:30",
      now,
      &tz
    )
    .expect("parse date time");
    assert_eq!(
      with_time.to_rfc3339(),
      "2026-03-01T09:30:00+00:00"
    );

    let relative =
      parse_date_expr("+2d", now, &tz)
        .expect("parse relative");
    assert_eq!(
      local_date(relative, &tz),
      day(2026, 2, 19)
    );

    assert!(
      parse_date_expr(
        "someday", now, &tz
      )
      .is_err()
    );
  }

  #[test]
  fn relative_offsets_out_of_range_are_errors()
   {
    let now = Utc
      .with_ymd_and_hms(
        2026, 2, 17, 12, 0, 0
      )
      .single()
      .expect("valid now");
    let tz = chrono_tz::UTC;

    let err = parse_date_expr(
      "+999999999999d",
      now,
      &tz
    )
    .expect_err("duration overflow");
    assert!(
      err
        .to_string()
        .contains("out of range")
    );

    assert!(
      parse_date_expr(
        "-99999999999d",
        now,
        &tz
      )
      .is_err()
    );
  }

  #[test]
  fn week_bounds_follow_week_start() {
    let tuesday = day(2026, 2, 17);
    assert_eq!(
      start_of_week(
        tuesday,
        Weekday::Sun
      ),
      day(2026, 2, 15)
    );
    assert_eq!(
      end_of_week(
        tuesday,
        Weekday::Sun
      ),
      day(2026, 2, 21)
    );
    assert_eq!(
      start_of_week(
        tuesday,
        Weekday::Mon
      ),
      day(2026, 2, 16)
    );
    let sunday = day(2026, 2, 15);
    assert_eq!(
      start_of_week(
        sunday,
        Weekday::Mon
      ),
      day(2026, 2, 9)
    );
  }

  #[test]
  fn month_helpers() {
    assert_eq!(
      last_of_month(day(2028, 2, 10)),
      day(2028, 2, 29)
    );
    assert_eq!(
      shift_month(day(2026, 1, 31), -1),
      day(2025, 12, 1)
    );
    assert_eq!(
      shift_month(day(2026, 12, 5), 1),
      day(2027, 1, 1)
    );
    assert_eq!(
      parse_month("2026-07")
        .expect("parse month"),
      day(2026, 7, 1)
    );
    assert!(parse_month("July").is_err());
  }
}
