// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Report windows (--month, --from/--to, --for phrases), report time zone, and bucket plans
// role: core/windows
// inputs: WindowSpec from CLI; Granularity; ReportTz; "now" (overridable for tests)
// outputs: ResolvedWindow (half-open naive local range) and BucketPlan (labels + bucket function)
// invariants:
// - Windows are half-open [since, until) in report-local naive time and month or week aligned
// - Bucket labels are "YYYY-MM" (monthly) or ISO "YYYY-Www" (weekly); plan labels are chronological
// - Every instant inside the window maps to exactly one plan label
// errors: Invalid months, unknown time zones and unsupported phrases are reported via anyhow
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use clap::ValueEnum;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum Granularity {
  Monthly,
  Weekly,
}

/// Time zone the report is bucketed in.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ReportTz {
  Local,
  Utc,
  Named(chrono_tz::Tz),
}

impl FromStr for ReportTz {
  type Err = anyhow::Error;

  fn from_str(s: &str) -> Result<Self> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("local") {
      return Ok(ReportTz::Local);
    }
    if s.eq_ignore_ascii_case("utc") {
      return Ok(ReportTz::Utc);
    }
    match s.parse::<chrono_tz::Tz>() {
      Ok(tz) => Ok(ReportTz::Named(tz)),
      Err(_) => bail!("unknown time zone '{s}' (use local, utc or an IANA name like Europe/Vienna)"),
    }
  }
}

impl fmt::Display for ReportTz {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ReportTz::Local => f.write_str("local"),
      ReportTz::Utc => f.write_str("utc"),
      ReportTz::Named(tz) => f.write_str(tz.name()),
    }
  }
}

impl ReportTz {
  /// Wall-clock time of `dt` in this zone.
  pub fn to_local<T: TimeZone>(&self, dt: &DateTime<T>) -> NaiveDateTime {
    match self {
      ReportTz::Utc => dt.naive_utc(),
      ReportTz::Local => dt.with_timezone(&Local).naive_local(),
      ReportTz::Named(tz) => dt.with_timezone(tz).naive_local(),
    }
  }
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub enum WindowSpec {
  Month { ym: String },
  /// Inclusive month range.
  FromTo { from: String, to: String },
  ForPhrase { phrase: String },
}

/// A resolved window; `granularity` is set when the phrase itself implies one.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedWindow {
  pub since: NaiveDateTime,
  pub until: NaiveDateTime,
  pub granularity: Option<Granularity>,
}

fn parse_ym(ym: &str, flag: &str) -> Result<(i32, u32)> {
  let parts: Vec<&str> = ym.trim().split('-').collect();

  if parts.len() != 2 {
    bail!("invalid {flag} '{ym}', expected YYYY-MM");
  }
  let y: i32 = parts[0].parse().with_context(|| format!("parsing year in {flag}"))?;
  let m: u32 = parts[1].parse().with_context(|| format!("parsing month in {flag}"))?;

  if !(1..=12).contains(&m) {
    bail!("invalid month in {flag} '{ym}'");
  }
  Ok((y, m))
}

/// Shift (year, month) by `delta` months.
fn add_months(y: i32, m: u32, delta: i32) -> Result<(i32, u32)> {
  let total = y
    .checked_mul(12)
    .and_then(|t| t.checked_add(m as i32 - 1))
    .and_then(|t| t.checked_add(delta))
    .context("window out of range")?;
  Ok((total.div_euclid(12), total.rem_euclid(12) as u32 + 1))
}

fn month_start(y: i32, m: u32) -> Result<NaiveDateTime> {
  NaiveDate::from_ymd_opt(y, m, 1)
    .map(|d| d.and_time(NaiveTime::MIN))
    .with_context(|| format!("month {y:04}-{m:02} out of range"))
}

pub fn month_bounds(ym: &str) -> Result<(NaiveDateTime, NaiveDateTime)> {
  let (y, m) = parse_ym(ym, "--month")?;
  let (ny, nm) = add_months(y, m, 1)?;
  Ok((month_start(y, m)?, month_start(ny, nm)?))
}

fn week_start(dt: NaiveDateTime) -> Result<NaiveDateTime> {
  let back = dt.weekday().num_days_from_monday() as i64;
  dt.date()
    .checked_sub_signed(Duration::days(back))
    .map(|d| d.and_time(NaiveTime::MIN))
    .context("window out of range")
}

/// `until` minus `n` weeks, or an error past the calendar's range.
fn weeks_before(until: NaiveDateTime, n: i64) -> Result<NaiveDateTime> {
  Duration::try_weeks(n).and_then(|d| until.checked_sub_signed(d)).context("window out of range")
}

pub fn iso_week_label(dt: NaiveDateTime) -> String {
  let iso = dt.iso_week();
  format!("{:04}-W{:02}", iso.year(), iso.week())
}

fn month_label(dt: NaiveDateTime) -> String {
  format!("{:04}-{:02}", dt.year(), dt.month())
}

/// Parse a `--now-override` string into a local DateTime.
/// Accepts RFC3339 (e.g. 2025-08-15T12:00:00Z) or a naive local timestamp
/// formatted as `%Y-%m-%dT%H:%M:%S`.
pub fn parse_now_override(s: Option<&str>) -> Option<DateTime<Local>> {
  s.and_then(|raw| {
    DateTime::parse_from_rfc3339(raw)
      .ok()
      .map(|dt| dt.with_timezone(&Local))
      .or_else(|| {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
          .ok()
          .and_then(|ndt| ndt.and_local_timezone(Local).single())
      })
  })
}

/// Resolve a window against `now` (report-local wall clock).
pub fn resolve_window(window: &WindowSpec, now: NaiveDateTime) -> Result<ResolvedWindow> {
  match window {
    WindowSpec::Month { ym } => {
      let (since, until) = month_bounds(ym)?;
      Ok(ResolvedWindow { since, until, granularity: None })
    }
    WindowSpec::FromTo { from, to } => {
      let mut a = parse_ym(from, "--from")?;
      let mut b = parse_ym(to, "--to")?;
      if a > b {
        std::mem::swap(&mut a, &mut b);
      }
      let (ny, nm) = add_months(b.0, b.1, 1)?;
      Ok(ResolvedWindow { since: month_start(a.0, a.1)?, until: month_start(ny, nm)?, granularity: None })
    }
    WindowSpec::ForPhrase { phrase } => for_phrase_window(phrase, now),
  }
}

static RE_LAST_MONTHS: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^(every\s+month\s+for\s+the\s+)?last\s+(\d+)\s+months?$").unwrap());
static RE_LAST_WEEKS: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^(every\s+week\s+for\s+the\s+)?last\s+(\d+)\s+weeks?$").unwrap());

fn phrase_count(raw: &str, phrase: &str) -> Result<i32> {
  let n: i32 = raw.parse().with_context(|| format!("count in --for '{phrase}'"))?;
  if n < 1 {
    bail!("--for '{phrase}' needs a count of at least 1");
  }
  Ok(n)
}

fn for_phrase_window(input: &str, now: NaiveDateTime) -> Result<ResolvedWindow> {
  let phrase = input.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
  let this_month = (now.year(), now.month());

  let months_back = |n: i32, granularity: Option<Granularity>| -> Result<ResolvedWindow> {
    let (sy, sm) = add_months(this_month.0, this_month.1, -n)?;
    Ok(ResolvedWindow { since: month_start(sy, sm)?, until: month_start(this_month.0, this_month.1)?, granularity })
  };

  match phrase.as_str() {
    "this month" => {
      let (ny, nm) = add_months(this_month.0, this_month.1, 1)?;
      return Ok(ResolvedWindow {
        since: month_start(this_month.0, this_month.1)?,
        until: month_start(ny, nm)?,
        granularity: None,
      });
    }
    "last month" => return months_back(1, None),
    "last week" => {
      let until = week_start(now)?;
      return Ok(ResolvedWindow { since: weeks_before(until, 1)?, until, granularity: None });
    }
    _ => {}
  }

  if let Some(caps) = RE_LAST_MONTHS.captures(&phrase) {
    let n = phrase_count(&caps[2], input)?;
    let every = caps.get(1).is_some();
    return months_back(n, every.then_some(Granularity::Monthly));
  }

  if let Some(caps) = RE_LAST_WEEKS.captures(&phrase) {
    let n = phrase_count(&caps[2], input)?;
    let until = week_start(now)?;
    let every = caps.get(1).is_some();
    return Ok(ResolvedWindow {
      since: weeks_before(until, n as i64)?,
      until,
      granularity: every.then_some(Granularity::Weekly),
    });
  }

  bail!(
    "unsupported --for phrase '{input}' (try: this month, last month, last N months, \
     every month for the last N months, every week for the last N weeks)"
  )
}

/// Buckets of one report run.
#[derive(Clone, Debug)]
pub struct BucketPlan {
  pub granularity: Granularity,
  pub since: NaiveDateTime,
  pub until: NaiveDateTime,
  pub labels: Vec<String>,
  pub tz: ReportTz,
}

impl BucketPlan {
  pub fn new(granularity: Granularity, since: NaiveDateTime, until: NaiveDateTime, tz: ReportTz) -> Self {
    let mut labels = Vec::new();
    let step = |dt: NaiveDateTime| -> Option<NaiveDateTime> {
      match granularity {
        Granularity::Monthly => {
          let (y, m) = add_months(dt.year(), dt.month(), 1).ok()?;
          month_start(y, m).ok()
        }
        Granularity::Weekly => dt.checked_add_signed(Duration::days(7)),
      }
    };
    let mut cursor = match granularity {
      Granularity::Monthly => month_start(since.year(), since.month()).ok(),
      Granularity::Weekly => week_start(since).ok(),
    };
    while let Some(start) = cursor.filter(|c| *c < until) {
      labels.push(Self::label_in(granularity, start));
      cursor = step(start);
    }
    Self { granularity, since, until, labels, tz }
  }

  fn label_in(granularity: Granularity, local: NaiveDateTime) -> String {
    match granularity {
      Granularity::Monthly => month_label(local),
      Granularity::Weekly => iso_week_label(local),
    }
  }

  pub fn label_for(&self, local: NaiveDateTime) -> String {
    Self::label_in(self.granularity, local)
  }

  /// Bucket label of an instant, or `None` outside `[since, until)`.
  pub fn bucket_of<T: TimeZone>(&self, instant: &DateTime<T>) -> Option<String> {
    let local = self.tz.to_local(instant);
    (local >= self.since && local < self.until).then(|| self.label_for(local))
  }

  /// Inclusive date range for the worklog search, one day wider on each side
  /// so zone offsets between the report and the site never drop entries.
  pub fn query_dates(&self) -> (NaiveDate, NaiveDate) {
    let last = self.until.checked_sub_signed(Duration::seconds(1)).unwrap_or(self.until).date();
    let first = self.since.date();
    (first.pred_opt().unwrap_or(first), last.succ_opt().unwrap_or(last))
  }
}
