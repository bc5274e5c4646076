// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Utilities for hour rounding, timestamp formatting, output directories and man page rendering
// role: utilities/helpers
// inputs: Various primitives; DateTime; paths; clap CommandFactory
// outputs: Rounded hours (plain and serde serializers), formatted timestamps, directories ensured, man page text
// side_effects: prepare_out_dir creates directories
// invariants:
// - round2 is applied at presentation only (serializers), never during accumulation
// - prepare_out_dir returns an existing directory (either provided or temp timestamped)
// - bucket_file_name pattern is stable and filesystem-safe
// errors: IO errors bubble with context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime};
use clap::CommandFactory;
use serde::Serializer;

/// Round to 2 decimal places (half away from zero).
pub fn round2(v: f64) -> f64 {
  (v * 100.0).round() / 100.0
}

pub fn ser_round2<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
  s.serialize_f64(round2(*v))
}

pub fn ser_round2_opt<S: Serializer>(v: &Option<f64>, s: S) -> Result<S::Ok, S::Error> {
  match v {
    Some(x) => s.serialize_some(&round2(*x)),
    None => s.serialize_none(),
  }
}

pub fn ser_round2_map<S: Serializer>(m: &BTreeMap<String, f64>, s: S) -> Result<S::Ok, S::Error> {
  s.collect_map(m.iter().map(|(k, v)| (k, round2(*v))))
}

/// Wall-clock rendering used in rows ("2025-04-03 09:15:00").
pub fn format_wall(dt: NaiveDateTime) -> String {
  dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Window bound rendering ("2025-04-01T00:00:00").
pub fn format_bound(dt: NaiveDateTime) -> String {
  dt.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Returns the effective "now" given an optional override.
///
/// When `override_now` is `Some`, that instant is returned; otherwise
/// the current local time is used. Centralizes our handling of test
/// determinism without sprinkling `Local::now()` throughout the code.
pub fn effective_now(override_now: Option<DateTime<Local>>) -> DateTime<Local> {
  override_now.unwrap_or_else(Local::now)
}

/// Prepare an output directory for split runs.
///
/// - When `out` is not "-", it is treated as the target directory; it will be created if needed.
/// - When `out` is "-", a temp directory is created with a timestamped name.
///   Returns the absolute path as a String.
pub fn prepare_out_dir(out: &str, now_opt: Option<DateTime<Local>>) -> Result<String> {
  let dir = if out != "-" {
    out.to_string()
  } else {
    let eff_now = effective_now(now_opt);
    std::env::temp_dir()
      .join(format!("worklogs-{}", eff_now.format("%Y%m%d-%H%M%S")))
      .to_string_lossy()
      .to_string()
  };
  std::fs::create_dir_all(&dir).with_context(|| format!("creating output directory {dir}"))?;

  Ok(dir)
}

/// File name of one bucket in a split run.
pub fn bucket_file_name(label: &str) -> String {
  let safe: String = label
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
    .collect();
  format!("bucket-{safe}.json")
}

/// Render a section-1 man page for a clap `CommandFactory` implementor.
/// Returns the troff content as a UTF-8 string.
pub fn render_man_page<T: CommandFactory>() -> Result<String> {
  let cmd = T::command();
  let man = clap_mangen::Man::new(cmd);
  let mut buf: Vec<u8> = Vec::new();

  man.render(&mut buf)?;

  Ok(String::from_utf8_lossy(&buf).to_string())
}
