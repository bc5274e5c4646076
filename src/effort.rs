// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Normalize worklog records and sum logged hours per (bucket, issue)
// role: core/effort-aggregator
// inputs: raw worklog JSON per issue; caller-supplied bucket function over the effective instant
// outputs: TimeEntry values; BucketHours (bucket label -> issue key -> unrounded hours)
// invariants:
// - Effective instant is started, else created, else updated; entries without one are skipped
// - Hours accumulate unrounded as seconds / 3600; rounding happens only when rows are built
// - No IO; deterministic (BTreeMap ordering)
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde_json::Value;

use crate::ext::serde_json::JsonFetch;

/// bucket label -> issue key -> hours
pub type BucketHours = BTreeMap<String, BTreeMap<String, f64>>;

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M:%S%z"];

/// ADF node types rendered on their own line.
const BLOCK_NODES: [&str; 8] =
  ["paragraph", "heading", "listItem", "codeBlock", "blockquote", "rule", "panel", "tableRow"];

/// One worklog entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeEntry {
  pub issue_key: String,
  pub started: Option<DateTime<FixedOffset>>,
  /// When the entry was logged (`created`, else `updated`).
  pub created: Option<DateTime<FixedOffset>>,
  pub seconds: u64,
  pub author: String,
  pub author_id: Option<String>,
  pub comment: String,
}

impl TimeEntry {
  pub fn from_record(issue_key: &str, record: &Value) -> Self {
    let stamp = |path: &str| record.fetch(path).text().and_then(|s| parse_timestamp(&s));
    let author_id = record.fetch("author.accountId").text();

    TimeEntry {
      issue_key: issue_key.to_string(),
      started: stamp("started"),
      created: stamp("created").or_else(|| stamp("updated")),
      seconds: record.fetch("timeSpentSeconds").to::<i64>().unwrap_or(0).max(0) as u64,
      author: record
        .fetch("author.displayName")
        .text()
        .or_else(|| author_id.clone())
        .unwrap_or_else(|| "Unknown".to_string()),
      author_id,
      comment: record.fetch("comment").value().map(flatten_comment).unwrap_or_default(),
    }
  }

  /// The instant used for bucketing.
  pub fn effective(&self) -> Option<DateTime<FixedOffset>> {
    self.started.or(self.created)
  }

  pub fn hours(&self) -> f64 {
    self.seconds as f64 / 3600.0
  }
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
  let s = s.trim();
  TIMESTAMP_FORMATS
    .iter()
    .find_map(|f| DateTime::parse_from_str(s, f).ok())
    .or_else(|| DateTime::parse_from_rfc3339(s).ok())
}

/// Plain text of a worklog comment: either a string or an ADF document.
pub fn flatten_comment(v: &Value) -> String {
  match v {
    Value::String(s) => s.trim().to_string(),
    Value::Object(_) => {
      let mut out = String::new();
      flatten_node(v, &mut out);
      out.trim().to_string()
    }
    _ => String::new(),
  }
}

fn flatten_node(node: &Value, out: &mut String) {
  match node.get("type").and_then(Value::as_str) {
    Some("text") => out.push_str(node.get("text").and_then(Value::as_str).unwrap_or("")),
    Some("hardBreak") => out.push('\n'),
    kind => {
      if kind.is_some_and(|k| BLOCK_NODES.contains(&k)) && !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
      }
      for child in node.get("content").and_then(Value::as_array).into_iter().flatten() {
        flatten_node(child, out);
      }
    }
  }
}

/// Sum hours per (bucket, issue). `bucket_of` returns `None` for instants outside the report range.
pub fn aggregate<F>(entries: &[TimeEntry], bucket_of: F) -> BucketHours
where
  F: Fn(&DateTime<FixedOffset>) -> Option<String>,
{
  let mut out = BucketHours::new();
  for e in entries {
    let Some(label) = e.effective().as_ref().and_then(&bucket_of) else {
      continue;
    };
    *out.entry(label).or_default().entry(e.issue_key.clone()).or_insert(0.0) += e.hours();
  }
  out
}
