// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Define the JSON report model (bucket sheets, roll-up, initiative totals, people listing)
// role: model/types
// outputs: Serializable structs with stable field names
// invariants:
// - Hour values are held unrounded in memory and rounded to 2 decimals only when serialized
// - Rows are emitted in forest pre-order; tables are sorted by key
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::normalize::INITIATIVE_TYPE;
use crate::util::{ser_round2, ser_round2_map, ser_round2_opt};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WindowInfo {
  pub since: String,
  pub until: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReportOptions {
  pub grain: String,
  pub tz: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub jql_scope: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub scope_field: Option<String>,
  pub epic_link_field: String,
  /// Accepted scope -> roll-up group.
  pub rollup_scopes: BTreeMap<String, String>,
}

/// One displayed node of a bucket's forest.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HierarchyRow {
  pub key: String,
  pub issue_type: String,
  /// Title indented by two spaces per depth.
  pub summary: String,
  pub depth: usize,
  /// Raw parent key from the tracker ("" when none).
  pub parent: String,
  #[serde(serialize_with = "ser_round2")]
  pub hours: f64,
  /// Subtree total of the nearest enclosing initiative.
  #[serde(serialize_with = "ser_round2_opt")]
  pub initiative_total: Option<f64>,
  pub explicit_scope: String,
  pub scope: String,
  pub fix_versions: String,
}

impl HierarchyRow {
  pub fn is_initiative(&self) -> bool {
    self.issue_type == INITIATIVE_TYPE
  }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BucketSheet {
  pub label: String,
  #[serde(serialize_with = "ser_round2")]
  pub total_hours: f64,
  pub rows: Vec<HierarchyRow>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RollupRow {
  /// "<fix versions> - <group>"
  pub label: String,
  #[serde(serialize_with = "ser_round2_map")]
  pub hours: BTreeMap<String, f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RollupTable {
  pub columns: Vec<String>,
  pub rows: Vec<RollupRow>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct InitiativeTotal {
  pub key: String,
  pub summary: String,
  #[serde(serialize_with = "ser_round2")]
  pub hours: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PeopleEntry {
  pub started_local: String,
  pub started_utc: String,
  pub logged_local: String,
  pub logged_utc: String,
  pub local_datetime: String,
  pub weekday: String,
  pub iso_week: String,
  pub utc_datetime: String,
  pub issue: String,
  pub summary: String,
  pub seconds: u64,
  #[serde(serialize_with = "ser_round2")]
  pub hours: f64,
  pub comment: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthorSheet {
  pub author: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub account_id: Option<String>,
  pub entries: Vec<PeopleEntry>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PeopleBucket {
  pub label: String,
  pub authors: Vec<AuthorSheet>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OverviewRow {
  pub bucket: String,
  pub author: String,
  pub entries: usize,
  #[serde(serialize_with = "ser_round2")]
  pub total_hours: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PeopleReport {
  pub buckets: Vec<PeopleBucket>,
  pub overview: Vec<OverviewRow>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReportSummary {
  pub issues: usize,
  pub worklogs: usize,
  #[serde(serialize_with = "ser_round2")]
  pub hours: f64,
  /// Single-issue lookups spent on initiative resolution.
  pub lookups: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Report {
  pub generated_at: String,
  pub window: WindowInfo,
  pub options: ReportOptions,
  pub summary: ReportSummary,
  pub buckets: Vec<BucketSheet>,
  pub rollup: RollupTable,
  pub initiatives: Vec<InitiativeTotal>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub people: Option<PeopleReport>,
}

/// Pointer to one per-bucket file of a split run.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BucketFile {
  pub label: String,
  pub file: String,
  #[serde(serialize_with = "ser_round2")]
  pub total_hours: f64,
}
