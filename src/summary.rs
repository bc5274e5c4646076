// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Cross-bucket summary tables: release-label x scope-group roll-up and per-initiative totals
// role: core/summary
// inputs: BucketSheet rows (already rendered); ScopeRollup mapping; bucket labels
// outputs: RollupTable; Vec<InitiativeTotal>
// invariants:
// - The roll-up groups derived scopes through the mapping; unmapped scopes are excluded
// - Every roll-up row has a cell per column (0.0 when absent); rows sorted by label
// - Initiative totals sum per-bucket subtree totals; one row per initiative key, sorted
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;

use anyhow::{bail, Result};

use crate::model::{BucketSheet, InitiativeTotal, RollupRow, RollupTable};

/// Accepted scope values and the group each one is summed under.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeRollup {
  groups: BTreeMap<String, String>,
}

impl Default for ScopeRollup {
  fn default() -> Self {
    Self::from_pairs([("Planned", "Planned"), ("Unplanned", "Unplanned"), ("Bug", "Planned")])
  }
}

impl ScopeRollup {
  pub fn from_pairs<I, K, V>(pairs: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
  {
    Self { groups: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
  }

  /// Parse a `RAW=GROUP` pair as given to `--rollup-scope`.
  pub fn parse_pair(s: &str) -> Result<(String, String)> {
    let Some((raw, group)) = s.split_once('=') else {
      bail!("invalid --rollup-scope '{s}', expected RAW=GROUP");
    };
    let (raw, group) = (raw.trim(), group.trim());
    if raw.is_empty() || group.is_empty() {
      bail!("invalid --rollup-scope '{s}', RAW and GROUP must be non-empty");
    }
    Ok((raw.to_string(), group.to_string()))
  }

  pub fn group_of(&self, scope: &str) -> Option<&str> {
    self.groups.get(scope.trim()).map(String::as_str)
  }

  pub fn as_map(&self) -> &BTreeMap<String, String> {
    &self.groups
  }
}

/// Hours per `"<release labels> - <group>"` and bucket.
pub fn rollup_table(sheets: &[BucketSheet], columns: &[String], rollup: &ScopeRollup) -> RollupTable {
  let mut cells: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();

  for sheet in sheets {
    for row in &sheet.rows {
      let Some(group) = rollup.group_of(&row.scope) else {
        continue;
      };
      let label = format!("{} - {}", row.fix_versions, group);
      let hours = cells
        .entry(label)
        .or_insert_with(|| columns.iter().map(|c| (c.clone(), 0.0)).collect());
      *hours.entry(sheet.label.clone()).or_insert(0.0) += row.hours;
    }
  }

  RollupTable {
    columns: columns.to_vec(),
    rows: cells.into_iter().map(|(label, hours)| RollupRow { label, hours }).collect(),
  }
}

/// Per-initiative subtree totals summed over all buckets.
pub fn initiative_totals(sheets: &[BucketSheet]) -> Vec<InitiativeTotal> {
  let mut totals: BTreeMap<String, InitiativeTotal> = BTreeMap::new();

  for row in sheets.iter().flat_map(|s| s.rows.iter()) {
    if !row.is_initiative() {
      continue;
    }
    let Some(total) = row.initiative_total else {
      continue;
    };
    totals
      .entry(row.key.clone())
      .or_insert_with(|| InitiativeTotal { key: row.key.clone(), summary: row.summary.trim().to_string(), hours: 0.0 })
      .hours += total;
  }

  totals.into_values().collect()
}
