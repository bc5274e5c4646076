// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Turn bucket forests into ordered sheet rows and a plain-text outline for diagnostics
// role: rendering/rows
// inputs: Catalog; BucketPlan labels; BucketHours; BucketForest
// outputs: BucketSheet per plan label (pre-order rows with derived attributes); outline text
// invariants:
// - One sheet per plan label, in plan order, even when a bucket has no hours
// - Rows follow walk_forest order; summary indented by two spaces per depth
// - initiative_total is the subtree total of the nearest initiative at or above the row
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::effort::BucketHours;
use crate::hierarchy::{derive_scope, subtree_totals, walk_forest, BucketForest, Catalog};
use crate::model::{BucketSheet, HierarchyRow};
use crate::window::BucketPlan;

/// Rows of one bucket in forest order.
pub fn bucket_sheet(label: &str, forest: &BucketForest<'_>) -> BucketSheet {
  let totals = subtree_totals(forest);
  let mut rows = Vec::with_capacity(forest.members.len());

  for (key, depth) in walk_forest(forest) {
    let Some(node) = forest.node(&key) else { continue };
    let initiative_total = forest.enclosing_initiative(&key).and_then(|e| totals.get(&e).copied());

    rows.push(HierarchyRow {
      issue_type: node.issue_type.clone(),
      summary: format!("{}{}", "  ".repeat(depth), node.summary),
      depth,
      parent: node.raw_parent().unwrap_or_default().to_string(),
      hours: forest.hours_of(&key),
      initiative_total,
      explicit_scope: node.category.clone(),
      scope: derive_scope(forest, &key),
      fix_versions: node.fix_versions_display(),
      key,
    });
  }

  BucketSheet { label: label.to_string(), total_hours: forest.hours.values().sum(), rows }
}

/// One sheet per plan label.
pub fn bucket_sheets(plan: &BucketPlan, catalog: &Catalog, hours: &BucketHours) -> Vec<BucketSheet> {
  let empty = BTreeMap::new();
  plan
    .labels
    .iter()
    .map(|label| {
      let forest = BucketForest::build(catalog, hours.get(label).unwrap_or(&empty));
      bucket_sheet(label, &forest)
    })
    .collect()
}

/// Indented text view of a sheet, one line per row.
pub fn outline(sheet: &BucketSheet) -> String {
  let mut out = format!("[{}]\n", sheet.label);
  for r in &sheet.rows {
    let scope = if r.scope.is_empty() { "-" } else { r.scope.as_str() };
    let _ = writeln!(out, "{}{} ({}) scope={} minutes={}", "  ".repeat(r.depth), r.key, r.issue_type, scope, (r.hours * 60.0).round());
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::initiative::Initiative;
  use crate::normalize::{InitiativeRef, Issue, ParentRef};
  use crate::window::{Granularity, ReportTz};
  use chrono::NaiveDateTime;

  fn issue(key: &str, ty: &str, parent: Option<&str>, scope: &str, versions: &[&str]) -> Issue {
    Issue {
      key: key.into(),
      issue_type: ty.into(),
      summary: format!("{key} title"),
      parent: parent.map(|p| ParentRef { key: p.into(), issue_type: None, summary: None, initiative: None }),
      initiative: None,
      category: scope.into(),
      fix_versions: versions.iter().map(|v| v.to_string()).collect(),
    }
  }

  fn catalog() -> Catalog {
    let mut s2 = issue("S2", "Story", None, "Bug", &["v1", "v2"]);
    s2.initiative = Some(InitiativeRef::Link("E9".into()));
    let issues = vec![
      issue("E1", "Epic", None, "", &[]),
      issue("S1", "Story", Some("E1"), "", &["v1"]),
      issue("T1", "Sub-task", Some("S1"), "", &["v1"]),
      s2,
      issue("T2", "Task", None, "Unplanned", &[]),
    ];
    let resolved = BTreeMap::from([("S2".to_string(), Some(Initiative { key: "E9".into(), name: Some("Payments".into()) }))]);
    Catalog::new(issues, resolved)
  }

  fn bucket(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs.iter().map(|(k, h)| (k.to_string(), *h)).collect()
  }

  #[test]
  fn sheet_rows_carry_derived_attributes() {
    let catalog = catalog();
    let forest = BucketForest::build(&catalog, &bucket(&[("T1", 2.0), ("S2", 1.25)]));
    let sheet = bucket_sheet("2025-04", &forest);

    let keys: Vec<&str> = sheet.rows.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, vec!["E1", "S1", "T1", "E9", "S2"]);
    assert!((sheet.total_hours - 3.25).abs() < 1e-9);

    let t1 = &sheet.rows[2];
    assert_eq!(t1.summary, "    T1 title");
    assert_eq!(t1.parent, "S1");
    assert_eq!(t1.scope, "Planned");
    assert_eq!(t1.initiative_total, Some(2.0));
    assert_eq!(t1.fix_versions, "v1");

    let e9 = &sheet.rows[3];
    assert_eq!(e9.summary, "Payments");
    assert_eq!(e9.scope, "");
    let s2 = &sheet.rows[4];
    assert_eq!(s2.scope, "Bug");
    assert_eq!(s2.explicit_scope, "Bug");
    assert_eq!(s2.initiative_total, Some(1.25));
    assert_eq!(s2.fix_versions, "v1, v2");
  }

  #[test]
  fn rows_outside_any_initiative_have_no_total() {
    let catalog = catalog();
    let forest = BucketForest::build(&catalog, &bucket(&[("T2", 0.5)]));
    let sheet = bucket_sheet("2025-04", &forest);
    assert_eq!(sheet.rows.len(), 1);
    assert_eq!(sheet.rows[0].initiative_total, None);
    assert_eq!(sheet.rows[0].scope, "Unplanned");
  }

  #[test]
  fn every_plan_label_gets_a_sheet() {
    let at = |s: &str| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap();
    let plan = BucketPlan::new(Granularity::Monthly, at("2025-04-01T00:00:00"), at("2025-06-01T00:00:00"), ReportTz::Utc);
    let catalog = catalog();
    let mut hours = BucketHours::new();
    hours.insert("2025-05".into(), bucket(&[("T2", 1.0)]));

    let sheets = bucket_sheets(&plan, &catalog, &hours);
    assert_eq!(sheets.len(), 2);
    assert!(sheets[0].rows.is_empty());
    assert_eq!(sheets[0].total_hours, 0.0);
    assert_eq!(sheets[1].rows[0].key, "T2");
  }

  #[test]
  fn outline_shows_the_forest() {
    let catalog = catalog();
    let forest = BucketForest::build(&catalog, &bucket(&[("T1", 2.0), ("S2", 1.25), ("T2", 0.5)]));
    let sheet = bucket_sheet("2025-04", &forest);
    insta::assert_snapshot!(outline(&sheet), @r"
    [2025-04]
    E1 (Epic) scope=- minutes=0
      S1 (Story) scope=Planned minutes=0
        T1 (Sub-task) scope=Planned minutes=120
    E9 (Epic) scope=- minutes=0
      S2 (Story) scope=Bug minutes=75
    T2 (Task) scope=Unplanned minutes=30
    ");
  }
}
