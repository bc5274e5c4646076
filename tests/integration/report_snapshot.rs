use serde_json::Value;

/// Indented view of every bucket: key, derived scope and hours.
fn forest_text(report: &Value) -> String {
  let mut out = String::new();
  for bucket in report["buckets"].as_array().unwrap() {
    out.push_str(&format!("[{}]\n", bucket["label"].as_str().unwrap()));
    for r in bucket["rows"].as_array().unwrap() {
      let depth = r["depth"].as_u64().unwrap() as usize;
      let scope = r["scope"].as_str().unwrap();
      out.push_str(&format!(
        "{}{} {} {:.2}\n",
        "  ".repeat(depth),
        r["key"].as_str().unwrap(),
        if scope.is_empty() { "-" } else { scope },
        r["hours"].as_f64().unwrap()
      ));
    }
  }
  out
}

#[test]
fn two_month_forest_snapshot() {
  test_support::init_insta();
  let mut cmd = test_support::cmd_with_fixtures("jira-worklog-report");
  let out = cmd
    .args(["--from", "2025-03", "--to", "2025-04", "--tz", "utc", "--now-override", "2025-05-15T12:00:00"])
    .output()
    .unwrap();
  assert!(out.status.success());
  let v: Value = serde_json::from_slice(&out.stdout).unwrap();

  insta::assert_snapshot!(forest_text(&v), @r"
  [2025-03]
  PAY-1 - 0.00
    PAY-2 Unplanned 0.00
      PAY-3 Unplanned 1.00
  [2025-04]
  OPS-1 - 0.00
    OPS-7 Bug 0.75
    OPS-8 Planned 0.25
  PAY-1 - 0.00
    PAY-2 Unplanned 0.50
      PAY-3 Unplanned 1.50
  ");
}
