use serde_json::Value;

const NOW: &str = "2025-05-15T12:00:00";

fn run(args: &[&str]) -> Value {
  let mut cmd = test_support::cmd_with_fixtures("jira-worklog-report");
  let out = cmd.args(args).args(["--now-override", NOW]).output().unwrap();
  assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
  serde_json::from_slice(&out.stdout).unwrap()
}

fn row<'a>(bucket: &'a Value, key: &str) -> &'a Value {
  bucket["rows"].as_array().unwrap().iter().find(|r| r["key"] == key).unwrap_or_else(|| panic!("row {key}"))
}

#[test]
fn april_report_rolls_up_through_epics() {
  let v = run(&["--month", "2025-04", "--tz", "utc"]);

  assert_eq!(v["options"]["scope_field"], "customfield_10100");
  assert_eq!(v["summary"]["issues"], 5);
  assert_eq!(v["summary"]["worklogs"], 4);
  assert_eq!(v["summary"]["hours"].as_f64(), Some(3.0));
  assert_eq!(v["summary"]["lookups"], 2);

  let april = &v["buckets"][0];
  assert_eq!(april["label"], "2025-04");
  let keys: Vec<&str> = april["rows"].as_array().unwrap().iter().map(|r| r["key"].as_str().unwrap()).collect();
  assert_eq!(keys, vec!["OPS-1", "OPS-7", "OPS-8", "PAY-1", "PAY-2", "PAY-3"]);

  let placeholder = row(april, "OPS-1");
  assert_eq!(placeholder["issue_type"], "Epic");
  assert_eq!(placeholder["summary"], "Operations");
  assert_eq!(placeholder["scope"], "");
  assert_eq!(placeholder["initiative_total"].as_f64(), Some(1.0));

  let subtask = row(april, "PAY-3");
  assert_eq!(subtask["summary"], "    Validate card");
  assert_eq!(subtask["parent"], "PAY-2");
  assert_eq!(subtask["explicit_scope"], "");
  assert_eq!(subtask["scope"], "Unplanned");
  assert_eq!(subtask["hours"].as_f64(), Some(1.5));
  assert_eq!(subtask["initiative_total"].as_f64(), Some(2.0));
  assert_eq!(subtask["fix_versions"], "2.0");

  assert_eq!(row(april, "OPS-7")["scope"], "Bug");
  assert_eq!(row(april, "OPS-8")["scope"], "Planned");
  assert_eq!(row(april, "PAY-1")["hours"].as_f64(), Some(0.0));
}

#[test]
fn summary_counts_every_searched_issue() {
  let issues: Vec<Value> = test_support::read_fixture_json("issues.json");
  let v = run(&["--month", "2025-04", "--tz", "utc"]);
  assert_eq!(v["summary"]["issues"].as_u64(), Some(issues.len() as u64));
}

#[test]
fn rollup_groups_bug_with_planned_and_totals_initiatives() {
  let v = run(&["--month", "2025-04", "--tz", "utc"]);

  let rows = v["rollup"]["rows"].as_array().unwrap();
  assert_eq!(rows.len(), 2);
  assert_eq!(rows[0]["label"], " - Planned");
  assert_eq!(rows[0]["hours"]["2025-04"].as_f64(), Some(1.0));
  assert_eq!(rows[1]["label"], "2.0 - Unplanned");
  assert_eq!(rows[1]["hours"]["2025-04"].as_f64(), Some(2.0));

  let initiatives = v["initiatives"].as_array().unwrap();
  assert_eq!(initiatives[0]["key"], "OPS-1");
  assert_eq!(initiatives[0]["summary"], "Operations");
  assert_eq!(initiatives[1]["key"], "PAY-1");
  assert_eq!(initiatives[1]["hours"].as_f64(), Some(2.0));
}

#[test]
fn custom_rollup_mapping_drops_unlisted_scopes() {
  let v = run(&["--month", "2025-04", "--tz", "utc", "--rollup-scope", "Bug=Defects"]);
  let rows = v["rollup"]["rows"].as_array().unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0]["label"], " - Defects");
  assert_eq!(rows[0]["hours"]["2025-04"].as_f64(), Some(0.75));
  assert_eq!(v["options"]["rollup_scopes"]["Bug"], "Defects");
}

#[test]
fn report_zone_moves_late_entries_into_next_month() {
  let v = run(&["--month", "2025-04", "--tz", "Europe/Vienna"]);
  assert_eq!(v["options"]["tz"], "Europe/Vienna");
  assert_eq!(v["summary"]["worklogs"], 3);
  let april = &v["buckets"][0];
  assert!(april["rows"].as_array().unwrap().iter().all(|r| r["key"] != "OPS-8"));
}

#[test]
fn people_listing_filters_by_author() {
  let v = run(&["--month", "2025-04", "--tz", "utc", "--author", "acc-ben"]);
  let people = &v["people"];
  let overview = people["overview"].as_array().unwrap();
  assert_eq!(overview.len(), 1);
  assert_eq!(overview[0]["author"], "Ben");
  assert_eq!(overview[0]["entries"], 2);
  assert_eq!(overview[0]["total_hours"].as_f64(), Some(1.25));

  let entries = people["buckets"][0]["authors"][0]["entries"].as_array().unwrap();
  assert_eq!(entries[0]["issue"], "PAY-2");
  assert_eq!(entries[0]["comment"], "Review");
  assert_eq!(entries[0]["weekday"], "Tuesday");
  assert_eq!(entries[1]["summary"], "Crash on login");
}

#[test]
fn people_listing_is_absent_by_default() {
  let v = run(&["--month", "2025-04", "--tz", "utc"]);
  assert!(v.get("people").is_none());
}

#[test]
fn report_is_written_to_out_file() {
  let td = test_support::tempdir();
  let path = td.path().join("april.json");
  let mut cmd = test_support::cmd_with_fixtures("jira-worklog-report");
  let out = cmd
    .args(["--month", "2025-04", "--tz", "utc", "--out", path.to_str().unwrap(), "--now-override", NOW])
    .output()
    .unwrap();
  assert!(out.status.success());
  assert!(out.stdout.is_empty());
  let v: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
  assert_eq!(v["generated_at"], NOW);
}
