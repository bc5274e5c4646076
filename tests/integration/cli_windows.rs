const NOW: &str = "2025-05-15T12:00:00";

#[test]
fn errors_when_no_time_selection() {
  let mut cmd = test_support::cmd_with_fixtures("jira-worklog-report");
  let out = cmd.output().unwrap();
  assert!(!out.status.success());
  let err = String::from_utf8_lossy(&out.stderr);
  assert!(err.contains("Provide one of --month, --for, or (--from AND --to)"));
}

#[test]
fn errors_on_mixed_time_selection() {
  let mut cmd = test_support::cmd_with_fixtures("jira-worklog-report");
  let out = cmd.args(["--month", "2025-04", "--for", "last month"]).output().unwrap();
  assert!(!out.status.success());
  assert!(String::from_utf8_lossy(&out.stderr).contains("Ambiguous time selection"));
}

#[test]
fn errors_on_unsupported_phrase() {
  let mut cmd = test_support::cmd_with_fixtures("jira-worklog-report");
  let out = cmd.args(["--for", "since the dawn of time", "--now-override", NOW]).output().unwrap();
  assert!(!out.status.success());
  assert!(String::from_utf8_lossy(&out.stderr).contains("unsupported --for phrase"));
}

#[test]
fn errors_on_invalid_month() {
  let mut cmd = test_support::cmd_with_fixtures("jira-worklog-report");
  let out = cmd.args(["--month", "2025-13"]).output().unwrap();
  assert!(!out.status.success());
  assert!(String::from_utf8_lossy(&out.stderr).contains("invalid month"));
}

#[test]
fn last_month_phrase_resolves_against_now_override() {
  let mut cmd = test_support::cmd_with_fixtures("jira-worklog-report");
  let out = cmd.args(["--for", "last month", "--tz", "utc", "--now-override", NOW]).output().unwrap();
  assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
  let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
  assert_eq!(v["window"]["since"], "2025-04-01T00:00:00");
  assert_eq!(v["window"]["until"], "2025-05-01T00:00:00");
  assert_eq!(v["buckets"].as_array().unwrap().len(), 1);
}

#[test]
fn weekly_phrase_switches_grain() {
  let mut cmd = test_support::cmd_with_fixtures("jira-worklog-report");
  let out = cmd
    .args(["--for", "every week for the last 4 weeks", "--tz", "utc", "--now-override", NOW])
    .output()
    .unwrap();
  assert!(out.status.success());
  let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
  assert_eq!(v["options"]["grain"], "weekly");
  let labels: Vec<&str> = v["buckets"].as_array().unwrap().iter().map(|b| b["label"].as_str().unwrap()).collect();
  assert_eq!(labels, vec!["2025-W16", "2025-W17", "2025-W18", "2025-W19"]);
}
