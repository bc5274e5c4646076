use predicates::prelude::*;

#[test]
fn missing_credentials_fail_with_hint() {
  let mut cmd = test_support::cmd_bin("jira-worklog-report");
  cmd
    .args(["--month", "2025-04"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("missing Jira credentials").and(predicate::str::contains("JIRA_API_TOKEN")));
}

#[test]
fn partial_credentials_count_as_missing() {
  let mut cmd = test_support::cmd_bin("jira-worklog-report");
  cmd
    .args(["--month", "2025-04", "--base-url", "https://example.atlassian.net"])
    .env("JIRA_API_TOKEN", "super-secret-token")
    .assert()
    .failure()
    .stderr(predicate::str::contains("missing Jira credentials").and(predicate::str::contains("super-secret-token").not()));
}
