use serde_json::Value;

#[test]
fn split_apart_writes_bucket_files_and_manifest() {
  let td = test_support::tempdir();
  let base = td.path().to_string_lossy().to_string();
  let mut cmd = test_support::cmd_with_fixtures("jira-worklog-report");
  let out = cmd
    .args([
      "--from",
      "2025-03",
      "--to",
      "2025-04",
      "--tz",
      "utc",
      "--people",
      "--split-apart",
      "--out",
      base.as_str(),
      "--now-override",
      "2025-05-15T12:00:00",
    ])
    .output()
    .unwrap();
  assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

  let pointer: Value = serde_json::from_slice(&out.stdout).unwrap();
  assert_eq!(pointer["dir"], base.as_str());
  assert_eq!(pointer["manifest"], "manifest.json");

  let manifest: Value = serde_json::from_slice(&std::fs::read(td.path().join("manifest.json")).unwrap()).unwrap();
  let buckets = manifest["buckets"].as_array().unwrap();
  assert_eq!(buckets.len(), 2);
  assert_eq!(buckets[0]["file"], "bucket-2025-03.json");
  assert_eq!(buckets[0]["total_hours"].as_f64(), Some(1.0));
  assert_eq!(manifest["rollup"]["columns"], serde_json::json!(["2025-03", "2025-04"]));
  assert_eq!(manifest["initiatives"][1]["hours"].as_f64(), Some(3.0));
  assert!(manifest["people"]["overview"].is_array());

  let march: Value = serde_json::from_slice(&std::fs::read(td.path().join("bucket-2025-03.json")).unwrap()).unwrap();
  let keys: Vec<&str> = march["rows"].as_array().unwrap().iter().map(|r| r["key"].as_str().unwrap()).collect();
  assert_eq!(keys, vec!["PAY-1", "PAY-2", "PAY-3"]);
  assert!(td.path().join("bucket-2025-04.json").exists());
}
