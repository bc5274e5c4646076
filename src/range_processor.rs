// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Orchestrate one run: fetch, normalize, resolve initiatives, aggregate per bucket, render, write
// role: processing/orchestrator
// inputs: EffectiveConfig, TrackerApi, effective now
// outputs: Report (single JSON document) or split files (bucket-<label>.json + manifest.json)
// side_effects: Network via TrackerApi; creates directories; writes JSON files; prints to stdout
// invariants:
// - The window is resolved against "now" in the report time zone
// - Worklogs are fetched per issue in parallel; results keep search order
// - split ⇒ pointer {dir, manifest} printed; single ⇒ JSON printed or written to --out
// errors: Search/worklog failures abort with context; resolver lookups never do; IO errors carry paths
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::cli;
use crate::effort::{aggregate, TimeEntry};
use crate::hierarchy::Catalog;
use crate::initiative::{InitiativeResolver, ResolverCaches};
use crate::manifest::write_split_manifest;
use crate::model::{BucketFile, Report, ReportSummary, WindowInfo};
use crate::normalize::{normalize_issue, Issue};
use crate::params::{build_field_map, build_report_options, effective_grain};
use crate::people::people_report;
use crate::render::{bucket_sheets, outline};
use crate::summary::{initiative_totals, rollup_table};
use crate::tracker::{build_api, find_scope_field, worklog_jql, TrackerApi};
use crate::util;
use crate::window::{resolve_window, BucketPlan};

fn fetch_entries(api: &dyn TrackerApi, issues: &[Issue]) -> Result<Vec<TimeEntry>> {
  let per_issue: Vec<Vec<TimeEntry>> = issues
    .par_iter()
    .map(|issue| -> Result<Vec<TimeEntry>> {
      let records = api.list_worklogs(&issue.key).with_context(|| format!("fetching worklogs of {}", issue.key))?;
      Ok(records.iter().map(|r| TimeEntry::from_record(&issue.key, r)).collect())
    })
    .collect::<Result<_>>()?;
  Ok(per_issue.into_iter().flatten().collect())
}

pub fn generate_report(cfg: &cli::EffectiveConfig, api: &dyn TrackerApi, now: DateTime<Local>) -> Result<Report> {
  let window = resolve_window(&cfg.window, cfg.tz.to_local(&now))?;
  let grain = effective_grain(cfg, &window);
  let plan = BucketPlan::new(grain, window.since, window.until, cfg.tz);

  let scope_field = cfg.scope_field.clone().or_else(|| find_scope_field(api));
  let fields = build_field_map(cfg, scope_field);

  let (from, to) = plan.query_dates();
  let jql = worklog_jql(from, to, cfg.jql_scope.as_deref());
  debug!(%jql, "searching issues");
  let records = api.search_issues(&jql, &fields.search_fields()).context("searching issues")?;
  let issues: Vec<Issue> = records.iter().filter_map(|r| normalize_issue(r, &fields)).collect();
  info!(issues = issues.len(), buckets = plan.labels.len(), "loaded issues");

  let caches = ResolverCaches::new();
  let initiatives = InitiativeResolver::new(api, &fields, &caches).resolve_all(&issues);
  info!(lookups = caches.lookups(), "resolved initiatives");

  let entries = fetch_entries(api, &issues)?;
  let hours = aggregate(&entries, |dt| plan.bucket_of(dt));
  let in_window = entries.iter().filter(|e| e.effective().is_some_and(|dt| plan.bucket_of(&dt).is_some())).count();
  info!(worklogs = entries.len(), in_window, "aggregated worklogs");

  let issue_count = issues.len();
  let catalog = Catalog::new(issues, initiatives);
  let sheets = bucket_sheets(&plan, &catalog, &hours);
  for sheet in &sheets {
    debug!("bucket forest\n{}", outline(sheet));
  }

  let rollup = rollup_table(&sheets, &plan.labels, &cfg.rollup);
  let initiative_rows = initiative_totals(&sheets);
  let people = cfg.people.then(|| people_report(&entries, &plan, &catalog, cfg.author.as_deref()));

  Ok(Report {
    generated_at: now.format("%Y-%m-%dT%H:%M:%S").to_string(),
    window: WindowInfo { since: util::format_bound(plan.since), until: util::format_bound(plan.until) },
    options: build_report_options(cfg, grain, &fields),
    summary: ReportSummary {
      issues: issue_count,
      worklogs: in_window,
      hours: sheets.iter().map(|s| s.total_hours).sum(),
      lookups: caches.lookups(),
    },
    buckets: sheets,
    rollup,
    initiatives: initiative_rows,
    people,
  })
}

/// Write split files; returns the pointer to print.
pub fn save_split(cfg: &cli::EffectiveConfig, report: &Report, now_opt: Option<DateTime<Local>>) -> Result<serde_json::Value> {
  let base_dir = util::prepare_out_dir(&cfg.out, now_opt)?;
  let mut entries: Vec<BucketFile> = Vec::with_capacity(report.buckets.len());

  for sheet in &report.buckets {
    let file = util::bucket_file_name(&sheet.label);
    let path = std::path::Path::new(&base_dir).join(&file);
    std::fs::write(&path, serde_json::to_vec_pretty(sheet)?).with_context(|| format!("writing {}", path.display()))?;
    entries.push(BucketFile { label: sheet.label.clone(), file, total_hours: sheet.total_hours });
  }
  write_split_manifest(report, &base_dir, &entries)?;
  info!(dir = %base_dir, files = entries.len(), "wrote split report");

  Ok(serde_json::json!({"dir": base_dir, "manifest": "manifest.json"}))
}

/// Write a single report to `--out`; returns the JSON to print when `--out` is stdout.
pub fn save_single(cfg: &cli::EffectiveConfig, report: &Report) -> Result<Option<serde_json::Value>> {
  if cfg.out == "-" {
    return Ok(Some(serde_json::to_value(report)?));
  }

  let out_path = std::path::Path::new(&cfg.out);
  let is_dir_like = cfg.out.ends_with('/') || out_path.is_dir();
  let file_path = if is_dir_like {
    std::fs::create_dir_all(out_path).with_context(|| format!("creating {}", out_path.display()))?;
    out_path.join("worklog-report.json")
  } else {
    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
      std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    out_path.to_path_buf()
  };
  std::fs::write(&file_path, serde_json::to_vec_pretty(report)?).with_context(|| format!("writing {}", file_path.display()))?;
  info!(file = %file_path.display(), "wrote report");
  Ok(None)
}

pub fn process(cfg: &cli::EffectiveConfig, now_opt: Option<DateTime<Local>>) -> Result<()> {
  let api = build_api(cfg.credentials.clone())?;
  let report = generate_report(cfg, api.as_ref(), util::effective_now(now_opt))?;

  let to_print = if cfg.split_apart { Some(save_split(cfg, &report, now_opt)?) } else { save_single(cfg, &report)? };
  if let Some(v) = to_print {
    println!("{}", serde_json::to_string_pretty(&v)?);
  }
  Ok(())
}
