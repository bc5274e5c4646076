// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Per-bucket, per-author worklog listing with overview totals
// role: core/people-report
// inputs: TimeEntry list; BucketPlan (zone + range); Catalog (issue summaries); optional account id filter
// outputs: PeopleReport (buckets in plan order, authors sorted by name, entries sorted by local time then issue)
// invariants:
// - Entries without an effective instant or outside [since, until) are skipped
// - Buckets without entries are omitted; overview has one row per (bucket, author)
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};

use crate::effort::TimeEntry;
use crate::hierarchy::Catalog;
use crate::model::{AuthorSheet, OverviewRow, PeopleBucket, PeopleEntry, PeopleReport};
use crate::util::format_wall;
use crate::window::{iso_week_label, BucketPlan};

fn wall_pair(plan: &BucketPlan, dt: Option<&DateTime<FixedOffset>>) -> (String, String) {
  match dt {
    Some(dt) => (format_wall(plan.tz.to_local(dt)), format_wall(dt.naive_utc())),
    None => (String::new(), String::new()),
  }
}

fn entry_row(plan: &BucketPlan, catalog: &Catalog, e: &TimeEntry, effective: &DateTime<FixedOffset>) -> PeopleEntry {
  let local = plan.tz.to_local(effective);
  let (started_local, started_utc) = wall_pair(plan, e.started.as_ref());
  let (logged_local, logged_utc) = wall_pair(plan, e.created.as_ref());

  PeopleEntry {
    started_local,
    started_utc,
    logged_local,
    logged_utc,
    local_datetime: format_wall(local),
    weekday: local.format("%A").to_string(),
    iso_week: iso_week_label(local),
    utc_datetime: format_wall(effective.naive_utc()),
    issue: e.issue_key.clone(),
    summary: catalog.get(&e.issue_key).map(|i| i.summary.clone()).unwrap_or_default(),
    seconds: e.seconds,
    hours: e.hours(),
    comment: e.comment.clone(),
  }
}

/// Group entries by bucket and author; `author` keeps a single account id.
pub fn people_report(entries: &[TimeEntry], plan: &BucketPlan, catalog: &Catalog, author: Option<&str>) -> PeopleReport {
  // bucket -> author name -> (account id, rows)
  let mut grouped: BTreeMap<String, BTreeMap<String, (Option<String>, Vec<PeopleEntry>)>> = BTreeMap::new();

  for e in entries {
    if author.is_some_and(|a| e.author_id.as_deref() != Some(a)) {
      continue;
    }
    let Some(effective) = e.effective() else { continue };
    let Some(label) = plan.bucket_of(&effective) else { continue };

    let slot = grouped.entry(label).or_default().entry(e.author.clone()).or_insert_with(|| (e.author_id.clone(), Vec::new()));
    slot.1.push(entry_row(plan, catalog, e, &effective));
  }

  let mut report = PeopleReport::default();
  for label in &plan.labels {
    let Some(authors) = grouped.remove(label) else { continue };
    let mut sheets = Vec::with_capacity(authors.len());

    for (name, (account_id, mut rows)) in authors {
      rows.sort_by(|a, b| (&a.local_datetime, &a.issue).cmp(&(&b.local_datetime, &b.issue)));
      report.overview.push(OverviewRow {
        bucket: label.clone(),
        author: name.clone(),
        entries: rows.len(),
        total_hours: rows.iter().map(|r| r.hours).sum(),
      });
      sheets.push(AuthorSheet { author: name, account_id, entries: rows });
    }
    report.buckets.push(PeopleBucket { label: label.clone(), authors: sheets });
  }
  report
}
