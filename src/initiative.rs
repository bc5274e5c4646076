// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Resolve the epic (initiative) each issue belongs to, with per-run memoization
// role: core/initiative-resolver
// inputs: normalized Issues; TrackerApi for single-issue lookups on cache misses; ResolverCaches owned by the caller
// outputs: Option<Initiative> per issue key
// side_effects: Network lookups through TrackerApi (names, parent snapshots); appends to caches
// invariants:
// - Order: own epic object > own epic link > parent is epic > parent's inline epic > parent memo > fetched parent
// - Lookup failures never escape; they resolve to None and are memoized
// - At most one fetch per name key and per parent key per run, also under parallel resolution
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use once_cell::sync::OnceCell;
use rayon::prelude::*;
use tracing::debug;

use crate::ext::serde_json::JsonFetch;
use crate::normalize::{FieldMap, InitiativeRef, Issue, ParentRef};
use crate::tracker::TrackerApi;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Initiative {
  pub key: String,
  pub name: Option<String>,
}

/// Per-key compute-once cells; distinct keys never block each other.
struct KeyedOnce<V> {
  cells: Mutex<HashMap<String, Arc<OnceCell<V>>>>,
}

impl<V> Default for KeyedOnce<V> {
  fn default() -> Self {
    Self { cells: Mutex::new(HashMap::new()) }
  }
}

impl<V: Clone> KeyedOnce<V> {
  fn get_or_fetch(&self, key: &str, fetch: impl FnOnce() -> V) -> V {
    let cell = {
      let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
      Arc::clone(cells.entry(key.to_string()).or_default())
    };
    cell.get_or_init(fetch).clone()
  }
}

/// Memoization state for one report run. Append-only; dropped with the run.
#[derive(Default)]
pub struct ResolverCaches {
  by_issue: Mutex<HashMap<String, Option<Initiative>>>,
  names: KeyedOnce<Option<String>>,
  parents: KeyedOnce<Option<ParentRef>>,
  lookups: AtomicUsize,
}

impl ResolverCaches {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of single-issue fetches issued so far.
  pub fn lookups(&self) -> usize {
    self.lookups.load(Ordering::Relaxed)
  }

  fn memo(&self, issue_key: &str) -> Option<Option<Initiative>> {
    let map = self.by_issue.lock().unwrap_or_else(PoisonError::into_inner);
    map.get(issue_key).cloned()
  }

  /// First write wins, so concurrent resolutions of one key agree.
  fn remember(&self, issue_key: &str, value: Option<Initiative>) -> Option<Initiative> {
    let mut map = self.by_issue.lock().unwrap_or_else(PoisonError::into_inner);
    map.entry(issue_key.to_string()).or_insert(value).clone()
  }
}

pub struct InitiativeResolver<'a> {
  api: &'a dyn TrackerApi,
  fields: &'a FieldMap,
  caches: &'a ResolverCaches,
}

impl<'a> InitiativeResolver<'a> {
  pub fn new(api: &'a dyn TrackerApi, fields: &'a FieldMap, caches: &'a ResolverCaches) -> Self {
    Self { api, fields, caches }
  }

  pub fn resolve(&self, issue: &Issue) -> Option<Initiative> {
    if let Some(hit) = self.caches.memo(&issue.key) {
      return hit;
    }
    let found = self.resolve_uncached(issue);
    debug!(issue = %issue.key, initiative = ?found.as_ref().map(|i| &i.key), "resolved initiative");
    self.caches.remember(&issue.key, found)
  }

  fn resolve_uncached(&self, issue: &Issue) -> Option<Initiative> {
    if let Some(r) = &issue.initiative {
      return Some(self.materialize(r));
    }

    let parent = issue.parent.as_ref()?;

    if let Some(found) = self.from_parent(parent) {
      return Some(found);
    }

    if let Some(hit) = self.caches.memo(&parent.key) {
      return hit;
    }

    let fetched = self.caches.parents.get_or_fetch(&parent.key, || self.fetch_parent(&parent.key))?;
    let found = self.from_parent(&fetched);
    self.caches.remember(&parent.key, found)
  }

  /// The parent is the epic, or carries one itself.
  fn from_parent(&self, parent: &ParentRef) -> Option<Initiative> {
    if parent.is_initiative() {
      return Some(Initiative { key: parent.key.clone(), name: parent.summary.clone() });
    }
    parent.initiative.as_ref().map(|r| self.materialize(r))
  }

  fn materialize(&self, r: &InitiativeRef) -> Initiative {
    match r {
      InitiativeRef::Object { key, name: Some(name) } => Initiative { key: key.clone(), name: Some(name.clone()) },
      other => Initiative { key: other.key().to_string(), name: self.initiative_name(other.key()) },
    }
  }

  /// Display name for an initiative key, fetched at most once per run.
  pub fn initiative_name(&self, key: &str) -> Option<String> {
    self.caches.names.get_or_fetch(key, || {
      self.caches.lookups.fetch_add(1, Ordering::Relaxed);
      match self.api.fetch_issue(key, &["summary".to_string()]) {
        Ok(record) => record.fetch("fields.summary").text(),
        Err(err) => {
          debug!(initiative = %key, error = %err, "initiative name lookup failed");
          None
        }
      }
    })
  }

  fn fetch_parent(&self, key: &str) -> Option<ParentRef> {
    self.caches.lookups.fetch_add(1, Ordering::Relaxed);
    match self.api.fetch_issue(key, &self.fields.parent_fields()) {
      Ok(record) => Some(ParentRef::from_record(key, &record, self.fields)),
      Err(err) => {
        debug!(parent = %key, error = %err, "parent lookup failed");
        None
      }
    }
  }

  /// Resolve a whole issue set. Issues are processed in dependency levels
  /// (parents outside the set first), each level in parallel, so a child can
  /// always reuse its parent's memoized result.
  pub fn resolve_all(&self, issues: &[Issue]) -> BTreeMap<String, Option<Initiative>> {
    let mut out = BTreeMap::new();
    for level in dependency_levels(issues) {
      let resolved: Vec<(String, Option<Initiative>)> =
        level.par_iter().map(|issue| (issue.key.clone(), self.resolve(issue))).collect();
      out.extend(resolved);
    }
    out
  }
}

/// Group issues by their distance to a parent outside the set (cycle-guarded).
fn dependency_levels(issues: &[Issue]) -> Vec<Vec<&Issue>> {
  let by_key: HashMap<&str, &Issue> = issues.iter().map(|i| (i.key.as_str(), i)).collect();
  let mut levels: Vec<Vec<&Issue>> = Vec::new();

  for issue in issues {
    let mut depth = 0usize;
    let mut seen: HashSet<&str> = HashSet::from([issue.key.as_str()]);
    let mut cur = issue;
    while let Some(parent) = cur.raw_parent().and_then(|p| by_key.get(p)) {
      if !seen.insert(parent.key.as_str()) {
        break;
      }
      depth += 1;
      cur = parent;
    }
    if levels.len() <= depth {
      levels.resize_with(depth + 1, Vec::new);
    }
    levels[depth].push(issue);
  }

  levels
}
