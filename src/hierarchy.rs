// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Per-bucket ancestor closure, display tree, scope inheritance, subtree totals and forest order
// role: core/hierarchy
// inputs: Catalog (normalized issues + resolved initiatives); bucket hours (issue -> unrounded hours)
// outputs: BucketForest; derived scope per node; initiative subtree totals; pre-order (key, depth) walk
// invariants:
// - Every issue with hours > 0 is a member; every loaded raw ancestor of one is a member
// - tree_parent is None or a member, and contains no cycles (loops are cut deterministically)
// - Initiative placeholders are typed "Epic", named from the resolution, and have no parent
// - Walks are iterative with explicit visited sets; output order is sorted by key at every level
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::initiative::Initiative;
use crate::normalize::{Issue, INITIATIVE_TYPE};

/// Default scope for work nothing above it categorizes.
pub const DEFAULT_SCOPE: &str = "Planned";

/// Loaded issues plus their resolved initiatives, shared by all buckets of a run.
#[derive(Debug, Default)]
pub struct Catalog {
  issues: BTreeMap<String, Issue>,
  initiative_of: BTreeMap<String, Option<Initiative>>,
}

impl Catalog {
  pub fn new(issues: Vec<Issue>, initiative_of: BTreeMap<String, Option<Initiative>>) -> Self {
    let issues = issues.into_iter().map(|i| (i.key.clone(), i)).collect();
    Self { issues, initiative_of }
  }

  pub fn get(&self, key: &str) -> Option<&Issue> {
    self.issues.get(key)
  }

  pub fn raw_parent(&self, key: &str) -> Option<&str> {
    self.issues.get(key).and_then(Issue::raw_parent)
  }

  pub fn initiative(&self, key: &str) -> Option<&Initiative> {
    self.initiative_of.get(key).and_then(Option::as_ref)
  }
}

/// The closure of one bucket and its display tree.
#[derive(Debug)]
pub struct BucketForest<'a> {
  catalog: &'a Catalog,
  pub members: BTreeSet<String>,
  pub tree_parent: BTreeMap<String, Option<String>>,
  /// Synthesized initiative nodes not present in the catalog.
  pub placeholders: BTreeMap<String, Issue>,
  pub hours: BTreeMap<String, f64>,
}

impl<'a> BucketForest<'a> {
  /// Build the closure for one bucket from its per-issue hours.
  pub fn build(catalog: &'a Catalog, bucket_hours: &BTreeMap<String, f64>) -> Self {
    let active: Vec<String> = bucket_hours.iter().filter(|(_, h)| **h > 0.0).map(|(k, _)| k.clone()).collect();
    let mut members: BTreeSet<String> = active.iter().cloned().collect();

    // loaded raw ancestors of every active issue
    for key in &active {
      let mut seen: HashSet<&str> = HashSet::from([key.as_str()]);
      let mut cur = key.as_str();
      while let Some(p) = catalog.raw_parent(cur).filter(|p| catalog.get(p).is_some()) {
        if !seen.insert(p) {
          break;
        }
        members.insert(p.to_string());
        cur = p;
      }
    }

    let mut tree_parent: BTreeMap<String, Option<String>> = members
      .iter()
      .map(|k| {
        let parent = catalog.raw_parent(k).filter(|p| members.contains(*p)).map(str::to_string);
        (k.clone(), parent)
      })
      .collect();

    let active_set: BTreeSet<&String> = active.iter().collect();
    let rest: Vec<String> = members.iter().filter(|k| !active_set.contains(k)).cloned().collect();
    cut_cycles(&mut tree_parent, active.iter().chain(rest.iter()));

    let mut forest = BucketForest { catalog, members, tree_parent, placeholders: BTreeMap::new(), hours: BTreeMap::new() };
    for key in &active {
      forest.attach_initiative(key);
    }

    forest.hours = forest.members.iter().map(|k| (k.clone(), bucket_hours.get(k).copied().unwrap_or(0.0))).collect();
    forest
  }

  /// Hang the top of `key`'s chain under its resolved initiative.
  fn attach_initiative(&mut self, key: &str) {
    let catalog = self.catalog;
    let Some(initiative) = catalog.initiative(key) else { return };
    let top = self.top_of(key);
    if initiative.key == top || self.is_initiative(&top) {
      return;
    }

    if self.members.insert(initiative.key.clone()) {
      let raw = catalog.raw_parent(&initiative.key).filter(|p| self.members.contains(*p)).map(str::to_string);
      self.tree_parent.insert(initiative.key.clone(), raw);
      if catalog.get(&initiative.key).is_none() {
        let placeholder = Issue {
          key: initiative.key.clone(),
          issue_type: INITIATIVE_TYPE.to_string(),
          summary: initiative.name.clone().unwrap_or_default(),
          ..Issue::default()
        };
        self.placeholders.insert(initiative.key.clone(), placeholder);
      }
    }

    if self.ancestors(&initiative.key).iter().any(|a| *a == top) {
      return;
    }
    self.tree_parent.insert(top, Some(initiative.key.clone()));
  }

  pub fn node(&self, key: &str) -> Option<&Issue> {
    self.catalog.get(key).or_else(|| self.placeholders.get(key))
  }

  pub fn is_initiative(&self, key: &str) -> bool {
    self.node(key).is_some_and(Issue::is_initiative)
  }

  fn explicit_scope(&self, key: &str) -> &str {
    self.node(key).map(|i| i.category.as_str()).unwrap_or("")
  }

  /// Tree parent, or `None` when unset or not a member.
  pub fn parent_of(&self, key: &str) -> Option<&str> {
    self
      .tree_parent
      .get(key)
      .and_then(|p| p.as_deref())
      .filter(|p| self.members.contains(*p))
  }

  /// Strict tree ancestors, nearest first.
  fn ancestors(&self, key: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen: HashSet<&str> = HashSet::from([key]);
    let mut cur = key;
    while let Some(p) = self.parent_of(cur) {
      if !seen.insert(p) {
        break;
      }
      out.push(p.to_string());
      cur = p;
    }
    out
  }

  fn top_of(&self, key: &str) -> String {
    self.ancestors(key).pop().unwrap_or_else(|| key.to_string())
  }

  /// Nearest initiative-typed node at or above `key`.
  pub fn enclosing_initiative(&self, key: &str) -> Option<String> {
    if self.is_initiative(key) {
      return Some(key.to_string());
    }
    self.ancestors(key).into_iter().find(|a| self.is_initiative(a))
  }

  /// Children per member, sorted by key; parents outside the closure make roots.
  pub fn children(&self) -> BTreeMap<Option<&str>, Vec<&str>> {
    let mut out: BTreeMap<Option<&str>, Vec<&str>> = BTreeMap::new();
    for k in &self.members {
      out.entry(self.parent_of(k)).or_default().push(k.as_str());
    }
    out
  }

  pub fn hours_of(&self, key: &str) -> f64 {
    self.hours.get(key).copied().unwrap_or(0.0)
  }
}

/// Remove the edge that closes each loop, walking from `order` in sequence.
fn cut_cycles<'k>(tree_parent: &mut BTreeMap<String, Option<String>>, order: impl Iterator<Item = &'k String>) {
  let mut settled: HashSet<String> = HashSet::new();
  for start in order {
    let mut path: Vec<String> = Vec::new();
    let mut on_path: HashSet<String> = HashSet::new();
    let mut cur = start.clone();
    loop {
      if settled.contains(&cur) {
        break;
      }
      if !on_path.insert(cur.clone()) {
        if let Some(last) = path.last() {
          tree_parent.insert(last.clone(), None);
        }
        break;
      }
      path.push(cur.clone());
      match tree_parent.get(&cur).cloned().flatten() {
        Some(p) => cur = p,
        None => break,
      }
    }
    settled.extend(path);
  }
}

/// Scope shown for `key`: its own value verbatim, else the nearest ancestor's,
/// else the default (never for initiatives).
pub fn derive_scope(forest: &BucketForest<'_>, key: &str) -> String {
  let own = forest.explicit_scope(key);
  if !own.is_empty() {
    return own.to_string();
  }

  let mut guard: HashSet<&str> = HashSet::from([key]);
  let mut cur = forest.parent_of(key);
  while let Some(p) = cur {
    if !guard.insert(p) {
      break;
    }
    let inherited = forest.explicit_scope(p);
    if !inherited.is_empty() {
      return inherited.to_string();
    }
    cur = forest.parent_of(p);
  }

  if forest.is_initiative(key) {
    String::new()
  } else {
    DEFAULT_SCOPE.to_string()
  }
}

/// Hours of every member's subtree (inclusive), post-order with a memo.
pub fn subtree_hours(forest: &BucketForest<'_>) -> HashMap<String, f64> {
  let children = forest.children();
  let mut memo: HashMap<String, f64> = HashMap::new();
  let mut open: HashSet<&str> = HashSet::new();

  for root in &forest.members {
    let mut stack: Vec<(&str, bool)> = vec![(root.as_str(), false)];
    while let Some((node, expanded)) = stack.pop() {
      if memo.contains_key(node) {
        continue;
      }
      if expanded {
        let kids = children.get(&Some(node)).map(Vec::as_slice).unwrap_or(&[]);
        let total = forest.hours_of(node) + kids.iter().map(|c| memo.get(*c).copied().unwrap_or(0.0)).sum::<f64>();
        memo.insert(node.to_string(), total);
        continue;
      }
      if !open.insert(node) {
        continue;
      }
      stack.push((node, true));
      for c in children.get(&Some(node)).into_iter().flatten() {
        if !memo.contains_key(*c) {
          stack.push((*c, false));
        }
      }
    }
  }
  memo
}

/// Subtree totals of the initiative-typed members.
pub fn subtree_totals(forest: &BucketForest<'_>) -> BTreeMap<String, f64> {
  subtree_hours(forest).into_iter().filter(|(k, _)| forest.is_initiative(k)).collect()
}

/// Depth-first pre-order `(key, depth)` from the sorted roots.
pub fn walk_forest(forest: &BucketForest<'_>) -> Vec<(String, usize)> {
  let children = forest.children();
  let mut out = Vec::with_capacity(forest.members.len());
  let mut seen: HashSet<&str> = HashSet::new();
  let mut stack: Vec<(&str, usize)> = children.get(&None).into_iter().flatten().rev().map(|r| (*r, 0)).collect();

  while let Some((node, depth)) = stack.pop() {
    if !seen.insert(node) {
      continue;
    }
    out.push((node.to_string(), depth));
    for c in children.get(&Some(node)).into_iter().flatten().rev() {
      stack.push((*c, depth + 1));
    }
  }
  out
}
