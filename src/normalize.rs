// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Turn raw Jira issue records (several field-encoding conventions) into typed Issue values
// role: core/normalizer
// inputs: serde_json::Value issue records; FieldMap naming the scope and epic-link custom fields
// outputs: Issue, ParentRef, InitiativeRef
// invariants:
// - Total: never fails; a malformed field falls back to its empty default and the rest still parse
// - Each semantic field is read through an ordered path table; the first path with a value wins
// - No network access
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use serde_json::Value;
use tracing::debug;

use crate::ext::serde_json::JsonFetch;

pub const DEFAULT_EPIC_LINK_FIELD: &str = "customfield_10014";

/// Issue type tag of top-level initiatives.
pub const INITIATIVE_TYPE: &str = "Epic";

/// Which custom fields carry project-specific values on this tenant.
#[derive(Debug, Clone)]
pub struct FieldMap {
  pub epic_link_field: String,
  pub scope_field: Option<String>,
}

impl Default for FieldMap {
  fn default() -> Self {
    Self { epic_link_field: DEFAULT_EPIC_LINK_FIELD.to_string(), scope_field: None }
  }
}

impl FieldMap {
  /// Field list for the bulk issue search.
  pub fn search_fields(&self) -> Vec<String> {
    let mut fields: Vec<String> = ["summary", "issuetype", "parent", "epic", "fixVersions"]
      .iter()
      .map(|s| s.to_string())
      .collect();
    fields.push(self.epic_link_field.clone());
    if let Some(scope) = &self.scope_field {
      fields.push(scope.clone());
    }
    fields
  }

  /// Field list for the single parent fetch done on resolver cache misses.
  pub fn parent_fields(&self) -> Vec<String> {
    vec!["issuetype".into(), "summary".into(), "epic".into(), self.epic_link_field.clone()]
  }
}

/// Outcome of reading one field from one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted<T> {
  Found(T),
  Absent,
  Malformed(&'static str),
}

impl<T> Extracted<T> {
  pub fn found(self) -> Option<T> {
    match self {
      Extracted::Found(v) => Some(v),
      _ => None,
    }
  }
}

impl<T: Default> Extracted<T> {
  /// The found value, else the default; malformed input is logged, never raised.
  pub fn or_default(self, issue: &str, field: &str) -> T {
    match self {
      Extracted::Found(v) => v,
      Extracted::Absent => T::default(),
      Extracted::Malformed(reason) => {
        debug!(issue, field, reason, "malformed field, using default");
        T::default()
      }
    }
  }
}

/// Try `paths` in order and decode each located value; the first `Found` wins.
/// When nothing is found, a malformed hit is reported over plain absence.
fn first_decoded<T>(record: &Value, paths: &[&str], decode: fn(&Value) -> Extracted<T>) -> Extracted<T> {
  let mut outcome = Extracted::Absent;
  for path in paths {
    let Some(v) = record.fetch(path).value() else { continue };
    match decode(v) {
      Extracted::Found(x) => return Extracted::Found(x),
      Extracted::Malformed(why) => outcome = Extracted::Malformed(why),
      Extracted::Absent => {}
    }
  }
  outcome
}

// --- shape decoders ---

fn decode_text(v: &Value) -> Extracted<String> {
  match v {
    Value::String(s) if s.trim().is_empty() => Extracted::Absent,
    Value::String(s) => Extracted::Found(s.trim().to_string()),
    Value::Number(n) => Extracted::Found(n.to_string()),
    Value::Object(_) | Value::Array(_) => Extracted::Malformed("expected text"),
    _ => Extracted::Absent,
  }
}

/// Issue keys: non-empty strings only.
fn decode_key(v: &Value) -> Extracted<String> {
  match v {
    Value::String(s) if s.trim().is_empty() => Extracted::Absent,
    Value::String(s) => Extracted::Found(s.trim().to_string()),
    Value::Null => Extracted::Absent,
    _ => Extracted::Malformed("expected key string"),
  }
}

/// `{"value": ..}` or `{"name": ..}` as used by option and version objects.
fn decode_tagged(v: &Value) -> Extracted<String> {
  match v {
    Value::Object(_) => match v.first_text(&["value", "name"]) {
      Some(s) => Extracted::Found(s),
      None => Extracted::Malformed("object without value/name"),
    },
    _ => Extracted::Malformed("expected object"),
  }
}

/// Category values: scalar, single tagged object, or a list of either.
fn decode_category(v: &Value) -> Extracted<String> {
  match v {
    Value::Object(_) => decode_tagged(v),
    Value::Array(items) => {
      let parts: Vec<String> = items
        .iter()
        .filter_map(|item| match item {
          Value::Object(_) => decode_tagged(item).found(),
          Value::Bool(b) => Some(b.to_string()),
          other => decode_text(other).found(),
        })
        .collect();
      if parts.is_empty() {
        Extracted::Absent
      } else {
        Extracted::Found(parts.join(", "))
      }
    }
    Value::Bool(b) => Extracted::Found(b.to_string()),
    other => decode_text(other),
  }
}

/// Release labels: list of tagged objects or bare strings.
fn decode_labels(v: &Value) -> Extracted<Vec<String>> {
  let Value::Array(items) = v else {
    return Extracted::Malformed("expected list");
  };
  let labels: Vec<String> = items
    .iter()
    .filter_map(|item| match item {
      Value::Object(_) => item.first_text(&["value", "name"]),
      other => decode_text(other).found(),
    })
    .collect();
  Extracted::Found(labels)
}

fn decode_initiative_object(v: &Value) -> Extracted<InitiativeRef> {
  if !v.is_object() {
    return Extracted::Malformed("epic is not an object");
  }
  match v.first_text(&["key", "id"]) {
    Some(key) => Extracted::Found(InitiativeRef::Object { key, name: v.first_text(&["name", "summary"]) }),
    None => Extracted::Malformed("epic object without key/id"),
  }
}

/// How an issue (or its parent) points at its initiative.
#[derive(Debug, Clone, PartialEq)]
pub enum InitiativeRef {
  /// Team-managed projects: an embedded `epic` object.
  Object { key: String, name: Option<String> },
  /// Company-managed projects: an epic-link custom field holding the key.
  Link(String),
}

impl InitiativeRef {
  pub fn key(&self) -> &str {
    match self {
      InitiativeRef::Object { key, .. } | InitiativeRef::Link(key) => key,
    }
  }
}

/// Read the initiative reference from an issue `fields` object.
fn initiative_ref(fields: &Value, map: &FieldMap) -> Option<InitiativeRef> {
  first_decoded(fields, &["epic"], decode_initiative_object)
    .found()
    .or_else(|| {
      first_decoded(fields, &[map.epic_link_field.as_str()], decode_text)
        .found()
        .map(InitiativeRef::Link)
    })
}

/// What is known about a parent issue, inline or fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentRef {
  pub key: String,
  pub issue_type: Option<String>,
  pub summary: Option<String>,
  pub initiative: Option<InitiativeRef>,
}

impl ParentRef {
  /// Decode a `{key, fields: {...}}` shaped record (inline parent or single-issue fetch).
  pub fn from_record(key: &str, record: &Value, map: &FieldMap) -> Self {
    let fields = record.fetch("fields").value().cloned().unwrap_or(Value::Null);
    ParentRef {
      key: key.to_string(),
      issue_type: first_decoded(&fields, &["issuetype.name", "issuetype"], decode_text).found(),
      summary: first_decoded(&fields, &["summary"], decode_text).found(),
      initiative: initiative_ref(&fields, map),
    }
  }

  pub fn is_initiative(&self) -> bool {
    self.issue_type.as_deref() == Some(INITIATIVE_TYPE)
  }
}

/// A normalized issue record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Issue {
  pub key: String,
  pub issue_type: String,
  pub summary: String,
  pub parent: Option<ParentRef>,
  pub initiative: Option<InitiativeRef>,
  /// Explicit scope value as displayed (lists joined with ", "); empty when unset.
  pub category: String,
  pub fix_versions: Vec<String>,
}

impl Issue {
  pub fn raw_parent(&self) -> Option<&str> {
    self.parent.as_ref().map(|p| p.key.as_str())
  }

  pub fn is_initiative(&self) -> bool {
    self.issue_type == INITIATIVE_TYPE
  }

  pub fn fix_versions_display(&self) -> String {
    self.fix_versions.join(", ")
  }
}

/// Normalize one raw search hit. Returns `None` only when the record has no key.
pub fn normalize_issue(record: &Value, map: &FieldMap) -> Option<Issue> {
  let key = record.fetch("key").text()?;
  let fields = record.fetch("fields").value().cloned().unwrap_or(Value::Null);

  let parent = first_decoded(&fields, &["parent.key", "parent"], decode_key)
    .found()
    .map(|pkey| match fields.fetch("parent").value() {
      Some(inline) if inline.is_object() => ParentRef::from_record(&pkey, inline, map),
      _ => ParentRef { key: pkey, issue_type: None, summary: None, initiative: None },
    });

  let category = match &map.scope_field {
    Some(field) => first_decoded(&fields, &[field.as_str()], decode_category).or_default(&key, field),
    None => String::new(),
  };

  Some(Issue {
    issue_type: first_decoded(&fields, &["issuetype.name", "issuetype"], decode_text).or_default(&key, "issuetype"),
    summary: first_decoded(&fields, &["summary"], decode_text).or_default(&key, "summary"),
    initiative: initiative_ref(&fields, map),
    fix_versions: first_decoded(&fields, &["fixVersions"], decode_labels).or_default(&key, "fixVersions"),
    parent,
    category,
    key,
  })
}
