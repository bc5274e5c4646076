// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Dotted-path lookups over Jira JSON records with typed, non-panicking extraction
// role: extension/serde_json
// outputs: JsonFetch trait and JsonFetched wrapper (typed extraction, non-empty text, first-of-paths)
// invariants: No panics; missing paths and JSON null yield None; blank strings count as absent for text()
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use serde::de::DeserializeOwned;

/// A located (or missing) JSON value, extracted in a second explicit step.
pub struct JsonFetched<'a> {
  inner: Option<&'a serde_json::Value>,
}

impl<'a> JsonFetched<'a> {
  /// The raw value, with JSON `null` treated as missing.
  pub fn value(&self) -> Option<&'a serde_json::Value> {
    self.inner.filter(|v| !v.is_null())
  }

  /// Attempt to deserialize the fetched value as `T`.
  pub fn to<T>(&self) -> Option<T>
  where
    T: DeserializeOwned,
  {
    self.value().and_then(|v| serde_json::from_value::<T>(v.clone()).ok())
  }

  /// Deserialize as `T`, returning `T::default()` on failure.
  pub fn to_or_default<T>(&self) -> T
  where
    T: DeserializeOwned + Default,
  {
    self.to::<T>().unwrap_or_default()
  }

  /// A trimmed, non-empty string; numbers are rendered as text (Jira ids arrive as both).
  pub fn text(&self) -> Option<String> {
    let s = match self.value()? {
      serde_json::Value::String(s) => s.trim().to_string(),
      serde_json::Value::Number(n) => n.to_string(),
      _ => return None,
    };
    (!s.is_empty()).then_some(s)
  }
}

/// Extension to fetch nested values via dotted paths like "fields.parent.key".
pub trait JsonFetch {
  fn fetch(&self, path: &str) -> JsonFetched<'_>;

  /// First path (in order) that resolves to non-empty text.
  fn first_text(&self, paths: &[&str]) -> Option<String> {
    paths.iter().find_map(|p| self.fetch(p).text())
  }
}

impl JsonFetch for serde_json::Value {
  fn fetch(&self, path: &str) -> JsonFetched<'_> {
    if path.is_empty() {
      return JsonFetched { inner: Some(self) };
    }

    let mut cur = self;

    for key in path.split('.') {
      match cur.get(key) {
        Some(next) => cur = next,
        None => return JsonFetched { inner: None },
      }
    }

    JsonFetched { inner: Some(cur) }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fetch_nested_issue_fields() {
    let v: serde_json::Value = serde_json::json!({
      "key": "ABC-1",
      "fields": { "issuetype": { "name": "Story" }, "parent": null, "timeSpent": 3600 }
    });

    assert_eq!(v.fetch("key").to::<String>().as_deref(), Some("ABC-1"));
    assert_eq!(v.fetch("fields.issuetype.name").text().as_deref(), Some("Story"));
    assert!(v.fetch("fields.parent").value().is_none());
    assert_eq!(v.fetch("fields.timeSpent").text().as_deref(), Some("3600"));
    assert_eq!(v.fetch("fields.missing.deeper").to::<String>(), None);
  }

  #[test]
  fn blank_text_is_absent_and_first_text_skips_it() {
    let v: serde_json::Value = serde_json::json!({ "a": "  ", "b": { "name": "Epic" } });
    assert_eq!(v.fetch("a").text(), None);
    assert_eq!(v.first_text(&["a", "b", "b.name"]).as_deref(), Some("Epic"));
    let s: String = v.fetch("nope").to_or_default();
    assert_eq!(s, "");
  }
}
