// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Jira REST v3 access behind a trait seam (search, worklogs, single issue, field list)
// role: adapter/tracker-api
// inputs: Credentials (base URL, email, API token); env JWR_TEST_* fixtures for the mock implementation
// outputs: Raw serde_json::Value records; scope field id; worklog JQL
// side_effects: Network calls to the configured Jira site; reads process env in the mock
// invariants:
// - Pagination is owned here: nextPageToken for search, startAt/total for worklogs
// - 429 and 5xx responses are retried up to MAX_ATTEMPTS with backoff; other failures surface once
// - Error text never contains the email, token or base URL (redact)
// errors: anyhow errors with redacted context; callers decide whether they are fatal
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::NaiveDate;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::ext::serde_json::JsonFetch;

const PAGE_SIZE: u64 = 100;
const MAX_ATTEMPTS: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

const ENV_ISSUES: &str = "JWR_TEST_ISSUES_JSON";
const ENV_WORKLOGS: &str = "JWR_TEST_WORKLOGS_JSON";
const ENV_ISSUE: &str = "JWR_TEST_ISSUE_JSON";
const ENV_FIELDS: &str = "JWR_TEST_FIELDS_JSON";

// --- Trait seam for the tracker ---
pub trait TrackerApi: Send + Sync {
  /// All issues matching `jql`, restricted to `fields`.
  fn search_issues(&self, jql: &str, fields: &[String]) -> Result<Vec<Value>>;
  /// Every worklog of one issue.
  fn list_worklogs(&self, issue_key: &str) -> Result<Vec<Value>>;
  /// One issue record (`{key, fields}`) restricted to `fields`.
  fn fetch_issue(&self, key: &str, fields: &[String]) -> Result<Value>;
  /// Field catalog of the site.
  fn list_fields(&self) -> Result<Vec<Value>>;
}

/// Replace each non-empty secret in `text` with a mask.
pub fn redact(text: &str, secrets: &[&str]) -> String {
  let mut out = text.to_string();
  for s in secrets.iter().filter(|s| !s.is_empty()) {
    out = out.replace(s, "******");
  }
  out
}

#[derive(Clone)]
pub struct Credentials {
  pub base_url: String,
  pub email: String,
  pub token: String,
}

impl std::fmt::Debug for Credentials {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Credentials").field("base_url", &"******").field("email", &"******").finish_non_exhaustive()
  }
}

impl Credentials {
  /// All three parts must be non-blank; a trailing slash on the base URL is dropped.
  pub fn from_parts(base_url: Option<&str>, email: Option<&str>, token: Option<&str>) -> Option<Self> {
    let clean = |s: Option<&str>| s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
    Some(Self {
      base_url: clean(base_url)?.trim_end_matches('/').to_string(),
      email: clean(email)?,
      token: clean(token)?,
    })
  }

  pub fn redact(&self, text: &str) -> String {
    redact(text, &[&self.token, &self.email, &self.base_url])
  }

  fn basic_auth(&self) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", self.email, self.token)))
  }
}

struct JiraHttpApi {
  creds: Credentials,
  agent: ureq::Agent,
}

impl JiraHttpApi {
  fn new(creds: Credentials) -> Self {
    let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
    Self { creds, agent }
  }

  fn send(&self, method: &str, path: &str, query: &[(&str, String)], body: Option<&Value>) -> Result<Value> {
    let url = format!("{}{}", self.creds.base_url, path);
    let auth = self.creds.basic_auth();

    let mut attempt = 1;
    loop {
      let mut req = self
        .agent
        .request(method, &url)
        .set("Authorization", &auth)
        .set("Accept", "application/json");
      for (k, v) in query {
        req = req.query(k, v);
      }

      let res = match body {
        Some(b) => req.send_json(b),
        None => req.call(),
      };

      match res {
        Ok(resp) => {
          let text = resp
            .into_string()
            .map_err(|e| anyhow!(self.creds.redact(&format!("reading response from {url}: {e}"))))?;
          if text.trim().is_empty() {
            return Ok(json!({}));
          }
          return serde_json::from_str(&text)
            .map_err(|e| anyhow!(self.creds.redact(&format!("decoding response from {url}: {e}"))));
        }
        Err(ureq::Error::Status(code, resp)) if retryable(code) && attempt < MAX_ATTEMPTS => {
          let wait = backoff(attempt, resp.header("Retry-After"));
          warn!(status = code, attempt, wait_ms = wait.as_millis() as u64, "tracker busy; retrying");
          std::thread::sleep(wait);
          attempt += 1;
        }
        Err(ureq::Error::Status(code, resp)) => {
          let detail = resp.into_string().unwrap_or_default();
          return Err(anyhow!(self.creds.redact(&format!("HTTP {code} at {url}\n{detail}"))));
        }
        Err(e) => {
          return Err(anyhow!(self.creds.redact(&format!("request to {url} failed: {e}"))));
        }
      }
    }
  }
}

fn retryable(code: u16) -> bool {
  code == 429 || (500..600).contains(&code)
}

fn backoff(attempt: u32, retry_after: Option<&str>) -> Duration {
  match retry_after.and_then(|s| s.trim().parse::<u64>().ok()) {
    Some(secs) => Duration::from_secs(secs.min(30)),
    None => Duration::from_millis(500 * 2u64.pow(attempt - 1)),
  }
}

impl TrackerApi for JiraHttpApi {
  fn search_issues(&self, jql: &str, fields: &[String]) -> Result<Vec<Value>> {
    let mut issues = Vec::new();
    let mut next: Option<String> = None;

    loop {
      let mut payload = json!({ "jql": jql, "maxResults": PAGE_SIZE });
      if !fields.is_empty() {
        payload["fields"] = json!(fields);
      }
      if let Some(t) = &next {
        payload["nextPageToken"] = json!(t);
      }

      let page = self.send("POST", "/rest/api/3/search/jql", &[], Some(&payload))?;
      let batch = page.fetch("issues").to_or_default::<Vec<Value>>();
      debug!(count = batch.len(), "search page");
      issues.extend(batch);

      if page.fetch("isLast").to::<bool>().unwrap_or(true) {
        break;
      }
      match page.fetch("nextPageToken").text() {
        Some(t) => next = Some(t),
        None => break,
      }
    }

    Ok(issues)
  }

  fn list_worklogs(&self, issue_key: &str) -> Result<Vec<Value>> {
    let path = format!("/rest/api/3/issue/{issue_key}/worklog");
    let mut logs = Vec::new();
    let mut start_at = 0u64;

    loop {
      let query = [("startAt", start_at.to_string()), ("maxResults", PAGE_SIZE.to_string())];
      let page = self.send("GET", &path, &query, None)?;
      let batch = page.fetch("worklogs").to_or_default::<Vec<Value>>();
      let got = batch.len() as u64;
      logs.extend(batch);

      let total = page.fetch("total").to::<u64>().unwrap_or(logs.len() as u64);
      start_at += got;
      if got == 0 || start_at >= total {
        break;
      }
    }

    Ok(logs)
  }

  fn fetch_issue(&self, key: &str, fields: &[String]) -> Result<Value> {
    let path = format!("/rest/api/3/issue/{key}");
    let query = [("fields", fields.join(","))];
    self.send("GET", &path, &query, None)
  }

  fn list_fields(&self) -> Result<Vec<Value>> {
    let v = self.send("GET", "/rest/api/3/field", &[], None)?;
    Ok(v.fetch("").to_or_default::<Vec<Value>>())
  }
}

/// Fixture-backed tracker driven by JWR_TEST_* variables.
struct TrackerEnvApi;

fn env_json(var: &str) -> Result<Option<Value>> {
  match std::env::var(var) {
    Ok(s) => serde_json::from_str(&s).map(Some).with_context(|| format!("parsing {var}")),
    Err(_) => Ok(None),
  }
}

impl TrackerApi for TrackerEnvApi {
  fn search_issues(&self, _jql: &str, _fields: &[String]) -> Result<Vec<Value>> {
    Ok(env_json(ENV_ISSUES)?.map(|v| v.fetch("").to_or_default()).unwrap_or_default())
  }

  fn list_worklogs(&self, issue_key: &str) -> Result<Vec<Value>> {
    let Some(map) = env_json(ENV_WORKLOGS)? else {
      return Ok(Vec::new());
    };
    Ok(map.get(issue_key).map(|v| v.fetch("").to_or_default()).unwrap_or_default())
  }

  fn fetch_issue(&self, key: &str, _fields: &[String]) -> Result<Value> {
    env_json(ENV_ISSUE)?
      .and_then(|map| map.get(key).cloned())
      .ok_or_else(|| anyhow!("HTTP 404 for issue {key}"))
  }

  fn list_fields(&self) -> Result<Vec<Value>> {
    Ok(env_json(ENV_FIELDS)?.map(|v| v.fetch("").to_or_default()).unwrap_or_default())
  }
}

pub fn env_wants_mock() -> bool {
  [ENV_ISSUES, ENV_WORKLOGS, ENV_ISSUE, ENV_FIELDS]
    .iter()
    .any(|k| std::env::var(k).is_ok())
}

/// Pick the implementation for this run: fixtures when present, HTTP otherwise.
pub fn build_api(creds: Option<Credentials>) -> Result<Box<dyn TrackerApi>> {
  if env_wants_mock() {
    info!("using fixture tracker from JWR_TEST_* env");
    return Ok(Box::new(TrackerEnvApi));
  }
  match creds {
    Some(c) => Ok(Box::new(JiraHttpApi::new(c))),
    None => Err(anyhow!(
      "missing Jira credentials: pass --base-url, --email and --token (or JIRA_BASE_URL, JIRA_EMAIL, JIRA_API_TOKEN)"
    )),
  }
}

// Public constructors for dependency injection in tests.
#[cfg(any(test, feature = "testutil"))]
pub fn make_http_api(creds: Credentials) -> Box<dyn TrackerApi> {
  Box::new(JiraHttpApi::new(creds))
}
#[cfg(any(test, feature = "testutil"))]
pub fn make_env_api() -> Box<dyn TrackerApi> {
  Box::new(TrackerEnvApi)
}

const SCOPE_FIELD_NAMES: [&str; 2] = ["scope", "scope[dropdown]"];

/// Choose the scope custom field from a field catalog: exact name or clause
/// match first, else the first field whose name mentions "scope".
pub fn pick_scope_field(fields: &[Value]) -> Option<String> {
  let mut fallback = None;
  for f in fields {
    let Some(id) = f.fetch("id").text() else { continue };
    let name = f.fetch("name").text().unwrap_or_default().to_lowercase();
    let clauses: Vec<String> = f.fetch("clauseNames").to_or_default();
    let wanted = |s: &str| SCOPE_FIELD_NAMES.contains(&s.trim().to_lowercase().as_str());

    if wanted(&name) || clauses.iter().any(|c| wanted(c)) {
      return Some(id);
    }
    if fallback.is_none() && name.contains("scope") {
      fallback = Some(id);
    }
  }
  fallback
}

/// Look up the scope field id; a failing catalog request only disables the column.
pub fn find_scope_field(api: &dyn TrackerApi) -> Option<String> {
  match api.list_fields() {
    Ok(fields) => {
      let found = pick_scope_field(&fields);
      match &found {
        Some(id) => info!(field = %id, "detected scope field"),
        None => warn!("no scope field found; explicit scope will be empty"),
      }
      found
    }
    Err(err) => {
      warn!(error = %err, "could not list fields; explicit scope will be empty");
      None
    }
  }
}

/// Issues with worklogs dated within `from..=to`, optionally narrowed by a user JQL.
pub fn worklog_jql(from: NaiveDate, to: NaiveDate, scope: Option<&str>) -> String {
  let dates = format!(
    "worklogDate >= \"{}\" AND worklogDate <= \"{}\"",
    from.format("%Y-%m-%d"),
    to.format("%Y-%m-%d")
  );
  match scope.map(str::trim).filter(|s| !s.is_empty()) {
    Some(s) => format!("({s}) AND ({dates})"),
    None => dates,
  }
}
