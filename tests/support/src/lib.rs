//! test-support: helpers for robust, nextest-friendly tests.
//!
//! Add as a dev-dependency in your top-level `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test_support = { path = "tests/support", features = ["serde"] }
//! ```
//!
//! Then in tests:
//! ```rust
//! use test_support::{init_tracing, fixtures_dir};
//!
//! #[test]
//! fn example() {
//!     init_tracing();
//!     let _root = fixtures_dir();
//! }
//! ```

use once_cell::sync::Lazy;
use tracing_subscriber::{fmt, EnvFilter};

use std::{env, path::{Path, PathBuf}};

/// Environment variables read by the fixture-backed tracker, paired with their fixture files.
pub const TRACKER_FIXTURES: [(&str, &str); 4] = [
    ("JWR_TEST_ISSUES_JSON", "issues.json"),
    ("JWR_TEST_WORKLOGS_JSON", "worklogs.json"),
    ("JWR_TEST_ISSUE_JSON", "issue.json"),
    ("JWR_TEST_FIELDS_JSON", "fields.json"),
];

/// Credential variables the binary would otherwise pick up from the developer's shell.
pub const CREDENTIAL_VARS: [&str; 3] = ["JIRA_BASE_URL", "JIRA_EMAIL", "JIRA_API_TOKEN"];

/// Initialize `tracing` once, honoring `RUST_LOG` and writing via the test writer.
///
/// Safe to call from multiple tests; only the first call configures the global subscriber.
pub fn init_tracing() {
    static INIT: Lazy<()> = Lazy::new(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("warn,test=info"))
            .unwrap();
        // with_test_writer() causes logs to appear alongside failing tests only (cargo/nextest)
        let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
    });
    Lazy::force(&INIT);
}

/// Initialize insta snapshot settings once per test process.
///
/// Omits `Expression:` in snapshot headers for cleaner diffs.
pub fn init_insta() {
    static INIT: Lazy<()> = Lazy::new(|| {
        let mut settings = insta::Settings::clone_current();
        settings.set_omit_expression(true);
        // Bind settings to the thread for the remainder of the test process by leaking the guard
        let guard = settings.bind_to_scope();
        std::mem::forget(guard);
    });
    Lazy::force(&INIT);
}

/// Return the path to the repository's `tests/fixtures` directory.
///
/// This crate lives in `tests/support`, so the fixtures sit next to it; the path
/// is stable regardless of the runner's working directory (cargo vs nextest).
pub fn fixtures_dir() -> PathBuf {
    let support_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    support_dir.parent().map(Path::to_path_buf).unwrap_or(support_dir).join("fixtures")
}

/// Read a UTF-8 text fixture into a string.
pub fn read_fixture_text<P: AsRef<Path>>(rel_path: P) -> String {
    let path = fixtures_dir().join(rel_path);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
}

/// Deserialize a JSON fixture into `T` (enable `serde` feature).
#[cfg(feature = "serde")]
pub fn read_fixture_json<T, P>(rel_path: P) -> T
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = fixtures_dir().join(rel_path);
    let file = std::fs::File::open(&path)
        .unwrap_or_else(|e| panic!("failed to open fixture {}: {e}", path.display()));
    serde_json::from_reader::<_, T>(file)
        .unwrap_or_else(|e| panic!("failed to parse JSON fixture {}: {e}", path.display()))
}

/// Create a temp directory that deletes on drop.
pub fn tempdir() -> tempfile::TempDir {
    tempfile::tempdir().expect("create tempdir")
}

/// Set multiple environment variables for the duration of the returned guard.
pub fn with_env(vars: &[(&str, &str)]) -> EnvGuard {
    EnvGuard::apply(vars.iter().map(|(k, v)| (*k, Some(*v))))
}

/// Unset variables (e.g. the fixture tracker's) for the duration of the returned guard.
pub fn without_env(keys: &[&str]) -> EnvGuard {
    EnvGuard::apply(keys.iter().map(|k| (*k, None)))
}

/// Run a binary target with `assert_cmd`, returning the ready-to-run `Command`.
///
/// Credential variables are removed so a developer's shell never leaks into a test run.
pub fn cmd_bin(bin: &str) -> assert_cmd::Command {
    init_tracing();
    let mut cmd = assert_cmd::Command::cargo_bin(bin).expect("binary target not found");
    for var in CREDENTIAL_VARS {
        cmd.env_remove(var);
    }
    for (var, _) in TRACKER_FIXTURES {
        cmd.env_remove(var);
    }
    cmd
}

/// Like [`cmd_bin`], with the fixture-backed tracker wired to `tests/fixtures`.
pub fn cmd_with_fixtures(bin: &str) -> assert_cmd::Command {
    let mut cmd = cmd_bin(bin);
    for (var, file) in TRACKER_FIXTURES {
        cmd.env(var, read_fixture_text(file));
    }
    cmd
}

/// Guard for temporarily setting or unsetting environment variables; restores on drop.
pub struct EnvGuard {
    prev: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    fn apply<'a>(kv: impl Iterator<Item = (&'a str, Option<&'a str>)>) -> Self {
        let mut prev = Vec::new();
        for (k, v) in kv {
            prev.push((k.to_string(), env::var(k).ok()));
            match v {
                Some(v) => env::set_var(k, v),
                None => env::remove_var(k),
            }
        }
        Self { prev }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (k, old) in self.prev.drain(..) {
            match old {
                Some(v) => env::set_var(&k, v),
                None => env::remove_var(&k),
            }
        }
    }
}
