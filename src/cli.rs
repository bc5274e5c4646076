// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Command-line surface and its normalization into an EffectiveConfig
// role: cli/config
// inputs: argv and JIRA_* env (clap derive)
// outputs: EffectiveConfig (window, grain override, field mapping, roll-up mapping, output flags)
// invariants:
// - Exactly one of --month | --from/--to | --for selects the window
// - --author implies --people
// - --rollup-scope pairs replace the default mapping as a whole
// errors: Ambiguous or incomplete window selection; malformed RAW=GROUP pairs
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use anyhow::{bail, Result};
use clap::Parser;

use crate::normalize::DEFAULT_EPIC_LINK_FIELD;
use crate::summary::ScopeRollup;
use crate::tracker::Credentials;
use crate::window::{Granularity, ReportTz, WindowSpec};

#[derive(Parser, Debug)]
#[command(
    name = "jira-worklog-report",
    version,
    about = "Export Jira worklogs as epic-rooted, time-bucketed hierarchy reports (JSON)",
    long_about = None
)]
pub struct Cli {
  /// Jira site, e.g. https://example.atlassian.net
  #[arg(long, env = "JIRA_BASE_URL")]
  pub base_url: Option<String>,

  /// Account email for basic auth
  #[arg(long, env = "JIRA_EMAIL")]
  pub email: Option<String>,

  /// API token for basic auth
  #[arg(long, env = "JIRA_API_TOKEN", hide_env_values = true)]
  pub token: Option<String>,

  /// Calendar month, e.g. 2025-04
  #[arg(long)]
  pub month: Option<String>,

  /// First month of an inclusive range (YYYY-MM); must be paired with --to
  #[arg(long)]
  pub from: Option<String>,

  /// Last month of an inclusive range (YYYY-MM); must be paired with --from
  #[arg(long)]
  pub to: Option<String>,

  /// Natural language window, e.g. "last month" or "every week for the last 4 weeks"
  #[arg(long = "for")]
  pub for_str: Option<String>,

  /// Bucket size (default: monthly, or weekly for "every week ..." phrases)
  #[arg(long, value_enum)]
  pub grain: Option<Granularity>,

  /// Extra JQL narrowing the issue search, e.g. "project = PAY"
  #[arg(long)]
  pub jql_scope: Option<String>,

  /// Custom field holding the scope value (default: auto-detect)
  #[arg(long)]
  pub scope_field: Option<String>,

  /// Custom field holding the epic link
  #[arg(long, default_value = DEFAULT_EPIC_LINK_FIELD)]
  pub epic_link_field: String,

  /// Roll-up mapping RAW=GROUP (repeatable; replaces Planned, Unplanned, Bug=Planned)
  #[arg(long = "rollup-scope", value_name = "RAW=GROUP")]
  pub rollup_scope: Vec<String>,

  /// Include the per-author worklog listing
  #[arg(long)]
  pub people: bool,

  /// Restrict the per-author listing to one account id (implies --people)
  #[arg(long, value_name = "ACCOUNT_ID")]
  pub author: Option<String>,

  /// Report time zone: local, utc or an IANA name (e.g. Europe/Vienna)
  #[arg(long, default_value = "utc")]
  pub tz: ReportTz,

  /// Output location:
  /// - single report: file path (default stdout "-")
  /// - with `--split-apart`: base directory (default: auto-named temp dir)
  #[arg(long, default_value = "-")]
  pub out: String,

  /// Write one file per bucket plus manifest.json instead of a single document
  #[arg(long)]
  pub split_apart: bool,

  /// Verbose diagnostics on stderr (RUST_LOG takes precedence)
  #[arg(long)]
  pub debug: bool,

  /// Emit a troff man page to stdout (internal; for packaging)
  #[arg(long, hide = true)]
  pub gen_man: bool,

  /// Override the "now" instant for natural-language parsing (hidden; tests only)
  #[arg(long = "now-override", hide = true)]
  pub now_override: Option<String>,
}

#[derive(Debug)]
pub struct EffectiveConfig {
  pub credentials: Option<Credentials>,
  pub window: WindowSpec,
  pub grain: Option<Granularity>,
  pub jql_scope: Option<String>,
  pub scope_field: Option<String>,
  pub epic_link_field: String,
  pub rollup: ScopeRollup,
  pub people: bool,
  pub author: Option<String>,
  pub tz: ReportTz,
  pub out: String,
  pub split_apart: bool,
  pub now_override: Option<String>,
}

pub fn normalize(cli: Cli) -> Result<EffectiveConfig> {
  // Validate window selection
  let window = match (&cli.month, &cli.for_str, &cli.from, &cli.to) {
    (Some(ym), None, None, None) => WindowSpec::Month { ym: ym.clone() },
    (None, Some(p), None, None) => WindowSpec::ForPhrase { phrase: p.clone() },
    (None, None, Some(f), Some(t)) => WindowSpec::FromTo { from: f.clone(), to: t.clone() },
    (None, None, None, None) => {
      bail!("Provide one of --month, --for, or (--from AND --to)")
    }
    (None, None, _, _) => bail!("--from and --to must be given together"),
    _ => bail!("Ambiguous time selection: choose only one of --month | --for | --from/--to"),
  };

  let rollup = if cli.rollup_scope.is_empty() {
    ScopeRollup::default()
  } else {
    let pairs = cli.rollup_scope.iter().map(|p| ScopeRollup::parse_pair(p)).collect::<Result<Vec<_>>>()?;
    ScopeRollup::from_pairs(pairs)
  };

  let blank_to_none = |s: Option<String>| s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

  Ok(EffectiveConfig {
    credentials: Credentials::from_parts(cli.base_url.as_deref(), cli.email.as_deref(), cli.token.as_deref()),
    window,
    grain: cli.grain,
    jql_scope: blank_to_none(cli.jql_scope),
    scope_field: blank_to_none(cli.scope_field),
    epic_link_field: cli.epic_link_field.trim().to_string(),
    rollup,
    people: cli.people || cli.author.is_some(),
    author: blank_to_none(cli.author),
    tz: cli.tz,
    out: cli.out,
    split_apart: cli.split_apart,
    now_override: cli.now_override,
  })
}
