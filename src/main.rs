use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod cli;
mod effort;
mod ext;
mod hierarchy;
mod initiative;
mod manifest;
mod model;
mod normalize;
mod params;
mod people;
mod range_processor;
mod render;
mod summary;
mod tracker;
mod util;
mod window;

use crate::cli::{normalize, Cli};

/// RUST_LOG wins; otherwise warn, or debug with --debug.
fn init_tracing(debug: bool) {
  let fallback = if debug { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
  let _ = fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).try_init();
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  if cli.gen_man {
    let page = util::render_man_page::<Cli>()?;
    print!("{}", page);
    return Ok(());
  }

  init_tracing(cli.debug);

  // Phase 1: normalize CLI
  let cfg = normalize(cli)?;

  // Phase 2: resolve now
  let now_opt = crate::window::parse_now_override(cfg.now_override.as_deref());

  // Phase 3: fetch, aggregate and write
  crate::range_processor::process(&cfg, now_opt)
}
