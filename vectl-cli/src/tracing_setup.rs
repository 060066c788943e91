//! Console logging for the vectl CLI
//!
//! Logs go to stderr so stdout stays clean for `--json` and `compose url`.
//!
//!   vectl --debug ...                   # debug, except the noisy dependencies
//!   RUST_LOG=vectl_embed=trace vectl    # explicit filter wins over --debug

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// sqlx logs every statement at info; keep it quiet unless asked for.
const QUIET_DEPENDENCIES: &str = "sqlx=warn,hyper=warn,reqwest=warn";

fn default_directives(debug: bool) -> String {
    let level = if debug { "debug" } else { "info" };
    format!("{level},{QUIET_DEPENDENCIES}")
}

fn env_filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(debug)))
}

pub fn init(debug: bool) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(debug))
        .with_writer(std::io::stderr)
        .with_target(debug)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}
