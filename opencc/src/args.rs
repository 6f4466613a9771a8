//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// OpenCC: an Anthropic Messages API proxy in front of OpenAI-compatible upstreams.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "OPENCC_CONFIG", default_value = "opencc.toml")]
    pub config: PathBuf,

    /// Port to listen on, when the config file doesn't set `server.listen_address`.
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Log filter string, e.g. `"info"` or `"server=debug,llm=debug"`.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_filter: String,

    /// Deployment environment, logged on startup for operators grepping aggregated logs.
    #[arg(long, env = "ENV", default_value = "production")]
    pub env: String,
}
