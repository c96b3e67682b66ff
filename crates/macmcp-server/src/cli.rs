/*! Command-line configuration (spec §10.2). No flag changes the protocol surface — the
binary always runs the stdio JSON-RPC loop; flags only tune logging and defaults. */

use clap::Parser;

/// MacMCP: a line-framed JSON-RPC accessibility automation server for macOS.
#[derive(Debug, Parser)]
#[command(name = "macmcp-server", version, about)]
pub struct Cli {
  /// Minimum log level (`error`, `warn`, `info`, `debug`, `trace`).
  #[arg(long, default_value = "info")]
  pub log_level: String,

  /// Write logs to this file instead of stderr. Stdout is never a valid log
  /// target: it carries the JSON-RPC stream.
  #[arg(long)]
  pub log_file: Option<std::path::PathBuf>,

  /// Default `maxDepth` applied to a snapshot capture when a tool call omits it.
  #[arg(long, default_value_t = macmcp_core::snapshot::DEFAULT_MAX_DEPTH)]
  pub max_depth: usize,

  /// Per-platform-call deadline in milliseconds (spec §5).
  #[arg(long, default_value_t = 5000)]
  pub request_timeout_ms: u64,
}
