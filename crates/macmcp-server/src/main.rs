/*! Process entry point: parses CLI flags, wires up logging, and runs the stdio loop. */

use clap::Parser;
use macmcp_server::{Cli, Config, PlatformThread, Registry};
use std::fs::OpenOptions;
use std::io::{self, BufReader};
use std::time::Duration;

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
  let mut builder = env_logger::Builder::new();
  builder.filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Info));

  match &cli.log_file {
    // Stdout carries the JSON-RPC stream; logs never go there.
    Some(path) => {
      let file = OpenOptions::new().create(true).append(true).open(path)?;
      builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    None => builder.target(env_logger::Target::Stderr),
  }
  builder.init();
  Ok(())
}

fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();
  init_logging(&cli)?;

  log::info!("macmcp-server {} starting", env!("CARGO_PKG_VERSION"));

  let platform = PlatformThread::spawn();
  let registry = Registry::new();
  let config = Config {
    max_depth: cli.max_depth,
    request_timeout: Duration::from_millis(cli.request_timeout_ms),
    change_detection_delay: Config::default().change_detection_delay,
  };

  let stdin = BufReader::new(io::stdin());
  let stdout = io::stdout();
  macmcp_server::run_stdio_loop(stdin, stdout.lock(), &registry, &platform, &config)?;

  log::info!("macmcp-server shutting down");
  Ok(())
}
