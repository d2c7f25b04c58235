//! Script-like crate for generating the latest AMI per region as a CloudFormation mapping
use std::{io, process};

use amimap::Cli;
use anyhow::Result;
use clap::Parser;
use tracing_log::AsTrace;
use tracing_subscriber::FmtSubscriber;

/// Prints the region to AMI mapping
///
/// ```bash
/// cargo run --bin amimap -- --target-region us-east-1,us-west-2
/// ```
#[cfg(not(tarpaulin_include))]
#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  // stdout is reserved for the generated document
  let subscriber = FmtSubscriber::builder()
    .with_max_level(cli.verbose.log_level_filter().as_trace())
    .with_writer(io::stderr)
    .without_time()
    .finish();
  tracing::subscriber::set_global_default(subscriber).expect("Setting default subscriber failed");

  match cli.run().await {
    Ok(_) => Ok(()),
    Err(err) => {
      eprintln!("{err:#}");
      process::exit(2);
    }
  }
}
