//! Reframe CLI: upscale missing frames batch by batch; --sweep purges incomplete outputs.

use anyhow::Result;
use clap::Parser;
use reframe::engine::arg_parser::Cli;
use reframe::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
