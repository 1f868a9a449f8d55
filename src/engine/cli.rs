//! CLI command handler: run the upscaling pipeline by default; --sweep runs the integrity sweep only.

use anyhow::{Result, bail};
use log::{debug, info, warn};
use std::time::Duration;

use crate::{RunOpts, RunOutcome};
use crate::check::sweep_output_dir;
use crate::engine::arg_parser::Cli;
use crate::utils::{apply_file_to_opts, load_reframe_toml, setup_logging, transform_bin_from_env};

/// Layer options: defaults → `.reframe.toml` in the work dir → environment → CLI flags.
pub fn build_opts(cli: &Cli) -> RunOpts {
    let mut opts = RunOpts {
        work_dir: cli.dir.clone(),
        ..RunOpts::default()
    };
    if let Some(file) = load_reframe_toml(&cli.dir) {
        apply_file_to_opts(&file, &mut opts);
    }
    if let Some(bin) = transform_bin_from_env(&cli.dir) {
        opts.transform.bin = bin;
    }

    if !cli.inputs.is_empty() {
        opts.input_dirs = cli.inputs.clone();
    }
    if let Some(p) = &cli.secondary_base {
        opts.secondary_base = Some(p.clone());
    }
    if let Some(p) = &cli.transform_bin {
        opts.transform.bin = p.clone();
    }
    if let Some(m) = &cli.model {
        opts.transform.model = m.clone();
    }
    if let Some(s) = cli.scale {
        opts.transform.scale = s;
    }
    if let Some(b) = cli.batch_size {
        opts.max_batch_size = b;
    }
    if let Some(secs) = cli.interval {
        opts.monitor_interval = Duration::from_secs(secs);
    }
    if let Some(n) = cli.min_size {
        opts.min_valid_size = n;
    }
    opts
}

fn print_banner(opts: &RunOpts) {
    let rule = "=".repeat(60);
    info!("{}", rule);
    info!("  Report every {}s", opts.monitor_interval.as_secs());
    info!("  EMA alpha: {}", opts.ema_alpha);
    info!("  Min valid output: {} KB", opts.min_valid_size / 1024);
    match &opts.secondary_base {
        Some(base) => info!("  Mirror base (read-only): {}", base.display()),
        None => info!("  Mirror: none"),
    }
    info!("  Press Ctrl+C to stop safely");
    info!("{}", rule);
}

/// Run the pipeline (default) or the integrity sweep when --sweep is given.
pub fn handle_run(cli: &Cli) -> Result<()> {
    setup_logging(cli.verbose.unwrap_or(false));
    let opts = build_opts(cli);
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );

    if let Some(dir) = &cli.sweep {
        let removed = sweep_output_dir(dir, opts.min_valid_size)?;
        info!("Sweep removed {} incomplete outputs", removed);
        return Ok(());
    }

    if opts.input_dirs.is_empty() {
        bail!("no input folders configured (use --input or [settings].inputs)");
    }
    print_banner(&opts);

    let (outcome, stats) = crate::run(&opts)?;
    info!(
        "{} folders done, {} batches, {} items submitted",
        stats.folders_done, stats.batches, stats.items_submitted
    );
    match outcome {
        RunOutcome::Completed => {
            info!("All folders processed.");
            Ok(())
        }
        RunOutcome::Aborted { reason } => {
            warn!("Restart once the cause is fixed; finished items will be skipped.");
            bail!("run aborted: {}", reason)
        }
        RunOutcome::Interrupted => Ok(()),
    }
}
