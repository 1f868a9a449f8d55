//! Background progress monitor: periodic output rescans with EMA-smoothed throughput and ETA.
//!
//! The monitor only reads [`SharedState`] snapshots; its rolling counters are its own.

use anyhow::{Context, Result};
use chrono::Local;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use log::{debug, info};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::engine::resolver::valid_output_stems;
use crate::state::SharedState;
use crate::utils::Colors;
use crate::utils::config::MonitorConsts;
use crate::{ProgressSnapshot, RunOpts};

/// Exponential moving average of items/sec between successive observations.
#[derive(Clone, Debug)]
pub struct ThroughputEstimator {
    alpha: f64,
    last_check: Instant,
    last_count: usize,
    avg: Option<f64>,
}

impl ThroughputEstimator {
    pub fn new(alpha: f64, now: Instant, initial_count: usize) -> Self {
        Self {
            alpha,
            last_check: now,
            last_count: initial_count,
            avg: None,
        }
    }

    /// Start over from `count` at `now` (new folder).
    pub fn reset(&mut self, count: usize, now: Instant) {
        self.last_check = now;
        self.last_count = count;
        self.avg = None;
    }

    pub fn average(&self) -> Option<f64> {
        self.avg
    }

    /// Fold in the count seen at `now`. Returns the updated average, or `None` (and changes
    /// nothing) when no time has passed since the last observation.
    pub fn observe(&mut self, count: usize, now: Instant) -> Option<f64> {
        let elapsed = now.saturating_duration_since(self.last_check).as_secs_f64();
        if elapsed <= 0.0 {
            return None;
        }
        let instant = (count as f64 - self.last_count as f64) / elapsed;
        let avg = match self.avg {
            None if instant > 0.0 => instant,
            None => MonitorConsts::EMA_SEED_FLOOR,
            Some(prev) => self.alpha * instant + (1.0 - self.alpha) * prev,
        };
        self.avg = Some(avg);
        self.last_check = now;
        self.last_count = count;
        Some(avg)
    }
}

/// Percent of `total` done; 0 when `total` is 0.
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count as f64 * 100.0 / total as f64
}

/// Time left at `rate` items/sec, or `None` while the rate is too low to extrapolate.
pub fn eta(total: usize, count: usize, rate: Option<f64>) -> Option<Duration> {
    let rate = rate.filter(|r| *r > MonitorConsts::ETA_MIN_RATE)?;
    let remaining = total.saturating_sub(count);
    Some(Duration::from_secs_f64(remaining as f64 / rate))
}

/// `H:MM:SS`, or a placeholder when unknown.
pub fn format_eta(eta: Option<Duration>) -> String {
    match eta {
        Some(d) => {
            let secs = d.as_secs();
            format!("{}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
        }
        None => "calculating...".to_string(),
    }
}

pub struct ProgressMonitor {
    state: Arc<SharedState>,
    min_valid_size: u64,
    interval: Duration,
    warmup: Duration,
    estimator: ThroughputEstimator,
    /// Folder generation the counters belong to.
    generation: u64,
}

impl ProgressMonitor {
    pub fn new(state: Arc<SharedState>, opts: &RunOpts) -> Self {
        Self {
            state,
            min_valid_size: opts.min_valid_size,
            interval: opts.monitor_interval,
            warmup: opts.monitor_warmup,
            estimator: ThroughputEstimator::new(opts.ema_alpha, Instant::now(), 0),
            generation: 0,
        }
    }

    /// One monitor tick at `now`. `None` when there is nothing to report: no active folder,
    /// primary output not created yet, or no time elapsed since the last tick (or since the
    /// folder was entered).
    /// Scan errors count as missing outputs, never as failures.
    pub fn check_progress(&mut self, now: Instant) -> Option<ProgressSnapshot> {
        let snap = self.state.snapshot();
        let folder = snap.folder?;
        if !folder.primary_out.is_dir() {
            return None;
        }

        let primary = valid_output_stems(&folder.primary_out, self.min_valid_size);
        let secondary = match (&snap.secondary_cache, &folder.secondary_out) {
            (Some(cache), _) => Some(Arc::clone(cache)),
            (None, Some(dir)) => Some(Arc::new(valid_output_stems(dir, self.min_valid_size))),
            (None, None) => None,
        };
        let count = primary.len()
            + secondary
                .as_ref()
                .map_or(0, |s| s.iter().filter(|stem| !primary.contains(*stem)).count());

        // New folder: measure from the count and time its analysis recorded
        if snap.generation != self.generation {
            debug!("Monitor now tracking {}", folder.label);
            self.generation = snap.generation;
            let since = snap.entered_at.unwrap_or(now);
            self.estimator.reset(snap.initial_count, since);
        }
        let throughput = self.estimator.observe(count, now)?;

        Some(ProgressSnapshot {
            folder: folder.label,
            phase: snap.phase,
            total: snap.total,
            count,
            primary_count: primary.len(),
            secondary_count: secondary.map(|s| s.len()),
            percentage: percentage(count, snap.total),
            throughput,
            eta: eta(snap.total, count, Some(throughput)),
            timestamp: Local::now(),
        })
    }

    /// Run on a background thread: first tick after the warm-up, then every interval until the
    /// running flag clears or the handle is stopped.
    pub fn spawn(mut self) -> Result<MonitorHandle> {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let handle = thread::Builder::new()
            .name("progress-monitor".to_string())
            .spawn(move || {
                debug!("Progress monitor started");
                if stop_requested(&stop_rx, self.warmup) {
                    return;
                }
                while self.state.is_running() {
                    if let Some(snapshot) = self.check_progress(Instant::now()) {
                        report(&snapshot);
                    }
                    if stop_requested(&stop_rx, self.interval) {
                        break;
                    }
                }
                debug!("Progress monitor stopped");
            })
            .context("spawn progress monitor thread")?;
        Ok(MonitorHandle {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }
}

/// Wait up to `timeout`; true when the monitor should stop.
fn stop_requested(stop_rx: &Receiver<()>, timeout: Duration) -> bool {
    !matches!(stop_rx.recv_timeout(timeout), Err(RecvTimeoutError::Timeout))
}

/// Handle to the monitor thread. Dropping it stops the monitor as well.
pub struct MonitorHandle {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    /// Wake the monitor, ask it to exit, and join it.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Disconnecting the channel wakes a sleeping monitor.
        drop(self.stop_tx.take());
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            log::warn!("progress monitor thread panicked");
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn report(s: &ProgressSnapshot) {
    let rule = "*".repeat(60);
    let done = Colors::colorize(
        Colors::DONE,
        &format!("{} / {} ({:.2}%)", s.count, s.total, s.percentage),
    );
    info!("{}", rule);
    info!(" Progress report - {}", s.timestamp.format("%H:%M:%S"));
    info!(
        " Folder:    {} [{:?}]",
        Colors::colorize(Colors::LABEL, &s.folder),
        s.phase
    );
    match s.secondary_count {
        Some(secondary) => {
            info!(" Progress (primary+mirror): {}", done);
            info!("   - primary: {} valid", s.primary_count);
            info!("   - mirror:  {} valid", secondary);
        }
        None => info!(" Progress:  {}", done),
    }
    info!(" Rate:      {:.2} items/sec (EMA)", s.throughput);
    info!(
        " Remaining: {}",
        Colors::colorize(Colors::PENDING, &format_eta(s.eta))
    );
    info!("{}", rule);
}
