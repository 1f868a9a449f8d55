//! External transform invocation and ownership of the in-flight child process.
//!
//! The child lives in a [`TransformSlot`] behind its own lock, separate from shared state.
//! The pipeline polls it with short lock holds, so the shutdown path can take the lock,
//! terminate the child and reap it while the pipeline is "waiting".

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use crate::TransformOpts;
use crate::utils::config::TransformConsts;

/// Command line for one batch: `<bin> -i <input> -o <output> -n <model> -s <scale> -t <tile> -f <format> -g <gpu> -j <threads>`.
pub fn transform_command(opts: &TransformOpts, input: &Path, output: &Path) -> Command {
    let mut cmd = Command::new(&opts.bin);
    cmd.arg("-i")
        .arg(input)
        .arg("-o")
        .arg(output)
        .args(["-n", opts.model.as_str()])
        .args(["-s", opts.scale.to_string().as_str()])
        .args(["-t", opts.tile.to_string().as_str()])
        .args(["-f", opts.format.as_str()])
        .args(["-g", opts.gpu.as_str()])
        .args(["-j", opts.threads.as_str()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    cmd
}

/// How a transform invocation ended.
#[derive(Debug)]
pub enum TransformExit {
    Success,
    Failed(ExitStatus),
    /// The child was taken out of the slot by [`TransformSlot::terminate`].
    Terminated,
}

#[derive(Default)]
struct SlotInner {
    child: Option<Child>,
    /// Set by `terminate`; no transform may start afterward.
    closed: bool,
}

#[derive(Default)]
pub struct TransformSlot {
    inner: Mutex<SlotInner>,
}

impl TransformSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SlotInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// True while a child is held.
    pub fn is_busy(&self) -> bool {
        self.lock().child.is_some()
    }

    /// Spawn `cmd` and block until it exits or is terminated. Spawn failure is an error.
    /// Once the slot has been terminated, returns [`TransformExit::Terminated`] without spawning.
    pub fn run(&self, mut cmd: Command) -> Result<TransformExit> {
        let program = cmd.get_program().to_string_lossy().into_owned();
        {
            let mut slot = self.lock();
            if slot.closed {
                return Ok(TransformExit::Terminated);
            }
            let child = cmd
                .spawn()
                .with_context(|| format!("launch transform {}", program))?;
            debug!("Transform started (pid {})", child.id());
            slot.child = Some(child);
        }

        loop {
            {
                let mut slot = self.lock();
                let Some(child) = slot.child.as_mut() else {
                    return Ok(TransformExit::Terminated);
                };
                let status = child.try_wait().context("wait on transform")?;
                if let Some(status) = status {
                    slot.child = None;
                    return Ok(if status.success() {
                        TransformExit::Success
                    } else {
                        TransformExit::Failed(status)
                    });
                }
            }
            thread::sleep(TransformConsts::WAIT_POLL);
        }
    }

    /// Terminate a running child: graceful request, up to `grace` to exit, then kill.
    /// Returns true when a live child was stopped. The slot is empty and closed afterward.
    pub fn terminate(&self, grace: Duration) -> bool {
        let mut slot = self.lock();
        slot.closed = true;
        let Some(mut child) = slot.child.take() else {
            return false;
        };
        if matches!(child.try_wait(), Ok(Some(_))) {
            return false;
        }

        info!("Terminating transform (pid {})...", child.id());
        request_stop(&mut child);
        let deadline = Instant::now() + grace;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!("Transform exited with {}", status);
                    return true;
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(TransformConsts::WAIT_POLL),
                _ => break,
            }
        }
        warn!("Transform did not exit within {:?}; killing it", grace);
        if let Err(e) = child.kill() {
            warn!("Kill transform: {}", e);
        }
        let _ = child.wait();
        true
    }
}

#[cfg(unix)]
fn request_stop(child: &mut Child) {
    let Ok(pid) = libc::pid_t::try_from(child.id()) else {
        let _ = child.kill();
        return;
    };
    if unsafe { libc::kill(pid, libc::SIGTERM) } != 0 {
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn request_stop(child: &mut Child) {
    let _ = child.kill();
}
