//! External process execution with timeout and cancellation.
//!
//! Every tool the installer shells out to goes through here, so a hung child
//! can always be killed by a deadline or by flipping a [`CancelToken`].

use crate::error::{Result, SubprocessError};
use log::debug;
use std::io::{Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

/// Granularity at which cancellation is observed.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Shared flag that aborts running subprocesses when set.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Deadline and cancellation applied to one process invocation.
#[derive(Clone, Debug, Default)]
pub struct RunLimits {
    pub timeout: Option<Duration>,
    pub cancel: CancelToken,
}

impl RunLimits {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            cancel: CancelToken::new(),
        }
    }
}

/// Run `command` to completion and return its exit status.
pub fn run(mut command: Command, limits: &RunLimits) -> Result<ExitStatus> {
    let program = program_name(&command);
    debug!("+ {:?}", command);
    let mut child = command.spawn().map_err(|source| SubprocessError::Launch {
        program: program.clone(),
        source,
    })?;
    wait(&mut child, &program, limits)
}

/// Like [`run`], but a non-zero exit is an error.
pub fn run_checked(command: Command, limits: &RunLimits) -> Result<()> {
    let program = program_name(&command);
    let status = run(command, limits)?;
    if status.success() {
        Ok(())
    } else {
        Err(SubprocessError::Exit { program, status }.into())
    }
}

/// Run `command` with `input` fed to its stdin and its stdout captured.
///
/// Input is written from a separate thread while this one waits, so a child
/// that only starts reading after producing output cannot deadlock us.
pub fn run_with_input(
    mut command: Command,
    input: String,
    limits: &RunLimits,
) -> Result<(ExitStatus, String)> {
    let program = program_name(&command);
    command.stdin(Stdio::piped()).stdout(Stdio::piped());
    debug!("+ {:?}", command);

    let mut child = command.spawn().map_err(|source| SubprocessError::Launch {
        program: program.clone(),
        source,
    })?;

    let writer = child.stdin.take().map(|mut stdin| {
        thread::spawn(move || {
            // The child may exit without draining stdin; a broken pipe is fine.
            let _ = stdin.write_all(input.as_bytes());
        })
    });
    let reader = child.stdout.take().map(|mut stdout| {
        thread::spawn(move || {
            let mut out = Vec::new();
            let _ = stdout.read_to_end(&mut out);
            out
        })
    });

    let status = wait(&mut child, &program, limits);

    if let Some(writer) = writer {
        let _ = writer.join();
    }
    let output = reader
        .and_then(|r| r.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default();

    Ok((status?, output))
}

fn wait(child: &mut Child, program: &str, limits: &RunLimits) -> Result<ExitStatus> {
    let started = Instant::now();

    loop {
        if limits.cancel.is_cancelled() {
            reap(child);
            return Err(SubprocessError::Cancelled {
                program: program.to_string(),
            }
            .into());
        }

        let slice = match limits.timeout {
            Some(timeout) => {
                let elapsed = started.elapsed();
                if elapsed >= timeout {
                    reap(child);
                    return Err(SubprocessError::TimedOut {
                        program: program.to_string(),
                        timeout,
                    }
                    .into());
                }
                (timeout - elapsed).min(POLL_INTERVAL)
            }
            None => POLL_INTERVAL,
        };

        let waited = child
            .wait_timeout(slice)
            .map_err(|source| SubprocessError::Wait {
                program: program.to_string(),
                source,
            })?;
        if let Some(status) = waited {
            return Ok(status);
        }
    }
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn program_name(command: &Command) -> String {
    command.get_program().to_string_lossy().into_owned()
}
