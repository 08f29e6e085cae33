//! Bounded execution of external subprocesses.
//!
//! Both the external secret scanner and command transformers shell out;
//! every invocation goes through [`run_with_timeout`] so a wedged child
//! cannot hang the pipeline. Stdin is fed and stdout/stderr drained on
//! separate threads, so a chatty child never deadlocks on a full pipe.

use crate::errors::{Error, Result};
use log::{debug, warn};
use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Output of a completed subprocess.
#[derive(Debug)]
pub struct CommandOutput {
    pub status_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// True when the child exited with status zero.
    pub fn success(&self) -> bool {
        self.status_code == Some(0)
    }
}

fn drain(pipe: Option<impl Read + Send + 'static>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buffer);
        }
        buffer
    })
}

fn wait_with_deadline(child: &mut Child, timeout: Duration, program: &str) -> Result<Option<i32>> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status.code()),
            Ok(None) => {
                if Instant::now() >= deadline {
                    if let Err(e) = child.kill() {
                        warn!("could not kill timed-out '{program}': {e}");
                    }
                    let _ = child.wait();
                    return Err(Error::Subprocess {
                        command: program.to_string(),
                        reason: format!("timed out after {}s", timeout.as_secs()),
                    });
                }
                thread::sleep(Duration::from_millis(10));
            }
            Err(e) => {
                return Err(Error::Subprocess {
                    command: program.to_string(),
                    reason: format!("wait failed: {e}"),
                })
            }
        }
    }
}

/// Runs `program` with `args`, optionally writing `stdin` to the child,
/// and waits at most `timeout`. A child that overruns the deadline is
/// killed and reported as [`Error::Subprocess`].
pub fn run_with_timeout(
    program: &str,
    args: &[String],
    stdin: Option<&[u8]>,
    timeout: Duration,
) -> Result<CommandOutput> {
    debug!("running '{program}' with {} arg(s)", args.len());
    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::Subprocess {
            command: program.to_string(),
            reason: format!("failed to spawn: {e}"),
        })?;

    // Feed stdin on its own thread. A child that closes stdin early makes
    // the write fail, which is fine as long as the child produces output.
    let stdin_writer = stdin.map(|bytes| {
        let bytes = bytes.to_vec();
        let pipe = child.stdin.take();
        thread::spawn(move || {
            if let Some(mut pipe) = pipe {
                let _ = pipe.write_all(&bytes);
            }
        })
    });

    let stdout_reader = drain(child.stdout.take());
    let stderr_reader = drain(child.stderr.take());

    let status_code = wait_with_deadline(&mut child, timeout, program);

    if let Some(handle) = stdin_writer {
        let _ = handle.join();
    }
    let stdout = stdout_reader.join().unwrap_or_default();
    let stderr = stderr_reader.join().unwrap_or_default();

    Ok(CommandOutput {
        status_code: status_code?,
        stdout,
        stderr,
    })
}

/// Looks the program up on `PATH` (or verifies an explicit path).
pub fn binary_available(program: &str) -> bool {
    let candidate = std::path::Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file();
    }
    let Some(paths) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&paths).any(|dir| {
        let full = dir.join(program);
        #[cfg(windows)]
        {
            full.is_file() || full.with_extension("exe").is_file()
        }
        #[cfg(not(windows))]
        {
            full.is_file()
        }
    })
}
