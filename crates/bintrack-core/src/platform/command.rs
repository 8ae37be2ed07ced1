/// External process execution with a hard timeout.
///
/// Output pipes are drained on their own threads so a chatty child cannot
/// block on a full pipe while we wait for it. The timeout also bounds output
/// collection: a grandchild that inherited the pipes can keep them open after
/// the child exits, and whatever arrived by the deadline is returned.
use crate::error::CommandError;
use crate::reclaim::{CommandOutput, CommandRunner};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How often the child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Minimum time left for collecting output once the child has exited.
const OUTPUT_GRACE: Duration = Duration::from_millis(200);

const READ_CHUNK: usize = 8 * 1024;

/// Runs commands with `std::process`, no console window on Windows.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            command.creation_flags(CREATE_NO_WINDOW);
        }

        debug!("Running {} {:?}", program, args);
        let mut child = command.spawn().map_err(|source| CommandError::Spawn {
            program: program.to_owned(),
            source,
        })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let deadline = Instant::now() + timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    warn!("{} exceeded {:?}; killing it", program, timeout);
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(CommandError::Timeout {
                        program: program.to_owned(),
                        timeout,
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(source) => {
                    let _ = child.kill();
                    return Err(CommandError::Wait {
                        program: program.to_owned(),
                        source,
                    });
                }
            }
        };

        let collect_by = deadline.max(Instant::now() + OUTPUT_GRACE);
        Ok(CommandOutput {
            exit_code: status.code(),
            stdout: collect(program, stdout, collect_by),
            stderr: collect(program, stderr, collect_by),
        })
    }
}

/// Forward a pipe's bytes in chunks until it closes.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<Receiver<Vec<u8>>> {
    let mut pipe = pipe?;
    let (tx, rx) = unbounded();
    thread::Builder::new()
        .name("bintrack-pipe".into())
        .spawn(move || {
            let mut buf = vec![0u8; READ_CHUNK];
            loop {
                match pipe.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                }
            }
        })
        .ok()?;
    Some(rx)
}

/// Gather drained output until the pipe closes or `deadline` passes.
fn collect(program: &str, chunks: Option<Receiver<Vec<u8>>>, deadline: Instant) -> String {
    let Some(chunks) = chunks else {
        return String::new();
    };
    let mut bytes = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match chunks.recv_timeout(remaining) {
            Ok(chunk) => bytes.extend_from_slice(&chunk),
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                debug!(
                    "{} output still open at the deadline; keeping {} bytes",
                    program,
                    bytes.len()
                );
                break;
            }
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}
