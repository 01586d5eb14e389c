//! Transcoder process launching
//!
//! The session manager only talks to [`ProcessLauncher`] and
//! [`TranscoderProcess`], so tests can replace the real subprocess.

use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tracing::{debug, info, warn};

use crate::{Error, Result};

/// Program and argument list for one transcoder run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub program: String,
    pub args: Vec<String>,
}

impl LaunchRequest {
    /// Command line as a single string, for logging
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How a transcoder process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessExit {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl ProcessExit {
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

impl From<ExitStatus> for ProcessExit {
    fn from(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(&status);
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

impl std::fmt::Display for ProcessExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit code {code}"),
            (None, Some(signal)) => write!(f, "signal {signal}"),
            (None, None) => f.write_str("unknown exit status"),
        }
    }
}

/// A running transcoder, exclusively owned by the session manager
#[async_trait]
pub trait TranscoderProcess: Send + Sync {
    /// OS process id, `None` once the process has been reaped
    fn id(&self) -> Option<u32>;

    /// Ask the process to exit gracefully (SIGTERM on unix)
    fn terminate(&mut self) -> Result<()>;

    /// Force the process down and reap it
    async fn kill(&mut self) -> Result<()>;

    /// Wait for the process to exit
    async fn wait(&mut self) -> Result<ProcessExit>;

    /// Non-blocking liveness probe; `Some` once the process has exited
    fn try_wait(&mut self) -> Result<Option<ProcessExit>>;
}

/// Starts transcoder processes
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    async fn launch(&self, request: &LaunchRequest) -> Result<Box<dyn TranscoderProcess>>;
}

/// Launches real OS processes with `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl SystemLauncher {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessLauncher for SystemLauncher {
    async fn launch(&self, request: &LaunchRequest) -> Result<Box<dyn TranscoderProcess>> {
        debug!(command = %request.command_line(), "Spawning transcoder");

        // stdout is unused; stderr is drained below so a full pipe can never stall the child
        let mut child = Command::new(&request.program)
            .args(&request.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::Transcoder(format!("Transcoder program '{}' not found", request.program))
                } else {
                    Error::Transcoder(format!("Failed to start transcoder: {e}"))
                }
            })?;

        let pid = child.id();
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(drain_stderr(stderr, pid));
        }

        info!(pid = ?pid, program = %request.program, "Transcoder process spawned");
        Ok(Box::new(SystemProcess { child }))
    }
}

async fn drain_stderr(stderr: ChildStderr, pid: Option<u32>) {
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => debug!(pid = ?pid, "transcoder: {}", line),
            Ok(None) => break,
            Err(e) => {
                warn!(pid = ?pid, "Stopped reading transcoder stderr: {}", e);
                break;
            }
        }
    }
}

/// [`TranscoderProcess`] backed by a spawned child process
#[derive(Debug)]
pub struct SystemProcess {
    child: Child,
}

#[async_trait]
impl TranscoderProcess for SystemProcess {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn terminate(&mut self) -> Result<()> {
        let Some(pid) = self.child.id() else {
            // Already reaped
            return Ok(());
        };

        #[cfg(unix)]
        let result = {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let raw = i32::try_from(pid)
                .map_err(|_| Error::Internal(format!("Process id {pid} out of range")))?;
            match kill(Pid::from_raw(raw), Signal::SIGTERM) {
                Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
                Err(e) => Err(Error::Transcoder(format!("Failed to signal process {pid}: {e}"))),
            }
        };

        #[cfg(not(unix))]
        let result = self
            .child
            .start_kill()
            .map_err(|e| Error::Transcoder(format!("Failed to stop process {pid}: {e}")));

        result
    }

    async fn kill(&mut self) -> Result<()> {
        self.child
            .kill()
            .await
            .map_err(|e| Error::Transcoder(format!("Failed to kill transcoder: {e}")))
    }

    async fn wait(&mut self) -> Result<ProcessExit> {
        Ok(self.child.wait().await?.into())
    }

    fn try_wait(&mut self) -> Result<Option<ProcessExit>> {
        Ok(self.child.try_wait()?.map(ProcessExit::from))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    fn shell(script: &str) -> LaunchRequest {
        LaunchRequest {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
        }
    }

    #[test]
    fn test_command_line() {
        let request = LaunchRequest {
            program: "ffmpeg".to_string(),
            args: vec!["-i".to_string(), "rtsp://cam".to_string()],
        };
        assert_eq!(request.command_line(), "ffmpeg -i rtsp://cam");
    }

    #[test]
    fn test_exit_display() {
        assert_eq!(ProcessExit { code: Some(1), signal: None }.to_string(), "exit code 1");
        assert_eq!(ProcessExit { code: None, signal: Some(9) }.to_string(), "signal 9");
        assert!(ProcessExit { code: Some(0), signal: None }.success());
    }

    #[tokio::test]
    async fn test_missing_program_is_transcoder_error() {
        let request = LaunchRequest {
            program: "definitely-not-a-real-transcoder-binary".to_string(),
            args: Vec::new(),
        };
        let err = SystemLauncher::new().launch(&request).await.err().unwrap();
        assert!(matches!(err, Error::Transcoder(msg) if msg.contains("not found")));
    }

    #[tokio::test]
    async fn test_terminate_stops_long_running_process() {
        let mut process = SystemLauncher::new().launch(&shell("sleep 30")).await.unwrap();
        assert!(process.id().is_some());
        assert!(process.try_wait().unwrap().is_none());

        process.terminate().unwrap();
        let exit = tokio::time::timeout(Duration::from_secs(5), process.wait())
            .await
            .unwrap()
            .unwrap();
        assert!(!exit.success());
        assert_eq!(exit.signal, Some(15));
    }

    #[tokio::test]
    async fn test_chatty_stderr_does_not_block_exit() {
        // Writes far more than a pipe buffer holds
        let script = "i=0; while [ $i -lt 20000 ]; do echo 'frame= dropped' >&2; i=$((i+1)); done";
        let mut process = SystemLauncher::new().launch(&shell(script)).await.unwrap();
        let exit = tokio::time::timeout(Duration::from_secs(20), process.wait())
            .await
            .unwrap()
            .unwrap();
        assert!(exit.success());
    }

    #[tokio::test]
    async fn test_kill_reaps_process() {
        let mut process = SystemLauncher::new()
            .launch(&shell("trap '' TERM; sleep 30"))
            .await
            .unwrap();
        process.kill().await.unwrap();
        assert!(process.try_wait().unwrap().is_some());
    }
}
