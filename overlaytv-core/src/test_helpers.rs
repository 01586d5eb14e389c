//! Test doubles shared by unit and integration tests
//!
//! Enabled for this crate's tests and, through the `test-util` feature, for
//! dependent crates' tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::service::stream::{LaunchRequest, ProcessExit, ProcessLauncher, TranscoderProcess};
use crate::{Error, Result};

const PLAYLIST_BODY: &str = "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:4\n#EXT-X-MEDIA-SEQUENCE:0\n";

#[derive(Debug, Default)]
struct Counters {
    spawned: AtomicUsize,
    terminated: AtomicUsize,
    killed: AtomicUsize,
    alive: AtomicUsize,
    next_pid: AtomicU32,
}

type ExitSender = Arc<watch::Sender<Option<ProcessExit>>>;

/// Launcher that spawns nothing and records what the session manager asks for.
///
/// By default every fake process writes its playlist (the last argument)
/// immediately and exits when terminated.
#[derive(Clone, Default)]
pub struct FakeLauncher {
    counters: Arc<Counters>,
    processes: Arc<Mutex<Vec<ExitSender>>>,
    requests: Arc<Mutex<Vec<LaunchRequest>>>,
    skip_playlist: bool,
    playlist_delay: Option<Duration>,
    ignore_terminate: bool,
    exit_immediately: bool,
    fail_launch: bool,
}

impl FakeLauncher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Never write the playlist
    #[must_use]
    pub fn without_playlist(mut self) -> Self {
        self.skip_playlist = true;
        self
    }

    /// Write the playlist only after `delay`
    #[must_use]
    pub fn with_playlist_delay(mut self, delay: Duration) -> Self {
        self.playlist_delay = Some(delay);
        self
    }

    /// Processes ignore graceful termination and must be killed
    #[must_use]
    pub fn ignoring_terminate(mut self) -> Self {
        self.ignore_terminate = true;
        self
    }

    /// Processes exit with status 1 right after launch
    #[must_use]
    pub fn exiting_immediately(mut self) -> Self {
        self.exit_immediately = true;
        self
    }

    /// Every launch fails
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail_launch = true;
        self
    }

    #[must_use]
    pub fn spawned(&self) -> usize {
        self.counters.spawned.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn terminated(&self) -> usize {
        self.counters.terminated.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn killed(&self) -> usize {
        self.counters.killed.load(Ordering::SeqCst)
    }

    /// Processes launched and not yet exited
    #[must_use]
    pub fn alive(&self) -> usize {
        self.counters.alive.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn requests(&self) -> Vec<LaunchRequest> {
        self.requests.lock().clone()
    }

    /// Make every live process die unexpectedly
    pub fn crash_all(&self) {
        for sender in self.processes.lock().iter() {
            finish(sender, &self.counters, ProcessExit { code: Some(1), signal: None });
        }
    }
}

fn finish(sender: &ExitSender, counters: &Counters, exit: ProcessExit) {
    sender.send_if_modified(|current| {
        if current.is_none() {
            *current = Some(exit);
            counters.alive.fetch_sub(1, Ordering::SeqCst);
            true
        } else {
            false
        }
    });
}

#[async_trait]
impl ProcessLauncher for FakeLauncher {
    async fn launch(&self, request: &LaunchRequest) -> Result<Box<dyn TranscoderProcess>> {
        self.requests.lock().push(request.clone());
        if self.fail_launch {
            return Err(Error::Transcoder(format!(
                "Transcoder program '{}' not found",
                request.program
            )));
        }

        self.counters.spawned.fetch_add(1, Ordering::SeqCst);
        self.counters.alive.fetch_add(1, Ordering::SeqCst);
        let pid = 1000 + self.counters.next_pid.fetch_add(1, Ordering::SeqCst);

        let (tx, _rx) = watch::channel(None);
        let exit = Arc::new(tx);
        self.processes.lock().push(exit.clone());

        if let (false, Some(playlist)) = (self.skip_playlist, request.args.last()) {
            let playlist = PathBuf::from(playlist);
            match self.playlist_delay {
                Some(delay) => {
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = tokio::fs::write(&playlist, PLAYLIST_BODY).await;
                    });
                }
                None => tokio::fs::write(&playlist, PLAYLIST_BODY).await?,
            }
        }

        if self.exit_immediately {
            finish(&exit, &self.counters, ProcessExit { code: Some(1), signal: None });
        }

        Ok(Box::new(FakeProcess {
            pid,
            exit,
            counters: self.counters.clone(),
            ignore_terminate: self.ignore_terminate,
        }))
    }
}

struct FakeProcess {
    pid: u32,
    exit: ExitSender,
    counters: Arc<Counters>,
    ignore_terminate: bool,
}

impl FakeProcess {
    fn exited(&self) -> Option<ProcessExit> {
        *self.exit.borrow()
    }
}

#[async_trait]
impl TranscoderProcess for FakeProcess {
    fn id(&self) -> Option<u32> {
        self.exited().is_none().then_some(self.pid)
    }

    fn terminate(&mut self) -> Result<()> {
        self.counters.terminated.fetch_add(1, Ordering::SeqCst);
        if !self.ignore_terminate {
            finish(&self.exit, &self.counters, ProcessExit { code: None, signal: Some(15) });
        }
        Ok(())
    }

    async fn kill(&mut self) -> Result<()> {
        self.counters.killed.fetch_add(1, Ordering::SeqCst);
        finish(&self.exit, &self.counters, ProcessExit { code: None, signal: Some(9) });
        Ok(())
    }

    async fn wait(&mut self) -> Result<ProcessExit> {
        let mut rx = self.exit.subscribe();
        let exit = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| Error::Internal("fake process channel closed".to_string()))?;
        Ok((*exit).unwrap_or_default())
    }

    fn try_wait(&mut self) -> Result<Option<ProcessExit>> {
        Ok(self.exited())
    }
}
