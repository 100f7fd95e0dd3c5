use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};

use tokio::sync::mpsc;

use crate::error::{AppError, Result};

/// Playback lifecycle notifications emitted by the supervisor thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    Began,
    Ended,
}

/// Write-only control handle to the active player's standard input.
///
/// One line of UTF-8 text per control message, fire and forget.
#[derive(Debug)]
pub struct PlayerRemote {
    stdin: ChildStdin,
}

impl PlayerRemote {
    pub fn send_line(&mut self, line: &str) -> std::io::Result<()> {
        self.stdin.write_all(line.as_bytes())?;
        self.stdin.write_all(b"\n")?;
        self.stdin.flush()
    }
}

/// Spawns the external player and synchronizes UI state with the cycle's
/// Began/Ended notifications.
///
/// The main loop calls [`PlaybackSupervisor::sync`] (non-blocking) every
/// iteration; [`PlaybackSupervisor::stop`] is the one deliberate blocking
/// barrier, which is what keeps cycles strictly sequential.
pub struct PlaybackSupervisor {
    command: Vec<String>,
    quit_directive: String,
    in_progress: bool,
    remote: Option<PlayerRemote>,
    notif_tx: mpsc::UnboundedSender<Notification>,
    notif_rx: mpsc::UnboundedReceiver<Notification>,
    output_tx: mpsc::UnboundedSender<String>,
}

impl PlaybackSupervisor {
    /// `command` is the player argv (the media path is appended);
    /// `output_tx` receives the player's stdout line by line.
    pub fn new(
        command: Vec<String>,
        quit_directive: String,
        output_tx: mpsc::UnboundedSender<String>,
    ) -> Self {
        let (notif_tx, notif_rx) = mpsc::unbounded_channel();
        Self {
            command,
            quit_directive,
            in_progress: false,
            remote: None,
            notif_tx,
            notif_rx,
            output_tx,
        }
    }

    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    /// Start a playback cycle for `media`, stopping any current cycle
    /// first so cycles never overlap.
    ///
    /// Returns once the new cycle's `Began` notification has been
    /// observed, so `in_progress` is already truthful for the caller.
    pub fn start(&mut self, media: &Path) -> Result<()> {
        self.stop();

        let program = self
            .command
            .first()
            .ok_or_else(|| AppError::Playback("player command is empty".into()))?;
        let mut child = Command::new(program)
            .args(&self.command[1..])
            .arg(media)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AppError::Playback(format!("failed to spawn '{program}': {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AppError::Playback("failed to capture player stdin".into()))?;
        let notif_tx = self.notif_tx.clone();
        let output_tx = self.output_tx.clone();
        std::thread::spawn(move || supervise(child, notif_tx, output_tx));

        // The supervisor thread's first act is Began; consuming it here
        // makes the state current before control returns to the caller.
        while let Some(notification) = self.notif_rx.blocking_recv() {
            if notification == Notification::Began {
                self.in_progress = true;
                self.remote = Some(PlayerRemote { stdin });
                break;
            }
        }
        Ok(())
    }

    /// Stop the current cycle, blocking until its `Ended` notification
    /// arrives. No-op when idle.
    pub fn stop(&mut self) {
        if !self.in_progress {
            return;
        }
        let directive = self.quit_directive.clone();
        if let Some(remote) = self.remote.as_mut() {
            // The write fails when the player already exited on its own;
            // the pending Ended below resolves either way.
            let _ = remote.send_line(&directive);
        }
        while let Some(notification) = self.notif_rx.blocking_recv() {
            if notification == Notification::Ended {
                break;
            }
        }
        self.in_progress = false;
        self.remote = None;
    }

    /// Non-blocking notification drain; keeps `in_progress` current
    /// without stalling input handling.
    pub fn sync(&mut self) {
        while let Ok(notification) = self.notif_rx.try_recv() {
            match notification {
                Notification::Began => self.in_progress = true,
                Notification::Ended => {
                    self.in_progress = false;
                    self.remote = None;
                }
            }
        }
    }

    /// Write one control line to the active cycle.
    pub fn send(&mut self, line: &str) -> Result<()> {
        if !self.in_progress {
            return Err(AppError::Playback("no playback in progress".into()));
        }
        match self.remote.as_mut() {
            Some(remote) => remote.send_line(line).map_err(AppError::Io),
            None => Err(AppError::Playback("control handle is gone".into())),
        }
    }
}

/// Per-cycle supervisor: announce the cycle, drain the player's output,
/// wait for exit, announce the end.
fn supervise(
    mut child: Child,
    notif_tx: mpsc::UnboundedSender<Notification>,
    output_tx: mpsc::UnboundedSender<String>,
) {
    let _ = notif_tx.send(Notification::Began);
    if let Some(stdout) = child.stdout.take() {
        let reader = BufReader::new(stdout);
        for line in reader.lines() {
            let Ok(line) = line else { break };
            if output_tx.send(line).is_err() {
                break;
            }
        }
    }
    let _ = child.wait();
    let _ = notif_tx.send(Notification::Ended);
}
