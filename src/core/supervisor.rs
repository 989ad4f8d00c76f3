// src/core/supervisor.rs — Simulation process supervisor
//
// Owns the single child simulation process bound to one session. `start`
// forcibly replaces any live child; `stop` is an idempotent, fire-and-forget
// kill. Frames, classified stderr output, and exit notifications all arrive
// on one event channel, tagged with the generation of the process that
// produced them so events from a replaced child can be discarded.

use std::process::Stdio;

use anyhow::anyhow;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot};

use crate::core::frame::{DeviceClass, TelemetryFrame};
use crate::infra::config::SimulationConfig;
use crate::infra::errors::DevicePulseError;

#[derive(Debug)]
pub enum SupervisorEvent {
    Frame {
        generation: u64,
        frame: TelemetryFrame,
    },
    /// Stderr output carrying a fatal-error marker. The coordinator relays
    /// it to the client and tears the process down.
    Fatal {
        generation: u64,
        message: String,
    },
    Exited {
        generation: u64,
        code: Option<i32>,
    },
}

impl SupervisorEvent {
    pub fn generation(&self) -> u64 {
        match self {
            SupervisorEvent::Frame { generation, .. }
            | SupervisorEvent::Fatal { generation, .. }
            | SupervisorEvent::Exited { generation, .. } => *generation,
        }
    }
}

struct RunningChild {
    generation: u64,
    kill: oneshot::Sender<()>,
}

pub struct ProcessSupervisor {
    program: String,
    args: Vec<String>,
    events: mpsc::Sender<SupervisorEvent>,
    current: Option<RunningChild>,
    generation: u64,
}

impl ProcessSupervisor {
    pub fn new(config: &SimulationConfig, events: mpsc::Sender<SupervisorEvent>) -> Self {
        Self {
            program: config.command.clone(),
            args: config.args.clone(),
            events,
            current: None,
            generation: 0,
        }
    }

    /// Spawn a fresh simulation process for `device`, killing any live one
    /// first. Returns as soon as the process is spawned; frames arrive on
    /// the event channel.
    pub fn start(&mut self, device: DeviceClass) -> Result<(), DevicePulseError> {
        self.stop();
        self.generation += 1;
        let generation = self.generation;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(device.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(DevicePulseError::Spawn)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("Failed to capture stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow!("Failed to capture stderr"))?;

        tokio::spawn(read_stdout(stdout, self.events.clone(), generation));
        tokio::spawn(read_stderr(stderr, self.events.clone(), generation));

        let (kill_tx, kill_rx) = oneshot::channel();
        tokio::spawn(monitor_exit(child, kill_rx, self.events.clone(), generation));

        self.current = Some(RunningChild {
            generation,
            kill: kill_tx,
        });
        tracing::debug!(generation, device = %device, "Spawned simulation process");
        Ok(())
    }

    /// Request termination of the current child, if any. Idempotent and
    /// non-blocking: the handle is cleared immediately and the kill signal
    /// is delivered by the monitor task.
    pub fn stop(&mut self) {
        if let Some(running) = self.current.take() {
            tracing::debug!(generation = running.generation, "Stopping simulation process");
            let _ = running.kill.send(());
        }
    }

    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }

    /// Generation of the most recently started process. Events tagged with
    /// an older generation belong to a replaced child.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Clear the handle after the current child exited on its own.
    pub fn acknowledge_exit(&mut self, generation: u64) {
        if self
            .current
            .as_ref()
            .is_some_and(|c| c.generation == generation)
        {
            self.current = None;
        }
    }
}

/// Fatal-error classifier for the child's stderr. The simulation script
/// logs routine diagnostics there too, so only lines carrying an error
/// marker or a Python stack-trace header terminate the session.
pub fn is_fatal_stderr(line: &str) -> bool {
    line.to_ascii_lowercase().contains("error") || line.contains("Traceback")
}

async fn read_stdout(stdout: ChildStdout, tx: mpsc::Sender<SupervisorEvent>, generation: u64) {
    let mut lines = BufReader::new(stdout).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        match TelemetryFrame::parse_line(&line) {
            Ok(frame) => {
                if tx
                    .send(SupervisorEvent::Frame { generation, frame })
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Err(e) => tracing::debug!(generation, "Dropping malformed telemetry line: {e}"),
        }
    }
}

async fn read_stderr(stderr: ChildStderr, tx: mpsc::Sender<SupervisorEvent>, generation: u64) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        if is_fatal_stderr(&line) {
            if tx
                .send(SupervisorEvent::Fatal {
                    generation,
                    message: line,
                })
                .await
                .is_err()
            {
                break;
            }
        } else {
            tracing::debug!(generation, "Simulation diagnostic: {line}");
        }
    }
}

async fn monitor_exit(
    mut child: Child,
    mut kill_rx: oneshot::Receiver<()>,
    tx: mpsc::Sender<SupervisorEvent>,
    generation: u64,
) {
    let mut kill_requested = false;
    let code = loop {
        if kill_requested {
            let _ = child.start_kill();
            break child.wait().await.ok().and_then(|status| status.code());
        }
        tokio::select! {
            status = child.wait() => break status.ok().and_then(|status| status.code()),
            // Fires on explicit stop, and on supervisor drop (sender closed).
            _ = &mut kill_rx => kill_requested = true,
        }
    };
    tracing::debug!(generation, ?code, "Simulation process exited");
    let _ = tx.send(SupervisorEvent::Exited { generation, code }).await;
}
