// src/core/coordinator.rs — Per-connection session coordinator
//
// One coordinator per WebSocket connection. It interprets control messages,
// drives the process supervisor, synthesizes trigger frames, and pushes every
// frame through a single delivery path: record into the report store first,
// then relay to the client. Both sides therefore observe the same order, and
// nothing downstream can tell an organic frame from a synthetic one except
// via the optional trigger identifier.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::frame::{DeviceClass, TelemetryFrame};
use crate::core::supervisor::{ProcessSupervisor, SupervisorEvent};
use crate::core::triggers;
use crate::reports::store::ReportStore;
use crate::reports::{PredictiveSection, SectionData};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No process; channel open or not yet opened.
    Idle,
    /// Start requested, spawn issued, no frame received yet.
    Starting,
    /// At least one frame delivered since the last start.
    Running,
    /// Stop requested, teardown in flight.
    Stopping,
}

/// Inbound control messages on the duplex channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    Start {
        device: DeviceClass,
        #[serde(rename = "sessionId")]
        session_id: Option<String>,
    },
    Stop,
    Trigger {
        event: String,
        #[serde(rename = "sessionId")]
        session_id: Option<String>,
        device: Option<DeviceClass>,
    },
}

/// Outbound messages: a telemetry frame on success, `{error}` on fatal
/// failure after which the backing process is torn down.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Frame(TelemetryFrame),
    Error { error: String },
}

pub struct SessionCoordinator {
    state: SessionState,
    session_id: Option<String>,
    device: Option<DeviceClass>,
    report_id: Option<String>,
    supervisor: ProcessSupervisor,
    reports: Arc<dyn ReportStore>,
    outbound: mpsc::Sender<ServerMessage>,
}

impl SessionCoordinator {
    pub fn new(
        supervisor: ProcessSupervisor,
        reports: Arc<dyn ReportStore>,
        outbound: mpsc::Sender<ServerMessage>,
    ) -> Self {
        Self {
            state: SessionState::Idle,
            session_id: None,
            device: None,
            report_id: None,
            supervisor,
            reports,
            outbound,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn report_id(&self) -> Option<&str> {
        self.report_id.as_deref()
    }

    /// Handle one raw text message from the client. Malformed messages are
    /// logged and ignored; they never terminate the channel.
    pub async fn handle_control(&mut self, raw: &str) {
        match serde_json::from_str::<ControlMessage>(raw) {
            Ok(message) => self.dispatch(message).await,
            Err(e) => tracing::warn!("Ignoring malformed control message: {e}"),
        }
    }

    pub async fn dispatch(&mut self, message: ControlMessage) {
        match message {
            ControlMessage::Start { device, session_id } => {
                self.handle_start(device, session_id).await
            }
            ControlMessage::Stop => self.handle_stop(),
            ControlMessage::Trigger {
                event,
                session_id,
                device,
            } => self.handle_trigger(event, session_id, device).await,
        }
    }

    /// Handle one supervisor event. Events from a replaced process are
    /// discarded so rapid restarts cannot interleave stale frames.
    pub async fn handle_event(&mut self, event: SupervisorEvent) {
        if event.generation() != self.supervisor.generation() {
            tracing::debug!(
                generation = event.generation(),
                "Discarding event from replaced process"
            );
            return;
        }
        match event {
            SupervisorEvent::Frame { frame, .. } => self.deliver_frame(frame).await,
            SupervisorEvent::Fatal { message, .. } => {
                tracing::error!("Simulation process fatal error: {message}");
                self.send(ServerMessage::Error { error: message }).await;
                self.supervisor.stop();
                self.state = SessionState::Idle;
            }
            SupervisorEvent::Exited { generation, code } => {
                tracing::info!(?code, "Simulation process exited");
                self.supervisor.acknowledge_exit(generation);
                self.state = SessionState::Idle;
            }
        }
    }

    /// Channel-close teardown: same as a graceful stop, but nothing is sent
    /// back (the channel is gone).
    pub fn shutdown(&mut self) {
        self.supervisor.stop();
        self.state = SessionState::Idle;
        tracing::info!(session = ?self.session_id, "Session closed");
    }

    async fn handle_start(&mut self, device: DeviceClass, session_id: Option<String>) {
        let session_id = session_id
            .or_else(|| self.session_id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        self.session_id = Some(session_id.clone());
        self.device = Some(device);

        // One report per (session, device); a restart reuses it.
        let report = self
            .reports
            .find_by_session(&session_id, device)
            .unwrap_or_else(|| self.reports.create(&session_id, device));
        self.report_id = Some(report.report_id);

        match self.supervisor.start(device) {
            Ok(()) => {
                self.state = SessionState::Starting;
                tracing::info!(device = %device, session = %session_id, "Monitoring started");
            }
            Err(e) => {
                tracing::error!("Failed to start simulation: {e}");
                self.send(ServerMessage::Error {
                    error: format!("Failed to start simulation: {e}"),
                })
                .await;
                self.state = SessionState::Idle;
            }
        }
    }

    fn handle_stop(&mut self) {
        if self.supervisor.is_running() {
            self.state = SessionState::Stopping;
            self.supervisor.stop();
        } else {
            self.state = SessionState::Idle;
        }
    }

    async fn handle_trigger(
        &mut self,
        event: String,
        session_id: Option<String>,
        device: Option<DeviceClass>,
    ) {
        // Valid while a run is live: Running, or Starting for triggers that
        // race ahead of the first organic frame.
        if !matches!(self.state, SessionState::Running | SessionState::Starting) {
            tracing::debug!(%event, state = ?self.state, "Ignoring trigger outside an active run");
            return;
        }
        let Some(device) = device.or(self.device) else {
            tracing::warn!(%event, "Rejecting trigger with no device class");
            return;
        };

        // The report id threaded through start is the source of truth; the
        // session lookup is a compatibility shim for triggers that arrive
        // before one is known.
        if self.report_id.is_none() {
            let Some(session_id) = session_id.or_else(|| self.session_id.clone()) else {
                tracing::warn!(%event, "Rejecting trigger with no session identifier");
                return;
            };
            let report = self
                .reports
                .find_by_session(&session_id, device)
                .unwrap_or_else(|| self.reports.create(&session_id, device));
            self.report_id = Some(report.report_id);
        }

        let frame = triggers::synthesize(device, &event);
        self.deliver_frame(frame).await;
    }

    /// Single delivery path for organic and synthetic frames: record, then
    /// relay, in arrival order.
    async fn deliver_frame(&mut self, frame: TelemetryFrame) {
        // A frame arriving while teardown is in flight is still delivered
        // (it was accepted into the pipeline) but does not reopen the run.
        if self.state == SessionState::Starting {
            tracing::debug!("First frame received, session running");
        }
        if matches!(self.state, SessionState::Starting | SessionState::Running) {
            self.state = SessionState::Running;
        }
        self.record_frame(&frame);
        self.send(ServerMessage::Frame(frame)).await;
    }

    fn record_frame(&self, frame: &TelemetryFrame) {
        let Some(report_id) = self.report_id.as_deref() else {
            tracing::debug!("No report bound to session, frame not recorded");
            return;
        };
        let section = SectionData::Predictive(PredictiveSection {
            verdict: frame.verdict(),
            summary: None,
            frame: frame.clone(),
        });
        if let Err(e) = self.reports.update_section(report_id, section) {
            tracing::warn!("Failed to record frame in report {report_id}: {e}");
        }
    }

    async fn send(&self, message: ServerMessage) {
        if self.outbound.send(message).await.is_err() {
            tracing::debug!("Outbound channel closed, client gone");
        }
    }
}
