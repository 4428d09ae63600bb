//! JSON frames exchanged with dashboard viewers.
//!
//! Every frame is `{"event": "<name>", "data": {...}}` in both directions.

use crate::core::analysis::CallAnalysis;
use crate::domain::model::{CallId, PoolSnapshot, ServiceType, TranscriptEntry, ViewerId};
use crate::utils::error::{ConsoleError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PHONE_NUMBER: &str = "+15551234567";
pub const DEFAULT_LOCATION: &str = "Unknown location";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCall {
    pub call_id: CallId,
    pub from: String,
    pub to: Option<String>,
    pub start_time: DateTime<Utc>,
    pub is_simulated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDispatched {
    pub service: ServiceType,
    pub location: String,
    pub units: u32,
    pub estimated_arrival: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrivalStatus {
    Arrived,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResponse {
    pub service: ServiceType,
    pub location: String,
    pub status: ArrivalStatus,
    pub response_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceUnavailable {
    pub service: ServiceType,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRef {
    pub call_id: CallId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallTransferred {
    pub call_id: CallId,
    pub department: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandRejected {
    pub command: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    EmergencyServicesStatus(PoolSnapshot),
    NewCall(NewCall),
    TranscriptUpdated(TranscriptEntry),
    CallAnalysis(CallAnalysis),
    ServiceDispatched(ServiceDispatched),
    ServiceResponse(ServiceResponse),
    ServiceUnavailable(ServiceUnavailable),
    CallEscalated(CallRef),
    CallTransferred(CallTransferred),
    CallEnded(CallRef),
    CommandRejected(CommandRejected),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::EmergencyServicesStatus(_) => "emergency-services-status",
            ServerEvent::NewCall(_) => "new-call",
            ServerEvent::TranscriptUpdated(_) => "transcript-updated",
            ServerEvent::CallAnalysis(_) => "call-analysis",
            ServerEvent::ServiceDispatched(_) => "service-dispatched",
            ServerEvent::ServiceResponse(_) => "service-response",
            ServerEvent::ServiceUnavailable(_) => "service-unavailable",
            ServerEvent::CallEscalated(_) => "call-escalated",
            ServerEvent::CallTransferred(_) => "call-transferred",
            ServerEvent::CallEnded(_) => "call-ended",
            ServerEvent::CommandRejected(_) => "command-rejected",
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    All,
    Viewer(ViewerId),
}

impl Audience {
    pub fn includes(&self, viewer: ViewerId) -> bool {
        match self {
            Audience::All => true,
            Audience::Viewer(id) => *id == viewer,
        }
    }
}

/// An event together with who should receive it.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub audience: Audience,
    pub event: ServerEvent,
}

impl Outbound {
    pub fn broadcast(event: ServerEvent) -> Self {
        Self {
            audience: Audience::All,
            event,
        }
    }

    /// Goes to one viewer, or to everybody when the requester is unknown
    /// (HTTP callers and tests have no viewer id).
    pub fn reply(requester: Option<ViewerId>, event: ServerEvent) -> Self {
        Self {
            audience: requester.map(Audience::Viewer).unwrap_or(Audience::All),
            event,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorAction {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default)]
    pub call_id: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateCall {
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub scenario: Option<String>,
}

fn default_speaker() -> String {
    "Caller".to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IncomingTranscript {
    #[serde(default = "default_speaker")]
    pub speaker: String,
    pub text: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptUpdate {
    pub call_id: String,
    pub transcript: IncomingTranscript,
}

impl TranscriptUpdate {
    pub fn into_entry(self) -> TranscriptEntry {
        TranscriptEntry {
            call_id: self.call_id,
            speaker: self.transcript.speaker,
            text: self.transcript.text,
            timestamp: self.transcript.timestamp.unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ViewerCommand {
    OperatorAction(OperatorAction),
    SimulateCall(SimulateCall),
    TranscriptUpdate(TranscriptUpdate),
}

impl ViewerCommand {
    pub fn from_json(frame: &str) -> Result<Self> {
        Ok(serde_json::from_str(frame)?)
    }
}

/// Typed form of an [`OperatorAction`].
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Dispatch { service: ServiceType, location: String },
    Escalate { call_id: CallId },
    Transfer { call_id: CallId, department: Option<String> },
    End { call_id: CallId },
}

impl OperatorAction {
    pub fn into_action(self) -> Result<Action> {
        if let Some(service) = self.action_type.strip_prefix("dispatch_") {
            return Ok(Action::Dispatch {
                service: service.parse()?,
                location: self
                    .location
                    .filter(|l| !l.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
            });
        }

        let require_call = |call_id: Option<String>| {
            call_id.ok_or_else(|| ConsoleError::MissingField {
                field: "callId".to_string(),
            })
        };

        match self.action_type.as_str() {
            "escalate_call" => Ok(Action::Escalate {
                call_id: require_call(self.call_id)?,
            }),
            "transfer_call" => Ok(Action::Transfer {
                call_id: require_call(self.call_id)?,
                department: self.department,
            }),
            "end_call" => Ok(Action::End {
                call_id: require_call(self.call_id)?,
            }),
            other => Err(ConsoleError::UnknownCommand {
                command: other.to_string(),
            }),
        }
    }
}
