use crate::utils::error::ConsoleError;
use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub type CallId = String;

/// Connection-scoped identifier handed out by the gateway.
pub type ViewerId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Police,
    Ems,
    Fire,
}

impl ServiceType {
    pub const ALL: [ServiceType; 3] = [ServiceType::Police, ServiceType::Ems, ServiceType::Fire];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Police => "police",
            ServiceType::Ems => "ems",
            ServiceType::Fire => "fire",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "police" => Ok(ServiceType::Police),
            "ems" => Ok(ServiceType::Ems),
            "fire" => Ok(ServiceType::Fire),
            _ => Err(ConsoleError::InvalidServiceType {
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Active,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    pub id: CallId,
    pub from: String,
    pub to: Option<String>,
    pub start_time: DateTime<Utc>,
    pub status: CallStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub is_simulated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEntry {
    pub call_id: CallId,
    pub speaker: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl TranscriptEntry {
    pub fn new(call_id: impl Into<CallId>, speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            speaker: speaker.into(),
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Nominal response time, rendered as "3-5 minutes" on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseWindow {
    pub min_minutes: u32,
    pub max_minutes: u32,
}

impl fmt::Display for ResponseWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} minutes", self.min_minutes, self.max_minutes)
    }
}

impl Serialize for ResponseWindow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceResource {
    pub service: ServiceType,
    pub total_units: u32,
    pub available_units: u32,
    pub response_time: ResponseWindow,
}

impl ServiceResource {
    pub fn new(service: ServiceType, total_units: u32, response_time: ResponseWindow) -> Self {
        Self {
            service,
            total_units,
            available_units: total_units,
            response_time,
        }
    }

    pub fn is_available(&self) -> bool {
        self.available_units > 0
    }
}

impl Serialize for ServiceResource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ServiceResource", 4)?;
        state.serialize_field("available", &self.is_available())?;
        state.serialize_field("units", &self.available_units)?;
        state.serialize_field("totalUnits", &self.total_units)?;
        state.serialize_field("responseTime", &self.response_time)?;
        state.end()
    }
}

/// Immutable view of every service type, keyed in a stable order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PoolSnapshot {
    pub services: BTreeMap<ServiceType, ServiceResource>,
}

impl PoolSnapshot {
    pub fn get(&self, service: ServiceType) -> Option<&ServiceResource> {
        self.services.get(&service)
    }
}

/// One reserved unit travelling to a location. Lives only until its timer fires.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchEvent {
    pub service: ServiceType,
    pub location: String,
    pub requester: Option<ViewerId>,
    pub dispatched_at: DateTime<Utc>,
    pub arrives_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_type_parsing() {
        assert_eq!("police".parse::<ServiceType>().unwrap(), ServiceType::Police);
        assert_eq!("EMS".parse::<ServiceType>().unwrap(), ServiceType::Ems);
        assert!(matches!(
            "coast_guard".parse::<ServiceType>(),
            Err(ConsoleError::InvalidServiceType { .. })
        ));
    }

    #[test]
    fn test_service_resource_wire_shape() {
        let resource = ServiceResource::new(
            ServiceType::Ems,
            3,
            ResponseWindow {
                min_minutes: 2,
                max_minutes: 4,
            },
        );
        let json = serde_json::to_value(&resource).unwrap();

        assert_eq!(json["available"], true);
        assert_eq!(json["units"], 3);
        assert_eq!(json["totalUnits"], 3);
        assert_eq!(json["responseTime"], "2-4 minutes");
    }

    #[test]
    fn test_call_serializes_camel_case() {
        let call = Call {
            id: "sim_1_0".to_string(),
            from: "+15551234567".to_string(),
            to: None,
            start_time: Utc::now(),
            status: CallStatus::Active,
            end_time: None,
            is_simulated: true,
        };
        let json = serde_json::to_value(&call).unwrap();

        assert_eq!(json["status"], "active");
        assert_eq!(json["isSimulated"], true);
        assert!(json.get("startTime").is_some());
        assert!(json.get("endTime").is_none());
    }
}
