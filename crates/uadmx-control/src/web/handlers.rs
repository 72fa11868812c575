//! HTTP request and response bodies

use serde::{Deserialize, Serialize};

use crate::dmx::PatternKind;

/// API response wrapper for the `/api` routes
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// `GET /variable/:id` response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadResponse {
    pub value: u8,
}

/// `PUT /variable/:id` body: `{"value": {"value": n}}`
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct WriteRequest {
    #[serde(default)]
    pub value: Option<VariableValue>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct VariableValue {
    #[serde(default)]
    pub value: Option<i64>,
}

impl WriteRequest {
    /// The nested value, when present
    pub fn value(&self) -> Option<i64> {
        self.value.as_ref().and_then(|v| v.value)
    }
}

/// System status response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub uptime_seconds: u64,
    pub mapped_nodes: usize,
    /// Universes referenced by the mapping
    pub universes: Vec<u16>,
    /// Universes with a sender
    pub outputs: Vec<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<PatternKind>,
}

/// Committed channels of one universe
#[derive(Debug, Serialize, Deserialize)]
pub struct UniverseResponse {
    pub universe: u16,
    pub channels: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PatternResponse {
    pub pattern: PatternKind,
    pub running: bool,
}
