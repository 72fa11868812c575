//! Fixture definitions and channel index resolution

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A fixture's capability definition, in Open Fixture Library shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureDefinition {
    pub name: String,
    #[serde(default)]
    pub modes: Vec<Mode>,
}

/// A named DMX mode: an ordered list of channel names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    #[serde(default)]
    pub channels: Vec<ChannelSlot>,
}

/// One channel position of a mode.
///
/// Unused positions (`null`) and matrix inserts still take up an offset
/// but cannot be addressed by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelSlot {
    Named(String),
    Other(serde_json::Value),
}

impl ChannelSlot {
    pub fn name(&self) -> Option<&str> {
        match self {
            ChannelSlot::Named(name) => Some(name.as_str()),
            ChannelSlot::Other(_) => None,
        }
    }
}

impl Mode {
    /// Create a mode from channel names
    pub fn new(name: impl Into<String>, channels: &[&str]) -> Self {
        Self {
            name: name.into(),
            short_name: None,
            channels: channels
                .iter()
                .map(|c| ChannelSlot::Named(c.to_string()))
                .collect(),
        }
    }

    /// The name a mode is addressed by: its short name, or its name
    pub fn key(&self) -> &str {
        self.short_name.as_deref().unwrap_or(&self.name)
    }

    /// Zero-based offset of a channel within this mode
    pub fn offset_of(&self, channel: &str) -> Option<usize> {
        self.channels.iter().position(|c| c.name() == Some(channel))
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

impl FixtureDefinition {
    pub fn new(name: impl Into<String>, modes: Vec<Mode>) -> Self {
        Self {
            name: name.into(),
            modes,
        }
    }

    /// Find a mode by its key
    pub fn mode(&self, key: &str) -> Option<&Mode> {
        self.modes.iter().find(|m| m.key() == key)
    }
}

/// Errors raised by [`resolve_index`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelIndexError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Mode not found: {0}")]
    ModeNotFound(String),

    #[error("Channel {channel} not found in mode {mode}")]
    ChannelNotFound { channel: String, mode: String },
}

/// Compute the absolute channel of a capability.
///
/// The result is the capability's offset within the mode plus the fixture's
/// base address. It is not checked against the 512 channel limit of a
/// universe; that happens when the channel is written.
pub fn resolve_index(
    capability: &str,
    fixture: &FixtureDefinition,
    mode: &str,
    base_address: i64,
) -> Result<u16, ChannelIndexError> {
    if capability.is_empty() {
        return Err(ChannelIndexError::InvalidArgument(
            "channel name is empty".to_string(),
        ));
    }
    if mode.is_empty() {
        return Err(ChannelIndexError::InvalidArgument(
            "mode is empty".to_string(),
        ));
    }
    if base_address < 1 {
        return Err(ChannelIndexError::InvalidArgument(format!(
            "address {} is less than 1",
            base_address
        )));
    }

    let mode_def = fixture
        .mode(mode)
        .ok_or_else(|| ChannelIndexError::ModeNotFound(mode.to_string()))?;

    let offset = mode_def
        .offset_of(capability)
        .ok_or_else(|| ChannelIndexError::ChannelNotFound {
            channel: capability.to_string(),
            mode: mode.to_string(),
        })?;

    u16::try_from(offset as i64 + base_address).map_err(|_| {
        ChannelIndexError::InvalidArgument(format!(
            "address {} + offset {} is out of range",
            base_address, offset
        ))
    })
}
