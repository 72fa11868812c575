//! Universe addressing
//!
//! A linear universe id maps onto the Art-Net (net, subnet, universe)
//! triple. Each component is a nibble, so the linear space is 0-4095.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{error::ControlError, Result};

/// Largest value of a single address component
pub const MAX_COMPONENT: u8 = 15;

/// Largest linear universe id
pub const MAX_UNIVERSE_ID: u16 = 4095;

/// An Art-Net universe address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UniverseAddress {
    pub net: u8,
    pub subnet: u8,
    pub universe: u8,
}

impl UniverseAddress {
    /// Split a linear universe id into its triple
    pub fn from_linear(id: u16) -> Self {
        Self {
            net: (id / 256) as u8,
            subnet: ((id / 16) % 16) as u8,
            universe: (id % 16) as u8,
        }
    }

    /// Combine a triple into a linear id
    pub fn to_linear(net: u8, subnet: u8, universe: u8) -> Result<u16> {
        for (name, value) in [("net", net), ("subnet", subnet), ("universe", universe)] {
            if value > MAX_COMPONENT {
                return Err(ControlError::OutOfRange(format!(
                    "{} {} exceeds {}",
                    name, value, MAX_COMPONENT
                )));
            }
        }
        Ok(net as u16 * 256 + subnet as u16 * 16 + universe as u16)
    }

    /// Linear id of this address
    pub fn linear(&self) -> Result<u16> {
        Self::to_linear(self.net, self.subnet, self.universe)
    }

    /// 15-bit Art-Net port address (Net in the high byte, SubUni in the low byte)
    pub fn port_address(&self) -> u16 {
        ((self.net as u16 & 0x7f) << 8)
            | ((self.subnet as u16 & 0x0f) << 4)
            | (self.universe as u16 & 0x0f)
    }
}

impl fmt::Display for UniverseAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.net, self.subnet, self.universe)
    }
}

/// Validate a linear universe id
pub fn check_universe(id: u16) -> Result<()> {
    if id > MAX_UNIVERSE_ID {
        return Err(ControlError::OutOfRange(format!(
            "universe {} exceeds {}",
            id, MAX_UNIVERSE_ID
        )));
    }
    Ok(())
}
