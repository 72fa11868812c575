//! Universe channel store
//!
//! Owns the committed and prepared channel arrays of every registered
//! universe together with the sender that puts them on the wire.
//! Channels are 1-based (1-512); slot 0 of each array is unused.
//!
//! Invalid channels and unknown universes are logged and ignored, and send
//! failures are logged and discarded. Nothing here fails a caller at runtime.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};

use super::addressing::check_universe;
use super::sender::{DmxSender, DMX_CHANNELS};
use crate::{error::ControlError, Result};

struct Output {
    sender: Box<dyn DmxSender>,
    prepared: [u8; DMX_CHANNELS + 1],
}

struct Universe {
    /// Read without locking; written under `output`
    committed: Box<[AtomicU8]>,
    output: Mutex<Output>,
}

impl Universe {
    fn new(sender: Box<dyn DmxSender>) -> Self {
        Self {
            committed: (0..=DMX_CHANNELS).map(|_| AtomicU8::new(0)).collect(),
            output: Mutex::new(Output {
                sender,
                prepared: [0; DMX_CHANNELS + 1],
            }),
        }
    }
}

fn valid_channel(channel: u16) -> bool {
    (1..=DMX_CHANNELS as u16).contains(&channel)
}

/// Per-universe channel state and output
#[derive(Default)]
pub struct UniverseChannelStore {
    universes: HashMap<u16, Universe>,
}

impl UniverseChannelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the sender of a universe with zeroed buffers
    pub fn register(&mut self, universe: u16, sender: Box<dyn DmxSender>) -> Result<()> {
        check_universe(universe)?;
        if self.universes.contains_key(&universe) {
            return Err(ControlError::InvalidParameter(format!(
                "universe {} registered twice",
                universe
            )));
        }
        self.universes.insert(universe, Universe::new(sender));
        tracing::debug!("Registered universe {}", universe);
        Ok(())
    }

    /// Registered universes, sorted
    pub fn universes(&self) -> Vec<u16> {
        let mut universes: Vec<u16> = self.universes.keys().copied().collect();
        universes.sort_unstable();
        universes
    }

    pub fn contains(&self, universe: u16) -> bool {
        self.universes.contains_key(&universe)
    }

    fn universe(&self, universe: u16, channel: Option<u16>) -> Option<&Universe> {
        if let Some(channel) = channel {
            if !valid_channel(channel) {
                tracing::error!("Channel {} out of bounds on universe {}", channel, universe);
                return None;
            }
        }
        let found = self.universes.get(&universe);
        if found.is_none() {
            tracing::error!("Sender not found for universe {}", universe);
        }
        found
    }

    fn log_send(universe: u16, result: Result<()>) {
        if let Err(e) = result {
            tracing::warn!("Send to universe {} failed: {}", universe, e);
        }
    }

    /// Commit a channel value and send it immediately
    pub fn set_channel(&self, universe: u16, channel: u16, value: u8) {
        let Some(slot) = self.universe(universe, Some(channel)) else {
            return;
        };
        let mut output = slot.output.lock();
        slot.committed[channel as usize].store(value, Ordering::Release);
        Self::log_send(
            universe,
            output.sender.set_channel(channel as usize - 1, value),
        );
    }

    /// Last committed value of a channel; 0 when unknown
    pub fn get_value(&self, universe: u16, channel: u16) -> u8 {
        if !valid_channel(channel) {
            return 0;
        }
        self.universes
            .get(&universe)
            .map(|slot| slot.committed[channel as usize].load(Ordering::Acquire))
            .unwrap_or(0)
    }

    /// Stage a value for the next [`transmit`](Self::transmit)
    pub fn prepare_channel(&self, universe: u16, channel: u16, value: u8) {
        let Some(slot) = self.universe(universe, Some(channel)) else {
            return;
        };
        let mut output = slot.output.lock();
        output.prepared[channel as usize] = value;
        Self::log_send(
            universe,
            output.sender.prep_channel(channel as usize - 1, value),
        );
    }

    /// Flush staged values, then clear the prepared buffer
    pub fn transmit(&self, universe: u16) {
        let Some(slot) = self.universe(universe, None) else {
            return;
        };
        let mut output = slot.output.lock();
        Self::log_send(universe, output.sender.transmit());
        output.prepared.fill(0);
    }

    /// Commit `value` on `[start, stop)` and send
    pub fn fill_channels(&self, universe: u16, start: u16, stop: u16, value: u8) {
        if start < 1 || start > stop || stop as usize > DMX_CHANNELS {
            tracing::error!(
                "Channel span {}..{} out of bounds on universe {}",
                start,
                stop,
                universe
            );
            return;
        }
        let Some(slot) = self.universe(universe, None) else {
            return;
        };
        let mut output = slot.output.lock();
        for channel in start..stop {
            slot.committed[channel as usize].store(value, Ordering::Release);
        }
        Self::log_send(
            universe,
            output
                .sender
                .fill_channels(start as usize - 1, stop as usize - 1, value),
        );
    }

    /// Zero every committed channel and reset the sender
    pub fn reset(&self, universe: u16) {
        let Some(slot) = self.universe(universe, None) else {
            return;
        };
        let mut output = slot.output.lock();
        for value in slot.committed.iter() {
            value.store(0, Ordering::Release);
        }
        Self::log_send(universe, output.sender.reset());
    }

    /// Committed channels 1-512 of a universe
    pub fn snapshot(&self, universe: u16) -> Option<Vec<u8>> {
        self.universes.get(&universe).map(|slot| {
            slot.committed[1..]
                .iter()
                .map(|v| v.load(Ordering::Acquire))
                .collect()
        })
    }

    /// Prepared channels 1-512 of a universe
    pub fn prepared(&self, universe: u16) -> Option<Vec<u8>> {
        self.universes
            .get(&universe)
            .map(|slot| slot.output.lock().prepared[1..].to_vec())
    }
}

impl std::fmt::Debug for UniverseChannelStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniverseChannelStore")
            .field("universes", &self.universes())
            .finish()
    }
}
