//! Send boundary towards the lighting network
//!
//! Indices are 0-based here: store channel 1 is sender index 0.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::{error::ControlError, Result};

/// Number of channels in one universe
pub const DMX_CHANNELS: usize = 512;

/// One universe worth of output.
///
/// A sender owns a single 512-byte frame. `set_channel`, `fill_channels`
/// and `reset` change the frame and send it; `prep_channel` only stages a
/// value for the next `transmit`.
pub trait DmxSender: Send {
    fn set_channel(&mut self, index: usize, value: u8) -> Result<()>;

    /// Fill `[start, stop)` and send
    fn fill_channels(&mut self, start: usize, stop: usize, value: u8) -> Result<()>;

    /// Zero the frame and send
    fn reset(&mut self) -> Result<()>;

    fn prep_channel(&mut self, index: usize, value: u8) -> Result<()>;

    /// Send the frame as it currently stands
    fn transmit(&mut self) -> Result<()>;
}

pub(crate) fn check_index(index: usize) -> Result<()> {
    if index >= DMX_CHANNELS {
        return Err(ControlError::OutOfRange(format!(
            "channel index {} exceeds {}",
            index,
            DMX_CHANNELS - 1
        )));
    }
    Ok(())
}

pub(crate) fn check_span(start: usize, stop: usize) -> Result<()> {
    if start > stop || stop > DMX_CHANNELS {
        return Err(ControlError::OutOfRange(format!(
            "channel span {}..{} is invalid",
            start, stop
        )));
    }
    Ok(())
}

/// Frames kept by a [`MemorySender`]
#[derive(Debug, Clone)]
pub struct MemoryFrames {
    /// Frame as it would go out on the next send
    pub staged: [u8; DMX_CHANNELS],
    /// Last frame put on the wire
    pub last_sent: Option<[u8; DMX_CHANNELS]>,
    pub sent_count: u64,
}

impl Default for MemoryFrames {
    fn default() -> Self {
        Self {
            staged: [0; DMX_CHANNELS],
            last_sent: None,
            sent_count: 0,
        }
    }
}

/// Sender that keeps frames in memory instead of sending them.
///
/// Clones share the same frames, so a handle kept aside can inspect what a
/// store pushed through the boxed copy. Used for `dry_run` output.
#[derive(Debug, Clone, Default)]
pub struct MemorySender {
    universe: u16,
    frames: Arc<Mutex<MemoryFrames>>,
}

impl MemorySender {
    pub fn new(universe: u16) -> Self {
        Self {
            universe,
            frames: Arc::default(),
        }
    }

    pub fn last_sent(&self) -> Option<[u8; DMX_CHANNELS]> {
        self.frames.lock().last_sent
    }

    pub fn staged(&self) -> [u8; DMX_CHANNELS] {
        self.frames.lock().staged
    }

    pub fn sent_count(&self) -> u64 {
        self.frames.lock().sent_count
    }

    fn send(frames: &mut MemoryFrames, universe: u16) {
        frames.last_sent = Some(frames.staged);
        frames.sent_count += 1;
        tracing::trace!("Universe {} frame {} kept in memory", universe, frames.sent_count);
    }
}

impl DmxSender for MemorySender {
    fn set_channel(&mut self, index: usize, value: u8) -> Result<()> {
        check_index(index)?;
        let mut frames = self.frames.lock();
        frames.staged[index] = value;
        Self::send(&mut frames, self.universe);
        Ok(())
    }

    fn fill_channels(&mut self, start: usize, stop: usize, value: u8) -> Result<()> {
        check_span(start, stop)?;
        let mut frames = self.frames.lock();
        frames.staged[start..stop].fill(value);
        Self::send(&mut frames, self.universe);
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        let mut frames = self.frames.lock();
        frames.staged.fill(0);
        Self::send(&mut frames, self.universe);
        Ok(())
    }

    fn prep_channel(&mut self, index: usize, value: u8) -> Result<()> {
        check_index(index)?;
        self.frames.lock().staged[index] = value;
        Ok(())
    }

    fn transmit(&mut self) -> Result<()> {
        let mut frames = self.frames.lock();
        Self::send(&mut frames, self.universe);
        Ok(())
    }
}
