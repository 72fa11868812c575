//! Test patterns
//!
//! Periodic patterns run as tokio tasks. Each one is bounded by the
//! configured duration and ends early when its stop signal fires; on exit it
//! sets its channels back to zero. Only one pattern runs at a time.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::sender::DMX_CHANNELS;
use super::store::UniverseChannelStore;
use crate::{error::ControlError, Result};

const PULSE_TICK: Duration = Duration::from_millis(100);
/// Ticks per channel: on for one tick, off for the rest
const PULSE_TICKS_PER_CHANNEL: u64 = 5;
const SINE_TICK: Duration = Duration::from_millis(5);
const SINE_STEP: f64 = 0.05;

/// Pattern settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    pub universe: u16,
    /// Channels 1..=channel_count take part
    pub channel_count: u16,
    pub duration_ms: u64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            universe: 0,
            channel_count: 9,
            duration_ms: 10_000,
        }
    }
}

impl PatternConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.channel_count == 0 || self.channel_count as usize > DMX_CHANNELS {
            return Err(ControlError::InvalidParameter(format!(
                "pattern channel count {} must be 1-{}",
                self.channel_count, DMX_CHANNELS
            )));
        }
        Ok(())
    }
}

/// Available patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternKind {
    /// Walk the channels, flashing each one
    Pulse,
    /// Sine wave on the first channel
    Sine,
    AllOn,
    Blackout,
}

impl PatternKind {
    pub fn is_periodic(&self) -> bool {
        matches!(self, Self::Pulse | Self::Sine)
    }

    fn period(&self) -> Duration {
        match self {
            Self::Sine => SINE_TICK,
            _ => PULSE_TICK,
        }
    }

    /// Apply tick `step` of a periodic pattern
    fn step(&self, store: &UniverseChannelStore, config: &PatternConfig, step: u64) {
        match self {
            Self::Pulse => {
                let cycle = step / PULSE_TICKS_PER_CHANNEL;
                let channel = (cycle % config.channel_count as u64) as u16 + 1;
                match step % PULSE_TICKS_PER_CHANNEL {
                    0 => store.set_channel(config.universe, channel, 255),
                    1 => store.set_channel(config.universe, channel, 0),
                    _ => {}
                }
            }
            Self::Sine => {
                store.set_channel(config.universe, 1, sine_value(step as f64 * SINE_STEP));
            }
            Self::AllOn | Self::Blackout => {}
        }
    }
}

/// Sine mapped onto 0-255
pub fn sine_value(t: f64) -> u8 {
    ((t.sin() + 1.0) * 127.5).round() as u8
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pulse => "pulse",
            Self::Sine => "sine",
            Self::AllOn => "all-on",
            Self::Blackout => "blackout",
        };
        f.write_str(name)
    }
}

impl FromStr for PatternKind {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pulse" => Ok(Self::Pulse),
            "sine" => Ok(Self::Sine),
            "all-on" => Ok(Self::AllOn),
            "blackout" => Ok(Self::Blackout),
            other => Err(ControlError::InvalidParameter(format!(
                "unknown pattern {}",
                other
            ))),
        }
    }
}

struct Running {
    kind: PatternKind,
    stop_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

/// Runs test patterns on a channel store
pub struct PatternRunner {
    store: Arc<UniverseChannelStore>,
    config: PatternConfig,
    running: Mutex<Option<Running>>,
    /// Held across a whole start or stop
    control: tokio::sync::Mutex<()>,
}

impl PatternRunner {
    pub fn new(store: Arc<UniverseChannelStore>, config: PatternConfig) -> Self {
        Self {
            store,
            config,
            running: Mutex::new(None),
            control: tokio::sync::Mutex::new(()),
        }
    }

    pub fn config(&self) -> &PatternConfig {
        &self.config
    }

    /// Start a pattern, stopping the one that is running.
    ///
    /// Periodic patterns are spawned on the current tokio runtime.
    /// Concurrent calls run one after the other, so the last one wins.
    pub async fn start(&self, kind: PatternKind) -> Result<()> {
        self.config.validate()?;
        if !self.store.contains(self.config.universe) {
            return Err(ControlError::SenderNotFound(self.config.universe));
        }
        let _control = self.control.lock().await;
        self.stop_running().await;

        let count = self.config.channel_count;
        match kind {
            PatternKind::AllOn | PatternKind::Blackout => {
                let value = if kind == PatternKind::AllOn { 255 } else { 0 };
                for channel in 1..=count {
                    self.store.set_channel(self.config.universe, channel, value);
                }
                tracing::info!(
                    "{} applied to channels 1-{} of universe {}",
                    kind,
                    count,
                    self.config.universe
                );
            }
            PatternKind::Pulse | PatternKind::Sine => {
                let (stop_tx, stop_rx) = oneshot::channel();
                let handle = tokio::spawn(run_periodic(
                    self.store.clone(),
                    self.config.clone(),
                    kind,
                    stop_rx,
                ));
                *self.running.lock() = Some(Running {
                    kind,
                    stop_tx: Some(stop_tx),
                    handle,
                });
                tracing::info!(
                    "{} pattern started for {} ms",
                    kind,
                    self.config.duration_ms
                );
            }
        }
        Ok(())
    }

    /// Stop the running pattern and wait for it to clean up
    pub async fn stop(&self) -> bool {
        let _control = self.control.lock().await;
        self.stop_running().await
    }

    async fn stop_running(&self) -> bool {
        let running = self.running.lock().take();
        let Some(mut running) = running else {
            return false;
        };
        if let Some(stop_tx) = running.stop_tx.take() {
            // Already finished when the receiver is gone
            let _ = stop_tx.send(());
        }
        if let Err(e) = running.handle.await {
            tracing::warn!("{} pattern task failed: {}", running.kind, e);
        }
        true
    }

    /// Wait until the running pattern ends by itself
    pub async fn wait(&self) {
        let running = self.running.lock().take();
        if let Some(running) = running {
            // Keep the stop sender alive so the task is not cancelled
            let _stop_tx = running.stop_tx;
            if let Err(e) = running.handle.await {
                tracing::warn!("{} pattern task failed: {}", running.kind, e);
            }
        }
    }

    /// Pattern currently running, if any
    pub fn active(&self) -> Option<PatternKind> {
        self.running
            .lock()
            .as_ref()
            .filter(|r| !r.handle.is_finished())
            .map(|r| r.kind)
    }
}

impl Drop for PatternRunner {
    fn drop(&mut self) {
        if let Some(mut running) = self.running.get_mut().take() {
            if let Some(stop_tx) = running.stop_tx.take() {
                let _ = stop_tx.send(());
            }
        }
    }
}

async fn run_periodic(
    store: Arc<UniverseChannelStore>,
    config: PatternConfig,
    kind: PatternKind,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let deadline = tokio::time::sleep(config.duration());
    tokio::pin!(deadline);

    let mut ticker = tokio::time::interval(kind.period());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut step: u64 = 0;
    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => {
                tracing::info!("{} pattern stopped", kind);
                break;
            }
            _ = &mut deadline => {
                tracing::info!("{} pattern finished", kind);
                break;
            }
            _ = ticker.tick() => {
                kind.step(&store, &config, step);
                step += 1;
            }
        }
    }

    for channel in 1..=config.channel_count {
        store.set_channel(config.universe, channel, 0);
    }
}
