//! Write audit log
//!
//! Every accepted write is appended as `NodeId;Value;Timestamp` to a CSV
//! file. Records go through a bounded channel to a writer thread so a slow
//! or failing disk never holds up a request.

use chrono::{DateTime, SecondsFormat, Utc};
use crossbeam_channel::{bounded, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use crate::Result;

pub const AUDIT_HEADER: &str = "NodeId;Value;Timestamp";

const QUEUE_CAPACITY: usize = 4096;

/// Audit log settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub enabled: bool,
    pub path: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("log.csv"),
        }
    }
}

/// One accepted write
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub node_id: String,
    pub value: u8,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    pub fn to_line(&self) -> String {
        format!(
            "{};{};{}\n",
            escape_field(&self.node_id),
            self.value,
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }
}

/// Quote a field holding the separator, as CSV does
fn escape_field(field: &str) -> String {
    if field.contains([';', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Append-only audit log
pub struct AuditLog {
    tx: Option<Sender<AuditRecord>>,
    writer: Option<JoinHandle<()>>,
}

impl AuditLog {
    /// Open the log according to `config`
    pub fn from_config(config: &AuditConfig) -> Result<Self> {
        if config.enabled {
            Self::open(&config.path)
        } else {
            tracing::info!("Audit log disabled");
            Ok(Self::disabled())
        }
    }

    /// Open `path` for appending, writing the header to a new or empty file
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        if file.metadata()?.len() == 0 {
            writeln!(file, "{}", AUDIT_HEADER)?;
        }

        let (tx, rx) = bounded::<AuditRecord>(QUEUE_CAPACITY);
        let display = path.display().to_string();
        let writer = std::thread::Builder::new()
            .name("uadmx-audit".to_string())
            .spawn(move || write_records(file, rx, display))?;

        tracing::info!("Audit log at {}", path.display());

        Ok(Self {
            tx: Some(tx),
            writer: Some(writer),
        })
    }

    /// A log that drops every record
    pub fn disabled() -> Self {
        Self {
            tx: None,
            writer: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Queue a record; never blocks and never fails the caller
    pub fn record(&self, node_id: &str, value: u8) {
        let Some(tx) = &self.tx else {
            return;
        };
        let record = AuditRecord {
            node_id: node_id.to_string(),
            value,
            timestamp: Utc::now(),
        };
        match tx.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(record)) => {
                tracing::warn!("Audit queue full, dropping record for {}", record.node_id);
            }
            Err(TrySendError::Disconnected(record)) => {
                tracing::warn!("Audit writer gone, dropping record for {}", record.node_id);
            }
        }
    }
}

impl Drop for AuditLog {
    fn drop(&mut self) {
        // Closing the channel ends the writer once the queue is drained
        self.tx.take();
        if let Some(writer) = self.writer.take() {
            if writer.join().is_err() {
                tracing::error!("Audit writer thread panicked");
            }
        }
    }
}

fn write_records(mut file: File, rx: crossbeam_channel::Receiver<AuditRecord>, path: String) {
    for record in rx {
        if let Err(e) = file.write_all(record.to_line().as_bytes()) {
            tracing::warn!("Audit write to {} failed: {}", path, e);
        }
    }
    tracing::debug!("Audit writer for {} finished", path);
}
