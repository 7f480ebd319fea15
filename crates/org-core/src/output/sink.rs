//! Snapshot Sinks
//!
//! Append-only destinations for daily snapshots.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::SinkError;
use org_events::DailySnapshot;

/// Receives one snapshot per completed day, in day order
pub trait SnapshotSink: Send {
    fn emit(&mut self, snapshot: &DailySnapshot) -> Result<(), SinkError>;

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Writes each snapshot as one line of JSON
pub struct JsonlSnapshotSink {
    writer: BufWriter<Box<dyn Write + Send>>,
}

impl JsonlSnapshotSink {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: BufWriter::new(Box::new(writer)),
        }
    }

    /// Create (or truncate) the file at `path`.
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        Ok(Self::new(File::create(path)?))
    }

    /// A sink that discards everything.
    pub fn null() -> Self {
        Self::new(io::sink())
    }
}

impl SnapshotSink for JsonlSnapshotSink {
    fn emit(&mut self, snapshot: &DailySnapshot) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, snapshot)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

impl Drop for JsonlSnapshotSink {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            tracing::warn!("Could not flush snapshot output: {}", e);
        }
    }
}

/// Keeps snapshots in memory; clones share the same buffer
#[derive(Clone, Default)]
pub struct MemorySnapshotSink {
    snapshots: Arc<Mutex<Vec<DailySnapshot>>>,
}

impl MemorySnapshotSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<DailySnapshot> {
        match self.snapshots.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl SnapshotSink for MemorySnapshotSink {
    fn emit(&mut self, snapshot: &DailySnapshot) -> Result<(), SinkError> {
        let mut guard = match self.snapshots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push(snapshot.clone());
        Ok(())
    }
}
