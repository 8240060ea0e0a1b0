//! Audit sink nodes.
//!
//! Sinks are the last node of a pipeline. Each reads the bytes its formatter
//! attached under the configured format and writes them, one record per line.

use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use warden_core::FormatKind;

use crate::context::ProcessContext;
use crate::error::AuditError;
use crate::event::Event;
use crate::node::{Node, NodeType, require_event};

/// Take the rendered record for `format` out of the event.
fn rendered(event: &Event, format: FormatKind) -> Result<&[u8], AuditError> {
    event.formatted(format.as_str()).ok_or_else(|| {
        AuditError::invalid_parameter(format!(
            "event has no {format} rendering; is the sink preceded by a formatter?"
        ))
    })
}

/// Appends records to a file.
///
/// The file is opened on first write and kept open until [`Node::reopen`],
/// which lets an external rotator move the file away.
pub struct FileSink {
    path: PathBuf,
    format: FormatKind,
    file: Mutex<Option<File>>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>, format: FormatKind) -> Self {
        Self {
            path: path.into(),
            format,
            file: Mutex::new(None),
        }
    }

    fn sink_error(&self, source: std::io::Error) -> AuditError {
        AuditError::Sink {
            sink: self.path.display().to_string(),
            source,
        }
    }

    fn write_record(&self, record: &[u8]) -> Result<(), AuditError> {
        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);

        if guard.is_none() {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| self.sink_error(e))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .map_err(|e| self.sink_error(e))?;
            tracing::debug!(path = %self.path.display(), "Opened audit file");
            *guard = Some(file);
        }

        if let Some(file) = guard.as_mut() {
            file.write_all(record)
                .and_then(|()| file.write_all(b"\n"))
                .map_err(|e| self.sink_error(e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl Node for FileSink {
    fn node_type(&self) -> NodeType {
        NodeType::Sink
    }

    async fn process(
        &self,
        ctx: &ProcessContext,
        event: Option<Event>,
    ) -> Result<Option<Event>, AuditError> {
        ctx.check()?;
        let event = require_event(event)?;
        self.write_record(rendered(&event, self.format)?)?;
        Ok(None)
    }

    async fn reopen(&self) -> Result<(), AuditError> {
        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut file) = guard.take() {
            file.flush().map_err(|e| self.sink_error(e))?;
        }
        tracing::debug!(path = %self.path.display(), "Closed audit file for reopen");
        Ok(())
    }
}

/// Writes records to stdout.
pub struct StdoutSink {
    format: FormatKind,
}

impl StdoutSink {
    pub fn new(format: FormatKind) -> Self {
        Self { format }
    }
}

#[async_trait]
impl Node for StdoutSink {
    fn node_type(&self) -> NodeType {
        NodeType::Sink
    }

    async fn process(
        &self,
        ctx: &ProcessContext,
        event: Option<Event>,
    ) -> Result<Option<Event>, AuditError> {
        ctx.check()?;
        let event = require_event(event)?;
        let record = rendered(&event, self.format)?;

        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(record)
            .and_then(|()| stdout.write_all(b"\n"))
            .map_err(|source| AuditError::Sink {
                sink: "stdout".to_string(),
                source,
            })?;
        Ok(None)
    }
}

/// Accepts and drops every record.
pub struct DiscardSink {
    format: FormatKind,
}

impl DiscardSink {
    pub fn new(format: FormatKind) -> Self {
        Self { format }
    }
}

#[async_trait]
impl Node for DiscardSink {
    fn node_type(&self) -> NodeType {
        NodeType::Sink
    }

    async fn process(
        &self,
        ctx: &ProcessContext,
        event: Option<Event>,
    ) -> Result<Option<Event>, AuditError> {
        ctx.check()?;
        let event = require_event(event)?;
        rendered(&event, self.format)?;
        Ok(None)
    }
}

/// Keeps records in memory.
#[derive(Default)]
pub struct MemorySink {
    format: FormatKind,
    records: Mutex<Vec<Vec<u8>>>,
}

impl MemorySink {
    pub fn new(format: FormatKind) -> Self {
        Self {
            format,
            records: Mutex::new(Vec::new()),
        }
    }

    /// Records written so far, oldest first.
    pub fn records(&self) -> Vec<Vec<u8>> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Node for MemorySink {
    fn node_type(&self) -> NodeType {
        NodeType::Sink
    }

    async fn process(
        &self,
        ctx: &ProcessContext,
        event: Option<Event>,
    ) -> Result<Option<Event>, AuditError> {
        ctx.check()?;
        let event = require_event(event)?;
        let record = rendered(&event, self.format)?.to_vec();
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
        Ok(None)
    }
}
