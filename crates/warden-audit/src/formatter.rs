//! Audit formatter node.

use async_trait::async_trait;
use warden_core::FormatKind;

use crate::context::ProcessContext;
use crate::error::AuditError;
use crate::event::{AuditEvent, Event};
use crate::node::{Node, NodeType, require_event};

/// Renders audit events and attaches the bytes to the event under the
/// format's name, for the sink that follows.
#[derive(Debug, Clone)]
pub struct EntryFormatter {
    format: FormatKind,
    prefix: String,
}

impl EntryFormatter {
    pub fn new(format: FormatKind) -> Self {
        Self {
            format,
            prefix: String::new(),
        }
    }

    /// Prepend `prefix` to every rendered record.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn render(&self, event: &AuditEvent) -> Result<Vec<u8>, AuditError> {
        let mut out = self.prefix.as_bytes().to_vec();
        match self.format {
            FormatKind::Json => serde_json::to_writer(&mut out, event)?,
            FormatKind::Line => out.extend_from_slice(event.to_log_line().as_bytes()),
        }
        Ok(out)
    }
}

#[async_trait]
impl Node for EntryFormatter {
    fn node_type(&self) -> NodeType {
        NodeType::Formatter
    }

    async fn process(
        &self,
        ctx: &ProcessContext,
        event: Option<Event>,
    ) -> Result<Option<Event>, AuditError> {
        ctx.check()?;

        let event = require_event(event)?;
        let audit = event
            .audit_payload()
            .ok_or_else(|| AuditError::invalid_parameter("cannot parse event payload"))?;

        if audit.data.is_none() {
            return Err(AuditError::invalid_parameter(format!(
                "cannot audit event ({}) with no data",
                audit.subtype
            )));
        }

        let bytes = self.render(audit)?;
        Ok(Some(event.with_formatted(self.format.as_str(), bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Subtype;
    use warden_core::Envelope;

    fn event() -> Event {
        Event::audit(AuditEvent::request(
            Envelope::builder("evt-1", "login").namespace("finance/").build(),
        ))
    }

    #[tokio::test]
    async fn test_json_format() {
        let formatter = EntryFormatter::new(FormatKind::Json);
        let out = formatter
            .process(&ProcessContext::new(), Some(event()))
            .await
            .unwrap()
            .unwrap();

        let bytes = out.formatted("json").unwrap();
        let value: serde_json::Value = serde_json::from_slice(bytes).unwrap();
        assert_eq!(value["subtype"], "request");
        assert_eq!(value["data"]["id"], "evt-1");
        assert!(out.formatted("line").is_none());
    }

    #[tokio::test]
    async fn test_line_format_with_prefix() {
        let formatter = EntryFormatter::new(FormatKind::Line).with_prefix("warden: ");
        let out = formatter
            .process(&ProcessContext::new(), Some(event()))
            .await
            .unwrap()
            .unwrap();

        let line = std::str::from_utf8(out.formatted("line").unwrap()).unwrap();
        assert!(line.starts_with("warden: ["));
        assert!(line.contains("AUDIT_REQUEST"));
        assert!(line.contains("namespace=finance/"));
    }

    #[tokio::test]
    async fn test_line_format_cannot_forge_records() {
        let forged = "evt-1\n[2026-01-01T00:00:00.000Z] AUDIT_REQUEST audit_id=forged id=fake type=login";
        let event = Event::audit(AuditEvent::request(
            Envelope::builder(forged, "login").note(forged).build(),
        ));
        let out = EntryFormatter::new(FormatKind::Line)
            .process(&ProcessContext::new(), Some(event))
            .await
            .unwrap()
            .unwrap();

        let line = std::str::from_utf8(out.formatted("line").unwrap()).unwrap();
        assert_eq!(line.lines().count(), 1);
        assert_eq!(line.matches("AUDIT_REQUEST audit_id=").count(), 1);
    }

    #[tokio::test]
    async fn test_dataless_event_is_rejected() {
        let formatter = EntryFormatter::new(FormatKind::Json);
        let event = Event::audit(AuditEvent::new(Subtype::Response, None));
        let err = formatter
            .process(&ProcessContext::new(), Some(event))
            .await
            .unwrap_err();
        assert!(err.is_invalid_parameter());
        assert!(err.to_string().contains("AUDIT_RESPONSE"));
    }

    #[tokio::test]
    async fn test_wrong_payload_and_nil() {
        let formatter = EntryFormatter::new(FormatKind::Json);
        let ctx = ProcessContext::new();

        let err = formatter.process(&ctx, None).await.unwrap_err();
        assert!(err.is_invalid_parameter());

        let raw = Event::raw("other", serde_json::Value::Null);
        let err = formatter.process(&ctx, Some(raw)).await.unwrap_err();
        assert!(err.is_invalid_parameter());
    }
}
