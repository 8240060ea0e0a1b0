//! Audit broker.
//!
//! The broker owns the registered pipelines, one per audit device, and fans
//! every event out to all of them. An event counts as audited once at least
//! `success_threshold` pipelines handled it without error.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use warden_core::AuditConfig;

use crate::context::ProcessContext;
use crate::error::{AuditError, PipelineFailure};
use crate::event::{AuditEvent, Event};
use crate::pipeline::{Pipeline, PipelineOutcome};

/// Per-send tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrokerStatus {
    /// Pipelines whose sink consumed the event.
    pub delivered: usize,
    /// Pipelines that stopped the event without error.
    pub filtered: usize,
    /// Pipelines that failed.
    pub failed: usize,
}

impl BrokerStatus {
    /// Pipelines that completed without error.
    pub fn succeeded(&self) -> usize {
        self.delivered + self.filtered
    }
}

/// Fans audit events out to registered pipelines.
#[derive(Debug)]
pub struct Broker {
    success_threshold: usize,
    pipelines: RwLock<BTreeMap<String, Arc<Pipeline>>>,
}

impl Broker {
    /// Create an empty broker.
    pub fn new(success_threshold: usize) -> Self {
        Self {
            success_threshold,
            pipelines: RwLock::new(BTreeMap::new()),
        }
    }

    /// Build a broker with one pipeline per enabled device.
    ///
    /// Fails on the first device that cannot be built; no partially
    /// configured broker is returned.
    pub fn from_config(config: &AuditConfig) -> Result<Self, AuditError> {
        config.validate()?;

        let broker = Self::new(config.success_threshold);
        if !config.enabled {
            tracing::debug!("Auditing disabled, broker has no pipelines");
            return Ok(broker);
        }

        for device in config.enabled_devices() {
            let pipeline = Pipeline::from_device(device)?;
            tracing::debug!(
                device = %device.name,
                device_type = %device.device_type,
                format = %device.format,
                filtered = device.filter.is_some(),
                "Built audit pipeline"
            );
            broker.register(pipeline);
        }

        Ok(broker)
    }

    /// Register a pipeline under its id, returning the one it replaces.
    ///
    /// Sends already in flight keep using the pipeline they started with.
    pub fn register(&self, pipeline: Pipeline) -> Option<Arc<Pipeline>> {
        let id = pipeline.id().to_string();
        let previous = self
            .pipelines
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), Arc::new(pipeline));
        tracing::debug!(pipeline = %id, replaced = previous.is_some(), "Registered pipeline");
        previous
    }

    /// Remove a pipeline.
    pub fn deregister(&self, id: &str) -> Result<Arc<Pipeline>, AuditError> {
        let removed = self
            .pipelines
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .ok_or_else(|| AuditError::UnknownPipeline(id.to_string()))?;
        tracing::debug!(pipeline = %id, "Deregistered pipeline");
        Ok(removed)
    }

    /// Ids of the registered pipelines, sorted.
    pub fn pipeline_ids(&self) -> Vec<String> {
        self.pipelines
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    fn snapshot(&self) -> Vec<Arc<Pipeline>> {
        self.pipelines
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Send an event through every registered pipeline.
    pub async fn send(&self, ctx: &ProcessContext, event: Event) -> Result<BrokerStatus, AuditError> {
        let pipelines = self.snapshot();
        let required = self.success_threshold.min(pipelines.len());

        let mut status = BrokerStatus::default();
        let mut failures = Vec::new();

        for pipeline in &pipelines {
            match pipeline.process(ctx, event.clone()).await {
                Ok(PipelineOutcome::Delivered) => status.delivered += 1,
                Ok(PipelineOutcome::Filtered { .. }) => status.filtered += 1,
                Ok(PipelineOutcome::Completed(_)) => status.delivered += 1,
                Err(error) => {
                    status.failed += 1;
                    failures.push(PipelineFailure {
                        pipeline: pipeline.id().to_string(),
                        error,
                    });
                }
            }
        }

        tracing::debug!(
            event_type = %event.event_type,
            delivered = status.delivered,
            filtered = status.filtered,
            failed = status.failed,
            "Audit event sent"
        );

        if status.succeeded() < required {
            tracing::warn!(
                required,
                succeeded = status.succeeded(),
                "Audit event did not reach enough devices"
            );
            return Err(AuditError::ThresholdNotMet {
                required,
                succeeded: status.succeeded(),
                failures,
            });
        }

        Ok(status)
    }

    /// Wrap an audit event and send it.
    pub async fn audit(&self, ctx: &ProcessContext, event: AuditEvent) -> Result<BrokerStatus, AuditError> {
        self.send(ctx, Event::audit(event)).await
    }

    /// Reopen every pipeline, e.g. after log rotation.
    ///
    /// Every pipeline is attempted; the first error is returned.
    pub async fn reopen(&self) -> Result<(), AuditError> {
        let mut first_error = None;
        for pipeline in self.snapshot() {
            if let Err(e) = pipeline.reopen().await {
                tracing::warn!(pipeline = %pipeline.id(), error = %e, "Failed to reopen pipeline");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::EntryFilter;
    use crate::formatter::EntryFormatter;
    use crate::node::Node;
    use crate::sink::MemorySink;
    use warden_core::{Envelope, FormatKind, Namespace};

    fn memory_pipeline(id: &str, filter: Option<&str>) -> (Pipeline, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new(FormatKind::Json));
        let mut nodes: Vec<Arc<dyn Node>> = Vec::new();
        if let Some(filter) = filter {
            nodes.push(Arc::new(EntryFilter::new(filter).unwrap()));
        }
        nodes.push(Arc::new(EntryFormatter::new(FormatKind::Json)));
        nodes.push(sink.clone());
        (Pipeline::new(id, nodes).unwrap(), sink)
    }

    fn ctx(path: &str) -> ProcessContext {
        ProcessContext::new().with_namespace(Namespace::new("ns", path).unwrap())
    }

    fn audit_event() -> AuditEvent {
        AuditEvent::request(Envelope::new("evt", "write"))
    }

    #[tokio::test]
    async fn test_send_fans_out() {
        let broker = Broker::new(1);
        let (all, all_sink) = memory_pipeline("all", None);
        let (finance, finance_sink) = memory_pipeline("finance", Some("namespace == \"finance/\""));
        broker.register(all);
        broker.register(finance);

        let status = broker.audit(&ctx("hr"), audit_event()).await.unwrap();
        assert_eq!(
            status,
            BrokerStatus {
                delivered: 1,
                filtered: 1,
                failed: 0
            }
        );
        assert_eq!(all_sink.len(), 1);
        assert!(finance_sink.is_empty());
    }

    #[tokio::test]
    async fn test_filtered_counts_toward_threshold() {
        let broker = Broker::new(1);
        let (finance, _) = memory_pipeline("finance", Some("namespace == \"finance/\""));
        broker.register(finance);

        let status = broker.audit(&ctx("hr"), audit_event()).await.unwrap();
        assert_eq!(status.succeeded(), 1);
    }

    #[tokio::test]
    async fn test_threshold_not_met() {
        let broker = Broker::new(1);
        let (p, _) = memory_pipeline("p", Some("namespace == \"\""));
        broker.register(p);

        // Without a namespace the filter cannot run.
        let err = broker
            .audit(&ProcessContext::new(), audit_event())
            .await
            .unwrap_err();
        match err {
            AuditError::ThresholdNotMet {
                required,
                succeeded,
                failures,
            } => {
                assert_eq!(required, 1);
                assert_eq!(succeeded, 0);
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].pipeline, "p");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_failure_below_threshold_is_tolerated() {
        let broker = Broker::new(1);
        let (ok, ok_sink) = memory_pipeline("ok", None);
        let (bad, _) = memory_pipeline("bad", Some("namespace == \"\""));
        broker.register(ok);
        broker.register(bad);

        // "bad" needs a namespace, "ok" does not.
        let status = broker.audit(&ProcessContext::new(), audit_event()).await.unwrap();
        assert_eq!(status.failed, 1);
        assert_eq!(status.delivered, 1);
        assert_eq!(ok_sink.len(), 1);
    }

    #[tokio::test]
    async fn test_no_pipelines() {
        let broker = Broker::new(1);
        let status = broker.audit(&ctx(""), audit_event()).await.unwrap();
        assert_eq!(status, BrokerStatus::default());
    }

    #[tokio::test]
    async fn test_register_replace_and_deregister() {
        let broker = Broker::new(1);
        let (first, first_sink) = memory_pipeline("p", None);
        let (second, second_sink) = memory_pipeline("p", None);

        assert!(broker.register(first).is_none());
        let replaced = broker.register(second).unwrap();
        assert_eq!(replaced.id(), "p");
        assert_eq!(broker.pipeline_ids(), vec!["p".to_string()]);

        broker.audit(&ctx(""), audit_event()).await.unwrap();
        assert!(first_sink.is_empty());
        assert_eq!(second_sink.len(), 1);

        broker.deregister("p").unwrap();
        assert!(broker.pipeline_ids().is_empty());
        assert!(matches!(
            broker.deregister("p"),
            Err(AuditError::UnknownPipeline(_))
        ));
    }

    #[test]
    fn test_from_config_blank_filter_fails() {
        let config: AuditConfig = serde_yaml::from_str(
            "devices:\n  - name: a\n    type: discard\n  - name: b\n    type: stdout\n    filter: '   '\n",
        )
        .unwrap();
        let err = Broker::from_config(&config).unwrap_err();
        assert!(err.is_filter_parameter());
    }

    #[test]
    fn test_from_config_skips_disabled() {
        let config: AuditConfig = serde_yaml::from_str(
            "devices:\n  - name: a\n    type: discard\n  - name: b\n    type: stdout\n    enabled: false\n",
        )
        .unwrap();
        let broker = Broker::from_config(&config).unwrap();
        assert_eq!(broker.pipeline_ids(), vec!["a".to_string()]);
    }

    #[test]
    fn test_from_config_disabled() {
        let config: AuditConfig =
            serde_yaml::from_str("enabled: false\ndevices:\n  - name: a\n    type: discard\n").unwrap();
        let broker = Broker::from_config(&config).unwrap();
        assert!(broker.pipeline_ids().is_empty());
    }

    #[tokio::test]
    async fn test_reopen() {
        let broker = Broker::new(1);
        let (p, _) = memory_pipeline("p", None);
        broker.register(p);
        broker.reopen().await.unwrap();
    }
}
