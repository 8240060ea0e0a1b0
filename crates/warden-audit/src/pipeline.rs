//! Ordered node chains.

use std::sync::Arc;
use warden_core::{DeviceConfig, DeviceType};

use crate::context::ProcessContext;
use crate::error::AuditError;
use crate::event::Event;
use crate::filter::EntryFilter;
use crate::formatter::EntryFormatter;
use crate::node::{Node, NodeType};
use crate::sink::{DiscardSink, FileSink, StdoutSink};

/// How a pipeline finished with an event.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// The terminal sink consumed the event.
    Delivered,
    /// A node stopped the event early.
    Filtered { node: usize },
    /// Every node passed the event on; there was no sink.
    Completed(Event),
}

/// An ordered chain of nodes, typically filter, formatter, sink.
pub struct Pipeline {
    id: String,
    nodes: Vec<Arc<dyn Node>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("id", &self.id)
            .field("nodes", &self.node_types())
            .finish()
    }
}

impl Pipeline {
    /// Assemble a pipeline. There must be at least one node and a sink may
    /// only appear last.
    pub fn new(id: impl Into<String>, nodes: Vec<Arc<dyn Node>>) -> Result<Self, AuditError> {
        let id = id.into();

        if nodes.is_empty() {
            return Err(AuditError::InvalidPipeline {
                id,
                reason: "pipeline has no nodes".to_string(),
            });
        }

        let last = nodes.len() - 1;
        if let Some(position) = nodes
            .iter()
            .position(|node| node.node_type() == NodeType::Sink)
            .filter(|&position| position != last)
        {
            return Err(AuditError::InvalidPipeline {
                id,
                reason: format!("sink at position {position} is not the last node"),
            });
        }

        Ok(Self { id, nodes })
    }

    /// Build the pipeline for a configured device:
    /// `[filter] -> formatter -> sink`.
    pub fn from_device(device: &DeviceConfig) -> Result<Self, AuditError> {
        let mut nodes: Vec<Arc<dyn Node>> = Vec::with_capacity(3);

        if let Some(filter) = &device.filter {
            nodes.push(Arc::new(EntryFilter::new(filter)?));
        }

        let mut formatter = EntryFormatter::new(device.format);
        if let Some(prefix) = &device.prefix {
            formatter = formatter.with_prefix(prefix.clone());
        }
        nodes.push(Arc::new(formatter));

        let sink: Arc<dyn Node> = match device.device_type {
            DeviceType::File => {
                let path = device.path.clone().ok_or_else(|| AuditError::InvalidPipeline {
                    id: device.name.clone(),
                    reason: "file device requires a path".to_string(),
                })?;
                Arc::new(FileSink::new(path, device.format))
            }
            DeviceType::Stdout => Arc::new(StdoutSink::new(device.format)),
            DeviceType::Discard => Arc::new(DiscardSink::new(device.format)),
        };
        nodes.push(sink);

        Self::new(device.name.clone(), nodes)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn node_types(&self) -> Vec<NodeType> {
        self.nodes.iter().map(|node| node.node_type()).collect()
    }

    /// Run an event through every node in order.
    ///
    /// Stops at the first node that returns no event or an error; later nodes
    /// are not invoked.
    pub async fn process(
        &self,
        ctx: &ProcessContext,
        event: Event,
    ) -> Result<PipelineOutcome, AuditError> {
        let mut current = Some(event);

        for (index, node) in self.nodes.iter().enumerate() {
            let node_type = node.node_type();
            match node.process(ctx, current.take()).await {
                Ok(Some(next)) => current = Some(next),
                Ok(None) if node_type == NodeType::Sink => {
                    return Ok(PipelineOutcome::Delivered);
                }
                Ok(None) => {
                    tracing::trace!(pipeline = %self.id, node = index, %node_type, "Pipeline stopped");
                    return Ok(PipelineOutcome::Filtered { node: index });
                }
                Err(e) => {
                    if e.is_cancellation() {
                        tracing::debug!(pipeline = %self.id, node = index, error = %e, "Pipeline cancelled");
                    } else {
                        tracing::warn!(pipeline = %self.id, node = index, %node_type, error = %e, "Pipeline node failed");
                    }
                    return Err(e);
                }
            }
        }

        match current {
            Some(event) => Ok(PipelineOutcome::Completed(event)),
            None => Err(AuditError::invalid_parameter("pipeline lost its event")),
        }
    }

    /// Reopen every node, stopping at the first failure.
    pub async fn reopen(&self) -> Result<(), AuditError> {
        for node in &self.nodes {
            node.reopen().await?;
        }
        tracing::debug!(pipeline = %self.id, "Reopened pipeline");
        Ok(())
    }
}
