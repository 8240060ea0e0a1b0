//! Audit filter node.
//!
//! An [`EntryFilter`] holds one compiled [`Evaluator`] and drops every audit
//! event whose projected fields do not satisfy it. Filters are validated when
//! they are built, so a device with a bad filter never activates.

use async_trait::async_trait;
use std::sync::Arc;
use warden_expr::{Datum, Expression, Schema};

use crate::context::ProcessContext;
use crate::datum::{audit_schema, project};
use crate::error::{AuditError, FilterError};
use crate::event::Event;
use crate::node::{Node, NodeType, require_event};

/// A compiled, validated filter expression.
#[derive(Debug, Clone)]
pub struct Evaluator {
    expression: Expression,
}

impl Evaluator {
    /// Compile a filter against the audit field allow-list.
    pub fn compile(filter: &str) -> Result<Self, FilterError> {
        Self::compile_with_schema(filter, audit_schema())
    }

    /// Compile a filter against an arbitrary schema.
    ///
    /// The text is trimmed first. After parsing, every comparison is checked
    /// against the schema and the expression is dry-run against the schema's
    /// zero datum; either failing rejects the filter.
    pub fn compile_with_schema(filter: &str, schema: &Schema) -> Result<Self, FilterError> {
        let filter = filter.trim();
        if filter.is_empty() {
            return Err(FilterError::Empty);
        }

        let expression = Expression::parse(filter).map_err(|source| FilterError::Parse {
            filter: filter.to_string(),
            source,
        })?;

        expression
            .check(schema)
            .and_then(|()| expression.evaluate(&schema.zero_datum()))
            .map_err(|source| FilterError::Unsupported {
                filter: filter.to_string(),
                source,
            })?;

        Ok(Self { expression })
    }

    /// The trimmed filter text.
    pub fn filter(&self) -> &str {
        self.expression.source()
    }

    /// Distinct fields the filter reads, in order of first use.
    pub fn fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::new();
        for selector in self.expression.selectors() {
            if !fields.contains(&selector.as_str()) {
                fields.push(selector.as_str());
            }
        }
        fields
    }

    /// Evaluate against a datum. `true` keeps the event.
    pub fn evaluate(&self, datum: &Datum) -> Result<bool, AuditError> {
        self.expression
            .evaluate(datum)
            .map_err(|source| AuditError::Evaluation {
                filter: self.filter().to_string(),
                source,
            })
    }
}

/// Filter node for audit events.
#[derive(Debug, Clone)]
pub struct EntryFilter {
    evaluator: Arc<Evaluator>,
}

impl EntryFilter {
    /// Build a filter node from filter text.
    pub fn new(filter: &str) -> Result<Self, AuditError> {
        let evaluator = Evaluator::compile(filter)?;
        tracing::debug!(filter = %evaluator.filter(), "Compiled audit filter");
        Ok(Self::from_evaluator(Arc::new(evaluator)))
    }

    /// Build a filter node around an already compiled evaluator.
    pub fn from_evaluator(evaluator: Arc<Evaluator>) -> Self {
        Self { evaluator }
    }

    pub fn filter(&self) -> &str {
        self.evaluator.filter()
    }
}

#[async_trait]
impl Node for EntryFilter {
    fn node_type(&self) -> NodeType {
        NodeType::Filter
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

        // Nothing to filter on.
        let Some(data) = &audit.data else {
            return Ok(None);
        };

        let namespace = ctx.namespace()?;
        let datum = project(data, &namespace.path);

        if self.evaluator.evaluate(&datum)? {
            tracing::trace!(
                filter = %self.filter(),
                audit_id = %audit.id,
                "Audit event passed filter"
            );
            Ok(Some(event))
        } else {
            tracing::trace!(
                filter = %self.filter(),
                audit_id = %audit.id,
                "Audit event dropped by filter"
            );
            Ok(None)
        }
    }
}
