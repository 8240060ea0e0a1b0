//! `warden replay` command implementation.

use anyhow::{Context, Result, bail};
use std::path::Path;
use tokio_util::sync::CancellationToken;

use warden_audit::{AuditError, AuditEvent, Broker, ProcessContext};
use warden_core::WardenConfig;

use super::{namespace_arg, read_envelopes};

/// Totals across a replay.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub sent: usize,
    pub delivered: usize,
    pub filtered: usize,
    /// Events that did not reach enough devices.
    pub rejected: usize,
}

/// Send every envelope in a file through the configured broker.
pub async fn replay_file(
    config: &Path,
    namespace: &str,
    envelopes: &Path,
    cancel: CancellationToken,
) -> Result<ReplaySummary> {
    let config = WardenConfig::load_with_context(config)
        .with_context(|| format!("failed to load {}", config.display()))?;
    let broker = Broker::from_config(&config.audit)?;
    let ctx = ProcessContext::new()
        .with_namespace(namespace_arg(namespace)?)
        .with_cancellation(cancel);

    let mut summary = ReplaySummary::default();
    for (line, envelope) in read_envelopes(envelopes)? {
        let id = envelope.id.clone();
        match broker.audit(&ctx, AuditEvent::request(envelope)).await {
            Ok(status) => {
                summary.delivered += status.delivered;
                summary.filtered += status.filtered;
                println!(
                    "{:>4}  {}  delivered={} filtered={} failed={}",
                    line, id, status.delivered, status.filtered, status.failed
                );
            }
            Err(AuditError::ThresholdNotMet { failures, .. })
                if failures.iter().any(|f| f.error.is_cancellation()) =>
            {
                bail!("replay cancelled at line {line}");
            }
            Err(e) => {
                summary.rejected += 1;
                println!("{:>4}  {}  rejected: {}", line, id, e);
            }
        }
        summary.sent += 1;
    }

    Ok(summary)
}

/// Run `warden replay`.
pub async fn run(
    config: &Path,
    namespace: &str,
    envelopes: &Path,
    cancel: CancellationToken,
) -> Result<()> {
    let summary = replay_file(config, namespace, envelopes, cancel).await?;
    println!(
        "\n{} event(s) sent: {} delivery(ies), {} filtered, {} rejected",
        summary.sent, summary.delivered, summary.filtered, summary.rejected
    );
    Ok(())
}
