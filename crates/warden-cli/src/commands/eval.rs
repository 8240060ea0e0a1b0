//! `warden eval` command implementation.

use anyhow::{Context, Result};
use std::path::Path;

use warden_audit::{Evaluator, project};

use super::{namespace_arg, read_envelopes};

/// Result of evaluating one envelope.
#[derive(Debug)]
pub struct EvalLine {
    pub line: usize,
    pub id: String,
    /// `Ok(true)` when the envelope would reach the device.
    pub result: Result<bool, String>,
}

/// Evaluate a filter against every envelope in a file.
pub fn evaluate_file(filter: &str, namespace: &str, envelopes: &Path) -> Result<Vec<EvalLine>> {
    let evaluator = Evaluator::compile(filter).context("invalid filter")?;
    let namespace = namespace_arg(namespace)?;

    let lines = read_envelopes(envelopes)?
        .into_iter()
        .map(|(line, envelope)| {
            let datum = project(&envelope, &namespace.path);
            EvalLine {
                line,
                id: envelope.id,
                result: evaluator.evaluate(&datum).map_err(|e| e.to_string()),
            }
        })
        .collect();

    Ok(lines)
}

/// Run `warden eval`.
pub fn run(filter: &str, namespace: &str, envelopes: &Path) -> Result<()> {
    let lines = evaluate_file(filter, namespace, envelopes)?;

    let mut matched = 0;
    for line in &lines {
        match &line.result {
            Ok(true) => {
                matched += 1;
                println!("{:>4}  match     {}", line.line, line.id);
            }
            Ok(false) => println!("{:>4}  no match  {}", line.line, line.id),
            Err(e) => println!("{:>4}  error     {}: {}", line.line, line.id, e),
        }
    }
    println!("\n{} of {} envelope(s) matched", matched, lines.len());
    Ok(())
}
