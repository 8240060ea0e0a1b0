//! Evaluation of parsed expressions.

use crate::ast::{Expr, MatchExpr, MatchOp, MatchValue};
use crate::datum::{Datum, FieldKind, FieldValue, Schema};
use crate::error::EvalError;

impl Expr {
    /// Evaluate against a datum. `and`/`or` short-circuit.
    pub fn evaluate(&self, datum: &Datum) -> Result<bool, EvalError> {
        match self {
            Expr::And(terms) => {
                for term in terms {
                    if !term.evaluate(datum)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Expr::Or(terms) => {
                for term in terms {
                    if term.evaluate(datum)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Expr::Not(inner) => Ok(!inner.evaluate(datum)?),
            Expr::Match(m) => m.evaluate(datum),
        }
    }
}

impl MatchExpr {
    fn evaluate(&self, datum: &Datum) -> Result<bool, EvalError> {
        let value = datum
            .get(self.selector.as_str())
            .ok_or_else(|| EvalError::UnknownSelector(self.selector.to_string()))?;
        self.apply(value)
    }

    /// Check the comparison against a schema without evaluating it.
    pub(crate) fn check(&self, schema: &Schema) -> Result<(), EvalError> {
        let kind = schema
            .kind_of(self.selector.as_str())
            .ok_or_else(|| EvalError::UnknownSelector(self.selector.to_string()))?;
        if supports(self.op, kind) {
            Ok(())
        } else {
            Err(self.unsupported(kind))
        }
    }

    fn apply(&self, value: &FieldValue) -> Result<bool, EvalError> {
        if !supports(self.op, value.kind()) {
            return Err(self.unsupported(value.kind()));
        }

        let positive = match (&self.value, value) {
            (MatchValue::None, field) => field.is_empty(),
            (MatchValue::Literal(lit), FieldValue::String(s)) => match self.op {
                MatchOp::Equal | MatchOp::NotEqual => s == lit,
                _ => s.contains(lit.as_str()),
            },
            (MatchValue::Literal(lit), FieldValue::List(items)) => {
                items.iter().any(|item| item == lit)
            }
            (MatchValue::Pattern(re), FieldValue::String(s)) => re.is_match(s),
            (MatchValue::Pattern(_), FieldValue::List(_)) => {
                return Err(self.unsupported(FieldKind::List));
            }
        };

        Ok(positive != self.op.is_negated())
    }

    fn unsupported(&self, kind: FieldKind) -> EvalError {
        EvalError::Unsupported {
            selector: self.selector.to_string(),
            op: self.op,
            kind,
        }
    }
}

/// Whether an operator is defined for a field kind.
pub fn supports(op: MatchOp, kind: FieldKind) -> bool {
    match kind {
        FieldKind::String => true,
        FieldKind::List => !matches!(
            op,
            MatchOp::Equal | MatchOp::NotEqual | MatchOp::Matches | MatchOp::NotMatches
        ),
    }
}
