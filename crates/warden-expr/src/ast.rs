//! Expression syntax tree.

use regex::Regex;

use crate::error::ParseError;

/// A dotted field reference, e.g. `mount_path` or `plugin.version`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector(String);

impl Selector {
    /// Validate a selector: one or more identifiers joined by `.`.
    pub fn parse(raw: &str, position: usize) -> Result<Self, ParseError> {
        let valid = !raw.is_empty()
            && raw.split('.').all(|segment| {
                let mut chars = segment.chars();
                matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            });

        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(ParseError::new(position, format!("invalid selector '{}'", raw)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Matching operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchOp {
    Equal,
    NotEqual,
    In,
    NotIn,
    IsEmpty,
    IsNotEmpty,
    Contains,
    NotContains,
    Matches,
    NotMatches,
}

impl MatchOp {
    /// Whether the operator negates its positive form.
    pub fn is_negated(&self) -> bool {
        matches!(
            self,
            MatchOp::NotEqual
                | MatchOp::NotIn
                | MatchOp::IsNotEmpty
                | MatchOp::NotContains
                | MatchOp::NotMatches
        )
    }
}

impl std::fmt::Display for MatchOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            MatchOp::Equal => "==",
            MatchOp::NotEqual => "!=",
            MatchOp::In => "in",
            MatchOp::NotIn => "not in",
            MatchOp::IsEmpty => "is empty",
            MatchOp::IsNotEmpty => "is not empty",
            MatchOp::Contains => "contains",
            MatchOp::NotContains => "not contains",
            MatchOp::Matches => "matches",
            MatchOp::NotMatches => "not matches",
        };
        f.write_str(text)
    }
}

/// Right-hand side of a match.
#[derive(Debug, Clone)]
pub enum MatchValue {
    /// No value (`is empty`).
    None,
    Literal(String),
    /// Compiled at parse time.
    Pattern(Regex),
}

/// A single `selector <op> value` comparison.
#[derive(Debug, Clone)]
pub struct MatchExpr {
    pub selector: Selector,
    pub op: MatchOp,
    pub value: MatchValue,
}

/// Boolean expression tree. `And`/`Or` hold every operand of a chain, at
/// least two.
#[derive(Debug, Clone)]
pub enum Expr {
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    Match(MatchExpr),
}

impl Expr {
    /// Visit every comparison in the tree, left to right.
    pub fn for_each_match<'a>(&'a self, visit: &mut impl FnMut(&'a MatchExpr)) {
        match self {
            Expr::And(terms) | Expr::Or(terms) => {
                for term in terms {
                    term.for_each_match(visit);
                }
            }
            Expr::Not(inner) => inner.for_each_match(visit),
            Expr::Match(m) => visit(m),
        }
    }
}
