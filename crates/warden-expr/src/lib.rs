//! # warden-expr
//!
//! Boolean filter expressions over flat field sets, in the style of
//! HashiCorp's `bexpr`:
//!
//! ```text
//! namespace == "finance/" and (mount_type == kv or "ops" in entity_ids)
//! ```
//!
//! | Operator | String field | List field |
//! |----------|--------------|------------|
//! | `==`, `!=` | exact equality | error |
//! | `is empty`, `is not empty` | `""` | no elements |
//! | `contains`, `not contains` | substring | element equality |
//! | `in`, `not in` (value on the left) | substring | element equality |
//! | `matches`, `not matches` | regex | error |
//!
//! An [`Expression`] is parsed once and is immutable afterwards, so a single
//! instance can be shared across threads and evaluated concurrently.
//!
//! ```rust
//! use warden_expr::{Datum, Expression};
//!
//! let expr = Expression::parse(r#"mount_path == "secret/""#).unwrap();
//! let datum = Datum::new().with("mount_path", "secret/");
//! assert_eq!(expr.evaluate(&datum), Ok(true));
//! ```

pub mod ast;
pub mod datum;
pub mod error;
mod eval;
mod lexer;
mod parser;

pub use ast::{MatchOp, Selector};
pub use datum::{Datum, FieldKind, FieldValue, Schema};
pub use error::{EvalError, ParseError};
pub use eval::supports;
pub use parser::MAX_DEPTH;

use ast::Expr;

/// A parsed, immutable boolean expression.
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    root: Expr,
}

impl Expression {
    /// Parse expression text.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let root = parser::parse(source)?;
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    /// The text the expression was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against a datum.
    pub fn evaluate(&self, datum: &Datum) -> Result<bool, EvalError> {
        self.root.evaluate(datum)
    }

    /// Every selector the expression references, in order of appearance.
    pub fn selectors(&self) -> Vec<&Selector> {
        let mut out = Vec::new();
        self.root.for_each_match(&mut |m| out.push(&m.selector));
        out
    }

    /// Check every comparison against a schema: each selector must be
    /// declared and each operator must be defined for the field's kind.
    ///
    /// Unlike evaluating against a zero-value datum this sees through
    /// short-circuiting, so it also reports comparisons a dry run skips.
    pub fn check(&self, schema: &Schema) -> Result<(), EvalError> {
        let mut result = Ok(());
        self.root.for_each_match(&mut |m| {
            if result.is_ok() {
                result = m.check(schema);
            }
        });
        result
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn schema() -> Schema {
        Schema::new()
            .field("namespace", FieldKind::String)
            .field("entity_ids", FieldKind::List)
    }

    #[test]
    fn test_selectors_in_order() {
        let expr = Expression::parse(r#"a == 1 or ("x" in b and not c is empty)"#).unwrap();
        let names: Vec<_> = expr.selectors().iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_check_unknown_field_behind_short_circuit() {
        let expr = Expression::parse(r#"namespace == "x" and mount == "y""#).unwrap();

        // A dry run never reaches `mount`.
        assert_eq!(expr.evaluate(&schema().zero_datum()), Ok(false));
        assert_eq!(
            expr.check(&schema()),
            Err(EvalError::UnknownSelector("mount".to_string()))
        );
    }

    #[test]
    fn test_check_operator_kind() {
        let expr = Expression::parse(r#"namespace == "x" and entity_ids == "y""#).unwrap();
        assert!(matches!(
            expr.check(&schema()),
            Err(EvalError::Unsupported { op: MatchOp::Equal, .. })
        ));

        let ok = Expression::parse(r#""y" in entity_ids and namespace matches "^a""#).unwrap();
        assert_eq!(ok.check(&schema()), Ok(()));
    }

    #[test]
    fn test_display_is_source() {
        let expr = Expression::parse("namespace is empty").unwrap();
        assert_eq!(expr.to_string(), "namespace is empty");
    }

    proptest! {
        #[test]
        fn prop_equality_matches_iff_values_equal(a in "[a-z0-9/]{0,12}", b in "[a-z0-9/]{0,12}") {
            let expr = Expression::parse(&format!("namespace == \"{}\"", a)).unwrap();
            let datum = Datum::new().with("namespace", b.clone());
            prop_assert_eq!(expr.evaluate(&datum), Ok(a == b));
        }

        #[test]
        fn prop_evaluation_is_idempotent(value in "[a-z]{0,8}", ids in proptest::collection::vec("[a-z]{1,4}", 0..4)) {
            let expr = Expression::parse(r#"namespace contains "a" or "ab" in entity_ids"#).unwrap();
            let datum = Datum::new().with("namespace", value).with("entity_ids", ids);
            let first = expr.evaluate(&datum);
            for _ in 0..3 {
                prop_assert_eq!(expr.evaluate(&datum), first.clone());
            }
        }

        #[test]
        fn prop_parse_never_panics(input in "\\PC{0,400}") {
            let _ = Expression::parse(&input);
        }

        #[test]
        fn prop_parse_never_panics_on_operator_soup(
            words in proptest::collection::vec(
                "(\\(|\\)|not|and|or|a|==|\"x\"|in|is|empty)",
                0..600,
            ),
        ) {
            let _ = Expression::parse(&words.join(" "));
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_nesting_is_bounded(depth in 0usize..4_000) {
            let input = format!("{}namespace == \"\"{}", "(".repeat(depth), ")".repeat(depth));
            match Expression::parse(&input) {
                Ok(expr) => {
                    prop_assert!(depth <= MAX_DEPTH);
                    prop_assert_eq!(expr.evaluate(&schema().zero_datum()), Ok(true));
                }
                Err(err) => {
                    prop_assert!(depth > MAX_DEPTH);
                    prop_assert_eq!(err.message, "expression nested too deeply");
                }
            }
        }

        #[test]
        fn prop_long_chains_evaluate(terms in 1usize..25_000, hit in any::<proptest::sample::Index>()) {
            let target = hit.index(terms);
            let input = (0..terms)
                .map(|i| format!("namespace == \"n{i}/\""))
                .collect::<Vec<_>>()
                .join(" or ");
            let expr = Expression::parse(&input).unwrap();
            prop_assert_eq!(expr.check(&schema()), Ok(()));
            prop_assert_eq!(expr.selectors().len(), terms);

            let datum = Datum::new().with("namespace", format!("n{target}/"));
            prop_assert_eq!(expr.evaluate(&datum), Ok(true));
            prop_assert_eq!(expr.evaluate(&schema().zero_datum()), Ok(false));
        }
    }
}
