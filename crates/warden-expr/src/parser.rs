//! Recursive-descent parser.
//!
//! Precedence, lowest first: `or`, `and`, `not`, parenthesised groups and
//! comparisons. `and`/`or` chains become a single n-ary node; nesting through
//! `not` and parentheses is capped at [`MAX_DEPTH`].

use regex::Regex;

use crate::ast::{Expr, MatchExpr, MatchOp, MatchValue, Selector};
use crate::error::ParseError;
use crate::lexer::{Token, TokenKind, is_keyword, tokenize};

/// Maximum nesting of `not` and parenthesised groups.
pub const MAX_DEPTH: usize = 128;

pub(crate) fn parse(input: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ParseError::new(0, "empty expression"));
    }

    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        end: input.len(),
        depth: 0,
    };
    let expr = parser.parse_or()?;

    if let Some(token) = parser.peek() {
        return Err(ParseError::new(
            token.position,
            format!("unexpected {} after expression", token.describe()),
        ));
    }

    Ok(expr)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    end: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_nth(&self, n: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + n)
    }

    fn next(&mut self) -> Result<&'a Token, ParseError> {
        let token = self
            .tokens
            .get(self.pos)
            .ok_or_else(|| ParseError::new(self.end, "unexpected end of expression"))?;
        self.pos += 1;
        Ok(token)
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_word(word)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<(), ParseError> {
        let token = self.next()?;
        if token.is_word(word) {
            Ok(())
        } else {
            Err(ParseError::new(
                token.position,
                format!("expected '{}', found {}", word, token.describe()),
            ))
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut terms = vec![self.parse_and()?];
        while self.eat_word("or") {
            terms.push(self.parse_and()?);
        }
        Ok(Self::chain(terms, Expr::Or))
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut terms = vec![self.parse_unary()?];
        while self.eat_word("and") {
            terms.push(self.parse_unary()?);
        }
        Ok(Self::chain(terms, Expr::And))
    }

    fn chain(mut terms: Vec<Expr>, node: fn(Vec<Expr>) -> Expr) -> Expr {
        if terms.len() == 1 {
            if let Some(only) = terms.pop() {
                return only;
            }
        }
        node(terms)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let Some(token) = self.peek() else {
            return self.parse_match();
        };

        if token.is_word("not") {
            self.pos += 1;
            let inner = self.nested(token.position, Self::parse_unary)?;
            return Ok(Expr::Not(Box::new(inner)));
        }

        if token.kind == TokenKind::LParen {
            self.pos += 1;
            let inner = self.nested(token.position, Self::parse_or)?;
            let close = self.next()?;
            if close.kind != TokenKind::RParen {
                return Err(ParseError::new(
                    close.position,
                    format!("expected ')', found {}", close.describe()),
                ));
            }
            return Ok(inner);
        }

        self.parse_match()
    }

    /// Parse one level deeper, failing past [`MAX_DEPTH`].
    fn nested(
        &mut self,
        position: usize,
        parse: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError::new(position, "expression nested too deeply"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn parse_match(&mut self) -> Result<Expr, ParseError> {
        let first = self.next()?;

        match &first.kind {
            // "value" [not] in selector
            TokenKind::Quoted(value) => self.parse_membership(value.clone()),
            TokenKind::Word(word) if is_keyword(word) => Err(ParseError::new(
                first.position,
                format!("expected selector or value, found keyword '{}'", word),
            )),
            TokenKind::Word(word) => {
                let membership = match (self.peek(), self.peek_nth(1)) {
                    (Some(t), _) if t.is_word("in") => true,
                    (Some(t), Some(u)) if t.is_word("not") && u.is_word("in") => true,
                    _ => false,
                };
                if membership {
                    self.parse_membership(word.clone())
                } else {
                    let selector = Selector::parse(word, first.position)?;
                    self.parse_operator(selector)
                }
            }
            _ => Err(ParseError::new(
                first.position,
                format!("expected selector or value, found {}", first.describe()),
            )),
        }
    }

    fn parse_membership(&mut self, value: String) -> Result<Expr, ParseError> {
        let op = if self.eat_word("not") {
            MatchOp::NotIn
        } else {
            MatchOp::In
        };
        self.expect_word("in")?;
        let selector = self.parse_selector()?;

        Ok(Expr::Match(MatchExpr {
            selector,
            op,
            value: MatchValue::Literal(value),
        }))
    }

    fn parse_operator(&mut self, selector: Selector) -> Result<Expr, ParseError> {
        let token = self.next()?;

        let (op, value) = match &token.kind {
            TokenKind::Equal => (MatchOp::Equal, MatchValue::Literal(self.parse_value()?)),
            TokenKind::NotEqual => (MatchOp::NotEqual, MatchValue::Literal(self.parse_value()?)),
            TokenKind::Word(w) if w == "is" => {
                let op = if self.eat_word("not") {
                    MatchOp::IsNotEmpty
                } else {
                    MatchOp::IsEmpty
                };
                self.expect_word("empty")?;
                (op, MatchValue::None)
            }
            TokenKind::Word(w) if w == "contains" => {
                (MatchOp::Contains, MatchValue::Literal(self.parse_value()?))
            }
            TokenKind::Word(w) if w == "matches" => (MatchOp::Matches, self.parse_pattern()?),
            TokenKind::Word(w) if w == "not" => {
                let next = self.next()?;
                if next.is_word("contains") {
                    (MatchOp::NotContains, MatchValue::Literal(self.parse_value()?))
                } else if next.is_word("matches") {
                    (MatchOp::NotMatches, self.parse_pattern()?)
                } else {
                    return Err(ParseError::new(
                        next.position,
                        format!(
                            "expected 'contains' or 'matches' after 'not', found {}",
                            next.describe()
                        ),
                    ));
                }
            }
            _ => {
                return Err(ParseError::new(
                    token.position,
                    format!(
                        "expected operator after selector '{}', found {}",
                        selector,
                        token.describe()
                    ),
                ));
            }
        };

        Ok(Expr::Match(MatchExpr { selector, op, value }))
    }

    fn parse_selector(&mut self) -> Result<Selector, ParseError> {
        let token = self.next()?;
        match token.word() {
            Some(word) if !is_keyword(word) => Selector::parse(word, token.position),
            _ => Err(ParseError::new(
                token.position,
                format!("expected selector, found {}", token.describe()),
            )),
        }
    }

    fn parse_value(&mut self) -> Result<String, ParseError> {
        let token = self.next()?;
        match &token.kind {
            TokenKind::Quoted(value) => Ok(value.clone()),
            TokenKind::Word(word) if !is_keyword(word) => Ok(word.clone()),
            _ => Err(ParseError::new(
                token.position,
                format!("expected value, found {}", token.describe()),
            )),
        }
    }

    fn parse_pattern(&mut self) -> Result<MatchValue, ParseError> {
        let position = self.peek().map(|t| t.position).unwrap_or(self.end);
        let raw = self.parse_value()?;
        let regex = Regex::new(&raw).map_err(|e| {
            ParseError::new(position, format!("invalid regular expression: {}", e))
        })?;
        Ok(MatchValue::Pattern(regex))
    }
}
