//! Tokenizer for filter expressions.

use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    /// Bare word: selector, keyword or unquoted value.
    Word(String),
    /// Double-quoted or backtick-quoted literal.
    Quoted(String),
    Equal,
    NotEqual,
    LParen,
    RParen,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

impl Token {
    /// The bare word, if this is one.
    pub fn word(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Word(w) => Some(w),
            _ => None,
        }
    }

    pub fn is_word(&self, expected: &str) -> bool {
        self.word() == Some(expected)
    }

    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Word(w) => format!("'{}'", w),
            TokenKind::Quoted(v) => format!("\"{}\"", v),
            TokenKind::Equal => "'=='".to_string(),
            TokenKind::NotEqual => "'!='".to_string(),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
        }
    }
}

pub(crate) const KEYWORDS: &[&str] = &[
    "and", "or", "not", "in", "is", "empty", "matches", "contains",
];

pub(crate) fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | ':' | '*' | '@' | '+')
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(position, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token { kind: TokenKind::LParen, position });
            }
            ')' => {
                chars.next();
                tokens.push(Token { kind: TokenKind::RParen, position });
            }
            '=' | '!' => {
                chars.next();
                match chars.next() {
                    Some((_, '=')) => {
                        let kind = if c == '=' { TokenKind::Equal } else { TokenKind::NotEqual };
                        tokens.push(Token { kind, position });
                    }
                    _ => {
                        return Err(ParseError::new(
                            position,
                            format!("expected '{}='", c),
                        ));
                    }
                }
            }
            '"' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some((_, '"')) => break,
                        Some((at, '\\')) => match chars.next() {
                            Some((_, '"')) => value.push('"'),
                            Some((_, '\\')) => value.push('\\'),
                            Some((_, 'n')) => value.push('\n'),
                            Some((_, 't')) => value.push('\t'),
                            Some((_, other)) => {
                                return Err(ParseError::new(
                                    at,
                                    format!("unknown escape sequence '\\{}'", other),
                                ));
                            }
                            None => {
                                return Err(ParseError::new(position, "unterminated string"));
                            }
                        },
                        Some((_, other)) => value.push(other),
                        None => return Err(ParseError::new(position, "unterminated string")),
                    }
                }
                tokens.push(Token { kind: TokenKind::Quoted(value), position });
            }
            '`' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some((_, '`')) => break,
                        Some((_, other)) => value.push(other),
                        None => {
                            return Err(ParseError::new(position, "unterminated raw string"));
                        }
                    }
                }
                tokens.push(Token { kind: TokenKind::Quoted(value), position });
            }
            c if is_word_char(c) => {
                let mut word = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if !is_word_char(c) {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                tokens.push(Token { kind: TokenKind::Word(word), position });
            }
            other => {
                return Err(ParseError::new(
                    position,
                    format!("unexpected character '{}'", other),
                ));
            }
        }
    }

    Ok(tokens)
}
