//! Rule splitting: boolean structure over atomic statements.
//!
//! A rule combines statements with `and`, `or`, `not`, square brackets for
//! grouping, and `*` as an AND shorthand. Precedence from loosest to
//! tightest binding is `or`, `and`/`*`, `not`. The output is the ordered
//! statement list plus a [`BoolExpr`] over statement indexes, which the
//! evaluator folds after computing each statement truth independently.

use crate::lang::TranslateError;
use serde::{Deserialize, Serialize};

/// Boolean combination of statement indexes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoolExpr {
    Leaf(usize),
    Not(Box<BoolExpr>),
    And(Vec<BoolExpr>),
    Or(Vec<BoolExpr>),
}

/// Result of splitting a raw rule.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitExpression {
    pub statements: Vec<String>,
    pub expr: BoolExpr,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    And,
    Or,
    Not,
    Open,
    Close,
    Statement(String),
}

/// A ranking rule must be the sole content of its expression; anything
/// mentioning top/bottom past this length is a combination attempt.
const RANKING_MAX_LEN: usize = 50;

/// Split a raw rule into statements and a boolean expression over them.
pub fn split_expression(expression: &str) -> Result<SplitExpression, TranslateError> {
    let trimmed = expression.trim();
    if trimmed.is_empty() {
        return Err(TranslateError::InvalidExpression(
            "empty expression".to_string(),
        ));
    }

    let lower = trimmed.to_ascii_lowercase();
    if (lower.contains("top") || lower.contains("bottom")) && trimmed.len() > RANKING_MAX_LEN {
        return Err(TranslateError::InvalidExpression(format!(
            "a top/bottom ranking must be the whole rule: '{trimmed}'"
        )));
    }

    let tokens = tokenize(trimmed);
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        statements: Vec::new(),
        source: trimmed,
    };
    let expr = parser.or_expr()?;
    if parser.pos != tokens.len() {
        return Err(TranslateError::InvalidExpression(format!(
            "unexpected trailing input in '{trimmed}'"
        )));
    }
    Ok(SplitExpression {
        statements: parser.statements,
        expr,
    })
}

fn tokenize(expression: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut flush = |current: &mut String, tokens: &mut Vec<Token>| {
        let text = current.trim();
        if !text.is_empty() {
            tokens.push(Token::Statement(text.to_string()));
        }
        current.clear();
    };

    // Connective words are recognized only as standalone
    // whitespace-delimited words; everything else accretes into the
    // current statement.
    for word in split_with_symbols(expression) {
        match word.as_str() {
            "[" => {
                flush(&mut current, &mut tokens);
                tokens.push(Token::Open);
            }
            "]" => {
                flush(&mut current, &mut tokens);
                tokens.push(Token::Close);
            }
            "*" => {
                flush(&mut current, &mut tokens);
                tokens.push(Token::And);
            }
            w if w.eq_ignore_ascii_case("and") => {
                flush(&mut current, &mut tokens);
                tokens.push(Token::And);
            }
            w if w.eq_ignore_ascii_case("or") => {
                flush(&mut current, &mut tokens);
                tokens.push(Token::Or);
            }
            w if w.eq_ignore_ascii_case("not") => {
                flush(&mut current, &mut tokens);
                tokens.push(Token::Not);
            }
            w => {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(w);
            }
        }
    }
    flush(&mut current, &mut tokens);
    tokens
}

/// Whitespace split that also detaches `[`, `]` and `*` into their own
/// words, so "[A * B]" and "[ A * B ]" tokenize identically.
fn split_with_symbols(expression: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    for c in expression.chars() {
        match c {
            '[' | ']' | '*' => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
                words.push(c.to_string());
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    statements: Vec<String>,
    source: &'a str,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn or_expr(&mut self) -> Result<BoolExpr, TranslateError> {
        let mut terms = vec![self.and_expr()?];
        while matches!(self.peek(), Some(Token::Or)) {
            self.pos += 1;
            terms.push(self.and_expr()?);
        }
        Ok(if terms.len() == 1 {
            terms.pop().unwrap()
        } else {
            BoolExpr::Or(terms)
        })
    }

    fn and_expr(&mut self) -> Result<BoolExpr, TranslateError> {
        let mut terms = vec![self.not_expr()?];
        while matches!(self.peek(), Some(Token::And)) {
            self.pos += 1;
            terms.push(self.not_expr()?);
        }
        Ok(if terms.len() == 1 {
            terms.pop().unwrap()
        } else {
            BoolExpr::And(terms)
        })
    }

    fn not_expr(&mut self) -> Result<BoolExpr, TranslateError> {
        if matches!(self.peek(), Some(Token::Not)) {
            self.pos += 1;
            return Ok(BoolExpr::Not(Box::new(self.not_expr()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<BoolExpr, TranslateError> {
        match self.peek() {
            Some(Token::Open) => {
                self.pos += 1;
                let inner = self.or_expr()?;
                if !matches!(self.peek(), Some(Token::Close)) {
                    return Err(TranslateError::InvalidExpression(format!(
                        "unbalanced brackets in '{}'",
                        self.source
                    )));
                }
                self.pos += 1;
                Ok(inner)
            }
            Some(Token::Statement(text)) => {
                let index = self.statements.len();
                self.statements.push(text.clone());
                self.pos += 1;
                Ok(BoolExpr::Leaf(index))
            }
            _ => Err(TranslateError::InvalidExpression(format!(
                "expected a statement or '[' in '{}'",
                self.source
            ))),
        }
    }
}
