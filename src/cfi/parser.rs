//! CFI Parser
//!
//! Recursive-descent parser over the token stream, with one token of
//! lookahead.
//!
//! Grammar:
//! ```text
//! expression := path ("," path)*
//! path       := (step | "!")* offset?    (not empty; only range ends may
//!                                          be a bare offset)
//! step       := "/" integer assertion?
//! offset     := ":" integer assertion?
//!             | "~" integer assertion?
//!             | "@" integer ":" integer assertion?
//!             | "~" integer "@" integer ":" integer assertion?
//! ```
//!
//! An expression holds either one path or exactly three (a range).

use super::tokenizer::{Symbol, Token, Tokenizer};
use super::types::{Entry, Expression, Path, Range};
use crate::error::{CfiError, Result};

/// Parser state
struct Parser<'a> {
    tokenizer: Tokenizer<'a>,
    lookahead: Option<Token>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            tokenizer: Tokenizer::new(input),
            lookahead: None,
        }
    }

    /// Take the current token
    fn bump(&mut self) -> Result<Token> {
        match self.lookahead.take() {
            Some(token) => Ok(token),
            None => self.tokenizer.next_token(),
        }
    }

    /// Put a token back as the lookahead
    fn push_back(&mut self, token: Token) {
        self.lookahead = Some(token);
    }

    fn unexpected(&self, token: &Token) -> CfiError {
        CfiError::syntax(
            self.tokenizer.position(),
            format!("unexpected token: {}", token),
        )
    }

    fn parse_expression(&mut self) -> Result<Expression> {
        let mut paths = Vec::new();
        let mut parent_end = 0;

        loop {
            let Some(path) = self.parse_path()? else {
                let token = self.bump()?;
                return Err(self.unexpected(&token));
            };
            // only the relative paths of a range may be a bare offset
            if paths.is_empty() && path.entries().is_empty() {
                return Err(CfiError::syntax(
                    self.tokenizer.position(),
                    "expression must start with a step",
                ));
            }
            paths.push(path);
            if paths.len() == 1 {
                parent_end = self.tokenizer.position();
            }

            match self.bump()? {
                Token::Symbol(Symbol::Comma) => continue,
                Token::End => break,
                other => return Err(self.unexpected(&other)),
            }
        }

        if paths.len() == 1 {
            if let Some(path) = paths.pop() {
                return Ok(Expression::Path(path));
            }
        }

        // https://idpf.org/epub/linking/cfi/epub-cfi.html#sec-ranges
        match <[Path; 3]>::try_from(paths) {
            Ok([parent, start, end]) => Range::new(parent, start, end)
                .map(Expression::Range)
                .map_err(|err| err.at(parent_end)),
            Err(paths) => Err(CfiError::syntax(
                self.tokenizer.position(),
                format!("wrong path number: {}", paths.len()),
            )),
        }
    }

    /// Parse one path; `None` when neither an entry nor an offset starts here
    ///
    /// Range ends may consist of an offset alone (`/4/2/3,:227,:228`).
    fn parse_path(&mut self) -> Result<Option<Path>> {
        let mut entries = Vec::new();

        loop {
            match self.bump()? {
                Token::Step(step) => entries.push(Entry::Step(step)),
                Token::Symbol(Symbol::Redirect) => {
                    if matches!(entries.last(), Some(Entry::Redirect)) {
                        return Err(CfiError::syntax(
                            self.tokenizer.position(),
                            "two consecutive redirects",
                        ));
                    }
                    entries.push(Entry::Redirect);
                }
                other => {
                    self.push_back(other);
                    break;
                }
            }
        }

        let offset = match self.bump()? {
            Token::Offset(offset) => Some(offset),
            other => {
                self.push_back(other);
                None
            }
        };

        if entries.is_empty() && offset.is_none() {
            return Ok(None);
        }

        // redirected_path = "!" , ( offset | path ): a redirect cannot close a
        // path on its own, that would select a document root
        if offset.is_none() && matches!(entries.last(), Some(Entry::Redirect)) {
            return Err(CfiError::syntax(
                self.tokenizer.position(),
                "cannot select a document root (a redirect must be followed by an offset)",
            ));
        }

        Path::new(entries, offset)
            .map(Some)
            .map_err(|err| err.at(self.tokenizer.position()))
    }
}

/// Parse a bare CFI expression (the text inside `epubcfi(...)`)
pub fn parse_expression(input: &str) -> Result<Expression> {
    Parser::new(input).parse_expression()
}

impl std::str::FromStr for Expression {
    type Err = CfiError;

    fn from_str(s: &str) -> Result<Self> {
        parse_expression(s)
    }
}
