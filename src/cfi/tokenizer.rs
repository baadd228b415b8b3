//! CFI Tokenizer
//!
//! Turns raw expression text (the part inside `epubcfi(...)`) into tokens.
//!
//! The tokenizer is a three-state machine with one character of pushback:
//!
//! ```text
//! Ready    ─ ',' '!'      → Symbol
//!          ─ '/'          → InStep
//!          ─ ':' '~' '@'  → InOffset
//! InStep   ─ digits, then → Step (+ optional [assertion])
//! InOffset ─ digits, then ':' '~' '@' → InOffset (next chain part)
//!                    else → Offset (+ optional [assertion])
//! ```

use std::fmt;
use std::str::CharIndices;

use super::assertion::read_assertion;
use super::types::{Offset, Step};
use crate::error::{CfiError, Result};

/// A single CFI token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// End of input; returned again on every further read
    End,
    Symbol(Symbol),
    Step(Step),
    Offset(Offset),
}

/// Structural symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    /// `,` separates range paths
    Comma,
    /// `!` redirects into a referenced document
    Redirect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Ready,
    InStep,
    InOffset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OffsetSymbol {
    Colon,
    Tilde,
    At,
}

impl OffsetSymbol {
    fn from_char(ch: char) -> Option<Self> {
        match ch {
            ':' => Some(OffsetSymbol::Colon),
            '~' => Some(OffsetSymbol::Tilde),
            '@' => Some(OffsetSymbol::At),
            _ => None,
        }
    }

    fn as_char(self) -> char {
        match self {
            OffsetSymbol::Colon => ':',
            OffsetSymbol::Tilde => '~',
            OffsetSymbol::At => '@',
        }
    }
}

/// Longest valid chain: `~S@X:Y`
const MAX_CHAIN: usize = 3;

/// Symbol/value pairs of the offset being read
#[derive(Debug, Clone, Copy)]
struct OffsetChain {
    parts: [(OffsetSymbol, u32); MAX_CHAIN],
    len: usize,
}

impl OffsetChain {
    fn new() -> Self {
        Self {
            parts: [(OffsetSymbol::Colon, 0); MAX_CHAIN],
            len: 0,
        }
    }

    fn push(&mut self, symbol: OffsetSymbol, value: u32, position: usize) -> Result<()> {
        if self.len == MAX_CHAIN {
            return Err(CfiError::syntax(
                position,
                format!("unexpected offset: {}{}{}", self, symbol.as_char(), value),
            ));
        }
        self.parts[self.len] = (symbol, value);
        self.len += 1;
        Ok(())
    }

    fn as_slice(&self) -> &[(OffsetSymbol, u32)] {
        &self.parts[..self.len]
    }

    /// Map the chain onto one of the four offset shapes
    fn close(&mut self, assertion: Option<String>, position: usize) -> Result<Offset> {
        use OffsetSymbol::{At, Colon, Tilde};

        let offset = match *self.as_slice() {
            [(Colon, value)] => Offset::Character { value, assertion },
            [(Tilde, seconds)] => Offset::Temporal { seconds, assertion },
            [(At, x), (Colon, y)] => Offset::Spatial { x, y, assertion },
            [(Tilde, seconds), (At, x), (Colon, y)] => Offset::TemporalSpatial {
                seconds,
                x,
                y,
                assertion,
            },
            _ => {
                return Err(CfiError::syntax(
                    position,
                    format!("unexpected offset: {}", self),
                ))
            }
        };
        self.len = 0;
        Ok(offset)
    }
}

impl fmt::Display for OffsetChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (symbol, value) in self.as_slice() {
            write!(f, "{}{}", symbol.as_char(), value)?;
        }
        Ok(())
    }
}

/// Streaming tokenizer over a CFI expression
pub struct Tokenizer<'a> {
    source: CharIndices<'a>,
    len: usize,
    pushback: Option<(usize, char)>,
    phase: Phase,
    digits: String,
    digits_start: usize,
    offset_symbol: OffsetSymbol,
    chain: OffsetChain,
    position: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            source: input.char_indices(),
            len: input.len(),
            pushback: None,
            phase: Phase::Ready,
            digits: String::new(),
            digits_start: 0,
            offset_symbol: OffsetSymbol::Colon,
            chain: OffsetChain::new(),
            position: 0,
        }
    }

    /// Byte position of the last character read
    pub fn position(&self) -> usize {
        self.position
    }

    fn read(&mut self) -> Option<(usize, char)> {
        let next = self.pushback.take().or_else(|| self.source.next());
        self.position = next.map_or(self.len, |(pos, _)| pos);
        next
    }

    fn unread(&mut self, next: Option<(usize, char)>) {
        self.pushback = next;
    }

    /// Read the next token
    pub fn next_token(&mut self) -> Result<Token> {
        loop {
            let next = self.read();

            match self.phase {
                Phase::Ready => match next {
                    None => return Ok(Token::End),
                    Some((_, ',')) => return Ok(Token::Symbol(Symbol::Comma)),
                    Some((_, '!')) => return Ok(Token::Symbol(Symbol::Redirect)),
                    Some((pos, '/')) => self.begin(Phase::InStep, pos + 1),
                    Some((pos, ch)) => match OffsetSymbol::from_char(ch) {
                        Some(symbol) => {
                            self.offset_symbol = symbol;
                            self.begin(Phase::InOffset, pos + 1);
                        }
                        None => {
                            return Err(CfiError::syntax(
                                pos,
                                format!("unexpected character '{}'", ch),
                            ))
                        }
                    },
                },
                Phase::InStep | Phase::InOffset => {
                    if let Some((_, ch)) = next {
                        if ch.is_ascii_digit() {
                            self.digits.push(ch);
                            continue;
                        }
                    }
                    if let Some(token) = self.finish_integer(next)? {
                        return Ok(token);
                    }
                }
            }
        }
    }

    fn begin(&mut self, phase: Phase, digits_start: usize) {
        self.phase = phase;
        self.digits.clear();
        self.digits_start = digits_start;
    }

    /// Convert the buffered digits; `terminator` is the first non-digit
    fn finish_integer(&mut self, terminator: Option<(usize, char)>) -> Result<Option<Token>> {
        let value = self.take_integer()?;

        if self.phase == Phase::InStep {
            self.phase = Phase::Ready;
            let assertion = self.assertion_after(terminator)?;
            return Ok(Some(Token::Step(Step {
                index: value,
                assertion,
            })));
        }

        self.chain.push(self.offset_symbol, value, self.digits_start)?;

        if let Some((pos, ch)) = terminator {
            if let Some(symbol) = OffsetSymbol::from_char(ch) {
                self.offset_symbol = symbol;
                self.begin(Phase::InOffset, pos + 1);
                return Ok(None);
            }
        }

        self.phase = Phase::Ready;
        let assertion = self.assertion_after(terminator)?;
        let offset = self.chain.close(assertion, self.position)?;
        Ok(Some(Token::Offset(offset)))
    }

    fn take_integer(&mut self) -> Result<u32> {
        let position = self.digits_start;
        if self.digits.is_empty() {
            return Err(CfiError::syntax(position, "expected an integer"));
        }
        if self.digits.len() > 1 && self.digits.starts_with('0') {
            return Err(CfiError::syntax(
                position,
                format!("{} leading zero is not allowed", self.digits),
            ));
        }
        let value = self
            .digits
            .parse()
            .map_err(|_| CfiError::syntax(position, format!("integer {} out of range", self.digits)))?;
        self.digits.clear();
        Ok(value)
    }

    /// Read a `[...]` assertion if `terminator` opens one, otherwise push
    /// the terminator back for the next token
    fn assertion_after(&mut self, terminator: Option<(usize, char)>) -> Result<Option<String>> {
        match terminator {
            Some((pos, '[')) => {
                let assertion = read_assertion(&mut self.source, pos)?;
                Ok(Some(assertion))
            }
            other => {
                self.unread(other);
                Ok(None)
            }
        }
    }
}

/// Tokenize a whole expression, up to and including [`Token::End`]
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokenizer = Tokenizer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = tokenizer.next_token()?;
        let done = token == Token::End;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::End => write!(f, "end of input"),
            Token::Symbol(Symbol::Comma) => write!(f, ","),
            Token::Symbol(Symbol::Redirect) => write!(f, "!"),
            Token::Step(step) => fmt::Display::fmt(step, f),
            Token::Offset(offset) => fmt::Display::fmt(offset, f),
        }
    }
}
