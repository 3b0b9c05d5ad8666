//! One time slice of the grid representation
//!
//! A melody quantized to sixteenth notes becomes a flat list of tokens, each
//! covering one step: the onset of a note (`60`), the onset of a rest (`r`),
//! a continuation of whatever came before (`_`), or a piece boundary (`/`).

use std::fmt;
use std::str::FromStr;

use crate::error::SymbolError;

pub const REST_SYMBOL: &str = "r";
pub const HOLD_SYMBOL: &str = "_";
pub const BOUNDARY_SYMBOL: &str = "/";

/// Highest valid MIDI note number
pub const MAX_PITCH: u8 = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Token {
    /// Note onset, MIDI note number
    Pitch(u8),
    Rest,
    Hold,
    Boundary,
}

impl Token {
    /// True for tokens that start a new event (note or rest)
    pub fn is_onset(&self) -> bool {
        matches!(self, Token::Pitch(_) | Token::Rest)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Pitch(p) => write!(f, "{}", p),
            Token::Rest => f.write_str(REST_SYMBOL),
            Token::Hold => f.write_str(HOLD_SYMBOL),
            Token::Boundary => f.write_str(BOUNDARY_SYMBOL),
        }
    }
}

impl FromStr for Token {
    type Err = SymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            REST_SYMBOL => Ok(Token::Rest),
            HOLD_SYMBOL => Ok(Token::Hold),
            BOUNDARY_SYMBOL => Ok(Token::Boundary),
            // Reject "+60" and "060" so that every pitch has exactly one surface form
            _ if s.starts_with('+') || (s.len() > 1 && s.starts_with('0')) => {
                Err(SymbolError(s.to_string()))
            }
            _ => match s.parse::<u8>() {
                Ok(p) if p <= MAX_PITCH => Ok(Token::Pitch(p)),
                _ => Err(SymbolError(s.to_string())),
            },
        }
    }
}

/// Parse whitespace-separated surface forms, e.g. `"60 _ r _ /"`
pub fn parse_tokens(text: &str) -> Result<Vec<Token>, SymbolError> {
    text.split_whitespace().map(str::parse).collect()
}

/// Render tokens as space-delimited surface forms
pub fn join_tokens(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
