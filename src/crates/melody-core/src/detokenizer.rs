//! Grid tokens back to notes and rests
//!
//! A two-state machine: before the first onset nothing is pending; after it,
//! the current onset and the number of holds seen since are accumulated until
//! the next onset or the end of input flushes them as one event.

use log::debug;

use crate::duration::Duration;
use crate::error::DecodeError;
use crate::score::Event;
use crate::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    AwaitingFirstEvent,
    Accumulating { symbol: Token, holds: usize },
}

#[derive(Debug, Clone)]
pub struct Detokenizer {
    step: Duration,
    state: DecodeState,
    position: usize,
    dropped_holds: usize,
}

impl Detokenizer {
    pub fn new(step: Duration) -> Self {
        Detokenizer {
            step,
            state: DecodeState::AwaitingFirstEvent,
            position: 0,
            dropped_holds: 0,
        }
    }

    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// Holds seen before any onset; they have nothing to extend
    pub fn dropped_holds(&self) -> usize {
        self.dropped_holds
    }

    /// Feed one token; returns the event completed by it, if any
    pub fn feed(&mut self, token: Token) -> Result<Option<Event>, DecodeError> {
        let position = self.position;
        self.position += 1;

        match (token, self.state) {
            (Token::Boundary, _) => Err(DecodeError::UnexpectedBoundary(position)),
            (Token::Hold, DecodeState::AwaitingFirstEvent) => {
                self.dropped_holds += 1;
                Ok(None)
            }
            (Token::Hold, DecodeState::Accumulating { symbol, holds }) => {
                self.state = DecodeState::Accumulating {
                    symbol,
                    holds: holds + 1,
                };
                Ok(None)
            }
            (onset, previous) => {
                self.state = DecodeState::Accumulating {
                    symbol: onset,
                    holds: 0,
                };
                Ok(self.event_for(previous))
            }
        }
    }

    /// End of input: flush whatever is pending and reset
    pub fn finish(&mut self) -> Option<Event> {
        let pending = self.event_for(self.state);
        self.state = DecodeState::AwaitingFirstEvent;
        self.position = 0;
        pending
    }

    fn event_for(&self, state: DecodeState) -> Option<Event> {
        match state {
            DecodeState::AwaitingFirstEvent => None,
            DecodeState::Accumulating { symbol, holds } => {
                let duration = self.step * (holds + 1);
                match symbol {
                    Token::Pitch(p) => Some(Event::note(p, duration)),
                    Token::Rest => Some(Event::rest(duration)),
                    Token::Hold | Token::Boundary => None,
                }
            }
        }
    }
}

/// Decode a whole melody at the given step length
pub fn detokenize(tokens: &[Token], step: Duration) -> Result<Vec<Event>, DecodeError> {
    let mut detokenizer = Detokenizer::new(step);
    let mut events = Vec::new();
    for &token in tokens {
        if let Some(event) = detokenizer.feed(token)? {
            events.push(event);
        }
    }
    events.extend(detokenizer.finish());
    if detokenizer.dropped_holds() > 0 {
        debug!("dropped {} leading hold tokens", detokenizer.dropped_holds());
    }
    Ok(events)
}
