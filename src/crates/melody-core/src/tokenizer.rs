//! Score to grid tokens
//!
//! Each event becomes one onset token followed by `steps - 1` hold tokens,
//! so a quarter note at a sixteenth-note step is `60 _ _ _`.

use log::debug;

use crate::config::Config;
use crate::duration::Duration;
use crate::error::TokenizeError;
use crate::key::Key;
use crate::score::{Event, EventKind, Score};
use crate::token::Token;

/// Converts parsed scores into token sequences using one fixed grid
#[derive(Debug, Clone)]
pub struct Tokenizer {
    time_step: Duration,
    acceptable_durations: Vec<Duration>,
    normalize_key: bool,
}

impl Tokenizer {
    pub fn new(config: &Config) -> Self {
        Tokenizer {
            time_step: config.time_step,
            acceptable_durations: config.acceptable_durations.clone(),
            normalize_key: config.normalize_key,
        }
    }

    pub fn time_step(&self) -> Duration {
        self.time_step
    }

    /// Check every event length before any work is done on the piece
    pub fn check_durations(&self, events: &[Event]) -> Result<(), TokenizeError> {
        for (position, event) in events.iter().enumerate() {
            let acceptable = self.acceptable_durations.contains(&event.duration);
            if !acceptable || event.duration.steps_of(self.time_step).is_none() {
                return Err(TokenizeError::UnsupportedDuration {
                    position,
                    duration: event.duration,
                });
            }
        }
        Ok(())
    }

    /// Transpose the piece to C major / A minor.
    ///
    /// Returns the transposed events and the interval applied.
    pub fn transpose_to_reference(&self, score: &Score) -> Result<(Vec<Event>, i8), TokenizeError> {
        if score.note_count() == 0 {
            return Ok((score.events.clone(), 0));
        }
        let key = Key::resolve(&score.key_hint, &score.events).ok_or(TokenizeError::KeyUndetermined)?;
        let interval = key.normalization_interval();
        debug!("key {} -> transposing by {} semitones", key, interval);

        let events = score
            .events
            .iter()
            .map(|event| {
                event.transposed(interval).ok_or(TokenizeError::PitchOutOfRange {
                    pitch: event.pitch().unwrap_or_default(),
                    interval,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok((events, interval))
    }

    /// Full tokenization: duration check, key normalization, grid encoding
    pub fn tokenize(&self, score: &Score) -> Result<Vec<Token>, TokenizeError> {
        self.check_durations(&score.events)?;

        if self.normalize_key {
            let (events, _) = self.transpose_to_reference(score)?;
            self.encode_events(&events)
        } else {
            self.encode_events(&score.events)
        }
    }

    /// Grid-encode events as they are, without any key handling
    pub fn encode_events(&self, events: &[Event]) -> Result<Vec<Token>, TokenizeError> {
        let mut tokens = Vec::new();
        for (position, event) in events.iter().enumerate() {
            let steps = event
                .duration
                .steps_of(self.time_step)
                .ok_or(TokenizeError::UnsupportedDuration {
                    position,
                    duration: event.duration,
                })?;

            tokens.push(match event.kind {
                EventKind::Note(pitch) => Token::Pitch(pitch),
                EventKind::Rest => Token::Rest,
            });
            tokens.extend(std::iter::repeat(Token::Hold).take(steps - 1));
        }
        Ok(tokens)
    }
}
