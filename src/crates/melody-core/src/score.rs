use serde::{Deserialize, Serialize};

use crate::duration::Duration;
use crate::key::Key;
use crate::token::MAX_PITCH;

/// What sounds during an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// MIDI note number
    Note(u8),
    Rest,
}

/// A single note or rest with its length in quarter notes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub duration: Duration,
}

impl Event {
    pub fn note(pitch: u8, duration: Duration) -> Self {
        Event {
            kind: EventKind::Note(pitch),
            duration,
        }
    }

    pub fn rest(duration: Duration) -> Self {
        Event {
            kind: EventKind::Rest,
            duration,
        }
    }

    pub fn pitch(&self) -> Option<u8> {
        match self.kind {
            EventKind::Note(p) => Some(p),
            EventKind::Rest => None,
        }
    }

    pub fn is_rest(&self) -> bool {
        self.kind == EventKind::Rest
    }

    /// Shift a note by `semitones`; rests are unchanged. `None` if the
    /// result leaves the MIDI range.
    pub fn transposed(&self, semitones: i8) -> Option<Event> {
        match self.kind {
            EventKind::Rest => Some(*self),
            EventKind::Note(p) => {
                let shifted = p as i16 + semitones as i16;
                if (0..=MAX_PITCH as i16).contains(&shifted) {
                    Some(Event::note(shifted as u8, self.duration))
                } else {
                    None
                }
            }
        }
    }
}

/// Key information as notated in the source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum KeyHint {
    /// Tonic and mode spelled out by the source (kern `*G:`, MIDI key signature meta)
    Designated { key: Key },
    /// Only a key signature, counted in fifths (sharps positive, flats negative).
    /// Ambiguous between a major key and its relative minor.
    Signature { fifths: i8 },
    #[default]
    Unknown,
}

/// A parsed monophonic piece, flattened to its notes and rests
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Score {
    pub title: Option<String>,
    pub key_hint: KeyHint,
    pub events: Vec<Event>,
}

impl Score {
    pub fn new(events: Vec<Event>) -> Self {
        Score {
            title: None,
            key_hint: KeyHint::Unknown,
            events,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_key_hint(mut self, key_hint: KeyHint) -> Self {
        self.key_hint = key_hint;
        self
    }

    /// Total length in quarter notes
    pub fn total_duration(&self) -> Duration {
        self.events
            .iter()
            .fold(Duration::from_quarters(0), |acc, e| acc + e.duration)
    }

    pub fn note_count(&self) -> usize {
        self.events.iter().filter(|e| !e.is_rest()).count()
    }
}
