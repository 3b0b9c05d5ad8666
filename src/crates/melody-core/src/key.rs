//! Key detection and the transposition that normalizes it
//!
//! Pieces are moved to C major or A minor before tokenization so the model
//! does not have to learn every melody in twelve keys. The notated key is
//! used when the source spells it out; otherwise it is estimated with the
//! Krumhansl-Schmuckler algorithm: correlate a duration-weighted pitch-class
//! histogram against the 24 rotated Krumhansl-Kessler key profiles and pick
//! the best match.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::score::{Event, KeyHint};

/// Pitch-class names used for display
pub const PITCH_CLASS_NAMES: [&str; 12] = [
    "C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B",
];

const MAJOR_PROFILE: [f64; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];

const MINOR_PROFILE: [f64; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Major,
    Minor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key {
    /// Pitch class of the tonic, 0 = C
    pub tonic: u8,
    pub mode: Mode,
}

impl Key {
    pub fn new(tonic: u8, mode: Mode) -> Self {
        Key {
            tonic: tonic % 12,
            mode,
        }
    }

    pub fn major(tonic: u8) -> Self {
        Self::new(tonic, Mode::Major)
    }

    pub fn minor(tonic: u8) -> Self {
        Self::new(tonic, Mode::Minor)
    }

    /// Key from a signature counted in fifths (2 = D major / B minor)
    pub fn from_fifths(fifths: i8, mode: Mode) -> Self {
        let major_tonic = (fifths as i32 * 7).rem_euclid(12) as u8;
        match mode {
            Mode::Major => Key::major(major_tonic),
            Mode::Minor => Key::minor(major_tonic + 9),
        }
    }

    /// Relative major of a minor key and vice versa
    pub fn relative(&self) -> Key {
        match self.mode {
            Mode::Major => Key::minor(self.tonic + 9),
            Mode::Minor => Key::major(self.tonic + 3),
        }
    }

    /// Semitones that move this key's tonic onto C (major) or A (minor).
    ///
    /// Tonic and target are taken in the same octave, so the result lies in
    /// `-11..=11`: G major moves down a fifth (-7), C minor moves up to A (+9).
    pub fn normalization_interval(&self) -> i8 {
        let target: i8 = match self.mode {
            Mode::Major => 0,
            Mode::Minor => 9,
        };
        target - self.tonic as i8
    }

    /// Pearson correlation of this key's profile with a pitch-class histogram
    pub fn correlation(&self, histogram: &[f64; 12]) -> f64 {
        let profile = match self.mode {
            Mode::Major => &MAJOR_PROFILE,
            Mode::Minor => &MINOR_PROFILE,
        };
        let rotated: Vec<f64> = (0..12)
            .map(|pc| profile[(pc + 12 - self.tonic as usize) % 12])
            .collect();
        pearson(&rotated, histogram)
    }

    /// Best-matching key among all 24 candidates
    pub fn estimate(events: &[Event]) -> Option<Key> {
        let candidates: Vec<Key> = (0..12)
            .flat_map(|tonic| [Key::major(tonic), Key::minor(tonic)])
            .collect();
        Self::estimate_among(events, &candidates)
    }

    /// Best-matching key among `candidates`, first wins on ties.
    ///
    /// `None` when the events carry no pitch information to judge by.
    pub fn estimate_among(events: &[Event], candidates: &[Key]) -> Option<Key> {
        let histogram = pitch_class_histogram(events)?;
        let mut best: Option<(Key, f64)> = None;
        for key in candidates {
            let r = key.correlation(&histogram);
            if !r.is_finite() {
                continue;
            }
            if best.map_or(true, |(_, score)| r > score) {
                best = Some((*key, r));
            }
        }
        best.map(|(key, _)| key)
    }

    /// Settle on a key for the piece from whatever the source notated.
    ///
    /// A designated key is trusted as is. A bare key signature only narrows
    /// the choice to a major key and its relative minor, and estimation picks
    /// between the two. With no key information at all the full estimate is
    /// used.
    pub fn resolve(hint: &KeyHint, events: &[Event]) -> Option<Key> {
        match *hint {
            KeyHint::Designated { key } => Some(key),
            KeyHint::Signature { fifths } => {
                let major = Key::from_fifths(fifths, Mode::Major);
                Self::estimate_among(events, &[major, major.relative()])
            }
            KeyHint::Unknown => Self::estimate(events),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            Mode::Major => "major",
            Mode::Minor => "minor",
        };
        write!(f, "{} {}", PITCH_CLASS_NAMES[self.tonic as usize % 12], mode)
    }
}

/// Total sounding length per pitch class, in quarter notes.
///
/// `None` if there are no notes or the histogram is flat.
pub fn pitch_class_histogram(events: &[Event]) -> Option<[f64; 12]> {
    let mut histogram = [0.0; 12];
    for event in events {
        if let Some(pitch) = event.pitch() {
            histogram[(pitch % 12) as usize] += event.duration.quarters();
        }
    }
    let first = histogram[0];
    if histogram.iter().all(|&v| v == first) {
        return None;
    }
    Some(histogram)
}

fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    cov / (var_x * var_y).sqrt()
}
