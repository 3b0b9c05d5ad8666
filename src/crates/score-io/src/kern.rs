//! Humdrum `**kern` reading and writing
//!
//! Only the first `**kern` spine is read, and chords collapse to their first
//! note, which is all a monophonic melody needs. Ties stay as separate events.

use log::debug;

use melody_core::{Duration, Event, Key, KeyHint, Mode, Score};

use crate::note::{kern_pitch, kern_to_midi};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KernError {
    #[error("no **kern spine found")]
    NoKernSpine,

    #[error("line {line}: '{token}' has no duration")]
    MissingDuration { line: usize, token: String },

    #[error("line {line}: cannot parse '{token}'")]
    InvalidToken { line: usize, token: String },

    #[error("line {line}: pitch '{token}' is outside the MIDI range")]
    PitchOutOfRange { line: usize, token: String },

    #[error("duration {0} cannot be written as kern note values")]
    Unrepresentable(Duration),
}

/// Parse the first `**kern` spine of a Humdrum file into a score
pub fn parse_kern(text: &str) -> Result<Score, KernError> {
    let mut title = None;
    let mut column = None;
    let mut designated = None;
    let mut fifths = None;
    let mut events = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;

        if let Some(rest) = line.strip_prefix("!!!OTL:") {
            let name = rest.trim();
            if !name.is_empty() && title.is_none() {
                title = Some(name.to_string());
            }
            continue;
        }
        if line.is_empty() || line.starts_with('!') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        let Some(col) = column else {
            if line.starts_with("**") {
                column = fields.iter().position(|f| *f == "**kern");
                if column.is_none() {
                    return Err(KernError::NoKernSpine);
                }
            }
            continue;
        };

        let Some(field) = fields.get(col).copied() else {
            debug!("line {}: spine {} missing, skipping", line_no, col);
            continue;
        };

        if field.starts_with('*') {
            if field == "*-" {
                break;
            }
            if let Some(key) = parse_key_designation(field) {
                designated.get_or_insert(key);
            } else if let Some(sig) = parse_key_signature(field) {
                fifths.get_or_insert(sig);
            }
            continue;
        }
        if field.starts_with('=') || field.starts_with('!') || field == "." {
            continue;
        }

        let first = field.split(' ').next().unwrap_or(field);
        if let Some(event) = parse_note(first, line_no)? {
            events.push(event);
        }
    }

    if column.is_none() {
        return Err(KernError::NoKernSpine);
    }

    let key_hint = match (designated, fifths) {
        (Some(key), _) => KeyHint::Designated { key },
        (None, Some(fifths)) => KeyHint::Signature { fifths },
        (None, None) => KeyHint::Unknown,
    };

    Ok(Score {
        title,
        key_hint,
        events,
    })
}

/// One note or rest token; `None` for grace notes
fn parse_note(token: &str, line: usize) -> Result<Option<Event>, KernError> {
    if token.contains(['q', 'Q']) {
        return Ok(None);
    }
    let invalid = || KernError::InvalidToken {
        line,
        token: token.to_string(),
    };

    let duration = parse_recip(token).ok_or_else(|| KernError::MissingDuration {
        line,
        token: token.to_string(),
    })?;

    let start = token.find(|c: char| matches!(c, 'a'..='g' | 'A'..='G'));
    match start {
        Some(start) => {
            let first = token[start..].chars().next().ok_or_else(invalid)?;
            let len = token[start..]
                .chars()
                .take_while(|c| c.eq_ignore_ascii_case(&first))
                .count();
            let letters = &token[start..start + len];
            let alteration = token.matches('#').count() as i32 - token.matches('-').count() as i32;
            let pitch = kern_to_midi(letters, alteration).ok_or_else(|| KernError::PitchOutOfRange {
                line,
                token: token.to_string(),
            })?;
            Ok(Some(Event::note(pitch, duration)))
        }
        None if token.contains('r') => Ok(Some(Event::rest(duration))),
        None => Err(invalid()),
    }
}

/// Reciprocal duration with augmentation dots: `4` is a quarter, `8.` a
/// dotted eighth, `0` a breve and `00` a longa
fn parse_recip(token: &str) -> Option<Duration> {
    let start = token.find(|c: char| c.is_ascii_digit())?;
    let digits: String = token[start..].chars().take_while(|c| c.is_ascii_digit()).collect();
    let dots = token[start + digits.len()..]
        .chars()
        .take_while(|&c| c == '.')
        .count() as u32;

    let base = match digits.as_str() {
        "0" => Duration::from_quarters(8),
        "00" => Duration::from_quarters(16),
        "000" => Duration::from_quarters(32),
        _ => {
            let recip: u32 = digits.parse().ok()?;
            Duration::new(4, recip).ok()?
        }
    };
    if dots == 0 {
        return Some(base);
    }
    if dots > 8 {
        return None;
    }
    let scale = Duration::new((1 << (dots + 1)) - 1, 1 << dots).ok()?;
    Duration::new(
        base.numerator().checked_mul(scale.numerator())?,
        base.denominator().checked_mul(scale.denominator())?,
    )
    .ok()
}

/// `*G:`, `*e-:` or `*f#:dor` (modal suffix ignored)
fn parse_key_designation(field: &str) -> Option<Key> {
    let (name, _) = field.strip_prefix('*')?.split_once(':')?;
    let mut chars = name.chars();
    let letter = chars.next()?;
    let pc: i32 = match letter.to_ascii_lowercase() {
        'c' => 0,
        'd' => 2,
        'e' => 4,
        'f' => 5,
        'g' => 7,
        'a' => 9,
        'b' => 11,
        _ => return None,
    };
    let mut alteration = 0;
    for c in chars {
        match c {
            '#' => alteration += 1,
            '-' => alteration -= 1,
            _ => return None,
        }
    }
    let tonic = (pc + alteration).rem_euclid(12) as u8;
    let mode = if letter.is_ascii_uppercase() {
        Mode::Major
    } else {
        Mode::Minor
    };
    Some(Key::new(tonic, mode))
}

/// `*k[f#c#]` counts two sharps, `*k[b-e-]` two flats
fn parse_key_signature(field: &str) -> Option<i8> {
    let inner = field.strip_prefix("*k[")?.strip_suffix(']')?;
    Some(inner.matches('#').count() as i8 - inner.matches('-').count() as i8)
}

/// Render events as a single `**kern` spine
pub fn to_kern(events: &[Event], title: Option<&str>) -> Result<String, KernError> {
    let mut out = String::new();
    if let Some(title) = title {
        out.push_str(&format!("!!!OTL: {}\n", title));
    }
    out.push_str("**kern\n");

    for event in events {
        let parts = split_duration(event.duration)?;
        let tied = parts.len() > 1 && !event.is_rest();
        for (i, recip) in parts.iter().enumerate() {
            let body = match event.pitch() {
                Some(pitch) => format!("{}{}", recip, kern_pitch(pitch)),
                None => format!("{}r", recip),
            };
            let line = if !tied {
                body
            } else if i == 0 {
                format!("[{}", body)
            } else if i + 1 == parts.len() {
                format!("{}]", body)
            } else {
                format!("{}_", body)
            };
            out.push_str(&line);
            out.push('\n');
        }
    }

    out.push_str("*-\n");
    Ok(out)
}

/// Recip string for a duration that is one plain or dotted note value
fn recip_for(duration: Duration) -> Option<String> {
    if duration.is_zero() {
        return None;
    }
    for dots in 0..=2u32 {
        let scale = Duration::new(1 << dots, (1 << (dots + 1)) - 1).ok()?;
        let base = Duration::new(
            duration.numerator().checked_mul(scale.numerator())?,
            duration.denominator().checked_mul(scale.denominator())?,
        )
        .ok()?;
        let recip = match (base.numerator(), base.denominator()) {
            (8, 1) => Some("0".to_string()),
            (16, 1) => Some("00".to_string()),
            (n, d) if (4 * d) % n == 0 => Some((4 * d / n).to_string()),
            _ => None,
        };
        if let Some(recip) = recip {
            return Some(format!("{}{}", recip, ".".repeat(dots as usize)));
        }
    }
    None
}

/// Break a duration into note values that can be tied together
fn split_duration(duration: Duration) -> Result<Vec<String>, KernError> {
    if duration.is_zero() {
        return Err(KernError::Unrepresentable(duration));
    }
    if let Some(recip) = recip_for(duration) {
        return Ok(vec![recip]);
    }

    let values: Vec<Duration> = [(16, 1), (8, 1), (4, 1), (2, 1), (1, 1), (1, 2), (1, 4), (1, 8), (1, 16), (1, 32)]
        .iter()
        .filter_map(|&(n, d)| Duration::new(n, d).ok())
        .collect();

    let mut parts = Vec::new();
    let mut remaining = duration;
    while !remaining.is_zero() {
        if let Some(recip) = recip_for(remaining) {
            parts.push(recip);
            break;
        }
        let next = values
            .iter()
            .find_map(|&v| remaining.checked_sub(v).filter(|r| !r.is_zero()).map(|r| (v, r)));
        match next {
            Some((value, rest)) if parts.len() < 32 => {
                parts.push(recip_for(value).ok_or(KernError::Unrepresentable(duration))?);
                remaining = rest;
            }
            _ => return Err(KernError::Unrepresentable(duration)),
        }
    }
    Ok(parts)
}
