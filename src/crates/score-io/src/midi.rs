use log::debug;
use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind};
use std::path::Path;

use melody_core::{Duration, DurationError, Event, Key, KeyHint, Mode, Score};

/// Resolution of written files
pub const TICKS_PER_QUARTER: u16 = 480;

const MAX_DELTA: u32 = 0x0FFF_FFFF;
const VELOCITY: u8 = 80;

#[derive(Debug, thiserror::Error)]
pub enum MidiError {
    #[error("invalid MIDI data: {0}")]
    Parse(#[from] midly::Error),

    #[error("timecode-based MIDI timing is not supported")]
    UnsupportedTiming,

    #[error(transparent)]
    Duration(#[from] DurationError),

    #[error("duration {0} does not fall on a MIDI tick")]
    OffGrid(Duration),

    #[error("gap of {0} ticks is too long for one MIDI delta")]
    DeltaOverflow(u32),

    #[error("pitch {0} is outside the MIDI range")]
    PitchOutOfRange(u8),

    #[error("invalid tempo {0} bpm")]
    InvalidTempo(f64),

    #[error("failed to encode MIDI: {0}")]
    Io(#[from] std::io::Error),
}

/// Parse a standard MIDI file into a monophonic score.
///
/// Notes come from the first track that has any; overlapping notes are cut
/// at the next onset and silences become rests.
pub fn parse_midi(data: &[u8]) -> Result<Score, MidiError> {
    let smf = Smf::parse(data)?;
    let ticks_per_quarter = match smf.header.timing {
        Timing::Metrical(tpq) => tpq.as_int(),
        Timing::Timecode(..) => return Err(MidiError::UnsupportedTiming),
    };

    let mut title = None;
    let mut key_hint = KeyHint::Unknown;
    for track in &smf.tracks {
        for event in track {
            match event.kind {
                TrackEventKind::Meta(MetaMessage::TrackName(name)) if title.is_none() => {
                    if let Ok(name) = std::str::from_utf8(name) {
                        let cleaned = name.trim_end_matches('\0').trim();
                        if !cleaned.is_empty() {
                            title = Some(cleaned.to_string());
                        }
                    }
                }
                TrackEventKind::Meta(MetaMessage::KeySignature(fifths, minor))
                    if key_hint == KeyHint::Unknown =>
                {
                    let mode = if minor { Mode::Minor } else { Mode::Major };
                    key_hint = KeyHint::Designated {
                        key: Key::from_fifths(fifths, mode),
                    };
                }
                _ => {}
            }
        }
    }

    let melody_track = smf.tracks.iter().position(|track| {
        track.iter().any(|e| {
            matches!(
                e.kind,
                TrackEventKind::Midi { message: MidiMessage::NoteOn { vel, .. }, .. } if vel.as_int() > 0
            )
        })
    });

    let events = match melody_track {
        Some(index) => {
            debug!("reading notes from track {}", index);
            collect_events(&smf.tracks[index], ticks_per_quarter)?
        }
        None => Vec::new(),
    };

    Ok(Score {
        title,
        key_hint,
        events,
    })
}

/// Read and parse a MIDI file from disk
pub fn read_midi(path: &Path) -> Result<Score, crate::Error> {
    let data = std::fs::read(path).map_err(|source| crate::Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(parse_midi(&data)?)
}

struct MonoReducer {
    ticks_per_quarter: u16,
    cursor: u32,
    sounding: Option<(u8, u32)>,
    events: Vec<Event>,
}

impl MonoReducer {
    fn push(&mut self, pitch: Option<u8>, start: u32, end: u32) -> Result<(), MidiError> {
        if end <= start {
            return Ok(());
        }
        let duration = Duration::from_ticks(end - start, self.ticks_per_quarter)?;
        self.events.push(match pitch {
            Some(pitch) => Event::note(pitch, duration),
            None => Event::rest(duration),
        });
        self.cursor = end;
        Ok(())
    }

    fn release(&mut self, at: u32) -> Result<(), MidiError> {
        if let Some((pitch, start)) = self.sounding.take() {
            self.push(Some(pitch), start, at)?;
            self.cursor = self.cursor.max(at);
        }
        Ok(())
    }

    fn onset(&mut self, pitch: u8, at: u32) -> Result<(), MidiError> {
        self.release(at)?;
        self.push(None, self.cursor, at)?;
        self.sounding = Some((pitch, at));
        Ok(())
    }
}

fn collect_events(track: &[TrackEvent], ticks_per_quarter: u16) -> Result<Vec<Event>, MidiError> {
    let mut reducer = MonoReducer {
        ticks_per_quarter,
        cursor: 0,
        sounding: None,
        events: Vec::new(),
    };
    let mut now: u32 = 0;

    for event in track {
        now = now.saturating_add(event.delta.as_int());
        let TrackEventKind::Midi { message, .. } = event.kind else {
            continue;
        };
        match message {
            MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                reducer.onset(key.as_int(), now)?;
            }
            MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                if reducer.sounding.map(|(p, _)| p) == Some(key.as_int()) {
                    reducer.release(now)?;
                }
            }
            _ => {}
        }
    }

    // A note still held at the end of the track lasts until the end
    reducer.release(now)?;
    reducer.push(None, reducer.cursor, now)?;
    Ok(reducer.events)
}

/// Encode events as a single-track SMF
pub fn to_midi_bytes(events: &[Event], title: Option<&str>, tempo_bpm: f64) -> Result<Vec<u8>, MidiError> {
    if !tempo_bpm.is_finite() || tempo_bpm <= 0.0 {
        return Err(MidiError::InvalidTempo(tempo_bpm));
    }
    let tempo_microseconds = (60_000_000.0 / tempo_bpm).round();
    if !(1.0..=16_777_215.0).contains(&tempo_microseconds) {
        return Err(MidiError::InvalidTempo(tempo_bpm));
    }

    let mut track: Track = Vec::new();
    if let Some(title) = title {
        track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::TrackName(title.as_bytes())),
        });
    }
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo_microseconds as u32))),
    });

    let channel = u4::new(0);
    let mut pending: u32 = 0;
    for event in events {
        let ticks = event
            .duration
            .to_ticks(TICKS_PER_QUARTER as u32)
            .ok_or(MidiError::OffGrid(event.duration))?;
        match event.pitch() {
            None => pending = pending.saturating_add(ticks),
            Some(pitch) => {
                if pitch > 127 {
                    return Err(MidiError::PitchOutOfRange(pitch));
                }
                let key = u7::new(pitch);
                track.push(TrackEvent {
                    delta: delta(pending)?,
                    kind: TrackEventKind::Midi {
                        channel,
                        message: MidiMessage::NoteOn { key, vel: u7::new(VELOCITY) },
                    },
                });
                track.push(TrackEvent {
                    delta: delta(ticks)?,
                    kind: TrackEventKind::Midi {
                        channel,
                        message: MidiMessage::NoteOff { key, vel: u7::new(0) },
                    },
                });
                pending = 0;
            }
        }
    }
    track.push(TrackEvent {
        delta: delta(pending)?,
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));
    smf.tracks.push(track);

    let mut buf = Vec::new();
    smf.write_std(&mut buf)?;
    Ok(buf)
}

/// Write events to a MIDI file
pub fn write_midi(events: &[Event], title: Option<&str>, tempo_bpm: f64, path: &Path) -> Result<(), crate::Error> {
    let bytes = to_midi_bytes(events, title, tempo_bpm)?;
    std::fs::write(path, bytes).map_err(|source| crate::Error::Io {
        path: path.display().to_string(),
        source,
    })
}

fn delta(ticks: u32) -> Result<u28, MidiError> {
    if ticks > MAX_DELTA {
        return Err(MidiError::DeltaOverflow(ticks));
    }
    Ok(u28::new(ticks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(n: u32, m: u32) -> Duration {
        Duration::new(n, m).unwrap()
    }

    #[test]
    fn test_write_then_parse() {
        let events = vec![
            Event::rest(d(1, 2)),
            Event::note(60, d(1, 1)),
            Event::note(62, d(1, 2)),
            Event::rest(d(1, 4)),
            Event::note(64, d(3, 2)),
            Event::rest(d(1, 1)),
        ];
        let bytes = to_midi_bytes(&events, Some("Tune"), 120.0).unwrap();
        let score = parse_midi(&bytes).unwrap();
        assert_eq!(score.title.as_deref(), Some("Tune"));
        assert_eq!(score.key_hint, KeyHint::Unknown);
        assert_eq!(score.events, events);
    }

    #[test]
    fn test_overlapping_notes_are_cut() {
        let track: Vec<TrackEvent> = vec![
            TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Midi {
                    channel: u4::new(0),
                    message: MidiMessage::NoteOn { key: u7::new(60), vel: u7::new(90) },
                },
            },
            TrackEvent {
                delta: u28::new(240),
                kind: TrackEventKind::Midi {
                    channel: u4::new(0),
                    message: MidiMessage::NoteOn { key: u7::new(64), vel: u7::new(90) },
                },
            },
            TrackEvent {
                delta: u28::new(240),
                kind: TrackEventKind::Midi {
                    channel: u4::new(0),
                    message: MidiMessage::NoteOff { key: u7::new(60), vel: u7::new(0) },
                },
            },
            TrackEvent {
                delta: u28::new(240),
                kind: TrackEventKind::Midi {
                    channel: u4::new(0),
                    message: MidiMessage::NoteOn { key: u7::new(64), vel: u7::new(0) },
                },
            },
        ];
        let events = collect_events(&track, 480).unwrap();
        assert_eq!(events, vec![Event::note(60, d(1, 2)), Event::note(64, d(1, 1))]);
    }

    #[test]
    fn test_key_signature_meta() {
        let mut smf = Smf::new(Header::new(Format::SingleTrack, Timing::Metrical(u15::new(96))));
        smf.tracks.push(vec![
            TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Meta(MetaMessage::KeySignature(-3, true)),
            },
            TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
            },
        ]);
        let mut bytes = Vec::new();
        smf.write_std(&mut bytes).unwrap();
        let score = parse_midi(&bytes).unwrap();
        assert_eq!(score.key_hint, KeyHint::Designated { key: Key::minor(0) });
        assert!(score.events.is_empty());
    }

    #[test]
    fn test_off_grid_duration() {
        let events = vec![Event::note(60, d(1, 7))];
        assert!(matches!(to_midi_bytes(&events, None, 120.0), Err(MidiError::OffGrid(_))));
        assert!(matches!(to_midi_bytes(&[], None, 0.0), Err(MidiError::InvalidTempo(_))));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(matches!(parse_midi(b"not a midi file"), Err(MidiError::Parse(_))));
    }

    /// Adjacent rests come back from a file as one silence
    fn merge_rests(events: &[Event]) -> Vec<Event> {
        let mut merged: Vec<Event> = Vec::new();
        for event in events {
            match merged.last_mut() {
                Some(last) if last.is_rest() && event.is_rest() => {
                    let total = last.duration.quarters() + event.duration.quarters();
                    let ticks = (total * TICKS_PER_QUARTER as f64).round() as u32;
                    *last = Event::rest(Duration::from_ticks(ticks, TICKS_PER_QUARTER).unwrap());
                }
                _ => merged.push(event.clone()),
            }
        }
        merged
    }

    fn melody_event() -> impl Strategy<Value = Event> {
        let duration = prop::sample::select(melody_core::Config::default().acceptable_durations);
        (prop::option::weighted(0.8, 21u8..109), duration).prop_map(|(pitch, duration)| match pitch {
            Some(pitch) => Event::note(pitch, duration),
            None => Event::rest(duration),
        })
    }

    proptest! {
        #[test]
        fn prop_written_midi_reads_back(events in prop::collection::vec(melody_event(), 0..24)) {
            let bytes = to_midi_bytes(&events, None, 96.0).unwrap();
            let score = parse_midi(&bytes).unwrap();
            // Without any note there is no melody track to read
            let expected = if events.iter().all(|e| e.is_rest()) {
                Vec::new()
            } else {
                merge_rests(&events)
            };
            prop_assert_eq!(score.events, expected);
        }
    }
}
