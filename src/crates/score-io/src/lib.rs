//! Score file input and output for the melody generator
//!
//! Reads monophonic melodies from Humdrum `**kern` and standard MIDI files
//! into [`melody_core::Score`], and writes generated events back out as
//! either format.

pub mod kern;
pub mod midi;
pub mod note;

use std::path::Path;

use melody_core::Event;

pub use kern::{parse_kern, to_kern, KernError};
pub use midi::{parse_midi, read_midi, to_midi_bytes, write_midi, MidiError};
pub use note::{kern_pitch, pitch_name};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Kern(#[from] KernError),

    #[error(transparent)]
    Midi(#[from] MidiError),

    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported score format: {0}")]
    UnsupportedFormat(String),
}

/// Input formats recognized by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreFormat {
    Kern,
    Midi,
}

impl ScoreFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "krn" | "kern" => Some(ScoreFormat::Kern),
            "mid" | "midi" => Some(ScoreFormat::Midi),
            _ => None,
        }
    }
}

/// True for files [`load_score`] knows how to read
pub fn is_score_file(path: &Path) -> bool {
    ScoreFormat::from_path(path).is_some()
}

/// Load a score, choosing the parser from the file extension
pub fn load_score(path: &Path) -> Result<melody_core::Score, Error> {
    let format = ScoreFormat::from_path(path)
        .ok_or_else(|| Error::UnsupportedFormat(path.display().to_string()))?;
    match format {
        ScoreFormat::Kern => {
            let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
                path: path.display().to_string(),
                source,
            })?;
            Ok(parse_kern(&text)?)
        }
        ScoreFormat::Midi => read_midi(path),
    }
}

/// Formats a generated melody can be saved as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Midi,
    Kern,
}

impl OutputFormat {
    /// Pick the format from an output path, MIDI unless it ends in `.krn`
    pub fn from_path(path: &Path) -> Self {
        match ScoreFormat::from_path(path) {
            Some(ScoreFormat::Kern) => OutputFormat::Kern,
            _ => OutputFormat::Midi,
        }
    }
}

/// Save a melody in the given format
pub fn write_melody(
    events: &[Event],
    title: Option<&str>,
    format: OutputFormat,
    tempo_bpm: f64,
    path: &Path,
) -> Result<(), Error> {
    match format {
        OutputFormat::Midi => write_midi(events, title, tempo_bpm, path),
        OutputFormat::Kern => {
            let text = to_kern(events, title)?;
            std::fs::write(path, text).map_err(|source| Error::Io {
                path: path.display().to_string(),
                source,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use melody_core::Duration;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("score_io_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(ScoreFormat::from_path(Path::new("a/b.krn")), Some(ScoreFormat::Kern));
        assert_eq!(ScoreFormat::from_path(Path::new("tune.MID")), Some(ScoreFormat::Midi));
        assert_eq!(ScoreFormat::from_path(Path::new("notes.txt")), None);
        assert!(!is_score_file(Path::new("README")));
        assert_eq!(OutputFormat::from_path(Path::new("out.krn")), OutputFormat::Kern);
        assert_eq!(OutputFormat::from_path(Path::new("out")), OutputFormat::Midi);
    }

    #[test]
    fn test_unsupported_format() {
        assert!(matches!(
            load_score(Path::new("melody.abc")),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = load_score(Path::new("/nonexistent/dir/tune.krn")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/dir/tune.krn"));
    }

    #[test]
    fn test_write_and_load_both_formats() {
        let events = vec![
            Event::note(60, Duration::QUARTER),
            Event::rest(Duration::SIXTEENTH),
            Event::note(67, Duration::from_quarters(2)),
        ];
        for (name, format) in [("out.mid", OutputFormat::Midi), ("out.krn", OutputFormat::Kern)] {
            let path = temp_path(name);
            write_melody(&events, Some("Generated"), format, 100.0, &path).unwrap();
            let score = load_score(&path).unwrap();
            assert_eq!(score.events, events);
            assert_eq!(score.title.as_deref(), Some("Generated"));
            std::fs::remove_file(&path).unwrap();
        }
    }
}
