// Generation stage: seed symbols -> sampled melody -> rendered score file

use anyhow::{Context, Result};
use log::{info, warn};
use std::path::Path;

use melody_core::{detokenize, Duration, Event, Generation, Predictor, Sampler, Token, Vocabulary};
use score_io::{write_melody, OutputFormat};

use crate::model::WindowModel;
use crate::settings::Settings;

/// Sampling parameters for one melody
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOptions {
    pub temperature: f64,
    pub step_budget: usize,
    /// `None` draws a fresh seed from the OS
    pub rng_seed: Option<u64>,
}

/// A vocabulary and a predictor trained against it
pub struct MelodyGenerator<P = WindowModel> {
    vocab: Vocabulary,
    predictor: P,
    time_step: Duration,
}

impl MelodyGenerator<WindowModel> {
    /// Load the vocabulary and trained model named in `settings`
    pub fn load(settings: &Settings) -> Result<Self> {
        let paths = &settings.paths;
        let vocab = Vocabulary::load(&paths.vocabulary_file).context("Failed to load vocabulary")?;
        let model = WindowModel::load(&paths.model_file, vocab.len()).context("Failed to load model")?;
        if model.time_step() != settings.config.time_step {
            anyhow::bail!(
                "Model {} was trained with a time step of {}, configured time step is {}",
                paths.model_file.display(),
                model.time_step(),
                settings.config.time_step
            );
        }
        if model.window_len() != settings.config.window_len {
            warn!(
                "Model was trained with a window of {}, configured window is {}; using the model's",
                model.window_len(),
                settings.config.window_len
            );
        }
        Ok(Self::new(vocab, model, settings.config.time_step))
    }
}

impl<P: Predictor> MelodyGenerator<P> {
    pub fn new(vocab: Vocabulary, predictor: P, time_step: Duration) -> Self {
        MelodyGenerator {
            vocab,
            predictor,
            time_step,
        }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Continue `seed`; the returned melody starts with the seed symbols
    pub fn generate(&self, seed: &[Token], options: &GenerateOptions) -> Result<Generation> {
        let mut sampler = match options.rng_seed {
            Some(rng_seed) => Sampler::seeded(rng_seed, options.temperature)?,
            None => Sampler::from_entropy(options.temperature)?,
        };
        let generation = sampler
            .generate(&self.predictor, &self.vocab, seed, options.step_budget)
            .context("Generation failed")?;
        info!(
            "Generated {} symbols in {} steps ({:?})",
            generation.melody.len(),
            generation.steps,
            generation.stop
        );
        Ok(generation)
    }

    /// Timed notes and rests for a generated melody
    pub fn to_events(&self, melody: &[Token]) -> Result<Vec<Event>> {
        Ok(detokenize(melody, self.time_step)?)
    }
}

/// Write events to `path`, MIDI or kern
pub fn save_melody(events: &[Event], path: &Path, format: OutputFormat, tempo_bpm: f64) -> Result<()> {
    write_melody(events, Some("Generated melody"), format, tempo_bpm, path)
        .with_context(|| format!("Failed to write melody to {}", path.display()))?;
    info!("Melody saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use melody_core::{join_tokens, parse_tokens, OneHotWindow, StopReason};

    /// Puts almost all mass on the id after the last one in the window
    struct Cycle {
        window_len: usize,
        vocab_size: usize,
    }

    impl Predictor for Cycle {
        fn window_len(&self) -> usize {
            self.window_len
        }

        fn vocab_size(&self) -> usize {
            self.vocab_size
        }

        fn predict(&self, window: &OneHotWindow) -> Vec<f64> {
            let last = window.hot_indices().last().copied().unwrap_or(0);
            let next = (last + 1) % self.vocab_size;
            let rest = 0.03 / (self.vocab_size - 1) as f64;
            (0..self.vocab_size).map(|i| if i == next { 0.97 } else { rest }).collect()
        }
    }

    fn generator() -> MelodyGenerator<Cycle> {
        let vocab = Vocabulary::build(&parse_tokens("/ 60 _ 62").unwrap());
        MelodyGenerator::new(vocab, Cycle { window_len: 4, vocab_size: 4 }, Duration::SIXTEENTH)
    }

    fn options() -> GenerateOptions {
        GenerateOptions {
            temperature: 0.01,
            step_budget: 10,
            rng_seed: Some(42),
        }
    }

    #[test]
    fn test_generate_stops_at_boundary() {
        let generator = generator();
        let seed = parse_tokens("60").unwrap();
        let generation = generator.generate(&seed, &options()).unwrap();
        assert_eq!(join_tokens(&generation.melody), "60 _ 62");
        assert_eq!(generation.stop, StopReason::Boundary);

        let events = generator.to_events(&generation.melody).unwrap();
        assert_eq!(
            events,
            vec![
                Event::note(60, Duration::new(1, 2).unwrap()),
                Event::note(62, Duration::SIXTEENTH),
            ]
        );
    }

    #[test]
    fn test_unknown_seed_symbol_is_fatal() {
        let seed = parse_tokens("61").unwrap();
        assert!(generator().generate(&seed, &options()).is_err());
    }

    #[test]
    fn test_load_rejects_a_different_time_step() {
        let root = std::env::temp_dir().join(format!("melodygen_generate_step_{}", std::process::id()));
        std::fs::create_dir_all(&root).unwrap();
        let mut settings = Settings::default();
        settings.paths.vocabulary_file = root.join("vocabulary.json");
        settings.paths.model_file = root.join("model.json");

        let vocab = Vocabulary::build(&parse_tokens("/ 60 _").unwrap());
        vocab.save(&settings.paths.vocabulary_file).unwrap();
        WindowModel::new(2, vocab.len(), Duration::SIXTEENTH)
            .save(&settings.paths.model_file)
            .unwrap();
        settings.config.window_len = 2;
        assert!(MelodyGenerator::load(&settings).is_ok());

        settings.config.time_step = Duration::new(1, 2).unwrap();
        let err = MelodyGenerator::load(&settings).err().unwrap();
        assert!(err.to_string().contains("time step"));
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_save_melody_as_kern() {
        let path = std::env::temp_dir().join(format!("melodygen_generated_{}.krn", std::process::id()));
        let events = vec![Event::note(60, Duration::QUARTER), Event::rest(Duration::SIXTEENTH)];
        save_melody(&events, &path, OutputFormat::Kern, 120.0).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "!!!OTL: Generated melody\n**kern\n4c\n16r\n*-\n");
        std::fs::remove_file(&path).unwrap();
    }
}
