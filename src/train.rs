// Training stage: corpus + vocabulary -> fitted model artifact

use anyhow::{Context, Result};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use melody_core::{Corpus, Vocabulary, Windower};

use crate::model::{EpochStats, TrainOptions, WindowModel};
use crate::settings::Settings;

#[derive(Debug, Clone)]
pub struct TrainReport {
    pub examples: usize,
    pub vocab_size: usize,
    pub history: Vec<EpochStats>,
}

/// Fit a model on the preprocessed corpus and save it to `paths.model_file`
pub fn train(settings: &Settings) -> Result<TrainReport> {
    settings.validate()?;
    let config = &settings.config;
    let paths = &settings.paths;

    let corpus = Corpus::load(&paths.corpus_file).context("Failed to load corpus")?;
    let vocab = Vocabulary::load(&paths.vocabulary_file).context("Failed to load vocabulary")?;
    let ids = corpus
        .encode(&vocab)
        .context("Corpus does not match the vocabulary")?;

    if corpus.boundary_run() != config.window_len {
        anyhow::bail!(
            "Corpus {} was assembled with a window of {}, configured window is {}; rerun preprocess",
            paths.corpus_file.display(),
            corpus.boundary_run(),
            config.window_len
        );
    }

    let windower = Windower::new(config.window_len);
    let examples = windower.example_count(ids.len());
    if examples == 0 {
        anyhow::bail!(
            "Corpus {} is too short for a window of {}",
            paths.corpus_file.display(),
            config.window_len
        );
    }
    info!(
        "{} pieces, {} tokens, {} symbols",
        corpus.piece_count(),
        ids.len(),
        vocab.len()
    );

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let options = TrainOptions {
        epochs: config.epochs,
        batch_size: config.batch_size,
        learning_rate: config.learning_rate,
    };

    let mut model = WindowModel::new(config.window_len, vocab.len(), config.time_step);
    let history = model.fit(&ids, &options, &mut rng);
    model.save(&paths.model_file)?;
    info!("Model saved to {}", paths.model_file.display());

    Ok(TrainReport {
        examples,
        vocab_size: vocab.len(),
        history,
    })
}
