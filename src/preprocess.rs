// Dataset preprocessing: score files -> tokenized pieces -> corpus + vocabulary

use anyhow::{Context, Result};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::fs;
use std::path::Path;

use melody_core::{join_tokens, Corpus, Token, Tokenizer};
use score_io::load_score;

use crate::dataset::find_score_files;
use crate::settings::Settings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessSummary {
    pub found: usize,
    pub loaded: usize,
    pub skipped: usize,
    pub corpus_len: usize,
    pub vocab_size: usize,
}

/// Load and tokenize one file; `None` (with a warning) if it is unusable
pub fn tokenize_file(path: &Path, tokenizer: &Tokenizer) -> Option<Vec<Token>> {
    let score = match load_score(path) {
        Ok(score) => score,
        Err(e) => {
            warn!("Skipping {}: {}", path.display(), e);
            return None;
        }
    };
    match tokenizer.tokenize(&score) {
        Ok(tokens) => {
            debug!("{}: {} tokens", path.display(), tokens.len());
            Some(tokens)
        }
        Err(e) => {
            warn!("Skipping {}: {}", path.display(), e);
            None
        }
    }
}

/// Run the whole preprocessing stage described by `settings`
pub fn preprocess(settings: &Settings) -> Result<PreprocessSummary> {
    settings.validate()?;
    let paths = &settings.paths;

    let files = find_score_files(&paths.dataset_dir)?;
    info!("Found {} score files in {}", files.len(), paths.dataset_dir.display());

    let tokenizer = Tokenizer::new(&settings.config);
    let pieces: Vec<Vec<Token>> = files
        .par_iter()
        .filter_map(|path| tokenize_file(path, &tokenizer))
        .collect();

    if pieces.is_empty() {
        anyhow::bail!("No usable pieces in {}", paths.dataset_dir.display());
    }

    fs::create_dir_all(&paths.encoded_dir)
        .with_context(|| format!("Failed to create {}", paths.encoded_dir.display()))?;
    for (index, piece) in pieces.iter().enumerate() {
        let path = paths.encoded_dir.join(index.to_string());
        fs::write(&path, join_tokens(piece))
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    let corpus = Corpus::assemble(&pieces, settings.config.window_len);
    corpus
        .save(&paths.corpus_file)
        .context("Failed to save corpus")?;
    info!("Corpus of {} tokens saved to {}", corpus.len(), paths.corpus_file.display());

    let vocab = corpus.vocabulary();
    vocab
        .save(&paths.vocabulary_file)
        .context("Failed to save vocabulary")?;
    info!("Vocabulary of {} symbols saved to {}", vocab.len(), paths.vocabulary_file.display());

    Ok(PreprocessSummary {
        found: files.len(),
        loaded: pieces.len(),
        skipped: files.len() - pieces.len(),
        corpus_len: corpus.len(),
        vocab_size: vocab.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Paths;
    use melody_core::Vocabulary;

    #[test]
    fn test_preprocess_skips_bad_pieces() {
        let root = std::env::temp_dir().join(format!("melodygen_preprocess_{}", std::process::id()));
        let dataset = root.join("dataset");
        fs::create_dir_all(&dataset).unwrap();
        // G major, transposed down to C
        fs::write(dataset.join("good.krn"), "**kern\n*G:\n4g\n8a\n8b\n4g\n*-\n").unwrap();
        // A 32nd note is not an acceptable duration
        fs::write(dataset.join("short.krn"), "**kern\n*C:\n32c\n4d\n*-\n").unwrap();
        fs::write(dataset.join("broken.krn"), "no spines here\n").unwrap();

        let settings = Settings {
            config: melody_core::Config {
                window_len: 4,
                ..Default::default()
            },
            paths: Paths {
                dataset_dir: dataset,
                encoded_dir: root.join("encoded"),
                corpus_file: root.join("corpus.txt"),
                vocabulary_file: root.join("vocabulary.json"),
                model_file: root.join("model.json"),
            },
        };

        let summary = preprocess(&settings).unwrap();
        assert_eq!(summary.found, 3);
        assert_eq!(summary.loaded, 1);
        assert_eq!(summary.skipped, 2);

        let corpus_text = fs::read_to_string(&settings.paths.corpus_file).unwrap();
        assert_eq!(corpus_text, "/ / / / 60 _ _ _ 62 _ 64 _ 60 _ _ _ / / / /");
        assert_eq!(summary.corpus_len, 20);

        let piece = fs::read_to_string(root.join("encoded").join("0")).unwrap();
        assert_eq!(piece, "60 _ _ _ 62 _ 64 _ 60 _ _ _");

        let vocab = Vocabulary::load(&settings.paths.vocabulary_file).unwrap();
        assert_eq!(vocab.len(), 5);
        assert_eq!(summary.vocab_size, 5);

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_empty_dataset_fails() {
        let root = std::env::temp_dir().join(format!("melodygen_preprocess_empty_{}", std::process::id()));
        fs::create_dir_all(&root).unwrap();
        let settings = Settings {
            paths: Paths {
                dataset_dir: root.clone(),
                ..Paths::default()
            },
            ..Settings::default()
        };
        assert!(preprocess(&settings).is_err());
        fs::remove_dir_all(&root).unwrap();
    }
}
