//! The single-file training corpus
//!
//! All pieces are concatenated into one token stream. Every piece is preceded
//! by exactly `window_len` boundary markers and one final run closes the
//! stream, so the model sees "piece just started" contexts and learns to emit
//! a boundary when a piece ends.

use std::path::Path;

use crate::error::{Error, Result};
use crate::token::{join_tokens, parse_tokens, Token};
use crate::vocabulary::Vocabulary;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Corpus {
    tokens: Vec<Token>,
}

impl Corpus {
    pub fn assemble<P>(pieces: &[P], window_len: usize) -> Self
    where
        P: AsRef<[Token]>,
    {
        let total: usize = pieces.iter().map(|p| p.as_ref().len() + window_len).sum();
        let mut tokens = Vec::with_capacity(total + window_len);
        for piece in pieces {
            tokens.extend(std::iter::repeat(Token::Boundary).take(window_len));
            tokens.extend_from_slice(piece.as_ref());
        }
        tokens.extend(std::iter::repeat(Token::Boundary).take(window_len));
        Corpus { tokens }
    }

    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        Corpus { tokens }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Length of the leading boundary run, which is the `window_len` the
    /// corpus was assembled with
    pub fn boundary_run(&self) -> usize {
        self.tokens.iter().take_while(|t| **t == Token::Boundary).count()
    }

    /// Number of pieces, counted as maximal runs of non-boundary tokens
    pub fn piece_count(&self) -> usize {
        self.tokens
            .split(|t| *t == Token::Boundary)
            .filter(|run| !run.is_empty())
            .count()
    }

    pub fn vocabulary(&self) -> Vocabulary {
        Vocabulary::build(&self.tokens)
    }

    /// Integer-code the whole stream; any symbol missing from `vocab` is fatal
    pub fn encode(&self, vocab: &Vocabulary) -> Result<Vec<usize>> {
        Ok(vocab.encode_all(&self.tokens)?)
    }

    pub fn to_text(&self) -> String {
        join_tokens(&self.tokens)
    }

    pub fn from_text(text: &str) -> Result<Self> {
        Ok(Corpus {
            tokens: parse_tokens(text)?,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_text()).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_text(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_bounds_every_piece() {
        let a = parse_tokens("60 _ 62").unwrap();
        let b = parse_tokens("r _").unwrap();
        let corpus = Corpus::assemble(&[a, b], 2);
        assert_eq!(corpus.to_text(), "/ / 60 _ 62 / / r _ / /");
        assert_eq!(corpus.piece_count(), 2);
        assert_eq!(corpus.boundary_run(), 2);
    }

    #[test]
    fn test_boundary_run_of_unbounded_text() {
        assert_eq!(Corpus::from_text("60 _ / / /").unwrap().boundary_run(), 0);
        assert_eq!(Corpus::default().boundary_run(), 0);
    }

    #[test]
    fn test_assemble_empty() {
        let corpus = Corpus::assemble::<Vec<Token>>(&[], 3);
        assert_eq!(corpus.to_text(), "/ / /");
        assert_eq!(corpus.piece_count(), 0);
    }

    #[test]
    fn test_encode_with_foreign_vocabulary_fails() {
        let corpus = Corpus::from_text("60 _ 64 /").unwrap();
        let vocab = Vocabulary::build(&parse_tokens("60 _ /").unwrap());
        assert!(matches!(corpus.encode(&vocab), Err(Error::Vocabulary(_))));
        assert_eq!(corpus.encode(&corpus.vocabulary()).unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_text_round_trip_through_file() {
        let path = std::env::temp_dir().join(format!("melody-core-corpus-{}.txt", std::process::id()));
        let corpus = Corpus::assemble(&[parse_tokens("55 _ 60 _ r").unwrap()], 4);
        corpus.save(&path).unwrap();
        let loaded = Corpus::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, corpus);
    }

    #[test]
    fn test_missing_corpus_names_the_path() {
        let err = Corpus::load(Path::new("/nonexistent/file_dataset")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/file_dataset"));
    }
}
