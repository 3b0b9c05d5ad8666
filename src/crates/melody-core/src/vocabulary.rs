//! Symbol <-> id table shared by training and generation
//!
//! Ids are assigned in first-seen order over the corpus, which makes the
//! build deterministic for a given corpus. The table is persisted as the
//! ordered list of surface forms; the id of a symbol is its position. The
//! reverse map is rebuilt once on load.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::VocabularyError;
use crate::token::Token;

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Vocabulary {
    symbols: Vec<Token>,
    ids: HashMap<Token, usize>,
}

/// On-disk form: `{"version": 1, "symbols": ["60", "_", "r", "/"]}`
#[derive(Serialize, Deserialize)]
struct VocabularyFile {
    version: u32,
    symbols: Vec<String>,
}

impl Vocabulary {
    /// Build from a token stream, assigning ids in order of first appearance
    pub fn build<'a, I>(tokens: I) -> Self
    where
        I: IntoIterator<Item = &'a Token>,
    {
        let mut vocab = Vocabulary::default();
        for &token in tokens {
            if !vocab.ids.contains_key(&token) {
                vocab.ids.insert(token, vocab.symbols.len());
                vocab.symbols.push(token);
            }
        }
        vocab
    }

    /// Rebuild from an ordered symbol list, rejecting duplicates
    pub fn from_symbols(symbols: Vec<Token>) -> Result<Self, VocabularyError> {
        let mut ids = HashMap::with_capacity(symbols.len());
        for (id, &symbol) in symbols.iter().enumerate() {
            if ids.insert(symbol, id).is_some() {
                return Err(VocabularyError::DuplicateSymbol(symbol.to_string()));
            }
        }
        Ok(Vocabulary { symbols, ids })
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn contains(&self, token: &Token) -> bool {
        self.ids.contains_key(token)
    }

    pub fn encode(&self, token: &Token) -> Result<usize, VocabularyError> {
        self.ids
            .get(token)
            .copied()
            .ok_or_else(|| VocabularyError::UnknownSymbol(token.to_string()))
    }

    /// Encode a whole sequence. A single miss aborts: substituting a default
    /// id would silently pair the model with the wrong vocabulary.
    pub fn encode_all(&self, tokens: &[Token]) -> Result<Vec<usize>, VocabularyError> {
        tokens.iter().map(|t| self.encode(t)).collect()
    }

    pub fn decode(&self, id: usize) -> Result<Token, VocabularyError> {
        self.symbols
            .get(id)
            .copied()
            .ok_or(VocabularyError::UnknownId(id))
    }

    pub fn symbols(&self) -> &[Token] {
        &self.symbols
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let file = VocabularyFile {
            version: FORMAT_VERSION,
            symbols: self.symbols.iter().map(|t| t.to_string()).collect(),
        };
        serde_json::to_string_pretty(&file)
    }

    pub fn from_json(json: &str) -> Result<Self, VocabularyError> {
        let file: VocabularyFile = serde_json::from_str(json).map_err(|source| VocabularyError::Json {
            path: "<memory>".to_string(),
            source,
        })?;
        Self::from_file_repr(file)
    }

    fn from_file_repr(file: VocabularyFile) -> Result<Self, VocabularyError> {
        if file.version != FORMAT_VERSION {
            return Err(VocabularyError::UnsupportedVersion(file.version));
        }
        let symbols = file
            .symbols
            .iter()
            .map(|s| s.parse::<Token>())
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_symbols(symbols)
    }

    pub fn save(&self, path: &Path) -> Result<(), VocabularyError> {
        let json = self.to_json().map_err(|source| VocabularyError::Json {
            path: path.display().to_string(),
            source,
        })?;
        std::fs::write(path, json).map_err(|source| VocabularyError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, VocabularyError> {
        let json = std::fs::read_to_string(path).map_err(|source| VocabularyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file: VocabularyFile = serde_json::from_str(&json).map_err(|source| VocabularyError::Json {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_file_repr(file)
    }
}
