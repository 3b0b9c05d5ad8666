//! Core of the melody generator
//!
//! Turns symbolic scores into a fixed-step token grid, builds the vocabulary
//! and training windows from a corpus of such grids, and samples new token
//! sequences from a trained predictor.
//!
//! # Examples
//!
//! ```
//! use melody_core::{detokenize, join_tokens, Config, Duration, Event, Tokenizer};
//!
//! let config = Config { normalize_key: false, ..Config::default() };
//! let tokenizer = Tokenizer::new(&config);
//! let tokens = tokenizer.encode_events(&[Event::rest(Duration::QUARTER)]).unwrap();
//! assert_eq!(join_tokens(&tokens), "r _ _ _");
//!
//! let events = detokenize(&tokens, config.time_step).unwrap();
//! assert_eq!(events, vec![Event::rest(Duration::QUARTER)]);
//! ```
//!
//! # Main Components
//!
//! - **Tokenizer**: score events to pitch / rest / hold tokens, with key normalization
//! - **Vocabulary**: stable token <-> id table, persisted as JSON
//! - **Corpus**: boundary-delimited concatenation of all pieces
//! - **Windower**: (window, next token) training pairs and one-hot encoding
//! - **Sampler**: temperature sampling loop over a [`Predictor`]
//! - **Detokenizer**: tokens back to timed events

pub mod config;
pub mod corpus;
pub mod detokenizer;
pub mod duration;
pub mod error;
pub mod key;
pub mod sampler;
pub mod score;
pub mod token;
pub mod tokenizer;
pub mod vocabulary;
pub mod windower;

mod pipeline_tests;

pub use config::Config;
pub use corpus::Corpus;
pub use detokenizer::{detokenize, DecodeState, Detokenizer};
pub use duration::Duration;
pub use error::{
    ConfigError, DecodeError, DurationError, Error, Result, SamplingError, SymbolError, TokenizeError,
    VocabularyError,
};
pub use key::{Key, Mode};
pub use sampler::{apply_temperature, entropy, Generation, Predictor, Sampler, StopReason};
pub use score::{Event, EventKind, KeyHint, Score};
pub use token::{join_tokens, parse_tokens, Token};
pub use tokenizer::Tokenizer;
pub use vocabulary::Vocabulary;
pub use windower::{OneHotWindow, TrainingExample, Windower};
