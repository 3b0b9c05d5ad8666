// Melody generation pipeline: dataset preprocessing, model training and
// sampling new melodies, built on melody-core and score-io

pub mod dataset;
pub mod generate;
pub mod model;
pub mod preprocess;
pub mod settings;
pub mod train;

pub use generate::{save_melody, GenerateOptions, MelodyGenerator};
pub use model::{EpochStats, ModelError, TrainOptions, WindowModel};
pub use preprocess::{preprocess, PreprocessSummary};
pub use settings::{Paths, Settings};
pub use train::{train, TrainReport};
