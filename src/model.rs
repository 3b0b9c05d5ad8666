// Next-token model: log-linear softmax over the one-hot context window
//
// Every (position, symbol) pair in the window owns one row of logits; the
// prediction is softmax(bias + sum of the rows picked by the window). Trained
// with mini-batch Adam on sparse categorical cross-entropy, updating only the
// rows a batch touches.

use log::info;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use melody_core::{Duration, OneHotWindow, Predictor, Windower};

const FORMAT_VERSION: u32 = 2;

/// Smallest probability handed to the sampler, so log(p) stays finite
const PROBABILITY_FLOOR: f64 = 1e-12;

const BETA1: f32 = 0.9;
const BETA2: f32 = 0.999;
const EPSILON: f32 = 1e-7;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("failed to access model file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid model file {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported model format version {0}")]
    UnsupportedVersion(u32),

    #[error("model parameters do not match a window of {window_len} over {vocab_size} symbols")]
    Shape { window_len: usize, vocab_size: usize },

    #[error("model was trained on {model} symbols but the vocabulary has {vocabulary}")]
    VocabularyMismatch { model: usize, vocabulary: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainOptions {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
}

/// Mean loss and accuracy over one pass through the examples
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochStats {
    pub epoch: usize,
    pub loss: f64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowModel {
    version: u32,
    window_len: usize,
    vocab_size: usize,
    /// Grid step the training tokens were encoded with
    time_step: Duration,
    /// `window_len * vocab_size` rows of `vocab_size` logits
    weights: Vec<f32>,
    bias: Vec<f32>,
}

impl WindowModel {
    /// Untrained model predicting the uniform distribution
    pub fn new(window_len: usize, vocab_size: usize, time_step: Duration) -> Self {
        WindowModel {
            version: FORMAT_VERSION,
            window_len,
            vocab_size,
            time_step,
            weights: vec![0.0; window_len * vocab_size * vocab_size],
            bias: vec![0.0; vocab_size],
        }
    }

    pub fn time_step(&self) -> Duration {
        self.time_step
    }

    fn row_index(&self, position: usize, symbol: usize) -> usize {
        position * self.vocab_size + symbol
    }

    fn row(&self, row: usize) -> &[f32] {
        &self.weights[row * self.vocab_size..(row + 1) * self.vocab_size]
    }

    /// Logits for a window of ids, right-aligned if shorter than `window_len`
    fn logits(&self, context: &[usize]) -> Vec<f32> {
        let mut logits = self.bias.clone();
        let skip = context.len().saturating_sub(self.window_len);
        let offset = self.window_len.saturating_sub(context.len());
        for (i, &symbol) in context[skip..].iter().enumerate() {
            if symbol >= self.vocab_size {
                continue;
            }
            let row = self.row(self.row_index(offset + i, symbol));
            for (l, w) in logits.iter_mut().zip(row) {
                *l += w;
            }
        }
        logits
    }

    fn probabilities(&self, context: &[usize]) -> Vec<f64> {
        softmax(&self.logits(context))
    }

    /// Fit on every window of `corpus`, logging loss and accuracy per epoch
    pub fn fit<R: Rng>(&mut self, corpus: &[usize], options: &TrainOptions, rng: &mut R) -> Vec<EpochStats> {
        let windower = Windower::new(self.window_len);
        let count = windower.example_count(corpus.len());
        let mut order: Vec<usize> = (0..count).collect();
        let mut adam = Adam::new(self.vocab_size, options.learning_rate as f32);
        let mut history = Vec::with_capacity(options.epochs);

        info!(
            "Training on {} examples for {} epochs (batch size {})",
            count, options.epochs, options.batch_size
        );

        for epoch in 1..=options.epochs {
            order.shuffle(rng);
            let mut total_loss = 0.0;
            let mut correct = 0usize;

            for batch in order.chunks(options.batch_size.max(1)) {
                let mut row_grads: HashMap<usize, Vec<f32>> = HashMap::new();
                let mut bias_grad = vec![0.0f32; self.vocab_size];
                let scale = 1.0 / batch.len() as f32;

                for &i in batch {
                    let Some(example) = windower.example(corpus, i) else {
                        continue;
                    };
                    let probs = self.probabilities(example.context);
                    let target = example.target;

                    total_loss -= probs[target].max(PROBABILITY_FLOOR).ln();
                    if argmax(&probs) == target {
                        correct += 1;
                    }

                    let grad: Vec<f32> = probs
                        .iter()
                        .enumerate()
                        .map(|(k, &p)| (p as f32 - if k == target { 1.0 } else { 0.0 }) * scale)
                        .collect();
                    for (position, &symbol) in example.context.iter().enumerate() {
                        let row = row_grads
                            .entry(self.row_index(position, symbol))
                            .or_insert_with(|| vec![0.0; self.vocab_size]);
                        for (r, g) in row.iter_mut().zip(&grad) {
                            *r += g;
                        }
                    }
                    for (b, g) in bias_grad.iter_mut().zip(&grad) {
                        *b += g;
                    }
                }

                adam.step(self, &row_grads, &bias_grad);
            }

            let stats = EpochStats {
                epoch,
                loss: if count > 0 { total_loss / count as f64 } else { 0.0 },
                accuracy: if count > 0 { correct as f64 / count as f64 } else { 0.0 },
            };
            info!(
                "Epoch {}/{}: loss {:.4}, accuracy {:.3}",
                epoch, options.epochs, stats.loss, stats.accuracy
            );
            history.push(stats);
        }

        history
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let json = self.to_json().map_err(|source| ModelError::Json {
            path: path.display().to_string(),
            source,
        })?;
        std::fs::write(path, json).map_err(|source| ModelError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Load a trained model and check it was trained against a vocabulary of
    /// `vocab_size` symbols
    pub fn load(path: &Path, vocab_size: usize) -> Result<Self, ModelError> {
        let json = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let model: WindowModel = serde_json::from_str(&json).map_err(|source| ModelError::Json {
            path: path.display().to_string(),
            source,
        })?;
        model.check(vocab_size)?;
        Ok(model)
    }

    fn check(&self, vocab_size: usize) -> Result<(), ModelError> {
        if self.version != FORMAT_VERSION {
            return Err(ModelError::UnsupportedVersion(self.version));
        }
        let shape_ok = self.window_len > 0
            && !self.time_step.is_zero()
            && self.bias.len() == self.vocab_size
            && self.weights.len() == self.window_len * self.vocab_size * self.vocab_size;
        if !shape_ok {
            return Err(ModelError::Shape {
                window_len: self.window_len,
                vocab_size: self.vocab_size,
            });
        }
        if self.vocab_size != vocab_size {
            return Err(ModelError::VocabularyMismatch {
                model: self.vocab_size,
                vocabulary: vocab_size,
            });
        }
        Ok(())
    }
}

impl Predictor for WindowModel {
    fn window_len(&self) -> usize {
        self.window_len
    }

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn predict(&self, window: &OneHotWindow) -> Vec<f64> {
        self.probabilities(&window.hot_indices())
    }
}

/// Adam state, allocated lazily per touched weight row
struct Adam {
    learning_rate: f32,
    t: i32,
    rows: HashMap<usize, (Vec<f32>, Vec<f32>)>,
    bias: (Vec<f32>, Vec<f32>),
}

impl Adam {
    fn new(vocab_size: usize, learning_rate: f32) -> Self {
        Adam {
            learning_rate,
            t: 0,
            rows: HashMap::new(),
            bias: (vec![0.0; vocab_size], vec![0.0; vocab_size]),
        }
    }

    fn step(&mut self, model: &mut WindowModel, row_grads: &HashMap<usize, Vec<f32>>, bias_grad: &[f32]) {
        self.t += 1;
        let lr = self.learning_rate * (1.0 - BETA2.powi(self.t)).sqrt() / (1.0 - BETA1.powi(self.t));
        let v = model.vocab_size;

        for (&row, grad) in row_grads {
            let (m, s) = self
                .rows
                .entry(row)
                .or_insert_with(|| (vec![0.0; v], vec![0.0; v]));
            update(&mut model.weights[row * v..(row + 1) * v], grad, m, s, lr);
        }
        let (m, s) = &mut self.bias;
        update(&mut model.bias, bias_grad, m, s, lr);
    }
}

fn update(params: &mut [f32], grad: &[f32], m: &mut [f32], s: &mut [f32], lr: f32) {
    for i in 0..params.len() {
        m[i] = BETA1 * m[i] + (1.0 - BETA1) * grad[i];
        s[i] = BETA2 * s[i] + (1.0 - BETA2) * grad[i] * grad[i];
        params[i] -= lr * m[i] / (s[i].sqrt() + EPSILON);
    }
}

fn softmax(logits: &[f32]) -> Vec<f64> {
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max) as f64;
    let exps: Vec<f64> = logits.iter().map(|&l| (l as f64 - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    let floored: Vec<f64> = exps.iter().map(|e| (e / sum).max(PROBABILITY_FLOOR)).collect();
    let total: f64 = floored.iter().sum();
    floored.into_iter().map(|p| p / total).collect()
}

fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
        .0
}
