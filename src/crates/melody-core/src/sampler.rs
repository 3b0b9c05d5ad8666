//! Autoregressive generation with temperature
//!
//! Each step shows the predictor the most recent `window_len` ids, reshapes
//! its distribution with the temperature, draws one id and appends it to the
//! context. Generation ends when a boundary marker is drawn or the step
//! budget runs out.

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Result, SamplingError};
use crate::token::Token;
use crate::vocabulary::Vocabulary;
use crate::windower::OneHotWindow;

/// Anything that maps a one-hot context window to a distribution over the vocabulary
pub trait Predictor {
    /// Context length the predictor was trained with
    fn window_len(&self) -> usize;

    /// Number of classes in the output distribution
    fn vocab_size(&self) -> usize;

    /// Probability of each vocabulary id following `window`
    fn predict(&self, window: &OneHotWindow) -> Vec<f64>;
}

impl<P: Predictor + ?Sized> Predictor for &P {
    fn window_len(&self) -> usize {
        (**self).window_len()
    }

    fn vocab_size(&self) -> usize {
        (**self).vocab_size()
    }

    fn predict(&self, window: &OneHotWindow) -> Vec<f64> {
        (**self).predict(window)
    }
}

/// Softmax with temperature over an existing probability vector.
///
/// Divides the log-probabilities by `temperature` and renormalizes. Values
/// too small to take the log of are rejected instead of turning into NaN.
pub fn apply_temperature(
    probabilities: &[f64],
    temperature: f64,
    expected_len: usize,
) -> std::result::Result<Vec<f64>, SamplingError> {
    if !(temperature.is_finite() && temperature > 0.0) {
        return Err(SamplingError::InvalidTemperature(temperature));
    }
    if probabilities.is_empty() {
        return Err(SamplingError::Empty);
    }
    if probabilities.len() != expected_len {
        return Err(SamplingError::LengthMismatch {
            expected: expected_len,
            found: probabilities.len(),
        });
    }

    let mut logits = Vec::with_capacity(probabilities.len());
    for (index, &value) in probabilities.iter().enumerate() {
        if !value.is_finite() {
            return Err(SamplingError::NonFinite { index, value });
        }
        if value < 0.0 {
            return Err(SamplingError::Negative { index, value });
        }
        if value < f64::MIN_POSITIVE {
            return Err(SamplingError::Underflow { index, value });
        }
        logits.push(value.ln() / temperature);
    }

    let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mut scaled: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f64 = scaled.iter().sum();
    for p in scaled.iter_mut() {
        *p /= sum;
    }

    let total: f64 = scaled.iter().sum();
    if !total.is_finite() || (total - 1.0).abs() > 1e-6 {
        return Err(SamplingError::NotNormalized(total));
    }
    Ok(scaled)
}

/// Shannon entropy in nats
pub fn entropy(distribution: &[f64]) -> f64 {
    distribution
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| -p * p.ln())
        .sum()
}

/// Why a generation run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Boundary,
    StepBudget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    /// Seed symbols followed by the generated ones; never contains a boundary
    pub melody: Vec<Token>,
    pub stop: StopReason,
    /// Number of sampling steps taken, including a final boundary draw
    pub steps: usize,
}

/// Temperature sampler. The only source of randomness in generation.
pub struct Sampler<R = StdRng> {
    rng: R,
    temperature: f64,
}

impl Sampler<StdRng> {
    /// Reproducible sampler
    pub fn seeded(seed: u64, temperature: f64) -> std::result::Result<Self, SamplingError> {
        Self::with_rng(StdRng::seed_from_u64(seed), temperature)
    }

    pub fn from_entropy(temperature: f64) -> std::result::Result<Self, SamplingError> {
        Self::with_rng(StdRng::from_entropy(), temperature)
    }
}

impl<R: Rng> Sampler<R> {
    pub fn with_rng(rng: R, temperature: f64) -> std::result::Result<Self, SamplingError> {
        if !(temperature.is_finite() && temperature > 0.0) {
            return Err(SamplingError::InvalidTemperature(temperature));
        }
        Ok(Sampler { rng, temperature })
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Reshape `probabilities` with the temperature and draw one index
    pub fn choose(&mut self, probabilities: &[f64]) -> std::result::Result<usize, SamplingError> {
        let distribution = apply_temperature(probabilities, self.temperature, probabilities.len())?;
        Ok(self.draw(&distribution))
    }

    /// Draw an index from an already-normalized distribution
    fn draw(&mut self, distribution: &[f64]) -> usize {
        let r = self.rng.gen::<f64>();
        let mut cumulative = 0.0;
        for (i, &p) in distribution.iter().enumerate() {
            cumulative += p;
            if r < cumulative {
                return i;
            }
        }
        // Rounding left the cumulative sum just below r
        distribution
            .iter()
            .rposition(|&p| p > 0.0)
            .unwrap_or(distribution.len() - 1)
    }

    /// Continue `seed` until the predictor emits a boundary or `step_budget`
    /// tokens have been sampled.
    ///
    /// The context starts as `window_len` boundary markers followed by the
    /// seed, mirroring how every piece starts in the training corpus.
    pub fn generate<P: Predictor + ?Sized>(
        &mut self,
        predictor: &P,
        vocab: &Vocabulary,
        seed: &[Token],
        step_budget: usize,
    ) -> Result<Generation> {
        let vocab_size = vocab.len();
        if predictor.vocab_size() != vocab_size {
            return Err(SamplingError::VocabularyMismatch {
                predictor: predictor.vocab_size(),
                vocabulary: vocab_size,
            }
            .into());
        }

        let window_len = predictor.window_len();
        let boundary = vocab.encode(&Token::Boundary)?;
        let mut context = vec![boundary; window_len];
        context.extend(vocab.encode_all(seed)?);
        let mut melody = seed.to_vec();

        for step in 0..step_budget {
            if context.len() > window_len {
                context.drain(..context.len() - window_len);
            }

            let window = OneHotWindow::encode(&context, vocab_size)?;
            let probabilities = predictor.predict(&window);
            let distribution = apply_temperature(&probabilities, self.temperature, vocab_size)?;
            let id = self.draw(&distribution);
            context.push(id);

            let token = vocab.decode(id)?;
            trace!("step {}: sampled {} ({})", step, token, id);
            if token == Token::Boundary {
                debug!("boundary sampled after {} steps", step + 1);
                return Ok(Generation {
                    melody,
                    stop: StopReason::Boundary,
                    steps: step + 1,
                });
            }
            melody.push(token);
        }

        debug!("step budget of {} exhausted", step_budget);
        Ok(Generation {
            melody,
            stop: StopReason::StepBudget,
            steps: step_budget,
        })
    }
}
