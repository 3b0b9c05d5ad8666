//! Sliding-window training examples
//!
//! A corpus of length `L` with window `W` yields exactly `L - W` examples:
//! the window starting at `i` and the token right after it.

use crate::error::SamplingError;

/// One (context window, next token) pair borrowed from the corpus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainingExample<'a> {
    pub context: &'a [usize],
    pub target: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Windower {
    window_len: usize,
}

impl Windower {
    pub fn new(window_len: usize) -> Self {
        Windower { window_len }
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    pub fn example_count(&self, corpus_len: usize) -> usize {
        corpus_len.saturating_sub(self.window_len)
    }

    pub fn examples<'a>(&self, corpus: &'a [usize]) -> impl Iterator<Item = TrainingExample<'a>> + 'a {
        let w = self.window_len;
        (0..self.example_count(corpus.len())).map(move |i| TrainingExample {
            context: &corpus[i..i + w],
            target: corpus[i + w],
        })
    }

    pub fn example<'a>(&self, corpus: &'a [usize], i: usize) -> Option<TrainingExample<'a>> {
        (i < self.example_count(corpus.len())).then(|| TrainingExample {
            context: &corpus[i..i + self.window_len],
            target: corpus[i + self.window_len],
        })
    }
}

/// A window of ids expanded to one-hot rows over the vocabulary.
///
/// Stored as a dense `len x vocab_size` matrix in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct OneHotWindow {
    vocab_size: usize,
    data: Vec<f32>,
}

impl OneHotWindow {
    pub fn encode(ids: &[usize], vocab_size: usize) -> Result<Self, SamplingError> {
        let mut data = vec![0.0; ids.len() * vocab_size];
        for (row, &id) in ids.iter().enumerate() {
            if id >= vocab_size {
                return Err(SamplingError::IdOutOfRange { id, vocab_size });
            }
            data[row * vocab_size + id] = 1.0;
        }
        Ok(OneHotWindow { vocab_size, data })
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    /// Number of rows (time steps)
    pub fn len(&self) -> usize {
        if self.vocab_size == 0 {
            0
        } else {
            self.data.len() / self.vocab_size
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.vocab_size..(i + 1) * self.vocab_size]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks(self.vocab_size.max(1))
    }

    /// Index of the hot entry in each row
    pub fn hot_indices(&self) -> Vec<usize> {
        self.rows()
            .map(|row| row.iter().position(|&v| v == 1.0).unwrap_or(0))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_small_corpus() {
        let corpus = [0, 1, 2, 3, 4];
        let windower = Windower::new(3);
        let examples: Vec<_> = windower.examples(&corpus).collect();
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0].context, &[0, 1, 2]);
        assert_eq!(examples[0].target, 3);
        assert_eq!(examples[1].context, &[1, 2, 3]);
        assert_eq!(examples[1].target, 4);
        assert_eq!(windower.example(&corpus, 1), Some(examples[1]));
        assert_eq!(windower.example(&corpus, 2), None);
    }

    #[test]
    fn test_corpus_not_longer_than_window() {
        let windower = Windower::new(4);
        assert_eq!(windower.examples(&[0, 1, 2, 3]).count(), 0);
        assert_eq!(windower.examples(&[0, 1]).count(), 0);
    }

    #[test]
    fn test_one_hot() {
        let window = OneHotWindow::encode(&[2, 0], 3).unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window.row(0), &[0.0, 0.0, 1.0]);
        assert_eq!(window.row(1), &[1.0, 0.0, 0.0]);
        assert_eq!(window.hot_indices(), vec![2, 0]);
    }

    #[test]
    fn test_one_hot_rejects_out_of_range_id() {
        assert_eq!(
            OneHotWindow::encode(&[0, 3], 3),
            Err(SamplingError::IdOutOfRange { id: 3, vocab_size: 3 })
        );
    }

    proptest! {
        #[test]
        fn prop_every_position_yields_one_example(
            corpus in prop::collection::vec(0usize..10, 0..120),
            window in 1usize..16,
        ) {
            let windower = Windower::new(window);
            let examples: Vec<_> = windower.examples(&corpus).collect();
            prop_assert_eq!(examples.len(), corpus.len().saturating_sub(window));
            for (i, example) in examples.iter().enumerate() {
                prop_assert_eq!(example.context.len(), window);
                prop_assert_eq!(example.context, &corpus[i..i + window]);
                prop_assert_eq!(example.target, corpus[i + window]);
            }
        }
    }
}
