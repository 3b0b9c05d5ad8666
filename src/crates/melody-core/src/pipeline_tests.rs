// End-to-end scenarios across tokenizer, corpus, vocabulary, windower,
// sampler and detokenizer

#[cfg(test)]
mod tests {
    use crate::*;

    fn d(n: u32, m: u32) -> Duration {
        Duration::new(n, m).unwrap()
    }

    // Always continues with the id that followed the last one in a fixed table
    struct Lookup {
        window_len: usize,
        next: Vec<usize>,
    }

    impl Predictor for Lookup {
        fn window_len(&self) -> usize {
            self.window_len
        }

        fn vocab_size(&self) -> usize {
            self.next.len()
        }

        fn predict(&self, window: &OneHotWindow) -> Vec<f64> {
            let last = window.hot_indices().last().copied().unwrap_or(0);
            let v = self.next.len();
            let mut probs = vec![0.001; v];
            probs[self.next[last]] = 1.0 - 0.001 * (v - 1) as f64;
            probs
        }
    }

    #[test]
    fn test_quarter_rest_scenario() {
        let tokens = Tokenizer::new(&Config::default())
            .tokenize(&Score::new(vec![Event::rest(Duration::QUARTER)]))
            .unwrap();
        assert_eq!(join_tokens(&tokens), "r _ _ _");

        let events = detokenize(&tokens, d(1, 4)).unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].is_rest());
        assert_eq!(events[0].duration.quarters(), 1.0);
    }

    #[test]
    fn test_vocabulary_scenario() {
        let corpus = Corpus::from_text("60 _ r _ /").unwrap();
        let vocab = corpus.vocabulary();
        assert_eq!(vocab.len(), 4);
        let mut ids: Vec<usize> = ["60", "_", "r", "/"]
            .iter()
            .map(|s| vocab.encode(&s.parse().unwrap()).unwrap())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_corpus_to_training_examples() {
        let config = Config {
            window_len: 3,
            normalize_key: false,
            ..Config::default()
        };
        let tokenizer = Tokenizer::new(&config);
        let pieces: Vec<Vec<Token>> = [
            vec![Event::note(60, d(1, 2)), Event::note(62, d(1, 4))],
            vec![Event::rest(d(1, 4)), Event::note(64, d(1, 4))],
        ]
        .into_iter()
        .map(|events| tokenizer.tokenize(&Score::new(events)).unwrap())
        .collect();

        let corpus = Corpus::assemble(&pieces, config.window_len);
        assert_eq!(corpus.to_text(), "/ / / 60 _ 62 / / / r 64 / / /");
        assert_eq!(corpus.piece_count(), 2);

        let vocab = corpus.vocabulary();
        let ids = corpus.encode(&vocab).unwrap();
        let windower = Windower::new(config.window_len);
        let examples: Vec<_> = windower.examples(&ids).collect();
        assert_eq!(examples.len(), ids.len() - 3);

        // The first example predicts the first note of the first piece
        assert_eq!(vocab.decode(examples[0].target).unwrap(), Token::Pitch(60));
        for (i, example) in examples.iter().enumerate() {
            assert_eq!(example.target, ids[i + 3]);
        }
    }

    #[test]
    fn test_generation_round_trip_to_events() {
        // / -> 67, 67 -> _, _ -> r, r -> /
        let vocab = Vocabulary::from_symbols(parse_tokens("/ 67 _ r").unwrap()).unwrap();
        let predictor = Lookup {
            window_len: 4,
            next: vec![1, 2, 3, 0],
        };
        let mut sampler = Sampler::seeded(11, 0.05).unwrap();
        let generation = sampler.generate(&predictor, &vocab, &[], 50).unwrap();

        assert_eq!(generation.stop, StopReason::Boundary);
        assert_eq!(join_tokens(&generation.melody), "67 _ r");
        assert!(!generation.melody.contains(&Token::Boundary));

        let events = detokenize(&generation.melody, Duration::SIXTEENTH).unwrap();
        assert_eq!(events, vec![Event::note(67, d(1, 2)), Event::rest(d(1, 4))]);
    }

    #[test]
    fn test_step_budget_without_boundary() {
        // 67 -> _ -> _ ... never returns to the boundary
        let vocab = Vocabulary::from_symbols(parse_tokens("/ 67 _").unwrap()).unwrap();
        let predictor = Lookup {
            window_len: 2,
            next: vec![1, 2, 2],
        };
        let mut sampler = Sampler::seeded(5, 0.05).unwrap();
        let generation = sampler.generate(&predictor, &vocab, &[], 8).unwrap();
        assert_eq!(generation.stop, StopReason::StepBudget);
        assert_eq!(generation.melody.len(), 8);

        let events = detokenize(&generation.melody, Duration::SIXTEENTH).unwrap();
        assert_eq!(events, vec![Event::note(67, d(2, 1))]);
    }

    #[test]
    fn test_key_normalized_piece_decodes_in_reference_key() {
        // D major scale fragment, notated key
        let score = Score::new(vec![
            Event::note(62, d(1, 2)),
            Event::note(64, d(1, 2)),
            Event::note(66, d(1, 1)),
        ])
        .with_key_hint(KeyHint::Designated { key: Key::major(2) });
        let tokens = Tokenizer::new(&Config::default()).tokenize(&score).unwrap();
        assert_eq!(join_tokens(&tokens), "60 _ 62 _ 64 _ _ _");

        let events = detokenize(&tokens, Duration::SIXTEENTH).unwrap();
        let pitches: Vec<u8> = events.iter().filter_map(|e| e.pitch()).collect();
        assert_eq!(pitches, vec![60, 62, 64]);
    }
}
