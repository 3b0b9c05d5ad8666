// Standalone tool to print the token sequence of a single score
// Usage: cargo run --bin tokenize_score -- <score.krn|score.mid> [settings.json]

use anyhow::{Context, Result};
use std::env;
use std::path::Path;

use melody_core::{join_tokens, Key, Tokenizer};
use melodygen_lib::Settings;
use score_io::load_score;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <score.krn|score.mid> [settings.json]", args[0]);
        eprintln!("\nExample:");
        eprintln!("  cargo run --bin tokenize_score -- dataset/deutschl/erk/deut0567.krn");
        std::process::exit(1);
    }

    let score_path = Path::new(&args[1]);
    let settings = Settings::load(args.get(2).map(Path::new))?;
    settings.validate()?;

    let score = load_score(score_path).with_context(|| format!("Failed to load {}", score_path.display()))?;
    eprintln!(
        "{}: {} events, key {}",
        score.title.as_deref().unwrap_or("untitled"),
        score.events.len(),
        Key::resolve(&score.key_hint, &score.events)
            .map(|k| k.to_string())
            .unwrap_or_else(|| "undetermined".to_string())
    );

    let tokenizer = Tokenizer::new(&settings.config);
    let tokens = tokenizer
        .tokenize(&score)
        .with_context(|| format!("Cannot tokenize {}", score_path.display()))?;
    println!("{}", join_tokens(&tokens));

    Ok(())
}
