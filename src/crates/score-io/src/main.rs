use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use log::LevelFilter;
use std::path::PathBuf;

use melody_core::{join_tokens, Config, Key, Tokenizer};
use score_io::{load_score, pitch_name};

#[derive(Parser, Debug)]
#[command(name = "score-info")]
#[command(about = "Inspect kern and MIDI melodies", long_about = None)]
struct Args {
    /// Score files to inspect (.krn or .mid)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Also print the token sequence
    #[arg(short, long)]
    tokens: bool,

    /// Print the parsed score as JSON instead of a summary
    #[arg(long)]
    json: bool,

    /// Keep the original key when printing tokens
    #[arg(long)]
    no_normalize: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match (args.quiet, args.verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env().filter_level(level).init();

    let config = Config {
        normalize_key: !args.no_normalize,
        ..Config::default()
    };
    let tokenizer = Tokenizer::new(&config);

    for path in &args.files {
        let score = load_score(path).with_context(|| format!("Failed to load {}", path.display()))?;

        if args.json {
            println!("{}", serde_json::to_string_pretty(&score)?);
            continue;
        }

        println!("{}", path.display());
        println!("  title:    {}", score.title.as_deref().unwrap_or("-"));
        println!("  key hint: {:?}", score.key_hint);
        match Key::resolve(&score.key_hint, &score.events) {
            Some(key) => println!("  key:      {} ({:+} semitones to reference)", key, key.normalization_interval()),
            None => println!("  key:      undetermined"),
        }
        println!(
            "  events:   {} ({} notes, {} quarters)",
            score.events.len(),
            score.note_count(),
            score.total_duration()
        );
        if let Some((low, high)) = pitch_range(&score.events) {
            println!("  range:    {} - {}", pitch_name(low), pitch_name(high));
        }

        if args.tokens {
            match tokenizer.tokenize(&score) {
                Ok(tokens) => println!("  tokens:   {}", join_tokens(&tokens)),
                Err(e) => println!("  tokens:   skipped ({})", e),
            }
        }
    }

    Ok(())
}

fn pitch_range(events: &[melody_core::Event]) -> Option<(u8, u8)> {
    let pitches = events.iter().filter_map(|e| e.pitch());
    let low = pitches.clone().min()?;
    let high = pitches.max()?;
    Some((low, high))
}
