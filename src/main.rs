use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::LevelFilter;
use std::path::PathBuf;

use melody_core::{join_tokens, parse_tokens};
use melodygen_lib::{preprocess, save_melody, train, GenerateOptions, MelodyGenerator, Settings};
use score_io::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "melodygen")]
#[command(author, version, about = "Train on folk melodies and generate new ones", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q, -qq)
    #[arg(short = 'q', long, global = true, action = ArgAction::Count)]
    quiet: u8,

    /// JSON settings file; flags below override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    paths: PathArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenize every score in the dataset into a corpus and vocabulary
    Preprocess(PreprocessArgs),
    /// Fit the next-token model on the corpus
    Train(TrainArgs),
    /// Sample a new melody from the trained model
    Generate(GenerateArgs),
}

#[derive(Args, Debug)]
struct PathArgs {
    /// Directory searched for .krn / .mid files
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    /// Directory for the per-piece token files
    #[arg(long, global = true)]
    encoded_dir: Option<PathBuf>,

    /// Single-file token corpus
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    /// Vocabulary JSON file
    #[arg(long, global = true)]
    vocabulary: Option<PathBuf>,

    /// Trained model file
    #[arg(long, global = true)]
    model: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PreprocessArgs {
    /// Context window length (boundary markers between pieces)
    #[arg(long)]
    window_len: Option<usize>,

    /// Keep every piece in its original key
    #[arg(long)]
    no_normalize: bool,
}

#[derive(Args, Debug)]
struct TrainArgs {
    #[arg(long)]
    epochs: Option<usize>,

    #[arg(long)]
    batch_size: Option<usize>,

    #[arg(long)]
    learning_rate: Option<f64>,

    /// Seed for shuffling, for reproducible training
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Midi,
    Kern,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Opening symbols, e.g. "55 _ 60 _ 60 _ 62 _"
    #[arg(long, default_value = "")]
    seed: String,

    /// Lower is more conservative, higher more adventurous
    #[arg(short, long)]
    temperature: Option<f64>,

    /// Maximum number of symbols to sample
    #[arg(long)]
    steps: Option<usize>,

    /// Seed for the sampler, for reproducible melodies
    #[arg(long)]
    rng_seed: Option<u64>,

    /// Output file (default: melody.mid)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format (default: from the output extension)
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// Tempo of the written file
    #[arg(long, default_value = "120")]
    tempo: f64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let mut settings = Settings::load(cli.config.as_deref())?;
    apply_paths(&mut settings, &cli.paths);

    match cli.command {
        Commands::Preprocess(args) => run_preprocess(settings, args),
        Commands::Train(args) => run_train(settings, args),
        Commands::Generate(args) => run_generate(settings, args),
    }
}

fn init_logging(verbose: u8, quiet: u8) {
    let level = if quiet > 0 {
        match quiet {
            1 => LevelFilter::Warn,
            _ => LevelFilter::Error,
        }
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();
    builder.filter_level(level);
    builder.init();
}

fn apply_paths(settings: &mut Settings, args: &PathArgs) {
    let paths = &mut settings.paths;
    if let Some(dir) = &args.dataset {
        paths.dataset_dir = dir.clone();
    }
    if let Some(dir) = &args.encoded_dir {
        paths.encoded_dir = dir.clone();
    }
    if let Some(file) = &args.corpus {
        paths.corpus_file = file.clone();
    }
    if let Some(file) = &args.vocabulary {
        paths.vocabulary_file = file.clone();
    }
    if let Some(file) = &args.model {
        paths.model_file = file.clone();
    }
}

fn run_preprocess(mut settings: Settings, args: PreprocessArgs) -> Result<()> {
    if let Some(window_len) = args.window_len {
        settings.config.window_len = window_len;
    }
    if args.no_normalize {
        settings.config.normalize_key = false;
    }

    let summary = preprocess(&settings)?;
    println!(
        "Loaded {} of {} pieces ({} skipped), corpus {} tokens, vocabulary {} symbols",
        summary.loaded, summary.found, summary.skipped, summary.corpus_len, summary.vocab_size
    );
    Ok(())
}

fn run_train(mut settings: Settings, args: TrainArgs) -> Result<()> {
    let config = &mut settings.config;
    if let Some(epochs) = args.epochs {
        config.epochs = epochs;
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(learning_rate) = args.learning_rate {
        config.learning_rate = learning_rate;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    let report = train(&settings)?;
    if let Some(last) = report.history.last() {
        println!(
            "Trained on {} examples over {} symbols: loss {:.4}, accuracy {:.3}",
            report.examples, report.vocab_size, last.loss, last.accuracy
        );
    }
    Ok(())
}

fn run_generate(mut settings: Settings, args: GenerateArgs) -> Result<()> {
    if let Some(temperature) = args.temperature {
        settings.config.temperature = temperature;
    }
    if let Some(steps) = args.steps {
        settings.config.step_budget = steps;
    }
    settings.validate()?;

    let seed = parse_tokens(&args.seed).with_context(|| format!("Invalid seed: {:?}", args.seed))?;
    let generator = MelodyGenerator::load(&settings)?;
    let options = GenerateOptions {
        temperature: settings.config.temperature,
        step_budget: settings.config.step_budget,
        rng_seed: args.rng_seed.or(settings.config.seed),
    };
    let generation = generator.generate(&seed, &options)?;
    println!("{}", join_tokens(&generation.melody));

    let output = args.output.unwrap_or_else(|| PathBuf::from("melody.mid"));
    let format = match args.format {
        Some(FormatArg::Midi) => OutputFormat::Midi,
        Some(FormatArg::Kern) => OutputFormat::Kern,
        None => OutputFormat::from_path(&output),
    };
    let events = generator.to_events(&generation.melody)?;
    save_melody(&events, &output, format, args.tempo)?;
    Ok(())
}
