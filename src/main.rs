use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::SystemTime;

use clap::{Args, Parser, Subcommand};
use instant::Instant;

use densegrid::batch::{BatchError, BatchWriter, DEFAULT_BATCH_SIZE};
use densegrid::daily::{parse_puzzle_list, select_daily_for, timestamp_millis, Difficulty};
use densegrid::{
    DictionaryIndex, DuplicateRegistry, GenerationRun, Generator, GeneratorConfig, Rank, RunMode,
    DEFAULT_STEP_BUDGET,
};

/// Dense crossword grid generator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate grids from a range of seeds
    Generate(GenerateArgs),
    /// Print the puzzle of the day from a precomputed list
    Daily(DailyArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Path to the ranked word list (`word,rank` or one word per line, most common first)
    #[arg(short, long)]
    dictionary: PathBuf,

    #[arg(long, default_value_t = 5)]
    cols: usize,

    #[arg(long, default_value_t = 5)]
    rows: usize,

    /// Only words ranked below this are used
    #[arg(short, long, default_value_t = 3000)]
    bound: Rank,

    /// First seed to try
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// Number of consecutive seeds to try
    #[arg(short = 'n', long, default_value_t = 1)]
    count: u64,

    /// Collect every grid reachable from each seed instead of stopping at the first
    #[arg(long)]
    all: bool,

    /// With --all, stop each seed after this many grids
    #[arg(long)]
    limit: Option<usize>,

    /// Maximum placements per seed
    #[arg(long, default_value_t = DEFAULT_STEP_BUDGET)]
    step_budget: u64,

    /// Write accepted grids to numbered batch files in this directory
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// File name prefix for batch files
    #[arg(long, default_value = "puzzles")]
    prefix: String,

    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Print grids one row per line instead of as flat strings
    #[arg(long)]
    render: bool,
}

#[derive(Args, Debug)]
struct DailyArgs {
    /// Batch file with the medium puzzles
    #[arg(short, long)]
    list: PathBuf,

    /// Batch file with the hard puzzles
    #[arg(long)]
    hard_list: Option<PathBuf>,

    /// Pick from the hard list
    #[arg(long, requires = "hard_list")]
    hard: bool,

    /// Milliseconds since the Unix epoch (defaults to now)
    #[arg(short, long)]
    timestamp: Option<u64>,

    /// Grid width, used to print the puzzle as rows
    #[arg(long)]
    cols: Option<usize>,
}

/// Entry point of the densegrid CLI.
///
/// Delegates to [`try_main`] and reports any error on stderr before exiting with code 1.
fn main() -> ExitCode {
    let debug_enabled = std::env::var("DENSEGRID_DEBUG").is_ok();
    densegrid::logging::init_logger(debug_enabled);

    if let Err(e) = try_main() {
        eprintln!("Error: {e}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn try_main() -> Result<(), Box<dyn Error>> {
    match Cli::parse().command {
        Command::Generate(args) => run_generate(args),
        Command::Daily(args) => run_daily(args),
    }
}

fn run_generate(args: GenerateArgs) -> Result<(), Box<dyn Error>> {
    let t_load = Instant::now();
    let dictionary = DictionaryIndex::load_from_path(&args.dictionary)?;
    log::info!("Loaded {} words in {:.3}s", dictionary.len(), t_load.elapsed().as_secs_f64());

    let config = GeneratorConfig::new(args.cols, args.rows, args.bound).with_step_budget(args.step_budget);
    let generator = Generator::new(&dictionary, config)?;
    let mut registry = DuplicateRegistry::for_config(&config);

    let mut writer = match &args.out_dir {
        Some(dir) => Some(BatchWriter::new(dir, &args.prefix, args.batch_size)?),
        None => None,
    };

    let mode = if args.all {
        RunMode::AllPerSeed { limit: args.limit }
    } else {
        RunMode::FirstPerSeed
    };
    let seeds = args.seed..args.seed.saturating_add(args.count);

    let run = GenerationRun::fold_seeds(&generator, seeds, mode, &mut registry, |puzzle| -> Result<(), BatchError> {
        if args.render {
            println!("{}\n", puzzle.render(config.cols));
        } else {
            println!("{puzzle}");
        }

        if let Some(writer) = writer.as_mut() {
            writer.push(puzzle.clone())?;
        }

        Ok(())
    })?;

    if let Some(writer) = writer {
        let paths = writer.finish()?;
        eprintln!("Wrote {} batch files", paths.len());
    }

    eprintln!(
        "{} grids from {} seeds ({} duplicates, {} inverse duplicates, {} without a solution, {} over budget)",
        run.puzzles.len(),
        run.attempts,
        run.duplicates,
        run.inverse_duplicates,
        run.no_solution,
        run.budget_exceeded
    );

    Ok(())
}

fn run_daily(args: DailyArgs) -> Result<(), Box<dyn Error>> {
    let medium_contents = std::fs::read_to_string(&args.list)?;
    let hard_contents = match &args.hard_list {
        Some(path) => std::fs::read_to_string(path)?,
        None => String::new(),
    };

    let timestamp = match args.timestamp {
        Some(timestamp) => timestamp,
        None => timestamp_millis(SystemTime::now())?,
    };
    let difficulty = if args.hard { Difficulty::Hard } else { Difficulty::Medium };

    let medium = parse_puzzle_list(&medium_contents);
    let hard = parse_puzzle_list(&hard_contents);

    let puzzle = select_daily_for(difficulty, &hard, &medium, timestamp)
        .ok_or_else(|| format!("no {difficulty:?} puzzles to choose from"))?;

    match args.cols.filter(|&cols| cols > 0) {
        Some(cols) => {
            for row in puzzle.as_bytes().chunks(cols) {
                println!("{}", String::from_utf8_lossy(row));
            }
        }
        None => println!("{puzzle}"),
    }

    Ok(())
}
