mod config;
mod error;
mod games;
mod logging;
mod terminal;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use config::Settings;
use error::{GameError, Result};
use games::simon::engine::Difficulty;
use games::simon::scores::{JsonScoreStore, ScoreStore};

#[derive(Parser)]
#[command(name = "simon-kb", version, about = "Keyboard casual games for the terminal")]
struct Cli
{
    /// Config file (defaults to <config dir>/simon-kb/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Where best scores and logs are kept
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command
{
    /// List available games
    List,
    /// Play Simon Says
    Simon
    {
        #[arg(long, value_enum)]
        difficulty: Option<Difficulty>,

        /// Any mistake ends the game
        #[arg(long)]
        strict: bool,
    },
    /// Show best Simon scores per difficulty
    Scores,
    /// Forget all stored Simon scores
    ResetScores,
}

fn main()
{
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()>
{
    let cli = Cli::parse();
    let settings = config::load_settings(cli.config.as_deref(), cli.data_dir.as_deref())?;
    if let Err(err) = logging::init(&settings) {
        eprintln!("Warning: logging disabled ({err}).");
    }
    info!(data_dir = %settings.data_dir.display(), "starting");

    match cli.command {
        None => interactive_menu(&settings),
        Some(Command::List) => {
            list_games();
            Ok(())
        }
        Some(Command::Simon { difficulty, strict }) => {
            let difficulty = difficulty.unwrap_or(settings.difficulty);
            games::simon::run(&settings, difficulty, strict || settings.strict)
        }
        Some(Command::Scores) => print_scores(&settings),
        Some(Command::ResetScores) => {
            let mut store = JsonScoreStore::open(&settings.data_dir)?;
            store.clear()?;
            println!("Scores cleared ({}).", store.path().display());
            Ok(())
        }
    }
}

fn run_game(name: &str, settings: &Settings) -> Result<()>
{
    match name {
        "simon" => games::simon::run(settings, settings.difficulty, settings.strict),
        _ => Err(GameError::UnknownGame(name.to_string())),
    }
}

fn interactive_menu(settings: &Settings) -> Result<()>
{
    let registry = games::registry();
    println!("KB Games");
    println!();
    println!("Select a game:");
    for (idx, game) in registry.iter().enumerate() {
        println!("  {}. {} - {}", idx + 1, game.name, game.description);
    }
    println!();
    print!("Enter number or name (default 1, q to quit): ");
    std::io::Write::flush(&mut std::io::stdout())?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    let choice = input.trim();

    if choice.is_empty() {
        return run_game(registry[0].name, settings);
    }
    if choice.eq_ignore_ascii_case("q") {
        return Ok(());
    }
    if let Ok(index) = choice.parse::<usize>() {
        if index >= 1 && index <= registry.len() {
            return run_game(registry[index - 1].name, settings);
        }
    }
    if let Some(game) = games::find(choice) {
        return run_game(game.name, settings);
    }

    Err(GameError::InvalidSelection)
}

fn list_games()
{
    println!("Available games:");
    for game in games::registry() {
        println!("  {:<10} - {}", game.name, game.description);
    }
}

fn print_scores(settings: &Settings) -> Result<()>
{
    let store = JsonScoreStore::open(&settings.data_dir)?;
    println!("Simon best rounds:");
    for difficulty in Difficulty::ALL {
        println!(
            "  {:<8} ({:>2} buttons): {}",
            difficulty.name(),
            difficulty.button_count(),
            store.best_score(difficulty)
        );
    }
    Ok(())
}
