use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use lorekeeper::config::{self, Config, ConfigLoadStatus};
use lorekeeper::logging;
use lorekeeper::session::{Session, TurnOutcome};
use lorekeeper::templates::{self, InitFileStatus};
use lorekeeper::validators::{validate_directory_exists, validate_session_layout};

/// Environment variable naming the default session directory.
const SESSION_ENV: &str = "LOREKEEPER_SESSION";

/// Tiered context loader and trigger router for roleplay sessions
#[derive(Parser)]
#[command(name = "lorekeeper", version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold a new session directory
    Init {
        /// Directory to create the session in
        dir: PathBuf,
    },

    /// Run one turn and print the assembled prompt
    Turn {
        /// Session directory (defaults to $LOREKEEPER_SESSION or the current directory)
        #[arg(short, long)]
        session: Option<PathBuf>,
        /// The user message
        message: String,
        /// Print a JSON summary of the turn instead of the prompt
        #[arg(long)]
        json: bool,
    },

    /// Show which entity files a message would trigger, without recording a turn
    Match {
        #[arg(short, long)]
        session: Option<PathBuf>,
        message: String,
        #[arg(long)]
        json: bool,
    },

    /// Show counters, escalated files and tracked entities
    Status {
        #[arg(short, long)]
        session: Option<PathBuf>,
    },

    /// Set the current chapter
    Chapter {
        #[arg(short, long)]
        session: Option<PathBuf>,
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        number: u32,
    },
}

/// Contract a path by replacing the home directory with `~` for display.
fn contract_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir()
        && let Ok(suffix) = path.strip_prefix(&home)
    {
        return format!("~/{}", suffix.display());
    }
    path.display().to_string()
}

/// Show `path` relative to the session root when it lives inside it.
fn relative<'a>(root: &Path, path: &'a Path) -> std::path::Display<'a> {
    path.strip_prefix(root).unwrap_or(path).display()
}

/// Pick the session directory from the flag, the environment, or the cwd.
fn resolve_session_root(flag: Option<&Path>) -> Result<PathBuf> {
    let root = match flag {
        Some(path) => path.to_path_buf(),
        None => match env::var_os(SESSION_ENV) {
            Some(path) => PathBuf::from(path),
            None => env::current_dir().context("Failed to read current directory")?,
        },
    };

    let raw = root.to_string_lossy();
    if let Some(problem) = validate_directory_exists(&raw) {
        bail!("{}: {}", root.display(), problem);
    }
    Ok(Config::expand_tilde(&raw))
}

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();

    let root = match &cli.command {
        Commands::Init { dir } => Config::expand_tilde(&dir.to_string_lossy()),
        Commands::Turn { session, .. }
        | Commands::Match { session, .. }
        | Commands::Status { session }
        | Commands::Chapter { session, .. } => resolve_session_root(session.as_deref())?,
    };

    let loaded_config = config::load_config(Some(&root));

    let logging_context = match logging::init(&loaded_config.config.logging.level) {
        Ok(ctx) => {
            logging::cleanup_old_logs(&ctx.log_directory);
            Some(ctx)
        }
        Err(e) => {
            eprintln!("Warning: Failed to initialize logging: {}", e);
            None
        }
    };

    debug!(
        config_path = %loaded_config.config_path.display(),
        session_config = ?loaded_config.session_config_path,
        status = ?loaded_config.status,
        "config_loaded"
    );
    if let ConfigLoadStatus::Error(message) = &loaded_config.status {
        eprintln!("Warning: {} (using defaults)", message);
    }

    let result = run(cli.command, &root, loaded_config.config);

    if let Some(ctx) = logging_context {
        info!(
            run_id = %ctx.run_id,
            duration_secs = start_time.elapsed().as_secs_f64(),
            ok = result.is_ok(),
            "run_end"
        );
    }

    result
}

fn run(command: Commands, root: &Path, config: Config) -> Result<()> {
    match command {
        Commands::Init { .. } => init_session(root),
        Commands::Turn { message, json, .. } => {
            let mut session = Session::open(root, config);
            let outcome = session.run_turn(&message);
            session.flush().context("Failed to save session state")?;
            print_turn(root, &outcome, json)
        }
        Commands::Match { message, json, .. } => {
            let mut session = Session::open(root, config);
            let matches = session.preview(&message);
            if json {
                println!("{}", serde_json::to_string_pretty(&matches)?);
            } else if matches.is_empty() {
                println!("No entity files triggered.");
            } else {
                for m in &matches {
                    println!(
                        "{:<20} {:<9} {:.2}  {:<30} {}",
                        m.entity,
                        m.trigger_type.label(),
                        m.confidence,
                        m.pattern,
                        relative(root, &m.path)
                    );
                }
            }
            Ok(())
        }
        Commands::Status { .. } => {
            let mut session = Session::open(root, config);
            session.refresh_entities();
            print_status(&session);
            Ok(())
        }
        Commands::Chapter { number, .. } => {
            let mut session = Session::open(root, config);
            session.set_chapter(number);
            session.flush().context("Failed to save session state")?;
            println!("Chapter set to {}", number);
            Ok(())
        }
    }
}

fn init_session(root: &Path) -> Result<()> {
    fs::create_dir_all(root)
        .with_context(|| format!("Failed to create {}", root.display()))?;

    let plan = templates::plan_init(root);
    let created = templates::create_files(root, &plan).map_err(anyhow::Error::msg)?;

    for file in &plan {
        match file.status {
            InitFileStatus::WillCreate => println!("  created  {}", file.display_path),
            InitFileStatus::Conflict => println!("  exists   {}", file.display_path),
        }
    }
    println!(
        "Initialized session at {} ({} files created)",
        contract_path(root),
        created
    );
    Ok(())
}

fn print_turn(root: &Path, outcome: &TurnOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    print!("{}", outcome.prompt.text);

    // Signals for the caller go to stderr so the prompt can be piped.
    for path in &outcome.escalated {
        eprintln!("escalated: {}", relative(root, path));
    }
    for name in &outcome.cards_due {
        eprintln!("entity card due: {}", name);
    }
    if outcome.arc_regeneration_due {
        eprintln!("story arc regeneration due (response {})", outcome.response_number);
    }
    Ok(())
}

fn print_status(session: &Session) {
    let root = session.root();
    let config = session.config();
    let state = session.state();

    println!("Session:    {}", contract_path(root));
    println!("Responses:  {}", state.response_count);
    println!("Chapter:    {}", state.chapter);

    let interval = config.tiers.periodic_interval;
    if interval == 0 {
        println!("Periodic:   disabled");
    } else {
        let next = (state.response_count / interval + 1) * interval;
        println!("Periodic:   next on response {}", next);
    }
    println!(
        "Semantic:   {}",
        if config.semantic_matching.enabled {
            config.semantic_matching.model.as_str()
        } else {
            "off"
        }
    );
    println!("Entities:   {} files", session.store().len());

    let escalated = state.history.escalated(config.escalation.threshold);
    if !escalated.is_empty() {
        println!("Escalated:");
        for path in &escalated {
            println!("  {}", relative(root, path));
        }
    }

    if !state.tracker.is_empty() {
        println!("Tracked names:");
        for (name, record) in state.tracker.iter() {
            println!(
                "  {:<20} {:>3} mentions  ch {}-{}{}",
                name,
                record.mentions,
                record.first_chapter,
                record.last_chapter,
                if record.card_created { "  card" } else { "" }
            );
        }
    }

    let problems = validate_session_layout(root, config);
    if !problems.is_empty() {
        println!("Warnings:");
        for problem in problems {
            println!("  {}", problem);
        }
    }
}
