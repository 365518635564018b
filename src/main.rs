use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use botflow::deploy::{DeployQueue, Deployer, DockerCli, InMemoryBots};
use botflow::error::describe;
use botflow::{Settings, check, compile_json, format};

/// Compile chat-bot graphs to aiogram programs and deploy them.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Settings JSON file; defaults apply to every missing field
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse and validate a bot document
    Check { bot: PathBuf },
    /// Compile a bot document to Python
    Compile {
        bot: PathBuf,
        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compile and deploy a bot with the docker backend
    Deploy { bot: PathBuf },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let settings = match load_settings(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };

    let outcome = match cli.command {
        Command::Check { bot } => run_check(&bot),
        Command::Compile { bot, output } => run_compile(&bot, output.as_deref(), &settings),
        Command::Deploy { bot } => run_deploy(&bot, settings).await,
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings, String> {
    let settings = match path {
        Some(path) => Settings::load(path).map_err(|e| format!("{}: {}", path.display(), e))?,
        None => Settings::default(),
    };
    Ok(settings.with_env_overrides())
}

fn read(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))
}

fn run_check(bot: &Path) -> Result<(), String> {
    let errors = check(&read(bot)?);
    if errors.is_empty() {
        println!("{}: ok", bot.display());
        return Ok(());
    }
    for error in &errors {
        println!("{}", error);
    }
    Err(format!("{}: {} error(s)", bot.display(), errors.len()))
}

fn run_compile(bot: &Path, output: Option<&Path>, settings: &Settings) -> Result<(), String> {
    let formatter = format::from_settings(&settings.formatter);
    let unit = compile_json(&read(bot)?, formatter.as_ref(), settings)
        .map_err(|errors| describe(&errors))?;

    match output {
        Some(path) => {
            fs::write(path, &unit.source).map_err(|e| format!("{}: {}", path.display(), e))?;
            log::info!("wrote {} handler(s) to {}", unit.handler_count, path.display());
        }
        None => print!("{}", unit.source),
    }
    Ok(())
}

async fn run_deploy(bot: &Path, settings: Settings) -> Result<(), String> {
    let document = botflow::parse::parse(&read(bot)?).map_err(|errors| describe(&errors))?;
    let bot_id = document.id;

    let store = InMemoryBots::new();
    store.insert(document);
    let backend = DockerCli::new(settings.docker_binary.clone());
    let deployer = Deployer::new(Arc::new(store), Arc::new(backend), settings);

    let queue = DeployQueue::start(Arc::new(deployer));
    let ticket = queue.submit(bot_id);
    let result = ticket.wait().await;
    queue.shutdown().await;

    let json = serde_json::to_string(&result).map_err(|e| e.to_string())?;
    println!("{}", json);
    if result.is_success() {
        Ok(())
    } else {
        Err(format!("deploy of bot {} failed", bot_id))
    }
}
