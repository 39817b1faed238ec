mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{check, fmt, replay, CheckArgs, FmtArgs, ReplayArgs};

/// Gridkit CLI - check, format and replay grid layouts
#[derive(Parser, Debug)]
#[command(name = "gridkit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding gridkit.config.json (defaults to current directory)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse and validate grid files
    Check(CheckArgs),

    /// Print a grid file in canonical form
    Fmt(FmtArgs),

    /// Run a JSON action script against a grid file
    Replay(ReplayArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_dir = cli.config.unwrap_or_else(|| {
        std::env::current_dir()
            .map(|dir| dir.display().to_string())
            .unwrap_or_else(|_| ".".to_string())
    });

    let result = match cli.command {
        Command::Check(args) => check(args),
        Command::Fmt(args) => fmt(args),
        Command::Replay(args) => replay(args, &config_dir),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
