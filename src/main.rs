//! gradesql CLI entry point.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "gradesql",
    version,
    about = "Ask a student-grades table questions in plain English"
)]
struct Cli {
    /// Path to gradesql.yaml
    #[arg(short, long, global = true, default_value = "gradesql.yaml")]
    config: PathBuf,

    /// Database path (overrides the config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: gradesql::cli::Commands,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let opts = gradesql::cli::GlobalOpts {
        config: cli.config,
        db: cli.db,
    };
    if let Err(e) = gradesql::cli::dispatch(cli.command, &opts) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
