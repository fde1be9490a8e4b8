//! Command-line driver: `tclc lower` runs Project 1 (parse + print),
//! `tclc differentiate` runs Project 2 (symbolic gradient generation).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tclc::config::Config;

#[derive(Parser)]
#[command(name = "tclc", about = "Tensor computation language compiler toolchain")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to a TOML config file, merged over the built-in defaults.
    #[arg(long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Parse and lower each case's kernel to C.
    Lower {
        #[arg(long)]
        cases_dir: Option<PathBuf>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Symbolically differentiate each case's forward kernel.
    Differentiate {
        #[arg(long)]
        cases_dir: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.config.as_deref().map_or_else(Config::load, Config::from_file) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("config error: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.logging.level);

    let result = match cli.command {
        Command::Lower { cases_dir, out_dir } => {
            let cases_dir = cases_dir.unwrap_or(config.cases.cases_dir.clone());
            let out_dir = out_dir.unwrap_or(config.cases.output_dir.clone());
            tclc::driver::run_lower(&cases_dir, &out_dir, config.cases.case_count, &config.cases.skip)
        }
        Command::Differentiate { cases_dir } => {
            let cases_dir = cases_dir.unwrap_or(config.cases.cases_dir.clone());
            tclc::driver::run_differentiate(&cases_dir, config.cases.case_count, &config.cases.skip)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
