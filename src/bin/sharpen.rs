//! sharpen CLI binary entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sharpen::cli::run_rewrite;
use sharpen::output::error_json;

/// Source rewriter for C# codebases: explicit variable types and API
/// controller annotations.
#[derive(Parser)]
#[command(name = "sharpen")]
#[command(version, about, long_about = None)]
struct Cli {
    /// File or directory to rewrite (default: current directory)
    path: Option<PathBuf>,

    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let path = cli.path.unwrap_or_else(|| PathBuf::from("."));

    match run_rewrite(&path) {
        Ok(report) => match report.to_json() {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}", error_json(&e));
                ExitCode::from(e.error_code().code())
            }
        },
        Err(e) => {
            eprintln!("{}", error_json(&e));
            ExitCode::from(e.error_code().code())
        }
    }
}
