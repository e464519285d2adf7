use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use locklog::{analyze, analyze_file, print_report};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Exit status when the log shows stuck or held locks
const EXIT_ANOMALIES: u8 = 1;
/// Exit status when the log could not be read
const EXIT_ERROR: u8 = 2;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Locklog - find stuck waiters and leaked locks in lock event logs"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a lock event log
    ///
    /// Example: ./myapp 2>&1 | locklog analyze -
    Analyze {
        /// Path to the log file, or `-` to read standard input
        input: PathBuf,
        /// Print the analysis as JSON instead of the text report
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Command::Analyze { input, json } => match run_analyze(&input, json) {
            Ok(true) => ExitCode::SUCCESS,
            Ok(false) => ExitCode::from(EXIT_ANOMALIES),
            Err(err) => {
                eprintln!("Error: {err:#}");
                ExitCode::from(EXIT_ERROR)
            }
        },
    }
}

/// Analyze `input` and print the result; `Ok(true)` when the log is clean
fn run_analyze(input: &Path, json: bool) -> Result<bool> {
    let analysis = if input == Path::new("-") {
        analyze(io::stdin().lock()).context("Failed to analyze standard input")?
    } else {
        analyze_file(input)?
    };

    let mut stdout = io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut stdout, &analysis)
            .context("Failed to write JSON report")?;
        writeln!(stdout).context("Failed to write JSON report")?;
    } else {
        print_report(&mut stdout, &analysis).context("Failed to write report")?;
    }

    Ok(analysis.is_clean())
}
