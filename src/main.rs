//! `parmatmul` - time one parallel matrix-multiply variant and print a CSV line.
//!
//! ```text
//! parmatmul <variant:single|collapse|blocked> <n> <BS> <repeats> [--threads T] [--check-every-repeat]
//! ```
//!
//! On success stdout carries exactly one line:
//! `variant,threads,n,block_size,mean_time_seconds,gflops,relative_error`.
//! Every failure goes to stderr with exit status 1. Set `RUST_LOG=info` (or
//! `debug`) for per-phase details on stderr.

use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use env_logger::Env;

use parmatmul::bench::{Bench, BenchConfig};
use parmatmul::report::csv_line;
use parmatmul::Result;

/// Parallel dense matrix multiplication benchmark
#[derive(Parser, Debug)]
#[command(name = "parmatmul", version, about, long_about = None)]
#[command(after_help = "Note: BS ignored unless variant=blocked; BS <= 0 selects 64")]
struct Cli {
    /// Kernel variant: single, collapse or blocked
    #[arg(value_name = "VARIANT")]
    variant: String,

    /// Matrix dimension (n x n), must be > 0
    #[arg(value_name = "N", allow_negative_numbers = true)]
    n: i64,

    /// Tile side for the blocked variant
    #[arg(value_name = "BS", allow_negative_numbers = true)]
    block_size: i64,

    /// Number of timed repeats, must be > 0
    #[arg(value_name = "REPEATS", allow_negative_numbers = true)]
    repeats: i64,

    /// Worker threads (defaults to RAYON_NUM_THREADS or the number of CPUs)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Check the relative error after every repeat and report the worst
    #[arg(long)]
    check_every_repeat: bool,
}

fn run(cli: Cli) -> Result<String> {
    let config = BenchConfig::from_args(&cli.variant, cli.n, cli.block_size, cli.repeats)?
        .with_threads(cli.threads)?
        .with_check_every_repeat(cli.check_every_repeat);
    let report = Bench::new(config)?.run()?;
    Ok(csv_line(&report))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Usage errors are rendered by clap, with the usage line.
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    match run(cli) {
        Ok(line) => {
            println!("{line}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
