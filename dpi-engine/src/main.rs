use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use clap::Parser;
use tracing::error;

use dpi_engine::cli::Cli;
use dpi_engine::config::Config;
use dpi_engine::error::{EngineError, Result};
use dpi_engine::pipeline;
use dpi_engine::stats::Report;

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .init();

    // Stage panics surface through join handles; this catches the rest so a
    // bug still exits with the internal-error code instead of 101.
    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| run(cli)));

    let code = match outcome {
        Ok(Ok(report)) => {
            print!("{report}");
            0
        }
        Ok(Err(e)) => {
            error!(event.name = "engine.failed", error = %e, "run failed");
            e.exit_code()
        }
        Err(_) => {
            error!(event.name = "engine.panicked", "run aborted by panic");
            5
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<Report> {
    let config = Config::resolve(cli)?;
    let rules = Arc::new(config.build_rules().map_err(EngineError::Config)?);
    pipeline::run(&config, rules)
}
