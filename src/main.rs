//! mcgov CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use console::style;
use mcgov::cli::{Cli, CommandDispatcher, CommandResult, TerminalSink};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is INFO
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("mcgov=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mcgov=info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    tracing::debug!("mcgov starting with args: {:?}", cli);

    let mut sink = TerminalSink::new(cli.quiet);
    let dispatcher = CommandDispatcher::new(cli.env_file.clone(), cli.lock_file());

    let result = match dispatcher.dispatch(&cli, &mut sink) {
        Ok(result) => result,
        Err(e) if e.is_busy() => {
            eprintln!("{} {}", style("Busy:").yellow().bold(), e);
            CommandResult::failure(2)
        }
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            CommandResult::failure(1)
        }
    };

    if cli.transcript {
        println!("{}", sink.log().render());
    }

    ExitCode::from(result.exit_code)
}
