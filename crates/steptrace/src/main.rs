//! steptrace CLI - trace, step and profile the instrumented demos

mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use cli::Cli;

fn main() {
    let cli = Cli::parse();

    // Initialize metrics recorder if enabled
    let metrics_handle = if cli.metrics {
        steptrace::metrics::CliRecorder::new().install()
    } else {
        None
    };

    // Initialize metric descriptions
    steptrace::metrics::init();

    // RUST_LOG wins over the verbosity flags
    let default_level = if cli.verbose {
        "steptrace=debug"
    } else if cli.silent {
        "steptrace=error"
    } else {
        "steptrace=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = commands::run_command(&cli);

    // Print metrics summary if enabled
    if let Some(handle) = metrics_handle {
        handle.print_summary();
    }

    std::process::exit(exit_code);
}
