//! asmdiff CLI - differential validation of generated assembly

mod cli;
mod commands;
mod terminal;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;

fn main() {
    let cli = Cli::parse();

    let metrics_handle = if cli.metrics {
        asmdiff::metrics::CliRecorder::new().install()
    } else {
        None
    };
    asmdiff::metrics::init();

    let default_level = if cli.verbose {
        "asmdiff=debug"
    } else if cli.silent {
        "asmdiff=error"
    } else {
        "asmdiff=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(default_level.parse().unwrap()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = commands::run_command(&cli);

    if let Some(handle) = metrics_handle {
        println!();
        print!("{}", handle.summary());
    }

    std::process::exit(exit_code);
}
