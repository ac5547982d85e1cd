mod apply_cmd;
mod cli;
mod detect_cmd;
mod fields_cmd;
mod fill_cmd;
mod page_range;
mod shared;

use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = match cli.command {
        cli::Commands::Detect {
            ref manifest,
            ref pages,
            ref output,
            ref settings,
        } => detect_cmd::run(manifest, pages.as_ref(), output.as_deref(), settings),
        cli::Commands::Apply {
            ref file,
            ref blueprint,
            ref output,
        } => apply_cmd::run(file, blueprint, output),
        cli::Commands::Fill {
            ref file,
            ref values,
            ref output,
        } => fill_cmd::run(file, values, output),
        cli::Commands::Fields {
            ref file,
            ref format,
        } => fields_cmd::run(file, format),
    };

    if let Err(code) = result {
        std::process::exit(code);
    }
}
