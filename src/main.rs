use std::io;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;

use convert_to_pdf::config::CONFIG_FILE;
use convert_to_pdf::{Config, OUTPUT_FILE, SOURCE_FILE, backend, converter};

#[derive(Parser)]
#[command(name = "convert-to-pdf")]
#[command(version)]
#[command(about = "Convert SYSTEM_ARCHITECTURE.md in the current directory to SYSTEM_ARCHITECTURE.pdf")]
struct Cli {}

fn setup_logging(level: log::LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() -> ExitCode {
    let _cli = Cli::parse();

    let config = match Config::load(Path::new(CONFIG_FILE)) {
        Ok(config) => {
            setup_logging(config.log.level_filter());
            config
        }
        Err(e) => {
            let config = Config::compiled_default();
            setup_logging(config.log.level_filter());
            log::warn!("Ignoring {}: {}", CONFIG_FILE, e);
            config
        }
    };

    let capability = backend::resolve(&config.renderer);
    let outcome = converter::run(
        capability,
        Path::new(SOURCE_FILE),
        Path::new(OUTPUT_FILE),
        &mut io::stdout(),
    );

    if let Err(e) = outcome.report(&mut io::stdout(), &mut io::stderr()) {
        log::error!("Could not print result: {}", e);
    }
    ExitCode::from(outcome.exit_code())
}
