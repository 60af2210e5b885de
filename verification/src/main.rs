mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::Cli;
use commands::Outcome;

/// Exit code when the input could not be checked at all
const EXIT_ERROR: u8 = 2;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match commands::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {:#}", err);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    // Initialize logging; RUST_LOG overrides the configured level
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("using {:?}", config.merkle);

    let stdout = std::io::stdout();
    match commands::run(cli.command, &config, &mut stdout.lock()) {
        Ok(Outcome::Done) | Ok(Outcome::Verified) => ExitCode::SUCCESS,
        Ok(Outcome::NotVerified) => ExitCode::from(1),
        Err(err) => {
            tracing::error!("{:#}", err);
            if commands::is_malformed_input(&err) {
                eprintln!("could not check, malformed input: {:#}", err);
            } else {
                eprintln!("could not check: {:#}", err);
            }
            ExitCode::from(EXIT_ERROR)
        }
    }
}
