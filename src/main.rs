use std::fs::OpenOptions;
use std::sync::Mutex;

use clap::Parser;
use fastex::cli::commands::{Cli, Commands};
use fastex::cli::handlers;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    if let Err(e) = handlers::dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

/// The form owns the terminal, so it logs to a file. Other commands log to stderr.
fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter()));

    let result = match cli.command {
        None | Some(Commands::Label) => {
            let file = match OpenOptions::new()
                .create(true)
                .append(true)
                .open(&cli.log_file)
            {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("warning: cannot open {}: {}", cli.log_file.display(), e);
                    return;
                }
            };
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
                .with(filter)
                .try_init()
        }
        Some(_) => tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .try_init(),
    };
    if let Err(e) = result {
        eprintln!("warning: logging disabled: {}", e);
    }
}
