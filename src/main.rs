mod cli;
mod config;
mod engine;
mod export;
mod logging;
mod model;
mod orchestrator;
mod session;
mod settings;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_silent = args.silent;
    let is_non_tui = !args.is_interactive() || cfg!(not(feature = "tui"));

    let target = if is_non_tui {
        logging::LogTarget::Stderr
    } else {
        logging::LogTarget::File
    };
    if let Err(e) = logging::init(target, is_silent) {
        eprintln!("warning: {e:#}");
    }

    match cli::run(args).await {
        Ok(()) => {
            // Explicitly exit with code 0 on success, especially for non-TUI modes
            if is_non_tui {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => {
            if !is_non_tui {
                tracing::error!(error = %format!("{e:#}"), "run failed");
            }
            if is_silent {
                println!("{}", e);
                std::process::exit(1);
            } else {
                Err(e)
            }
        }
    }
}
