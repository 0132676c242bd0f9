use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::error;

use crate::cli::app::{App, Commands};
use crate::config::Config;

mod cli;
mod config;
mod logging;
mod sources;

fn main() -> ExitCode {
    let app = App::parse();
    logging::init(app.global.verbose, app.global.no_color);

    match run(app) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(app: App) -> Result<()> {
    if let Commands::Completions(arg) = &app.cmd {
        return arg.execute();
    }

    let config = Config::load(&app.global.config)?;
    match app.cmd {
        Commands::Fetch(arg) => {
            // all tasks share one thread; the scheduler interleaves their requests
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(arg.execute(config))
        }
        Commands::Merge(arg) => arg.execute(&config),
        Commands::Completions(arg) => arg.execute(),
    }
}
