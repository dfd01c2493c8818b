//! pipdeck - A terminal front-end for pip
//!
//! This is the binary entry point. All logic lives in the workspace crates.

mod cli;
mod commands;
mod json;

use clap::Parser;
use tracing::{error, info};

use crate::cli::Args;
use crate::commands::Output;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    // Log to file; the terminal belongs to the child's output
    pipdeck_core::logging::init()?;

    let project_path = commands::project_path(args.project);
    info!("Project path: {}", project_path.display());

    let output = Output { json: args.json };
    let code = match commands::execute(args.command, project_path, output).await {
        Ok(code) => code,
        Err(e) => {
            error!("Command failed: {:?}", e);
            if output.json {
                json::JsonEvent::error(format!("{:#}", e)).emit();
            } else {
                eprintln!("error: {:#}", e);
            }
            1
        }
    };

    info!("pipdeck exiting with code {}", code);
    std::process::exit(code);
}
