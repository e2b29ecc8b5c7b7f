mod cli;
mod command;
mod error;
mod exec;
mod fetch;
mod jdk;
mod pipeline;
mod platform;
mod runner;
mod tool;
mod version;

use anyhow::{Context, Result};
use clap::Parser;

use cli::Inputs;
use pipeline::Env;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("codesign_action=info".parse().unwrap()),
        )
        .with_target(false)
        .without_time()
        .init();

    let inputs = Inputs::parse();
    let mut env = Env::from_process();

    let result = runner::run(&inputs, &mut env).await;

    // Exports and outputs recorded before a failure still reach the pipeline.
    env.flush().context("failed to write pipeline output files")?;

    if let Err(err) = result {
        tracing::error!("{err}");
        std::process::exit(1);
    }
    Ok(())
}
