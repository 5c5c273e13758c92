mod api;
mod corpus;
mod media;
mod publisher;
mod settings;

use anyhow::Context;
use api::{Config, XClient};
use publisher::{Posted, Publisher};
use settings::Settings;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const DOTENV_FILE: &str = ".env";

async fn run() -> anyhow::Result<Posted> {
    let settings = Settings::load().context("Failed to load settings")?;
    let config = Config::load(Path::new(DOTENV_FILE))
        .with_context(|| format!("Failed to read {DOTENV_FILE}"))?;
    tracing::debug!(?config, ?settings, "Starting run");

    let client = XClient::new(config, &settings).context("Failed to build X client")?;
    let mut publisher = Publisher::new(client, rand::thread_rng(), &settings);
    Ok(publisher.run().await?)
}

/// The single status line for stdout and the matching exit status.
fn report(outcome: &anyhow::Result<Posted>) -> (String, ExitCode) {
    match outcome {
        Ok(posted) => (one_line(&posted.to_string()), ExitCode::SUCCESS),
        Err(e) => (
            one_line(&format!("❌ Error posting tweet: {e:#}")),
            ExitCode::FAILURE,
        ),
    }
}

// X error bodies and TOML parse errors span several lines.
fn one_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let (line, code) = report(&run().await);
    println!("{line}");
    code
}
