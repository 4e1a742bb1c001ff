mod config;
mod description;

use crate::config::Config;
use crate::description::SceneDescription;
use anyhow::Context;
use clap::Parser;
use nviz_canvas::engine::RecordingEngine;
use nviz_canvas::settings::Settings;
use nviz_canvas::startup::start_engine;
use nviz_canvas::Scene;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Logs go to stderr; stdout carries the batch command.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if config.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
    tracing::info!(config = ?config, "Loaded configuration");

    let settings = match &config.settings {
        Some(path) => Settings::from_json_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::default(),
    };
    let description = SceneDescription::from_json_file(&config.scene)?;

    let engine = start_engine(
        || Ok(RecordingEngine::new()),
        Duration::from_millis(config.startup_timeout_ms),
    )
    .await
    .context("Display engine did not start")?;

    let mut scene = Scene::new(
        engine,
        settings,
        description.vector_info.clone(),
        (config.width, config.height),
    );
    // Loading resets the view; the description's overrides go on top.
    let report = scene.sync(&description.tree);
    for e in &report.errors {
        tracing::warn!(error = %e, "Layer not synchronized");
    }
    description.apply(&mut scene)?;
    scene.redraw();

    let cmd = scene.command_string().context("Failed to build batch command")?;
    println!("{}", cmd.trim_end());

    if let Some(path) = &config.image {
        scene.save_to_file(path)?;
    }

    if config.journal {
        for call in scene.engine().calls() {
            eprintln!("{call}");
        }
    }

    tracing::info!(
        layers = scene.registry().entries().len(),
        constants = scene.registry().constants().len(),
        "Scene exported"
    );
    Ok(())
}
