use anyhow::{Context, Result};
use rayconfig::RaysConfig;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::paths;
use crate::preview;

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing();

    let config = resolve_config(&cli)?;
    if cli.print_config {
        let json = serde_json::to_string_pretty(&config)
            .context("failed to serialise resolved configuration")?;
        println!("{json}");
        return Ok(());
    }

    tracing::info!(
        origin = %config.effect.origin,
        width = config.window.width,
        height = config.window.height,
        fps = ?config.window.fps,
        "starting light rays preview"
    );
    preview::run(config)
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config(cli: &Cli) -> Result<RaysConfig> {
    let path = cli.config.clone().or_else(paths::default_config_file);
    let mut config = match &path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading configuration");
            RaysConfig::load(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?
        }
        None => RaysConfig::default(),
    };

    cli.apply_overrides(&mut config);
    config
        .validate()
        .context("command-line overrides produced an invalid configuration")?;
    Ok(config)
}
