use anyhow::{Context, Result, anyhow};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use inquire::{Select, Text};
use respira_core::{
    Config, Dashboard, Location, LocationRegistry, SourceKind, history::simulated_week,
};
use tracing::info;

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "respira", version, about = "Air quality for the Monterrey metro area")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct Target {
    /// Location id or name; defaults to the configured location.
    #[arg(long, short)]
    location: Option<String>,

    /// Data source override: "live" or "simulated".
    #[arg(long)]
    source: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List known monitoring locations.
    Locations,

    /// Show current air quality, served from cache when fresh.
    Show(Target),

    /// Show current air quality, always fetching from the source.
    Refresh(Target),

    /// Keep printing updates until interrupted.
    Watch(Target),

    /// Show a simulated 7-day history.
    History {
        #[arg(long, short)]
        location: Option<String>,
    },

    /// Interactively choose source, endpoint and default location.
    Configure,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let registry = LocationRegistry::monterrey();

        match self.command {
            Command::Locations => {
                render::locations(&registry);
            }
            Command::Show(target) => {
                let config = load_config(&target, &registry)?;
                let dashboard = Dashboard::from_config(&config, registry)?;
                dashboard.initialize().await;
                render::state(&dashboard.state(), &config.alerts);
            }
            Command::Refresh(target) => {
                let config = load_config(&target, &registry)?;
                let dashboard = Dashboard::from_config(&config, registry)?;
                dashboard.refresh().await;
                render::state(&dashboard.state(), &config.alerts);
            }
            Command::Watch(target) => {
                let config = load_config(&target, &registry)?;
                watch(config, registry).await?;
            }
            Command::History { location } => {
                let loc = match location {
                    Some(sel) => resolve(&registry, &sel)?.clone(),
                    None => registry.default_location().clone(),
                };
                let today = Local::now().date_naive();
                let week = simulated_week(today);
                render::history(&loc, &week);
            }
            Command::Configure => {
                configure(&registry)?;
            }
        }

        Ok(())
    }
}

fn load_config(target: &Target, registry: &LocationRegistry) -> Result<Config> {
    let mut config = Config::load()?;
    apply_target(&mut config, target, registry)?;

    info!(
        source = %config.source_kind(),
        location = ?config.default_location,
        "configuration loaded"
    );
    Ok(config)
}

/// Fold per-command overrides into the loaded config. The dashboard then
/// starts on the requested location without loading anything else first.
fn apply_target(config: &mut Config, target: &Target, registry: &LocationRegistry) -> Result<()> {
    if let Some(source) = &target.source {
        config.set_source(SourceKind::try_from(source.as_str())?);
    }
    if let Some(selector) = &target.location {
        config.default_location = Some(resolve(registry, selector)?.id);
    }
    Ok(())
}

fn resolve<'a>(registry: &'a LocationRegistry, selector: &str) -> Result<&'a Location> {
    registry.resolve(selector).ok_or_else(|| {
        anyhow!(
            "Unknown location '{selector}'.\n\
             Hint: run `respira locations` to list ids and names."
        )
    })
}

async fn watch(config: Config, registry: LocationRegistry) -> Result<()> {
    let mut dashboard = Dashboard::from_config(&config, registry)?;
    let mut updates = dashboard.subscribe();

    dashboard.initialize().await;
    render::state(&updates.borrow_and_update(), &config.alerts);

    dashboard.start_auto_refresh(config.refresh_interval());
    println!(
        "Refreshing every {} s. Press Ctrl-C to stop.",
        config.refresh_interval().as_secs()
    );

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                if !state.loading {
                    render::state(&state, &config.alerts);
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                info!("interrupted, stopping auto refresh");
                break;
            }
        }
    }

    dashboard.stop_auto_refresh();
    Ok(())
}

fn configure(registry: &LocationRegistry) -> Result<()> {
    let mut config = Config::load()?;

    let sources: Vec<&str> = SourceKind::all().iter().map(|s| s.as_str()).collect();
    let current = config.source_kind().as_str();
    let cursor = sources.iter().position(|s| *s == current).unwrap_or(0);

    let source = Select::new("Data source:", sources)
        .with_starting_cursor(cursor)
        .prompt()?;
    config.set_source(SourceKind::try_from(source)?);

    if config.source_kind() == SourceKind::Live {
        let endpoint = Text::new("Endpoint URL:")
            .with_default(config.endpoint())
            .prompt()?;
        config.endpoint = Some(endpoint.trim().to_string()).filter(|e| !e.is_empty());
    }

    let names: Vec<String> = registry
        .iter()
        .map(|l| format!("{:>2}  {}", l.id, l.name))
        .collect();
    let start = config
        .default_location
        .and_then(|id| registry.iter().position(|l| l.id == id))
        .unwrap_or(0);
    let picked = Select::new("Default location:", names.clone())
        .with_starting_cursor(start)
        .prompt()?;
    let index = names.iter().position(|n| *n == picked).unwrap_or(0);
    config.default_location = registry.as_slice().get(index).map(|l| l.id);

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}
