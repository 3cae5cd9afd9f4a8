use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use trip_weather_core::{Config, LogContext, Pipeline};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "trip-weather", version, about = "Find the cities with the best weather for a trip")]
pub struct Cli {
    /// Config file; defaults to the platform config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch, analyze, aggregate and print the best cities.
    Run,

    /// Fetch forecasts for every city and save them as JSON.
    Fetch,

    /// Turn saved forecasts into daily statistics.
    Analyze,

    /// Aggregate daily statistics, save the table and print the best cities.
    Aggregate,

    /// List the cities and their forecast URLs.
    Cities,

    /// Write a config file with default values.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

/// Commands that run pipeline stages and therefore need logging.
#[derive(Debug, Clone, Copy)]
enum Stage {
    Run,
    Fetch,
    Analyze,
    Aggregate,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config_path = match self.config {
            Some(path) => path,
            None => Config::config_file_path()?,
        };
        let stage = match self.command {
            Command::Init { force } => return init(&config_path, force),
            Command::Cities => return list_cities(&Config::load_from(&config_path)?),
            Command::Run => Stage::Run,
            Command::Fetch => Stage::Fetch,
            Command::Analyze => Stage::Analyze,
            Command::Aggregate => Stage::Aggregate,
        };
        let config = Config::load_from(&config_path)?;

        let log = LogContext::new(&config.log_level, &config.log_file)
            .context("Failed to set up logging")?;
        let pipeline = Pipeline::new(config, log)?;
        run_stage(&pipeline, stage).await
    }
}

fn init(config_path: &Path, force: bool) -> anyhow::Result<()> {
    if config_path.exists() && !force {
        return Err(anyhow!(
            "Config file already exists: {}\n\
             Hint: pass --force to overwrite it.",
            config_path.display()
        ));
    }
    Config::default().save_to(config_path)?;
    println!("Wrote {}", config_path.display());
    Ok(())
}

fn list_cities(config: &Config) -> anyhow::Result<()> {
    let catalog = config.catalog();
    for city in catalog.cities() {
        println!("{city}\t{}", catalog.url_for(city)?);
    }
    Ok(())
}

async fn run_stage(pipeline: &Pipeline, stage: Stage) -> anyhow::Result<()> {
    match stage {
        Stage::Run => {
            let conclusion = pipeline.run().await?;
            println!("{}", conclusion.render());
        }
        Stage::Fetch => {
            let records = pipeline.fetch().await?;
            let received = records.iter().filter(|r| r.forecast.is_some()).count();
            println!("Fetched {received} of {} cities", records.len());
        }
        Stage::Analyze => {
            let summary = pipeline.analyze().await?;
            println!(
                "Analyzed {} files, {} failed",
                summary.analyzed.len(),
                summary.failed.len()
            );
        }
        Stage::Aggregate => {
            let table = pipeline.aggregate().await?;
            println!(
                "Saved {} cities to {}",
                table.len(),
                pipeline.config().aggregated_csv_path.display()
            );
            println!("{}", pipeline.conclude(&table)?.render());
        }
    }
    Ok(())
}
