use async_trait::async_trait;
use serde::Deserialize;
use std::{
    fmt::Debug,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{process::Command, task::JoinSet};
use tracing::{debug, error, info, instrument::WithSubscriber};

use crate::{
    config::{AnalyzerConfig, AnalyzerKind},
    error::AnalyzeError,
    model::{DailyStatsDocument, DayEntry},
    stats::{mean_present, round_to},
};

/// Daytime window, inclusive.
const DAY_HOURS_START: u32 = 9;
const DAY_HOURS_END: u32 = 19;
const DRY_CONDITIONS: &[&str] = &["clear", "partly-cloudy", "cloudy", "overcast"];

/// Turns one forecast file into one daily statistics file.
#[async_trait]
pub trait Analyzer: Send + Sync + Debug {
    async fn analyze(&self, input: &Path, output: &Path) -> Result<(), AnalyzeError>;
}

pub fn analyzer_from_config(config: &AnalyzerConfig) -> Arc<dyn Analyzer> {
    match config.kind {
        AnalyzerKind::Builtin => Arc::new(BuiltinAnalyzer),
        AnalyzerKind::Command => {
            Arc::new(CommandAnalyzer::new(config.program.clone(), config.args.clone()))
        }
    }
}

/// Runs `program args... -i <input> -o <output>`.
#[derive(Debug, Clone)]
pub struct CommandAnalyzer {
    program: String,
    args: Vec<String>,
}

impl CommandAnalyzer {
    pub fn new(program: String, args: Vec<String>) -> Self {
        Self { program, args }
    }
}

#[async_trait]
impl Analyzer for CommandAnalyzer {
    async fn analyze(&self, input: &Path, output: &Path) -> Result<(), AnalyzeError> {
        let out = Command::new(&self.program)
            .args(&self.args)
            .arg("-i")
            .arg(input)
            .arg("-o")
            .arg(output)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| AnalyzeError::Io { path: PathBuf::from(&self.program), source })?;

        if !out.status.success() {
            return Err(AnalyzeError::Command {
                code: out.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

/// Native daily statistics: mean daytime temperature and dry daytime hours.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinAnalyzer;

#[derive(Debug, Deserialize)]
struct Forecast {
    #[serde(default)]
    forecasts: Vec<ForecastDay>,
}

#[derive(Debug, Deserialize)]
struct ForecastDay {
    date: String,
    #[serde(default)]
    hours: Vec<ForecastHour>,
}

#[derive(Debug, Deserialize)]
struct ForecastHour {
    hour: HourOfDay,
    temp: f64,
    condition: String,
}

/// The forecast source sends hours as strings, older dumps as numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HourOfDay {
    Number(u32),
    Text(String),
}

impl HourOfDay {
    fn value(&self) -> Option<u32> {
        match self {
            HourOfDay::Number(h) => Some(*h),
            HourOfDay::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl BuiltinAnalyzer {
    fn analyze_day(day: &ForecastDay) -> DayEntry {
        let daytime: Vec<(u32, &ForecastHour)> = day
            .hours
            .iter()
            .filter_map(|h| h.hour.value().map(|v| (v, h)))
            .filter(|(v, _)| (DAY_HOURS_START..=DAY_HOURS_END).contains(v))
            .collect();

        if daytime.is_empty() {
            return DayEntry {
                date: day.date.clone(),
                hours_start: None,
                hours_end: None,
                hours_count: 0,
                temp_avg: None,
                precipitation_free_hours: None,
            };
        }

        let temp_avg = mean_present(daytime.iter().map(|(_, h)| Some(h.temp)))
            .map(|mean| round_to(mean, 3));
        let dry = daytime
            .iter()
            .filter(|(_, h)| DRY_CONDITIONS.contains(&h.condition.as_str()))
            .count();

        DayEntry {
            date: day.date.clone(),
            hours_start: daytime.iter().map(|(v, _)| *v).min(),
            hours_end: daytime.iter().map(|(v, _)| *v).max(),
            hours_count: daytime.len() as u32,
            temp_avg,
            precipitation_free_hours: Some(dry as f64),
        }
    }

    pub fn analyze_forecast(
        &self,
        forecast: &serde_json::Value,
    ) -> Result<DailyStatsDocument, serde_json::Error> {
        let forecast = Forecast::deserialize(forecast)?;
        Ok(DailyStatsDocument { days: forecast.forecasts.iter().map(Self::analyze_day).collect() })
    }
}

#[async_trait]
impl Analyzer for BuiltinAnalyzer {
    async fn analyze(&self, input: &Path, output: &Path) -> Result<(), AnalyzeError> {
        let raw = tokio::fs::read(input)
            .await
            .map_err(|source| AnalyzeError::Io { path: input.to_path_buf(), source })?;

        let invalid = |source| AnalyzeError::InvalidForecast { path: input.to_path_buf(), source };
        let forecast: serde_json::Value = serde_json::from_slice(&raw).map_err(invalid)?;
        let document = self.analyze_forecast(&forecast).map_err(invalid)?;
        let body = serde_json::to_vec_pretty(&document).map_err(invalid)?;

        tokio::fs::write(output, body)
            .await
            .map_err(|source| AnalyzeError::Io { path: output.to_path_buf(), source })
    }
}

/// Outcome of one analysis pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalyzeSummary {
    pub analyzed: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

/// `*.json` files of `dir`, sorted by file name.
pub async fn json_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Delete the `*.json` files of `dir`. A missing directory counts as empty.
pub async fn remove_json_files(dir: &Path) -> std::io::Result<usize> {
    let files = match json_files(dir).await {
        Ok(files) => files,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(err) => return Err(err),
    };
    for file in &files {
        tokio::fs::remove_file(file).await?;
    }
    Ok(files.len())
}

/// Analyze every forecast of `input_dir` into `output_dir`, one task per file.
///
/// Earlier outputs are removed first, so a failing file is logged, skipped and
/// leaves nothing behind in `output_dir`.
pub async fn analyze_dir(
    analyzer: Arc<dyn Analyzer>,
    input_dir: &Path,
    output_dir: &Path,
) -> Result<AnalyzeSummary, AnalyzeError> {
    info!(input = %input_dir.display(), output = %output_dir.display(), "Analyzing weather data...");

    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|source| AnalyzeError::Io { path: output_dir.to_path_buf(), source })?;
    remove_json_files(output_dir)
        .await
        .map_err(|source| AnalyzeError::Io { path: output_dir.to_path_buf(), source })?;
    let inputs = json_files(input_dir)
        .await
        .map_err(|source| AnalyzeError::Io { path: input_dir.to_path_buf(), source })?;

    let mut set = JoinSet::new();
    for input in inputs {
        let Some(name) = input.file_name() else { continue };
        let output = output_dir.join(name);
        let analyzer = Arc::clone(&analyzer);
        set.spawn(
            async move {
                let result = analyzer.analyze(&input, &output).await;
                (input, result)
            }
            .with_current_subscriber(),
        );
    }

    let mut summary = AnalyzeSummary::default();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((input, Ok(()))) => {
                debug!(file = %input.display(), "Analyzed");
                summary.analyzed.push(input);
            }
            Ok((input, Err(err))) => {
                error!(file = %input.display(), "{err}");
                summary.failed.push(input);
            }
            Err(err) => error!(error = %err, "Analyze task failed"),
        }
    }
    summary.analyzed.sort();
    summary.failed.sort();

    info!(analyzed = summary.analyzed.len(), failed = summary.failed.len(), "Analysis finished");
    Ok(summary)
}
