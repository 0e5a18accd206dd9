// Configuration: built-in defaults, then environment (and .env), then command line
use chrono_tz::Tz;
use clap::Parser;
use geo::Point;
use log::debug;
use std::path::PathBuf;
use std::time::Duration;

use crate::nta_models::{NTAError, Result};

/// Live subway arrivals for one station, grouped by direction.
#[derive(Debug, Default, Parser)]
#[command(name = "nta", version, about)]
pub struct CliArgs {
    /// Station to open (dataset id, e.g. "city-hall")
    #[arg(short, long)]
    pub station: Option<String>,

    /// Search text used to pick a station when no id is given
    #[arg(short = 'q', long)]
    pub search: Option<String>,

    /// Display language: ko, en, ja, zh
    #[arg(short, long)]
    pub lang: Option<String>,

    /// Deep link of the form "/<lang>/<search text>" (a leading '#' is ignored)
    #[arg(long)]
    pub link: Option<String>,

    /// Bias station search by proximity, as "LAT,LON"
    #[arg(long)]
    pub near: Option<String>,

    /// Feed base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Station dataset JSON replacing the bundled one
    #[arg(long)]
    pub stations: Option<PathBuf>,

    /// Session file (last search and language)
    #[arg(long)]
    pub storage: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub request_timeout: Duration,
    pub arrivals_interval: Duration,
    pub congestion_interval: Duration,
    pub clock_interval: Duration,
    pub supported_lines: Vec<String>,
    pub feed_tz: Tz,
    pub storage_path: PathBuf,
    pub stations_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: Self::BASE_URL.to_string(),
            request_timeout: Duration::from_secs(Self::REQUEST_TIMEOUT_SECS),
            arrivals_interval: Duration::from_secs(Self::ARRIVALS_INTERVAL_SECS),
            congestion_interval: Duration::from_secs(Self::CONGESTION_INTERVAL_SECS),
            clock_interval: Duration::from_secs(1),
            supported_lines: Self::SUPPORTED_LINES.iter().map(|l| l.to_string()).collect(),
            feed_tz: chrono_tz::Asia::Seoul,
            storage_path: Self::default_storage_path(),
            stations_path: None,
        }
    }
}

impl Config {
    const BASE_URL: &'static str = "http://localhost:8787";
    const REQUEST_TIMEOUT_SECS: u64 = 15;
    const ARRIVALS_INTERVAL_SECS: u64 = 30;
    const CONGESTION_INTERVAL_SECS: u64 = 20;
    const SUPPORTED_LINES: [&'static str; 9] = ["1", "2", "3", "4", "5", "6", "7", "8", "9"];

    pub fn default_storage_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("nta");
        path.push("session.json");
        path
    }

    /// Defaults overridden by `NTA_*` variables; `.env` is read first when present.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("Loaded environment from {:?}", path);
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(url) = lookup("NTA_BASE_URL") {
            config.base_url = url;
        }
        if let Some(secs) = lookup("NTA_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = parse_secs("NTA_REQUEST_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = lookup("NTA_ARRIVALS_INTERVAL_SECS") {
            config.arrivals_interval = parse_secs("NTA_ARRIVALS_INTERVAL_SECS", &secs)?;
        }
        if let Some(secs) = lookup("NTA_CONGESTION_INTERVAL_SECS") {
            config.congestion_interval = parse_secs("NTA_CONGESTION_INTERVAL_SECS", &secs)?;
        }
        if let Some(lines) = lookup("NTA_SUPPORTED_LINES") {
            config.supported_lines = lines
                .split(',')
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(tz) = lookup("NTA_FEED_TZ") {
            config.feed_tz = tz
                .parse()
                .map_err(|e| NTAError::ParseError(format!("NTA_FEED_TZ: {}", e)))?;
        }
        if let Some(path) = lookup("NTA_STORAGE") {
            config.storage_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("NTA_STATIONS") {
            config.stations_path = Some(PathBuf::from(path));
        }

        Ok(config)
    }

    /// Command-line flags win over everything else.
    pub fn apply_cli(mut self, cli: &CliArgs) -> Self {
        if let Some(url) = &cli.base_url {
            self.base_url = url.clone();
        }
        if let Some(path) = &cli.stations {
            self.stations_path = Some(path.clone());
        }
        if let Some(path) = &cli.storage {
            self.storage_path = path.clone();
        }
        self
    }
}

fn parse_secs(key: &str, value: &str) -> Result<Duration> {
    let secs: u64 = value
        .trim()
        .parse()
        .map_err(|e| NTAError::ParseError(format!("{}: '{}' is not a number of seconds ({})", key, value, e)))?;
    if secs == 0 {
        return Err(NTAError::ParseError(format!("{}: must be at least 1 second", key)));
    }
    Ok(Duration::from_secs(secs))
}

/// Parses "LAT,LON" into a point (x = longitude, y = latitude).
pub fn parse_location(text: &str) -> Result<Point<f64>> {
    let invalid = || NTAError::ParseError(format!("Expected \"LAT,LON\", got '{}'", text));
    let (lat, lon) = text.split_once(',').ok_or_else(invalid)?;
    let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
    let lon: f64 = lon.trim().parse().map_err(|_| invalid())?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(invalid());
    }
    Ok(Point::new(lon, lat))
}
