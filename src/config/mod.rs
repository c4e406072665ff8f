use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Rounds in a 20-team season.
pub const MAX_ROUNDS: u32 = 38;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Scraper configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path prefix of in-site links, stripped from match report hrefs.
    #[serde(default = "default_site_path_prefix")]
    pub site_path_prefix: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Start year of the first season, e.g. 2005 for 2005-06.
    #[serde(default = "default_first_season")]
    pub first_season: u16,

    /// Start year of the last season, inclusive.
    #[serde(default = "default_last_season")]
    pub last_season: u16,

    #[serde(default = "default_rounds")]
    pub rounds: u32,

    /// Max in-flight match fetches per round. Unbounded when unset.
    #[serde(default)]
    pub concurrency: Option<usize>,

    #[serde(default = "default_true")]
    pub fail_fast: bool,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "https://www.legaseriea.it/it/serie-a/".to_string()
}
fn default_site_path_prefix() -> String {
    "/it/serie-a/".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    "seriea-scraper/0.1 (match report archive research)".to_string()
}
fn default_first_season() -> u16 {
    2005
}
fn default_last_season() -> u16 {
    2010
}
fn default_rounds() -> u32 {
    MAX_ROUNDS
}
fn default_true() -> bool {
    true
}
fn default_output_path() -> PathBuf {
    PathBuf::from("data.csv")
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            site_path_prefix: default_site_path_prefix(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            first_season: default_first_season(),
            last_season: default_last_season(),
            rounds: default_rounds(),
            concurrency: None,
            fail_fast: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("SERIEA").separator("__"))
            .build()
            .context("Failed to read configuration sources")?;

        let app_cfg: AppConfig = cfg
            .try_deserialize()
            .context("Invalid configuration")?;
        app_cfg.validate()?;
        Ok(app_cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let p = &self.pipeline;
        if p.first_season > p.last_season {
            bail!(
                "first_season {} is after last_season {}",
                p.first_season,
                p.last_season
            );
        }
        if p.rounds == 0 || p.rounds > MAX_ROUNDS {
            bail!("rounds must be in 1..={}, got {}", MAX_ROUNDS, p.rounds);
        }
        if p.concurrency == Some(0) {
            bail!("concurrency must be greater than 0 when set");
        }
        Ok(())
    }
}
