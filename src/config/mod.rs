use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;

const ENV_PREFIX: &str = "PROJECT_BOARD_";

fn default_api_base_url() -> String {
    "http://localhost:8000/".to_string()
}

fn default_log_file() -> String {
    "project_board.log".to_string()
}

/// Configuration for the application
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Base URL of the REST API serving `projects/` and `tasks/`
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// File receiving diagnostic logs while the terminal UI is active
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            log_file: default_log_file(),
        }
    }
}

impl Config {
    /// Load configuration from `PROJECT_BOARD_*` environment variables
    pub fn load() -> Result<Self> {
        let config = envy::prefixed(ENV_PREFIX).from_env::<Config>()?;

        Ok(config)
    }

    /// Apply command line overrides on top of the environment
    pub fn with_overrides(mut self, base_url: Option<String>, log_file: Option<String>) -> Self {
        if let Some(base_url) = base_url {
            self.api_base_url = base_url;
        }
        if let Some(log_file) = log_file {
            self.log_file = log_file;
        }
        self
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }
}

/// Load `.env` if present, then read the configuration
pub fn init() -> Result<Config> {
    dotenv().ok();

    Config::load()
}
