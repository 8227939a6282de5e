use crate::{sample::DEFAULT_SAMPLE_SIZE, table::DEFAULT_PAGE_SIZE};
use serde::{Deserialize, Serialize};

pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    /// Base URL of the scoring service, e.g. `http://127.0.0.1:5000/api`.
    /// None means every acquisition goes straight to demo data.
    pub scoring_url: Option<String>,
    pub request_timeout_ms: u64,
    pub page_size: usize,
    pub sample_size: usize,
    /// Master seed for demo batches.
    pub seed: u64,
    /// SQLite file for analysis history. None disables persistence.
    pub db_path: Option<String>,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            scoring_url: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            page_size: DEFAULT_PAGE_SIZE,
            sample_size: DEFAULT_SAMPLE_SIZE,
            seed: DEFAULT_SEED,
            db_path: None,
        }
    }
}

impl DeskConfig {
    /// Load from a JSON file. Missing keys take their defaults.
    /// In tests, use DeskConfig::default().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: DeskConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.page_size == 0 {
            anyhow::bail!("page_size must be positive");
        }
        if self.request_timeout_ms == 0 {
            anyhow::bail!("request_timeout_ms must be positive");
        }
        Ok(())
    }
}
