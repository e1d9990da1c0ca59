use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::{Backend, TaxonQuery};
use crate::error::GenofetchError;

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub taxon: String,
    #[serde(default)]
    pub backend: Option<Backend>,
    #[serde(default)]
    pub max_records: Option<u32>,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub download_limit: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub taxon: TaxonQuery,
    pub backend: Backend,
    pub max_records: u32,
    pub output_dir: Utf8PathBuf,
    pub download_limit: usize,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, GenofetchError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from("genofetch.json"),
        };

        if path.is_none() && !config_path.exists() {
            return Err(GenofetchError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| GenofetchError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| GenofetchError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, GenofetchError> {
        Ok(ResolvedConfig {
            taxon: config.taxon.parse()?,
            backend: config.backend.unwrap_or(Backend::Cli),
            max_records: config.max_records.unwrap_or(default_max_records()),
            output_dir: Utf8PathBuf::from(
                config
                    .output_dir
                    .unwrap_or_else(|| default_output_dir().to_string()),
            ),
            download_limit: config.download_limit.unwrap_or(default_download_limit()),
        })
    }
}

pub fn default_max_records() -> u32 {
    10
}

pub fn default_output_dir() -> &'static str {
    "data/raw/genomes"
}

/// How many fetched accessions the driver downloads by default.
pub fn default_download_limit() -> usize {
    3
}
