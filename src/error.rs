use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum GenofetchError {
    #[error("invalid genome accession: {0}")]
    InvalidGenomeAccession(String),

    #[error("invalid taxon query: {0}")]
    InvalidTaxonQuery(String),

    #[error("missing config file genofetch.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("datasets command failed: {0}")]
    DatasetsCli(String),

    #[error("failed to parse genome summary output: {0}")]
    SummaryParse(String),

    #[error("NCBI request failed: {0}")]
    NcbiHttp(String),

    #[error("NCBI returned status {status}: {message}")]
    NcbiStatus { status: u16, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("required tool not found: {0}")]
    MissingTool(String),
}
