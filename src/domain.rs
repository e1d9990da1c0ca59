use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::GenofetchError;

/// Which metadata backend answers `fetch(query, limit)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Cli,
    Api,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Cli => write!(f, "cli"),
            Backend::Api => write!(f, "api"),
        }
    }
}

/// Identifier of one genome assembly record, e.g. `GCF_000009605.1`.
///
/// Accessions are treated as opaque upstream identifiers, but they name
/// files on disk, so anything empty or containing whitespace or a path
/// separator is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenomeAccession(String);

impl GenomeAccession {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Archive file name used inside the output directory.
    pub fn archive_name(&self) -> String {
        format!("{}.zip", self.0)
    }
}

impl fmt::Display for GenomeAccession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GenomeAccession {
    type Err = GenofetchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_string();
        let is_valid = !normalized.is_empty()
            && !normalized
                .chars()
                .any(|ch| ch.is_whitespace() || ch == '/' || ch == '\\');
        if !is_valid {
            return Err(GenofetchError::InvalidGenomeAccession(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// Taxon or organism name used to filter the upstream source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonQuery(String);

impl TaxonQuery {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaxonQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaxonQuery {
    type Err = GenofetchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_string();
        if normalized.is_empty() {
            return Err(GenofetchError::InvalidTaxonQuery(value.to_string()));
        }
        Ok(Self(normalized))
    }
}
