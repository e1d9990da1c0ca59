use std::path::{Path, PathBuf};
use std::process::Command;

use camino::Utf8Path;
use serde::Serialize;
use serde_json::Value;

use crate::app::{ArchiveDownloader, MetadataSource};
use crate::domain::{GenomeAccession, TaxonQuery};
use crate::error::GenofetchError;

#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub datasets: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ToolStatus {
    Ready,
    Missing { message: String },
}

/// Wrapper around the NCBI `datasets` command-line tool.
///
/// Serves both halves of the contract: genome summaries as line-delimited
/// JSON, and per-accession archive downloads.
#[derive(Clone)]
pub struct DatasetsCliClient {
    datasets: Option<PathBuf>,
}

impl DatasetsCliClient {
    pub fn new() -> Self {
        Self {
            datasets: find_in_path("datasets"),
        }
    }

    /// Use an explicit binary instead of searching PATH.
    pub fn with_binary(path: PathBuf) -> Self {
        Self {
            datasets: Some(path),
        }
    }

    pub fn tool_status(&self) -> ToolStatus {
        if self.datasets.is_none() {
            return ToolStatus::Missing {
                message: "missing datasets (NCBI Datasets CLI)".to_string(),
            };
        }
        ToolStatus::Ready
    }

    pub fn tool_info(&self) -> ToolInfo {
        ToolInfo {
            datasets: self
                .datasets
                .as_ref()
                .and_then(|path| tool_version(path, &["--version"])),
        }
    }

    fn require_datasets(&self) -> Result<&PathBuf, GenofetchError> {
        self.datasets
            .as_ref()
            .ok_or_else(|| GenofetchError::MissingTool("datasets".to_string()))
    }

    fn run_capture(&self, args: &[String]) -> Result<String, GenofetchError> {
        let program = self.require_datasets()?;
        tracing::debug!(command = %program.display(), ?args, "running datasets");
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|err| GenofetchError::DatasetsCli(err.to_string()))?;
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).to_string());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            format!("command failed: {}", program.display())
        } else {
            stderr
        };
        Err(GenofetchError::DatasetsCli(message))
    }
}

impl Default for DatasetsCliClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataSource for DatasetsCliClient {
    fn fetch_accessions(
        &self,
        taxon: &TaxonQuery,
        max_records: u32,
    ) -> Result<Vec<GenomeAccession>, GenofetchError> {
        let args = vec![
            "summary".to_string(),
            "genome".to_string(),
            "taxon".to_string(),
            taxon.as_str().to_string(),
            "--limit".to_string(),
            max_records.to_string(),
            "--as-json-lines".to_string(),
        ];
        let stdout = self.run_capture(&args)?;
        parse_summary_lines(&stdout)
    }
}

impl ArchiveDownloader for DatasetsCliClient {
    fn download_archive(
        &self,
        accession: &GenomeAccession,
        destination: &Utf8Path,
    ) -> Result<(), GenofetchError> {
        let args = vec![
            "download".to_string(),
            "genome".to_string(),
            "accession".to_string(),
            accession.as_str().to_string(),
            "--include".to_string(),
            "genome".to_string(),
            "--filename".to_string(),
            destination.to_string(),
        ];
        self.run_capture(&args)?;
        Ok(())
    }
}

/// Parse `datasets summary --as-json-lines` output into accessions.
///
/// One JSON object per non-blank line; objects without an `accession`
/// field are skipped, order is preserved, a malformed line is fatal.
pub fn parse_summary_lines(stdout: &str) -> Result<Vec<GenomeAccession>, GenofetchError> {
    let mut accessions = Vec::new();
    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let entry: Value = serde_json::from_str(line)
            .map_err(|err| GenofetchError::SummaryParse(err.to_string()))?;
        if let Some(accession) = entry.get("accession").and_then(|value| value.as_str()) {
            accessions.push(accession.parse()?);
        }
    }
    Ok(accessions)
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.exists() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.exists() {
            return Some(plain);
        }
    }
    None
}

fn tool_version(path: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new(path).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if stdout.is_empty() { None } else { Some(stdout) }
}
