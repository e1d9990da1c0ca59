use std::fs;
use std::time::Duration;

use camino::Utf8Path;
use serde::Serialize;

use crate::archive;
use crate::domain::{GenomeAccession, TaxonQuery};
use crate::error::GenofetchError;

/// Backend contract for listing accessions that match a taxon query.
///
/// Implemented by the `datasets` CLI wrapper and the Datasets HTTP API
/// client; the orchestration below does not care which one answers.
pub trait MetadataSource: Send + Sync {
    fn fetch_accessions(
        &self,
        taxon: &TaxonQuery,
        max_records: u32,
    ) -> Result<Vec<GenomeAccession>, GenofetchError>;
}

/// Contract for materializing one accession's archive on disk.
pub trait ArchiveDownloader: Send + Sync {
    fn download_archive(
        &self,
        accession: &GenomeAccession,
        destination: &Utf8Path,
    ) -> Result<(), GenofetchError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    pub taxon: String,
    pub total: usize,
    pub accessions: Vec<String>,
    pub fetched_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadResult {
    pub output_dir: String,
    pub downloaded: usize,
    pub failed: usize,
    pub items: Vec<DownloadItemResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadItemResult {
    pub accession: String,
    pub archive_path: String,
    pub status: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Clone)]
pub struct App<S: MetadataSource, D: ArchiveDownloader> {
    source: S,
    downloader: D,
}

impl<S: MetadataSource, D: ArchiveDownloader> App<S, D> {
    pub fn new(source: S, downloader: D) -> Self {
        Self { source, downloader }
    }

    /// List up to `max_records` accessions matching `taxon`, in the order
    /// the upstream source returned them.
    pub fn fetch(
        &self,
        taxon: &TaxonQuery,
        max_records: u32,
        sink: &dyn ProgressSink,
    ) -> Result<FetchResult, GenofetchError> {
        sink.event(ProgressEvent {
            message: format!("phase=Fetch; querying taxon {taxon}"),
            elapsed: None,
        });
        let start = std::time::Instant::now();
        let accessions = self.source.fetch_accessions(taxon, max_records)?;
        sink.event(ProgressEvent {
            message: format!("phase=Fetch; {} accessions", accessions.len()),
            elapsed: Some(start.elapsed()),
        });

        Ok(FetchResult {
            taxon: taxon.to_string(),
            total: accessions.len(),
            accessions: accessions
                .iter()
                .map(|acc| acc.as_str().to_string())
                .collect(),
            fetched_at: iso_timestamp(),
        })
    }

    /// Download one archive per accession into `output_dir`, sequentially.
    ///
    /// A failing accession is recorded and the loop moves on; the whole
    /// call fails only when the output directory cannot be created.
    pub fn download(
        &self,
        accessions: &[GenomeAccession],
        output_dir: &Utf8Path,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadResult, GenofetchError> {
        fs::create_dir_all(output_dir.as_std_path())
            .map_err(|err| GenofetchError::Filesystem(err.to_string()))?;

        let total = accessions.len();
        let mut items = Vec::with_capacity(total);
        for (index, accession) in accessions.iter().enumerate() {
            sink.event(ProgressEvent {
                message: format!(
                    "phase=Download; {accession} ({}/{total})",
                    index + 1
                ),
                elapsed: None,
            });
            let destination = output_dir.join(accession.archive_name());
            let start = std::time::Instant::now();
            let outcome = self.download_one(accession, &destination);
            let elapsed = start.elapsed();
            let item = match outcome {
                Ok(()) => DownloadItemResult {
                    accession: accession.as_str().to_string(),
                    archive_path: destination.to_string(),
                    status: "downloaded".to_string(),
                    error: None,
                },
                Err(err) => DownloadItemResult {
                    accession: accession.as_str().to_string(),
                    archive_path: destination.to_string(),
                    status: "failed".to_string(),
                    error: Some(err.to_string()),
                },
            };
            sink.event(ProgressEvent {
                message: format!("phase=Download; {accession} {}", item.status),
                elapsed: Some(elapsed),
            });
            items.push(item);
        }

        let downloaded = items
            .iter()
            .filter(|item| item.status == "downloaded")
            .count();
        Ok(DownloadResult {
            output_dir: output_dir.to_string(),
            downloaded,
            failed: total - downloaded,
            items,
        })
    }

    fn download_one(
        &self,
        accession: &GenomeAccession,
        destination: &Utf8Path,
    ) -> Result<(), GenofetchError> {
        self.downloader.download_archive(accession, destination)?;
        if !destination.as_std_path().exists() {
            return Err(GenofetchError::Filesystem(format!(
                "genome download missing file: {destination}"
            )));
        }
        archive::validate_zip(destination.as_std_path())
    }
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
