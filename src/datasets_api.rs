use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;

use crate::app::MetadataSource;
use crate::domain::{GenomeAccession, TaxonQuery};
use crate::error::GenofetchError;

const PAGE_SIZE: u32 = 500;

/// Client for the NCBI Datasets v2alpha REST API.
#[derive(Clone)]
pub struct DatasetsApiClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct AccessionPage {
    #[serde(default)]
    accessions: Vec<String>,
    next_page_token: Option<String>,
}

impl DatasetsApiClient {
    pub fn new() -> Result<Self, GenofetchError> {
        Self::with_base_url("https://api.ncbi.nlm.nih.gov/datasets/v2alpha".to_string())
    }

    pub fn with_base_url(base_url: String) -> Result<Self, GenofetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("genofetch/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| GenofetchError::NcbiHttp(err.to_string()))?,
        );
        if let Ok(api_key) = std::env::var("NCBI_API_KEY") {
            if !api_key.trim().is_empty() {
                headers.insert(
                    "api-key",
                    HeaderValue::from_str(api_key.trim())
                        .map_err(|err| GenofetchError::NcbiHttp(err.to_string()))?,
                );
            }
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| GenofetchError::NcbiHttp(err.to_string()))?;

        Ok(Self { client, base_url })
    }

    fn fetch_page(
        &self,
        taxon: &TaxonQuery,
        page_token: Option<&str>,
    ) -> Result<AccessionPage, GenofetchError> {
        let url = format!("{}/genome/accession", self.base_url);
        let page_size = PAGE_SIZE.to_string();
        let mut request = self.client.get(&url).query(&[
            ("filters.organism", taxon.as_str()),
            ("page_size", page_size.as_str()),
            ("filters.host", "environmental sample"),
            ("filters.assembly_level", "complete"),
        ]);
        if let Some(token) = page_token {
            request = request.query(&[("page_token", token)]);
        }

        tracing::debug!(%url, page_token, "requesting accession page");
        let response = request
            .send()
            .map_err(|err| GenofetchError::NcbiHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "NCBI request failed".to_string());
            return Err(GenofetchError::NcbiStatus { status, message });
        }
        response
            .json()
            .map_err(|err| GenofetchError::NcbiHttp(err.to_string()))
    }
}

impl MetadataSource for DatasetsApiClient {
    /// Page through the accession listing in chunks of 500 until the
    /// requested maximum is reached or a page carries no continuation
    /// token. Any non-success page aborts the whole fetch; no retries.
    fn fetch_accessions(
        &self,
        taxon: &TaxonQuery,
        max_records: u32,
    ) -> Result<Vec<GenomeAccession>, GenofetchError> {
        let max_records = max_records as usize;
        let mut accessions: Vec<GenomeAccession> = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.fetch_page(taxon, page_token.as_deref())?;
            for accession in page.accessions {
                if accessions.len() >= max_records {
                    break;
                }
                accessions.push(accession.parse()?);
            }
            match page.next_page_token {
                Some(token) if accessions.len() < max_records => page_token = Some(token),
                _ => break,
            }
        }

        Ok(accessions)
    }
}
