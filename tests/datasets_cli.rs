#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use assert_matches::assert_matches;

use genofetch::app::MetadataSource;
use genofetch::datasets_cli::{DatasetsCliClient, parse_summary_lines};
use genofetch::domain::TaxonQuery;
use genofetch::error::GenofetchError;

fn fake_datasets(dir: &std::path::Path, script_body: &str) -> PathBuf {
    let path = dir.join("datasets");
    fs::write(&path, format!("#!/bin/sh\n{script_body}")).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

#[test]
fn fetch_returns_all_accessions_in_order() {
    let temp = tempfile::tempdir().unwrap();
    let script = fake_datasets(
        temp.path(),
        concat!(
            "printf '%s\\n' '{\"accession\":\"GCF_000009605.1\"}'\n",
            "printf '%s\\n' '{\"accession\":\"GCF_000236765.1\"}'\n",
            "printf '%s\\n' '{\"accession\":\"GCA_000731455.1\"}'\n",
        ),
    );

    let client = DatasetsCliClient::with_binary(script);
    let taxon: TaxonQuery = "Halomonas".parse().unwrap();
    let accessions = client.fetch_accessions(&taxon, 3).unwrap();

    let names: Vec<&str> = accessions.iter().map(|acc| acc.as_str()).collect();
    assert_eq!(
        names,
        vec!["GCF_000009605.1", "GCF_000236765.1", "GCA_000731455.1"]
    );
}

#[test]
fn fetch_skips_records_without_accession() {
    let temp = tempfile::tempdir().unwrap();
    let script = fake_datasets(
        temp.path(),
        concat!(
            "printf '%s\\n' '{\"organism\":{\"tax_id\":28256}}'\n",
            "printf '%s\\n' '{\"accession\":\"GCF_000236765.1\"}'\n",
        ),
    );

    let client = DatasetsCliClient::with_binary(script);
    let taxon: TaxonQuery = "Halomonas".parse().unwrap();
    let accessions = client.fetch_accessions(&taxon, 10).unwrap();

    assert_eq!(accessions.len(), 1);
    assert_eq!(accessions[0].as_str(), "GCF_000236765.1");
}

#[test]
fn fetch_surfaces_tool_stderr_on_failure() {
    let temp = tempfile::tempdir().unwrap();
    let script = fake_datasets(
        temp.path(),
        "echo 'Error: taxon not recognized' >&2\nexit 1\n",
    );

    let client = DatasetsCliClient::with_binary(script);
    let taxon: TaxonQuery = "no-such-taxon".parse().unwrap();
    let err = client.fetch_accessions(&taxon, 5).unwrap_err();

    assert_matches!(err, GenofetchError::DatasetsCli(_));
    assert!(err.to_string().contains("taxon not recognized"));
}

#[test]
fn fetch_fails_on_malformed_summary_line() {
    let temp = tempfile::tempdir().unwrap();
    let script = fake_datasets(temp.path(), "printf '%s\\n' '{not json'\n");

    let client = DatasetsCliClient::with_binary(script);
    let taxon: TaxonQuery = "Halomonas".parse().unwrap();
    let err = client.fetch_accessions(&taxon, 5).unwrap_err();

    assert_matches!(err, GenofetchError::SummaryParse(_));
}

#[test]
fn missing_tool_is_reported() {
    let client = DatasetsCliClient::with_binary(PathBuf::from("/nonexistent/datasets"));
    let taxon: TaxonQuery = "Halomonas".parse().unwrap();
    // Spawning a nonexistent binary fails at execution time.
    let err = client.fetch_accessions(&taxon, 1).unwrap_err();
    assert_matches!(err, GenofetchError::DatasetsCli(_));
}

#[test]
fn parse_summary_rejects_invalid_json() {
    let err = parse_summary_lines("{\"accession\":\"GCF_1\"}\nnot-json\n").unwrap_err();
    assert_matches!(err, GenofetchError::SummaryParse(_));
}
