use assert_matches::assert_matches;
use mockito::Matcher;

use genofetch::app::MetadataSource;
use genofetch::datasets_api::DatasetsApiClient;
use genofetch::domain::TaxonQuery;
use genofetch::error::GenofetchError;

fn taxon() -> TaxonQuery {
    "Halomonas".parse().unwrap()
}

#[test]
fn fetch_concatenates_pages_and_stops_without_token() {
    let mut server = mockito::Server::new();

    // Mocks are matched newest-first, so the generic first-page mock goes
    // in before the page_token-specific one.
    let first_page = server
        .mock("GET", "/genome/accession")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("filters.organism".into(), "Halomonas".into()),
            Matcher::UrlEncoded("page_size".into(), "500".into()),
            Matcher::UrlEncoded("filters.host".into(), "environmental sample".into()),
            Matcher::UrlEncoded("filters.assembly_level".into(), "complete".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"accessions":["GCF_000000001.1","GCF_000000002.1"],"next_page_token":"NEXT"}"#,
        )
        .expect(1)
        .create();
    let second_page = server
        .mock("GET", "/genome/accession")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("filters.organism".into(), "Halomonas".into()),
            Matcher::UrlEncoded("page_token".into(), "NEXT".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"accessions":["GCF_000000003.1"]}"#)
        .expect(1)
        .create();

    let client = DatasetsApiClient::with_base_url(server.url()).unwrap();
    let accessions = client.fetch_accessions(&taxon(), 1000).unwrap();

    let names: Vec<&str> = accessions.iter().map(|acc| acc.as_str()).collect();
    assert_eq!(
        names,
        vec!["GCF_000000001.1", "GCF_000000002.1", "GCF_000000003.1"]
    );
    first_page.assert();
    second_page.assert();
}

#[test]
fn fetch_stops_at_max_records() {
    let mut server = mockito::Server::new();
    let page = server
        .mock("GET", "/genome/accession")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"accessions":["GCF_1","GCF_2","GCF_3"],"next_page_token":"MORE"}"#,
        )
        .expect(1)
        .create();

    let client = DatasetsApiClient::with_base_url(server.url()).unwrap();
    let accessions = client.fetch_accessions(&taxon(), 2).unwrap();

    assert_eq!(accessions.len(), 2);
    assert_eq!(accessions[0].as_str(), "GCF_1");
    assert_eq!(accessions[1].as_str(), "GCF_2");
    // The continuation token is ignored once the maximum is reached.
    page.assert();
}

#[test]
fn fetch_fails_on_error_status_with_body() {
    let mut server = mockito::Server::new();
    let _page = server
        .mock("GET", "/genome/accession")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("upstream exploded")
        .create();

    let client = DatasetsApiClient::with_base_url(server.url()).unwrap();
    let err = client.fetch_accessions(&taxon(), 10).unwrap_err();

    assert_matches!(err, GenofetchError::NcbiStatus { status: 500, .. });
    assert!(err.to_string().contains("upstream exploded"));
}

#[test]
fn fetch_handles_empty_listing() {
    let mut server = mockito::Server::new();
    let _page = server
        .mock("GET", "/genome/accession")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{}"#)
        .create();

    let client = DatasetsApiClient::with_base_url(server.url()).unwrap();
    let accessions = client.fetch_accessions(&taxon(), 10).unwrap();
    assert!(accessions.is_empty());
}
