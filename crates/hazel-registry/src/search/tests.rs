//! Unit tests for the search executor

use super::*;
use crate::transport::mock::MockTransport;
use hazel_core::types::SourceAuth;
use serde_json::json;

fn index_for(origin: &str) -> Value {
    json!({
        "version": "3.0.0",
        "resources": [
            {"@id": format!("{origin}/query"), "@type": "SearchQueryService/3.0.0-rc"},
            {"@id": format!("{origin}/registration/"), "@type": "RegistrationsBaseUrl/3.6.0"},
            {"@id": format!("{origin}/flat/"), "@type": "PackageBaseAddress/3.0.0"}
        ]
    })
}

fn entry(id: &str, version: &str) -> Value {
    json!({"id": id, "version": version})
}

fn executor(mock: &Arc<MockTransport>) -> SearchExecutor {
    let http = HttpPipeline::bare(mock.clone() as Arc<dyn crate::transport::Transport>);
    SearchExecutor::new(http, Arc::new(ServiceIndexResolver::new()))
}

fn source(id: &str, origin: &str) -> PackageSource {
    PackageSource::new(id, id, format!("{origin}/v3/index.json"))
}

#[tokio::test]
async fn test_query_string_construction() {
    let mock = MockTransport::new();
    mock.route_json("feed.example/v3/index.json", index_for("https://feed.example"));
    mock.route_json("feed.example/query", json!({"totalHits": 0, "data": []}));

    let options = SearchOptions {
        query: Some("json".to_string()),
        skip: Some(0),
        take: Some(20),
        prerelease: Some(false),
        sem_ver_level: None,
    };
    executor(&mock)
        .search_source(&source("a", "https://feed.example"), &options, None)
        .await
        .unwrap();

    let urls = mock.requested_urls();
    assert_eq!(urls.len(), 2);
    assert!(
        urls[1].contains("q=json&skip=0&take=20&prerelease=false&semVerLevel=2.0.0"),
        "unexpected query string: {}",
        urls[1]
    );
}

#[tokio::test]
async fn test_defaults_applied_to_empty_options() {
    let mock = MockTransport::new();
    mock.route_json("feed.example/v3/index.json", index_for("https://feed.example"));
    mock.route_json("feed.example/query", json!({"totalHits": 0, "data": []}));

    executor(&mock)
        .search_source(
            &source("a", "https://feed.example"),
            &SearchOptions::default(),
            None,
        )
        .await
        .unwrap();

    let url = &mock.requested_urls()[1];
    assert!(url.contains("q=&skip=0&take=20&prerelease=false&semVerLevel=2.0.0"));
}

#[test]
fn test_normalize_entry_defaults() {
    let result = normalize_entry(&entry("Newtonsoft.Json", "13.0.3")).unwrap();
    assert_eq!(result.id, "Newtonsoft.Json");
    assert_eq!(result.version, "13.0.3");
    assert_eq!(result.description, "");
    assert!(result.authors.is_empty());
    assert_eq!(result.total_downloads, 0);
    assert_eq!(result.icon_url, PackageSearchResult::DEFAULT_ICON_URL);
    assert!(!result.verified);
    assert!(result.tags.is_empty());
}

#[test]
fn test_normalize_entry_drops_incomplete_entries() {
    assert!(normalize_entry(&json!({"version": "1.0.0"})).is_none());
    assert!(normalize_entry(&json!({"id": "Foo"})).is_none());
    assert!(normalize_entry(&json!({"id": 42, "version": "1.0.0"})).is_none());
}

#[test]
fn test_normalize_entry_author_shapes() {
    let from_string = normalize_entry(&json!({
        "id": "Foo", "version": "1.0.0",
        "authors": "Alice, , Bob "
    }))
    .unwrap();
    assert_eq!(from_string.authors, vec!["Alice", "Bob"]);

    let from_array = normalize_entry(&json!({
        "id": "Foo", "version": "1.0.0",
        "authors": ["Alice", "Bob"]
    }))
    .unwrap();
    assert_eq!(from_array.authors, vec!["Alice", "Bob"]);
}

#[test]
fn test_normalize_entry_tags_drop_non_strings() {
    let result = normalize_entry(&json!({
        "id": "Foo", "version": "1.0.0",
        "tags": ["json", 42, "net", null]
    }))
    .unwrap();
    assert_eq!(result.tags, vec!["json", "net"]);
}

#[test]
fn test_normalize_entry_full() {
    let result = normalize_entry(&json!({
        "id": "Serilog",
        "version": "3.1.1",
        "description": "Simple .NET logging",
        "authors": ["Serilog Contributors"],
        "totalDownloads": 1_500_000_000u64,
        "iconUrl": "https://serilog.net/img/serilog.png",
        "verified": true,
        "tags": ["serilog", "logging"]
    }))
    .unwrap();
    assert_eq!(result.total_downloads, 1_500_000_000);
    assert!(result.verified);
    assert_eq!(result.icon_url, "https://serilog.net/img/serilog.png");
}

#[tokio::test]
async fn test_multi_source_dedup_keeps_highest_version() {
    let mock = MockTransport::new();
    mock.route_json("one.example/v3/index.json", index_for("https://one.example"));
    mock.route_json("two.example/v3/index.json", index_for("https://two.example"));
    mock.route_json(
        "one.example/query",
        json!({"data": [entry("Foo", "1.0.0"), entry("Bar", "2.0.0")]}),
    );
    mock.route_json("two.example/query", json!({"data": [entry("FOO", "1.2.0")]}));

    let sources = vec![
        source("one", "https://one.example"),
        source("two", "https://two.example"),
    ];
    let results = executor(&mock)
        .search_all(&sources, &SearchOptions::default(), None)
        .await
        .unwrap();

    // One entry per case-insensitive id, highest version wins
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, "FOO");
    assert_eq!(results[0].version, "1.2.0");
    assert_eq!(results[1].id, "Bar");
}

#[tokio::test]
async fn test_failed_source_does_not_poison_merge() {
    let mock = MockTransport::new();
    mock.route("one.example/v3/index.json", Err(HazelError::api(500, "one down")));
    mock.route_json("two.example/v3/index.json", index_for("https://two.example"));
    mock.route_json("two.example/query", json!({"data": [entry("Foo", "1.0.0")]}));

    let sources = vec![
        source("one", "https://one.example"),
        source("two", "https://two.example"),
    ];
    let results = executor(&mock)
        .search_all(&sources, &SearchOptions::default(), None)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "Foo");
}

#[tokio::test]
async fn test_all_sources_failed_surfaces_first_error() {
    let mock = MockTransport::new();
    mock.route("one.example/v3/index.json", Err(HazelError::api(500, "one down")));
    mock.route("two.example/v3/index.json", Err(HazelError::api(502, "two down")));

    let sources = vec![
        source("one", "https://one.example"),
        source("two", "https://two.example"),
    ];
    let error = executor(&mock)
        .search_all(&sources, &SearchOptions::default(), None)
        .await
        .unwrap_err();

    assert_eq!(error, HazelError::api(500, "one down"));
}

#[tokio::test]
async fn test_disabled_sources_are_skipped() {
    let mock = MockTransport::new();
    mock.route_json("one.example/v3/index.json", index_for("https://one.example"));
    mock.route_json("one.example/query", json!({"data": [entry("Foo", "1.0.0")]}));

    let sources = vec![
        source("one", "https://one.example"),
        source("two", "https://two.example").disabled(),
    ];
    let results = executor(&mock)
        .search_all(&sources, &SearchOptions::default(), None)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    // The disabled source was never contacted
    assert!(mock
        .requested_urls()
        .iter()
        .all(|url| !url.contains("two.example")));
}

#[tokio::test]
async fn test_no_enabled_sources_yields_empty_result() {
    let mock = MockTransport::new();
    let results = executor(&mock)
        .search_all(
            &[source("one", "https://one.example").disabled()],
            &SearchOptions::default(),
            None,
        )
        .await
        .unwrap();

    assert!(results.is_empty());
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_cross_origin_search_endpoint_strips_auth() {
    let mock = MockTransport::new();
    // The feed offloads search to a different origin
    mock.route_json("feed.example/v3/index.json", index_for("https://search.cdn.example"));
    mock.route_json("search.cdn.example/query", json!({"data": []}));

    let source = source("a", "https://feed.example").with_auth(SourceAuth::api_key("k1", None));
    executor(&mock)
        .search_source(&source, &SearchOptions::default(), None)
        .await
        .unwrap();

    let calls = mock.calls();
    assert_eq!(calls.len(), 2);
    // Credentials go to the feed's own origin...
    assert!(calls[0].headers.iter().any(|(name, _)| name == "X-NuGet-ApiKey"));
    // ...but never to the offloaded search host
    assert!(calls[1].headers.iter().all(|(name, _)| name == "Accept"));
}
