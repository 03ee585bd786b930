//! Unit tests for the metadata fetcher

use super::*;
use crate::transport::mock::MockTransport;
use hazel_core::types::SourceAuth;
use serde_json::json;

fn service_index() -> Value {
    json!({
        "version": "3.0.0",
        "resources": [
            {"@id": "https://feed.example/query", "@type": "SearchQueryService/3.0.0-rc"},
            {"@id": "https://feed.example/registration", "@type": "RegistrationsBaseUrl/3.6.0"},
            {"@id": "https://feed.example/flat/", "@type": "PackageBaseAddress/3.0.0"}
        ]
    })
}

fn leaf(id: &str, version: &str) -> Value {
    json!({
        "@id": format!("https://feed.example/registration/{}/{version}.json", id.to_lowercase()),
        "packageContent": format!("https://feed.example/flat/{}.{version}.nupkg", id.to_lowercase()),
        "catalogEntry": {"id": id, "version": version, "listed": true, "downloads": 10}
    })
}

fn source() -> PackageSource {
    PackageSource::new("test", "Test Feed", "https://feed.example/v3/index.json")
}

fn fetcher(mock: &Arc<MockTransport>) -> MetadataFetcher {
    let http = HttpPipeline::bare(mock.clone() as Arc<dyn crate::transport::Transport>);
    MetadataFetcher::new(http, Arc::new(ServiceIndexResolver::new()))
}

#[tokio::test]
async fn test_package_index_with_inline_pages() {
    let mock = MockTransport::new();
    mock.route_json("v3/index.json", service_index());
    mock.route_json(
        "registration/foo/index.json",
        json!({
            "count": 1,
            "items": [
                {"@id": "https://feed.example/registration/foo/page/0", "count": 2,
                 "items": [leaf("Foo", "1.0.0"), leaf("Foo", "2.0.0")]}
            ]
        }),
    );

    let index = fetcher(&mock)
        .package_index(&source(), "Foo", None)
        .await
        .unwrap();

    assert_eq!(index.id, "Foo");
    assert_eq!(index.count, 2);
    // Sorted descending by version precedence
    assert_eq!(index.versions[0].version, "2.0.0");
    assert_eq!(index.versions[1].version, "1.0.0");
    assert_eq!(index.versions[0].downloads, Some(10));
    assert!(index.versions[0].listed);
}

#[tokio::test]
async fn test_package_index_follows_remote_pages() {
    let mock = MockTransport::new();
    mock.route_json("v3/index.json", service_index());
    mock.route_json(
        "registration/foo/index.json",
        json!({
            "count": 2,
            "items": [
                {"@id": "https://feed.example/registration/foo/page/0", "count": 1,
                 "items": [leaf("Foo", "1.0.0")]},
                {"@id": "https://feed.example/registration/foo/page/1", "count": 1}
            ]
        }),
    );
    mock.route_json(
        "registration/foo/page/1",
        json!({"items": [leaf("Foo", "2.0.0")]}),
    );

    let index = fetcher(&mock)
        .package_index(&source(), "Foo", None)
        .await
        .unwrap();

    assert_eq!(index.count, 2);
    assert_eq!(index.versions[0].version, "2.0.0");
    // Service index + registration index + one remote page
    assert_eq!(mock.call_count(), 3);
}

#[tokio::test]
async fn test_malformed_registration_item_is_skipped() {
    let mock = MockTransport::new();
    mock.route_json("v3/index.json", service_index());
    mock.route_json(
        "registration/foo/index.json",
        json!({
            "count": 1,
            "items": [
                {"@id": "https://feed.example/registration/foo/page/0",
                 "items": [
                    leaf("Foo", "1.0.0"),
                    {"@id": "https://feed.example/registration/foo/bad.json"}
                 ]}
            ]
        }),
    );

    let index = fetcher(&mock)
        .package_index(&source(), "Foo", None)
        .await
        .unwrap();

    // The bad leaf is dropped, the listing survives
    assert_eq!(index.count, 1);
    assert_eq!(index.versions[0].version, "1.0.0");
}

#[tokio::test]
async fn test_package_index_404_maps_to_not_found() {
    let mock = MockTransport::new();
    mock.route_json("v3/index.json", service_index());
    mock.route(
        "registration/ghost/index.json",
        Err(HazelError::api(404, "missing")),
    );

    let error = fetcher(&mock)
        .package_index(&source(), "Ghost", None)
        .await
        .unwrap_err();

    assert_eq!(
        error,
        HazelError::NotFound {
            resource: "package 'Ghost'".to_string()
        }
    );
}

#[tokio::test]
async fn test_package_index_is_memoized() {
    let mock = MockTransport::new();
    mock.route_json("v3/index.json", service_index());
    mock.route_json(
        "registration/foo/index.json",
        json!({
            "count": 1,
            "items": [{"@id": "p0", "items": [leaf("Foo", "1.0.0")]}]
        }),
    );

    let fetcher = fetcher(&mock);
    fetcher.package_index(&source(), "Foo", None).await.unwrap();
    fetcher.package_index(&source(), "Foo", None).await.unwrap();

    let registration_calls = mock
        .requested_urls()
        .iter()
        .filter(|url| url.contains("registration/foo"))
        .count();
    assert_eq!(registration_calls, 1);

    // Explicit invalidation forces a refetch
    fetcher.invalidate("test", "Foo");
    fetcher.package_index(&source(), "Foo", None).await.unwrap();
    let registration_calls = mock
        .requested_urls()
        .iter()
        .filter(|url| url.contains("registration/foo"))
        .count();
    assert_eq!(registration_calls, 2);
}

#[tokio::test]
async fn test_version_details_with_inline_catalog_entry() {
    let mock = MockTransport::new();
    mock.route_json("v3/index.json", service_index());
    mock.route_json(
        "registration/foo/1.0.0.json",
        json!({
            "@id": "https://feed.example/registration/foo/1.0.0.json",
            "packageContent": "https://feed.example/flat/foo.1.0.0.nupkg",
            "catalogEntry": {
                "id": "Foo",
                "version": "1.0.0",
                "description": "A test package",
                "authors": "Alice, Bob",
                "tags": "json net tooling",
                "licenseExpression": "MIT",
                "projectUrl": "https://github.com/example/foo",
                "listed": true,
                "dependencyGroups": [
                    {"targetFramework": "netstandard2.0",
                     "dependencies": [{"id": "Newtonsoft.Json", "range": "[13.0.1, )"}]},
                    {"targetFramework": ".NETFramework4.7.2"},
                    {"dependencies": [{"id": "System.Memory", "range": "[4.5.0, )"}]}
                ],
                "deprecation": {
                    "reasons": ["Legacy", "Sunset"],
                    "message": "use Foo.Next",
                    "alternatePackage": {"id": "Foo.Next", "range": "*"}
                },
                "vulnerabilities": [
                    {"advisoryUrl": "https://github.com/advisories/GHSA-1", "severity": 2},
                    {"advisoryUrl": "https://github.com/advisories/GHSA-2", "severity": "3"},
                    {"advisoryUrl": "https://github.com/advisories/GHSA-3", "severity": 9}
                ]
            }
        }),
    );

    let details = fetcher(&mock)
        .version_details(&source(), "Foo", "1.0.0", None)
        .await
        .unwrap();

    assert_eq!(details.id, "Foo");
    assert_eq!(details.authors, vec!["Alice", "Bob"]);
    assert_eq!(details.tags, vec!["json", "net", "tooling"]);
    assert_eq!(details.license_expression.as_deref(), Some("MIT"));
    assert_eq!(
        details.content_url.as_deref(),
        Some("https://feed.example/flat/foo.1.0.0.nupkg")
    );

    // The any-framework group sorts last
    assert_eq!(details.dependency_groups.len(), 3);
    assert_eq!(details.dependency_groups[0].target_framework, "netstandard2.0");
    assert_eq!(details.dependency_groups[2].target_framework, "");
    assert_eq!(details.dependency_groups[2].dependencies[0].id, "System.Memory");

    // Unrecognized deprecation reason is dropped, not errored
    let deprecation = details.deprecation.unwrap();
    assert_eq!(deprecation.reasons, vec![DeprecationReason::Legacy]);
    assert_eq!(deprecation.alternate.unwrap().id, "Foo.Next");

    let severities: Vec<Severity> = details
        .vulnerabilities
        .iter()
        .map(|vulnerability| vulnerability.severity)
        .collect();
    assert_eq!(
        severities,
        vec![Severity::High, Severity::Critical, Severity::Low]
    );
}

#[tokio::test]
async fn test_version_details_follows_remote_catalog_entry() {
    let mock = MockTransport::new();
    mock.route_json("v3/index.json", service_index());
    mock.route_json(
        "registration/foo/1.0.0.json",
        json!({
            "@id": "https://feed.example/registration/foo/1.0.0.json",
            "packageContent": "https://feed.example/flat/foo.1.0.0.nupkg",
            "catalogEntry": "https://catalog.other.example/data/foo.1.0.0.json"
        }),
    );
    mock.route_json(
        "catalog.other.example/data/foo.1.0.0.json",
        json!({"id": "Foo", "version": "1.0.0", "description": "remote entry"}),
    );

    let source = source().with_auth(SourceAuth::api_key("secret", None));
    let details = fetcher(&mock)
        .version_details(&source, "Foo", "1.0.0", None)
        .await
        .unwrap();

    assert_eq!(details.description, "remote entry");

    // The catalog host is a different origin; credentials must not follow
    let calls = mock.calls();
    let catalog_call = calls
        .iter()
        .find(|call| call.url.contains("catalog.other.example"))
        .unwrap();
    assert!(catalog_call.headers.iter().all(|(name, _)| name == "Accept"));
}

#[tokio::test]
async fn test_version_details_404_maps_to_not_found() {
    let mock = MockTransport::new();
    mock.route_json("v3/index.json", service_index());
    mock.route(
        "registration/foo/9.9.9.json",
        Err(HazelError::api(404, "missing")),
    );

    let error = fetcher(&mock)
        .version_details(&source(), "Foo", "9.9.9", None)
        .await
        .unwrap_err();

    assert_eq!(
        error,
        HazelError::NotFound {
            resource: "package 'Foo' version '9.9.9'".to_string()
        }
    );
}

#[tokio::test]
async fn test_version_details_without_catalog_entry_is_contract_violation() {
    let mock = MockTransport::new();
    mock.route_json("v3/index.json", service_index());
    mock.route_json(
        "registration/foo/1.0.0.json",
        json!({"@id": "https://feed.example/registration/foo/1.0.0.json"}),
    );

    let error = fetcher(&mock)
        .version_details(&source(), "Foo", "1.0.0", None)
        .await
        .unwrap_err();
    assert!(matches!(error, HazelError::Parse { .. }));
}

#[test]
fn test_dependency_group_sort_order() {
    let mut groups = vec![
        DependencyGroup {
            target_framework: "netstandard2.0".to_string(),
            dependencies: Vec::new(),
        },
        DependencyGroup {
            target_framework: String::new(),
            dependencies: Vec::new(),
        },
        DependencyGroup {
            target_framework: "net6.0".to_string(),
            dependencies: Vec::new(),
        },
        DependencyGroup {
            target_framework: "net472".to_string(),
            dependencies: Vec::new(),
        },
    ];
    sort_dependency_groups(&mut groups);

    let order: Vec<&str> = groups
        .iter()
        .map(|group| group.target_framework.as_str())
        .collect();
    assert_eq!(order, vec!["net6.0", "netstandard2.0", "net472", ""]);
}
