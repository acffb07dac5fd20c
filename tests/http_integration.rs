//! Integration tests for the GCP client and the resource cache using wiremock
//!
//! These tests run the real HTTP client against mocked endpoints, covering
//! pagination, aggregated listings, error mapping and cache behavior.

use reqwest::StatusCode;
use serde_json::json;
use std::sync::Arc;
use tgcp_cache::cache::TtlPolicy;
use tgcp_cache::enrich::{Detail, Enricher, Unavailable};
use tgcp_cache::gcp::{format_gcp_error, ApiStatus, Endpoints, GcpClient, GcpCredentials, ALL_ZONES};
use tgcp_cache::resource::{get_resource, ResourceApi, ResourceService};
use wiremock::matchers::{bearer_token, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROJECT: &str = "test-project-1";

fn client(server: &MockServer, zone: &str) -> GcpClient {
    GcpClient::with_credentials(
        GcpCredentials::from_token("test-token"),
        Endpoints::uniform(&server.uri()),
        zone,
    )
    .expect("client should build")
}

fn service(server: &MockServer) -> ResourceService<GcpClient> {
    ResourceService::new(
        client(server, "us-central1-a"),
        Arc::new(TtlPolicy::builtin()),
        Enricher::default(),
    )
}

mod client_tests {
    use super::*;

    /// Listing sends the bearer token and extracts items
    #[tokio::test]
    async fn test_list_success() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/compute/projects/test-project-1/zones/us-central1-a/instances"))
            .and(bearer_token("test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"name": "instance-1", "status": "RUNNING"},
                    {"name": "instance-2", "status": "STOPPED"}
                ]
            })))
            .mount(&server)
            .await;

        let def = get_resource("compute-instances").unwrap();
        let items = client(&server, "us-central1-a")
            .list(def, PROJECT, &[])
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["name"], "instance-1");
    }

    /// Pages are followed until no nextPageToken is returned
    #[tokio::test]
    async fn test_list_follows_page_tokens() {
        let server = MockServer::start().await;
        let list_path = "/storage/b";

        Mock::given(method("GET"))
            .and(path(list_path))
            .and(query_param("project", PROJECT))
            .and(query_param_is_missing("pageToken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"name": "bucket-a"}],
                "nextPageToken": "page-2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(list_path))
            .and(query_param("pageToken", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"name": "bucket-b"}, {"name": "bucket-c"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let def = get_resource("buckets").unwrap();
        let items = client(&server, "us-central1-a")
            .list(def, PROJECT, &[])
            .await
            .unwrap();

        let names: Vec<_> = items.iter().map(|i| i["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["bucket-a", "bucket-b", "bucket-c"]);
    }

    /// The `all` zone reads the aggregated API and flattens per-zone buckets
    #[tokio::test]
    async fn test_aggregated_list_for_all_zones() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/compute/projects/test-project-1/aggregated/instances"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": {
                    "zones/us-central1-a": {"instances": [{"name": "a"}]},
                    "zones/europe-west1-b": {"instances": [{"name": "b"}]},
                    "zones/asia-east1-a": {"warning": {"code": "NO_RESULTS_ON_PAGE"}}
                }
            })))
            .mount(&server)
            .await;

        let def = get_resource("compute-instances").unwrap();
        let items = client(&server, ALL_ZONES).list(def, PROJECT, &[]).await.unwrap();

        assert_eq!(items.len(), 2);
    }

    /// An empty body is an empty listing, not an error
    #[tokio::test]
    async fn test_empty_body_yields_no_items() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/iam/projects/test-project-1/serviceAccounts"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let def = get_resource("iam-service-accounts").unwrap();
        let items = client(&server, "us-central1-a")
            .list(def, PROJECT, &[])
            .await
            .unwrap();

        assert!(items.is_empty());
    }

    /// A rejected token is refreshed and the request retried once
    #[tokio::test]
    async fn test_401_retried_once_with_refreshed_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/iam/projects/test-project-1/serviceAccounts"))
            .and(bearer_token("test-token"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;

        let def = get_resource("iam-service-accounts").unwrap();
        let err = client(&server, "us-central1-a")
            .list(def, PROJECT, &[])
            .await
            .unwrap_err();

        assert!(ApiStatus::is(&err, StatusCode::UNAUTHORIZED));
        assert!(format_gcp_error(&err).starts_with("Authentication failed"));
    }

    /// HTTP failures map to user-facing messages
    #[tokio::test]
    async fn test_403_maps_to_permission_denied() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/iam/projects/test-project-1/serviceAccounts"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {"code": 403, "message": "The caller does not have permission"}
            })))
            .mount(&server)
            .await;

        let def = get_resource("iam-service-accounts").unwrap();
        let err = client(&server, "us-central1-a")
            .list(def, PROJECT, &[])
            .await
            .unwrap_err();

        assert_eq!(
            format_gcp_error(&err),
            "Permission denied. Check your GCP IAM permissions."
        );
    }
}

mod service_tests {
    use super::*;

    /// A second listing within the TTL never reaches the API
    #[tokio::test]
    async fn test_listing_served_from_cache() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/storage/b"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"name": "logs"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let service = service(&server);
        let first = service.list(PROJECT, "buckets", &[]).await.unwrap();
        let second = service.list(PROJECT, "buckets", &[]).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(service.stats().hits, 1);
        assert_eq!(service.stats().misses, 1);
    }

    /// Failures are returned to the caller and retried on the next call
    #[tokio::test]
    async fn test_failed_listing_not_cached() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/storage/b"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let service = service(&server);
        assert!(service.list(PROJECT, "buckets", &[]).await.is_err());
        assert!(service.list(PROJECT, "buckets", &[]).await.is_err());
        assert!(service.age(PROJECT, "buckets", &[]).is_none());
    }

    /// One unreachable detail call degrades its record and spares the rest
    #[tokio::test]
    async fn test_detailed_listing_degrades_failed_items() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/storage/b"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"name": "old", "timeCreated": "2023-01-01T00:00:00Z"},
                    {"name": "broken", "timeCreated": "2024-01-01T00:00:00Z"},
                    {"name": "new", "timeCreated": "2024-06-01T00:00:00Z"}
                ]
            })))
            .mount(&server)
            .await;

        for bucket in ["old", "new"] {
            Mock::given(method("GET"))
                .and(path(format!("/storage/b/{}/iam", bucket)))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "bindings": [{"role": "roles/storage.objectViewer", "members": ["allUsers"]}]
                })))
                .mount(&server)
                .await;
        }

        Mock::given(method("GET"))
            .and(path("/storage/b/broken/iam"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let service = service(&server);
        let records = service.list_detailed(PROJECT, "buckets", &[]).await.unwrap();

        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "broken", "old"]);

        assert!(!records[0].is_degraded());
        assert_eq!(records[0].detail_field("bindings.0.members.0"), "allUsers");

        match &records[1].detail {
            Detail::Unavailable(Unavailable::Failed(reason)) => assert!(reason.contains("500")),
            other => panic!("expected a failed detail, got {:?}", other),
        }
        assert_eq!(records[1].detail_field("bindings"), "UNKNOWN");
    }
}
