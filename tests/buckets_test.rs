//! Integration tests for bucket operations over the REST backend.

use bytes::Bytes;
use s3_store::mocks::{MockResponse, MockTransport, TestFixtures};
use s3_store::{
    BackendError, BucketPolicy, LifecycleConfiguration, LifecycleRule, ObjectStore, PolicyType,
    StoreConfig, StoreError, VersioningStatus,
};
use std::sync::Arc;

fn store_in(region: &str, transport: Arc<MockTransport>) -> ObjectStore {
    let config = StoreConfig::builder()
        .endpoint("http://127.0.0.1:9000")
        .region(region)
        .credentials("AKID", "SECRET")
        .bucket("b")
        .build()
        .unwrap();
    ObjectStore::builder()
        .config(config)
        .transport(transport)
        .build()
        .unwrap()
}

fn store_with(transport: Arc<MockTransport>) -> ObjectStore {
    store_in("us-east-1", transport)
}

fn body_of(request: &s3_store::HttpRequest) -> String {
    String::from_utf8(request.body.clone().unwrap_or_default().to_vec()).unwrap()
}

#[tokio::test]
async fn test_list_buckets() {
    let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::ok_with_body(
        TestFixtures::list_buckets_xml(),
    )]));
    let store = store_with(transport.clone());

    let buckets = store.list_buckets().await.unwrap();
    let names: Vec<&str> = buckets.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["bucket1", "bucket2"]);
    assert!(buckets[0].creation_date.is_some());
    assert_eq!(transport.last_request().unwrap().url, "http://127.0.0.1:9000/");
}

#[tokio::test]
async fn test_get_bucket() {
    let transport = Arc::new(MockTransport::with_default(MockResponse::ok_with_body(
        TestFixtures::list_buckets_xml(),
    )));
    let store = store_with(transport);

    assert_eq!(
        store.get_bucket("bucket2").await.unwrap().unwrap().name,
        "bucket2"
    );
    assert!(store.get_bucket("bucket3").await.unwrap().is_none());
}

#[tokio::test]
async fn test_bucket_exists() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::ok(),
        MockResponse::new(404, Bytes::new()),
        MockResponse::new(403, Bytes::new()),
    ]));
    let store = store_with(transport.clone());

    assert!(store.bucket_exists(None).await.unwrap());
    assert!(!store.bucket_exists(Some("gone")).await.unwrap());
    let err = store.bucket_exists(Some("locked")).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Backend {
            source: BackendError::AccessDenied { .. },
            ..
        }
    ));

    let requests = transport.requests();
    assert_eq!(requests[0].method, "HEAD");
    assert_eq!(requests[0].url, "http://127.0.0.1:9000/b");
}

#[tokio::test]
async fn test_create_bucket_with_policy() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::new(404, Bytes::new()),
        MockResponse::ok(),
        MockResponse::new(204, Bytes::new()),
    ]));
    let store = store_with(transport.clone());

    let created = store
        .create_bucket(Some("fresh"), Some(PolicyType::ReadOnly.into()))
        .await
        .unwrap();
    assert!(created);

    let requests = transport.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[1].method, "PUT");
    assert_eq!(requests[1].url, "http://127.0.0.1:9000/fresh");
    assert!(requests[1].body.is_none());

    assert_eq!(requests[2].url, "http://127.0.0.1:9000/fresh?policy");
    let policy = body_of(&requests[2]);
    assert!(policy.contains("arn:aws:s3:::fresh/*"));
    assert!(!policy.contains("{{bucket}}"));
}

#[tokio::test]
async fn test_create_existing_bucket_still_applies_policy() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::ok(),
        MockResponse::new(204, Bytes::new()),
    ]));
    let store = store_with(transport.clone());

    assert!(store
        .create_bucket(None, Some(BucketPolicy::Custom("{}".to_string())))
        .await
        .unwrap());

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].method, "HEAD");
    assert_eq!(requests[1].method, "PUT");
    assert_eq!(requests[1].url, "http://127.0.0.1:9000/b?policy");
    assert_eq!(body_of(&requests[1]), "{}");
}

#[tokio::test]
async fn test_create_bucket_outside_default_region() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::new(404, Bytes::new()),
        MockResponse::ok(),
    ]));
    let store = store_in("eu-west-1", transport.clone());

    store.create_bucket(Some("eu"), None).await.unwrap();

    let body = body_of(&transport.last_request().unwrap());
    assert!(body.contains("<LocationConstraint>eu-west-1</LocationConstraint>"));
}

#[tokio::test]
async fn test_create_bucket_race_is_success() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::new(404, Bytes::new()),
        MockResponse::error(409, "BucketAlreadyOwnedByYou", "Your previous request succeeded"),
        MockResponse::new(204, Bytes::new()),
    ]));
    let store = store_with(transport.clone());

    assert!(store
        .create_bucket(Some("raced"), Some(PolicyType::ReadWrite.into()))
        .await
        .unwrap());
    assert_eq!(transport.request_count(), 3);
    assert_eq!(
        transport.last_request().unwrap().url,
        "http://127.0.0.1:9000/raced?policy"
    );
}

#[tokio::test]
async fn test_delete_non_empty_bucket() {
    let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::error(
        409,
        "BucketNotEmpty",
        "The bucket you tried to delete is not empty",
    )]));
    let store = store_with(transport);

    let err = store.delete_bucket(None).await.unwrap_err();
    assert_eq!(err.code(), Some("BucketNotEmpty"));
    assert!(matches!(
        err.backend_error(),
        Some(BackendError::Conflict { .. })
    ));
}

#[tokio::test]
async fn test_bucket_policy_absent() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::error(404, "NoSuchBucketPolicy", "The bucket policy does not exist"),
        MockResponse::ok_with_body("{\"Version\":\"2012-10-17\"}"),
    ]));
    let store = store_with(transport);

    assert!(store.bucket_policy(None).await.unwrap().is_none());
    assert_eq!(
        store.bucket_policy(None).await.unwrap().as_deref(),
        Some("{\"Version\":\"2012-10-17\"}")
    );
}

#[tokio::test]
async fn test_versioning() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::ok(),
        MockResponse::ok_with_body(
            "<VersioningConfiguration><Status>Suspended</Status></VersioningConfiguration>",
        ),
        MockResponse::ok_with_body("<VersioningConfiguration/>"),
    ]));
    let store = store_with(transport.clone());

    store.enable_versioning(None).await.unwrap();
    let request = transport.last_request().unwrap();
    assert_eq!(request.url, "http://127.0.0.1:9000/b?versioning");
    assert!(body_of(&request).contains("<Status>Enabled</Status>"));

    assert_eq!(
        store.versioning_status(None).await.unwrap(),
        VersioningStatus::Suspended
    );
    assert_eq!(
        store.versioning_status(None).await.unwrap(),
        VersioningStatus::Unversioned
    );
}

#[tokio::test]
async fn test_list_versions_follows_markers() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::ok_with_body(
            r#"<ListVersionsResult><IsTruncated>true</IsTruncated><NextKeyMarker>a.txt</NextKeyMarker><NextVersionIdMarker>v1</NextVersionIdMarker><Version><Key>a.txt</Key><VersionId>v2</VersionId><IsLatest>true</IsLatest><Size>3</Size></Version></ListVersionsResult>"#,
        ),
        MockResponse::ok_with_body(
            r#"<ListVersionsResult><IsTruncated>false</IsTruncated><Version><Key>a.txt</Key><VersionId>v1</VersionId><IsLatest>false</IsLatest><Size>2</Size></Version><DeleteMarker><Key>b.txt</Key><VersionId>v9</VersionId><IsLatest>true</IsLatest></DeleteMarker></ListVersionsResult>"#,
        ),
    ]));
    let store = store_with(transport.clone());

    let versions = store.list_versions(None, None).await.unwrap();
    let ids: Vec<&str> = versions.iter().map(|v| v.version_id.as_str()).collect();
    assert_eq!(ids, vec!["v2", "v1", "v9"]);
    assert!(versions[2].is_delete_marker);

    let second = &transport.requests()[1];
    assert!(second.url.contains("key-marker=a.txt"));
    assert!(second.url.contains("version-id-marker=v1"));
}

#[tokio::test]
async fn test_lifecycle() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::ok(),
        MockResponse::new(204, Bytes::new()),
        MockResponse::error(
            404,
            "NoSuchLifecycleConfiguration",
            "The lifecycle configuration does not exist",
        ),
    ]));
    let store = store_with(transport.clone());

    let config = LifecycleConfiguration {
        rules: vec![LifecycleRule {
            id: "expire-tmp".to_string(),
            prefix: "tmp/".to_string(),
            enabled: true,
            expiration_days: Some(7),
            noncurrent_version_expiration_days: None,
            abort_incomplete_multipart_upload_days: Some(1),
        }],
    };
    store.set_lifecycle(None, &config).await.unwrap();
    let put = transport.last_request().unwrap();
    assert_eq!(put.method, "PUT");
    assert!(body_of(&put).contains("<ID>expire-tmp</ID>"));

    store
        .set_lifecycle(None, &LifecycleConfiguration::default())
        .await
        .unwrap();
    let delete = transport.last_request().unwrap();
    assert_eq!(delete.method, "DELETE");
    assert_eq!(delete.url, "http://127.0.0.1:9000/b?lifecycle");

    assert!(store.lifecycle(None).await.unwrap().rules.is_empty());
}
