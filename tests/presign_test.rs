//! Integration tests for presigned URLs and public object URLs.

use s3_store::mocks::MockTransport;
use s3_store::{
    ArgumentError, BackendError, ExpireIn, HttpMethod, ObjectStore, PresignOptions, StoreConfig,
    StoreError, TimeUnit,
};
use std::sync::Arc;
use url::Url;

fn store(endpoint: &str, path_style: bool) -> ObjectStore {
    let config = StoreConfig::builder()
        .endpoint(endpoint)
        .credentials("AKID", "SECRET")
        .bucket("b")
        .path_style_access(path_style)
        .build()
        .unwrap();
    ObjectStore::builder()
        .config(config)
        .transport(Arc::new(MockTransport::new()))
        .build()
        .unwrap()
}

fn query_value(url: &str, name: &str) -> Option<String> {
    Url::parse(url)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

#[test]
fn test_presigned_get_url() {
    let store = store("http://127.0.0.1:9000", true);

    let url = store.presigned_get_url(None, "/docs/a.txt").unwrap();

    assert!(url.starts_with("http://127.0.0.1:9000/b/docs/a.txt?"));
    assert_eq!(
        query_value(&url, "X-Amz-Algorithm").as_deref(),
        Some("AWS4-HMAC-SHA256")
    );
    assert_eq!(query_value(&url, "X-Amz-Expires").as_deref(), Some("600"));
    assert_eq!(query_value(&url, "X-Amz-SignedHeaders").as_deref(), Some("host"));
    assert!(query_value(&url, "X-Amz-Credential")
        .unwrap()
        .starts_with("AKID/"));
    let signature = query_value(&url, "X-Amz-Signature").unwrap();
    assert_eq!(signature.len(), 64);
    assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_presigned_put_signs_content_type() {
    let store = store("http://127.0.0.1:9000", true);

    let presigned = store
        .presign(
            PresignOptions::new("upload.png")
                .method(HttpMethod::Put)
                .content_type("image/png")
                .expire_in(ExpireIn::new(1, TimeUnit::Hours)),
        )
        .unwrap();

    assert_eq!(presigned.request.content_type, "image/png");
    assert_eq!(presigned.request.method, HttpMethod::Put);
    assert_eq!(
        query_value(&presigned.url, "X-Amz-SignedHeaders").as_deref(),
        Some("content-type;host")
    );
    assert_eq!(
        query_value(&presigned.url, "X-Amz-Expires").as_deref(),
        Some("3600")
    );
}

#[test]
fn test_presign_extra_params_are_signed() {
    let store = store("http://127.0.0.1:9000", true);

    let presigned = store
        .presign(
            PresignOptions::new("report.pdf")
                .extra_param("response-content-disposition", "attachment; filename=\"r.pdf\""),
        )
        .unwrap();

    assert_eq!(
        query_value(&presigned.url, "response-content-disposition").as_deref(),
        Some("attachment; filename=\"r.pdf\"")
    );
    assert!(query_value(&presigned.url, "X-Amz-Signature").is_some());
}

#[test]
fn test_presign_virtual_host() {
    let store = store("https://store.example.com", false);

    let url = store.presigned_get_url(Some("media"), "a.bin").unwrap();
    assert!(url.starts_with("https://media.store.example.com/a.bin?"));
}

#[test]
fn test_presign_rejects_expiry_beyond_seven_days() {
    let store = store("http://127.0.0.1:9000", true);

    let err = store
        .presign(PresignOptions::new("k").expire_in(ExpireIn::new(8, TimeUnit::Days)))
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Backend {
            operation: "presign",
            source: BackendError::Signing { .. },
            ..
        }
    ));
}

#[test]
fn test_presign_rejects_elapsed_expiry() {
    let store = store("http://127.0.0.1:9000", true);

    let err = store
        .presign(PresignOptions::new("k").expire_in(ExpireIn::new(0, TimeUnit::Seconds)))
        .unwrap_err();
    assert!(matches!(
        err.backend_error(),
        Some(BackendError::Signing { .. })
    ));
}

#[test]
fn test_unknown_time_unit() {
    let err = ExpireIn::parse(3, "fortnights").unwrap_err();
    assert!(matches!(err, ArgumentError::UnsupportedTimeUnit { .. }));
}

#[test]
fn test_gateway_url_styles() {
    let path_style = store("http://127.0.0.1:9000/", true);
    assert_eq!(
        path_style.gateway_url(None, "/2024/img.png").unwrap(),
        "http://127.0.0.1:9000/b/2024/img.png"
    );

    let virtual_host = store("https://store.example.com", false);
    assert_eq!(
        virtual_host.gateway_url(Some("media"), "img.png").unwrap(),
        "https://media.store.example.com/img.png"
    );

    let err = virtual_host
        .gateway_url(Some("Not_A_Dns_Name"), "img.png")
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::InvalidArgument(ArgumentError::InvalidBucketName { .. })
    ));
}
