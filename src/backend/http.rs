//! S3 REST implementation of the backend contract.

use super::ObjectStoreBackend;
use crate::config::{StoreConfig, DEFAULT_REGION};
use crate::endpoint;
use crate::error::{
    map_error_code, map_http_status, BackendError, ConfigurationError, NetworkError, StoreError,
};
use crate::key::ObjectKey;
use crate::presign::PresignedRequest;
use crate::signing::{uri_encode_path, uri_encode_query, Payload, RequestSigner, SigV4Signer};
use crate::transfer::{content_md5, ByteSource};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
use crate::types::*;
use crate::xml;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const USER_METADATA_PREFIX: &str = "x-amz-meta-";

/// URL parsers collapse `.` and `..` path segments (even when written as
/// `%2E`), so such a segment would address a different resource.
fn reject_dot_segments(what: &str, value: &str) -> Result<(), BackendError> {
    if value.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(BackendError::InvalidRequest {
            code: "InvalidURI".to_string(),
            message: format!(
                "{} '{}' contains a '.' or '..' path segment that cannot be sent in a URL",
                what, value
            ),
            request_id: None,
        });
    }
    Ok(())
}

/// Backend speaking the S3 REST protocol over an [`HttpTransport`].
pub struct HttpBackend {
    config: Arc<StoreConfig>,
    endpoint: Url,
    transport: Arc<dyn HttpTransport>,
    signer: Arc<dyn RequestSigner>,
}

impl HttpBackend {
    /// Create a backend from explicit parts.
    pub fn new(
        config: Arc<StoreConfig>,
        transport: Arc<dyn HttpTransport>,
        signer: Arc<dyn RequestSigner>,
    ) -> Result<Self, ConfigurationError> {
        let endpoint = config.endpoint_url()?;
        Ok(Self {
            config,
            endpoint,
            transport,
            signer,
        })
    }

    /// Create a backend with a reqwest transport and a Signature V4 signer.
    pub fn from_config(config: Arc<StoreConfig>) -> Result<Self, StoreError> {
        let transport = ReqwestTransport::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .pool_max_idle_per_host(config.max_idle_connections)
            .verify_ssl(config.verify_ssl)
            .build()
            .map_err(|e| StoreError::backend("connect", config.endpoint.clone(), e))?;
        let signer = SigV4Signer::new(config.key_pair(), config.region.clone());

        Ok(Self::new(config, Arc::new(transport), Arc::new(signer))?)
    }

    fn build_url(
        &self,
        bucket: Option<&str>,
        key: Option<&ObjectKey>,
        query: &[(&str, &str)],
    ) -> Result<Url, BackendError> {
        if let Some(bucket) = bucket.filter(|_| self.config.path_style_access) {
            reject_dot_segments("bucket", bucket)?;
        }
        if let Some(key) = key {
            reject_dot_segments("key", key.as_str())?;
        }

        let mut url = match bucket {
            None => format!("{}/", self.config.endpoint.trim_end_matches('/')),
            Some(bucket) if self.config.path_style_access => format!(
                "{}/{}",
                self.config.endpoint.trim_end_matches('/'),
                uri_encode_query(bucket)
            ),
            Some(bucket) => endpoint::virtual_host_base(&self.endpoint, bucket).map_err(|e| {
                BackendError::InvalidRequest {
                    code: "InvalidBucketName".to_string(),
                    message: e.to_string(),
                    request_id: None,
                }
            })?,
        };

        if let Some(key) = key {
            url.push('/');
            url.push_str(&uri_encode_path(key.as_str()));
        } else if bucket.is_some() && !self.config.path_style_access {
            url.push('/');
        }

        if !query.is_empty() {
            let query = query
                .iter()
                .map(|(name, value)| {
                    if value.is_empty() {
                        uri_encode_query(name)
                    } else {
                        format!("{}={}", uri_encode_query(name), uri_encode_query(value))
                    }
                })
                .collect::<Vec<_>>()
                .join("&");
            url.push('?');
            url.push_str(&query);
        }

        Url::parse(&url).map_err(|e| BackendError::InvalidRequest {
            code: "InvalidURI".to_string(),
            message: format!("Invalid URL '{}': {}", url, e),
            request_id: None,
        })
    }

    fn get_request(
        &self,
        input: &GetObjectInput,
    ) -> Result<(Url, HashMap<String, String>), BackendError> {
        let mut query = Vec::new();
        if let Some(version_id) = &input.version_id {
            query.push(("versionId", version_id.as_str()));
        }
        let url = self.build_url(Some(&input.bucket), Some(&input.key), &query)?;

        let mut headers = HashMap::new();
        if let Some(range) = input.range_header() {
            headers.insert("range".to_string(), range);
        }
        Ok((url, headers))
    }

    async fn execute(
        &self,
        method: &str,
        url: Url,
        headers: HashMap<String, String>,
        body: Option<Bytes>,
    ) -> Result<HttpResponse, BackendError> {
        let payload = match &body {
            Some(body) => Payload::Bytes(body),
            None => Payload::Empty,
        };
        let signed = self.signer.sign(method, &url, &headers, payload)?;

        let mut request = HttpRequest::new(method, url.as_str()).with_headers(signed);
        if let Some(body) = body {
            request = request.with_body(body);
        }

        debug!(method = method, url = %url, "Sending request");
        let response = self.transport.send(request).await?;
        self.check(response)
    }

    async fn execute_source(
        &self,
        method: &str,
        url: Url,
        mut headers: HashMap<String, String>,
        body: ByteSource,
        read_limit: u64,
    ) -> Result<HttpResponse, BackendError> {
        match body {
            ByteSource::Bytes(bytes) => self.execute(method, url, headers, Some(bytes)).await,
            source if source.len() <= read_limit => {
                let bytes = source.collect().await.map_err(body_error)?;
                self.execute(method, url, headers, Some(bytes)).await
            }
            source => {
                let length = source.len();
                headers.insert("content-length".to_string(), length.to_string());
                let signed = self.signer.sign(method, &url, &headers, Payload::Unsigned)?;
                let request = HttpRequest::new(method, url.as_str()).with_headers(signed);

                debug!(method = method, url = %url, length = length, "Streaming request body");
                let response = self
                    .transport
                    .send_streaming(request, source.into_stream())
                    .await?;
                self.check(response)
            }
        }
    }

    fn check(&self, response: HttpResponse) -> Result<HttpResponse, BackendError> {
        if response.is_success() {
            return Ok(response);
        }
        Err(self.rejection(&response))
    }

    fn rejection(&self, response: &HttpResponse) -> BackendError {
        let error = error_from(response);
        if error.is_not_found() {
            debug!(status = response.status, code = ?error.code(), "Not found");
        } else {
            warn!(
                status = response.status,
                code = ?error.code(),
                request_id = ?error.request_id(),
                "Store rejected request"
            );
        }
        error
    }
}

fn error_from(response: &HttpResponse) -> BackendError {
    let request_id = response.request_id().map(String::from);
    if response.body.is_empty() {
        return map_http_status(response.status, request_id);
    }

    let body = String::from_utf8_lossy(&response.body);
    match xml::parse_error_response(&body) {
        Ok(mut parsed) if !parsed.code.is_empty() => {
            if parsed.request_id.is_none() {
                parsed.request_id = request_id;
            }
            map_error_code(response.status, parsed)
        }
        _ => map_http_status(response.status, request_id),
    }
}

/// Fail a 200 response whose body is an `<Error>` document.
fn reject_embedded_error(response: &HttpResponse) -> Result<(), BackendError> {
    let body = String::from_utf8_lossy(&response.body);
    if xml::is_error_document(&body) {
        let parsed = xml::parse_error_response(&body)?;
        return Err(map_error_code(500, parsed));
    }
    Ok(())
}

fn body_error(e: std::io::Error) -> BackendError {
    BackendError::Network(NetworkError::Body {
        message: e.to_string(),
    })
}

fn body_text(response: &HttpResponse) -> String {
    String::from_utf8_lossy(&response.body).into_owned()
}

fn metadata_headers(
    headers: &mut HashMap<String, String>,
    content_type: Option<&str>,
    metadata: &BTreeMap<String, String>,
) {
    if let Some(content_type) = content_type {
        headers.insert("content-type".to_string(), content_type.to_string());
    }
    for (name, value) in metadata {
        headers.insert(format!("{}{}", USER_METADATA_PREFIX, name), value.clone());
    }
}

fn header_value<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

fn metadata_from(headers: &HashMap<String, String>) -> ObjectMetadata {
    let header = |name: &str| header_value(headers, name).map(String::from);

    let user_metadata = headers
        .iter()
        .filter_map(|(name, value)| {
            let name = name.to_lowercase();
            name.strip_prefix(USER_METADATA_PREFIX)
                .map(|stripped| (stripped.to_string(), value.clone()))
        })
        .collect();

    ObjectMetadata {
        content_length: header_value(headers, "content-length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
        content_type: header("content-type"),
        e_tag: header("etag"),
        last_modified: header_value(headers, "last-modified")
            .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        cache_control: header("cache-control"),
        content_disposition: header("content-disposition"),
        content_encoding: header("content-encoding"),
        version_id: header("x-amz-version-id"),
        user_metadata,
    }
}

fn xml_headers(body: &str) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert("content-type".to_string(), "application/xml".to_string());
    headers.insert("content-md5".to_string(), content_md5(body.as_bytes()));
    headers
}

#[async_trait]
impl ObjectStoreBackend for HttpBackend {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, BackendError> {
        let url = self.build_url(Some(bucket), None, &[])?;
        match self.execute("HEAD", url, HashMap::new(), None).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), BackendError> {
        let url = self.build_url(Some(bucket), None, &[])?;
        let body = (self.config.region != DEFAULT_REGION)
            .then(|| Bytes::from(xml::build_create_bucket_xml(&self.config.region)));
        self.execute("PUT", url, HashMap::new(), body).await?;
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), BackendError> {
        let url = self.build_url(Some(bucket), None, &[])?;
        self.execute("DELETE", url, HashMap::new(), None).await?;
        Ok(())
    }

    async fn list_buckets(&self) -> Result<Vec<Bucket>, BackendError> {
        let url = self.build_url(None, None, &[])?;
        let response = self.execute("GET", url, HashMap::new(), None).await?;
        xml::parse_list_buckets(&body_text(&response))
    }

    async fn put_object(&self, input: PutObjectInput) -> Result<PutObjectOutput, BackendError> {
        let url = self.build_url(Some(&input.bucket), Some(&input.key), &[])?;
        let mut headers = HashMap::new();
        metadata_headers(&mut headers, Some(&input.content_type), &input.metadata);

        let response = self
            .execute_source("PUT", url, headers, input.body, input.read_limit)
            .await?;

        Ok(PutObjectOutput {
            e_tag: response.etag().map(String::from),
            version_id: response.get_header("x-amz-version-id").map(String::from),
        })
    }

    async fn get_object(&self, input: GetObjectInput) -> Result<GetObjectOutput, BackendError> {
        let (url, headers) = self.get_request(&input)?;
        let response = self.execute("GET", url, headers, None).await?;
        Ok(GetObjectOutput {
            metadata: metadata_from(&response.headers),
            content_range: response.get_header("content-range").map(String::from),
            body: response.body,
        })
    }

    async fn get_object_stream(
        &self,
        input: GetObjectInput,
    ) -> Result<GetObjectStream, BackendError> {
        let (url, headers) = self.get_request(&input)?;
        let signed = self.signer.sign("GET", &url, &headers, Payload::Empty)?;
        let request = HttpRequest::new("GET", url.as_str()).with_headers(signed);

        debug!(url = %url, "Streaming response body");
        let response = self.transport.send_for_stream(request).await?;
        if !response.is_success() {
            return Err(self.rejection(&response.into_buffered().await?));
        }

        Ok(GetObjectStream {
            metadata: metadata_from(&response.headers),
            content_range: header_value(&response.headers, "content-range").map(String::from),
            body: response.body,
        })
    }

    async fn head_object(
        &self,
        bucket: &str,
        key: &ObjectKey,
    ) -> Result<ObjectMetadata, BackendError> {
        let url = self.build_url(Some(bucket), Some(key), &[])?;
        let response = self.execute("HEAD", url, HashMap::new(), None).await?;
        Ok(metadata_from(&response.headers))
    }

    async fn delete_object(&self, bucket: &str, key: &ObjectKey) -> Result<(), BackendError> {
        let url = self.build_url(Some(bucket), Some(key), &[])?;
        self.execute("DELETE", url, HashMap::new(), None).await?;
        Ok(())
    }

    async fn delete_objects(
        &self,
        bucket: &str,
        keys: &[ObjectKey],
    ) -> Result<DeleteObjectsOutput, BackendError> {
        if keys.is_empty() {
            return Ok(DeleteObjectsOutput::default());
        }

        let url = self.build_url(Some(bucket), None, &[("delete", "")])?;
        let body = xml::build_delete_objects_xml(keys);
        let headers = xml_headers(&body);

        let response = self
            .execute("POST", url, headers, Some(Bytes::from(body)))
            .await?;
        xml::parse_delete_objects(&body_text(&response))
    }

    async fn copy_object(&self, input: CopyObjectInput) -> Result<CopyObjectOutput, BackendError> {
        let url = self.build_url(Some(&input.dest_bucket), Some(&input.dest_key), &[])?;

        let mut headers = HashMap::new();
        headers.insert(
            "x-amz-copy-source".to_string(),
            format!("/{}", uri_encode_path(&input.copy_source())),
        );
        headers.insert(
            "x-amz-metadata-directive".to_string(),
            input.metadata_directive.as_str().to_string(),
        );
        if input.metadata_directive == MetadataDirective::Replace {
            metadata_headers(&mut headers, input.content_type.as_deref(), &input.metadata);
        }

        let response = self.execute("PUT", url, headers, None).await?;
        reject_embedded_error(&response)?;
        xml::parse_copy_object(&body_text(&response))
    }

    async fn list_objects(
        &self,
        input: ListObjectsInput,
    ) -> Result<ListObjectsOutput, BackendError> {
        let max_keys = input.max_keys.to_string();
        let mut query = vec![("list-type", "2"), ("max-keys", max_keys.as_str())];
        if let Some(prefix) = &input.prefix {
            query.push(("prefix", prefix.as_str()));
        }
        if let Some(delimiter) = &input.delimiter {
            query.push(("delimiter", delimiter.as_str()));
        }
        if let Some(token) = &input.continuation_token {
            query.push(("continuation-token", token.as_str()));
        }

        let url = self.build_url(Some(&input.bucket), None, &query)?;
        let response = self.execute("GET", url, HashMap::new(), None).await?;
        xml::parse_list_objects(&body_text(&response))
    }

    async fn list_object_versions(
        &self,
        input: ListObjectVersionsInput,
    ) -> Result<ListObjectVersionsOutput, BackendError> {
        let mut query = vec![("versions", "")];
        if let Some(prefix) = &input.prefix {
            query.push(("prefix", prefix.as_str()));
        }
        if let Some(marker) = &input.key_marker {
            query.push(("key-marker", marker.as_str()));
        }
        if let Some(marker) = &input.version_id_marker {
            query.push(("version-id-marker", marker.as_str()));
        }

        let url = self.build_url(Some(&input.bucket), None, &query)?;
        let response = self.execute("GET", url, HashMap::new(), None).await?;
        xml::parse_list_object_versions(&body_text(&response))
    }

    async fn create_multipart_upload(
        &self,
        input: CreateMultipartUploadInput,
    ) -> Result<CreateMultipartUploadOutput, BackendError> {
        let url = self.build_url(Some(&input.bucket), Some(&input.key), &[("uploads", "")])?;
        let mut headers = HashMap::new();
        metadata_headers(&mut headers, Some(&input.content_type), &input.metadata);

        let response = self.execute("POST", url, headers, None).await?;
        xml::parse_create_multipart_upload(&body_text(&response))
    }

    async fn upload_part(&self, input: UploadPartInput) -> Result<UploadPartOutput, BackendError> {
        let part_number = input.part_number.to_string();
        let url = self.build_url(
            Some(&input.bucket),
            Some(&input.key),
            &[
                ("partNumber", part_number.as_str()),
                ("uploadId", input.upload_id.as_str()),
            ],
        )?;

        let mut headers = HashMap::new();
        if let Some(md5) = &input.content_md5 {
            headers.insert("content-md5".to_string(), md5.clone());
        }

        // Streamed parts are never buffered.
        let response = self.execute_source("PUT", url, headers, input.body, 0).await?;

        let e_tag = response.etag().map(String::from).ok_or_else(|| BackendError::Response {
            message: format!("Part {} was accepted without an ETag", input.part_number),
        })?;
        Ok(UploadPartOutput { e_tag })
    }

    async fn list_parts(&self, input: ListPartsInput) -> Result<ListPartsOutput, BackendError> {
        let marker = input.part_number_marker.map(|m| m.to_string());
        let mut query = vec![("uploadId", input.upload_id.as_str())];
        if let Some(marker) = &marker {
            query.push(("part-number-marker", marker.as_str()));
        }

        let url = self.build_url(Some(&input.bucket), Some(&input.key), &query)?;
        let response = self.execute("GET", url, HashMap::new(), None).await?;
        xml::parse_list_parts(&body_text(&response))
    }

    async fn complete_multipart_upload(
        &self,
        input: CompleteMultipartUploadInput,
    ) -> Result<CompleteMultipartUploadOutput, BackendError> {
        let url = self.build_url(
            Some(&input.bucket),
            Some(&input.key),
            &[("uploadId", input.upload_id.as_str())],
        )?;
        let body = xml::build_complete_multipart_xml(&input.parts);
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/xml".to_string());

        let response = self
            .execute("POST", url, headers, Some(Bytes::from(body)))
            .await?;
        reject_embedded_error(&response)?;
        xml::parse_complete_multipart_upload(&body_text(&response))
    }

    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &ObjectKey,
        upload_id: &str,
    ) -> Result<(), BackendError> {
        let url = self.build_url(Some(bucket), Some(key), &[("uploadId", upload_id)])?;
        self.execute("DELETE", url, HashMap::new(), None).await?;
        Ok(())
    }

    async fn list_multipart_uploads(
        &self,
        input: ListMultipartUploadsInput,
    ) -> Result<ListMultipartUploadsOutput, BackendError> {
        let mut query = vec![("uploads", "")];
        if let Some(prefix) = &input.prefix {
            query.push(("prefix", prefix.as_str()));
        }
        if let Some(delimiter) = &input.delimiter {
            query.push(("delimiter", delimiter.as_str()));
        }
        if let Some(marker) = &input.key_marker {
            query.push(("key-marker", marker.as_str()));
        }
        if let Some(marker) = &input.upload_id_marker {
            query.push(("upload-id-marker", marker.as_str()));
        }

        let url = self.build_url(Some(&input.bucket), None, &query)?;
        let response = self.execute("GET", url, HashMap::new(), None).await?;
        xml::parse_list_multipart_uploads(&body_text(&response))
    }

    fn presign(&self, request: &PresignedRequest) -> Result<String, BackendError> {
        let remaining = (request.expiration - Utc::now()).num_milliseconds();
        if remaining <= 0 {
            return Err(BackendError::Signing {
                message: format!("Expiration {} is not in the future", request.expiration),
            });
        }
        let expires_in = Duration::from_secs(((remaining + 999) / 1000) as u64);

        let query: Vec<(&str, &str)> = request
            .extra_params
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();
        let url = self.build_url(Some(&request.bucket), Some(&request.key), &query)?;

        let mut headers = Vec::new();
        if request.method.has_body() {
            headers.push(("content-type".to_string(), request.content_type.clone()));
        }

        let presigned = self
            .signer
            .presign(request.method.as_str(), &url, expires_in, &headers)?;
        Ok(presigned.to_string())
    }

    async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> Result<(), BackendError> {
        let url = self.build_url(Some(bucket), None, &[("policy", "")])?;
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        self.execute("PUT", url, headers, Some(Bytes::from(policy.to_string())))
            .await?;
        Ok(())
    }

    async fn get_bucket_policy(&self, bucket: &str) -> Result<Option<String>, BackendError> {
        let url = self.build_url(Some(bucket), None, &[("policy", "")])?;
        match self.execute("GET", url, HashMap::new(), None).await {
            Ok(response) => Ok(Some(body_text(&response))),
            Err(e) if e.code() == Some("NoSuchBucketPolicy") => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn put_bucket_versioning(
        &self,
        bucket: &str,
        status: VersioningStatus,
    ) -> Result<(), BackendError> {
        if status == VersioningStatus::Unversioned {
            return Err(BackendError::InvalidRequest {
                code: "IllegalVersioningConfigurationException".to_string(),
                message: "Versioning can only be enabled or suspended".to_string(),
                request_id: None,
            });
        }

        let url = self.build_url(Some(bucket), None, &[("versioning", "")])?;
        let body = xml::build_versioning_xml(status);
        let headers = xml_headers(&body);
        self.execute("PUT", url, headers, Some(Bytes::from(body)))
            .await?;
        Ok(())
    }

    async fn get_bucket_versioning(&self, bucket: &str) -> Result<VersioningStatus, BackendError> {
        let url = self.build_url(Some(bucket), None, &[("versioning", "")])?;
        let response = self.execute("GET", url, HashMap::new(), None).await?;
        xml::parse_versioning(&body_text(&response))
    }

    async fn put_bucket_lifecycle(
        &self,
        bucket: &str,
        config: &LifecycleConfiguration,
    ) -> Result<(), BackendError> {
        let url = self.build_url(Some(bucket), None, &[("lifecycle", "")])?;
        if config.rules.is_empty() {
            self.execute("DELETE", url, HashMap::new(), None).await?;
            return Ok(());
        }

        let body = xml::build_lifecycle_xml(config);
        let headers = xml_headers(&body);
        self.execute("PUT", url, headers, Some(Bytes::from(body)))
            .await?;
        Ok(())
    }

    async fn get_bucket_lifecycle(
        &self,
        bucket: &str,
    ) -> Result<LifecycleConfiguration, BackendError> {
        let url = self.build_url(Some(bucket), None, &[("lifecycle", "")])?;
        match self.execute("GET", url, HashMap::new(), None).await {
            Ok(response) => xml::parse_lifecycle(&body_text(&response)),
            Err(e) if e.code() == Some("NoSuchLifecycleConfiguration") => {
                Ok(LifecycleConfiguration::default())
            }
            Err(e) => Err(e),
        }
    }

    async fn put_bucket_notification(
        &self,
        bucket: &str,
        config: &NotificationConfiguration,
    ) -> Result<(), BackendError> {
        let url = self.build_url(Some(bucket), None, &[("notification", "")])?;
        let body = xml::build_notification_xml(config);
        let headers = xml_headers(&body);
        self.execute("PUT", url, headers, Some(Bytes::from(body)))
            .await?;
        Ok(())
    }

    async fn get_bucket_notification(
        &self,
        bucket: &str,
    ) -> Result<NotificationConfiguration, BackendError> {
        let url = self.build_url(Some(bucket), None, &[("notification", "")])?;
        let response = self.execute("GET", url, HashMap::new(), None).await?;
        xml::parse_notification(&body_text(&response))
    }
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockTransport;
    use futures::TryStreamExt;

    fn backend(path_style: bool) -> (HttpBackend, Arc<MockTransport>) {
        backend_at("http://127.0.0.1:9000", path_style)
    }

    fn backend_at(endpoint: &str, path_style: bool) -> (HttpBackend, Arc<MockTransport>) {
        let config = StoreConfig::builder()
            .endpoint(endpoint)
            .credentials("AKID", "SECRET")
            .bucket("b")
            .path_style_access(path_style)
            .build()
            .unwrap();
        let config = Arc::new(config);
        let transport = Arc::new(MockTransport::new());
        let signer = Arc::new(SigV4Signer::new(config.key_pair(), config.region.clone()));
        let backend = HttpBackend::new(config, transport.clone(), signer).unwrap();
        (backend, transport)
    }

    #[test]
    fn test_build_url_path_style() {
        let (backend, _) = backend(true);
        let key = ObjectKey::new("dir/my file.bin");
        let url = backend
            .build_url(Some("b"), Some(&key), &[("partNumber", "1"), ("uploadId", "U 1")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:9000/b/dir/my%20file.bin?partNumber=1&uploadId=U%201"
        );
    }

    #[test]
    fn test_build_url_rejects_dot_segments() {
        let (backend, _) = backend(true);
        for raw in ["a/../b.txt", "./x", "dir/./y", "..", "x/../../other/k"] {
            let key = ObjectKey::new(raw);
            let err = backend.build_url(Some("b"), Some(&key), &[]).unwrap_err();
            assert_eq!(err.code(), Some("InvalidURI"), "key {:?}", raw);
        }

        let err = backend.build_url(Some(".."), None, &[]).unwrap_err();
        assert_eq!(err.code(), Some("InvalidURI"));
    }

    #[test]
    fn test_build_url_keeps_dots_inside_segments() {
        let (backend, _) = backend(true);
        for raw in ["a/.hidden", "a/..b/c.", "..."] {
            let key = ObjectKey::new(raw);
            let url = backend.build_url(Some("b"), Some(&key), &[]).unwrap();
            assert_eq!(url.path(), format!("/b/{}", raw));
        }
    }

    #[test]
    fn test_build_url_virtual_host() {
        let (backend, _) = backend_at("http://store.example.com:9000", false);
        let url = backend.build_url(Some("media"), None, &[("uploads", "")]).unwrap();
        assert_eq!(url.as_str(), "http://media.store.example.com:9000/?uploads");

        let key = ObjectKey::new("/a/b.txt");
        let url = backend.build_url(Some("media"), Some(&key), &[]).unwrap();
        assert_eq!(url.as_str(), "http://media.store.example.com:9000/a/b.txt");
    }

    #[test]
    fn test_build_url_service_root() {
        let (backend, _) = backend(false);
        let url = backend.build_url(None, None, &[]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/");
    }

    #[test]
    fn test_metadata_from_headers() {
        let mut headers = HashMap::new();
        headers.insert("Content-Length".to_string(), "42".to_string());
        headers.insert("Content-Type".to_string(), "text/plain".to_string());
        headers.insert("ETag".to_string(), "\"e\"".to_string());
        headers.insert(
            "Last-Modified".to_string(),
            "Wed, 21 Oct 2015 07:28:00 GMT".to_string(),
        );
        headers.insert("X-Amz-Meta-Owner".to_string(), "alice".to_string());

        let metadata = metadata_from(&headers);

        assert_eq!(metadata.content_length, 42);
        assert_eq!(metadata.content_type.as_deref(), Some("text/plain"));
        assert!(metadata.last_modified.is_some());
        assert_eq!(metadata.user_metadata.get("owner").map(String::as_str), Some("alice"));
    }

    #[test]
    fn test_error_from_body_and_status() {
        let response = HttpResponse {
            status: 404,
            headers: HashMap::new(),
            body: Bytes::from_static(
                b"<Error><Code>NoSuchUpload</Code><Message>gone</Message></Error>",
            ),
        };
        let error = error_from(&response);
        assert!(error.is_not_found());
        assert_eq!(error.code(), Some("NoSuchUpload"));

        let bare = HttpResponse {
            status: 404,
            headers: HashMap::new(),
            body: Bytes::new(),
        };
        assert!(error_from(&bare).is_not_found());
    }

    #[tokio::test]
    async fn test_bucket_exists_maps_not_found() {
        let (backend, transport) = backend(true);
        transport.push_response(200, "");
        transport.push_response(404, "");

        assert!(backend.bucket_exists("b").await.unwrap());
        assert!(!backend.bucket_exists("b").await.unwrap());

        let requests = transport.requests();
        assert_eq!(requests[0].method, "HEAD");
        assert!(requests[0].get_header("authorization").is_some());
    }

    #[tokio::test]
    async fn test_large_stream_is_sent_unsigned() {
        let (backend, transport) = backend(true);
        transport.push_response_with_headers(200, "", &[("ETag", "\"big\"")]);

        let chunks: Vec<std::io::Result<Bytes>> =
            vec![Ok(Bytes::from(vec![1u8; 8])), Ok(Bytes::from(vec![2u8; 8]))];
        let input = PutObjectInput {
            bucket: "b".to_string(),
            key: ObjectKey::new("big.bin"),
            body: ByteSource::from_stream(futures::stream::iter(chunks), 16),
            content_type: "application/octet-stream".to_string(),
            metadata: BTreeMap::new(),
            read_limit: 10,
        };

        let output = backend.put_object(input).await.unwrap();
        assert_eq!(output.e_tag.as_deref(), Some("\"big\""));

        let request = &transport.requests()[0];
        assert_eq!(request.get_header("x-amz-content-sha256"), Some("UNSIGNED-PAYLOAD"));
        assert_eq!(request.get_header("content-length"), Some("16"));
        assert_eq!(transport.streamed_bodies()[0].len(), 16);
    }

    #[tokio::test]
    async fn test_small_stream_is_buffered_and_signed() {
        let (backend, transport) = backend(true);
        transport.push_response_with_headers(200, "", &[("ETag", "\"small\"")]);

        let chunks: Vec<std::io::Result<Bytes>> = vec![Ok(Bytes::from_static(b"abc"))];
        let input = PutObjectInput {
            bucket: "b".to_string(),
            key: ObjectKey::new("small.txt"),
            body: ByteSource::from_stream(futures::stream::iter(chunks), 3),
            content_type: "text/plain".to_string(),
            metadata: BTreeMap::new(),
            read_limit: 10,
        };

        backend.put_object(input).await.unwrap();

        let request = &transport.requests()[0];
        assert_eq!(
            request.get_header("x-amz-content-sha256"),
            Some(crate::signing::sha256_hex(b"abc").as_str())
        );
        assert_eq!(request.body.as_deref(), Some(&b"abc"[..]));
    }

    #[tokio::test]
    async fn test_get_object_stream() {
        let (backend, transport) = backend(true);
        transport.push_response_with_headers(
            200,
            "streamed",
            &[("Content-Length", "8"), ("Content-Type", "text/plain")],
        );

        let output = backend
            .get_object_stream(GetObjectInput::new("b", "docs/a.txt").with_range(0, 7))
            .await
            .unwrap();
        assert_eq!(output.metadata.content_length, 8);
        assert_eq!(output.metadata.content_type.as_deref(), Some("text/plain"));

        let chunks: Vec<Bytes> = output.body.try_collect().await.unwrap();
        assert_eq!(chunks.concat(), b"streamed");

        let request = &transport.requests()[0];
        assert_eq!(request.method, "GET");
        assert_eq!(request.url, "http://127.0.0.1:9000/b/docs/a.txt");
        assert_eq!(request.get_header("range"), Some("bytes=0-7"));
        assert!(request.get_header("authorization").is_some());
    }

    #[tokio::test]
    async fn test_get_object_stream_error_reply() {
        let (backend, transport) = backend(true);
        transport.push_response(
            404,
            "<Error><Code>NoSuchKey</Code><Message>missing</Message></Error>",
        );

        let err = backend
            .get_object_stream(GetObjectInput::new("b", "gone.txt"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.code(), Some("NoSuchKey"));
    }

    #[tokio::test]
    async fn test_presign_requires_future_expiration() {
        let (backend, _) = backend(true);
        let mut request = PresignedRequest::builder("b", "k").build().unwrap();
        request.expiration = Utc::now() - chrono::Duration::seconds(1);
        assert!(matches!(
            backend.presign(&request),
            Err(BackendError::Signing { .. })
        ));
    }
}
