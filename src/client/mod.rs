//! The object store facade.
//!
//! [`ObjectStore`] composes the configuration, a backend and the multipart
//! coordinator into single-call operations. Operations that address a
//! bucket take an optional bucket name and fall back to the configured
//! default bucket; every key is normalized before it reaches the backend.

use crate::backend::{HttpBackend, ObjectStoreBackend};
use crate::config::StoreConfig;
use crate::endpoint;
use crate::error::{ArgumentError, BackendResultExt, ConfigurationError, StoreError};
use crate::key::ObjectKey;
use crate::multipart::{
    CompletedUpload, MultipartCoordinator, PartDescriptor, PartUpload, UploadSession,
    UploadSummary,
};
use crate::policy::BucketPolicy;
use crate::presign::{
    ExpireIn, HttpMethod, PresignedRequest, PresignedRequestBuilder, DEFAULT_CONTENT_TYPE,
    DEFAULT_EXPIRY,
};
use crate::signing::SigV4Signer;
use crate::transfer::{self, ByteSource};
use crate::transport::HttpTransport;
use crate::types::*;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Largest body buffered in memory so it can be signed; longer streams are
/// sent unsigned.
pub const DEFAULT_READ_LIMIT: u64 = 5 * 1024 * 1024;

/// Options for [`ObjectStore::put_object`] and [`ObjectStore::upload_file`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutObjectOptions {
    /// Target bucket; the default bucket when `None`.
    pub bucket: Option<String>,
    /// Content type; `application/octet-stream` when `None`.
    pub content_type: Option<String>,
    /// User metadata sent as `x-amz-meta-*`.
    pub metadata: BTreeMap<String, String>,
    /// Read limit; [`DEFAULT_READ_LIMIT`] when `None`.
    pub read_limit: Option<u64>,
}

impl PutObjectOptions {
    /// Set the bucket.
    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Set the content type.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Add one user metadata entry.
    pub fn metadata(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(name.into(), value.into());
        self
    }

    /// Set the read limit.
    pub fn read_limit(mut self, read_limit: u64) -> Self {
        self.read_limit = Some(read_limit);
        self
    }
}

/// Options for [`ObjectStore::list_objects`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListObjectsOptions {
    /// Bucket; the default bucket when `None`.
    pub bucket: Option<String>,
    /// Only keys starting with this prefix.
    pub prefix: Option<String>,
    /// Group keys sharing a prefix up to this delimiter.
    pub delimiter: Option<String>,
    /// Page size; 1000 when `None`.
    pub max_keys: Option<u32>,
    /// Token from the previous page.
    pub continuation_token: Option<String>,
}

impl ListObjectsOptions {
    /// Set the bucket.
    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Set the prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set the delimiter.
    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    /// Set the page size.
    pub fn max_keys(mut self, max_keys: u32) -> Self {
        self.max_keys = Some(max_keys);
        self
    }

    /// Continue after a previous page.
    pub fn continuation_token(mut self, token: impl Into<String>) -> Self {
        self.continuation_token = Some(token.into());
        self
    }
}

/// Options for [`ObjectStore::presign`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignOptions {
    /// Bucket; the default bucket when `None`.
    pub bucket: Option<String>,
    /// Object key, normalized before signing.
    pub key: String,
    /// Authorized method.
    pub method: HttpMethod,
    /// Content type; `application/octet-stream` when `None`.
    pub content_type: Option<String>,
    /// Validity of the URL.
    pub expire_in: ExpireIn,
    /// Additional signed query parameters.
    pub extra_params: BTreeMap<String, String>,
}

impl PresignOptions {
    /// GET access to `key` for ten minutes.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            bucket: None,
            key: key.into(),
            method: HttpMethod::Get,
            content_type: None,
            expire_in: DEFAULT_EXPIRY,
            extra_params: BTreeMap::new(),
        }
    }

    /// Set the bucket.
    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Set the method.
    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the content type.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the validity.
    pub fn expire_in(mut self, expire_in: ExpireIn) -> Self {
        self.expire_in = expire_in;
        self
    }

    /// Add an extra signed query parameter.
    pub fn extra_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_params.insert(name.into(), value.into());
        self
    }
}

/// A signed URL and the request it grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedUrl {
    /// The URL.
    pub url: String,
    /// What the URL authorizes.
    pub request: PresignedRequest,
}

/// Facade over an S3-compatible object store.
pub struct ObjectStore {
    config: Arc<StoreConfig>,
    backend: Arc<dyn ObjectStoreBackend>,
    multipart: MultipartCoordinator,
}

impl ObjectStore {
    /// Create a builder.
    pub fn builder() -> ObjectStoreBuilder {
        ObjectStoreBuilder::new()
    }

    /// Create a facade talking S3 REST to the configured endpoint.
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        Self::builder().config(config).build()
    }

    /// The configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The multipart coordinator, for concurrent part uploads.
    pub fn multipart(&self) -> &MultipartCoordinator {
        &self.multipart
    }

    /// The configured default bucket.
    pub fn default_bucket(&self) -> Result<&str, StoreError> {
        Ok(self.config.default_bucket()?)
    }

    fn bucket<'a>(&'a self, bucket: Option<&'a str>) -> Result<&'a str, StoreError> {
        Ok(self.config.bucket_or_default(bucket)?)
    }

    fn object_key(key: &str) -> Result<ObjectKey, StoreError> {
        let key = ObjectKey::new(key);
        if key.is_empty() {
            return Err(ArgumentError::InvalidKey {
                key: key.into_string(),
                reason: "object key is empty".to_string(),
            }
            .into());
        }
        Ok(key)
    }

    // Buckets

    /// Returns true if the bucket exists.
    pub async fn bucket_exists(&self, bucket: Option<&str>) -> Result<bool, StoreError> {
        let bucket = self.bucket(bucket)?;
        self.backend
            .bucket_exists(bucket)
            .await
            .during("bucket_exists", || bucket.to_string())
    }

    /// Create the bucket unless it exists, then apply `policy`.
    ///
    /// The policy is applied to an existing bucket as well. Returns true once
    /// the bucket exists.
    pub async fn create_bucket(
        &self,
        bucket: Option<&str>,
        policy: Option<BucketPolicy>,
    ) -> Result<bool, StoreError> {
        let bucket = self.bucket(bucket)?;
        if self.bucket_exists(Some(bucket)).await? {
            debug!(bucket = bucket, "Bucket already exists");
        } else {
            match self.backend.create_bucket(bucket).await {
                Ok(()) => info!(bucket = bucket, "Bucket created"),
                Err(e) if e.code() == Some("BucketAlreadyOwnedByYou") => {
                    debug!(bucket = bucket, "Bucket created concurrently");
                }
                Err(e) => return Err(StoreError::backend("create_bucket", bucket, e)),
            }
        }

        if let Some(policy) = policy {
            self.set_bucket_policy(Some(bucket), policy).await?;
        }
        Ok(true)
    }

    /// Delete an empty bucket.
    pub async fn delete_bucket(&self, bucket: Option<&str>) -> Result<(), StoreError> {
        let bucket = self.bucket(bucket)?;
        self.backend
            .delete_bucket(bucket)
            .await
            .during("delete_bucket", || bucket.to_string())?;
        info!(bucket = bucket, "Bucket deleted");
        Ok(())
    }

    /// All buckets of the account.
    pub async fn list_buckets(&self) -> Result<Vec<Bucket>, StoreError> {
        self.backend
            .list_buckets()
            .await
            .during("list_buckets", String::new)
    }

    /// The bucket named `name`, if it exists.
    pub async fn get_bucket(&self, name: &str) -> Result<Option<Bucket>, StoreError> {
        Ok(self
            .list_buckets()
            .await?
            .into_iter()
            .find(|bucket| bucket.name == name))
    }

    /// Attach a policy to the bucket.
    pub async fn set_bucket_policy(
        &self,
        bucket: Option<&str>,
        policy: BucketPolicy,
    ) -> Result<(), StoreError> {
        let bucket = self.bucket(bucket)?;
        self.backend
            .put_bucket_policy(bucket, &policy.document(bucket))
            .await
            .during("set_bucket_policy", || bucket.to_string())
    }

    /// The bucket's policy document, if it has one.
    pub async fn bucket_policy(&self, bucket: Option<&str>) -> Result<Option<String>, StoreError> {
        let bucket = self.bucket(bucket)?;
        self.backend
            .get_bucket_policy(bucket)
            .await
            .during("bucket_policy", || bucket.to_string())
    }

    // Objects

    /// One page of objects.
    pub async fn list_objects(
        &self,
        options: ListObjectsOptions,
    ) -> Result<ListObjectsOutput, StoreError> {
        let bucket = self.bucket(options.bucket.as_deref())?.to_string();
        let mut input = ListObjectsInput::new(bucket);
        input.prefix = options.prefix;
        input.delimiter = options.delimiter;
        input.continuation_token = options.continuation_token;
        if let Some(max_keys) = options.max_keys {
            input.max_keys = max_keys;
        }

        let target = input.bucket.clone();
        self.backend
            .list_objects(input)
            .await
            .during("list_objects", || target)
    }

    /// Store an object.
    ///
    /// A streamed body must declare a positive length.
    pub async fn put_object(
        &self,
        key: &str,
        body: impl Into<ByteSource>,
        options: PutObjectOptions,
    ) -> Result<PutObjectOutput, StoreError> {
        let body = body.into();
        if body.is_stream() && body.is_empty() {
            return Err(ArgumentError::NonPositiveContentLength { length: 0 }.into());
        }

        let bucket = self.bucket(options.bucket.as_deref())?;
        let key = Self::object_key(key)?;
        let target = format!("{}/{}", bucket, key);

        let input = PutObjectInput {
            bucket: bucket.to_string(),
            key,
            body,
            content_type: options
                .content_type
                .filter(|ct| !ct.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            metadata: options.metadata,
            read_limit: options.read_limit.unwrap_or(DEFAULT_READ_LIMIT),
        };

        self.backend
            .put_object(input)
            .await
            .during("put_object", || target)
    }

    /// Upload a local file; the content type is guessed from the file name
    /// unless the options set one.
    pub async fn upload_file(
        &self,
        path: impl AsRef<Path>,
        key: &str,
        mut options: PutObjectOptions,
    ) -> Result<PutObjectOutput, StoreError> {
        let path = path.as_ref();
        let source = ByteSource::from_file(path).await?;
        // Empty files are uploaded as an empty body rather than an empty stream.
        let source = if source.is_empty() {
            ByteSource::from(Vec::new())
        } else {
            source
        };

        if options.content_type.is_none() {
            options.content_type = Some(transfer::content_type_for(path));
        }
        self.put_object(key, source, options).await
    }

    /// Returns true if the object exists.
    pub async fn object_exists(&self, bucket: Option<&str>, key: &str) -> Result<bool, StoreError> {
        match self.object_metadata(bucket, key).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Read a whole object.
    pub async fn get_object(
        &self,
        bucket: Option<&str>,
        key: &str,
    ) -> Result<GetObjectOutput, StoreError> {
        let bucket = self.bucket(bucket)?;
        let key = Self::object_key(key)?;
        let target = format!("{}/{}", bucket, key);
        self.backend
            .get_object(GetObjectInput::new(bucket, key))
            .await
            .during("get_object", || target)
    }

    /// Read bytes `start..=end` of an object.
    pub async fn get_object_range(
        &self,
        bucket: Option<&str>,
        key: &str,
        start: u64,
        end: u64,
    ) -> Result<GetObjectOutput, StoreError> {
        if start > end {
            return Err(ArgumentError::InvalidRange { start, end }.into());
        }

        let bucket = self.bucket(bucket)?;
        let key = Self::object_key(key)?;
        let target = format!("{}/{}", bucket, key);
        self.backend
            .get_object(GetObjectInput::new(bucket, key).with_range(start, end))
            .await
            .during("get_object_range", || target)
    }

    /// Download an object into a local file and return its size.
    ///
    /// The body is written as it arrives. No file is left behind if the
    /// download or the write fails.
    pub async fn download_object(
        &self,
        bucket: Option<&str>,
        key: &str,
        path: impl AsRef<Path>,
    ) -> Result<u64, StoreError> {
        let bucket = self.bucket(bucket)?;
        let key = Self::object_key(key)?;
        let target = format!("{}/{}", bucket, key);
        let output = self
            .backend
            .get_object_stream(GetObjectInput::new(bucket, key))
            .await
            .during("download_object", || target)?;

        let written = transfer::write_stream(path.as_ref(), output.body).await?;
        debug!(bucket = bucket, path = %path.as_ref().display(), bytes = written, "Object downloaded");
        Ok(written)
    }

    /// Copy an object server-side, keeping its metadata.
    pub async fn copy_object(
        &self,
        source_bucket: Option<&str>,
        source_key: &str,
        dest_bucket: Option<&str>,
        dest_key: &str,
    ) -> Result<CopyObjectOutput, StoreError> {
        let source_bucket = self.bucket(source_bucket)?;
        let dest_bucket = self.bucket(dest_bucket)?;
        let input = CopyObjectInput::new(
            source_bucket,
            Self::object_key(source_key)?,
            dest_bucket,
            Self::object_key(dest_key)?,
        );
        let target = format!("{} -> {}/{}", input.copy_source(), dest_bucket, input.dest_key);

        self.backend
            .copy_object(input)
            .await
            .during("copy_object", || target)
    }

    /// Move an object within a bucket: copy, then delete the source.
    pub async fn rename_object(
        &self,
        bucket: Option<&str>,
        source_key: &str,
        dest_key: &str,
    ) -> Result<(), StoreError> {
        let bucket = self.bucket(bucket)?;
        self.copy_object(Some(bucket), source_key, Some(bucket), dest_key)
            .await?;
        self.delete_object(Some(bucket), source_key).await
    }

    /// Delete an object. Deleting a missing key succeeds.
    pub async fn delete_object(&self, bucket: Option<&str>, key: &str) -> Result<(), StoreError> {
        let bucket = self.bucket(bucket)?;
        let key = Self::object_key(key)?;
        self.backend
            .delete_object(bucket, &key)
            .await
            .during("delete_object", || format!("{}/{}", bucket, key))
    }

    /// Delete several objects in one request.
    pub async fn delete_objects<I, K>(
        &self,
        bucket: Option<&str>,
        keys: I,
    ) -> Result<DeleteObjectsOutput, StoreError>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let bucket = self.bucket(bucket)?;
        let keys = keys
            .into_iter()
            .map(|key| Self::object_key(key.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        self.backend
            .delete_objects(bucket, &keys)
            .await
            .during("delete_objects", || bucket.to_string())
    }

    /// Object metadata.
    pub async fn object_metadata(
        &self,
        bucket: Option<&str>,
        key: &str,
    ) -> Result<ObjectMetadata, StoreError> {
        let bucket = self.bucket(bucket)?;
        let key = Self::object_key(key)?;
        self.backend
            .head_object(bucket, &key)
            .await
            .during("object_metadata", || format!("{}/{}", bucket, key))
    }

    /// Replace the user metadata of an object, and its content type when
    /// one is given.
    pub async fn set_object_metadata(
        &self,
        bucket: Option<&str>,
        key: &str,
        content_type: Option<&str>,
        metadata: BTreeMap<String, String>,
    ) -> Result<CopyObjectOutput, StoreError> {
        let bucket = self.bucket(bucket)?;
        let key = Self::object_key(key)?;

        let content_type = match content_type {
            Some(content_type) => Some(content_type.to_string()),
            None => self
                .object_metadata(Some(bucket), key.as_str())
                .await?
                .content_type,
        };

        let mut input = CopyObjectInput::new(bucket, key.clone(), bucket, key);
        input.metadata_directive = MetadataDirective::Replace;
        input.content_type = content_type;
        input.metadata = metadata;
        let target = input.copy_source();

        self.backend
            .copy_object(input)
            .await
            .during("set_object_metadata", || target)
    }

    /// Size of an object in bytes.
    pub async fn object_size(&self, bucket: Option<&str>, key: &str) -> Result<u64, StoreError> {
        Ok(self.object_metadata(bucket, key).await?.content_length)
    }

    /// Last modification time of an object, if the backend reports one.
    pub async fn object_last_modified(
        &self,
        bucket: Option<&str>,
        key: &str,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.object_metadata(bucket, key).await?.last_modified)
    }

    // Versioning, lifecycle, notification

    /// Enable versioning.
    pub async fn enable_versioning(&self, bucket: Option<&str>) -> Result<(), StoreError> {
        self.put_versioning(bucket, VersioningStatus::Enabled).await
    }

    /// Suspend versioning.
    pub async fn suspend_versioning(&self, bucket: Option<&str>) -> Result<(), StoreError> {
        self.put_versioning(bucket, VersioningStatus::Suspended).await
    }

    async fn put_versioning(
        &self,
        bucket: Option<&str>,
        status: VersioningStatus,
    ) -> Result<(), StoreError> {
        let bucket = self.bucket(bucket)?;
        self.backend
            .put_bucket_versioning(bucket, status)
            .await
            .during("set_versioning", || bucket.to_string())?;
        info!(bucket = bucket, status = status.as_str(), "Versioning changed");
        Ok(())
    }

    /// Current versioning state.
    pub async fn versioning_status(
        &self,
        bucket: Option<&str>,
    ) -> Result<VersioningStatus, StoreError> {
        let bucket = self.bucket(bucket)?;
        self.backend
            .get_bucket_versioning(bucket)
            .await
            .during("versioning_status", || bucket.to_string())
    }

    /// All versions of the objects under `prefix`.
    pub async fn list_versions(
        &self,
        bucket: Option<&str>,
        prefix: Option<&str>,
    ) -> Result<Vec<ObjectVersion>, StoreError> {
        let bucket = self.bucket(bucket)?;
        let mut input = ListObjectVersionsInput {
            bucket: bucket.to_string(),
            prefix: prefix.map(String::from),
            ..ListObjectVersionsInput::default()
        };

        let mut versions = Vec::new();
        loop {
            let page = self
                .backend
                .list_object_versions(input.clone())
                .await
                .during("list_versions", || bucket.to_string())?;
            versions.extend(page.versions);

            if !page.is_truncated
                || page.next_key_marker.is_none()
                || (page.next_key_marker == input.key_marker
                    && page.next_version_id_marker == input.version_id_marker)
            {
                break;
            }
            input.key_marker = page.next_key_marker;
            input.version_id_marker = page.next_version_id_marker;
        }

        Ok(versions)
    }

    /// Replace the lifecycle rules; an empty rule set removes them.
    pub async fn set_lifecycle(
        &self,
        bucket: Option<&str>,
        config: &LifecycleConfiguration,
    ) -> Result<(), StoreError> {
        let bucket = self.bucket(bucket)?;
        self.backend
            .put_bucket_lifecycle(bucket, config)
            .await
            .during("set_lifecycle", || bucket.to_string())
    }

    /// Current lifecycle rules.
    pub async fn lifecycle(
        &self,
        bucket: Option<&str>,
    ) -> Result<LifecycleConfiguration, StoreError> {
        let bucket = self.bucket(bucket)?;
        self.backend
            .get_bucket_lifecycle(bucket)
            .await
            .during("lifecycle", || bucket.to_string())
    }

    /// Replace the event notification targets.
    pub async fn set_notification(
        &self,
        bucket: Option<&str>,
        config: &NotificationConfiguration,
    ) -> Result<(), StoreError> {
        let bucket = self.bucket(bucket)?;
        self.backend
            .put_bucket_notification(bucket, config)
            .await
            .during("set_notification", || bucket.to_string())
    }

    /// Current event notification targets.
    pub async fn notification(
        &self,
        bucket: Option<&str>,
    ) -> Result<NotificationConfiguration, StoreError> {
        let bucket = self.bucket(bucket)?;
        self.backend
            .get_bucket_notification(bucket)
            .await
            .during("notification", || bucket.to_string())
    }

    // URLs

    /// Public, unsigned URL of an object.
    ///
    /// With a custom domain configured the bucket plays no part and need not
    /// be resolvable.
    pub fn gateway_url(&self, bucket: Option<&str>, key: &str) -> Result<String, StoreError> {
        let key = ObjectKey::new(key);
        let bucket = match self.config.custom_domain() {
            Some(_) => bucket.unwrap_or_default(),
            None => self.bucket(bucket)?,
        };
        endpoint::resolve(&self.config, bucket, &key)
    }

    /// Sign a temporary access grant.
    pub fn presign(&self, options: PresignOptions) -> Result<PresignedUrl, StoreError> {
        let bucket = self.bucket(options.bucket.as_deref())?;
        let mut builder = PresignedRequestBuilder::new(bucket, options.key.as_str())
            .method(options.method)
            .expire_in(options.expire_in)
            .extra_params(options.extra_params);
        if let Some(content_type) = options.content_type {
            builder = builder.content_type(content_type);
        }
        let request = builder.build()?;

        let url = self
            .backend
            .presign(&request)
            .during("presign", || format!("{}/{}", request.bucket, request.key))?;
        debug!(
            bucket = %request.bucket,
            key = %request.key,
            method = %request.method,
            expiration = %request.expiration,
            "Presigned URL issued"
        );

        Ok(PresignedUrl { url, request })
    }

    /// Presigned PUT URL valid for ten minutes.
    pub fn presigned_put_url(&self, bucket: Option<&str>, key: &str) -> Result<String, StoreError> {
        self.presigned_url(bucket, key, HttpMethod::Put)
    }

    /// Presigned GET URL valid for ten minutes.
    pub fn presigned_get_url(&self, bucket: Option<&str>, key: &str) -> Result<String, StoreError> {
        self.presigned_url(bucket, key, HttpMethod::Get)
    }

    fn presigned_url(
        &self,
        bucket: Option<&str>,
        key: &str,
        method: HttpMethod,
    ) -> Result<String, StoreError> {
        let mut options = PresignOptions::new(key).method(method);
        options.bucket = bucket.map(String::from);
        Ok(self.presign(options)?.url)
    }

    // Multipart

    /// Start a multipart upload.
    pub async fn initiate_upload(
        &self,
        bucket: Option<&str>,
        key: &str,
        content_type: Option<&str>,
    ) -> Result<UploadSession, StoreError> {
        let bucket = self.bucket(bucket)?;
        self.multipart
            .initiate(bucket, key, content_type.unwrap_or(DEFAULT_CONTENT_TYPE))
            .await
    }

    /// Start a multipart upload whose content type is guessed from `file_name`.
    pub async fn initiate_upload_for_file(
        &self,
        bucket: Option<&str>,
        key: &str,
        file_name: impl AsRef<Path>,
    ) -> Result<UploadSession, StoreError> {
        let content_type = transfer::content_type_for(file_name);
        self.initiate_upload(bucket, key, Some(&content_type)).await
    }

    /// Upload one part of a session.
    pub async fn upload_part(
        &self,
        session: &mut UploadSession,
        part: PartUpload,
    ) -> Result<PartDescriptor, StoreError> {
        self.multipart.upload_part(session, part).await
    }

    /// The committed parts of an upload, ordered by part number.
    pub async fn list_parts(
        &self,
        bucket: Option<&str>,
        key: &str,
        upload_id: &str,
    ) -> Result<Vec<PartDescriptor>, StoreError> {
        let bucket = self.bucket(bucket)?;
        self.multipart.list_parts(bucket, key, upload_id).await
    }

    /// Complete an upload.
    pub async fn complete_upload(
        &self,
        session: UploadSession,
    ) -> Result<CompletedUpload, StoreError> {
        self.multipart.complete(session).await
    }

    /// Abort an upload.
    pub async fn abort_upload(
        &self,
        bucket: Option<&str>,
        key: &str,
        upload_id: &str,
    ) -> Result<(), StoreError> {
        let bucket = self.bucket(bucket)?;
        self.multipart.abort(bucket, key, upload_id).await
    }

    /// Uploads that are neither completed nor aborted.
    pub async fn list_in_flight_uploads(
        &self,
        bucket: Option<&str>,
        prefix: Option<&str>,
        delimiter: Option<&str>,
    ) -> Result<Vec<UploadSummary>, StoreError> {
        let bucket = self.bucket(bucket)?;
        self.multipart.list_in_flight(bucket, prefix, delimiter).await
    }
}

impl std::fmt::Debug for ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ObjectStore`].
#[derive(Default)]
pub struct ObjectStoreBuilder {
    config: Option<StoreConfig>,
    from_env: bool,
    backend: Option<Arc<dyn ObjectStoreBackend>>,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl ObjectStoreBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the provided configuration.
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env(mut self) -> Self {
        self.from_env = true;
        self
    }

    /// Use a custom backend instead of the S3 REST one.
    pub fn backend(mut self, backend: Arc<dyn ObjectStoreBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Use a custom HTTP transport under the S3 REST backend.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the facade.
    pub fn build(self) -> Result<ObjectStore, StoreError> {
        let config = match self.config {
            Some(config) => config,
            None if self.from_env => StoreConfig::builder().from_env().build()?,
            None => return Err(ConfigurationError::MissingEndpoint.into()),
        };
        if !config.enabled {
            return Err(ConfigurationError::Disabled.into());
        }
        let config = Arc::new(config);

        let backend: Arc<dyn ObjectStoreBackend> = match (self.backend, self.transport) {
            (Some(backend), _) => backend,
            (None, Some(transport)) => {
                let signer = SigV4Signer::new(config.key_pair(), config.region.clone());
                Arc::new(HttpBackend::new(config.clone(), transport, Arc::new(signer))?)
            }
            (None, None) => Arc::new(HttpBackend::from_config(config.clone())?),
        };

        Ok(ObjectStore {
            multipart: MultipartCoordinator::new(backend.clone()),
            config,
            backend,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::InMemoryBackend;
    use crate::presign::TimeUnit;
    use bytes::Bytes;

    fn config() -> StoreConfig {
        StoreConfig::builder()
            .endpoint("http://store.example.com")
            .credentials("AKID", "SECRET")
            .bucket("b")
            .build()
            .unwrap()
    }

    fn store(backend: Arc<InMemoryBackend>) -> ObjectStore {
        ObjectStore::builder()
            .config(config())
            .backend(backend)
            .build()
            .unwrap()
    }

    #[test]
    fn test_disabled_config_is_rejected() {
        let config = StoreConfig::builder()
            .endpoint("http://store.example.com")
            .credentials("AKID", "SECRET")
            .enabled(false)
            .build()
            .unwrap();
        let result = ObjectStore::builder()
            .config(config)
            .backend(Arc::new(InMemoryBackend::new()))
            .build();
        assert!(matches!(
            result,
            Err(StoreError::Configuration(ConfigurationError::Disabled))
        ));
    }

    #[tokio::test]
    async fn test_missing_default_bucket() {
        let config = StoreConfig::builder()
            .endpoint("http://store.example.com")
            .credentials("AKID", "SECRET")
            .build()
            .unwrap();
        let store = ObjectStore::builder()
            .config(config)
            .backend(Arc::new(InMemoryBackend::new()))
            .build()
            .unwrap();

        let result = store.bucket_exists(None).await;
        assert!(matches!(
            result,
            Err(StoreError::Configuration(ConfigurationError::MissingDefaultBucket))
        ));
    }

    #[tokio::test]
    async fn test_create_bucket_applies_policy_to_new_and_existing_buckets() {
        let backend = Arc::new(InMemoryBackend::new());
        let store = store(backend.clone());

        assert!(store
            .create_bucket(Some("fresh"), Some(crate::policy::PolicyType::ReadOnly.into()))
            .await
            .unwrap());
        let policy = store.bucket_policy(Some("fresh")).await.unwrap().unwrap();
        assert!(policy.contains("arn:aws:s3:::fresh/*"));

        assert!(store
            .create_bucket(Some("fresh"), Some(BucketPolicy::Custom("{}".to_string())))
            .await
            .unwrap());
        assert_eq!(backend.call_count("create_bucket"), 1);
        assert_eq!(backend.call_count("put_bucket_policy"), 2);
        assert_eq!(
            store.bucket_policy(Some("fresh")).await.unwrap().as_deref(),
            Some("{}")
        );

        assert!(store.create_bucket(Some("fresh"), None).await.unwrap());
        assert_eq!(backend.call_count("put_bucket_policy"), 2);
    }

    #[tokio::test]
    async fn test_put_rejects_empty_stream() {
        let store = store(Arc::new(InMemoryBackend::new().with_bucket("b")));
        let empty = ByteSource::from_stream(futures::stream::empty(), 0);

        let result = store
            .put_object("k", empty, PutObjectOptions::default())
            .await;
        assert!(matches!(
            result,
            Err(StoreError::InvalidArgument(
                ArgumentError::NonPositiveContentLength { .. }
            ))
        ));
    }

    #[tokio::test]
    async fn test_put_normalizes_key_and_defaults_content_type() {
        let backend = Arc::new(InMemoryBackend::new().with_bucket("b"));
        let store = store(backend.clone());

        store
            .put_object("/docs/a.txt", Bytes::from_static(b"hello"), PutObjectOptions::default())
            .await
            .unwrap();

        assert_eq!(backend.object("b", "docs/a.txt").unwrap(), Bytes::from_static(b"hello"));
        let metadata = store.object_metadata(None, "docs/a.txt").await.unwrap();
        assert_eq!(metadata.content_type.as_deref(), Some(DEFAULT_CONTENT_TYPE));
    }

    #[tokio::test]
    async fn test_inverted_range_is_rejected() {
        let backend = Arc::new(InMemoryBackend::new().with_bucket("b"));
        let store = store(backend.clone());

        let result = store.get_object_range(None, "k", 10, 2).await;
        assert!(matches!(
            result,
            Err(StoreError::InvalidArgument(ArgumentError::InvalidRange { start: 10, end: 2 }))
        ));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_rename_copies_then_deletes() {
        let backend = Arc::new(InMemoryBackend::new().with_bucket("b"));
        let store = store(backend.clone());
        store
            .put_object("old.txt", Bytes::from_static(b"x"), PutObjectOptions::default())
            .await
            .unwrap();

        store.rename_object(None, "old.txt", "new.txt").await.unwrap();

        assert!(!store.object_exists(None, "old.txt").await.unwrap());
        assert!(store.object_exists(None, "new.txt").await.unwrap());
        let calls = backend.calls();
        let copy = calls.iter().position(|c| *c == "copy_object").unwrap();
        let delete = calls.iter().position(|c| *c == "delete_object").unwrap();
        assert!(copy < delete);
    }

    #[test]
    fn test_gateway_url_with_custom_domain_needs_no_bucket() {
        let config = StoreConfig::builder()
            .endpoint("http://store.example.com")
            .credentials("AKID", "SECRET")
            .custom_domain("https://cdn.example.com")
            .build()
            .unwrap();
        let store = ObjectStore::builder()
            .config(config)
            .backend(Arc::new(InMemoryBackend::new()))
            .build()
            .unwrap();

        assert_eq!(
            store.gateway_url(None, "/file.png").unwrap(),
            "https://cdn.example.com/file.png"
        );
    }

    #[test]
    fn test_presign_uses_defaults() {
        let store = store(Arc::new(InMemoryBackend::new().with_bucket("b")));
        let before = Utc::now();

        let presigned = store
            .presign(PresignOptions::new("/a.bin").expire_in(ExpireIn::new(2, TimeUnit::Hours)))
            .unwrap();

        assert_eq!(presigned.request.bucket, "b");
        assert_eq!(presigned.request.key.as_str(), "a.bin");
        assert_eq!(presigned.request.content_type, DEFAULT_CONTENT_TYPE);
        assert!(presigned.request.expiration >= before + chrono::Duration::hours(2));
        assert!(presigned.url.starts_with("memory://b/a.bin"));
    }
}
