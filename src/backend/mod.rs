//! The object store backend contract.
//!
//! [`ObjectStoreBackend`] is every capability the facade and the multipart
//! coordinator consume. Implementations report failures as [`BackendError`];
//! callers above this seam pass them through unmodified.

mod http;

pub use http::HttpBackend;

use crate::error::BackendError;
use crate::key::ObjectKey;
use crate::presign::PresignedRequest;
use crate::types::*;
use async_trait::async_trait;

/// Store client consumed by the facade.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStoreBackend: Send + Sync {
    /// Returns true if the bucket exists and is reachable.
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, BackendError>;

    /// Create a bucket.
    async fn create_bucket(&self, bucket: &str) -> Result<(), BackendError>;

    /// Delete an empty bucket.
    async fn delete_bucket(&self, bucket: &str) -> Result<(), BackendError>;

    /// List all buckets of the account.
    async fn list_buckets(&self) -> Result<Vec<Bucket>, BackendError>;

    /// Store an object in one request.
    async fn put_object(&self, input: PutObjectInput) -> Result<PutObjectOutput, BackendError>;

    /// Read an object or a byte range of it.
    async fn get_object(&self, input: GetObjectInput) -> Result<GetObjectOutput, BackendError>;

    /// Read an object as a chunk stream.
    ///
    /// The default buffers the object through [`ObjectStoreBackend::get_object`].
    async fn get_object_stream(
        &self,
        input: GetObjectInput,
    ) -> Result<GetObjectStream, BackendError> {
        self.get_object(input).await.map(GetObjectStream::from)
    }

    /// Read object metadata.
    async fn head_object(&self, bucket: &str, key: &ObjectKey)
        -> Result<ObjectMetadata, BackendError>;

    /// Delete an object. Deleting a missing key succeeds.
    async fn delete_object(&self, bucket: &str, key: &ObjectKey) -> Result<(), BackendError>;

    /// Delete several objects in one request.
    async fn delete_objects(
        &self,
        bucket: &str,
        keys: &[ObjectKey],
    ) -> Result<DeleteObjectsOutput, BackendError>;

    /// Copy an object server-side.
    async fn copy_object(&self, input: CopyObjectInput) -> Result<CopyObjectOutput, BackendError>;

    /// List one page of objects.
    async fn list_objects(&self, input: ListObjectsInput)
        -> Result<ListObjectsOutput, BackendError>;

    /// List one page of object versions.
    async fn list_object_versions(
        &self,
        input: ListObjectVersionsInput,
    ) -> Result<ListObjectVersionsOutput, BackendError>;

    /// Allocate a multipart upload id.
    async fn create_multipart_upload(
        &self,
        input: CreateMultipartUploadInput,
    ) -> Result<CreateMultipartUploadOutput, BackendError>;

    /// Upload one part.
    async fn upload_part(&self, input: UploadPartInput) -> Result<UploadPartOutput, BackendError>;

    /// List one page of the committed parts of an upload.
    async fn list_parts(&self, input: ListPartsInput) -> Result<ListPartsOutput, BackendError>;

    /// Assemble the parts into the final object.
    async fn complete_multipart_upload(
        &self,
        input: CompleteMultipartUploadInput,
    ) -> Result<CompleteMultipartUploadOutput, BackendError>;

    /// Release an upload and its parts.
    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &ObjectKey,
        upload_id: &str,
    ) -> Result<(), BackendError>;

    /// List one page of in-flight uploads.
    async fn list_multipart_uploads(
        &self,
        input: ListMultipartUploadsInput,
    ) -> Result<ListMultipartUploadsOutput, BackendError>;

    /// Sign a request descriptor into a URL.
    fn presign(&self, request: &PresignedRequest) -> Result<String, BackendError>;

    /// Attach a policy document to a bucket.
    async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> Result<(), BackendError>;

    /// The bucket's policy document, if it has one.
    async fn get_bucket_policy(&self, bucket: &str) -> Result<Option<String>, BackendError>;

    /// Enable or suspend versioning.
    async fn put_bucket_versioning(
        &self,
        bucket: &str,
        status: VersioningStatus,
    ) -> Result<(), BackendError>;

    /// Current versioning state.
    async fn get_bucket_versioning(&self, bucket: &str) -> Result<VersioningStatus, BackendError>;

    /// Replace the lifecycle rules.
    async fn put_bucket_lifecycle(
        &self,
        bucket: &str,
        config: &LifecycleConfiguration,
    ) -> Result<(), BackendError>;

    /// Current lifecycle rules; empty if none are set.
    async fn get_bucket_lifecycle(&self, bucket: &str)
        -> Result<LifecycleConfiguration, BackendError>;

    /// Replace the event notification targets.
    async fn put_bucket_notification(
        &self,
        bucket: &str,
        config: &NotificationConfiguration,
    ) -> Result<(), BackendError>;

    /// Current event notification targets.
    async fn get_bucket_notification(
        &self,
        bucket: &str,
    ) -> Result<NotificationConfiguration, BackendError>;
}
