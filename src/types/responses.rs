//! Outputs of backend operations.

use super::common::{ObjectMetadata, ObjectSummary, ObjectVersion, Owner, StorageClass};
use crate::transfer::{ByteSource, ByteStream};
use bytes::Bytes;
use chrono::{DateTime, Utc};

/// Result of a single-shot put.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutObjectOutput {
    /// Entity tag of the stored object.
    pub e_tag: Option<String>,
    /// Version ID, on versioned buckets.
    pub version_id: Option<String>,
}

/// Object content with its metadata.
#[derive(Debug, Clone)]
pub struct GetObjectOutput {
    /// Content (or the requested range of it).
    pub body: Bytes,
    /// Metadata from the response headers.
    pub metadata: ObjectMetadata,
    /// `Content-Range` of a ranged read.
    pub content_range: Option<String>,
}

/// Object content delivered as a chunk stream.
pub struct GetObjectStream {
    /// Content chunks, in order.
    pub body: ByteStream,
    /// Metadata from the response headers.
    pub metadata: ObjectMetadata,
    /// `Content-Range` of a ranged read.
    pub content_range: Option<String>,
}

impl From<GetObjectOutput> for GetObjectStream {
    fn from(output: GetObjectOutput) -> Self {
        Self {
            body: ByteSource::Bytes(output.body).into_stream(),
            metadata: output.metadata,
            content_range: output.content_range,
        }
    }
}

impl std::fmt::Debug for GetObjectStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GetObjectStream")
            .field("metadata", &self.metadata)
            .field("content_range", &self.content_range)
            .finish_non_exhaustive()
    }
}

/// Result of a server-side copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyObjectOutput {
    /// Entity tag of the new object.
    pub e_tag: Option<String>,
    /// Modification time of the new object.
    pub last_modified: Option<DateTime<Utc>>,
}

/// One page of an object listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListObjectsOutput {
    /// Objects on this page.
    pub objects: Vec<ObjectSummary>,
    /// Prefixes rolled up by the delimiter.
    pub common_prefixes: Vec<String>,
    /// Whether more pages follow.
    pub is_truncated: bool,
    /// Token for the next page.
    pub next_continuation_token: Option<String>,
}

/// One page of a version listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListObjectVersionsOutput {
    /// Versions and delete markers, in listing order.
    pub versions: Vec<ObjectVersion>,
    /// Whether more pages follow.
    pub is_truncated: bool,
    /// Key marker for the next page.
    pub next_key_marker: Option<String>,
    /// Version marker for the next page.
    pub next_version_id_marker: Option<String>,
}

/// Per-key failure in a batch delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteError {
    /// Key that could not be deleted.
    pub key: String,
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
}

/// Result of a batch delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteObjectsOutput {
    /// Keys that were deleted.
    pub deleted: Vec<String>,
    /// Keys that were not.
    pub errors: Vec<DeleteError>,
}

/// A freshly allocated multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateMultipartUploadOutput {
    /// Bucket.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Upload id assigned by the store.
    pub upload_id: String,
}

/// Result of a part upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadPartOutput {
    /// Entity tag of the committed part.
    pub e_tag: String,
}

/// A committed part as listed by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartInfo {
    /// Part number.
    pub part_number: u32,
    /// Entity tag; empty if the store reported none.
    pub e_tag: String,
    /// Size in bytes.
    pub size: u64,
    /// Upload time.
    pub last_modified: Option<DateTime<Utc>>,
}

/// One page of a part listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPartsOutput {
    /// Parts on this page.
    pub parts: Vec<PartInfo>,
    /// Whether more pages follow.
    pub is_truncated: bool,
    /// Marker for the next page.
    pub next_part_number_marker: Option<u32>,
}

/// Result of completing a multipart upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompleteMultipartUploadOutput {
    /// URL of the assembled object.
    pub location: Option<String>,
    /// Entity tag of the assembled object.
    pub e_tag: Option<String>,
}

/// An in-flight multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartUploadInfo {
    /// Object key.
    pub key: String,
    /// Upload id.
    pub upload_id: String,
    /// Initiation time.
    pub initiated: Option<DateTime<Utc>>,
    /// Storage class of the final object.
    pub storage_class: Option<StorageClass>,
    /// Owner of the upload.
    pub owner: Option<Owner>,
}

/// One page of an in-flight upload listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListMultipartUploadsOutput {
    /// Uploads on this page.
    pub uploads: Vec<MultipartUploadInfo>,
    /// Whether more pages follow.
    pub is_truncated: bool,
    /// Key marker for the next page.
    pub next_key_marker: Option<String>,
    /// Upload id marker for the next page.
    pub next_upload_id_marker: Option<String>,
}
