//! Inputs of backend operations.

use crate::key::ObjectKey;
use crate::transfer::ByteSource;
use std::collections::BTreeMap;

/// Default page size of object listings.
pub const DEFAULT_MAX_KEYS: u32 = 1000;

/// Request to store an object in one shot.
#[derive(Debug)]
pub struct PutObjectInput {
    /// Target bucket.
    pub bucket: String,
    /// Object key.
    pub key: ObjectKey,
    /// Object body.
    pub body: ByteSource,
    /// Content type.
    pub content_type: String,
    /// User metadata, keyed without the `x-amz-meta-` prefix.
    pub metadata: BTreeMap<String, String>,
    /// Bodies up to this size are buffered and signed; longer streams are
    /// sent unsigned.
    pub read_limit: u64,
}

/// Request to read an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetObjectInput {
    /// Bucket.
    pub bucket: String,
    /// Object key.
    pub key: ObjectKey,
    /// Inclusive byte range.
    pub range: Option<(u64, u64)>,
    /// Specific version.
    pub version_id: Option<String>,
}

impl GetObjectInput {
    /// Read the whole current version.
    pub fn new(bucket: impl Into<String>, key: impl Into<ObjectKey>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            range: None,
            version_id: None,
        }
    }

    /// Restrict the read to bytes `start..=end`.
    pub fn with_range(mut self, start: u64, end: u64) -> Self {
        self.range = Some((start, end));
        self
    }

    /// `Range` header value, if a range is set.
    pub fn range_header(&self) -> Option<String> {
        self.range
            .map(|(start, end)| format!("bytes={}-{}", start, end))
    }
}

/// How a copy treats the source object's metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MetadataDirective {
    /// Keep the source metadata.
    #[default]
    Copy,
    /// Replace it with the metadata in the request.
    Replace,
}

impl MetadataDirective {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataDirective::Copy => "COPY",
            MetadataDirective::Replace => "REPLACE",
        }
    }
}

/// Request to copy an object server-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyObjectInput {
    /// Source bucket.
    pub source_bucket: String,
    /// Source key.
    pub source_key: ObjectKey,
    /// Destination bucket.
    pub dest_bucket: String,
    /// Destination key.
    pub dest_key: ObjectKey,
    /// Metadata handling.
    pub metadata_directive: MetadataDirective,
    /// Content type, used with [`MetadataDirective::Replace`].
    pub content_type: Option<String>,
    /// User metadata, used with [`MetadataDirective::Replace`].
    pub metadata: BTreeMap<String, String>,
}

impl CopyObjectInput {
    /// Copy keeping the source metadata.
    pub fn new(
        source_bucket: impl Into<String>,
        source_key: impl Into<ObjectKey>,
        dest_bucket: impl Into<String>,
        dest_key: impl Into<ObjectKey>,
    ) -> Self {
        Self {
            source_bucket: source_bucket.into(),
            source_key: source_key.into(),
            dest_bucket: dest_bucket.into(),
            dest_key: dest_key.into(),
            metadata_directive: MetadataDirective::Copy,
            content_type: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Value of the `x-amz-copy-source` header, before encoding.
    pub fn copy_source(&self) -> String {
        format!("{}/{}", self.source_bucket, self.source_key)
    }
}

/// Request to list objects (ListObjectsV2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListObjectsInput {
    /// Bucket.
    pub bucket: String,
    /// Only keys starting with this prefix.
    pub prefix: Option<String>,
    /// Group keys by this delimiter.
    pub delimiter: Option<String>,
    /// Page size.
    pub max_keys: u32,
    /// Token from the previous page.
    pub continuation_token: Option<String>,
}

impl ListObjectsInput {
    /// List a bucket from the start.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: None,
            delimiter: None,
            max_keys: DEFAULT_MAX_KEYS,
            continuation_token: None,
        }
    }
}

/// Request to list object versions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListObjectVersionsInput {
    /// Bucket.
    pub bucket: String,
    /// Only keys starting with this prefix.
    pub prefix: Option<String>,
    /// Key marker from the previous page.
    pub key_marker: Option<String>,
    /// Version marker from the previous page.
    pub version_id_marker: Option<String>,
}

/// Request to start a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateMultipartUploadInput {
    /// Bucket.
    pub bucket: String,
    /// Object key.
    pub key: ObjectKey,
    /// Content type of the final object.
    pub content_type: String,
    /// User metadata of the final object.
    pub metadata: BTreeMap<String, String>,
}

/// Request to upload one part.
#[derive(Debug)]
pub struct UploadPartInput {
    /// Bucket.
    pub bucket: String,
    /// Object key.
    pub key: ObjectKey,
    /// Upload id.
    pub upload_id: String,
    /// Part number, 1..=10000.
    pub part_number: u32,
    /// Byte length of the part.
    pub content_length: u64,
    /// Base64 MD5 of the part, checked by the store.
    pub content_md5: Option<String>,
    /// Part content.
    pub body: ByteSource,
}

/// Request to list the committed parts of an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPartsInput {
    /// Bucket.
    pub bucket: String,
    /// Object key.
    pub key: ObjectKey,
    /// Upload id.
    pub upload_id: String,
    /// Continue after this part number.
    pub part_number_marker: Option<u32>,
}

/// A part reference in a completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPart {
    /// Part number.
    pub part_number: u32,
    /// Entity tag returned when the part was uploaded.
    pub e_tag: String,
}

/// Request to assemble the uploaded parts into the final object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteMultipartUploadInput {
    /// Bucket.
    pub bucket: String,
    /// Object key.
    pub key: ObjectKey,
    /// Upload id.
    pub upload_id: String,
    /// Parts, ordered by part number.
    pub parts: Vec<CompletedPart>,
}

/// Request to list in-flight multipart uploads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListMultipartUploadsInput {
    /// Bucket.
    pub bucket: String,
    /// Only keys starting with this prefix.
    pub prefix: Option<String>,
    /// Group keys by this delimiter.
    pub delimiter: Option<String>,
    /// Key marker from the previous page.
    pub key_marker: Option<String>,
    /// Upload id marker from the previous page.
    pub upload_id_marker: Option<String>,
}
