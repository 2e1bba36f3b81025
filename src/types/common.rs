//! Common data types shared by the backend contract and the facade.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Storage class of an object or upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageClass {
    /// Standard storage.
    #[default]
    Standard,
    /// Reduced redundancy storage.
    ReducedRedundancy,
    /// Infrequent access.
    StandardIa,
    /// Single-zone infrequent access.
    OnezoneIa,
    /// Automatic tiering.
    IntelligentTiering,
    /// Archive.
    Glacier,
    /// Long-term archive.
    DeepArchive,
}

impl StorageClass {
    /// Returns the wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageClass::Standard => "STANDARD",
            StorageClass::ReducedRedundancy => "REDUCED_REDUNDANCY",
            StorageClass::StandardIa => "STANDARD_IA",
            StorageClass::OnezoneIa => "ONEZONE_IA",
            StorageClass::IntelligentTiering => "INTELLIGENT_TIERING",
            StorageClass::Glacier => "GLACIER",
            StorageClass::DeepArchive => "DEEP_ARCHIVE",
        }
    }
}

impl std::str::FromStr for StorageClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STANDARD" => Ok(StorageClass::Standard),
            "REDUCED_REDUNDANCY" => Ok(StorageClass::ReducedRedundancy),
            "STANDARD_IA" => Ok(StorageClass::StandardIa),
            "ONEZONE_IA" => Ok(StorageClass::OnezoneIa),
            "INTELLIGENT_TIERING" => Ok(StorageClass::IntelligentTiering),
            "GLACIER" => Ok(StorageClass::Glacier),
            "DEEP_ARCHIVE" => Ok(StorageClass::DeepArchive),
            _ => Err(format!("Unknown storage class: {}", s)),
        }
    }
}

/// A bucket as listed by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Bucket name.
    pub name: String,
    /// Creation time, when reported.
    pub creation_date: Option<DateTime<Utc>>,
}

/// Owner of an object or upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// Canonical ID.
    pub id: Option<String>,
    /// Display name.
    pub display_name: Option<String>,
}

/// An object entry from a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSummary {
    /// Object key.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub last_modified: Option<DateTime<Utc>>,
    /// Entity tag.
    pub e_tag: Option<String>,
    /// Storage class.
    pub storage_class: Option<StorageClass>,
    /// Owner, when the listing includes it.
    pub owner: Option<Owner>,
}

/// One version (or delete marker) of an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectVersion {
    /// Object key.
    pub key: String,
    /// Version ID.
    pub version_id: String,
    /// Whether this is the current version.
    pub is_latest: bool,
    /// Whether this entry is a delete marker.
    pub is_delete_marker: bool,
    /// Last modification time.
    pub last_modified: Option<DateTime<Utc>>,
    /// Entity tag (absent for delete markers).
    pub e_tag: Option<String>,
    /// Size in bytes (zero for delete markers).
    pub size: u64,
}

/// Object metadata as returned by a HEAD request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    /// Content length in bytes.
    pub content_length: u64,
    /// Content type.
    pub content_type: Option<String>,
    /// Entity tag.
    pub e_tag: Option<String>,
    /// Last modification time.
    pub last_modified: Option<DateTime<Utc>>,
    /// Cache-Control header.
    pub cache_control: Option<String>,
    /// Content-Disposition header.
    pub content_disposition: Option<String>,
    /// Content-Encoding header.
    pub content_encoding: Option<String>,
    /// Version ID.
    pub version_id: Option<String>,
    /// User metadata (`x-amz-meta-*`), keyed without the prefix.
    pub user_metadata: BTreeMap<String, String>,
}

/// Bucket versioning state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VersioningStatus {
    /// Versioning was never enabled.
    Unversioned,
    /// New objects get unique version ids.
    Enabled,
    /// New objects get the null version id; old versions are kept.
    Suspended,
}

impl VersioningStatus {
    /// Wire representation. `Unversioned` cannot be set, only read.
    pub fn as_str(&self) -> &'static str {
        match self {
            VersioningStatus::Unversioned => "",
            VersioningStatus::Enabled => "Enabled",
            VersioningStatus::Suspended => "Suspended",
        }
    }
}

/// Bucket lifecycle configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleConfiguration {
    /// Rules, in document order.
    pub rules: Vec<LifecycleRule>,
}

/// One lifecycle rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleRule {
    /// Rule ID.
    pub id: String,
    /// Key prefix the rule applies to; empty for the whole bucket.
    pub prefix: String,
    /// Whether the rule is active.
    pub enabled: bool,
    /// Expire current objects this many days after creation.
    pub expiration_days: Option<u32>,
    /// Expire noncurrent versions this many days after they become noncurrent.
    pub noncurrent_version_expiration_days: Option<u32>,
    /// Abort multipart uploads still in flight this many days after initiation.
    pub abort_incomplete_multipart_upload_days: Option<u32>,
}

/// Bucket event notification configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfiguration {
    /// Targets, in document order.
    pub targets: Vec<NotificationTarget>,
}

/// Kind of notification destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    /// Message queue.
    Queue,
    /// Pub/sub topic.
    Topic,
    /// Serverless function.
    Function,
}

impl NotificationKind {
    /// XML element wrapping one configuration of this kind.
    pub fn element(&self) -> &'static str {
        match self {
            NotificationKind::Queue => "QueueConfiguration",
            NotificationKind::Topic => "TopicConfiguration",
            NotificationKind::Function => "CloudFunctionConfiguration",
        }
    }

    /// XML element holding the destination ARN.
    pub fn arn_element(&self) -> &'static str {
        match self {
            NotificationKind::Queue => "Queue",
            NotificationKind::Topic => "Topic",
            NotificationKind::Function => "CloudFunction",
        }
    }
}

/// One notification destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationTarget {
    /// Configuration ID.
    pub id: Option<String>,
    /// Destination kind.
    pub kind: NotificationKind,
    /// Destination ARN.
    pub arn: String,
    /// Event names (e.g. `s3:ObjectCreated:*`).
    pub events: Vec<String>,
    /// Only keys with this prefix.
    pub prefix: Option<String>,
    /// Only keys with this suffix.
    pub suffix: Option<String>,
}
