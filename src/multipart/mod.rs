//! Multipart upload coordination.
//!
//! A multipart upload runs through initiate, any number of part uploads,
//! and then either completion or abort. The coordinator holds no session
//! state of its own: an [`UploadSession`] is owned by the caller and passed
//! to every call, and completion and abort consume it. The backend's part
//! listing, not the session's bookkeeping, is the input to completion.
//!
//! `complete` must not run while part uploads for the same session are
//! still in flight; the backend would assemble whatever it holds at that
//! moment.

use crate::backend::ObjectStoreBackend;
use crate::error::{ArgumentError, BackendResultExt, StoreError};
use crate::key::ObjectKey;
use crate::presign::DEFAULT_CONTENT_TYPE;
use crate::transfer::{content_md5, ByteSource};
use crate::types::{
    CompleteMultipartUploadInput, CompletedPart, CreateMultipartUploadInput,
    ListMultipartUploadsInput, ListPartsInput, StorageClass, UploadPartInput,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Lowest valid part number.
pub const MIN_PART_NUMBER: u32 = 1;

/// Highest valid part number.
pub const MAX_PART_NUMBER: u32 = 10_000;

/// Bucket, key and upload id of one multipart upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UploadTarget {
    /// Bucket.
    pub bucket: String,
    /// Normalized object key.
    pub key: ObjectKey,
    /// Upload id assigned by the backend.
    pub upload_id: String,
}

impl UploadTarget {
    /// Create a target, normalizing the key.
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<ObjectKey>,
        upload_id: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            upload_id: upload_id.into(),
        }
    }

    fn describe(&self) -> String {
        format!("{}/{}#{}", self.bucket, self.key, self.upload_id)
    }
}

/// State of a live session.
///
/// Completed and aborted sessions no longer exist as values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Upload id allocated, no part committed yet.
    Initiated,
    /// At least one part committed.
    PartsUploading,
}

/// A part the backend has committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartDescriptor {
    /// Part number.
    pub part_number: u32,
    /// Byte length.
    pub size: u64,
    /// Content tag reported by the backend; empty if it reported none.
    pub e_tag: String,
    /// Base64 MD5 digest sent with the part, if any.
    pub checksum: Option<String>,
    /// When the backend committed the part.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Caller-held handle of one in-progress multipart upload.
#[derive(Debug, Clone)]
pub struct UploadSession {
    target: UploadTarget,
    content_type: String,
    initiated: DateTime<Utc>,
    parts: BTreeMap<u32, PartDescriptor>,
}

impl UploadSession {
    /// Rebuild a session for an upload id persisted by the caller.
    ///
    /// The session starts without local part records; completion reads the
    /// committed parts from the backend anyway.
    pub fn resume(target: UploadTarget, content_type: impl Into<String>) -> Self {
        Self {
            target,
            content_type: content_type.into(),
            initiated: Utc::now(),
            parts: BTreeMap::new(),
        }
    }

    /// Bucket of the upload.
    pub fn bucket(&self) -> &str {
        &self.target.bucket
    }

    /// Object key of the upload.
    pub fn key(&self) -> &ObjectKey {
        &self.target.key
    }

    /// Upload id assigned by the backend.
    pub fn upload_id(&self) -> &str {
        &self.target.upload_id
    }

    /// Bucket, key and upload id.
    pub fn target(&self) -> &UploadTarget {
        &self.target
    }

    /// Content type of the final object.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// When the session was initiated (or resumed).
    pub fn initiated(&self) -> DateTime<Utc> {
        self.initiated
    }

    /// Parts recorded so far, ordered by part number.
    pub fn parts(&self) -> impl Iterator<Item = &PartDescriptor> {
        self.parts.values()
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        if self.parts.is_empty() {
            SessionState::Initiated
        } else {
            SessionState::PartsUploading
        }
    }

    /// Record a part uploaded through [`MultipartCoordinator::upload_part_to`].
    ///
    /// A second record for the same part number replaces the first.
    pub fn record_part(&mut self, part: PartDescriptor) {
        self.parts.insert(part.part_number, part);
    }
}

/// One part to upload.
#[derive(Debug)]
pub struct PartUpload {
    part_number: u32,
    size: u64,
    checksum: Option<String>,
    body: ByteSource,
}

impl PartUpload {
    /// Part from in-memory bytes; the MD5 checksum is computed over the content.
    pub fn from_bytes(part_number: u32, bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self {
            part_number,
            size: bytes.len() as u64,
            checksum: Some(content_md5(&bytes)),
            body: ByteSource::Bytes(bytes),
        }
    }

    /// Part with an explicit size and optional base64 MD5 checksum.
    pub fn new(part_number: u32, size: u64, checksum: Option<String>, body: ByteSource) -> Self {
        Self {
            part_number,
            size,
            checksum,
            body,
        }
    }

    /// Part number.
    pub fn part_number(&self) -> u32 {
        self.part_number
    }

    /// Declared byte length.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Checksum sent as `Content-MD5`.
    pub fn checksum(&self) -> Option<&str> {
        self.checksum.as_deref()
    }

    /// Reject parts the backend would refuse anyway.
    ///
    /// The coordinator leaves the part number range and empty parts to the
    /// backend; call this before reading a large body to fail early.
    pub fn validate(&self) -> Result<(), ArgumentError> {
        if !(MIN_PART_NUMBER..=MAX_PART_NUMBER).contains(&self.part_number) {
            return Err(ArgumentError::InvalidPartNumber {
                part_number: self.part_number,
            });
        }
        if self.size == 0 {
            return Err(ArgumentError::NonPositiveContentLength { length: self.size });
        }
        self.check_body()
    }

    /// The declared size must match an in-memory body.
    fn check_body(&self) -> Result<(), ArgumentError> {
        if let ByteSource::Bytes(bytes) = &self.body {
            if bytes.len() as u64 != self.size {
                return Err(ArgumentError::ContentLengthMismatch {
                    declared: self.size,
                    actual: bytes.len() as u64,
                });
            }
        }
        Ok(())
    }
}

/// Result of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedUpload {
    /// Bucket.
    pub bucket: String,
    /// Key of the assembled object.
    pub key: ObjectKey,
    /// The upload id, no longer valid.
    pub upload_id: String,
    /// Tag of the assembled object.
    pub e_tag: Option<String>,
    /// Location reported by the backend.
    pub location: Option<String>,
    /// The parts that were assembled, in order.
    pub parts: Vec<PartDescriptor>,
}

impl CompletedUpload {
    /// `bucket/key` of the final object.
    pub fn object_ref(&self) -> String {
        format!("{}/{}", self.bucket, self.key)
    }
}

/// An upload that is neither completed nor aborted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSummary {
    /// Bucket.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Upload id.
    pub upload_id: String,
    /// When the upload was initiated.
    pub initiated: Option<DateTime<Utc>>,
    /// Storage class of the pending object.
    pub storage_class: Option<StorageClass>,
    /// Owner id.
    pub owner_id: Option<String>,
    /// Owner display name.
    pub owner_display_name: Option<String>,
}

/// Drives multipart uploads against a backend.
#[derive(Clone)]
pub struct MultipartCoordinator {
    backend: Arc<dyn ObjectStoreBackend>,
}

impl MultipartCoordinator {
    /// Create a coordinator.
    pub fn new(backend: Arc<dyn ObjectStoreBackend>) -> Self {
        Self { backend }
    }

    /// Allocate a fresh upload id for `bucket`/`key`.
    ///
    /// Every call allocates a new id, even for the same key.
    pub async fn initiate(
        &self,
        bucket: &str,
        key: impl Into<ObjectKey>,
        content_type: &str,
    ) -> Result<UploadSession, StoreError> {
        let key = key.into();
        if key.is_empty() {
            return Err(ArgumentError::InvalidKey {
                key: key.into_string(),
                reason: "object key is empty".to_string(),
            }
            .into());
        }
        let content_type = if content_type.trim().is_empty() {
            DEFAULT_CONTENT_TYPE.to_string()
        } else {
            content_type.to_string()
        };

        let output = self
            .backend
            .create_multipart_upload(CreateMultipartUploadInput {
                bucket: bucket.to_string(),
                key: key.clone(),
                content_type: content_type.clone(),
                metadata: BTreeMap::new(),
            })
            .await
            .during("initiate_upload", || format!("{}/{}", bucket, key))?;

        info!(
            bucket = bucket,
            key = %key,
            upload_id = %output.upload_id,
            "Multipart upload initiated"
        );

        Ok(UploadSession {
            target: UploadTarget::new(bucket, key, output.upload_id),
            content_type,
            initiated: Utc::now(),
            parts: BTreeMap::new(),
        })
    }

    /// Upload one part and record it on the session.
    pub async fn upload_part(
        &self,
        session: &mut UploadSession,
        part: PartUpload,
    ) -> Result<PartDescriptor, StoreError> {
        let descriptor = self.upload_part_to(&session.target, part).await?;
        session.record_part(descriptor.clone());
        Ok(descriptor)
    }

    /// Upload one part without a session.
    ///
    /// Distinct parts of one upload may be sent concurrently this way.
    pub async fn upload_part_to(
        &self,
        target: &UploadTarget,
        part: PartUpload,
    ) -> Result<PartDescriptor, StoreError> {
        part.check_body()?;

        let PartUpload {
            part_number,
            size,
            checksum,
            body,
        } = part;

        debug!(
            upload_id = %target.upload_id,
            part_number = part_number,
            size = size,
            "Uploading part"
        );

        let output = self
            .backend
            .upload_part(UploadPartInput {
                bucket: target.bucket.clone(),
                key: target.key.clone(),
                upload_id: target.upload_id.clone(),
                part_number,
                content_length: size,
                content_md5: checksum.clone(),
                body,
            })
            .await
            .during("upload_part", || target.describe())?;

        Ok(PartDescriptor {
            part_number,
            size,
            e_tag: output.e_tag,
            checksum,
            last_modified: Some(Utc::now()),
        })
    }

    /// The backend's record of committed parts, ordered by part number.
    pub async fn list_parts(
        &self,
        bucket: &str,
        key: impl Into<ObjectKey>,
        upload_id: &str,
    ) -> Result<Vec<PartDescriptor>, StoreError> {
        let target = UploadTarget::new(bucket, key, upload_id);
        self.committed_parts(&target).await
    }

    async fn committed_parts(&self, target: &UploadTarget) -> Result<Vec<PartDescriptor>, StoreError> {
        let mut parts = Vec::new();
        let mut marker = None;

        loop {
            let page = self
                .backend
                .list_parts(ListPartsInput {
                    bucket: target.bucket.clone(),
                    key: target.key.clone(),
                    upload_id: target.upload_id.clone(),
                    part_number_marker: marker,
                })
                .await
                .during("list_parts", || target.describe())?;

            parts.extend(page.parts.into_iter().map(|p| PartDescriptor {
                part_number: p.part_number,
                size: p.size,
                e_tag: p.e_tag,
                checksum: None,
                last_modified: p.last_modified,
            }));

            match page.next_part_number_marker {
                Some(next) if page.is_truncated && Some(next) != marker => marker = Some(next),
                _ => break,
            }
        }

        parts.sort_by_key(|p| p.part_number);
        Ok(parts)
    }

    /// Assemble the committed parts into the final object.
    pub async fn complete(&self, session: UploadSession) -> Result<CompletedUpload, StoreError> {
        self.complete_target(session.target).await
    }

    /// Complete an upload known only by its target.
    ///
    /// Fails with [`StoreError::IncompletePartSet`] before any completion
    /// request if a listed part has no content tag.
    pub async fn complete_target(&self, target: UploadTarget) -> Result<CompletedUpload, StoreError> {
        let parts = self.committed_parts(&target).await?;

        if let Some(untagged) = parts.iter().find(|p| p.e_tag.trim().is_empty()) {
            return Err(StoreError::IncompletePartSet {
                bucket: target.bucket,
                key: target.key.into_string(),
                upload_id: target.upload_id,
                part_number: untagged.part_number,
            });
        }

        let completed_parts = parts
            .iter()
            .map(|p| CompletedPart {
                part_number: p.part_number,
                e_tag: p.e_tag.clone(),
            })
            .collect();

        let output = self
            .backend
            .complete_multipart_upload(CompleteMultipartUploadInput {
                bucket: target.bucket.clone(),
                key: target.key.clone(),
                upload_id: target.upload_id.clone(),
                parts: completed_parts,
            })
            .await
            .during("complete_upload", || target.describe())?;

        info!(
            bucket = %target.bucket,
            key = %target.key,
            upload_id = %target.upload_id,
            parts = parts.len(),
            "Multipart upload completed"
        );

        Ok(CompletedUpload {
            bucket: target.bucket,
            key: target.key,
            upload_id: target.upload_id,
            e_tag: output.e_tag,
            location: output.location,
            parts,
        })
    }

    /// Release the backend resources of an upload.
    ///
    /// Aborting an unknown or already aborted id is reported as the backend
    /// reports it.
    pub async fn abort(
        &self,
        bucket: &str,
        key: impl Into<ObjectKey>,
        upload_id: &str,
    ) -> Result<(), StoreError> {
        let target = UploadTarget::new(bucket, key, upload_id);
        self.backend
            .abort_multipart_upload(&target.bucket, &target.key, &target.upload_id)
            .await
            .during("abort_upload", || target.describe())?;

        info!(
            bucket = bucket,
            key = %target.key,
            upload_id = upload_id,
            "Multipart upload aborted"
        );
        Ok(())
    }

    /// Abort the upload behind a session.
    pub async fn abort_session(&self, session: UploadSession) -> Result<(), StoreError> {
        let UploadTarget {
            bucket,
            key,
            upload_id,
        } = session.target;
        self.abort(&bucket, key, &upload_id).await
    }

    /// Uploads in `bucket` that are neither completed nor aborted.
    pub async fn list_in_flight(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        delimiter: Option<&str>,
    ) -> Result<Vec<UploadSummary>, StoreError> {
        let mut summaries = Vec::new();
        let mut input = ListMultipartUploadsInput {
            bucket: bucket.to_string(),
            prefix: prefix.map(String::from),
            delimiter: delimiter.map(String::from),
            ..ListMultipartUploadsInput::default()
        };

        loop {
            let page = self
                .backend
                .list_multipart_uploads(input.clone())
                .await
                .during("list_in_flight_uploads", || bucket.to_string())?;

            summaries.extend(page.uploads.into_iter().map(|upload| {
                let (owner_id, owner_display_name) = match upload.owner {
                    Some(owner) => (owner.id, owner.display_name),
                    None => (None, None),
                };
                UploadSummary {
                    bucket: bucket.to_string(),
                    key: upload.key,
                    upload_id: upload.upload_id,
                    initiated: upload.initiated,
                    storage_class: upload.storage_class,
                    owner_id,
                    owner_display_name,
                }
            }));

            if !page.is_truncated || page.next_key_marker.is_none() {
                break;
            }
            if page.next_key_marker == input.key_marker
                && page.next_upload_id_marker == input.upload_id_marker
            {
                break;
            }
            input.key_marker = page.next_key_marker;
            input.upload_id_marker = page.next_upload_id_marker;
        }

        Ok(summaries)
    }
}

impl std::fmt::Debug for MultipartCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultipartCoordinator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockObjectStoreBackend;
    use crate::error::BackendError;
    use crate::types::{
        CompleteMultipartUploadOutput, CreateMultipartUploadOutput, ListPartsOutput, PartInfo,
        UploadPartOutput,
    };
    use test_case::test_case;

    fn part_info(part_number: u32, e_tag: &str) -> PartInfo {
        PartInfo {
            part_number,
            e_tag: e_tag.to_string(),
            size: 5,
            last_modified: None,
        }
    }

    fn target() -> UploadTarget {
        UploadTarget::new("b", "/dir/file.bin", "U1")
    }

    #[tokio::test]
    async fn test_initiate_normalizes_key_and_defaults_content_type() {
        let mut backend = MockObjectStoreBackend::new();
        backend
            .expect_create_multipart_upload()
            .withf(|input| {
                input.key.as_str() == "dir/file.bin"
                    && input.content_type == DEFAULT_CONTENT_TYPE
            })
            .times(1)
            .returning(|input| {
                Ok(CreateMultipartUploadOutput {
                    bucket: input.bucket,
                    key: input.key.into_string(),
                    upload_id: "U1".to_string(),
                })
            });

        let coordinator = MultipartCoordinator::new(Arc::new(backend));
        let session = coordinator.initiate("b", "/dir/file.bin", "").await.unwrap();

        assert_eq!(session.upload_id(), "U1");
        assert_eq!(session.key().as_str(), "dir/file.bin");
        assert_eq!(session.state(), SessionState::Initiated);
    }

    #[tokio::test]
    async fn test_upload_part_sends_checksum_and_records_part() {
        let mut backend = MockObjectStoreBackend::new();
        backend
            .expect_upload_part()
            .withf(|input| {
                input.part_number == 1
                    && input.content_length == 5
                    && input.content_md5.as_deref() == Some("XUFAKrxLKna5cZ2REBfFkg==")
            })
            .times(1)
            .returning(|_| {
                Ok(UploadPartOutput {
                    e_tag: "\"e1\"".to_string(),
                })
            });

        let coordinator = MultipartCoordinator::new(Arc::new(backend));
        let mut session = UploadSession::resume(target(), "application/zip");
        let part = coordinator
            .upload_part(&mut session, PartUpload::from_bytes(1, &b"hello"[..]))
            .await
            .unwrap();

        assert_eq!(part.e_tag, "\"e1\"");
        assert_eq!(session.state(), SessionState::PartsUploading);
        assert_eq!(session.parts().count(), 1);
    }

    #[tokio::test]
    async fn test_list_parts_follows_pagination() {
        let mut backend = MockObjectStoreBackend::new();
        backend
            .expect_list_parts()
            .withf(|input| input.part_number_marker.is_none())
            .times(1)
            .returning(|_| {
                Ok(ListPartsOutput {
                    parts: vec![part_info(1, "\"a\""), part_info(2, "\"b\"")],
                    is_truncated: true,
                    next_part_number_marker: Some(2),
                })
            });
        backend
            .expect_list_parts()
            .withf(|input| input.part_number_marker == Some(2))
            .times(1)
            .returning(|_| {
                Ok(ListPartsOutput {
                    parts: vec![part_info(3, "\"c\"")],
                    is_truncated: false,
                    next_part_number_marker: None,
                })
            });

        let coordinator = MultipartCoordinator::new(Arc::new(backend));
        let parts = coordinator.list_parts("b", "dir/file.bin", "U1").await.unwrap();

        let numbers: Vec<u32> = parts.iter().map(|p| p.part_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_complete_rejects_untagged_part_without_completing() {
        let mut backend = MockObjectStoreBackend::new();
        backend.expect_list_parts().returning(|_| {
            Ok(ListPartsOutput {
                parts: vec![part_info(1, "\"a\""), part_info(2, ""), part_info(3, "\"c\"")],
                ..ListPartsOutput::default()
            })
        });
        backend.expect_complete_multipart_upload().never();
        backend.expect_abort_multipart_upload().never();

        let coordinator = MultipartCoordinator::new(Arc::new(backend));
        let err = coordinator
            .complete(UploadSession::resume(target(), "application/zip"))
            .await
            .unwrap_err();

        match err {
            StoreError::IncompletePartSet {
                part_number,
                upload_id,
                ..
            } => {
                assert_eq!(part_number, 2);
                assert_eq!(upload_id, "U1");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_complete_sends_listed_parts_in_order() {
        let mut backend = MockObjectStoreBackend::new();
        backend.expect_list_parts().returning(|_| {
            Ok(ListPartsOutput {
                parts: vec![part_info(2, "\"b\""), part_info(1, "\"a\"")],
                ..ListPartsOutput::default()
            })
        });
        backend
            .expect_complete_multipart_upload()
            .withf(|input| {
                input.parts
                    == vec![
                        CompletedPart {
                            part_number: 1,
                            e_tag: "\"a\"".to_string(),
                        },
                        CompletedPart {
                            part_number: 2,
                            e_tag: "\"b\"".to_string(),
                        },
                    ]
            })
            .times(1)
            .returning(|_| {
                Ok(CompleteMultipartUploadOutput {
                    location: None,
                    e_tag: Some("\"ab-2\"".to_string()),
                })
            });

        let coordinator = MultipartCoordinator::new(Arc::new(backend));
        let completed = coordinator.complete_target(target()).await.unwrap();

        assert_eq!(completed.object_ref(), "b/dir/file.bin");
        assert_eq!(completed.parts.len(), 2);
    }

    #[tokio::test]
    async fn test_abort_passes_backend_failure_through() {
        let mut backend = MockObjectStoreBackend::new();
        backend.expect_abort_multipart_upload().returning(|_, _, _| {
            Err(BackendError::NotFound {
                code: "NoSuchUpload".to_string(),
                message: "gone".to_string(),
                request_id: None,
            })
        });

        let coordinator = MultipartCoordinator::new(Arc::new(backend));
        let err = coordinator.abort("b", "k", "U9").await.unwrap_err();

        assert!(err.is_not_found());
        match err {
            StoreError::Backend {
                operation, target, ..
            } => {
                assert_eq!(operation, "abort_upload");
                assert_eq!(target, "b/k#U9");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test_case(0 ; "below range")]
    #[test_case(10_001 ; "above range")]
    fn test_part_number_out_of_range(part_number: u32) {
        let part = PartUpload::from_bytes(part_number, &b"x"[..]);
        assert!(matches!(
            part.validate(),
            Err(ArgumentError::InvalidPartNumber { .. })
        ));
    }

    #[test]
    fn test_declared_size_must_match_bytes() {
        let part = PartUpload::new(1, 10, None, ByteSource::from(&b"short"[..]));
        assert!(matches!(
            part.validate(),
            Err(ArgumentError::ContentLengthMismatch {
                declared: 10,
                actual: 5
            })
        ));

        let empty = PartUpload::new(1, 0, None, ByteSource::from(Vec::new()));
        assert!(matches!(
            empty.validate(),
            Err(ArgumentError::NonPositiveContentLength { .. })
        ));
    }

    #[tokio::test]
    async fn test_part_number_range_is_left_to_backend() {
        let mut backend = MockObjectStoreBackend::new();
        backend
            .expect_upload_part()
            .withf(|input| input.part_number == 10_001)
            .times(1)
            .returning(|_| {
                Err(BackendError::InvalidRequest {
                    code: "InvalidArgument".to_string(),
                    message: "Part number must be an integer between 1 and 10000".to_string(),
                    request_id: None,
                })
            });

        let coordinator = MultipartCoordinator::new(Arc::new(backend));
        let err = coordinator
            .upload_part_to(&target(), PartUpload::from_bytes(10_001, &b"x"[..]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend { operation: "upload_part", .. }));
        assert_eq!(err.code(), Some("InvalidArgument"));
    }

    #[tokio::test]
    async fn test_mismatched_body_never_reaches_backend() {
        let mut backend = MockObjectStoreBackend::new();
        backend.expect_upload_part().never();

        let coordinator = MultipartCoordinator::new(Arc::new(backend));
        let result = coordinator
            .upload_part_to(
                &target(),
                PartUpload::new(1, 10, None, ByteSource::from(&b"short"[..])),
            )
            .await;
        assert!(matches!(
            result,
            Err(StoreError::InvalidArgument(ArgumentError::ContentLengthMismatch { .. }))
        ));
    }
}
