//! In-memory implementation of the backend contract.
//!
//! Keeps buckets, objects and in-flight multipart uploads in a single locked
//! state and records the name of every operation it serves, so tests can
//! assert on call order as well as on outcomes.

use crate::backend::ObjectStoreBackend;
use crate::error::{map_error_code, BackendError, NetworkError, S3ErrorResponse};
use crate::key::ObjectKey;
use crate::presign::PresignedRequest;
use crate::transfer::{content_md5, ByteSource};
use crate::types::*;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};

const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone)]
struct StoredObject {
    body: Bytes,
    content_type: String,
    metadata: BTreeMap<String, String>,
    e_tag: String,
    last_modified: DateTime<Utc>,
}

impl StoredObject {
    fn metadata(&self) -> ObjectMetadata {
        ObjectMetadata {
            content_length: self.body.len() as u64,
            content_type: Some(self.content_type.clone()),
            e_tag: Some(self.e_tag.clone()),
            last_modified: Some(self.last_modified),
            user_metadata: self.metadata.clone(),
            ..ObjectMetadata::default()
        }
    }
}

#[derive(Debug)]
struct BucketState {
    creation_date: DateTime<Utc>,
    objects: BTreeMap<String, StoredObject>,
    policy: Option<String>,
    versioning: VersioningStatus,
    lifecycle: LifecycleConfiguration,
    notification: NotificationConfiguration,
}

impl BucketState {
    fn new() -> Self {
        Self {
            creation_date: Utc::now(),
            objects: BTreeMap::new(),
            policy: None,
            versioning: VersioningStatus::Unversioned,
            lifecycle: LifecycleConfiguration::default(),
            notification: NotificationConfiguration::default(),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredPart {
    e_tag: String,
    body: Bytes,
    last_modified: DateTime<Utc>,
}

#[derive(Debug)]
struct UploadState {
    bucket: String,
    key: String,
    content_type: String,
    metadata: BTreeMap<String, String>,
    initiated: DateTime<Utc>,
    parts: BTreeMap<u32, StoredPart>,
}

#[derive(Debug, Default)]
struct State {
    buckets: BTreeMap<String, BucketState>,
    uploads: BTreeMap<String, UploadState>,
    calls: Vec<&'static str>,
    failures: HashMap<&'static str, (u16, String)>,
}

impl State {
    fn bucket(&self, name: &str) -> Result<&BucketState, BackendError> {
        self.buckets.get(name).ok_or_else(|| no_such_bucket(name))
    }

    fn bucket_mut(&mut self, name: &str) -> Result<&mut BucketState, BackendError> {
        self.buckets.get_mut(name).ok_or_else(|| no_such_bucket(name))
    }

    fn upload_mut(
        &mut self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<&mut UploadState, BackendError> {
        match self.uploads.get_mut(upload_id) {
            Some(upload) if upload.bucket == bucket && upload.key == key => Ok(upload),
            _ => Err(error(
                404,
                "NoSuchUpload",
                &format!("Upload '{}' does not exist", upload_id),
            )),
        }
    }
}

/// Object store kept entirely in memory.
#[derive(Debug)]
pub struct InMemoryBackend {
    state: Mutex<State>,
    page_size: usize,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// An empty store without buckets.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Add an empty bucket.
    pub fn with_bucket(self, name: impl Into<String>) -> Self {
        self.state.lock().buckets.insert(name.into(), BucketState::new());
        self
    }

    /// Limit the number of entries returned per listing page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Make the next call of `operation` fail with `code`.
    pub fn fail_next(&self, operation: &'static str, status: u16, code: impl Into<String>) {
        self.state.lock().failures.insert(operation, (status, code.into()));
    }

    /// Names of the operations served so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().calls.clone()
    }

    /// How often `operation` was called.
    pub fn call_count(&self, operation: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| **call == operation)
            .count()
    }

    /// Content of a stored object.
    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.state
            .lock()
            .buckets
            .get(bucket)
            .and_then(|b| b.objects.get(key))
            .map(|o| o.body.clone())
    }

    /// Ids of the uploads that are neither completed nor aborted.
    pub fn in_flight_uploads(&self) -> Vec<String> {
        self.state.lock().uploads.keys().cloned().collect()
    }

    fn record(&self, operation: &'static str) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.calls.push(operation);
        match state.failures.remove(operation) {
            Some((status, code)) => Err(error(status, &code, "Injected failure")),
            None => Ok(()),
        }
    }
}

fn error(status: u16, code: &str, message: &str) -> BackendError {
    map_error_code(
        status,
        S3ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
            ..S3ErrorResponse::default()
        },
    )
}

fn no_such_bucket(name: &str) -> BackendError {
    error(
        404,
        "NoSuchBucket",
        &format!("The specified bucket '{}' does not exist", name),
    )
}

fn no_such_key(key: &str) -> BackendError {
    error(
        404,
        "NoSuchKey",
        &format!("The specified key '{}' does not exist", key),
    )
}

fn e_tag_of(body: &[u8]) -> String {
    format!("\"{}\"", hex::encode(Md5::digest(body)))
}

fn same_tag(a: &str, b: &str) -> bool {
    a.trim_matches('"') == b.trim_matches('"')
}

async fn read_body(body: ByteSource) -> Result<Bytes, BackendError> {
    body.collect().await.map_err(|e| {
        BackendError::Network(NetworkError::Body {
            message: e.to_string(),
        })
    })
}

#[async_trait]
impl ObjectStoreBackend for InMemoryBackend {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, BackendError> {
        self.record("bucket_exists")?;
        Ok(self.state.lock().buckets.contains_key(bucket))
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), BackendError> {
        self.record("create_bucket")?;
        let mut state = self.state.lock();
        if state.buckets.contains_key(bucket) {
            return Err(error(409, "BucketAlreadyOwnedByYou", bucket));
        }
        state.buckets.insert(bucket.to_string(), BucketState::new());
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), BackendError> {
        self.record("delete_bucket")?;
        let mut state = self.state.lock();
        if !state.bucket(bucket)?.objects.is_empty() {
            return Err(error(409, "BucketNotEmpty", bucket));
        }
        state.buckets.remove(bucket);
        Ok(())
    }

    async fn list_buckets(&self) -> Result<Vec<Bucket>, BackendError> {
        self.record("list_buckets")?;
        Ok(self
            .state
            .lock()
            .buckets
            .iter()
            .map(|(name, bucket)| Bucket {
                name: name.clone(),
                creation_date: Some(bucket.creation_date),
            })
            .collect())
    }

    async fn put_object(&self, input: PutObjectInput) -> Result<PutObjectOutput, BackendError> {
        self.record("put_object")?;
        self.state.lock().bucket(&input.bucket)?;

        let body = read_body(input.body).await?;
        let e_tag = e_tag_of(&body);
        let object = StoredObject {
            body,
            content_type: input.content_type,
            metadata: input.metadata,
            e_tag: e_tag.clone(),
            last_modified: Utc::now(),
        };
        self.state
            .lock()
            .bucket_mut(&input.bucket)?
            .objects
            .insert(input.key.into_string(), object);

        Ok(PutObjectOutput {
            e_tag: Some(e_tag),
            version_id: None,
        })
    }

    async fn get_object(&self, input: GetObjectInput) -> Result<GetObjectOutput, BackendError> {
        self.record("get_object")?;
        let state = self.state.lock();
        let object = state
            .bucket(&input.bucket)?
            .objects
            .get(input.key.as_str())
            .ok_or_else(|| no_such_key(input.key.as_str()))?;

        let total = object.body.len() as u64;
        let mut metadata = object.metadata();
        let (body, content_range) = match input.range {
            None => (object.body.clone(), None),
            Some((start, end)) if start >= total || end < start => {
                return Err(error(416, "InvalidRange", "The requested range is not satisfiable"));
            }
            Some((start, end)) => {
                let end = end.min(total - 1);
                let body = object.body.slice(start as usize..=end as usize);
                (body, Some(format!("bytes {}-{}/{}", start, end, total)))
            }
        };
        metadata.content_length = body.len() as u64;

        Ok(GetObjectOutput {
            body,
            metadata,
            content_range,
        })
    }

    async fn head_object(
        &self,
        bucket: &str,
        key: &ObjectKey,
    ) -> Result<ObjectMetadata, BackendError> {
        self.record("head_object")?;
        let state = self.state.lock();
        state
            .bucket(bucket)?
            .objects
            .get(key.as_str())
            .map(StoredObject::metadata)
            .ok_or_else(|| no_such_key(key.as_str()))
    }

    async fn delete_object(&self, bucket: &str, key: &ObjectKey) -> Result<(), BackendError> {
        self.record("delete_object")?;
        self.state
            .lock()
            .bucket_mut(bucket)?
            .objects
            .remove(key.as_str());
        Ok(())
    }

    async fn delete_objects(
        &self,
        bucket: &str,
        keys: &[ObjectKey],
    ) -> Result<DeleteObjectsOutput, BackendError> {
        self.record("delete_objects")?;
        let mut state = self.state.lock();
        let bucket = state.bucket_mut(bucket)?;

        let mut output = DeleteObjectsOutput::default();
        for key in keys {
            bucket.objects.remove(key.as_str());
            output.deleted.push(key.to_string());
        }
        Ok(output)
    }

    async fn copy_object(&self, input: CopyObjectInput) -> Result<CopyObjectOutput, BackendError> {
        self.record("copy_object")?;
        let mut state = self.state.lock();
        let mut object = state
            .bucket(&input.source_bucket)?
            .objects
            .get(input.source_key.as_str())
            .cloned()
            .ok_or_else(|| no_such_key(input.source_key.as_str()))?;

        if input.metadata_directive == MetadataDirective::Replace {
            if let Some(content_type) = input.content_type {
                object.content_type = content_type;
            }
            object.metadata = input.metadata;
        }
        object.last_modified = Utc::now();
        let output = CopyObjectOutput {
            e_tag: Some(object.e_tag.clone()),
            last_modified: Some(object.last_modified),
        };

        state
            .bucket_mut(&input.dest_bucket)?
            .objects
            .insert(input.dest_key.into_string(), object);
        Ok(output)
    }

    async fn list_objects(
        &self,
        input: ListObjectsInput,
    ) -> Result<ListObjectsOutput, BackendError> {
        self.record("list_objects")?;
        let state = self.state.lock();
        let bucket = state.bucket(&input.bucket)?;

        let prefix = input.prefix.as_deref().unwrap_or("");
        let delimiter = input.delimiter.as_deref().filter(|d| !d.is_empty());
        let max_keys = match input.max_keys {
            0 => self.page_size,
            n => (n as usize).min(self.page_size),
        };

        let mut output = ListObjectsOutput::default();
        let mut last_key: Option<&str> = None;
        let mut count = 0;
        for (key, object) in &bucket.objects {
            if !key.starts_with(prefix) {
                continue;
            }
            if matches!(&input.continuation_token, Some(token) if key.as_str() <= token.as_str()) {
                continue;
            }

            let common_prefix = delimiter.and_then(|d| {
                key[prefix.len()..]
                    .find(d)
                    .map(|i| key[..prefix.len() + i + d.len()].to_string())
            });
            if let Some(cp) = &common_prefix {
                if output.common_prefixes.last() == Some(cp) {
                    last_key = Some(key.as_str());
                    continue;
                }
            }

            if count == max_keys {
                output.is_truncated = true;
                output.next_continuation_token = last_key.map(String::from);
                break;
            }
            count += 1;
            last_key = Some(key.as_str());

            match common_prefix {
                Some(cp) => output.common_prefixes.push(cp),
                None => output.objects.push(ObjectSummary {
                    key: key.clone(),
                    size: object.body.len() as u64,
                    last_modified: Some(object.last_modified),
                    e_tag: Some(object.e_tag.clone()),
                    storage_class: Some(StorageClass::Standard),
                    owner: None,
                }),
            }
        }

        Ok(output)
    }

    async fn list_object_versions(
        &self,
        input: ListObjectVersionsInput,
    ) -> Result<ListObjectVersionsOutput, BackendError> {
        self.record("list_object_versions")?;
        let state = self.state.lock();
        let bucket = state.bucket(&input.bucket)?;
        let prefix = input.prefix.as_deref().unwrap_or("");

        let versions = bucket
            .objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .filter(|(key, _)| {
                input
                    .key_marker
                    .as_deref()
                    .map_or(true, |marker| key.as_str() > marker)
            })
            .map(|(key, object)| ObjectVersion {
                key: key.clone(),
                version_id: "null".to_string(),
                is_latest: true,
                is_delete_marker: false,
                last_modified: Some(object.last_modified),
                e_tag: Some(object.e_tag.clone()),
                size: object.body.len() as u64,
            })
            .collect();

        Ok(ListObjectVersionsOutput {
            versions,
            ..ListObjectVersionsOutput::default()
        })
    }

    async fn create_multipart_upload(
        &self,
        input: CreateMultipartUploadInput,
    ) -> Result<CreateMultipartUploadOutput, BackendError> {
        self.record("create_multipart_upload")?;
        let mut state = self.state.lock();
        state.bucket(&input.bucket)?;

        let upload_id = uuid::Uuid::new_v4().simple().to_string();
        state.uploads.insert(
            upload_id.clone(),
            UploadState {
                bucket: input.bucket.clone(),
                key: input.key.to_string(),
                content_type: input.content_type,
                metadata: input.metadata,
                initiated: Utc::now(),
                parts: BTreeMap::new(),
            },
        );

        Ok(CreateMultipartUploadOutput {
            bucket: input.bucket,
            key: input.key.into_string(),
            upload_id,
        })
    }

    async fn upload_part(&self, input: UploadPartInput) -> Result<UploadPartOutput, BackendError> {
        self.record("upload_part")?;
        self.state
            .lock()
            .upload_mut(&input.bucket, input.key.as_str(), &input.upload_id)?;

        let body = read_body(input.body).await?;
        if body.len() as u64 != input.content_length {
            return Err(error(
                400,
                "IncompleteBody",
                "Body length does not match the declared content length",
            ));
        }
        if let Some(expected) = &input.content_md5 {
            if *expected != content_md5(&body) {
                return Err(error(400, "BadDigest", "Content-MD5 does not match the body"));
            }
        }

        let e_tag = e_tag_of(&body);
        let part = StoredPart {
            e_tag: e_tag.clone(),
            body,
            last_modified: Utc::now(),
        };
        self.state
            .lock()
            .upload_mut(&input.bucket, input.key.as_str(), &input.upload_id)?
            .parts
            .insert(input.part_number, part);

        Ok(UploadPartOutput { e_tag })
    }

    async fn list_parts(&self, input: ListPartsInput) -> Result<ListPartsOutput, BackendError> {
        self.record("list_parts")?;
        let mut state = self.state.lock();
        let upload = state.upload_mut(&input.bucket, input.key.as_str(), &input.upload_id)?;

        let marker = input.part_number_marker.unwrap_or(0);
        let mut remaining = upload.parts.range(marker + 1..);
        let parts: Vec<PartInfo> = remaining
            .by_ref()
            .take(self.page_size)
            .map(|(number, part)| PartInfo {
                part_number: *number,
                e_tag: part.e_tag.clone(),
                size: part.body.len() as u64,
                last_modified: Some(part.last_modified),
            })
            .collect();
        let is_truncated = remaining.next().is_some();

        Ok(ListPartsOutput {
            next_part_number_marker: if is_truncated {
                parts.last().map(|p| p.part_number)
            } else {
                None
            },
            is_truncated,
            parts,
        })
    }

    async fn complete_multipart_upload(
        &self,
        input: CompleteMultipartUploadInput,
    ) -> Result<CompleteMultipartUploadOutput, BackendError> {
        self.record("complete_multipart_upload")?;
        let mut state = self.state.lock();
        let upload = state.upload_mut(&input.bucket, input.key.as_str(), &input.upload_id)?;

        if input.parts.is_empty() {
            return Err(error(400, "MalformedXML", "At least one part must be listed"));
        }
        if input
            .parts
            .windows(2)
            .any(|pair| pair[0].part_number >= pair[1].part_number)
        {
            return Err(error(400, "InvalidPartOrder", "Parts must be in ascending order"));
        }

        let mut body = BytesMut::new();
        let mut digests = Vec::with_capacity(input.parts.len() * 16);
        for listed in &input.parts {
            let part = upload
                .parts
                .get(&listed.part_number)
                .filter(|part| same_tag(&part.e_tag, &listed.e_tag))
                .ok_or_else(|| {
                    error(
                        400,
                        "InvalidPart",
                        &format!("Part {} was not found or its tag differs", listed.part_number),
                    )
                })?;
            body.extend_from_slice(&part.body);
            digests.extend_from_slice(&Md5::digest(&part.body));
        }
        let e_tag = format!(
            "\"{}-{}\"",
            hex::encode(Md5::digest(&digests)),
            input.parts.len()
        );

        let object = StoredObject {
            body: body.freeze(),
            content_type: upload.content_type.clone(),
            metadata: upload.metadata.clone(),
            e_tag: e_tag.clone(),
            last_modified: Utc::now(),
        };
        state.uploads.remove(&input.upload_id);
        state
            .bucket_mut(&input.bucket)?
            .objects
            .insert(input.key.to_string(), object);

        Ok(CompleteMultipartUploadOutput {
            location: Some(format!("/{}/{}", input.bucket, input.key)),
            e_tag: Some(e_tag),
        })
    }

    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &ObjectKey,
        upload_id: &str,
    ) -> Result<(), BackendError> {
        self.record("abort_multipart_upload")?;
        let mut state = self.state.lock();
        state.upload_mut(bucket, key.as_str(), upload_id)?;
        state.uploads.remove(upload_id);
        Ok(())
    }

    async fn list_multipart_uploads(
        &self,
        input: ListMultipartUploadsInput,
    ) -> Result<ListMultipartUploadsOutput, BackendError> {
        self.record("list_multipart_uploads")?;
        let state = self.state.lock();
        state.bucket(&input.bucket)?;
        let prefix = input.prefix.as_deref().unwrap_or("");

        let mut uploads: Vec<MultipartUploadInfo> = state
            .uploads
            .iter()
            .filter(|(_, upload)| upload.bucket == input.bucket && upload.key.starts_with(prefix))
            .filter(|(_, upload)| {
                input
                    .key_marker
                    .as_deref()
                    .map_or(true, |marker| upload.key.as_str() > marker)
            })
            .map(|(id, upload)| MultipartUploadInfo {
                key: upload.key.clone(),
                upload_id: id.clone(),
                initiated: Some(upload.initiated),
                storage_class: Some(StorageClass::Standard),
                owner: None,
            })
            .collect();
        uploads.sort_by(|a, b| (&a.key, a.initiated).cmp(&(&b.key, b.initiated)));

        Ok(ListMultipartUploadsOutput {
            uploads,
            ..ListMultipartUploadsOutput::default()
        })
    }

    fn presign(&self, request: &PresignedRequest) -> Result<String, BackendError> {
        self.record("presign")?;
        if request.is_expired() {
            return Err(BackendError::Signing {
                message: format!("Expiration {} is not in the future", request.expiration),
            });
        }
        Ok(format!(
            "memory://{}/{}?method={}&expires={}",
            request.bucket,
            request.key,
            request.method,
            request.expiration.timestamp()
        ))
    }

    async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> Result<(), BackendError> {
        self.record("put_bucket_policy")?;
        self.state.lock().bucket_mut(bucket)?.policy = Some(policy.to_string());
        Ok(())
    }

    async fn get_bucket_policy(&self, bucket: &str) -> Result<Option<String>, BackendError> {
        self.record("get_bucket_policy")?;
        Ok(self.state.lock().bucket(bucket)?.policy.clone())
    }

    async fn put_bucket_versioning(
        &self,
        bucket: &str,
        status: VersioningStatus,
    ) -> Result<(), BackendError> {
        self.record("put_bucket_versioning")?;
        if status == VersioningStatus::Unversioned {
            return Err(error(
                400,
                "IllegalVersioningConfigurationException",
                "Versioning can only be enabled or suspended",
            ));
        }
        self.state.lock().bucket_mut(bucket)?.versioning = status;
        Ok(())
    }

    async fn get_bucket_versioning(&self, bucket: &str) -> Result<VersioningStatus, BackendError> {
        self.record("get_bucket_versioning")?;
        Ok(self.state.lock().bucket(bucket)?.versioning)
    }

    async fn put_bucket_lifecycle(
        &self,
        bucket: &str,
        config: &LifecycleConfiguration,
    ) -> Result<(), BackendError> {
        self.record("put_bucket_lifecycle")?;
        self.state.lock().bucket_mut(bucket)?.lifecycle = config.clone();
        Ok(())
    }

    async fn get_bucket_lifecycle(
        &self,
        bucket: &str,
    ) -> Result<LifecycleConfiguration, BackendError> {
        self.record("get_bucket_lifecycle")?;
        Ok(self.state.lock().bucket(bucket)?.lifecycle.clone())
    }

    async fn put_bucket_notification(
        &self,
        bucket: &str,
        config: &NotificationConfiguration,
    ) -> Result<(), BackendError> {
        self.record("put_bucket_notification")?;
        self.state.lock().bucket_mut(bucket)?.notification = config.clone();
        Ok(())
    }

    async fn get_bucket_notification(
        &self,
        bucket: &str,
    ) -> Result<NotificationConfiguration, BackendError> {
        self.record("get_bucket_notification")?;
        Ok(self.state.lock().bucket(bucket)?.notification.clone())
    }
}
