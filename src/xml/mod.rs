//! XML bodies of the S3 REST protocol.
//!
//! Parsers walk the document once with `quick-xml` and pick values by the
//! name of the element and its parent. Unknown elements are ignored.

use crate::error::{BackendError, S3ErrorResponse};
use crate::types::*;
use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
const S3_NAMESPACE: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

enum Step<'a> {
    Start(&'a [String]),
    Text(&'a [String], String),
    End(&'a [String]),
}

fn walk<F>(xml: &str, mut visit: F) -> Result<(), BackendError>
where
    F: FnMut(Step<'_>),
{
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut path: Vec<String> = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                path.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                visit(Step::Start(&path));
            }
            Ok(Event::Empty(e)) => {
                path.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                visit(Step::Start(&path));
                visit(Step::End(&path));
                path.pop();
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(parse_error)?.into_owned();
                visit(Step::Text(&path, text));
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                visit(Step::Text(&path, text));
            }
            Ok(Event::End(_)) => {
                visit(Step::End(&path));
                path.pop();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(parse_error(e)),
            _ => {}
        }
    }

    Ok(())
}

fn parse_error(e: impl std::fmt::Display) -> BackendError {
    BackendError::Response {
        message: format!("Malformed XML response: {}", e),
    }
}

/// `(parent, element)` of the innermost open element.
fn tail(path: &[String]) -> (&str, &str) {
    match path {
        [] => ("", ""),
        [name] => ("", name.as_str()),
        [.., parent, name] => (parent.as_str(), name.as_str()),
    }
}

fn timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Returns true if the document's root element is `<Error>`.
///
/// Copy and completion requests can fail after the 200 status line was sent.
pub fn is_error_document(xml: &str) -> bool {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => return e.local_name().as_ref() == b"Error",
            Ok(Event::Eof) | Err(_) => return false,
            _ => {}
        }
    }
}

/// Parse an error response.
pub fn parse_error_response(xml: &str) -> Result<S3ErrorResponse, BackendError> {
    let mut response = S3ErrorResponse::default();
    let mut key = None;
    let mut bucket = None;

    walk(xml, |step| {
        if let Step::Text(path, text) = step {
            match tail(path) {
                ("Error", "Code") => response.code = text,
                ("Error", "Message") => response.message = text,
                ("Error", "Resource") => response.resource = Some(text),
                ("Error", "RequestId") => response.request_id = Some(text),
                ("Error", "Key") => key = Some(text),
                ("Error", "BucketName") => bucket = Some(text),
                _ => {}
            }
        }
    })?;

    if response.resource.is_none() {
        response.resource = key.or(bucket);
    }
    Ok(response)
}

/// Parse a ListBuckets response.
pub fn parse_list_buckets(xml: &str) -> Result<Vec<Bucket>, BackendError> {
    let mut buckets: Vec<Bucket> = Vec::new();

    walk(xml, |step| match step {
        Step::Start(path) if tail(path) == ("Buckets", "Bucket") => buckets.push(Bucket {
            name: String::new(),
            creation_date: None,
        }),
        Step::Text(path, text) => {
            if let Some(bucket) = buckets.last_mut() {
                match tail(path) {
                    ("Bucket", "Name") => bucket.name = text,
                    ("Bucket", "CreationDate") => bucket.creation_date = timestamp(&text),
                    _ => {}
                }
            }
        }
        _ => {}
    })?;

    Ok(buckets)
}

/// Parse a ListObjectsV2 response.
pub fn parse_list_objects(xml: &str) -> Result<ListObjectsOutput, BackendError> {
    let mut output = ListObjectsOutput::default();

    walk(xml, |step| match step {
        Step::Start(path) => match tail(path) {
            (_, "Contents") => output.objects.push(ObjectSummary {
                key: String::new(),
                size: 0,
                last_modified: None,
                e_tag: None,
                storage_class: None,
                owner: None,
            }),
            ("Contents", "Owner") => {
                if let Some(object) = output.objects.last_mut() {
                    object.owner = Some(Owner::default());
                }
            }
            _ => {}
        },
        Step::Text(path, text) => {
            let object = output.objects.last_mut();
            match (tail(path), object) {
                (("Contents", "Key"), Some(o)) => o.key = text,
                (("Contents", "Size"), Some(o)) => o.size = text.parse().unwrap_or(0),
                (("Contents", "LastModified"), Some(o)) => o.last_modified = timestamp(&text),
                (("Contents", "ETag"), Some(o)) => o.e_tag = Some(text),
                (("Contents", "StorageClass"), Some(o)) => o.storage_class = text.parse().ok(),
                (("Owner", "ID"), Some(o)) => {
                    if let Some(owner) = o.owner.as_mut() {
                        owner.id = Some(text);
                    }
                }
                (("Owner", "DisplayName"), Some(o)) => {
                    if let Some(owner) = o.owner.as_mut() {
                        owner.display_name = Some(text);
                    }
                }
                (("CommonPrefixes", "Prefix"), _) => output.common_prefixes.push(text),
                (("ListBucketResult", "IsTruncated"), _) => output.is_truncated = text == "true",
                (("ListBucketResult", "NextContinuationToken"), _) => {
                    output.next_continuation_token = Some(text)
                }
                _ => {}
            }
        }
        _ => {}
    })?;

    Ok(output)
}

/// Parse a ListObjectVersions response.
pub fn parse_list_object_versions(xml: &str) -> Result<ListObjectVersionsOutput, BackendError> {
    let mut output = ListObjectVersionsOutput::default();

    walk(xml, |step| match step {
        Step::Start(path) => {
            let (_, name) = tail(path);
            if name == "Version" || name == "DeleteMarker" {
                output.versions.push(ObjectVersion {
                    key: String::new(),
                    version_id: String::new(),
                    is_latest: false,
                    is_delete_marker: name == "DeleteMarker",
                    last_modified: None,
                    e_tag: None,
                    size: 0,
                });
            }
        }
        Step::Text(path, text) => {
            let (parent, name) = tail(path);
            if parent == "ListVersionsResult" {
                match name {
                    "IsTruncated" => output.is_truncated = text == "true",
                    "NextKeyMarker" => output.next_key_marker = Some(text),
                    "NextVersionIdMarker" => output.next_version_id_marker = Some(text),
                    _ => {}
                }
            } else if parent == "Version" || parent == "DeleteMarker" {
                if let Some(version) = output.versions.last_mut() {
                    match name {
                        "Key" => version.key = text,
                        "VersionId" => version.version_id = text,
                        "IsLatest" => version.is_latest = text == "true",
                        "LastModified" => version.last_modified = timestamp(&text),
                        "ETag" => version.e_tag = Some(text),
                        "Size" => version.size = text.parse().unwrap_or(0),
                        _ => {}
                    }
                }
            }
        }
        _ => {}
    })?;

    Ok(output)
}

/// Parse a CopyObject response.
pub fn parse_copy_object(xml: &str) -> Result<CopyObjectOutput, BackendError> {
    let mut output = CopyObjectOutput::default();

    walk(xml, |step| {
        if let Step::Text(path, text) = step {
            match tail(path) {
                ("CopyObjectResult", "ETag") => output.e_tag = Some(text),
                ("CopyObjectResult", "LastModified") => output.last_modified = timestamp(&text),
                _ => {}
            }
        }
    })?;

    Ok(output)
}

/// Parse a DeleteObjects response.
pub fn parse_delete_objects(xml: &str) -> Result<DeleteObjectsOutput, BackendError> {
    let mut output = DeleteObjectsOutput::default();

    walk(xml, |step| match step {
        Step::Start(path) if tail(path) == ("DeleteResult", "Error") => {
            output.errors.push(DeleteError {
                key: String::new(),
                code: String::new(),
                message: String::new(),
            })
        }
        Step::Text(path, text) => match tail(path) {
            ("Deleted", "Key") => output.deleted.push(text),
            ("Error", field) => {
                if let Some(error) = output.errors.last_mut() {
                    match field {
                        "Key" => error.key = text,
                        "Code" => error.code = text,
                        "Message" => error.message = text,
                        _ => {}
                    }
                }
            }
            _ => {}
        },
        _ => {}
    })?;

    Ok(output)
}

/// Parse a CreateMultipartUpload response.
pub fn parse_create_multipart_upload(xml: &str) -> Result<CreateMultipartUploadOutput, BackendError> {
    let mut output = CreateMultipartUploadOutput {
        bucket: String::new(),
        key: String::new(),
        upload_id: String::new(),
    };

    walk(xml, |step| {
        if let Step::Text(path, text) = step {
            match tail(path) {
                ("InitiateMultipartUploadResult", "Bucket") => output.bucket = text,
                ("InitiateMultipartUploadResult", "Key") => output.key = text,
                ("InitiateMultipartUploadResult", "UploadId") => output.upload_id = text,
                _ => {}
            }
        }
    })?;

    if output.upload_id.is_empty() {
        return Err(BackendError::Response {
            message: "Initiate response carried no upload id".to_string(),
        });
    }
    Ok(output)
}

/// Parse a ListParts response.
pub fn parse_list_parts(xml: &str) -> Result<ListPartsOutput, BackendError> {
    let mut output = ListPartsOutput::default();

    walk(xml, |step| match step {
        Step::Start(path) if tail(path) == ("ListPartsResult", "Part") => {
            output.parts.push(PartInfo {
                part_number: 0,
                e_tag: String::new(),
                size: 0,
                last_modified: None,
            })
        }
        Step::Text(path, text) => match tail(path) {
            ("ListPartsResult", "IsTruncated") => output.is_truncated = text == "true",
            ("ListPartsResult", "NextPartNumberMarker") => {
                output.next_part_number_marker = text.parse().ok()
            }
            ("Part", field) => {
                if let Some(part) = output.parts.last_mut() {
                    match field {
                        "PartNumber" => part.part_number = text.parse().unwrap_or(0),
                        "ETag" => part.e_tag = text,
                        "Size" => part.size = text.parse().unwrap_or(0),
                        "LastModified" => part.last_modified = timestamp(&text),
                        _ => {}
                    }
                }
            }
            _ => {}
        },
        _ => {}
    })?;

    Ok(output)
}

/// Parse a CompleteMultipartUpload response.
pub fn parse_complete_multipart_upload(
    xml: &str,
) -> Result<CompleteMultipartUploadOutput, BackendError> {
    let mut output = CompleteMultipartUploadOutput::default();

    walk(xml, |step| {
        if let Step::Text(path, text) = step {
            match tail(path) {
                ("CompleteMultipartUploadResult", "Location") => output.location = Some(text),
                ("CompleteMultipartUploadResult", "ETag") => output.e_tag = Some(text),
                _ => {}
            }
        }
    })?;

    Ok(output)
}

/// Parse a ListMultipartUploads response.
pub fn parse_list_multipart_uploads(xml: &str) -> Result<ListMultipartUploadsOutput, BackendError> {
    let mut output = ListMultipartUploadsOutput::default();

    walk(xml, |step| match step {
        Step::Start(path) => match tail(path) {
            ("ListMultipartUploadsResult", "Upload") => output.uploads.push(MultipartUploadInfo {
                key: String::new(),
                upload_id: String::new(),
                initiated: None,
                storage_class: None,
                owner: None,
            }),
            ("Upload", "Owner") => {
                if let Some(upload) = output.uploads.last_mut() {
                    upload.owner = Some(Owner::default());
                }
            }
            _ => {}
        },
        Step::Text(path, text) => {
            let upload = output.uploads.last_mut();
            match (tail(path), upload) {
                (("ListMultipartUploadsResult", "IsTruncated"), _) => {
                    output.is_truncated = text == "true"
                }
                (("ListMultipartUploadsResult", "NextKeyMarker"), _) => {
                    output.next_key_marker = Some(text)
                }
                (("ListMultipartUploadsResult", "NextUploadIdMarker"), _) => {
                    output.next_upload_id_marker = Some(text)
                }
                (("Upload", "Key"), Some(u)) => u.key = text,
                (("Upload", "UploadId"), Some(u)) => u.upload_id = text,
                (("Upload", "Initiated"), Some(u)) => u.initiated = timestamp(&text),
                (("Upload", "StorageClass"), Some(u)) => u.storage_class = text.parse().ok(),
                (("Owner", "ID"), Some(u)) => {
                    if let Some(owner) = u.owner.as_mut() {
                        owner.id = Some(text);
                    }
                }
                (("Owner", "DisplayName"), Some(u)) => {
                    if let Some(owner) = u.owner.as_mut() {
                        owner.display_name = Some(text);
                    }
                }
                _ => {}
            }
        }
        _ => {}
    })?;

    Ok(output)
}

/// Parse a GetBucketVersioning response.
pub fn parse_versioning(xml: &str) -> Result<VersioningStatus, BackendError> {
    let mut status = VersioningStatus::Unversioned;

    walk(xml, |step| {
        if let Step::Text(path, text) = step {
            if tail(path) == ("VersioningConfiguration", "Status") {
                status = match text.as_str() {
                    "Enabled" => VersioningStatus::Enabled,
                    "Suspended" => VersioningStatus::Suspended,
                    _ => VersioningStatus::Unversioned,
                };
            }
        }
    })?;

    Ok(status)
}

/// Parse a GetBucketLifecycleConfiguration response.
pub fn parse_lifecycle(xml: &str) -> Result<LifecycleConfiguration, BackendError> {
    let mut config = LifecycleConfiguration::default();

    walk(xml, |step| match step {
        Step::Start(path) if tail(path) == ("LifecycleConfiguration", "Rule") => {
            config.rules.push(LifecycleRule::default())
        }
        Step::Text(path, text) => {
            if let Some(rule) = config.rules.last_mut() {
                match tail(path) {
                    ("Rule", "ID") => rule.id = text,
                    ("Rule", "Prefix") | ("Filter", "Prefix") => rule.prefix = text,
                    ("Rule", "Status") => rule.enabled = text == "Enabled",
                    ("Expiration", "Days") => rule.expiration_days = text.parse().ok(),
                    ("NoncurrentVersionExpiration", "NoncurrentDays") => {
                        rule.noncurrent_version_expiration_days = text.parse().ok()
                    }
                    ("AbortIncompleteMultipartUpload", "DaysAfterInitiation") => {
                        rule.abort_incomplete_multipart_upload_days = text.parse().ok()
                    }
                    _ => {}
                }
            }
        }
        _ => {}
    })?;

    Ok(config)
}

/// Parse a GetBucketNotificationConfiguration response.
pub fn parse_notification(xml: &str) -> Result<NotificationConfiguration, BackendError> {
    let mut config = NotificationConfiguration::default();
    let mut rule_name = String::new();

    walk(xml, |step| match step {
        Step::Start(path) => {
            let kind = match tail(path) {
                ("NotificationConfiguration", "QueueConfiguration") => Some(NotificationKind::Queue),
                ("NotificationConfiguration", "TopicConfiguration") => Some(NotificationKind::Topic),
                ("NotificationConfiguration", "CloudFunctionConfiguration") => {
                    Some(NotificationKind::Function)
                }
                _ => None,
            };
            if let Some(kind) = kind {
                config.targets.push(NotificationTarget {
                    id: None,
                    kind,
                    arn: String::new(),
                    events: Vec::new(),
                    prefix: None,
                    suffix: None,
                });
            }
        }
        Step::Text(path, text) => {
            let Some(target) = config.targets.last_mut() else {
                return;
            };
            let (parent, name) = tail(path);
            if parent == target.kind.element() {
                match name {
                    "Id" => target.id = Some(text),
                    "Event" => target.events.push(text),
                    n if n == target.kind.arn_element() => target.arn = text,
                    _ => {}
                }
            } else if parent == "FilterRule" {
                match name {
                    "Name" => rule_name = text.to_ascii_lowercase(),
                    "Value" if rule_name == "prefix" => target.prefix = Some(text),
                    "Value" if rule_name == "suffix" => target.suffix = Some(text),
                    _ => {}
                }
            }
        }
        Step::End(_) => {}
    })?;

    Ok(config)
}

/// Build a DeleteObjects request body.
pub fn build_delete_objects_xml<K: AsRef<str>>(keys: &[K]) -> String {
    let mut xml = String::from(XML_DECLARATION);
    xml.push_str("<Delete><Quiet>false</Quiet>");

    for key in keys {
        xml.push_str(&format!(
            "<Object><Key>{}</Key></Object>",
            escape_xml(key.as_ref())
        ));
    }

    xml.push_str("</Delete>");
    xml
}

/// Build a CompleteMultipartUpload request body.
pub fn build_complete_multipart_xml(parts: &[CompletedPart]) -> String {
    let mut xml = String::from(XML_DECLARATION);
    xml.push_str("<CompleteMultipartUpload>");

    for part in parts {
        xml.push_str("<Part>");
        xml.push_str(&format!("<PartNumber>{}</PartNumber>", part.part_number));
        xml.push_str(&format!("<ETag>{}</ETag>", escape_xml(&part.e_tag)));
        xml.push_str("</Part>");
    }

    xml.push_str("</CompleteMultipartUpload>");
    xml
}

/// Build a CreateBucket request body for regions other than `us-east-1`.
pub fn build_create_bucket_xml(region: &str) -> String {
    format!(
        "{}<CreateBucketConfiguration xmlns=\"{}\"><LocationConstraint>{}</LocationConstraint></CreateBucketConfiguration>",
        XML_DECLARATION,
        S3_NAMESPACE,
        escape_xml(region)
    )
}

/// Build a PutBucketVersioning request body.
pub fn build_versioning_xml(status: VersioningStatus) -> String {
    format!(
        "{}<VersioningConfiguration xmlns=\"{}\"><Status>{}</Status></VersioningConfiguration>",
        XML_DECLARATION,
        S3_NAMESPACE,
        status.as_str()
    )
}

/// Build a PutBucketLifecycleConfiguration request body.
pub fn build_lifecycle_xml(config: &LifecycleConfiguration) -> String {
    let mut xml = String::from(XML_DECLARATION);
    xml.push_str(&format!("<LifecycleConfiguration xmlns=\"{}\">", S3_NAMESPACE));

    for rule in &config.rules {
        xml.push_str("<Rule>");
        xml.push_str(&format!("<ID>{}</ID>", escape_xml(&rule.id)));
        xml.push_str(&format!(
            "<Filter><Prefix>{}</Prefix></Filter>",
            escape_xml(&rule.prefix)
        ));
        xml.push_str(&format!(
            "<Status>{}</Status>",
            if rule.enabled { "Enabled" } else { "Disabled" }
        ));
        if let Some(days) = rule.expiration_days {
            xml.push_str(&format!("<Expiration><Days>{}</Days></Expiration>", days));
        }
        if let Some(days) = rule.noncurrent_version_expiration_days {
            xml.push_str(&format!(
                "<NoncurrentVersionExpiration><NoncurrentDays>{}</NoncurrentDays></NoncurrentVersionExpiration>",
                days
            ));
        }
        if let Some(days) = rule.abort_incomplete_multipart_upload_days {
            xml.push_str(&format!(
                "<AbortIncompleteMultipartUpload><DaysAfterInitiation>{}</DaysAfterInitiation></AbortIncompleteMultipartUpload>",
                days
            ));
        }
        xml.push_str("</Rule>");
    }

    xml.push_str("</LifecycleConfiguration>");
    xml
}

/// Build a PutBucketNotificationConfiguration request body.
pub fn build_notification_xml(config: &NotificationConfiguration) -> String {
    let mut xml = String::from(XML_DECLARATION);
    xml.push_str(&format!("<NotificationConfiguration xmlns=\"{}\">", S3_NAMESPACE));

    for target in &config.targets {
        let element = target.kind.element();
        xml.push_str(&format!("<{}>", element));
        if let Some(id) = &target.id {
            xml.push_str(&format!("<Id>{}</Id>", escape_xml(id)));
        }
        let arn_element = target.kind.arn_element();
        xml.push_str(&format!(
            "<{0}>{1}</{0}>",
            arn_element,
            escape_xml(&target.arn)
        ));
        for event in &target.events {
            xml.push_str(&format!("<Event>{}</Event>", escape_xml(event)));
        }
        if target.prefix.is_some() || target.suffix.is_some() {
            xml.push_str("<Filter><S3Key>");
            if let Some(prefix) = &target.prefix {
                xml.push_str(&format!(
                    "<FilterRule><Name>prefix</Name><Value>{}</Value></FilterRule>",
                    escape_xml(prefix)
                ));
            }
            if let Some(suffix) = &target.suffix {
                xml.push_str(&format!(
                    "<FilterRule><Name>suffix</Name><Value>{}</Value></FilterRule>",
                    escape_xml(suffix)
                ));
            }
            xml.push_str("</S3Key></Filter>");
        }
        xml.push_str(&format!("</{}>", element));
    }

    xml.push_str("</NotificationConfiguration>");
    xml
}

/// Escape special characters for XML.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
