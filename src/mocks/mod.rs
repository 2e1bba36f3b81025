//! Mock implementations for testing.
//!
//! [`MockTransport`] replays canned HTTP responses under the REST backend;
//! [`InMemoryBackend`] replaces the backend entirely.

mod backend;
mod transport;

pub use backend::InMemoryBackend;
pub use transport::{MockResponse, MockTransport};

use std::collections::HashMap;

/// Canned store replies.
pub struct TestFixtures;

impl TestFixtures {
    /// ListObjectsV2 reply with two objects and one common prefix.
    pub fn list_objects_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
    <Name>b</Name>
    <Prefix></Prefix>
    <KeyCount>3</KeyCount>
    <MaxKeys>1000</MaxKeys>
    <Delimiter>/</Delimiter>
    <IsTruncated>true</IsTruncated>
    <NextContinuationToken>token-2</NextContinuationToken>
    <Contents>
        <Key>file1.txt</Key>
        <LastModified>2024-01-15T10:30:00.000Z</LastModified>
        <ETag>"abc123"</ETag>
        <Size>1024</Size>
        <StorageClass>STANDARD</StorageClass>
    </Contents>
    <Contents>
        <Key>file2.txt</Key>
        <LastModified>2024-01-16T11:30:00.000Z</LastModified>
        <ETag>"def456"</ETag>
        <Size>2048</Size>
        <StorageClass>STANDARD_IA</StorageClass>
    </Contents>
    <CommonPrefixes>
        <Prefix>dir/</Prefix>
    </CommonPrefixes>
</ListBucketResult>"#
    }

    /// ListBuckets reply with two buckets.
    pub fn list_buckets_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ListAllMyBucketsResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
    <Owner>
        <ID>owner-id</ID>
        <DisplayName>minio</DisplayName>
    </Owner>
    <Buckets>
        <Bucket>
            <Name>bucket1</Name>
            <CreationDate>2024-01-01T00:00:00.000Z</CreationDate>
        </Bucket>
        <Bucket>
            <Name>bucket2</Name>
            <CreationDate>2024-01-02T00:00:00.000Z</CreationDate>
        </Bucket>
    </Buckets>
</ListAllMyBucketsResult>"#
    }

    /// Error document with `code` and `message`.
    pub fn error_xml(code: &str, message: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Error>
    <Code>{}</Code>
    <Message>{}</Message>
    <RequestId>test-request-id</RequestId>
</Error>"#,
            code, message
        )
    }

    /// InitiateMultipartUpload reply.
    pub fn create_multipart_xml(bucket: &str, key: &str, upload_id: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<InitiateMultipartUploadResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
    <Bucket>{}</Bucket>
    <Key>{}</Key>
    <UploadId>{}</UploadId>
</InitiateMultipartUploadResult>"#,
            bucket, key, upload_id
        )
    }

    /// ListParts reply for `parts` given as `(number, tag, size)`.
    pub fn list_parts_xml(parts: &[(u32, &str, u64)], next_marker: Option<u32>) -> String {
        let body: String = parts
            .iter()
            .map(|(number, tag, size)| {
                format!(
                    "<Part><PartNumber>{}</PartNumber><LastModified>2024-01-15T10:30:00.000Z</LastModified><ETag>{}</ETag><Size>{}</Size></Part>",
                    number, tag, size
                )
            })
            .collect();
        let (truncated, marker) = match next_marker {
            Some(marker) => (
                "true",
                format!("<NextPartNumberMarker>{}</NextPartNumberMarker>", marker),
            ),
            None => ("false", String::new()),
        };
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ListPartsResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><IsTruncated>{}</IsTruncated>{}{}</ListPartsResult>"#,
            truncated, marker, body
        )
    }

    /// CompleteMultipartUpload reply.
    pub fn complete_multipart_xml(bucket: &str, key: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<CompleteMultipartUploadResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
    <Location>http://127.0.0.1:9000/{0}/{1}</Location>
    <Bucket>{0}</Bucket>
    <Key>{1}</Key>
    <ETag>"combined-etag-2"</ETag>
</CompleteMultipartUploadResult>"#,
            bucket, key
        )
    }

    /// Headers of a successful GET.
    pub fn get_object_headers() -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "text/plain".to_string());
        headers.insert("content-length".to_string(), "5".to_string());
        headers.insert("etag".to_string(), "\"abc123\"".to_string());
        headers.insert(
            "last-modified".to_string(),
            "Mon, 15 Jan 2024 10:30:00 GMT".to_string(),
        );
        headers.insert("x-amz-meta-owner".to_string(), "alice".to_string());
        headers.insert("x-amz-request-id".to_string(), "test-request-id".to_string());
        headers
    }
}
