//! Canned bucket access policies.
//!
//! Three anonymous-access policy documents are shipped as templates. The
//! only processing is a literal replacement of [`BUCKET_TOKEN`] with the
//! bucket name; documents are neither parsed nor validated here.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Token replaced by the bucket name.
pub const BUCKET_TOKEN: &str = "{{bucket}}";

const READ_ONLY_TEMPLATE: &str = r#"{
    "Version": "2012-10-17",
    "Statement": [
        {
            "Effect": "Allow",
            "Principal": {"AWS": ["*"]},
            "Action": ["s3:GetBucketLocation"],
            "Resource": ["arn:aws:s3:::{{bucket}}"]
        },
        {
            "Effect": "Allow",
            "Principal": {"AWS": ["*"]},
            "Action": ["s3:ListBucket"],
            "Resource": ["arn:aws:s3:::{{bucket}}"],
            "Condition": {"StringEquals": {"s3:prefix": ["*"]}}
        },
        {
            "Effect": "Allow",
            "Principal": {"AWS": ["*"]},
            "Action": ["s3:GetObject"],
            "Resource": ["arn:aws:s3:::{{bucket}}/*"]
        }
    ]
}"#;

const WRITE_ONLY_TEMPLATE: &str = r#"{
    "Version": "2012-10-17",
    "Statement": [
        {
            "Effect": "Allow",
            "Principal": {"AWS": ["*"]},
            "Action": ["s3:GetBucketLocation", "s3:ListBucketMultipartUploads"],
            "Resource": ["arn:aws:s3:::{{bucket}}"]
        },
        {
            "Effect": "Allow",
            "Principal": {"AWS": ["*"]},
            "Action": [
                "s3:PutObject",
                "s3:AbortMultipartUpload",
                "s3:DeleteObject",
                "s3:ListMultipartUploadParts"
            ],
            "Resource": ["arn:aws:s3:::{{bucket}}/*"]
        }
    ]
}"#;

const READ_WRITE_TEMPLATE: &str = r#"{
    "Version": "2012-10-17",
    "Statement": [
        {
            "Effect": "Allow",
            "Principal": {"AWS": ["*"]},
            "Action": ["s3:GetBucketLocation", "s3:ListBucketMultipartUploads"],
            "Resource": ["arn:aws:s3:::{{bucket}}"]
        },
        {
            "Effect": "Allow",
            "Principal": {"AWS": ["*"]},
            "Action": ["s3:ListBucket"],
            "Resource": ["arn:aws:s3:::{{bucket}}"],
            "Condition": {"StringEquals": {"s3:prefix": ["*"]}}
        },
        {
            "Effect": "Allow",
            "Principal": {"AWS": ["*"]},
            "Action": [
                "s3:ListMultipartUploadParts",
                "s3:PutObject",
                "s3:AbortMultipartUpload",
                "s3:DeleteObject",
                "s3:GetObject"
            ],
            "Resource": ["arn:aws:s3:::{{bucket}}/*"]
        }
    ]
}"#;

/// The canned policy documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyType {
    /// Anonymous read of objects.
    ReadOnly,
    /// Anonymous upload and delete of objects.
    WriteOnly,
    /// Both of the above.
    ReadWrite,
}

impl PolicyType {
    /// The unrendered template.
    pub fn template(&self) -> &'static str {
        match self {
            PolicyType::ReadOnly => READ_ONLY_TEMPLATE,
            PolicyType::WriteOnly => WRITE_ONLY_TEMPLATE,
            PolicyType::ReadWrite => READ_WRITE_TEMPLATE,
        }
    }

    /// The policy document for `bucket`.
    pub fn render(&self, bucket: &str) -> String {
        self.template().replace(BUCKET_TOKEN, bucket)
    }
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PolicyType::ReadOnly => "read-only",
            PolicyType::WriteOnly => "write-only",
            PolicyType::ReadWrite => "read-write",
        };
        f.write_str(name)
    }
}

/// A policy to attach to a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketPolicy {
    /// One of the canned templates, rendered for the target bucket.
    Canned(PolicyType),
    /// A caller-written document, sent as is.
    Custom(String),
}

impl BucketPolicy {
    /// The document to send for `bucket`.
    pub fn document(&self, bucket: &str) -> String {
        match self {
            BucketPolicy::Canned(policy) => policy.render(bucket),
            BucketPolicy::Custom(text) => text.clone(),
        }
    }
}

impl From<PolicyType> for BucketPolicy {
    fn from(policy: PolicyType) -> Self {
        BucketPolicy::Canned(policy)
    }
}

impl From<String> for BucketPolicy {
    fn from(text: String) -> Self {
        BucketPolicy::Custom(text)
    }
}

impl From<&str> for BucketPolicy {
    fn from(text: &str) -> Self {
        BucketPolicy::Custom(text.to_string())
    }
}
