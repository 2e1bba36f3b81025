//! Object Store Facade
//!
//! Client-side facade over S3-compatible object stores (MinIO, Ceph RGW,
//! Cloudflare R2, AWS S3).
//!
//! # Features
//!
//! - **Key normalization**: one canonical form per object key
//! - **Endpoint resolution**: path-style, virtual-host and custom-domain URLs
//! - **Presigned requests**: time-limited grants signed with AWS Signature V4
//! - **Multipart uploads**: part bookkeeping, completion and abort
//! - **Bucket policies**: canned read/write templates bound to a bucket
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use s3_store::{ObjectStore, PutObjectOptions, StoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), s3_store::StoreError> {
//!     let config = StoreConfig::builder()
//!         .endpoint("http://127.0.0.1:9000")
//!         .credentials("minioadmin", "minioadmin")
//!         .bucket("media")
//!         .build()?;
//!     let store = ObjectStore::new(config)?;
//!
//!     store
//!         .put_object("/docs/hello.txt", b"Hello!".to_vec(), PutObjectOptions::default())
//!         .await?;
//!     let url = store.presigned_get_url(None, "docs/hello.txt")?;
//!     println!("{}", url);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod backend;
pub mod client;
pub mod config;
pub mod credentials;
pub mod endpoint;
pub mod error;
pub mod key;
pub mod mocks;
pub mod multipart;
pub mod policy;
pub mod presign;
pub mod signing;
pub mod transfer;
pub mod transport;
pub mod types;
pub mod xml;

// Re-export main types at crate root
pub use backend::{HttpBackend, ObjectStoreBackend};
pub use client::{
    ListObjectsOptions, ObjectStore, ObjectStoreBuilder, PresignOptions, PresignedUrl,
    PutObjectOptions,
};
pub use config::StoreConfig;
pub use credentials::AccessKeyPair;
pub use error::{ArgumentError, BackendError, ConfigurationError, NetworkError, StoreError};
pub use key::ObjectKey;
pub use multipart::{
    CompletedUpload, MultipartCoordinator, PartDescriptor, PartUpload, SessionState,
    UploadSession, UploadSummary, UploadTarget,
};
pub use policy::{BucketPolicy, PolicyType};
pub use presign::{ExpireIn, HttpMethod, PresignedRequest, TimeUnit};
pub use signing::{RequestSigner, SigV4Signer};
pub use transfer::ByteSource;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, StreamingResponse};
pub use types::{
    Bucket, LifecycleConfiguration, LifecycleRule, NotificationConfiguration, NotificationKind,
    NotificationTarget, ObjectMetadata, ObjectSummary, ObjectVersion, StorageClass,
    VersioningStatus,
};

/// Create a facade from environment variables.
///
/// Reads `S3_STORE_ENDPOINT`, `S3_STORE_REGION`, `S3_STORE_ACCESS_KEY`,
/// `S3_STORE_SECRET_KEY`, `S3_STORE_BUCKET` and friends.
pub fn create_store_from_env() -> Result<ObjectStore> {
    ObjectStore::builder().from_env().build()
}

/// Create a facade with explicit configuration.
pub fn create_store(config: StoreConfig) -> Result<ObjectStore> {
    ObjectStore::new(config)
}

/// Result type alias for facade operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        let _ = std::any::type_name::<StoreError>();
        let _ = std::any::type_name::<StoreConfig>();
        let _ = std::any::type_name::<ObjectStore>();
        let _ = std::any::type_name::<MultipartCoordinator>();
        let _ = std::any::type_name::<PresignedRequest>();
        let _ = std::any::type_name::<ObjectKey>();
    }
}
