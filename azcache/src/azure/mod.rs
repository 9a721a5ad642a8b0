//! Azure Blob Storage backend: Shared Key signing and a REST client
//! implementing [`crate::BlobStore`].
pub mod auth;
pub mod client;

pub use auth::SharedKeyCredential;
pub use client::{AzureBlobClient, API_VERSION, MAX_SINGLE_PUT_SIZE};
