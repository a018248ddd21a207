//! Object storage transfer and request-scoped working files

pub mod http;
pub mod local;
pub mod location;
pub mod workspace;

pub use http::HttpObjectStore;
pub use local::LocalObjectStore;
pub use location::{derive_output_key, ObjectLocation, OUTPUT_SEGMENT};
pub use workspace::Workspace;

use crate::error::Result;
use async_trait::async_trait;

/// Storage backend holding the input and output PDFs
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Download the full object
    async fn fetch(&self, location: &ObjectLocation) -> Result<Vec<u8>>;

    /// Upload an object, replacing any existing one
    async fn store(&self, location: &ObjectLocation, data: Vec<u8>) -> Result<()>;

    /// Human readable description of the backend, for logs
    fn describe(&self) -> String;
}
