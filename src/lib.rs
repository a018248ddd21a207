//! PDF Signature Stripper Library
//!
//! This crate removes digital signatures from PDFs held in object storage:
//! - `pdf`: object graph access and the three-pass signature removal
//! - `storage`: object stores, output key derivation and working copies
//! - `server`: the `remove_signature` MCP tool

pub mod error;
pub mod pdf;
pub mod server;
pub mod storage;

pub use error::{Error, Result};
pub use pdf::{SignatureStripper, StripReport};
pub use server::{
    run_server, run_server_with_config, RemoveSignatureParams, RemoveSignatureResult,
    ServerConfig, SignatureServer, StorageBackend,
};
pub use storage::{derive_output_key, ObjectLocation, ObjectStore};
