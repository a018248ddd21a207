//! Object locators and output key derivation

use serde::Serialize;
use std::fmt;

/// Path segment inserted in front of the file name of every output key
pub const OUTPUT_SEGMENT: &str = "sem-certificado";

/// Opaque address of an object: a container (bucket) and a key within it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Location of the unsigned copy, in the same bucket
    pub fn output(&self) -> Self {
        Self {
            bucket: self.bucket.clone(),
            key: derive_output_key(&self.key),
        }
    }

    /// Final path component of the key
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Insert [`OUTPUT_SEGMENT`] right before the final path component of `key`,
/// or prepend it when the key has no `/`.
///
/// `docs/assinado.pdf` becomes `docs/sem-certificado/assinado.pdf`.
pub fn derive_output_key(key: &str) -> String {
    match key.rsplit_once('/') {
        Some((dir, file)) => format!("{}/{}/{}", dir, OUTPUT_SEGMENT, file),
        None => format!("{}/{}", OUTPUT_SEGMENT, key),
    }
}
