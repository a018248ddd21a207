//! PDF processing layer
//!
//! This module provides the object graph access and signature removal,
//! built on lopdf.

mod document;
mod stripper;

#[cfg(test)]
pub(crate) mod testing;

pub use document::{
    decode_text_string, ensure_pdf_header, PathStep, PdfDocument, SaveOptions, Slot,
};
pub use stripper::{SignatureStripper, StripReport, Stripped};
