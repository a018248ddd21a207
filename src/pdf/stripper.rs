//! Digital signature removal
//!
//! Removes signature form fields, their widget annotations and the
//! AcroForm `SigFlags` entry from a [`PdfDocument`], in that order. The
//! annotation pass still sees the `FT`/`Parent` links of fields already
//! dropped from `AcroForm.Fields`, since detaching a field from the form
//! leaves its object in the arena.

use super::document::{decode_text_string, PdfDocument, SaveOptions, Slot};
use crate::error::Result;
use lopdf::Object;
use serde::Serialize;
use std::path::Path;

/// Field type tag of signature fields
const SIGNATURE_FIELD_TYPE: &[u8] = b"Sig";

/// Annotation subtype of form field widgets
const WIDGET_SUBTYPE: &[u8] = b"Widget";

/// Entries carrying signature payload and policy on a field
const SIGNATURE_VALUE_KEYS: [&[u8]; 3] = [b"V", b"SV", b"Lock"];

/// Outcome of a stripping run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StripReport {
    /// Names (`T`) of the removed signature fields, in form order
    pub removed_fields: Vec<String>,
    /// Widget annotations removed across all pages
    pub removed_annotations: usize,
    /// Whether a `SigFlags` entry was removed from the AcroForm
    pub sig_flags_cleared: bool,
    /// Pages in the document
    pub page_count: u32,
}

impl StripReport {
    /// True when the document carried no signature artifacts
    pub fn is_noop(&self) -> bool {
        self.removed_fields.is_empty() && self.removed_annotations == 0 && !self.sig_flags_cleared
    }
}

/// Result of stripping a serialized PDF
pub struct Stripped {
    pub data: Vec<u8>,
    pub report: StripReport,
}

/// Removes digital signature artifacts from PDF documents
pub struct SignatureStripper;

impl SignatureStripper {
    /// Strip every signature field, signature widget and `SigFlags` entry.
    ///
    /// Total over structurally valid documents and idempotent: documents
    /// without a form or without signatures come back untouched, with no
    /// object marked modified. Entries of unexpected type are skipped.
    pub fn strip(doc: &mut PdfDocument) -> StripReport {
        let removed_fields = remove_signature_fields(doc);
        let removed_annotations = remove_signature_widgets(doc);
        let sig_flags_cleared = clear_signature_flags(doc);

        let report = StripReport {
            removed_fields,
            removed_annotations,
            sig_flags_cleared,
            page_count: doc.page_count(),
        };

        tracing::info!(
            pages = report.page_count,
            fields = report.removed_fields.len(),
            annotations = report.removed_annotations,
            sig_flags_cleared = report.sig_flags_cleared,
            "Processed PDF"
        );
        report
    }

    /// Parse, strip and serialize a PDF.
    ///
    /// When nothing was removed the input bytes are returned as they are.
    pub fn strip_bytes(data: &[u8], options: SaveOptions) -> Result<Stripped> {
        let mut doc = PdfDocument::load_bytes(data)?;
        let report = Self::strip(&mut doc);

        let data = if doc.is_modified_any() {
            doc.to_bytes(options)?
        } else {
            data.to_vec()
        };

        Ok(Stripped { data, report })
    }

    /// Strip the PDF at `input` into `output`.
    ///
    /// When nothing was removed `input` is copied over unchanged.
    pub fn strip_file(input: &Path, output: &Path, options: SaveOptions) -> Result<StripReport> {
        let mut doc = PdfDocument::load(input)?;
        let report = Self::strip(&mut doc);

        if doc.is_modified_any() {
            doc.save(output, options)?;
        } else {
            std::fs::copy(input, output)?;
        }

        Ok(report)
    }
}

/// Whether the dictionary's `FT` is the signature type
fn is_signature_field(doc: &PdfDocument, dict: &lopdf::Dictionary) -> bool {
    doc.name(dict, b"FT") == Some(SIGNATURE_FIELD_TYPE)
}

fn field_name(doc: &PdfDocument, slot: &Slot) -> String {
    match doc.dictionary(slot).and_then(|d| d.get(b"T").ok()) {
        Some(Object::String(bytes, _)) => decode_text_string(bytes),
        _ => "(unnamed)".to_string(),
    }
}

/// Pass 1: drop signature fields from `AcroForm.Fields`, clearing their values first
fn remove_signature_fields(doc: &mut PdfDocument) -> Vec<String> {
    let Some(form) = doc.acroform() else {
        tracing::debug!("No AcroForm found, document has no form fields");
        return Vec::new();
    };

    let fields = match doc.entry_slot(&form, b"Fields") {
        Some(slot) if doc.array(&slot).is_some_and(|items| !items.is_empty()) => slot,
        _ => {
            tracing::debug!("No form fields found");
            return Vec::new();
        }
    };

    let count = doc.array(&fields).map_or(0, Vec::len);
    let mut marked = Vec::new();
    let mut targets = Vec::new();

    for index in 0..count {
        let Some(field) = doc.item_slot(&fields, index) else {
            continue;
        };
        let Some(dict) = doc.dictionary(&field) else {
            tracing::debug!(index, "Skipping form field entry that is not a dictionary");
            continue;
        };
        if is_signature_field(doc, dict) {
            marked.push(index);
            targets.push(field);
        }
    }

    // Clearing happens before the array is touched so inline field slots stay valid
    let mut names = Vec::with_capacity(targets.len());
    for field in &targets {
        let name = field_name(doc, field);
        tracing::info!(field = %name, "Found signature field to remove");
        for key in SIGNATURE_VALUE_KEYS {
            doc.remove_entry(field, key);
        }
        names.push(name);
    }

    if doc.remove_items(&fields, &marked) > 0 {
        doc.mark_modified(form.owner());
        tracing::info!(count = marked.len(), "Removed signature field(s)");
    }

    names
}

/// Whether the annotation entry is a widget for a signature field, either
/// through its own `FT` or its `Parent` field's `FT`
fn is_signature_widget(doc: &PdfDocument, entry: &Object) -> bool {
    let Some(annotation) = doc.resolve_dict(entry) else {
        return false;
    };
    if doc.name(annotation, b"Subtype") != Some(WIDGET_SUBTYPE) {
        return false;
    }
    if is_signature_field(doc, annotation) {
        return true;
    }
    annotation
        .get(b"Parent")
        .ok()
        .and_then(|parent| doc.resolve_dict(parent))
        .is_some_and(|parent| is_signature_field(doc, parent))
}

/// Pass 2: drop signature widgets from every page's `Annots`, in page order
fn remove_signature_widgets(doc: &mut PdfDocument) -> usize {
    let mut total_removed = 0;

    for (page_index, page_id) in doc.page_ids().into_iter().enumerate() {
        let page = Slot::root(page_id);
        let Some(annots) = doc.entry_slot(&page, b"Annots") else {
            continue;
        };
        let view: &PdfDocument = doc;
        let Some(entries) = view.array(&annots) else {
            continue;
        };

        let marked: Vec<usize> = entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| is_signature_widget(view, entry))
            .map(|(index, _)| index)
            .collect();
        if marked.is_empty() {
            continue;
        }

        let removed = doc.remove_items(&annots, &marked);
        total_removed += removed;
        tracing::debug!(page = page_index + 1, removed, "Removed signature widget(s)");

        if doc.array(&annots).is_some_and(Vec::is_empty) {
            doc.remove_entry(&page, b"Annots");
        }
    }

    if total_removed > 0 {
        tracing::info!(count = total_removed, "Removed signature annotation(s) from pages");
    }
    total_removed
}

/// Pass 3: remove `SigFlags` from the AcroForm whatever its value
fn clear_signature_flags(doc: &mut PdfDocument) -> bool {
    let Some(form) = doc.acroform() else {
        return false;
    };
    let cleared = doc.remove_entry(&form, b"SigFlags").is_some();
    if cleared {
        tracing::info!("Cleared AcroForm SigFlags");
    }
    cleared
}
