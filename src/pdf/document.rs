//! Arena-backed PDF object graph
//!
//! Wraps a [`lopdf::Document`] (indirect objects keyed by [`ObjectId`]) with
//! the small access contract the signature stripper needs: slot based
//! navigation through dictionaries and arrays, and writes that record which
//! indirect objects they touched.

use crate::error::{Error, Result};
use lopdf::{Dictionary, Object, ObjectId};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

/// One step from a container to one of its members
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    /// Dictionary entry by name
    Key(Vec<u8>),
    /// Array element by position
    Index(usize),
}

/// Location of a value inside the object arena.
///
/// A slot is rooted at an indirect object and walks direct (inline) values
/// from there. Stepping through an indirect reference always produces a new
/// slot rooted at the referenced object, so a slot never depends on the
/// container it was discovered through. `Index` steps are positional and go
/// stale once items are removed from that array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    owner: ObjectId,
    path: Vec<PathStep>,
}

impl Slot {
    /// Slot addressing an indirect object itself
    pub fn root(owner: ObjectId) -> Self {
        Self {
            owner,
            path: Vec::new(),
        }
    }

    /// The indirect object this slot lives in
    pub fn owner(&self) -> ObjectId {
        self.owner
    }

    /// Whether the slot addresses an indirect object rather than an inline value
    pub fn is_indirect(&self) -> bool {
        self.path.is_empty()
    }

    fn child(&self, step: PathStep) -> Self {
        let mut path = self.path.clone();
        path.push(step);
        Self {
            owner: self.owner,
            path,
        }
    }
}

/// Serialization options
#[derive(Debug, Clone, Copy)]
pub struct SaveOptions {
    /// Drop indirect objects no longer reachable from the trailer
    pub prune_unreferenced: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            prune_unreferenced: true,
        }
    }
}

/// A parsed PDF with per-object modification tracking
pub struct PdfDocument {
    inner: lopdf::Document,
    modified: BTreeSet<ObjectId>,
}

impl PdfDocument {
    /// Parse a PDF from memory
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        let doc = lopdf::Document::load_mem(data)?;
        Self::checked(doc)
    }

    /// Parse a PDF from a file on disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let doc = lopdf::Document::load(path.as_ref())?;
        Self::checked(doc)
    }

    fn checked(doc: lopdf::Document) -> Result<Self> {
        if doc.is_encrypted() {
            return Err(Error::EncryptedPdf);
        }
        Ok(Self::from_document(doc))
    }

    /// Wrap an already built document. Nothing is marked modified.
    pub fn from_document(inner: lopdf::Document) -> Self {
        Self {
            inner,
            modified: BTreeSet::new(),
        }
    }

    /// Borrow the underlying lopdf document
    pub fn inner(&self) -> &lopdf::Document {
        &self.inner
    }

    /// Unwrap into the underlying lopdf document
    pub fn into_inner(self) -> lopdf::Document {
        self.inner
    }

    /// Number of pages in the page tree
    pub fn page_count(&self) -> u32 {
        self.inner.get_pages().len() as u32
    }

    /// Page object ids in page order
    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.inner.get_pages().into_values().collect()
    }

    /// The document catalog (trailer `Root`)
    pub fn catalog(&self) -> Option<Slot> {
        let slot = match self.inner.trailer.get(b"Root").ok()? {
            Object::Reference(id) => self.follow(*id)?,
            _ => return None,
        };
        self.dictionary(&slot)?;
        Some(slot)
    }

    /// The interactive form dictionary, inline in the catalog or indirect
    pub fn acroform(&self) -> Option<Slot> {
        let catalog = self.catalog()?;
        let slot = self.entry_slot(&catalog, b"AcroForm")?;
        self.dictionary(&slot)?;
        Some(slot)
    }

    /// Slot of the indirect object `id`, following reference chains
    pub fn follow(&self, id: ObjectId) -> Option<Slot> {
        let mut id = id;
        let mut seen = BTreeSet::new();
        while let Object::Reference(next) = self.inner.objects.get(&id)? {
            if !seen.insert(id) {
                return None;
            }
            id = *next;
        }
        Some(Slot::root(id))
    }

    /// Slot of dictionary entry `key`; a referenced value yields a root slot
    pub fn entry_slot(&self, slot: &Slot, key: &[u8]) -> Option<Slot> {
        match self.dictionary(slot)?.get(key).ok()? {
            Object::Reference(id) => self.follow(*id),
            _ => Some(slot.child(PathStep::Key(key.to_vec()))),
        }
    }

    /// Slot of array element `index`; a referenced value yields a root slot
    pub fn item_slot(&self, slot: &Slot, index: usize) -> Option<Slot> {
        match self.array(slot)?.get(index)? {
            Object::Reference(id) => self.follow(*id),
            _ => Some(slot.child(PathStep::Index(index))),
        }
    }

    /// Value stored at a slot
    pub fn get(&self, slot: &Slot) -> Option<&Object> {
        let mut current = self.inner.objects.get(&slot.owner)?;
        for step in &slot.path {
            current = match (step, current) {
                (PathStep::Key(key), Object::Dictionary(dict)) => dict.get(key).ok()?,
                (PathStep::Index(index), Object::Array(items)) => items.get(*index)?,
                _ => return None,
            };
        }
        Some(current)
    }

    fn get_mut(&mut self, slot: &Slot) -> Option<&mut Object> {
        let mut current = self.inner.objects.get_mut(&slot.owner)?;
        for step in &slot.path {
            current = match (step, current) {
                (PathStep::Key(key), Object::Dictionary(dict)) => dict.get_mut(key).ok()?,
                (PathStep::Index(index), Object::Array(items)) => items.get_mut(*index)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Dictionary stored at a slot
    pub fn dictionary(&self, slot: &Slot) -> Option<&Dictionary> {
        self.get(slot)?.as_dict().ok()
    }

    /// Array stored at a slot
    pub fn array(&self, slot: &Slot) -> Option<&Vec<Object>> {
        self.get(slot)?.as_array().ok()
    }

    /// Resolve an object that is either an inline dictionary or a reference to one
    pub fn resolve_dict<'a>(&'a self, object: &'a Object) -> Option<&'a Dictionary> {
        let (_, target) = self.inner.dereference(object).ok()?;
        target.as_dict().ok()
    }

    /// Name value of `key` in `dict`, following a reference if needed
    pub fn name<'a>(&'a self, dict: &'a Dictionary, key: &[u8]) -> Option<&'a [u8]> {
        let (_, target) = self.inner.dereference(dict.get(key).ok()?).ok()?;
        target.as_name().ok()
    }

    /// Remove a dictionary entry. Marks the owner modified if something was removed.
    pub fn remove_entry(&mut self, slot: &Slot, key: &[u8]) -> Option<Object> {
        let removed = self.get_mut(slot)?.as_dict_mut().ok()?.remove(key);
        if removed.is_some() {
            self.mark_modified(slot.owner);
        }
        removed
    }

    /// Insert or replace a dictionary entry. Marks the owner modified.
    pub fn set_entry(&mut self, slot: &Slot, key: &[u8], value: Object) -> bool {
        let Some(dict) = self.get_mut(slot).and_then(|o| o.as_dict_mut().ok()) else {
            return false;
        };
        dict.set(key.to_vec(), value);
        self.mark_modified(slot.owner);
        true
    }

    /// Remove array elements by position, keeping the order of the rest.
    /// Returns how many were removed; marks the owner modified if any were.
    pub fn remove_items(&mut self, slot: &Slot, indices: &[usize]) -> usize {
        let Some(items) = self.get_mut(slot).and_then(|o| o.as_array_mut().ok()) else {
            return 0;
        };

        let mut indices = indices.to_vec();
        indices.sort_unstable();
        indices.dedup();

        let mut removed = 0;
        for &index in indices.iter().rev() {
            if index < items.len() {
                items.remove(index);
                removed += 1;
            }
        }

        if removed > 0 {
            self.mark_modified(slot.owner);
        }
        removed
    }

    /// Flag an indirect object as changed for the serializer
    pub fn mark_modified(&mut self, id: ObjectId) {
        self.modified.insert(id);
    }

    pub fn is_modified(&self, id: ObjectId) -> bool {
        self.modified.contains(&id)
    }

    /// Whether any object has been modified since loading
    pub fn is_modified_any(&self) -> bool {
        !self.modified.is_empty()
    }

    /// Ids of all modified indirect objects, ascending
    pub fn modified_objects(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.modified.iter().copied()
    }

    /// Serialize the document
    pub fn to_bytes(&mut self, options: SaveOptions) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.write_to(&mut output, options)?;
        Ok(output)
    }

    /// Serialize the document to a file
    pub fn save<P: AsRef<Path>>(&mut self, path: P, options: SaveOptions) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        let mut writer = std::io::BufWriter::new(file);
        self.write_to(&mut writer, options)?;
        writer.flush()?;
        Ok(())
    }

    fn write_to<W: Write>(&mut self, target: &mut W, options: SaveOptions) -> Result<()> {
        if options.prune_unreferenced {
            let pruned = self.inner.prune_objects();
            if !pruned.is_empty() {
                tracing::debug!(count = pruned.len(), "Pruned unreferenced objects");
            }
        }
        self.inner.save_to(target).map_err(|e| Error::WritePdf {
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

/// Bytes searched for the header; readers accept junk before it up to this offset
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Reject data without a `%PDF-` header near the start of the file
pub fn ensure_pdf_header(data: &[u8]) -> Result<()> {
    let window = &data[..data.len().min(HEADER_SEARCH_WINDOW)];
    if !window.windows(5).any(|w| w == b"%PDF-") {
        return Err(Error::InvalidPdf {
            reason: "Not a valid PDF file".to_string(),
        });
    }
    Ok(())
}

/// Decode a PDF text string (UTF-16BE or UTF-8 with BOM, otherwise PDFDocEncoding)
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    // PDFDocEncoding agrees with Latin-1 for printable text
    bytes.iter().map(|&b| b as char).collect()
}
