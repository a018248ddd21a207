//! Builders for small form documents used by unit tests

use super::PdfDocument;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

pub(crate) struct TestPdf {
    pub doc: Document,
    pub catalog_id: ObjectId,
    pub pages: Vec<ObjectId>,
}

impl TestPdf {
    /// Document with `page_count` pages, each with a tiny content stream
    pub fn new(page_count: usize) -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let mut pages = Vec::with_capacity(page_count);
        for n in 0..page_count {
            let content = format!("BT /F1 12 Tf 72 720 Td (page {}) Tj ET", n + 1);
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(612), Object::Integer(792)],
                "Contents" => content_id
            });
            pages.push(page_id);
        }

        let kids: Vec<Object> = pages.iter().map(|id| Object::Reference(*id)).collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count as i64
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id
        });
        doc.trailer.set("Root", catalog_id);

        Self {
            doc,
            catalog_id,
            pages,
        }
    }

    /// Merged signature field and widget, optionally placed on a 1-indexed page
    pub fn signature_field(&mut self, name: &str, page: Option<usize>) -> ObjectId {
        let value_id = self.doc.add_object(dictionary! {
            "Type" => "Sig",
            "Filter" => "Adobe.PPKLite",
            "SubFilter" => "adbe.pkcs7.detached",
            "Contents" => Object::String(vec![0x30, 0x82, 0x01], lopdf::StringFormat::Hexadecimal)
        });
        let lock_id = self.doc.add_object(dictionary! {
            "Type" => "SigFieldLock",
            "Action" => "All"
        });
        let field = dictionary! {
            "FT" => "Sig",
            "T" => Object::string_literal(name),
            "V" => value_id,
            "SV" => dictionary! { "Filter" => "Adobe.PPKLite" },
            "Lock" => lock_id,
            "Type" => "Annot",
            "Subtype" => "Widget",
            "Rect" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(0), Object::Integer(0)]
        };
        self.place_widget(field, page)
    }

    /// Merged text field and widget, optionally placed on a 1-indexed page
    pub fn text_field(&mut self, name: &str, page: Option<usize>) -> ObjectId {
        let field = dictionary! {
            "FT" => "Tx",
            "T" => Object::string_literal(name),
            "V" => Object::string_literal(format!("{} value", name)),
            "Type" => "Annot",
            "Subtype" => "Widget",
            "Rect" => vec![Object::Integer(10), Object::Integer(10), Object::Integer(200), Object::Integer(30)]
        };
        self.place_widget(field, page)
    }

    /// Non-merged field: parent field dictionary plus one kid widget on a page
    pub fn field_with_widget(&mut self, field_type: &str, name: &str, page: usize) -> (ObjectId, ObjectId) {
        let field_id = self.doc.add_object(dictionary! {
            "FT" => field_type,
            "T" => Object::string_literal(name)
        });
        let widget_id = self.add_annotation(
            page,
            dictionary! {
                "Type" => "Annot",
                "Subtype" => "Widget",
                "Parent" => field_id,
                "Rect" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(50), Object::Integer(50)]
            },
        );
        if let Ok(Object::Dictionary(field)) = self.doc.get_object_mut(field_id) {
            field.set("Kids", vec![Object::Reference(widget_id)]);
        }
        (field_id, widget_id)
    }

    /// Link annotation on a 1-indexed page
    pub fn link_annotation(&mut self, page: usize) -> ObjectId {
        self.add_annotation(
            page,
            dictionary! {
                "Type" => "Annot",
                "Subtype" => "Link",
                "Rect" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(10), Object::Integer(10)]
            },
        )
    }

    /// Add an indirect annotation to a 1-indexed page
    pub fn add_annotation(&mut self, page: usize, annotation: Dictionary) -> ObjectId {
        let id = self.doc.add_object(annotation);
        self.push_annotation(page, Object::Reference(id));
        id
    }

    /// Append a raw entry (inline or reference) to a page's `Annots` array
    pub fn push_annotation(&mut self, page: usize, entry: Object) {
        let page_id = self.pages[page - 1];
        if let Ok(Object::Dictionary(page_dict)) = self.doc.get_object_mut(page_id) {
            if !page_dict.has(b"Annots") {
                page_dict.set("Annots", Vec::<Object>::new());
            }
            if let Ok(Object::Array(annots)) = page_dict.get_mut(b"Annots") {
                annots.push(entry);
            }
        }
    }

    /// Indirect AcroForm listing `fields`
    pub fn acroform(&mut self, fields: Vec<ObjectId>, sig_flags: Option<i64>) -> ObjectId {
        let fields: Vec<Object> = fields.into_iter().map(Object::Reference).collect();
        self.acroform_with_entries(fields, sig_flags)
    }

    /// Indirect AcroForm with arbitrary `Fields` entries
    pub fn acroform_with_entries(&mut self, fields: Vec<Object>, sig_flags: Option<i64>) -> ObjectId {
        let mut form = dictionary! {
            "Fields" => fields,
            "DA" => Object::string_literal("/Helv 0 Tf 0 g")
        };
        if let Some(flags) = sig_flags {
            form.set("SigFlags", flags);
        }
        let form_id = self.doc.add_object(form);
        self.set_catalog_entry("AcroForm", Object::Reference(form_id));
        form_id
    }

    /// AcroForm stored directly inside the catalog
    pub fn inline_acroform(&mut self, form: Dictionary) {
        self.set_catalog_entry("AcroForm", Object::Dictionary(form));
    }

    fn set_catalog_entry(&mut self, key: &str, value: Object) {
        if let Ok(Object::Dictionary(catalog)) = self.doc.get_object_mut(self.catalog_id) {
            catalog.set(key, value);
        }
    }

    fn place_widget(&mut self, mut field: Dictionary, page: Option<usize>) -> ObjectId {
        match page {
            Some(page) => {
                field.set("P", self.pages[page - 1]);
                self.add_annotation(page, field)
            }
            None => self.doc.add_object(field),
        }
    }

    pub fn into_document(self) -> PdfDocument {
        PdfDocument::from_document(self.doc)
    }

    pub fn to_bytes(mut self) -> Vec<u8> {
        let mut output = Vec::new();
        self.doc.save_to(&mut output).unwrap();
        output
    }
}
