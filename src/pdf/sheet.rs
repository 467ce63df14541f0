use anyhow::Result;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use super::xobject::XObjectCopier;
use super::PdfDocument;
use crate::layout::{PagePlacement, A4_LANDSCAPE_HEIGHT, A4_LANDSCAPE_WIDTH};

/// Builds the imposed output document one landscape sheet at a time
pub struct SheetWriter {
    doc: Document,
    pages_id: ObjectId,
    sheets: Vec<ObjectId>,
    copier: XObjectCopier,
}

impl Default for SheetWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl SheetWriter {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        SheetWriter {
            doc,
            pages_id,
            sheets: Vec::new(),
            copier: XObjectCopier::new(),
        }
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Add one sheet holding up to two source pages
    pub fn add_sheet(
        &mut self,
        source: &PdfDocument,
        pages: &[(ObjectId, PagePlacement)],
    ) -> Result<ObjectId> {
        let mut content = String::new();
        let mut xobjects = Dictionary::new();

        for (page_id, placement) in pages {
            let name = format!("P{}", placement.half.index());
            let form_id =
                self.copier
                    .page_to_form(&mut self.doc, source, *page_id, &placement.crop)?;
            xobjects.set(name.as_bytes(), Object::Reference(form_id));
            content.push_str(&placement.transform.to_content_op(&name));
        }

        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(self.pages_id));
        page.set("MediaBox", a4_landscape_box());
        page.set("Contents", Object::Reference(content_id));
        page.set("Resources", Object::Dictionary(resources));

        let sheet_id = self.doc.add_object(page);
        self.sheets.push(sheet_id);
        Ok(sheet_id)
    }

    /// Close the page tree and return the finished document
    pub fn finish(mut self) -> Document {
        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(self.sheets.len() as i64));
        pages.set(
            "Kids",
            Object::Array(self.sheets.iter().map(|&id| Object::Reference(id)).collect()),
        );
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(self.pages_id));
        let catalog_id = self.doc.add_object(catalog);
        self.doc.trailer.set("Root", Object::Reference(catalog_id));

        self.doc.compress();
        self.doc
    }
}

fn a4_landscape_box() -> Object {
    Object::Array(vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Real(A4_LANDSCAPE_WIDTH as f32),
        Object::Real(A4_LANDSCAPE_HEIGHT as f32),
    ])
}
