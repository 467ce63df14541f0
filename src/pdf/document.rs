use anyhow::{anyhow, Context, Result};
use lopdf::{Document, Object, ObjectId};
use std::collections::BTreeMap;
use std::path::Path;

use crate::layout::PageGeometry;

// Guards against malformed page trees whose Parent links form a loop
const MAX_TREE_DEPTH: usize = 64;

pub struct PdfDocument {
    pub doc: Document,
    pub path: String,
    // 1-indexed page number -> page object, walked once at load
    pages: BTreeMap<u32, ObjectId>,
}

impl PdfDocument {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().display().to_string();
        let doc =
            Document::load(&path).with_context(|| format!("Failed to open PDF: {}", path_str))?;
        Ok(Self::from_document(doc, path_str))
    }

    /// Wrap an already loaded document; `name` is used in messages only
    pub fn from_document(doc: Document, name: impl Into<String>) -> Self {
        let pages = doc.get_pages();
        PdfDocument {
            doc,
            path: name.into(),
            pages,
        }
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Look up 1-indexed page `number`
    pub fn page_id(&self, number: u32) -> Result<ObjectId> {
        self.pages
            .get(&number)
            .copied()
            .ok_or_else(|| anyhow!("Page {} is out of range (1-{})", number, self.page_count()))
    }

    /// Look up a page attribute, following Parent links for inheritable keys
    /// (MediaBox, Resources, Rotate, CropBox). References are resolved.
    pub fn inherited_attribute(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut node = self.doc.get_dictionary(page_id).ok()?;

        for _ in 0..MAX_TREE_DEPTH {
            if let Ok(value) = node.get(key) {
                return self.resolve(value);
            }
            let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
            node = self.doc.get_dictionary(parent).ok()?;
        }

        None
    }

    pub fn resolve<'a>(&'a self, obj: &'a Object) -> Option<&'a Object> {
        match obj {
            Object::Reference(id) => self.doc.get_object(*id).ok(),
            other => Some(other),
        }
    }

    /// MediaBox of a page as layout geometry
    pub fn page_geometry(&self, page_id: ObjectId) -> Result<PageGeometry> {
        let media_box = self
            .inherited_attribute(page_id, b"MediaBox")
            .ok_or_else(|| anyhow!("Page object {:?} has no MediaBox", page_id))?;

        let rect = self.rectangle(media_box).ok_or_else(|| {
            anyhow!(
                "Page object {:?} has a malformed MediaBox: {:?}",
                page_id,
                media_box
            )
        })?;

        Ok(PageGeometry::from_box(rect))
    }

    /// Page rotation in degrees, normalised to 0, 90, 180 or 270
    pub fn rotation(&self, page_id: ObjectId) -> i64 {
        match self.inherited_attribute(page_id, b"Rotate") {
            Some(Object::Integer(degrees)) => degrees.rem_euclid(360),
            _ => 0,
        }
    }

    fn rectangle(&self, obj: &Object) -> Option<[f64; 4]> {
        let values = obj.as_array().ok()?;
        if values.len() != 4 {
            return None;
        }

        let mut rect = [0.0; 4];
        for (slot, value) in rect.iter_mut().zip(values) {
            *slot = extract_number(self.resolve(value)?)?;
        }
        Some(rect)
    }

    /// Save to a file
    pub fn save<P: AsRef<Path>>(doc: &mut Document, path: P) -> Result<()> {
        doc.save(&path)
            .with_context(|| format!("Failed to save PDF: {}", path.as_ref().display()))?;
        Ok(())
    }
}

pub fn extract_number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}
