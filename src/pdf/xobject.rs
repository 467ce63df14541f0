use anyhow::{Context, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;

use super::PdfDocument;
use crate::layout::CropRect;

/// Copies source pages into an output document as Form XObjects.
///
/// Objects reachable from page resources are copied once per source document;
/// pages sharing fonts or images reuse the same output objects.
#[derive(Default)]
pub struct XObjectCopier {
    copied: HashMap<ObjectId, ObjectId>,
}

impl XObjectCopier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap `page_id` as a Form XObject clipped to `crop`
    pub fn page_to_form(
        &mut self,
        output: &mut Document,
        source: &PdfDocument,
        page_id: ObjectId,
        crop: &CropRect,
    ) -> Result<ObjectId> {
        let content = page_content(source, page_id)
            .with_context(|| format!("Failed to read content of page object {:?}", page_id))?;

        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Form".to_vec()));
        dict.set("FormType", Object::Integer(1));
        dict.set(
            "BBox",
            Object::Array(
                crop.as_array()
                    .iter()
                    .map(|&v| Object::Real(v as f32))
                    .collect(),
            ),
        );

        if let Some(resources) = source.inherited_attribute(page_id, b"Resources") {
            let resources = self.copy(output, source, resources)?;
            dict.set("Resources", resources);
        }

        Ok(output.add_object(Stream::new(dict, content)))
    }

    /// Deep copy `obj` from `source` into `output`, following references
    fn copy(
        &mut self,
        output: &mut Document,
        source: &PdfDocument,
        obj: &Object,
    ) -> Result<Object> {
        match obj {
            Object::Reference(id) => {
                if let Some(&new_id) = self.copied.get(id) {
                    return Ok(Object::Reference(new_id));
                }

                // Reserve the id first so reference cycles terminate
                let new_id = output.new_object_id();
                self.copied.insert(*id, new_id);

                let referenced = source
                    .doc
                    .get_object(*id)
                    .with_context(|| format!("Dangling reference {:?}", id))?;
                let copied = self.copy(output, source, referenced)?;
                output.objects.insert(new_id, copied);

                Ok(Object::Reference(new_id))
            }
            Object::Dictionary(dict) => {
                Ok(Object::Dictionary(self.copy_dict(output, source, dict)?))
            }
            Object::Array(items) => {
                let mut copied = Vec::with_capacity(items.len());
                for item in items {
                    copied.push(self.copy(output, source, item)?);
                }
                Ok(Object::Array(copied))
            }
            Object::Stream(stream) => {
                let mut copied = stream.clone();
                copied.dict = self.copy_dict(output, source, &stream.dict)?;
                Ok(Object::Stream(copied))
            }
            _ => Ok(obj.clone()),
        }
    }

    fn copy_dict(
        &mut self,
        output: &mut Document,
        source: &PdfDocument,
        dict: &Dictionary,
    ) -> Result<Dictionary> {
        let mut copied = Dictionary::new();
        for (key, value) in dict.iter() {
            // Parent links would drag the whole source page tree along
            if key.as_slice() == b"Parent" {
                continue;
            }
            copied.set(key.clone(), self.copy(output, source, value)?);
        }
        Ok(copied)
    }
}

/// Decoded content of a page, concatenating multiple content streams
fn page_content(source: &PdfDocument, page_id: ObjectId) -> Result<Vec<u8>> {
    let page = source.doc.get_dictionary(page_id)?;

    let contents = match page.get(b"Contents") {
        Ok(contents) => contents,
        // A page without content is blank
        Err(_) => return Ok(Vec::new()),
    };

    let streams: Vec<&Object> = match source.resolve(contents) {
        Some(Object::Array(items)) => items.iter().collect(),
        Some(other) => vec![other],
        None => Vec::new(),
    };

    let mut result = Vec::new();
    for obj in streams {
        let Some(Object::Stream(stream)) = source.resolve(obj) else {
            continue;
        };
        result.extend_from_slice(&decoded(stream)?);
        result.push(b'\n');
    }

    Ok(result)
}

fn decoded(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.has(b"Filter") {
        stream
            .decompressed_content()
            .context("Unsupported content stream filter")
    } else {
        Ok(stream.content.clone())
    }
}
