//! Merging scan inputs into one addressable source document

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use lopdf::{Dictionary, Document, Object, ObjectId};
use crate::error::{Error, Result};
use crate::pdf::classify::{inherited_attribute, page_geometry, PageGeometry, INHERITABLE_KEYS};

/// The merged scan: every input page in order, addressable by zero-based index
///
/// Read-only once built. `path` points at a PDF on disk holding exactly these
/// pages (the single input itself, or the merged intermediate file), which is
/// what the rasterizer opens. Only the object table is kept, so the source can
/// be shared between assembly workers.
#[derive(Debug)]
pub struct SourceDocument {
    objects: BTreeMap<ObjectId, Object>,
    page_ids: Vec<ObjectId>,
    geometries: Vec<PageGeometry>,
    path: PathBuf,
}

impl SourceDocument {
    /// Merge `inputs` in order
    ///
    /// A single input is opened directly. Several inputs are merged and the
    /// result is written to `merged_<timestamp>.pdf` inside `scratch_dir`.
    ///
    /// Based on the lopdf merge example:
    /// https://github.com/J-F-Liu/lopdf/blob/main/examples/merge.rs
    pub fn merge(inputs: &[PathBuf], scratch_dir: &Path) -> Result<Self> {
        if inputs.is_empty() {
            return Err(Error::General("No input files provided".to_string()));
        }

        // Validate all input files exist before parsing any of them
        for path in inputs {
            if !path.exists() {
                return Err(Error::FileNotFound(path.clone()));
            }
        }

        let mut documents = Vec::with_capacity(inputs.len());
        for path in inputs {
            let mut doc = Document::load(path).map_err(|source| Error::ingest(path, source))?;

            if doc.get_pages().is_empty() {
                return Err(Error::EmptyPdf(path.clone()));
            }

            materialize_inherited_attributes(&mut doc);
            documents.push(doc);
        }

        if documents.len() == 1 {
            let doc = documents.remove(0);
            return Self::from_document(doc, inputs[0].clone());
        }

        let mut merged = concatenate(documents);
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let merged_path = scratch_dir.join(format!("merged_{}.pdf", timestamp));
        merged.save(&merged_path)?;

        Self::from_document(merged, merged_path)
    }

    /// Wrap an already loaded document whose pages live at `path`
    ///
    /// A page without usable geometry is an ingest error for `path`.
    pub fn from_document(doc: Document, path: PathBuf) -> Result<Self> {
        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        let geometries = page_ids
            .iter()
            .map(|&id| page_geometry(&doc, id).map_err(|e| Error::ingest(&path, e.to_string())))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { objects: doc.objects, page_ids, geometries, path })
    }

    /// Number of pages
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// PDF file on disk holding these pages
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Object from the merged object table
    pub fn object(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(&id)
    }

    /// Dictionary of the page at `index`
    pub fn page_dictionary(&self, index: usize) -> Result<&Dictionary> {
        let id = self
            .page_ids
            .get(index)
            .ok_or_else(|| Error::General(format!("Page index {} out of range", index)))?;
        match self.objects.get(id) {
            Some(Object::Dictionary(dict)) => Ok(dict),
            _ => Err(Error::General(format!("Page {} is not a dictionary", index + 1))),
        }
    }

    /// Geometry of the page at `index`
    pub fn geometry(&self, index: usize) -> Result<PageGeometry> {
        self.geometries
            .get(index)
            .copied()
            .ok_or_else(|| Error::General(format!("Page index {} out of range", index)))
    }
}

/// Copy inherited page attributes onto every page dictionary
///
/// After merging, pages hang under a new parent that carries no attributes,
/// so anything they inherited from their original tree must live on the page.
fn materialize_inherited_attributes(doc: &mut Document) {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();

    for page_id in page_ids {
        let inherited: Vec<(&[u8], Object)> = INHERITABLE_KEYS
            .iter()
            .filter(|key| {
                doc.get_dictionary(page_id)
                    .map(|page| !page.has(key))
                    .unwrap_or(false)
            })
            .filter_map(|key| inherited_attribute(doc, page_id, key).map(|v| (*key, v.clone())))
            .collect();

        if let Ok(page) = doc.get_dictionary_mut(page_id) {
            for (key, value) in inherited {
                page.set(key.to_vec(), value);
            }
        }
    }
}

/// Concatenate documents into one with a fresh, flat page tree
fn concatenate(documents: Vec<Document>) -> Document {
    // Define a starting max_id for merged document
    let mut max_id = 1;
    let mut page_ids: Vec<ObjectId> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for mut doc in documents {
        // Renumber objects in this document to avoid conflicts
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        page_ids.extend(doc.get_pages().into_values());
        objects.extend(doc.objects);
    }

    let mut merged = Document::with_version("1.5");
    merged.objects.extend(objects);

    // new_object_id() must hand out ids above everything just copied in
    merged.max_id = max_id - 1;

    let pages_id = merged.new_object_id();
    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(page_ids.len() as i64));
    pages.set("Kids", Object::Array(kids));

    let catalog_id = merged.new_object_id();
    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));

    merged.objects.insert(catalog_id, Object::Dictionary(catalog));
    merged.objects.insert(pages_id, Object::Dictionary(pages));
    merged.trailer.set("Root", Object::Reference(catalog_id));

    for &page_id in &page_ids {
        if let Ok(page) = merged.get_dictionary_mut(page_id) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use lopdf::dictionary;

    #[test]
    fn test_merge_empty_input_list() {
        let scratch = TempDir::new().expect("Failed to create temp directory");
        let result = SourceDocument::merge(&[], scratch.path());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("No input files"));
    }

    #[test]
    fn test_merge_nonexistent_file() {
        let scratch = TempDir::new().expect("Failed to create temp directory");
        let result = SourceDocument::merge(&[PathBuf::from("nonexistent.pdf")], scratch.path());
        assert!(matches!(result.unwrap_err(), Error::FileNotFound(_)));
    }

    #[test]
    fn test_merge_unparseable_file_is_ingest_error() {
        let scratch = TempDir::new().expect("Failed to create temp directory");
        let bogus = scratch.path().join("scan.pdf");
        std::fs::write(&bogus, b"this is not a pdf").unwrap();

        let result = SourceDocument::merge(&[bogus.clone()], scratch.path());
        match result {
            Err(Error::Ingest { path, .. }) => assert_eq!(path, bogus),
            other => panic!("Expected ingest error, got {:?}", other),
        }
    }

    #[test]
    fn test_page_without_media_box_is_ingest_error() {
        let scratch = TempDir::new().expect("Failed to create temp directory");
        let input = scratch.path().join("scan.pdf");

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(lopdf::dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(lopdf::dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => Object::Integer(1),
            }),
        );
        let catalog_id = doc.add_object(lopdf::dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(&input).expect("Failed to write fixture");

        match SourceDocument::merge(&[input.clone()], scratch.path()) {
            Err(err @ Error::Ingest { .. }) => {
                assert!(err.to_string().contains("has no MediaBox"));
                assert!(matches!(err, Error::Ingest { ref path, .. } if *path == input));
            }
            other => panic!("Expected ingest error, got {:?}", other),
        }
    }
}
