//! Building output documents from a page plan
//!
//! Output pages are new page dictionaries that point at the source page's
//! content and resources. Only objects reachable from the planned pages are
//! copied, and they keep their source ids, so no renumbering is needed.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use lopdf::{Dictionary, Document, Object, ObjectId};
use crate::error::Result;
use crate::pdf::banner::{self, StandardFonts};
use crate::pdf::merge::SourceDocument;
use crate::pdf::split::{half_bounds, Half};

/// One page of an output document
#[derive(Debug, Clone, PartialEq)]
pub enum PlannedPage {
    /// A source page copied verbatim
    Copy(usize),
    /// One half of a source page, sized to that half
    Half(usize, Half),
    /// A generated page with one large centred line
    Banner(String),
    /// A generated page with precomputed content
    Text(String),
}

/// Build a document holding `plan` in order
pub fn compose(source: &SourceDocument, plan: &[PlannedPage]) -> Result<Document> {
    let mut doc = Document::with_version("1.5");

    // Page dictionaries to create, paired with the source objects they use
    let mut page_dicts: Vec<Dictionary> = Vec::with_capacity(plan.len());
    let mut roots: Vec<ObjectId> = Vec::new();

    for entry in plan {
        match entry {
            PlannedPage::Copy(index) => {
                let page = source_page(source, *index)?;
                collect_roots(&page, &mut roots);
                page_dicts.push(page);
            }
            PlannedPage::Half(index, half) => {
                let geometry = source.geometry(*index)?;
                let mut page = source_page(source, *index)?;
                let bounds = half_bounds(&geometry, *half);
                page.set("MediaBox", bounds.to_object());
                page.remove(b"CropBox");
                // Annotations are positioned on the full sheet
                page.remove(b"Annots");
                collect_roots(&page, &mut roots);
                page_dicts.push(page);
            }
            PlannedPage::Banner(_) | PlannedPage::Text(_) => page_dicts.push(Dictionary::new()),
        }
    }

    // Copy everything the source pages reach, keeping ids
    let copied = reachable_objects(|id| source.object(id), &roots);
    let highest_copied = copied.keys().map(|id| id.0).max().unwrap_or(0);
    let kept: HashSet<ObjectId> = copied.keys().copied().collect();
    for page in page_dicts.iter_mut() {
        for (_, value) in page.iter_mut() {
            null_dangling_references(value, &kept);
        }
    }
    doc.objects.extend(copied);
    doc.max_id = highest_copied;

    // Generated pages are added after the copy so their ids cannot collide
    let mut fonts: Option<StandardFonts> = None;
    for (entry, dict) in plan.iter().zip(page_dicts.iter_mut()) {
        let content = match entry {
            PlannedPage::Banner(text) => banner::banner_content(text),
            PlannedPage::Text(content) => content.clone(),
            _ => continue,
        };
        let fonts = *fonts.get_or_insert_with(|| StandardFonts::add_to(&mut doc));
        *dict = banner::text_page(&mut doc, &fonts, content);
    }

    let pages_id = doc.new_object_id();
    let mut kids = Vec::with_capacity(page_dicts.len());
    for mut page in page_dicts {
        page.set("Parent", Object::Reference(pages_id));
        kids.push(Object::Reference(doc.add_object(Object::Dictionary(page))));
    }

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(kids.len() as i64));
    pages.set("Kids", Object::Array(kids));
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    Ok(doc)
}

/// Compose `plan` and save it to `output`, returning the page count
pub fn write_document(source: &SourceDocument, plan: &[PlannedPage], output: &Path) -> Result<usize> {
    let mut doc = compose(source, plan)?;
    doc.compress();
    doc.save(output)?;
    Ok(plan.len())
}

/// Clone a source page dictionary without its link into the source tree
fn source_page(source: &SourceDocument, index: usize) -> Result<Dictionary> {
    let mut page = source.page_dictionary(index)?.clone();
    page.remove(b"Parent");
    Ok(page)
}

fn collect_roots(page: &Dictionary, roots: &mut Vec<ObjectId>) {
    for (_, value) in page.iter() {
        collect_references(value, roots);
    }
}

fn collect_references(object: &Object, out: &mut Vec<ObjectId>) {
    match object {
        Object::Reference(id) => out.push(*id),
        Object::Array(items) => items.iter().for_each(|item| collect_references(item, out)),
        Object::Dictionary(dict) => {
            for (key, value) in dict.iter() {
                if key.as_slice() != b"Parent" {
                    collect_references(value, out);
                }
            }
        }
        Object::Stream(stream) => {
            for (key, value) in stream.dict.iter() {
                if key.as_slice() != b"Parent" {
                    collect_references(value, out);
                }
            }
        }
        _ => {}
    }
}

/// Transitive closure of `roots` over the objects `lookup` resolves
///
/// Page and page-tree nodes are never followed: annotations and structure
/// elements point back at their pages, and following those would drag the
/// whole source document along. References to anything left behind are
/// replaced by null in the copies, so ids handed out later cannot alias them.
fn reachable_objects<'a>(
    lookup: impl Fn(ObjectId) -> Option<&'a Object>,
    roots: &[ObjectId],
) -> BTreeMap<ObjectId, Object> {
    let mut seen: HashSet<ObjectId> = HashSet::new();
    let mut stack: Vec<ObjectId> = roots.to_vec();
    let mut copied = BTreeMap::new();

    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        let Some(object) = lookup(id) else {
            continue;
        };
        if is_page_tree_node(object) {
            continue;
        }
        collect_references(object, &mut stack);
        copied.insert(id, object.clone());
    }

    let kept: HashSet<ObjectId> = copied.keys().copied().collect();
    for object in copied.values_mut() {
        null_dangling_references(object, &kept);
    }

    copied
}

/// Replace every reference not in `kept` with null
fn null_dangling_references(object: &mut Object, kept: &HashSet<ObjectId>) {
    if matches!(object, Object::Reference(id) if !kept.contains(id)) {
        *object = Object::Null;
        return;
    }
    match object {
        Object::Array(items) => items.iter_mut().for_each(|item| null_dangling_references(item, kept)),
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                null_dangling_references(value, kept);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                null_dangling_references(value, kept);
            }
        }
        _ => {}
    }
}

fn is_page_tree_node(object: &Object) -> bool {
    let dict = match object {
        Object::Dictionary(dict) => dict,
        _ => return false,
    };
    matches!(
        dict.get(b"Type").and_then(|t| t.as_name()),
        Ok(b"Page") | Ok(b"Pages")
    )
}
