//! Reading PDF files back into an object store.
//!
//! The reader does not trust or need the cross-reference table: it scans
//! the file for `N G obj` headers, parses each object in file order (a
//! later definition of the same number replaces an earlier one, as in an
//! incremental update) and takes the last `trailer` dictionary. This is
//! enough for classic-xref files such as the ones the writer produces;
//! cross-reference streams are not supported.

use crate::color::OutputIntent;
use crate::compliance::checker::PageRecord;
use crate::compliance::types::PdfVersion;
use crate::error::{Error, Result};
use crate::object::{dict_name, Dictionary, Object, ObjectRef};
use crate::parser::{parse_indirect_object, parse_object};
use crate::store::ObjectStore;
use lazy_static::lazy_static;
use std::collections::HashSet;

lazy_static! {
    /// Regex for finding "N G obj" patterns in PDF files
    static ref RE_OBJ_PATTERN: regex::bytes::Regex = regex::bytes::Regex::new(r"(\d+)\s+(\d+)\s+obj\b").unwrap();

    /// Regex for finding "trailer <<" patterns
    static ref RE_TRAILER: regex::bytes::Regex = regex::bytes::Regex::new(r"trailer\s*<<").unwrap();
}

/// Deepest page tree that is walked.
const MAX_PAGE_TREE_DEPTH: usize = 64;

/// A parsed PDF file.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// Version in the file header
    pub header_version: PdfVersion,
    /// Every indirect object found
    pub store: ObjectStore,
    /// Trailer dictionary
    pub trailer: Dictionary,
    /// Catalog reference from the trailer /Root
    pub catalog: ObjectRef,
    /// Pages in document order, with their page-level output intents
    pub pages: Vec<PageRecord>,
    /// Document-level output intents from the catalog
    pub output_intents: Vec<OutputIntent>,
}

/// Parse a whole file.
pub fn read_document(bytes: &[u8]) -> Result<ParsedDocument> {
    let header_version = read_header(bytes)?;
    let store = scan_objects(bytes)?;
    let trailer = read_trailer(bytes)?;

    let catalog = trailer
        .get("Root")
        .and_then(Object::as_reference)
        .ok_or_else(|| Error::InvalidPdf("trailer has no /Root reference".to_string()))?;
    let catalog_dict = store
        .fetch(catalog)?
        .as_dict()
        .ok_or_else(|| Error::InvalidPdf(format!("catalog {} is not a dictionary", catalog)))?;

    let output_intents = store
        .entry_array(catalog_dict, "OutputIntents")
        .map(|intents| OutputIntent::from_array(intents, &store))
        .unwrap_or_default();
    let pages = collect_pages(&store, catalog_dict)?;

    log::info!(
        "Read PDF {}: {} objects, {} pages, {} output intents",
        header_version,
        store.len(),
        pages.len(),
        output_intents.len()
    );
    Ok(ParsedDocument {
        header_version,
        store,
        trailer,
        catalog,
        pages,
        output_intents,
    })
}

/// The version in the `%PDF-x.y` header.
pub fn read_header(bytes: &[u8]) -> Result<PdfVersion> {
    let found = || String::from_utf8_lossy(&bytes[..bytes.len().min(8)]).into_owned();
    let rest = bytes.strip_prefix(b"%PDF-").ok_or_else(|| Error::InvalidHeader(found()))?;
    let end = rest
        .iter()
        .position(|b| b.is_ascii_whitespace())
        .unwrap_or(rest.len());
    std::str::from_utf8(&rest[..end])
        .ok()
        .and_then(PdfVersion::parse)
        .ok_or_else(|| Error::InvalidHeader(found()))
}

/// Parse every `N G obj` definition in the file.
fn scan_objects(bytes: &[u8]) -> Result<ObjectStore> {
    let mut store = ObjectStore::new();
    let mut consumed_until = 0;

    for header in RE_OBJ_PATTERN.find_iter(bytes) {
        // Inside an object already parsed, e.g. stream data
        if header.start() < consumed_until {
            continue;
        }
        if header.start() > 0 && !bytes[header.start() - 1].is_ascii_whitespace() {
            continue;
        }
        match parse_indirect_object(&bytes[header.start()..]) {
            Ok((rest, (reference, object))) => {
                consumed_until = bytes.len() - rest.len();
                store.set(reference, object);
            },
            Err(e) => {
                log::warn!("Skipping unparsable object at byte {}: {:?}", header.start(), e);
            },
        }
    }

    if store.is_empty() {
        return Err(Error::InvalidPdf("no indirect objects found".to_string()));
    }
    log::debug!("Scanned {} objects", store.len());
    Ok(store)
}

/// The last trailer dictionary in the file.
fn read_trailer(bytes: &[u8]) -> Result<Dictionary> {
    let Some(last) = RE_TRAILER.find_iter(bytes).last() else {
        return Err(Error::Unsupported(
            "no trailer dictionary (cross-reference streams are not supported)".to_string(),
        ));
    };
    let start = last.start() + "trailer".len();
    let (_, trailer) = parse_object(&bytes[start..]).map_err(|e| Error::ParseError {
        offset: start,
        reason: format!("{:?}", e),
    })?;
    match trailer {
        Object::Dictionary(dict) => Ok(dict),
        other => Err(Error::InvalidObjectType {
            expected: "Dictionary".to_string(),
            found: other.type_name().to_string(),
        }),
    }
}

/// Flatten the page tree, in order.
fn collect_pages(store: &ObjectStore, catalog: &Dictionary) -> Result<Vec<PageRecord>> {
    let root = catalog
        .get("Pages")
        .and_then(Object::as_reference)
        .ok_or_else(|| Error::InvalidPdf("catalog has no /Pages reference".to_string()))?;

    let mut pages = Vec::new();
    let mut visited = HashSet::new();
    walk_page_tree(store, root, &mut pages, &mut visited, 0)?;
    Ok(pages)
}

fn walk_page_tree(
    store: &ObjectStore,
    node: ObjectRef,
    pages: &mut Vec<PageRecord>,
    visited: &mut HashSet<ObjectRef>,
    depth: usize,
) -> Result<()> {
    if depth > MAX_PAGE_TREE_DEPTH {
        return Err(Error::InvalidPdf(format!("page tree deeper than {}", MAX_PAGE_TREE_DEPTH)));
    }
    if !visited.insert(node) {
        log::warn!("Page tree cycle at {}", node);
        return Ok(());
    }
    let Some(dict) = store.fetch(node)?.as_dict() else {
        return Err(Error::InvalidPdf(format!("page tree node {} is not a dictionary", node)));
    };

    match dict_name(dict, "Type") {
        Some("Page") => {
            let mut record = PageRecord::new(node);
            if let Some(intents) = store.entry_array(dict, "OutputIntents") {
                record.output_intents = OutputIntent::from_array(intents, store);
            }
            pages.push(record);
        },
        _ => {
            for kid in store.entry_array(dict, "Kids").into_iter().flatten() {
                if let Some(kid) = kid.as_reference() {
                    walk_page_tree(store, kid, pages, visited, depth + 1)?;
                }
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &[u8] = b"%PDF-1.7\n\
1 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n\
2 0 obj\n<< /Type /Catalog /Pages 1 0 R >>\nendobj\n\
3 0 obj\n<< /Type /Page /Parent 1 0 R /Contents 4 0 R >>\nendobj\n\
4 0 obj\n<< /Length 18 >>\nstream\n9 9 obj fake 1 0 R\nendstream\nendobj\n\
trailer\n<< /Root 2 0 R /Size 5 >>\nstartxref\n0\n%%EOF";

    #[test]
    fn test_header_version() {
        assert_eq!(read_header(b"%PDF-1.4\n%...").unwrap(), PdfVersion::V1_4);
        assert!(matches!(read_header(b"GIF89a"), Err(Error::InvalidHeader(_))));
    }

    #[test]
    fn test_read_minimal_document() {
        let doc = read_document(MINIMAL).unwrap();
        assert_eq!(doc.header_version, PdfVersion::V1_7);
        assert_eq!(doc.catalog, ObjectRef::new(2, 0));
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.pages[0].reference, ObjectRef::new(3, 0));
        // The header inside the stream data is not an object
        assert!(doc.store.get(ObjectRef::new(9, 9)).is_none());
        assert_eq!(doc.store.len(), 4);
    }

    #[test]
    fn test_later_definition_wins() {
        let mut bytes = MINIMAL.to_vec();
        bytes.extend_from_slice(b"\n2 0 obj\n<< /Type /Catalog /Pages 1 0 R /Lang (en) >>\nendobj\n");
        bytes.extend_from_slice(b"trailer\n<< /Root 2 0 R /Size 5 >>\n%%EOF");
        let doc = read_document(&bytes).unwrap();
        let catalog = doc.store.get(doc.catalog).and_then(Object::as_dict).unwrap();
        assert!(catalog.contains_key("Lang"));
    }

    #[test]
    fn test_missing_trailer_is_unsupported() {
        let bytes = b"%PDF-1.7\n1 0 obj\n<< /Type /Catalog >>\nendobj\n";
        assert!(matches!(read_document(bytes), Err(Error::Unsupported(_))));
    }
}
