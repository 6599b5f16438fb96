//! PDF text extraction, one [`SourceDocument`] per page.

use std::path::Path;

use lopdf::Document;
use serde_json::json;
use tracing::{debug, warn};

use docchat_core::{Metadata, SourceDocument};

use crate::error::RagError;

/// Extract the text of every page of the PDF at `path`.
///
/// Each page becomes a document with metadata `{"source": <path>, "page":
/// <0-based index>}`. Pages without text are dropped, and a file with no
/// text at all is an error since there would be nothing to index.
pub fn load_pdf(path: &Path) -> Result<Vec<SourceDocument>, RagError> {
    let doc = Document::load(path)?;
    if doc.is_encrypted() {
        return Err(RagError::Pdf(format!("{} is encrypted", path.display())));
    }

    let source = path.display().to_string();
    let mut documents = Vec::new();

    for (index, page_number) in doc.get_pages().keys().enumerate() {
        let text = match doc.extract_text(&[*page_number]) {
            Ok(text) => text,
            Err(e) => {
                warn!(source = %source, page = index, error = %e, "Skipping unreadable page");
                continue;
            }
        };
        if text.trim().is_empty() {
            debug!(source = %source, page = index, "Skipping page without text");
            continue;
        }

        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), json!(source));
        metadata.insert("page".to_string(), json!(index));
        documents.push(SourceDocument::new(text, metadata));
    }

    if documents.is_empty() {
        return Err(RagError::EmptyDocument(source));
    }

    debug!(source = %source, pages = documents.len(), "PDF loaded");
    Ok(documents)
}

/// Write a minimal PDF with one page per entry of `pages`, each drawing its
/// text in Courier. An empty entry produces a blank page.
#[cfg(any(test, feature = "test-support"))]
pub fn write_text_pdf(path: &Path, pages: &[&str]) -> Result<(), RagError> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for text in pages {
        let mut operations = Vec::new();
        if !text.is_empty() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            operations.push(Operation::new("Td", vec![72.into(), 720.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path)?;
    Ok(())
}
