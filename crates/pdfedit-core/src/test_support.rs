//! In-memory fixture PDFs shared by the unit tests

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};

/// One `BT /F1 size Tf x y Td (text) Tj ET` block per entry: (text, x, y, size).
pub fn single_page_pdf(runs: &[(&str, f64, f64, f64)]) -> Vec<u8> {
    let mut operations = Vec::new();
    for (text, x, y, size) in runs {
        operations.extend(vec![
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(b"F1".to_vec()), Object::Real(*size as f32)],
            ),
            Operation::new(
                "Td",
                vec![Object::Real(*x as f32), Object::Real(*y as f32)],
            ),
            Operation::new(
                "Tj",
                vec![Object::String(
                    text.as_bytes().to_vec(),
                    StringFormat::Literal,
                )],
            ),
            Operation::new("ET", vec![]),
        ]);
    }
    let content = Content { operations }.encode().unwrap();
    pdf_with_content(&content, helvetica_resources())
}

/// Multi-page document with "Page N" on every page.
pub fn multi_page_pdf(num_pages: u32) -> Vec<u8> {
    let pages: Vec<Vec<u8>> = (1..=num_pages)
        .map(|i| format!("BT /F1 12 Tf 100 700 Td (Page {}) Tj ET", i).into_bytes())
        .collect();
    build(&pages, |_| helvetica_resources())
}

/// Single page with an arbitrary raw content stream.
pub fn pdf_with_content(content: &[u8], resources: Dictionary) -> Vec<u8> {
    build(&[content.to_vec()], |_| resources)
}

/// Single page whose resources may point at indirect objects (e.g. ToUnicode streams).
pub fn pdf_with_resources_from(
    content: &[u8],
    resources: impl FnOnce(&mut Document) -> Dictionary,
) -> Vec<u8> {
    build(&[content.to_vec()], resources)
}

pub fn helvetica_resources() -> Dictionary {
    dictionary! {
        "Font" => dictionary! {
            "F1" => dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            },
        },
    }
}

fn build(
    page_contents: &[Vec<u8>],
    resources: impl FnOnce(&mut Document) -> Dictionary,
) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let resources = resources(&mut doc);
    let resources_id = doc.add_object(resources);

    let mut page_ids = Vec::new();
    for content in page_contents {
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.clone()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Count" => page_ids.len() as i64,
        "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}
