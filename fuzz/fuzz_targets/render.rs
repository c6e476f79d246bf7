#![no_main]

use libfuzzer_sys::fuzz_target;
use wiki_editor::{Document, RenderMode, render_document};

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    if let Ok(doc) = Document::from_json(&input) {
        let _ = render_document(&doc, RenderMode::Editable);
        let _ = render_document(&doc, RenderMode::ReadOnly);
    }
});
