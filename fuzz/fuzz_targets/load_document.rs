#![no_main]

use libfuzzer_sys::fuzz_target;
use wiki_editor::Document;

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    let Ok(doc) = Document::from_json(&input) else {
        return;
    };
    assert!(!doc.is_empty());
    let json = doc.to_json().expect("serialize");
    let again = Document::from_json(&json).expect("reload");
    assert_eq!(again, doc);
});
