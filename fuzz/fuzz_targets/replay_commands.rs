#![no_main]

use libfuzzer_sys::fuzz_target;
use wiki_editor::{Command, Document, Editor, SequentialIds};

const START: &str = r#"[
  { "type": "paragraph", "children": [{ "text": "hello " }, { "type": "link", "url": "/x", "children": [{ "text": "link" }] }, { "text": "" }] },
  { "type": "to-do", "checked": true, "children": [{ "text": "task" }] },
  { "type": "image", "url": "a.png", "children": [{ "text": "" }] },
  { "type": "bulleted-list", "children": [{ "type": "list-item", "children": [{ "text": "item" }] }] }
]"#;

fuzz_target!(|data: &[u8]| {
    let Ok(commands) = serde_json::from_slice::<Vec<Command>>(data) else {
        return;
    };
    let Ok(start) = Document::from_json(START) else {
        return;
    };
    let mut editor = Editor::with_id_source(start, SequentialIds::new());
    for command in &commands {
        let before = editor.state().clone();
        if editor.execute(command).is_err() {
            assert_eq!(editor.state(), &before);
        }
        let doc = editor.document();
        assert!(!doc.is_empty());
        assert_eq!(doc.missing_ids(), 0);
        assert!(doc.nodes().iter().all(|node| node.as_element().is_some_and(|e| !e.is_inline())));
    }
});
