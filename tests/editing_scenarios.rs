use serde_json::json;
use wiki_editor::{
    Command, Document, DragSession, Editor, ElementKind, Mark, Node, NodeId, Point, Selection,
    SequentialIds,
};

fn load(value: serde_json::Value) -> Document {
    Document::from_json(&value.to_string()).unwrap()
}

fn editor(value: serde_json::Value) -> Editor {
    Editor::with_id_source(load(value), SequentialIds::new())
}

fn place_caret(editor: &mut Editor, path: Vec<usize>, offset: usize) {
    editor
        .execute(&Command::Select {
            selection: Some(Selection::collapsed(Point::new(path, offset))),
        })
        .unwrap();
}

fn type_text(editor: &mut Editor, text: &str) {
    for c in text.chars() {
        editor
            .execute(&Command::InsertText { text: c.to_string() })
            .unwrap();
    }
}

fn block_texts(editor: &Editor) -> Vec<String> {
    editor.document().nodes().iter().map(Node::text).collect()
}

fn kinds(editor: &Editor) -> Vec<ElementKind> {
    editor
        .document()
        .nodes()
        .iter()
        .filter_map(Node::as_element)
        .map(|element| element.kind.clone())
        .collect()
}

#[test]
fn test_bullet_shortcut_in_new_block() {
    let mut editor = editor(json!([{ "type": "paragraph", "children": [{ "text": "hello " }] }]));
    place_caret(&mut editor, vec![0, 0], 6);
    editor.execute(&Command::InsertBreak).unwrap();
    type_text(&mut editor, "* ");

    assert_eq!(kinds(&editor), [ElementKind::Paragraph, ElementKind::BulletedList]);
    assert_eq!(block_texts(&editor), ["hello ", ""]);
    assert_eq!(editor.state().caret(), Some(&Point::new(vec![1, 0], 0)));
}

#[test]
fn test_enter_at_block_start_inserts_empty_paragraph_above() {
    let mut editor = editor(json!([
        { "id": "a", "type": "paragraph", "children": [{ "text": "A" }] },
        { "id": "b", "type": "paragraph", "children": [{ "text": "B" }] }
    ]));
    place_caret(&mut editor, vec![1, 0], 0);
    editor.execute(&Command::InsertBreak).unwrap();

    assert_eq!(block_texts(&editor), ["A", "", "B"]);
    assert_eq!(
        kinds(&editor),
        [ElementKind::Paragraph, ElementKind::Paragraph, ElementKind::Paragraph]
    );
    assert_eq!(editor.document().nodes()[2].id(), Some(&NodeId::from("b")));
    assert!(editor.document().nodes()[1].id().is_some());
}

#[test]
fn test_enter_at_end_of_todo_continues_list() {
    let mut editor = editor(json!([
        { "type": "to-do", "checked": false, "children": [{ "text": "x" }] }
    ]));
    place_caret(&mut editor, vec![0, 0], 1);
    editor.execute(&Command::InsertBreak).unwrap();

    assert_eq!(
        kinds(&editor),
        [ElementKind::ToDo { checked: false }, ElementKind::ToDo { checked: false }]
    );
    assert_eq!(block_texts(&editor), ["x", ""]);
}

#[test]
fn test_drop_moves_block_to_target_index() {
    let mut editor = editor(json!([
        { "id": "n1", "type": "paragraph", "children": [{ "text": "one" }] },
        { "id": "n2", "type": "h2", "children": [{ "text": "two" }] },
        { "id": "n4", "type": "paragraph", "children": [{ "text": "four" }] },
        { "id": "n3", "type": "bulleted-list", "children": [
            { "id": "li", "type": "list-item", "children": [{ "text": "three" }] }
        ]}
    ]));
    let before = editor.document().nodes()[3].clone();

    let mut drag = DragSession::new();
    editor.execute(&drag.start(NodeId::from("n3"))).unwrap();
    assert!(editor.state().selection().is_none());
    let drop = drag.end(Some(NodeId::from("n1"))).unwrap();
    editor.execute(&drop).unwrap();

    let ids: Vec<&str> = editor
        .document()
        .top_level_ids()
        .into_iter()
        .map(NodeId::as_str)
        .collect();
    assert_eq!(ids, ["n3", "n1", "n2", "n4"]);
    assert_eq!(editor.document().nodes()[0], before);
    assert!(!drag.is_dragging());
}

#[test]
fn test_drop_on_itself_or_nothing_is_noop() {
    let mut editor = editor(json!([
        { "id": "n1", "type": "paragraph", "children": [{ "text": "one" }] },
        { "id": "n2", "type": "paragraph", "children": [{ "text": "two" }] }
    ]));
    let before = editor.document().clone();

    let mut drag = DragSession::new();
    drag.start(NodeId::from("n2"));
    assert_eq!(drag.end(Some(NodeId::from("n2"))), None);
    editor
        .execute(&Command::DropBlock {
            active_id: NodeId::from("n2"),
            over_id: Some(NodeId::from("missing")),
        })
        .unwrap();
    assert_eq!(editor.document(), &before);
}

#[test]
fn test_heading_shortcuts() {
    let mut editor = editor(json!([{ "type": "paragraph", "children": [{ "text": "" }] }]));
    place_caret(&mut editor, vec![0, 0], 0);
    type_text(&mut editor, "### Drops");
    assert_eq!(kinds(&editor), [ElementKind::H3]);
    assert_eq!(block_texts(&editor), ["Drops"]);
}

#[test]
fn test_enter_in_list_item_keeps_type() {
    let mut editor = editor(json!([{ "type": "numbered-list", "children": [{ "text": "first" }] }]));
    place_caret(&mut editor, vec![0, 0], 5);
    editor.execute(&Command::InsertBreak).unwrap();
    type_text(&mut editor, "second");
    assert_eq!(kinds(&editor), [ElementKind::NumberedList, ElementKind::NumberedList]);
    assert_eq!(block_texts(&editor), ["first", "second"]);
}

#[test]
fn test_enter_mid_block_splits_text() {
    let mut editor = editor(json!([{ "type": "h2", "children": [{ "text": "TitleBody" }] }]));
    place_caret(&mut editor, vec![0, 0], 5);
    editor.execute(&Command::InsertBreak).unwrap();
    assert_eq!(kinds(&editor), [ElementKind::H2, ElementKind::Paragraph]);
    assert_eq!(block_texts(&editor), ["Title", "Body"]);
}

#[test]
fn test_backspace_on_empty_list_block_becomes_paragraph() {
    let mut editor = editor(json!([
        { "type": "paragraph", "children": [{ "text": "a" }] },
        { "type": "bulleted-list", "children": [{ "text": "" }] }
    ]));
    place_caret(&mut editor, vec![1, 0], 0);
    editor.execute(&Command::DeleteBackward).unwrap();
    assert_eq!(kinds(&editor), [ElementKind::Paragraph, ElementKind::Paragraph]);

    editor.execute(&Command::DeleteBackward).unwrap();
    assert_eq!(block_texts(&editor), ["a"]);
    assert_eq!(editor.state().caret(), Some(&Point::new(vec![0, 0], 1)));
}

#[test]
fn test_bold_hotkey_then_typing() {
    let mut editor = editor(json!([{ "type": "paragraph", "children": [{ "text": "ab" }] }]));
    place_caret(&mut editor, vec![0, 0], 2);
    editor
        .execute(&Command::Hotkey {
            combo: "mod+b".into(),
        })
        .unwrap();
    type_text(&mut editor, "cd");

    let leaves = editor.document().leaves();
    let bold: Vec<&str> = leaves
        .iter()
        .filter(|(_, leaf)| leaf.has_mark(Mark::Bold))
        .map(|(_, leaf)| leaf.text.as_str())
        .collect();
    assert_eq!(bold, ["cd"]);
    assert_eq!(block_texts(&editor), ["abcd"]);
}

#[test]
fn test_toggle_mark_over_range() {
    let mut editor = editor(json!([{ "type": "paragraph", "children": [{ "text": "hello world" }] }]));
    editor
        .execute(&Command::Select {
            selection: Some(Selection::new(
                Point::new(vec![0, 0], 0),
                Point::new(vec![0, 0], 5),
            )),
        })
        .unwrap();
    editor
        .execute(&Command::ToggleMark { mark: Mark::Italic })
        .unwrap();
    let leaves = editor.document().leaves();
    assert_eq!(leaves.len(), 2);
    assert_eq!(leaves[0].1.text, "hello");
    assert!(leaves[0].1.has_mark(Mark::Italic));
    assert!(!leaves[1].1.has_mark(Mark::Italic));
}

#[test]
fn test_typing_over_expanded_selection() {
    let mut editor = editor(json!([
        { "type": "paragraph", "children": [{ "text": "abc" }] },
        { "type": "paragraph", "children": [{ "text": "def" }] }
    ]));
    editor
        .execute(&Command::Select {
            selection: Some(Selection::new(
                Point::new(vec![0, 0], 1),
                Point::new(vec![1, 0], 2),
            )),
        })
        .unwrap();
    type_text(&mut editor, "X");
    assert_eq!(block_texts(&editor), ["aXf"]);
}

#[test]
fn test_block_actions() {
    let mut editor = editor(json!([{ "id": "p", "type": "paragraph", "children": [{ "text": "a" }] }]));
    editor
        .execute(&Command::InsertBlockBelow {
            index: 0,
            block: Node::Element(wiki_editor::Element::new(ElementKind::Image {
                url: Some("a.png".into()),
                caption: None,
            })),
        })
        .unwrap();
    assert_eq!(editor.document().len(), 2);
    assert!(editor.document().element(&[1]).unwrap().is_void());
    assert_eq!(editor.document().missing_ids(), 0);

    editor.execute(&Command::RemoveBlock { index: 0 }).unwrap();
    editor.execute(&Command::RemoveBlock { index: 0 }).unwrap();
    assert_eq!(editor.document().len(), 1);
    assert_eq!(kinds(&editor), [ElementKind::Paragraph]);
}

#[test]
fn test_operation_log_replays_to_same_document() {
    let start = load(json!([{ "id": "p", "type": "paragraph", "children": [{ "text": "" }] }]));
    let mut editor = Editor::with_id_source(start.clone(), SequentialIds::new());
    place_caret(&mut editor, vec![0, 0], 0);
    type_text(&mut editor, "[] buy milk");
    editor.execute(&Command::InsertBreak).unwrap();
    type_text(&mut editor, "eggs");
    let operations = editor.take_operations();

    let json = serde_json::to_string(&operations).unwrap();
    let operations: Vec<wiki_editor::Operation> = serde_json::from_str(&json).unwrap();
    let mut replay = wiki_editor::EditorState::new(start);
    for operation in &operations {
        replay.apply(operation).unwrap();
    }
    assert_eq!(replay.document(), editor.document());
}
