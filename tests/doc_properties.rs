use proptest::collection::vec;
use proptest::prelude::*;
use proptest::sample::Index;
use wiki_editor::{
    Command, Document, Editor, Element, ElementKind, Mark, Node, NodeId, Point, Selection,
    SequentialIds,
};
mod proptest_config;

#[derive(Clone, Debug)]
enum CommandSpec {
    Type(String),
    Backspace,
    Enter,
    Toggle(Mark),
    Caret { leaf: Index, offset: Index },
    Range { from: Index, to: Index },
    RemoveBlock(Index),
    InsertBelow(Index, u8),
    Move { from: Index, to: Index },
    Drop { active: Index, over: Index },
}

fn text() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(" ".to_string()),
        Just("##".to_string()),
        Just("*".to_string()),
        Just("[]".to_string()),
        "[a-z]{1,4}",
        Just("e\u{301}".to_string()),
    ]
}

fn mark() -> impl Strategy<Value = Mark> {
    prop_oneof![
        Just(Mark::Bold),
        Just(Mark::Italic),
        Just(Mark::Underline),
        Just(Mark::Code),
        Just(Mark::Strikethrough),
    ]
}

fn command_specs() -> impl Strategy<Value = Vec<CommandSpec>> {
    vec(
        prop_oneof![
            4 => text().prop_map(CommandSpec::Type),
            2 => Just(CommandSpec::Backspace),
            2 => Just(CommandSpec::Enter),
            1 => mark().prop_map(CommandSpec::Toggle),
            3 => (any::<Index>(), any::<Index>())
                .prop_map(|(leaf, offset)| CommandSpec::Caret { leaf, offset }),
            1 => (any::<Index>(), any::<Index>())
                .prop_map(|(from, to)| CommandSpec::Range { from, to }),
            1 => any::<Index>().prop_map(CommandSpec::RemoveBlock),
            1 => (any::<Index>(), 0u8..4).prop_map(|(at, kind)| CommandSpec::InsertBelow(at, kind)),
            1 => (any::<Index>(), any::<Index>())
                .prop_map(|(from, to)| CommandSpec::Move { from, to }),
            1 => (any::<Index>(), any::<Index>())
                .prop_map(|(active, over)| CommandSpec::Drop { active, over }),
        ],
        1..40,
    )
}

fn initial_document() -> impl Strategy<Value = Document> {
    vec(0u8..5, 1..5).prop_map(|kinds| {
        Document::from_nodes(kinds.into_iter().map(|kind| Node::Element(block(kind))).collect())
    })
}

fn block(kind: u8) -> Element {
    match kind {
        0 => Element::paragraph("hello"),
        1 => Element::with_text(ElementKind::H2, "Title"),
        2 => Element::new(ElementKind::Image {
            url: Some("a.png".into()),
            caption: None,
        }),
        3 => Element::with_text(ElementKind::ToDo { checked: true }, "task"),
        _ => Element::paragraph("").with_children(vec![
            Node::Text(wiki_editor::Leaf::new("see ")),
            Node::Element(Element::with_text(
                ElementKind::Link {
                    url: "https://example.com".into(),
                },
                "link",
            )),
            Node::Text(wiki_editor::Leaf::new("")),
        ]),
    }
}

fn point_at(document: &Document, leaf: Index, offset: Index) -> Point {
    let leaves = document.leaves();
    let (path, leaf) = &leaves[leaf.index(leaves.len())];
    Point::new(path.clone(), offset.index(leaf.len() + 1))
}

fn realize(spec: &CommandSpec, document: &Document) -> Command {
    let top = document.len();
    let id_at = |index: Index| -> NodeId {
        document.nodes()[index.index(top)]
            .id()
            .cloned()
            .unwrap_or_else(|| NodeId::from("missing"))
    };
    match spec {
        CommandSpec::Type(text) => Command::InsertText { text: text.clone() },
        CommandSpec::Backspace => Command::DeleteBackward,
        CommandSpec::Enter => Command::InsertBreak,
        CommandSpec::Toggle(mark) => Command::ToggleMark { mark: *mark },
        CommandSpec::Caret { leaf, offset } => Command::Select {
            selection: Some(Selection::collapsed(point_at(document, *leaf, *offset))),
        },
        CommandSpec::Range { from, to } => Command::Select {
            selection: Some(Selection::new(
                point_at(document, *from, *to),
                point_at(document, *to, *from),
            )),
        },
        CommandSpec::RemoveBlock(index) => Command::RemoveBlock {
            index: index.index(top),
        },
        CommandSpec::InsertBelow(index, kind) => Command::InsertBlockBelow {
            index: index.index(top),
            block: Node::Element(block(*kind)),
        },
        CommandSpec::Move { from, to } => Command::MoveNode {
            path: vec![from.index(top)],
            to: vec![to.index(top)],
        },
        CommandSpec::Drop { active, over } => Command::DropBlock {
            active_id: id_at(*active),
            over_id: Some(id_at(*over)),
        },
    }
}

fn check_invariants(editor: &Editor) -> Result<(), TestCaseError> {
    let document = editor.document();
    prop_assert!(!document.is_empty());
    for node in document.nodes() {
        let element = node.as_element();
        prop_assert!(element.is_some(), "bare text at the top level");
        prop_assert!(!element.is_some_and(Element::is_inline), "inline block at the top level");
    }
    prop_assert_eq!(document.missing_ids(), 0);
    prop_assert!(document.duplicate_ids().is_empty());
    if let Some(selection) = editor.state().selection() {
        prop_assert!(document.is_valid_point(&selection.anchor));
        prop_assert!(document.is_valid_point(&selection.focus));
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(proptest_config::cases()))]

    #[test]
    fn prop_invariants_hold_for_any_command_sequence(
        document in initial_document(),
        specs in command_specs(),
    ) {
        let mut editor = Editor::with_id_source(document, SequentialIds::new());
        check_invariants(&editor)?;
        for spec in &specs {
            let command = realize(spec, editor.document());
            let before = editor.state().clone();
            if editor.execute(&command).is_err() {
                prop_assert_eq!(editor.state(), &before);
            }
            check_invariants(&editor)?;
        }
    }

    #[test]
    fn prop_move_to_same_path_is_identity(document in initial_document(), at in any::<Index>()) {
        let mut editor = Editor::with_id_source(document, SequentialIds::new());
        let before = editor.document().clone();
        let path = vec![at.index(before.len())];
        editor.execute(&Command::MoveNode { path: path.clone(), to: path }).unwrap();
        prop_assert_eq!(editor.document(), &before);
    }

    #[test]
    fn prop_json_round_trip(document in initial_document(), specs in command_specs()) {
        let mut editor = Editor::with_id_source(document, SequentialIds::new());
        for spec in &specs {
            let command = realize(spec, editor.document());
            let _ = editor.execute(&command);
        }
        let json = editor.document().to_json().unwrap();
        let back = Document::from_json(&json).unwrap();
        prop_assert_eq!(&back, editor.document());
    }
}

#[test]
fn test_inline_at_top_level_is_rejected() {
    let mut editor = Editor::with_id_source(Document::new(), SequentialIds::new());
    let link = Element::with_text(
        ElementKind::Link {
            url: "https://example.com".into(),
        },
        "x",
    );
    assert!(
        editor
            .execute(&Command::InsertNode {
                path: vec![0],
                node: Node::Element(link),
            })
            .is_err()
    );
    assert_eq!(editor.document().len(), 1);
}

#[test]
fn test_loading_wraps_bare_top_level_nodes() {
    let document = Document::from_json(
        r#"[{ "text": "loose" }, { "type": "link", "url": "/x", "children": [{ "text": "l" }] }]"#,
    )
    .unwrap();
    assert!(
        document
            .nodes()
            .iter()
            .all(|node| node.as_element().is_some_and(|element| !element.is_inline()))
    );
}
