use serde_json::json;
use wiki_editor::{Document, Element, ElementKind, ExtensionRegistry, RenderMode, Renderer, render_document};

fn page() -> Document {
    Document::from_json(
        &json!([
            { "id": "h", "type": "h2", "children": [{ "text": "Tier List" }] },
            { "id": "t", "type": "to-do", "checked": true, "children": [{ "text": "farm" }] },
            { "id": "i", "type": "image", "url": "hero.png", "caption": "Hero", "children": [{ "text": "" }] },
            { "id": "tb", "type": "table", "children": [
                { "id": "r", "type": "table-row", "children": [
                    { "id": "c", "type": "table-cell", "children": [{ "text": "S", "bold": true }] }
                ]}
            ]},
            { "id": "e", "type": "events", "children": [
                { "id": "ev", "type": "event-item", "label": "Banner", "start": "2024-05-01", "children": [{ "text": "" }] }
            ]},
            { "id": "x", "type": "relic-set", "relicId": 3, "children": [{ "text": "" }] },
            { "id": "u", "type": "updates", "children": [{ "text": "" }] }
        ])
        .to_string(),
    )
    .unwrap()
}

#[test]
fn test_read_only_page() {
    let html = render_document(&page(), RenderMode::ReadOnly);
    assert!(html.starts_with("<h2 id=\"tier-list\">Tier List</h2>"));
    assert!(html.contains("<input type=\"checkbox\" checked disabled>"));
    assert!(html.contains("<figure><img src=\"hero.png\" alt=\"Hero\"><figcaption>Hero</figcaption></figure>"));
    assert!(html.contains("<table><tr><td><strong>S</strong></td></tr></table>"));
    assert!(html.contains("<time datetime=\"2024-05-01\">2024-05-01</time>"));
    assert!(html.ends_with("<section class=\"updates\"></section>"));
    assert!(!html.contains("data-node-id"));
    assert!(!html.contains("relic"));
}

#[test]
fn test_editable_page_marks_ids_and_voids() {
    let html = render_document(&page(), RenderMode::Editable);
    assert!(html.contains("<h2 id=\"tier-list\" data-node-id=\"h\">"));
    assert!(html.contains("data-node-id=\"i\" contenteditable=\"false\""));
    assert!(html.contains("data-node-id=\"u\" contenteditable=\"false\""));
    assert!(!html.contains("disabled"));
}

#[test]
fn test_extension_registry_renders_custom_blocks() {
    let mut registry = ExtensionRegistry::new();
    registry.register("relic-set", |element: &Element, _: &str, mode: RenderMode| {
        let relic = match &element.kind {
            ElementKind::Extension { payload, .. } => payload.get("relicId").cloned(),
            _ => None,
        };
        match (mode, relic) {
            (RenderMode::ReadOnly, Some(relic)) => format!("<div class=\"relic\">{relic}</div>"),
            _ => String::new(),
        }
    });
    assert!(registry.contains("relic-set"));

    let html = Renderer::new(RenderMode::ReadOnly)
        .with_extensions(&registry)
        .render_document(&page());
    assert!(html.contains("<div class=\"relic\">3</div>"));
}

#[test]
fn test_render_is_pure() {
    let document = page();
    let first = render_document(&document, RenderMode::Editable);
    let second = render_document(&document, RenderMode::Editable);
    assert_eq!(first, second);
    assert_eq!(document, page());
}
