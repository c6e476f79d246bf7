//! Rendering documents to HTML.
//!
//! Every built-in [`ElementKind`] has a fixed rendering. Types with an
//! interactive form (links, images, groups, events, updates) render
//! differently in [`RenderMode::Editable`] and [`RenderMode::ReadOnly`].
//! Extension types are looked up in an [`ExtensionRegistry`]; a type with no
//! registered renderer renders as nothing.

use crate::core::{Element, ElementKind, Leaf, Mark, Node, Point};
use crate::doc::Document;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

mod html;

pub use html::{escape, slug};
use html::{attr, opt_attr, safe_url, wrap};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderMode {
    #[default]
    Editable,
    ReadOnly,
}

/// Renders one extension element. `children` is the already rendered HTML of
/// the element's children.
pub trait BlockRenderer: Send + Sync {
    fn render(&self, element: &Element, children: &str, mode: RenderMode) -> String;
}

impl<F> BlockRenderer for F
where
    F: Fn(&Element, &str, RenderMode) -> String + Send + Sync,
{
    fn render(&self, element: &Element, children: &str, mode: RenderMode) -> String {
        self(element, children, mode)
    }
}

/// Site-specific renderers keyed by element type tag.
#[derive(Default)]
pub struct ExtensionRegistry {
    renderers: HashMap<String, Box<dyn BlockRenderer>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `renderer` for `tag`, returning the renderer it replaces.
    pub fn register(
        &mut self,
        tag: impl Into<String>,
        renderer: impl BlockRenderer + 'static,
    ) -> Option<Box<dyn BlockRenderer>> {
        self.renderers.insert(tag.into(), Box::new(renderer))
    }

    pub fn get(&self, tag: &str) -> Option<&dyn BlockRenderer> {
        self.renderers.get(tag).map(|renderer| renderer.as_ref())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.renderers.contains_key(tag)
    }

    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.renderers.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}

/// Empty registry used when no extensions are supplied.
static NO_EXTENSIONS: std::sync::LazyLock<ExtensionRegistry> =
    std::sync::LazyLock::new(ExtensionRegistry::default);

#[derive(Debug, Clone)]
pub struct Renderer<'a> {
    mode: RenderMode,
    extensions: &'a ExtensionRegistry,
    placeholder: Option<(&'a str, &'a Point)>,
}

impl<'a> Renderer<'a> {
    pub fn new(mode: RenderMode) -> Self {
        Self {
            mode,
            extensions: &NO_EXTENSIONS,
            placeholder: None,
        }
    }

    pub fn with_extensions(mut self, extensions: &'a ExtensionRegistry) -> Self {
        self.extensions = extensions;
        self
    }

    /// Shows `text` as a placeholder on the empty top-level block holding the
    /// caret. Only applies in editable mode.
    pub fn with_placeholder(mut self, text: &'a str, caret: &'a Point) -> Self {
        self.placeholder = Some((text, caret));
        self
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn render_document(&self, document: &Document) -> String {
        let mut out = String::new();
        for (index, node) in document.nodes().iter().enumerate() {
            match node {
                Node::Element(element) => {
                    let placeholder = self.placeholder_for(index, element);
                    out.push_str(&self.render_element(element, placeholder));
                }
                Node::Text(leaf) => out.push_str(&render_leaf(leaf)),
            }
        }
        out
    }

    pub fn render_node(&self, node: &Node) -> String {
        match node {
            Node::Element(element) => self.render_element(element, None),
            Node::Text(leaf) => render_leaf(leaf),
        }
    }

    fn placeholder_for(&self, index: usize, element: &Element) -> Option<&'a str> {
        let (text, caret) = self.placeholder?;
        let holds_caret = caret.path.first() == Some(&index);
        (self.mode == RenderMode::Editable && holds_caret && element.text().is_empty()).then_some(text)
    }

    fn render_children(&self, element: &Element) -> String {
        element
            .children
            .iter()
            .map(|child| self.render_node(child))
            .collect()
    }

    fn render_element(&self, element: &Element, placeholder: Option<&str>) -> String {
        let children = self.render_children(element);
        let editable = self.mode == RenderMode::Editable;
        let mut base = String::new();
        if editable {
            if let Some(id) = &element.id {
                base.push_str(&attr("data-node-id", id.as_str()));
            }
            if element.is_void() {
                base.push_str(&attr("contenteditable", "false"));
            }
            base.push_str(&opt_attr("data-placeholder", placeholder));
        }
        // Voids keep their placeholder leaf in the editable DOM only.
        let void_children = if editable { children.as_str() } else { "" };

        match &element.kind {
            ElementKind::Paragraph => wrap("p", &base, &children),
            ElementKind::H2 => wrap("h2", &(attr("id", &heading_slug(element)) + &base), &children),
            ElementKind::H3 => wrap("h3", &(attr("id", &heading_slug(element)) + &base), &children),
            ElementKind::BulletedList => wrap("ul", &base, &children),
            ElementKind::NumberedList => wrap("ol", &base, &children),
            ElementKind::ListItem => wrap("li", &base, &children),
            ElementKind::ToDo { checked } => {
                let mut input = String::from("<input type=\"checkbox\"");
                if *checked {
                    input.push_str(" checked");
                }
                if !editable {
                    input.push_str(" disabled");
                }
                input.push('>');
                let attrs = attr("class", "to-do") + &attr("data-checked", &checked.to_string()) + &base;
                wrap("div", &attrs, &(input + &wrap("span", "", &children)))
            }
            ElementKind::Link { url } => {
                if editable {
                    wrap("span", &(attr("class", "link") + &attr("data-url", url) + &base), &children)
                } else {
                    match safe_url(url) {
                        Some(url) => wrap("a", &attr("href", url), &children),
                        None => children,
                    }
                }
            }
            ElementKind::Image { url, caption } => {
                let img = format!(
                    "<img{}{}>",
                    opt_attr("src", url.as_deref()),
                    attr("alt", caption.as_deref().unwrap_or_default())
                );
                if editable {
                    wrap("div", &(attr("class", "image") + &base), &(img + void_children))
                } else {
                    let caption = caption
                        .as_deref()
                        .map(|caption| wrap("figcaption", "", &escape(caption)))
                        .unwrap_or_default();
                    wrap("figure", "", &(img + &caption))
                }
            }
            ElementKind::Table => wrap("table", &base, &children),
            ElementKind::TableHead => wrap("thead", &base, &children),
            ElementKind::TableBody => wrap("tbody", &base, &children),
            ElementKind::TableFooter => wrap("tfoot", &base, &children),
            ElementKind::TableRow => wrap("tr", &base, &children),
            ElementKind::TableHeaderCell => wrap("th", &base, &children),
            ElementKind::TableCell => wrap("td", &base, &children),
            ElementKind::Tabs { tabs } => {
                let buttons: String = tabs
                    .iter()
                    .map(|tab| wrap("button", &attr("type", "button"), &escape(tab)))
                    .collect();
                let list = wrap("div", &attr("class", "tab-list"), &buttons);
                wrap("div", &(attr("class", "tabs") + &base), &(list + &children))
            }
            ElementKind::TabsItem { tab_id } => wrap(
                "div",
                &(attr("class", "tabs-item") + &opt_attr("data-tab-id", tab_id.as_deref()) + &base),
                &children,
            ),
            ElementKind::Group {
                view_mode,
                collection,
            } => {
                let mut attrs = attr("class", "group");
                attrs.push_str(&opt_attr("data-collection", collection.as_deref()));
                if editable {
                    let mode = serde_json::to_value(view_mode)
                        .ok()
                        .and_then(|value| value.as_str().map(str::to_string))
                        .unwrap_or_default();
                    attrs.push_str(&attr("data-view-mode", &mode));
                } else {
                    let style = format!(
                        "display:grid;grid-template-columns:repeat({}, minmax(0, 1fr))",
                        view_mode.columns()
                    );
                    attrs.push_str(&attr("style", &style));
                }
                wrap("div", &(attrs + &base), &children)
            }
            ElementKind::GroupItem { label, url, icon } => {
                if editable {
                    let attrs = attr("class", "group-item") + &opt_attr("data-url", url.as_deref()) + &base;
                    return wrap("div", &attrs, &children);
                }
                let icon = icon
                    .as_deref()
                    .map(|icon| format!("<img{}>", attr("src", icon)))
                    .unwrap_or_default();
                let text = match label {
                    Some(label) => escape(label),
                    None => children,
                };
                let content = icon + &wrap("span", "", &text);
                match url.as_deref().and_then(safe_url) {
                    Some(url) => wrap("a", &(attr("class", "group-item") + &attr("href", url)), &content),
                    None => wrap("div", &attr("class", "group-item"), &content),
                }
            }
            ElementKind::Embed { url } => {
                let frame = wrap("iframe", &opt_attr("src", url.as_deref().and_then(safe_url)), "");
                wrap("div", &(attr("class", "embed") + &base), &(frame + void_children))
            }
            ElementKind::CodeBlock { language } => {
                let class = language.as_deref().map(|language| format!("language-{language}"));
                wrap("pre", &base, &wrap("code", &opt_attr("class", class.as_deref()), &children))
            }
            ElementKind::InfoBox => wrap("aside", &(attr("class", "info-box") + &base), &children),
            ElementKind::InfoBoxItem { label } => {
                let label = label
                    .as_deref()
                    .map(|label| wrap("span", &attr("class", "label"), &escape(label)))
                    .unwrap_or_default();
                wrap("div", &(attr("class", "info-box-item") + &base), &(label + &children))
            }
            ElementKind::Events => {
                let tag = if editable { "div" } else { "ul" };
                wrap(tag, &(attr("class", "events") + &base), &children)
            }
            ElementKind::EventItem { label, start, end } => {
                if editable {
                    let attrs = attr("class", "event-item")
                        + &opt_attr("data-start", start.as_deref())
                        + &opt_attr("data-end", end.as_deref())
                        + &base;
                    return wrap("div", &attrs, &children);
                }
                let text = match label {
                    Some(label) => escape(label),
                    None => children,
                };
                let times: String = [start, end]
                    .into_iter()
                    .flatten()
                    .map(|time| wrap("time", &attr("datetime", time), &escape(time)))
                    .collect();
                wrap("li", &attr("class", "event-item"), &(wrap("span", "", &text) + &times))
            }
            ElementKind::Updates => {
                if editable {
                    wrap("div", &(attr("class", "updates") + &base), void_children)
                } else {
                    wrap("section", &attr("class", "updates"), "")
                }
            }
            ElementKind::TwoColumn => wrap("div", &(attr("class", "two-column") + &base), &children),
            ElementKind::HtmlBlock { html } => {
                if editable {
                    wrap("pre", &(attr("class", "html-block") + &base), &(escape(html) + &children))
                } else {
                    wrap("div", &attr("class", "html-block"), html)
                }
            }
            ElementKind::ToggleBlock { open } => {
                let mut attrs = attr("class", "toggle-block");
                if *open || editable {
                    attrs.push_str(" open");
                }
                wrap("details", &(attrs + &base), &children)
            }
            ElementKind::InlineAd { ad_unit } => wrap(
                "div",
                &(attr("class", "inline-ad") + &opt_attr("data-ad-unit", ad_unit.as_deref()) + &base),
                void_children,
            ),
            ElementKind::Extension { tag, .. } => match self.extensions.get(tag) {
                Some(renderer) => renderer.render(element, &children, self.mode),
                None => {
                    debug!(%tag, "no renderer registered for extension type");
                    String::new()
                }
            },
        }
    }
}

fn heading_slug(element: &Element) -> String {
    let first = element
        .children
        .first()
        .and_then(Node::as_leaf)
        .map(|leaf| leaf.text.as_str())
        .unwrap_or_default();
    slug(first)
}

const MARK_TAGS: [(Mark, &str); 5] = [
    (Mark::Code, "code"),
    (Mark::Strikethrough, "s"),
    (Mark::Underline, "u"),
    (Mark::Italic, "em"),
    (Mark::Bold, "strong"),
];

fn render_leaf(leaf: &Leaf) -> String {
    let mut out = escape(&leaf.text);
    for (mark, tag) in MARK_TAGS {
        if leaf.has_mark(mark) {
            out = wrap(tag, "", &out);
        }
    }
    out
}

/// Renders `document` with no extensions and no placeholder.
pub fn render_document(document: &Document, mode: RenderMode) -> String {
    Renderer::new(mode).render_document(document)
}
