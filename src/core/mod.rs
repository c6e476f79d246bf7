//! Node model for block documents.
//!
//! This module provides the building blocks every other layer works with:
//!
//! - [`NodeId`] - Stable, opaque node identifiers
//! - [`BlockType`] - The closed set of built-in element types
//! - [`ElementKind`] - Built-in types with their attributes, plus site extensions
//! - [`Element`] and [`Node`] - The document tree itself
//! - [`Leaf`] and [`Mark`] - Formatted text runs
//! - [`Path`], [`Point`] and [`Selection`] - Positions in the tree

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

pub mod leaf;
pub mod path;

pub use leaf::{Leaf, Mark, MarkSet};
pub use path::{Path, Point, Selection};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockType {
    Paragraph,
    H2,
    H3,
    BulletedList,
    NumberedList,
    ListItem,
    ToDo,
    Link,
    Image,
    Table,
    TableHead,
    TableBody,
    TableFooter,
    TableRow,
    TableHeaderCell,
    TableCell,
    Tabs,
    TabsItem,
    Group,
    GroupItem,
    Embed,
    CodeBlock,
    InfoBox,
    InfoBoxItem,
    Events,
    EventItem,
    Updates,
    TwoColumn,
    HtmlBlock,
    ToggleBlock,
    InlineAd,
}

impl BlockType {
    pub const ALL: [BlockType; 31] = [
        BlockType::Paragraph,
        BlockType::H2,
        BlockType::H3,
        BlockType::BulletedList,
        BlockType::NumberedList,
        BlockType::ListItem,
        BlockType::ToDo,
        BlockType::Link,
        BlockType::Image,
        BlockType::Table,
        BlockType::TableHead,
        BlockType::TableBody,
        BlockType::TableFooter,
        BlockType::TableRow,
        BlockType::TableHeaderCell,
        BlockType::TableCell,
        BlockType::Tabs,
        BlockType::TabsItem,
        BlockType::Group,
        BlockType::GroupItem,
        BlockType::Embed,
        BlockType::CodeBlock,
        BlockType::InfoBox,
        BlockType::InfoBoxItem,
        BlockType::Events,
        BlockType::EventItem,
        BlockType::Updates,
        BlockType::TwoColumn,
        BlockType::HtmlBlock,
        BlockType::ToggleBlock,
        BlockType::InlineAd,
    ];

    /// The `type` tag used in serialized documents.
    pub fn tag(self) -> &'static str {
        match self {
            BlockType::Paragraph => "paragraph",
            BlockType::H2 => "h2",
            BlockType::H3 => "h3",
            BlockType::BulletedList => "bulleted-list",
            BlockType::NumberedList => "numbered-list",
            BlockType::ListItem => "list-item",
            BlockType::ToDo => "to-do",
            BlockType::Link => "link",
            BlockType::Image => "image",
            BlockType::Table => "table",
            BlockType::TableHead => "table-head",
            BlockType::TableBody => "table-body",
            BlockType::TableFooter => "table-footer",
            BlockType::TableRow => "table-row",
            BlockType::TableHeaderCell => "table-header-cell",
            BlockType::TableCell => "table-cell",
            BlockType::Tabs => "tabs",
            BlockType::TabsItem => "tabs-item",
            BlockType::Group => "group",
            BlockType::GroupItem => "group-item",
            BlockType::Embed => "embed",
            BlockType::CodeBlock => "code-block",
            BlockType::InfoBox => "info-box",
            BlockType::InfoBoxItem => "info-box-item",
            BlockType::Events => "events",
            BlockType::EventItem => "event-item",
            BlockType::Updates => "updates",
            BlockType::TwoColumn => "two-column",
            BlockType::HtmlBlock => "html-block",
            BlockType::ToggleBlock => "toggle-block",
            BlockType::InlineAd => "inline-ad",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|block_type| block_type.tag() == tag)
    }

    /// Inline elements flow inside a block's text; everything else is a block.
    pub fn is_inline(self) -> bool {
        matches!(self, BlockType::Link)
    }

    /// Void elements have no editable text; they keep one empty placeholder leaf.
    pub fn is_void(self) -> bool {
        matches!(
            self,
            BlockType::Image | BlockType::Embed | BlockType::InlineAd | BlockType::Updates
        )
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewMode {
    #[default]
    #[serde(rename = "list")]
    List,
    #[serde(rename = "2-col")]
    TwoColumns,
    #[serde(rename = "3-col")]
    ThreeColumns,
    #[serde(rename = "4-col")]
    FourColumns,
}

impl ViewMode {
    pub fn columns(self) -> usize {
        match self {
            ViewMode::List => 1,
            ViewMode::TwoColumns => 2,
            ViewMode::ThreeColumns => 3,
            ViewMode::FourColumns => 4,
        }
    }
}

/// An element's type together with its type-specific attributes.
///
/// Tags that are not built in load as [`ElementKind::Extension`], keeping
/// every attribute as an opaque JSON object for site-specific renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ElementKind {
    Paragraph,
    H2,
    H3,
    BulletedList,
    NumberedList,
    ListItem,
    ToDo {
        #[serde(default)]
        checked: bool,
    },
    Link {
        #[serde(default)]
        url: String,
    },
    Image {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Table,
    TableHead,
    TableBody,
    TableFooter,
    TableRow,
    TableHeaderCell,
    TableCell,
    Tabs {
        #[serde(default)]
        tabs: Vec<String>,
    },
    TabsItem {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tab_id: Option<String>,
    },
    Group {
        #[serde(default)]
        view_mode: ViewMode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        collection: Option<String>,
    },
    GroupItem {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        icon: Option<String>,
    },
    Embed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    CodeBlock {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
    InfoBox,
    InfoBoxItem {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    Events,
    EventItem {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end: Option<String>,
    },
    Updates,
    TwoColumn,
    HtmlBlock {
        #[serde(default)]
        html: String,
    },
    ToggleBlock {
        #[serde(default)]
        open: bool,
    },
    InlineAd {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ad_unit: Option<String>,
    },
    #[serde(skip)]
    Extension {
        tag: String,
        payload: Map<String, Value>,
    },
}

impl ElementKind {
    /// Built-in kind with default attributes.
    pub fn default_for(block_type: BlockType) -> Self {
        Self::from_parts(block_type.tag(), Map::new()).unwrap_or(ElementKind::Paragraph)
    }

    pub fn extension(tag: impl Into<String>, payload: Map<String, Value>) -> Self {
        ElementKind::Extension {
            tag: tag.into(),
            payload,
        }
    }

    pub fn block_type(&self) -> Option<BlockType> {
        let block_type = match self {
            ElementKind::Paragraph => BlockType::Paragraph,
            ElementKind::H2 => BlockType::H2,
            ElementKind::H3 => BlockType::H3,
            ElementKind::BulletedList => BlockType::BulletedList,
            ElementKind::NumberedList => BlockType::NumberedList,
            ElementKind::ListItem => BlockType::ListItem,
            ElementKind::ToDo { .. } => BlockType::ToDo,
            ElementKind::Link { .. } => BlockType::Link,
            ElementKind::Image { .. } => BlockType::Image,
            ElementKind::Table => BlockType::Table,
            ElementKind::TableHead => BlockType::TableHead,
            ElementKind::TableBody => BlockType::TableBody,
            ElementKind::TableFooter => BlockType::TableFooter,
            ElementKind::TableRow => BlockType::TableRow,
            ElementKind::TableHeaderCell => BlockType::TableHeaderCell,
            ElementKind::TableCell => BlockType::TableCell,
            ElementKind::Tabs { .. } => BlockType::Tabs,
            ElementKind::TabsItem { .. } => BlockType::TabsItem,
            ElementKind::Group { .. } => BlockType::Group,
            ElementKind::GroupItem { .. } => BlockType::GroupItem,
            ElementKind::Embed { .. } => BlockType::Embed,
            ElementKind::CodeBlock { .. } => BlockType::CodeBlock,
            ElementKind::InfoBox => BlockType::InfoBox,
            ElementKind::InfoBoxItem { .. } => BlockType::InfoBoxItem,
            ElementKind::Events => BlockType::Events,
            ElementKind::EventItem { .. } => BlockType::EventItem,
            ElementKind::Updates => BlockType::Updates,
            ElementKind::TwoColumn => BlockType::TwoColumn,
            ElementKind::HtmlBlock { .. } => BlockType::HtmlBlock,
            ElementKind::ToggleBlock { .. } => BlockType::ToggleBlock,
            ElementKind::InlineAd { .. } => BlockType::InlineAd,
            ElementKind::Extension { .. } => return None,
        };
        Some(block_type)
    }

    pub fn tag(&self) -> &str {
        match self {
            ElementKind::Extension { tag, .. } => tag.as_str(),
            built_in => built_in
                .block_type()
                .map(BlockType::tag)
                .unwrap_or_default(),
        }
    }

    pub fn is_inline(&self) -> bool {
        self.block_type().is_some_and(BlockType::is_inline)
    }

    pub fn is_void(&self) -> bool {
        self.block_type().is_some_and(BlockType::is_void)
    }

    /// Splits the kind into its `type` tag and its attribute object.
    pub fn to_parts(&self) -> (String, Map<String, Value>) {
        if let ElementKind::Extension { tag, payload } = self {
            return (tag.clone(), payload.clone());
        }
        let mut attrs = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        attrs.remove("type");
        (self.tag().to_string(), attrs)
    }

    /// Rebuilds a kind from a `type` tag and attributes. Unknown tags become
    /// extensions; unknown attributes on built-in tags are dropped.
    pub fn from_parts(tag: &str, mut attrs: Map<String, Value>) -> Result<Self, serde_json::Error> {
        if BlockType::from_tag(tag).is_none() {
            return Ok(ElementKind::extension(tag, attrs));
        }
        attrs.insert("type".to_string(), Value::String(tag.to_string()));
        serde_json::from_value(Value::Object(attrs))
    }

    /// The kind this element becomes when converted to `block_type`,
    /// carrying over attributes the two types share.
    pub fn converted(&self, block_type: BlockType) -> Self {
        let (_, attrs) = self.to_parts();
        Self::from_parts(block_type.tag(), attrs).unwrap_or_else(|_| Self::default_for(block_type))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawElement", into = "RawElement")]
pub struct Element {
    pub id: Option<NodeId>,
    pub kind: ElementKind,
    pub children: Vec<Node>,
}

#[derive(Serialize, Deserialize)]
struct RawElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<NodeId>,
    #[serde(rename = "type")]
    tag: String,
    #[serde(default)]
    children: Vec<Node>,
    #[serde(flatten)]
    attrs: Map<String, Value>,
}

impl TryFrom<RawElement> for Element {
    type Error = serde_json::Error;

    fn try_from(raw: RawElement) -> Result<Self, Self::Error> {
        Ok(Self {
            id: raw.id,
            kind: ElementKind::from_parts(&raw.tag, raw.attrs)?,
            children: raw.children,
        })
    }
}

impl From<Element> for RawElement {
    fn from(element: Element) -> Self {
        let (tag, attrs) = element.kind.to_parts();
        Self {
            id: element.id,
            tag,
            children: element.children,
            attrs,
        }
    }
}

impl Element {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            id: None,
            kind,
            children: vec![Node::Text(Leaf::default())],
        }
    }

    pub fn with_text(kind: ElementKind, text: impl Into<String>) -> Self {
        Self {
            id: None,
            kind,
            children: vec![Node::Text(Leaf::new(text))],
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::with_text(ElementKind::Paragraph, text)
    }

    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn block_type(&self) -> Option<BlockType> {
        self.kind.block_type()
    }

    pub fn tag(&self) -> &str {
        self.kind.tag()
    }

    pub fn is_inline(&self) -> bool {
        self.kind.is_inline()
    }

    pub fn is_void(&self) -> bool {
        self.kind.is_void()
    }

    /// Concatenated text of every leaf below this element.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.collect_text(&mut out);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Element(Element),
    Text(Leaf),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Node::Text(leaf) => Some(leaf),
            Node::Element(_) => None,
        }
    }

    pub fn as_leaf_mut(&mut self) -> Option<&mut Leaf> {
        match self {
            Node::Text(leaf) => Some(leaf),
            Node::Element(_) => None,
        }
    }

    pub fn id(&self) -> Option<&NodeId> {
        self.as_element().and_then(|element| element.id.as_ref())
    }

    /// Blocks are elements that are not inline; leaves are never blocks.
    pub fn is_block(&self) -> bool {
        self.as_element().is_some_and(|element| !element.is_inline())
    }

    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text(leaf) => out.push_str(&leaf.text),
            Node::Element(element) => {
                for child in &element.children {
                    child.collect_text(out);
                }
            }
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<Leaf> for Node {
    fn from(leaf: Leaf) -> Self {
        Node::Text(leaf)
    }
}
