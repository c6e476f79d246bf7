//! Text leaves and formatting marks.
//!
//! A [`Leaf`] is a terminal run of text carrying a set of [`Mark`]s. Offsets
//! into a leaf are measured in extended grapheme clusters so that a caret can
//! never land inside a flag emoji or a combining sequence.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Code,
}

pub type MarkSet = BTreeSet<Mark>;

const HOTKEYS: [(&str, Mark); 5] = [
    ("mod+b", Mark::Bold),
    ("mod+i", Mark::Italic),
    ("mod+u", Mark::Underline),
    ("mod+`", Mark::Code),
    ("mod+shift+s", Mark::Strikethrough),
];

impl Mark {
    pub fn from_hotkey(hotkey: &str) -> Option<Self> {
        HOTKEYS
            .iter()
            .find(|(combo, _)| combo.eq_ignore_ascii_case(hotkey))
            .map(|(_, mark)| *mark)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LeafRepr", into = "LeafRepr")]
pub struct Leaf {
    pub text: String,
    pub marks: MarkSet,
}

/// Wire shape of a leaf: `{ "text": "..", "bold": true }`.
#[derive(Serialize, Deserialize)]
struct LeafRepr {
    text: String,
    #[serde(default, skip_serializing_if = "is_false")]
    bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    underline: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    strikethrough: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    code: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl From<LeafRepr> for Leaf {
    fn from(repr: LeafRepr) -> Self {
        let flags = [
            (repr.bold, Mark::Bold),
            (repr.italic, Mark::Italic),
            (repr.underline, Mark::Underline),
            (repr.strikethrough, Mark::Strikethrough),
            (repr.code, Mark::Code),
        ];
        Self {
            text: repr.text,
            marks: flags
                .into_iter()
                .filter(|(set, _)| *set)
                .map(|(_, mark)| mark)
                .collect(),
        }
    }
}

impl From<Leaf> for LeafRepr {
    fn from(leaf: Leaf) -> Self {
        Self {
            bold: leaf.marks.contains(&Mark::Bold),
            italic: leaf.marks.contains(&Mark::Italic),
            underline: leaf.marks.contains(&Mark::Underline),
            strikethrough: leaf.marks.contains(&Mark::Strikethrough),
            code: leaf.marks.contains(&Mark::Code),
            text: leaf.text,
        }
    }
}

impl Leaf {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: MarkSet::new(),
        }
    }

    pub fn with_marks(text: impl Into<String>, marks: impl IntoIterator<Item = Mark>) -> Self {
        Self {
            text: text.into(),
            marks: marks.into_iter().collect(),
        }
    }

    pub fn has_mark(&self, mark: Mark) -> bool {
        self.marks.contains(&mark)
    }

    /// Length in grapheme clusters.
    pub fn len(&self) -> usize {
        grapheme_len(&self.text)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Inserts `text` at a grapheme offset and returns the caret offset just
    /// past the inserted text.
    pub fn insert(&mut self, offset: usize, text: &str) -> Option<usize> {
        let byte_offset = grapheme_offset_to_byte(&self.text, offset)?;
        self.text.insert_str(byte_offset, text);
        Some(grapheme_len(&self.text[..byte_offset + text.len()]))
    }

    /// Removes the graphemes in `start..end` and returns them.
    pub fn remove(&mut self, start: usize, end: usize) -> Option<String> {
        if start > end {
            return None;
        }
        let start_byte = grapheme_offset_to_byte(&self.text, start)?;
        let end_byte = grapheme_offset_to_byte(&self.text, end)?;
        Some(self.text.drain(start_byte..end_byte).collect())
    }

    /// Splits the leaf at a grapheme offset, keeping the head and returning
    /// the tail with the same marks.
    pub fn split_off(&mut self, offset: usize) -> Option<Leaf> {
        let byte_offset = grapheme_offset_to_byte(&self.text, offset)?;
        Some(Leaf {
            text: self.text.split_off(byte_offset),
            marks: self.marks.clone(),
        })
    }

    /// Text in the grapheme range `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> Option<&str> {
        if start > end {
            return None;
        }
        let start_byte = grapheme_offset_to_byte(&self.text, start)?;
        let end_byte = grapheme_offset_to_byte(&self.text, end)?;
        Some(&self.text[start_byte..end_byte])
    }
}

pub fn grapheme_len(text: &str) -> usize {
    text.graphemes(true).count()
}

pub fn grapheme_offset_to_byte(text: &str, grapheme_offset: usize) -> Option<usize> {
    if grapheme_offset == 0 {
        return Some(0);
    }

    let mut count = 0;
    for (byte_index, _) in text.grapheme_indices(true) {
        if count == grapheme_offset {
            return Some(byte_index);
        }
        count += 1;
    }
    if count == grapheme_offset {
        Some(text.len())
    } else {
        None
    }
}
