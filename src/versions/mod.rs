//! Published versions of a section and the "changed" indicator.

use crate::doc::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default number of versions kept per section.
pub const DEFAULT_MAX_VERSIONS: usize = 20;

/// An immutable, timestamped snapshot of published content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub id: String,
    pub content: Document,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
}

impl Version {
    pub fn new(content: Document, updated_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content,
            updated_at,
            author_id: None,
        }
    }

    pub fn with_author(mut self, author_id: impl Into<String>) -> Self {
        self.author_id = Some(author_id.into());
        self
    }
}

/// Versions of one section, newest first, bounded in length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionHistory {
    versions: Vec<Version>,
    max_versions: usize,
}

impl Default for VersionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_VERSIONS)
    }
}

impl VersionHistory {
    pub fn new(max_versions: usize) -> Self {
        Self {
            versions: Vec::new(),
            max_versions: max_versions.max(1),
        }
    }

    /// Builds a history from an externally fetched list in any order.
    pub fn from_versions(mut versions: Vec<Version>, max_versions: usize) -> Self {
        versions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        let mut history = Self::new(max_versions);
        history.versions = versions;
        history.prune();
        history
    }

    /// The live (most recently published) version.
    pub fn live(&self) -> Option<&Version> {
        self.versions.first()
    }

    pub fn get(&self, id: &str) -> Option<&Version> {
        self.versions.iter().find(|version| version.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Version> {
        self.versions.iter()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn max_versions(&self) -> usize {
        self.max_versions
    }

    /// Adds `version` in timestamp order and returns the versions pruned to
    /// stay within the cap, oldest last.
    pub fn push(&mut self, version: Version) -> Vec<Version> {
        let at = self
            .versions
            .iter()
            .position(|existing| existing.updated_at <= version.updated_at)
            .unwrap_or(self.versions.len());
        self.versions.insert(at, version);
        self.prune()
    }

    /// Whether `draft` differs from the live version. A section that was
    /// never published counts as changed.
    pub fn has_changed(&self, draft: &Document) -> bool {
        self.live().is_none_or(|live| &live.content != draft)
    }

    fn prune(&mut self) -> Vec<Version> {
        if self.versions.len() <= self.max_versions {
            return Vec::new();
        }
        self.versions.split_off(self.max_versions)
    }
}
