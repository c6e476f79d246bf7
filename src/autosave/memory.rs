use super::{BackendError, ContentBackend, ContentKey};
use crate::doc::Document;
use crate::versions::{DEFAULT_MAX_VERSIONS, Version, VersionHistory};
use chrono::Utc;
use std::collections::{HashMap, VecDeque};

#[derive(Debug)]
struct Section {
    draft: Option<Document>,
    history: VersionHistory,
}

/// In-process backend. Failures can be queued to exercise retry paths.
#[derive(Debug)]
pub struct MemoryBackend {
    sections: HashMap<ContentKey, Section>,
    max_versions: usize,
    failures: VecDeque<BackendError>,
    requests: usize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_VERSIONS)
    }
}

impl MemoryBackend {
    pub fn new(max_versions: usize) -> Self {
        Self {
            sections: HashMap::new(),
            max_versions,
            failures: VecDeque::new(),
            requests: 0,
        }
    }

    /// Makes the next request fail with `err`.
    pub fn fail_next(&mut self, err: BackendError) {
        self.failures.push_back(err);
    }

    /// Number of write requests received, failed ones included.
    pub fn requests(&self) -> usize {
        self.requests
    }

    fn begin_write(&mut self) -> Result<(), BackendError> {
        self.requests += 1;
        match self.failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn section_mut(&mut self, key: &ContentKey) -> &mut Section {
        let max_versions = self.max_versions;
        self.sections.entry(key.clone()).or_insert_with(|| Section {
            draft: None,
            history: VersionHistory::new(max_versions),
        })
    }
}

impl ContentBackend for MemoryBackend {
    fn update_content(&mut self, key: &ContentKey, content: &Document) -> Result<(), BackendError> {
        self.begin_write()?;
        self.section_mut(key).draft = Some(content.clone());
        Ok(())
    }

    fn publish(&mut self, key: &ContentKey) -> Result<Version, BackendError> {
        self.begin_write()?;
        let section = self.section_mut(key);
        let Some(draft) = section.draft.clone() else {
            return Err(BackendError::NotFound(key.clone()));
        };
        let version = Version::new(draft, Utc::now());
        section.history.push(version.clone());
        Ok(version)
    }

    fn restore_version(&mut self, key: &ContentKey, id: &str) -> Result<Document, BackendError> {
        self.begin_write()?;
        let section = self.section_mut(key);
        let Some(content) = section.history.get(id).map(|version| version.content.clone()) else {
            return Err(BackendError::VersionNotFound(id.to_string()));
        };
        section.draft = Some(content.clone());
        Ok(content)
    }

    fn draft(&self, key: &ContentKey) -> Result<Option<Document>, BackendError> {
        Ok(self.sections.get(key).and_then(|section| section.draft.clone()))
    }

    fn versions(&self, key: &ContentKey) -> Result<Vec<Version>, BackendError> {
        Ok(self
            .sections
            .get(key)
            .map(|section| section.history.iter().cloned().collect())
            .unwrap_or_default())
    }
}
