//! Debounced autosave and explicit publishing.
//!
//! [`Autosave`] is a timer driven state machine. The caller feeds it edits
//! and the current time, sends the [`SaveRequest`]s it hands out to a
//! [`ContentBackend`], and reports each result back. Time is passed in as
//! [`Instant`] values so the machine never reads a clock itself.
//!
//! ```text
//! Clean --edit--> Dirty --debounce--> Saving --ack--> Clean
//!                   ^                    |
//!                   +--edit or failure---+
//! Clean/Dirty --publish--> Publishing --ok--> Clean
//!                              |
//!                              +--failure--> previous state
//! Clean/Dirty --restore--> Restoring --ok--> Clean (draft replaced)
//!                              |
//!                              +--failure--> previous state
//! ```
//!
//! Every request carries a sequence number. Saves are last writer wins at
//! the backend, but only the acknowledgement of the newest save can mark the
//! session clean.

use crate::config::EditorConfig;
use crate::doc::Document;
use crate::versions::{Version, VersionHistory};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

mod memory;

pub use memory::MemoryBackend;

pub const DEFAULT_SECTION: &str = "main";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SaveState {
    Clean,
    Dirty,
    Saving,
    Publishing,
    Restoring,
}

impl fmt::Display for SaveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SaveState::Clean => "clean",
            SaveState::Dirty => "dirty",
            SaveState::Saving => "saving",
            SaveState::Publishing => "publishing",
            SaveState::Restoring => "restoring",
        };
        f.write_str(name)
    }
}

/// Identifies the content a session edits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentKey {
    pub site_id: String,
    pub entry_id: String,
    pub section_id: String,
}

impl ContentKey {
    pub fn new(site_id: impl Into<String>, entry_id: impl Into<String>, section_id: impl Into<String>) -> Self {
        Self {
            site_id: site_id.into(),
            entry_id: entry_id.into(),
            section_id: section_id.into(),
        }
    }

    /// Key for the main section of an entry.
    pub fn main(site_id: impl Into<String>, entry_id: impl Into<String>) -> Self {
        Self::new(site_id, entry_id, DEFAULT_SECTION)
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.site_id, self.entry_id, self.section_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Intent {
    UpdateContent,
    Publish,
    /// Makes an earlier version the draft again.
    VersionUpdate,
}

/// Body of a content request. A publish carries content only when it also
/// has to save edits that were still pending. `content` travels as a JSON
/// string holding the serialized document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
    #[serde(default, skip_serializing_if = "Option::is_none", with = "stringified")]
    pub content: Option<Document>,
    pub intent: Intent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
}

mod stringified {
    use crate::doc::Document;
    use serde::de::Error as _;
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(content: &Option<Document>, serializer: S) -> Result<S::Ok, S::Error> {
        match content {
            Some(document) => {
                let json = document.to_json().map_err(S::Error::custom)?;
                serializer.serialize_some(&json)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Document>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|json| Document::from_json(&json).map_err(D::Error::custom))
            .transpose()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub seq: u64,
    pub key: ContentKey,
    pub body: RequestBody,
}

impl SaveRequest {
    pub fn intent(&self) -> Intent {
        self.body.intent
    }
}

/// Transient messages for the user, shown as toasts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Saved,
    SaveFailed(String),
    Published { version_id: String },
    PublishFailed(String),
    Restored { version_id: String },
    RestoreFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("no content stored for {0}")]
    NotFound(ContentKey),
    #[error("no version `{0}`")]
    VersionNotFound(String),
    #[error("request rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AutosaveError {
    #[error("a publish is already in progress")]
    PublishInProgress,
    #[error("a version restore is already in progress")]
    RestoreInProgress,
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// The content endpoint a session saves to.
pub trait ContentBackend {
    /// Replaces the draft content.
    fn update_content(&mut self, key: &ContentKey, content: &Document) -> Result<(), BackendError>;

    /// Promotes the saved draft to a new version.
    fn publish(&mut self, key: &ContentKey) -> Result<Version, BackendError>;

    /// Replaces the draft with the content of version `id` and returns it.
    fn restore_version(&mut self, key: &ContentKey, id: &str) -> Result<Document, BackendError>;

    fn draft(&self, key: &ContentKey) -> Result<Option<Document>, BackendError>;

    /// Versions of `key`, newest first.
    fn versions(&self, key: &ContentKey) -> Result<Vec<Version>, BackendError>;
}

/// What a backend returned for a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Saved,
    Published(Version),
    Restored(Document),
}

/// Sends `request` to `backend`.
pub fn send(backend: &mut dyn ContentBackend, request: &SaveRequest) -> Result<Response, BackendError> {
    if let Some(content) = &request.body.content {
        backend.update_content(&request.key, content)?;
    }
    match request.body.intent {
        Intent::UpdateContent => Ok(Response::Saved),
        Intent::Publish => backend.publish(&request.key).map(Response::Published),
        Intent::VersionUpdate => {
            let id = request
                .body
                .version_id
                .as_deref()
                .ok_or_else(|| BackendError::Rejected("missing version id".to_string()))?;
            backend.restore_version(&request.key, id).map(Response::Restored)
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingPublish {
    seq: u64,
    carried_content: bool,
}

#[derive(Debug, Clone)]
struct PendingRestore {
    seq: u64,
    version_id: String,
}

#[derive(Debug)]
pub struct Autosave {
    key: ContentKey,
    debounce: Duration,
    draft: Document,
    history: VersionHistory,
    /// Edits not yet handed out in a request.
    dirty: bool,
    deadline: Option<Instant>,
    last_seq: u64,
    /// Newest save request still awaiting its result.
    in_flight: Option<u64>,
    publishing: Option<PendingPublish>,
    restoring: Option<PendingRestore>,
    notifications: Vec<Notification>,
}

impl Autosave {
    pub fn new(key: ContentKey, draft: Document, config: &EditorConfig) -> Self {
        Self {
            key,
            debounce: config.debounce(),
            draft,
            history: VersionHistory::new(config.max_versions),
            dirty: false,
            deadline: None,
            last_seq: 0,
            in_flight: None,
            publishing: None,
            restoring: None,
            notifications: Vec::new(),
        }
    }

    pub fn with_history(mut self, versions: Vec<Version>) -> Self {
        self.history = VersionHistory::from_versions(versions, self.history.max_versions());
        self
    }

    pub fn key(&self) -> &ContentKey {
        &self.key
    }

    pub fn draft(&self) -> &Document {
        &self.draft
    }

    pub fn history(&self) -> &VersionHistory {
        &self.history
    }

    pub fn state(&self) -> SaveState {
        if self.publishing.is_some() {
            SaveState::Publishing
        } else if self.restoring.is_some() {
            SaveState::Restoring
        } else if self.dirty {
            SaveState::Dirty
        } else if self.in_flight.is_some() {
            SaveState::Saving
        } else {
            SaveState::Clean
        }
    }

    /// Records new content and restarts the debounce window. Content equal
    /// to the current draft is not an edit.
    pub fn edit(&mut self, content: Document, now: Instant) {
        if content == self.draft {
            return;
        }
        self.draft = content;
        self.dirty = true;
        self.deadline = Some(now + self.debounce);
    }

    /// When the pending save is due, if one is pending.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.publishing.is_some() || self.restoring.is_some() {
            return None;
        }
        self.deadline
    }

    /// Issues the pending save once its debounce window has passed.
    pub fn poll(&mut self, now: Instant) -> Option<SaveRequest> {
        let deadline = self.next_deadline()?;
        if !self.dirty || now < deadline {
            return None;
        }
        let seq = self.next_seq();
        self.dirty = false;
        self.deadline = None;
        self.in_flight = Some(seq);
        debug!(key = %self.key, seq, "issuing save");
        Some(SaveRequest {
            seq,
            key: self.key.clone(),
            body: RequestBody {
                content: Some(self.draft.clone()),
                intent: Intent::UpdateContent,
                version_id: None,
            },
        })
    }

    pub fn complete_save(&mut self, seq: u64, result: Result<(), BackendError>, now: Instant) {
        if self.in_flight != Some(seq) {
            warn!(key = %self.key, seq, newest = ?self.in_flight, "ignoring stale save result");
            return;
        }
        self.in_flight = None;
        match result {
            Ok(()) => {
                info!(key = %self.key, seq, state = %self.state(), "saved");
                self.notifications.push(Notification::Saved);
            }
            Err(err) => {
                warn!(key = %self.key, seq, %err, "save failed");
                self.dirty = true;
                self.deadline = Some(now + self.debounce);
                self.notifications.push(Notification::SaveFailed(err.to_string()));
            }
        }
    }

    /// Starts a publish. Edits still waiting for their debounce travel with
    /// the publish request.
    pub fn begin_publish(&mut self) -> Result<SaveRequest, AutosaveError> {
        self.ensure_idle()?;
        let seq = self.next_seq();
        let carried_content = self.dirty;
        let content = carried_content.then(|| self.draft.clone());
        self.dirty = false;
        self.deadline = None;
        self.publishing = Some(PendingPublish { seq, carried_content });
        debug!(key = %self.key, seq, carried_content, "issuing publish");
        Ok(SaveRequest {
            seq,
            key: self.key.clone(),
            body: RequestBody {
                content,
                intent: Intent::Publish,
                version_id: None,
            },
        })
    }

    pub fn complete_publish(&mut self, seq: u64, result: Result<Version, BackendError>, now: Instant) {
        let Some(pending) = self.publishing.filter(|pending| pending.seq == seq) else {
            warn!(key = %self.key, seq, "ignoring stale publish result");
            return;
        };
        self.publishing = None;
        match result {
            Ok(version) => {
                info!(key = %self.key, seq, version = %version.id, "published");
                self.notifications.push(Notification::Published {
                    version_id: version.id.clone(),
                });
                self.history.push(version);
            }
            Err(err) => {
                warn!(key = %self.key, seq, %err, "publish failed");
                if pending.carried_content {
                    self.dirty = true;
                }
                if self.dirty {
                    self.deadline = Some(now + self.debounce);
                }
                self.notifications.push(Notification::PublishFailed(err.to_string()));
            }
        }
    }

    /// Starts restoring version `version_id`. Pending edits are kept until
    /// the restore succeeds, when the restored content replaces them.
    pub fn begin_restore(&mut self, version_id: impl Into<String>) -> Result<SaveRequest, AutosaveError> {
        self.ensure_idle()?;
        let seq = self.next_seq();
        let version_id = version_id.into();
        self.restoring = Some(PendingRestore {
            seq,
            version_id: version_id.clone(),
        });
        debug!(key = %self.key, seq, version = %version_id, "issuing restore");
        Ok(SaveRequest {
            seq,
            key: self.key.clone(),
            body: RequestBody {
                content: None,
                intent: Intent::VersionUpdate,
                version_id: Some(version_id),
            },
        })
    }

    pub fn complete_restore(&mut self, seq: u64, result: Result<Document, BackendError>, now: Instant) {
        let Some(pending) = self.restoring.take_if(|pending| pending.seq == seq) else {
            warn!(key = %self.key, seq, "ignoring stale restore result");
            return;
        };
        match result {
            Ok(content) => {
                info!(key = %self.key, seq, version = %pending.version_id, "restored version");
                self.draft = content;
                self.dirty = false;
                self.deadline = None;
                self.notifications.push(Notification::Restored {
                    version_id: pending.version_id,
                });
            }
            Err(err) => {
                warn!(key = %self.key, seq, %err, "restore failed");
                if self.dirty {
                    self.deadline = Some(now + self.debounce);
                }
                self.notifications.push(Notification::RestoreFailed(err.to_string()));
            }
        }
    }

    /// Routes a backend response to the matching `complete_*` method.
    pub fn complete(&mut self, request: &SaveRequest, result: Result<Response, BackendError>, now: Instant) {
        let seq = request.seq;
        match (request.intent(), result) {
            (Intent::UpdateContent, result) => self.complete_save(seq, result.map(|_| ()), now),
            (Intent::Publish, Ok(Response::Published(version))) => self.complete_publish(seq, Ok(version), now),
            (Intent::Publish, Ok(_)) => self.complete_publish(
                seq,
                Err(BackendError::Rejected("publish returned no version".to_string())),
                now,
            ),
            (Intent::Publish, Err(err)) => self.complete_publish(seq, Err(err), now),
            (Intent::VersionUpdate, Ok(Response::Restored(content))) => self.complete_restore(seq, Ok(content), now),
            (Intent::VersionUpdate, Ok(_)) => self.complete_restore(
                seq,
                Err(BackendError::Rejected("restore returned no content".to_string())),
                now,
            ),
            (Intent::VersionUpdate, Err(err)) => self.complete_restore(seq, Err(err), now),
        }
    }

    /// Whether the draft differs from the live version.
    pub fn has_unpublished_changes(&self) -> bool {
        self.history.has_changed(&self.draft)
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    fn ensure_idle(&self) -> Result<(), AutosaveError> {
        if self.publishing.is_some() {
            return Err(AutosaveError::PublishInProgress);
        }
        if self.restoring.is_some() {
            return Err(AutosaveError::RestoreInProgress);
        }
        Ok(())
    }

    fn next_seq(&mut self) -> u64 {
        self.last_seq += 1;
        self.last_seq
    }
}
