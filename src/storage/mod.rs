//! File-backed content store.
//!
//! Each section lives in its own directory:
//!
//! ```text
//! <root>/<site>/<entry>/<section>/
//!     draft.json      serialized draft document
//!     versions.json   published versions, newest first
//!     meta.json       lengths and crc32 checksums of the two files above
//! ```
//!
//! Payload files are written to a temporary file and renamed into place;
//! `meta.json` is written last, so a crash between the two is detected as a
//! checksum mismatch on the next read.

use crate::autosave::{BackendError, ContentBackend, ContentKey};
use crate::doc::Document;
use crate::versions::{DEFAULT_MAX_VERSIONS, Version, VersionHistory};
use chrono::Utc;
use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

const DRAFT_FILE: &str = "draft.json";
const VERSIONS_FILE: &str = "versions.json";
const META_FILE: &str = "meta.json";
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
struct Checksum {
    len: u64,
    crc32: u32,
}

impl Checksum {
    fn of(bytes: &[u8]) -> Self {
        Self {
            len: bytes.len() as u64,
            crc32: checksum_bytes(bytes),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Meta {
    version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    draft: Option<Checksum>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    versions: Option<Checksum>,
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            draft: None,
            versions: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("corrupt storage: {0}")]
    Corrupt(&'static str),
    #[error("missing storage")]
    Missing,
    #[error("unknown version `{0}`")]
    UnknownVersion(String),
    #[error("invalid key component `{0}`")]
    InvalidKey(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<StorageError> for BackendError {
    fn from(err: StorageError) -> Self {
        BackendError::Unavailable(err.to_string())
    }
}

#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    max_versions: usize,
}

impl FileStore {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            max_versions: DEFAULT_MAX_VERSIONS,
        })
    }

    pub fn with_max_versions(mut self, max_versions: usize) -> Self {
        self.max_versions = max_versions.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn write_draft(&self, key: &ContentKey, content: &Document) -> Result<(), StorageError> {
        let dir = self.section_dir(key)?;
        fs::create_dir_all(&dir)?;
        let payload = serde_json::to_vec_pretty(content)?;
        let mut meta = match self.read_meta(&dir) {
            Ok(meta) => meta,
            Err(StorageError::Missing) => Meta::default(),
            Err(err) => return Err(err),
        };
        write_atomic(&dir, DRAFT_FILE, &payload)?;
        meta.draft = Some(Checksum::of(&payload));
        self.write_meta(&dir, &meta)?;
        debug!(%key, bytes = payload.len(), "wrote draft");
        Ok(())
    }

    pub fn read_draft(&self, key: &ContentKey) -> Result<Document, StorageError> {
        let dir = self.section_dir(key)?;
        let meta = self.read_meta(&dir)?;
        let expected = meta.draft.ok_or(StorageError::Missing)?;
        let bytes = read_checked(&dir.join(DRAFT_FILE), expected)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Published versions, newest first. A section never published has none.
    pub fn read_versions(&self, key: &ContentKey) -> Result<Vec<Version>, StorageError> {
        let dir = self.section_dir(key)?;
        let meta = match self.read_meta(&dir) {
            Ok(meta) => meta,
            Err(StorageError::Missing) => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        let Some(expected) = meta.versions else {
            return Ok(Vec::new());
        };
        let bytes = read_checked(&dir.join(VERSIONS_FILE), expected)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Promotes the stored draft to a new version, pruning the oldest
    /// versions beyond the cap.
    pub fn publish_draft(&self, key: &ContentKey) -> Result<Version, StorageError> {
        let draft = self.read_draft(key)?;
        let mut history = VersionHistory::from_versions(self.read_versions(key)?, self.max_versions);
        let version = Version::new(draft, Utc::now());
        let pruned = history.push(version.clone());
        if !pruned.is_empty() {
            debug!(%key, pruned = pruned.len(), "pruned old versions");
        }

        let dir = self.section_dir(key)?;
        let versions: Vec<&Version> = history.iter().collect();
        let payload = serde_json::to_vec_pretty(&versions)?;
        write_atomic(&dir, VERSIONS_FILE, &payload)?;

        let mut meta = self.read_meta(&dir)?;
        meta.versions = Some(Checksum::of(&payload));
        self.write_meta(&dir, &meta)?;
        Ok(version)
    }

    /// Makes the content of version `id` the draft again. The version list
    /// is left as it is.
    pub fn restore_version(&self, key: &ContentKey, id: &str) -> Result<Document, StorageError> {
        let content = self
            .read_versions(key)?
            .into_iter()
            .find(|version| version.id == id)
            .map(|version| version.content)
            .ok_or_else(|| StorageError::UnknownVersion(id.to_string()))?;
        self.write_draft(key, &content)?;
        debug!(%key, version = id, "restored version");
        Ok(content)
    }

    /// Every section with stored content, sorted.
    pub fn entries(&self) -> Result<Vec<ContentKey>, StorageError> {
        let mut keys = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(4).max_depth(4) {
            let entry = entry.map_err(|err| {
                let message = err.to_string();
                err.into_io_error()
                    .unwrap_or_else(|| io::Error::other(message))
            })?;
            if entry.file_name() != META_FILE {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let parts: Vec<String> = relative
                .iter()
                .take(3)
                .map(|part| part.to_string_lossy().into_owned())
                .collect();
            if let [site, entry_id, section] = parts.as_slice() {
                keys.push(ContentKey::new(site, entry_id, section));
            }
        }
        keys.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
        Ok(keys)
    }

    fn section_dir(&self, key: &ContentKey) -> Result<PathBuf, StorageError> {
        let mut dir = self.root.clone();
        for part in [&key.site_id, &key.entry_id, &key.section_id] {
            validate_component(part)?;
            dir.push(part);
        }
        Ok(dir)
    }

    fn read_meta(&self, dir: &Path) -> Result<Meta, StorageError> {
        let bytes = match fs::read(dir.join(META_FILE)) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Err(StorageError::Missing),
            Err(err) => return Err(StorageError::Io(err)),
        };
        let meta: Meta = serde_json::from_slice(&bytes).map_err(|_| StorageError::Corrupt("meta"))?;
        if meta.version != FORMAT_VERSION {
            return Err(StorageError::Corrupt("version"));
        }
        Ok(meta)
    }

    fn write_meta(&self, dir: &Path, meta: &Meta) -> Result<(), StorageError> {
        let payload = serde_json::to_vec_pretty(meta)?;
        write_atomic(dir, META_FILE, &payload)
    }
}

impl ContentBackend for FileStore {
    fn update_content(&mut self, key: &ContentKey, content: &Document) -> Result<(), BackendError> {
        Ok(self.write_draft(key, content)?)
    }

    fn publish(&mut self, key: &ContentKey) -> Result<Version, BackendError> {
        match self.publish_draft(key) {
            Ok(version) => Ok(version),
            Err(StorageError::Missing) => Err(BackendError::NotFound(key.clone())),
            Err(err) => {
                warn!(%key, %err, "publish failed");
                Err(err.into())
            }
        }
    }

    fn restore_version(&mut self, key: &ContentKey, id: &str) -> Result<Document, BackendError> {
        match FileStore::restore_version(self, key, id) {
            Ok(content) => Ok(content),
            Err(StorageError::UnknownVersion(id)) => Err(BackendError::VersionNotFound(id)),
            Err(err) => {
                warn!(%key, %err, "restore failed");
                Err(err.into())
            }
        }
    }

    fn draft(&self, key: &ContentKey) -> Result<Option<Document>, BackendError> {
        match self.read_draft(key) {
            Ok(document) => Ok(Some(document)),
            Err(StorageError::Missing) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn versions(&self, key: &ContentKey) -> Result<Vec<Version>, BackendError> {
        Ok(self.read_versions(key)?)
    }
}

fn validate_component(part: &str) -> Result<(), StorageError> {
    let valid = !part.is_empty()
        && !part.starts_with('.')
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(part.to_string()))
    }
}

fn write_atomic(dir: &Path, name: &str, payload: &[u8]) -> Result<(), StorageError> {
    let temp_path = dir.join(format!("{name}.tmp"));
    fs::write(&temp_path, payload)?;
    fs::rename(&temp_path, dir.join(name))?;
    Ok(())
}

fn read_checked(path: &Path, expected: Checksum) -> Result<Vec<u8>, StorageError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Err(StorageError::Corrupt("missing payload")),
        Err(err) => return Err(StorageError::Io(err)),
    };
    if bytes.len() as u64 != expected.len {
        return Err(StorageError::Corrupt("length mismatch"));
    }
    if checksum_bytes(&bytes) != expected.crc32 {
        return Err(StorageError::Corrupt("checksum mismatch"));
    }
    Ok(bytes)
}

fn checksum_bytes(bytes: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Element, Node};
    use tempfile::tempdir;

    fn doc(text: &str) -> Document {
        Document::from_nodes(vec![Node::Element(Element::paragraph(text).with_id("p1"))])
    }

    fn key() -> ContentKey {
        ContentKey::main("wiki", "entry-1")
    }

    #[test]
    fn test_draft_round_trip() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.write_draft(&key(), &doc("hello")).unwrap();
        assert_eq!(store.read_draft(&key()).unwrap(), doc("hello"));
    }

    #[test]
    fn test_missing_draft() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        match store.read_draft(&key()).unwrap_err() {
            StorageError::Missing => {}
            other => panic!("Expected Missing error, got {other:?}"),
        }
        assert!(store.read_versions(&key()).unwrap().is_empty());
    }

    #[test]
    fn test_corruption_detection() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.write_draft(&key(), &doc("hello")).unwrap();

        let draft_path = dir.path().join("wiki/entry-1/main").join(DRAFT_FILE);
        let mut bytes = fs::read(&draft_path).unwrap();
        let last = bytes.len() - 3;
        bytes[last] ^= 0x01;
        fs::write(&draft_path, &bytes).unwrap();

        match store.read_draft(&key()).unwrap_err() {
            StorageError::Corrupt(msg) => assert_eq!(msg, "checksum mismatch"),
            other => panic!("Expected corruption error, got {other:?}"),
        }
    }

    #[test]
    fn test_length_mismatch() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.write_draft(&key(), &doc("hello")).unwrap();
        fs::write(dir.path().join("wiki/entry-1/main").join(DRAFT_FILE), b"[]").unwrap();

        match store.read_draft(&key()).unwrap_err() {
            StorageError::Corrupt(msg) => assert_eq!(msg, "length mismatch"),
            other => panic!("Expected length mismatch error, got {other:?}"),
        }
    }

    #[test]
    fn test_version_mismatch() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.write_draft(&key(), &doc("hello")).unwrap();
        fs::write(
            dir.path().join("wiki/entry-1/main").join(META_FILE),
            br#"{"version": 2}"#,
        )
        .unwrap();

        match store.read_draft(&key()).unwrap_err() {
            StorageError::Corrupt(msg) => assert_eq!(msg, "version"),
            other => panic!("Expected version corruption error, got {other:?}"),
        }
    }

    #[test]
    fn test_publish_prunes_to_cap() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap().with_max_versions(2);
        for text in ["a", "b", "c"] {
            store.write_draft(&key(), &doc(text)).unwrap();
            store.publish_draft(&key()).unwrap();
        }
        let versions = store.read_versions(&key()).unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].content, doc("c"));
    }

    #[test]
    fn test_publish_without_draft_is_not_found() {
        let dir = tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.publish(&key()), Err(BackendError::NotFound(key())));
        assert_eq!(store.draft(&key()), Ok(None));
    }

    #[test]
    fn test_corrupt_meta_blocks_draft_writes() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.write_draft(&key(), &doc("v1")).unwrap();
        store.publish_draft(&key()).unwrap();
        let section = dir.path().join("wiki/entry-1/main");
        let versions_before = fs::read(section.join(VERSIONS_FILE)).unwrap();
        let draft_before = fs::read(section.join(DRAFT_FILE)).unwrap();
        fs::write(section.join(META_FILE), b"{garbage").unwrap();

        match store.write_draft(&key(), &doc("v2")).unwrap_err() {
            StorageError::Corrupt(msg) => assert_eq!(msg, "meta"),
            other => panic!("Expected meta corruption error, got {other:?}"),
        }
        assert_eq!(fs::read(section.join(DRAFT_FILE)).unwrap(), draft_before);
        assert_eq!(fs::read(section.join(VERSIONS_FILE)).unwrap(), versions_before);
        assert_eq!(fs::read(section.join(META_FILE)).unwrap(), b"{garbage");

        // Once the meta file is repaired the published version is readable again.
        let repaired = Meta {
            version: FORMAT_VERSION,
            draft: Some(Checksum::of(&draft_before)),
            versions: Some(Checksum::of(&versions_before)),
        };
        fs::write(section.join(META_FILE), serde_json::to_vec(&repaired).unwrap()).unwrap();
        let versions = store.read_versions(&key()).unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].content, doc("v1"));
    }

    #[test]
    fn test_restore_version_replaces_draft() {
        let dir = tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        store.write_draft(&key(), &doc("first")).unwrap();
        let first = store.publish_draft(&key()).unwrap();
        store.write_draft(&key(), &doc("second")).unwrap();
        store.publish_draft(&key()).unwrap();

        let restored = store.restore_version(&key(), &first.id).unwrap();
        assert_eq!(restored, doc("first"));
        assert_eq!(store.read_draft(&key()).unwrap(), doc("first"));
        assert_eq!(store.read_versions(&key()).unwrap().len(), 2);

        assert_eq!(
            ContentBackend::restore_version(&mut store, &key(), "nope"),
            Err(BackendError::VersionNotFound("nope".into()))
        );
        assert_eq!(store.read_draft(&key()).unwrap(), doc("first"));
    }

    #[test]
    fn test_rejects_path_traversal() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let bad = ContentKey::main("..", "x");
        assert!(matches!(
            store.write_draft(&bad, &doc("x")),
            Err(StorageError::InvalidKey(_))
        ));
        let bad = ContentKey::main("site", "a/b");
        assert!(matches!(
            store.write_draft(&bad, &doc("x")),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_entries_lists_sections() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.write_draft(&ContentKey::main("wiki", "b"), &doc("x")).unwrap();
        store.write_draft(&ContentKey::new("wiki", "a", "sidebar"), &doc("y")).unwrap();
        assert_eq!(
            store.entries().unwrap(),
            [ContentKey::new("wiki", "a", "sidebar"), ContentKey::main("wiki", "b")]
        );
    }
}
