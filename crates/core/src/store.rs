//! On-disk stub store, one per project.
//!
//! `<index_dir>/<xxh3(root)>.stubs` holds every indexed file's stubs keyed by
//! path, with the content hash they were built from. The file is
//! MessagePack, zstd-compressed, and versioned; anything unreadable is
//! discarded and the project is reindexed.

use crate::error::{Result, SmaliscopeError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smaliscope_smali::{ClassStub, StubCodec};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use xxhash_rust::xxh3::xxh3_64;

pub const STORE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredFile {
    pub content_hash: u64,
    /// `StubCodec` encoding of the file's class stubs.
    pub stubs: Vec<u8>,
}

impl StoredFile {
    pub fn new(content_hash: u64, stubs: &[ClassStub]) -> Result<Self> {
        Ok(Self {
            content_hash,
            stubs: StubCodec::encode(stubs)?,
        })
    }

    pub fn decode(&self) -> Result<Vec<ClassStub>> {
        Ok(StubCodec::decode(&self.stubs)?)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreFile {
    pub version: u32,
    pub root: String,
    pub files: IndexMap<PathBuf, StoredFile>,
}

#[derive(Debug, Clone)]
pub struct StubStore {
    path: PathBuf,
}

impl StubStore {
    pub fn for_project(index_dir: &Path, project_root: &Path) -> Self {
        let hash = xxh3_64(project_root.to_string_lossy().as_bytes());
        Self {
            path: index_dir.join(format!("{:016x}.stubs", hash)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the store. Missing, corrupt or outdated stores yield `None`.
    pub fn load(&self) -> Result<Option<StoreFile>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&self.path)?;
        match Self::decode(&bytes) {
            Ok(store) if store.version == STORE_VERSION => {
                info!("Loaded stub store from {}", self.path.display());
                Ok(Some(store))
            }
            Ok(store) => {
                warn!(
                    "Stub store version mismatch at {} (found {}, expected {}). Will rebuild.",
                    self.path.display(),
                    store.version,
                    STORE_VERSION
                );
                let _ = std::fs::remove_file(&self.path);
                Ok(None)
            }
            Err(e) => {
                warn!(
                    "Failed to read stub store at {}: {}. Will rebuild.",
                    self.path.display(),
                    e
                );
                let _ = std::fs::remove_file(&self.path);
                Ok(None)
            }
        }
    }

    /// Write atomically: temp file, then rename.
    pub fn save(&self, store: &StoreFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = Self::encode(store)?;
        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, bytes)?;
        std::fs::rename(temp_path, &self.path)?;
        info!("Saved stub store to {}", self.path.display());
        Ok(())
    }

    pub fn clear(&self) -> Result<bool> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
            return Ok(true);
        }
        Ok(false)
    }

    fn encode(store: &StoreFile) -> Result<Vec<u8>> {
        let bytes = rmp_serde::to_vec(store)
            .map_err(|e| SmaliscopeError::Internal(format!("MSGPACK error: {}", e)))?;
        zstd::encode_all(&bytes[..], 0)
            .map_err(|e| SmaliscopeError::Internal(format!("Zstd compression failed: {}", e)))
    }

    fn decode(bytes: &[u8]) -> Result<StoreFile> {
        let decompressed = zstd::decode_all(bytes)
            .map_err(|e| SmaliscopeError::Internal(format!("Zstd decompression failed: {}", e)))?;
        rmp_serde::from_slice(&decompressed)
            .map_err(|e| SmaliscopeError::Internal(format!("MSGPACK error: {}", e)))
    }
}
