use ignore::WalkBuilder;
use rayon::prelude::*;
use smaliscope_smali::SMALI_EXTENSION;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use xxhash_rust::xxh3::xxh3_64;

/// Whether a path is a smali unit the engine indexes.
pub fn is_relevant_path(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == SMALI_EXTENSION)
}

pub fn content_hash(content: &[u8]) -> u64 {
    xxh3_64(content)
}

/// File content as text. Invalid UTF-8 sequences become U+FFFD.
pub fn decode_content(path: &Path, bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap_or_else(|err| {
        warn!("{} is not valid UTF-8; reading it lossily", path.display());
        String::from_utf8_lossy(err.as_bytes()).into_owned()
    })
}

/// A file read from disk, ready to parse.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub content: String,
    pub content_hash: u64,
}

pub struct Scanner;

impl Scanner {
    /// Relevant files under `root`, honoring ignore files, in sorted order.
    pub fn collect_paths(root: &Path) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = WalkBuilder::new(root)
            .build()
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let path = entry.path();
                if path.is_file() && is_relevant_path(path) {
                    return Some(path.to_path_buf());
                }
                None
            })
            .collect();
        paths.sort();
        paths
    }

    /// Read and hash `paths` in parallel. Unreadable files are logged and
    /// skipped; output keeps input order.
    pub fn read_files(paths: &[PathBuf]) -> Vec<ScannedFile> {
        paths
            .par_iter()
            .filter_map(|path| match fs::read(path) {
                Ok(bytes) => {
                    let content_hash = content_hash(&bytes);
                    Some(ScannedFile {
                        path: path.clone(),
                        content: decode_content(path, bytes),
                        content_hash,
                    })
                }
                Err(err) => {
                    warn!("Skipping {}: {}", path.display(), err);
                    None
                }
            })
            .collect()
    }
}
