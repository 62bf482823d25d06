//! Artifact staging between the object store and the workspace
//!
//! The object store is a flat key→bytes map under a per-uid prefix.
//! Stage-in materializes every key under the activity's prefix into
//! `store/input/`; stage-out walks `store/output/` and publishes every
//! regular file back under the same prefix. With gzip enabled, stored
//! keys carry a `.gz` suffix and payloads are gzip streams; the tree on
//! disk is always plain.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Component, Path};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};
use tracing::debug;
use windlass_core::{ObjectStore, ObjectStoreError, Uid};

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("object store error: {0}")]
    Store(#[from] ObjectStoreError),

    /// A stored key would escape the staging tree
    #[error("unusable artifact key: {0}")]
    BadKey(String),
}

/// One published output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Stored key, relative to the uid prefix (`.gz`-suffixed in gzip mode)
    pub key: String,

    /// SHA-256 of the file content, hex encoded
    pub digest: String,

    /// Uploaded payload length in bytes
    pub len: u64,

    /// The uploaded payload
    pub bytes: Vec<u8>,
}

/// Directional artifact transfer for one gzip mode
#[derive(Debug, Clone, Copy)]
pub struct Stager {
    gzip: bool,
}

impl Stager {
    pub fn new(gzip: bool) -> Self {
        Self { gzip }
    }

    /// Materialize every object under the uid prefix into `input_dir`.
    ///
    /// Returns the number of files written. In gzip mode keys are
    /// expected to end in `.gz`; the suffix is stripped and the payload
    /// decompressed. Keys without the suffix are written verbatim.
    pub async fn stage_in(
        &self,
        store: &dyn ObjectStore,
        uid: &Uid,
        input_dir: &Path,
    ) -> Result<usize, StageError> {
        let keys = store.list_keys(uid.as_str()).await?;
        let mut staged = 0;
        for key in keys {
            let bytes = store.get(uid.as_str(), &key).await?;
            let (relative, payload) = match key.strip_suffix(".gz") {
                Some(stripped) if self.gzip => (stripped.to_string(), gunzip(&bytes)?),
                _ => (key.clone(), bytes),
            };

            let path = input_dir.join(&relative);
            if !is_contained(&relative) {
                return Err(StageError::BadKey(key));
            }
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, payload)?;
            staged += 1;
        }
        debug!(%uid, staged, "inputs staged");
        Ok(staged)
    }

    /// Publish every regular file under `output_dir` to the uid prefix.
    ///
    /// Files are discovered depth-first in name order; hidden files are
    /// included. An empty tree publishes nothing.
    pub async fn stage_out(
        &self,
        store: &dyn ObjectStore,
        uid: &Uid,
        output_dir: &Path,
    ) -> Result<Vec<Artifact>, StageError> {
        let mut files = Vec::new();
        collect_files(output_dir, "", &mut files)?;

        let mut artifacts = Vec::with_capacity(files.len());
        for (path, relative) in files {
            let content = fs::read(&path)?;
            let digest = hex::encode(Sha256::digest(&content));
            let (key, payload) = if self.gzip {
                (format!("{relative}.gz"), gzip(&content)?)
            } else {
                (relative, content)
            };
            store.put(uid.as_str(), &key, payload.clone()).await?;
            artifacts.push(Artifact {
                key,
                digest,
                len: payload.len() as u64,
                bytes: payload,
            });
        }
        debug!(%uid, published = artifacts.len(), "outputs staged");
        Ok(artifacts)
    }
}

/// Depth-first walk collecting `(path, key)` pairs in name order
fn collect_files(
    dir: &Path,
    prefix: &str,
    out: &mut Vec<(std::path::PathBuf, String)>,
) -> io::Result<()> {
    let mut entries: Vec<_> = fs::read_dir(dir)?.collect::<io::Result<_>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let key = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}/{name}")
        };
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_files(&entry.path(), &key, out)?;
        } else if file_type.is_file() {
            out.push((entry.path(), key));
        }
    }
    Ok(())
}

/// Keys must stay inside the staging tree
fn is_contained(relative: &str) -> bool {
    Path::new(relative)
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
}

fn gzip(bytes: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()
}

fn gunzip(bytes: &[u8]) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(bytes).read_to_end(&mut out)?;
    Ok(out)
}
