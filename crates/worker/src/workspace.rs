//! Per-activity scratch workspaces
//!
//! Every activity invocation runs inside its own workspace tree:
//!
//! ```text
//! <root>/data/control.json    # {"run_uid": "<uid>"}
//! <root>/data/input.json      # activity input metadata, if provided
//! <root>/data/output.json     # activity output metadata, if produced
//! <root>/store/input/...      # staged input artifacts
//! <root>/store/output/...     # artifacts to publish
//! ```
//!
//! The tree is deleted on every exit path; tempdir-backed workspaces are
//! reclaimed on drop and local-mode roots are removed the same way.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tracing::debug;
use windlass_core::Uid;

/// How the workspace root is provisioned
#[derive(Debug, Clone, Default)]
pub struct WorkspaceOptions {
    /// Skip replicating the invoking directory into the workspace
    pub nocopy: bool,

    /// Root the workspace under the invoking directory instead of a
    /// fresh tempdir; the path is predictable, for debugging
    pub local: bool,
}

/// The control document recorded for the running command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    pub run_uid: String,
}

/// One activity's scratch tree
pub struct Workspace {
    root: PathBuf,
    // Present while the root is tempdir-backed; dropping it reclaims the tree
    _tempdir: Option<TempDir>,
    remove_on_drop: bool,
}

impl Workspace {
    /// Create a workspace for `uid`, replicating the current working
    /// directory into it unless `nocopy` is set
    pub fn create(uid: &Uid, options: &WorkspaceOptions) -> io::Result<Self> {
        let invoking_dir = std::env::current_dir()?;
        Self::create_from(uid, options, &invoking_dir)
    }

    /// As [`create`](Self::create), with an explicit invoking directory
    pub fn create_from(
        uid: &Uid,
        options: &WorkspaceOptions,
        invoking_dir: &Path,
    ) -> io::Result<Self> {
        let (root, tempdir) = if options.local {
            let root = invoking_dir.join("windlass-workspace").join(uid.as_str());
            fs::create_dir_all(&root)?;
            (root, None)
        } else {
            let dir = tempfile::Builder::new().prefix("windlass-").tempdir()?;
            (dir.path().to_path_buf(), Some(dir))
        };

        if !options.nocopy {
            copy_tree(invoking_dir, &root)?;
        }

        for sub in ["data", "store", "store/input", "store/output"] {
            fs::create_dir_all(root.join(sub))?;
        }

        debug!(%uid, root = %root.display(), "workspace created");
        Ok(Self {
            root,
            _tempdir: tempdir,
            remove_on_drop: options.local,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    /// Where input artifacts are staged
    pub fn input_dir(&self) -> PathBuf {
        self.root.join("store/input")
    }

    /// Where the command leaves artifacts to publish
    pub fn output_dir(&self) -> PathBuf {
        self.root.join("store/output")
    }

    /// Record `data/control.json`
    pub fn write_control(&self, uid: &Uid) -> io::Result<()> {
        let control = Control {
            run_uid: uid.as_str().to_string(),
        };
        let json = serde_json::to_string(&control)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(self.data_dir().join("control.json"), json)
    }

    /// Write the input metadata verbatim to `data/input.json`
    pub fn write_input(&self, metadata: &str) -> io::Result<()> {
        fs::write(self.data_dir().join("input.json"), metadata)
    }

    /// Read `data/output.json` if the command produced one
    pub fn read_output(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(self.data_dir().join("output.json")) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.remove_on_drop {
            if let Err(err) = fs::remove_dir_all(&self.root) {
                debug!(root = %self.root.display(), error = %err, "workspace cleanup failed");
            }
        }
    }
}

/// Replicate `src` into `dst`, skipping `dst` itself if it is nested
/// under `src` (local mode roots the workspace inside the invoking dir)
fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let from = entry.path();
        if from == *dst || dst.starts_with(&from) {
            continue;
        }
        let to = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            fs::create_dir_all(&to)?;
            copy_tree(&from, &to)?;
        } else {
            fs::copy(&from, &to)?;
        }
    }
    Ok(())
}
