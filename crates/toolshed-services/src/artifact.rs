//! Temp artifact scopes.
//!
//! Media jobs write through an external tool that only speaks files, so each
//! job gets its own uniquely named path in a shared directory:
//!   {root}/{uuid-v4}.{ext}
//!
//! The `TempArtifact` handle owns that path. Dropping it removes the file, so
//! cleanup runs on every exit path: normal return, `?`, panic, or a cancelled
//! future. A file that is already gone is not an error; any other removal
//! failure is logged and swallowed.
//!
//! Tools tend to leave siblings next to the requested path (`.part` files,
//! pre-merge streams), so release also removes any `{uuid}.*` entry in the
//! root.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use uuid::Uuid;

/// Provider of scoped, uniquely named write locations.
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    live: Arc<AtomicUsize>,
}

impl ArtifactStore {
    /// Create a store rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("failed to create temp dir: {}", root.display()))?;
        Ok(Self {
            root,
            live: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Reserve a fresh path with the given extension. Nothing is created on disk.
    pub fn acquire(&self, extension: &str) -> TempArtifact {
        let ext = extension.trim_start_matches('.');
        let name = if ext.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            format!("{}.{}", Uuid::new_v4(), ext)
        };
        let path = self.root.join(name);
        self.live.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(path = %path.display(), "temp artifact acquired");
        TempArtifact {
            path: Some(path),
            live: self.live.clone(),
        }
    }

    /// Handles acquired and not yet released.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Exclusive handle over one temp path. Released exactly once.
#[derive(Debug)]
pub struct TempArtifact {
    path: Option<PathBuf>,
    live: Arc<AtomicUsize>,
}

impl TempArtifact {
    pub fn path(&self) -> &Path {
        // Only `release` clears the path, and it consumes the handle.
        self.path.as_deref().unwrap_or(Path::new(""))
    }

    /// Release now instead of waiting for drop.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        remove_quietly(&path);
        remove_siblings(&path);
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

fn remove_quietly(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "temp artifact removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            "failed to remove temp artifact"
        ),
    }
}

/// Remove `{stem}.*` leftovers in the same directory.
fn remove_siblings(path: &Path) {
    let (Some(dir), Some(stem)) = (path.parent(), path.file_stem().and_then(|s| s.to_str())) else {
        return;
    };
    let prefix = format!("{stem}.");
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        if name.to_str().is_some_and(|n| n.starts_with(&prefix)) {
            remove_quietly(&entry.path());
        }
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        self.release_inner();
    }
}
