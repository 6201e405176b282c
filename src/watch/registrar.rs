// src/watch/registrar.rs

//! Recursive directory registration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::{DevloopError, Result};
use crate::fs::FileSystem;
use crate::watch::DirectoryWatch;

/// Walk `root` depth-first and add every directory to `watch`.
///
/// - `root` itself is registered first, children follow in lexical order.
/// - Any entry named exactly `ignored_dir` is skipped together with its
///   whole subtree.
/// - The first I/O or registration error aborts the walk. Directories added
///   before the failure stay registered.
///
/// Returns the number of directories registered.
pub fn register_directories(
    fs: &dyn FileSystem,
    root: &Path,
    ignored_dir: &str,
    watch: &mut dyn DirectoryWatch,
) -> Result<usize> {
    let mut registered = 0usize;
    let mut stack: Vec<PathBuf> = vec![root.to_path_buf()];

    while let Some(path) = stack.pop() {
        if path.file_name().is_some_and(|name| name == ignored_dir) {
            debug!(?path, "skipping ignored directory");
            continue;
        }

        let is_dir = fs
            .is_dir(&path)
            .map_err(|source| DevloopError::walk(&path, source))?;
        if !is_dir {
            continue;
        }

        watch
            .add_path(&path)
            .map_err(|source| DevloopError::watch_add(&path, source))?;
        registered += 1;
        debug!(?path, "watching directory");

        let mut children = fs
            .read_dir(&path)
            .map_err(|source| DevloopError::walk(&path, source))?;
        // Reverse-sorted onto the stack so they pop in lexical order.
        children.sort_unstable_by(|a, b| b.cmp(a));
        stack.extend(children);
    }

    Ok(registered)
}

/// Run [`register_directories`] on the blocking pool.
///
/// The watch handle is moved into the worker and handed back on success so
/// the caller keeps owning the session.
pub async fn spawn_registration(
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    ignored_dir: String,
    mut watch: Box<dyn DirectoryWatch>,
) -> Result<(Box<dyn DirectoryWatch>, usize)> {
    info!(root = ?root, "walking project tree");

    let joined = tokio::task::spawn_blocking(move || {
        register_directories(fs.as_ref(), &root, &ignored_dir, watch.as_mut())
            .map(|count| (watch, count))
    })
    .await
    .map_err(|e| anyhow::anyhow!("directory walk task failed: {e}"))?;

    let (watch, count) = joined?;
    info!(directories = count, "directory registration complete");
    Ok((watch, count))
}
