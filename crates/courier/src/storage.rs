//! The local directory the bundle is mirrored into.
//!
//! Files are written atomically (to a hidden sibling, then renamed) so the
//! file server never hands out a half-written asset and a failed download
//! leaves the previous copy in place.

use async_std::fs;
use hashmirror_core::hash::HashAlgorithm;
use hashmirror_core::MirrorError;
use log::{debug, warn};
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LocalRoot {
    root: PathBuf,
}

impl LocalRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the root directory if it does not exist yet.
    pub async fn ensure(&self) -> Result<(), MirrorError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| MirrorError::local_io(&self.root, e))
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Map a manifest name to a path under the root.
    ///
    /// The check is lexical: the target usually does not exist yet, so it
    /// cannot be canonicalised. Names with `..`, absolute paths, drive
    /// prefixes or backslashes are refused.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, MirrorError> {
        let unsafe_name = || MirrorError::UnsafePath(name.to_string());

        if name.is_empty() || name.contains('\\') || name.contains('\0') {
            return Err(unsafe_name());
        }

        let mut relative = PathBuf::new();
        for component in Path::new(name).components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(unsafe_name())
                }
            }
        }

        if relative.as_os_str().is_empty() {
            return Err(unsafe_name());
        }
        Ok(self.root.join(relative))
    }

    /// Digest of the file at `path`, or `None` when it cannot be read.
    ///
    /// An unreadable file is treated the same as a missing one: it will
    /// simply be downloaded again.
    pub async fn digest(&self, path: &Path, algorithm: HashAlgorithm) -> Option<String> {
        match fs::read(path).await {
            Ok(data) => Some(algorithm.digest(&data)),
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("cannot hash {}: {}", path.display(), e);
                }
                None
            }
        }
    }

    /// Write `data` to `root/name`, creating parent directories and
    /// replacing any existing file.
    pub async fn write(&self, name: &str, data: &[u8]) -> Result<PathBuf, MirrorError> {
        let path = self.resolve(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| MirrorError::local_io(parent, e))?;
        }
        atomic_write(&path, data).await?;
        Ok(path)
    }
}

/// Hidden sibling used while a download is being written.
fn temp_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.partial", file_name))
}

async fn atomic_write(path: &Path, data: &[u8]) -> Result<(), MirrorError> {
    let temp = temp_path(path);

    let written = match fs::write(&temp, data).await {
        Ok(()) => fs::rename(&temp, path).await,
        Err(e) => Err(e),
    };

    if let Err(e) = written {
        if fs::remove_file(&temp).await.is_ok() {
            debug!("removed partial file {}", temp.display());
        }
        return Err(MirrorError::local_io(path, e));
    }
    Ok(())
}
