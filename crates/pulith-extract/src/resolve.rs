//! Destination path resolution and chroot confinement.

use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Directory every extracted file must land strictly inside.
///
/// The root is canonicalized once on construction, so containment can be
/// checked component-wise against lexically resolved paths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractionRoot {
    path: PathBuf,
}

impl ExtractionRoot {
    /// The directory must already exist.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let canonical = std::fs::canonicalize(path).map_err(|source| Error::InvalidRoot {
            path: path.to_path_buf(),
            source,
        })?;
        if !canonical.is_dir() {
            return Err(Error::InvalidRoot {
                path:   path.to_path_buf(),
                source: io::Error::from(io::ErrorKind::NotADirectory),
            });
        }
        Ok(Self { path: canonical })
    }

    pub fn path(&self) -> &Path { &self.path }

    /// Whether `path` is a strict descendant of the root.
    ///
    /// Compares whole components, so `/out` does not contain `/outside/x`.
    pub fn contains(&self, path: &Path) -> bool {
        path != self.path && path.starts_with(&self.path)
    }

    /// Append a sanitized name to the root and collapse `.` and `..`.
    ///
    /// A leading root or drive prefix in `name` is dropped rather than
    /// replacing the root. Nothing on disk is consulted.
    pub fn join(&self, name: &str) -> PathBuf {
        let mut resolved = self.path.clone();
        for component in Path::new(name).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::ParentDir => {
                    resolved.pop();
                }
                Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            }
        }
        resolved
    }

    /// Lexically resolve `name` and reject it if it leaves the root.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let resolved = self.join(name);
        if !self.contains(&resolved) {
            return Err(self.escape(resolved));
        }
        Ok(resolved)
    }

    /// Reject `path` if symlinks already on disk would redirect it outside the root.
    ///
    /// Checks the deepest existing ancestor and the destination itself.
    pub async fn confine(&self, path: &Path) -> Result<()> {
        // Other lookup failures surface when the parent is created.
        if let Ok(meta) = tokio::fs::symlink_metadata(path).await {
            if meta.file_type().is_symlink() {
                // Dangling links cannot be verified.
                return match tokio::fs::canonicalize(path).await {
                    Ok(real) if self.contains(&real) => Ok(()),
                    Ok(real) => Err(self.escape(real)),
                    Err(_) => Err(self.escape(path.to_path_buf())),
                };
            }
        }

        let mut ancestor = path.parent();
        while let Some(dir) = ancestor {
            if dir == self.path {
                return Ok(());
            }
            match tokio::fs::symlink_metadata(dir).await {
                Ok(meta) => {
                    let real = match tokio::fs::canonicalize(dir).await {
                        Ok(real) => real,
                        Err(_) if meta.file_type().is_symlink() => {
                            return Err(self.escape(dir.to_path_buf()));
                        }
                        Err(source) => {
                            return Err(Error::CreateDir {
                                path: dir.to_path_buf(),
                                source,
                            });
                        }
                    };
                    if real != self.path && !self.contains(&real) {
                        return Err(self.escape(real));
                    }
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => ancestor = dir.parent(),
                Err(source) => {
                    return Err(Error::CreateDir {
                        path: dir.to_path_buf(),
                        source,
                    });
                }
            }
        }
        Ok(())
    }

    fn escape(&self, path: PathBuf) -> Error {
        Error::PathEscape {
            path,
            root: self.path.clone(),
        }
    }
}

/// Create every missing directory above `path`.
///
/// Existing directories are fine; anything else in the way is an error.
pub async fn create_parent(path: &Path, dir_mode: u32) -> Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };

    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(dir_mode);
    #[cfg(not(unix))]
    let _ = dir_mode;

    builder.create(parent).await.map_err(|source| Error::CreateDir {
        path: parent.to_path_buf(),
        source,
    })
}
