use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{LoadError, LoadResult};

/// Search path for bundled (`res:`) resources.
///
/// Roots are searched in the order they were added; the first root holding
/// a file wins.
#[derive(Debug, Clone, Default)]
pub struct ResourceRoots {
    roots: Vec<PathBuf>,
}

impl ResourceRoots {
    /// Empty search path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root, ignoring duplicates.
    pub fn add_root<P: Into<PathBuf>>(&mut self, path: P) {
        let path = path.into();
        if !self.roots.contains(&path) {
            self.roots.push(path);
        }
    }

    /// Add several roots at once.
    pub fn add_roots<I, P>(&mut self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        for path in paths {
            self.add_root(path);
        }
    }

    /// Roots in search order.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Find a bundled path in the roots.
    pub fn find(&self, relative: &str) -> Option<PathBuf> {
        let relative = relative.trim_start_matches('/');
        for root in &self.roots {
            let candidate = root.join(relative);
            if candidate.is_file() {
                debug!("Found bundled resource {} at {}", relative, candidate.display());
                return Some(candidate);
            }
        }
        None
    }

    /// Read a bundled file, `Ok(None)` if no root holds it.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::Io` if the file exists but cannot be read.
    pub fn read(&self, relative: &str) -> LoadResult<Option<String>> {
        match self.find(relative) {
            Some(path) => read_optional(&path),
            None => Ok(None),
        }
    }
}

/// Read a file, mapping "not found" to `Ok(None)`.
pub(crate) fn read_optional(path: &Path) -> LoadResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(LoadError::Io(path.to_path_buf(), e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn first_root_wins() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        fs::create_dir_all(first.path().join("features")).unwrap();
        fs::create_dir_all(second.path().join("features")).unwrap();
        fs::write(second.path().join("features/a.js"), "second").unwrap();
        fs::write(second.path().join("features/b.js"), "b").unwrap();
        fs::write(first.path().join("features/a.js"), "first").unwrap();

        let mut roots = ResourceRoots::new();
        roots.add_roots([first.path(), second.path(), first.path()]);
        assert_eq!(roots.roots().len(), 2);

        assert_eq!(roots.read("/features/a.js").unwrap().as_deref(), Some("first"));
        assert_eq!(roots.read("features/b.js").unwrap().as_deref(), Some("b"));
        assert_eq!(roots.read("features/c.js").unwrap(), None);
    }
}
