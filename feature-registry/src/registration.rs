//! Expansion of feature locations into descriptors and loaded features
//!
//! A location is one of:
//! - a descriptor file
//! - a directory, scanned recursively for `.xml` descriptors
//! - an index `.txt` file listing further locations, one per line
//! - `res://` followed by a bundled descriptor or index path

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use feature_descriptor::{ParsedDescriptor, ResourceSource, bundled_uri};
use feature_graph::FeatureSpec;
use feature_loader::{FeatureResource, LoadError, ResourceLoader, ResourceRoots, StaticResource};
use tracing::{debug, warn};
use url::Url;
use walkdir::WalkDir;

use crate::{FeatureBundle, RegistryError, RegistryResult};

const BUNDLED_PREFIX: &str = "res://";
const FILE_PREFIX: &str = "file://";

/// Descriptor text together with the URI its relative sources resolve against.
#[derive(Debug, Clone)]
pub(crate) struct DescriptorSource {
    pub location: String,
    pub base: Url,
    pub text: String,
}

/// Walks locations and collects descriptor sources in discovery order.
///
/// Missing locations are recorded instead of failing, so one registration
/// reports all of them together with the linking problems.
pub(crate) struct LocationCollector<'a> {
    roots: &'a ResourceRoots,
    sources: Vec<DescriptorSource>,
    missing: Vec<String>,
    indexes: HashSet<String>,
}

impl<'a> LocationCollector<'a> {
    pub fn new(roots: &'a ResourceRoots) -> Self {
        Self {
            roots,
            sources: Vec::new(),
            missing: Vec::new(),
            indexes: HashSet::new(),
        }
    }

    /// Collected descriptors and one message per missing location.
    pub fn into_parts(self) -> (Vec<DescriptorSource>, Vec<String>) {
        (self.sources, self.missing)
    }

    /// Collect every descriptor named by one location.
    pub fn collect(&mut self, location: &str) -> RegistryResult<()> {
        if let Some(bundled) = location.strip_prefix(BUNDLED_PREFIX) {
            self.collect_bundled(bundled)
        } else {
            let path = location.strip_prefix(FILE_PREFIX).unwrap_or(location);
            self.collect_path(Path::new(path))
        }
    }

    fn collect_bundled(&mut self, path: &str) -> RegistryResult<()> {
        let path = path.trim_start_matches('/');
        let text = match self.roots.read(path) {
            Ok(Some(text)) => text,
            Ok(None) => {
                self.missing.push(format!(
                    "bundled feature location {BUNDLED_PREFIX}{path} not found"
                ));
                return Ok(());
            }
            Err(LoadError::Io(failed, e)) => return Err(RegistryError::InvalidPath(failed, e)),
            Err(e) => return Err(e.into()),
        };

        if is_index(Path::new(path)) {
            if !self.indexes.insert(format!("{BUNDLED_PREFIX}{path}")) {
                warn!("Skipping feature index {}{} listed twice", BUNDLED_PREFIX, path);
                return Ok(());
            }
            debug!("Reading bundled feature index {}", path);
            for entry in index_entries(&text) {
                // Entries of a bundled index are bundled paths, prefixed or not.
                self.collect_bundled(entry.strip_prefix(BUNDLED_PREFIX).unwrap_or(entry))?;
            }
            return Ok(());
        }

        let base = bundled_uri(path).ok_or_else(|| {
            RegistryError::InvalidConfiguration(vec![format!("invalid bundled path {path}")])
        })?;
        self.sources.push(DescriptorSource {
            location: base.to_string(),
            base,
            text,
        });
        Ok(())
    }

    fn collect_path(&mut self, path: &Path) -> RegistryResult<()> {
        if !path.exists() {
            self.missing
                .push(format!("feature location {} does not exist", path.display()));
            return Ok(());
        }

        if path.is_dir() {
            debug!("Scanning {} for feature descriptors", path.display());
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry.map_err(|e| {
                    let failed = e.path().map_or_else(|| path.to_path_buf(), Path::to_path_buf);
                    RegistryError::InvalidPath(failed, e.into())
                })?;
                if entry.file_type().is_file() && has_extension(entry.path(), "xml") {
                    self.collect_file(entry.path())?;
                }
            }
            Ok(())
        } else if is_index(path) {
            let canonical = canonical(path)?;
            if !self.indexes.insert(canonical.to_string_lossy().into_owned()) {
                warn!("Skipping feature index {} listed twice", path.display());
                return Ok(());
            }
            debug!("Reading feature index {}", path.display());
            let text = read(path)?;
            let dir = canonical.parent().map_or_else(PathBuf::new, Path::to_path_buf);
            for entry in index_entries(&text) {
                match entry.strip_prefix(BUNDLED_PREFIX) {
                    Some(bundled) => self.collect_bundled(bundled)?,
                    None => self.collect_path(&dir.join(entry))?,
                }
            }
            Ok(())
        } else {
            self.collect_file(path)
        }
    }

    fn collect_file(&mut self, path: &Path) -> RegistryResult<()> {
        let text = read(path)?;
        let canonical = canonical(path)?;
        let base = Url::from_file_path(&canonical).map_err(|()| {
            RegistryError::InvalidConfiguration(vec![format!(
                "cannot express {} as a file URI",
                canonical.display()
            )])
        })?;
        debug!("Found feature descriptor {}", canonical.display());
        self.sources.push(DescriptorSource {
            location: canonical.display().to_string(),
            base,
            text,
        });
        Ok(())
    }
}

/// Non-blank, non-comment lines of an index file.
fn index_entries(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

fn is_index(path: &Path) -> bool {
    has_extension(path, "txt")
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

fn read(path: &Path) -> RegistryResult<String> {
    fs::read_to_string(path).map_err(|e| RegistryError::InvalidPath(path.to_path_buf(), e))
}

fn canonical(path: &Path) -> RegistryResult<PathBuf> {
    fs::canonicalize(path).map_err(|e| RegistryError::InvalidPath(path.to_path_buf(), e))
}

/// Load every resource of a parsed descriptor into a graph-ready feature.
///
/// Fails on the first resource without retrievable content.
pub(crate) fn load_feature(
    descriptor: ParsedDescriptor,
    loader: &dyn ResourceLoader,
) -> RegistryResult<FeatureSpec<FeatureBundle>> {
    let mut bundles = Vec::with_capacity(descriptor.bundles.len());
    let mut inline_count = 0usize;

    for bundle in descriptor.bundles {
        let mut resources: Vec<Arc<dyn FeatureResource>> = Vec::with_capacity(bundle.resources.len());
        for resource in bundle.resources {
            match resource.source {
                ResourceSource::Uri(uri) => {
                    // Resource attributes win over bundle attributes.
                    let mut attributes = bundle.attributes.clone();
                    attributes.extend(resource.attributes);
                    resources.push(loader.load(&uri, &attributes)?);
                }
                ResourceSource::Inline(content) => {
                    inline_count += 1;
                    let name = format!("{}#inline-{inline_count}", descriptor.name);
                    resources.push(Arc::new(StaticResource::inline(
                        name,
                        content,
                        resource.attributes,
                    )));
                }
            }
        }
        bundles.push(FeatureBundle::new(
            bundle.context_type,
            bundle.attributes,
            resources,
            bundle.api_directives,
        ));
    }

    Ok(FeatureSpec::new(descriptor.name, descriptor.dependencies, bundles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_index_entries_skip_blanks_and_comments() {
        let text = "# features\n\ncore/feature.xml\n   \n  # disabled/feature.xml\n rpc/feature.xml \n";
        let entries: Vec<&str> = index_entries(text).collect();
        assert_eq!(entries, vec!["core/feature.xml", "rpc/feature.xml"]);
    }

    #[test]
    fn test_missing_locations_are_collected() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.xml"), "<feature><name>a</name></feature>").unwrap();
        let roots = ResourceRoots::new();
        let mut collector = LocationCollector::new(&roots);

        collector
            .collect(&temp.path().join("missing.xml").to_string_lossy())
            .unwrap();
        collector.collect("res://features/none.txt").unwrap();
        collector
            .collect(&temp.path().join("a.xml").to_string_lossy())
            .unwrap();

        let (sources, missing) = collector.into_parts();
        assert_eq!(sources.len(), 1);
        assert_eq!(missing.len(), 2);
        assert!(missing[0].contains("missing.xml does not exist"));
        assert!(missing[1].contains("res://features/none.txt not found"));
    }

    #[test]
    fn test_unreadable_bundled_index_is_an_invalid_path() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("features")).unwrap();
        // Not UTF-8, so the read fails after the file is found.
        fs::write(temp.path().join("features/broken.txt"), [0xff, 0xfe, 0x00, 0xc3]).unwrap();

        let mut roots = ResourceRoots::new();
        roots.add_root(temp.path());
        let mut collector = LocationCollector::new(&roots);

        match collector.collect("res://features/broken.txt") {
            Err(RegistryError::InvalidPath(path, _)) => {
                assert!(path.ends_with("features/broken.txt"));
            }
            other => panic!("expected invalid path, got {other:?}"),
        }
    }

    #[test]
    fn test_self_referencing_index_terminates() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("loop.txt"), "loop.txt\na.xml\n").unwrap();
        fs::write(temp.path().join("a.xml"), "<feature><name>a</name></feature>").unwrap();

        let roots = ResourceRoots::new();
        let mut collector = LocationCollector::new(&roots);
        collector
            .collect(&temp.path().join("loop.txt").to_string_lossy())
            .unwrap();
        let (sources, missing) = collector.into_parts();
        assert!(missing.is_empty());
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].base.scheme(), "file");
    }
}
