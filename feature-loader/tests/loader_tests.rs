//! Scheme dispatch and content rules of the default resource loader

use feature_loader::{
    DefaultResourceLoader, FeatureResource, FetchError, LoadError, ManualClock, ResourceLoader,
    ResourceRoots, UriFetcher,
};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;

/// Helper to create a file below `dir`, creating parents
fn write(dir: &Path, relative: &str, content: &str) {
    let path = dir.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn file_uri(dir: &Path, relative: &str) -> Url {
    Url::from_file_path(dir.join(relative)).unwrap()
}

fn attrs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[derive(Default)]
struct CountingFetcher {
    calls: AtomicUsize,
}

impl UriFetcher for CountingFetcher {
    fn fetch(&self, uri: &Url) -> Result<String, FetchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == 0 {
            Err(FetchError::Http(format!("{uri} timed out")))
        } else {
            Ok(format!("// fetched {uri}"))
        }
    }
}

#[test]
fn test_file_prefers_optimized_variant() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "rpc/rpc.js", "function rpc() { /* long */ }");
    write(temp.path(), "rpc/rpc.opt.js", "function rpc(){}");

    let loader = DefaultResourceLoader::new(ResourceRoots::new());
    let res = loader
        .load(&file_uri(temp.path(), "rpc/rpc.js"), &attrs(&[("debug", "x")]))
        .unwrap();

    assert_eq!(res.content().as_deref(), Some("function rpc(){}"));
    assert_eq!(res.debug_content().as_deref(), Some("function rpc() { /* long */ }"));
    assert!(!res.is_external());
    assert!(res.is_proxy_cacheable());
    assert_eq!(res.attributes().get("debug").map(String::as_str), Some("x"));
}

#[test]
fn test_file_without_optimized_variant_serves_both_modes() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "core/core.js", "var core = {};");

    let loader = DefaultResourceLoader::new(ResourceRoots::new());
    let res = loader
        .load(&file_uri(temp.path(), "core/core.js"), &HashMap::new())
        .unwrap();
    assert_eq!(res.content().as_deref(), Some("var core = {};"));
    assert_eq!(res.debug_content().as_deref(), Some("var core = {};"));
}

#[test]
fn test_missing_file_is_a_retrieval_failure() {
    let temp = TempDir::new().unwrap();
    let loader = DefaultResourceLoader::new(ResourceRoots::new());
    let err = loader
        .load(&file_uri(temp.path(), "nope.js"), &HashMap::new())
        .unwrap_err();
    assert!(matches!(err, LoadError::ContentRetrieval(_)));
}

#[test]
fn test_bundled_resources_use_the_search_path() {
    let overrides = TempDir::new().unwrap();
    let defaults = TempDir::new().unwrap();
    write(defaults.path(), "features/core/core.js", "default core");
    write(defaults.path(), "features/core/core.opt.js", "default core min");
    write(overrides.path(), "features/core/core.js", "patched core");

    let mut roots = ResourceRoots::new();
    roots.add_roots([overrides.path(), defaults.path()]);
    let loader = DefaultResourceLoader::new(roots);

    let uri = Url::parse("res:///features/core/core.js").unwrap();
    let res = loader.load(&uri, &HashMap::new()).unwrap();
    // Each variant is searched independently along the path.
    assert_eq!(res.content().as_deref(), Some("default core min"));
    assert_eq!(res.debug_content().as_deref(), Some("patched core"));
    assert_eq!(res.name(), "res:///features/core/core.js");
}

#[test]
fn test_bundled_paths_are_percent_decoded() {
    let root = TempDir::new().unwrap();
    write(root.path(), "features/my lib/größe.js", "// sized");

    let mut roots = ResourceRoots::new();
    roots.add_root(root.path());
    let loader = DefaultResourceLoader::new(roots);

    let uri = Url::parse("res:///features/my lib/größe.js").unwrap();
    assert_eq!(uri.path(), "/features/my%20lib/gr%C3%B6%C3%9Fe.js");
    let res = loader.load(&uri, &HashMap::new()).unwrap();
    assert_eq!(res.content().as_deref(), Some("// sized"));
    assert_eq!(res.debug_content().as_deref(), Some("// sized"));
}

#[test]
fn test_external_reference() {
    let fetcher = Arc::new(CountingFetcher::default());
    let loader = DefaultResourceLoader::new(ResourceRoots::new()).with_fetcher(fetcher.clone());

    let uri = Url::parse("https://cdn.example.com/jquery.js").unwrap();
    let res = loader.load(&uri, &HashMap::new()).unwrap();
    assert!(res.is_external());
    assert_eq!(res.content().as_deref(), Some("https://cdn.example.com/jquery.js"));
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_inline_external_fetch_with_cooldown() {
    let fetcher = Arc::new(CountingFetcher::default());
    let clock = Arc::new(ManualClock::new());
    let loader = DefaultResourceLoader::new(ResourceRoots::new())
        .with_fetcher(fetcher.clone())
        .with_clock(clock.clone())
        .with_refresh_cooldown(Duration::from_secs(60));

    let uri = Url::parse("https://cdn.example.com/shim.js").unwrap();
    let res = loader.load(&uri, &attrs(&[("inline", "TRUE")])).unwrap();
    assert!(!res.is_external());
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0, "fetch is deferred");

    assert_eq!(res.content(), None);
    assert!(!res.is_proxy_cacheable());
    assert_eq!(res.content(), None);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

    clock.advance(Duration::from_secs(90));
    assert_eq!(
        res.content().as_deref(),
        Some("// fetched https://cdn.example.com/shim.js")
    );
    assert!(res.is_proxy_cacheable());
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
}
