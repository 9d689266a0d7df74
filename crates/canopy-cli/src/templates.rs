//! Site template lookup on the file system

use canopy_core::storage::TemplateResolver;
use std::path::{Component, Path, PathBuf};

const EXTENSIONS: [&str; 2] = ["html", "twig"];

/// Resolves template paths against a template root directory.
///
/// `topics/_category` matches `topics/_category`, `topics/_category.html`,
/// `topics/_category.twig` or an `index` file inside `topics/_category/`.
#[derive(Debug, Clone)]
pub struct FsTemplateResolver {
    root: PathBuf,
}

impl FsTemplateResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn candidates(&self, path: &str) -> Vec<PathBuf> {
        let base = self.root.join(path);
        let mut candidates = vec![base.clone()];
        for ext in EXTENSIONS {
            candidates.push(base.with_extension(ext));
        }
        for ext in EXTENSIONS {
            candidates.push(base.join(format!("index.{}", ext)));
        }
        candidates
    }
}

/// Relative and free of `..`, so lookups stay under the root
fn is_contained(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

impl TemplateResolver for FsTemplateResolver {
    fn site_template_exists(&self, path: &str) -> bool {
        let path = path.trim().trim_start_matches('/');
        if path.is_empty() || !is_contained(Path::new(path)) {
            return false;
        }
        self.candidates(path).iter().any(|candidate| candidate.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolves_extensions_and_index() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("topics")).unwrap();
        fs::write(dir.path().join("topics/_category.html"), "").unwrap();
        fs::create_dir_all(dir.path().join("tags")).unwrap();
        fs::write(dir.path().join("tags/index.twig"), "").unwrap();

        let resolver = FsTemplateResolver::new(dir.path());
        assert!(resolver.site_template_exists("topics/_category"));
        assert!(resolver.site_template_exists("/topics/_category.html"));
        assert!(resolver.site_template_exists("tags"));
        assert!(!resolver.site_template_exists("topics/_entry"));
        assert!(!resolver.site_template_exists(""));
    }

    #[test]
    fn test_rejects_paths_outside_root() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("site")).unwrap();
        fs::write(dir.path().join("secret.html"), "").unwrap();

        let resolver = FsTemplateResolver::new(dir.path().join("site"));
        assert!(!resolver.site_template_exists("../secret"));
    }
}
