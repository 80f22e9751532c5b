//! Test discovery module
//!
//! This module finds test modules in a directory tree and tags each one with a
//! category taken from its parent directory.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Suffix a file stem must carry to be a test module
pub const TEST_MODULE_SUFFIX: &str = "_test";

/// Prefix an exported function must carry to be a test case
pub const TEST_FUNCTION_PREFIX: &str = "test_";

/// Test category, derived from the directory a module lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestCategory {
    Unit,
    Integration,
    System,
    Uncategorized,
}

impl TestCategory {
    pub const ALL: [TestCategory; 4] = [
        TestCategory::Unit,
        TestCategory::Integration,
        TestCategory::System,
        TestCategory::Uncategorized,
    ];

    /// Category for a directory name (case-sensitive)
    pub fn from_dir_name(name: &str) -> Self {
        match name {
            "unit" => TestCategory::Unit,
            "integration" => TestCategory::Integration,
            "system" => TestCategory::System,
            _ => TestCategory::Uncategorized,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TestCategory::Unit => "unit",
            TestCategory::Integration => "integration",
            TestCategory::System => "system",
            TestCategory::Uncategorized => "uncategorized",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for TestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discovered test module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestModule {
    /// Full path to the module source
    pub path: PathBuf,

    /// Path relative to the discovery root, used in test names
    pub relative_path: PathBuf,

    pub category: TestCategory,
}

impl TestModule {
    pub fn new(root: &Path, path: PathBuf) -> Self {
        let relative_path = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
        let category = category_for(&relative_path);
        Self {
            path,
            relative_path,
            category,
        }
    }
}

/// A single invocable test function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub module: TestModule,
    pub function_name: String,
    pub arity: usize,
}

impl TestCase {
    /// `unit/math_test.tl::test_add/0`
    pub fn qualified_name(&self) -> String {
        format!(
            "{}::{}/{}",
            self.module.relative_path.display(),
            self.function_name,
            self.arity
        )
    }
}

/// Is `name/arity` something the harness invokes?
pub fn is_test_entry_point(name: &str, arity: usize) -> bool {
    name.starts_with(TEST_FUNCTION_PREFIX) && arity == 0
}

/// Is `path` a test module source for a toolchain using `extension`?
pub fn is_test_module(path: &Path, extension: &str) -> bool {
    let extension_matches = path.extension().and_then(|e| e.to_str()) == Some(extension);
    let stem_matches = path
        .file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|s| s.ends_with(TEST_MODULE_SUFFIX));
    extension_matches && stem_matches
}

/// Category from the immediate parent directory; the root itself does not count
fn category_for(relative_path: &Path) -> TestCategory {
    relative_path
        .parent()
        .and_then(Path::file_name)
        .and_then(|name| name.to_str())
        .map_or(TestCategory::Uncategorized, TestCategory::from_dir_name)
}

/// Find every test module under `root`, sorted by path
///
/// A missing root yields nothing. Entries that cannot be read are skipped.
pub fn discover(root: &Path, extension: &str) -> Vec<TestModule> {
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_test_module(entry.path(), extension))
        .map(|entry| entry.into_path())
        .collect();
    paths.sort();

    debug!("Discovered {} test module(s) under {}", paths.len(), root.display());

    paths.into_iter().map(|path| TestModule::new(root, path)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_is_test_module() {
        assert!(is_test_module(Path::new("a/math_test.tl"), "tl"));
        assert!(!is_test_module(Path::new("a/math_test.rs"), "tl"));
        assert!(!is_test_module(Path::new("a/math.tl"), "tl"));
        assert!(!is_test_module(Path::new("a/test_math.tl"), "tl"));
        assert!(!is_test_module(Path::new("a/math_test"), "tl"));
    }

    #[test]
    fn test_category_names_are_case_sensitive() {
        assert_eq!(TestCategory::from_dir_name("unit"), TestCategory::Unit);
        assert_eq!(TestCategory::from_dir_name("integration"), TestCategory::Integration);
        assert_eq!(TestCategory::from_dir_name("system"), TestCategory::System);
        assert_eq!(TestCategory::from_dir_name("Unit"), TestCategory::Uncategorized);
        assert_eq!(TestCategory::from_dir_name("SYSTEM"), TestCategory::Uncategorized);
    }

    #[test]
    fn test_entry_point_predicate() {
        assert!(is_test_entry_point("test_ok", 0));
        assert!(!is_test_entry_point("test_ok", 1));
        assert!(!is_test_entry_point("helper", 0));
        assert!(!is_test_entry_point("tests_ok", 0));
    }

    #[test]
    fn test_discovery_categories_and_order() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "system/b_test.tl");
        touch(root, "unit/a_test.tl");
        touch(root, "unit/helper.tl");
        touch(root, "integration/nested/unit/c_test.tl");
        touch(root, "integration/d_test.tl");
        touch(root, "misc/e_test.tl");
        touch(root, "top_test.tl");

        let modules = discover(root, "tl");
        let found: Vec<(String, TestCategory)> = modules
            .iter()
            .map(|m| (m.relative_path.display().to_string(), m.category))
            .collect();

        assert_eq!(
            found,
            vec![
                ("integration/d_test.tl".to_string(), TestCategory::Integration),
                ("integration/nested/unit/c_test.tl".to_string(), TestCategory::Unit),
                ("misc/e_test.tl".to_string(), TestCategory::Uncategorized),
                ("system/b_test.tl".to_string(), TestCategory::System),
                ("top_test.tl".to_string(), TestCategory::Uncategorized),
                ("unit/a_test.tl".to_string(), TestCategory::Unit),
            ]
        );
    }

    #[test]
    fn test_root_named_like_a_category_is_uncategorized() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("unit");
        touch(&root, "a_test.tl");

        let modules = discover(&root, "tl");
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].category, TestCategory::Uncategorized);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subdirectory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "unit/a_test.tl");
        touch(root, "locked/b_test.tl");
        touch(root, "system/c_test.tl");

        let locked = root.join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not bind a privileged user
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let found: Vec<String> = discover(root, "tl")
            .iter()
            .map(|m| m.relative_path.display().to_string())
            .collect();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(found, vec!["system/c_test.tl".to_string(), "unit/a_test.tl".to_string()]);
    }

    #[test]
    fn test_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(discover(&dir.path().join("nope"), "tl").is_empty());
    }

    #[test]
    fn test_discovery_is_repeatable() {
        let dir = TempDir::new().unwrap();
        for rel in ["unit/z_test.tl", "unit/a_test.tl", "system/m_test.tl", "x_test.tl"] {
            touch(dir.path(), rel);
        }
        assert_eq!(discover(dir.path(), "tl"), discover(dir.path(), "tl"));
    }

    #[test]
    fn test_qualified_name() {
        let module = TestModule::new(Path::new("/r"), PathBuf::from("/r/unit/a_test.tl"));
        let case = TestCase {
            module,
            function_name: "test_ok".to_string(),
            arity: 0,
        };
        assert_eq!(case.qualified_name(), "unit/a_test.tl::test_ok/0");
    }
}
