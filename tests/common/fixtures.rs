// Test fixtures for integration testing

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Test repository fixture for creating synthetic test data
#[allow(dead_code)] // Used in integration tests
pub struct TestRepo {
    pub dir: TempDir,
}

#[allow(dead_code)] // Used in integration tests
impl TestRepo {
    /// Create a small source repository (8 files)
    pub fn small() -> Self {
        Self::with_files(&[
            ("src/main.rs", "fn main() { println!(\"Hello\"); }\n"),
            ("src/lib.rs", "pub fn helper() -> u32 { 42 }\n"),
            (
                "src/utils.rs",
                "pub fn add(a: i32, b: i32) -> i32 { a + b }\n",
            ),
            ("README.md", "# Test Project\n\nThis is a test.\n"),
            (
                "Cargo.toml",
                "[package]\nname = \"test\"\nversion = \"0.1.0\"\n",
            ),
            (
                "tests/test_main.rs",
                "#[test]\nfn it_works() { assert_eq!(2 + 2, 4); }\n",
            ),
            ("docs/api.md", "# API\n\n## Functions\n\n- `helper()`\n"),
            ("LICENSE", "MIT License\n\nCopyright (c) 2025\n"),
        ])
    }

    /// Create with custom files
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let repo = Self {
            dir: TempDir::new().unwrap(),
        };
        for (path, content) in files {
            repo.write(path, content);
        }
        repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write (or overwrite) a file, creating parent directories
    pub fn write(&self, relative: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let full_path = self.dir.path().join(relative);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&full_path, content).unwrap();
        full_path
    }

    pub fn remove(&self, relative: &str) {
        fs::remove_file(self.dir.path().join(relative)).unwrap();
    }

    /// Initialise a git repository; false when git is unavailable
    pub fn init_git(&self) -> bool {
        Command::new("git")
            .args(["init", "-q"])
            .current_dir(self.dir.path())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}
