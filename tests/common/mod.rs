//! Common test utilities for rust-sprocscan tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use rust_sprocscan::ExtractOptions;

/// Test context with temporary directory for isolated test execution
pub struct TestContext {
    /// Kept to prevent temp directory cleanup until TestContext is dropped
    _temp_dir: TempDir,
    pub dir: PathBuf,
}

impl TestContext {
    /// Create a new test context by copying a fixture to a temp directory
    pub fn with_fixture(fixture_name: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let fixture_path = fixture_dir(fixture_name);
        let dir = temp_dir.path().to_path_buf();

        for entry in fs::read_dir(&fixture_path).expect("Failed to read fixture") {
            let entry = entry.expect("Failed to read fixture entry");
            fs::copy(entry.path(), dir.join(entry.file_name())).expect("Failed to copy fixture");
        }

        Self {
            _temp_dir: temp_dir,
            dir,
        }
    }

    /// Create an empty test context
    pub fn empty() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let dir = temp_dir.path().to_path_buf();
        Self {
            _temp_dir: temp_dir,
            dir,
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn dump_path(&self) -> PathBuf {
        self.path("dump.sql")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.path("out")
    }

    /// Write a file into the context directory
    pub fn write(&self, name: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, content).expect("Failed to write test file");
        path
    }

    /// Extract options with both collaborators from the fixture
    pub fn extract_options(&self) -> ExtractOptions {
        let mut options = ExtractOptions::new(self.dump_path(), self.output_dir());
        options.known_tables_path = Some(self.path("known_tables.json"));
        options.callers_path = Some(self.path("callers.json"));
        options
    }

    /// Parse a JSON file relative to the output directory
    pub fn read_output_json(&self, relative: &str) -> serde_json::Value {
        read_json(&self.output_dir().join(relative))
    }
}

pub fn fixture_dir(fixture_name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(fixture_name)
}

/// Read a fixture file as UTF-8 text
pub fn fixture_text(fixture_name: &str, file: &str) -> String {
    fs::read_to_string(fixture_dir(fixture_name).join(file)).expect("Failed to read fixture file")
}

pub fn read_json(path: &Path) -> serde_json::Value {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Invalid JSON in {}: {e}", path.display()))
}

/// Encode text as UTF-16LE with a byte-order mark, the way SSMS exports scripts
pub fn utf16le_with_bom(text: &str) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xFE];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}

/// A procedure whose body has exactly `lines` lines
pub fn procedure_with_body_lines(name: &str, lines: usize) -> String {
    let body: Vec<String> = (0..lines).map(|i| format!("    PRINT {i}")).collect();
    format!("CREATE PROCEDURE dbo.{name}\nAS\n{}", body.join("\n"))
}
