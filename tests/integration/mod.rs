// Integration test utilities and common code
// WHY: Centralized utilities avoid duplication across integration tests

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Short book with a front-matter heading, three chapters and a license trailer
pub fn sample_book() -> String {
    let body = "The wind rose over the moor and the lamps went out one by one. \
                Nobody in the house said anything. \
                Mr. Hale waited by the door until morning.\n\n";
    let mut book = String::from("The Quiet House\n\n");
    for numeral in ["I", "II", "III"] {
        book.push_str(&format!("CHAPTER {numeral}\n\n"));
        book.push_str(&body.repeat(12));
    }
    book.push_str("*** END OF THE PROJECT GUTENBERG EBOOK THE QUIET HOUSE ***\n\nLicense text follows here.");
    book
}

/// Test fixture helper for creating temporary directories with book files
pub struct TestFixture {
    pub temp_dir: TempDir,
    pub root_path: PathBuf,
}

impl TestFixture {
    /// Create a new test fixture with temporary directory
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root_path = temp_dir.path().to_path_buf();

        Self { temp_dir, root_path }
    }

    /// Create a document file with given content
    pub fn create_document<P: AsRef<Path>>(&self, relative_path: P, content: &str) -> PathBuf {
        let file_path = self.root_path.join(relative_path);

        // Create parent directories if needed
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }

        fs::write(&file_path, content).expect("Failed to write test file");
        file_path
    }

    /// Write a TOML config next to the documents
    pub fn create_config(&self, content: &str) -> PathBuf {
        self.create_document("folio.toml", content)
    }
}
