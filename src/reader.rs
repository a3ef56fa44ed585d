use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, BufReader};
use tracing::{debug, info};

/// UTF-8 byte order mark, dropped from the start of documents
const BOM: char = '\u{FEFF}';

/// Configuration for document reading behavior
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Map the file into memory instead of async buffered reads
    pub use_mmap: bool,
    /// Buffer size for async reading (default: 8KB)
    pub buffer_size: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            use_mmap: false,
            buffer_size: 8192, // WHY: 8KB is optimal for most filesystems and network storage
        }
    }
}

/// Statistics for one read
#[derive(Debug, Clone)]
pub struct ReadStats {
    pub file_path: String,
    pub bytes_read: u64,
    pub chars_read: u64,
    pub duration_ms: u64,
}

/// Loads whole UTF-8 documents from disk
pub struct DocumentReader {
    config: ReaderConfig,
}

impl DocumentReader {
    pub fn new(config: ReaderConfig) -> Self {
        Self { config }
    }

    /// Read a document; invalid UTF-8 is an error
    pub async fn read<P: AsRef<Path>>(&self, file_path: P) -> Result<(String, ReadStats)> {
        let path = file_path.as_ref();
        let start_time = std::time::Instant::now();
        debug!("Reading {} (mmap: {})", path.display(), self.config.use_mmap);

        let bytes = if self.config.use_mmap {
            read_mmap(path.to_path_buf()).await?
        } else {
            self.read_buffered(path).await?
        };

        let text = String::from_utf8(bytes)
            .map_err(|e| anyhow!("Invalid UTF-8 in {} at byte {}", path.display(), e.utf8_error().valid_up_to()))?;
        let text = match text.strip_prefix(BOM) {
            Some(rest) => rest.to_string(),
            None => text,
        };

        let stats = ReadStats {
            file_path: path.display().to_string(),
            bytes_read: text.len() as u64,
            chars_read: text.chars().count() as u64,
            duration_ms: start_time.elapsed().as_millis() as u64,
        };
        info!(
            "Read {}: {} bytes, {} chars in {}ms",
            stats.file_path, stats.bytes_read, stats.chars_read, stats.duration_ms
        );
        Ok((text, stats))
    }

    async fn read_buffered(&self, path: &Path) -> Result<Vec<u8>> {
        let file = File::open(path)
            .await
            .with_context(|| format!("Failed to open file {}", path.display()))?;
        // WHY: BufReader with custom buffer size reduces syscalls and improves throughput
        let mut reader = BufReader::with_capacity(self.config.buffer_size, file);
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .await
            .with_context(|| format!("Failed to read file {}", path.display()))?;
        Ok(bytes)
    }
}

/// Map the file on a blocking thread and copy it out
async fn read_mmap(path: PathBuf) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
        let file = std::fs::File::open(&path).with_context(|| format!("Failed to open file {}", path.display()))?;
        let len = file.metadata().with_context(|| format!("Failed to stat {}", path.display()))?.len();
        if len == 0 {
            // Zero-length files cannot be mapped
            return Ok(Vec::new());
        }
        // SAFETY: the map is read once and dropped before returning; concurrent
        // truncation by another process is outside what this reader guards against
        let mmap = unsafe { memmap2::MmapOptions::new().map(&file) }
            .with_context(|| format!("Failed to map file {}", path.display()))?;
        Ok(mmap.to_vec())
    })
    .await
    .context("Mmap reader task panicked")?
}

/// Convenience function for reading a single file with default configuration
pub async fn read_document<P: AsRef<Path>>(file_path: P) -> Result<String> {
    let (text, _stats) = DocumentReader::new(ReaderConfig::default()).read(file_path).await?;
    Ok(text)
}
