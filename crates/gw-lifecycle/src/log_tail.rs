//! Bounded reads of the gateway log file.

use crate::log_buffer::char_suffix;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use async_trait::async_trait;

// Upper bound on UTF-8 bytes per character.
const MAX_UTF8_WIDTH: u64 = 4;

/// Where the coordinator reads and deletes the gateway log.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Last `limit` characters of the log, empty when missing or unreadable.
    async fn tail(&self, path: &Path, limit: usize) -> String;

    async fn delete(&self, path: &Path) -> std::io::Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogTailer;

impl LogTailer {
    /// Read the last `limit` characters of the file at `path`.
    ///
    /// The file is opened read-only and shared with the writer. A missing or
    /// unreadable file yields an empty string.
    pub fn read_tail(path: &Path, limit: usize) -> String {
        if limit == 0 {
            return String::new();
        }

        let Ok(mut file) = File::open(path) else {
            return String::new();
        };
        let len = file.metadata().map(|m| m.len()).unwrap_or(0);
        let window = (limit as u64).saturating_mul(MAX_UTF8_WIDTH);
        let start = len.saturating_sub(window);

        if file.seek(SeekFrom::Start(start)).is_err() {
            return String::new();
        }

        let mut bytes = Vec::new();
        if file.read_to_end(&mut bytes).is_err() {
            return String::new();
        }

        // Skip a character split by the seek.
        let skip = if start > 0 {
            bytes.iter().take_while(|b| (**b & 0xC0) == 0x80).count()
        } else {
            0
        };

        let text = String::from_utf8_lossy(&bytes[skip..]);
        char_suffix(&text, limit).to_string()
    }
}

#[async_trait]
impl LogSource for LogTailer {
    async fn tail(&self, path: &Path, limit: usize) -> String {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::read_tail(&path, limit))
            .await
            .unwrap_or_default()
    }

    /// A missing file is not an error.
    async fn delete(&self, path: &Path) -> std::io::Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}
