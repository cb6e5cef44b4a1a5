//! Document ingestion: where the lines of a session come from.
//!
//! Sources implement [`DocumentSource`] so the application can load a file
//! from disk or text pasted in, without caring which.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

/// Something that yields a whole document as lines.
#[async_trait::async_trait]
pub trait DocumentSource {
    async fn load(self) -> Result<Vec<String>>;
}

/// A text file on disk. Invalid UTF-8 is replaced rather than rejected.
pub struct FileSource {
    pub path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl DocumentSource for FileSource {
    async fn load(self) -> Result<Vec<String>> {
        let file = File::open(&self.path)
            .await
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        let mut reader = BufReader::new(file);
        let mut lines = Vec::new();
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .await
                .with_context(|| format!("Failed to read {}", self.path.display()))?;
            if read == 0 {
                break;
            }
            lines.push(decode_line(&buf));
        }
        debug!(path = %self.path.display(), lines = lines.len(), "file read");
        Ok(lines)
    }
}

/// Text already in memory, e.g. pasted from the clipboard.
pub struct TextSource {
    pub text: String,
}

impl TextSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait::async_trait]
impl DocumentSource for TextSource {
    async fn load(self) -> Result<Vec<String>> {
        Ok(self.text.lines().map(str::to_string).collect())
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_file_source_strips_line_endings() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"first\r\nsecond\n\nlast").unwrap();
        let lines = FileSource::new(file.path()).load().await.unwrap();
        assert_eq!(lines, vec!["first", "second", "", "last"]);
    }

    #[tokio::test]
    async fn test_file_source_is_lossy() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"ok\nbad \xff byte\n").unwrap();
        let lines = FileSource::new(file.path()).load().await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "bad \u{fffd} byte");
    }

    #[tokio::test]
    async fn test_missing_file_reports_path() {
        let err = FileSource::new("/definitely/not/here.log")
            .load()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.log"));
    }

    #[tokio::test]
    async fn test_text_source() {
        let lines = TextSource::new("a\r\nb\n").load().await.unwrap();
        assert_eq!(lines, vec!["a", "b"]);
    }
}
