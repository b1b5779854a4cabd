//! Append-only persistence for collected records.
//!
//! The sink is the collector endpoint's shared state: every append happens
//! while the endpoint mutex is held, so lines from the receiver task and any
//! foreground writer never interleave.

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::errors::TransportError;

/// An append-only text file; each accepted record becomes one line, in the
/// order received.
#[derive(Debug)]
pub struct DurableSink {
    path: PathBuf,
    file: File,
}

impl DurableSink {
    /// Opens (creating if needed) the sink file in append mode.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, TransportError> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|source| TransportError::SinkOpen {
                path: path.display().to_string(),
                source,
            })?;
        Ok(DurableSink { path, file })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record payload, adding the line terminator if the payload
    /// does not already carry one. Each payload is written exactly once.
    pub async fn append(&mut self, payload: &[u8]) -> std::io::Result<()> {
        self.file.write_all(payload).await?;
        if !payload.ends_with(b"\n") {
            self.file.write_all(b"\n").await?;
        }
        self.file.flush().await
    }

    /// Reads the whole sink back, for the console dump operation.
    pub async fn dump(&self) -> std::io::Result<String> {
        tokio::fs::read_to_string(&self.path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_appends_become_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collected.log");
        let mut sink = DurableSink::open(&path).await.unwrap();

        sink.append(b"first line\n").await.unwrap();
        sink.append(b"second line without terminator").await.unwrap();

        let contents = sink.dump().await.unwrap();
        assert_eq!(contents, "first line\nsecond line without terminator\n");
    }

    #[tokio::test]
    async fn test_reopen_appends_rather_than_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collected.log");

        let mut sink = DurableSink::open(&path).await.unwrap();
        sink.append(b"kept\n").await.unwrap();
        drop(sink);

        let mut sink = DurableSink::open(&path).await.unwrap();
        sink.append(b"added\n").await.unwrap();
        assert_eq!(sink.dump().await.unwrap(), "kept\nadded\n");
    }

    #[tokio::test]
    async fn test_open_failure_is_sink_open_error() {
        let err = DurableSink::open("/definitely/not/a/real/dir/out.log")
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::SinkOpen { .. }));
    }
}
