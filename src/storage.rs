//! Atomic JSON persistence for the files under the config directory.
//!
//! Writes go to a uniquely named temp file next to the target and are then
//! renamed over it, so a reader sees either the old or the new file. Reads
//! never fail: the caller gets `Absent` or `Corrupt` and falls back to its
//! own default.

use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;

/// Result of reading a persisted file.
#[derive(Debug)]
pub enum ReadOutcome<T> {
    Loaded(T),
    Absent,
    Corrupt(String),
}

impl<T> ReadOutcome<T> {
    pub fn loaded(self) -> Option<T> {
        match self {
            Self::Loaded(value) => Some(value),
            Self::Absent | Self::Corrupt(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> Result<U, String>) -> ReadOutcome<U> {
        match self {
            Self::Loaded(value) => match f(value) {
                Ok(mapped) => ReadOutcome::Loaded(mapped),
                Err(reason) => ReadOutcome::Corrupt(reason),
            },
            Self::Absent => ReadOutcome::Absent,
            Self::Corrupt(reason) => ReadOutcome::Corrupt(reason),
        }
    }
}

/// Atomically replace `path` with `bytes`.
pub async fn write(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_private_dir(parent).await?;
    }

    let tmp = temp_path_for(path);
    let result = match write_temp(&tmp, bytes).await {
        Ok(()) => fs::rename(&tmp, path).await,
        Err(e) => Err(e),
    };

    if let Err(source) = result {
        let _ = fs::remove_file(&tmp).await;
        return Err(StoreError::Write {
            path: path.to_path_buf(),
            source,
        });
    }

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Serialize `value` as pretty JSON and write it atomically.
pub async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let mut bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    bytes.push(b'\n');
    write(path, &bytes).await
}

/// Read the raw bytes of `path`.
pub async fn read(path: &Path) -> ReadOutcome<Vec<u8>> {
    match fs::read(path).await {
        Ok(bytes) => ReadOutcome::Loaded(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => ReadOutcome::Absent,
        Err(e) => ReadOutcome::Corrupt(format!("unreadable: {}", e)),
    }
}

/// Read and deserialize a JSON file.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> ReadOutcome<T> {
    read(path)
        .await
        .map(|bytes| serde_json::from_slice(&bytes).map_err(|e| e.to_string()))
}

async fn ensure_private_dir(dir: &Path) -> Result<(), StoreError> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o700);

    builder
        .create(dir)
        .await
        .map_err(|source| StoreError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })
}

async fn write_temp(tmp: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(tmp).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "state".to_string());
    path.with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()))
}
