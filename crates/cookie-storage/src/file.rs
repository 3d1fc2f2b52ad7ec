//! File-backed snapshot store: one JSON document per user.

use crate::{CookieRecord, LocalCookieStore, StorageError, StorageResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use sync_config_and_utils::Paths;
use tracing::{debug, warn};

/// On-disk layout of one user's snapshot.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    user_id: String,
    saved_at: DateTime<Utc>,
    cookies: Vec<CookieRecord>,
}

/// Snapshot store writing `<dir>/<sha256(user_id)>.json`.
///
/// Writes go to a temporary sibling and are renamed into place, so readers
/// see either the previous snapshot or the new one.
#[derive(Debug, Clone)]
pub struct FileCookieStore {
    dir: PathBuf,
}

impl FileCookieStore {
    /// Store rooted at `dir`, created if missing.
    pub fn new(dir: PathBuf) -> StorageResult<Self> {
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Store rooted at the configured snapshot directory.
    pub fn from_paths(paths: &Paths) -> StorageResult<Self> {
        Self::new(paths.cookie_snapshots_dir())
    }

    fn snapshot_path(&self, user_id: &str) -> PathBuf {
        let digest = Sha256::digest(user_id.as_bytes());
        let name: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        self.dir.join(format!("{}.json", name))
    }
}

impl LocalCookieStore for FileCookieStore {
    fn get(&self, user_id: &str) -> StorageResult<Vec<CookieRecord>> {
        let path = self.snapshot_path(user_id);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let snapshot: SnapshotFile = serde_json::from_str(&content)
            .map_err(|e| StorageError::Encoding(e.to_string()))?;

        if snapshot.user_id != user_id {
            warn!(
                path = %path.display(),
                "Cookie snapshot belongs to a different user, ignoring"
            );
            return Ok(Vec::new());
        }

        debug!(
            user_id,
            count = snapshot.cookies.len(),
            saved_at = %snapshot.saved_at,
            "Loaded cookie snapshot"
        );
        Ok(snapshot.cookies)
    }

    fn set(&self, user_id: &str, cookies: &[CookieRecord]) -> StorageResult<()> {
        let snapshot = SnapshotFile {
            user_id: user_id.to_string(),
            saved_at: Utc::now(),
            cookies: cookies.to_vec(),
        };
        let content = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| StorageError::Encoding(e.to_string()))?;

        atomic_write(&self.snapshot_path(user_id), &content)?;
        debug!(user_id, count = cookies.len(), "Saved cookie snapshot");
        Ok(())
    }

    fn delete(&self, user_id: &str) -> StorageResult<bool> {
        match fs::remove_file(self.snapshot_path(user_id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn atomic_write(path: &Path, content: &str) -> io::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "snapshot path has no parent"))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "snapshot path has no file name"))?;

    let tmp_path = dir.join(format!(
        ".{}.tmp.{}",
        file_name,
        std::time::SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ));

    let result = (|| -> io::Result<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}
