//! Local cache of downloaded feed files.

use std::path::PathBuf;
use std::time::SystemTime;

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument, warn};

use dmis_common::DmisResult;

use crate::object_store::{RemoteObjectRef, RemoteStore};

/// File-name prefixes the sweep never deletes.
const PROTECTED_PREFIXES: [&str; 2] = ["test", "README"];

/// Local directory cache for remote feed files.
///
/// A cached file is named after the final segment of its object key, so a
/// key's daily timestamped name keeps cache entries distinct.
#[derive(Debug, Clone)]
pub struct WeatherCache {
    dir: PathBuf,
    retention_days: u64,
}

impl WeatherCache {
    pub fn new(dir: impl Into<PathBuf>, retention_days: u64) -> Self {
        Self {
            dir: dir.into(),
            retention_days,
        }
    }

    /// Local path a remote object maps to.
    pub fn local_path(&self, object: &RemoteObjectRef) -> PathBuf {
        self.dir.join(object.file_name())
    }

    /// Return a local copy of the object, downloading it on a cache miss.
    ///
    /// A hit returns the existing file untouched. A miss sweeps expired
    /// files first, then downloads to a `.partial` temp file and renames it
    /// into place so readers never observe a half-written file.
    #[instrument(skip(self, remote, object), fields(key = %object.key))]
    pub async fn ensure_local(
        &self,
        remote: &RemoteStore,
        object: &RemoteObjectRef,
    ) -> DmisResult<PathBuf> {
        let final_path = self.local_path(object);
        if final_path.exists() {
            info!(path = %final_path.display(), "Cache hit");
            return Ok(final_path);
        }

        fs::create_dir_all(&self.dir).await?;
        let swept = self.sweep(self.retention_days).await?;
        if swept > 0 {
            info!(count = swept, "Swept expired cache files");
        }

        let data = remote.get(&object.key).await?;
        let temp_path = self.dir.join(format!("{}.partial", object.file_name()));

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&data).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        // rename can fail across filesystems, fall back to copy+delete
        if fs::rename(&temp_path, &final_path).await.is_err() {
            fs::copy(&temp_path, &final_path).await?;
            fs::remove_file(&temp_path).await?;
        }

        info!(path = %final_path.display(), bytes = data.len(), "Downloaded feed file");
        Ok(final_path)
    }

    /// Delete cache files whose modification time is more than
    /// `max_age_days` old, counted in whole seconds. Names starting with a
    /// protected prefix survive, as do subdirectories. Returns the number
    /// of files removed.
    pub async fn sweep(&self, max_age_days: u64) -> DmisResult<usize> {
        let max_age_secs = max_age_days * 86_400;
        let now = SystemTime::now();
        let mut removed = 0;

        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if PROTECTED_PREFIXES.iter().any(|p| name.starts_with(p)) {
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(file = %name, error = %e, "Skipping unreadable cache entry");
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            let age_secs = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .map(|age| age.as_secs())
                .unwrap_or(0);

            if age_secs > max_age_secs {
                match fs::remove_file(entry.path()).await {
                    Ok(()) => {
                        info!(file = %name, age_secs, "Removed expired cache file");
                        removed += 1;
                    }
                    Err(e) => {
                        warn!(file = %name, error = %e, "Failed to remove cache file");
                    }
                }
            }
        }

        Ok(removed)
    }
}
