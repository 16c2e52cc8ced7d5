//! Compare-value cache
//!
//! Remembers the last compare value fetched for an invocation so that a
//! failed fetch on a later run can fall back to it:
//! - One JSON file per argument signature (md5 of the space-joined args)
//! - Full overwrite on every save, written through a temp file and rename
//! - A missing file is "no data", an unparsable one is an error

use crate::error::CacheError;
use crate::value::MetaValue;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory below the plugin working directory that holds cache files
pub const CACHE_DIR: &str = "check-meta";

/// Environment variable the agent uses to hand plugins a working directory
pub const WORK_DIR_ENV: &str = "MACKEREL_PLUGIN_WORKDIR";

/// Persisted compare value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Arguments of the invocation that wrote the record
    #[serde(default)]
    pub options: Vec<String>,
    /// Last compare value fetched successfully
    #[serde(default)]
    pub expected: MetaValue,
    /// Unix seconds of the last write (absent in older files)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl CacheRecord {
    pub fn new(options: Vec<String>, expected: MetaValue) -> Self {
        Self {
            options,
            expected,
            updated_at: None,
        }
    }
}

/// Working directory for plugin state
pub fn plugin_work_dir() -> PathBuf {
    match std::env::var(WORK_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => std::env::temp_dir(),
    }
}

/// Cache file path for an argument list
pub fn cache_file(work_dir: &Path, args: &[String]) -> PathBuf {
    let digest = Md5::digest(args.join(" ").as_bytes());
    work_dir
        .join(CACHE_DIR)
        .join(format!("check-meta-{}.json", hex::encode(digest)))
}

/// Load the record stored at `path`, `None` if nothing was cached yet
pub fn load_cache(path: &Path) -> Result<Option<CacheRecord>, CacheError> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "No cache file");
            return Ok(None);
        }
        Err(e) => {
            return Err(CacheError::Read {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    let record: CacheRecord = serde_json::from_slice(&data).map_err(CacheError::Corrupt)?;
    debug!(path = %path.display(), updated_at = ?record.updated_at, "Loaded cache");
    Ok(Some(record))
}

/// Stamp `record` with the current time and write it to `path`
///
/// The previous record, if any, is replaced as a whole. Readers never see a
/// partially written file. Returns the record as written.
pub fn save_cache(path: &Path, mut record: CacheRecord) -> Result<CacheRecord, CacheError> {
    record.updated_at = Some(chrono::Utc::now().timestamp());
    let json = serde_json::to_vec(&record).map_err(CacheError::Serialize)?;

    let write_err = |source: std::io::Error| CacheError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }

    // Per-process temp name so concurrent runs never share one
    let temp_path = path.with_extension(format!("json.{}.tmp", std::process::id()));
    let written = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .and_then(|mut file| {
            file.write_all(&json)?;
            file.sync_all()
        })
        .and_then(|_| std::fs::rename(&temp_path, path));

    if let Err(e) = written {
        let _ = std::fs::remove_file(&temp_path);
        return Err(write_err(e));
    }

    debug!(path = %path.display(), "Saved cache");
    Ok(record)
}
