//! JSON file store.
//!
//! All articles live in one JSON array on disk:
//!
//! ```text
//! output_dir/
//! └── articles.json
//! ```
//!
//! Every save reads the current document, appends the new records and writes
//! the result to a sibling temp file that is then renamed over the original,
//! so a crash mid-write leaves the previous document intact. Saves within one
//! process are serialised by an async mutex.

use super::{ArticleStore, insert_new, newest_first};
use crate::error::StoreError;
use crate::models::{ArticleRecord, StoredArticle};
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{error, info, instrument};

pub const DEFAULT_FILE_NAME: &str = "articles.json";

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store at `{dir}/articles.json`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(DEFAULT_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    async fn read_document(&self) -> Result<Vec<StoredArticle>, StoreError> {
        match fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    async fn write_document(&self, articles: &[StoredArticle]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| self.io_error(e))?;
        }
        let json = serde_json::to_vec_pretty(articles)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json).await.map_err(|e| self.io_error(e))?;
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            error!(path = %self.path.display(), error = %e, "Failed to replace article file");
            let _ = fs::remove_file(&tmp).await;
            return Err(self.io_error(e));
        }
        Ok(())
    }
}

impl ArticleStore for JsonFileStore {
    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), batch = records.len()))]
    async fn save(&self, records: &[ArticleRecord]) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut articles = self.read_document().await?;
        let inserted = insert_new(&mut articles, records, Utc::now());
        if inserted > 0 {
            self.write_document(&articles).await?;
        }
        info!(inserted, skipped = records.len() - inserted, total = articles.len(), "Saved articles");
        Ok(inserted)
    }

    async fn load_all(&self) -> Result<Vec<StoredArticle>, StoreError> {
        Ok(newest_first(self.read_document().await?))
    }
}
