//! One JSON file per document under a root directory.
//!
//! The key is `<root>/<id>.json`, derived only from the document id. Writes go
//! to a hidden temp file first and are hard-linked into place, so readers never
//! observe a partial document and an existing record is never replaced.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use topicpress_shared::{Document, DocumentId, Result, TopicPressError};

const EXTENSION: &str = "json";

/// Directory-backed document store.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root`. The directory is created on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the record for `id`.
    pub fn path_for(&self, id: DocumentId) -> PathBuf {
        self.root.join(format!("{id}.{EXTENSION}"))
    }

    pub async fn save(&self, doc: &Document) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| TopicPressError::io(&self.root, e))?;

        let path = self.path_for(doc.id);
        let json = serde_json::to_string_pretty(doc)
            .map_err(|e| TopicPressError::Storage(format!("failed to encode {}: {e}", doc.id)))?;

        // Unique per attempt so concurrent saves of one id never share a temp file.
        let tmp = self
            .root
            .join(format!(".{}.{}.tmp", doc.id, DocumentId::new()));
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| TopicPressError::io(&tmp, e))?;

        // `hard_link` fails if the target exists, which makes write-once atomic.
        let linked = tokio::fs::hard_link(&tmp, &path).await;
        let _ = tokio::fs::remove_file(&tmp).await;
        match linked {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(TopicPressError::Storage(format!(
                    "document {} already exists",
                    doc.id
                )));
            }
            Err(e) => return Err(TopicPressError::io(&path, e)),
        }

        debug!(path = %path.display(), "document written");
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Document> {
        // Anything that is not a document id cannot name a record.
        let doc_id: DocumentId = id
            .parse()
            .map_err(|_| TopicPressError::not_found(id))?;
        let path = self.path_for(doc_id);

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TopicPressError::not_found(id));
            }
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                return Err(TopicPressError::corrupt(id, "record is not valid UTF-8"));
            }
            Err(e) => return Err(TopicPressError::io(&path, e)),
        };

        let doc: Document =
            serde_json::from_str(&content).map_err(|e| TopicPressError::corrupt(id, e.to_string()))?;
        if doc.id != doc_id {
            return Err(TopicPressError::corrupt(
                id,
                format!("record holds document {}", doc.id),
            ));
        }
        Ok(doc)
    }

    pub async fn list(&self) -> Result<Vec<Document>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(TopicPressError::io(&self.root, e)),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| TopicPressError::io(&self.root, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<DocumentId>().ok())
            else {
                continue;
            };
            ids.push(id);
        }
        ids.sort();

        let mut docs = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get(&id.to_string()).await {
                Ok(doc) => docs.push(doc),
                // One bad entry must not hide the rest.
                Err(e) => warn!(%id, error = %e, "skipping unreadable document"),
            }
        }
        Ok(docs)
    }
}
