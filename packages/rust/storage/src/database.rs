//! Embedded libSQL document table.
//!
//! Each row keeps the lossless JSON body plus its SHA-256, so a row edited
//! outside the store reads back as corrupt instead of as a different document.

use std::path::Path;

use chrono::Utc;
use libsql::{Connection, Database, params};
use sha2::{Digest, Sha256};
use tracing::warn;

use topicpress_shared::{Document, DocumentId, Result, TopicPressError};

use crate::migrations;

/// Document store wrapping a local libSQL database.
pub struct LibsqlStore {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl LibsqlStore {
    /// Open or create a database at `path` and apply pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| TopicPressError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| TopicPressError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| TopicPressError::Storage(e.to_string()))?;

        let store = Self { db, conn };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        TopicPressError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 if no migrations have been applied.
    pub(crate) async fn schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => match rows.next().await {
                Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
                _ => 0,
            },
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    pub async fn save(&self, doc: &Document) -> Result<()> {
        let body = serde_json::to_string(doc)
            .map_err(|e| TopicPressError::Storage(format!("failed to encode {}: {e}", doc.id)))?;
        let hash = content_hash(&body);
        let id = doc.id.to_string();
        let saved_at = Utc::now().to_rfc3339();

        self.conn
            .execute(
                "INSERT INTO documents (id, title, topic, saved_at, body, sha256)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id.as_str(),
                    doc.title.as_str(),
                    doc.topic.as_str(),
                    saved_at.as_str(),
                    body.as_str(),
                    hash.as_str()
                ],
            )
            .await
            .map_err(|e| TopicPressError::Storage(format!("failed to insert {id}: {e}")))?;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Document> {
        let doc_id: DocumentId = id
            .parse()
            .map_err(|_| TopicPressError::not_found(id))?;
        let key = doc_id.to_string();

        let mut rows = self
            .conn
            .query(
                "SELECT body, sha256 FROM documents WHERE id = ?1",
                params![key.as_str()],
            )
            .await
            .map_err(|e| TopicPressError::Storage(e.to_string()))?;

        let row = rows
            .next()
            .await
            .map_err(|e| TopicPressError::Storage(e.to_string()))?
            .ok_or_else(|| TopicPressError::not_found(id))?;

        let body = row
            .get::<String>(0)
            .map_err(|e| TopicPressError::corrupt(id, e.to_string()))?;
        let hash = row
            .get::<String>(1)
            .map_err(|e| TopicPressError::corrupt(id, e.to_string()))?;
        decode(&key, &body, &hash)
    }

    pub async fn list(&self) -> Result<Vec<Document>> {
        let mut rows = self
            .conn
            .query("SELECT id, body, sha256 FROM documents ORDER BY id", params![])
            .await
            .map_err(|e| TopicPressError::Storage(e.to_string()))?;

        let mut docs = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| TopicPressError::Storage(e.to_string()))?
        {
            let id = row
                .get::<String>(0)
                .map_err(|e| TopicPressError::Storage(e.to_string()))?;
            let decoded = match (row.get::<String>(1), row.get::<String>(2)) {
                (Ok(body), Ok(hash)) => decode(&id, &body, &hash),
                (Err(e), _) | (_, Err(e)) => Err(TopicPressError::corrupt(&id, e.to_string())),
            };
            match decoded {
                Ok(doc) => docs.push(doc),
                Err(e) => warn!(%id, error = %e, "skipping unreadable document"),
            }
        }
        Ok(docs)
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn content_hash(body: &str) -> String {
    format!("{:x}", Sha256::digest(body.as_bytes()))
}

fn decode(id: &str, body: &str, hash: &str) -> Result<Document> {
    if content_hash(body) != hash {
        return Err(TopicPressError::corrupt(id, "content hash mismatch"));
    }
    let doc: Document =
        serde_json::from_str(body).map_err(|e| TopicPressError::corrupt(id, e.to_string()))?;
    if doc.id.to_string() != id {
        return Err(TopicPressError::corrupt(
            id,
            format!("row holds document {}", doc.id),
        ));
    }
    Ok(doc)
}
