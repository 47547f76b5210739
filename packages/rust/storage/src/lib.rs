//! Document store for generated articles.
//!
//! [`Store`] persists each [`Document`] exactly once under a key derived from
//! its id, and reads documents back individually or all at once. Two backends
//! are available, selected by [`StorageConfig::backend`]:
//! - [`FileStore`]: one JSON file per document (default)
//! - [`LibsqlStore`]: one row per document in an embedded libSQL database
//!
//! Records that exist but cannot be decoded are reported as
//! [`TopicPressError::CorruptRecord`] by `get` and skipped by `list`.

mod database;
mod files;
mod migrations;

use tracing::{info, instrument};

use topicpress_shared::{Document, Result, StorageBackend, StorageConfig};

pub use database::LibsqlStore;
pub use files::FileStore;

/// Primary storage handle.
pub enum Store {
    Files(FileStore),
    Libsql(LibsqlStore),
}

impl Store {
    /// Open the backend named by `config`.
    pub async fn open(config: &StorageConfig) -> Result<Self> {
        let store = match config.backend {
            StorageBackend::Files => Self::Files(FileStore::new(&config.path)),
            StorageBackend::Libsql => Self::Libsql(LibsqlStore::open(&config.path).await?),
        };
        info!(backend = ?config.backend, path = %config.path.display(), "document store ready");
        Ok(store)
    }

    /// Persist `doc`. Fails if a document with the same id already exists.
    #[instrument(skip_all, fields(id = %doc.id))]
    pub async fn save(&self, doc: &Document) -> Result<()> {
        match self {
            Self::Files(s) => s.save(doc).await?,
            Self::Libsql(s) => s.save(doc).await?,
        }
        info!(title = %doc.title, "document saved");
        Ok(())
    }

    /// Fetch one document by id.
    pub async fn get(&self, id: &str) -> Result<Document> {
        match self {
            Self::Files(s) => s.get(id).await,
            Self::Libsql(s) => s.get(id).await,
        }
    }

    /// All readable documents, ordered by id (creation order).
    pub async fn list(&self) -> Result<Vec<Document>> {
        match self {
            Self::Files(s) => s.list().await,
            Self::Libsql(s) => s.list().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use libsql::params;
    use std::path::PathBuf;
    use topicpress_shared::{ContentBlock, DocumentId, TopicPressError};
    use uuid::Uuid;

    fn temp_path(suffix: &str) -> PathBuf {
        std::env::temp_dir().join(format!("tp_test_{}{suffix}", Uuid::now_v7()))
    }

    fn sample_doc(title: &str) -> Document {
        Document {
            id: DocumentId::new(),
            title: title.into(),
            author: "AI Content Generator".into(),
            date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            summary: "A summary.".into(),
            content: vec![
                ContentBlock::heading(1, title),
                ContentBlock::paragraph("First paragraph."),
                ContentBlock::Image {
                    url: "https://img.example/a.jpg".into(),
                    alt: "alt".into(),
                    caption: "caption".into(),
                },
                ContentBlock::Quote {
                    text: "A quote.".into(),
                    citation: "Industry Expert".into(),
                },
                ContentBlock::List {
                    items: vec!["one".into(), "two".into()],
                    ordered: true,
                },
            ],
            featured_image: "https://img.example/f.jpg".into(),
            tags: vec!["Tides".into(), "News".into()],
            reading_time: 1,
            topic: "Tides".into(),
        }
    }

    async fn file_store() -> (Store, PathBuf) {
        let root = temp_path("");
        let config = StorageConfig {
            backend: StorageBackend::Files,
            path: root.clone(),
        };
        (Store::open(&config).await.expect("open file store"), root)
    }

    async fn libsql_store() -> Store {
        let config = StorageConfig {
            backend: StorageBackend::Libsql,
            path: temp_path(".db"),
        };
        Store::open(&config).await.expect("open libsql store")
    }

    async fn both_backends() -> Vec<Store> {
        vec![file_store().await.0, libsql_store().await]
    }

    #[tokio::test]
    async fn roundtrip_is_lossless() {
        for store in both_backends().await {
            let doc = sample_doc("Round trip");
            store.save(&doc).await.expect("save");
            let back = store.get(&doc.id.to_string()).await.expect("get");
            assert_eq!(back, doc);
        }
    }

    #[tokio::test]
    async fn missing_and_invalid_ids_are_not_found() {
        for store in both_backends().await {
            let missing = DocumentId::new().to_string();
            assert!(matches!(
                store.get(&missing).await,
                Err(TopicPressError::NotFound { .. })
            ));
            assert!(matches!(
                store.get("../../etc/passwd").await,
                Err(TopicPressError::NotFound { .. })
            ));
        }
    }

    #[tokio::test]
    async fn save_is_write_once() {
        for store in both_backends().await {
            let doc = sample_doc("Once");
            store.save(&doc).await.expect("first save");
            let mut changed = doc.clone();
            changed.title = "Twice".into();
            assert!(store.save(&changed).await.is_err());
            assert_eq!(store.get(&doc.id.to_string()).await.unwrap().title, "Once");
        }
    }

    #[tokio::test]
    async fn list_is_in_creation_order() {
        for store in both_backends().await {
            let docs: Vec<_> = ["a", "b", "c"].into_iter().map(sample_doc).collect();
            // Save out of order; listing is by id.
            for i in [2, 0, 1] {
                store.save(&docs[i]).await.expect("save");
            }
            let listed = store.list().await.expect("list");
            assert_eq!(listed, docs);
        }
    }

    #[tokio::test]
    async fn file_store_skips_corrupt_record() {
        let (store, root) = file_store().await;
        let d1 = sample_doc("d1");
        let d2 = sample_doc("d2");
        let d3 = sample_doc("d3");
        for d in [&d1, &d2, &d3] {
            store.save(d).await.expect("save");
        }

        std::fs::write(root.join(format!("{}.json", d2.id)), "{\"id\": truncated").unwrap();
        // Stray files are ignored.
        std::fs::write(root.join("notes.txt"), "hello").unwrap();

        let listed = store.list().await.expect("list");
        assert_eq!(listed, vec![d1, d3]);
        assert!(matches!(
            store.get(&d2.id.to_string()).await,
            Err(TopicPressError::CorruptRecord { .. })
        ));
    }

    #[tokio::test]
    async fn file_store_list_on_missing_root_is_empty() {
        let store = Store::Files(FileStore::new(temp_path("-absent")));
        assert!(store.list().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn file_store_leaves_no_temp_files() {
        let (store, root) = file_store().await;
        store.save(&sample_doc("clean")).await.expect("save");
        let names: Vec<String> = std::fs::read_dir(&root)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with(".json"));
    }

    #[tokio::test]
    async fn file_store_list_skips_unreadable_entry() {
        let (store, root) = file_store().await;
        let kept = sample_doc("kept");
        store.save(&kept).await.expect("save");

        // A directory wearing a record's name cannot be read as a file.
        std::fs::create_dir(root.join(format!("{}.json", DocumentId::new()))).unwrap();

        let listed = store.list().await.expect("list");
        assert_eq!(listed, vec![kept]);
    }

    #[tokio::test]
    async fn file_store_concurrent_saves_keep_first_writer() {
        let (store, root) = file_store().await;
        let doc = sample_doc("first");
        let mut rival = doc.clone();
        rival.title = "second".into();

        let (a, b) = tokio::join!(store.save(&doc), store.save(&rival));
        assert_eq!(
            [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(),
            1,
            "exactly one save of an id may succeed"
        );

        let stored = store.get(&doc.id.to_string()).await.expect("get");
        let winner = if a.is_ok() { "first" } else { "second" };
        assert_eq!(stored.title, winner);
        // Both temp files are cleaned up.
        assert_eq!(std::fs::read_dir(&root).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn libsql_store_skips_tampered_row() {
        let store = LibsqlStore::open(&temp_path(".db")).await.expect("open");
        let d1 = sample_doc("d1");
        let d2 = sample_doc("d2");
        let d3 = sample_doc("d3");
        for d in [&d1, &d2, &d3] {
            store.save(d).await.expect("save");
        }

        let key = d2.id.to_string();
        store
            .connection()
            .execute(
                "UPDATE documents SET body = '{\"broken\":' WHERE id = ?1",
                params![key.as_str()],
            )
            .await
            .expect("tamper");

        let listed = store.list().await.expect("list");
        assert_eq!(listed, vec![d1, d3]);
        assert!(matches!(
            store.get(&key).await,
            Err(TopicPressError::CorruptRecord { .. })
        ));
    }

    #[tokio::test]
    async fn libsql_migrations_are_idempotent() {
        let path = temp_path(".db");
        let first = LibsqlStore::open(&path).await.expect("first open");
        let doc = sample_doc("persisted");
        first.save(&doc).await.expect("save");
        drop(first);

        let second = LibsqlStore::open(&path).await.expect("second open");
        assert_eq!(second.schema_version().await, 2);
        assert_eq!(second.get(&doc.id.to_string()).await.expect("get"), doc);
    }
}
