//! SQLite-backed storage.
//! Best-effort key-value persistence for quizzes, the append-only result
//! history and the shared-image registry. Absence is a normal `None`/empty
//! result, never an error.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::info;
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{Quiz, ResultRecord};

pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating data dir {}", parent.display()))?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("opening database {}", path.display()))?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.initialize()?;
        info!("store opened at {}", path.display());
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(Connection::open_in_memory()?)),
        };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> Result<()> {
        let conn = self.lock();
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS quizzes (
                id TEXT PRIMARY KEY,
                document TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                quiz_id TEXT NOT NULL,
                quiz_title TEXT NOT NULL,
                name TEXT NOT NULL,
                score INTEGER NOT NULL,
                max_score INTEGER NOT NULL,
                taken_at TEXT NOT NULL,
                details TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_results_quiz_id ON results(quiz_id);

            CREATE TABLE IF NOT EXISTS image_registry (
                quiz_id TEXT NOT NULL,
                img_id TEXT NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (quiz_id, img_id)
            );
            ",
        )?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn save_quiz(&self, quiz: &Quiz) -> Result<()> {
        let document = serde_json::to_string(quiz)?;
        self.lock().execute(
            "INSERT INTO quizzes (id, document, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET document = ?2, updated_at = ?3",
            params![quiz.id, document, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn load_quiz(&self, id: &str) -> Result<Option<Quiz>> {
        let document: Option<String> = self
            .lock()
            .query_row(
                "SELECT document FROM quizzes WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        match document {
            Some(document) => Ok(Some(serde_json::from_str(&document)?)),
            None => Ok(None),
        }
    }

    pub fn list_quizzes(&self) -> Result<Vec<Quiz>> {
        let conn = self.lock();
        let mut stmt =
            conn.prepare("SELECT document FROM quizzes ORDER BY updated_at DESC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut quizzes = Vec::new();
        for document in rows {
            quizzes.push(serde_json::from_str(&document?)?);
        }
        Ok(quizzes)
    }

    pub fn delete_quiz(&self, id: &str) -> Result<()> {
        let conn = self.lock();
        conn.execute("DELETE FROM quizzes WHERE id = ?1", params![id])?;
        conn.execute(
            "DELETE FROM image_registry WHERE quiz_id = ?1",
            params![id],
        )?;
        Ok(())
    }

    /// Appends to the result history. Records are never edited afterwards.
    pub fn save_result(&self, record: &ResultRecord) -> Result<()> {
        let details = serde_json::to_string(&record.details)?;
        self.lock().execute(
            "INSERT INTO results (quiz_id, quiz_title, name, score, max_score, taken_at, details)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.quiz_id,
                record.quiz_title,
                record.name,
                record.score,
                record.max_score,
                record.date.to_rfc3339(),
                details,
            ],
        )?;
        Ok(())
    }

    /// Full history, newest first.
    pub fn result_history(&self) -> Result<Vec<ResultRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT quiz_id, quiz_title, name, score, max_score, taken_at, details
             FROM results ORDER BY taken_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, u32>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (quiz_id, quiz_title, name, score, max_score, taken_at, details) = row?;
            records.push(ResultRecord {
                name,
                quiz_id,
                quiz_title,
                score,
                max_score,
                date: DateTime::parse_from_rfc3339(&taken_at)?.with_timezone(&Utc),
                details: serde_json::from_str(&details)?,
            });
        }
        Ok(records)
    }

    /// Wholesale clear; the only mutation the history supports.
    pub fn clear_results(&self) -> Result<()> {
        self.lock().execute("DELETE FROM results", [])?;
        Ok(())
    }

    pub fn save_image_registry(
        &self,
        quiz_id: &str,
        registry: &HashMap<String, String>,
    ) -> Result<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        for (img_id, data) in registry {
            tx.execute(
                "INSERT INTO image_registry (quiz_id, img_id, data) VALUES (?1, ?2, ?3)
                 ON CONFLICT(quiz_id, img_id) DO UPDATE SET data = ?3",
                params![quiz_id, img_id, data],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn image_from_registry(&self, quiz_id: &str, img_id: &str) -> Result<Option<String>> {
        let data = self
            .lock()
            .query_row(
                "SELECT data FROM image_registry WHERE quiz_id = ?1 AND img_id = ?2",
                params![quiz_id, img_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(data)
    }
}
