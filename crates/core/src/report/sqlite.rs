use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::sink::{RecordedResult, ResultSink, SinkError};
use crate::campaign::{TaskStatus, UploadResult};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS upload_results (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        batch_id TEXT NOT NULL,
        row_id INTEGER NOT NULL,
        status TEXT NOT NULL,
        detail TEXT NOT NULL,
        recorded_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_upload_results_batch_id ON upload_results(batch_id);
    CREATE INDEX IF NOT EXISTS idx_upload_results_recorded_at ON upload_results(recorded_at);
"#;

/// SQLite-backed result sink
pub struct SqliteResultSink {
    conn: Mutex<Connection>,
}

impl SqliteResultSink {
    /// Open the database file, creating it and its tables if needed
    pub fn new(path: &Path) -> Result<Self, SinkError> {
        let conn = Connection::open(path).map_err(|e| SinkError::Database(e.to_string()))?;
        Self::with_connection(conn)
    }

    /// In-memory database (useful for testing)
    pub fn in_memory() -> Result<Self, SinkError> {
        let conn = Connection::open_in_memory().map_err(|e| SinkError::Database(e.to_string()))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, SinkError> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| SinkError::Database(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SinkError> {
        self.conn
            .lock()
            .map_err(|_| SinkError::Database("connection lock poisoned".to_string()))
    }

    /// Most recent results first.
    pub fn recent(&self, limit: u32) -> Result<Vec<RecordedResult>, SinkError> {
        self.query(
            "SELECT id, batch_id, row_id, status, detail, recorded_at FROM upload_results \
             ORDER BY id DESC LIMIT ?",
            params![limit],
        )
    }

    /// Results of one batch in row order.
    pub fn batch(&self, batch_id: &str) -> Result<Vec<RecordedResult>, SinkError> {
        self.query(
            "SELECT id, batch_id, row_id, status, detail, recorded_at FROM upload_results \
             WHERE batch_id = ? ORDER BY row_id ASC",
            params![batch_id],
        )
    }

    fn query(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<RecordedResult>, SinkError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| SinkError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params, |row| {
                let id: i64 = row.get(0)?;
                let batch_id: String = row.get(1)?;
                let row_id: u32 = row.get(2)?;
                let status: String = row.get(3)?;
                let detail: String = row.get(4)?;
                let recorded_at: String = row.get(5)?;
                Ok((id, batch_id, row_id, status, detail, recorded_at))
            })
            .map_err(|e| SinkError::Database(e.to_string()))?;

        let mut results = Vec::new();
        for row in rows {
            let (id, batch_id, row_id, status, detail, recorded_at) =
                row.map_err(|e| SinkError::Database(e.to_string()))?;

            let status = match status.as_str() {
                "SUCCESS" => TaskStatus::Success,
                "FAILED" => TaskStatus::Failed,
                other => {
                    return Err(SinkError::Database(format!("Invalid status: {}", other)));
                }
            };
            let recorded_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&recorded_at)
                .map_err(|e| SinkError::Database(format!("Invalid timestamp: {}", e)))?
                .into();

            results.push(RecordedResult {
                id,
                batch_id,
                row_id,
                status,
                detail,
                recorded_at,
            });
        }
        Ok(results)
    }
}

#[async_trait]
impl ResultSink for SqliteResultSink {
    async fn record(&self, batch_id: &str, results: &[UploadResult]) -> Result<(), SinkError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| SinkError::Database(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        for result in results {
            tx.execute(
                "INSERT INTO upload_results (batch_id, row_id, status, detail, recorded_at) \
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    batch_id,
                    result.row_id,
                    result.status.as_str(),
                    result.detail,
                    now
                ],
            )
            .map_err(|e| SinkError::Database(e.to_string()))?;
        }

        tx.commit().map_err(|e| SinkError::Database(e.to_string()))
    }
}
