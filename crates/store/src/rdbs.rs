//! Relational store backend
//!
//! One `events` table in an embedded SQL database. `save` is an
//! `INSERT OR IGNORE`, so re-ingesting an id is a silent no-op. Time
//! bounds are pushed down as a `WHERE` clause; the regex parts of the
//! filter run in-process on the streamed rows.
//!
//! Extra headers have no column in the fixed schema and are not persisted
//! by this backend.

use async_trait::async_trait;
use tokio::sync::mpsc;
use turso::{Builder, Database, Value};

use theia_filter::{Filter, FilterSpec};
use theia_protocol::Event;

use crate::{EventStore, Result, SearchStream};

/// Search result channel depth
const SEARCH_BUFFER: usize = 64;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS events (
    id TEXT PRIMARY KEY,
    timestamp DOUBLE,
    source TEXT,
    tags TEXT,
    content TEXT
)";

const TIMESTAMP_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events (timestamp)";

/// The relational event store.
pub struct RdbsStore {
    db: Database,
}

impl RdbsStore {
    /// Open (or create) the database at `url`.
    ///
    /// `url` is a filesystem path or `:memory:`; an optional `sqlite://`
    /// prefix is accepted.
    pub async fn open(url: &str) -> Result<Self> {
        let path = url.strip_prefix("sqlite://").unwrap_or(url);
        let db = Builder::new_local(path).build().await?;

        let store = Self { db };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.db.connect()?;
        conn.execute(SCHEMA, ()).await?;
        conn.execute(TIMESTAMP_INDEX, ()).await?;
        Ok(())
    }
}

#[async_trait]
impl EventStore for RdbsStore {
    async fn save(&self, event: &Event) -> Result<()> {
        let conn = self.db.connect()?;
        conn.execute(
            "INSERT OR IGNORE INTO events (id, timestamp, source, tags, content)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            vec![
                Value::Text(event.id.clone()),
                Value::Real(event.timestamp),
                Value::Text(event.source.clone()),
                Value::Text(event.tags.join(",")),
                Value::Text(event.content.clone()),
            ],
        )
        .await?;
        Ok(())
    }

    async fn search(&self, spec: &FilterSpec) -> Result<SearchStream> {
        let filter = Filter::compile(spec)?;
        let conn = self.db.connect()?;
        let sql = search_sql(&filter);

        let (tx, rx) = mpsc::channel(SEARCH_BUFFER);
        tokio::spawn(async move {
            let mut rows = match conn.query(&sql, ()).await {
                Ok(rows) => rows,
                Err(e) => {
                    let _ = tx.send(Err(e.into())).await;
                    return;
                }
            };
            loop {
                match rows.next().await {
                    Ok(Some(row)) => {
                        let event = match row_to_event(&row) {
                            Ok(event) => event,
                            Err(e) => {
                                let _ = tx.send(Err(e)).await;
                                return;
                            }
                        };
                        if filter.matches(&event) && tx.send(Ok(event)).await.is_err() {
                            return;
                        }
                    }
                    Ok(None) => return,
                    Err(e) => {
                        let _ = tx.send(Err(e.into())).await;
                        return;
                    }
                }
            }
        });
        Ok(rx)
    }

    async fn close(&self) -> Result<()> {
        // Connections are opened per operation; nothing is held open here.
        Ok(())
    }
}

/// Build the row query for a compiled filter.
///
/// The predicate compares `floor(timestamp)` inclusively against the
/// bounds, so the upper bound widens to `< end + 1`; the full predicate
/// re-runs on every row, making the SQL window a pre-filter only.
fn search_sql(filter: &Filter) -> String {
    let mut sql = String::from("SELECT id, timestamp, source, tags, content FROM events");
    let mut clauses = Vec::new();
    if let Some(start) = filter.start() {
        clauses.push(format!("timestamp >= {start}"));
    }
    if let Some(end) = filter.end() {
        clauses.push(format!("timestamp < {}", end.saturating_add(1)));
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY timestamp");
    if filter.order().is_desc() {
        sql.push_str(" DESC");
    }
    sql
}

fn row_to_event(row: &turso::Row) -> Result<Event> {
    let id: String = row.get(0)?;
    let timestamp: f64 = row.get(1)?;
    let source: String = row.get(2)?;
    let tags: String = row.get(3)?;
    let content: String = row.get(4)?;

    Ok(Event {
        id,
        timestamp,
        source,
        tags: tags
            .split(',')
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        content,
        extras: Vec::new(),
    })
}

#[cfg(test)]
#[path = "rdbs_test.rs"]
mod tests;
