use std::path::{Path, PathBuf};

use anyhow::Context;
use rusqlite::{params, Connection};

use crate::config::Config;
use crate::query::Query;

/// Sqlite-backed copy of the history list.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

fn default_db_path() -> PathBuf {
    Config::get_config_dir().join("history.sqlite")
}

impl HistoryStore {
    pub fn open_default() -> anyhow::Result<Self> {
        Self::open(default_db_path())
    }

    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let store = HistoryStore { path: path.into() };
        store.init()?;
        Ok(store)
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> anyhow::Result<Connection> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("creating {}", dir.display()))?;
            }
        }
        Connection::open(&self.path).with_context(|| format!("opening {}", self.path.display()))
    }

    fn init(&self) -> anyhow::Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS history (
                position INTEGER PRIMARY KEY,
                query TEXT NOT NULL UNIQUE
            )",
            [],
        )?;
        Ok(())
    }

    /// Returns at most `limit` queries, most recent first. Rows that no longer
    /// parse as a query are skipped.
    pub fn load(&self, limit: usize) -> anyhow::Result<Vec<Query>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT query FROM history
             ORDER BY position ASC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map([limit as i64], |row| row.get::<_, String>(0))?;

        let mut queries = Vec::new();
        for row in rows {
            if let Some(query) = row.ok().as_deref().and_then(Query::parse) {
                if !queries.contains(&query) {
                    queries.push(query);
                }
            }
        }
        Ok(queries)
    }

    /// Rewrites the stored list, keeping the first `limit` entries.
    pub fn replace_all(&self, queries: &[Query], limit: usize) -> anyhow::Result<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM history", [])?;
        {
            let mut insert =
                tx.prepare("INSERT OR IGNORE INTO history (position, query) VALUES (?1, ?2)")?;
            for (position, query) in queries.iter().take(limit).enumerate() {
                insert.execute(params![position as i64, query.as_str()])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}
