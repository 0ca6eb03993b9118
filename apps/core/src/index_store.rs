use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::model::{Candidate, Page, UsageStat};
use crate::paging::{clamp_page_index, total_pages};
use crate::search::compare_by_usage;

const USAGE_ACTION: &str = "quick_select";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store lock poisoned")]
    Poisoned,
}

/// Source of candidates and sink of usage events for the overlay.
pub trait CandidateStore: Send + Sync {
    fn fetch_candidates(&self) -> Result<Vec<Candidate>, StoreError>;
    fn fetch_page(&self, page_index: usize, page_size: usize) -> Result<Page, StoreError>;
    fn record_usage(
        &self,
        candidate_id: i64,
        candidate_name: &str,
        query: Option<&str>,
    ) -> Result<(), StoreError>;
    fn fetch_stats(&self, limit: usize) -> Result<Vec<UsageStat>, StoreError>;
}

pub struct SqliteStore {
    db: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    pub fn open_file(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::with_connection(conn)
    }

    pub fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        ensure_schema(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    pub fn upsert_snippet(&self, candidate: &Candidate) -> Result<(), StoreError> {
        let tags_json = serde_json::to_string(&candidate.tags).unwrap_or_else(|_| "[]".into());
        self.lock()?.execute(
            "INSERT INTO snippets (id, name, content, tags, category) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET name=excluded.name, content=excluded.content,
                tags=excluded.tags, category=excluded.category",
            params![
                candidate.id,
                candidate.name,
                candidate.content,
                tags_json,
                candidate.category
            ],
        )?;
        Ok(())
    }

    pub fn get_snippet(&self, id: i64) -> Result<Option<Candidate>, StoreError> {
        let db = self.lock()?;
        let candidate = db
            .query_row(
                &format!("{CANDIDATE_SELECT} WHERE s.id = ?1 GROUP BY s.id"),
                params![id],
                candidate_from_row,
            )
            .optional()?;
        Ok(candidate)
    }

    pub fn snippet_count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM snippets", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }

    /// Inserts a usage row with an explicit timestamp.
    pub fn record_usage_at(
        &self,
        candidate_id: i64,
        candidate_name: &str,
        query: Option<&str>,
        used_at_ms: i64,
    ) -> Result<(), StoreError> {
        self.lock()?.execute(
            "INSERT INTO usage_logs (snippet_id, snippet_name, action, query, created_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![candidate_id, candidate_name, USAGE_ACTION, query, used_at_ms],
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.db.lock().map_err(|_| StoreError::Poisoned)
    }
}

const CANDIDATE_SELECT: &str = "SELECT s.id, s.name, s.content, s.tags, s.category,
        COUNT(u.id) AS usage_count, MAX(u.created_at_ms) AS last_used_at
     FROM snippets s
     LEFT JOIN usage_logs u ON u.snippet_id = s.id";

impl CandidateStore for SqliteStore {
    fn fetch_candidates(&self) -> Result<Vec<Candidate>, StoreError> {
        let db = self.lock()?;
        let mut stmt = db.prepare(&format!("{CANDIDATE_SELECT} GROUP BY s.id ORDER BY s.id ASC"))?;
        let rows = stmt.query_map([], candidate_from_row)?;
        let mut candidates = Vec::new();
        for row in rows {
            candidates.push(row?);
        }
        Ok(candidates)
    }

    fn fetch_page(&self, page_index: usize, page_size: usize) -> Result<Page, StoreError> {
        let total_count = self.snippet_count()?;
        let total_pages = total_pages(total_count, page_size);
        if total_pages == 0 {
            return Ok(Page::empty());
        }
        let page_index = clamp_page_index(page_index, total_pages);

        let db = self.lock()?;
        let mut stmt = db.prepare(&format!(
            "{CANDIDATE_SELECT} GROUP BY s.id
             ORDER BY usage_count DESC, COALESCE(last_used_at, 0) DESC, s.id ASC
             LIMIT ?1 OFFSET ?2"
        ))?;
        let rows = stmt.query_map(
            params![page_size as i64, (page_index * page_size) as i64],
            candidate_from_row,
        )?;
        let mut items = Vec::with_capacity(page_size);
        for row in rows {
            items.push(row?);
        }

        Ok(Page {
            items,
            page_index,
            total_pages,
            total_count,
        })
    }

    fn record_usage(
        &self,
        candidate_id: i64,
        candidate_name: &str,
        query: Option<&str>,
    ) -> Result<(), StoreError> {
        self.record_usage_at(candidate_id, candidate_name, query, now_epoch_ms())
    }

    fn fetch_stats(&self, limit: usize) -> Result<Vec<UsageStat>, StoreError> {
        let db = self.lock()?;
        let mut stmt = db.prepare(
            "SELECT s.name, COUNT(u.id) AS usage_count
             FROM usage_logs u
             INNER JOIN snippets s ON s.id = u.snippet_id
             GROUP BY u.snippet_id
             ORDER BY usage_count DESC, s.name ASC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(UsageStat {
                name: row.get(0)?,
                usage_count: row.get::<_, i64>(1)?.max(0) as u32,
            })
        })?;
        let mut stats = Vec::new();
        for row in rows {
            stats.push(row?);
        }
        Ok(stats)
    }
}

fn ensure_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS snippets (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            content TEXT NOT NULL,
            tags TEXT,
            category TEXT
         );
         CREATE TABLE IF NOT EXISTS usage_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            snippet_id INTEGER NOT NULL,
            snippet_name TEXT,
            action TEXT NOT NULL,
            query TEXT,
            created_at_ms INTEGER NOT NULL
         );
         CREATE INDEX IF NOT EXISTS usage_logs_snippet ON usage_logs (snippet_id);",
    )
}

fn candidate_from_row(row: &Row<'_>) -> Result<Candidate, rusqlite::Error> {
    let tags: Vec<String> = row
        .get::<_, Option<String>>(3)?
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default();
    let category = row
        .get::<_, Option<String>>(4)?
        .filter(|category| !category.trim().is_empty())
        .or_else(|| tags.first().cloned());

    Ok(Candidate {
        id: row.get(0)?,
        name: row.get(1)?,
        content: row.get(2)?,
        tags,
        category,
        usage_count: row.get::<_, i64>(5)?.max(0) as u32,
        last_used_at: row.get(6)?,
    })
}

/// Vec-backed store. The failure switches let callers exercise the overlay's
/// error paths without a real backend.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    candidates: Vec<Candidate>,
    usage: Vec<UsageRecord>,
    fail_fetch: bool,
    fail_usage: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRecord {
    pub candidate_id: i64,
    pub candidate_name: String,
    pub query: Option<String>,
}

impl MemoryStore {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                candidates,
                ..MemoryState::default()
            }),
        }
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_fetch = fail;
        }
    }

    pub fn set_fail_usage(&self, fail: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_usage = fail;
        }
    }

    pub fn usage_records(&self) -> Vec<UsageRecord> {
        self.state
            .lock()
            .map(|state| state.usage.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl CandidateStore for MemoryStore {
    fn fetch_candidates(&self) -> Result<Vec<Candidate>, StoreError> {
        let state = self.lock()?;
        if state.fail_fetch {
            return Err(StoreError::Unavailable("fetch disabled".into()));
        }
        Ok(state.candidates.clone())
    }

    fn fetch_page(&self, page_index: usize, page_size: usize) -> Result<Page, StoreError> {
        let mut ordered = self.fetch_candidates()?;
        ordered.sort_by(compare_by_usage);
        Ok(crate::paging::window(&ordered, page_index, page_size))
    }

    fn record_usage(
        &self,
        candidate_id: i64,
        candidate_name: &str,
        query: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.fail_usage {
            return Err(StoreError::Unavailable("usage log disabled".into()));
        }
        state.usage.push(UsageRecord {
            candidate_id,
            candidate_name: candidate_name.to_string(),
            query: query.map(str::to_string),
        });
        let now = now_epoch_ms();
        if let Some(candidate) = state.candidates.iter_mut().find(|c| c.id == candidate_id) {
            candidate.usage_count = candidate.usage_count.saturating_add(1);
            candidate.last_used_at = Some(now);
        }
        Ok(())
    }

    fn fetch_stats(&self, limit: usize) -> Result<Vec<UsageStat>, StoreError> {
        let mut used: Vec<Candidate> = self
            .fetch_candidates()?
            .into_iter()
            .filter(|candidate| candidate.usage_count > 0)
            .collect();
        used.sort_by(|a, b| b.usage_count.cmp(&a.usage_count).then_with(|| a.name.cmp(&b.name)));
        Ok(used
            .into_iter()
            .take(limit)
            .map(|candidate| UsageStat {
                name: candidate.name,
                usage_count: candidate.usage_count,
            })
            .collect())
    }
}

pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
