// SQLite persistence for the item catalog, participants, and draft record.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::catalog::Item;
use crate::draft::state::DraftRecord;
use crate::registry::Participant;

/// SQLite-backed persistence for the three record families the engine
/// mutates: items keyed by normalized id, participants keyed by participant
/// id (JSON values), and a singleton draft record in a key-value table.
pub struct Database {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS items (
                id           TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                taken        INTEGER NOT NULL DEFAULT 0,
                sort_key     INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS participants (
                id    TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS draft_state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Initialization epoch
    // ------------------------------------------------------------------

    /// Key under which the singleton draft record is stored.
    const DRAFT_RECORD_KEY: &'static str = "draft_record";

    /// Key under which the draft session id is stored.
    const DRAFT_ID_KEY: &'static str = "draft_id";

    /// Seed the catalog and draft record in one transaction. This is the
    /// single point that creates the initialization epoch: callers must
    /// check [`Database::load_draft_record`] first and refuse to re-seed a
    /// database that already holds one.
    pub fn initialize(
        &self,
        items: &[Item],
        record: &DraftRecord,
        draft_id: &str,
    ) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .context("failed to begin initialization transaction")?;

        for (sort_key, item) in items.iter().enumerate() {
            tx.execute(
                "INSERT INTO items (id, display_name, taken, sort_key)
                 VALUES (?1, ?2, ?3, ?4)",
                params![item.id, item.display_name, item.taken, sort_key as i64],
            )
            .context("failed to insert catalog item")?;
        }

        let record_json =
            serde_json::to_string(record).context("failed to serialize draft record")?;
        tx.execute(
            "INSERT INTO draft_state (key, value) VALUES (?1, ?2)",
            params![Self::DRAFT_RECORD_KEY, record_json],
        )
        .context("failed to store draft record")?;

        tx.execute(
            "INSERT INTO draft_state (key, value) VALUES (?1, ?2)",
            params![Self::DRAFT_ID_KEY, serde_json::Value::String(draft_id.to_string()).to_string()],
        )
        .context("failed to store draft id")?;

        tx.commit().context("failed to commit initialization")
    }

    /// Retrieve the stored draft session id, if any.
    pub fn load_draft_id(&self) -> Result<Option<String>> {
        let value = self.load_state(Self::DRAFT_ID_KEY)?;
        Ok(value.and_then(|v| v.as_str().map(|s| s.to_string())))
    }

    /// Generate a new draft session id from the current UTC timestamp.
    ///
    /// Format: `draft_YYYYMMDD_HHMMSS_SSS`. The millisecond suffix keeps ids
    /// unique even if two sessions start in the same second.
    pub fn generate_draft_id() -> String {
        chrono::Utc::now().format("draft_%Y%m%d_%H%M%S_%3f").to_string()
    }

    // ------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------

    /// Load all catalog items in their original list order.
    pub fn load_items(&self) -> Result<Vec<Item>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT id, display_name, taken FROM items ORDER BY sort_key")
            .context("failed to prepare load_items query")?;

        let items = stmt
            .query_map([], |row| {
                Ok(Item {
                    id: row.get(0)?,
                    display_name: row.get(1)?,
                    taken: row.get(2)?,
                })
            })
            .context("failed to query items")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map item rows")?;

        Ok(items)
    }

    // ------------------------------------------------------------------
    // Participants
    // ------------------------------------------------------------------

    /// Persist a participant record, overwriting any previous value. The
    /// upsert keeps the original row so `load_participants` still returns
    /// registration order after updates.
    pub fn save_participant(&self, participant: &Participant) -> Result<()> {
        let conn = self.conn();
        Self::write_participant(&conn, participant)
    }

    fn write_participant(conn: &Connection, participant: &Participant) -> Result<()> {
        let json = serde_json::to_string(participant)
            .context("failed to serialize participant")?;
        conn.execute(
            "INSERT INTO participants (id, value) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET value = excluded.value",
            params![participant.id, json],
        )
        .context("failed to save participant")?;
        Ok(())
    }

    /// Load all participant records in registration (insertion) order.
    pub fn load_participants(&self) -> Result<Vec<Participant>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT value FROM participants ORDER BY rowid")
            .context("failed to prepare load_participants query")?;

        let participants = stmt
            .query_map([], |row| {
                let json: String = row.get(0)?;
                Ok(json)
            })
            .context("failed to query participants")?
            .collect::<std::result::Result<Vec<String>, _>>()
            .context("failed to read participant rows")?
            .into_iter()
            .map(|json| {
                serde_json::from_str(&json).context("failed to deserialize participant")
            })
            .collect::<Result<Vec<Participant>>>()?;

        Ok(participants)
    }

    // ------------------------------------------------------------------
    // Draft record (key-value)
    // ------------------------------------------------------------------

    /// Persist an arbitrary JSON value under `key`. Uses INSERT OR REPLACE
    /// so repeated saves overwrite the previous value.
    pub fn save_state(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let conn = self.conn();
        let json = serde_json::to_string(value).context("failed to serialize state value")?;
        conn.execute(
            "INSERT OR REPLACE INTO draft_state (key, value) VALUES (?1, ?2)",
            params![key, json],
        )
        .context("failed to save state")?;
        Ok(())
    }

    /// Load a previously saved JSON value by `key`. Returns `None` if the
    /// key does not exist.
    pub fn load_state(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT value FROM draft_state WHERE key = ?1")
            .context("failed to prepare load_state query")?;

        let mut rows = stmt
            .query_map(params![key], |row| {
                let json: String = row.get(0)?;
                Ok(json)
            })
            .context("failed to query draft state")?;

        match rows.next() {
            Some(row) => {
                let json = row.context("failed to read state row")?;
                let value =
                    serde_json::from_str(&json).context("failed to deserialize state value")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    pub fn save_draft_record(&self, record: &DraftRecord) -> Result<()> {
        let value =
            serde_json::to_value(record).context("failed to serialize draft record")?;
        self.save_state(Self::DRAFT_RECORD_KEY, &value)
    }

    pub fn load_draft_record(&self) -> Result<Option<DraftRecord>> {
        match self.load_state(Self::DRAFT_RECORD_KEY)? {
            Some(value) => {
                let record = serde_json::from_value(value)
                    .context("failed to deserialize draft record")?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    // ------------------------------------------------------------------
    // Atomic pick commit
    // ------------------------------------------------------------------

    /// Durably commit a pick: mark the item taken, rewrite every mutated
    /// participant, and replace the draft record, all in one transaction,
    /// so a crash can never leave a half-applied pick behind.
    pub fn commit_pick(
        &self,
        item_id: &str,
        mutated: &[Participant],
        record: &DraftRecord,
    ) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .context("failed to begin pick transaction")?;

        let updated = tx
            .execute("UPDATE items SET taken = 1 WHERE id = ?1", params![item_id])
            .context("failed to mark item taken")?;
        if updated != 1 {
            anyhow::bail!("item '{item_id}' not found while committing pick");
        }

        for participant in mutated {
            Self::write_participant(&tx, participant)?;
        }

        let record_json =
            serde_json::to_string(record).context("failed to serialize draft record")?;
        tx.execute(
            "INSERT OR REPLACE INTO draft_state (key, value) VALUES (?1, ?2)",
            params![Self::DRAFT_RECORD_KEY, record_json],
        )
        .context("failed to save draft record in pick transaction")?;

        tx.commit().context("failed to commit pick")
    }
}
