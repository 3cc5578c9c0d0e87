//! SQL schema for the deadline SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// The CHECK constraints repeat the record invariants so rows written by
/// other tools cannot break them either.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS prazos (
    id                   TEXT PRIMARY KEY,
    title                TEXT NOT NULL,
    notes                TEXT,
    responsible_ids      TEXT NOT NULL,               -- JSON array
    client_ids           TEXT NOT NULL DEFAULT '[]',  -- JSON array
    case_ids             TEXT NOT NULL DEFAULT '[]',  -- JSON array
    opening_state        TEXT NOT NULL,               -- 'open' | 'awaiting_opening'
    due_on               TEXT,                        -- YYYY-MM-DD
    status               TEXT NOT NULL DEFAULT 'pending',
    is_recurring         INTEGER NOT NULL DEFAULT 0,
    recurrence_config    TEXT,                        -- JSON object
    installment_group_id TEXT,
    installment_index    INTEGER,                     -- 0 marks the group parent
    installment_total    INTEGER,
    created_at           TEXT NOT NULL,               -- RFC 3339 UTC
    updated_at           TEXT NOT NULL,               -- RFC 3339 UTC
    created_by           TEXT,
    CHECK ((opening_state = 'open') = (due_on IS NOT NULL)),
    CHECK ((is_recurring = 1) = (recurrence_config IS NOT NULL)),
    CHECK (is_recurring = 0 OR installment_group_id IS NULL),
    CHECK ((installment_group_id IS NULL) = (installment_total IS NULL)),
    CHECK ((installment_group_id IS NULL) = (installment_index IS NULL)),
    CHECK (installment_total IS NULL OR installment_total >= 2),
    CHECK (installment_index IS NULL OR installment_index BETWEEN 0 AND installment_total)
);

CREATE INDEX IF NOT EXISTS prazos_group_idx  ON prazos(installment_group_id);
CREATE INDEX IF NOT EXISTS prazos_status_idx ON prazos(status);

PRAGMA user_version = 1;
";
