//! [`SqliteStore`] — the SQLite implementation of [`DeadlineStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use prazos_core::{
  deadline::{Deadline, InstallmentEditableFields},
  store::{BatchOp, DeadlineQuery, DeadlineStore, MAX_BATCH_WRITES},
};

use crate::{
  Error, Result,
  encode::{
    COLUMNS, RawDeadline, encode_date, encode_dt, encode_ids, encode_status,
    encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A deadline store backed by a single SQLite file.
///
/// Clones share the inner connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn:      tokio_rusqlite::Connection,
  max_batch: usize,
}

/// A batch operation with its row already encoded.
enum EncodedOp {
  Insert(RawDeadline),
  Delete(String),
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, max_batch: MAX_BATCH_WRITES };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, max_batch: MAX_BATCH_WRITES };
    store.init_schema().await?;
    Ok(store)
  }

  /// Lower the per-batch operation cap, e.g. to mirror a stricter hosted
  /// backend. Values above [`MAX_BATCH_WRITES`] are clamped.
  pub fn with_max_batch_writes(mut self, limit: usize) -> Self {
    self.max_batch = limit.clamp(1, MAX_BATCH_WRITES);
    self
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── DeadlineStore impl ──────────────────────────────────────────────────────

impl DeadlineStore for SqliteStore {
  type Error = Error;

  fn max_batch_writes(&self) -> usize { self.max_batch }

  async fn get(&self, id: Uuid) -> Result<Option<Deadline>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawDeadline> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {COLUMNS} FROM prazos WHERE id = ?1"),
              rusqlite::params![id_str],
              RawDeadline::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDeadline::into_deadline).transpose()
  }

  async fn query(&self, query: DeadlineQuery) -> Result<Vec<Deadline>> {
    let group_str = query.installment_group_id.map(encode_uuid);
    let status_str = query.status.map(encode_status);
    let limit_val = query.limit.map_or(-1, |l| l as i64);

    let raws: Vec<RawDeadline> = self
      .conn
      .call(move |conn| {
        // Build WHERE clause dynamically.
        let mut conds: Vec<&'static str> = vec![];
        if group_str.is_some() {
          conds.push("installment_group_id = ?1");
        }
        if status_str.is_some() {
          conds.push("status = ?2");
        }

        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };

        let sql = format!(
          "SELECT {COLUMNS} FROM prazos
           {where_clause}
           ORDER BY installment_index, due_on, id
           LIMIT ?3"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![group_str.as_deref(), status_str, limit_val],
            RawDeadline::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDeadline::into_deadline).collect()
  }

  async fn batch_write(&self, ops: Vec<BatchOp>) -> Result<()> {
    if ops.len() > self.max_batch {
      return Err(Error::BatchTooLarge {
        ops:   ops.len(),
        limit: self.max_batch,
      });
    }

    let encoded = ops
      .iter()
      .map(|op| {
        Ok(match op {
          BatchOp::Insert(d) => EncodedOp::Insert(RawDeadline::encode(d)?),
          BatchOp::Delete(id) => EncodedOp::Delete(encode_uuid(*id)),
        })
      })
      .collect::<Result<Vec<_>>>()?;
    let count = encoded.len();

    self
      .conn
      .call(move |conn| {
        // Dropping the transaction on an early return rolls it back.
        let tx = conn.transaction()?;
        for op in &encoded {
          match op {
            EncodedOp::Insert(raw) => raw.insert(&tx)?,
            EncodedOp::Delete(id) => {
              tx.execute("DELETE FROM prazos WHERE id = ?1", rusqlite::params![id])?;
            }
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::debug!(ops = count, "committed batch");
    Ok(())
  }

  async fn update_fields(
    &self,
    id:         Uuid,
    changes:    InstallmentEditableFields,
    updated_at: DateTime<Utc>,
  ) -> Result<bool> {
    let id_str         = encode_uuid(id);
    let updated_at_str = encode_dt(updated_at);
    let responsible    = changes.responsible_ids.as_ref().map(encode_ids).transpose()?;
    let clients        = changes.client_ids.as_ref().map(encode_ids).transpose()?;
    let cases          = changes.case_ids.as_ref().map(encode_ids).transpose()?;
    let due_on         = changes.due_on.map(encode_date);
    let status         = changes.status.map(encode_status);
    let title          = changes.title;
    let notes          = changes.notes;

    let found = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let exists = tx
          .query_row(
            "SELECT 1 FROM prazos WHERE id = ?1",
            rusqlite::params![id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !exists {
          return Ok(false);
        }

        let set = |column: &str, value: &dyn rusqlite::ToSql| {
          tx.execute(
            &format!("UPDATE prazos SET {column} = ?1 WHERE id = ?2"),
            rusqlite::params![value, id_str],
          )
          .map(|_| ())
        };

        if let Some(v) = &title {
          set("title", v)?;
        }
        if let Some(v) = &notes {
          set("notes", v)?;
        }
        if let Some(v) = &responsible {
          set("responsible_ids", v)?;
        }
        if let Some(v) = &clients {
          set("client_ids", v)?;
        }
        if let Some(v) = &cases {
          set("case_ids", v)?;
        }
        if let Some(v) = &due_on {
          // One statement, so the opening-state CHECK never sees a half
          // applied row.
          tx.execute(
            "UPDATE prazos SET due_on = ?1, opening_state = 'open' WHERE id = ?2",
            rusqlite::params![v, id_str],
          )?;
        }
        if let Some(v) = &status {
          set("status", v)?;
        }
        set("updated_at", &updated_at_str)?;

        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(found)
  }

  async fn delete(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM prazos WHERE id = ?1", rusqlite::params![id_str])?)
      })
      .await?;

    Ok(removed > 0)
  }
}
