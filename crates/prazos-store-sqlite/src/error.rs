//! Error type for `prazos-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] prazos_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A column held a value no domain type maps to.
  #[error("corrupt row {id}: {reason}")]
  Corrupt { id: String, reason: String },

  #[error("batch of {ops} operations exceeds the limit of {limit}")]
  BatchTooLarge { ops: usize, limit: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
