//! The `DeadlineStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `prazos-store-sqlite`).
//! The installment services depend on this abstraction, not on any concrete
//! backend. All deadlines live side by side in one flat collection.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::deadline::{Deadline, DeadlineStatus, InstallmentEditableFields};

/// Name of the single collection holding every deadline.
pub const COLLECTION: &str = "prazos";

/// Hard cap on the number of operations in one [`DeadlineStore::batch_write`].
pub const MAX_BATCH_WRITES: usize = 500;

// ─── Query type ──────────────────────────────────────────────────────────────

/// Field-equality filters for [`DeadlineStore::query`]; all set filters must
/// match.
#[derive(Debug, Clone, Default)]
pub struct DeadlineQuery {
  pub installment_group_id: Option<Uuid>,
  pub status:               Option<DeadlineStatus>,
  pub limit:                Option<usize>,
}

impl DeadlineQuery {
  /// Every record (parent and installments) of one group.
  pub fn group(group_id: Uuid) -> Self {
    Self { installment_group_id: Some(group_id), ..Default::default() }
  }
}

// ─── Batch operations ────────────────────────────────────────────────────────

/// One write inside an atomic batch.
#[derive(Debug, Clone)]
pub enum BatchOp {
  /// Create a new document under its pre-allocated id.
  Insert(Deadline),
  /// Remove a document; removing an absent id is not an error.
  Delete(Uuid),
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the hosted document store holding deadlines.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait DeadlineStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Largest number of operations accepted by one batch.
  fn max_batch_writes(&self) -> usize { MAX_BATCH_WRITES }

  /// Retrieve a deadline by id. Returns `None` if not found.
  fn get(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Deadline>, Self::Error>> + Send + '_;

  /// Return every deadline matching all filters in `query`.
  fn query(
    &self,
    query: DeadlineQuery,
  ) -> impl Future<Output = Result<Vec<Deadline>, Self::Error>> + Send + '_;

  /// Apply every operation or none of them.
  ///
  /// Fails without touching storage when `ops` holds more than
  /// [`max_batch_writes`](Self::max_batch_writes) operations.
  fn batch_write(
    &self,
    ops: Vec<BatchOp>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Overwrite only the fields set in `changes`, plus `updated_at`.
  ///
  /// Returns `false` if no deadline has this id.
  fn update_fields(
    &self,
    id: Uuid,
    changes: InstallmentEditableFields,
    updated_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Remove one deadline. Returns `false` if it did not exist.
  fn delete(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
