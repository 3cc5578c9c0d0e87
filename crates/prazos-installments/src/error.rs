//! Error types for the installment services.

use prazos_core::ValidationError;
use thiserror::Error;
use uuid::Uuid;

type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Why a group could not be generated.
///
/// None of these leave records behind: validation and size checks run before
/// any I/O and the only write is a single atomic batch.
#[derive(Debug, Error)]
pub enum GenerationError {
  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error("plan needs {writes} writes but one batch allows at most {limit}")]
  PlanTooLarge { writes: usize, limit: usize },

  #[error("record invariant violated: {0}")]
  Record(#[from] prazos_core::Error),

  /// The store rejected the batch; nothing was written and the plan may be
  /// resubmitted as-is.
  #[error("generating group {group_id} failed: {source}")]
  GenerationFailed {
    group_id: Uuid,
    #[source]
    source:   StoreError,
  },
}

/// Errors from status queries, installment edits and group deletion.
#[derive(Debug, Error)]
pub enum GroupError {
  #[error("not found: {0}")]
  NotFound(Uuid),

  #[error("deadline {0} is not an installment")]
  NotAnInstallment(Uuid),

  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error("store error: {0}")]
  Store(#[source] StoreError),
}
