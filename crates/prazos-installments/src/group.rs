//! [`InstallmentGroupService`] — status, single-installment edits and group
//! deletion.
//!
//! Deletion is not atomic. A group is removed in independently committed
//! chunks and a failure part-way through is reported, not rolled back.

use std::{fmt, sync::Arc};

use chrono::Utc;
use prazos_core::{
  deadline::{Deadline, DeadlineStatus, InstallmentEditableFields},
  store::{BatchOp, DeadlineQuery, DeadlineStore},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::GroupError;

/// Default number of deletions per batch, leaving headroom under the store's
/// 500-operation cap.
pub const DELETE_CHUNK_SIZE: usize = 450;

fn default_delete_chunk_size() -> usize { DELETE_CHUNK_SIZE }

// ─── Settings ────────────────────────────────────────────────────────────────

/// Tunables for group maintenance, deserialised from the application config.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallmentSettings {
  #[serde(default = "default_delete_chunk_size")]
  pub delete_chunk_size: usize,
}

impl Default for InstallmentSettings {
  fn default() -> Self {
    Self { delete_chunk_size: DELETE_CHUNK_SIZE }
  }
}

// ─── Reports ─────────────────────────────────────────────────────────────────

/// Installment tally of one group; the parent is never counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GroupStatus {
  pub total:     usize,
  pub completed: usize,
  pub pending:   usize,
}

/// What a group deletion actually removed.
#[derive(Debug, Clone, Serialize)]
pub struct DeletionReport {
  pub group_id:  Uuid,
  /// Records found for the group, parent included.
  pub total:     usize,
  pub removed:   Vec<Uuid>,
  /// Records still present; empty when the deletion completed.
  pub remaining: Vec<Uuid>,
  /// The store error that stopped the deletion, if any.
  pub failure:   Option<String>,
}

impl DeletionReport {
  pub fn is_complete(&self) -> bool { self.remaining.is_empty() }
}

impl fmt::Display for DeletionReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} of {} removed", self.removed.len(), self.total)?;
    if !self.is_complete() {
      write!(f, ", retry remaining {}", self.remaining.len())?;
    }
    Ok(())
  }
}

// ─── Service ─────────────────────────────────────────────────────────────────

pub struct InstallmentGroupService<S> {
  store:    Arc<S>,
  settings: InstallmentSettings,
}

impl<S> InstallmentGroupService<S>
where
  S: DeadlineStore,
{
  pub fn new(store: Arc<S>) -> Self {
    Self::with_settings(store, InstallmentSettings::default())
  }

  pub fn with_settings(store: Arc<S>, settings: InstallmentSettings) -> Self {
    Self { store, settings }
  }

  /// Every record of the group, or `NotFound` if there is none.
  async fn members(&self, group_id: Uuid) -> Result<Vec<Deadline>, GroupError> {
    let docs = self
      .store
      .query(DeadlineQuery::group(group_id))
      .await
      .map_err(|e| GroupError::Store(Box::new(e)))?;
    if docs.is_empty() {
      return Err(GroupError::NotFound(group_id));
    }
    Ok(docs)
  }

  /// Count completed and pending installments, excluding the parent.
  pub async fn status(&self, group_id: Uuid) -> Result<GroupStatus, GroupError> {
    let docs = self.members(group_id).await?;
    let installments = docs.iter().filter(|d| d.is_installment());

    let mut status = GroupStatus { total: 0, completed: 0, pending: 0 };
    for d in installments {
      status.total += 1;
      match d.status {
        DeadlineStatus::Completed => status.completed += 1,
        DeadlineStatus::Pending => status.pending += 1,
      }
    }
    Ok(status)
  }

  /// Change the editable fields of one installment and return the result.
  ///
  /// Siblings and the parent are never touched. The group parent itself is
  /// not an installment and is refused, as is reopening a completed
  /// installment.
  pub async fn edit_installment(
    &self,
    installment_id: Uuid,
    changes: InstallmentEditableFields,
  ) -> Result<Deadline, GroupError> {
    let mut record = self
      .store
      .get(installment_id)
      .await
      .map_err(|e| GroupError::Store(Box::new(e)))?
      .ok_or(GroupError::NotFound(installment_id))?;

    if !record.is_installment() {
      return Err(GroupError::NotAnInstallment(installment_id));
    }
    record.check_edit(&changes)?;

    let now = Utc::now();
    let found = self
      .store
      .update_fields(installment_id, changes.clone(), now)
      .await
      .map_err(|e| GroupError::Store(Box::new(e)))?;
    if !found {
      return Err(GroupError::NotFound(installment_id));
    }

    record.apply(&changes, now);
    tracing::debug!(%installment_id, "edited installment");
    Ok(record)
  }

  /// Remove the parent and every installment of a group.
  ///
  /// Installments go first in index order and the parent goes last, so an
  /// interrupted deletion still leaves the group discoverable.
  pub async fn delete_group(
    &self,
    group_id: Uuid,
  ) -> Result<DeletionReport, GroupError> {
    let docs = self.members(group_id).await?;
    let total = docs.len();

    let (parents, mut order): (Vec<_>, Vec<_>) =
      docs.into_iter().partition(|d| d.is_group_parent());
    order.sort_by_key(|d| d.installment_index());
    let ids: Vec<Uuid> = order.iter().chain(&parents).map(|d| d.id).collect();

    let chunk_size = self
      .settings
      .delete_chunk_size
      .clamp(1, self.store.max_batch_writes().max(1));

    let mut removed = Vec::with_capacity(total);
    let mut failure = None;

    for chunk in ids.chunks(chunk_size) {
      let ops = chunk.iter().copied().map(BatchOp::Delete).collect();
      match self.store.batch_write(ops).await {
        Ok(()) => removed.extend_from_slice(chunk),
        Err(e) => {
          failure = Some(e.to_string());
          break;
        }
      }
    }

    let remaining = ids[removed.len()..].to_vec();
    let report = DeletionReport { group_id, total, removed, remaining, failure };

    if report.is_complete() {
      tracing::info!(%group_id, removed = report.removed.len(), "deleted installment group");
    } else {
      tracing::warn!(
        %group_id,
        removed = report.removed.len(),
        remaining = report.remaining.len(),
        error = report.failure.as_deref().unwrap_or_default(),
        "installment group only partially deleted"
      );
    }
    Ok(report)
  }
}
