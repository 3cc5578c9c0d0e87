//! [`InstallmentGenerator`] — turns a validated plan into one atomic batch.
//!
//! A group is a parent record (metadata anchor, index 0) followed by `count`
//! installments, all sharing one fresh group id. Building the records is pure;
//! the batch commit is the only I/O and is all-or-nothing.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use prazos_core::{
  deadline::{Deadline, Membership, NewDeadline, Schedule},
  plan::ValidatedPlan,
  recurrence::schedule,
  store::{BatchOp, DeadlineStore},
};
use serde::Serialize;
use uuid::Uuid;

use crate::GenerationError;

/// Outcome of a successful generation.
#[derive(Debug, Clone, Serialize)]
pub struct GroupResult {
  pub group_id:        Uuid,
  pub parent_id:       Uuid,
  /// Installment ids ordered by index.
  pub installment_ids: Vec<Uuid>,
  /// Due dates, aligned with `installment_ids`.
  pub due_dates:       Vec<NaiveDate>,
}

pub struct InstallmentGenerator<S> {
  store: Arc<S>,
}

impl<S> InstallmentGenerator<S>
where
  S: DeadlineStore,
{
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Generate a group under a freshly allocated id.
  pub async fn generate(
    &self,
    plan: ValidatedPlan,
  ) -> Result<GroupResult, GenerationError> {
    self.generate_with_group_id(plan, Uuid::new_v4()).await
  }

  /// Generate a group under a caller-supplied id.
  ///
  /// Retrying with the same plan and a new id creates a second, independent
  /// group; nothing is deduplicated.
  pub async fn generate_with_group_id(
    &self,
    plan: ValidatedPlan,
    group_id: Uuid,
  ) -> Result<GroupResult, GenerationError> {
    let writes = plan.count() as usize + 1;
    let limit = self.store.max_batch_writes();
    if writes > limit {
      tracing::warn!(%group_id, writes, limit, "installment plan exceeds batch limit");
      return Err(GenerationError::PlanTooLarge { writes, limit });
    }

    let records = build_group(&plan, group_id, Utc::now())?;

    let result = GroupResult {
      group_id,
      parent_id: records[0].id,
      installment_ids: records[1..].iter().map(|d| d.id).collect(),
      due_dates: records[1..]
        .iter()
        .filter_map(|d| d.schedule.due_on())
        .collect(),
    };

    let ops = records.into_iter().map(BatchOp::Insert).collect();
    self.store.batch_write(ops).await.map_err(|e| {
      tracing::warn!(%group_id, error = %e, "installment batch rejected");
      GenerationError::GenerationFailed { group_id, source: Box::new(e) }
    })?;

    tracing::info!(
      %group_id,
      installments = result.installment_ids.len(),
      "generated installment group"
    );
    Ok(result)
  }
}

/// Build the parent followed by every installment, in index order.
///
/// The first installment falls on the start date itself; each later one is
/// one interval step after its predecessor.
pub fn build_group(
  plan: &ValidatedPlan,
  group_id: Uuid,
  now: DateTime<Utc>,
) -> Result<Vec<Deadline>, GenerationError> {
  let count = plan.count();
  let dates = schedule(plan.start_date(), plan.interval(), count as usize)?;
  let base = plan.base();

  let mut records = Vec::with_capacity(dates.len() + 1);

  let parent = NewDeadline {
    schedule: Schedule::Open { due_on: plan.start_date() },
    ..base.clone()
  };
  records.push(Deadline::new(
    Uuid::new_v4(),
    parent,
    Membership::group_parent(group_id, count)?,
    now,
  )?);

  for (i, due_on) in (1..=count).zip(dates) {
    let installment = NewDeadline {
      title: format!("{} [Parcela {i}/{count}]", base.title),
      schedule: Schedule::Open { due_on },
      ..base.clone()
    };
    records.push(Deadline::new(
      Uuid::new_v4(),
      installment,
      Membership::installment(group_id, i, count)?,
      now,
    )?);
  }

  Ok(records)
}
