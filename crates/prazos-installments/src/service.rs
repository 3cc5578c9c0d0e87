//! [`InstallmentService`] — the operations the deadline forms call.

use std::sync::Arc;

use chrono::NaiveDate;
use prazos_core::{
  ValidationError,
  deadline::{Deadline, InstallmentEditableFields},
  plan::{self, InstallmentPlan},
  recurrence::{self, IntervalKind},
  store::DeadlineStore,
};
use uuid::Uuid;

use crate::{
  DeletionReport, GenerationError, GroupError, GroupResult, GroupStatus,
  InstallmentGenerator, InstallmentGroupService, InstallmentSettings,
};

/// Facade over the generator and the group service sharing one store.
pub struct InstallmentService<S> {
  generator: InstallmentGenerator<S>,
  groups:    InstallmentGroupService<S>,
}

impl<S> InstallmentService<S>
where
  S: DeadlineStore,
{
  pub fn new(store: Arc<S>) -> Self {
    Self::with_settings(store, InstallmentSettings::default())
  }

  pub fn with_settings(store: Arc<S>, settings: InstallmentSettings) -> Self {
    Self {
      generator: InstallmentGenerator::new(store.clone()),
      groups:    InstallmentGroupService::with_settings(store, settings),
    }
  }

  /// Validate `plan` and, only if it passes, generate its group.
  pub async fn validate_and_generate(
    &self,
    plan: InstallmentPlan,
  ) -> Result<GroupResult, GenerationError> {
    let validated = plan::validate(plan).inspect_err(|e| {
      tracing::warn!(error = %e, "installment plan rejected");
    })?;
    self.generator.generate(validated).await
  }

  pub async fn get_group_status(
    &self,
    group_id: Uuid,
  ) -> Result<GroupStatus, GroupError> {
    self.groups.status(group_id).await
  }

  pub async fn edit_installment(
    &self,
    installment_id: Uuid,
    changes: InstallmentEditableFields,
  ) -> Result<Deadline, GroupError> {
    self.groups.edit_installment(installment_id, changes).await
  }

  pub async fn delete_group(
    &self,
    group_id: Uuid,
  ) -> Result<DeletionReport, GroupError> {
    self.groups.delete_group(group_id).await
  }

  /// Single-step preview for the form.
  pub fn next_date(
    &self,
    date: NaiveDate,
    kind: IntervalKind,
    custom_days: Option<i64>,
  ) -> Result<NaiveDate, ValidationError> {
    recurrence::next_date(date, kind, custom_days)
  }

  /// Every due date `plan` would produce, without touching the store.
  pub fn preview(
    &self,
    plan: InstallmentPlan,
  ) -> Result<Vec<NaiveDate>, ValidationError> {
    let validated = plan::validate(plan)?;
    recurrence::schedule(
      validated.start_date(),
      validated.interval(),
      validated.count() as usize,
    )
  }
}
