//! The `Deadline` record — the unit persisted in the `prazos` collection.
//!
//! Standalone deadlines, recurring definitions, installment-group parents and
//! installments all share this one shape. What distinguishes them is the
//! [`Membership`] tag, which makes the three kinds mutually exclusive by
//! construction.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, ValidationError, recurrence::RecurrenceConfig};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Completion status. `Pending → Completed` is the only transition the
/// installment engine knows about.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeadlineStatus {
  #[default]
  Pending,
  Completed,
}

impl DeadlineStatus {
  /// Whether a record in this status may be set to `next`. Re-setting the
  /// current status is allowed; a completed deadline never reopens.
  pub fn can_become(self, next: Self) -> bool {
    !matches!((self, next), (Self::Completed, Self::Pending))
  }
}

/// Whether the deadline has a concrete due date yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpeningState {
  Open,
  AwaitingOpening,
}

// ─── Schedule ────────────────────────────────────────────────────────────────

/// The due date of a deadline, present exactly when it is open.
///
/// Only the calendar date is kept; the instant form is always midnight UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "opening_state", rename_all = "snake_case")]
pub enum Schedule {
  Open { due_on: NaiveDate },
  AwaitingOpening,
}

impl Schedule {
  /// Open on the calendar day of `instant`, discarding the time of day.
  pub fn open_at(instant: DateTime<Utc>) -> Self {
    Self::Open { due_on: instant.date_naive() }
  }

  pub fn opening_state(&self) -> OpeningState {
    match self {
      Self::Open { .. } => OpeningState::Open,
      Self::AwaitingOpening => OpeningState::AwaitingOpening,
    }
  }

  pub fn due_on(&self) -> Option<NaiveDate> {
    match self {
      Self::Open { due_on } => Some(*due_on),
      Self::AwaitingOpening => None,
    }
  }

  pub fn due_at(&self) -> Option<DateTime<Utc>> {
    self.due_on().map(|d| d.and_time(chrono::NaiveTime::MIN).and_utc())
  }
}

// ─── Membership ──────────────────────────────────────────────────────────────

/// Which of the mutually exclusive kinds a deadline is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Membership {
  Standalone,
  Recurring(RecurrenceConfig),
  /// The metadata anchor of an installment group. Never edited as an
  /// installment; its index is conceptually 0.
  GroupParent { group_id: Uuid, total: u32 },
  Installment { group_id: Uuid, index: u32, total: u32 },
}

impl Membership {
  pub fn recurring(config: RecurrenceConfig) -> Result<Self> {
    config.validate()?;
    Ok(Self::Recurring(config))
  }

  pub fn group_parent(group_id: Uuid, total: u32) -> Result<Self> {
    if total < 2 {
      return Err(Error::GroupTooSmall(total));
    }
    Ok(Self::GroupParent { group_id, total })
  }

  pub fn installment(group_id: Uuid, index: u32, total: u32) -> Result<Self> {
    if total < 2 {
      return Err(Error::GroupTooSmall(total));
    }
    if !(1..=total).contains(&index) {
      return Err(Error::InvalidInstallmentPosition { index, total });
    }
    Ok(Self::Installment { group_id, index, total })
  }
}

// ─── NewDeadline ─────────────────────────────────────────────────────────────

/// Caller-supplied base fields of a deadline.
///
/// `id`, `created_at` and `updated_at` are always assigned by the engine; they
/// are not accepted from callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDeadline {
  pub title:           String,
  #[serde(default)]
  pub notes:           Option<String>,
  pub responsible_ids: BTreeSet<String>,
  #[serde(default)]
  pub client_ids:      BTreeSet<String>,
  #[serde(default)]
  pub case_ids:        BTreeSet<String>,
  pub schedule:        Schedule,
  #[serde(default)]
  pub created_by:      Option<String>,
}

impl NewDeadline {
  /// Convenience constructor with a single responsible user and no links.
  pub fn new(
    title: impl Into<String>,
    responsible: impl Into<String>,
    schedule: Schedule,
  ) -> Self {
    Self {
      title: title.into(),
      notes: None,
      responsible_ids: BTreeSet::from([responsible.into()]),
      client_ids: BTreeSet::new(),
      case_ids: BTreeSet::new(),
      schedule,
      created_by: None,
    }
  }

  /// Title and responsible checks shared by every deadline kind.
  pub fn check_required(&self) -> Result<(), ValidationError> {
    if self.title.trim().is_empty() {
      return Err(ValidationError::EmptyTitle);
    }
    if self.responsible_ids.is_empty() {
      return Err(ValidationError::NoResponsible);
    }
    Ok(())
  }
}

// ─── Deadline ────────────────────────────────────────────────────────────────

/// A persisted deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deadline {
  pub id:              Uuid,
  pub title:           String,
  pub notes:           Option<String>,
  pub responsible_ids: BTreeSet<String>,
  pub client_ids:      BTreeSet<String>,
  pub case_ids:        BTreeSet<String>,
  pub schedule:        Schedule,
  pub status:          DeadlineStatus,
  pub membership:      Membership,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
  pub created_by:      Option<String>,
}

impl Deadline {
  /// Build a pending deadline from caller input, checking the required
  /// fields.
  ///
  /// Installments and group parents must be open: a group without a
  /// concrete start date is meaningless.
  pub fn new(
    id: Uuid,
    input: NewDeadline,
    membership: Membership,
    now: DateTime<Utc>,
  ) -> Result<Self> {
    input.check_required()?;
    if matches!(
      membership,
      Membership::GroupParent { .. } | Membership::Installment { .. }
    ) && input.schedule == Schedule::AwaitingOpening
    {
      return Err(ValidationError::AwaitingOpening.into());
    }

    Ok(Self {
      id,
      title: input.title,
      notes: input.notes,
      responsible_ids: input.responsible_ids,
      client_ids: input.client_ids,
      case_ids: input.case_ids,
      schedule: input.schedule,
      status: DeadlineStatus::Pending,
      membership,
      created_at: now,
      updated_at: now,
      created_by: input.created_by,
    })
  }

  pub fn opening_state(&self) -> OpeningState { self.schedule.opening_state() }

  pub fn due_at(&self) -> Option<DateTime<Utc>> { self.schedule.due_at() }

  pub fn is_recurring(&self) -> bool {
    matches!(self.membership, Membership::Recurring(_))
  }

  pub fn recurrence_config(&self) -> Option<&RecurrenceConfig> {
    match &self.membership {
      Membership::Recurring(config) => Some(config),
      _ => None,
    }
  }

  pub fn installment_group_id(&self) -> Option<Uuid> {
    match self.membership {
      Membership::GroupParent { group_id, .. }
      | Membership::Installment { group_id, .. } => Some(group_id),
      _ => None,
    }
  }

  /// 1-based position within the group; 0 for the group parent.
  pub fn installment_index(&self) -> Option<u32> {
    match self.membership {
      Membership::GroupParent { .. } => Some(0),
      Membership::Installment { index, .. } => Some(index),
      _ => None,
    }
  }

  pub fn installment_total(&self) -> Option<u32> {
    match self.membership {
      Membership::GroupParent { total, .. }
      | Membership::Installment { total, .. } => Some(total),
      _ => None,
    }
  }

  pub fn is_installment(&self) -> bool {
    matches!(self.membership, Membership::Installment { .. })
  }

  pub fn is_group_parent(&self) -> bool {
    matches!(self.membership, Membership::GroupParent { .. })
  }

  /// Check `changes` against this record before anything is written.
  pub fn check_edit(
    &self,
    changes: &InstallmentEditableFields,
  ) -> Result<(), ValidationError> {
    changes.check()?;
    if let Some(next) = changes.status
      && !self.status.can_become(next)
    {
      return Err(ValidationError::InvalidStatusTransition {
        from: self.status,
        to:   next,
      });
    }
    Ok(())
  }

  /// Apply an installment edit in memory, mirroring what the store persists.
  pub fn apply(
    &mut self,
    changes: &InstallmentEditableFields,
    updated_at: DateTime<Utc>,
  ) {
    if let Some(title) = &changes.title {
      self.title = title.clone();
    }
    if let Some(notes) = &changes.notes {
      self.notes = notes.clone();
    }
    if let Some(ids) = &changes.responsible_ids {
      self.responsible_ids = ids.clone();
    }
    if let Some(ids) = &changes.client_ids {
      self.client_ids = ids.clone();
    }
    if let Some(ids) = &changes.case_ids {
      self.case_ids = ids.clone();
    }
    if let Some(due_on) = changes.due_on {
      self.schedule = Schedule::Open { due_on };
    }
    if let Some(status) = changes.status {
      self.status = status;
    }
    self.updated_at = updated_at;
  }
}

// ─── Installment edits ───────────────────────────────────────────────────────

/// The subset of fields a caller may change on a single installment.
///
/// Group membership (`installment_group_id`, `installment_index`,
/// `installment_total`) and recurrence settings are simply not representable
/// here. Unknown keys in a JSON payload are ignored on deserialisation, so a
/// form that still sends them has them dropped silently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallmentEditableFields {
  pub title:           Option<String>,
  /// `Some(None)` clears the notes.
  pub notes:           Option<Option<String>>,
  pub responsible_ids: Option<BTreeSet<String>>,
  pub client_ids:      Option<BTreeSet<String>>,
  pub case_ids:        Option<BTreeSet<String>>,
  pub due_on:          Option<NaiveDate>,
  pub status:          Option<DeadlineStatus>,
}

impl InstallmentEditableFields {
  pub fn is_empty(&self) -> bool { *self == Self::default() }

  pub fn check(&self) -> Result<(), ValidationError> {
    if let Some(title) = &self.title
      && title.trim().is_empty()
    {
      return Err(ValidationError::EmptyTitle);
    }
    if let Some(ids) = &self.responsible_ids
      && ids.is_empty()
    {
      return Err(ValidationError::NoResponsible);
    }
    Ok(())
  }
}
