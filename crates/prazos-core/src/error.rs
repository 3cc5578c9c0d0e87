//! Error types for `prazos-core`.

use chrono::NaiveDate;
use thiserror::Error;

use crate::deadline::DeadlineStatus;

/// A caller-input problem detected before any store interaction.
///
/// Each variant names exactly one failing rule; validation stops at the first
/// one encountered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("unknown recurrence kind: {0:?}")]
  InvalidRecurrenceKind(String),

  #[error("custom interval requires a positive number of days, got {0:?}")]
  InvalidCustomInterval(Option<i64>),

  #[error("installment count must be between 2 and 999, got {0}")]
  CountOutOfRange(i64),

  #[error("start date is not a calendar date: {0:?}")]
  UnresolvableStartDate(String),

  #[error("title must not be empty")]
  EmptyTitle,

  #[error("at least one responsible user is required")]
  NoResponsible,

  #[error("deadline is still awaiting opening and has no start date")]
  AwaitingOpening,

  #[error("date arithmetic overflowed after {0}")]
  DateOutOfRange(NaiveDate),

  #[error("status cannot change from {from} to {to}")]
  InvalidStatusTransition { from: DeadlineStatus, to: DeadlineStatus },
}

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error("installment index {index} is outside 1..={total}")]
  InvalidInstallmentPosition { index: u32, total: u32 },

  #[error("installment group must have at least 2 members, got {0}")]
  GroupTooSmall(u32),

  #[error("invalid recurrence config: {0}")]
  InvalidRecurrenceConfig(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
