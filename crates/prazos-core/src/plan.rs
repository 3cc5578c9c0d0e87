//! Installment plans: the transient input of the generator.
//!
//! An [`InstallmentPlan`] holds what the form collected, still loosely typed.
//! [`validate`] resolves it into a [`ValidatedPlan`] or reports the first rule
//! it breaks. Neither is ever persisted.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  ValidationError,
  deadline::{NewDeadline, Schedule},
  recurrence::{Interval, IntervalKind},
};

/// Smallest number of installments a plan may request.
pub const MIN_INSTALLMENTS: i64 = 2;

/// Largest number of installments a plan may request.
///
/// Generation is still refused later when the whole group does not fit in a
/// single store batch.
pub const MAX_INSTALLMENTS: i64 = 999;

/// Date formats accepted for `start_date`, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Raw plan input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallmentPlan {
  /// Fields copied onto the parent and every installment.
  pub base:                 NewDeadline,
  pub count:                i64,
  pub interval_kind:        String,
  #[serde(default)]
  pub custom_interval_days: Option<i64>,
  /// `YYYY-MM-DD` or `DD/MM/YYYY`.
  pub start_date:           String,
}

/// A plan that passed every rule.
#[derive(Debug, Clone)]
pub struct ValidatedPlan {
  base:       NewDeadline,
  count:      u32,
  interval:   Interval,
  start_date: NaiveDate,
}

impl ValidatedPlan {
  pub fn base(&self) -> &NewDeadline { &self.base }

  pub fn count(&self) -> u32 { self.count }

  pub fn interval(&self) -> Interval { self.interval }

  pub fn start_date(&self) -> NaiveDate { self.start_date }

  pub fn into_base(self) -> NewDeadline { self.base }
}

/// Check `plan` without side effects, stopping at the first failing rule.
///
/// Rules run in this order: count, interval kind, custom interval, start
/// date, title, responsible users, opening state.
pub fn validate(plan: InstallmentPlan) -> Result<ValidatedPlan, ValidationError> {
  let count = validate_count(plan.count)?;
  let kind = IntervalKind::parse(&plan.interval_kind)?;
  let interval = Interval::new(kind, plan.custom_interval_days)?;
  let start_date = parse_date(&plan.start_date)?;

  plan.base.check_required()?;
  if plan.base.schedule == Schedule::AwaitingOpening {
    return Err(ValidationError::AwaitingOpening);
  }

  Ok(ValidatedPlan { base: plan.base, count, interval, start_date })
}

/// Check an installment count against
/// `MIN_INSTALLMENTS..=MAX_INSTALLMENTS`.
pub fn validate_count(count: i64) -> Result<u32, ValidationError> {
  if !(MIN_INSTALLMENTS..=MAX_INSTALLMENTS).contains(&count) {
    return Err(ValidationError::CountOutOfRange(count));
  }
  u32::try_from(count).map_err(|_| ValidationError::CountOutOfRange(count))
}

/// Resolve a form date in any of the accepted formats.
pub fn parse_date(raw: &str) -> Result<NaiveDate, ValidationError> {
  let trimmed = raw.trim();
  DATE_FORMATS
    .iter()
    .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
    .ok_or_else(|| ValidationError::UnresolvableStartDate(raw.to_owned()))
}
