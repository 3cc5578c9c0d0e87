//! Date recurrence rules.
//!
//! Every rule advances from a base date, never from "today". Month and year
//! steps clamp the day to the last day of the target month, so Jan 31 becomes
//! Feb 28 (or Feb 29) and Feb 29 becomes Feb 28 in a non-leap year.
//!
//! Everything here is pure and deterministic.

use std::num::NonZeroU32;

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::{Error, Result, ValidationError, plan::MAX_INSTALLMENTS};

// ─── Interval kinds ──────────────────────────────────────────────────────────

/// The recognised rules for stepping from one installment to the next.
///
/// Parsing is case-insensitive and also accepts the Portuguese labels used by
/// the deadline forms.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum IntervalKind {
  #[strum(to_string = "weekly", serialize = "semanal")]
  Weekly,
  #[strum(to_string = "biweekly", serialize = "quinzenal")]
  Biweekly,
  #[strum(to_string = "monthly", serialize = "mensal")]
  Monthly,
  #[strum(to_string = "yearly", serialize = "anual")]
  Yearly,
  #[strum(to_string = "custom", serialize = "personalizado")]
  Custom,
}

impl IntervalKind {
  /// Resolve a raw form value into a kind.
  pub fn parse(raw: &str) -> Result<Self, ValidationError> {
    raw
      .trim()
      .parse()
      .map_err(|_| ValidationError::InvalidRecurrenceKind(raw.to_owned()))
  }
}

/// A fully-resolved interval: the kind plus, for `custom`, its day count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Interval {
  /// Seven days.
  Weekly,
  /// Fifteen days (a "quinzena"), not fourteen.
  Biweekly,
  Monthly,
  Yearly,
  Custom { days: NonZeroU32 },
}

impl Interval {
  /// Build an interval from its kind and the optional custom day count.
  ///
  /// `custom_days` is ignored for every kind except [`IntervalKind::Custom`],
  /// where it must be a positive integer.
  pub fn new(
    kind: IntervalKind,
    custom_days: Option<i64>,
  ) -> Result<Self, ValidationError> {
    Ok(match kind {
      IntervalKind::Weekly => Self::Weekly,
      IntervalKind::Biweekly => Self::Biweekly,
      IntervalKind::Monthly => Self::Monthly,
      IntervalKind::Yearly => Self::Yearly,
      IntervalKind::Custom => {
        let days = custom_days
          .and_then(|d| u32::try_from(d).ok())
          .and_then(NonZeroU32::new)
          .ok_or(ValidationError::InvalidCustomInterval(custom_days))?;
        Self::Custom { days }
      }
    })
  }

  pub fn kind(&self) -> IntervalKind {
    match self {
      Self::Weekly => IntervalKind::Weekly,
      Self::Biweekly => IntervalKind::Biweekly,
      Self::Monthly => IntervalKind::Monthly,
      Self::Yearly => IntervalKind::Yearly,
      Self::Custom { .. } => IntervalKind::Custom,
    }
  }

  /// The date one step after `base`.
  pub fn advance(&self, base: NaiveDate) -> Result<NaiveDate, ValidationError> {
    let next = match self {
      Self::Weekly => base.checked_add_days(Days::new(7)),
      Self::Biweekly => base.checked_add_days(Days::new(15)),
      // chrono clamps to the last valid day of the target month.
      Self::Monthly => base.checked_add_months(Months::new(1)),
      Self::Yearly => base.checked_add_months(Months::new(12)),
      Self::Custom { days } => {
        base.checked_add_days(Days::new(u64::from(days.get())))
      }
    };
    next.ok_or(ValidationError::DateOutOfRange(base))
  }
}

// ─── Public operations ───────────────────────────────────────────────────────

/// Compute the date that follows `base` under `kind`.
///
/// This is the form's live-preview entry point; it accepts the same loosely
/// typed custom interval the form collects.
pub fn next_date(
  base: NaiveDate,
  kind: IntervalKind,
  custom_days: Option<i64>,
) -> Result<NaiveDate, ValidationError> {
  Interval::new(kind, custom_days)?.advance(base)
}

/// The full sequence of `count` due dates starting at `start`.
///
/// The first element is `start` itself; each following date is derived from
/// its predecessor, so clamping carries forward (Jan 31 → Feb 28 → Mar 28).
/// A `count` running past the calendar fails with `DateOutOfRange`.
pub fn schedule(
  start: NaiveDate,
  interval: Interval,
  count: usize,
) -> Result<Vec<NaiveDate>, ValidationError> {
  // Pre-allocate no more than a valid plan can ask for.
  let mut dates = Vec::with_capacity(count.min(MAX_INSTALLMENTS as usize));
  if count == 0 {
    return Ok(dates);
  }
  dates.push(start);
  for i in 1..count {
    let next = interval.advance(dates[i - 1])?;
    dates.push(next);
  }
  Ok(dates)
}

/// Last calendar day of `month` in `year`, or `None` for an invalid month.
pub fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
  let first = NaiveDate::from_ymd_opt(year, month, 1)?;
  let next = first.checked_add_months(Months::new(1))?;
  next.pred_opt().map(|d| d.day())
}

// ─── Recurring deadline definitions ──────────────────────────────────────────

/// The rule family of a recurring (non-installment) deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceKind {
  Monthly,
  Yearly,
  /// The N-th weekday of each month, e.g. the second Tuesday.
  WeeklyOfMonth,
}

/// Stored rule of a recurring deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceConfig {
  pub kind:                  RecurrenceKind,
  pub day_of_month:          Option<u32>,
  #[serde(default)]
  pub use_last_day_of_month: bool,
  /// 1 through 4 select that occurrence; 5 means the last one in the month.
  pub week_ordinal:          Option<u8>,
  pub weekday:               Option<Weekday>,
}

impl RecurrenceConfig {
  pub fn validate(&self) -> Result<()> {
    let invalid = |msg: &str| Err(Error::InvalidRecurrenceConfig(msg.to_owned()));

    if let Some(day) = self.day_of_month
      && !(1..=31).contains(&day)
    {
      return invalid("day_of_month must be between 1 and 31");
    }

    match self.kind {
      RecurrenceKind::Monthly => {
        if self.day_of_month.is_none() && !self.use_last_day_of_month {
          return invalid("monthly rule needs day_of_month or use_last_day_of_month");
        }
      }
      RecurrenceKind::Yearly => {}
      RecurrenceKind::WeeklyOfMonth => {
        if self.weekday.is_none() {
          return invalid("weekly_of_month rule needs a weekday");
        }
        match self.week_ordinal {
          Some(1..=5) => {}
          _ => return invalid("week_ordinal must be between 1 and 5"),
        }
      }
    }
    Ok(())
  }

  /// The first occurrence strictly after `after`.
  ///
  /// Only one date is computed; recurring deadlines are never expanded into a
  /// materialised series.
  pub fn next_occurrence(&self, after: NaiveDate) -> Result<NaiveDate> {
    self.validate()?;
    let overflow = || Error::Validation(ValidationError::DateOutOfRange(after));

    match self.kind {
      RecurrenceKind::Yearly => Ok(Interval::Yearly.advance(after)?),
      RecurrenceKind::Monthly | RecurrenceKind::WeeklyOfMonth => {
        // At most two months need checking: the current one and the next.
        let mut month_start = after.with_day(1).ok_or_else(overflow)?;
        for _ in 0..2 {
          if let Some(candidate) = self.occurrence_in(month_start)
            && candidate > after
          {
            return Ok(candidate);
          }
          month_start = month_start
            .checked_add_months(Months::new(1))
            .ok_or_else(overflow)?;
        }
        self.occurrence_in(month_start).ok_or_else(overflow)
      }
    }
  }

  /// The occurrence inside the month starting at `month_start`, if any.
  fn occurrence_in(&self, month_start: NaiveDate) -> Option<NaiveDate> {
    let (year, month) = (month_start.year(), month_start.month());
    let last = last_day_of_month(year, month)?;

    match self.kind {
      RecurrenceKind::Monthly => {
        let day = if self.use_last_day_of_month {
          last
        } else {
          self.day_of_month?.min(last)
        };
        NaiveDate::from_ymd_opt(year, month, day)
      }
      RecurrenceKind::WeeklyOfMonth => {
        let weekday = self.weekday?;
        match self.week_ordinal? {
          5 => {
            let last_date = NaiveDate::from_ymd_opt(year, month, last)?;
            let back = (7 + last_date.weekday().num_days_from_monday()
              - weekday.num_days_from_monday())
              % 7;
            last_date.checked_sub_days(Days::new(u64::from(back)))
          }
          n => NaiveDate::from_weekday_of_month_opt(year, month, weekday, n),
        }
      }
      RecurrenceKind::Yearly => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator;

  use super::*;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  #[test]
  fn weekly_and_biweekly_add_fixed_days() {
    let base = d(2024, 12, 28);
    assert_eq!(next_date(base, IntervalKind::Weekly, None).unwrap(), d(2025, 1, 4));
    assert_eq!(next_date(base, IntervalKind::Biweekly, None).unwrap(), d(2025, 1, 12));
  }

  #[test]
  fn monthly_clamps_to_month_end() {
    assert_eq!(next_date(d(2024, 1, 31), IntervalKind::Monthly, None).unwrap(), d(2024, 2, 29));
    assert_eq!(next_date(d(2023, 1, 31), IntervalKind::Monthly, None).unwrap(), d(2023, 2, 28));
    assert_eq!(next_date(d(2024, 3, 31), IntervalKind::Monthly, None).unwrap(), d(2024, 4, 30));
    assert_eq!(next_date(d(2024, 12, 15), IntervalKind::Monthly, None).unwrap(), d(2025, 1, 15));
  }

  #[test]
  fn monthly_keeps_day_or_lands_on_last_day() {
    let mut date = d(2023, 1, 1);
    while date < d(2026, 1, 1) {
      let next = next_date(date, IntervalKind::Monthly, None).unwrap();
      let last = last_day_of_month(next.year(), next.month()).unwrap();
      if date.day() <= last {
        assert_eq!(next.day(), date.day(), "from {date}");
      } else {
        assert_eq!(next.day(), last, "from {date}");
      }
      date = date.succ_opt().unwrap();
    }
  }

  #[test]
  fn yearly_clamps_leap_day() {
    assert_eq!(next_date(d(2024, 2, 29), IntervalKind::Yearly, None).unwrap(), d(2025, 2, 28));
    assert_eq!(next_date(d(2023, 6, 10), IntervalKind::Yearly, None).unwrap(), d(2024, 6, 10));
  }

  #[test]
  fn custom_adds_days() {
    for n in [1_i64, 10, 45, 365] {
      let base = d(2024, 2, 20);
      let expected = base.checked_add_days(Days::new(n as u64)).unwrap();
      assert_eq!(next_date(base, IntervalKind::Custom, Some(n)).unwrap(), expected);
    }
  }

  #[test]
  fn custom_without_positive_days_fails() {
    let base = d(2024, 1, 1);
    for bad in [None, Some(0), Some(-3)] {
      assert_eq!(
        next_date(base, IntervalKind::Custom, bad),
        Err(ValidationError::InvalidCustomInterval(bad))
      );
    }
  }

  #[test]
  fn custom_days_ignored_for_fixed_kinds() {
    let base = d(2024, 1, 1);
    assert_eq!(
      next_date(base, IntervalKind::Weekly, Some(0)).unwrap(),
      d(2024, 1, 8)
    );
  }

  #[test]
  fn next_date_is_repeatable() {
    for kind in IntervalKind::iter() {
      let a = next_date(d(2024, 1, 31), kind, Some(3));
      let b = next_date(d(2024, 1, 31), kind, Some(3));
      assert_eq!(a, b);
    }
  }

  #[test]
  fn overflow_is_reported() {
    let err = next_date(NaiveDate::MAX, IntervalKind::Weekly, None).unwrap_err();
    assert_eq!(err, ValidationError::DateOutOfRange(NaiveDate::MAX));
  }

  #[test]
  fn parse_accepts_english_and_portuguese_labels() {
    assert_eq!(IntervalKind::parse("Monthly").unwrap(), IntervalKind::Monthly);
    assert_eq!(IntervalKind::parse("quinzenal").unwrap(), IntervalKind::Biweekly);
    assert_eq!(IntervalKind::parse(" PERSONALIZADO ").unwrap(), IntervalKind::Custom);
    assert_eq!(
      IntervalKind::parse("daily").unwrap_err(),
      ValidationError::InvalidRecurrenceKind("daily".into())
    );
    assert_eq!(IntervalKind::Biweekly.to_string(), "biweekly");
  }

  #[test]
  fn schedule_starts_at_start_and_chains() {
    let dates = schedule(d(2023, 1, 31), Interval::Monthly, 4).unwrap();
    assert_eq!(dates, vec![d(2023, 1, 31), d(2023, 2, 28), d(2023, 3, 28), d(2023, 4, 28)]);
    assert!(schedule(d(2023, 1, 31), Interval::Monthly, 0).unwrap().is_empty());
  }

  #[test]
  fn schedule_with_huge_count_runs_out_of_calendar() {
    let long_step = Interval::Custom { days: NonZeroU32::new(1_000_000_000).unwrap() };
    assert_eq!(
      schedule(d(2024, 1, 1), long_step, usize::MAX),
      Err(ValidationError::DateOutOfRange(d(2024, 1, 1)))
    );
  }

  #[test]
  fn recurring_monthly_last_day() {
    let rule = RecurrenceConfig {
      kind:                  RecurrenceKind::Monthly,
      day_of_month:          None,
      use_last_day_of_month: true,
      week_ordinal:          None,
      weekday:               None,
    };
    assert_eq!(rule.next_occurrence(d(2024, 2, 10)).unwrap(), d(2024, 2, 29));
    assert_eq!(rule.next_occurrence(d(2024, 2, 29)).unwrap(), d(2024, 3, 31));
  }

  #[test]
  fn recurring_monthly_day_clamps() {
    let rule = RecurrenceConfig {
      kind:                  RecurrenceKind::Monthly,
      day_of_month:          Some(31),
      use_last_day_of_month: false,
      week_ordinal:          None,
      weekday:               None,
    };
    assert_eq!(rule.next_occurrence(d(2023, 1, 31)).unwrap(), d(2023, 2, 28));
  }

  #[test]
  fn recurring_weekday_of_month() {
    let second_tuesday = RecurrenceConfig {
      kind:                  RecurrenceKind::WeeklyOfMonth,
      day_of_month:          None,
      use_last_day_of_month: false,
      week_ordinal:          Some(2),
      weekday:               Some(Weekday::Tue),
    };
    assert_eq!(second_tuesday.next_occurrence(d(2024, 10, 1)).unwrap(), d(2024, 10, 8));
    assert_eq!(second_tuesday.next_occurrence(d(2024, 10, 8)).unwrap(), d(2024, 11, 12));

    let last_friday = RecurrenceConfig { week_ordinal: Some(5), weekday: Some(Weekday::Fri), ..second_tuesday };
    assert_eq!(last_friday.next_occurrence(d(2024, 10, 1)).unwrap(), d(2024, 10, 25));
  }

  #[test]
  fn recurring_config_rejects_incomplete_rules() {
    let rule = RecurrenceConfig {
      kind:                  RecurrenceKind::WeeklyOfMonth,
      day_of_month:          None,
      use_last_day_of_month: false,
      week_ordinal:          Some(6),
      weekday:               Some(Weekday::Mon),
    };
    assert!(matches!(rule.validate(), Err(Error::InvalidRecurrenceConfig(_))));
  }
}
