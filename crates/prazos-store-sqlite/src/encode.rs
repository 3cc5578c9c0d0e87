//! Encoding and decoding helpers between `Deadline` and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, calendar dates are `YYYY-MM-DD`, id sets
//! and recurrence configs are compact JSON, UUIDs are hyphenated lowercase.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use prazos_core::{
  deadline::{Deadline, DeadlineStatus, Membership, OpeningState, Schedule},
  recurrence::RecurrenceConfig,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_status(s: DeadlineStatus) -> &'static str {
  match s {
    DeadlineStatus::Pending => "pending",
    DeadlineStatus::Completed => "completed",
  }
}

fn decode_status(s: &str) -> Option<DeadlineStatus> {
  match s {
    "pending" => Some(DeadlineStatus::Pending),
    "completed" => Some(DeadlineStatus::Completed),
    _ => None,
  }
}

fn encode_opening_state(s: OpeningState) -> &'static str {
  match s {
    OpeningState::Open => "open",
    OpeningState::AwaitingOpening => "awaiting_opening",
  }
}

pub fn encode_ids(ids: &BTreeSet<String>) -> Result<String> {
  Ok(serde_json::to_string(ids)?)
}

fn decode_ids(s: &str) -> Result<BTreeSet<String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row type ────────────────────────────────────────────────────────────────

/// Column list shared by every `SELECT` so [`RawDeadline::from_row`] can rely
/// on positions.
pub const COLUMNS: &str = "id, title, notes, responsible_ids, client_ids, \
  case_ids, opening_state, due_on, status, is_recurring, recurrence_config, \
  installment_group_id, installment_index, installment_total, created_at, \
  updated_at, created_by";

/// Raw column values of one `prazos` row.
pub struct RawDeadline {
  pub id:                   String,
  pub title:                String,
  pub notes:                Option<String>,
  pub responsible_ids:      String,
  pub client_ids:           String,
  pub case_ids:             String,
  pub opening_state:        String,
  pub due_on:               Option<String>,
  pub status:               String,
  pub is_recurring:         bool,
  pub recurrence_config:    Option<String>,
  pub installment_group_id: Option<String>,
  pub installment_index:    Option<u32>,
  pub installment_total:    Option<u32>,
  pub created_at:           String,
  pub updated_at:           String,
  pub created_by:           Option<String>,
}

impl RawDeadline {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                   row.get(0)?,
      title:                row.get(1)?,
      notes:                row.get(2)?,
      responsible_ids:      row.get(3)?,
      client_ids:           row.get(4)?,
      case_ids:             row.get(5)?,
      opening_state:        row.get(6)?,
      due_on:               row.get(7)?,
      status:               row.get(8)?,
      is_recurring:         row.get(9)?,
      recurrence_config:    row.get(10)?,
      installment_group_id: row.get(11)?,
      installment_index:    row.get(12)?,
      installment_total:    row.get(13)?,
      created_at:           row.get(14)?,
      updated_at:           row.get(15)?,
      created_by:           row.get(16)?,
    })
  }

  /// Flatten a [`Deadline`] into column values.
  pub fn encode(d: &Deadline) -> Result<Self> {
    let recurrence_config = d
      .recurrence_config()
      .map(serde_json::to_string)
      .transpose()?;

    Ok(Self {
      id: encode_uuid(d.id),
      title: d.title.clone(),
      notes: d.notes.clone(),
      responsible_ids: encode_ids(&d.responsible_ids)?,
      client_ids: encode_ids(&d.client_ids)?,
      case_ids: encode_ids(&d.case_ids)?,
      opening_state: encode_opening_state(d.opening_state()).to_owned(),
      due_on: d.schedule.due_on().map(encode_date),
      status: encode_status(d.status).to_owned(),
      is_recurring: d.is_recurring(),
      recurrence_config,
      installment_group_id: d.installment_group_id().map(encode_uuid),
      installment_index: d.installment_index(),
      installment_total: d.installment_total(),
      created_at: encode_dt(d.created_at),
      updated_at: encode_dt(d.updated_at),
      created_by: d.created_by.clone(),
    })
  }

  pub fn insert(&self, conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute(
      &format!(
        "INSERT INTO prazos ({COLUMNS}) VALUES
           (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
      ),
      rusqlite::params![
        self.id,
        self.title,
        self.notes,
        self.responsible_ids,
        self.client_ids,
        self.case_ids,
        self.opening_state,
        self.due_on,
        self.status,
        self.is_recurring,
        self.recurrence_config,
        self.installment_group_id,
        self.installment_index,
        self.installment_total,
        self.created_at,
        self.updated_at,
        self.created_by,
      ],
    )?;
    Ok(())
  }

  pub fn into_deadline(self) -> Result<Deadline> {
    let corrupt = |reason: String| Error::Corrupt {
      id: self.id.clone(),
      reason,
    };

    let schedule = match (self.opening_state.as_str(), &self.due_on) {
      ("open", Some(due_on)) => Schedule::Open { due_on: decode_date(due_on)? },
      ("awaiting_opening", None) => Schedule::AwaitingOpening,
      (state, due_on) => {
        return Err(corrupt(format!(
          "opening_state {state:?} with due_on {due_on:?}"
        )));
      }
    };

    let status = decode_status(&self.status)
      .ok_or_else(|| corrupt(format!("unknown status {:?}", self.status)))?;

    let membership = match (
      self.is_recurring,
      &self.recurrence_config,
      &self.installment_group_id,
    ) {
      (false, None, None) => Membership::Standalone,
      (true, Some(config), None) => {
        let config: RecurrenceConfig = serde_json::from_str(config)?;
        Membership::recurring(config)?
      }
      (false, None, Some(group)) => {
        let group_id = decode_uuid(group)?;
        let total = self
          .installment_total
          .ok_or_else(|| corrupt("group member without total".into()))?;
        match self.installment_index {
          Some(0) => Membership::group_parent(group_id, total)?,
          Some(index) => Membership::installment(group_id, index, total)?,
          None => return Err(corrupt("group member without index".into())),
        }
      }
      _ => {
        return Err(corrupt("conflicting recurrence and group fields".into()));
      }
    };

    Ok(Deadline {
      id: decode_uuid(&self.id)?,
      title: self.title,
      notes: self.notes,
      responsible_ids: decode_ids(&self.responsible_ids)?,
      client_ids: decode_ids(&self.client_ids)?,
      case_ids: decode_ids(&self.case_ids)?,
      schedule,
      status,
      membership,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
      created_by: self.created_by,
    })
  }
}
