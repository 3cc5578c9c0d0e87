//! `prazos` — operator tool for deadline installment groups.
//!
//! Opens the SQLite deadline store named in the configuration and drives the
//! installment service. Every command prints JSON on stdout.
//!
//! # Usage
//!
//! ```text
//! prazos preview --start 2024-01-31 --interval monthly --count 6
//! prazos generate --title "Honorários" --responsible ana --count 6 \
//!   --interval mensal --start 31/01/2024
//! prazos status <GROUP_ID>
//! prazos edit <INSTALLMENT_ID> --status completed
//! prazos delete-group <GROUP_ID>
//! ```

mod config;

use std::{
  collections::BTreeSet,
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::{Context as _, Result, bail};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use prazos_core::{
  deadline::{DeadlineStatus, InstallmentEditableFields, NewDeadline, Schedule},
  plan::{InstallmentPlan, parse_date, validate_count},
  recurrence::{Interval, IntervalKind, schedule},
};
use prazos_installments::InstallmentService;
use prazos_store_sqlite::SqliteStore;
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::config::AppConfig;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "prazos", version, about = "Deadline installment groups")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "prazos.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Print the due dates a plan would produce, without touching the store.
  Preview {
    /// First due date (`YYYY-MM-DD` or `DD/MM/YYYY`).
    #[arg(long)]
    start:       String,
    #[arg(long)]
    interval:    String,
    #[arg(long)]
    custom_days: Option<i64>,
    /// Number of installments, between 2 and 999.
    #[arg(long, default_value_t = 2)]
    count:       i64,
  },
  /// Validate a plan and create its installment group in one batch.
  Generate(GenerateArgs),
  /// Count completed and pending installments of a group.
  Status { group_id: Uuid },
  /// Change one installment.
  Edit(EditArgs),
  /// Remove a group's parent and every installment.
  DeleteGroup { group_id: Uuid },
}

#[derive(Args, Debug)]
struct GenerateArgs {
  #[arg(long)]
  title:       String,
  /// Responsible user id; repeat for several.
  #[arg(long = "responsible", required = true)]
  responsible: Vec<String>,
  #[arg(long = "client")]
  clients:     Vec<String>,
  #[arg(long = "case")]
  cases:       Vec<String>,
  #[arg(long)]
  notes:       Option<String>,
  #[arg(long)]
  created_by:  Option<String>,
  #[arg(long)]
  count:       i64,
  #[arg(long)]
  interval:    String,
  #[arg(long)]
  custom_days: Option<i64>,
  #[arg(long)]
  start:       String,
}

#[derive(Args, Debug)]
struct EditArgs {
  installment_id: Uuid,
  #[arg(long)]
  title:          Option<String>,
  #[arg(long, conflicts_with = "clear_notes")]
  notes:          Option<String>,
  #[arg(long)]
  clear_notes:    bool,
  #[arg(long = "responsible")]
  responsible:    Vec<String>,
  /// New due date (`YYYY-MM-DD` or `DD/MM/YYYY`).
  #[arg(long)]
  due:            Option<String>,
  #[arg(long, value_enum)]
  status:         Option<StatusArg>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StatusArg {
  Pending,
  Completed,
}

impl From<StatusArg> for DeadlineStatus {
  fn from(s: StatusArg) -> Self {
    match s {
      StatusArg::Pending => DeadlineStatus::Pending,
      StatusArg::Completed => DeadlineStatus::Completed,
    }
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  match cli.command {
    Command::Preview { start, interval, custom_days, count } => {
      print_json(&preview(&start, &interval, custom_days, count)?)
    }
    Command::Generate(args) => {
      let service = open_service(&cli.config).await?;
      print_json(&service.validate_and_generate(args.into_plan()?).await?)
    }
    Command::Status { group_id } => {
      let service = open_service(&cli.config).await?;
      print_json(&service.get_group_status(group_id).await?)
    }
    Command::Edit(args) => {
      let service = open_service(&cli.config).await?;
      let id = args.installment_id;
      let changes = args.into_changes()?;
      print_json(&service.edit_installment(id, changes).await?)
    }
    Command::DeleteGroup { group_id } => {
      let service = open_service(&cli.config).await?;
      let report = service.delete_group(group_id).await?;
      print_json(&report)?;
      if !report.is_complete() {
        bail!("{report}");
      }
      Ok(())
    }
  }
}

async fn open_service(
  config_path: &Path,
) -> Result<InstallmentService<SqliteStore>> {
  let cfg = AppConfig::load(config_path)?;
  if let Some(parent) = cfg.store_path.parent() {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;
  tracing::debug!(path = ?cfg.store_path, "opened deadline store");
  Ok(InstallmentService::with_settings(Arc::new(store), cfg.installments))
}

// ─── Commands ─────────────────────────────────────────────────────────────────

fn preview(
  start: &str,
  interval: &str,
  custom_days: Option<i64>,
  count: i64,
) -> Result<Vec<NaiveDate>> {
  let count = validate_count(count)?;
  let interval = Interval::new(IntervalKind::parse(interval)?, custom_days)?;
  let start = parse_date(start)?;
  Ok(schedule(start, interval, count as usize)?)
}

impl GenerateArgs {
  fn into_plan(self) -> Result<InstallmentPlan> {
    let due_on = parse_date(&self.start)?;
    Ok(InstallmentPlan {
      base:                 NewDeadline {
        title:           self.title,
        notes:           self.notes,
        responsible_ids: self.responsible.into_iter().collect(),
        client_ids:      self.clients.into_iter().collect(),
        case_ids:        self.cases.into_iter().collect(),
        schedule:        Schedule::Open { due_on },
        created_by:      self.created_by,
      },
      count:                self.count,
      interval_kind:        self.interval,
      custom_interval_days: self.custom_days,
      start_date:           self.start,
    })
  }
}

impl EditArgs {
  fn into_changes(self) -> Result<InstallmentEditableFields> {
    let notes = match (self.notes, self.clear_notes) {
      (_, true) => Some(None),
      (Some(n), false) => Some(Some(n)),
      (None, false) => None,
    };
    let responsible_ids = (!self.responsible.is_empty())
      .then(|| self.responsible.into_iter().collect::<BTreeSet<_>>());
    let due_on = self.due.as_deref().map(parse_date).transpose()?;

    Ok(InstallmentEditableFields {
      title: self.title,
      notes,
      responsible_ids,
      due_on,
      status: self.status.map(Into::into),
      ..Default::default()
    })
  }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

#[cfg(test)]
mod tests {
  use prazos_core::ValidationError;

  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn preview_lists_due_dates() {
    let dates = preview("31/01/2024", "mensal", None, 3).unwrap();
    assert_eq!(dates, vec![date(2024, 1, 31), date(2024, 2, 29), date(2024, 3, 29)]);
  }

  #[test]
  fn preview_rejects_counts_outside_plan_bounds() {
    for bad in [0, 1, 1000, i64::MAX] {
      let err = preview("2024-01-01", "weekly", None, bad).unwrap_err();
      assert_eq!(
        err.downcast_ref::<ValidationError>(),
        Some(&ValidationError::CountOutOfRange(bad))
      );
    }
  }

  #[test]
  fn generate_args_carry_start_date() {
    let cli = Cli::try_parse_from([
      "prazos", "generate", "--title", "Honorários", "--responsible", "ana",
      "--count", "3", "--interval", "monthly", "--start", "31/01/2024",
    ])
    .unwrap();
    let Command::Generate(args) = cli.command else {
      panic!("expected generate");
    };
    let plan = args.into_plan().unwrap();
    assert_eq!(plan.base.schedule, Schedule::Open { due_on: date(2024, 1, 31) });
    assert_eq!(plan.start_date, "31/01/2024");
  }
}
