//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{NaiveDate, Utc, Weekday};
use prazos_core::{
  deadline::{
    Deadline, DeadlineStatus, InstallmentEditableFields, Membership,
    NewDeadline, Schedule,
  },
  recurrence::{RecurrenceConfig, RecurrenceKind},
  store::{BatchOp, DeadlineQuery, DeadlineStore},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn deadline(membership: Membership, due_on: NaiveDate) -> Deadline {
  let mut input =
    NewDeadline::new("Audiência", "user-1", Schedule::Open { due_on });
  input.client_ids.insert("client-9".into());
  input.created_by = Some("user-2".into());
  Deadline::new(Uuid::new_v4(), input, membership, Utc::now()).unwrap()
}

fn group(group_id: Uuid, total: u32) -> Vec<Deadline> {
  let mut docs = vec![deadline(
    Membership::group_parent(group_id, total).unwrap(),
    date(2024, 1, 10),
  )];
  for i in 1..=total {
    docs.push(deadline(
      Membership::installment(group_id, i, total).unwrap(),
      date(2024, i, 10),
    ));
  }
  docs
}

fn inserts(docs: &[Deadline]) -> Vec<BatchOp> {
  docs.iter().cloned().map(BatchOp::Insert).collect()
}

// ─── Get / batch ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_get_roundtrip() {
  let s = store().await;
  let d = deadline(Membership::Standalone, date(2024, 3, 1));

  s.batch_write(vec![BatchOp::Insert(d.clone())]).await.unwrap();

  let fetched = s.get(d.id).await.unwrap().unwrap();
  assert_eq!(fetched.title, d.title);
  assert_eq!(fetched.schedule, d.schedule);
  assert_eq!(fetched.client_ids, d.client_ids);
  assert_eq!(fetched.membership, Membership::Standalone);
  assert_eq!(fetched.created_by.as_deref(), Some("user-2"));
}

#[tokio::test]
async fn get_missing_returns_none() {
  let s = store().await;
  assert!(s.get(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn awaiting_opening_and_recurring_roundtrip() {
  let s = store().await;

  let mut input = NewDeadline::new("Perícia", "user-1", Schedule::AwaitingOpening);
  input.notes = Some("aguardando designação".into());
  let waiting =
    Deadline::new(Uuid::new_v4(), input, Membership::Standalone, Utc::now()).unwrap();

  let rule = RecurrenceConfig {
    kind:                  RecurrenceKind::WeeklyOfMonth,
    day_of_month:          None,
    use_last_day_of_month: false,
    week_ordinal:          Some(1),
    weekday:               Some(Weekday::Mon),
  };
  let recurring = deadline(Membership::recurring(rule.clone()).unwrap(), date(2024, 4, 1));

  s.batch_write(inserts(&[waiting.clone(), recurring.clone()])).await.unwrap();

  let w = s.get(waiting.id).await.unwrap().unwrap();
  assert_eq!(w.schedule, Schedule::AwaitingOpening);
  assert_eq!(w.notes.as_deref(), Some("aguardando designação"));

  let r = s.get(recurring.id).await.unwrap().unwrap();
  assert!(r.is_recurring());
  assert_eq!(r.recurrence_config(), Some(&rule));
}

#[tokio::test]
async fn batch_is_all_or_nothing() {
  let s = store().await;
  let existing = deadline(Membership::Standalone, date(2024, 3, 1));
  s.batch_write(vec![BatchOp::Insert(existing.clone())]).await.unwrap();

  // The second insert collides with the existing primary key.
  let fresh = deadline(Membership::Standalone, date(2024, 3, 2));
  let err = s
    .batch_write(vec![BatchOp::Insert(fresh.clone()), BatchOp::Insert(existing)])
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::Database(_)));

  assert!(s.get(fresh.id).await.unwrap().is_none());
}

#[tokio::test]
async fn oversized_batch_is_refused_before_writing() {
  let s = store().await.with_max_batch_writes(3);
  assert_eq!(s.max_batch_writes(), 3);

  let docs = group(Uuid::new_v4(), 3);
  let err = s.batch_write(inserts(&docs)).await.unwrap_err();
  assert!(matches!(err, crate::Error::BatchTooLarge { ops: 4, limit: 3 }));

  for d in &docs {
    assert!(s.get(d.id).await.unwrap().is_none());
  }
}

#[tokio::test]
async fn batch_limit_is_clamped() {
  let s = store().await.with_max_batch_writes(10_000);
  assert_eq!(s.max_batch_writes(), 500);
}

#[tokio::test]
async fn batch_deletes() {
  let s = store().await;
  let docs = group(Uuid::new_v4(), 2);
  s.batch_write(inserts(&docs)).await.unwrap();

  let ops = docs.iter().map(|d| BatchOp::Delete(d.id)).collect();
  s.batch_write(ops).await.unwrap();

  for d in &docs {
    assert!(s.get(d.id).await.unwrap().is_none());
  }
}

// ─── Query ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn query_by_group_returns_parent_and_installments_in_order() {
  let s = store().await;
  let group_id = Uuid::new_v4();
  s.batch_write(inserts(&group(group_id, 3))).await.unwrap();
  s.batch_write(inserts(&group(Uuid::new_v4(), 2))).await.unwrap();
  s.batch_write(vec![BatchOp::Insert(deadline(Membership::Standalone, date(2024, 1, 1)))])
    .await
    .unwrap();

  let docs = s.query(DeadlineQuery::group(group_id)).await.unwrap();
  let indices: Vec<_> = docs.iter().map(|d| d.installment_index()).collect();
  assert_eq!(indices, vec![Some(0), Some(1), Some(2), Some(3)]);
  assert!(docs.iter().all(|d| d.installment_group_id() == Some(group_id)));
  assert!(docs[0].is_group_parent());
}

#[tokio::test]
async fn query_by_status_and_limit() {
  let s = store().await;
  let group_id = Uuid::new_v4();
  let docs = group(group_id, 3);
  s.batch_write(inserts(&docs)).await.unwrap();

  s.update_fields(
    docs[2].id,
    InstallmentEditableFields {
      status: Some(DeadlineStatus::Completed),
      ..Default::default()
    },
    Utc::now(),
  )
  .await
  .unwrap();

  let done = s
    .query(DeadlineQuery {
      installment_group_id: Some(group_id),
      status:               Some(DeadlineStatus::Completed),
      limit:                None,
    })
    .await
    .unwrap();
  assert_eq!(done.len(), 1);
  assert_eq!(done[0].id, docs[2].id);

  let limited = s
    .query(DeadlineQuery { limit: Some(2), ..DeadlineQuery::group(group_id) })
    .await
    .unwrap();
  assert_eq!(limited.len(), 2);
}

// ─── Update / delete ─────────────────────────────────────────────────────────

#[tokio::test]
async fn update_fields_writes_only_supplied_fields() {
  let s = store().await;
  let group_id = Uuid::new_v4();
  let docs = group(group_id, 2);
  s.batch_write(inserts(&docs)).await.unwrap();
  let target = &docs[1];

  let stamp = Utc::now();
  let found = s
    .update_fields(
      target.id,
      InstallmentEditableFields {
        due_on: Some(date(2024, 9, 30)),
        notes: Some(Some("remarcado".into())),
        ..Default::default()
      },
      stamp,
    )
    .await
    .unwrap();
  assert!(found);

  let after = s.get(target.id).await.unwrap().unwrap();
  assert_eq!(after.schedule, Schedule::Open { due_on: date(2024, 9, 30) });
  assert_eq!(after.notes.as_deref(), Some("remarcado"));
  assert_eq!(after.title, target.title);
  assert_eq!(after.membership, target.membership);
  assert_eq!(after.updated_at.timestamp(), stamp.timestamp());
  assert_eq!(after.created_at.timestamp(), target.created_at.timestamp());
}

#[tokio::test]
async fn update_fields_missing_returns_false() {
  let s = store().await;
  let found = s
    .update_fields(Uuid::new_v4(), InstallmentEditableFields::default(), Utc::now())
    .await
    .unwrap();
  assert!(!found);
}

#[tokio::test]
async fn delete_single() {
  let s = store().await;
  let d = deadline(Membership::Standalone, date(2024, 3, 1));
  s.batch_write(vec![BatchOp::Insert(d.clone())]).await.unwrap();

  assert!(s.delete(d.id).await.unwrap());
  assert!(!s.delete(d.id).await.unwrap());
  assert!(s.get(d.id).await.unwrap().is_none());
}
