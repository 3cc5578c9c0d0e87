//! Core types and trait definitions for the deadline installment engine.
//!
//! This crate has no database dependencies. It owns the
//! `Deadline` record, the date recurrence rules, plan validation and the
//! [`store::DeadlineStore`] abstraction that storage backends implement.

// Store methods spell out `Send` futures; backends implement them with
// `async fn`.
#![allow(async_fn_in_trait)]

pub mod deadline;
pub mod error;
pub mod plan;
pub mod recurrence;
pub mod store;

pub use error::{Error, Result, ValidationError};
