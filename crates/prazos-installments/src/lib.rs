//! Installment generation and group maintenance for deadlines.
//!
//! Everything here is generic over a [`prazos_core::store::DeadlineStore`];
//! the store is injected, never looked up globally. Generation is one atomic
//! batch, group deletion is chunked and best-effort, and both report enough
//! detail that callers never have to guess what was written.

pub mod error;
pub mod generator;
pub mod group;
pub mod service;

pub use error::{GenerationError, GroupError};
pub use generator::{GroupResult, InstallmentGenerator};
pub use group::{
  DeletionReport, GroupStatus, InstallmentGroupService, InstallmentSettings,
};
pub use service::InstallmentService;
