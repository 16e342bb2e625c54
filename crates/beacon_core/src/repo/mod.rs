//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQL details from service/business orchestration.
//!
//! # Invariants
//! - Repository writes validate models before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.
//! - Rows read back are validated; corrupt rows surface as `InvalidData`.

pub mod common;
pub mod project_repo;
pub mod schedule_repo;
