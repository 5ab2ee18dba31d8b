//! Spaced review for previously seen content
//!
//! This module provides:
//! - The pure scheduling algorithm (due-ness, grading, ranking, selection)
//! - Review state persistence in the local store
//! - A `Scheduler` that ties both to a content pool

pub mod algorithm;
pub mod models;
pub mod scheduler;
pub mod storage;

use thiserror::Error;

pub use models::*;
pub use scheduler::Scheduler;
pub use storage::ReviewStorage;

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Invalid grade: {0:?} (expected ok, bad or skip)")]
    InvalidGrade(String),
}
