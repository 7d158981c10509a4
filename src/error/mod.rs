// src/error/mod.rs

pub mod types;

pub use types::{is_constraint_violation, AppError, AppResult, ErrorKind};
