//! Contribution Engine for social insurance and housing fund
//!
//! This crate computes the theoretical enterprise contributions owed for each
//! employee-month (pension, medical, unemployment, work-injury and housing
//! fund) from salary history and half-yearly policy rules, and recomputes them
//! in bulk per `(period, wage_assumption)` scope.

#![warn(missing_docs)]

pub mod api;
pub mod batch;
pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
pub mod store;
