//! Payroll cycle engine.
//!
//! This crate runs pay cycles end to end: it resolves each employee's salary
//! structure as a dependency graph of pay components, prorates fixed amounts
//! by attendance, pays approved overtime, folds in loan installments, HR case
//! deductions and expense reimbursements, gates review behind data-quality
//! audit flags, and settles the source records when a cycle is finalized.

#![warn(missing_docs)]

pub mod api;
pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
pub mod payroll;
pub mod settlement;
pub mod store;
