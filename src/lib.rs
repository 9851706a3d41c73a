//! Back-office engine for a construction company.
//!
//! This crate provides the expense approval workflow, payroll computation
//! from logged time, connectors to the accounting and groupware services,
//! and the JSON HTTP API that exposes them.

pub mod api;
pub mod config;
pub mod connectors;
pub mod error;
pub mod models;
pub mod payroll;
pub mod store;
pub mod workflow;
