//! Core domain types and logic.

pub mod account;
pub mod config_validation;
pub mod context;
pub mod engine;
pub mod error;
pub mod execution;
pub mod expression;
pub mod filter;
pub mod series;
pub mod strategy;
