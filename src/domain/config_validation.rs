//! Validation run before any backtest.
//!
//! Checks strategy templates and engine settings. Everything rejected here
//! is a hard failure; problems that depend on the data are left to the
//! engine, which records them as soft errors.

use std::collections::HashSet;

use crate::domain::error::StrategistError;
use crate::domain::expression::{Action, NodeRef, Value};
use crate::domain::strategy::Strategy;
use crate::ports::config_port::ConfigPort;

/// Most parameter combinations a single sweep may run.
pub const MAX_COMBINATIONS: usize = 1_000_000;

pub const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

pub fn validate_strategy(strategy: &Strategy) -> Result<(), StrategistError> {
    validate_filters(strategy)?;
    validate_balances(strategy)?;
    validate_user_variables(strategy)?;
    validate_runners(strategy)?;
    validate_references(strategy)?;
    validate_window(strategy)?;
    Ok(())
}

pub fn validate_engine_config(config: &dyn ConfigPort) -> Result<(), StrategistError> {
    validate_worker_threads(config)?;
    validate_log_level(config)?;
    Ok(())
}

fn invalid(reason: String) -> StrategistError {
    StrategistError::StrategyInvalid { reason }
}

fn validate_filters(strategy: &Strategy) -> Result<(), StrategistError> {
    for (i, filter) in strategy.filters.iter().enumerate() {
        filter
            .validate()
            .map_err(|e| invalid(format!("filter {} ({}): {}", i, filter, e)))?;
    }
    Ok(())
}

fn non_negative(value: f64, name: &str) -> Result<(), StrategistError> {
    if !(value.is_finite() && value >= 0.0) {
        return Err(invalid(format!("{} must be non-negative, got {}", name, value)));
    }
    Ok(())
}

fn validate_balances(strategy: &Strategy) -> Result<(), StrategistError> {
    non_negative(strategy.account.currency_balance, "currency balance")?;
    non_negative(strategy.account.asset_balance, "asset balance")?;
    non_negative(strategy.exchange.transaction_fee, "transaction fee")?;
    non_negative(strategy.exchange.transaction_fee_percentage, "transaction fee percentage")?;
    non_negative(strategy.exchange.transaction_time_s, "transaction time")?;
    Ok(())
}

fn validate_user_variables(strategy: &Strategy) -> Result<(), StrategistError> {
    let mut seen = HashSet::new();
    for variable in &strategy.user_vars {
        if variable.name.trim().is_empty() {
            return Err(invalid("user variable with an empty name".to_string()));
        }
        if !seen.insert(variable.name.as_str()) {
            return Err(invalid(format!("user variable \"{}\" declared twice", variable.name)));
        }
        let mut self_reference = false;
        crate::domain::expression::walk(NodeRef::Value(&variable.value), &mut |node| {
            if let NodeRef::Value(Value::Variable(name)) = node {
                self_reference |= *name == variable.name;
            }
        });
        if self_reference {
            return Err(invalid(format!("user variable \"{}\" refers to itself", variable.name)));
        }
    }
    Ok(())
}

fn validate_runners(strategy: &Strategy) -> Result<(), StrategistError> {
    let mut targets = HashSet::new();
    for runner in &strategy.variable_runners {
        let variable = strategy
            .user_variable(&runner.target)
            .ok_or_else(|| invalid(format!("variable runner targets unknown variable \"{}\"", runner.target)))?;
        if !variable.value.is_numeric() {
            return Err(invalid(format!(
                "variable runner target \"{}\" is not numeric",
                runner.target
            )));
        }
        if !targets.insert(runner.target.as_str()) {
            return Err(invalid(format!("variable \"{}\" is swept twice", runner.target)));
        }
        if !(runner.step.is_finite() && runner.step > 0.0) {
            return Err(invalid(format!(
                "variable runner \"{}\" step must be positive, got {}",
                runner.target, runner.step
            )));
        }
        if !(runner.start.is_finite() && runner.end.is_finite() && runner.end >= runner.start) {
            return Err(invalid(format!(
                "variable runner \"{}\" range {}..{} is empty",
                runner.target, runner.start, runner.end
            )));
        }
    }
    match strategy.checked_combination_count() {
        Some(count) if count <= MAX_COMBINATIONS => Ok(()),
        _ => Err(invalid(format!(
            "variable runners sweep more than {} combinations",
            MAX_COMBINATIONS
        ))),
    }
}

fn validate_references(strategy: &Strategy) -> Result<(), StrategistError> {
    let declared: HashSet<&str> = strategy.user_vars.iter().map(|v| v.name.as_str()).collect();
    let mut problems = Vec::new();
    strategy.walk(&mut |node| match node {
        NodeRef::Value(Value::Variable(name)) if !declared.contains(name.as_str()) => {
            problems.push(format!("unknown variable \"{}\"", name));
        }
        NodeRef::Action(Action::SetVariable { name, .. }) if !declared.contains(name.as_str()) => {
            problems.push(format!("SetVariable assigns undeclared variable \"{}\"", name));
        }
        NodeRef::Action(Action::Purchase { amount } | Action::Sell { amount })
            if !(amount.is_finite() && *amount > 0.0) =>
        {
            problems.push(format!("order amount must be positive, got {}", amount));
        }
        _ => {}
    });
    match problems.into_iter().next() {
        Some(problem) => Err(invalid(problem)),
        None => Ok(()),
    }
}

fn validate_window(strategy: &Strategy) -> Result<(), StrategistError> {
    if let (Some(start), Some(end)) = (strategy.start, strategy.end) {
        if start > end {
            return Err(invalid(format!("start {} is after end {}", start, end)));
        }
    }
    Ok(())
}

fn validate_worker_threads(config: &dyn ConfigPort) -> Result<(), StrategistError> {
    let value = config.get_int("engine", "worker_threads", 0);
    if value < 0 {
        return Err(StrategistError::ConfigInvalid {
            section: "engine".to_string(),
            key: "worker_threads".to_string(),
            reason: "worker_threads must be non-negative".to_string(),
        });
    }
    Ok(())
}

fn validate_log_level(config: &dyn ConfigPort) -> Result<(), StrategistError> {
    match config.get_string("logging", "level") {
        Some(level) if !LOG_LEVELS.contains(&level.trim().to_lowercase().as_str()) => {
            Err(StrategistError::ConfigInvalid {
                section: "logging".to_string(),
                key: "level".to_string(),
                reason: format!("unknown log level \"{}\", expected one of {}", level, LOG_LEVELS.join(", ")),
            })
        }
        _ => Ok(()),
    }
}
