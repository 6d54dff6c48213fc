//! Backtest engine: filter once, then walk the series for every parameter
//! combination.
//!
//! Without variable runners a single context runs synchronously. With
//! runners, every combination of their values runs as its own task on a
//! rayon pool; the best finished context is kept in one mutex-guarded slot
//! together with the completion count.

use itertools::Itertools;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};

use super::config_validation::{validate_engine_config, validate_strategy};
use super::context::{RuntimeContext, StrategyErrorKind};
use super::error::StrategistError;
use super::expression::Value;
use super::filter::Filter;
use super::series::TimeSeries;
use super::strategy::Strategy;
use crate::ports::config_port::ConfigPort;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineConfig {
    /// Worker threads for the sweep; 0 means one per CPU.
    pub worker_threads: usize,
    /// Keep per-step user variable snapshots in every context.
    pub record_variables: bool,
}

impl EngineConfig {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, StrategistError> {
        validate_engine_config(config)?;
        Ok(EngineConfig {
            worker_threads: config.get_int("engine", "worker_threads", 0).max(0) as usize,
            record_variables: config.get_bool("engine", "record_variables", false),
        })
    }
}

/// One swept variable and the value it was bound to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
    pub name: String,
    pub value: f64,
}

/// Outcome of a single combination.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RunSummary {
    pub index: usize,
    pub parameters: Vec<Parameter>,
    pub mark_to_market: f64,
    pub transactions: usize,
    pub errors: usize,
}

/// A filter that could not be applied to this data and was skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFilter {
    pub position: usize,
    pub filter: Filter,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub best: RuntimeContext,
    pub best_index: usize,
    pub best_parameters: Vec<Parameter>,
    pub mark_to_market: f64,
    /// Every combination, best first.
    pub runs: Vec<RunSummary>,
    pub skipped_filters: Vec<SkippedFilter>,
}

#[derive(Default)]
struct SweepState {
    best: Option<(usize, f64, RuntimeContext)>,
    completed: usize,
    runs: Vec<RunSummary>,
}

impl SweepState {
    /// Strictly greater wins; an exact tie goes to the earlier combination.
    fn offer(&mut self, index: usize, value: f64, ctx: RuntimeContext) {
        let replace = match &self.best {
            None => true,
            Some((best_index, best_value, _)) => {
                value > *best_value || (value == *best_value && index < *best_index)
            }
        };
        if replace {
            self.best = Some((index, value, ctx));
        }
    }
}

/// Fold `filters` over `raw`. Filters that fail on this data are skipped
/// and reported; configuration errors are returned.
pub fn filter_series(
    filters: &[Filter],
    raw: &TimeSeries,
) -> Result<(TimeSeries, Vec<SkippedFilter>), StrategistError> {
    let mut series = raw.clone();
    let mut skipped = Vec::new();
    for (position, filter) in filters.iter().enumerate() {
        match filter.apply(&series) {
            Ok(filtered) => series = filtered,
            Err(e) if e.is_configuration() => return Err(e.into()),
            Err(e) => {
                tracing::warn!(position, %filter, error = %e, "skipping filter");
                skipped.push(SkippedFilter {
                    position,
                    filter: filter.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }
    Ok((series, skipped))
}

/// Every combination of runner values, in enumeration order (the last
/// runner varies fastest). A strategy without runners has one empty
/// combination.
pub fn combinations(strategy: &Strategy) -> Vec<Vec<Parameter>> {
    if strategy.variable_runners.is_empty() {
        return vec![Vec::new()];
    }
    strategy
        .variable_runners
        .iter()
        .map(|runner| {
            runner
                .values()
                .into_iter()
                .map(|value| Parameter {
                    name: runner.target.clone(),
                    value,
                })
                .collect::<Vec<_>>()
        })
        .multi_cartesian_product()
        .collect()
}

pub struct BacktestEngine {
    config: EngineConfig,
}

impl BacktestEngine {
    pub fn new(config: EngineConfig) -> Self {
        BacktestEngine { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Filter, restrict to the strategy's window and share the series.
    pub fn prepare_series(
        &self,
        strategy: &Strategy,
        raw: &TimeSeries,
    ) -> Result<(Arc<TimeSeries>, Vec<SkippedFilter>), StrategistError> {
        let (filtered, skipped) = filter_series(&strategy.filters, raw)?;
        let windowed = match (strategy.start, strategy.end) {
            (None, None) => filtered,
            (start, end) => filtered.between(start, end),
        };
        Ok((Arc::new(windowed), skipped))
    }

    /// Run one combination to completion on an already prepared series.
    pub fn run_combination(
        &self,
        strategy: &Strategy,
        series: Arc<TimeSeries>,
        parameters: &[Parameter],
        skipped: &[SkippedFilter],
    ) -> RuntimeContext {
        let mut ctx = RuntimeContext::new(
            series,
            strategy.account.clone(),
            strategy.exchange.clone(),
            strategy.initial_variables(),
        );
        if self.config.record_variables {
            ctx = ctx.with_variable_snapshots();
        }
        for parameter in parameters {
            ctx.bind(parameter.name.clone(), Value::number(parameter.value));
        }
        for skip in skipped {
            ctx.record_error(
                StrategyErrorKind::FilterError,
                format!("filter {} ({}) skipped: {}", skip.position, skip.filter, skip.reason),
            );
        }
        ctx.run(&strategy.triggers);
        ctx
    }

    pub fn run(&self, strategy: &Strategy, raw: &TimeSeries) -> Result<BacktestResult, StrategistError> {
        validate_strategy(strategy)?;
        let (series, skipped) = self.prepare_series(strategy, raw)?;
        let combos = combinations(strategy);

        tracing::info!(
            strategy = %strategy.name,
            samples = series.len(),
            combinations = combos.len(),
            "starting backtest"
        );

        let state = if strategy.variable_runners.is_empty() {
            let mut state = SweepState::default();
            self.record(&mut state, strategy, 0, &[], series, &skipped);
            state
        } else {
            self.sweep(strategy, &combos, series, &skipped)?
        };

        let SweepState {
            best,
            completed,
            mut runs,
        } = state;
        if completed != combos.len() {
            return Err(StrategistError::IncompleteSweep {
                completed,
                total: combos.len(),
            });
        }
        let (best_index, mark_to_market, best) = best.ok_or(StrategistError::IncompleteSweep {
            completed,
            total: combos.len(),
        })?;

        runs.sort_by(|a, b| {
            b.mark_to_market
                .total_cmp(&a.mark_to_market)
                .then(a.index.cmp(&b.index))
        });

        tracing::info!(
            strategy = %strategy.name,
            best_index,
            mark_to_market,
            transactions = best.transactions().len(),
            errors = best.errors().len(),
            "backtest finished"
        );

        Ok(BacktestResult {
            best,
            best_index,
            best_parameters: combos.get(best_index).cloned().unwrap_or_default(),
            mark_to_market,
            runs,
            skipped_filters: skipped,
        })
    }

    fn sweep(
        &self,
        strategy: &Strategy,
        combos: &[Vec<Parameter>],
        series: Arc<TimeSeries>,
        skipped: &[SkippedFilter],
    ) -> Result<SweepState, StrategistError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.worker_threads)
            .build()
            .map_err(|e| StrategistError::WorkerPool {
                reason: e.to_string(),
            })?;
        let state = Mutex::new(SweepState::default());

        pool.scope(|s| {
            for (index, parameters) in combos.iter().enumerate() {
                let series = Arc::clone(&series);
                let state = &state;
                s.spawn(move |_| {
                    let ctx = self.run_combination(strategy, series, parameters, skipped);
                    let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
                    guard.completed += 1;
                    Self::summarize(&mut guard, index, parameters, ctx);
                });
            }
        });

        Ok(state.into_inner().unwrap_or_else(PoisonError::into_inner))
    }

    fn record(
        &self,
        state: &mut SweepState,
        strategy: &Strategy,
        index: usize,
        parameters: &[Parameter],
        series: Arc<TimeSeries>,
        skipped: &[SkippedFilter],
    ) {
        let ctx = self.run_combination(strategy, series, parameters, skipped);
        state.completed += 1;
        Self::summarize(state, index, parameters, ctx);
    }

    fn summarize(state: &mut SweepState, index: usize, parameters: &[Parameter], ctx: RuntimeContext) {
        let value = ctx.mark_to_market();
        tracing::debug!(index, ?parameters, mark_to_market = value, "combination finished");
        state.runs.push(RunSummary {
            index,
            parameters: parameters.to_vec(),
            mark_to_market: value,
            transactions: ctx.transactions().len(),
            errors: ctx.errors().len(),
        });
        state.offer(index, value, ctx);
    }
}
