//! Mutable state of one simulation run.
//!
//! A context walks a shared, read-only series index by index. At each step
//! every trigger is evaluated in declaration order; failed orders are
//! recorded as soft errors and never stop the run.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use super::account::{Account, ExchangeAssumptions, Transaction};
use super::execution::{self, Order};
use super::expression::Value;
use super::series::TimeSeries;
use super::strategy::Trigger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StrategyErrorKind {
    NotEnoughMoneyToMakePurchase,
    NotEnoughAssetsToMakePurchase,
    NoAssetsToCoverTransactionFee,
    NotEnoughTimeSinceLastTransaction,
    FilterError,
    InvalidPrice,
}

impl fmt::Display for StrategyErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StrategyErrorKind::NotEnoughMoneyToMakePurchase => "not enough money to make purchase",
            StrategyErrorKind::NotEnoughAssetsToMakePurchase => "not enough assets to sell",
            StrategyErrorKind::NoAssetsToCoverTransactionFee => "assets do not cover the transaction fee",
            StrategyErrorKind::NotEnoughTimeSinceLastTransaction => "not enough time since last transaction",
            StrategyErrorKind::FilterError => "filter failed",
            StrategyErrorKind::InvalidPrice => "invalid price",
        };
        f.write_str(text)
    }
}

/// A soft failure recorded during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StrategyError {
    pub kind: StrategyErrorKind,
    pub time: f64,
    pub index: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Note {
    pub time: f64,
    pub index: usize,
    pub message: String,
}

/// User variable values after one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VariableSnapshot {
    pub index: usize,
    pub time: f64,
    pub values: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Initialized,
    Stepping,
    Finished,
}

#[derive(Debug, Clone)]
pub struct RuntimeContext {
    series: Arc<TimeSeries>,
    exchange: ExchangeAssumptions,
    account: Account,
    transactions: Vec<Transaction>,
    errors: Vec<StrategyError>,
    notes: Vec<Note>,
    variables: HashMap<String, Value>,
    current_index: usize,
    state: ContextState,
    snapshots: Option<Vec<VariableSnapshot>>,
}

impl RuntimeContext {
    pub fn new(
        series: Arc<TimeSeries>,
        account: Account,
        exchange: ExchangeAssumptions,
        variables: impl IntoIterator<Item = (String, Value)>,
    ) -> Self {
        RuntimeContext {
            series,
            exchange,
            account,
            transactions: Vec::new(),
            errors: Vec::new(),
            notes: Vec::new(),
            variables: variables.into_iter().collect(),
            current_index: 0,
            state: ContextState::Initialized,
            snapshots: None,
        }
    }

    /// Record user variable values after every step.
    pub fn with_variable_snapshots(mut self) -> Self {
        self.snapshots = Some(Vec::new());
        self
    }

    pub fn series(&self) -> &TimeSeries {
        &self.series
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn exchange(&self) -> &ExchangeAssumptions {
        &self.exchange
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn errors(&self) -> &[StrategyError] {
        &self.errors
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn snapshots(&self) -> Option<&[VariableSnapshot]> {
        self.snapshots.as_deref()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn variables(&self) -> &HashMap<String, Value> {
        &self.variables
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    /// Cursor clamped into the series; `None` when the series is empty.
    fn cursor(&self) -> Option<usize> {
        let len = self.series.len();
        (len > 0).then(|| self.current_index.min(len - 1))
    }

    pub fn current_price(&self) -> f64 {
        self.cursor()
            .and_then(|i| self.series.get(i))
            .map_or(f64::NAN, |s| s.y)
    }

    pub fn previous_price(&self) -> f64 {
        self.cursor()
            .and_then(|i| self.series.get(i.saturating_sub(1)))
            .map_or(f64::NAN, |s| s.y)
    }

    pub fn current_time(&self) -> f64 {
        self.cursor()
            .and_then(|i| self.series.get(i))
            .map_or(f64::NAN, |s| s.x)
    }

    pub fn last_transaction_time(&self) -> Option<f64> {
        self.transactions.last().map(|t| t.time)
    }

    /// Execute an order at the current price and time. Rejections are
    /// recorded as soft errors.
    pub fn submit(&mut self, order: Order) {
        let price = self.current_price();
        let time = self.current_time();
        match execution::execute(
            order,
            &self.account,
            price,
            time,
            self.last_transaction_time(),
            &self.exchange,
        ) {
            Ok(transaction) => {
                tracing::debug!(
                    index = self.current_index,
                    time,
                    price,
                    currency = transaction.currency_transferred,
                    assets = transaction.asset_transferred,
                    "transaction"
                );
                transaction.apply(&mut self.account);
                self.transactions.push(transaction);
            }
            Err(kind) => {
                tracing::debug!(index = self.current_index, time, ?order, %kind, "order rejected");
                self.record_error(kind, format!("{:?} at price {}", order, price));
            }
        }
    }

    pub fn record_error(&mut self, kind: StrategyErrorKind, message: impl Into<String>) {
        let error = StrategyError {
            kind,
            time: self.current_time(),
            index: self.current_index,
            message: message.into(),
        };
        self.errors.push(error);
    }

    pub fn add_note(&mut self, message: impl Into<String>) {
        let note = Note {
            time: self.current_time(),
            index: self.current_index,
            message: message.into(),
        };
        self.notes.push(note);
    }

    /// Run every trigger once at the current index, then advance. Returns
    /// `false` without doing anything once the series is exhausted.
    pub fn step(&mut self, triggers: &[Trigger]) -> bool {
        if self.current_index >= self.series.len() {
            self.state = ContextState::Finished;
            return false;
        }
        self.state = ContextState::Stepping;

        for trigger in triggers {
            if trigger.condition.is_true(self) {
                trigger.true_action.execute(self);
            } else if let Some(action) = &trigger.false_action {
                action.execute(self);
            }
        }

        if self.snapshots.is_some() {
            let snapshot = self.snapshot();
            if let Some(snapshots) = self.snapshots.as_mut() {
                snapshots.push(snapshot);
            }
        }

        self.current_index += 1;
        if self.current_index >= self.series.len() {
            self.state = ContextState::Finished;
        }
        true
    }

    /// Step until the series is exhausted.
    pub fn run(&mut self, triggers: &[Trigger]) {
        while self.step(triggers) {}
    }

    fn snapshot(&self) -> VariableSnapshot {
        VariableSnapshot {
            index: self.current_index,
            time: self.current_time(),
            values: self
                .variables
                .iter()
                .map(|(name, value)| (name.clone(), value.evaluate(self).as_text()))
                .collect(),
        }
    }

    /// Account value at the last price of the series.
    pub fn mark_to_market(&self) -> f64 {
        match self.series.last() {
            Some(last) => self.account.mark_to_market(last.y),
            None => self.account.currency_balance,
        }
    }
}
