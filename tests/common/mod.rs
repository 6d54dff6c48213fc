#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::cell::RefCell;
use std::collections::HashMap;
use strategist::domain::account::{Account, ExchangeAssumptions};
use strategist::domain::error::StrategistError;
use strategist::domain::expression::{Action, ComparisonOperator, Condition, Value};
use strategist::domain::series::{Sample, TimeSeries};
use strategist::domain::strategy::{Strategy, Trigger, UserVariable, VariableRunner};
use strategist::ports::data_port::PriceHistoryPort;

/// Price history held in memory; every request is recorded.
pub struct MockPriceHistory {
    pub data: HashMap<String, TimeSeries>,
    pub errors: HashMap<String, String>,
    pub requests: RefCell<Vec<(f64, f64)>>,
}

impl MockPriceHistory {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn with_series(mut self, asset: &str, series: TimeSeries) -> Self {
        self.data.insert(asset.to_string(), series);
        self
    }

    pub fn with_error(mut self, asset: &str, reason: &str) -> Self {
        self.errors.insert(asset.to_string(), reason.to_string());
        self
    }
}

impl PriceHistoryPort for MockPriceHistory {
    fn get_price_history(
        &self,
        asset: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        granularity_seconds: f64,
    ) -> Result<TimeSeries, StrategistError> {
        let (from, to) = (start.timestamp() as f64, end.timestamp() as f64);
        self.requests.borrow_mut().push((from, to));
        if let Some(reason) = self.errors.get(asset) {
            return Err(StrategistError::DataSource {
                asset: asset.to_string(),
                reason: reason.clone(),
            });
        }
        let mut series = self
            .data
            .get(asset)
            .map(|s| s.between(Some(from), Some(to)))
            .unwrap_or_else(|| TimeSeries::new(granularity_seconds));
        series.granularity = granularity_seconds;
        Ok(series)
    }
}

pub fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0).unwrap()
}

pub fn series(points: &[(f64, f64)]) -> TimeSeries {
    TimeSeries::from_sorted(
        points.iter().map(|&(x, y)| Sample::new(x, y)).collect(),
        1.0,
    )
}

/// `prices[i]` at `x = i * spacing`.
pub fn price_series(prices: &[f64], spacing: f64) -> TimeSeries {
    TimeSeries::from_sorted(
        prices
            .iter()
            .enumerate()
            .map(|(i, &y)| Sample::new(i as f64 * spacing, y))
            .collect(),
        spacing,
    )
}

pub fn exchange(fee: f64, fee_pct: f64, min_gap: f64) -> ExchangeAssumptions {
    ExchangeAssumptions {
        transaction_fee: fee,
        transaction_fee_percentage: fee_pct,
        transaction_time_s: min_gap,
    }
}

pub fn price_below(variable: &str) -> Condition {
    Condition::compare_numbers(
        Value::CurrentPrice,
        ComparisonOperator::Less,
        Value::variable(variable),
    )
}

pub fn price_above(variable: &str) -> Condition {
    Condition::compare_numbers(
        Value::CurrentPrice,
        ComparisonOperator::Greater,
        Value::variable(variable),
    )
}

/// Buy everything below `buy_below`, sell everything above `sell_above`.
pub fn threshold_strategy(buy_below: f64, sell_above: f64) -> Strategy {
    let mut strategy = Strategy::new("thresholds", Account::new(1000.0, 0.0));
    strategy.user_vars = vec![
        UserVariable::new("buy_below", Value::number(buy_below)),
        UserVariable::new("sell_above", Value::number(sell_above)),
    ];
    strategy.triggers = vec![
        Trigger::new("buy", price_below("buy_below"), Action::PurchaseMax),
        Trigger::new("sell", price_above("sell_above"), Action::SellMax),
    ];
    strategy
}

/// The threshold strategy with both thresholds swept.
pub fn swept_strategy() -> Strategy {
    let mut strategy = threshold_strategy(0.0, 0.0);
    strategy.variable_runners = vec![
        VariableRunner::new("buy_below", 8.0, 12.0, 1.0),
        VariableRunner::new("sell_above", 12.0, 18.0, 2.0),
    ];
    strategy
}

/// A price path with two dips and two peaks.
pub fn wave() -> TimeSeries {
    price_series(
        &[10.0, 9.0, 8.0, 9.5, 12.0, 15.0, 17.0, 13.0, 10.0, 7.5, 9.0, 14.0, 19.0, 16.0],
        60.0,
    )
}
