//! JSON report of a finished backtest.
//!
//! The report carries what a display layer needs from the best run:
//! final account, transactions, soft errors and notes, plus a summary of
//! every sweep combination.

use serde::Serialize;
use std::fs;

use crate::domain::account::{Account, Transaction};
use crate::domain::context::{Note, StrategyError, VariableSnapshot};
use crate::domain::engine::{BacktestResult, Parameter, RunSummary};
use crate::domain::error::StrategistError;
use crate::domain::strategy::Strategy;
use crate::ports::report_port::ReportPort;

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Report<'a> {
    pub strategy: &'a str,
    pub engine_id: &'a str,
    pub initial_account: &'a Account,
    pub final_account: &'a Account,
    pub mark_to_market: f64,
    pub best_index: usize,
    pub best_parameters: &'a [Parameter],
    pub transactions: &'a [Transaction],
    pub errors: &'a [StrategyError],
    pub notes: &'a [Note],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variable_snapshots: Option<&'a [VariableSnapshot]>,
    pub skipped_filters: Vec<String>,
    pub runs: &'a [RunSummary],
}

impl<'a> Report<'a> {
    pub fn new(result: &'a BacktestResult, strategy: &'a Strategy) -> Self {
        Report {
            strategy: &strategy.name,
            engine_id: &strategy.engine_id,
            initial_account: &strategy.account,
            final_account: result.best.account(),
            mark_to_market: result.mark_to_market,
            best_index: result.best_index,
            best_parameters: &result.best_parameters,
            transactions: result.best.transactions(),
            errors: result.best.errors(),
            notes: result.best.notes(),
            variable_snapshots: result.best.snapshots(),
            skipped_filters: result
                .skipped_filters
                .iter()
                .map(|s| format!("{} ({}): {}", s.position, s.filter, s.reason))
                .collect(),
            runs: &result.runs,
        }
    }
}

pub struct JsonReportAdapter;

impl ReportPort for JsonReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        strategy: &Strategy,
        output_path: &str,
    ) -> Result<(), StrategistError> {
        let report_error = |reason: String| StrategistError::Report {
            path: output_path.to_string(),
            reason,
        };
        let json = serde_json::to_string_pretty(&Report::new(result, strategy))
            .map_err(|e| report_error(e.to_string()))?;
        fs::write(output_path, json).map_err(|e| report_error(e.to_string()))?;
        tracing::info!(path = output_path, "report written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::engine::{BacktestEngine, EngineConfig};
    use crate::domain::expression::{Action, Condition};
    use crate::domain::series::{Sample, TimeSeries};
    use crate::domain::strategy::Trigger;
    use tempfile::TempDir;

    fn finished() -> (BacktestResult, Strategy) {
        let mut strategy = Strategy::new("always buy", Account::new(100.0, 0.0));
        strategy
            .triggers
            .push(Trigger::new("buy", Condition::Boolean(true), Action::PurchaseMax));
        let series = TimeSeries::from_sorted(vec![Sample::new(0.0, 10.0), Sample::new(60.0, 20.0)], 60.0);
        let result = BacktestEngine::new(EngineConfig::default())
            .run(&strategy, &series)
            .unwrap();
        (result, strategy)
    }

    #[test]
    fn writes_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        let (result, strategy) = finished();

        JsonReportAdapter
            .write(&result, &strategy, path.to_str().unwrap())
            .unwrap();

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["Strategy"], "always buy");
        assert_eq!(json["MarkToMarket"], 200.0);
        assert_eq!(json["Transactions"].as_array().unwrap().len(), 1);
        assert_eq!(json["Errors"][0]["Kind"], "NotEnoughMoneyToMakePurchase");
        assert_eq!(json["Runs"].as_array().unwrap().len(), 1);
        assert!(json.get("VariableSnapshots").is_none());
    }

    #[test]
    fn unwritable_path_is_report_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("report.json");
        let (result, strategy) = finished();
        assert!(matches!(
            JsonReportAdapter.write(&result, &strategy, path.to_str().unwrap()),
            Err(StrategistError::Report { .. })
        ));
    }
}
