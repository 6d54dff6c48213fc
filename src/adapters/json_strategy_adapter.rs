//! Strategy files: the tagged JSON form of a [`Strategy`].

use std::fs;
use std::path::Path;

use crate::domain::error::StrategistError;
use crate::domain::expression::Registry;
use crate::domain::strategy::Strategy;

pub fn read_strategy_file(path: &Path, registry: &Registry) -> Result<Strategy, StrategistError> {
    let content = fs::read_to_string(path).map_err(|e| StrategistError::StrategyFileRead {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let malformed = |reason: String| StrategistError::StrategyFileMalformed {
        path: path.display().to_string(),
        reason,
    };
    let json: serde_json::Value = serde_json::from_str(&content).map_err(|e| malformed(e.to_string()))?;
    Strategy::from_json(&json, registry).map_err(|e| malformed(e.to_string()))
}

pub fn write_strategy_file(strategy: &Strategy, path: &Path) -> Result<(), StrategistError> {
    let json = serde_json::to_string_pretty(&strategy.to_json()).map_err(|e| StrategistError::StrategyFileMalformed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    fs::write(path, json)?;
    Ok(())
}
