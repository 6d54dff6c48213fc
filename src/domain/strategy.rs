//! Strategy templates and their JSON form.
//!
//! A strategy is read-only once built: the engine shares its triggers across
//! every sweep combination and only the user-variable bindings differ.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json, json};

use super::account::{Account, ExchangeAssumptions};
use super::error::ExpressionError;
use super::expression::{Action, Condition, Node, NodeRef, Registry, Value, walk};
use super::filter::Filter;

pub const DEFAULT_ENGINE_ID: &str = "Backtest";

/// One rule evaluated at every step.
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub name: String,
    pub condition: Condition,
    pub true_action: Action,
    pub false_action: Option<Action>,
}

/// A named user variable and its initial value.
#[derive(Debug, Clone, PartialEq)]
pub struct UserVariable {
    pub name: String,
    pub value: Value,
}

/// Sweep of a numeric user variable over `start..=end` by `step`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VariableRunner {
    pub target: String,
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub name: String,
    pub engine_id: String,
    pub account: Account,
    pub exchange: ExchangeAssumptions,
    pub filters: Vec<Filter>,
    pub triggers: Vec<Trigger>,
    pub user_vars: Vec<UserVariable>,
    pub variable_runners: Vec<VariableRunner>,
    /// Walk only samples with `x >= start`.
    pub start: Option<f64>,
    /// Walk only samples with `x <= end`.
    pub end: Option<f64>,
}

impl Trigger {
    pub fn new(name: impl Into<String>, condition: Condition, true_action: Action) -> Self {
        Trigger {
            name: name.into(),
            condition,
            true_action,
            false_action: None,
        }
    }

    pub fn otherwise(mut self, action: Action) -> Self {
        self.false_action = Some(action);
        self
    }

    pub fn nodes(&self) -> Vec<NodeRef<'_>> {
        let mut nodes = vec![NodeRef::Condition(&self.condition), NodeRef::Action(&self.true_action)];
        if let Some(action) = &self.false_action {
            nodes.push(NodeRef::Action(action));
        }
        nodes
    }

    fn to_json(&self) -> Json {
        json!({
            "Name": self.name,
            "Condition": self.condition.to_json(),
            "TrueAction": self.true_action.to_json(),
            "FalseAction": self.false_action.as_ref().map_or(Json::Null, |a| a.to_json()),
        })
    }

    fn from_json(json: &Json, registry: &Registry) -> Result<Self, ExpressionError> {
        let fields = object(json, "Trigger")?;
        let false_action = match fields.get("FalseAction") {
            None | Some(Json::Null) => None,
            Some(action) => Some(registry.decode(action)?),
        };
        Ok(Trigger {
            name: text(fields, "Trigger", "Name")?,
            condition: registry.decode(required(fields, "Trigger", "Condition")?)?,
            true_action: registry.decode(required(fields, "Trigger", "TrueAction")?)?,
            false_action,
        })
    }
}

impl UserVariable {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        UserVariable {
            name: name.into(),
            value,
        }
    }

    fn to_json(&self) -> Json {
        json!({"Name": self.name, "Value": self.value.to_json()})
    }

    fn from_json(json: &Json, registry: &Registry) -> Result<Self, ExpressionError> {
        let fields = object(json, "UserVariable")?;
        Ok(UserVariable {
            name: text(fields, "UserVariable", "Name")?,
            value: registry.decode(required(fields, "UserVariable", "Value")?)?,
        })
    }
}

impl VariableRunner {
    pub fn new(target: impl Into<String>, start: f64, end: f64, step: f64) -> Self {
        VariableRunner {
            target: target.into(),
            start,
            end,
            step,
        }
    }

    /// Number of values in the sweep; `end` counts when an integer number
    /// of steps reaches it (within 1e-9 steps). Saturates at `usize::MAX`.
    pub fn count(&self) -> usize {
        if !(self.step > 0.0 && self.end >= self.start) {
            return 0;
        }
        (((self.end - self.start) / self.step + 1e-9).floor() as usize).saturating_add(1)
    }

    pub fn values(&self) -> Vec<f64> {
        (0..self.count())
            .map(|i| self.start + i as f64 * self.step)
            .collect()
    }
}

impl Strategy {
    pub fn new(name: impl Into<String>, account: Account) -> Self {
        Strategy {
            name: name.into(),
            engine_id: DEFAULT_ENGINE_ID.to_string(),
            account,
            exchange: ExchangeAssumptions::default(),
            filters: Vec::new(),
            triggers: Vec::new(),
            user_vars: Vec::new(),
            variable_runners: Vec::new(),
            start: None,
            end: None,
        }
    }

    /// Initial user-variable bindings, in declaration order.
    pub fn initial_variables(&self) -> Vec<(String, Value)> {
        self.user_vars
            .iter()
            .map(|v| (v.name.clone(), v.value.clone()))
            .collect()
    }

    pub fn user_variable(&self, name: &str) -> Option<&UserVariable> {
        self.user_vars.iter().find(|v| v.name == name)
    }

    /// Product of every runner's value count; 1 without runners.
    /// Saturates at `usize::MAX`.
    pub fn combination_count(&self) -> usize {
        self.checked_combination_count().unwrap_or(usize::MAX)
    }

    /// `None` when the product does not fit in a `usize`.
    pub fn checked_combination_count(&self) -> Option<usize> {
        self.variable_runners
            .iter()
            .try_fold(1usize, |total, runner| total.checked_mul(runner.count()))
    }

    /// Visit every expression node of every trigger and user variable.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(NodeRef<'a>)) {
        for trigger in &self.triggers {
            for node in trigger.nodes() {
                walk(node, visit);
            }
        }
        for variable in &self.user_vars {
            walk(NodeRef::Value(&variable.value), visit);
        }
    }

    pub fn to_json(&self) -> Json {
        json!({
            "Name": self.name,
            "EngineId": self.engine_id,
            "Account": self.account,
            "ExchangeAssumptions": self.exchange,
            "Filters": self.filters,
            "Triggers": self.triggers.iter().map(Trigger::to_json).collect::<Vec<_>>(),
            "UserVariables": self.user_vars.iter().map(UserVariable::to_json).collect::<Vec<_>>(),
            "VariableRunners": self.variable_runners,
            "Start": self.start,
            "End": self.end,
        })
    }

    /// Decode a strategy; missing lists default to empty and a missing
    /// exchange to zero fees.
    pub fn from_json(json: &Json, registry: &Registry) -> Result<Self, ExpressionError> {
        let fields = object(json, "Strategy")?;

        let triggers = list(fields, "Triggers")
            .iter()
            .map(|t| Trigger::from_json(t, registry))
            .collect::<Result<_, _>>()?;
        let user_vars = list(fields, "UserVariables")
            .iter()
            .map(|v| UserVariable::from_json(v, registry))
            .collect::<Result<_, _>>()?;

        Ok(Strategy {
            name: text(fields, "Strategy", "Name")?,
            engine_id: match fields.get("EngineId") {
                Some(_) => text(fields, "Strategy", "EngineId")?,
                None => DEFAULT_ENGINE_ID.to_string(),
            },
            account: record(fields, "Account")?,
            exchange: match fields.get("ExchangeAssumptions") {
                Some(_) => record(fields, "ExchangeAssumptions")?,
                None => ExchangeAssumptions::default(),
            },
            filters: optional_record(fields, "Filters")?.unwrap_or_default(),
            triggers,
            user_vars,
            variable_runners: optional_record(fields, "VariableRunners")?.unwrap_or_default(),
            start: optional_record(fields, "Start")?,
            end: optional_record(fields, "End")?,
        })
    }
}

fn object<'a>(json: &'a Json, id: &'static str) -> Result<&'a Map<String, Json>, ExpressionError> {
    json.as_object()
        .ok_or(ExpressionError::NotAnObject { namespace: id })
}

fn required<'a>(
    fields: &'a Map<String, Json>,
    id: &'static str,
    field: &'static str,
) -> Result<&'a Json, ExpressionError> {
    fields.get(field).ok_or(ExpressionError::MissingField { id, field })
}

fn text(fields: &Map<String, Json>, id: &'static str, field: &'static str) -> Result<String, ExpressionError> {
    required(fields, id, field)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ExpressionError::InvalidField {
            id,
            field,
            reason: "expected a string".to_string(),
        })
}

fn list<'a>(fields: &'a Map<String, Json>, field: &str) -> &'a [Json] {
    fields
        .get(field)
        .and_then(Json::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn record<T: DeserializeOwned>(
    fields: &Map<String, Json>,
    field: &'static str,
) -> Result<T, ExpressionError> {
    let json = required(fields, "Strategy", field)?;
    T::deserialize(json).map_err(|e| ExpressionError::InvalidField {
        id: "Strategy",
        field,
        reason: e.to_string(),
    })
}

fn optional_record<T: DeserializeOwned>(
    fields: &Map<String, Json>,
    field: &'static str,
) -> Result<Option<T>, ExpressionError> {
    match fields.get(field) {
        None | Some(Json::Null) => Ok(None),
        Some(_) => record(fields, field).map(Some),
    }
}
