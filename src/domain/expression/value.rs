//! Values: expressions that evaluate to a number or a string.

use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;
use std::fmt;

use super::node::{AnyNode, Node, NodeKind, NodeRef, field, out_of_range, string_field, tagged};
use super::operator::{MathOperator, Operator};
use super::registry::Registry;
use crate::domain::context::RuntimeContext;
use crate::domain::error::ExpressionError;

/// Variables may refer to other variables; deeper chains evaluate to NaN.
const MAX_VARIABLE_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Number(f64),
    Text(String),
}

impl Scalar {
    /// Text that does not parse as a number is NaN.
    pub fn as_number(&self) -> f64 {
        match self {
            Scalar::Number(n) => *n,
            Scalar::Text(s) => s.trim().parse().unwrap_or(f64::NAN),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Scalar::Number(n) => n.to_string(),
            Scalar::Text(s) => s.clone(),
        }
    }

    fn to_json(&self) -> Json {
        match self {
            Scalar::Number(n) => serde_json::Number::from_f64(*n).map_or(Json::Null, Json::Number),
            Scalar::Text(s) => Json::String(s.clone()),
        }
    }

    fn from_json(json: &Json) -> Option<Scalar> {
        match json {
            Json::Number(n) => n.as_f64().map(Scalar::Number),
            Json::String(s) => Some(Scalar::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::Text(s) => write!(f, "\"{}\"", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Constant(Scalar),
    /// Reference to a user variable bound in the runtime context.
    Variable(String),
    Math {
        left: Box<Value>,
        operator: MathOperator,
        right: Box<Value>,
    },
    CurrentPrice,
    /// Price one step back; the current price on the first step.
    PreviousPrice,
    CurrentTime,
    CurrencyBalance,
    AssetBalance,
}

impl Value {
    pub fn number(n: f64) -> Self {
        Value::Constant(Scalar::Number(n))
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Constant(Scalar::Text(s.into()))
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Value::Variable(name.into())
    }

    pub fn math(left: Value, operator: MathOperator, right: Value) -> Self {
        Value::Math {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }
    }

    pub(crate) fn prototypes() -> Vec<Value> {
        vec![
            Value::number(0.0),
            Value::variable(""),
            Value::math(Value::number(0.0), MathOperator::Add, Value::number(0.0)),
            Value::CurrentPrice,
            Value::PreviousPrice,
            Value::CurrentTime,
            Value::CurrencyBalance,
            Value::AssetBalance,
        ]
    }

    /// Whether this value always yields a number without indirection.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Value::Constant(Scalar::Text(_)) | Value::Variable(_))
    }

    pub fn evaluate(&self, ctx: &RuntimeContext) -> Scalar {
        self.evaluate_at_depth(ctx, 0)
    }

    pub fn evaluate_number(&self, ctx: &RuntimeContext) -> f64 {
        self.evaluate(ctx).as_number()
    }

    fn evaluate_at_depth(&self, ctx: &RuntimeContext, depth: usize) -> Scalar {
        match self {
            Value::Constant(s) => s.clone(),
            Value::Variable(name) => {
                if depth >= MAX_VARIABLE_DEPTH {
                    tracing::debug!(variable = %name, "variable chain too deep");
                    return Scalar::Number(f64::NAN);
                }
                match ctx.variable(name) {
                    Some(bound) => bound.evaluate_at_depth(ctx, depth + 1),
                    None => Scalar::Number(f64::NAN),
                }
            }
            Value::Math {
                left,
                operator,
                right,
            } => {
                let l = left.evaluate_at_depth(ctx, depth).as_number();
                let r = right.evaluate_at_depth(ctx, depth).as_number();
                Scalar::Number(operator.apply(l, r))
            }
            Value::CurrentPrice => Scalar::Number(ctx.current_price()),
            Value::PreviousPrice => Scalar::Number(ctx.previous_price()),
            Value::CurrentTime => Scalar::Number(ctx.current_time()),
            Value::CurrencyBalance => Scalar::Number(ctx.account().currency_balance),
            Value::AssetBalance => Scalar::Number(ctx.account().asset_balance),
        }
    }
}

impl Node for Value {
    const KIND: NodeKind = NodeKind::Value;

    fn id(&self) -> &'static str {
        match self {
            Value::Constant(_) => "Constant",
            Value::Variable(_) => "Variable",
            Value::Math { .. } => "MathValue",
            Value::CurrentPrice => "CurrentPrice",
            Value::PreviousPrice => "PreviousPrice",
            Value::CurrentTime => "CurrentTime",
            Value::CurrencyBalance => "CurrencyBalance",
            Value::AssetBalance => "AssetBalance",
        }
    }

    fn children(&self) -> Vec<NodeRef<'_>> {
        match self {
            Value::Math {
                left,
                operator,
                right,
            } => vec![
                NodeRef::Value(left),
                NodeRef::Operator(Operator::Math(*operator)),
                NodeRef::Value(right),
            ],
            _ => Vec::new(),
        }
    }

    fn replace_child(&mut self, index: usize, child: AnyNode) -> Result<(), ExpressionError> {
        let id = self.id();
        match self {
            Value::Math {
                left,
                operator,
                right,
            } => match index {
                0 => **left = child.into_value(id, index)?,
                1 => match child.into_operator(id, index)? {
                    Operator::Math(m) => *operator = m,
                    other => {
                        return Err(super::node::child_mismatch(
                            id,
                            index,
                            "math operator",
                            &AnyNode::Operator(other),
                        ));
                    }
                },
                2 => **right = child.into_value(id, index)?,
                _ => return Err(out_of_range(id, index, 3)),
            },
            _ => return Err(out_of_range(id, index, 0)),
        }
        Ok(())
    }

    fn render(&self, ctx: &RuntimeContext) -> String {
        match self {
            Value::Constant(s) => s.to_string(),
            Value::Variable(name) => match ctx.variable(name) {
                Some(_) => format!("{}[={}]", name, self.evaluate(ctx).as_text()),
                None => format!("{}[unbound]", name),
            },
            Value::Math {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                left.render(ctx),
                operator.symbol(),
                right.render(ctx)
            ),
            Value::CurrentPrice => format!("price[={}]", ctx.current_price()),
            Value::PreviousPrice => format!("previous_price[={}]", ctx.previous_price()),
            Value::CurrentTime => format!("time[={}]", ctx.current_time()),
            Value::CurrencyBalance => format!("currency[={}]", ctx.account().currency_balance),
            Value::AssetBalance => format!("assets[={}]", ctx.account().asset_balance),
        }
    }

    fn to_json(&self) -> Json {
        let mut map = tagged(self.id());
        match self {
            Value::Constant(s) => {
                map.insert("Value".into(), s.to_json());
            }
            Value::Variable(name) => {
                map.insert("Name".into(), Json::String(name.clone()));
            }
            Value::Math {
                left,
                operator,
                right,
            } => {
                map.insert("Left".into(), left.to_json());
                map.insert("Operator".into(), Operator::Math(*operator).to_json());
                map.insert("Right".into(), right.to_json());
            }
            _ => {}
        }
        Json::Object(map)
    }

    fn populate(&mut self, fields: &Map<String, Json>, registry: &Registry) -> Result<(), ExpressionError> {
        let id = self.id();
        match self {
            Value::Constant(s) => {
                let json = field(fields, id, "Value")?;
                *s = Scalar::from_json(json).ok_or_else(|| ExpressionError::InvalidField {
                    id,
                    field: "Value",
                    reason: "expected a number or a string".to_string(),
                })?;
            }
            Value::Variable(name) => {
                *name = string_field(fields, id, "Name")?;
            }
            Value::Math {
                left,
                operator,
                right,
            } => {
                **left = registry.decode(field(fields, id, "Left")?)?;
                *operator = match registry.decode::<Operator>(field(fields, id, "Operator")?)? {
                    Operator::Math(m) => m,
                    other => {
                        return Err(ExpressionError::InvalidField {
                            id,
                            field: "Operator",
                            reason: format!("{} is a {}", other.id(), other.family()),
                        });
                    }
                };
                **right = registry.decode(field(fields, id, "Right")?)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn prototypes(registry: &Registry) -> &BTreeMap<&'static str, Self> {
        &registry.values
    }
}
