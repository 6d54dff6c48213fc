//! Conditions: boolean predicates over values.

use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;

use super::node::{AnyNode, Node, NodeKind, NodeRef, bool_field, child_mismatch, field, out_of_range, tagged};
use super::operator::{ComparisonOperator, LogicOperator, Operator};
use super::registry::Registry;
use super::value::Value;
use crate::domain::context::RuntimeContext;
use crate::domain::error::ExpressionError;

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Boolean(bool),
    NumberComparison {
        left: Value,
        operator: ComparisonOperator,
        right: Value,
    },
    StringComparison {
        left: Value,
        operator: ComparisonOperator,
        right: Value,
    },
    LogicComparison {
        left: Box<Condition>,
        operator: LogicOperator,
        right: Box<Condition>,
    },
}

impl Condition {
    pub fn compare_numbers(left: Value, operator: ComparisonOperator, right: Value) -> Self {
        Condition::NumberComparison {
            left,
            operator,
            right,
        }
    }

    pub fn compare_text(left: Value, operator: ComparisonOperator, right: Value) -> Self {
        Condition::StringComparison {
            left,
            operator,
            right,
        }
    }

    pub fn logic(left: Condition, operator: LogicOperator, right: Condition) -> Self {
        Condition::LogicComparison {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }
    }

    pub(crate) fn prototypes() -> Vec<Condition> {
        vec![
            Condition::Boolean(false),
            Condition::compare_numbers(Value::number(0.0), ComparisonOperator::Equal, Value::number(0.0)),
            Condition::compare_text(Value::text(""), ComparisonOperator::Equal, Value::text("")),
            Condition::logic(Condition::Boolean(false), LogicOperator::And, Condition::Boolean(false)),
        ]
    }

    pub fn is_true(&self, ctx: &RuntimeContext) -> bool {
        match self {
            Condition::Boolean(b) => *b,
            Condition::NumberComparison {
                left,
                operator,
                right,
            } => operator.compare_numbers(left.evaluate_number(ctx), right.evaluate_number(ctx)),
            Condition::StringComparison {
                left,
                operator,
                right,
            } => operator.compare_text(&left.evaluate(ctx).as_text(), &right.evaluate(ctx).as_text()),
            Condition::LogicComparison {
                left,
                operator,
                right,
            } => operator.combine(left.is_true(ctx), right.is_true(ctx)),
        }
    }

    fn operator(&self) -> Option<Operator> {
        match self {
            Condition::Boolean(_) => None,
            Condition::NumberComparison { operator, .. } => Some(Operator::NumberComparison(*operator)),
            Condition::StringComparison { operator, .. } => Some(Operator::StringComparison(*operator)),
            Condition::LogicComparison { operator, .. } => Some(Operator::Logic(*operator)),
        }
    }

    /// Install `op` if it belongs to this condition's operator family.
    fn set_operator(&mut self, op: Operator) -> Result<(), Operator> {
        match (self, op) {
            (Condition::NumberComparison { operator, .. }, Operator::NumberComparison(c)) => *operator = c,
            (Condition::StringComparison { operator, .. }, Operator::StringComparison(c)) => *operator = c,
            (Condition::LogicComparison { operator, .. }, Operator::Logic(l)) => *operator = l,
            (_, other) => return Err(other),
        }
        Ok(())
    }
}

impl Node for Condition {
    const KIND: NodeKind = NodeKind::Condition;

    fn id(&self) -> &'static str {
        match self {
            Condition::Boolean(_) => "Boolean",
            Condition::NumberComparison { .. } => "NumberComparison",
            Condition::StringComparison { .. } => "StringComparison",
            Condition::LogicComparison { .. } => "LogicComparison",
        }
    }

    fn children(&self) -> Vec<NodeRef<'_>> {
        match self {
            Condition::Boolean(_) => Vec::new(),
            Condition::NumberComparison { left, operator, right } => vec![
                NodeRef::Value(left),
                NodeRef::Operator(Operator::NumberComparison(*operator)),
                NodeRef::Value(right),
            ],
            Condition::StringComparison { left, operator, right } => vec![
                NodeRef::Value(left),
                NodeRef::Operator(Operator::StringComparison(*operator)),
                NodeRef::Value(right),
            ],
            Condition::LogicComparison { left, operator, right } => vec![
                NodeRef::Condition(left),
                NodeRef::Operator(Operator::Logic(*operator)),
                NodeRef::Condition(right),
            ],
        }
    }

    fn replace_child(&mut self, index: usize, child: AnyNode) -> Result<(), ExpressionError> {
        let id = self.id();
        if let Condition::Boolean(_) = self {
            return Err(out_of_range(id, index, 0));
        }
        if index == 1 {
            let expected = self.operator().map_or("operator", |o| o.family());
            let op = child.into_operator(id, index)?;
            return self
                .set_operator(op)
                .map_err(|other| child_mismatch(id, index, expected, &AnyNode::Operator(other)));
        }
        if index > 2 {
            return Err(out_of_range(id, index, 3));
        }
        match self {
            Condition::NumberComparison { left, right, .. } | Condition::StringComparison { left, right, .. } => {
                let slot = if index == 0 { left } else { right };
                *slot = child.into_value(id, index)?;
            }
            Condition::LogicComparison { left, right, .. } => {
                let slot = if index == 0 { left } else { right };
                **slot = child.into_condition(id, index)?;
            }
            Condition::Boolean(_) => {}
        }
        Ok(())
    }

    fn render(&self, ctx: &RuntimeContext) -> String {
        match self {
            Condition::Boolean(b) => b.to_string(),
            Condition::NumberComparison { left, operator, right }
            | Condition::StringComparison { left, operator, right } => format!(
                "{} {} {}",
                left.render(ctx),
                operator.symbol(),
                right.render(ctx)
            ),
            Condition::LogicComparison { left, operator, right } => format!(
                "({} {} {})",
                left.render(ctx),
                operator.symbol(),
                right.render(ctx)
            ),
        }
    }

    fn to_json(&self) -> Json {
        let mut map = tagged(self.id());
        match self {
            Condition::Boolean(b) => {
                map.insert("Value".into(), Json::Bool(*b));
            }
            Condition::NumberComparison { left, right, .. } | Condition::StringComparison { left, right, .. } => {
                map.insert("Left".into(), left.to_json());
                map.insert("Right".into(), right.to_json());
            }
            Condition::LogicComparison { left, right, .. } => {
                map.insert("Left".into(), left.to_json());
                map.insert("Right".into(), right.to_json());
            }
        }
        if let Some(op) = self.operator() {
            map.insert("Operator".into(), op.to_json());
        }
        Json::Object(map)
    }

    fn populate(&mut self, fields: &Map<String, Json>, registry: &Registry) -> Result<(), ExpressionError> {
        let id = self.id();
        match self {
            Condition::Boolean(b) => {
                *b = bool_field(fields, id, "Value")?;
                return Ok(());
            }
            Condition::NumberComparison { left, right, .. } | Condition::StringComparison { left, right, .. } => {
                *left = registry.decode(field(fields, id, "Left")?)?;
                *right = registry.decode(field(fields, id, "Right")?)?;
            }
            Condition::LogicComparison { left, right, .. } => {
                **left = registry.decode(field(fields, id, "Left")?)?;
                **right = registry.decode(field(fields, id, "Right")?)?;
            }
        }
        let op: Operator = registry.decode(field(fields, id, "Operator")?)?;
        let expected = self.operator().map_or("operator", |o| o.family());
        self.set_operator(op).map_err(|other| ExpressionError::InvalidField {
            id,
            field: "Operator",
            reason: format!("expected a {}, found {}", expected, other.id()),
        })
    }

    fn prototypes(registry: &Registry) -> &BTreeMap<&'static str, Self> {
        &registry.conditions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::{Account, ExchangeAssumptions};
    use crate::domain::series::{Sample, TimeSeries};
    use std::sync::Arc;

    fn context() -> RuntimeContext {
        let series = TimeSeries::from_sorted(vec![Sample::new(0.0, 10.0)], 60.0);
        RuntimeContext::new(
            Arc::new(series),
            Account::new(100.0, 0.0),
            ExchangeAssumptions::default(),
            vec![("mode".to_string(), Value::text("buy"))],
        )
    }

    fn price_below(limit: f64) -> Condition {
        Condition::compare_numbers(Value::CurrentPrice, ComparisonOperator::Less, Value::number(limit))
    }

    #[test]
    fn number_comparison() {
        let ctx = context();
        assert!(price_below(11.0).is_true(&ctx));
        assert!(!price_below(9.0).is_true(&ctx));
    }

    #[test]
    fn string_comparison() {
        let ctx = context();
        let c = Condition::compare_text(Value::variable("mode"), ComparisonOperator::Equal, Value::text("buy"));
        assert!(c.is_true(&ctx));
        let c = Condition::compare_text(Value::variable("mode"), ComparisonOperator::Equal, Value::text("sell"));
        assert!(!c.is_true(&ctx));
    }

    #[test]
    fn logic_comparison() {
        let ctx = context();
        let both = Condition::logic(price_below(11.0), LogicOperator::And, Condition::Boolean(false));
        assert!(!both.is_true(&ctx));
        let either = Condition::logic(price_below(11.0), LogicOperator::Or, Condition::Boolean(false));
        assert!(either.is_true(&ctx));
    }

    #[test]
    fn nan_comparison_is_false() {
        let ctx = context();
        let c = Condition::compare_numbers(Value::variable("missing"), ComparisonOperator::Less, Value::number(1.0));
        assert!(!c.is_true(&ctx));
    }

    #[test]
    fn replace_operator_within_family() {
        let mut c = price_below(11.0);
        c.replace_child(1, Operator::NumberComparison(ComparisonOperator::Greater).into())
            .unwrap();
        assert_eq!(
            c,
            Condition::compare_numbers(Value::CurrentPrice, ComparisonOperator::Greater, Value::number(11.0))
        );
        assert!(matches!(
            c.replace_child(1, Operator::StringComparison(ComparisonOperator::Less).into()),
            Err(ExpressionError::ChildKindMismatch { index: 1, .. })
        ));
        assert!(matches!(
            c.replace_child(0, Condition::Boolean(true).into()),
            Err(ExpressionError::ChildKindMismatch { index: 0, .. })
        ));
        assert!(matches!(
            c.replace_child(5, Value::number(1.0).into()),
            Err(ExpressionError::ChildIndexOutOfRange { index: 5, .. })
        ));
    }

    #[test]
    fn replace_logic_children() {
        let mut c = Condition::logic(Condition::Boolean(true), LogicOperator::And, Condition::Boolean(true));
        c.replace_child(2, Condition::Boolean(false).into()).unwrap();
        assert!(!c.is_true(&context()));
        assert!(c.replace_child(0, Value::number(1.0).into()).is_err());
    }

    #[test]
    fn render() {
        let ctx = context();
        let c = Condition::logic(price_below(11.0), LogicOperator::Or, Condition::Boolean(false));
        assert_eq!(c.render(&ctx), "(price[=10] < 11 OR false)");
    }

    #[test]
    fn json_round_trip() {
        let registry = Registry::standard();
        let c = Condition::logic(price_below(11.0), LogicOperator::Or, Condition::Boolean(true));
        let json = c.to_json();
        assert_eq!(json["Operator"], serde_json::json!({"Id": "Or"}));
        assert_eq!(json["Left"]["Operator"], serde_json::json!({"Id": "NumberLess"}));
        assert_eq!(registry.decode::<Condition>(&json).unwrap(), c);
    }

    #[test]
    fn decode_rejects_operator_from_other_family() {
        let registry = Registry::standard();
        let json = serde_json::json!({
            "Id": "NumberComparison",
            "Left": {"Id": "CurrentPrice"},
            "Operator": {"Id": "StringLess"},
            "Right": {"Id": "Constant", "Value": 1.0}
        });
        assert!(matches!(
            registry.decode::<Condition>(&json),
            Err(ExpressionError::InvalidField { field: "Operator", .. })
        ));
    }
}
