//! Actions: side effects executed against a runtime context.

use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;

use super::node::{AnyNode, Node, NodeKind, NodeRef, field, number_field, out_of_range, string_field, tagged};
use super::registry::Registry;
use super::value::Value;
use crate::domain::context::RuntimeContext;
use crate::domain::error::ExpressionError;
use crate::domain::execution::Order;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Nothing,
    PurchaseMax,
    SellMax,
    /// Buy a fixed number of asset units.
    Purchase { amount: f64 },
    /// Sell a fixed number of asset units.
    Sell { amount: f64 },
    /// Append a message to the context's note log.
    Log { message: String },
    /// Evaluate `value` now and rebind `name` to the result.
    SetVariable { name: String, value: Value },
    /// Run `first`, then `second`.
    Multi { first: Box<Action>, second: Box<Action> },
}

impl Action {
    pub fn multi(first: Action, second: Action) -> Self {
        Action::Multi {
            first: Box::new(first),
            second: Box::new(second),
        }
    }

    pub fn set_variable(name: impl Into<String>, value: Value) -> Self {
        Action::SetVariable {
            name: name.into(),
            value,
        }
    }

    pub(crate) fn prototypes() -> Vec<Action> {
        vec![
            Action::Nothing,
            Action::PurchaseMax,
            Action::SellMax,
            Action::Purchase { amount: 0.0 },
            Action::Sell { amount: 0.0 },
            Action::Log {
                message: String::new(),
            },
            Action::set_variable("", Value::number(0.0)),
            Action::multi(Action::Nothing, Action::Nothing),
        ]
    }

    pub fn execute(&self, ctx: &mut RuntimeContext) {
        match self {
            Action::Nothing => {}
            Action::PurchaseMax => ctx.submit(Order::PurchaseMax),
            Action::SellMax => ctx.submit(Order::SellMax),
            Action::Purchase { amount } => ctx.submit(Order::Purchase(*amount)),
            Action::Sell { amount } => ctx.submit(Order::Sell(*amount)),
            Action::Log { message } => ctx.add_note(message.clone()),
            Action::SetVariable { name, value } => {
                let result = value.evaluate(ctx);
                ctx.bind(name.clone(), Value::Constant(result));
            }
            Action::Multi { first, second } => {
                first.execute(ctx);
                second.execute(ctx);
            }
        }
    }
}

impl Node for Action {
    const KIND: NodeKind = NodeKind::Action;

    fn id(&self) -> &'static str {
        match self {
            Action::Nothing => "Nothing",
            Action::PurchaseMax => "PurchaseMax",
            Action::SellMax => "SellMax",
            Action::Purchase { .. } => "Purchase",
            Action::Sell { .. } => "Sell",
            Action::Log { .. } => "Log",
            Action::SetVariable { .. } => "SetVariable",
            Action::Multi { .. } => "MultiAction",
        }
    }

    fn children(&self) -> Vec<NodeRef<'_>> {
        match self {
            Action::SetVariable { value, .. } => vec![NodeRef::Value(value)],
            Action::Multi { first, second } => vec![NodeRef::Action(first), NodeRef::Action(second)],
            _ => Vec::new(),
        }
    }

    fn replace_child(&mut self, index: usize, child: AnyNode) -> Result<(), ExpressionError> {
        let id = self.id();
        match self {
            Action::SetVariable { value, .. } => match index {
                0 => *value = child.into_value(id, index)?,
                _ => return Err(out_of_range(id, index, 1)),
            },
            Action::Multi { first, second } => match index {
                0 => **first = child.into_action(id, index)?,
                1 => **second = child.into_action(id, index)?,
                _ => return Err(out_of_range(id, index, 2)),
            },
            _ => return Err(out_of_range(id, index, 0)),
        }
        Ok(())
    }

    fn render(&self, ctx: &RuntimeContext) -> String {
        match self {
            Action::Nothing => "do nothing".to_string(),
            Action::PurchaseMax => "purchase max".to_string(),
            Action::SellMax => "sell max".to_string(),
            Action::Purchase { amount } => format!("purchase {}", amount),
            Action::Sell { amount } => format!("sell {}", amount),
            Action::Log { message } => format!("log \"{}\"", message),
            Action::SetVariable { name, value } => format!("{} := {}", name, value.render(ctx)),
            Action::Multi { first, second } => format!("{}, then {}", first.render(ctx), second.render(ctx)),
        }
    }

    fn to_json(&self) -> Json {
        let mut map = tagged(self.id());
        match self {
            Action::Purchase { amount } | Action::Sell { amount } => {
                map.insert("Amount".into(), Json::from(*amount));
            }
            Action::Log { message } => {
                map.insert("Message".into(), Json::String(message.clone()));
            }
            Action::SetVariable { name, value } => {
                map.insert("Name".into(), Json::String(name.clone()));
                map.insert("Value".into(), value.to_json());
            }
            Action::Multi { first, second } => {
                map.insert("First".into(), first.to_json());
                map.insert("Second".into(), second.to_json());
            }
            Action::Nothing | Action::PurchaseMax | Action::SellMax => {}
        }
        Json::Object(map)
    }

    fn populate(&mut self, fields: &Map<String, Json>, registry: &Registry) -> Result<(), ExpressionError> {
        let id = self.id();
        match self {
            Action::Purchase { amount } | Action::Sell { amount } => {
                *amount = number_field(fields, id, "Amount")?;
            }
            Action::Log { message } => {
                *message = string_field(fields, id, "Message")?;
            }
            Action::SetVariable { name, value } => {
                *name = string_field(fields, id, "Name")?;
                *value = registry.decode(field(fields, id, "Value")?)?;
            }
            Action::Multi { first, second } => {
                **first = registry.decode(field(fields, id, "First")?)?;
                **second = registry.decode(field(fields, id, "Second")?)?;
            }
            Action::Nothing | Action::PurchaseMax | Action::SellMax => {}
        }
        Ok(())
    }

    fn prototypes(registry: &Registry) -> &BTreeMap<&'static str, Self> {
        &registry.actions
    }
}
