//! Lookup tables from node id to prototype, one namespace per family.
//!
//! A registry is an ordinary value: build it once with
//! [`Registry::standard`] and pass it to whatever decodes strategies.

use serde_json::Value as Json;
use std::collections::BTreeMap;

use super::action::Action;
use super::condition::Condition;
use super::node::{Node, NodeKind};
use super::operator::Operator;
use super::value::Value;
use crate::domain::error::ExpressionError;

#[derive(Debug, Clone)]
pub struct Registry {
    pub(crate) values: BTreeMap<&'static str, Value>,
    pub(crate) operators: BTreeMap<&'static str, Operator>,
    pub(crate) conditions: BTreeMap<&'static str, Condition>,
    pub(crate) actions: BTreeMap<&'static str, Action>,
}

fn table<N: Node>(prototypes: Vec<N>) -> BTreeMap<&'static str, N> {
    prototypes.into_iter().map(|p| (p.id(), p)).collect()
}

impl Registry {
    /// Every built-in node.
    pub fn standard() -> Self {
        Registry {
            values: table(Value::prototypes()),
            operators: table(Operator::all()),
            conditions: table(Condition::prototypes()),
            actions: table(Action::prototypes()),
        }
    }

    /// Decode a tagged object: look the `Id` up in `N`'s namespace, clone
    /// the prototype and populate it from the remaining fields.
    pub fn decode<N: Node>(&self, json: &Json) -> Result<N, ExpressionError> {
        let namespace = N::KIND.namespace();
        let fields = json
            .as_object()
            .ok_or(ExpressionError::NotAnObject { namespace })?;
        let id = fields
            .get("Id")
            .and_then(Json::as_str)
            .ok_or(ExpressionError::MissingId { namespace })?;
        let mut node = N::prototypes(self)
            .get(id)
            .cloned()
            .ok_or_else(|| ExpressionError::UnknownId {
                namespace,
                id: id.to_string(),
            })?;
        node.populate(fields, self)?;
        Ok(node)
    }

    /// Registered ids of family `N`, sorted.
    pub fn ids<N: Node>(&self) -> Vec<&'static str> {
        N::prototypes(self).keys().copied().collect()
    }

    pub fn count(&self, kind: NodeKind) -> usize {
        match kind {
            NodeKind::Value => self.values.len(),
            NodeKind::Operator => self.operators.len(),
            NodeKind::Condition => self.conditions.len(),
            NodeKind::Action => self.actions.len(),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn standard_tables() {
        let registry = Registry::standard();
        assert_eq!(registry.count(NodeKind::Value), 8);
        assert_eq!(registry.count(NodeKind::Operator), 15);
        assert_eq!(registry.count(NodeKind::Condition), 4);
        assert_eq!(registry.count(NodeKind::Action), 8);
        assert!(registry.ids::<Action>().contains(&"MultiAction"));
        assert!(registry.ids::<Value>().contains(&"MathValue"));
    }

    #[test]
    fn namespaces_are_separate() {
        let registry = Registry::standard();
        // "Boolean" is a condition, not a value
        assert!(matches!(
            registry.decode::<Value>(&json!({"Id": "Boolean", "Value": true})),
            Err(ExpressionError::UnknownId { namespace: "value", .. })
        ));
        assert_eq!(
            registry.decode::<Condition>(&json!({"Id": "Boolean", "Value": true})).unwrap(),
            Condition::Boolean(true)
        );
    }

    #[test]
    fn malformed_input() {
        let registry = Registry::standard();
        assert!(matches!(
            registry.decode::<Action>(&json!("PurchaseMax")),
            Err(ExpressionError::NotAnObject { namespace: "action" })
        ));
        assert!(matches!(
            registry.decode::<Action>(&json!({"Name": "x"})),
            Err(ExpressionError::MissingId { namespace: "action" })
        ));
        assert!(matches!(
            registry.decode::<Operator>(&json!({"Id": "Modulo"})),
            Err(ExpressionError::UnknownId { .. })
        ));
    }

    #[test]
    fn decoded_nodes_are_independent_of_prototypes() {
        let registry = Registry::standard();
        let decoded: Value = registry.decode(&json!({"Id": "Constant", "Value": 42.0})).unwrap();
        assert_eq!(decoded, Value::number(42.0));
        assert_eq!(registry.values["Constant"], Value::number(0.0));
    }
}
