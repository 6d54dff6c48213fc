//! Generic tree contract shared by the four expression families.
//!
//! Every node has a stable id, an ordered list of children addressed by
//! index, a rendering against a [`RuntimeContext`], and a tagged JSON form
//! `{"Id": .., fields..}` decoded through a [`Registry`].

use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;
use std::fmt;

use super::action::Action;
use super::condition::Condition;
use super::operator::Operator;
use super::registry::Registry;
use super::value::Value;
use crate::domain::context::RuntimeContext;
use crate::domain::error::ExpressionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Value,
    Operator,
    Condition,
    Action,
}

impl NodeKind {
    /// Registry namespace name.
    pub fn namespace(self) -> &'static str {
        match self {
            NodeKind::Value => "value",
            NodeKind::Operator => "operator",
            NodeKind::Condition => "condition",
            NodeKind::Action => "action",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.namespace())
    }
}

pub trait Node: Clone + fmt::Debug + Sized {
    const KIND: NodeKind;

    fn id(&self) -> &'static str;

    fn children(&self) -> Vec<NodeRef<'_>>;

    /// Replace child `index`. Fails when the index is out of range or the
    /// replacement belongs to the wrong family.
    fn replace_child(&mut self, index: usize, child: AnyNode) -> Result<(), ExpressionError>;

    fn render(&self, ctx: &RuntimeContext) -> String;

    fn to_json(&self) -> Json;

    /// Fill this node's fields from the JSON object it was decoded from.
    /// `self` is a fresh clone of the registry prototype.
    fn populate(&mut self, fields: &Map<String, Json>, registry: &Registry) -> Result<(), ExpressionError>;

    /// The registry table holding prototypes of this family.
    fn prototypes(registry: &Registry) -> &BTreeMap<&'static str, Self>;
}

/// Borrowed view of any node.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Value(&'a Value),
    Operator(Operator),
    Condition(&'a Condition),
    Action(&'a Action),
}

/// Owned node of any family, used to replace children.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyNode {
    Value(Value),
    Operator(Operator),
    Condition(Condition),
    Action(Action),
}

impl<'a> NodeRef<'a> {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeRef::Value(_) => NodeKind::Value,
            NodeRef::Operator(_) => NodeKind::Operator,
            NodeRef::Condition(_) => NodeKind::Condition,
            NodeRef::Action(_) => NodeKind::Action,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            NodeRef::Value(n) => n.id(),
            NodeRef::Operator(n) => n.id(),
            NodeRef::Condition(n) => n.id(),
            NodeRef::Action(n) => n.id(),
        }
    }

    pub fn children(&self) -> Vec<NodeRef<'a>> {
        match *self {
            NodeRef::Value(n) => n.children(),
            NodeRef::Operator(_) => Vec::new(),
            NodeRef::Condition(n) => n.children(),
            NodeRef::Action(n) => n.children(),
        }
    }

    pub fn render(&self, ctx: &RuntimeContext) -> String {
        match self {
            NodeRef::Value(n) => n.render(ctx),
            NodeRef::Operator(n) => n.render(ctx),
            NodeRef::Condition(n) => n.render(ctx),
            NodeRef::Action(n) => n.render(ctx),
        }
    }

    pub fn to_json(&self) -> Json {
        match self {
            NodeRef::Value(n) => n.to_json(),
            NodeRef::Operator(n) => n.to_json(),
            NodeRef::Condition(n) => n.to_json(),
            NodeRef::Action(n) => n.to_json(),
        }
    }

    pub fn to_owned_node(&self) -> AnyNode {
        match *self {
            NodeRef::Value(n) => AnyNode::Value(n.clone()),
            NodeRef::Operator(n) => AnyNode::Operator(n),
            NodeRef::Condition(n) => AnyNode::Condition(n.clone()),
            NodeRef::Action(n) => AnyNode::Action(n.clone()),
        }
    }
}

impl AnyNode {
    pub fn kind(&self) -> NodeKind {
        self.as_node_ref().kind()
    }

    pub fn as_node_ref(&self) -> NodeRef<'_> {
        match self {
            AnyNode::Value(n) => NodeRef::Value(n),
            AnyNode::Operator(n) => NodeRef::Operator(*n),
            AnyNode::Condition(n) => NodeRef::Condition(n),
            AnyNode::Action(n) => NodeRef::Action(n),
        }
    }

    fn describe(&self) -> String {
        format!("{} {}", self.kind(), self.as_node_ref().id())
    }

    pub(crate) fn into_value(self, id: &'static str, index: usize) -> Result<Value, ExpressionError> {
        match self {
            AnyNode::Value(v) => Ok(v),
            other => Err(child_mismatch(id, index, "value", &other)),
        }
    }

    pub(crate) fn into_operator(self, id: &'static str, index: usize) -> Result<Operator, ExpressionError> {
        match self {
            AnyNode::Operator(o) => Ok(o),
            other => Err(child_mismatch(id, index, "operator", &other)),
        }
    }

    pub(crate) fn into_condition(self, id: &'static str, index: usize) -> Result<Condition, ExpressionError> {
        match self {
            AnyNode::Condition(c) => Ok(c),
            other => Err(child_mismatch(id, index, "condition", &other)),
        }
    }

    pub(crate) fn into_action(self, id: &'static str, index: usize) -> Result<Action, ExpressionError> {
        match self {
            AnyNode::Action(a) => Ok(a),
            other => Err(child_mismatch(id, index, "action", &other)),
        }
    }
}

impl From<Value> for AnyNode {
    fn from(v: Value) -> Self {
        AnyNode::Value(v)
    }
}

impl From<Operator> for AnyNode {
    fn from(o: Operator) -> Self {
        AnyNode::Operator(o)
    }
}

impl From<Condition> for AnyNode {
    fn from(c: Condition) -> Self {
        AnyNode::Condition(c)
    }
}

impl From<Action> for AnyNode {
    fn from(a: Action) -> Self {
        AnyNode::Action(a)
    }
}

/// Depth-first, parent before children.
pub fn walk<'a>(node: NodeRef<'a>, visit: &mut dyn FnMut(NodeRef<'a>)) {
    visit(node);
    for child in node.children() {
        walk(child, visit);
    }
}

pub(crate) fn child_mismatch(
    id: &'static str,
    index: usize,
    expected: &str,
    found: &AnyNode,
) -> ExpressionError {
    ExpressionError::ChildKindMismatch {
        id,
        index,
        expected: expected.to_string(),
        found: found.describe(),
    }
}

pub(crate) fn out_of_range(id: &'static str, index: usize, len: usize) -> ExpressionError {
    ExpressionError::ChildIndexOutOfRange { id, index, len }
}

pub(crate) fn field<'a>(
    fields: &'a Map<String, Json>,
    id: &'static str,
    name: &'static str,
) -> Result<&'a Json, ExpressionError> {
    fields
        .get(name)
        .ok_or(ExpressionError::MissingField { id, field: name })
}

pub(crate) fn number_field(
    fields: &Map<String, Json>,
    id: &'static str,
    name: &'static str,
) -> Result<f64, ExpressionError> {
    field(fields, id, name)?
        .as_f64()
        .ok_or_else(|| ExpressionError::InvalidField {
            id,
            field: name,
            reason: "expected a number".to_string(),
        })
}

pub(crate) fn string_field(
    fields: &Map<String, Json>,
    id: &'static str,
    name: &'static str,
) -> Result<String, ExpressionError> {
    field(fields, id, name)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ExpressionError::InvalidField {
            id,
            field: name,
            reason: "expected a string".to_string(),
        })
}

pub(crate) fn bool_field(
    fields: &Map<String, Json>,
    id: &'static str,
    name: &'static str,
) -> Result<bool, ExpressionError> {
    field(fields, id, name)?
        .as_bool()
        .ok_or_else(|| ExpressionError::InvalidField {
            id,
            field: name,
            reason: "expected a boolean".to_string(),
        })
}

/// Start a tagged object with its `Id`.
pub(crate) fn tagged(id: &'static str) -> Map<String, Json> {
    let mut map = Map::new();
    map.insert("Id".to_string(), Json::String(id.to_string()));
    map
}
