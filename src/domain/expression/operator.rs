//! Pure arithmetic, comparison and logic operators.
//!
//! Each operator knows the finite set of siblings it can be swapped for
//! (`alternatives`); the id of an operator is part of the file format.

use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;

use super::node::{AnyNode, Node, NodeKind, NodeRef, out_of_range, tagged};
use super::registry::Registry;
use crate::domain::context::RuntimeContext;
use crate::domain::error::ExpressionError;

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MathOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    Less,
    Greater,
    Equal,
    NotEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicOperator {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Math(MathOperator),
    NumberComparison(ComparisonOperator),
    StringComparison(ComparisonOperator),
    Logic(LogicOperator),
}

impl MathOperator {
    pub const ALL: [MathOperator; 5] = [
        MathOperator::Add,
        MathOperator::Subtract,
        MathOperator::Multiply,
        MathOperator::Divide,
        MathOperator::Power,
    ];

    pub fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            MathOperator::Add => left + right,
            MathOperator::Subtract => left - right,
            MathOperator::Multiply => left * right,
            MathOperator::Divide => left / right,
            MathOperator::Power => left.powf(right),
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            MathOperator::Add => "+",
            MathOperator::Subtract => "-",
            MathOperator::Multiply => "*",
            MathOperator::Divide => "/",
            MathOperator::Power => "^",
        }
    }
}

impl ComparisonOperator {
    pub const ALL: [ComparisonOperator; 4] = [
        ComparisonOperator::Less,
        ComparisonOperator::Greater,
        ComparisonOperator::Equal,
        ComparisonOperator::NotEqual,
    ];

    /// Equality is within 1e-9. Any comparison with NaN is false except
    /// `NotEqual`.
    pub fn compare_numbers(self, left: f64, right: f64) -> bool {
        match self {
            ComparisonOperator::Less => left < right,
            ComparisonOperator::Greater => left > right,
            ComparisonOperator::Equal => (left - right).abs() < EPSILON,
            ComparisonOperator::NotEqual => !((left - right).abs() < EPSILON),
        }
    }

    pub fn compare_text(self, left: &str, right: &str) -> bool {
        match self {
            ComparisonOperator::Less => left < right,
            ComparisonOperator::Greater => left > right,
            ComparisonOperator::Equal => left == right,
            ComparisonOperator::NotEqual => left != right,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOperator::Less => "<",
            ComparisonOperator::Greater => ">",
            ComparisonOperator::Equal => "==",
            ComparisonOperator::NotEqual => "!=",
        }
    }
}

impl LogicOperator {
    pub const ALL: [LogicOperator; 2] = [LogicOperator::And, LogicOperator::Or];

    pub fn combine(self, left: bool, right: bool) -> bool {
        match self {
            LogicOperator::And => left && right,
            LogicOperator::Or => left || right,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            LogicOperator::And => "AND",
            LogicOperator::Or => "OR",
        }
    }
}

impl Operator {
    /// Every operator, grouped by family.
    pub fn all() -> Vec<Operator> {
        let mut all: Vec<Operator> = MathOperator::ALL.iter().map(|&m| Operator::Math(m)).collect();
        all.extend(ComparisonOperator::ALL.iter().map(|&c| Operator::NumberComparison(c)));
        all.extend(ComparisonOperator::ALL.iter().map(|&c| Operator::StringComparison(c)));
        all.extend(LogicOperator::ALL.iter().map(|&l| Operator::Logic(l)));
        all
    }

    /// The operators this one may be swapped for, itself included.
    pub fn alternatives(&self) -> Vec<Operator> {
        match self {
            Operator::Math(_) => MathOperator::ALL.iter().map(|&m| Operator::Math(m)).collect(),
            Operator::NumberComparison(_) => ComparisonOperator::ALL
                .iter()
                .map(|&c| Operator::NumberComparison(c))
                .collect(),
            Operator::StringComparison(_) => ComparisonOperator::ALL
                .iter()
                .map(|&c| Operator::StringComparison(c))
                .collect(),
            Operator::Logic(_) => LogicOperator::ALL.iter().map(|&l| Operator::Logic(l)).collect(),
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Math(m) => m.symbol(),
            Operator::NumberComparison(c) | Operator::StringComparison(c) => c.symbol(),
            Operator::Logic(l) => l.symbol(),
        }
    }

    pub fn family(&self) -> &'static str {
        match self {
            Operator::Math(_) => "math operator",
            Operator::NumberComparison(_) => "number comparison operator",
            Operator::StringComparison(_) => "string comparison operator",
            Operator::Logic(_) => "logic operator",
        }
    }
}

impl Node for Operator {
    const KIND: NodeKind = NodeKind::Operator;

    fn id(&self) -> &'static str {
        match self {
            Operator::Math(MathOperator::Add) => "Add",
            Operator::Math(MathOperator::Subtract) => "Subtract",
            Operator::Math(MathOperator::Multiply) => "Multiply",
            Operator::Math(MathOperator::Divide) => "Divide",
            Operator::Math(MathOperator::Power) => "Power",
            Operator::NumberComparison(c) => match c {
                ComparisonOperator::Less => "NumberLess",
                ComparisonOperator::Greater => "NumberGreater",
                ComparisonOperator::Equal => "NumberEqual",
                ComparisonOperator::NotEqual => "NumberNotEqual",
            },
            Operator::StringComparison(c) => match c {
                ComparisonOperator::Less => "StringLess",
                ComparisonOperator::Greater => "StringGreater",
                ComparisonOperator::Equal => "StringEqual",
                ComparisonOperator::NotEqual => "StringNotEqual",
            },
            Operator::Logic(LogicOperator::And) => "And",
            Operator::Logic(LogicOperator::Or) => "Or",
        }
    }

    fn children(&self) -> Vec<NodeRef<'_>> {
        Vec::new()
    }

    fn replace_child(&mut self, index: usize, _child: AnyNode) -> Result<(), ExpressionError> {
        Err(out_of_range(self.id(), index, 0))
    }

    fn render(&self, _ctx: &RuntimeContext) -> String {
        self.symbol().to_string()
    }

    fn to_json(&self) -> Json {
        Json::Object(tagged(self.id()))
    }

    fn populate(&mut self, _fields: &Map<String, Json>, _registry: &Registry) -> Result<(), ExpressionError> {
        Ok(())
    }

    fn prototypes(registry: &Registry) -> &BTreeMap<&'static str, Self> {
        &registry.operators
    }
}
