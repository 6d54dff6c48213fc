//! Expression trees encoding user trading rules.
//!
//! Four closed families ([`Value`], [`Operator`], [`Condition`],
//! [`Action`]) share the [`Node`] contract. Trees are immutable during a
//! backtest; only user-variable bindings in the runtime context change.

pub mod action;
pub mod condition;
pub mod node;
pub mod operator;
pub mod registry;
pub mod value;

pub use action::Action;
pub use condition::Condition;
pub use node::{AnyNode, Node, NodeKind, NodeRef, walk};
pub use operator::{ComparisonOperator, LogicOperator, MathOperator, Operator};
pub use registry::Registry;
pub use value::{Scalar, Value};
