//! Crate-wide error types.

use std::fmt;

use thiserror::Error;

use crate::expr::ExprError;
use crate::graph::{InletId, LinkId, OperatorId, OutletId};

/// An entity of the graph, as named by an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Operator(OperatorId),
    Inlet(InletId),
    Outlet(OutletId),
    Link(LinkId),
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Operator(id) => write!(f, "operator {id}"),
            Entity::Inlet(id) => write!(f, "inlet {id}"),
            Entity::Outlet(id) => write!(f, "outlet {id}"),
            Entity::Link(id) => write!(f, "link {id}"),
        }
    }
}

/// What a dangling reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dangling {
    /// A removal named an entity that is already gone.
    Absent(Entity),
    /// A link whose source or target operator is no longer in the graph.
    Link { link: LinkId, operator: OperatorId },
}

impl fmt::Display for Dangling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dangling::Absent(entity) => write!(f, "{entity} is already absent"),
            Dangling::Link { link, operator } => {
                write!(f, "{link} references removed operator {operator}")
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("{0} not found")]
    NotFound(Entity),

    #[error("Dangling reference: {0}")]
    DanglingReference(Dangling),

    #[error("Operator {0} is already in the graph")]
    DuplicateOperator(OperatorId),

    #[error("Inlet {inlet} is already fed by {link}")]
    InletOccupied { inlet: InletId, link: LinkId },

    #[error("Cyclic dependency: {operator} was re-entered during evaluation")]
    CyclicDependency { operator: OperatorId },

    #[error("Expression of {operator} failed: {source}")]
    Expression {
        operator: OperatorId,
        #[source]
        source: ExprError,
    },

    #[error("Invalid expression: {0}")]
    InvalidExpression(#[from] ExprError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GraphError {
    /// Structural errors are programmer errors: the caller referenced
    /// something that does not exist or left the graph inconsistent. They
    /// should fail fast rather than be retried.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            GraphError::NotFound(_)
                | GraphError::DanglingReference(_)
                | GraphError::DuplicateOperator(_)
                | GraphError::InletOccupied { .. }
        )
    }

    /// The operator an evaluation error is attributed to, if any.
    pub fn operator(&self) -> Option<OperatorId> {
        match self {
            GraphError::Expression { operator, .. }
            | GraphError::CyclicDependency { operator } => Some(*operator),
            GraphError::NotFound(Entity::Operator(id)) => Some(*id),
            GraphError::DanglingReference(Dangling::Link { operator, .. }) => Some(*operator),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_entity() {
        let err = GraphError::NotFound(Entity::Operator(OperatorId::from(7)));
        assert_eq!(err.to_string(), "operator op#7 not found");

        let err = GraphError::DanglingReference(Dangling::Link {
            link: LinkId::from(2),
            operator: OperatorId::from(9),
        });
        assert_eq!(
            err.to_string(),
            "Dangling reference: link#2 references removed operator op#9"
        );
    }

    #[test]
    fn structural_errors_are_classified() {
        let structural = GraphError::NotFound(Entity::Link(LinkId::from(1)));
        assert!(structural.is_structural());

        let data = GraphError::Expression {
            operator: OperatorId::from(1),
            source: ExprError::DivisionByZero,
        };
        assert!(!data.is_structural());
        assert_eq!(data.operator(), Some(OperatorId::from(1)));
    }
}
