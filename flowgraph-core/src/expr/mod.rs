//! Operator Expressions
//!
//! Every operator computes its outlet values from its inlet values through an
//! [`Expression`]. Two kinds exist:
//!
//! - **Scripts**: small arithmetic programs written by the user in the
//!   editor. The variables a script reads without assigning them first are
//!   its *unbound variables*; they define the operator's inlets, one inlet
//!   per variable, in order of first appearance. A script has a single
//!   outlet named `result`.
//!
//! - **Native expressions**: Rust closures with declared inlet and outlet
//!   names, for operators implemented by the host application.
//!
//! # Script syntax
//!
//! ```text
//! t = max(a, b)        # assignment binds a local
//! clamp(t * 2, 0, 10)  # the last expression is the result
//! ```
//!
//! Statements are separated by newlines or `;`. Operators, loosest first:
//! comparisons (`< <= > >= == !=`, yielding 1 or 0), `+ -`, `* / %`,
//! prefix `- +`, and right-associative `^`.

mod analyze;
mod ast;
mod interpret;
mod parser;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use smallvec::{smallvec, SmallVec};
use thiserror::Error;

pub use ast::{BinaryOp, Expr, Stmt, UnaryOp};
pub use interpret::BUILTINS;

/// The value carried by links.
pub type Value = f64;

/// Values produced by one execution, one per outlet.
pub type Outputs = SmallVec<[Value; 1]>;

/// Name of the single outlet of a script operator.
pub const RESULT_OUTLET: &str = "result";

/// Errors raised while parsing or executing an expression.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("Parse error at offset {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("Unknown function `{0}`")]
    UnknownFunction(String),

    #[error("Function `{function}` expects {expected} argument(s), got {found}")]
    Arity {
        function: String,
        expected: String,
        found: usize,
    },

    #[error("Variable `{0}` has no value")]
    UnboundVariable(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Result is not a finite number: {0}")]
    NonFinite(Value),

    #[error("Expected {expected} output value(s), got {found}")]
    OutletArity { expected: usize, found: usize },

    #[error("{0}")]
    Native(String),
}

/// A parsed script together with its unbound variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    source: String,
    statements: Vec<Stmt>,
    unbound: Vec<String>,
}

impl Script {
    /// Parse a script.
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let statements = parser::parse_script(source)?;
        Ok(Self::from_statements(source.to_string(), statements))
    }

    fn from_statements(source: String, statements: Vec<Stmt>) -> Self {
        let unbound = analyze::unbound_variables(&statements);
        Self {
            source,
            statements,
            unbound,
        }
    }

    /// The text the script was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn statements(&self) -> &[Stmt] {
        &self.statements
    }

    /// Variables read before being assigned, in order of first read.
    pub fn unbound_variables(&self) -> &[String] {
        &self.unbound
    }

    /// Return a copy with unbound variables renamed.
    ///
    /// The source of the result is the canonical rendering of the rewritten
    /// statements.
    pub fn rename_variables(&self, renames: &HashMap<String, String>) -> Self {
        let statements = analyze::rename_unbound(&self.statements, renames);
        let source = statements
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        Self::from_statements(source, statements)
    }

    /// Run the script with `inputs` bound to its unbound variables,
    /// positionally.
    pub fn evaluate(&self, inputs: &[Value]) -> Result<Value, ExprError> {
        let mut scope: interpret::Scope = self
            .unbound
            .iter()
            .cloned()
            .zip(inputs.iter().copied())
            .collect();
        interpret::run(&self.statements, &mut scope)
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

type NativeFn = dyn Fn(&[Value]) -> Result<Outputs, ExprError> + Send + Sync;

/// An expression implemented in Rust.
#[derive(Clone)]
pub struct NativeExpression {
    label: String,
    inlets: Vec<String>,
    outlets: Vec<String>,
    function: Arc<NativeFn>,
}

impl NativeExpression {
    /// A native expression with a single `result` outlet.
    pub fn new<F>(label: impl Into<String>, inlets: &[&str], function: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, ExprError> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            inlets: inlets.iter().map(|s| s.to_string()).collect(),
            outlets: vec![RESULT_OUTLET.to_string()],
            function: Arc::new(move |inputs: &[Value]| {
                function(inputs).map(|value| smallvec![value])
            }),
        }
    }

    /// A native expression producing one value per named outlet.
    pub fn with_outlets<F>(
        label: impl Into<String>,
        inlets: &[&str],
        outlets: &[&str],
        function: F,
    ) -> Self
    where
        F: Fn(&[Value]) -> Result<Outputs, ExprError> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            inlets: inlets.iter().map(|s| s.to_string()).collect(),
            outlets: outlets.iter().map(|s| s.to_string()).collect(),
            function: Arc::new(function),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for NativeExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeExpression")
            .field("label", &self.label)
            .field("inlets", &self.inlets)
            .field("outlets", &self.outlets)
            .finish()
    }
}

/// The computation of an operator.
#[derive(Debug, Clone)]
pub enum Expression {
    Script(Script),
    Native(NativeExpression),
}

impl Expression {
    /// Parse a script expression.
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        Script::parse(source).map(Expression::Script)
    }

    /// Names of the inputs, in inlet order.
    pub fn inlet_names(&self) -> &[String] {
        match self {
            Expression::Script(script) => script.unbound_variables(),
            Expression::Native(native) => &native.inlets,
        }
    }

    /// Names of the outputs, in outlet order.
    pub fn outlet_names(&self) -> Vec<String> {
        match self {
            Expression::Script(_) => vec![RESULT_OUTLET.to_string()],
            Expression::Native(native) => native.outlets.clone(),
        }
    }

    /// Text shown for the expression: the script source, or the label of a
    /// native expression.
    pub fn source(&self) -> &str {
        match self {
            Expression::Script(script) => script.source(),
            Expression::Native(native) => native.label(),
        }
    }

    /// Execute with one input value per inlet.
    ///
    /// The number of produced values is checked against the outlets.
    pub fn execute(&self, inputs: &[Value]) -> Result<Outputs, ExprError> {
        let outputs = match self {
            Expression::Script(script) => smallvec![script.evaluate(inputs)?],
            Expression::Native(native) => {
                let outputs = (native.function)(inputs)?;
                if let Some(bad) = outputs.iter().find(|value| !value.is_finite()) {
                    return Err(ExprError::NonFinite(*bad));
                }
                outputs
            }
        };

        let expected = match self {
            Expression::Script(_) => 1,
            Expression::Native(native) => native.outlets.len(),
        };
        if outputs.len() != expected {
            return Err(ExprError::OutletArity {
                expected,
                found: outputs.len(),
            });
        }
        Ok(outputs)
    }
}

impl From<Script> for Expression {
    fn from(script: Script) -> Self {
        Expression::Script(script)
    }
}

impl From<NativeExpression> for Expression {
    fn from(native: NativeExpression) -> Self {
        Expression::Native(native)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_inlets_follow_unbound_variables() {
        let expr = Expression::parse("x * 2 + y").unwrap();
        assert_eq!(expr.inlet_names(), ["x", "y"]);
        assert_eq!(expr.outlet_names(), vec!["result"]);
        assert_eq!(expr.source(), "x * 2 + y");
    }

    #[test]
    fn script_executes_positionally() {
        let expr = Expression::parse("x - y").unwrap();
        assert_eq!(expr.execute(&[5.0, 3.0]).unwrap().as_slice(), &[2.0]);
    }

    #[test]
    fn rename_updates_source_and_inlets() {
        let script = Script::parse("a + b * a").unwrap();
        let renamed = script.rename_variables(&HashMap::from([("a".to_string(), "k".to_string())]));
        assert_eq!(renamed.source(), "k + b * k");
        assert_eq!(renamed.unbound_variables(), ["k", "b"]);
    }

    #[test]
    fn native_expression_checks_outlet_arity() {
        let native = NativeExpression::with_outlets("split", &["v"], &["lo", "hi"], |inputs| {
            Ok(smallvec![inputs[0].floor()])
        });
        let expr = Expression::from(native);
        assert_eq!(
            expr.execute(&[2.5]),
            Err(ExprError::OutletArity {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn native_expression_rejects_non_finite_values() {
        let expr = Expression::from(NativeExpression::new("inf", &[], |_| Ok(f64::INFINITY)));
        assert!(matches!(expr.execute(&[]), Err(ExprError::NonFinite(_))));
    }

    #[test]
    fn native_expression_runs_closure() {
        let expr = Expression::from(NativeExpression::new("sum", &["a", "b"], |inputs| {
            Ok(inputs.iter().sum())
        }));
        assert_eq!(expr.inlet_names(), ["a", "b"]);
        assert_eq!(expr.execute(&[1.0, 2.0]).unwrap()[0], 3.0);
    }
}
