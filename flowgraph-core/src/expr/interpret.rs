//! Tree-walking interpreter for scripts.

use std::collections::HashMap;

use super::ast::{BinaryOp, Expr, Stmt, UnaryOp};
use super::{ExprError, Value};

/// Variable bindings visible to a running script.
pub(crate) type Scope = HashMap<String, Value>;

/// Run `statements` and return the value of the last expression statement.
pub(crate) fn run(statements: &[Stmt], scope: &mut Scope) -> Result<Value, ExprError> {
    let mut result = None;
    for stmt in statements {
        match stmt {
            Stmt::Assign { name, value } => {
                let value = eval(value, scope)?;
                scope.insert(name.clone(), value);
            }
            Stmt::Expr(expr) => result = Some(eval(expr, scope)?),
        }
    }
    // Parsing guarantees a trailing expression statement.
    let value = result.ok_or_else(|| ExprError::Native("script produced no value".to_string()))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ExprError::NonFinite(value))
    }
}

fn truth(condition: bool) -> Value {
    if condition {
        1.0
    } else {
        0.0
    }
}

fn eval(expr: &Expr, scope: &Scope) -> Result<Value, ExprError> {
    match expr {
        Expr::Number(value) => Ok(*value),
        Expr::Variable(name) => scope
            .get(name)
            .copied()
            .ok_or_else(|| ExprError::UnboundVariable(name.clone())),
        Expr::Unary { op, operand } => {
            let value = eval(operand, scope)?;
            Ok(match op {
                UnaryOp::Neg => -value,
                UnaryOp::Plus => value,
            })
        }
        Expr::Binary { op, lhs, rhs } => {
            let lhs = eval(lhs, scope)?;
            let rhs = eval(rhs, scope)?;
            binary(*op, lhs, rhs)
        }
        Expr::Call { function, args } => {
            let args = args
                .iter()
                .map(|arg| eval(arg, scope))
                .collect::<Result<Vec<_>, _>>()?;
            call(function, &args)
        }
    }
}

fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, ExprError> {
    Ok(match op {
        BinaryOp::Add => lhs + rhs,
        BinaryOp::Sub => lhs - rhs,
        BinaryOp::Mul => lhs * rhs,
        BinaryOp::Div => {
            if rhs == 0.0 {
                return Err(ExprError::DivisionByZero);
            }
            lhs / rhs
        }
        // Floored modulo: the result takes the sign of the divisor.
        BinaryOp::Mod => {
            if rhs == 0.0 {
                return Err(ExprError::DivisionByZero);
            }
            lhs - rhs * (lhs / rhs).floor()
        }
        BinaryOp::Pow => lhs.powf(rhs),
        BinaryOp::Lt => truth(lhs < rhs),
        BinaryOp::Le => truth(lhs <= rhs),
        BinaryOp::Gt => truth(lhs > rhs),
        BinaryOp::Ge => truth(lhs >= rhs),
        BinaryOp::Eq => truth(lhs == rhs),
        BinaryOp::Ne => truth(lhs != rhs),
    })
}

/// Names of the builtin functions.
pub const BUILTINS: &[&str] = &[
    "abs", "min", "max", "sqrt", "floor", "ceil", "round", "sin", "cos", "tan", "exp", "ln",
    "pow", "clamp",
];

fn arity(function: &str, args: &[Value], expected: usize) -> Result<(), ExprError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ExprError::Arity {
            function: function.to_string(),
            expected: expected.to_string(),
            found: args.len(),
        })
    }
}

fn call(function: &str, args: &[Value]) -> Result<Value, ExprError> {
    let unary = |f: fn(Value) -> Value| -> Result<Value, ExprError> {
        arity(function, args, 1)?;
        Ok(f(args[0]))
    };

    match function {
        "abs" => unary(f64::abs),
        "sqrt" => unary(f64::sqrt),
        "floor" => unary(f64::floor),
        "ceil" => unary(f64::ceil),
        "round" => unary(f64::round),
        "sin" => unary(f64::sin),
        "cos" => unary(f64::cos),
        "tan" => unary(f64::tan),
        "exp" => unary(f64::exp),
        "ln" => unary(f64::ln),
        "pow" => {
            arity(function, args, 2)?;
            Ok(args[0].powf(args[1]))
        }
        "clamp" => {
            arity(function, args, 3)?;
            Ok(args[0].max(args[1]).min(args[2]))
        }
        "min" | "max" => {
            let Some((&first, rest)) = args.split_first() else {
                return Err(ExprError::Arity {
                    function: function.to_string(),
                    expected: "at least 1".to_string(),
                    found: 0,
                });
            };
            let pick: fn(Value, Value) -> Value = if function == "min" { f64::min } else { f64::max };
            Ok(rest.iter().fold(first, |acc, &value| pick(acc, value)))
        }
        _ => Err(ExprError::UnknownFunction(function.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parser::parse_script;

    fn run_with(source: &str, bindings: &[(&str, Value)]) -> Result<Value, ExprError> {
        let statements = parse_script(source).unwrap();
        let mut scope: Scope = bindings
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect();
        run(&statements, &mut scope)
    }

    #[test]
    fn evaluates_arithmetic() {
        assert_eq!(run_with("(x + y) * 2", &[("x", 5.0), ("y", 3.0)]), Ok(16.0));
        assert_eq!(run_with("2 ^ 3 ^ 2", &[]), Ok(512.0));
        assert_eq!(run_with("-2 ^ 2", &[]), Ok(-4.0));
        assert_eq!(run_with("-7 % 3", &[]), Ok(2.0));
    }

    #[test]
    fn comparisons_yield_one_or_zero() {
        assert_eq!(run_with("a < b", &[("a", 1.0), ("b", 2.0)]), Ok(1.0));
        assert_eq!(run_with("a == b", &[("a", 1.0), ("b", 2.0)]), Ok(0.0));
    }

    #[test]
    fn evaluates_locals_and_builtins() {
        let source = "t = max(a, b, 4)\nclamp(t * 2, 0, 10) + abs(-1)";
        assert_eq!(run_with(source, &[("a", 1.0), ("b", 3.0)]), Ok(9.0));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert_eq!(run_with("1 / x", &[("x", 0.0)]), Err(ExprError::DivisionByZero));
        assert_eq!(run_with("1 % x", &[("x", 0.0)]), Err(ExprError::DivisionByZero));
    }

    #[test]
    fn non_finite_result_is_an_error() {
        assert!(matches!(
            run_with("sqrt(x)", &[("x", -1.0)]),
            Err(ExprError::NonFinite(_))
        ));
    }

    #[test]
    fn unknown_function_and_arity_errors() {
        assert_eq!(
            run_with("nope(1)", &[]),
            Err(ExprError::UnknownFunction("nope".to_string()))
        );
        assert!(matches!(run_with("pow(1)", &[]), Err(ExprError::Arity { found: 1, .. })));
        assert!(matches!(run_with("min()", &[]), Err(ExprError::Arity { found: 0, .. })));
    }

    #[test]
    fn missing_binding_is_reported() {
        assert_eq!(
            run_with("a + 1", &[]),
            Err(ExprError::UnboundVariable("a".to_string()))
        );
    }
}
