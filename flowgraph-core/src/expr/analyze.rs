//! Static analysis of scripts: which variables must be supplied from outside
//! (the operator's inlets), and renaming of those variables.

use std::collections::{HashMap, HashSet};

use super::ast::{Expr, Stmt};

/// Variables read before being assigned, unique, in order of first read.
pub(crate) fn unbound_variables(statements: &[Stmt]) -> Vec<String> {
    let mut assigned: HashSet<&str> = HashSet::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut unbound = Vec::new();

    for stmt in statements {
        match stmt {
            Stmt::Assign { name, value } => {
                collect_reads(value, &assigned, &mut seen, &mut unbound);
                assigned.insert(name);
            }
            Stmt::Expr(expr) => collect_reads(expr, &assigned, &mut seen, &mut unbound),
        }
    }
    unbound
}

fn collect_reads<'a>(
    expr: &'a Expr,
    assigned: &HashSet<&'a str>,
    seen: &mut HashSet<&'a str>,
    unbound: &mut Vec<String>,
) {
    match expr {
        Expr::Number(_) => {}
        Expr::Variable(name) => {
            if !assigned.contains(name.as_str()) && seen.insert(name) {
                unbound.push(name.clone());
            }
        }
        Expr::Unary { operand, .. } => collect_reads(operand, assigned, seen, unbound),
        Expr::Binary { lhs, rhs, .. } => {
            collect_reads(lhs, assigned, seen, unbound);
            collect_reads(rhs, assigned, seen, unbound);
        }
        Expr::Call { args, .. } => {
            for arg in args {
                collect_reads(arg, assigned, seen, unbound);
            }
        }
    }
}

/// Rewrite reads of unbound variables according to `renames`.
///
/// Reads of script locals are left alone, even when a local shares its name
/// with a renamed variable, as long as the read happens after the local was
/// assigned.
pub(crate) fn rename_unbound(statements: &[Stmt], renames: &HashMap<String, String>) -> Vec<Stmt> {
    let mut assigned: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(statements.len());

    for stmt in statements {
        match stmt {
            Stmt::Assign { name, value } => {
                let value = rename_reads(value, &assigned, renames);
                assigned.insert(name.clone());
                out.push(Stmt::Assign {
                    name: name.clone(),
                    value,
                });
            }
            Stmt::Expr(expr) => out.push(Stmt::Expr(rename_reads(expr, &assigned, renames))),
        }
    }
    out
}

fn rename_reads(expr: &Expr, assigned: &HashSet<String>, renames: &HashMap<String, String>) -> Expr {
    match expr {
        Expr::Number(value) => Expr::Number(*value),
        Expr::Variable(name) => {
            let renamed = if assigned.contains(name) {
                None
            } else {
                renames.get(name)
            };
            Expr::Variable(renamed.unwrap_or(name).clone())
        }
        Expr::Unary { op, operand } => Expr::Unary {
            op: *op,
            operand: Box::new(rename_reads(operand, assigned, renames)),
        },
        Expr::Binary { op, lhs, rhs } => Expr::Binary {
            op: *op,
            lhs: Box::new(rename_reads(lhs, assigned, renames)),
            rhs: Box::new(rename_reads(rhs, assigned, renames)),
        },
        Expr::Call { function, args } => Expr::Call {
            function: function.clone(),
            args: args
                .iter()
                .map(|arg| rename_reads(arg, assigned, renames))
                .collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parser::parse_script;

    fn unbound(source: &str) -> Vec<String> {
        unbound_variables(&parse_script(source).unwrap())
    }

    #[test]
    fn unbound_in_order_of_first_read() {
        assert_eq!(unbound("b + a * b"), vec!["b", "a"]);
    }

    #[test]
    fn function_names_are_not_variables() {
        assert_eq!(unbound("max(x, y)"), vec!["x", "y"]);
    }

    #[test]
    fn assigned_locals_are_bound() {
        assert_eq!(unbound("t = a * 2; t + b"), vec!["a", "b"]);
    }

    #[test]
    fn read_before_assignment_is_unbound() {
        assert_eq!(unbound("y = x; x = 2; x + y"), vec!["x"]);
    }

    #[test]
    fn self_referencing_assignment_reads_the_inlet() {
        assert_eq!(unbound("a = a + 1; a"), vec!["a"]);
    }

    #[test]
    fn rename_touches_only_unbound_reads() {
        let statements = parse_script("a = a + b; a * b").unwrap();
        let renames = HashMap::from([
            ("a".to_string(), "x".to_string()),
            ("b".to_string(), "y".to_string()),
        ]);
        let renamed = rename_unbound(&statements, &renames);
        let text: Vec<String> = renamed.iter().map(ToString::to_string).collect();
        assert_eq!(text, vec!["a = x + y", "a * y"]);
    }
}
