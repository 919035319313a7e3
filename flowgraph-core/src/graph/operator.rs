//! Graph Operators
//!
//! This module defines the nodes of the operator graph and their ports.

use smallvec::{Array, SmallVec};

use super::ids::{InletId, OperatorId, OutletId};
use crate::expr::{ExprError, Expression, Value};

/// An input port. Binds one variable of the operator's expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Inlet {
    id: InletId,
    name: String,
    /// Value used while no link feeds the inlet.
    default: Value,
}

impl Inlet {
    fn new(name: &str, default: Value) -> Self {
        Self {
            id: InletId::new(),
            name: name.to_string(),
            default,
        }
    }

    pub fn id(&self) -> InletId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_value(&self) -> Value {
        self.default
    }
}

/// An output port. May feed any number of links.
#[derive(Debug, Clone, PartialEq)]
pub struct Outlet {
    id: OutletId,
    name: String,
}

impl Outlet {
    fn new(name: &str) -> Self {
        Self {
            id: OutletId::new(),
            name: name.to_string(),
        }
    }

    pub fn id(&self) -> OutletId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Ports whose identity can survive an expression change.
trait Port {
    type Id: Copy;

    fn id(&self) -> Self::Id;
    fn name(&self) -> &str;
    fn rename(&mut self, name: &str);
}

impl Port for Inlet {
    type Id = InletId;

    fn id(&self) -> InletId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn rename(&mut self, name: &str) {
        self.name = name.to_string();
    }
}

impl Port for Outlet {
    type Id = OutletId;

    fn id(&self) -> OutletId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn rename(&mut self, name: &str) {
        self.name = name.to_string();
    }
}

/// Rebuild a port list for a new set of names.
///
/// Ports whose name survives keep their identity. Ports left unclaimed are
/// reused in order for the new names, renamed. Names still unserved get new
/// ports from `make`. Ports left over after that are returned as removed.
fn sync_ports<A>(
    old: SmallVec<A>,
    names: &[String],
    mut make: impl FnMut(&str) -> A::Item,
) -> (SmallVec<A>, Vec<<A::Item as Port>::Id>)
where
    A: Array,
    A::Item: Port,
{
    let mut old: Vec<Option<A::Item>> = old.into_iter().map(Some).collect();
    let mut slots: Vec<Option<A::Item>> = Vec::with_capacity(names.len());

    for name in names {
        let claimed = old
            .iter_mut()
            .find(|port| port.as_ref().is_some_and(|p| p.name() == name.as_str()))
            .and_then(Option::take);
        slots.push(claimed);
    }

    let mut spare = old.into_iter().flatten();
    let mut ports = SmallVec::new();
    for (name, slot) in names.iter().zip(slots) {
        let port = match slot {
            Some(port) => port,
            None => match spare.next() {
                Some(mut port) => {
                    port.rename(name);
                    port
                }
                None => make(name),
            },
        };
        ports.push(port);
    }

    let removed = spare.map(|port| port.id()).collect();
    (ports, removed)
}

/// Ports dropped by an expression change.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RemovedPorts {
    pub inlets: Vec<InletId>,
    pub outlets: Vec<OutletId>,
}

impl RemovedPorts {
    pub fn is_empty(&self) -> bool {
        self.inlets.is_empty() && self.outlets.is_empty()
    }
}

/// A node of the operator graph.
#[derive(Debug, Clone)]
pub struct Operator {
    /// Unique identifier for this operator.
    id: OperatorId,

    /// Display name. Not required to be unique.
    name: String,

    /// Computes the outlet values from the inlet values.
    expression: Expression,

    /// One inlet per expression input, in expression order.
    inlets: SmallVec<[Inlet; 4]>,

    /// One outlet per expression output.
    outlets: SmallVec<[Outlet; 1]>,

    /// Graph revision of the last change that can affect this operator's
    /// value. Maintained by the graph.
    revision: u64,
}

impl Operator {
    /// Create an operator whose ports follow `expression`. Inlets start with
    /// a default value of `0.0`.
    pub fn new(name: impl Into<String>, expression: impl Into<Expression>) -> Self {
        Self::with_default_inlet_value(name, expression, 0.0)
    }

    /// Create an operator whose inlets start with `default`.
    pub fn with_default_inlet_value(
        name: impl Into<String>,
        expression: impl Into<Expression>,
        default: Value,
    ) -> Self {
        let expression = expression.into();
        let inlets = expression
            .inlet_names()
            .iter()
            .map(|name| Inlet::new(name, default))
            .collect();
        let outlets = expression
            .outlet_names()
            .iter()
            .map(|name| Outlet::new(name))
            .collect();

        Self {
            id: OperatorId::new(),
            name: name.into(),
            expression,
            inlets,
            outlets,
            revision: 0,
        }
    }

    /// Create an operator from script source.
    pub fn parse(name: impl Into<String>, source: &str) -> Result<Self, ExprError> {
        Ok(Self::new(name, Expression::parse(source)?))
    }

    /// Get the operator's ID.
    pub fn id(&self) -> OperatorId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn inlets(&self) -> &[Inlet] {
        &self.inlets
    }

    pub fn outlets(&self) -> &[Outlet] {
        &self.outlets
    }

    /// Find an inlet by variable name.
    pub fn inlet(&self, name: &str) -> Option<&Inlet> {
        self.inlets.iter().find(|inlet| inlet.name == name)
    }

    /// Find an outlet by name.
    pub fn outlet(&self, name: &str) -> Option<&Outlet> {
        self.outlets.iter().find(|outlet| outlet.name == name)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn set_revision(&mut self, revision: u64) {
        self.revision = revision;
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn inlet_mut(&mut self, id: InletId) -> Option<&mut Inlet> {
        self.inlets.iter_mut().find(|inlet| inlet.id == id)
    }

    pub(crate) fn set_inlet_default(&mut self, id: InletId, value: Value) -> bool {
        match self.inlet_mut(id) {
            Some(inlet) => {
                inlet.default = value;
                true
            }
            None => false,
        }
    }

    /// Swap the expression and re-derive the ports.
    ///
    /// Returns the ports that no longer exist; links attached to them must
    /// be removed by the caller.
    pub(crate) fn replace_expression(&mut self, expression: Expression, default: Value) -> RemovedPorts {
        let inlet_names = expression.inlet_names().to_vec();
        let outlet_names = expression.outlet_names();

        let (inlets, removed_inlets) = sync_ports(std::mem::take(&mut self.inlets), &inlet_names, |name| {
            Inlet::new(name, default)
        });
        let (outlets, removed_outlets) =
            sync_ports(std::mem::take(&mut self.outlets), &outlet_names, Outlet::new);

        self.inlets = inlets;
        self.outlets = outlets;
        self.expression = expression;

        RemovedPorts {
            inlets: removed_inlets,
            outlets: removed_outlets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::NativeExpression;

    fn names(op: &Operator) -> Vec<&str> {
        op.inlets().iter().map(Inlet::name).collect()
    }

    #[test]
    fn ports_follow_expression() {
        let op = Operator::parse("A", "a + b").unwrap();
        assert_eq!(names(&op), vec!["a", "b"]);
        assert_eq!(op.outlets().len(), 1);
        assert_eq!(op.outlets()[0].name(), "result");
        assert_eq!(op.inlet("b").map(Inlet::default_value), Some(0.0));
    }

    #[test]
    fn operator_ids_are_unique() {
        let a = Operator::parse("A", "1").unwrap();
        let b = Operator::parse("A", "1").unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn surviving_variables_keep_their_inlets() {
        let mut op = Operator::parse("A", "a + b").unwrap();
        let a = op.inlet("a").unwrap().id();
        let b = op.inlet("b").unwrap().id();

        let removed = op.replace_expression(Expression::parse("b * a").unwrap(), 0.0);
        assert!(removed.is_empty());
        assert_eq!(names(&op), vec!["b", "a"]);
        assert_eq!(op.inlet("a").unwrap().id(), a);
        assert_eq!(op.inlet("b").unwrap().id(), b);
    }

    #[test]
    fn freed_inlets_are_reused_for_new_variables() {
        let mut op = Operator::parse("A", "a + b").unwrap();
        let b = op.inlet("b").unwrap().id();

        let removed = op.replace_expression(Expression::parse("a + c").unwrap(), 0.0);
        assert!(removed.is_empty());
        assert_eq!(names(&op), vec!["a", "c"]);
        assert_eq!(op.inlet("c").unwrap().id(), b);
    }

    #[test]
    fn dropped_variables_report_removed_inlets() {
        let mut op = Operator::parse("A", "a + b + c").unwrap();
        let c = op.inlet("c").unwrap().id();

        let removed = op.replace_expression(Expression::parse("a * 2").unwrap(), 0.0);
        assert_eq!(names(&op), vec!["a"]);
        assert_eq!(removed.inlets.len(), 2);
        assert!(removed.inlets.contains(&c));
    }

    #[test]
    fn new_inlets_take_the_given_default() {
        let mut op = Operator::parse("A", "a").unwrap();
        op.replace_expression(Expression::parse("a + z").unwrap(), 7.0);
        assert_eq!(op.inlet("z").unwrap().default_value(), 7.0);
        assert_eq!(op.inlet("a").unwrap().default_value(), 0.0);
    }

    #[test]
    fn native_outlets_are_synced_by_name() {
        fn native(outlets: &[&str]) -> NativeExpression {
            NativeExpression::with_outlets("n", &[], outlets, |_| Ok(Default::default()))
        }
        let mut op = Operator::new("N", native(&["lo", "hi"]));
        let hi = op.outlet("hi").unwrap().id();

        let removed = op.replace_expression(native(&["hi"]).into(), 0.0);
        assert_eq!(op.outlets().len(), 1);
        assert_eq!(op.outlet("hi").unwrap().id(), hi);
        assert_eq!(removed.outlets.len(), 1);
    }

    #[test]
    fn inlet_defaults_can_be_set() {
        let mut op = Operator::parse("A", "a").unwrap();
        let a = op.inlet("a").unwrap().id();
        assert!(op.set_inlet_default(a, 4.0));
        assert_eq!(op.inlet("a").unwrap().default_value(), 4.0);
        assert!(!op.set_inlet_default(InletId::new(), 1.0));
    }
}
