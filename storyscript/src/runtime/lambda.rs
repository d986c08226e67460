//! Lambdas: user-authored closures with named clause roles.
//!
//! A lambda is built clause by clause (`each _x`, `making _total`,
//! `where ...`, `when ...`, `via ...`) and validated as it is built. Bodies are
//! source snippets; applying a lambda binds its variables in a scope, pushes a
//! frame and asks the evaluation context to evaluate the snippets.

use crate::runtime::datatype::Datatype;
use crate::runtime::environment::{EvalContext, Frame, ItBinding, ScopeRef, VariableScope};
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::values::{CompositeValue, Value};
use std::collections::BTreeSet;
use std::fmt;

/// Clause roles that make up a lambda's shape. The loop variable is not part
/// of the shape: any lambda may omit it and use `it` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClauseName {
    Making,
    Where,
    When,
    Via,
}

impl ClauseName {
    pub fn keyword(&self) -> &'static str {
        match self {
            ClauseName::Making => "making",
            ClauseName::Where => "where",
            ClauseName::When => "when",
            ClauseName::Via => "via",
        }
    }
}

impl fmt::Display for ClauseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Temp variable bound by a `loop` or `making` clause, optionally typed
#[derive(Debug, Clone)]
pub struct Binding {
    pub name: String,
    pub datatype: Option<Datatype>,
}

impl Binding {
    pub fn new(name: impl Into<String>) -> Binding {
        Binding {
            name: name.into(),
            datatype: None,
        }
    }

    pub fn typed(name: impl Into<String>, datatype: Datatype) -> Binding {
        Binding {
            name: name.into(),
            datatype: Some(datatype),
        }
    }

    fn bind(&self, scope: &ScopeRef, value: Value) -> RuntimeResult<()> {
        let mut scope = scope.borrow_mut();
        match &self.datatype {
            Some(datatype) => scope.define_typed(&self.name, datatype.clone(), value),
            None => scope.define(&self.name, value),
        }
    }

    fn to_source(&self) -> String {
        match &self.datatype {
            Some(datatype) => format!("{}-type _{}", datatype.to_source(), self.name),
            None => format!("_{}", self.name),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Clause {
    Loop(Binding),
    Making(Binding),
    Where(String),
    When(String),
    Via(String),
}

impl Clause {
    fn keyword(&self) -> &'static str {
        match self {
            Clause::Loop(_) => "each",
            Clause::Making(_) => ClauseName::Making.keyword(),
            Clause::Where(_) => ClauseName::Where.keyword(),
            Clause::When(_) => ClauseName::When.keyword(),
            Clause::Via(_) => ClauseName::Via.keyword(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum GuardKind {
    Where,
    When,
}

#[derive(Debug, Clone)]
struct Guard {
    kind: GuardKind,
    expr: String,
}

#[derive(Debug, Clone, Default)]
pub struct Lambda {
    loop_var: Option<Binding>,
    making: Option<Binding>,
    guard: Option<Guard>,
    via: Option<String>,
}

/// Per-call inputs to `Lambda::apply`
#[derive(Debug, Clone, Default)]
pub struct ApplyArgs {
    pub loop_value: Option<Value>,
    pub position: Option<usize>,
    pub making_value: Option<Value>,
    /// Scope shared across a batch of calls; a fresh one is made when absent
    pub temp_scope: Option<ScopeRef>,
    pub ignore_via: bool,
}

/// Result of one application. `Filtered` means the guard rejected the value,
/// which is distinct from the body producing `false`.
#[derive(Debug, Clone, PartialEq)]
pub enum LambdaOutcome {
    Value(Value),
    Filtered,
}

impl Lambda {
    pub fn from_clauses(clauses: Vec<Clause>) -> RuntimeResult<Lambda> {
        if clauses.is_empty() {
            return Err(RuntimeError::syntax("A lambda needs at least one clause."));
        }
        clauses
            .into_iter()
            .try_fold(Lambda::default(), |lambda, clause| lambda.add_clause(clause))
    }

    /// New lambda with `clause` added. Construction-time checks live here.
    pub fn add_clause(&self, clause: Clause) -> RuntimeResult<Lambda> {
        let is_when = matches!(clause, Clause::When(_));
        if self.is_when() || (is_when && !self.is_empty()) {
            return Err(RuntimeError::syntax(
                "A lambda with a 'when' clause can't have any other clauses.",
            ));
        }

        let mut lambda = self.clone();
        let duplicate = || {
            RuntimeError::syntax(format!(
                "This lambda has two '{}' clauses.",
                clause.keyword()
            ))
        };
        match &clause {
            Clause::Loop(binding) => {
                if lambda.loop_var.is_some() {
                    return Err(duplicate());
                }
                lambda.loop_var = Some(binding.clone());
            }
            Clause::Making(binding) => {
                if lambda.making.is_some() {
                    return Err(duplicate());
                }
                lambda.making = Some(binding.clone());
            }
            Clause::Where(expr) | Clause::When(expr) => {
                if lambda.guard.is_some() {
                    return Err(duplicate());
                }
                lambda.guard = Some(Guard {
                    kind: if is_when { GuardKind::When } else { GuardKind::Where },
                    expr: expr.clone(),
                });
            }
            Clause::Via(expr) => {
                if lambda.via.is_some() {
                    return Err(duplicate());
                }
                lambda.via = Some(expr.clone());
            }
        }

        if let (Some(loop_var), Some(making)) = (&lambda.loop_var, &lambda.making) {
            if loop_var.name == making.name {
                return Err(RuntimeError::syntax(format!(
                    "This lambda has two variables named '_{}'.",
                    making.name
                )));
            }
        }
        Ok(lambda)
    }

    fn is_empty(&self) -> bool {
        self.loop_var.is_none() && self.making.is_none() && self.guard.is_none() && self.via.is_none()
    }

    pub fn is_when(&self) -> bool {
        matches!(&self.guard, Some(Guard { kind: GuardKind::When, .. }))
    }

    pub fn loop_var(&self) -> Option<&Binding> {
        self.loop_var.as_ref()
    }

    pub fn making(&self) -> Option<&Binding> {
        self.making.as_ref()
    }

    pub fn clause_names(&self) -> BTreeSet<ClauseName> {
        let mut names = BTreeSet::new();
        if self.making.is_some() {
            names.insert(ClauseName::Making);
        }
        match &self.guard {
            Some(Guard { kind: GuardKind::Where, .. }) => {
                names.insert(ClauseName::Where);
            }
            Some(Guard { kind: GuardKind::When, .. }) => {
                names.insert(ClauseName::When);
            }
            None => {}
        }
        if self.via.is_some() {
            names.insert(ClauseName::Via);
        }
        names
    }

    pub fn apply(&self, ctx: &mut dyn EvalContext, args: ApplyArgs) -> RuntimeResult<LambdaOutcome> {
        let scope = match args.temp_scope {
            Some(scope) => scope,
            None => match ctx.frames().top() {
                Some(top) => VariableScope::with_parent(top.scope.clone()).into_ref(),
                None => VariableScope::new().into_ref(),
            },
        };

        if let (Some(binding), Some(value)) = (&self.loop_var, &args.loop_value) {
            binding.bind(&scope, value.clone())?;
        }
        if let (Some(binding), Some(value)) = (&self.making, &args.making_value) {
            binding.bind(&scope, value.clone())?;
        }

        let it = if self.making.is_some() || self.is_when() {
            ItBinding::Forbidden(format!(
                "I can't use 'it' inside a lambda with a '{}' clause; use its temp variable instead.",
                if self.is_when() { "when" } else { "making" }
            ))
        } else {
            match &args.loop_value {
                Some(value) => ItBinding::Value(value.clone()),
                None => ItBinding::Unbound,
            }
        };
        let frame = Frame {
            scope,
            position: if self.is_when() { None } else { args.position },
            it,
        };

        ctx.frames_mut().push(frame)?;
        let result = self.evaluate_body(ctx, args.ignore_via);
        ctx.frames_mut().pop();

        log::trace!(
            "applied lambda {} at position {:?}: {:?}",
            self.to_source(),
            args.position,
            result
        );
        result
    }

    fn evaluate_body(&self, ctx: &mut dyn EvalContext, ignore_via: bool) -> RuntimeResult<LambdaOutcome> {
        if let Some(guard) = &self.guard {
            let keyword = match guard.kind {
                GuardKind::Where => "where",
                GuardKind::When => "when",
            };
            match ctx.evaluate(&guard.expr)?.into_result()? {
                Value::Boolean(true) => {}
                Value::Boolean(false) => return Ok(LambdaOutcome::Filtered),
                other => {
                    return Err(RuntimeError::datatype(format!(
                        "This lambda's '{}' clause should produce a boolean, but it produced {}.",
                        keyword,
                        other.type_name()
                    )))
                }
            }
        }
        if ignore_via {
            return Ok(LambdaOutcome::Value(Value::Boolean(true)));
        }
        match &self.via {
            Some(expr) => Ok(LambdaOutcome::Value(ctx.evaluate(expr)?.into_result()?)),
            None => Ok(LambdaOutcome::Value(Value::Boolean(true))),
        }
    }

    fn apply_to(
        &self,
        ctx: &mut dyn EvalContext,
        item: &Value,
        index: usize,
        ignore_via: bool,
    ) -> RuntimeResult<LambdaOutcome> {
        self.apply(
            ctx,
            ApplyArgs {
                loop_value: Some(item.clone()),
                position: Some(index + 1),
                ignore_via,
                ..ApplyArgs::default()
            },
        )
    }

    /// Items whose guard passed, in order. Stops at the first error.
    pub fn filter(&self, ctx: &mut dyn EvalContext, items: &[Value]) -> RuntimeResult<Vec<Value>> {
        let mut kept = Vec::new();
        for (index, item) in items.iter().enumerate() {
            if let LambdaOutcome::Value(_) = self.apply_to(ctx, item, index, true)? {
                kept.push(item.clone());
            }
        }
        Ok(kept)
    }

    /// Each item transformed by `via`. Items rejected by a `where` guard are
    /// passed through unchanged.
    pub fn map(&self, ctx: &mut dyn EvalContext, items: &[Value]) -> RuntimeResult<Vec<Value>> {
        let mut mapped = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match self.apply_to(ctx, item, index, false)? {
                LambdaOutcome::Value(value) => {
                    value.check_storable("an array")?;
                    mapped.push(value);
                }
                LambdaOutcome::Filtered => mapped.push(item.clone()),
            }
        }
        Ok(mapped)
    }

    /// First item whose guard passed
    pub fn find(&self, ctx: &mut dyn EvalContext, items: &[Value]) -> RuntimeResult<Option<Value>> {
        for (index, item) in items.iter().enumerate() {
            if let LambdaOutcome::Value(_) = self.apply_to(ctx, item, index, true)? {
                return Ok(Some(item.clone()));
            }
        }
        Ok(None)
    }

    pub fn all_pass(&self, ctx: &mut dyn EvalContext, items: &[Value]) -> RuntimeResult<bool> {
        for (index, item) in items.iter().enumerate() {
            if self.apply_to(ctx, item, index, true)? == LambdaOutcome::Filtered {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn some_pass(&self, ctx: &mut dyn EvalContext, items: &[Value]) -> RuntimeResult<bool> {
        Ok(self.find(ctx, items)?.is_some())
    }

    pub fn none_pass(&self, ctx: &mut dyn EvalContext, items: &[Value]) -> RuntimeResult<bool> {
        Ok(!self.some_pass(ctx, items)?)
    }

    /// Fold `items` into an accumulator bound to the `making` variable. Items
    /// rejected by a `where` guard leave the accumulator unchanged.
    pub fn fold(&self, ctx: &mut dyn EvalContext, initial: Value, items: &[Value]) -> RuntimeResult<Value> {
        let mut total = initial;
        for (index, item) in items.iter().enumerate() {
            let outcome = self.apply(
                ctx,
                ApplyArgs {
                    loop_value: Some(item.clone()),
                    position: Some(index + 1),
                    making_value: Some(total.clone()),
                    ..ApplyArgs::default()
                },
            )?;
            if let LambdaOutcome::Value(value) = outcome {
                value.check_storable(&format!(
                    "_{}",
                    self.making.as_ref().map_or("it", |m| m.name.as_str())
                ))?;
                total = value;
            }
        }
        Ok(total)
    }

    /// Evaluate a `when` lambda's condition in the current frame
    pub fn check_condition(&self, ctx: &mut dyn EvalContext) -> RuntimeResult<bool> {
        let outcome = self.apply(ctx, ApplyArgs::default())?;
        Ok(matches!(outcome, LambdaOutcome::Value(_)))
    }
}

impl CompositeValue for Lambda {
    const TYPE_NAME: &'static str = "lambda";

    fn same_as(&self, other: &Self) -> bool {
        self.to_source() == other.to_source()
    }

    fn to_source(&self) -> String {
        let mut parts = Vec::new();
        if let Some(binding) = &self.loop_var {
            parts.push(format!("each {}", binding.to_source()));
        }
        if let Some(binding) = &self.making {
            parts.push(format!("making {}", binding.to_source()));
        }
        if let Some(guard) = &self.guard {
            let keyword = match guard.kind {
                GuardKind::Where => "where",
                GuardKind::When => "when",
            };
            parts.push(format!("{} {}", keyword, guard.expr));
        }
        if let Some(via) = &self.via {
            parts.push(format!("via {}", via));
        }
        parts.join(" ")
    }
}
