// Variable scopes, evaluation frames and the evaluation context contract

use crate::config::RuntimeConfig;
use crate::runtime::datatype::Datatype;
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::values::{CompositeValue, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub type ScopeRef = Rc<RefCell<VariableScope>>;

/// Named-variable scope. Unbound names are looked up in the enclosing scope.
#[derive(Debug, Default)]
pub struct VariableScope {
    /// Current scope bindings
    bindings: HashMap<String, Value>,
    /// Datatypes the bindings of this scope are restricted to
    types: HashMap<String, Datatype>,
    parent: Option<ScopeRef>,
}

impl VariableScope {
    pub fn new() -> Self {
        VariableScope::default()
    }

    pub fn with_parent(parent: ScopeRef) -> Self {
        VariableScope {
            parent: Some(parent),
            ..VariableScope::default()
        }
    }

    pub fn into_ref(self) -> ScopeRef {
        Rc::new(RefCell::new(self))
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.get(name) {
            Some(value.clone())
        } else if let Some(parent) = &self.parent {
            parent.borrow().lookup(name)
        } else {
            None
        }
    }

    pub fn get(&self, name: &str) -> RuntimeResult<Value> {
        self.lookup(name).ok_or_else(|| {
            RuntimeError::property(format!("There isn't a temp variable named _{} in this place.", name))
        })
    }

    /// Whether `name` is bound in this scope (not enclosing ones)
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    fn restriction(&self, name: &str) -> Option<Datatype> {
        if let Some(datatype) = self.types.get(name) {
            Some(datatype.clone())
        } else if self.bindings.contains_key(name) {
            None
        } else if let Some(parent) = &self.parent {
            parent.borrow().restriction(name)
        } else {
            None
        }
    }

    /// Bind in this scope, restricted to `datatype`
    pub fn define_typed(&mut self, name: &str, datatype: Datatype, value: Value) -> RuntimeResult<()> {
        check_assignment(name, &datatype, &value)?;
        self.types.insert(name.to_string(), datatype);
        self.bindings.insert(name.to_string(), value);
        Ok(())
    }

    /// Bind in this scope, shadowing any enclosing binding
    pub fn define(&mut self, name: &str, value: Value) -> RuntimeResult<()> {
        value.check_storable(&format!("_{}", name))?;
        self.types.remove(name);
        self.bindings.insert(name.to_string(), value);
        Ok(())
    }

    /// Assign to an existing binding wherever it lives, or create one here.
    /// Restricted variables only accept values of their datatype.
    pub fn set(&mut self, name: &str, value: Value) -> RuntimeResult<()> {
        if let Some(datatype) = self.restriction(name) {
            check_assignment(name, &datatype, &value)?;
        } else {
            value.check_storable(&format!("_{}", name))?;
        }
        if self.bindings.contains_key(name) {
            self.bindings.insert(name.to_string(), value);
            return Ok(());
        }
        if let Some(parent) = &self.parent {
            if parent.borrow().lookup(name).is_some() {
                return parent.borrow_mut().set(name, value);
            }
        }
        self.bindings.insert(name.to_string(), value);
        Ok(())
    }

    pub fn binding_names(&self) -> Vec<String> {
        self.bindings.keys().cloned().collect()
    }
}

fn check_assignment(name: &str, datatype: &Datatype, value: &Value) -> RuntimeResult<()> {
    value.check_storable(&format!("_{}", name))?;
    if datatype.check(value)? {
        Ok(())
    } else {
        Err(RuntimeError::datatype(format!(
            "I can't set _{} to {} because it's been restricted to {}.",
            name,
            value.type_name(),
            datatype.to_source()
        )))
    }
}

/// What the implicit `it` identifier means inside a frame
#[derive(Debug, Clone)]
pub enum ItBinding {
    Unbound,
    Value(Value),
    /// Any use of `it` is an error, with this message
    Forbidden(String),
}

/// One evaluation frame. Fields are `None` when they mean nothing here.
#[derive(Debug, Clone)]
pub struct Frame {
    pub scope: ScopeRef,
    /// 1-indexed ordinal of the value a lambda is currently processing
    pub position: Option<usize>,
    pub it: ItBinding,
}

impl Frame {
    pub fn new(scope: ScopeRef) -> Frame {
        Frame {
            scope,
            position: None,
            it: ItBinding::Unbound,
        }
    }

    pub fn root() -> Frame {
        Frame::new(VariableScope::new().into_ref())
    }

    /// Resolve the `it` identifier
    pub fn it(&self) -> RuntimeResult<Value> {
        match &self.it {
            ItBinding::Value(value) => Ok(value.clone()),
            ItBinding::Forbidden(message) => Err(RuntimeError::operation(message.clone())),
            ItBinding::Unbound => Err(RuntimeError::operation(
                "There's nothing that 'it' refers to here.",
            )),
        }
    }

    /// Resolve the `pos` identifier
    pub fn position(&self) -> RuntimeResult<usize> {
        self.position.ok_or_else(|| {
            RuntimeError::operation("'pos' can only be used inside a lambda that processes a sequence of values.")
        })
    }

    pub fn variable(&self, name: &str) -> RuntimeResult<Value> {
        self.scope.borrow().get(name)
    }
}

/// Stack of evaluation frames with a depth limit
#[derive(Debug)]
pub struct FrameStack {
    frames: Vec<Frame>,
    max_depth: usize,
}

impl FrameStack {
    pub fn new(max_depth: usize) -> Self {
        FrameStack {
            frames: vec![Frame::root()],
            max_depth,
        }
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(config.max_frame_depth)
    }

    pub fn push(&mut self, frame: Frame) -> RuntimeResult<()> {
        if self.frames.len() >= self.max_depth {
            return Err(RuntimeError::operation(format!(
                "Too many lambdas or macros were nested inside each other (more than {}).",
                self.max_depth
            )));
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

lazy_static::lazy_static! {
    static ref DEFAULT_CONFIG: RuntimeConfig = RuntimeConfig::default();
}

/// Contract between this runtime and the host evaluator that drives it.
///
/// The host owns parsing and evaluation of expression text; this runtime only
/// asks it to evaluate source snippets in the current top frame and pushes or
/// pops frames around lambda and custom macro bodies.
pub trait EvalContext {
    /// Evaluate `source` in the current top frame
    fn evaluate(&mut self, source: &str) -> RuntimeResult<Value>;

    fn frames(&self) -> &FrameStack;

    fn frames_mut(&mut self) -> &mut FrameStack;

    fn config(&self) -> &RuntimeConfig {
        &DEFAULT_CONFIG
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::error::ErrorKind;

    #[test]
    fn lookup_delegates_to_parent() {
        let parent = VariableScope::new().into_ref();
        parent.borrow_mut().define("a", Value::Number(1.0)).unwrap();
        let child = VariableScope::with_parent(parent.clone());
        assert_eq!(child.get("a").unwrap(), Value::Number(1.0));
        assert!(!child.contains("a"));
        assert_eq!(child.get("b").unwrap_err().kind, ErrorKind::Property);
    }

    #[test]
    fn set_updates_enclosing_binding() {
        let parent = VariableScope::new().into_ref();
        parent.borrow_mut().define("a", Value::Number(1.0)).unwrap();
        let mut child = VariableScope::with_parent(parent.clone());
        child.set("a", Value::Number(2.0)).unwrap();
        assert_eq!(parent.borrow().get("a").unwrap(), Value::Number(2.0));
        child.set("fresh", Value::Boolean(true)).unwrap();
        assert!(parent.borrow().lookup("fresh").is_none());
    }

    #[test]
    fn typed_bindings_reject_other_types() {
        let mut scope = VariableScope::new();
        scope
            .define_typed("n", Datatype::number(), Value::Number(1.0))
            .unwrap();
        let err = scope.set("n", Value::string("one")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Datatype);
        assert_eq!(
            err.message,
            "I can't set _n to a string because it's been restricted to num."
        );
        scope.set("n", Value::Number(2.0)).unwrap();
    }

    #[test]
    fn errors_cannot_be_stored() {
        let mut scope = VariableScope::new();
        let original = RuntimeError::syntax("bad");
        let err = scope.set("x", original.clone().into_value()).unwrap_err();
        assert_eq!(err, original);
    }

    #[test]
    fn frame_stack_enforces_depth() {
        let mut stack = FrameStack::new(2);
        stack.push(Frame::root()).unwrap();
        let err = stack.push(Frame::root()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Operation);
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn forbidden_it_is_an_error() {
        let mut frame = Frame::root();
        frame.it = ItBinding::Forbidden("no it here".to_string());
        assert_eq!(frame.it().unwrap_err().message, "no it here");
        frame.it = ItBinding::Value(Value::Number(5.0));
        assert_eq!(frame.it().unwrap(), Value::Number(5.0));
    }
}
