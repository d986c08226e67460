//! Changers: composable chains of named mutations.
//!
//! A changer is a persistent singly linked list. Composing `a + b` allocates
//! fresh copies of `a`'s nodes whose last node links to `b`'s head, so `b`'s
//! chain is shared and neither operand is ever modified.

use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::structural;
use crate::runtime::values::{CompositeValue, Value};
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug)]
pub struct ChangerNode {
    pub name: String,
    pub params: Vec<Value>,
    next: Option<Rc<ChangerNode>>,
}

#[derive(Debug, Clone)]
pub struct Changer {
    head: Rc<ChangerNode>,
}

/// Mutation applied to a host change descriptor by one chain node
pub type ChangerFn<D> = fn(&mut D, &[Value]) -> RuntimeResult<()>;

impl Changer {
    pub fn new(name: impl Into<String>, params: Vec<Value>) -> Changer {
        Changer {
            head: Rc::new(ChangerNode {
                name: name.into(),
                params,
                next: None,
            }),
        }
    }

    /// `self` followed by `other`
    pub fn compose(&self, other: &Changer) -> Changer {
        let head = self
            .nodes()
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .fold(Rc::clone(&other.head), |next, node| {
                Rc::new(ChangerNode {
                    name: node.name.clone(),
                    params: node.params.clone(),
                    next: Some(next),
                })
            });
        Changer { head }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ChangerNode> {
        std::iter::successors(Some(self.head.as_ref()), |node| node.next.as_deref())
    }

    pub fn len(&self) -> usize {
        self.nodes().count()
    }

    /// Apply every node to `descriptor`, first to last
    pub fn run<D>(&self, registry: &ChangerRegistry<D>, descriptor: &mut D) -> RuntimeResult<()> {
        for node in self.nodes() {
            let apply = registry.get(&node.name).ok_or_else(|| {
                RuntimeError::operation(format!(
                    "There's no way to apply the ({}:) changer here.",
                    node.name
                ))
            })?;
            apply(descriptor, &node.params)?;
        }
        Ok(())
    }
}

impl CompositeValue for Changer {
    const TYPE_NAME: &'static str = "changer";

    fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.head, &other.head)
            || (self.len() == other.len()
                && self.nodes().zip(other.nodes()).all(|(a, b)| {
                    a.name == b.name
                        && a.params.len() == b.params.len()
                        && a.params
                            .iter()
                            .zip(b.params.iter())
                            .all(|(x, y)| structural::equals(x, y))
                }))
    }

    fn to_source(&self) -> String {
        self.nodes()
            .map(|node| format!("({}:{})", node.name, structural::source_list(node.params.iter())))
            .collect::<Vec<_>>()
            .join("+")
    }
}

/// Changer names mapped to the mutations they perform on a descriptor `D`
pub struct ChangerRegistry<D> {
    changers: HashMap<String, ChangerFn<D>>,
}

impl<D> Default for ChangerRegistry<D> {
    fn default() -> Self {
        ChangerRegistry {
            changers: HashMap::new(),
        }
    }
}

impl<D> ChangerRegistry<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, apply: ChangerFn<D>) {
        self.changers.insert(name.to_string(), apply);
    }

    pub fn get(&self, name: &str) -> Option<ChangerFn<D>> {
        self.changers.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.changers.contains_key(name)
    }
}
