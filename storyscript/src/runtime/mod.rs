//! Storyscript runtime
//!
//! Value universe, datatypes and patterns, lambdas, changers and the macro
//! registry. Parsing and evaluation of expression text belong to the host,
//! which drives this runtime through `EvalContext`.

pub mod changer;
pub mod custom_macro;
pub mod datatype;
pub mod environment;
pub mod error;
pub mod lambda;
pub mod macros;
pub mod pattern;
pub mod stdlib;
pub mod structural;
pub mod type_validator;
pub mod values;

pub use changer::{Changer, ChangerFn, ChangerRegistry};
pub use custom_macro::CustomMacro;
pub use datatype::{Datatype, NamedType, TypeClassifier};
pub use environment::{EvalContext, Frame, FrameStack, ItBinding, ScopeRef, VariableScope};
pub use error::{ErrorKind, RuntimeError, RuntimeResult};
pub use lambda::{ApplyArgs, Binding, Clause, ClauseName, Lambda, LambdaOutcome};
pub use macros::{CallArg, MacroDefinition, MacroFn, MacroRegistry};
pub use pattern::{Combinator, Pattern};
pub use stdlib::StandardLibrary;
pub use type_validator::{ParamType, Signature};
pub use values::{
    Colour, CompositeValue, Datamap, Dataset, Gradient, GradientStop, HookSet, MapKey, TypedVar,
    Value,
};
