// Storyscript runtime library
// Value types and macro-invocation runtime for an embedded hypertext expression language
pub mod config;
pub mod runtime;

// Re-export the pieces hosts need to drive the runtime.
pub use config::{ConfigError, RuntimeConfig};
pub use runtime::{
    EvalContext, Frame, FrameStack, MacroRegistry, RuntimeError, RuntimeResult, Value,
};
