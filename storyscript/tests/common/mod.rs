// Scripted evaluation context shared by the integration tests.
//
// Expression text is not parsed: each source snippet a test uses is mapped to
// a closure over the current top frame. Every evaluation is counted so tests
// can check how far a batch got before stopping.
#![allow(dead_code)]

use std::collections::HashMap;
use storyscript::runtime::{EvalContext, Frame, FrameStack, RuntimeError, RuntimeResult, Value};
use storyscript::RuntimeConfig;

type Snippet = Box<dyn Fn(&Frame) -> RuntimeResult<Value>>;

pub struct ScriptedContext {
    frames: FrameStack,
    config: RuntimeConfig,
    snippets: HashMap<String, Snippet>,
    pub evaluations: usize,
}

impl ScriptedContext {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        ScriptedContext {
            frames: FrameStack::from_config(&config),
            config,
            snippets: HashMap::new(),
            evaluations: 0,
        }
    }

    /// Script what evaluating `source` produces
    pub fn on<F>(mut self, source: &str, snippet: F) -> Self
    where
        F: Fn(&Frame) -> RuntimeResult<Value> + 'static,
    {
        self.snippets.insert(source.to_string(), Box::new(snippet));
        self
    }

    /// The usual snippets: `it`, `pos`, `it * 2`, `it > 2`
    pub fn standard() -> Self {
        Self::new()
            .on("it", |frame| frame.it())
            .on("pos", |frame| Ok(Value::Number(frame.position()? as f64)))
            .on("it * 2", |frame| Ok(Value::Number(number(&frame.it()?)? * 2.0)))
            .on("it > 2", |frame| Ok(Value::Boolean(number(&frame.it()?)? > 2.0)))
    }
}

pub fn number(value: &Value) -> RuntimeResult<f64> {
    value
        .as_number()
        .ok_or_else(|| RuntimeError::datatype(format!("expected a number, got {}", value.type_name())))
}

impl EvalContext for ScriptedContext {
    fn evaluate(&mut self, source: &str) -> RuntimeResult<Value> {
        self.evaluations += 1;
        let frame = self
            .frames
            .top()
            .ok_or_else(|| RuntimeError::operation("no frame"))?;
        let snippet = self
            .snippets
            .get(source)
            .ok_or_else(|| RuntimeError::syntax(format!("unscripted snippet: {}", source)))?;
        snippet(frame)
    }

    fn frames(&self) -> &FrameStack {
        &self.frames
    }

    fn frames_mut(&mut self) -> &mut FrameStack {
        &mut self.frames
    }

    fn config(&self) -> &RuntimeConfig {
        &self.config
    }
}
