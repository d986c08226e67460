// Error handling for the storyscript runtime

use crate::runtime::values::Value;
use std::fmt;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Machine-readable category of a runtime error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Argument shape or type mismatch
    Datatype,
    /// An operation applied to a value that cannot support it
    Operation,
    /// Malformed pattern or lambda construction
    Syntax,
    /// Invalid collection key
    Property,
    /// Unknown macro name or wrong number of arguments
    Macrocall,
}

impl ErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Datatype => "datatype",
            ErrorKind::Operation => "operation",
            ErrorKind::Syntax => "syntax",
            ErrorKind::Property => "property",
            ErrorKind::Macrocall => "macrocall",
        }
    }

    /// Explanation shown when an error of this kind carries none of its own
    pub fn canned_explanation(&self) -> &'static str {
        match self {
            ErrorKind::Datatype => {
                "This value's type isn't one that this operation or macro call accepts."
            }
            ErrorKind::Operation => {
                "This operation can't be performed on the given value."
            }
            ErrorKind::Syntax => {
                "This construction is malformed and couldn't be understood."
            }
            ErrorKind::Property => {
                "This data name or position can't be used with this collection."
            }
            ErrorKind::Macrocall => {
                "This macro call doesn't match any registered macro, or was given the wrong number of values."
            }
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runtime error. Doubles as a first-class value through `Value::Error`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    pub explanation: Option<String>,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> RuntimeError {
        RuntimeError {
            kind,
            message: message.into(),
            explanation: None,
        }
    }

    pub fn datatype(message: impl Into<String>) -> RuntimeError {
        Self::new(ErrorKind::Datatype, message)
    }

    pub fn operation(message: impl Into<String>) -> RuntimeError {
        Self::new(ErrorKind::Operation, message)
    }

    pub fn syntax(message: impl Into<String>) -> RuntimeError {
        Self::new(ErrorKind::Syntax, message)
    }

    pub fn property(message: impl Into<String>) -> RuntimeError {
        Self::new(ErrorKind::Property, message)
    }

    pub fn macrocall(message: impl Into<String>) -> RuntimeError {
        Self::new(ErrorKind::Macrocall, message)
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> RuntimeError {
        self.explanation = Some(explanation.into());
        self
    }

    /// The custom explanation, or the kind's canned one
    pub fn explanation(&self) -> &str {
        self.explanation
            .as_deref()
            .unwrap_or_else(|| self.kind.canned_explanation())
    }

    /// Convert to an error value that can travel through containers
    pub fn into_value(self) -> Value {
        Value::Error(self)
    }
}

impl From<RuntimeError> for Value {
    fn from(err: RuntimeError) -> Self {
        err.into_value()
    }
}

/// English ordinal for 1-indexed positions ("1st", "2nd", "11th")
pub(crate) fn nth(position: usize) -> String {
    let suffix = match (position % 10, position % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", position, suffix)
}

/// "1 value" / "2 values"
pub(crate) fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}
