//! Pattern engine
//!
//! Builds string datatypes out of literal strings, string datatypes and other
//! patterns. Construction is eager: arguments are validated and compiled into
//! one anchored matcher up front, so matching itself can't fail.

use crate::runtime::datatype::{Datatype, NamedType};
use crate::runtime::error::{nth, RuntimeError, RuntimeResult};
use crate::runtime::structural;
use crate::runtime::values::{format_number, Value};
use itertools::Itertools;
use regex::{Regex, RegexBuilder};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Combinator {
    /// All fragments, contiguously
    Sequence,
    /// First matching fragment
    Either,
    /// Zero or one occurrence of the sequence
    Optional,
    /// Bounded repetition of the sequence; `max` of `None` is unbounded
    Repeat { min: usize, max: Option<usize> },
    /// One character not matching any fragment
    Not,
    /// The sequence, ignoring letter case
    CaseInsensitive,
}

impl Combinator {
    pub fn macro_name(&self) -> &'static str {
        match self {
            Combinator::Sequence => "p",
            Combinator::Either => "p-either",
            Combinator::Optional => "p-opt",
            Combinator::Repeat { .. } => "p-many",
            Combinator::Not => "p-not",
            Combinator::CaseInsensitive => "p-ins",
        }
    }

    fn usable_standalone(&self) -> bool {
        match self {
            Combinator::Optional => false,
            Combinator::Repeat { min, .. } => *min > 0,
            _ => true,
        }
    }

    fn source_prefix(&self) -> String {
        match self {
            Combinator::Repeat { min, max: Some(max) } => format!("{},{},", min, max),
            Combinator::Repeat { min, max: None } if *min != 1 => format!("{},", min),
            _ => String::new(),
        }
    }
}

#[derive(Debug)]
pub struct Pattern {
    source: String,
    fragment: String,
    matcher: Regex,
    usable_standalone: bool,
}

impl Pattern {
    /// Validate `args` and compile them under `combinator`
    pub fn build(combinator: Combinator, args: &[Value], size_limit: usize) -> RuntimeResult<Pattern> {
        let name = combinator.macro_name();
        if args.is_empty() {
            return Err(RuntimeError::syntax(format!(
                "The ({}:) macro needs at least one string or datatype to build a pattern from.",
                name
            )));
        }

        let fragments = || {
            args.iter()
                .enumerate()
                .map(|(i, arg)| fragment_of(name, i + 1, arg))
                .collect::<RuntimeResult<Vec<_>>>()
        };
        let fragment = match combinator {
            Combinator::Not => {
                let classes = args
                    .iter()
                    .enumerate()
                    .map(|(i, arg)| class_of(name, i + 1, arg))
                    .collect::<RuntimeResult<Vec<_>>>()?;
                format!("[^{}]", classes.concat())
            }
            Combinator::Sequence => fragments()?.concat(),
            Combinator::Either => format!("(?:{})", fragments()?.join("|")),
            Combinator::Optional => format!("(?:{})?", fragments()?.concat()),
            Combinator::Repeat { min, max: Some(max) } => {
                format!("(?:{}){{{},{}}}", fragments()?.concat(), min, max)
            }
            Combinator::Repeat { min, max: None } => {
                format!("(?:{}){{{},}}", fragments()?.concat(), min)
            }
            Combinator::CaseInsensitive => format!("(?i:{})", fragments()?.concat()),
        };

        let source = format!(
            "({}:{}{})",
            name,
            combinator.source_prefix(),
            structural::source_list(args.iter())
        );
        let matcher = RegexBuilder::new(&format!("^(?:{})$", fragment))
            .size_limit(size_limit)
            .build()
            .map_err(|e| {
                RuntimeError::syntax(format!("The pattern {} couldn't be built: {}", source, e))
            })?;
        log::debug!("compiled pattern {} as /{}/", source, fragment);

        Ok(Pattern {
            source,
            fragment,
            matcher,
            usable_standalone: combinator.usable_standalone(),
        })
    }

    /// `(p-many:)` with optional numeric bounds; one or more when none are given
    pub fn repeat(
        min: Option<f64>,
        max: Option<f64>,
        args: &[Value],
        size_limit: usize,
    ) -> RuntimeResult<Pattern> {
        let min = match min {
            Some(n) => repetition_bound(n, "minimum")?,
            None => 1,
        };
        let max = max.map(|n| repetition_bound(n, "maximum")).transpose()?;
        if let Some(max) = max {
            if max < min {
                return Err(RuntimeError::syntax(format!(
                    "The (p-many:) macro's maximum ({}) is less than its minimum ({}).",
                    max, min
                )));
            }
        }
        Self::build(Combinator::Repeat { min, max }, args, size_limit)
    }

    /// Whole-string match; non-strings never match
    pub fn is_match(&self, value: &Value) -> bool {
        match value {
            Value::String(s) => self.matcher.is_match(s),
            _ => false,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Unanchored regex text, for nesting into other patterns
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    pub fn usable_standalone(&self) -> bool {
        self.usable_standalone
    }
}

fn repetition_bound(n: f64, which: &str) -> RuntimeResult<usize> {
    if n.is_finite() && n >= 0.0 && n.fract() == 0.0 {
        Ok(n as usize)
    } else {
        Err(RuntimeError::datatype(format!(
            "The (p-many:) macro's {} should be a whole number of 0 or more, not {}.",
            which,
            format_number(n)
        )))
    }
}

fn not_string_like(name: &str, position: usize, value: &Value) -> RuntimeError {
    RuntimeError::datatype(format!(
        "The ({}:) macro's {} value should be a string or a string datatype, but it was {}.",
        name,
        nth(position),
        match value {
            Value::Datatype(d) => format!("the datatype {}", d.describe()),
            other => other.type_name().to_string(),
        }
    ))
}

fn fragment_of(name: &str, position: usize, value: &Value) -> RuntimeResult<String> {
    match value {
        Value::String(s) => Ok(regex::escape(s)),
        Value::Datatype(Datatype::Named(named)) => named
            .pattern_fragment()
            .ok_or_else(|| not_string_like(name, position, value)),
        Value::Datatype(Datatype::Pattern(pattern)) => Ok(format!("(?:{})", pattern.fragment())),
        other => Err(not_string_like(name, position, other)),
    }
}

fn class_of(name: &str, position: usize, value: &Value) -> RuntimeResult<String> {
    match value {
        Value::String(s) if !s.is_empty() => {
            Ok(s.chars().unique().map(|c| regex::escape(&c.to_string())).collect())
        }
        Value::Datatype(Datatype::Named(named)) => named
            .char_class()
            .map(str::to_string)
            .ok_or_else(|| single_char_only(name, position, value)),
        other => Err(single_char_only(name, position, other)),
    }
}

fn single_char_only(name: &str, position: usize, value: &Value) -> RuntimeError {
    RuntimeError::datatype(format!(
        "The ({}:) macro's {} value should be a non-empty string or a single-character datatype \
         like {} or {}, but it was {}.",
        name,
        nth(position),
        NamedType::Digit.name(),
        NamedType::Whitespace.name(),
        value.type_name()
    ))
}
