// User-defined macros: typed parameters plus a body evaluated by the host

use crate::runtime::environment::{EvalContext, Frame, VariableScope};
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::macros::{prepare_args, CallArg};
use crate::runtime::structural;
use crate::runtime::type_validator::{ParamType, Signature};
use crate::runtime::values::{CompositeValue, TypedVar, Value};
use itertools::Itertools;

#[derive(Debug, Clone)]
pub struct CustomMacro {
    params: Vec<TypedVar>,
    body: String,
}

impl CustomMacro {
    /// Parameter names must be distinct
    pub fn new(params: Vec<TypedVar>, body: impl Into<String>) -> RuntimeResult<CustomMacro> {
        if let Some(duplicate) = params.iter().map(|p| &p.name).duplicates().next() {
            return Err(RuntimeError::datatype(format!(
                "This custom macro has more than one parameter named _{}.",
                duplicate
            )));
        }
        Ok(CustomMacro {
            params,
            body: body.into(),
        })
    }

    pub fn params(&self) -> &[TypedVar] {
        &self.params
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn signature(&self) -> RuntimeResult<Signature> {
        Signature::new(
            self.params
                .iter()
                .map(|p| ParamType::is(p.datatype.clone()))
                .collect(),
        )
    }

    /// Validate `args`, bind them to the parameters in a fresh scope and
    /// evaluate the body there.
    pub fn call(&self, ctx: &mut dyn EvalContext, args: Vec<CallArg>) -> RuntimeResult<Value> {
        let values = prepare_args(args)?;
        self.signature()?.validate_as("custom macro", &values)?;

        let scope = match ctx.frames().top() {
            Some(top) => VariableScope::with_parent(top.scope.clone()),
            None => VariableScope::new(),
        };
        let scope = scope.into_ref();
        for (param, value) in self.params.iter().zip(values) {
            scope
                .borrow_mut()
                .define_typed(&param.name, param.datatype.clone(), value)?;
        }

        log::debug!("calling custom macro {}", self.to_source());
        ctx.frames_mut().push(Frame::new(scope))?;
        let result = ctx.evaluate(&self.body).and_then(Value::into_result);
        ctx.frames_mut().pop();
        result
    }
}

impl CompositeValue for CustomMacro {
    const TYPE_NAME: &'static str = "custom macro";

    fn same_as(&self, other: &Self) -> bool {
        self.to_source() == other.to_source()
    }

    fn to_source(&self) -> String {
        let params = self.params.iter().map(|p| p.to_source());
        let body = structural::to_source(&Value::string(self.body.as_str()));
        format!("(macro:{})", params.chain(std::iter::once(body)).join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::datatype::Datatype;
    use crate::runtime::error::ErrorKind;

    #[test]
    fn duplicate_params_are_rejected() {
        let err = CustomMacro::new(
            vec![
                TypedVar::temp(Datatype::number(), "a"),
                TypedVar::temp(Datatype::string(), "a"),
            ],
            "_a",
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Datatype);
    }

    #[test]
    fn source_lists_params_then_body() {
        let m = CustomMacro::new(vec![TypedVar::temp(Datatype::number(), "a")], "_a * 2").unwrap();
        assert_eq!(m.to_source(), r#"(macro:num-type _a,"_a * 2")"#);
    }
}
