//! Constructor dispatch generation.
//!
//! One generated `New` function handles every supported arity: it checks
//! `argc` against `[required, total]`, decodes the supplied prefix of
//! arguments positionally and substitutes declared defaults for the rest.
//! [`ConstructorPlan::bind`] performs the same dispatch in-process.

use tracing::trace;

use crate::attr::AttributePlan;
use crate::coercion::CoercionPolicy;
use crate::emit::SourceFragment;
use crate::error::{CompileError, RuntimeError};
use crate::marshal::{cpp_literal, cpp_string_literal, decode_call};
use crate::model::{ConstructorParameter, Interface};
use crate::plan::{check_identifier, check_member, plan_attributes};
use crate::types::{map_type, NativeValue, TypeMapping};
use crate::value::Value;
use crate::writer::SourceWriter;

/// A resolved constructor parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterPlan {
    pub name: String,
    pub mapping: TypeMapping,
    /// Value used when the argument is omitted; `None` for required parameters.
    pub default: Option<NativeValue>,
    /// Storage slot of the attribute this parameter initializes.
    pub slot: usize,
}

/// Validated constructor signature of one interface.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorPlan {
    pub interface: String,
    pub params: Vec<ParameterPlan>,
    required: usize,
}

impl ConstructorPlan {
    /// Validate the parameters of `interface` against its resolved attributes.
    pub fn build(
        interface: &Interface,
        attributes: &[AttributePlan],
    ) -> Result<Self, CompileError> {
        let name = interface.name.as_str();
        let mut errors = Vec::new();
        let mut params: Vec<ParameterPlan> = Vec::with_capacity(interface.constructor.len());
        let mut first_optional: Option<&str> = None;

        for (index, param) in interface.constructor.iter().enumerate() {
            if let Err(err) = check_member(name, &param.name, "constructor parameter") {
                errors.push(err);
                continue;
            }
            if interface.constructor[..index]
                .iter()
                .any(|p| p.name == param.name)
            {
                errors.push(CompileError::duplicate(
                    format!("{}({})", name, param.name),
                    "constructor parameter declared more than once",
                ));
                continue;
            }

            if param.has_default() {
                first_optional.get_or_insert(param.name.as_str());
            } else if let Some(optional) = first_optional {
                errors.push(CompileError::invalid_signature(
                    name,
                    format!(
                        "required parameter `{}` follows optional parameter `{}`",
                        param.name, optional
                    ),
                ));
                continue;
            }

            match resolve_parameter(name, param, attributes) {
                Ok(plan) => params.push(plan),
                Err(err) => errors.push(err),
            }
        }

        if let Some(err) = CompileError::from_list(errors) {
            return Err(err);
        }

        let required = params.iter().take_while(|p| p.default.is_none()).count();
        Ok(Self {
            interface: interface.name.clone(),
            params,
            required,
        })
    }

    /// Number of parameters that must be supplied.
    pub fn required(&self) -> usize {
        self.required
    }

    /// Number of parameters accepted.
    pub fn total(&self) -> usize {
        self.params.len()
    }

    /// Human-readable accepted arity, shared by generated and host errors.
    pub fn arity_expectation(&self) -> String {
        let (min, max) = (self.required, self.total());
        let plural = |n: usize| if n == 1 { "argument" } else { "arguments" };
        if max == 0 {
            "expected no arguments".to_string()
        } else if min == max {
            format!("expected exactly {} {}", max, plural(max))
        } else if min == 0 {
            format!("expected at most {} {}", max, plural(max))
        } else {
            format!("expected between {} and {} arguments", min, max)
        }
    }

    /// Leading part of the error raised when argument `index` cannot be decoded.
    pub fn parameter_context(&self, index: usize) -> String {
        format!(
            "Failed to construct '{}': parameter {} ('{}')",
            self.interface,
            index + 1,
            self.params[index].name
        )
    }

    /// Dispatch an invocation with `args`, returning the value for every
    /// bound storage slot in parameter order. Nothing is returned unless
    /// every argument decodes.
    pub fn bind(
        &self,
        args: &[Value],
        policy: &CoercionPolicy,
    ) -> Result<Vec<(usize, NativeValue)>, RuntimeError> {
        let argc = args.len();
        if argc < self.required || argc > self.total() {
            return Err(RuntimeError::Arity {
                interface: self.interface.clone(),
                expectation: self.arity_expectation(),
                actual: argc,
            });
        }

        self.params
            .iter()
            .enumerate()
            .map(|(index, param)| -> Result<(usize, NativeValue), RuntimeError> {
                let value = match args.get(index) {
                    Some(arg) => param.mapping.decode(arg, policy).map_err(|reason| {
                        RuntimeError::TypeMismatch {
                            context: self.parameter_context(index),
                            expected: param.mapping.idl,
                            reason,
                        }
                    })?,
                    None => param
                        .default
                        .clone()
                        .unwrap_or_else(|| param.mapping.default_value()),
                };
                Ok((param.slot, value))
            })
            .collect()
    }

    /// Render `New` for class `interface`.
    pub fn render(&self) -> SourceFragment {
        trace!(interface = %self.interface, required = self.required, total = self.total(), "emitting constructor");

        let class = self.interface.as_str();
        let mut w = SourceWriter::default();
        w.line(format!("// {}", self.signature()));
        w.block(&format!("NAN_METHOD({}::New)", class), "", |w| {
            w.block("if (!info.IsConstructCall())", "", |w| {
                let message = format!(
                    "Failed to construct '{}': Please use the 'new' operator.",
                    class
                );
                w.line(format!("Nan::ThrowTypeError({});", cpp_string_literal(&message)));
                w.line("return;");
            });

            w.line("const int argc = info.Length();");
            w.block(&format!("if ({})", self.arity_condition()), "", |w| {
                let prefix = format!(
                    "Failed to construct '{}': {}, but ",
                    class,
                    self.arity_expectation()
                );
                w.line(format!(
                    "const std::string message = std::string({}) + std::to_string(argc) + (argc == 1 ? \" was\" : \" were\") + \" provided.\";",
                    cpp_string_literal(&prefix)
                ));
                w.line("Nan::ThrowTypeError(message.c_str());");
                w.line("return;");
            });

            for param in &self.params {
                let initial = param
                    .default
                    .clone()
                    .unwrap_or_else(|| param.mapping.default_value());
                w.line(format!(
                    "{} {} = {};",
                    param.mapping.cpp_storage(),
                    param.name,
                    cpp_literal(&param.mapping, &initial)
                ));
            }

            for (index, param) in self.params.iter().enumerate() {
                let decode = decode_call(&param.mapping, &format!("info[{}]", index), &param.name);
                let condition = if index < self.required {
                    format!("if (!{})", decode)
                } else {
                    format!("if (argc > {} && !{})", index, decode)
                };
                w.block(&condition, "", |w| {
                    let message = format!(
                        "{} is not of type '{}'.",
                        self.parameter_context(index),
                        param.mapping.idl
                    );
                    w.line(format!("Nan::ThrowTypeError({});", cpp_string_literal(&message)));
                    w.line("return;");
                });
            }

            w.line(format!("{0}* self = new {0}();", class));
            for param in &self.params {
                w.line(format!("self->{}_ = {};", param.name, param.name));
            }
            w.line("self->Wrap(info.This());");
            w.line("info.GetReturnValue().Set(info.This());");
        });

        SourceFragment {
            declarations: vec!["static NAN_METHOD(New);".to_string()],
            fields: Vec::new(),
            definitions: w.finish(),
            registrations: Vec::new(),
        }
    }

    fn arity_condition(&self) -> String {
        if self.required == 0 {
            format!("argc > {}", self.total())
        } else {
            format!("argc < {} || argc > {}", self.required, self.total())
        }
    }

    /// IDL-style signature, used as a comment above the generated function.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| match &p.default {
                Some(default) => format!(
                    "optional {} {} = {}",
                    p.mapping.idl,
                    p.name,
                    describe_default(default)
                ),
                None => format!("{} {}", p.mapping.idl, p.name),
            })
            .collect();
        format!("constructor({})", params.join(", "))
    }
}

fn describe_default(value: &NativeValue) -> String {
    match value {
        NativeValue::Text(s) => format!("{:?}", s),
        NativeValue::Integer(v) => v.to_string(),
        NativeValue::Unsigned(v) => v.to_string(),
        NativeValue::Float(v) => format!("{:?}", v),
        NativeValue::Bool(b) => b.to_string(),
    }
}

fn resolve_parameter(
    interface: &str,
    param: &ConstructorParameter,
    attributes: &[AttributePlan],
) -> Result<ParameterPlan, CompileError> {
    let mapping = map_type(&param.ty)
        .map_err(|e| e.at_member(format!("{}({})", interface, param.name)))?;

    let attribute = attributes
        .iter()
        .find(|a| a.name == param.name)
        .ok_or_else(|| {
            CompileError::invalid_signature(
                interface,
                format!("parameter `{}` does not name an attribute", param.name),
            )
        })?;
    if attribute.mapping != mapping {
        return Err(CompileError::invalid_signature(
            interface,
            format!(
                "parameter `{}` is `{}` but attribute `{}` is `{}`",
                param.name, mapping.idl, attribute.name, attribute.mapping.idl
            ),
        ));
    }

    let default = match (&param.default, param.optional) {
        (Some(literal), _) => Some(mapping.native_default(literal).ok_or_else(|| {
            CompileError::invalid_signature(
                interface,
                format!(
                    "default value {:?} of parameter `{}` is not a valid `{}`",
                    literal, param.name, mapping.idl
                ),
            )
        })?),
        (None, true) => Some(mapping.default_value()),
        (None, false) => None,
    };

    Ok(ParameterPlan {
        name: param.name.clone(),
        mapping,
        default,
        slot: attribute.slot,
    })
}

/// Generate the constructor dispatch for `interface`.
pub fn generate_constructor(interface: &Interface) -> Result<SourceFragment, CompileError> {
    check_identifier(&interface.name, "interface name")?;
    let attributes = plan_attributes(interface)?;
    Ok(ConstructorPlan::build(interface, &attributes)?.render())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coercion::DecodeError;
    use crate::model::{Attribute, DefaultValue};
    use crate::types::IdlType;

    fn animal() -> Interface {
        Interface::new("Animal")
            .with_parameter(ConstructorParameter::optional("name", "DOMString"))
            .with_parameter(ConstructorParameter::optional("age", "long"))
            .with_attribute(Attribute::readonly("name", "DOMString"))
            .with_attribute(Attribute::writable("age", "long"))
    }

    fn plan(interface: &Interface) -> Result<ConstructorPlan, CompileError> {
        let attributes = plan_attributes(interface)?;
        ConstructorPlan::build(interface, &attributes)
    }

    #[test]
    fn test_bind_applies_defaults() {
        let plan = plan(&animal()).unwrap();
        let policy = CoercionPolicy::default();

        assert_eq!(
            plan.bind(&[], &policy).unwrap(),
            vec![(0, NativeValue::Text(String::new())), (1, NativeValue::Integer(0))]
        );
        assert_eq!(
            plan.bind(&["Dog".into()], &policy).unwrap(),
            vec![(0, NativeValue::Text("Dog".into())), (1, NativeValue::Integer(0))]
        );
        assert_eq!(
            plan.bind(&["Dog".into(), 5.into()], &policy).unwrap(),
            vec![(0, NativeValue::Text("Dog".into())), (1, NativeValue::Integer(5))]
        );
    }

    #[test]
    fn test_bind_rejects_extra_arguments() {
        let plan = plan(&animal()).unwrap();
        let err = plan
            .bind(&["Dog".into(), 5.into(), true.into()], &CoercionPolicy::default())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to construct 'Animal': expected at most 2 arguments, but 3 were provided."
        );
    }

    #[test]
    fn test_bind_enforces_required() {
        let iface = Interface::new("Point")
            .with_parameter(ConstructorParameter::required("x", "double"))
            .with_parameter(ConstructorParameter::optional("y", "double").with_default(DefaultValue::Float(1.5)))
            .with_attribute(Attribute::writable("x", "double"))
            .with_attribute(Attribute::writable("y", "double"));
        let plan = plan(&iface).unwrap();
        let policy = CoercionPolicy::default();

        assert_eq!(plan.required(), 1);
        assert!(matches!(
            plan.bind(&[], &policy),
            Err(RuntimeError::Arity { actual: 0, .. })
        ));
        assert_eq!(
            plan.bind(&[2.0.into()], &policy).unwrap(),
            vec![(0, NativeValue::Float(2.0)), (1, NativeValue::Float(1.5))]
        );
    }

    #[test]
    fn test_bind_reports_type_mismatch() {
        let plan = plan(&animal()).unwrap();
        let err = plan
            .bind(&["Dog".into(), "five".into()], &CoercionPolicy::default())
            .unwrap_err();
        assert_eq!(
            err,
            RuntimeError::TypeMismatch {
                context: "Failed to construct 'Animal': parameter 2 ('age')".into(),
                expected: IdlType::Long,
                reason: DecodeError::NotNumeric("string"),
            }
        );
        assert_eq!(
            err.to_string(),
            "Failed to construct 'Animal': parameter 2 ('age') is not of type 'long'."
        );
    }

    #[test]
    fn test_required_after_optional_is_invalid() {
        let iface = Interface::new("Animal")
            .with_parameter(ConstructorParameter::optional("name", "DOMString"))
            .with_parameter(ConstructorParameter::required("age", "long"))
            .with_attribute(Attribute::readonly("name", "DOMString"))
            .with_attribute(Attribute::writable("age", "long"));
        let err = plan(&iface).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid signature for `Animal`: required parameter `age` follows optional parameter `name`"
        );
    }

    #[test]
    fn test_parameter_must_match_attribute() {
        let missing = Interface::new("Animal")
            .with_parameter(ConstructorParameter::optional("legs", "long"))
            .with_attribute(Attribute::writable("age", "long"));
        assert!(matches!(plan(&missing), Err(CompileError::InvalidSignature { .. })));

        let mistyped = Interface::new("Animal")
            .with_parameter(ConstructorParameter::optional("age", "double"))
            .with_attribute(Attribute::writable("age", "long"));
        let err = plan(&mistyped).unwrap_err();
        assert!(err.to_string().contains("parameter `age` is `double` but attribute `age` is `long`"));
    }

    #[test]
    fn test_default_must_fit_type() {
        let iface = Interface::new("Pixel")
            .with_parameter(ConstructorParameter::optional("red", "octet").with_default(DefaultValue::Integer(300)))
            .with_attribute(Attribute::writable("red", "octet"));
        assert!(matches!(plan(&iface), Err(CompileError::InvalidSignature { .. })));
    }

    #[test]
    fn test_duplicate_parameter() {
        let iface = Interface::new("Animal")
            .with_parameter(ConstructorParameter::optional("age", "long"))
            .with_parameter(ConstructorParameter::optional("age", "long"))
            .with_attribute(Attribute::writable("age", "long"));
        assert!(matches!(
            plan(&iface),
            Err(CompileError::DuplicateSymbol { ref symbol, .. }) if symbol == "Animal(age)"
        ));
    }

    #[test]
    fn test_render_new() {
        let fragment = generate_constructor(&animal()).unwrap();
        let code = &fragment.definitions;

        assert_eq!(fragment.declarations, vec!["static NAN_METHOD(New);"]);
        assert!(code.contains("// constructor(optional DOMString name = \"\", optional long age = 0)"));
        assert!(code.contains("NAN_METHOD(Animal::New) {"));
        assert!(code.contains("if (!info.IsConstructCall()) {"));
        assert!(code.contains("if (argc > 2) {"));
        assert!(code.contains("std::string name = \"\";"));
        assert!(code.contains("int32_t age = 0;"));
        assert!(code.contains("if (argc > 0 && !widl::DecodeDOMString(info[0], &name)) {"));
        assert!(code.contains("if (argc > 1 && !widl::DecodeLong(info[1], &age)) {"));
        assert!(code.contains("self->name_ = name;"));
        assert!(code.contains("self->age_ = age;"));
        assert!(code.contains("self->Wrap(info.This());"));
    }

    #[test]
    fn test_render_required_parameters() {
        let iface = Interface::new("Point")
            .with_parameter(ConstructorParameter::required("x", "double"))
            .with_attribute(Attribute::writable("x", "double"));
        let code = generate_constructor(&iface).unwrap().definitions;
        assert!(code.contains("if (argc < 1 || argc > 1) {"));
        assert!(code.contains("if (!widl::DecodeDouble(info[0], &x)) {"));
        assert!(code.contains("expected exactly 1 argument, but "));
    }

    #[test]
    fn test_no_parameters() {
        let iface = Interface::new("Counter").with_attribute(Attribute::writable("count", "long"));
        let plan = plan(&iface).unwrap();
        assert_eq!(plan.arity_expectation(), "expected no arguments");
        assert_eq!(plan.signature(), "constructor()");
        assert!(plan.bind(&[], &CoercionPolicy::default()).unwrap().is_empty());
    }
}
