//! Attribute accessor generation.
//!
//! Every attribute gets a getter. Only writable attributes get a setter;
//! readonly ones are registered with `v8::ReadOnly | v8::DontDelete` so the
//! host itself raises the `TypeError` on assignment.

use tracing::trace;

use crate::emit::SourceFragment;
use crate::error::CompileError;
use crate::marshal::{cpp_literal, cpp_string_literal, decode_call, encode_expr};
use crate::model::{Attribute, Interface, Mutability};
use crate::plan::plan_attributes;
use crate::types::TypeMapping;
use crate::writer::SourceWriter;

/// A resolved attribute bound to a storage slot.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributePlan {
    pub name: String,
    pub mapping: TypeMapping,
    pub mutability: Mutability,
    /// Index into the object's native storage, in declaration order.
    pub slot: usize,
}

/// The property descriptor flags an attribute is exposed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PropertyDescriptor {
    pub writable: bool,
    pub enumerable: bool,
    pub configurable: bool,
}

impl AttributePlan {
    pub fn is_writable(&self) -> bool {
        self.mutability.is_writable()
    }

    /// C++ member holding the value.
    pub fn field(&self) -> String {
        format!("{}_", self.name)
    }

    pub fn getter(&self) -> String {
        format!("Get_{}", self.name)
    }

    pub fn setter(&self) -> Option<String> {
        self.is_writable().then(|| format!("Set_{}", self.name))
    }

    pub fn descriptor(&self) -> PropertyDescriptor {
        PropertyDescriptor {
            writable: self.is_writable(),
            enumerable: true,
            configurable: false,
        }
    }

    /// `v8::PropertyAttribute` expression matching [`Self::descriptor`].
    pub fn v8_attributes(&self) -> &'static str {
        if self.is_writable() {
            "v8::DontDelete"
        } else {
            "static_cast<v8::PropertyAttribute>(v8::ReadOnly | v8::DontDelete)"
        }
    }

    /// Leading part of the error raised when a setter cannot decode its value.
    pub fn setter_context(&self, interface: &str) -> String {
        format!(
            "Failed to set the '{}' property on '{}': The provided value",
            self.name, interface
        )
    }

    /// Render the accessors of this attribute for class `interface`.
    pub fn render(&self, interface: &str) -> SourceFragment {
        trace!(interface, attribute = %self.name, writable = self.is_writable(), "emitting accessors");

        let mut fragment = SourceFragment::default();
        fragment
            .declarations
            .push(format!("static NAN_GETTER({});", self.getter()));
        if let Some(setter) = self.setter() {
            fragment
                .declarations
                .push(format!("static NAN_SETTER({});", setter));
        }
        fragment
            .fields
            .push(format!("{} {};", self.mapping.cpp_storage(), self.field()));

        let mut w = SourceWriter::default();
        let keyword = if self.is_writable() {
            "attribute"
        } else {
            "readonly attribute"
        };
        w.line(format!("// {} {} {}", keyword, self.mapping.idl, self.name));
        w.block(
            &format!("NAN_GETTER({}::{})", interface, self.getter()),
            "",
            |w| {
                unwrap_self(interface, w);
                w.line(format!(
                    "info.GetReturnValue().Set({});",
                    encode_expr(&self.mapping, &format!("self->{}", self.field()))
                ));
            },
        );

        if let Some(setter) = self.setter() {
            w.blank();
            w.block(&format!("NAN_SETTER({}::{})", interface, setter), "", |w| {
                unwrap_self(interface, w);
                w.line(format!(
                    "{} decoded = {};",
                    self.mapping.cpp_storage(),
                    cpp_literal(&self.mapping, &self.mapping.default_value())
                ));
                w.block(
                    &format!("if (!{})", decode_call(&self.mapping, "value", "decoded")),
                    "",
                    |w| {
                        let message = format!(
                            "{} is not of type '{}'.",
                            self.setter_context(interface),
                            self.mapping.idl
                        );
                        w.line(format!(
                            "Nan::ThrowTypeError({});",
                            cpp_string_literal(&message)
                        ));
                        w.line("return;");
                    },
                );
                w.line(format!("self->{} = decoded;", self.field()));
            });
        }
        fragment.definitions = w.finish();

        fragment.registrations.push(format!(
            "Nan::SetAccessor(tpl->InstanceTemplate(), Nan::New({}).ToLocalChecked(), {}, {}, v8::Local<v8::Value>(), v8::DEFAULT, {});",
            cpp_string_literal(&self.name),
            self.getter(),
            self.setter().unwrap_or_else(|| "0".to_string()),
            self.v8_attributes()
        ));

        fragment
    }
}

fn unwrap_self(interface: &str, w: &mut SourceWriter) {
    w.line(format!(
        "{0}* self = Nan::ObjectWrap::Unwrap<{0}>(info.Holder());",
        interface
    ));
}

/// Generate the accessors for `attr`, a member of `interface`.
pub fn generate_attribute(
    interface: &Interface,
    attr: &Attribute,
) -> Result<SourceFragment, CompileError> {
    crate::plan::check_identifier(&interface.name, "interface name")?;
    let plans = plan_attributes(interface)?;
    let plan = plans
        .iter()
        .find(|p| p.name == attr.name)
        .ok_or_else(|| {
            CompileError::invalid_signature(
                &interface.name,
                format!("attribute `{}` is not declared", attr.name),
            )
        })?;
    Ok(plan.render(&interface.name))
}
