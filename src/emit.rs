//! Emission driver: sequences the generators over a compilation unit.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::coercion::CoercionPolicy;
use crate::error::CompileError;
use crate::marshal::{cpp_literal, cpp_string_literal, render_helpers};
use crate::model::Interface;
use crate::plan::{check_identifier, plan_all, InterfacePlan};
use crate::types::{NativeKind, TypeMapping};
use crate::writer::SourceWriter;

/// A piece of generated source contributed to one class.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceFragment {
    /// Static member declarations inside the class body.
    pub declarations: Vec<String>,
    /// Data member declarations inside the class body.
    pub fields: Vec<String>,
    /// Out-of-class function definitions.
    pub definitions: String,
    /// Statements run from the class's `Init`.
    pub registrations: Vec<String>,
}

/// Options for code generation.
#[derive(Debug, Clone)]
pub struct CodegenOptions {
    /// Name passed to `NODE_MODULE`; must match the addon's target name.
    pub module_name: String,
    pub coercion: CoercionPolicy,
    /// Extra comment line placed under the generated header.
    pub banner: Option<String>,
    /// Include warnings as comments at the end of the unit.
    pub verbose: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            module_name: "binding".to_string(),
            coercion: CoercionPolicy::default(),
            banner: None,
            verbose: false,
        }
    }
}

impl CodegenOptions {
    pub fn with_module(mut self, name: impl Into<String>) -> Self {
        self.module_name = name.into();
        self
    }

    pub fn with_coercion(mut self, coercion: CoercionPolicy) -> Self {
        self.coercion = coercion;
        self
    }
}

/// Warnings generated during code generation. They never block output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub message: String,
    pub kind: WarningKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A readonly attribute no constructor parameter initializes; it always
    /// reads as its type's default.
    Constant,
    /// An interface without attributes.
    Empty,
    /// A 64-bit integer attribute; values beyond 2^53 - 1 lose precision
    /// when read from the host.
    Precision,
}

/// Generated source plus everything a loader needs to know about it.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub code: String,
    pub manifest: Manifest,
    pub warnings: Vec<Warning>,
}

/// Symbols exported by a generated module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub module: String,
    pub interfaces: Vec<InterfaceManifest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceManifest {
    pub name: String,
    pub class: String,
    pub constructor: ConstructorManifest,
    pub attributes: Vec<AttributeManifest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructorManifest {
    pub symbol: String,
    pub required: usize,
    pub total: usize,
    pub parameters: Vec<ParameterManifest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterManifest {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeManifest {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub getter: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setter: Option<String>,
    pub writable: bool,
}

impl Manifest {
    fn from_plans(module: &str, plans: &[InterfacePlan]) -> Self {
        let interfaces = plans
            .iter()
            .map(|plan| InterfaceManifest {
                name: plan.name.clone(),
                class: plan.name.clone(),
                constructor: ConstructorManifest {
                    symbol: format!("{}::New", plan.name),
                    required: plan.constructor.required(),
                    total: plan.constructor.total(),
                    parameters: plan
                        .constructor
                        .params
                        .iter()
                        .map(|p| ParameterManifest {
                            name: p.name.clone(),
                            ty: p.mapping.idl.to_string(),
                            optional: p.default.is_some(),
                        })
                        .collect(),
                },
                attributes: plan
                    .attributes
                    .iter()
                    .map(|a| AttributeManifest {
                        name: a.name.clone(),
                        ty: a.mapping.idl.to_string(),
                        getter: format!("{}::{}", plan.name, a.getter()),
                        setter: a.setter().map(|s| format!("{}::{}", plan.name, s)),
                        writable: a.is_writable(),
                    })
                    .collect(),
            })
            .collect();
        Self {
            module: module.to_string(),
            interfaces,
        }
    }

    pub fn interface(&self, name: &str) -> Option<&InterfaceManifest> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    /// Every C++ symbol the module defines, in emission order.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols = Vec::new();
        for iface in &self.interfaces {
            symbols.push(iface.class.clone());
            symbols.push(format!("{}::Init", iface.class));
            symbols.push(iface.constructor.symbol.clone());
            for attr in &iface.attributes {
                symbols.push(attr.getter.clone());
                symbols.extend(attr.setter.clone());
            }
        }
        symbols.push("InitAll".to_string());
        symbols
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Compile `interfaces` with default options.
pub fn compile(interfaces: &[Interface]) -> Result<SourceUnit, CompileError> {
    compile_with_options(interfaces, &CodegenOptions::default())
}

/// Compile `interfaces` into one source unit. Either every interface is
/// emitted or an error describing every problem is returned.
pub fn compile_with_options(
    interfaces: &[Interface],
    options: &CodegenOptions,
) -> Result<SourceUnit, CompileError> {
    let mut errors = Vec::new();
    if let Err(err) = check_identifier(&options.module_name, "module name") {
        errors.push(err);
    }
    let plans = match plan_all(interfaces) {
        Ok(plans) => plans,
        Err(err) => {
            errors.push(err);
            Vec::new()
        }
    };
    if let Some(err) = CompileError::from_list(errors) {
        return Err(err);
    }

    let mut emitter = Emitter::new(options);
    emitter.emit_unit(&plans);
    Ok(SourceUnit {
        code: emitter.writer.finish(),
        manifest: Manifest::from_plans(&options.module_name, &plans),
        warnings: emitter.warnings,
    })
}

struct Emitter<'a> {
    options: &'a CodegenOptions,
    writer: SourceWriter,
    warnings: Vec<Warning>,
}

impl<'a> Emitter<'a> {
    fn new(options: &'a CodegenOptions) -> Self {
        Self {
            options,
            writer: SourceWriter::default(),
            warnings: Vec::new(),
        }
    }

    fn warn(&mut self, kind: WarningKind, message: impl Into<String>) {
        self.warnings.push(Warning {
            message: message.into(),
            kind,
        });
    }

    fn emit_unit(&mut self, plans: &[InterfacePlan]) {
        let fragments: Vec<Vec<SourceFragment>> = plans
            .iter()
            .map(|plan| {
                debug!(interface = %plan.name, attributes = plan.attributes.len(), "emitting interface");
                self.collect_warnings(plan);
                let mut fragments = vec![plan.constructor.render()];
                fragments.extend(plan.attributes.iter().map(|a| a.render(&plan.name)));
                fragments
            })
            .collect();

        self.emit_header(plans.len());

        let types: Vec<TypeMapping> = plans
            .iter()
            .flat_map(|p| p.attributes.iter().map(|a| a.mapping))
            .collect();
        render_helpers(&types, &self.options.coercion, &mut self.writer);
        self.writer.blank();

        for (plan, parts) in plans.iter().zip(&fragments) {
            self.emit_class(plan, parts);
            self.writer.blank();
        }
        for (plan, parts) in plans.iter().zip(&fragments) {
            self.emit_definitions(plan, parts);
        }

        self.emit_module(plans);
        self.emit_warnings();
    }

    fn collect_warnings(&mut self, plan: &InterfacePlan) {
        if plan.attributes.is_empty() {
            self.warn(
                WarningKind::Empty,
                format!("interface `{}` declares no attributes", plan.name),
            );
        }
        for attr in &plan.attributes {
            let bound = plan.constructor.params.iter().any(|p| p.slot == attr.slot);
            if !attr.is_writable() && !bound {
                self.warn(
                    WarningKind::Constant,
                    format!(
                        "readonly attribute `{}.{}` is never initialized and always reads as its default",
                        plan.name, attr.name
                    ),
                );
            }
            if matches!(attr.mapping.native, NativeKind::Integer(range) if range.bits == 64) {
                self.warn(
                    WarningKind::Precision,
                    format!(
                        "`{}.{}` is `{}`; values beyond 2^53 - 1 are not exact in the host",
                        plan.name, attr.name, attr.mapping.idl
                    ),
                );
            }
        }
    }

    fn emit_header(&mut self, count: usize) {
        let w = &mut self.writer;
        w.line(format!(
            "// Generated by widl-nan from {} interface{}. Do not edit.",
            count,
            if count == 1 { "" } else { "s" }
        ));
        if let Some(banner) = &self.options.banner {
            for line in banner.lines() {
                w.line(format!("// {}", line).trim_end());
            }
        }
        w.blank();
        for header in ["algorithm", "cmath", "cstdint", "limits", "string"] {
            w.line(format!("#include <{}>", header));
        }
        w.blank();
        w.line("#include <nan.h>");
        w.blank();
    }

    fn emit_class(&mut self, plan: &InterfacePlan, parts: &[SourceFragment]) {
        let w = &mut self.writer;
        w.block(
            &format!("class {} : public Nan::ObjectWrap", plan.name),
            ";",
            |w| {
                w.raw_line(" public:");
                w.line("static NAN_MODULE_INIT(Init);");
                w.blank();
                w.raw_line(" private:");
                w.line(format!("{}();", plan.name));
                w.line(format!("~{}();", plan.name));
                w.blank();
                for decl in parts.iter().flat_map(|f| &f.declarations) {
                    w.line(decl);
                }
                let fields: Vec<&String> = parts.iter().flat_map(|f| &f.fields).collect();
                if !fields.is_empty() {
                    w.blank();
                    for field in fields {
                        w.line(field);
                    }
                }
            },
        );
    }

    fn emit_definitions(&mut self, plan: &InterfacePlan, parts: &[SourceFragment]) {
        let class = plan.name.as_str();
        let w = &mut self.writer;

        let initializers: Vec<String> = plan
            .attributes
            .iter()
            .map(|a| format!("{}({})", a.field(), cpp_literal(&a.mapping, &a.mapping.default_value())))
            .collect();
        if initializers.is_empty() {
            w.line(format!("{0}::{0}() {{}}", class));
        } else {
            w.line(format!("{0}::{0}() : {1} {{}}", class, initializers.join(", ")));
        }
        w.blank();
        w.line(format!("{0}::~{0}() {{}}", class));
        w.blank();

        w.block(&format!("NAN_MODULE_INIT({}::Init)", class), "", |w| {
            w.line("v8::Local<v8::FunctionTemplate> tpl = Nan::New<v8::FunctionTemplate>(New);");
            w.line(format!(
                "tpl->SetClassName(Nan::New({}).ToLocalChecked());",
                cpp_string_literal(class)
            ));
            w.line("tpl->InstanceTemplate()->SetInternalFieldCount(1);");
            for registration in parts.iter().flat_map(|f| &f.registrations) {
                w.line(registration);
            }
            w.line(format!(
                "Nan::Set(target, Nan::New({}).ToLocalChecked(), Nan::GetFunction(tpl).ToLocalChecked());",
                cpp_string_literal(class)
            ));
        });
        w.blank();

        for part in parts.iter().filter(|f| !f.definitions.is_empty()) {
            w.append(&part.definitions);
            w.blank();
        }
    }

    fn emit_module(&mut self, plans: &[InterfacePlan]) {
        let w = &mut self.writer;
        w.block("NAN_MODULE_INIT(InitAll)", "", |w| {
            for plan in plans {
                w.line(format!("{}::Init(target);", plan.name));
            }
        });
        w.blank();
        w.line(format!("NODE_MODULE({}, InitAll)", self.options.module_name));
    }

    fn emit_warnings(&mut self) {
        if self.warnings.is_empty() || !self.options.verbose {
            return;
        }

        let w = &mut self.writer;
        w.blank();
        w.line("// WARNINGS:");
        for warning in &self.warnings {
            let prefix = match warning.kind {
                WarningKind::Constant => "CONSTANT",
                WarningKind::Empty => "EMPTY",
                WarningKind::Precision => "PRECISION",
            };
            w.line(format!("// {}: {}", prefix, warning.message));
        }
    }
}
