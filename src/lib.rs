//! Binding generator for Node.js native addons.
//!
//! This crate compiles interface declarations (attributes and a constructor
//! signature per interface) into one C++ source unit written against the
//! NAN API:
//! - One `Nan::ObjectWrap` class per interface, with native storage for
//!   every attribute.
//! - A getter per attribute and a setter per writable attribute.
//! - A single constructor dispatch over the argument count that fills in
//!   defaults for omitted trailing parameters.
//! - Decode helpers implementing a configurable [`CoercionPolicy`].
//!
//! [`HostModule`] executes the same plans in-process against a dynamic
//! [`Value`] model, which is how the runtime behavior of generated code is
//! tested.

mod attr;
mod coercion;
mod config;
mod ctor;
mod dts;
mod emit;
mod error;
mod host;
mod marshal;
mod model;
mod output;
mod plan;
mod types;
mod value;
mod writer;

pub use attr::{generate_attribute, AttributePlan, PropertyDescriptor};
pub use coercion::{CoercionPolicy, DecodeError, IntegerNan, IntegerOverflow, IntegerRange};
pub use config::{BuildConfig, ConfigError, WidlConfig, CONFIG_FILE};
pub use ctor::{generate_constructor, ConstructorPlan, ParameterPlan};
pub use dts::render_dts;
pub use emit::{
    compile, compile_with_options, AttributeManifest, CodegenOptions, ConstructorManifest,
    InterfaceManifest, Manifest, ParameterManifest, SourceFragment, SourceUnit, Warning,
    WarningKind,
};
pub use error::{CompileError, RuntimeError};
pub use host::{HostModule, HostObject};
pub use model::{Attribute, ConstructorParameter, DefaultValue, Definitions, Interface, Mutability};
pub use output::{OutputError, OutputWriter, WriteResult};
pub use plan::{is_reserved, plan_all, plan_interface, InterfacePlan};
pub use types::{map_type, IdlType, NativeKind, NativeValue, TypeMapping};
pub use value::Value;
