//! In-process host binding layer.
//!
//! Loads the plans of a compilation unit and executes them the way the
//! generated addon does inside V8: the same constructor dispatch, the same
//! accessor flags and the same coercion policy. Assignments behave as in
//! strict-mode code, so writing a readonly attribute raises instead of being
//! silently dropped.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::trace;

use crate::attr::{AttributePlan, PropertyDescriptor};
use crate::coercion::CoercionPolicy;
use crate::emit::CodegenOptions;
use crate::error::{CompileError, RuntimeError};
use crate::model::Interface;
use crate::plan::{plan_all, InterfacePlan};
use crate::types::NativeValue;
use crate::value::Value;

/// A loaded module exposing one constructor per interface.
#[derive(Debug, Clone)]
pub struct HostModule {
    name: String,
    policy: CoercionPolicy,
    classes: IndexMap<String, Arc<InterfacePlan>>,
}

impl HostModule {
    /// Plan `interfaces` and expose them under `options.module_name`.
    /// Fails exactly when compiling the same input fails.
    pub fn new(interfaces: &[Interface], options: &CodegenOptions) -> Result<Self, CompileError> {
        crate::plan::check_identifier(&options.module_name, "module name")?;
        let classes = plan_all(interfaces)?
            .into_iter()
            .map(|plan| (plan.name.clone(), Arc::new(plan)))
            .collect();
        Ok(Self {
            name: options.module_name.clone(),
            policy: options.coercion,
            classes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exported constructor names, in declaration order.
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    /// `new <class>(...args)`.
    pub fn construct(&self, class: &str, args: &[Value]) -> Result<HostObject, RuntimeError> {
        let plan = self
            .classes
            .get(class)
            .ok_or_else(|| RuntimeError::UnknownInterface(class.to_string()))?;

        let mut storage = plan.initial_storage();
        for (slot, value) in plan.constructor.bind(args, &self.policy)? {
            storage[slot] = value;
        }
        trace!(class, argc = args.len(), "constructed host object");

        Ok(HostObject {
            plan: Arc::clone(plan),
            policy: self.policy,
            storage,
        })
    }
}

/// An instance created through [`HostModule::construct`].
#[derive(Debug, Clone)]
pub struct HostObject {
    plan: Arc<InterfacePlan>,
    policy: CoercionPolicy,
    storage: Vec<NativeValue>,
}

impl HostObject {
    pub fn class_name(&self) -> &str {
        &self.plan.name
    }

    fn attribute(&self, property: &str) -> Result<&AttributePlan, RuntimeError> {
        self.plan
            .attribute(property)
            .ok_or_else(|| RuntimeError::UnknownProperty {
                interface: self.plan.name.clone(),
                property: property.to_string(),
            })
    }

    /// Read `property` through its getter.
    pub fn get(&self, property: &str) -> Result<Value, RuntimeError> {
        let attr = self.attribute(property)?;
        Ok(attr.mapping.encode(&self.storage[attr.slot]))
    }

    /// Assign `property` through its setter. On failure the stored value is
    /// left as it was.
    pub fn set(&mut self, property: &str, value: Value) -> Result<(), RuntimeError> {
        let attr = self.attribute(property)?;
        if !attr.is_writable() {
            return Err(RuntimeError::ReadOnly {
                interface: self.plan.name.clone(),
                property: property.to_string(),
            });
        }

        let decoded = attr
            .mapping
            .decode(&value, &self.policy)
            .map_err(|reason| RuntimeError::TypeMismatch {
                context: attr.setter_context(&self.plan.name),
                expected: attr.mapping.idl,
                reason,
            })?;
        let slot = attr.slot;
        self.storage[slot] = decoded;
        Ok(())
    }

    /// `Object.getOwnPropertyDescriptor` flags, `None` for unknown properties.
    pub fn property_descriptor(&self, property: &str) -> Option<PropertyDescriptor> {
        self.plan.attribute(property).map(AttributePlan::descriptor)
    }

    /// Enumerable property names in registration order.
    pub fn keys(&self) -> Vec<&str> {
        self.plan
            .attributes
            .iter()
            .filter(|a| a.descriptor().enumerable)
            .map(|a| a.name.as_str())
            .collect()
    }

    pub fn entries(&self) -> Vec<(&str, Value)> {
        self.plan
            .attributes
            .iter()
            .map(|a| (a.name.as_str(), a.mapping.encode(&self.storage[a.slot])))
            .collect()
    }

    /// Raw native storage, one slot per attribute.
    pub fn storage(&self) -> &[NativeValue] {
        &self.storage
    }
}
