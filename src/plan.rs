//! Validation and resolution of interface declarations.
//!
//! Planning turns the raw model into resolved plans: every type tag mapped,
//! every identifier checked against the generated C++, constructor
//! parameters bound to attribute slots. Generators and the host layer both
//! work from plans, so they can never disagree about what a declaration
//! means.

use indexmap::IndexMap;
use tracing::debug;

use crate::attr::AttributePlan;
use crate::ctor::ConstructorPlan;
use crate::error::CompileError;
use crate::model::Interface;
use crate::types::map_type;

/// A fully validated interface.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfacePlan {
    pub name: String,
    pub attributes: Vec<AttributePlan>,
    pub constructor: ConstructorPlan,
}

impl InterfacePlan {
    pub fn attribute(&self, name: &str) -> Option<&AttributePlan> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Storage contents of a freshly constructed object before any
    /// constructor argument is applied.
    pub fn initial_storage(&self) -> Vec<crate::types::NativeValue> {
        self.attributes
            .iter()
            .map(|a| a.mapping.default_value())
            .collect()
    }
}

/// Plan a whole compilation unit. Interface names must be unique.
pub fn plan_all(interfaces: &[Interface]) -> Result<Vec<InterfacePlan>, CompileError> {
    let mut errors = Vec::new();
    let mut seen: IndexMap<&str, usize> = IndexMap::new();
    let mut plans = Vec::with_capacity(interfaces.len());

    for (index, interface) in interfaces.iter().enumerate() {
        if let Some(first) = seen.insert(interface.name.as_str(), index) {
            errors.push(CompileError::duplicate(
                interface.name.clone(),
                format!(
                    "interface declared more than once (declarations {} and {})",
                    first + 1,
                    index + 1
                ),
            ));
            continue;
        }
        match plan_interface(interface) {
            Ok(plan) => plans.push(plan),
            Err(err) => errors.push(err),
        }
    }

    match CompileError::from_list(errors) {
        Some(err) => Err(err),
        None => Ok(plans),
    }
}

/// Plan a single interface, reporting every problem found in it.
pub fn plan_interface(interface: &Interface) -> Result<InterfacePlan, CompileError> {
    debug!(interface = %interface.name, "planning interface");

    let mut errors = Vec::new();
    if let Err(err) = check_identifier(&interface.name, "interface name") {
        errors.push(err);
    }

    let attributes = match plan_attributes(interface) {
        Ok(attributes) => attributes,
        Err(err) => {
            errors.push(err);
            Vec::new()
        }
    };

    // Constructor checks need resolved attributes to bind against.
    if errors.is_empty() {
        match ConstructorPlan::build(interface, &attributes) {
            Ok(constructor) => {
                return Ok(InterfacePlan {
                    name: interface.name.clone(),
                    attributes,
                    constructor,
                })
            }
            Err(err) => errors.push(err),
        }
    }

    Err(CompileError::from_list(errors)
        .unwrap_or_else(|| CompileError::invalid_signature(&interface.name, "could not be planned")))
}

/// Resolve the attribute list of `interface`, in declaration order.
pub fn plan_attributes(interface: &Interface) -> Result<Vec<AttributePlan>, CompileError> {
    let mut errors = Vec::new();
    let mut seen: IndexMap<&str, usize> = IndexMap::new();
    let mut plans = Vec::with_capacity(interface.attributes.len());

    for attr in &interface.attributes {
        let path = format!("{}.{}", interface.name, attr.name);

        if let Err(err) = check_member(&interface.name, &attr.name, "attribute") {
            errors.push(err);
            continue;
        }
        if seen.insert(attr.name.as_str(), plans.len()).is_some() {
            errors.push(CompileError::duplicate(path, "attribute declared more than once"));
            continue;
        }
        match map_type(&attr.ty) {
            Ok(mapping) => plans.push(AttributePlan {
                name: attr.name.clone(),
                mapping,
                mutability: attr.mutability,
                slot: plans.len(),
            }),
            Err(err) => errors.push(err.at_member(path)),
        }
    }

    match CompileError::from_list(errors) {
        Some(err) => Err(err),
        None => Ok(plans),
    }
}

/// Check an attribute or parameter name of `interface`.
pub(crate) fn check_member(interface: &str, name: &str, what: &str) -> Result<(), CompileError> {
    check_identifier(name, &format!("{} of `{}`", what, interface))?;
    if name == interface {
        return Err(CompileError::duplicate(
            format!("{}.{}", interface, name),
            format!("{} shares the name of its interface", what),
        ));
    }
    Ok(())
}

/// Check that `name` is a valid, unreserved C++ identifier.
pub(crate) fn check_identifier(name: &str, context: &str) -> Result<(), CompileError> {
    if !is_valid_identifier(name) {
        return Err(CompileError::InvalidIdentifier {
            name: name.to_string(),
            context: context.to_string(),
        });
    }
    if is_reserved(name) {
        return Err(CompileError::duplicate(
            name,
            format!("{} collides with a reserved identifier of the generated source", context),
        ));
    }
    Ok(())
}

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// Names the generated source cannot use for declared symbols: C++
/// keywords, implementation-reserved spellings, and the names the generated
/// functions and module scaffolding already occupy.
pub fn is_reserved(name: &str) -> bool {
    if name.contains("__") {
        return true;
    }
    if let Some(rest) = name.strip_prefix('_') {
        if rest.starts_with(|c: char| c.is_ascii_uppercase()) {
            return true;
        }
    }
    if name.starts_with("NAN_") || name.starts_with("NODE_") || name.starts_with("V8_") {
        return true;
    }
    is_cpp_keyword(name) || is_generated_name(name)
}

fn is_generated_name(name: &str) -> bool {
    matches!(
        name,
        // Namespaces and module scaffolding
        "Nan" | "v8" | "node" | "std" | "widl" | "InitAll"
            // Class members every generated binding declares
            | "New"
            | "Init"
            // Locals and parameters inside generated functions
            | "info"
            | "value"
            | "property"
            | "target"
            | "tpl"
            | "self"
            | "argc"
            | "decoded"
            | "number"
            | "out"
            | "text"
            | "utf8"
    ) || is_global_type(name)
}

/// Type names `<cstdint>` and `<cstddef>` place in the global namespace.
/// Generated locals are declared with these, so a symbol of the same name
/// would shadow them.
fn is_global_type(name: &str) -> bool {
    let fixed_width = name
        .strip_prefix('u')
        .unwrap_or(name)
        .strip_prefix("int")
        .and_then(|rest| rest.strip_suffix("_t"))
        .map(|rest| {
            let width = rest
                .strip_prefix("_least")
                .or_else(|| rest.strip_prefix("_fast"))
                .unwrap_or(rest);
            matches!(width, "8" | "16" | "32" | "64" | "max" | "ptr")
        })
        .unwrap_or(false);
    fixed_width
        || matches!(name, "size_t" | "ptrdiff_t" | "nullptr_t" | "max_align_t")
}

fn is_cpp_keyword(name: &str) -> bool {
    matches!(
        name,
        "alignas"
            | "alignof"
            | "and"
            | "and_eq"
            | "asm"
            | "auto"
            | "bitand"
            | "bitor"
            | "bool"
            | "break"
            | "case"
            | "catch"
            | "char"
            | "char8_t"
            | "char16_t"
            | "char32_t"
            | "class"
            | "compl"
            | "concept"
            | "const"
            | "consteval"
            | "constexpr"
            | "constinit"
            | "const_cast"
            | "continue"
            | "co_await"
            | "co_return"
            | "co_yield"
            | "decltype"
            | "default"
            | "delete"
            | "do"
            | "double"
            | "dynamic_cast"
            | "else"
            | "enum"
            | "explicit"
            | "export"
            | "extern"
            | "false"
            | "float"
            | "for"
            | "friend"
            | "goto"
            | "if"
            | "inline"
            | "int"
            | "long"
            | "mutable"
            | "namespace"
            | "new"
            | "noexcept"
            | "not"
            | "not_eq"
            | "nullptr"
            | "operator"
            | "or"
            | "or_eq"
            | "private"
            | "protected"
            | "public"
            | "register"
            | "reinterpret_cast"
            | "requires"
            | "return"
            | "short"
            | "signed"
            | "sizeof"
            | "static"
            | "static_assert"
            | "static_cast"
            | "struct"
            | "switch"
            | "template"
            | "this"
            | "thread_local"
            | "throw"
            | "true"
            | "try"
            | "typedef"
            | "typeid"
            | "typename"
            | "union"
            | "unsigned"
            | "using"
            | "virtual"
            | "void"
            | "volatile"
            | "wchar_t"
            | "while"
            | "xor"
            | "xor_eq"
            | "NULL"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attribute, ConstructorParameter};

    fn animal() -> Interface {
        Interface::new("Animal")
            .with_parameter(ConstructorParameter::optional("name", "DOMString"))
            .with_parameter(ConstructorParameter::optional("age", "long"))
            .with_attribute(Attribute::readonly("name", "DOMString"))
            .with_attribute(Attribute::writable("age", "long"))
    }

    #[test]
    fn test_plan_animal() {
        let plan = plan_interface(&animal()).unwrap();
        assert_eq!(plan.name, "Animal");
        assert_eq!(plan.attributes.len(), 2);
        assert_eq!(plan.attributes[1].slot, 1);
        assert_eq!(plan.constructor.total(), 2);
        assert_eq!(plan.constructor.required(), 0);
    }

    #[test]
    fn test_duplicate_interfaces() {
        let err = plan_all(&[animal(), animal()]).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateSymbol { ref symbol, .. } if symbol == "Animal"));
    }

    #[test]
    fn test_duplicate_attribute() {
        let iface = Interface::new("Point")
            .with_attribute(Attribute::writable("x", "double"))
            .with_attribute(Attribute::readonly("x", "double"));
        let err = plan_interface(&iface).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateSymbol { ref symbol, .. } if symbol == "Point.x"));
    }

    #[test]
    fn test_reserved_names() {
        assert!(is_reserved("class"));
        assert!(is_reserved("info"));
        assert!(is_reserved("_Hidden"));
        assert!(is_reserved("a__b"));
        assert!(is_reserved("NAN_METHOD"));
        assert!(!is_reserved("name"));
        assert!(!is_reserved("_private"));

        let iface = Interface::new("Thing").with_attribute(Attribute::writable("delete", "boolean"));
        let err = plan_interface(&iface).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateSymbol { ref symbol, .. } if symbol == "delete"));
    }

    #[test]
    fn test_storage_type_names_are_reserved() {
        for name in ["int8_t", "uint8_t", "int32_t", "uint64_t", "intptr_t", "uint_least16_t", "size_t"] {
            assert!(is_reserved(name), "{} should be reserved", name);
        }
        assert!(!is_reserved("int32"));
        assert!(!is_reserved("uint_t"));

        let iface = Interface::new("Pet")
            .with_parameter(ConstructorParameter::optional("int32_t", "long"))
            .with_parameter(ConstructorParameter::optional("age", "long"))
            .with_attribute(Attribute::writable("int32_t", "long"))
            .with_attribute(Attribute::writable("age", "long"));
        let err = plan_all(&[iface, Interface::new("uint8_t")]).unwrap_err();
        let symbols: Vec<_> = err
            .errors()
            .iter()
            .filter_map(|e| match e {
                CompileError::DuplicateSymbol { symbol, .. } => Some(symbol.as_str()),
                _ => None,
            })
            .collect();
        assert!(symbols.contains(&"int32_t"), "got {:?}", symbols);
        assert!(symbols.contains(&"uint8_t"), "got {:?}", symbols);
    }

    #[test]
    fn test_invalid_identifiers() {
        let err = plan_interface(&Interface::new("my-widget")).unwrap_err();
        assert!(matches!(err, CompileError::InvalidIdentifier { ref name, .. } if name == "my-widget"));

        let iface = Interface::new("Widget").with_attribute(Attribute::writable("1st", "long"));
        assert!(matches!(
            plan_interface(&iface).unwrap_err(),
            CompileError::InvalidIdentifier { .. }
        ));
    }

    #[test]
    fn test_member_named_like_interface() {
        let iface = Interface::new("Size").with_attribute(Attribute::writable("Size", "long"));
        assert!(matches!(
            plan_interface(&iface).unwrap_err(),
            CompileError::DuplicateSymbol { .. }
        ));
    }

    #[test]
    fn test_collects_all_errors() {
        let iface = Interface::new("Widget")
            .with_attribute(Attribute::writable("a", "any"))
            .with_attribute(Attribute::writable("b", "object"));
        let err = plan_interface(&iface).unwrap_err();
        assert_eq!(err.errors().len(), 2);
        assert!(err.to_string().contains("Widget.a"));
        assert!(err.to_string().contains("Widget.b"));
    }
}
