//! The interface model consumed by the generators.
//!
//! These types are what the IDL front end hands over: fully resolved
//! declarations, in declaration order. They deserialize from the JSON
//! document accepted by the command line tool:
//!
//! ```json
//! { "interfaces": [ {
//!     "name": "Animal",
//!     "constructor": [ { "name": "name", "type": "DOMString", "optional": true } ],
//!     "attributes": [ { "name": "name", "type": "DOMString", "readonly": true } ]
//! } ] }
//! ```

use serde::{Deserialize, Serialize};

/// A set of interface declarations, usually one IDL file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Definitions {
    #[serde(default)]
    pub interfaces: Vec<Interface>,
}

impl Definitions {
    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }
}

/// One interface: a constructor signature and a list of attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interface {
    pub name: String,
    #[serde(default, rename = "constructor", skip_serializing_if = "Vec::is_empty")]
    pub constructor: Vec<ConstructorParameter>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl Interface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constructor: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_parameter(mut self, parameter: ConstructorParameter) -> Self {
        self.constructor.push(parameter);
        self
    }
}

/// Whether an attribute can be assigned from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mutability {
    Readonly,
    #[default]
    Writable,
}

impl Mutability {
    pub fn is_writable(&self) -> bool {
        matches!(self, Mutability::Writable)
    }
}

/// A typed attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, rename = "readonly", with = "readonly_flag")]
    pub mutability: Mutability,
}

impl Attribute {
    pub fn readonly(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            mutability: Mutability::Readonly,
        }
    }

    pub fn writable(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            mutability: Mutability::Writable,
        }
    }
}

/// A literal default for an optional constructor parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Boolean(bool),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    String(String),
}

/// One positional constructor parameter.
///
/// A parameter is optional when it is marked `optional` or carries an
/// explicit `default`; an optional parameter without an explicit default
/// takes the zero value of its type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructorParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
}

impl ConstructorParameter {
    pub fn required(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            optional: false,
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            optional: true,
            ..Self::required(name, ty)
        }
    }

    pub fn with_default(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn has_default(&self) -> bool {
        self.optional || self.default.is_some()
    }
}

mod readonly_flag {
    use super::Mutability;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(m: &Mutability, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(!m.is_writable())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Mutability, D::Error> {
        let readonly = bool::deserialize(deserializer)?;
        Ok(if readonly {
            Mutability::Readonly
        } else {
            Mutability::Writable
        })
    }
}
