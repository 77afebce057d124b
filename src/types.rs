//! IDL primitive types and their native representations.
//!
//! `map_type` is the single lookup from an IDL type tag to a [`TypeMapping`]:
//! the native storage kind, the C++ storage type used by the generated addon,
//! the default value, and the encode/decode pair used to marshal values
//! between the host and native storage.

use std::fmt;

use crate::coercion::{convert_to_integer, CoercionPolicy, Converted, DecodeError, IntegerRange};
use crate::error::CompileError;
use crate::model::DefaultValue;
use crate::value::{is_js_blank, string_to_number, Value};

/// A recognized IDL primitive type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdlType {
    DomString,
    UsvString,
    ByteString,
    Byte,
    Octet,
    Short,
    UnsignedShort,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Float,
    UnrestrictedFloat,
    Double,
    UnrestrictedDouble,
    Boolean,
}

impl IdlType {
    pub const ALL: [IdlType; 16] = [
        IdlType::DomString,
        IdlType::UsvString,
        IdlType::ByteString,
        IdlType::Byte,
        IdlType::Octet,
        IdlType::Short,
        IdlType::UnsignedShort,
        IdlType::Long,
        IdlType::UnsignedLong,
        IdlType::LongLong,
        IdlType::UnsignedLongLong,
        IdlType::Float,
        IdlType::UnrestrictedFloat,
        IdlType::Double,
        IdlType::UnrestrictedDouble,
        IdlType::Boolean,
    ];

    /// Parse a type tag. Runs of whitespace inside multi-word tags such as
    /// `unsigned long long` are normalized.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let normalized = tag.split_whitespace().collect::<Vec<_>>().join(" ");
        Self::ALL.into_iter().find(|ty| ty.tag() == normalized)
    }

    pub fn tag(&self) -> &'static str {
        match self {
            IdlType::DomString => "DOMString",
            IdlType::UsvString => "USVString",
            IdlType::ByteString => "ByteString",
            IdlType::Byte => "byte",
            IdlType::Octet => "octet",
            IdlType::Short => "short",
            IdlType::UnsignedShort => "unsigned short",
            IdlType::Long => "long",
            IdlType::UnsignedLong => "unsigned long",
            IdlType::LongLong => "long long",
            IdlType::UnsignedLongLong => "unsigned long long",
            IdlType::Float => "float",
            IdlType::UnrestrictedFloat => "unrestricted float",
            IdlType::Double => "double",
            IdlType::UnrestrictedDouble => "unrestricted double",
            IdlType::Boolean => "boolean",
        }
    }

    /// CamelCase form used to name generated helpers (`DecodeUnsignedLong`).
    pub fn helper_suffix(&self) -> String {
        match self {
            IdlType::DomString | IdlType::UsvString | IdlType::ByteString => {
                self.tag().to_string()
            }
            _ => self
                .tag()
                .split(' ')
                .map(|word| {
                    let mut chars = word.chars();
                    match chars.next() {
                        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                        None => String::new(),
                    }
                })
                .collect(),
        }
    }

    pub fn native_kind(&self) -> NativeKind {
        match self {
            IdlType::DomString | IdlType::UsvString | IdlType::ByteString => NativeKind::Text,
            IdlType::Byte => NativeKind::Integer(IntegerRange::signed(8)),
            IdlType::Octet => NativeKind::Integer(IntegerRange::unsigned(8)),
            IdlType::Short => NativeKind::Integer(IntegerRange::signed(16)),
            IdlType::UnsignedShort => NativeKind::Integer(IntegerRange::unsigned(16)),
            IdlType::Long => NativeKind::Integer(IntegerRange::signed(32)),
            IdlType::UnsignedLong => NativeKind::Integer(IntegerRange::unsigned(32)),
            IdlType::LongLong => NativeKind::Integer(IntegerRange::signed(64)),
            IdlType::UnsignedLongLong => NativeKind::Integer(IntegerRange::unsigned(64)),
            IdlType::Float => NativeKind::Float {
                single: true,
                unrestricted: false,
            },
            IdlType::UnrestrictedFloat => NativeKind::Float {
                single: true,
                unrestricted: true,
            },
            IdlType::Double => NativeKind::Float {
                single: false,
                unrestricted: false,
            },
            IdlType::UnrestrictedDouble => NativeKind::Float {
                single: false,
                unrestricted: true,
            },
            IdlType::Boolean => NativeKind::Boolean,
        }
    }
}

impl fmt::Display for IdlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Native storage category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeKind {
    Text,
    Integer(IntegerRange),
    Float { single: bool, unrestricted: bool },
    Boolean,
}

impl NativeKind {
    pub fn is_numeric(&self) -> bool {
        matches!(self, NativeKind::Integer(_) | NativeKind::Float { .. })
    }
}

/// A value in native storage.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Text(String),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Bool(bool),
}

impl From<Converted> for NativeValue {
    fn from(c: Converted) -> Self {
        match c {
            Converted::Signed(v) => NativeValue::Integer(v),
            Converted::Unsigned(v) => NativeValue::Unsigned(v),
        }
    }
}

/// Everything the generators need to know about one IDL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeMapping {
    pub idl: IdlType,
    pub native: NativeKind,
}

/// Look up the mapping for a type tag.
pub fn map_type(tag: &str) -> Result<TypeMapping, CompileError> {
    IdlType::from_tag(tag)
        .map(TypeMapping::of)
        .ok_or_else(|| CompileError::unsupported_type(tag))
}

impl TypeMapping {
    pub fn of(idl: IdlType) -> Self {
        Self {
            idl,
            native: idl.native_kind(),
        }
    }

    /// C++ type holding the attribute in the generated class.
    pub fn cpp_storage(&self) -> &'static str {
        match self.native {
            NativeKind::Text => "std::string",
            NativeKind::Boolean => "bool",
            NativeKind::Float { single: true, .. } => "float",
            NativeKind::Float { single: false, .. } => "double",
            NativeKind::Integer(range) => match (range.signed, range.bits) {
                (true, 8) => "int8_t",
                (false, 8) => "uint8_t",
                (true, 16) => "int16_t",
                (false, 16) => "uint16_t",
                (true, 32) => "int32_t",
                (false, 32) => "uint32_t",
                (true, _) => "int64_t",
                (false, _) => "uint64_t",
            },
        }
    }

    /// TypeScript type exposed to host-side consumers.
    pub fn ts_type(&self) -> &'static str {
        match self.native {
            NativeKind::Text => "string",
            NativeKind::Boolean => "boolean",
            NativeKind::Integer(_) | NativeKind::Float { .. } => "number",
        }
    }

    /// Name of the generated C++ decode helper for this type.
    pub fn decode_helper(&self) -> String {
        format!("Decode{}", self.idl.helper_suffix())
    }

    /// Zero value stored when nothing else initializes the attribute.
    pub fn default_value(&self) -> NativeValue {
        match self.native {
            NativeKind::Text => NativeValue::Text(String::new()),
            NativeKind::Integer(range) if range.signed => NativeValue::Integer(0),
            NativeKind::Integer(_) => NativeValue::Unsigned(0),
            NativeKind::Float { .. } => NativeValue::Float(0.0),
            NativeKind::Boolean => NativeValue::Bool(false),
        }
    }

    /// Whether `value` is a well-formed native value of this type.
    pub fn holds(&self, value: &NativeValue) -> bool {
        match (self.native, value) {
            (NativeKind::Text, NativeValue::Text(_)) => true,
            (NativeKind::Boolean, NativeValue::Bool(_)) => true,
            (NativeKind::Integer(range), NativeValue::Integer(v)) => {
                range.signed && range.contains_signed(*v)
            }
            (NativeKind::Integer(range), NativeValue::Unsigned(v)) => {
                !range.signed && range.contains_unsigned(*v)
            }
            (
                NativeKind::Float {
                    single,
                    unrestricted,
                },
                NativeValue::Float(v),
            ) => {
                (unrestricted || v.is_finite())
                    && (!single || v.is_nan() || f64::from(*v as f32) == *v)
            }
            _ => false,
        }
    }

    /// Convert a declared default literal into native storage, or `None`
    /// when the literal does not fit the type.
    pub fn native_default(&self, literal: &DefaultValue) -> Option<NativeValue> {
        let value = match (self.native, literal) {
            (NativeKind::Text, DefaultValue::String(s)) => NativeValue::Text(s.clone()),
            (NativeKind::Boolean, DefaultValue::Boolean(b)) => NativeValue::Bool(*b),
            (NativeKind::Integer(range), DefaultValue::Integer(v)) => {
                if range.signed {
                    NativeValue::Integer(*v)
                } else {
                    NativeValue::Unsigned(u64::try_from(*v).ok()?)
                }
            }
            (NativeKind::Integer(range), DefaultValue::Unsigned(v)) => {
                if range.signed {
                    NativeValue::Integer(i64::try_from(*v).ok()?)
                } else {
                    NativeValue::Unsigned(*v)
                }
            }
            (NativeKind::Float { single, .. }, DefaultValue::Integer(v)) => {
                NativeValue::Float(round_float(*v as f64, single))
            }
            (NativeKind::Float { single, .. }, DefaultValue::Unsigned(v)) => {
                NativeValue::Float(round_float(*v as f64, single))
            }
            (NativeKind::Float { single, .. }, DefaultValue::Float(v)) => {
                NativeValue::Float(round_float(*v, single))
            }
            _ => return None,
        };
        self.holds(&value).then_some(value)
    }

    /// Native value to host value. Total for values this type holds.
    pub fn encode(&self, value: &NativeValue) -> Value {
        match value {
            NativeValue::Text(s) => Value::String(s.clone()),
            NativeValue::Integer(v) => Value::Number(*v as f64),
            NativeValue::Unsigned(v) => Value::Number(*v as f64),
            NativeValue::Float(v) => Value::Number(*v),
            NativeValue::Bool(b) => Value::Boolean(*b),
        }
    }

    /// Host value to native value under `policy`.
    pub fn decode(&self, value: &Value, policy: &CoercionPolicy) -> Result<NativeValue, DecodeError> {
        match self.native {
            NativeKind::Text => Ok(NativeValue::Text(value.to_js_string())),
            NativeKind::Boolean => Ok(NativeValue::Bool(value.to_boolean())),
            NativeKind::Integer(range) => {
                let number = to_numeric(value, policy)?;
                convert_to_integer(number, range, policy).map(NativeValue::from)
            }
            NativeKind::Float {
                single,
                unrestricted,
            } => {
                let number = to_numeric(value, policy)?;
                let rounded = round_float(number, single);
                if !unrestricted && (!number.is_finite() || !rounded.is_finite()) {
                    return Err(DecodeError::NonFinite);
                }
                Ok(NativeValue::Float(rounded))
            }
        }
    }
}

fn round_float(v: f64, single: bool) -> f64 {
    if single {
        f64::from(v as f32)
    } else {
        v
    }
}

/// Numeric view of a host value: numbers always, strings only when the
/// policy allows it.
fn to_numeric(value: &Value, policy: &CoercionPolicy) -> Result<f64, DecodeError> {
    match value {
        Value::Number(n) => Ok(*n),
        Value::String(s) if policy.numeric_strings => {
            if is_js_blank(s) && !policy.empty_string_as_zero {
                return Err(DecodeError::NonNumericString(s.clone()));
            }
            string_to_number(s).ok_or_else(|| DecodeError::NonNumericString(s.clone()))
        }
        other => Err(DecodeError::NotNumeric(other.kind_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coercion::IntegerOverflow;

    fn mapping(tag: &str) -> TypeMapping {
        map_type(tag).unwrap()
    }

    #[test]
    fn test_map_known_tags() {
        assert_eq!(mapping("DOMString").cpp_storage(), "std::string");
        assert_eq!(mapping("long").cpp_storage(), "int32_t");
        assert_eq!(mapping("unsigned   long long").cpp_storage(), "uint64_t");
        assert_eq!(mapping("double").ts_type(), "number");
        assert_eq!(mapping("boolean").default_value(), NativeValue::Bool(false));
    }

    #[test]
    fn test_map_unknown_tag_fails() {
        let err = map_type("Promise<void>").unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedType { ref tag, .. } if tag == "Promise<void>"));
        assert!(map_type("Long").is_err());
    }

    #[test]
    fn test_helper_names() {
        assert_eq!(mapping("DOMString").decode_helper(), "DecodeDOMString");
        assert_eq!(mapping("unsigned long long").decode_helper(), "DecodeUnsignedLongLong");
        assert_eq!(mapping("unrestricted double").decode_helper(), "DecodeUnrestrictedDouble");
    }

    #[test]
    fn test_decode_string_stringifies_everything() {
        let policy = CoercionPolicy::default();
        let ty = mapping("DOMString");
        assert_eq!(ty.decode(&Value::Number(5.0), &policy), Ok(NativeValue::Text("5".into())));
        assert_eq!(ty.decode(&Value::Null, &policy), Ok(NativeValue::Text("null".into())));
        assert_eq!(ty.decode(&Value::Boolean(true), &policy), Ok(NativeValue::Text("true".into())));
        assert_eq!(
            ty.decode(&Value::Number(2f64.powi(60)), &policy),
            Ok(NativeValue::Text("1152921504606847000".into()))
        );
    }

    #[test]
    fn test_decode_numeric_rejects_non_numbers() {
        let policy = CoercionPolicy::default();
        let ty = mapping("long");
        assert_eq!(
            ty.decode(&Value::string("10"), &policy),
            Err(DecodeError::NotNumeric("string"))
        );
        assert_eq!(ty.decode(&Value::Undefined, &policy), Err(DecodeError::NotNumeric("undefined")));
        assert_eq!(ty.decode(&Value::Boolean(true), &policy), Err(DecodeError::NotNumeric("boolean")));
        assert_eq!(ty.decode(&Value::Number(10.0), &policy), Ok(NativeValue::Integer(10)));
    }

    #[test]
    fn test_decode_numeric_strings_when_enabled() {
        let policy = CoercionPolicy::default().with_numeric_strings();
        let ty = mapping("long");
        assert_eq!(ty.decode(&Value::string(" 42 "), &policy), Ok(NativeValue::Integer(42)));
        assert_eq!(
            ty.decode(&Value::string(""), &policy),
            Err(DecodeError::NonNumericString(String::new()))
        );

        let lenient = CoercionPolicy {
            empty_string_as_zero: true,
            ..policy
        };
        assert_eq!(ty.decode(&Value::string(""), &lenient), Ok(NativeValue::Integer(0)));
        assert_eq!(ty.decode(&Value::string("\u{00A0}"), &lenient), Ok(NativeValue::Integer(0)));
    }

    #[test]
    fn test_blank_strings_use_host_whitespace() {
        let policy = CoercionPolicy::default().with_numeric_strings();
        let ty = mapping("long");
        assert_eq!(
            ty.decode(&Value::string("\u{00A0}\u{3000}"), &policy),
            Err(DecodeError::NonNumericString("\u{00A0}\u{3000}".into()))
        );
        // NEL is Unicode whitespace but not host whitespace.
        assert_eq!(
            ty.decode(&Value::string("\u{0085}"), &policy),
            Err(DecodeError::NonNumericString("\u{0085}".into()))
        );
        assert_eq!(ty.decode(&Value::string("\u{2003}8\u{00A0}"), &policy), Ok(NativeValue::Integer(8)));
    }

    #[test]
    fn test_decode_restricted_float_rejects_non_finite() {
        let policy = CoercionPolicy::default();
        assert_eq!(
            mapping("double").decode(&Value::Number(f64::NAN), &policy),
            Err(DecodeError::NonFinite)
        );
        assert_eq!(
            mapping("float").decode(&Value::Number(1e300), &policy),
            Err(DecodeError::NonFinite)
        );
        let decoded = mapping("unrestricted double")
            .decode(&Value::Number(f64::INFINITY), &policy)
            .unwrap();
        assert_eq!(decoded, NativeValue::Float(f64::INFINITY));
    }

    #[test]
    fn test_decode_float_rounds_to_single_precision() {
        let policy = CoercionPolicy::default();
        let decoded = mapping("float").decode(&Value::Number(0.1), &policy).unwrap();
        assert_eq!(decoded, NativeValue::Float(f64::from(0.1f32)));
    }

    #[test]
    fn test_decode_boolean_is_truthiness() {
        let policy = CoercionPolicy::default();
        let ty = mapping("boolean");
        assert_eq!(ty.decode(&Value::string("no"), &policy), Ok(NativeValue::Bool(true)));
        assert_eq!(ty.decode(&Value::Number(0.0), &policy), Ok(NativeValue::Bool(false)));
    }

    #[test]
    fn test_round_trip_every_type() {
        let policy = CoercionPolicy::strict();
        let samples: Vec<(&str, Vec<NativeValue>)> = vec![
            ("DOMString", vec![NativeValue::Text(String::new()), NativeValue::Text("Dög \"x\"".into())]),
            ("byte", vec![NativeValue::Integer(-128), NativeValue::Integer(127)]),
            ("octet", vec![NativeValue::Unsigned(0), NativeValue::Unsigned(255)]),
            ("short", vec![NativeValue::Integer(-32768), NativeValue::Integer(32767)]),
            ("unsigned short", vec![NativeValue::Unsigned(65535)]),
            ("long", vec![NativeValue::Integer(i64::from(i32::MIN)), NativeValue::Integer(5)]),
            ("unsigned long", vec![NativeValue::Unsigned(u64::from(u32::MAX))]),
            ("long long", vec![NativeValue::Integer(-9_007_199_254_740_991)]),
            ("unsigned long long", vec![NativeValue::Unsigned(9_007_199_254_740_991)]),
            ("float", vec![NativeValue::Float(1.5), NativeValue::Float(f64::from(0.1f32))]),
            ("double", vec![NativeValue::Float(-0.1), NativeValue::Float(1e300)]),
            ("boolean", vec![NativeValue::Bool(true), NativeValue::Bool(false)]),
        ];

        for (tag, values) in samples {
            let ty = mapping(tag);
            for v in values {
                assert!(ty.holds(&v), "{tag} should hold {v:?}");
                let decoded = ty.decode(&ty.encode(&v), &policy).unwrap();
                assert_eq!(decoded, v, "round trip through {tag}");
            }
        }
    }

    #[test]
    fn test_native_default_checks_range() {
        let octet = mapping("octet");
        assert_eq!(octet.native_default(&DefaultValue::Integer(7)), Some(NativeValue::Unsigned(7)));
        assert_eq!(octet.native_default(&DefaultValue::Integer(-1)), None);
        assert_eq!(octet.native_default(&DefaultValue::Integer(256)), None);
        assert_eq!(mapping("long").native_default(&DefaultValue::String("0".into())), None);
        assert_eq!(
            mapping("double").native_default(&DefaultValue::Integer(3)),
            Some(NativeValue::Float(3.0))
        );
    }

    #[test]
    fn test_clamp_policy_applies_to_decode() {
        let policy = CoercionPolicy::default().with_overflow(IntegerOverflow::Clamp);
        assert_eq!(
            mapping("byte").decode(&Value::Number(1000.0), &policy),
            Ok(NativeValue::Integer(127))
        );
    }
}
