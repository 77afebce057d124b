//! C++ rendering of the type mapper: decode helpers, encode expressions and
//! literals for native storage.
//!
//! The helpers generated here implement, inside V8, the same conversions as
//! [`TypeMapping::decode`] and [`TypeMapping::encode`] under the same
//! [`CoercionPolicy`].

use indexmap::IndexSet;

use crate::coercion::{CoercionPolicy, IntegerNan, IntegerOverflow, IntegerRange};
use crate::types::{NativeKind, NativeValue, TypeMapping};
use crate::value::JS_WHITESPACE;
use crate::writer::SourceWriter;

/// Namespace holding the generated helpers.
pub const HELPER_NAMESPACE: &str = "widl";

/// Expression converting native storage `expr` into a `v8::Local<v8::Value>`.
pub fn encode_expr(mapping: &TypeMapping, expr: &str) -> String {
    match mapping.native {
        NativeKind::Text => format!("Nan::New({}).ToLocalChecked()", expr),
        NativeKind::Boolean => format!("Nan::New<v8::Boolean>({})", expr),
        NativeKind::Integer(_) | NativeKind::Float { .. } => {
            format!("Nan::New<v8::Number>(static_cast<double>({}))", expr)
        }
    }
}

/// Call expression decoding `value` into `*out`, evaluating to `bool`.
pub fn decode_call(mapping: &TypeMapping, value: &str, out: &str) -> String {
    format!(
        "{}::{}({}, &{})",
        HELPER_NAMESPACE,
        mapping.decode_helper(),
        value,
        out
    )
}

/// C++ literal for a native value of the given type.
pub fn cpp_literal(mapping: &TypeMapping, value: &NativeValue) -> String {
    let wide = matches!(mapping.native, NativeKind::Integer(IntegerRange { bits: 64, .. }));
    match value {
        NativeValue::Text(s) => cpp_string_literal(s),
        NativeValue::Bool(b) => b.to_string(),
        NativeValue::Integer(i64::MIN) => "(-9223372036854775807LL - 1)".to_string(),
        NativeValue::Integer(v) if wide => format!("{}LL", v),
        NativeValue::Integer(v) => v.to_string(),
        NativeValue::Unsigned(v) if wide => format!("{}ULL", v),
        NativeValue::Unsigned(v) => format!("{}u", v),
        NativeValue::Float(v) => float_literal(mapping, *v),
    }
}

fn float_literal(mapping: &TypeMapping, v: f64) -> String {
    let storage = mapping.cpp_storage();
    if v.is_nan() {
        return format!("std::numeric_limits<{}>::quiet_NaN()", storage);
    }
    if v.is_infinite() {
        let sign = if v < 0.0 { "-" } else { "" };
        return format!("{}std::numeric_limits<{}>::infinity()", sign, storage);
    }
    let digits = format!("{:?}", v);
    if storage == "float" {
        format!("{}f", digits)
    } else {
        digits
    }
}

/// Quote `s` as a C++ narrow string literal holding its UTF-8 bytes.
pub fn cpp_string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for byte in s.bytes() {
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'"' => out.push_str("\\\""),
            // `??x` would form a trigraph in older dialects.
            b'?' => out.push_str("\\?"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(byte as char),
            other => out.push_str(&format!("\\{:03o}", other)),
        }
    }
    out.push('"');
    out
}

/// Render the `widl` helper namespace for the given types, in first-use order.
pub fn render_helpers(types: &[TypeMapping], policy: &CoercionPolicy, w: &mut SourceWriter) {
    let unique: IndexSet<TypeMapping> = types.iter().copied().collect();
    if unique.is_empty() {
        return;
    }

    let any_numeric = unique.iter().any(|t| t.native.is_numeric());
    let any_wrapping = policy.integer_overflow == IntegerOverflow::Wrap
        && unique
            .iter()
            .any(|t| matches!(t.native, NativeKind::Integer(_)));

    w.line(format!("namespace {} {{", HELPER_NAMESPACE));
    w.blank();
    if any_numeric && policy.numeric_strings {
        render_is_blank(w);
        w.blank();
    }
    if any_numeric {
        render_to_numeric(policy, w);
        w.blank();
    }
    if any_wrapping {
        render_wrap(w);
        w.blank();
    }
    for mapping in &unique {
        render_decode(mapping, policy, w);
        w.blank();
    }
    w.line(format!("}}  // namespace {}", HELPER_NAMESPACE));
}

/// `IsBlank` decodes UTF-8 and accepts only the whitespace code points
/// `StringToNumber` trims, matching the host-side blank check.
fn render_is_blank(w: &mut SourceWriter) {
    w.block("inline bool IsBlank(const std::string& text)", "", |w| {
        w.line("size_t i = 0;");
        w.block("while (i < text.size())", "", |w| {
            w.line("const unsigned char lead = static_cast<unsigned char>(text[i]);");
            w.line("uint32_t cp;");
            w.line("size_t len;");
            w.block("if (lead < 0x80)", "", |w| {
                w.line("cp = lead;");
                w.line("len = 1;");
            });
            w.block("else if ((lead >> 5) == 0x6)", "", |w| {
                w.line("cp = lead & 0x1F;");
                w.line("len = 2;");
            });
            w.block("else if ((lead >> 4) == 0xE)", "", |w| {
                w.line("cp = lead & 0x0F;");
                w.line("len = 3;");
            });
            w.block("else", "", |w| w.line("return false;"));
            w.block("if (i + len > text.size())", "", |w| w.line("return false;"));
            w.block("for (size_t j = 1; j < len; ++j)", "", |w| {
                w.line("cp = (cp << 6) | (static_cast<unsigned char>(text[i + j]) & 0x3F);");
            });
            w.block("switch (cp)", "", |w| {
                for ch in JS_WHITESPACE {
                    w.line(format!("case 0x{:04X}:", u32::from(*ch)));
                }
                w.line("  break;");
                w.line("default:");
                w.line("  return false;");
            });
            w.line("i += len;");
        });
        w.line("return true;");
    });
}

fn render_to_numeric(policy: &CoercionPolicy, w: &mut SourceWriter) {
    w.block(
        "inline bool ToNumeric(v8::Local<v8::Value> value, double* out)",
        "",
        |w| {
            w.block("if (value->IsNumber())", "", |w| {
                w.line("*out = Nan::To<double>(value).FromJust();");
                w.line("return true;");
            });
            if policy.numeric_strings {
                w.block("if (value->IsString())", "", |w| {
                    w.line("Nan::Utf8String utf8(value);");
                    w.line("const std::string text(*utf8, utf8.length());");
                    w.block("if (IsBlank(text))", "", |w| {
                        if policy.empty_string_as_zero {
                            w.line("*out = 0;");
                            w.line("return true;");
                        } else {
                            w.line("return false;");
                        }
                    });
                    w.line("*out = Nan::To<double>(value).FromJust();");
                    w.line("return !std::isnan(*out);");
                });
            }
            w.line("return false;");
        },
    );
}

fn render_wrap(w: &mut SourceWriter) {
    w.block("inline uint64_t WrapToUint64(double number)", "", |w| {
        w.line("const double reduced = std::fmod(std::trunc(number), 18446744073709551616.0);");
        w.line("const uint64_t magnitude = static_cast<uint64_t>(std::fabs(reduced));");
        w.line("return reduced < 0 ? 0 - magnitude : magnitude;");
    });
}

fn render_decode(mapping: &TypeMapping, policy: &CoercionPolicy, w: &mut SourceWriter) {
    let signature = format!(
        "inline bool {}(v8::Local<v8::Value> value, {}* out)",
        mapping.decode_helper(),
        mapping.cpp_storage()
    );
    w.block(&signature, "", |w| match mapping.native {
        NativeKind::Text => {
            w.line("Nan::MaybeLocal<v8::String> text = Nan::To<v8::String>(value);");
            w.block("if (text.IsEmpty())", "", |w| w.line("return false;"));
            w.line("Nan::Utf8String utf8(text.ToLocalChecked());");
            w.line("out->assign(*utf8, utf8.length());");
            w.line("return true;");
        }
        NativeKind::Boolean => {
            w.line("*out = Nan::To<bool>(value).FromJust();");
            w.line("return true;");
        }
        NativeKind::Integer(range) => render_integer_body(mapping, range, policy, w),
        NativeKind::Float {
            single,
            unrestricted,
        } => {
            render_numeric_prelude(w);
            if !unrestricted {
                w.block("if (!std::isfinite(number))", "", |w| w.line("return false;"));
            }
            if single {
                w.line("const float narrowed = static_cast<float>(number);");
                if !unrestricted {
                    w.block("if (!std::isfinite(narrowed))", "", |w| w.line("return false;"));
                }
                w.line("*out = narrowed;");
            } else {
                w.line("*out = number;");
            }
            w.line("return true;");
        }
    });
}

fn render_numeric_prelude(w: &mut SourceWriter) {
    w.line("double number;");
    w.block("if (!ToNumeric(value, &number))", "", |w| w.line("return false;"));
}

fn render_non_finite(policy: &CoercionPolicy, w: &mut SourceWriter) {
    match policy.integer_nan {
        IntegerNan::Zero => {
            w.line("*out = 0;");
            w.line("return true;");
        }
        IntegerNan::Reject => w.line("return false;"),
    }
}

fn render_integer_body(
    mapping: &TypeMapping,
    range: IntegerRange,
    policy: &CoercionPolicy,
    w: &mut SourceWriter,
) {
    let storage = mapping.cpp_storage();
    let lower = format!("{:.1}", range.lower());
    let upper = format!("{:.1}", range.upper());

    render_numeric_prelude(w);
    w.block("if (std::isnan(number))", "", |w| render_non_finite(policy, w));

    match policy.integer_overflow {
        IntegerOverflow::Wrap => {
            w.block("if (std::isinf(number))", "", |w| render_non_finite(policy, w));
            w.line(format!(
                "*out = static_cast<{}>(WrapToUint64(number));",
                storage
            ));
        }
        IntegerOverflow::Clamp => {
            w.line(format!(
                "const double clamped = std::min(std::max(number, {}), {});",
                lower, upper
            ));
            w.line(format!(
                "*out = static_cast<{}>(std::nearbyint(clamped));",
                storage
            ));
        }
        IntegerOverflow::Reject => {
            w.block("if (std::isinf(number))", "", |w| w.line("return false;"));
            w.line("const double truncated = std::trunc(number);");
            w.block(
                &format!("if (truncated < {} || truncated > {})", lower, upper),
                "",
                |w| w.line("return false;"),
            );
            w.line(format!("*out = static_cast<{}>(truncated);", storage));
        }
    }
    w.line("return true;");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::map_type;

    fn render(tags: &[&str], policy: &CoercionPolicy) -> String {
        let types: Vec<TypeMapping> = tags.iter().map(|t| map_type(t).unwrap()).collect();
        let mut w = SourceWriter::default();
        render_helpers(&types, policy, &mut w);
        w.finish()
    }

    #[test]
    fn test_string_literal_escapes() {
        assert_eq!(cpp_string_literal(""), "\"\"");
        assert_eq!(cpp_string_literal("a\"b\\c"), "\"a\\\"b\\\\c\"");
        assert_eq!(cpp_string_literal("??="), "\"\\?\\?=\"");
        assert_eq!(cpp_string_literal("é"), "\"\\303\\251\"");
        assert_eq!(cpp_string_literal("line\n"), "\"line\\n\"");
    }

    #[test]
    fn test_literals_by_type() {
        let long = map_type("long").unwrap();
        let ull = map_type("unsigned long long").unwrap();
        let float = map_type("float").unwrap();
        let double = map_type("unrestricted double").unwrap();
        assert_eq!(cpp_literal(&long, &NativeValue::Integer(-5)), "-5");
        assert_eq!(cpp_literal(&ull, &NativeValue::Unsigned(7)), "7ULL");
        assert_eq!(cpp_literal(&float, &NativeValue::Float(0.0)), "0.0f");
        assert_eq!(
            cpp_literal(&double, &NativeValue::Float(f64::NEG_INFINITY)),
            "-std::numeric_limits<double>::infinity()"
        );
    }

    #[test]
    fn test_encode_expressions() {
        let s = map_type("DOMString").unwrap();
        let b = map_type("boolean").unwrap();
        let l = map_type("long").unwrap();
        assert_eq!(encode_expr(&s, "self->name_"), "Nan::New(self->name_).ToLocalChecked()");
        assert_eq!(encode_expr(&b, "self->ok_"), "Nan::New<v8::Boolean>(self->ok_)");
        assert_eq!(
            encode_expr(&l, "self->age_"),
            "Nan::New<v8::Number>(static_cast<double>(self->age_))"
        );
    }

    #[test]
    fn test_helpers_emitted_once_in_first_use_order() {
        let out = render(&["long", "DOMString", "long"], &CoercionPolicy::default());
        assert_eq!(out.matches("inline bool DecodeLong(").count(), 1);
        let long_at = out.find("DecodeLong(").unwrap();
        let string_at = out.find("DecodeDOMString(").unwrap();
        assert!(long_at < string_at);
        assert!(out.contains("inline bool ToNumeric("));
        assert!(out.contains("WrapToUint64(number)"));
        assert!(out.ends_with("}  // namespace widl\n"));
    }

    #[test]
    fn test_blank_check_covers_unicode_whitespace() {
        let out = render(&["long"], &CoercionPolicy::default().with_numeric_strings());
        assert!(out.contains("inline bool IsBlank(const std::string& text) {"));
        assert!(out.contains("if (IsBlank(text)) {"));
        assert!(out.contains("case 0x00A0:"));
        assert!(out.contains("case 0x3000:"));
        assert!(out.contains("case 0xFEFF:"));
        assert!(!out.contains("find_first_not_of"));

        let plain = render(&["long"], &CoercionPolicy::default());
        assert!(!plain.contains("IsBlank"));
    }

    #[test]
    fn test_string_only_needs_no_numeric_helpers() {
        let out = render(&["DOMString"], &CoercionPolicy::default());
        assert!(!out.contains("ToNumeric"));
        assert!(!out.contains("WrapToUint64"));
    }

    #[test]
    fn test_policy_changes_helpers() {
        let out = render(&["octet"], &CoercionPolicy::strict().with_numeric_strings());
        assert!(out.contains("if (value->IsString())"));
        assert!(out.contains("if (truncated < 0.0 || truncated > 255.0)"));
        assert!(!out.contains("WrapToUint64"));

        let clamp = render(
            &["short"],
            &CoercionPolicy::default().with_overflow(IntegerOverflow::Clamp),
        );
        assert!(clamp.contains("std::min(std::max(number, -32768.0), 32767.0)"));
    }

    #[test]
    fn test_empty_input_renders_nothing() {
        assert_eq!(render(&[], &CoercionPolicy::default()), "");
    }
}
