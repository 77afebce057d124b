//! TypeScript declarations for a generated module.

use std::fmt::Write;

use crate::emit::{InterfaceManifest, Manifest};
use crate::types::{IdlType, TypeMapping};

/// Render a `.d.ts` file describing the classes in `manifest`.
pub fn render_dts(manifest: &Manifest) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "// Generated by widl-nan for module `{}`. Do not edit.", manifest.module);
    for iface in &manifest.interfaces {
        out.push('\n');
        render_class(iface, &mut out);
    }
    out
}

fn render_class(iface: &InterfaceManifest, out: &mut String) {
    let params: Vec<String> = iface
        .constructor
        .parameters
        .iter()
        .map(|p| {
            format!(
                "{}{}: {}",
                parameter_name(&p.name),
                if p.optional { "?" } else { "" },
                ts_type(&p.ty)
            )
        })
        .collect();

    let _ = writeln!(out, "export declare class {} {{", iface.class);
    let _ = writeln!(out, "  constructor({});", params.join(", "));
    for attr in &iface.attributes {
        let _ = writeln!(
            out,
            "  {}{}: {};",
            if attr.writable { "" } else { "readonly " },
            attr.name,
            ts_type(&attr.ty)
        );
    }
    let _ = writeln!(out, "}}");
}

fn ts_type(tag: &str) -> &'static str {
    IdlType::from_tag(tag)
        .map(|idl| TypeMapping::of(idl).ts_type())
        .unwrap_or("unknown")
}

/// Parameter names may not be TypeScript reserved words; property names may.
fn parameter_name(name: &str) -> String {
    if is_ts_reserved(name) {
        format!("{}_", name)
    } else {
        name.to_string()
    }
}

/// Reserved words and strict-mode restricted names of JavaScript.
fn is_ts_reserved(name: &str) -> bool {
    matches!(
        name,
        "arguments"
            | "await"
            | "break"
            | "case"
            | "catch"
            | "class"
            | "const"
            | "continue"
            | "debugger"
            | "default"
            | "delete"
            | "do"
            | "else"
            | "enum"
            | "eval"
            | "export"
            | "extends"
            | "false"
            | "finally"
            | "for"
            | "function"
            | "if"
            | "implements"
            | "import"
            | "in"
            | "instanceof"
            | "interface"
            | "let"
            | "new"
            | "null"
            | "package"
            | "private"
            | "protected"
            | "public"
            | "return"
            | "static"
            | "super"
            | "switch"
            | "this"
            | "throw"
            | "true"
            | "try"
            | "typeof"
            | "var"
            | "void"
            | "while"
            | "with"
            | "yield"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::compile_with_options;
    use crate::emit::CodegenOptions;
    use crate::model::{Attribute, ConstructorParameter, Interface};

    #[test]
    fn test_render_animal() {
        let iface = Interface::new("Animal")
            .with_parameter(ConstructorParameter::optional("name", "DOMString"))
            .with_parameter(ConstructorParameter::optional("age", "long"))
            .with_attribute(Attribute::readonly("name", "DOMString"))
            .with_attribute(Attribute::writable("age", "long"))
            .with_attribute(Attribute::writable("tame", "boolean"));
        let options = CodegenOptions::default().with_module("zoo");
        let unit = compile_with_options(&[iface], &options).unwrap();

        assert_eq!(
            render_dts(&unit.manifest),
            "// Generated by widl-nan for module `zoo`. Do not edit.\n\
             \n\
             export declare class Animal {\n  \
             constructor(name?: string, age?: number);\n  \
             readonly name: string;\n  \
             age: number;\n  \
             tame: boolean;\n\
             }\n"
        );
    }

    #[test]
    fn test_reserved_parameter_names() {
        let iface = Interface::new("Range")
            .with_parameter(ConstructorParameter::required("var", "double"))
            .with_attribute(Attribute::writable("var", "double"));
        let unit = compile_with_options(&[iface], &CodegenOptions::default()).unwrap();
        let dts = render_dts(&unit.manifest);
        assert!(dts.contains("constructor(var_: number);"));
        assert!(dts.contains("  var: number;"));
    }

    #[test]
    fn test_javascript_only_reserved_words() {
        let iface = Interface::new("Span")
            .with_parameter(ConstructorParameter::optional("null", "double"))
            .with_parameter(ConstructorParameter::optional("finally", "boolean"))
            .with_attribute(Attribute::writable("null", "double"))
            .with_attribute(Attribute::writable("finally", "boolean"))
            .with_attribute(Attribute::writable("debugger", "boolean"))
            .with_attribute(Attribute::writable("extends", "long"));
        let unit = compile_with_options(&[iface], &CodegenOptions::default()).unwrap();
        let dts = render_dts(&unit.manifest);
        assert!(dts.contains("constructor(null_?: number, finally_?: boolean);"), "got:\n{}", dts);
        assert!(dts.contains("  null: number;"));
        assert!(is_ts_reserved("debugger"));
        assert!(is_ts_reserved("extends"));
        assert!(!is_ts_reserved("name"));
    }
}
