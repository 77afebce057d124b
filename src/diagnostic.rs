//! Colored error reporting for the command line.

use std::io::Write;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use widl_nan::{CompileError, Warning};

fn emit(color: Color, label: &str, message: &str) {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    let _ = stderr.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    let _ = write!(stderr, "{}:", label);
    let _ = stderr.reset();
    let _ = writeln!(stderr, " {}", message);
}

/// Report every individual error of a failed compilation.
pub fn report_compile_error(path: &str, err: &CompileError) {
    for single in err.errors() {
        emit(Color::Red, "error", &format!("{}: {}", path, single));
    }
}

/// Report an application error with its cause chain.
pub fn report_error(err: &anyhow::Error) {
    emit(Color::Red, "error", &err.to_string());
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    for cause in err.chain().skip(1) {
        let _ = writeln!(stderr, "  caused by: {}", cause);
    }
}

pub fn report_warning(path: &str, warning: &Warning) {
    emit(Color::Yellow, "warning", &format!("{}: {}", path, warning.message));
}
