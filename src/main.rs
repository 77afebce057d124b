use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use widl_nan::{
    compile_with_options, CodegenOptions, Definitions, Interface, OutputWriter, SourceUnit,
    WidlConfig,
};

mod diagnostic;

use diagnostic::{report_compile_error, report_error, report_warning};

#[derive(Parser, Debug)]
#[command(
    name = "widl-nan",
    version,
    about = "Generate NAN native addon bindings from interface declarations"
)]
struct Cli {
    /// Enable debug logging (WIDL_NAN_LOG takes precedence)
    #[arg(short, long, global = true)]
    debug: bool,

    /// Configuration file (default: ./widl-nan.toml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile an interface model into addon source
    Compile {
        /// Interface model (JSON)
        file: PathBuf,
        /// Output directory (default: [build] output, or "gen")
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Module name passed to NODE_MODULE
        #[arg(short, long, value_name = "NAME")]
        module: Option<String>,
        /// Also emit a `.d.ts` declaration file
        #[arg(long)]
        emit_dts: bool,
        /// Do not write the symbol manifest
        #[arg(long)]
        no_manifest: bool,
        /// Print the generated source to stdout instead of writing files
        #[arg(long)]
        stdout: bool,
        /// Append generation warnings to the source as comments
        #[arg(short, long)]
        verbose: bool,
    },
    /// Validate an interface model without writing anything
    Check {
        /// Interface model (JSON)
        file: PathBuf,
    },
    /// Print the symbol manifest as JSON
    Manifest {
        /// Interface model (JSON)
        file: PathBuf,
        /// Module name passed to NODE_MODULE
        #[arg(short, long, value_name = "NAME")]
        module: Option<String>,
    },
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("WIDL_NAN_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(true)
                .with_level(true),
        )
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Command::Compile {
            file,
            output,
            module,
            emit_dts,
            no_manifest,
            stdout,
            verbose,
        } => run_compile(
            &file,
            &config,
            CompileArgs {
                output,
                module,
                emit_dts,
                no_manifest,
                stdout,
                verbose,
            },
        ),
        Command::Check { file } => run_check(&file, &config),
        Command::Manifest { file, module } => run_manifest(&file, &config, module),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

struct CompileArgs {
    output: Option<PathBuf>,
    module: Option<String>,
    emit_dts: bool,
    no_manifest: bool,
    stdout: bool,
    verbose: bool,
}

fn load_config(path: Option<&Path>) -> Result<WidlConfig> {
    match path {
        Some(path) => WidlConfig::load_from_path(path)?
            .ok_or_else(|| anyhow!("configuration file `{}` not found", path.display())),
        None => Ok(WidlConfig::load()?.unwrap_or_default()),
    }
}

fn load_interfaces(path: &Path) -> Result<Vec<Interface>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read `{}`", path.display()))?;
    let definitions = Definitions::from_json(&content)
        .with_context(|| format!("failed to parse `{}`", path.display()))?;
    debug!(
        path = %path.display(),
        interfaces = definitions.interfaces.len(),
        "loaded interface model"
    );
    Ok(definitions.interfaces)
}

/// Compile `path`, reporting each compile error and every warning.
fn compile_file(path: &Path, options: &CodegenOptions) -> Result<SourceUnit> {
    let interfaces = load_interfaces(path)?;
    let display = path.display().to_string();
    match compile_with_options(&interfaces, options) {
        Ok(unit) => {
            for warning in &unit.warnings {
                report_warning(&display, warning);
            }
            Ok(unit)
        }
        Err(err) => {
            report_compile_error(&display, &err);
            let count = err.errors().len();
            Err(anyhow!(
                "could not compile `{}` due to {} previous error{}",
                display,
                count,
                if count == 1 { "" } else { "s" }
            ))
        }
    }
}

fn run_compile(file: &Path, config: &WidlConfig, args: CompileArgs) -> Result<()> {
    let mut options = config.codegen_options();
    if let Some(module) = args.module {
        options.module_name = module;
    }
    options.verbose |= args.verbose;

    let unit = compile_file(file, &options)?;
    if args.stdout {
        print!("{}", unit.code);
        return Ok(());
    }

    let dir = args
        .output
        .unwrap_or_else(|| PathBuf::from(config.build.output_dir()));
    let written = OutputWriter::new(&dir)
        .with_dts(args.emit_dts || config.build.emit_dts())
        .with_manifest(!args.no_manifest && config.build.emit_manifest())
        .write(&unit)
        .with_context(|| format!("failed to write output to `{}`", dir.display()))?;

    for path in written.paths() {
        info!(path = %path.display(), "wrote");
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn run_check(file: &Path, config: &WidlConfig) -> Result<()> {
    let unit = compile_file(file, &config.codegen_options())?;
    let count = unit.manifest.interfaces.len();
    println!(
        "Successfully checked {} ({} interface{})",
        file.display(),
        count,
        if count == 1 { "" } else { "s" }
    );
    Ok(())
}

fn run_manifest(file: &Path, config: &WidlConfig, module: Option<String>) -> Result<()> {
    let mut options = config.codegen_options();
    if let Some(module) = module {
        options.module_name = module;
    }
    let unit = compile_file(file, &options)?;
    println!("{}", unit.manifest.to_json()?);
    Ok(())
}
