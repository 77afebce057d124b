//! Project configuration (widl-nan.toml) parsing and types.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::coercion::CoercionPolicy;
use crate::emit::CodegenOptions;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "widl-nan.toml";

/// Root configuration structure for widl-nan.toml.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WidlConfig {
    /// Build configuration.
    #[serde(default)]
    pub build: BuildConfig,
    /// Coercion rules for generated decoders.
    #[serde(default)]
    pub coercion: CoercionPolicy,
}

/// Build configuration section.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Name passed to `NODE_MODULE`, also the output file stem.
    pub module: Option<String>,
    /// Output directory.
    pub output: Option<String>,
    /// Emit TypeScript declaration file.
    pub emit_dts: Option<bool>,
    /// Write the symbol manifest next to the source.
    pub emit_manifest: Option<bool>,
    /// Extra header comment for generated files.
    pub banner: Option<String>,
    /// Append generation warnings as comments.
    pub verbose: Option<bool>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read `{}`", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration in `{}`", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl WidlConfig {
    /// Load configuration from widl-nan.toml in the current directory.
    /// Returns `None` if the file doesn't exist.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        Self::load_from_path(Path::new(CONFIG_FILE))
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Code generation options described by this configuration.
    pub fn codegen_options(&self) -> CodegenOptions {
        CodegenOptions {
            module_name: self.build.module_name().to_string(),
            coercion: self.coercion,
            banner: self.build.banner.clone(),
            verbose: self.build.verbose.unwrap_or(false),
        }
    }
}

impl BuildConfig {
    /// Get the module name, defaulting to "binding".
    pub fn module_name(&self) -> &str {
        self.module.as_deref().unwrap_or("binding")
    }

    /// Get the output directory, defaulting to "gen".
    pub fn output_dir(&self) -> &str {
        self.output.as_deref().unwrap_or("gen")
    }

    /// Get whether to emit .d.ts (default: false).
    pub fn emit_dts(&self) -> bool {
        self.emit_dts.unwrap_or(false)
    }

    /// Get whether to write the manifest (default: true).
    pub fn emit_manifest(&self) -> bool {
        self.emit_manifest.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coercion::{IntegerNan, IntegerOverflow};
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[build]
module = "testAttributes"
output = "out"
emit_dts = true
emit_manifest = false

[coercion]
numeric_strings = true
integer_nan = "reject"
integer_overflow = "clamp"
"#;
        let config = WidlConfig::parse(toml).unwrap();
        assert_eq!(config.build.module_name(), "testAttributes");
        assert_eq!(config.build.output_dir(), "out");
        assert!(config.build.emit_dts());
        assert!(!config.build.emit_manifest());

        assert!(config.coercion.numeric_strings);
        assert!(!config.coercion.empty_string_as_zero);
        assert_eq!(config.coercion.integer_nan, IntegerNan::Reject);
        assert_eq!(config.coercion.integer_overflow, IntegerOverflow::Clamp);
    }

    #[test]
    fn test_parse_empty_config() {
        let config = WidlConfig::parse("").unwrap();
        assert_eq!(config, WidlConfig::default());
        assert_eq!(config.build.module_name(), "binding");
        assert_eq!(config.build.output_dir(), "gen");
        assert!(!config.build.emit_dts());
        assert!(config.build.emit_manifest());
        assert_eq!(config.coercion, CoercionPolicy::default());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(WidlConfig::parse("[build]\nmodul = \"x\"\n").is_err());
        assert!(WidlConfig::parse("[coercion]\ninteger_overflow = \"saturate\"\n").is_err());
    }

    #[test]
    fn test_codegen_options() {
        let config = WidlConfig::parse("[build]\nmodule = \"zoo\"\nverbose = true\n").unwrap();
        let options = config.codegen_options();
        assert_eq!(options.module_name, "zoo");
        assert!(options.verbose);
        assert_eq!(options.banner, None);
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        assert!(WidlConfig::load_from_path(&path).unwrap().is_none());

        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "[build]\nmodule = \"zoo\"").unwrap();
        let config = WidlConfig::load_from_path(&path).unwrap().unwrap();
        assert_eq!(config.build.module_name(), "zoo");

        fs::write(&path, "[build\n").unwrap();
        assert!(matches!(
            WidlConfig::load_from_path(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
