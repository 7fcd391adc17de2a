//! Project manifest loading.
//!
//! Supports YAML, TOML and JSON, detected from the file extension, with
//! `${VAR}` environment substitution applied before parsing.
//!
//! Only the braced form is substituted: mapping expressions legitimately
//! contain `$input...`, which must reach the mapping language untouched.

use crate::error::GatewayError;
use crate::manifest::ProjectManifest;
use crate::types::EndpointDeclaration;
use regex::{Captures, Regex};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::LazyLock;

static BRACED_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is valid")
});

/// Manifest loading error.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Config parsing error: {0}")]
    Parse(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Supported manifest formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Yaml,
    Toml,
    Json,
}

/// Detect the format from a file extension (`yaml`/`yml`, `toml`, `json`).
pub fn detect_format(path: &Path) -> ConfigResult<FileFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ConfigError::UnsupportedFormat("No file extension found".to_string()))?;

    match ext.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        "toml" => Ok(FileFormat::Toml),
        "json" => Ok(FileFormat::Json),
        _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}

/// Replace `${VAR}` with the variable's value; unknown variables are kept.
pub fn substitute_env_vars(content: &str) -> String {
    BRACED_VAR
        .replace_all(content, |caps: &Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Parse `content` in the given format after env substitution.
pub fn from_str<T>(content: &str, format: FileFormat) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    let substituted = substitute_env_vars(content);
    match format {
        FileFormat::Yaml => {
            serde_yaml::from_str(&substituted).map_err(|e| ConfigError::Parse(e.to_string()))
        }
        FileFormat::Toml => {
            toml::from_str(&substituted).map_err(|e| ConfigError::Parse(e.to_string()))
        }
        FileFormat::Json => {
            serde_json::from_str(&substituted).map_err(|e| ConfigError::Parse(e.to_string()))
        }
    }
}

/// Load and parse a file, detecting its format from the extension.
pub fn load_config<T>(path: &Path) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    from_str(&content, format)
}

/// Load a project manifest and resolve its endpoints relative to the
/// manifest's directory.
pub fn load_manifest(path: &Path) -> ConfigResult<Vec<EndpointDeclaration>> {
    let manifest: ProjectManifest = load_config(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(manifest.endpoint_declarations(base_dir)?)
}
