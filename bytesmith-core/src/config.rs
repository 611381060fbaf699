//! Toolchain configuration.
//!
//! Maps each language to the external programs the command builder invokes.
//! Every field has a default, so an empty (or missing) `toolchains.toml`
//! yields a working setup on a machine with the usual tools on `PATH`.

use crate::error::{ConsoleError, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "toolchains.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    pub java_compiler: String,
    pub java_runtime: String,
    pub python: String,
    pub node: String,
    pub cpp_compiler: String,
    /// Binary name the C++ compiler writes next to the source file.
    pub cpp_output: String,
    /// Marker appended whenever a fresh input prompt opens.
    pub prompt: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            java_compiler: "javac".to_string(),
            java_runtime: "java".to_string(),
            python: if cfg!(windows) { "python" } else { "python3" }.to_string(),
            node: "node".to_string(),
            cpp_compiler: "g++".to_string(),
            cpp_output: if cfg!(windows) { "a.exe" } else { "a.out" }.to_string(),
            prompt: "> ".to_string(),
        }
    }
}

impl ToolchainConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ConsoleError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// `<config dir>/bytesmith/toolchains.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "bytesmith").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Load from the default location, falling back to defaults when the file is absent.
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => {
                tracing::info!(path = %path.display(), "Loading toolchain config");
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }
}
