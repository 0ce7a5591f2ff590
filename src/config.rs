use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ReadorderError, Result};

/// Config file names looked up in the working directory, in order
pub const CONFIG_CANDIDATES: [&str; 3] = ["Readorder.toml", "readorder.toml", ".readorder.toml"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Source code parsing configuration
    pub parsing: ParsingConfig,

    /// Which scopes get reordered and how
    pub ordering: OrderingConfig,

    /// Output settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Source directories to analyze when no paths are given
    pub source_dirs: Vec<PathBuf>,

    /// Gitignore-style patterns to skip
    pub ignore_patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    /// Languages to support
    pub languages: Vec<String>,

    /// Maximum file size to parse (in bytes)
    pub max_file_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderingConfig {
    /// Also reorder methods inside class bodies
    pub class_bodies: bool,

    /// Also reorder functions declared inside function bodies
    pub nested_scopes: bool,

    /// Upper bound on parse-and-rewrite passes per file when fixing
    pub max_passes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format (text or json)
    pub format: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            source_dirs: vec![PathBuf::from("src")],
            ignore_patterns: vec![
                "node_modules/".to_string(),
                "dist/".to_string(),
                "build/".to_string(),
                ".git/".to_string(),
                "*.min.js".to_string(),
            ],
        }
    }
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            languages: vec!["javascript".to_string(), "typescript".to_string()],
            max_file_size: 1024 * 1024, // 1MB
        }
    }
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            class_bodies: true,
            nested_scopes: false,
            max_passes: 8,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| ReadorderError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ReadorderError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Err(ReadorderError::Config(format!(
                        "Config file not found: {}",
                        p.as_ref().display()
                    )))
                }
            }
            None => {
                // Try common config file locations
                for candidate in &CONFIG_CANDIDATES {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.ordering.max_passes == 0 {
            return Err(ReadorderError::Config("ordering.max_passes must be at least 1".to_string()));
        }
        match self.output.format.as_str() {
            "text" | "json" => Ok(()),
            other => Err(ReadorderError::Config(format!("Unsupported output format: {}", other))),
        }
    }
}
