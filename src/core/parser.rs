use std::path::{Path, PathBuf};
use std::collections::HashMap;
use sha2::{Sha256, Digest};
use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;
use tracing::{debug, warn};
use tree_sitter::Tree;

use crate::config::{ParsingConfig, ProjectConfig};
use crate::error::{ReadorderError, Result};
use super::languages::{LanguageParser, JavaScriptParser, TypeScriptParser};

/// A source file together with its syntax tree
pub struct ParsedSource {
    /// File path as given or discovered
    pub path: PathBuf,

    /// Programming language detected
    pub language: String,

    /// Content hash, used to detect edits made while a fix was computed
    pub content_hash: String,

    /// Raw source content
    pub source: String,

    /// Syntax tree of `source`
    pub tree: Tree,
}

impl ParsedSource {
    /// Whether tree-sitter had to recover from syntax errors
    pub fn has_syntax_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }
}

/// Multi-language parser that delegates to language-specific parsers
pub struct SourceParser {
    config: ParsingConfig,
    language_parsers: HashMap<String, Box<dyn LanguageParser>>,
}

impl SourceParser {
    pub fn new(config: &ParsingConfig) -> Result<Self> {
        let mut language_parsers: HashMap<String, Box<dyn LanguageParser>> = HashMap::new();

        // Initialize language parsers based on configuration
        for language in &config.languages {
            let parser: Box<dyn LanguageParser> = match language.as_str() {
                "javascript" => Box::new(JavaScriptParser::new()?),
                "typescript" => Box::new(TypeScriptParser::new()?),
                other => {
                    warn!("Unsupported language in configuration: {}", other);
                    continue;
                }
            };
            debug!("Registered {} parser for {:?}", parser.language_name(), parser.file_extensions());
            language_parsers.insert(parser.language_name().to_string(), parser);
        }

        Ok(Self {
            config: config.clone(),
            language_parsers,
        })
    }

    /// Collect parseable files under the given paths
    ///
    /// Directories are walked respecting `.gitignore` and the configured
    /// ignore patterns; files named explicitly are always kept.
    pub fn collect_files(&self, paths: &[PathBuf], project: &ProjectConfig) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for root in paths {
            if root.is_file() {
                files.push(root.clone());
                continue;
            }
            if !root.is_dir() {
                return Err(ReadorderError::FileSystem(format!(
                    "No such file or directory: {}",
                    root.display()
                )));
            }

            let mut overrides = OverrideBuilder::new(root);
            for pattern in &project.ignore_patterns {
                overrides
                    .add(&format!("!{}", pattern))
                    .map_err(|e| ReadorderError::Config(format!("Invalid ignore pattern {}: {}", pattern, e)))?;
            }
            let overrides = overrides
                .build()
                .map_err(|e| ReadorderError::Config(e.to_string()))?;

            // Use ignore crate to respect .gitignore and custom patterns
            let walker = WalkBuilder::new(root)
                .hidden(false)
                .git_ignore(true)
                .overrides(overrides)
                .build();

            for entry in walker {
                let entry = entry.map_err(|e| ReadorderError::FileSystem(e.to_string()))?;
                let path = entry.path();

                if path.is_file() && self.should_parse_file(path) {
                    files.push(path.to_path_buf());
                }
            }
        }

        files.sort();
        files.dedup();
        debug!("Collected {} source files", files.len());
        Ok(files)
    }

    /// Read and parse a single source file
    pub async fn parse_file<P: AsRef<Path>>(&mut self, file_path: P) -> Result<ParsedSource> {
        let path = file_path.as_ref();
        let source = tokio::fs::read_to_string(path).await?;
        self.parse_content(path, source)
    }

    /// Parse already-loaded content as if it were the file at `path`
    pub fn parse_content(&mut self, path: &Path, source: String) -> Result<ParsedSource> {
        let language = self.detect_language(path)?;

        // Check file size
        if source.len() > self.config.max_file_size {
            return Err(ReadorderError::Parser(
                format!("File {} exceeds maximum size limit", path.display())
            ));
        }

        let content_hash = calculate_hash(&source);

        let parser = self.language_parsers.get_mut(&language)
            .ok_or_else(|| ReadorderError::Parser(format!("No parser for {}", language)))?;
        let tree = parser.parse(&source, path)?;

        Ok(ParsedSource {
            path: path.to_path_buf(),
            language,
            content_hash,
            source,
            tree,
        })
    }

    /// Determine if a file should be parsed based on its extension
    fn should_parse_file(&self, path: &Path) -> bool {
        self.detect_language(path).is_ok()
    }

    /// Detect programming language from file path
    fn detect_language(&self, path: &Path) -> Result<String> {
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            for (lang, parser) in &self.language_parsers {
                if parser.file_extensions().contains(&extension) {
                    return Ok(lang.clone());
                }
            }
        }

        Err(ReadorderError::Parser(
            format!("Could not detect language for file: {}", path.display())
        ))
    }
}

/// Calculate SHA256 hash of content
pub fn calculate_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
